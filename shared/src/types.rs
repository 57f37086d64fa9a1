use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ========== STATUS ==========
/// Record status. `Inactive` is the soft-delete flag.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Active,
    Inactive,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Active => "Active",
            Status::Inactive => "Inactive",
        }
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Status::Active),
            "inactive" => Ok(Status::Inactive),
            _ => Err(format!("Invalid status '{}'", s.trim())),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ========== PASTOR FUNCTION ==========
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum PastorFunction {
    Governor,
    Overseer,
    #[default]
    #[serde(rename = "Not Applicable")]
    NotApplicable,
}

impl PastorFunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PastorFunction::Governor => "Governor",
            PastorFunction::Overseer => "Overseer",
            PastorFunction::NotApplicable => "Not Applicable",
        }
    }
}

impl FromStr for PastorFunction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "governor" => Ok(PastorFunction::Governor),
            "overseer" => Ok(PastorFunction::Overseer),
            "not applicable" | "not_applicable" | "n/a" => Ok(PastorFunction::NotApplicable),
            _ => Err(format!("Invalid function '{}'", s.trim())),
        }
    }
}

// ========== ROLE ==========
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            _ => Err(format!("Invalid role '{}'", s.trim())),
        }
    }
}

// ========== PASTOR ==========
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pastor {
    pub id: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub marital_status: Option<String>,
    /// Clergy titles, e.g. Bishop, Reverend.
    pub clergy_type: Vec<String>,
    pub function: Vec<PastorFunction>,
    pub church_id: Option<String>,
    pub church_name: Option<String>,
    pub council: Option<String>,
    pub area: Option<String>,
    pub occupation: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub status: Status,
    pub profile_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Pastor {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn name_key(&self) -> String {
        name_key(&self.first_name, &self.last_name)
    }
}

/// Case-insensitive lookup key for the (first, last) name pair.
pub fn name_key(first_name: &str, last_name: &str) -> String {
    format!(
        "{}|{}",
        first_name.trim().to_lowercase(),
        last_name.trim().to_lowercase()
    )
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CreatePastorRequest {
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub marital_status: Option<String>,
    pub clergy_type: Vec<String>,
    pub function: Vec<PastorFunction>,
    pub church_id: Option<String>,
    pub church_name: Option<String>,
    pub council: Option<String>,
    pub area: Option<String>,
    pub occupation: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub status: Option<Status>,
}

/// Partial update. An empty string clears an optional text field.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdatePastorRequest {
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub clear_date_of_birth: bool,
    pub gender: Option<String>,
    pub marital_status: Option<String>,
    pub clergy_type: Option<Vec<String>>,
    pub function: Option<Vec<PastorFunction>>,
    pub church_id: Option<String>,
    pub church_name: Option<String>,
    pub council: Option<String>,
    pub area: Option<String>,
    pub occupation: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub status: Option<Status>,
}

// ========== CHURCH ==========
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Church {
    pub id: String,
    pub name: String,
    pub location: Option<String>,
    /// Free-text head pastor name, used when there is no pastor record to point at.
    pub head_pastor: Option<String>,
    pub head_pastor_id: Option<String>,
    pub member_count: Option<u32>,
    pub income: Option<f64>,
    pub images: Vec<String>,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateChurchRequest {
    pub name: String,
    pub location: Option<String>,
    pub head_pastor: Option<String>,
    pub head_pastor_id: Option<String>,
    pub member_count: Option<i64>,
    pub income: Option<f64>,
    pub images: Vec<String>,
    pub status: Option<Status>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateChurchRequest {
    pub name: Option<String>,
    pub location: Option<String>,
    pub head_pastor: Option<String>,
    pub head_pastor_id: Option<String>,
    pub member_count: Option<i64>,
    pub income: Option<f64>,
    pub images: Option<Vec<String>>,
    pub status: Option<Status>,
}

// ========== USER ==========
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub role: Option<Role>,
}

// ========== INVITE ==========
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InviteStatus {
    Pending,
    Used,
}

impl InviteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InviteStatus::Pending => "pending",
            InviteStatus::Used => "used",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Invite {
    pub code: String,
    pub email: String,
    pub role: Role,
    pub status: InviteStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub used_by: Option<String>,
    pub used_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInviteRequest {
    pub email: String,
    #[serde(default)]
    pub role: Role,
    pub expires_days: Option<i64>,
}

/// Trim a text value and drop it if nothing is left.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_parsing_is_case_insensitive() {
        assert_eq!(
            "  overseer ".parse::<PastorFunction>().unwrap(),
            PastorFunction::Overseer
        );
        assert_eq!(
            "NOT APPLICABLE".parse::<PastorFunction>().unwrap(),
            PastorFunction::NotApplicable
        );
        assert!("Deacon".parse::<PastorFunction>().is_err());
    }

    #[test]
    fn test_function_serializes_with_space() {
        let json = serde_json::to_string(&PastorFunction::NotApplicable).unwrap();
        assert_eq!(json, "\"Not Applicable\"");
    }

    #[test]
    fn test_name_key_ignores_case_and_padding() {
        assert_eq!(name_key(" John", "DOE "), name_key("john", "doe"));
        assert_ne!(name_key("John", "Doe"), name_key("Jon", "Doe"));
    }

    #[test]
    fn test_create_request_accepts_sparse_body() {
        let req: CreatePastorRequest =
            serde_json::from_str(r#"{"firstName":"Ann","lastName":"Lee","dateOfBirth":"1970-02-01"}"#)
                .unwrap();
        assert_eq!(req.first_name, "Ann");
        assert_eq!(
            req.date_of_birth,
            Some(NaiveDate::from_ymd_opt(1970, 2, 1).unwrap())
        );
        assert!(req.function.is_empty());
    }

    #[test]
    fn test_unknown_function_is_rejected_by_serde() {
        let result = serde_json::from_str::<CreatePastorRequest>(
            r#"{"firstName":"Ann","lastName":"Lee","function":["Deacon"]}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  x ".into())), Some("x".into()));
        assert_eq!(non_blank(Some("   ".into())), None);
        assert_eq!(non_blank(None), None);
    }
}
