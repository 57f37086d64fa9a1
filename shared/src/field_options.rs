//! Admin-configurable option lists for the directory's enumerated fields.
//!
//! Every field has a compiled-in default list. Admins may replace a list; only
//! that override is persisted, and resetting deletes it so reads fall back to
//! the default again.

use crate::access::Caller;
use crate::error::ApiError;
use crate::store::Store;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum FieldName {
    ClergyTypes,
    Areas,
    Councils,
    Occupations,
    MaritalStatuses,
    Genders,
    Statuses,
    PastorFunctions,
}

impl FieldName {
    pub const ALL: [FieldName; 8] = [
        FieldName::ClergyTypes,
        FieldName::Areas,
        FieldName::Councils,
        FieldName::Occupations,
        FieldName::MaritalStatuses,
        FieldName::Genders,
        FieldName::Statuses,
        FieldName::PastorFunctions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldName::ClergyTypes => "clergyTypes",
            FieldName::Areas => "areas",
            FieldName::Councils => "councils",
            FieldName::Occupations => "occupations",
            FieldName::MaritalStatuses => "maritalStatuses",
            FieldName::Genders => "genders",
            FieldName::Statuses => "statuses",
            FieldName::PastorFunctions => "pastorFunctions",
        }
    }

    pub fn defaults(&self) -> &'static [&'static str] {
        match self {
            FieldName::ClergyTypes => &["Bishop", "Mother", "Sister", "Reverend", "Pastor"],
            FieldName::Areas => &["Area 1", "Area 2", "Area 3", "Area 4", "Area 5"],
            FieldName::Councils => &["Council 1", "Council 2", "Council 3", "Council 4"],
            FieldName::Occupations => &[
                "Full-time Ministry",
                "Business",
                "Education",
                "Healthcare",
                "Engineering",
                "Public Service",
                "Retired",
                "Other",
            ],
            FieldName::MaritalStatuses => &["Single", "Married", "Divorced", "Widowed"],
            FieldName::Genders => &["Male", "Female"],
            FieldName::Statuses => &["Active", "Inactive"],
            FieldName::PastorFunctions => &["Governor", "Overseer", "Not Applicable"],
        }
    }
}

impl FromStr for FieldName {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldName::ALL
            .into_iter()
            .find(|field| field.as_str() == s.trim())
            .ok_or_else(|| ApiError::validation(format!("Unknown field name '{}'", s.trim())))
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An admin override as persisted in the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredOptions {
    pub field: FieldName,
    pub options: Vec<String>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<String>,
}

/// The effective option list for one field.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionSet {
    Default(FieldName),
    Override(StoredOptions),
}

impl OptionSet {
    pub fn resolve(field: FieldName, stored: Option<StoredOptions>) -> Self {
        match stored {
            Some(stored) => OptionSet::Override(stored),
            None => OptionSet::Default(field),
        }
    }

    pub fn field(&self) -> FieldName {
        match self {
            OptionSet::Default(field) => *field,
            OptionSet::Override(stored) => stored.field,
        }
    }

    pub fn options(&self) -> Vec<String> {
        match self {
            OptionSet::Default(field) => field.defaults().iter().map(|s| s.to_string()).collect(),
            OptionSet::Override(stored) => stored.options.clone(),
        }
    }

    pub fn view(&self) -> FieldOptionsView {
        FieldOptionsView {
            field_name: self.field(),
            options: self.options(),
            updated_at: match self {
                OptionSet::Default(_) => None,
                OptionSet::Override(stored) => Some(stored.updated_at),
            },
            is_default: matches!(self, OptionSet::Default(_)),
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FieldOptionsView {
    pub field_name: FieldName,
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    pub is_default: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFieldOptionsRequest {
    pub field_name: Option<String>,
    #[serde(default)]
    pub options: serde_json::Value,
}

/// Effective option lists for every field, keyed by field name.
pub async fn read_all(store: &dyn Store) -> Result<BTreeMap<String, FieldOptionsView>, ApiError> {
    let mut overrides: BTreeMap<FieldName, StoredOptions> = store
        .list_field_overrides()
        .await?
        .into_iter()
        .map(|stored| (stored.field, stored))
        .collect();

    Ok(FieldName::ALL
        .into_iter()
        .map(|field| {
            let set = OptionSet::resolve(field, overrides.remove(&field));
            (field.as_str().to_string(), set.view())
        })
        .collect())
}

/// Replace the stored option list for one field.
pub async fn write(
    store: &dyn Store,
    caller: &Caller,
    body: &[u8],
) -> Result<FieldOptionsView, ApiError> {
    let req: UpdateFieldOptionsRequest = serde_json::from_slice(body)?;

    let field: FieldName = req
        .field_name
        .as_deref()
        .ok_or_else(|| ApiError::validation("fieldName is required"))?
        .parse()?;
    let options = clean_options(&req.options)?;

    let stored = StoredOptions {
        field,
        options,
        updated_at: Utc::now(),
        updated_by: Some(caller.user_id.clone()),
    };
    store.put_field_override(&stored).await?;

    tracing::info!(
        "Field options for {} replaced by {} ({} options)",
        field,
        caller.user_id,
        stored.options.len()
    );
    Ok(OptionSet::Override(stored).view())
}

/// Delete the override for one field. Resetting a field that was never
/// overridden is a no-op.
pub async fn reset(store: &dyn Store, field_name: Option<&str>) -> Result<FieldOptionsView, ApiError> {
    let field: FieldName = field_name
        .ok_or_else(|| ApiError::validation("fieldName query parameter is required"))?
        .parse()?;

    store.delete_field_override(field).await?;
    tracing::info!("Field options for {} reset to defaults", field);
    Ok(OptionSet::Default(field).view())
}

/// Validate an options payload: a non-empty array of strings, trimmed, with
/// blanks and repeats dropped, leaving at least one option.
fn clean_options(value: &serde_json::Value) -> Result<Vec<String>, ApiError> {
    let items = value
        .as_array()
        .ok_or_else(|| ApiError::validation("options must be an array of strings"))?;
    if items.is_empty() {
        return Err(ApiError::validation("options must not be empty"));
    }

    let mut seen = HashSet::new();
    let mut options = Vec::with_capacity(items.len());
    for item in items {
        let text = item
            .as_str()
            .ok_or_else(|| ApiError::validation("options must be an array of strings"))?
            .trim();
        if !text.is_empty() && seen.insert(text.to_lowercase()) {
            options.push(text.to_string());
        }
    }

    if options.is_empty() {
        return Err(ApiError::validation("At least one option is required"));
    }
    Ok(options)
}
