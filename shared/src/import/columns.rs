//! Mapping spreadsheet columns onto pastor fields.

use crate::error::ApiError;
use crate::types::{CreatePastorRequest, PastorFunction, Status};
use chrono::NaiveDate;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    FirstName,
    MiddleName,
    LastName,
    DateOfBirth,
    Gender,
    MaritalStatus,
    Titles,
    Function,
    Church,
    Council,
    Area,
    Occupation,
    Email,
    Phone,
    Address,
    Status,
}

/// Accepted header spellings, already in normalized form (see
/// [`normalize_header`]), so `First Name`, `first_name` and `firstName` all
/// land on the first entry.
const ALIASES: &[(Column, &[&str])] = &[
    (Column::FirstName, &["firstname", "first", "givenname"]),
    (Column::MiddleName, &["middlename", "middle", "othernames"]),
    (Column::LastName, &["lastname", "last", "surname", "familyname"]),
    (
        Column::DateOfBirth,
        &["dateofbirth", "birthdate", "dob", "birthday", "dateofbirthyyyymmdd"],
    ),
    (Column::Gender, &["gender", "sex"]),
    (Column::MaritalStatus, &["maritalstatus", "marital"]),
    (
        Column::Titles,
        &["titles", "title", "clergytype", "clergytypes", "clergytitle"],
    ),
    (
        Column::Function,
        &["function", "functions", "pastorfunction", "pastorfunctions"],
    ),
    (Column::Church, &["church", "churchname", "campus"]),
    (Column::Council, &["council"]),
    (Column::Area, &["area"]),
    (Column::Occupation, &["occupation", "profession"]),
    (Column::Email, &["email", "emailaddress"]),
    (Column::Phone, &["phone", "phonenumber", "telephone", "mobile", "contact"]),
    (Column::Address, &["address", "residentialaddress"]),
    (Column::Status, &["status"]),
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];

/// Lowercase and keep only letters and digits.
pub fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

pub fn column_for(header: &str) -> Option<Column> {
    let normalized = normalize_header(header);
    ALIASES
        .iter()
        .find(|(_, aliases)| aliases.contains(&normalized.as_str()))
        .map(|(column, _)| *column)
}

/// Where each known column sits in a row. A field may be fed by several
/// headers (e.g. both `First Name` and `first_name`); the first non-blank
/// cell wins.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    positions: HashMap<Column, Vec<usize>>,
}

impl ColumnMap {
    pub fn from_headers(headers: &[String]) -> Result<Self, ApiError> {
        let mut positions: HashMap<Column, Vec<usize>> = HashMap::new();
        for (idx, header) in headers.iter().enumerate() {
            if let Some(column) = column_for(header) {
                positions.entry(column).or_default().push(idx);
            }
        }

        let mut missing = Vec::new();
        if !positions.contains_key(&Column::FirstName) {
            missing.push("First Name");
        }
        if !positions.contains_key(&Column::LastName) {
            missing.push("Last Name");
        }
        if !missing.is_empty() {
            return Err(ApiError::validation(format!(
                "Missing required column(s): {}",
                missing.join(", ")
            )));
        }

        Ok(Self { positions })
    }

    /// The cell for `column`, trimmed, or `None` if blank or absent.
    pub fn get<'a>(&self, row: &'a [String], column: Column) -> Option<&'a str> {
        self.positions
            .get(&column)?
            .iter()
            .filter_map(|&idx| row.get(idx))
            .map(|cell| cell.trim())
            .find(|cell| !cell.is_empty())
    }

    fn owned(&self, row: &[String], column: Column) -> Option<String> {
        self.get(row, column).map(str::to_string)
    }
}

/// Split a comma-separated cell into trimmed, non-blank parts.
pub fn split_list(cell: &str) -> Vec<String> {
    cell.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn parse_birth_date(cell: &str) -> Result<NaiveDate, String> {
    let cell = cell.trim();
    // Spreadsheet datetimes exported as text keep a time suffix.
    let date_part = cell.split(['T', ' ']).next().unwrap_or(cell);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
        .ok_or_else(|| format!("Invalid date of birth '{}'", cell))
}

/// Turn one data row into a create request. The church cell is carried as a
/// name; resolving it to a church id is up to the caller.
pub fn row_to_request(columns: &ColumnMap, row: &[String]) -> Result<CreatePastorRequest, String> {
    let first_name = columns.owned(row, Column::FirstName);
    let last_name = columns.owned(row, Column::LastName);
    let (first_name, last_name) = match (first_name, last_name) {
        (Some(first), Some(last)) => (first, last),
        (None, Some(_)) => return Err("Missing required field: First Name".to_string()),
        (Some(_), None) => return Err("Missing required field: Last Name".to_string()),
        (None, None) => {
            return Err("Missing required fields: First Name, Last Name".to_string())
        }
    };

    let date_of_birth = columns
        .get(row, Column::DateOfBirth)
        .map(parse_birth_date)
        .transpose()?;

    let function = columns
        .get(row, Column::Function)
        .map(split_list)
        .unwrap_or_default()
        .iter()
        .map(|f| f.parse::<PastorFunction>())
        .collect::<Result<Vec<_>, _>>()?;

    let status = columns
        .get(row, Column::Status)
        .map(str::parse::<Status>)
        .transpose()?;

    Ok(CreatePastorRequest {
        first_name,
        middle_name: columns.owned(row, Column::MiddleName),
        last_name,
        date_of_birth,
        gender: columns.owned(row, Column::Gender),
        marital_status: columns.owned(row, Column::MaritalStatus),
        clergy_type: columns
            .get(row, Column::Titles)
            .map(split_list)
            .unwrap_or_default(),
        function,
        church_id: None,
        church_name: columns.owned(row, Column::Church),
        council: columns.owned(row, Column::Council),
        area: columns.owned(row, Column::Area),
        occupation: columns.owned(row, Column::Occupation),
        email: columns.owned(row, Column::Email),
        phone: columns.owned(row, Column::Phone),
        address: columns.owned(row, Column::Address),
        status,
    })
}
