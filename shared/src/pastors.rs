use crate::error::ApiError;
use crate::store::Store;
use crate::types::{
    non_blank, CreatePastorRequest, Pastor, PastorFunction, Status, UpdatePastorRequest,
};
use chrono::Utc;

/// List filters, all optional and combined with AND.
#[derive(Debug, Default, Clone)]
pub struct PastorFilter {
    pub status: Option<Status>,
    pub council: Option<String>,
    pub area: Option<String>,
    pub church_id: Option<String>,
    /// Case-insensitive substring over first, middle and last name.
    pub search: Option<String>,
}

impl PastorFilter {
    fn matches(&self, pastor: &Pastor) -> bool {
        if self.status.is_some_and(|status| pastor.status != status) {
            return false;
        }
        if !matches_text(&self.council, &pastor.council)
            || !matches_text(&self.area, &pastor.area)
            || !matches_text(&self.church_id, &pastor.church_id)
        {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                [
                    Some(&pastor.first_name),
                    pastor.middle_name.as_ref(),
                    Some(&pastor.last_name),
                ]
                .into_iter()
                .flatten()
                .any(|name| name.to_lowercase().contains(&term))
                    || pastor.full_name().to_lowercase().contains(&term)
            }
            _ => true,
        }
    }
}

fn matches_text(wanted: &Option<String>, actual: &Option<String>) -> bool {
    match wanted.as_deref().map(str::trim) {
        Some(w) if !w.is_empty() => actual
            .as_deref()
            .is_some_and(|a| a.eq_ignore_ascii_case(w)),
        _ => true,
    }
}

/// Build a new Active-by-default pastor record from a create request.
pub fn new_pastor(req: CreatePastorRequest) -> Result<Pastor, ApiError> {
    let first_name = req.first_name.trim().to_string();
    let last_name = req.last_name.trim().to_string();
    if first_name.is_empty() || last_name.is_empty() {
        return Err(ApiError::validation("First name and last name are required"));
    }

    Ok(Pastor {
        id: uuid::Uuid::new_v4().to_string(),
        first_name,
        middle_name: non_blank(req.middle_name),
        last_name,
        date_of_birth: req.date_of_birth,
        gender: non_blank(req.gender),
        marital_status: non_blank(req.marital_status),
        clergy_type: clean_list(req.clergy_type),
        function: clean_functions(req.function),
        church_id: non_blank(req.church_id),
        church_name: non_blank(req.church_name),
        council: non_blank(req.council),
        area: non_blank(req.area),
        occupation: non_blank(req.occupation),
        email: non_blank(req.email),
        phone: non_blank(req.phone),
        address: non_blank(req.address),
        status: req.status.unwrap_or_default(),
        profile_image: None,
        created_at: Utc::now(),
        updated_at: None,
    })
}

fn clean_list(values: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let value = value.trim();
        if !value.is_empty() && !cleaned.iter().any(|v| v == value) {
            cleaned.push(value.to_string());
        }
    }
    cleaned
}

/// Drop repeats; an empty list means `Not Applicable`.
fn clean_functions(values: Vec<PastorFunction>) -> Vec<PastorFunction> {
    let mut cleaned: Vec<PastorFunction> = Vec::with_capacity(values.len());
    for value in values {
        if !cleaned.contains(&value) {
            cleaned.push(value);
        }
    }
    if cleaned.is_empty() {
        cleaned.push(PastorFunction::NotApplicable);
    }
    cleaned
}

/// Whether `existing` blocks `candidate` under the uniqueness rule: an Active
/// record with the same names, and the same birth date when the candidate
/// has one.
pub fn is_duplicate(existing: &Pastor, candidate: &Pastor) -> bool {
    existing.id != candidate.id
        && existing.status == Status::Active
        && existing.name_key() == candidate.name_key()
        && match candidate.date_of_birth {
            Some(dob) => existing.date_of_birth == Some(dob),
            None => true,
        }
}

/// Look for an Active record that `candidate` would collide with.
pub async fn find_duplicate(
    store: &dyn Store,
    candidate: &Pastor,
) -> Result<Option<Pastor>, ApiError> {
    let matches = store
        .find_pastors_by_name(&candidate.first_name, &candidate.last_name)
        .await?;
    Ok(matches.into_iter().find(|p| is_duplicate(p, candidate)))
}

pub fn duplicate_message(candidate: &Pastor) -> String {
    match candidate.date_of_birth {
        Some(dob) => format!(
            "A pastor named {} born {} already exists",
            candidate.full_name(),
            dob.format("%Y-%m-%d")
        ),
        None => format!("A pastor named {} already exists", candidate.full_name()),
    }
}

async fn ensure_unique(store: &dyn Store, candidate: &Pastor) -> Result<(), ApiError> {
    if candidate.status != Status::Active {
        return Ok(());
    }
    if let Some(existing) = find_duplicate(store, candidate).await? {
        tracing::info!(
            "Rejected pastor {} as duplicate of {}",
            candidate.full_name(),
            existing.id
        );
        return Err(ApiError::Validation(duplicate_message(candidate)));
    }
    Ok(())
}

pub async fn list_pastors(store: &dyn Store, filter: &PastorFilter) -> Result<Vec<Pastor>, ApiError> {
    let mut pastors: Vec<Pastor> = store
        .list_pastors()
        .await?
        .into_iter()
        .filter(|p| filter.matches(p))
        .collect();
    pastors.sort_by(|a, b| {
        a.last_name
            .to_lowercase()
            .cmp(&b.last_name.to_lowercase())
            .then_with(|| a.first_name.to_lowercase().cmp(&b.first_name.to_lowercase()))
    });
    Ok(pastors)
}

pub async fn get_pastor(store: &dyn Store, id: &str) -> Result<Pastor, ApiError> {
    store
        .get_pastor(id)
        .await?
        .ok_or(ApiError::NotFound("Pastor"))
}

/// Create a pastor
pub async fn create_pastor(store: &dyn Store, body: &[u8]) -> Result<Pastor, ApiError> {
    let req: CreatePastorRequest = serde_json::from_slice(body)?;
    let pastor = new_pastor(req)?;
    ensure_unique(store, &pastor).await?;
    store.put_pastor(&pastor).await?;
    tracing::info!("Created pastor {} ({})", pastor.full_name(), pastor.id);
    Ok(pastor)
}

/// Update a pastor. Only fields present in the body change.
pub async fn update_pastor(store: &dyn Store, id: &str, body: &[u8]) -> Result<Pastor, ApiError> {
    let req: UpdatePastorRequest = serde_json::from_slice(body)?;
    let mut pastor = get_pastor(store, id).await?;

    if let Some(first_name) = req.first_name {
        pastor.first_name = required_name(first_name)?;
    }
    if let Some(last_name) = req.last_name {
        pastor.last_name = required_name(last_name)?;
    }
    if req.clear_date_of_birth {
        pastor.date_of_birth = None;
    } else if req.date_of_birth.is_some() {
        pastor.date_of_birth = req.date_of_birth;
    }
    if let Some(clergy_type) = req.clergy_type {
        pastor.clergy_type = clean_list(clergy_type);
    }
    if let Some(function) = req.function {
        pastor.function = clean_functions(function);
    }
    if let Some(status) = req.status {
        pastor.status = status;
    }

    set_text(&mut pastor.middle_name, req.middle_name);
    set_text(&mut pastor.gender, req.gender);
    set_text(&mut pastor.marital_status, req.marital_status);
    set_text(&mut pastor.church_id, req.church_id);
    set_text(&mut pastor.church_name, req.church_name);
    set_text(&mut pastor.council, req.council);
    set_text(&mut pastor.area, req.area);
    set_text(&mut pastor.occupation, req.occupation);
    set_text(&mut pastor.email, req.email);
    set_text(&mut pastor.phone, req.phone);
    set_text(&mut pastor.address, req.address);

    ensure_unique(store, &pastor).await?;
    pastor.updated_at = Some(Utc::now());
    store.put_pastor(&pastor).await?;
    Ok(pastor)
}

fn required_name(value: String) -> Result<String, ApiError> {
    non_blank(Some(value))
        .ok_or_else(|| ApiError::validation("First name and last name are required"))
}

/// `Some("")` clears, `Some(text)` sets, `None` leaves the field alone.
pub(crate) fn set_text(target: &mut Option<String>, value: Option<String>) {
    if let Some(value) = value {
        *target = non_blank(Some(value));
    }
}

/// Soft delete: mark the record Inactive.
pub async fn deactivate_pastor(store: &dyn Store, id: &str) -> Result<Pastor, ApiError> {
    let mut pastor = get_pastor(store, id).await?;
    if pastor.status != Status::Inactive {
        pastor.status = Status::Inactive;
        pastor.updated_at = Some(Utc::now());
        store.put_pastor(&pastor).await?;
        tracing::info!("Deactivated pastor {}", id);
    }
    Ok(pastor)
}

/// Hard delete, allowed only for records already soft-deleted.
pub async fn delete_pastor_permanently(store: &dyn Store, id: &str) -> Result<String, ApiError> {
    let pastor = get_pastor(store, id).await?;
    if pastor.status != Status::Inactive {
        return Err(ApiError::validation(
            "Only inactive pastors can be permanently deleted",
        ));
    }
    store.delete_pastor(id).await?;
    tracing::info!("Permanently deleted pastor {}", id);
    Ok(pastor.id)
}

pub async fn set_profile_image(store: &dyn Store, id: &str, url: String) -> Result<Pastor, ApiError> {
    let mut pastor = get_pastor(store, id).await?;
    pastor.profile_image = Some(url);
    pastor.updated_at = Some(Utc::now());
    store.put_pastor(&pastor).await?;
    Ok(pastor)
}
