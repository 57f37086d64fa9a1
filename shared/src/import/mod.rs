//! Bulk pastor import from a spreadsheet.
//!
//! Rows are processed strictly in order, one insert at a time. A row either
//! lands in the store or is reported with the reason it was rejected; a bad
//! row never stops the rows after it. Rows inserted before a request timeout
//! stay inserted.

pub mod columns;
pub mod sheet;

use crate::error::ApiError;
use crate::pastors;
use crate::store::Store;
use crate::types::{Pastor, Status};
use columns::{row_to_request, ColumnMap};
use serde::Serialize;
use sheet::Sheet;
use std::collections::{BTreeMap, HashMap};

pub use sheet::SheetFormat;

#[derive(Debug, Serialize, Default, Clone, PartialEq)]
pub struct ImportReport {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub errors: Vec<RowFailure>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct RowFailure {
    /// 1-based position among the data rows (the header is not counted).
    pub row: usize,
    pub error: String,
    /// The row as uploaded, keyed by header.
    pub data: BTreeMap<String, String>,
}

/// Parse an uploaded file and import every data row.
pub async fn import_file(
    store: &dyn Store,
    data: &[u8],
    format: SheetFormat,
    max_rows: usize,
) -> Result<ImportReport, ApiError> {
    let sheet = Sheet::parse(data, format)?;
    import_sheet(store, &sheet, max_rows).await
}

pub async fn import_sheet(
    store: &dyn Store,
    sheet: &Sheet,
    max_rows: usize,
) -> Result<ImportReport, ApiError> {
    let columns = ColumnMap::from_headers(&sheet.headers)?;
    if sheet.rows.len() > max_rows {
        return Err(ApiError::validation(format!(
            "File has {} rows; at most {} can be imported at once",
            sheet.rows.len(),
            max_rows
        )));
    }

    let churches = church_ids_by_name(store).await?;
    let mut existing = ExistingPastors::load(store).await?;

    let mut report = ImportReport {
        total: sheet.rows.len(),
        ..Default::default()
    };

    for (idx, row) in sheet.rows.iter().enumerate() {
        match import_row(store, &columns, &churches, &mut existing, row).await {
            Ok(()) => report.successful += 1,
            Err(error) => {
                report.failed += 1;
                report.errors.push(RowFailure {
                    row: idx + 1,
                    error,
                    data: row_data(&sheet.headers, row),
                });
            }
        }
    }

    tracing::info!(
        "Pastor import finished: {} rows, {} imported, {} failed",
        report.total,
        report.successful,
        report.failed
    );
    Ok(report)
}

/// Every pastor known to this import, keyed by name. Loaded once and kept
/// current with each insert, so later rows see earlier ones without another
/// read of the store.
struct ExistingPastors {
    by_name: HashMap<String, Vec<Pastor>>,
}

impl ExistingPastors {
    async fn load(store: &dyn Store) -> Result<Self, ApiError> {
        let mut by_name: HashMap<String, Vec<Pastor>> = HashMap::new();
        for pastor in store.list_pastors().await? {
            by_name.entry(pastor.name_key()).or_default().push(pastor);
        }
        Ok(Self { by_name })
    }

    fn find_duplicate(&self, candidate: &Pastor) -> Option<&Pastor> {
        self.by_name
            .get(&candidate.name_key())?
            .iter()
            .find(|existing| pastors::is_duplicate(existing, candidate))
    }

    fn insert(&mut self, pastor: Pastor) {
        self.by_name.entry(pastor.name_key()).or_default().push(pastor);
    }
}

async fn import_row(
    store: &dyn Store,
    columns: &ColumnMap,
    churches: &HashMap<String, String>,
    existing: &mut ExistingPastors,
    row: &[String],
) -> Result<(), String> {
    let mut req = row_to_request(columns, row)?;

    if let Some(id) = req
        .church_name
        .as_deref()
        .and_then(|name| churches.get(&name.to_lowercase()))
    {
        req.church_id = Some(id.clone());
    }

    let pastor = pastors::new_pastor(req).map_err(|e| e.to_string())?;

    if pastor.status == Status::Active && existing.find_duplicate(&pastor).is_some() {
        return Err(pastors::duplicate_message(&pastor));
    }

    store.put_pastor(&pastor).await.map_err(|e| {
        tracing::error!("Failed to insert imported pastor {}: {}", pastor.full_name(), e);
        e.to_string()
    })?;
    existing.insert(pastor);
    Ok(())
}

async fn church_ids_by_name(store: &dyn Store) -> Result<HashMap<String, String>, ApiError> {
    Ok(store
        .list_churches()
        .await?
        .into_iter()
        .map(|church| (church.name.trim().to_lowercase(), church.id))
        .collect())
}

fn row_data(headers: &[String], row: &[String]) -> BTreeMap<String, String> {
    headers
        .iter()
        .enumerate()
        .filter(|(_, header)| !header.is_empty())
        .map(|(idx, header)| (header.clone(), row.get(idx).cloned().unwrap_or_default()))
        .collect()
}
