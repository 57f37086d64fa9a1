use crate::error::ApiError;
use crate::pastors::set_text;
use crate::store::Store;
use crate::types::{non_blank, Church, CreateChurchRequest, Status, UpdateChurchRequest};
use chrono::Utc;

#[derive(Debug, Default, Clone)]
pub struct ChurchFilter {
    pub status: Option<Status>,
    /// Case-insensitive substring over name and location.
    pub search: Option<String>,
}

impl ChurchFilter {
    fn matches(&self, church: &Church) -> bool {
        if self.status.is_some_and(|status| church.status != status) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                church.name.to_lowercase().contains(&term)
                    || church
                        .location
                        .as_deref()
                        .is_some_and(|l| l.to_lowercase().contains(&term))
            }
            _ => true,
        }
    }
}

fn member_count(value: i64) -> Result<u32, ApiError> {
    u32::try_from(value).map_err(|_| ApiError::validation("memberCount must be a non-negative number"))
}

fn income(value: f64) -> Result<f64, ApiError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ApiError::validation("income must be a non-negative number"))
    }
}

pub async fn list_churches(store: &dyn Store, filter: &ChurchFilter) -> Result<Vec<Church>, ApiError> {
    let mut churches: Vec<Church> = store
        .list_churches()
        .await?
        .into_iter()
        .filter(|c| filter.matches(c))
        .collect();
    churches.sort_by_key(|c| c.name.to_lowercase());
    Ok(churches)
}

pub async fn get_church(store: &dyn Store, id: &str) -> Result<Church, ApiError> {
    store
        .get_church(id)
        .await?
        .ok_or(ApiError::NotFound("Church"))
}

/// Create a church
pub async fn create_church(store: &dyn Store, body: &[u8]) -> Result<Church, ApiError> {
    let req: CreateChurchRequest = serde_json::from_slice(body)?;

    let name = non_blank(Some(req.name)).ok_or_else(|| ApiError::validation("Church name is required"))?;

    let church = Church {
        id: uuid::Uuid::new_v4().to_string(),
        name,
        location: non_blank(req.location),
        head_pastor: non_blank(req.head_pastor),
        head_pastor_id: non_blank(req.head_pastor_id),
        member_count: req.member_count.map(member_count).transpose()?,
        income: req.income.map(income).transpose()?,
        images: req.images.into_iter().filter(|url| !url.trim().is_empty()).collect(),
        status: req.status.unwrap_or_default(),
        created_at: Utc::now(),
        updated_at: None,
    };

    store.put_church(&church).await?;
    tracing::info!("Created church {} ({})", church.name, church.id);
    Ok(church)
}

/// Update a church. Only fields present in the body change.
pub async fn update_church(store: &dyn Store, id: &str, body: &[u8]) -> Result<Church, ApiError> {
    let req: UpdateChurchRequest = serde_json::from_slice(body)?;
    let mut church = get_church(store, id).await?;

    if let Some(name) = req.name {
        church.name = non_blank(Some(name)).ok_or_else(|| ApiError::validation("Church name is required"))?;
    }
    if let Some(count) = req.member_count {
        church.member_count = Some(member_count(count)?);
    }
    if let Some(value) = req.income {
        church.income = Some(income(value)?);
    }
    if let Some(images) = req.images {
        church.images = images.into_iter().filter(|url| !url.trim().is_empty()).collect();
    }
    if let Some(status) = req.status {
        church.status = status;
    }
    set_text(&mut church.location, req.location);
    set_text(&mut church.head_pastor, req.head_pastor);
    set_text(&mut church.head_pastor_id, req.head_pastor_id);

    church.updated_at = Some(Utc::now());
    store.put_church(&church).await?;
    Ok(church)
}

/// Soft delete: mark the church Inactive.
pub async fn deactivate_church(store: &dyn Store, id: &str) -> Result<Church, ApiError> {
    let mut church = get_church(store, id).await?;
    if church.status != Status::Inactive {
        church.status = Status::Inactive;
        church.updated_at = Some(Utc::now());
        store.put_church(&church).await?;
        tracing::info!("Deactivated church {}", id);
    }
    Ok(church)
}

/// Hard delete, allowed only for churches already soft-deleted.
pub async fn delete_church_permanently(store: &dyn Store, id: &str) -> Result<String, ApiError> {
    let church = get_church(store, id).await?;
    if church.status != Status::Inactive {
        return Err(ApiError::validation(
            "Only inactive churches can be permanently deleted",
        ));
    }
    store.delete_church(id).await?;
    tracing::info!("Permanently deleted church {}", id);
    Ok(church.id)
}

pub async fn add_image(store: &dyn Store, id: &str, url: String) -> Result<Church, ApiError> {
    let mut church = get_church(store, id).await?;
    church.images.push(url);
    church.updated_at = Some(Utc::now());
    store.put_church(&church).await?;
    Ok(church)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    #[tokio::test]
    async fn test_create_and_get() {
        let store = MemoryStore::new();
        let church = create_church(
            &store,
            br#"{"name":"Grace Chapel","location":"Accra","memberCount":120,"income":5000.0}"#,
        )
        .await
        .unwrap();
        assert_eq!(church.status, Status::Active);
        assert_eq!(church.member_count, Some(120));

        let fetched = get_church(&store, &church.id).await.unwrap();
        assert_eq!(fetched, church);
    }

    #[tokio::test]
    async fn test_create_validates_numbers_and_name() {
        let store = MemoryStore::new();
        for body in [
            &br#"{"name":""}"#[..],
            &br#"{"name":"X","memberCount":-1}"#[..],
            &br#"{"name":"X","income":-10}"#[..],
        ] {
            assert!(matches!(
                create_church(&store, body).await.unwrap_err(),
                ApiError::Validation(_)
            ));
        }
        assert!(store.list_churches().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_and_images() {
        let store = MemoryStore::new();
        let church = create_church(&store, br#"{"name":"Bethel","headPastor":"Rev. A"}"#)
            .await
            .unwrap();
        let updated = update_church(&store, &church.id, br#"{"location":"Kumasi","headPastor":""}"#)
            .await
            .unwrap();
        assert_eq!(updated.location.as_deref(), Some("Kumasi"));
        assert_eq!(updated.head_pastor, None);

        let with_image = add_image(&store, &church.id, "https://cdn/x.jpg".to_string())
            .await
            .unwrap();
        assert_eq!(with_image.images, vec!["https://cdn/x.jpg"]);
    }

    #[tokio::test]
    async fn test_soft_then_permanent_delete() {
        let store = MemoryStore::new();
        let church = create_church(&store, br#"{"name":"Zion"}"#).await.unwrap();
        assert!(delete_church_permanently(&store, &church.id).await.is_err());

        deactivate_church(&store, &church.id).await.unwrap();
        let active = list_churches(
            &store,
            &ChurchFilter {
                status: Some(Status::Active),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(active.is_empty());

        delete_church_permanently(&store, &church.id).await.unwrap();
        assert!(matches!(
            get_church(&store, &church.id).await.unwrap_err(),
            ApiError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_list_search_and_order() {
        let store = MemoryStore::new();
        create_church(&store, br#"{"name":"zion temple"}"#).await.unwrap();
        create_church(&store, br#"{"name":"Abundant Life","location":"Tema"}"#)
            .await
            .unwrap();
        let all = list_churches(&store, &ChurchFilter::default()).await.unwrap();
        assert_eq!(all[0].name, "Abundant Life");

        let tema = list_churches(
            &store,
            &ChurchFilter {
                search: Some("TEMA".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(tema.len(), 1);
    }
}
