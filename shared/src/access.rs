use crate::error::ApiError;
use crate::store::Store;
use crate::types::Role;

/// The authenticated principal behind a request.
#[derive(Debug, Clone, PartialEq)]
pub struct Caller {
    pub user_id: String,
    pub role: Role,
}

impl Caller {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Resolve the caller's role from their user record.
///
/// The identity itself is verified upstream (API Gateway JWT authorizer), so a
/// subject without a directory record is still authenticated, with the plain
/// `user` role.
pub async fn authenticate(store: &dyn Store, user_id: Option<&str>) -> Result<Caller, ApiError> {
    let user_id = user_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or(ApiError::Unauthorized)?;

    let role = store
        .get_user(user_id)
        .await?
        .map(|user| user.role)
        .unwrap_or_default();

    Ok(Caller {
        user_id: user_id.to_string(),
        role,
    })
}

/// Gate for every mutating operation.
pub async fn require_admin(store: &dyn Store, user_id: Option<&str>) -> Result<Caller, ApiError> {
    let caller = authenticate(store, user_id).await?;
    if !caller.is_admin() {
        tracing::warn!("Access denied for {}: admin role required", caller.user_id);
        return Err(ApiError::Forbidden);
    }
    Ok(caller)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::types::User;
    use chrono::Utc;

    async fn store_with(user_id: &str, role: Role) -> MemoryStore {
        let store = MemoryStore::new();
        store
            .put_user(&User {
                user_id: user_id.to_string(),
                email: format!("{}@example.org", user_id),
                name: None,
                role,
                created_at: Utc::now(),
                last_login: None,
            })
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_missing_identity_is_unauthorized() {
        let store = MemoryStore::new();
        assert!(matches!(
            authenticate(&store, None).await.unwrap_err(),
            ApiError::Unauthorized
        ));
        assert!(matches!(
            require_admin(&store, Some("  ")).await.unwrap_err(),
            ApiError::Unauthorized
        ));
    }

    #[tokio::test]
    async fn test_unknown_subject_is_plain_user() {
        let store = MemoryStore::new();
        let caller = authenticate(&store, Some("sub-123")).await.unwrap();
        assert_eq!(caller.role, Role::User);
        assert!(matches!(
            require_admin(&store, Some("sub-123")).await.unwrap_err(),
            ApiError::Forbidden
        ));
    }

    #[tokio::test]
    async fn test_admin_passes_gate() {
        let store = store_with("boss", Role::Admin).await;
        let caller = require_admin(&store, Some("boss")).await.unwrap();
        assert!(caller.is_admin());
    }

    #[tokio::test]
    async fn test_user_record_role_is_enforced() {
        let store = store_with("member", Role::User).await;
        assert!(authenticate(&store, Some("member")).await.is_ok());
        assert!(matches!(
            require_admin(&store, Some("member")).await.unwrap_err(),
            ApiError::Forbidden
        ));
    }
}
