use crate::access::Caller;
use crate::error::ApiError;
use crate::store::Store;
use crate::types::{non_blank, Role, UpdateUserRequest, User};
use chrono::Utc;

/// Current user. Every fetch stamps `last_login`.
pub async fn get_me(store: &dyn Store, caller: &Caller) -> Result<User, ApiError> {
    let mut user = store
        .get_user(&caller.user_id)
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    user.last_login = Some(Utc::now());
    if let Err(e) = store.put_user(&user).await {
        // Not worth failing the read over.
        tracing::warn!("Failed to stamp last login for {}: {}", user.user_id, e);
    }
    Ok(user)
}

pub async fn list_users(store: &dyn Store) -> Result<Vec<User>, ApiError> {
    let mut users = store.list_users().await?;
    users.sort_by(|a, b| a.email.to_lowercase().cmp(&b.email.to_lowercase()));
    Ok(users)
}

/// Rename a user or change their role. Admins cannot demote themselves, so
/// the directory always keeps at least the admin making the change.
pub async fn update_user(
    store: &dyn Store,
    caller: &Caller,
    user_id: &str,
    body: &[u8],
) -> Result<User, ApiError> {
    let req: UpdateUserRequest = serde_json::from_slice(body)?;
    let mut user = store
        .get_user(user_id)
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    if let Some(role) = req.role {
        if user_id == caller.user_id && role != Role::Admin {
            return Err(ApiError::validation("You cannot remove your own admin role"));
        }
        if role != user.role {
            tracing::info!(
                "Role of {} changed from {} to {} by {}",
                user_id,
                user.role.as_str(),
                role.as_str(),
                caller.user_id
            );
        }
        user.role = role;
    }
    if let Some(name) = req.name {
        user.name = non_blank(Some(name));
    }

    store.put_user(&user).await?;
    Ok(user)
}

/// Remove a user's directory record. The identity provider account is left
/// alone; without a record the account only has the plain user role.
pub async fn delete_user(store: &dyn Store, caller: &Caller, user_id: &str) -> Result<String, ApiError> {
    if user_id == caller.user_id {
        return Err(ApiError::validation("You cannot delete your own account"));
    }
    store
        .get_user(user_id)
        .await?
        .ok_or(ApiError::NotFound("User"))?;
    store.delete_user(user_id).await?;
    tracing::info!("User {} deleted by {}", user_id, caller.user_id);
    Ok(user_id.to_string())
}
