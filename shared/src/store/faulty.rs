//! Test double wrapping [`MemoryStore`] with injectable misbehaviour.

use super::memory::MemoryStore;
use super::Store;
use crate::error::ApiError;
use crate::field_options::{FieldName, StoredOptions};
use crate::types::{Church, Invite, Pastor, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[derive(Default)]
pub struct FaultyStore {
    pub inner: MemoryStore,
    /// Name lookups never see records, like an eventually consistent index
    /// that has not caught up with this request's writes.
    pub stale_name_lookup: bool,
    pub fail_user_writes: bool,
}

#[async_trait]
impl Store for FaultyStore {
    async fn list_pastors(&self) -> Result<Vec<Pastor>, ApiError> {
        self.inner.list_pastors().await
    }

    async fn get_pastor(&self, id: &str) -> Result<Option<Pastor>, ApiError> {
        self.inner.get_pastor(id).await
    }

    async fn find_pastors_by_name(
        &self,
        first_name: &str,
        last_name: &str,
    ) -> Result<Vec<Pastor>, ApiError> {
        if self.stale_name_lookup {
            return Ok(Vec::new());
        }
        self.inner.find_pastors_by_name(first_name, last_name).await
    }

    async fn put_pastor(&self, pastor: &Pastor) -> Result<(), ApiError> {
        self.inner.put_pastor(pastor).await
    }

    async fn delete_pastor(&self, id: &str) -> Result<(), ApiError> {
        self.inner.delete_pastor(id).await
    }

    async fn list_churches(&self) -> Result<Vec<Church>, ApiError> {
        self.inner.list_churches().await
    }

    async fn get_church(&self, id: &str) -> Result<Option<Church>, ApiError> {
        self.inner.get_church(id).await
    }

    async fn put_church(&self, church: &Church) -> Result<(), ApiError> {
        self.inner.put_church(church).await
    }

    async fn delete_church(&self, id: &str) -> Result<(), ApiError> {
        self.inner.delete_church(id).await
    }

    async fn list_field_overrides(&self) -> Result<Vec<StoredOptions>, ApiError> {
        self.inner.list_field_overrides().await
    }

    async fn put_field_override(&self, stored: &StoredOptions) -> Result<(), ApiError> {
        self.inner.put_field_override(stored).await
    }

    async fn delete_field_override(&self, field: FieldName) -> Result<(), ApiError> {
        self.inner.delete_field_override(field).await
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, ApiError> {
        self.inner.get_user(user_id).await
    }

    async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        self.inner.list_users().await
    }

    async fn put_user(&self, user: &User) -> Result<(), ApiError> {
        if self.fail_user_writes {
            return Err(ApiError::Store("user table unavailable".to_string()));
        }
        self.inner.put_user(user).await
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), ApiError> {
        self.inner.delete_user(user_id).await
    }

    async fn get_invite(&self, code: &str) -> Result<Option<Invite>, ApiError> {
        self.inner.get_invite(code).await
    }

    async fn put_invite(&self, invite: &Invite) -> Result<(), ApiError> {
        self.inner.put_invite(invite).await
    }

    async fn consume_invite(
        &self,
        code: &str,
        used_by: &str,
        used_at: DateTime<Utc>,
    ) -> Result<(), ApiError> {
        self.inner.consume_invite(code, used_by, used_at).await
    }
}
