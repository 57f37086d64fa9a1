pub mod dynamo;
#[cfg(test)]
pub mod faulty;
pub mod memory;

use crate::error::ApiError;
use crate::field_options::{FieldName, StoredOptions};
use crate::types::{Church, Invite, Pastor, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Document storage for the directory. Every write is a single-item write;
/// there are no multi-record transactions.
#[async_trait]
pub trait Store: Send + Sync {
    // --- PASTORS ---
    async fn list_pastors(&self) -> Result<Vec<Pastor>, ApiError>;
    async fn get_pastor(&self, id: &str) -> Result<Option<Pastor>, ApiError>;
    /// All pastors (any status) whose first and last name match, ignoring case.
    async fn find_pastors_by_name(
        &self,
        first_name: &str,
        last_name: &str,
    ) -> Result<Vec<Pastor>, ApiError>;
    /// Create or replace.
    async fn put_pastor(&self, pastor: &Pastor) -> Result<(), ApiError>;
    async fn delete_pastor(&self, id: &str) -> Result<(), ApiError>;

    // --- CHURCHES ---
    async fn list_churches(&self) -> Result<Vec<Church>, ApiError>;
    async fn get_church(&self, id: &str) -> Result<Option<Church>, ApiError>;
    async fn put_church(&self, church: &Church) -> Result<(), ApiError>;
    async fn delete_church(&self, id: &str) -> Result<(), ApiError>;

    // --- FIELD OPTIONS ---
    async fn list_field_overrides(&self) -> Result<Vec<StoredOptions>, ApiError>;
    async fn put_field_override(&self, stored: &StoredOptions) -> Result<(), ApiError>;
    /// Deleting a missing override succeeds.
    async fn delete_field_override(&self, field: FieldName) -> Result<(), ApiError>;

    // --- USERS ---
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, ApiError>;
    async fn list_users(&self) -> Result<Vec<User>, ApiError>;
    async fn put_user(&self, user: &User) -> Result<(), ApiError>;
    async fn delete_user(&self, user_id: &str) -> Result<(), ApiError>;

    // --- INVITES ---
    async fn get_invite(&self, code: &str) -> Result<Option<Invite>, ApiError>;
    async fn put_invite(&self, invite: &Invite) -> Result<(), ApiError>;
    /// Flip a pending invite to used. Fails with `InvalidInvite` when the
    /// invite is missing or already consumed.
    async fn consume_invite(
        &self,
        code: &str,
        used_by: &str,
        used_at: DateTime<Utc>,
    ) -> Result<(), ApiError>;
}
