use super::Store;
use crate::error::ApiError;
use crate::field_options::{FieldName, StoredOptions};
use crate::types::{name_key, Church, Invite, InviteStatus, Pastor, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Tables {
    pastors: BTreeMap<String, Pastor>,
    churches: BTreeMap<String, Church>,
    field_overrides: HashMap<FieldName, StoredOptions>,
    users: BTreeMap<String, User>,
    invites: HashMap<String, Invite>,
}

/// In-process store used by tests and by `STORE_BACKEND=memory` local runs.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, ApiError> {
        self.tables
            .lock()
            .map_err(|_| ApiError::Store("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_pastors(&self) -> Result<Vec<Pastor>, ApiError> {
        Ok(self.tables()?.pastors.values().cloned().collect())
    }

    async fn get_pastor(&self, id: &str) -> Result<Option<Pastor>, ApiError> {
        Ok(self.tables()?.pastors.get(id).cloned())
    }

    async fn find_pastors_by_name(
        &self,
        first_name: &str,
        last_name: &str,
    ) -> Result<Vec<Pastor>, ApiError> {
        let key = name_key(first_name, last_name);
        Ok(self
            .tables()?
            .pastors
            .values()
            .filter(|p| p.name_key() == key)
            .cloned()
            .collect())
    }

    async fn put_pastor(&self, pastor: &Pastor) -> Result<(), ApiError> {
        self.tables()?
            .pastors
            .insert(pastor.id.clone(), pastor.clone());
        Ok(())
    }

    async fn delete_pastor(&self, id: &str) -> Result<(), ApiError> {
        self.tables()?.pastors.remove(id);
        Ok(())
    }

    async fn list_churches(&self) -> Result<Vec<Church>, ApiError> {
        Ok(self.tables()?.churches.values().cloned().collect())
    }

    async fn get_church(&self, id: &str) -> Result<Option<Church>, ApiError> {
        Ok(self.tables()?.churches.get(id).cloned())
    }

    async fn put_church(&self, church: &Church) -> Result<(), ApiError> {
        self.tables()?
            .churches
            .insert(church.id.clone(), church.clone());
        Ok(())
    }

    async fn delete_church(&self, id: &str) -> Result<(), ApiError> {
        self.tables()?.churches.remove(id);
        Ok(())
    }

    async fn list_field_overrides(&self) -> Result<Vec<StoredOptions>, ApiError> {
        Ok(self.tables()?.field_overrides.values().cloned().collect())
    }

    async fn put_field_override(&self, stored: &StoredOptions) -> Result<(), ApiError> {
        self.tables()?
            .field_overrides
            .insert(stored.field, stored.clone());
        Ok(())
    }

    async fn delete_field_override(&self, field: FieldName) -> Result<(), ApiError> {
        self.tables()?.field_overrides.remove(&field);
        Ok(())
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, ApiError> {
        Ok(self.tables()?.users.get(user_id).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        Ok(self.tables()?.users.values().cloned().collect())
    }

    async fn put_user(&self, user: &User) -> Result<(), ApiError> {
        self.tables()?
            .users
            .insert(user.user_id.clone(), user.clone());
        Ok(())
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), ApiError> {
        self.tables()?.users.remove(user_id);
        Ok(())
    }

    async fn get_invite(&self, code: &str) -> Result<Option<Invite>, ApiError> {
        Ok(self.tables()?.invites.get(code).cloned())
    }

    async fn put_invite(&self, invite: &Invite) -> Result<(), ApiError> {
        self.tables()?
            .invites
            .insert(invite.code.clone(), invite.clone());
        Ok(())
    }

    async fn consume_invite(
        &self,
        code: &str,
        used_by: &str,
        used_at: DateTime<Utc>,
    ) -> Result<(), ApiError> {
        let mut tables = self.tables()?;
        match tables.invites.get_mut(code) {
            Some(invite) if invite.status == InviteStatus::Pending => {
                invite.status = InviteStatus::Used;
                invite.used_by = Some(used_by.to_string());
                invite.used_at = Some(used_at);
                Ok(())
            }
            Some(_) => Err(ApiError::InvalidInvite(
                "Invite code has already been used".to_string(),
            )),
            None => Err(ApiError::InvalidInvite("Invite code not found".to_string())),
        }
    }
}
