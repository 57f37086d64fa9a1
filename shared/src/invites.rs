use crate::access::Caller;
use crate::config::Config;
use crate::error::ApiError;
use crate::store::Store;
use crate::types::{CreateInviteRequest, Invite, InviteStatus};
use aws_sdk_sesv2::Client as SesClient;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

const MAX_EXPIRY_DAYS: i64 = 90;

/// What the public lookup reveals about an invite.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InviteSummary {
    pub code: String,
    pub email: String,
    pub status: InviteStatus,
    pub expires_at: DateTime<Utc>,
    pub expired: bool,
}

impl InviteSummary {
    fn of(invite: Invite, now: DateTime<Utc>) -> Self {
        Self {
            expired: invite.expires_at < now,
            code: invite.code,
            email: invite.email,
            status: invite.status,
            expires_at: invite.expires_at,
        }
    }
}

/// Build an invite record without persisting it.
pub fn new_invite(
    req: CreateInviteRequest,
    created_by: &str,
    default_expiry_days: i64,
    now: DateTime<Utc>,
) -> Result<Invite, ApiError> {
    let email = req.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::validation("A valid email address is required"));
    }

    let days = req.expires_days.unwrap_or(default_expiry_days);
    if !(1..=MAX_EXPIRY_DAYS).contains(&days) {
        return Err(ApiError::validation(format!(
            "expiresDays must be between 1 and {}",
            MAX_EXPIRY_DAYS
        )));
    }

    Ok(Invite {
        code: Uuid::new_v4().to_string(),
        email,
        role: req.role,
        status: InviteStatus::Pending,
        created_by: created_by.to_string(),
        created_at: now,
        expires_at: now + Duration::days(days),
        used_by: None,
        used_at: None,
    })
}

/// Create an invite and email it. A failed email is logged only: the code is
/// still valid and can be shared by hand.
pub async fn create_invite(
    store: &dyn Store,
    ses_client: &SesClient,
    config: &Config,
    caller: &Caller,
    body: &[u8],
) -> Result<Invite, ApiError> {
    let req: CreateInviteRequest = serde_json::from_slice(body)?;
    let invite = new_invite(req, &caller.user_id, config.invite_expiry_days, Utc::now())?;
    store.put_invite(&invite).await?;
    tracing::info!(
        "Invite {} created for {} ({}) by {}",
        invite.code,
        invite.email,
        invite.role.as_str(),
        caller.user_id
    );

    match crate::email::send_invite_email(
        ses_client,
        &config.sender_email,
        &config.frontend_url,
        &invite,
    )
    .await
    {
        Ok(()) => tracing::info!("Invite email sent to {}", invite.email),
        Err(e) => tracing::error!("Failed to send invite email to {}: {}", invite.email, e),
    }

    Ok(invite)
}

/// Public lookup so the signup page can pre-fill the email.
pub async fn get_invite(store: &dyn Store, code: &str) -> Result<InviteSummary, ApiError> {
    let invite = store
        .get_invite(code)
        .await?
        .ok_or(ApiError::NotFound("Invite"))?;
    Ok(InviteSummary::of(invite, Utc::now()))
}

/// Check an invite can be redeemed by `email` at `now`.
pub fn validate_invite(invite: &Invite, email: &str, now: DateTime<Utc>) -> Result<(), ApiError> {
    if invite.status != InviteStatus::Pending {
        return Err(ApiError::InvalidInvite(
            "Invite code has already been used".to_string(),
        ));
    }
    if !invite.email.eq_ignore_ascii_case(email.trim()) {
        return Err(ApiError::InvalidInvite(
            "Email does not match invite".to_string(),
        ));
    }
    if invite.expires_at < now {
        return Err(ApiError::InvalidInvite("Invite code has expired".to_string()));
    }
    Ok(())
}

/// Fetch and validate in one step.
pub async fn redeemable_invite(store: &dyn Store, code: &str, email: &str) -> Result<Invite, ApiError> {
    let invite = store
        .get_invite(code.trim())
        .await?
        .ok_or_else(|| ApiError::InvalidInvite("Invite code not found".to_string()))?;
    validate_invite(&invite, email, Utc::now())?;
    Ok(invite)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::types::Role;

    fn request(email: &str, days: Option<i64>) -> CreateInviteRequest {
        CreateInviteRequest {
            email: email.to_string(),
            role: Role::User,
            expires_days: days,
        }
    }

    #[test]
    fn test_new_invite_defaults() {
        let now = Utc::now();
        let invite = new_invite(request(" Grace@Church.org ", None), "admin", 7, now).unwrap();
        assert_eq!(invite.email, "grace@church.org");
        assert_eq!(invite.status, InviteStatus::Pending);
        assert_eq!(invite.expires_at - invite.created_at, Duration::days(7));
        assert_eq!(invite.role, Role::User);
    }

    #[test]
    fn test_new_invite_rejects_bad_input() {
        let now = Utc::now();
        assert!(new_invite(request("not-an-email", None), "a", 7, now).is_err());
        assert!(new_invite(request("a@b.c", Some(0)), "a", 7, now).is_err());
        assert!(new_invite(request("a@b.c", Some(365)), "a", 7, now).is_err());
    }

    #[test]
    fn test_validate_invite() {
        let now = Utc::now();
        let mut invite = new_invite(request("grace@church.org", Some(1)), "a", 7, now).unwrap();

        assert!(validate_invite(&invite, "GRACE@church.org", now).is_ok());
        assert!(matches!(
            validate_invite(&invite, "other@church.org", now).unwrap_err(),
            ApiError::InvalidInvite(_)
        ));
        assert!(validate_invite(&invite, "grace@church.org", now + Duration::days(2)).is_err());

        invite.status = InviteStatus::Used;
        let err = validate_invite(&invite, "grace@church.org", now).unwrap_err();
        assert!(err.to_string().contains("already been used"));
    }

    #[tokio::test]
    async fn test_lookup_and_single_use() {
        let store = MemoryStore::new();
        let invite = new_invite(request("grace@church.org", None), "a", 7, Utc::now()).unwrap();
        store.put_invite(&invite).await.unwrap();

        let summary = get_invite(&store, &invite.code).await.unwrap();
        assert_eq!(summary.email, "grace@church.org");
        assert!(!summary.expired);

        redeemable_invite(&store, &invite.code, "grace@church.org")
            .await
            .unwrap();
        store
            .consume_invite(&invite.code, "sub-1", Utc::now())
            .await
            .unwrap();
        assert!(redeemable_invite(&store, &invite.code, "grace@church.org")
            .await
            .is_err());
        assert!(store
            .consume_invite(&invite.code, "sub-2", Utc::now())
            .await
            .is_err());

        assert!(matches!(
            get_invite(&store, "missing").await.unwrap_err(),
            ApiError::NotFound(_)
        ));
    }
}
