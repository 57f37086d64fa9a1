//! Login, signup and token refresh against the Cognito app client.

use crate::config::CognitoConfig;
use crate::error::ApiError;
use crate::store::Store;
use crate::types::{non_blank, Invite, Role, User};
use aws_sdk_cognitoidentityprovider::error::ProvideErrorMetadata;
use aws_sdk_cognitoidentityprovider::types::{AttributeType, AuthFlowType, AuthenticationResultType};
use aws_sdk_cognitoidentityprovider::Client as CognitoClient;
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub invite_code: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
    /// Cognito username (the subject) the refresh token was issued to.
    #[serde(alias = "email")]
    pub username: String,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub id_token: String,
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub expires_in: i32,
}

impl TokenResponse {
    fn from_result(result: &AuthenticationResultType) -> Self {
        Self {
            id_token: result.id_token().unwrap_or_default().to_string(),
            access_token: result.access_token().unwrap_or_default().to_string(),
            refresh_token: result.refresh_token().map(str::to_string),
            expires_in: result.expires_in(),
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub user_id: String,
    pub email: String,
    pub role: Role,
    pub confirmed: bool,
}

type HmacSha256 = Hmac<Sha256>;

/// SECRET_HASH for an app client with a secret: base64(HMAC-SHA256(secret, username + client_id)).
pub fn compute_secret_hash(username: &str, client_id: &str, client_secret: &str) -> Result<String, ApiError> {
    let mut mac = HmacSha256::new_from_slice(client_secret.as_bytes())
        .map_err(|e| ApiError::Internal(format!("Invalid client secret: {}", e)))?;
    mac.update(username.as_bytes());
    mac.update(client_id.as_bytes());
    Ok(general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}

fn cognito_config(cognito: Option<&CognitoConfig>) -> Result<&CognitoConfig, ApiError> {
    cognito.ok_or_else(|| {
        tracing::error!("Cognito client is not configured");
        ApiError::Internal("Authentication is not configured".to_string())
    })
}

/// Map a Cognito error code to something the login form can show.
pub fn login_error_message(code: Option<&str>) -> &'static str {
    match code {
        Some("NotAuthorizedException") => "Incorrect email or password",
        Some("UserNotConfirmedException") => "Please verify your email before logging in",
        Some("UserNotFoundException") => "No account found with this email",
        Some("PasswordResetRequiredException") => "Password reset required",
        Some("TooManyRequestsException") => "Too many login attempts. Please try again later",
        _ => "Login failed. Please check your credentials",
    }
}

pub fn signup_error_message(code: Option<&str>) -> &'static str {
    match code {
        Some("InvalidPasswordException") => {
            "Password must contain at least 8 characters with uppercase, lowercase, number, and special character"
        }
        Some("UsernameExistsException") => "An account with this email already exists",
        Some("InvalidParameterException") => "Invalid email or password format",
        _ => "Signup failed. Please check your details and try again",
    }
}

pub async fn login(
    client: &CognitoClient,
    cognito: Option<&CognitoConfig>,
    body: &[u8],
) -> Result<TokenResponse, ApiError> {
    let cognito = cognito_config(cognito)?;
    let req: LoginRequest = serde_json::from_slice(body)?;
    let email = req.email.trim();
    tracing::info!("Authenticating user: {}", email);

    let secret_hash = compute_secret_hash(email, &cognito.client_id, &cognito.client_secret)?;
    let output = client
        .initiate_auth()
        .auth_flow(AuthFlowType::UserPasswordAuth)
        .client_id(&cognito.client_id)
        .auth_parameters("USERNAME", email)
        .auth_parameters("PASSWORD", &req.password)
        .auth_parameters("SECRET_HASH", secret_hash)
        .send()
        .await
        .map_err(|e| {
            tracing::error!("Cognito authentication error: {:?}", e);
            ApiError::AuthenticationFailed(login_error_message(e.code()).to_string())
        })?;

    let result = output.authentication_result().ok_or_else(|| {
        tracing::error!("No authentication result returned for {}", email);
        ApiError::AuthenticationFailed("No authentication result returned".to_string())
    })?;
    tracing::info!("Authentication successful for user: {}", email);
    Ok(TokenResponse::from_result(result))
}

pub async fn refresh(
    client: &CognitoClient,
    cognito: Option<&CognitoConfig>,
    body: &[u8],
) -> Result<TokenResponse, ApiError> {
    let cognito = cognito_config(cognito)?;
    let req: RefreshRequest = serde_json::from_slice(body)?;
    if req.refresh_token.trim().is_empty() {
        return Err(ApiError::validation("refreshToken is required"));
    }

    let secret_hash = compute_secret_hash(req.username.trim(), &cognito.client_id, &cognito.client_secret)?;
    let output = client
        .initiate_auth()
        .auth_flow(AuthFlowType::RefreshTokenAuth)
        .client_id(&cognito.client_id)
        .auth_parameters("REFRESH_TOKEN", req.refresh_token.trim())
        .auth_parameters("SECRET_HASH", secret_hash)
        .send()
        .await
        .map_err(|e| {
            tracing::error!("Cognito token refresh error: {:?}", e);
            ApiError::AuthenticationFailed("Session expired. Please log in again".to_string())
        })?;

    let result = output.authentication_result().ok_or_else(|| {
        ApiError::AuthenticationFailed("No authentication result returned".to_string())
    })?;
    Ok(TokenResponse::from_result(result))
}

/// Invite-gated signup. The invite is checked before Cognito is touched and
/// consumed only once the account exists; the new user record takes the
/// invite's role.
pub async fn signup(
    client: &CognitoClient,
    cognito: Option<&CognitoConfig>,
    store: &dyn Store,
    body: &[u8],
) -> Result<SignupResponse, ApiError> {
    let cognito = cognito_config(cognito)?;
    let req: SignupRequest = serde_json::from_slice(body)?;
    let email = req.email.trim().to_lowercase();
    tracing::info!("Signing up user: {}", email);

    let invite = crate::invites::redeemable_invite(store, &req.invite_code, &email).await?;

    let secret_hash = compute_secret_hash(&email, &cognito.client_id, &cognito.client_secret)?;
    let email_attribute = AttributeType::builder()
        .name("email")
        .value(&email)
        .build()
        .map_err(|e| ApiError::Internal(format!("Failed to build user attribute: {}", e)))?;

    let output = client
        .sign_up()
        .client_id(&cognito.client_id)
        .username(&email)
        .password(&req.password)
        .secret_hash(secret_hash)
        .user_attributes(email_attribute)
        .send()
        .await
        .map_err(|e| {
            tracing::error!("Cognito signup error: {:?}", e);
            ApiError::validation(signup_error_message(e.code()))
        })?;
    let user_id = output.user_sub().to_string();

    // The invite proves the address, so skip the verification email when possible.
    let mut confirmed = output.user_confirmed();
    match cognito.user_pool_id.as_deref() {
        Some(pool_id) if !confirmed => {
            match client
                .admin_confirm_sign_up()
                .user_pool_id(pool_id)
                .username(&email)
                .send()
                .await
            {
                Ok(_) => {
                    confirmed = true;
                    tracing::info!("User auto-confirmed: {}", email);
                }
                Err(e) => tracing::error!("Failed to auto-confirm user {}: {:?}", email, e),
            }
        }
        None => tracing::warn!("COGNITO_USER_POOL_ID not set; skipping auto-confirm"),
        _ => {}
    }

    let name = non_blank(req.name);
    let user = finish_signup(store, &invite, &user_id, &email, name, Utc::now()).await?;
    tracing::info!("Signup complete for {} as {}", email, user.role.as_str());

    Ok(SignupResponse {
        user_id,
        email,
        role: user.role,
        confirmed,
    })
}

/// Write the directory user for a freshly created account, then mark the
/// invite used. A failed user write leaves the invite pending so the code can
/// be retried; a failed consume removes the user record again.
async fn finish_signup(
    store: &dyn Store,
    invite: &Invite,
    user_id: &str,
    email: &str,
    name: Option<String>,
    now: DateTime<Utc>,
) -> Result<User, ApiError> {
    let user = User {
        user_id: user_id.to_string(),
        email: email.to_string(),
        name,
        role: invite.role,
        created_at: now,
        last_login: None,
    };

    if let Err(e) = store.put_user(&user).await {
        tracing::error!(
            "Failed to store user {} for invite {} after Cognito signup: {}",
            user_id,
            invite.code,
            e
        );
        return Err(e);
    }

    if let Err(e) = store.consume_invite(&invite.code, user_id, now).await {
        tracing::error!(
            "Failed to consume invite {} for user {}: {}",
            invite.code,
            user_id,
            e
        );
        if let Err(cleanup) = store.delete_user(user_id).await {
            tracing::error!("Failed to remove user {} after invite error: {}", user_id, cleanup);
        }
        return Err(e);
    }

    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::faulty::FaultyStore;
    use crate::store::memory::MemoryStore;
    use crate::types::InviteStatus;

    #[test]
    fn test_secret_hash_is_base64_hmac() {
        let hash = compute_secret_hash("user@example.com", "client", "secret").unwrap();
        let raw = general_purpose::STANDARD.decode(&hash).unwrap();
        assert_eq!(raw.len(), 32);
        assert_eq!(
            hash,
            compute_secret_hash("user@example.com", "client", "secret").unwrap()
        );
        assert_ne!(
            hash,
            compute_secret_hash("other@example.com", "client", "secret").unwrap()
        );
    }

    #[test]
    fn test_friendly_messages() {
        assert_eq!(
            login_error_message(Some("NotAuthorizedException")),
            "Incorrect email or password"
        );
        assert_eq!(
            login_error_message(None),
            "Login failed. Please check your credentials"
        );
        assert_eq!(
            signup_error_message(Some("UsernameExistsException")),
            "An account with this email already exists"
        );
    }

    #[tokio::test]
    async fn test_missing_cognito_config_is_internal_error() {
        let conf = aws_sdk_cognitoidentityprovider::Config::builder()
            .behavior_version(aws_sdk_cognitoidentityprovider::config::BehaviorVersion::latest())
            .region(aws_sdk_cognitoidentityprovider::config::Region::new("us-east-1"))
            .build();
        let client = CognitoClient::from_conf(conf);
        let err = login(&client, None, br#"{"email":"a@b.c","password":"x"}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Internal(_)));
    }

    #[test]
    fn test_refresh_request_accepts_email_alias() {
        let req: RefreshRequest =
            serde_json::from_slice(br#"{"refreshToken":"t","email":"a@b.c"}"#).unwrap();
        assert_eq!(req.username, "a@b.c");
    }

    fn pending_invite(code: &str) -> Invite {
        let now = Utc::now();
        Invite {
            code: code.to_string(),
            email: "new@example.com".to_string(),
            role: Role::Admin,
            status: InviteStatus::Pending,
            created_by: "admin-1".to_string(),
            created_at: now,
            expires_at: now + chrono::Duration::days(7),
            used_by: None,
            used_at: None,
        }
    }

    #[tokio::test]
    async fn test_finish_signup_stores_user_and_consumes_invite() {
        let store = MemoryStore::default();
        let invite = pending_invite("code-1");
        store.put_invite(&invite).await.unwrap();

        let user = finish_signup(&store, &invite, "sub-1", "new@example.com", None, Utc::now())
            .await
            .unwrap();
        assert_eq!(user.role, Role::Admin);
        assert!(store.get_user("sub-1").await.unwrap().is_some());
        let stored = store.get_invite("code-1").await.unwrap().unwrap();
        assert_eq!(stored.status, InviteStatus::Used);
        assert_eq!(stored.used_by.as_deref(), Some("sub-1"));
    }

    #[tokio::test]
    async fn test_failed_user_write_keeps_invite_pending() {
        let store = FaultyStore {
            fail_user_writes: true,
            ..Default::default()
        };
        let invite = pending_invite("code-2");
        store.put_invite(&invite).await.unwrap();

        let err = finish_signup(&store, &invite, "sub-2", "new@example.com", None, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Store(_)));
        let stored = store.get_invite("code-2").await.unwrap().unwrap();
        assert_eq!(stored.status, InviteStatus::Pending);
        assert!(stored.used_by.is_none());
    }

    #[tokio::test]
    async fn test_used_invite_leaves_no_user_record() {
        let store = MemoryStore::default();
        let invite = pending_invite("code-3");
        store.put_invite(&invite).await.unwrap();
        store
            .consume_invite("code-3", "someone-else", Utc::now())
            .await
            .unwrap();

        let err = finish_signup(&store, &invite, "sub-3", "new@example.com", None, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidInvite(_)));
        assert!(store.get_user("sub-3").await.unwrap().is_none());
    }
}
