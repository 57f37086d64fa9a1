use std::env;

const DEFAULT_TABLE_NAME: &str = "church-directory";
const DEFAULT_BUCKET_NAME: &str = "church-directory-media";
const DEFAULT_FRONTEND_URL: &str = "http://localhost:5173";
const DEFAULT_SENDER_EMAIL: &str = "noreply@churchdirectory.app";
const DEFAULT_INVITE_EXPIRY_DAYS: i64 = 7;
const DEFAULT_MAX_IMPORT_ROWS: usize = 5_000;

/// Which store implementation the lambda talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Dynamo,
    /// In-process tables, for running the handler locally without AWS.
    Memory,
}

/// Cognito app client credentials. Auth routes are disabled when absent.
#[derive(Debug, Clone)]
pub struct CognitoConfig {
    pub client_id: String,
    pub client_secret: String,
    pub user_pool_id: Option<String>,
}

/// Runtime configuration, read once from the environment at cold start.
#[derive(Debug, Clone)]
pub struct Config {
    pub table_name: String,
    pub bucket_name: String,
    pub cognito: Option<CognitoConfig>,
    pub frontend_url: String,
    pub sender_email: String,
    pub invite_expiry_days: i64,
    pub max_import_rows: usize,
    /// Trust the `X-User-Id` header as the caller identity (local development only).
    pub allow_user_id_header: bool,
    pub store_backend: StoreBackend,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let cognito = match (get("COGNITO_CLIENT_ID"), get("COGNITO_CLIENT_SECRET")) {
            (Some(client_id), Some(client_secret)) => Some(CognitoConfig {
                client_id,
                client_secret,
                user_pool_id: get("COGNITO_USER_POOL_ID"),
            }),
            _ => None,
        };

        let invite_expiry_days = get("INVITE_EXPIRY_DAYS")
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|days| *days > 0)
            .unwrap_or(DEFAULT_INVITE_EXPIRY_DAYS);

        let max_import_rows = get("MAX_IMPORT_ROWS")
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|rows| *rows > 0)
            .unwrap_or(DEFAULT_MAX_IMPORT_ROWS);

        let allow_user_id_header = get("ALLOW_USER_ID_HEADER")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let store_backend = match get("STORE_BACKEND").as_deref() {
            Some("memory") => StoreBackend::Memory,
            _ => StoreBackend::Dynamo,
        };

        Self {
            table_name: get("TABLE_NAME").unwrap_or_else(|| DEFAULT_TABLE_NAME.to_string()),
            bucket_name: get("BUCKET_NAME").unwrap_or_else(|| DEFAULT_BUCKET_NAME.to_string()),
            cognito,
            frontend_url: get("FRONTEND_URL").unwrap_or_else(|| DEFAULT_FRONTEND_URL.to_string()),
            sender_email: get("SENDER_EMAIL").unwrap_or_else(|| DEFAULT_SENDER_EMAIL.to_string()),
            invite_expiry_days,
            max_import_rows,
            allow_user_id_header,
            store_backend,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
