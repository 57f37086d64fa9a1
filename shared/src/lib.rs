pub mod access;
pub mod auth;
pub mod churches;
pub mod config;
pub mod email;
pub mod error;
pub mod field_options;
pub mod image_processing;
pub mod images;
pub mod import;
pub mod invites;
pub mod pastors;
pub mod response;
pub mod store;
pub mod types;
pub mod users;

use aws_sdk_cognitoidentityprovider::Client as CognitoClient;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_sesv2::Client as SesClient;
use config::Config;
use std::sync::Arc;
use store::Store;

/// Shared application state, built once per cold start.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub cognito_client: CognitoClient,
    pub s3_client: S3Client,
    pub ses_client: SesClient,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn Store>,
        cognito_client: CognitoClient,
        s3_client: S3Client,
        ses_client: SesClient,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            store,
            cognito_client,
            s3_client,
            ses_client,
        })
    }
}
