use aws_sdk_cognitoidentityprovider::Client as CognitoClient;
use aws_sdk_dynamodb::Client as DynamoClient;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_sesv2::Client as SesClient;
use churchdir_shared::config::{Config, StoreBackend};
use churchdir_shared::store::{dynamo::DynamoStore, memory::MemoryStore, Store};
use churchdir_shared::AppState;
use lambda_http::{run, service_fn, tracing, Error, Request};
use std::sync::Arc;

mod http_handler;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing::init_default_subscriber();

    let config = Config::from_env();
    if config.cognito.is_none() {
        tracing::warn!("COGNITO_CLIENT_ID/COGNITO_CLIENT_SECRET not set; auth routes will fail");
    }
    if config.allow_user_id_header {
        tracing::warn!("X-User-Id header is trusted as caller identity");
    }

    // Initialize AWS clients once at startup
    let aws_config = aws_config::load_from_env().await;

    let store: Arc<dyn Store> = match config.store_backend {
        StoreBackend::Dynamo => Arc::new(DynamoStore::new(
            DynamoClient::new(&aws_config),
            config.table_name.clone(),
        )),
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost when the process exits");
            Arc::new(MemoryStore::new())
        }
    };

    let state = AppState::new(
        config,
        store,
        CognitoClient::new(&aws_config),
        S3Client::new(&aws_config),
        SesClient::new(&aws_config),
    );

    run(service_fn(move |event: Request| {
        let state = Arc::clone(&state);
        async move { http_handler::function_handler(event, state).await }
    }))
    .await
}
