use churchdir_shared::access::{authenticate, require_admin};
use churchdir_shared::churches::{self, ChurchFilter};
use churchdir_shared::config::Config;
use churchdir_shared::error::ApiError;
use churchdir_shared::import::{self, SheetFormat};
use churchdir_shared::pastors::{self, PastorFilter};
use churchdir_shared::response::{self, respond};
use churchdir_shared::types::Status;
use churchdir_shared::{auth, field_options, images, invites, users, AppState};
use lambda_http::{
    http::{Method, StatusCode},
    Body, Error, Request, RequestExt, Response,
};
use std::sync::Arc;

/// Top-level path segments this lambda serves; anything else is a 404.
const RESOURCES: &[&str] = &[
    "login",
    "signup",
    "refresh",
    "invites",
    "users",
    "pastors",
    "churches",
    "field-options",
];

/// Caller identity from the API Gateway JWT authorizer. In local development
/// the `X-User-Id` header may stand in for it.
fn caller_id(event: &Request, config: &Config) -> Option<String> {
    let from_jwt = event
        .request_context_ref()
        .and_then(|ctx| ctx.authorizer())
        .and_then(|auth| auth.jwt.as_ref())
        .and_then(|jwt| jwt.claims.get("sub"))
        .cloned();

    from_jwt.or_else(|| {
        if !config.allow_user_id_header {
            return None;
        }
        event
            .headers()
            .get("X-User-Id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    })
}

fn query(event: &Request, key: &str) -> Option<String> {
    event
        .query_string_parameters_ref()
        .and_then(|params| params.first(key))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn status_param(event: &Request) -> Result<Option<Status>, ApiError> {
    query(event, "status")
        .map(|s| s.parse::<Status>().map_err(ApiError::Validation))
        .transpose()
}

fn pastor_filter(event: &Request) -> Result<PastorFilter, ApiError> {
    Ok(PastorFilter {
        status: status_param(event)?,
        council: query(event, "council"),
        area: query(event, "area"),
        church_id: query(event, "churchId"),
        search: query(event, "search"),
    })
}

fn church_filter(event: &Request) -> Result<ChurchFilter, ApiError> {
    Ok(ChurchFilter {
        status: status_param(event)?,
        search: query(event, "search"),
    })
}

fn deleted(id: String) -> serde_json::Value {
    serde_json::json!({ "id": id })
}

/// Main Lambda handler: routes by method and path segments.
pub(crate) async fn function_handler(
    event: Request,
    state: Arc<AppState>,
) -> Result<Response<Body>, Error> {
    let method = event.method().clone();
    let path = event.uri().path().to_string();
    tracing::info!("{} {}", method, path);

    // Handle CORS preflight
    if method == Method::OPTIONS {
        return response::preflight();
    }

    let store = state.store.as_ref();
    let config = &state.config;
    let cognito = config.cognito.as_ref();
    let body: &[u8] = event.body();
    let user_id = caller_id(&event, config);
    let user_id = user_id.as_deref();

    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let ok = StatusCode::OK;
    let created = StatusCode::CREATED;

    match (&method, parts.as_slice()) {
        // --- AUTH (public) ---
        (&Method::POST, ["login"]) => respond(ok, auth::login(&state.cognito_client, cognito, body).await),
        (&Method::POST, ["signup"]) => respond(
            created,
            auth::signup(&state.cognito_client, cognito, store, body).await,
        ),
        (&Method::POST, ["refresh"]) => {
            respond(ok, auth::refresh(&state.cognito_client, cognito, body).await)
        }

        // --- INVITES ---
        (&Method::GET, ["invites", code]) => respond(ok, invites::get_invite(store, code).await),
        (&Method::POST, ["invites"]) => respond(
            created,
            async {
                let caller = require_admin(store, user_id).await?;
                invites::create_invite(store, &state.ses_client, config, &caller, body).await
            }
            .await,
        ),

        // --- USERS ---
        (&Method::GET, ["users", "me"]) => respond(
            ok,
            async {
                let caller = authenticate(store, user_id).await?;
                users::get_me(store, &caller).await
            }
            .await,
        ),
        (&Method::GET, ["users"]) => respond(
            ok,
            async {
                require_admin(store, user_id).await?;
                users::list_users(store).await
            }
            .await,
        ),
        (&Method::PATCH, ["users", id]) => respond(
            ok,
            async {
                let caller = require_admin(store, user_id).await?;
                users::update_user(store, &caller, id, body).await
            }
            .await,
        ),
        (&Method::DELETE, ["users", id]) => respond(
            ok,
            async {
                let caller = require_admin(store, user_id).await?;
                users::delete_user(store, &caller, id).await.map(deleted)
            }
            .await,
        ),

        // --- PASTORS ---
        (&Method::GET, ["pastors"]) => respond(
            ok,
            async {
                authenticate(store, user_id).await?;
                pastors::list_pastors(store, &pastor_filter(&event)?).await
            }
            .await,
        ),
        (&Method::POST, ["pastors"]) => respond(
            created,
            async {
                require_admin(store, user_id).await?;
                pastors::create_pastor(store, body).await
            }
            .await,
        ),
        (&Method::POST, ["pastors", "import"]) => respond(
            ok,
            async {
                require_admin(store, user_id).await?;
                let content_type = event
                    .headers()
                    .get("Content-Type")
                    .and_then(|v| v.to_str().ok());
                let format = SheetFormat::detect(query(&event, "format").as_deref(), content_type)?;
                import::import_file(store, body, format, config.max_import_rows).await
            }
            .await,
        ),
        (&Method::GET, ["pastors", id]) => respond(
            ok,
            async {
                authenticate(store, user_id).await?;
                pastors::get_pastor(store, id).await
            }
            .await,
        ),
        (&Method::PATCH, ["pastors", id]) => respond(
            ok,
            async {
                require_admin(store, user_id).await?;
                pastors::update_pastor(store, id, body).await
            }
            .await,
        ),
        (&Method::DELETE, ["pastors", id]) => respond(
            ok,
            async {
                require_admin(store, user_id).await?;
                pastors::deactivate_pastor(store, id).await
            }
            .await,
        ),
        (&Method::DELETE, ["pastors", id, "permanent"]) => respond(
            ok,
            async {
                require_admin(store, user_id).await?;
                pastors::delete_pastor_permanently(store, id).await.map(deleted)
            }
            .await,
        ),
        (&Method::POST, ["pastors", id, "image"]) => respond(
            ok,
            async {
                require_admin(store, user_id).await?;
                images::upload_pastor_image(store, &state.s3_client, &config.bucket_name, id, body)
                    .await
            }
            .await,
        ),

        // --- CHURCHES ---
        (&Method::GET, ["churches"]) => respond(
            ok,
            async {
                authenticate(store, user_id).await?;
                churches::list_churches(store, &church_filter(&event)?).await
            }
            .await,
        ),
        (&Method::POST, ["churches"]) => respond(
            created,
            async {
                require_admin(store, user_id).await?;
                churches::create_church(store, body).await
            }
            .await,
        ),
        (&Method::GET, ["churches", id]) => respond(
            ok,
            async {
                authenticate(store, user_id).await?;
                churches::get_church(store, id).await
            }
            .await,
        ),
        (&Method::PATCH, ["churches", id]) => respond(
            ok,
            async {
                require_admin(store, user_id).await?;
                churches::update_church(store, id, body).await
            }
            .await,
        ),
        (&Method::DELETE, ["churches", id]) => respond(
            ok,
            async {
                require_admin(store, user_id).await?;
                churches::deactivate_church(store, id).await
            }
            .await,
        ),
        (&Method::DELETE, ["churches", id, "permanent"]) => respond(
            ok,
            async {
                require_admin(store, user_id).await?;
                churches::delete_church_permanently(store, id).await.map(deleted)
            }
            .await,
        ),
        (&Method::POST, ["churches", id, "images"]) => respond(
            created,
            async {
                require_admin(store, user_id).await?;
                images::upload_church_image(store, &state.s3_client, &config.bucket_name, id, body)
                    .await
            }
            .await,
        ),

        // --- FIELD OPTIONS ---
        (&Method::GET, ["field-options"]) => respond(ok, field_options::read_all(store).await),
        (&Method::PUT, ["field-options"]) => respond(
            ok,
            async {
                let caller = require_admin(store, user_id).await?;
                field_options::write(store, &caller, body).await
            }
            .await,
        ),
        (&Method::DELETE, ["field-options"]) => respond(
            ok,
            async {
                require_admin(store, user_id).await?;
                field_options::reset(store, query(&event, "fieldName").as_deref()).await
            }
            .await,
        ),

        (_, [resource, ..]) if RESOURCES.contains(resource) => {
            tracing::warn!("Unsupported method {} for {}", method, path);
            response::method_not_allowed()
        }
        _ => {
            tracing::warn!("No route for {} {}", method, path);
            response::not_found()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::config::{BehaviorVersion, Region};
    use churchdir_shared::store::{memory::MemoryStore, Store};
    use churchdir_shared::types::{Role, User};
    use std::collections::HashMap;

    async fn state() -> Arc<AppState> {
        let store = MemoryStore::new();
        for (id, role) in [("admin-1", Role::Admin), ("user-1", Role::User)] {
            store
                .put_user(&User {
                    user_id: id.to_string(),
                    email: format!("{}@church.org", id),
                    name: None,
                    role,
                    created_at: chrono_now(),
                    last_login: None,
                })
                .await
                .unwrap();
        }

        let config = Config {
            allow_user_id_header: true,
            ..Config::default()
        };

        let cognito = aws_sdk_cognitoidentityprovider::Client::from_conf(
            aws_sdk_cognitoidentityprovider::Config::builder()
                .behavior_version(BehaviorVersion::latest())
                .region(Region::new("us-east-1"))
                .build(),
        );
        let s3 = aws_sdk_s3::Client::from_conf(
            aws_sdk_s3::Config::builder()
                .behavior_version(BehaviorVersion::latest())
                .region(Region::new("us-east-1"))
                .build(),
        );
        let ses = aws_sdk_sesv2::Client::from_conf(
            aws_sdk_sesv2::Config::builder()
                .behavior_version(BehaviorVersion::latest())
                .region(Region::new("us-east-1"))
                .build(),
        );

        AppState::new(config, Arc::new(store), cognito, s3, ses)
    }

    fn chrono_now() -> chrono::DateTime<chrono::Utc> {
        "2026-01-01T00:00:00Z".parse().unwrap()
    }

    fn request(method: &str, uri: &str, user: Option<&str>, body: &str) -> Request {
        let mut builder = lambda_http::http::Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header("X-User-Id", user);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn call(state: &Arc<AppState>, req: Request) -> (StatusCode, serde_json::Value) {
        let resp = function_handler(req, Arc::clone(state)).await.unwrap();
        let status = resp.status();
        let json = match resp.body() {
            Body::Empty => serde_json::Value::Null,
            body => serde_json::from_slice(body).unwrap(),
        };
        (status, json)
    }

    #[tokio::test]
    async fn test_preflight_and_unknown_routes() {
        let state = state().await;
        let (status, _) = call(&state, request("OPTIONS", "/pastors", None, "")).await;
        assert_eq!(status, StatusCode::OK);

        let (status, json) = call(&state, request("GET", "/projects", None, "")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["success"], false);

        let (status, _) = call(&state, request("PUT", "/pastors", Some("admin-1"), "")).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_mutations_are_gated() {
        let state = state().await;
        let body = r#"{"firstName":"John","lastName":"Doe"}"#;

        let (status, _) = call(&state, request("POST", "/pastors", None, body)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, json) = call(&state, request("POST", "/pastors", Some("user-1"), body)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["error"], "Admin access required");

        let (status, json) = call(&state, request("GET", "/pastors", Some("user-1"), "")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"], serde_json::json!([]));

        let (status, json) = call(&state, request("POST", "/pastors", Some("admin-1"), body)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["firstName"], "John");
    }

    #[tokio::test]
    async fn test_user_id_header_ignored_unless_enabled() {
        let state = state().await;
        let locked = AppState::new(
            Config::default(),
            Arc::clone(&state.store),
            state.cognito_client.clone(),
            state.s3_client.clone(),
            state.ses_client.clone(),
        );
        let (status, _) = call(&locked, request("GET", "/pastors", Some("admin-1"), "")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_duplicate_create_is_rejected() {
        let state = state().await;
        let body = r#"{"firstName":"John","lastName":"Doe"}"#;
        call(&state, request("POST", "/pastors", Some("admin-1"), body)).await;
        let (status, json) = call(&state, request("POST", "/pastors", Some("admin-1"), body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("already exists"));
    }

    #[tokio::test]
    async fn test_csv_import_route() {
        let state = state().await;
        let csv = "First Name,Last Name\nJohn,Doe\nJohn,Doe\n";
        let req = lambda_http::http::Request::builder()
            .method("POST")
            .uri("/pastors/import")
            .header("X-User-Id", "admin-1")
            .header("Content-Type", "text/csv")
            .body(Body::from(csv.as_bytes().to_vec()))
            .unwrap();
        let (status, json) = call(&state, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["total"], 2);
        assert_eq!(json["data"]["successful"], 1);
        assert_eq!(json["data"]["failed"], 1);
        assert_eq!(json["data"]["errors"][0]["row"], 2);
    }

    #[tokio::test]
    async fn test_field_options_routes() {
        let state = state().await;
        let (status, json) = call(&state, request("GET", "/field-options", None, "")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["genders"]["isDefault"], true);

        let body = r#"{"fieldName":"genders","options":["A","B"]}"#;
        let (status, _) = call(&state, request("PUT", "/field-options", Some("user-1"), body)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = call(&state, request("PUT", "/field-options", Some("admin-1"), body)).await;
        assert_eq!(status, StatusCode::OK);

        let (_, json) = call(&state, request("GET", "/field-options", None, "")).await;
        assert_eq!(json["data"]["genders"]["options"], serde_json::json!(["A", "B"]));

        let mut params = HashMap::new();
        params.insert("fieldName".to_string(), "genders".to_string());
        let reset = request("DELETE", "/field-options", Some("admin-1"), "")
            .with_query_string_parameters(params);
        let (status, json) = call(&state, reset).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["options"], serde_json::json!(["Male", "Female"]));
    }

    #[tokio::test]
    async fn test_list_filter_by_status_query() {
        let state = state().await;
        let (_, created) = call(
            &state,
            request("POST", "/churches", Some("admin-1"), r#"{"name":"Zion"}"#),
        )
        .await;
        let id = created["data"]["id"].as_str().unwrap().to_string();
        call(
            &state,
            request("DELETE", &format!("/churches/{}", id), Some("admin-1"), ""),
        )
        .await;

        let mut params = HashMap::new();
        params.insert("status".to_string(), "active".to_string());
        let req = request("GET", "/churches", Some("user-1"), "").with_query_string_parameters(params);
        let (_, json) = call(&state, req).await;
        assert_eq!(json["data"], serde_json::json!([]));

        let mut params = HashMap::new();
        params.insert("status".to_string(), "archived".to_string());
        let req = request("GET", "/churches", Some("user-1"), "").with_query_string_parameters(params);
        let (status, _) = call(&state, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_invite_lookup_is_public() {
        let state = state().await;
        let (status, json) = call(&state, request("GET", "/invites/nope", None, "")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "Invite not found");
    }
}
