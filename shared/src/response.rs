use crate::error::ApiError;
use lambda_http::{http::StatusCode, Body, Error, Response};
use serde::Serialize;

fn builder(status: StatusCode) -> lambda_http::http::response::Builder {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
}

/// `{"success": true, "data": ...}`
pub fn success<T: Serialize>(status: StatusCode, data: &T) -> Result<Response<Body>, Error> {
    let body = serde_json::json!({ "success": true, "data": data });
    Ok(builder(status)
        .body(body.to_string().into())
        .map_err(Box::new)?)
}

/// `{"success": false, "error": ...}`
pub fn failure(err: &ApiError) -> Result<Response<Body>, Error> {
    let status = err.status();
    if status.is_server_error() {
        tracing::error!("Request failed: {}", err);
    } else {
        tracing::info!("Request rejected ({}): {}", status.as_u16(), err);
    }
    let body = serde_json::json!({ "success": false, "error": err.to_string() });
    Ok(builder(status)
        .body(body.to_string().into())
        .map_err(Box::new)?)
}

/// Turn a service result into an enveloped response.
pub fn respond<T: Serialize>(
    status: StatusCode,
    result: Result<T, ApiError>,
) -> Result<Response<Body>, Error> {
    match result {
        Ok(data) => success(status, &data),
        Err(err) => failure(&err),
    }
}

pub fn preflight() -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Access-Control-Allow-Origin", "*")
        .header(
            "Access-Control-Allow-Methods",
            "GET,POST,PUT,PATCH,DELETE,OPTIONS",
        )
        .header(
            "Access-Control-Allow-Headers",
            "Content-Type,Authorization,X-User-Id",
        )
        .body(Body::Empty)
        .map_err(Box::new)?)
}

pub fn not_found() -> Result<Response<Body>, Error> {
    let body = serde_json::json!({ "success": false, "error": "Not found" });
    Ok(builder(StatusCode::NOT_FOUND)
        .body(body.to_string().into())
        .map_err(Box::new)?)
}

pub fn method_not_allowed() -> Result<Response<Body>, Error> {
    let body = serde_json::json!({ "success": false, "error": "Method not allowed" });
    Ok(builder(StatusCode::METHOD_NOT_ALLOWED)
        .body(body.to_string().into())
        .map_err(Box::new)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_json(resp: &Response<Body>) -> serde_json::Value {
        serde_json::from_slice(resp.body()).unwrap()
    }

    #[test]
    fn test_success_envelope() {
        let resp = success(StatusCode::CREATED, &vec!["a", "b"]).unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(
            resp.headers().get("Access-Control-Allow-Origin").unwrap(),
            "*"
        );
        let json = body_json(&resp);
        assert_eq!(json["success"], true);
        assert_eq!(json["data"][1], "b");
    }

    #[test]
    fn test_failure_envelope_uses_error_status() {
        let resp = respond::<()>(StatusCode::OK, Err(ApiError::Forbidden)).unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let json = body_json(&resp);
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Admin access required");
    }
}
