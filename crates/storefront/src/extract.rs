//! Request body extraction.
//!
//! [`Json`] wraps `axum::Json` so that a body which fails to decode is
//! answered through [`AppError`] like every other error: a 422 naming the
//! offending field when the JSON is well-formed but does not fit, a 400
//! otherwise.

use axum::{
    extract::{FromRequest, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::AppError;
use crate::services::{FieldError, ServiceError};

/// JSON body extractor and response whose rejection is an [`AppError`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(err) => {
                ServiceError::Validation(vec![field_error(&err.body_text())]).into()
            }
            other => Self::BadRequest(other.body_text()),
        }
    }
}

/// Pull the field path out of a decode failure.
///
/// The text is axum's rejection message: a fixed prefix, then an optional
/// `path: ` (absent at the top level), the decode error and a trailing
/// ` at line L column C`.
fn field_error(text: &str) -> FieldError {
    let detail = text.split_once("target type: ").map_or(text, |(_, d)| d);
    let detail = detail.rsplit_once(" at line ").map_or(detail, |(d, _)| d);

    if let Some(rest) = detail.strip_prefix("missing field `")
        && let Some((field, _)) = rest.split_once('`')
    {
        return FieldError::new(field, "can't be blank");
    }

    match detail.split_once(": ") {
        Some((path, message)) if is_field_path(path) => FieldError::new(path, message),
        _ => FieldError::new("body", detail),
    }
}

fn is_field_path(path: &str) -> bool {
    !path.is_empty()
        && path
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '[' | ']'))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{Router, body::Body, http::Request, http::StatusCode, routing::post};
    use serde::Deserialize;
    use tower::ServiceExt;

    use super::*;

    #[derive(Debug, Deserialize, Serialize)]
    struct Order {
        item_id: i32,
        quantity: Option<u8>,
    }

    async fn echo(Json(order): Json<Order>) -> Json<Order> {
        Json(order)
    }

    async fn post_body(body: &'static str) -> (StatusCode, serde_json::Value) {
        let app = Router::new().route("/", post(echo));
        let response = app
            .oneshot(
                Request::post("/")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        assert_eq!(
            response.headers()["content-type"],
            "application/json",
            "every body is JSON"
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_decodes_and_echoes() {
        let (status, body) = post_body(r#"{"item_id": 4, "quantity": 2}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["item_id"], 4);
    }

    #[tokio::test]
    async fn test_missing_field_is_named() {
        let (status, body) = post_body(r#"{"quantity": 2}"#).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "Validation failed");
        assert_eq!(body["fields"][0]["field"], "item_id");
    }

    #[tokio::test]
    async fn test_wrong_type_is_named() {
        let (status, body) = post_body(r#"{"item_id": 4, "quantity": 900}"#).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["fields"][0]["field"], "quantity");
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let (status, body) = post_body(r#"{"item_id": "#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[test]
    fn test_field_error_parsing() {
        let nested = field_error(
            "Failed to deserialize the JSON body into the target type: \
             answers[0].question_id: invalid type: string \"x\", expected i32 at line 1 column 40",
        );
        assert_eq!(nested.field, "answers[0].question_id");
        assert_eq!(nested.message, "invalid type: string \"x\", expected i32");

        let top = field_error(
            "Failed to deserialize the JSON body into the target type: \
             invalid type: integer `3`, expected a map at line 1 column 1",
        );
        assert_eq!(top.field, "body");
    }
}
