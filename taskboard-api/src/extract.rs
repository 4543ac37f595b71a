/// Request extractors with `{message}` rejections
///
/// axum's stock extractors answer malformed input with plain-text bodies.
/// These wrappers turn every rejection into an [`ApiError::BadRequest`] so
/// clients always receive the same JSON shape.
///
/// - [`JsonBody`]: JSON request body; an empty body reads as `{}`
/// - [`PathId`]: single UUID path parameter
/// - [`QueryParams`]: query string
/// - [`validate`]: runs `validator` rules and reports the first message

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;

/// JSON body extractor
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;

        let raw: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
            b"{}"
        } else {
            &bytes
        };

        serde_json::from_slice(raw)
            .map(JsonBody)
            .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))
    }
}

/// UUID path parameter extractor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for PathId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;

        Uuid::parse_str(&raw)
            .map(PathId)
            .map_err(|_| ApiError::BadRequest("Invalid ID!".to_string()))
    }
}

/// Query string extractor
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryParams<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| QueryParams(value))
            .map_err(|e| ApiError::BadRequest(e.body_text()))
    }
}

/// Runs validation rules; the first failing message (by field name) wins
pub fn validate<T: Validate>(value: &T) -> Result<(), ApiError> {
    let Err(errors) = value.validate() else {
        return Ok(());
    };

    let field_errors = errors.field_errors();
    let mut fields: Vec<_> = field_errors.keys().collect();
    fields.sort();

    let message = fields
        .into_iter()
        .filter_map(|field| field_errors.get(field))
        .flat_map(|errs| errs.iter())
        .find_map(|err| err.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| "Invalid request!".to_string());

    Err(ApiError::BadRequest(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, response::IntoResponse, routing::post, Router};
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Debug, Deserialize, Validate)]
    struct Payload {
        #[validate(length(min = 1, message = "Name is required"))]
        name: Option<String>,
    }

    async fn echo(JsonBody(payload): JsonBody<Payload>) -> impl IntoResponse {
        payload.name.unwrap_or_default()
    }

    async fn id(PathId(id): PathId) -> impl IntoResponse {
        id.to_string()
    }

    async fn send(app: Router, uri: &str, body: &'static str) -> (StatusCode, String) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_empty_body_reads_as_empty_object() {
        let app = Router::new().route("/", post(echo));
        let (status, body) = send(app, "/", "").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "");
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let app = Router::new().route("/", post(echo));
        let (status, body) = send(app, "/", "{not json").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("\"message\""));
    }

    #[tokio::test]
    async fn test_invalid_uuid_is_bad_request() {
        let app = Router::new().route("/:id", post(id));

        let (status, body) = send(app.clone(), "/not-a-uuid", "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("Invalid ID!"));

        let uuid = Uuid::new_v4();
        let (status, body) = send(app, &format!("/{}", uuid), "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, uuid.to_string());
    }

    #[test]
    fn test_validate_reports_message() {
        let err = validate(&Payload {
            name: Some(String::new()),
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "Bad request: Name is required");

        assert!(validate(&Payload {
            name: Some("x".to_string())
        })
        .is_ok());
    }
}
