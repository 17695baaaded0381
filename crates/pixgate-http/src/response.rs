//! Response builders.

use http::StatusCode;

use crate::body::PixGateResponseBody;
use crate::error::HttpError;
use crate::gate::Rejection;

/// Content type for plain-text responses.
pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
/// Content type for JSON responses.
pub const APPLICATION_JSON: &str = "application/json";

/// Build a plain-text response.
#[must_use]
pub fn text_response(
    status: StatusCode,
    text: impl Into<String>,
) -> http::Response<PixGateResponseBody> {
    http::Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, TEXT_PLAIN)
        .body(PixGateResponseBody::from_string(text))
        .expect("valid text response")
}

/// Build a JSON response.
#[must_use]
pub fn json_response(
    status: StatusCode,
    value: &serde_json::Value,
) -> http::Response<PixGateResponseBody> {
    http::Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, APPLICATION_JSON)
        .body(PixGateResponseBody::from_string(value.to_string()))
        .expect("valid JSON response")
}

/// Turn a gate rejection into its fixed plain-text response.
#[must_use]
pub fn rejection_to_response(rejection: &Rejection) -> http::Response<PixGateResponseBody> {
    text_response(rejection.status, rejection.message)
}

/// Turn a handler error into a plain-text response.
#[must_use]
pub fn error_to_response(error: &HttpError) -> http::Response<PixGateResponseBody> {
    text_response(error.status_code(), error.to_string())
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;

    use super::*;
    use crate::gate::{ENDPOINT_RESTRICTED, INVALID_SIGNATURE};

    async fn body_text(resp: http::Response<PixGateResponseBody>) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_should_render_rejection_as_plain_text() {
        let resp = rejection_to_response(&INVALID_SIGNATURE);
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(resp.headers()[http::header::CONTENT_TYPE], TEXT_PLAIN);
        assert_eq!(body_text(resp).await, "Invalid signature");

        let resp = rejection_to_response(&ENDPOINT_RESTRICTED);
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_text(resp).await, "Endpoint restricted");
    }

    #[tokio::test]
    async fn test_should_render_handler_error() {
        let resp = error_to_response(&HttpError::BadRequest("missing file".into()));
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(resp).await, "Bad request: missing file");
    }

    #[test]
    fn test_should_render_json() {
        let resp = json_response(StatusCode::OK, &serde_json::json!({"status": "Ok"}));
        assert_eq!(resp.headers()[http::header::CONTENT_TYPE], APPLICATION_JSON);
    }
}
