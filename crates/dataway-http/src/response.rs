//! Turns an `EngineError` into the wire error envelope (§6: `{"_error":
//! ..., "_retval": 1}`) with its fixed HTTP status, and a `FormattedResponse`
//! into a JSON body carrying the `Content-Range`/`X-Api-Range-*` headers.

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use dataway_core::{EngineError, FormattedResponse};

pub struct ApiError(pub EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        tracing::warn!(kind = self.0.kind(), status = status.as_u16(), "request failed");
        (status, Json(self.0.envelope())).into_response()
    }
}

pub struct ReadResponse(pub FormattedResponse);

impl IntoResponse for ReadResponse {
    fn into_response(self) -> Response {
        let FormattedResponse { body, content_range, range_total, range_size } = self.0;
        let mut response = Json(body).into_response();
        let headers = response.headers_mut();
        if let Ok(v) = HeaderValue::from_str(&content_range) {
            headers.insert("Content-Range", v);
        }
        headers.insert("X-Api-Range-Total", HeaderValue::from(range_total.max(0) as u64));
        headers.insert("X-Api-Range-Size", HeaderValue::from(range_size.max(0) as u64));
        response
    }
}
