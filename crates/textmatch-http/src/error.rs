use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use textmatch_core::error::Error;

/// Service error as seen by HTTP callers. Backend detail stays in the logs.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::DuplicateId(_) => StatusCode::CONFLICT,
            Error::BackendUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Backend(_) | Error::InvalidConfig(_) | Error::NotFound(_) | Error::Operation(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn message(&self) -> String {
        match &self.0 {
            Error::Validation(msg) => msg.clone(),
            err @ Error::DuplicateId(_) => err.to_string(),
            Error::BackendUnavailable(_) => "search backend unavailable".to_string(),
            _ => "internal error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(%status, error = %self.0, "request failed");
        }
        (status, Json(json!({ "error": self.message() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(ApiError(Error::validation("text field is required")).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError(Error::DuplicateId("1".into())).status(), StatusCode::CONFLICT);
        assert_eq!(ApiError(Error::BackendUnavailable("refused".into())).status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(ApiError(Error::Backend("boom".into())).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn backend_detail_is_not_exposed() {
        let err = ApiError(Error::Backend("field 'x' missing in segment 3".into()));
        assert_eq!(err.message(), "internal error");
        assert_eq!(ApiError(Error::validation("query term is required")).message(), "query term is required");
    }
}
