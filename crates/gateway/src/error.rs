use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use inference::DetectError;
use serde_json::json;
use thiserror::Error;

/// Failures of a single `/detect` request.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("missing multipart field `{0}`")]
    MissingField(&'static str),

    #[error("malformed multipart body: {0}")]
    Multipart(String),

    #[error(transparent)]
    Detect(#[from] DetectError),

    #[error("detection task failed: {0}")]
    Task(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingField(_) | ApiError::Multipart(_) => StatusCode::BAD_REQUEST,
            ApiError::Detect(DetectError::InvalidImage(_)) => StatusCode::BAD_REQUEST,
            ApiError::Detect(_) | ApiError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Detection request failed");
        } else {
            tracing::warn!(error = %self, "Rejected detection request");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inference::ModelFamily;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::MissingField("image_file").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(DetectError::InvalidImage("bad".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(DetectError::LayoutMismatch {
                family: ModelFamily::AnchorFree,
                expected: 10,
                actual: 9,
            })
            .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(DetectError::InferenceFailure(anyhow::anyhow!("oom"))).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
