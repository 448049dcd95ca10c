//! Error-kind to HTTP status translation.

use crate::pool::PoolError;
use crate::runtime::RuntimeError;
use poem::error::ResponseError;
use poem::http::StatusCode;
use poem::Response;
use serde::{Deserialize, Serialize};

/// JSON body returned for every failed request.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    pub error_type: String,
}

impl ResponseError for PoolError {
    fn status(&self) -> StatusCode {
        match self {
            PoolError::GroupNotFound(_) | PoolError::ContainerNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            PoolError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            PoolError::Runtime(RuntimeError::Api { code, .. }) => {
                StatusCode::from_u16(*code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            // Matches the original server: declaration conflicts and the
            // max-count gate surface as plain server errors.
            PoolError::GroupAlreadyDeclared(_)
            | PoolError::MaxCountReached { .. }
            | PoolError::Runtime(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn as_response(&self) -> Response {
        let body = ErrorBody {
            message: self.to_string(),
            error_type: self.kind().to_string(),
        };
        Response::builder()
            .status(self.status())
            .content_type("application/json")
            .body(serde_json::to_string(&body).unwrap_or_default())
    }
}
