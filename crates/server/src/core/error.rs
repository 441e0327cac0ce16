use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::core::store::StoreError;

#[derive(Debug)]
pub enum Error {
    // Request Errors
    InvalidTaskId(String),
    InvalidReceiver,

    // Storage Errors
    Store(StoreError),
}

pub type Result<T> = core::result::Result<T, Error>;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            Error::InvalidTaskId(id) => (
                StatusCode::BAD_REQUEST,
                format!("Invalid task id: {:?}", id),
            ),
            Error::InvalidReceiver => (
                StatusCode::BAD_REQUEST,
                "Receiver must not be empty".to_string(),
            ),
            Error::Store(StoreError::InvalidTaskId(id)) => (
                StatusCode::BAD_REQUEST,
                format!("Invalid task id: {:?}", id),
            ),
            Error::Store(err) => {
                error!("Storage error while serving request: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Storage error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "message": error_message
            }
        }));

        (status, body).into_response()
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        Error::Store(err)
    }
}
