use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;

use crate::error::RoomError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    Room(RoomError),
    Other(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            AppError::Room(RoomError::RoomNotFound(_)) => (StatusCode::NOT_FOUND, "Room does not exist".to_owned()),
            AppError::Room(RoomError::DuplicateName(_)) => (StatusCode::BAD_REQUEST, "Room name already exists".to_owned()),
            AppError::Room(RoomError::InvalidPassword) => (StatusCode::FORBIDDEN, "Invalid password".to_owned()),
            AppError::Room(err @ RoomError::SendFailed(_)) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            AppError::Other(err) => {
                log::error!("{err}\n\n{}", err.backtrace());
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

impl From<RoomError> for AppError {
    fn from(err: RoomError) -> Self {
        Self::Room(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err)
    }
}

impl From<&str> for AppError {
    fn from(err: &str) -> Self {
        Self::Other(anyhow::Error::msg(err.to_owned()))
    }
}
