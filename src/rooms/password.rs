use axum::{debug_handler, extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::AppResult;

use super::{RoomId, RoomManager};

#[derive(Debug, Deserialize)]
pub(crate) struct PasswordCheckQuery {
    room_id: RoomId,
    password: String,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn check_password(
    State(manager): State<RoomManager>,
    Json(PasswordCheckQuery { room_id, password }): Json<PasswordCheckQuery>,
) -> AppResult<Json<Value>> {
    manager.check_password(&room_id, &password).await?;
    Ok(Json(json!({ "detail": "Password is correct" })))
}
