use axum::{debug_handler, extract::{Path, State}, Json};
use serde::Serialize;

use crate::AppResult;

use super::{RoomId, RoomManager, RoomSummary, UserId};

#[derive(Debug, Serialize)]
pub(crate) struct RoomUsers {
    room_id: RoomId,
    users: Vec<UserId>,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn list_rooms(State(manager): State<RoomManager>) -> Json<Vec<RoomSummary>> {
    Json(manager.list_rooms().await)
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn room_users(
    State(manager): State<RoomManager>,
    Path(room_id): Path<RoomId>,
) -> AppResult<Json<RoomUsers>> {
    let users = manager.users(&room_id).await?;
    Ok(Json(RoomUsers { room_id, users }))
}
