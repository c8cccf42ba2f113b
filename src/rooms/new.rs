use axum::{debug_handler, extract::State, Json};
use serde::Deserialize;

use crate::AppResult;

use super::{CreatedRoom, RoomManager};

#[derive(Debug, Deserialize)]
pub(crate) struct NewRoomQuery {
    name: String,
    password: Option<String>,
    #[serde(default)]
    is_private: bool,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn new_room(
    State(manager): State<RoomManager>,
    Json(NewRoomQuery { name, password, is_private }): Json<NewRoomQuery>,
) -> AppResult<Json<CreatedRoom>> {
    let room = manager
        .create_room(name, password.unwrap_or_default(), is_private)
        .await?;

    Ok(Json(room))
}
