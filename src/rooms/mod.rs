mod broadcast;
mod connection;
mod directory;
mod list;
mod manager;
mod membership;
mod new;
mod password;
mod presence;
mod reaper;
mod ws;

use axum::{routing::{get, post}, Router};

use crate::AppState;

pub use connection::{ConnId, Connection, Outbound};
pub use directory::{RoomDetails, RoomSummary};
pub use manager::{CreatedRoom, ManagerConfig, RoomManager};
pub use presence::{MAX_USER_COUNT_INTERVAL, Notification};

pub type RoomId = String;
pub type UserId = String;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/rooms", get(list::list_rooms).post(new::new_room))
        .route("/room/{room_id}/users", get(list::room_users))
        .route("/check_password", post(password::check_password))
        .route("/ws", get(ws::room_ws))
}
