pub mod appresult;
pub mod config;
pub mod error;
pub mod rooms;

use axum::{extract::FromRef, Router};
use tower_http::cors::CorsLayer;

pub use appresult::{AppError, AppResult};
pub use config::Config;
pub use error::{RoomError, RoomResult};
use rooms::RoomManager;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub rooms: RoomManager,
}

pub fn app(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .merge(rooms::router())
        .with_state(state)
        .layer(cors)
}
