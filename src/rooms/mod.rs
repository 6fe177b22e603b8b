pub mod actor;
mod conns;
mod msg;
mod ws;

use axum::{Router, routing::get};

use crate::AppState;

pub use actor::Rooms;

/// The one room the HTTP surface currently serves.
pub(crate) const MAIN_ROOM: &str = "chat";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::room_ws))
        .route("/messages", get(msg::get_messages).post(msg::post_message))
}
