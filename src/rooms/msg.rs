use axum::{
    Json, debug_handler,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

use crate::{AppResult, db::Message};

use super::{MAIN_ROOM, actor::Rooms};

pub(crate) const MAX_AUTHOR_LEN: usize = 64;
pub(crate) const MAX_BODY_LEN: usize = 1000;

#[derive(Debug, Deserialize)]
pub(crate) struct PostMessageQuery {
    author: String,
    body: String,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn get_messages(State(rooms): State<Rooms>) -> AppResult<Json<Vec<Message>>> {
    let room = rooms.get(MAIN_ROOM).await?;
    Ok(Json(room.recent().await?))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn post_message(
    State(rooms): State<Rooms>,
    Json(PostMessageQuery { author, body }): Json<PostMessageQuery>,
) -> AppResult<Response> {
    if author.is_empty() || body.is_empty() {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "author and body required"})),
        )
            .into_response());
    }

    let room = rooms.get(MAIN_ROOM).await?;
    let snapshot = room
        .post(truncate(author, MAX_AUTHOR_LEN), truncate(body, MAX_BODY_LEN))
        .await?;
    Ok(Json(snapshot).into_response())
}

fn truncate(s: String, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((cut, _)) => s[..cut].to_owned(),
        None => s,
    }
}
