use axum::{
    debug_handler,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};

use crate::AppResult;

use super::{
    MAIN_ROOM,
    actor::{Attached, RoomHandle, Rooms},
};

/// Upgrade handler for the push channel. A plain request never gets
/// here — axum answers it with 426 before the handler body runs.
///
/// The connection is attached before the upgrade completes, so the
/// version frame and the snapshot are already queued ahead of whatever
/// gets broadcast next.
#[debug_handler(state = crate::AppState)]
pub async fn room_ws(State(rooms): State<Rooms>, ws: WebSocketUpgrade) -> AppResult<Response> {
    let room = rooms.get(MAIN_ROOM).await?;
    let attached = room.attach().await?;

    Ok(ws
        .on_upgrade(async move |stream| serve_conn(stream, room, attached).await)
        .into_response())
}

async fn serve_conn(stream: WebSocket, room: RoomHandle, attached: Attached) {
    let Attached { id, mut frames } = attached;
    let (mut sender, mut receiver) = stream.split();

    let mut forward = tokio::spawn(async move {
        while let Some(payload) = frames.recv().await {
            if sender.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    // Server-push only: drain whatever the client sends and drop it.
    loop {
        tokio::select! {
            msg = receiver.next() => match msg {
                Some(Ok(_)) => continue,
                _ => break,
            },
            _ = &mut forward => break,
        }
    }

    forward.abort();
    room.detach(id);
    tracing::debug!(conn = id, "connection closed");
}
