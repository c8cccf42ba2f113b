use axum::{
    debug_handler,
    extract::{Query, State, WebSocketUpgrade, ws::{Message, WebSocket}},
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::AppResult;

use super::{Connection, Outbound, RoomId, RoomManager, UserId};

#[derive(Debug, Deserialize)]
pub(crate) struct JoinQuery {
    room: RoomId,
    user_id: UserId,
    #[serde(default)]
    password: String,
}

/// Joins before upgrading, so a rejected join answers with a plain HTTP
/// error and no socket is opened.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn room_ws(
    Query(JoinQuery { room, user_id, password }): Query<JoinQuery>,
    State(manager): State<RoomManager>,

    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    log::debug!("websocket request: room={room}, user_id={user_id}");

    let (conn, outbound) = Connection::new();
    manager.join(&room, user_id, conn.clone(), &password).await?;

    let failed = (manager.clone(), conn.clone());
    Ok(ws
        .on_failed_upgrade(move |err| {
            log::warn!("websocket upgrade failed: {err}");
            let (manager, conn) = failed;
            tokio::spawn(async move { manager.leave(&conn).await });
        })
        .on_upgrade(move |socket| serve(socket, manager, conn, outbound))
        .into_response())
}

async fn serve(
    socket: WebSocket,
    manager: RoomManager,
    conn: Connection,
    mut outbound: mpsc::Receiver<Outbound>,
) {
    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        while let Some(out) = outbound.recv().await {
            match out {
                Outbound::Text(payload) => {
                    if sender.send(Message::Text(payload.as_ref().into())).await.is_err() {
                        break;
                    }
                }
                Outbound::Close => {
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    let (relay_manager, relay_conn) = (manager.clone(), conn.clone());
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(err) => {
                    log::debug!("read error on {}: {err}", relay_conn.id());
                    break;
                }
            };
            match msg {
                Message::Text(text) => {
                    relay_manager.relay(&relay_conn, text.as_str().as_bytes()).await;
                }
                Message::Binary(bytes) => {
                    relay_manager.relay(&relay_conn, &bytes).await;
                }
                Message::Close(_) => break,
                Message::Ping(_) | Message::Pong(_) => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    };

    manager.leave(&conn).await;
}
