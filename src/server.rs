//! HTTP/WebSocket front end for the engine.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tokio::sync::mpsc;

use crate::engine::Engine;
use crate::sessions::OutboundChannel;

pub fn router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/", get(status_handler))
        .route("/ws", get(ws_handler))
        .with_state(engine)
}

async fn status_handler(State(engine): State<Arc<Engine>>) -> impl IntoResponse {
    Json(engine.status().await)
}

async fn ws_handler(ws: WebSocketUpgrade, State(engine): State<Arc<Engine>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, engine))
}

/// One task per connected session.
///
/// Inbound frames are processed to completion before the next one is read,
/// which gives each session its per-message ordering. Outbound pushes from
/// other sessions' pipelines land on the mpsc queue and are multiplexed
/// into the socket between messages.
async fn handle_socket(mut socket: WebSocket, engine: Arc<Engine>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let channel = OutboundChannel::new(tx);
    log::info!("session {} connected", channel.channel_id());

    loop {
        tokio::select! {
            inbound = socket.recv() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        engine.handle_message(&text, &channel).await;
                    }
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                    Some(Ok(Message::Binary(_))) => {
                        log::debug!("ignoring binary frame on session {}", channel.channel_id());
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        log::debug!("session {} read error: {}", channel.channel_id(), e);
                        break;
                    }
                }
            }
            outbound = rx.recv() => {
                match outbound {
                    Some(frame) => {
                        if socket.send(Message::Text(frame)).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    let removed = engine.sessions().remove_channel(channel.channel_id());
    log::info!(
        "session {} closed, {} binding(s) removed",
        channel.channel_id(),
        removed
    );
}
