// WebSocket frame stream

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use bytes::Bytes;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::broadcast;
use tokio::time::{Duration, timeout};

use super::AppState;
use crate::models::Frame;

pub(super) const WS_PING_INTERVAL: Duration = Duration::from_secs(30);
pub(super) const WS_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Decrements the /ws/frames connection count on drop (connect = +1, drop = -1).
struct WsFramesGuard(Arc<AtomicUsize>);

impl Drop for WsFramesGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

pub(super) async fn ws_frames(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let scheduler = state.scheduler.clone();
    let conn_count = state.ws_frame_connections.clone();
    ws.on_upgrade(move |socket| async move {
        // Subscribe before reading the latest frame so no cycle falls between the two.
        let mut rx = scheduler.subscribe_frames();
        let initial = scheduler.latest_frame();
        if let Err(e) = stream_frames(socket, initial, &mut rx, conn_count).await {
            tracing::info!("Frame stream error: {}", e);
        }
    })
}

async fn send_json(socket: &mut WebSocket, frame: &Frame) -> anyhow::Result<bool> {
    let json = serde_json::to_string(frame)?;
    let r = timeout(WS_SEND_TIMEOUT, socket.send(Message::Text(json.into()))).await;
    Ok(matches!(r, Ok(Ok(()))))
}

/// Sends the current frame, then every frame the scheduler emits until the client goes away.
async fn stream_frames(
    mut socket: WebSocket,
    initial: Frame,
    rx: &mut broadcast::Receiver<Frame>,
    conn_count: Arc<AtomicUsize>,
) -> anyhow::Result<()> {
    conn_count.fetch_add(1, Ordering::Relaxed);
    let _guard = WsFramesGuard(conn_count);
    tracing::info!("Client connected to frame stream");

    if !send_json(&mut socket, &initial).await? {
        return Ok(());
    }

    let mut ping_interval = tokio::time::interval(WS_PING_INTERVAL);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(frame) => {
                        if !send_json(&mut socket, &frame).await? {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("WebSocket /ws/frames client lagged, skipped {} frames", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            _ = ping_interval.tick() => {
                let r = timeout(WS_SEND_TIMEOUT, socket.send(Message::Ping(Bytes::new()))).await;
                if !matches!(r, Ok(Ok(()))) {
                    break;
                }
            }
        }
    }
    Ok(())
}
