//! Per-connection WebSocket I/O loop.
//!
//! Each accepted socket gets one task running [`run_connection`]. The
//! loop multiplexes three sources:
//! - the outbound channel (pre-encoded JSON frames from the match task),
//! - inbound WebSocket messages,
//! - a ping ticker driving the liveness deadline.
//!
//! Inbound text frames are parsed here and forwarded to the match task
//! as [`MatchCmd::Frame`]; the connection task never touches match
//! state itself.

use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, warn};

use referee_core::{RoomId, UserId};
use referee_protocol::{parse_client_frame, ErrorFrame};

use crate::types::{ConnId, ConnectionRegistry, MatchCmd, MatchTx, OutboundRx};

/// Interval between server-initiated pings.
const PING_INTERVAL: Duration = Duration::from_secs(10);

/// A connection with no pong for this long is considered dead.
const PONG_DEADLINE: Duration = Duration::from_secs(60);

/// Drive a single connection until the peer goes away or fails the
/// liveness deadline. Registration happened before this is called;
/// teardown (registry removal + `Detach`) happens here exactly once.
pub async fn run_connection(
    conn: ConnId,
    user: UserId,
    room: RoomId,
    mut ws: WebSocketStream<TcpStream>,
    match_tx: MatchTx,
    mut out_rx: OutboundRx,
    clients: ConnectionRegistry,
) {
    let mut ping_timer = tokio::time::interval(PING_INTERVAL);
    // First tick fires immediately; skip it so the deadline starts fresh.
    ping_timer.tick().await;
    let mut last_pong = Instant::now();

    loop {
        tokio::select! {
            frame = out_rx.recv() => {
                match frame {
                    Some(json) => {
                        if ws.send(Message::Text(json)).await.is_err() {
                            break;
                        }
                    }
                    // Match task dropped us; nothing left to deliver.
                    None => break,
                }
            }

            msg = ws.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match parse_client_frame(&text) {
                            Ok(inbound) => {
                                let cmd = MatchCmd::Frame { conn, user, room, inbound };
                                if match_tx.send(cmd).is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!(conn = conn.0, user, "rejected frame: {}", e);
                                send_error(&mut ws, "Malformed message").await;
                            }
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {
                        last_pong = Instant::now();
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        let _ = ws.send(Message::Pong(payload)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {
                        // Binary frames are not part of the protocol.
                        debug!(conn = conn.0, "ignoring non-text frame");
                    }
                    Some(Err(e)) => {
                        debug!(conn = conn.0, "socket error: {}", e);
                        break;
                    }
                }
            }

            _ = ping_timer.tick() => {
                if last_pong.elapsed() > PONG_DEADLINE {
                    warn!(conn = conn.0, user, "pong deadline exceeded, dropping");
                    break;
                }
                if ws.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    // Teardown: deregister first so the match task's presence fanout
    // no longer sees this connection.
    {
        let mut guard = clients.write().await;
        guard.remove(&conn);
    }
    let _ = match_tx.send(MatchCmd::Detach { conn, user, room });
    let _ = ws.close(None).await;
    debug!(conn = conn.0, user, room, "connection closed");
}

async fn send_error(ws: &mut WebSocketStream<TcpStream>, msg: &str) {
    if let Ok(json) = ErrorFrame::new(msg).to_json() {
        let _ = ws.send(Message::Text(json)).await;
    }
}
