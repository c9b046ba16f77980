//! WebSocket listener and top-level server wiring.
//!
//! This module:
//! - Listens on the configured address/port.
//! - Accepts TCP connections and upgrades them to WebSocket, checking
//!   the `token` / `session` query parameters during the handshake.
//! - Assigns each connection a `ConnId`.
//! - Spawns:
//!   - a per-connection task to handle I/O,
//!   - a single central match task that owns `MatchRegistry`.
//!
//! The per-connection logic and the match loop live in `connection`
//! and `match_task` modules respectively.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{
    ErrorResponse, Request, Response,
};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tracing::{info, warn};

use referee_core::UserId;
use referee_protocol::{ErrorFrame, SessionBootstrap};

use crate::auth::TokenValidator;
use crate::backend::Backend;
use crate::config::Config;
use crate::connection;
use crate::match_task;
use crate::session::{Session, SessionStore};
use crate::types::{
    ConnId, ConnectionEntry, ConnectionRegistry, MatchCmd, MatchRx, MatchTx, OutboundRx,
    OutboundTx,
};

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

fn next_conn_id() -> ConnId {
    let id = NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed);
    ConnId(id)
}

/// What the handshake established about the connecting client.
enum Identity {
    /// A valid session id was presented and rotated; membership comes
    /// straight out of the restored binding.
    Restored { session_id: String, session: Session },

    /// A valid token with no (usable) session; the backend decides
    /// which room this user belongs to.
    Fresh { user_id: UserId },
}

/// Everything the server shares across connections.
pub struct ServerState {
    pub config: Config,
    pub validator: Arc<dyn TokenValidator>,
    pub sessions: Arc<SessionStore>,
    pub backend: Arc<dyn Backend>,
}

/// Run the WebSocket server with the given state.
pub async fn run(state: ServerState) -> anyhow::Result<()> {
    let addr = state.config.socket_addr_string();
    let listener = TcpListener::bind(&addr).await?;
    info!("listening on {}", addr);

    // Shared registry of connections → outbound channels.
    let clients: ConnectionRegistry = Arc::new(tokio::sync::RwLock::new(Default::default()));

    // Channel from connections → match task.
    let (match_tx, match_rx): (MatchTx, MatchRx) = mpsc::unbounded_channel();

    // Spawn the central match task.
    {
        let clients_clone = clients.clone();
        let backend_clone = state.backend.clone();
        tokio::spawn(async move {
            match_task::run_match_loop(match_rx, clients_clone, backend_clone).await;
        });
    }

    let state = Arc::new(state);

    loop {
        let (stream, peer_addr) = listener.accept().await?;
        let current_clients = {
            let guard = clients.read().await;
            guard.len()
        };

        if current_clients >= state.config.max_clients {
            warn!(
                "rejecting connection from {}: max_clients ({}) reached",
                peer_addr, state.config.max_clients
            );
            // Drop the stream before the upgrade; the client sees a
            // closed connection.
            continue;
        }

        let conn = next_conn_id();
        let state_clone = state.clone();
        let clients_clone = clients.clone();
        let match_tx_clone = match_tx.clone();

        tokio::spawn(async move {
            if let Err(e) =
                accept_connection(conn, stream, state_clone, clients_clone, match_tx_clone).await
            {
                warn!(conn = conn.0, "connection from {} failed: {}", peer_addr, e);
            }
        });
    }
}

/// Upgrade one socket, authenticate it, seat it, and run its loop.
async fn accept_connection(
    conn: ConnId,
    stream: TcpStream,
    state: Arc<ServerState>,
    clients: ConnectionRegistry,
    match_tx: MatchTx,
) -> anyhow::Result<()> {
    // Identity is established inside the handshake callback so a bad
    // token refuses the upgrade itself with a 401.
    let mut identity: Option<Identity> = None;
    let validator = state.validator.clone();
    let sessions = state.sessions.clone();

    let callback = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        let query = req.uri().query().unwrap_or("");

        if let Some(id) = query_param(query, "session") {
            if let Some((fresh_id, session)) = sessions.resolve_and_rotate(&id) {
                identity = Some(Identity::Restored {
                    session_id: fresh_id,
                    session,
                });
                return Ok(resp);
            }
            // Stale session ids fall through to token auth.
        }

        let token = query_param(query, "token").ok_or_else(|| reject(StatusCode::UNAUTHORIZED))?;
        let claims = validator
            .validate(&token)
            .map_err(|_| reject(StatusCode::UNAUTHORIZED))?;
        identity = Some(Identity::Fresh {
            user_id: claims.user_id,
        });
        Ok(resp)
    };

    let mut ws = tokio_tungstenite::accept_hdr_async(stream, callback).await?;

    let Some(identity) = identity else {
        // Callback ran to completion if the upgrade succeeded.
        anyhow::bail!("handshake completed without an identity");
    };

    let (session_id, user, room) = match identity {
        Identity::Restored {
            session_id,
            session,
        } => (session_id, session.user_id, session.room_id),
        Identity::Fresh { user_id } => {
            let membership = match state.backend.resolve_membership(user_id).await {
                Ok(m) => m,
                Err(e) => {
                    warn!(user = user_id, "no room membership: {}", e);
                    send_raw(&mut ws, ErrorFrame::new("Failed to retrieve game room information").to_json()?)
                        .await;
                    let _ = ws.close(None).await;
                    return Ok(());
                }
            };
            let session_id = state.sessions.issue(Session {
                user_id,
                room_id: membership.room_id,
                role: membership.role,
            });
            (session_id, user_id, membership.room_id)
        }
    };

    // The bootstrap frame is the first thing every connection hears;
    // the client stores the rotated id for its next reconnect.
    let bootstrap = SessionBootstrap {
        session_id,
        user_id: user,
    };
    send_raw(&mut ws, bootstrap.to_json()?).await;

    // Register, then attach; the match task's first state broadcast
    // must find this connection in the registry.
    let (out_tx, out_rx): (OutboundTx, OutboundRx) = mpsc::unbounded_channel();
    {
        let mut guard = clients.write().await;
        guard.insert(
            conn,
            ConnectionEntry {
                user_id: user,
                room_id: room,
                out_tx,
            },
        );
    }

    if match_tx.send(MatchCmd::Attach { conn, user, room }).is_err() {
        let mut guard = clients.write().await;
        guard.remove(&conn);
        anyhow::bail!("match task gone");
    }

    info!(conn = conn.0, user, room, "connection established");
    connection::run_connection(conn, user, room, ws, match_tx, out_rx, clients).await;
    Ok(())
}

fn reject(status: StatusCode) -> ErrorResponse {
    let mut resp = ErrorResponse::new(None);
    *resp.status_mut() = status;
    resp
}

/// Minimal query-string lookup; values are not percent-decoded since
/// both tokens and session ids are URL-safe by construction.
fn query_param(query: &str, key: &str) -> Option<String> {
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == key).then(|| v.to_string())
    })
}

async fn send_raw(
    ws: &mut tokio_tungstenite::WebSocketStream<TcpStream>,
    json: String,
) -> bool {
    use futures_util::SinkExt;
    use tokio_tungstenite::tungstenite::Message;

    ws.send(Message::Text(json)).await.is_ok()
}
