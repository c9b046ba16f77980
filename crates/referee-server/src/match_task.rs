//! Central match loop.
//!
//! This task owns the `MatchRegistry` (and the RNG every probabilistic
//! decision draws from) and processes all `MatchCmd`s coming from
//! connection tasks. One command is handled at a time, so two players
//! acting at once in the same room can never interleave mid-mutation.
//!
//! Routing policy:
//! - `gameState` / `gameResults`: broadcast to every connection in the
//!   room.
//! - system chat lines: delivered to the actor, the opponent, or both
//!   as the event says.
//! - errors: sent only to the offending connection.
//! - presence transitions: sent to the other participant's connections.

use std::collections::HashMap;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info, warn};

use referee_core::{Audience, AttachKind, GameEvent, MatchRegistry, RoomId, RoomTheme, UserId};
use referee_protocol::{ErrorFrame, Inbound, ServerFrame};

use crate::backend::Backend;
use crate::types::{ConnId, ConnectionEntry, ConnectionRegistry, MatchCmd, MatchRx};

/// Run the central match processing loop.
///
/// - `match_rx`: receives commands from all connection tasks.
/// - `clients`: registry of connections and their outbound channels.
/// - `backend`: room metadata store, consulted on create/join/finalize.
pub async fn run_match_loop(
    mut match_rx: MatchRx,
    clients: ConnectionRegistry,
    backend: Arc<dyn Backend>,
) {
    let mut registry = MatchRegistry::new();
    let mut rng = StdRng::from_entropy();

    // Latest connection per seated user, so a superseded socket's
    // teardown cannot mask a completed reconnect.
    let mut active: HashMap<(RoomId, UserId), ConnId> = HashMap::new();

    while let Some(cmd) = match_rx.recv().await {
        match cmd {
            MatchCmd::Attach { conn, user, room } => {
                active.insert((room, user), conn);
                handle_attach(&mut registry, &mut rng, &clients, &*backend, conn, user, room)
                    .await;
            }
            MatchCmd::Frame {
                conn,
                user,
                room,
                inbound,
            } => match inbound {
                Inbound::Action(action) => {
                    let events = match registry.apply(room, user, action, &mut rng) {
                        Ok(events) => events,
                        Err(e) => {
                            send_error(&clients, conn, &e.to_string()).await;
                            continue;
                        }
                    };
                    deliver(&mut registry, &clients, &*backend, room, user, events).await;
                }
                Inbound::Chat(message) => {
                    let frame = ServerFrame::chat(user, message);
                    broadcast_room(&clients, room, &frame).await;
                }
            },
            MatchCmd::Detach { conn, user, room } => {
                if active.get(&(room, user)) != Some(&conn) {
                    // A newer connection already took over for this user.
                    continue;
                }
                active.remove(&(room, user));
                if registry.set_online(room, user, false) {
                    presence_to_opponent(&registry, &clients, room, user, false).await;
                }
            }
        }
    }

    info!("match loop shutting down (match_rx closed)");
}

/// Seat (or re-seat) `user` in `room`, consulting the backend for
/// whatever the attach path needs, then broadcast the resulting state.
async fn handle_attach(
    registry: &mut MatchRegistry,
    rng: &mut StdRng,
    clients: &ConnectionRegistry,
    backend: &dyn Backend,
    conn: ConnId,
    user: UserId,
    room: RoomId,
) {
    let was_online = registry
        .get(room)
        .map(|m| m.is_online(user))
        .unwrap_or(false);

    let events = match registry.attach_kind(room, user) {
        AttachKind::Create => {
            let info = match backend.room_info(room).await {
                Ok(info) => info,
                Err(e) => {
                    warn!(user, room, "room lookup failed: {}", e);
                    send_error(clients, conn, "Failed to retrieve game room information").await;
                    return;
                }
            };
            // A finalized room stays finished; a stale session must not
            // resurrect it as a fresh match.
            if info.state == "finished" {
                warn!(user, room, "attach to a finished room refused");
                send_error(clients, conn, "Game not found").await;
                return;
            }
            let theme = RoomTheme::parse(&info.theme);
            registry.create(room, theme, user, info.creator_nickname, rng)
        }
        AttachKind::Join => {
            let nickname = match backend.challenger_nickname(room, user).await {
                Ok(nick) => nick,
                Err(e) => {
                    warn!(user, room, "challenger lookup failed: {}", e);
                    send_error(clients, conn, "Failed to retrieve game room information").await;
                    return;
                }
            };
            match registry.join(room, user, nickname, rng) {
                Ok(events) => events,
                Err(e) => {
                    send_error(clients, conn, &e.to_string()).await;
                    return;
                }
            }
        }
        AttachKind::Reconnect => match registry.reconnect(room, user) {
            Ok(events) => events,
            Err(e) => {
                send_error(clients, conn, &e.to_string()).await;
                return;
            }
        },
    };

    info!(user, room, "attached");
    // Presence goes out on transitions only; a second socket for an
    // already-online user stays silent.
    if !was_online {
        presence_to_opponent(registry, clients, room, user, true).await;
    }
    deliver(registry, clients, backend, room, user, events).await;
}

/// Fan out the events one action produced. A `Finalize` event also
/// retires the match from the registry once the final snapshot is out.
async fn deliver(
    registry: &mut MatchRegistry,
    clients: &ConnectionRegistry,
    backend: &dyn Backend,
    room: RoomId,
    actor: UserId,
    events: Vec<GameEvent>,
) {
    // Snapshot of current connections to minimize lock hold time.
    let current: Vec<(ConnId, ConnectionEntry)> = {
        let guard = clients.read().await;
        guard
            .iter()
            .filter(|(_, entry)| entry.room_id == room)
            .map(|(id, entry)| (*id, entry.clone()))
            .collect()
    };

    for event in events {
        match event {
            GameEvent::State => {
                if let Some(m) = registry.get(room) {
                    send_to_all(&current, &ServerFrame::state(m));
                }
            }
            GameEvent::Results => {
                if let Some(m) = registry.get(room) {
                    send_to_all(&current, &ServerFrame::results(m));
                }
            }
            GameEvent::System { audience, text } => {
                let frame = ServerFrame::system_chat(text);
                let Ok(json) = frame.to_json() else { continue };
                for (_, entry) in &current {
                    let included = match audience {
                        Audience::Both => true,
                        Audience::Actor => entry.user_id == actor,
                        Audience::Opponent => entry.user_id != actor,
                    };
                    if included {
                        let _ = entry.out_tx.send(json.clone());
                    }
                }
            }
            GameEvent::Finalize => {
                if let Err(e) = backend.finalize_room(room).await {
                    error!(room, "failed to finalize room: {}", e);
                }
                registry.remove(room);
                info!(room, "match finished and retired");
            }
        }
    }
}

fn send_to_all(conns: &[(ConnId, ConnectionEntry)], frame: &ServerFrame) {
    let Ok(json) = frame.to_json() else { return };
    for (_, entry) in conns {
        let _ = entry.out_tx.send(json.clone());
    }
}

async fn broadcast_room(clients: &ConnectionRegistry, room: RoomId, frame: &ServerFrame) {
    let Ok(json) = frame.to_json() else { return };
    let guard = clients.read().await;
    for entry in guard.values() {
        if entry.room_id == room {
            let _ = entry.out_tx.send(json.clone());
        }
    }
}

/// Tell the other participant that `user` came or went.
async fn presence_to_opponent(
    registry: &MatchRegistry,
    clients: &ConnectionRegistry,
    room: RoomId,
    user: UserId,
    is_online: bool,
) {
    let Some(opponent) = registry.get(room).and_then(|m| m.opponent_of(user)) else {
        return;
    };
    let frame = ServerFrame::online_status(user, is_online);
    let Ok(json) = frame.to_json() else { return };
    let guard = clients.read().await;
    for entry in guard.values() {
        if entry.room_id == room && entry.user_id == opponent {
            let _ = entry.out_tx.send(json.clone());
        }
    }
}

async fn send_error(clients: &ConnectionRegistry, conn: ConnId, msg: &str) {
    let Ok(json) = ErrorFrame::new(msg).to_json() else { return };
    let guard = clients.read().await;
    if let Some(entry) = guard.get(&conn) {
        let _ = entry.out_tx.send(json);
    }
}
