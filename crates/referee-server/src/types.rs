//! Shared types for the game WebSocket server.
//!
//! This module defines:
//! - `ConnId`: a lightweight handle for open connections
//! - the connection registry and per-connection outbound channels
//! - `MatchCmd`: messages flowing from connection tasks to the match loop

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::RwLock;

use referee_core::{RoomId, UserId};
use referee_protocol::Inbound;

/// Identifier for an open connection.
///
/// Keyed by connection identity rather than user id: a user's stale
/// previous connection may still be registered and must be superseded,
/// not merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(pub u64);

/// Outbound frames (already-encoded JSON) to a given connection.
pub type OutboundTx = mpsc::UnboundedSender<String>;
pub type OutboundRx = mpsc::UnboundedReceiver<String>;

/// One registered connection.
#[derive(Debug, Clone)]
pub struct ConnectionEntry {
    pub user_id: UserId,
    pub room_id: RoomId,
    pub out_tx: OutboundTx,
}

/// Registry of open connections and their outbound channels.
pub type ConnectionRegistry = Arc<RwLock<HashMap<ConnId, ConnectionEntry>>>;

/// Message flowing from a connection task into the central match loop.
///
/// All match mutation happens on that loop, one command at a time, so
/// the match state itself needs no locking.
#[derive(Debug)]
pub enum MatchCmd {
    /// A freshly authenticated connection wants its room's match
    /// (creating, joining, or reconnecting as appropriate).
    Attach {
        conn: ConnId,
        user: UserId,
        room: RoomId,
    },

    /// A decoded inbound frame from a connection.
    Frame {
        conn: ConnId,
        user: UserId,
        room: RoomId,
        inbound: Inbound,
    },

    /// A connection went away (graceful close or liveness failure).
    Detach {
        conn: ConnId,
        user: UserId,
        room: RoomId,
    },
}

/// Channel from connection tasks → match loop.
pub type MatchTx = mpsc::UnboundedSender<MatchCmd>;
pub type MatchRx = mpsc::UnboundedReceiver<MatchCmd>;
