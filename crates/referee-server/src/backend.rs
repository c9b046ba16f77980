//! Room metadata backend.
//!
//! Room records (theme, creator, lifecycle state) live outside the
//! server process. The trait below is the seam the connection and
//! match tasks talk through; the in-memory implementation backs the
//! binary and the tests.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use thiserror::Error;

use referee_core::{RoomId, UserId};

use crate::session::Role;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("room {0} not found")]
    RoomNotFound(RoomId),
    #[error("no open invitation for user {0}")]
    NoMembership(UserId),
    #[error("user {0} is not a member of room {1}")]
    NotAMember(UserId, RoomId),
}

/// Room record as stored by the backend.
#[derive(Debug, Clone)]
pub struct RoomInfo {
    /// Raw theme string, e.g. "3x3_biased".
    pub theme: String,
    pub creator_id: UserId,
    pub creator_nickname: String,
    /// Lifecycle state: "waiting", "playing" or "finished".
    pub state: String,
}

/// Which room a freshly-authenticated user belongs to, and as what.
#[derive(Debug, Clone, Copy)]
pub struct Membership {
    pub room_id: RoomId,
    pub role: Role,
}

#[async_trait]
pub trait Backend: Send + Sync {
    /// Fetch the room record for `room`.
    async fn room_info(&self, room: RoomId) -> Result<RoomInfo, BackendError>;

    /// Resolve which room `user` should be attached to. Creators are
    /// routed to their own open room, challengers to the room whose
    /// invitation they accepted.
    async fn resolve_membership(&self, user: UserId) -> Result<Membership, BackendError>;

    /// Nickname the challenger accepted the invitation under.
    async fn challenger_nickname(
        &self,
        room: RoomId,
        user: UserId,
    ) -> Result<String, BackendError>;

    /// Mark `room` finished so it stops accepting attachments.
    async fn finalize_room(&self, room: RoomId) -> Result<(), BackendError>;
}

// ---------------------------------------------------------------------
// In-memory backend
// ---------------------------------------------------------------------

struct MemoryRoom {
    info: RoomInfo,
    challenger: Option<(UserId, String)>,
}

/// Process-local backend used by the binary and by tests.
#[derive(Default)]
pub struct MemoryBackend {
    rooms: RwLock<HashMap<RoomId, MemoryRoom>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a room created by `creator`.
    pub fn add_room(&self, room: RoomId, theme: &str, creator: UserId, nickname: &str) {
        let info = RoomInfo {
            theme: theme.to_string(),
            creator_id: creator,
            creator_nickname: nickname.to_string(),
            state: "waiting".to_string(),
        };
        self.rooms.write().insert(
            room,
            MemoryRoom {
                info,
                challenger: None,
            },
        );
    }

    /// Record that `user` accepted the invitation to `room`.
    pub fn add_challenger(&self, room: RoomId, user: UserId, nickname: &str) {
        if let Some(r) = self.rooms.write().get_mut(&room) {
            r.challenger = Some((user, nickname.to_string()));
        }
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn room_info(&self, room: RoomId) -> Result<RoomInfo, BackendError> {
        self.rooms
            .read()
            .get(&room)
            .map(|r| r.info.clone())
            .ok_or(BackendError::RoomNotFound(room))
    }

    async fn resolve_membership(&self, user: UserId) -> Result<Membership, BackendError> {
        let rooms = self.rooms.read();
        for (&room_id, r) in rooms.iter() {
            if r.info.state == "finished" {
                continue;
            }
            if r.info.creator_id == user {
                return Ok(Membership {
                    room_id,
                    role: Role::Creator,
                });
            }
            if matches!(r.challenger, Some((id, _)) if id == user) {
                return Ok(Membership {
                    room_id,
                    role: Role::Challenger,
                });
            }
        }
        Err(BackendError::NoMembership(user))
    }

    async fn challenger_nickname(
        &self,
        room: RoomId,
        user: UserId,
    ) -> Result<String, BackendError> {
        let rooms = self.rooms.read();
        let r = rooms.get(&room).ok_or(BackendError::RoomNotFound(room))?;
        match &r.challenger {
            Some((id, nick)) if *id == user => Ok(nick.clone()),
            _ => Err(BackendError::NotAMember(user, room)),
        }
    }

    async fn finalize_room(&self, room: RoomId) -> Result<(), BackendError> {
        let mut rooms = self.rooms.write();
        let r = rooms.get_mut(&room).ok_or(BackendError::RoomNotFound(room))?;
        r.info.state = "finished".to_string();
        Ok(())
    }
}
