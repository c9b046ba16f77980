//! Durable sessions.
//!
//! A session binds {user, room, role} to an opaque identifier with a
//! 24-hour TTL, independently of any single socket: a client that
//! drops and reconnects presents its identifier and is restored
//! without re-validating its token. Presenting an identifier rotates
//! it — the old entry is deleted and a fresh one issued.
//!
//! The store stands at the external key-value cache boundary; this
//! in-process implementation keeps the same contract (TTL, rotation,
//! opaque ids) behind a synchronous API so the upgrade-handshake
//! callback can call it directly.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use uuid::Uuid;

use referee_core::{RoomId, UserId};

/// Default session lifetime.
pub const SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Participant role within a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Creator,
    Challenger,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Creator => "Creator",
            Role::Challenger => "Challenger",
        }
    }
}

/// Identity + room binding restored from (or stored into) the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
    pub room_id: RoomId,
    pub role: Role,
}

struct SessionEntry {
    session: Session,
    expires_at: Instant,
}

/// TTL-bound session store.
pub struct SessionStore {
    entries: RwLock<HashMap<String, SessionEntry>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_ttl(SESSION_TTL)
    }

    /// Store with a custom TTL (tests use a zero TTL to exercise
    /// expiry).
    pub fn with_ttl(ttl: Duration) -> Self {
        SessionStore {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Mint and store a fresh identifier for `session`.
    pub fn issue(&self, session: Session) -> String {
        let id = Uuid::new_v4().to_string();
        let entry = SessionEntry {
            session,
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.write().insert(id.clone(), entry);
        id
    }

    /// Resolve `id` and rotate it: the old entry is removed and a
    /// fresh identifier issued for the same binding. Unknown or
    /// expired identifiers resolve to `None` (the expired entry is
    /// dropped on the way out).
    pub fn resolve_and_rotate(&self, id: &str) -> Option<(String, Session)> {
        let entry = self.entries.write().remove(id)?;
        if entry.expires_at <= Instant::now() {
            return None;
        }
        let session = entry.session;
        let fresh = self.issue(session.clone());
        Some((fresh, session))
    }

    /// Number of live (possibly expired, not yet purged) entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
