//! Room-to-match registry.
//!
//! Maintains the one live [`Match`] per room and routes attaches and
//! actions to it. Backing-store lookups (room theme, challenger
//! nickname) happen in the caller: the registry tells it which lookup
//! an attach needs via [`AttachKind`], stays pure, and is only ever
//! touched from the server's single match task.

use std::collections::HashMap;

use rand::Rng;

use crate::error::ActionError;
use crate::events::{Action, GameEvent};
use crate::game::Match;
use crate::theme::RoomTheme;
use crate::{RoomId, UserId};

/// What an `attach(room, user)` will do, decided before any backing
/// store is consulted.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AttachKind {
    /// No match exists for the room; the caller must supply the room
    /// configuration (theme + creator nickname).
    Create,

    /// The user already occupies a slot; only their connection handle
    /// and presence flag change.
    Reconnect,

    /// The user takes slot 1; the caller must supply the accepted
    /// challenger's nickname.
    Join,
}

/// Registry of live matches, keyed by room.
#[derive(Debug, Default)]
pub struct MatchRegistry {
    matches: HashMap<RoomId, Match>,
}

impl MatchRegistry {
    pub fn new() -> Self {
        MatchRegistry::default()
    }

    /// Decide what attaching `user` to `room` requires.
    pub fn attach_kind(&self, room: RoomId, user: UserId) -> AttachKind {
        match self.matches.get(&room) {
            None => AttachKind::Create,
            Some(m) if m.slot_of(user).is_some() => AttachKind::Reconnect,
            Some(_) => AttachKind::Join,
        }
    }

    /// Create the match for `room` with `user` as the creator in slot 0.
    ///
    /// Every attach path returns the events to deliver — always a full
    /// state broadcast.
    pub fn create(
        &mut self,
        room: RoomId,
        theme: RoomTheme,
        user: UserId,
        creator_nickname: impl Into<String>,
        rng: &mut impl Rng,
    ) -> Vec<GameEvent> {
        let m = Match::new(room, theme, user, creator_nickname, rng);
        self.matches.insert(room, m);
        vec![GameEvent::State]
    }

    /// Seat `user` as the challenger in the existing match.
    pub fn join(
        &mut self,
        room: RoomId,
        user: UserId,
        nickname: impl Into<String>,
        rng: &mut impl Rng,
    ) -> Result<Vec<GameEvent>, ActionError> {
        let m = self
            .matches
            .get_mut(&room)
            .ok_or(ActionError::MatchNotFound)?;
        m.join_challenger(user, nickname, rng);
        Ok(vec![GameEvent::State])
    }

    /// Rebind a returning participant, leaving game state untouched.
    pub fn reconnect(&mut self, room: RoomId, user: UserId) -> Result<Vec<GameEvent>, ActionError> {
        let m = self
            .matches
            .get_mut(&room)
            .ok_or(ActionError::MatchNotFound)?;
        if !m.reconnect(user) {
            return Err(ActionError::UnknownPlayer);
        }
        Ok(vec![GameEvent::State])
    }

    /// Apply a game action for `user` in `room`.
    pub fn apply(
        &mut self,
        room: RoomId,
        user: UserId,
        action: Action,
        rng: &mut impl Rng,
    ) -> Result<Vec<GameEvent>, ActionError> {
        let m = self
            .matches
            .get_mut(&room)
            .ok_or(ActionError::MatchNotFound)?;
        m.apply(user, action, rng)
    }

    /// Flip a participant's presence flag. Returns `true` when the flag
    /// actually changed (no-op rooms and strangers return `false`).
    pub fn set_online(&mut self, room: RoomId, user: UserId, online: bool) -> bool {
        match self.matches.get_mut(&room) {
            Some(m) => m.set_online(user, online),
            None => false,
        }
    }

    /// Immutable access to a room's match.
    pub fn get(&self, room: RoomId) -> Option<&Match> {
        self.matches.get(&room)
    }

    /// Drop a finished room's match.
    pub fn remove(&mut self, room: RoomId) -> Option<Match> {
        self.matches.remove(&room)
    }

    /// Number of live matches.
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}
