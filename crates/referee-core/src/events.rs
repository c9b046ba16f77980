//! Logical inputs and outputs of the match state machine.
//!
//! These are **transport-agnostic**: the JSON frame shapes live in the
//! `referee-protocol` crate. The server decodes an inbound frame into an
//! [`Action`], runs it through the match, and routes the resulting
//! [`GameEvent`]s to the room's connections.

/// A validated game action submitted by a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Request a mark at `(x, y)`. Coordinates are kept signed so the
    /// state machine itself rejects negative values as out of bounds.
    MarkCell { x: i64, y: i64 },

    /// Nudge the referee's bias in the actor's favor.
    Bribe,

    /// Accuse the opponent of bribery.
    Accuse,

    /// Vote on continuing to the next round.
    Retry { want: bool },
}

/// Who a [`GameEvent`] is addressed to, relative to the acting player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Actor,
    Opponent,
    Both,
}

/// An effect produced by applying an action (or an attach) to a match.
///
/// Events come out ordered; the server delivers them in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    /// Broadcast a full `gameState` snapshot to the room.
    State,

    /// Broadcast a `gameResults` snapshot to the room (round or match
    /// completion).
    Results,

    /// Chat-style system line (`from = 0`).
    System { audience: Audience, text: String },

    /// The match reached `finished`; the backing room record should be
    /// finalized (best effort, after the in-memory transition).
    Finalize,
}

impl GameEvent {
    /// Convenience constructor for a system chat line.
    pub fn system(audience: Audience, text: impl Into<String>) -> Self {
        GameEvent::System {
            audience,
            text: text.into(),
        }
    }
}
