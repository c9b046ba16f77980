//! Player slots.

use crate::symbol::Symbol;
use crate::UserId;

/// One occupied player slot of a match.
///
/// Connection handles live in the server layer; the core only knows
/// the player's identity and presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: UserId,
    pub symbol: Symbol,
    pub nickname: String,
}

impl Player {
    pub fn new(id: UserId, symbol: Symbol, nickname: impl Into<String>) -> Self {
        Player {
            id,
            symbol,
            nickname: nickname.into(),
        }
    }
}
