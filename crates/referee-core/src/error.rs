//! Error types for the game core.
//!
//! Rule violations are reported to the offending connection only, with
//! no state mutation and no broadcast; the `Display` strings below are
//! the exact client-visible messages.

use thiserror::Error;

/// Rejection of a player-submitted action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// No live match exists for the room.
    #[error("Game not found")]
    MatchNotFound,

    /// Mark coordinates are outside the board.
    #[error("Invalid cell coordinates")]
    OutOfBounds,

    /// The requested cell already carries a mark.
    #[error("Cell is already marked")]
    CellOccupied,

    /// The acting user does not hold the current turn.
    #[error("Not your turn")]
    NotYourTurn,

    /// The acting user occupies no slot in the match.
    #[error("Player not found in the game")]
    UnknownPlayer,
}
