//! referee-core
//!
//! Pure game logic for the bribed-referee board game:
//! - board and win evaluation
//! - referee mood labels and bias state
//! - per-room match state machine
//! - room-to-match registry
//!
//! No networking, no async, no serialization; all randomness is
//! injected so behavior is deterministic under test.

pub mod board;
pub mod error;
pub mod events;
pub mod game;
pub mod player;
pub mod referee;
pub mod registry;
pub mod status;
pub mod symbol;
pub mod theme;

/// User identifier, as carried in authentication claims.
pub type UserId = u64;

/// Room identifier, shared with the room-lifecycle store.
pub type RoomId = u64;

pub use board::Board;
pub use error::ActionError;
pub use events::{Action, Audience, GameEvent};
pub use game::{Match, DRAW};
pub use player::Player;
pub use referee::{is_normal, pick_label, RefereeFamily, REFEREE_COUNTDOWN};
pub use registry::{AttachKind, MatchRegistry};
pub use status::MatchStatus;
pub use symbol::Symbol;
pub use theme::RoomTheme;
