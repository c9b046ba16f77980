//! Protocol-level errors.

use thiserror::Error;

/// Failure to interpret an inbound frame.
///
/// These never mutate game state; the server reports them to the
/// offending connection only.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Not valid JSON, or not a known frame shape.
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The redundant `actionType` tag disagrees with `type`.
    #[error("actionType {got:?} does not match frame type {expected:?}")]
    ActionTypeMismatch {
        expected: &'static str,
        got: String,
    },
}
