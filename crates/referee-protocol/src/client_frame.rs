//! Inbound frames (client → server).
//!
//! Each WebSocket text frame carries one JSON object tagged by `type`.
//! Game actions repeat the tag in an `actionType` field; a frame whose
//! `actionType` disagrees with its `type` is rejected as malformed
//! rather than guessed at. Anything that does not match a known
//! variant is a protocol error.

use serde::Deserialize;

use referee_core::Action;

use crate::error::ProtocolError;

/// Raw inbound frame, exactly as found on the wire.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientFrame {
    #[serde(rename_all = "camelCase")]
    MarkCell { action_type: String, x: i64, y: i64 },

    #[serde(rename_all = "camelCase")]
    Bribe { action_type: String },

    #[serde(rename_all = "camelCase")]
    Accuse { action_type: String },

    #[serde(rename_all = "camelCase")]
    Retry {
        action_type: String,
        want_retry: bool,
    },

    ChatMessage { message: String },
}

/// A validated inbound message, ready for dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// A game action for the match state machine.
    Action(Action),

    /// A chat line to relay to the room.
    Chat(String),
}

impl ClientFrame {
    /// Validate the redundant `actionType` tag and convert to the
    /// dispatchable form.
    pub fn into_inbound(self) -> Result<Inbound, ProtocolError> {
        match self {
            ClientFrame::MarkCell { action_type, x, y } => {
                expect_action_type("markCell", action_type)?;
                Ok(Inbound::Action(Action::MarkCell { x, y }))
            }
            ClientFrame::Bribe { action_type } => {
                expect_action_type("bribe", action_type)?;
                Ok(Inbound::Action(Action::Bribe))
            }
            ClientFrame::Accuse { action_type } => {
                expect_action_type("accuse", action_type)?;
                Ok(Inbound::Action(Action::Accuse))
            }
            ClientFrame::Retry {
                action_type,
                want_retry,
            } => {
                expect_action_type("retry", action_type)?;
                Ok(Inbound::Action(Action::Retry { want: want_retry }))
            }
            ClientFrame::ChatMessage { message } => Ok(Inbound::Chat(message)),
        }
    }
}

/// Parse one inbound text frame.
pub fn parse_client_frame(text: &str) -> Result<Inbound, ProtocolError> {
    let frame: ClientFrame = serde_json::from_str(text)?;
    frame.into_inbound()
}

fn expect_action_type(expected: &'static str, got: String) -> Result<(), ProtocolError> {
    if got == expected {
        Ok(())
    } else {
        Err(ProtocolError::ActionTypeMismatch { expected, got })
    }
}
