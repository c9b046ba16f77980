//! Outbound frames (server → client).
//!
//! The full state snapshot is a pure projection of a [`Match`]; the
//! same body is sent tagged `gameState` during play and `gameResults`
//! at round/match completion. Two untagged one-off shapes exist as
//! well: the bare `{"error": ...}` reply and the session bootstrap
//! frame sent right after the handshake.

use std::collections::BTreeMap;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use referee_core::{Match, UserId};

/// Sender id used for system chat lines.
pub const SYSTEM_SENDER: UserId = 0;

/// Public player info carried in snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub id: UserId,
    pub nick_name: String,
    pub symbol: String,
}

/// Body shared by the `gameState` and `gameResults` frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateBody {
    /// Rows of single-character marks; `""` for empty cells.
    pub board: Vec<Vec<String>>,

    /// Id of the player allowed to act next; 0 until the second
    /// player has joined.
    pub current_turn: UserId,

    pub status: String,

    /// Presence flags keyed by user id.
    pub players_online: BTreeMap<UserId, bool>,

    /// Seated players in slot order.
    pub players_info: Vec<PlayerInfo>,

    /// Room-level `"fair"` / `"biased"` label.
    pub bias: String,

    pub referee_status: String,

    /// One entry per completed round; 0 marks a draw.
    pub winners: Vec<UserId>,

    pub bribe_counts: [u32; 2],
}

impl GameStateBody {
    /// Project the wire body out of a live match.
    pub fn from_match(m: &Match) -> Self {
        GameStateBody {
            board: m.board().rows_as_strings(),
            current_turn: m.current_turn().unwrap_or(0),
            status: m.status().as_str().to_string(),
            players_online: m.online_by_user().into_iter().collect(),
            players_info: m
                .players()
                .map(|p| PlayerInfo {
                    id: p.id,
                    nick_name: p.nickname.clone(),
                    symbol: p.symbol.as_char().to_string(),
                })
                .collect(),
            bias: m.theme().bias_label().to_string(),
            referee_status: m.referee_status().to_string(),
            winners: m.winners().to_vec(),
            bribe_counts: m.bribe_counts(),
        }
    }
}

/// Typed outbound frame, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerFrame {
    GameState(GameStateBody),

    GameResults(GameStateBody),

    ChatMessage {
        message: String,
        from: UserId,
        timestamp: String,
    },

    #[serde(rename_all = "camelCase")]
    OnlineStatus {
        #[serde(rename = "userID")]
        user_id: UserId,
        is_online: bool,
    },
}

impl ServerFrame {
    /// Full snapshot during play.
    pub fn state(m: &Match) -> Self {
        ServerFrame::GameState(GameStateBody::from_match(m))
    }

    /// Full snapshot at round/match completion.
    pub fn results(m: &Match) -> Self {
        ServerFrame::GameResults(GameStateBody::from_match(m))
    }

    /// Server-stamped chat relay.
    pub fn chat(from: UserId, message: impl Into<String>) -> Self {
        ServerFrame::ChatMessage {
            message: message.into(),
            from,
            timestamp: rfc3339_now(),
        }
    }

    /// Chat-style system line (`from = 0`).
    pub fn system_chat(message: impl Into<String>) -> Self {
        Self::chat(SYSTEM_SENDER, message)
    }

    /// Presence transition, addressed to the other room participant.
    pub fn online_status(user_id: UserId, is_online: bool) -> Self {
        ServerFrame::OnlineStatus { user_id, is_online }
    }

    /// Encode for the wire.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Bare error reply, sent to the offending connection only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorFrame {
    pub error: String,
}

impl ErrorFrame {
    pub fn new(message: impl Into<String>) -> Self {
        ErrorFrame {
            error: message.into(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Session bootstrap frame, the first thing a fresh connection hears.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionBootstrap {
    #[serde(rename = "sessionID")]
    pub session_id: String,

    #[serde(rename = "userID")]
    pub user_id: UserId,
}

impl SessionBootstrap {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Current time in the RFC3339 shape clients expect.
pub fn rfc3339_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
