//! referee-protocol
//!
//! JSON wire frames for the referee game server:
//! - inbound tagged frame union (game actions + chat)
//! - outbound snapshots, chat, presence, error, and session frames
//!
//! The networking layer lives in `referee-server`; this crate is pure
//! serialization.

pub mod client_frame;
pub mod error;
pub mod server_frame;

pub use client_frame::{parse_client_frame, ClientFrame, Inbound};
pub use error::ProtocolError;
pub use server_frame::{
    rfc3339_now, ErrorFrame, GameStateBody, PlayerInfo, ServerFrame, SessionBootstrap,
    SYSTEM_SENDER,
};
