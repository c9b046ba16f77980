//! referee-server
//!
//! Multi-client async WebSocket server for the bribed-referee game.

pub mod auth;
pub mod backend;
pub mod config;
pub mod match_task;
pub mod server;
pub mod session;
pub mod types;

// internal module, not re-exported
mod connection;
