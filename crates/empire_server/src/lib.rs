//! # Empire Session Host
//!
//! Hosts Hex Empires games without any transport attached.
//!
//! Each game is a [`session::GameSession`] owning its authoritative
//! simulation. The [`manager::SessionManager`] runs every session on its own
//! task; the transport layer (not part of this crate) feeds it authenticated
//! actions and forwards the published cycle results to clients.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod config;
pub mod error;
pub mod manager;
pub mod session;

pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use manager::{SessionEvent, SessionHandle, SessionManager};
pub use session::{GameSession, SessionStatus, Submission};

/// Identifier of a hosted game.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
