//! Camera session state machine.
//!
//! ```text
//!            ┌──────────────── Restart ◄──────────────┐
//!            ▼                                        │
//!   Start ──► Starting ──► Started ── switch/facing ──┘
//!                             │
//!                           stop ──► Stop ──► Stopped
//! ```

mod controller;
mod state;
mod token;

pub use controller::CameraSession;
pub use state::SessionState;
pub use token::CancelToken;

use crate::capture::AcquireError;
use thiserror::Error;

/// Errors returned by session operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("no other camera available for the current facing mode")]
    DeviceSwitchUnavailable,
    #[error("no live camera stream")]
    NotReady,
    #[error("failed to apply track settings: {0}")]
    Settings(AcquireError),
    #[error("failed to serialize track settings: {0}")]
    Serialize(String),
    #[error("session disposed")]
    Disposed,
}

/// Running totals kept by a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Streams bound to the session.
    pub acquisitions: u64,
    /// Acquisitions that failed.
    pub acquisition_failures: u64,
    /// Switches made by the quality heuristic.
    pub auto_switches: u64,
    /// Switches requested through `switch_camera`.
    pub manual_switches: u64,
    /// Streams released by the session, stale ones included.
    pub releases: u64,
    /// Results that arrived for a superseded acquisition.
    pub stale_results: u64,
    /// Photos captured.
    pub photos: u64,
}
