//! Session states.

use serde::Serialize;
use std::fmt;

/// Observable lifecycle state of a [`CameraSession`](super::CameraSession).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// About to request a stream.
    Start,
    /// Waiting for the provider to deliver a stream.
    Starting,
    /// A stream is live.
    Started,
    /// Tearing down before starting again.
    Restart,
    /// Tearing down for good.
    Stop,
    /// Stream released, waiting for a facing-mode change or switch.
    Stopped,
}

impl SessionState {
    /// Stable numeric code, used as a gauge value.
    pub fn code(self) -> i64 {
        match self {
            SessionState::Start => 0,
            SessionState::Starting => 1,
            SessionState::Started => 2,
            SessionState::Restart => 3,
            SessionState::Stop => 4,
            SessionState::Stopped => 5,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Start => "start",
            SessionState::Starting => "starting",
            SessionState::Started => "started",
            SessionState::Restart => "restart",
            SessionState::Stop => "stop",
            SessionState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Internal state carrying only the data valid in that state.
pub(crate) enum Phase<S> {
    Start,
    Starting,
    Started {
        stream: S,
        /// Whether the entry action (quality check) has run.
        adjusted: bool,
    },
    Restart {
        stream: Option<S>,
    },
    Stop {
        stream: Option<S>,
    },
    Stopped,
}

impl<S> Phase<S> {
    pub(crate) fn state(&self) -> SessionState {
        match self {
            Phase::Start => SessionState::Start,
            Phase::Starting => SessionState::Starting,
            Phase::Started { .. } => SessionState::Started,
            Phase::Restart { .. } => SessionState::Restart,
            Phase::Stop { .. } => SessionState::Stop,
            Phase::Stopped => SessionState::Stopped,
        }
    }

    /// Moves any stream out, leaving `Stopped` behind.
    pub(crate) fn take_stream(&mut self) -> Option<S> {
        match std::mem::replace(self, Phase::Stopped) {
            Phase::Started { stream, .. } => Some(stream),
            Phase::Restart { stream } | Phase::Stop { stream } => stream,
            Phase::Start | Phase::Starting | Phase::Stopped => None,
        }
    }

    pub(crate) fn stream(&self) -> Option<&S> {
        match self {
            Phase::Started { stream, .. } => Some(stream),
            _ => None,
        }
    }

    pub(crate) fn stream_mut(&mut self) -> Option<&mut S> {
        match self {
            Phase::Started { stream, .. } => Some(stream),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_stream_from_started() {
        let mut phase = Phase::Started {
            stream: 7u32,
            adjusted: true,
        };
        assert_eq!(phase.take_stream(), Some(7));
        assert_eq!(phase.state(), SessionState::Stopped);
    }

    #[test]
    fn test_take_stream_from_teardown() {
        let mut phase: Phase<u32> = Phase::Restart { stream: Some(3) };
        assert_eq!(phase.take_stream(), Some(3));

        let mut phase: Phase<u32> = Phase::Starting;
        assert_eq!(phase.take_stream(), None);
    }

    #[test]
    fn test_state_codes_distinct() {
        let states = [
            SessionState::Start,
            SessionState::Starting,
            SessionState::Started,
            SessionState::Restart,
            SessionState::Stop,
            SessionState::Stopped,
        ];
        let codes: std::collections::HashSet<_> = states.iter().map(|s| s.code()).collect();
        assert_eq!(codes.len(), states.len());
    }
}
