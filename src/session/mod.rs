//! Preview session state
//!
//! One session per `open`, identified by a monotonically increasing
//! generation. The controller in [`controller`] owns the only active session
//! and the generation counter that retires stale continuations.

pub mod controller;

pub use controller::SessionController;

/// Lifecycle states of a preview session.
///
/// `Closed` is terminal and reachable from every non-`Idle` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session has been opened yet
    Idle,
    /// Waiting on the playback URL resolver
    Resolving,
    /// FLV backend bringing playback up
    Loading,
    /// WHEP backend mid-signaling
    Negotiating,
    /// Media flowing (or imminently flowing) to the sink
    Playing,
    /// Session torn down; resources released
    Closed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionState::Idle => "idle",
            SessionState::Resolving => "resolving",
            SessionState::Loading => "loading",
            SessionState::Negotiating => "negotiating",
            SessionState::Playing => "playing",
            SessionState::Closed => "closed",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(SessionState::Negotiating.to_string(), "negotiating");
        assert_eq!(SessionState::Closed.to_string(), "closed");
    }
}
