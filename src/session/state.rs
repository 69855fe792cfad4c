//! Control-loop states and the legal transitions between them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a session stopped short of success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The failure report could not be classified
    Unparseable,
    /// The model produced no usable candidate
    NoFix,
    /// The reviewer declined the candidate
    Rejected,
    /// Writing the candidate failed and the file was rolled back
    PatchFailed,
    /// The attempt budget is spent
    Exhausted,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::Unparseable => "unparseable",
            StopReason::NoFix => "no_fix",
            StopReason::Rejected => "rejected",
            StopReason::PatchFailed => "patch_failed",
            StopReason::Exhausted => "exhausted",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum SessionState {
    Init,
    Executing,
    Classifying,
    ProposingFix,
    AwaitingAccept,
    Applying,
    Success,
    Stopped(StopReason),
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Success | SessionState::Stopped(_))
    }

    pub fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Init, Executing)
                | (Executing, Success)
                | (Executing, Classifying)
                | (Classifying, ProposingFix)
                | (Classifying, Stopped(StopReason::Unparseable))
                | (ProposingFix, AwaitingAccept)
                | (ProposingFix, Stopped(StopReason::NoFix))
                | (AwaitingAccept, Applying)
                | (AwaitingAccept, Stopped(StopReason::Rejected))
                | (Applying, Executing)
                | (Applying, Stopped(StopReason::PatchFailed))
                | (Applying, Stopped(StopReason::Exhausted))
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Init => f.write_str("init"),
            SessionState::Executing => f.write_str("executing"),
            SessionState::Classifying => f.write_str("classifying"),
            SessionState::ProposingFix => f.write_str("proposing_fix"),
            SessionState::AwaitingAccept => f.write_str("awaiting_accept"),
            SessionState::Applying => f.write_str("applying"),
            SessionState::Success => f.write_str("success"),
            SessionState::Stopped(reason) => write!(f, "stopped({})", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_REASONS: [StopReason; 5] = [
        StopReason::Unparseable,
        StopReason::NoFix,
        StopReason::Rejected,
        StopReason::PatchFailed,
        StopReason::Exhausted,
    ];

    #[test]
    fn test_terminal_states() {
        assert!(SessionState::Success.is_terminal());
        for reason in ALL_REASONS {
            assert!(SessionState::Stopped(reason).is_terminal());
        }
        assert!(!SessionState::Init.is_terminal());
        assert!(!SessionState::Applying.is_terminal());
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for reason in ALL_REASONS {
            assert!(!SessionState::Stopped(reason).can_transition_to(SessionState::Executing));
        }
        assert!(!SessionState::Success.can_transition_to(SessionState::Executing));
    }

    #[test]
    fn test_stop_reasons_bound_to_their_state() {
        assert!(SessionState::Classifying.can_transition_to(SessionState::Stopped(StopReason::Unparseable)));
        assert!(!SessionState::Classifying.can_transition_to(SessionState::Stopped(StopReason::NoFix)));
        assert!(SessionState::ProposingFix.can_transition_to(SessionState::Stopped(StopReason::NoFix)));
        assert!(SessionState::AwaitingAccept.can_transition_to(SessionState::Stopped(StopReason::Rejected)));
        assert!(SessionState::Applying.can_transition_to(SessionState::Stopped(StopReason::PatchFailed)));
        assert!(SessionState::Applying.can_transition_to(SessionState::Stopped(StopReason::Exhausted)));
        assert!(!SessionState::Executing.can_transition_to(SessionState::Stopped(StopReason::Exhausted)));
    }

    #[test]
    fn test_skipping_steps_is_illegal() {
        assert!(!SessionState::Init.can_transition_to(SessionState::Applying));
        assert!(!SessionState::Executing.can_transition_to(SessionState::ProposingFix));
        assert!(!SessionState::ProposingFix.can_transition_to(SessionState::Applying));
    }

    #[test]
    fn test_reasons_are_distinct() {
        let names: std::collections::HashSet<&str> = ALL_REASONS.iter().map(|r| r.as_str()).collect();
        assert_eq!(names.len(), 5);
    }

    #[test]
    fn test_display_and_serde() {
        let state = SessionState::Stopped(StopReason::PatchFailed);
        assert_eq!(state.to_string(), "stopped(patch_failed)");
        assert_eq!(
            serde_json::to_string(&state).unwrap(),
            r#"{"state":"stopped","reason":"patch_failed"}"#
        );
        assert_eq!(serde_json::to_string(&SessionState::Init).unwrap(), r#"{"state":"init"}"#);
    }
}
