//! Mutable per-session record and the outcome handed back to callers.

use serde::{Deserialize, Serialize};

use super::event::SessionEvent;
use super::state::{SessionState, StopReason};
use crate::diagnose::ErrorRecord;
use crate::error::{FixloopError, Result};
use crate::language::Language;
use crate::propose::FixCandidate;
use crate::sandbox::ExecutionResult;

#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub language: Language,
    /// 1-based; never exceeds `max_attempts`
    pub attempt_count: u32,
    pub max_attempts: u32,
    pub original_source: String,
    pub current_source: String,
    pub last_candidate: Option<FixCandidate>,
    pub last_error: Option<ErrorRecord>,
    pub last_result: Option<ExecutionResult>,
    pub state: SessionState,
    pub events: Vec<SessionEvent>,
}

impl Session {
    pub fn new(id: impl Into<String>, language: Language, source: impl Into<String>, max_attempts: u32) -> Result<Self> {
        if max_attempts == 0 {
            return Err(FixloopError::Config("max_attempts must be a positive integer".to_string()));
        }
        let source = source.into();
        Ok(Self {
            id: id.into(),
            language,
            attempt_count: 1,
            max_attempts,
            original_source: source.clone(),
            current_source: source,
            last_candidate: None,
            last_error: None,
            last_result: None,
            state: SessionState::Init,
            events: Vec::new(),
        })
    }

    /// Move to `to`, recording an event. Illegal transitions are refused.
    pub fn transition(&mut self, to: SessionState, detail: impl Into<String>) -> Result<SessionEvent> {
        if !self.state.can_transition_to(to) {
            return Err(FixloopError::InvalidState(format!("{} -> {}", self.state, to)));
        }
        let event = SessionEvent::new(self.attempt_count, self.state, to, detail);
        if event.detail.is_empty() {
            log::info!("[{}] attempt {}: {} -> {}", self.id, self.attempt_count, self.state, to);
        } else {
            log::info!(
                "[{}] attempt {}: {} -> {} ({})",
                self.id,
                self.attempt_count,
                self.state,
                to,
                event.detail
            );
        }
        self.state = to;
        self.events.push(event.clone());
        Ok(event)
    }

    /// Count the next attempt; refuses to exceed the budget.
    pub fn next_attempt(&mut self) -> Result<()> {
        if self.attempt_count >= self.max_attempts {
            return Err(FixloopError::InvalidState(format!(
                "attempt budget of {} already spent",
                self.max_attempts
            )));
        }
        self.attempt_count += 1;
        Ok(())
    }

    pub fn budget_spent(&self) -> bool {
        self.attempt_count >= self.max_attempts
    }
}

/// Terminal result of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOutcome {
    pub session_id: String,
    pub language: Language,
    pub state: SessionState,
    pub attempts: u32,
    pub max_attempts: u32,
    pub original_source: String,
    pub final_source: String,
    pub last_candidate: Option<FixCandidate>,
    pub last_error: Option<ErrorRecord>,
    pub last_result: Option<ExecutionResult>,
    pub events: Vec<SessionEvent>,
}

impl From<Session> for SessionOutcome {
    fn from(session: Session) -> Self {
        Self {
            session_id: session.id,
            language: session.language,
            state: session.state,
            attempts: session.attempt_count,
            max_attempts: session.max_attempts,
            original_source: session.original_source,
            final_source: session.current_source,
            last_candidate: session.last_candidate,
            last_error: session.last_error,
            last_result: session.last_result,
            events: session.events,
        }
    }
}

impl SessionOutcome {
    pub fn is_success(&self) -> bool {
        self.state == SessionState::Success
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        match self.state {
            SessionState::Stopped(reason) => Some(reason),
            _ => None,
        }
    }

    /// Whether any fix was applied.
    pub fn changed(&self) -> bool {
        self.final_source != self.original_source
    }

    /// User-facing one-line result.
    pub fn summary(&self) -> String {
        match self.state {
            SessionState::Success if self.attempts == 1 => "Script ran successfully.".to_string(),
            SessionState::Success => format!("Script ran successfully after {} attempts.", self.attempts),
            SessionState::Stopped(StopReason::Unparseable) => "Could not diagnose the failure.".to_string(),
            SessionState::Stopped(StopReason::NoFix) => "Could not generate a fix.".to_string(),
            SessionState::Stopped(StopReason::Rejected) => "Fix rejected.".to_string(),
            SessionState::Stopped(StopReason::PatchFailed) => "Could not apply the fix.".to_string(),
            SessionState::Stopped(StopReason::Exhausted) => format!("Gave up after {} attempts.", self.attempts),
            state => format!("Session ended in non-terminal state {}", state),
        }
    }
}
