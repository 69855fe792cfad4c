//! Control Loop - one bounded repair session
//!
//! A session owns a private working copy of the user's script and walks the
//! state graph in [`state`] until it reaches `Success` or `Stopped(_)`.

mod approve;
mod event;
mod record;
mod runner;
mod state;

pub use approve::{AutoApprover, ConsoleApprover, FixApprover, FixReview, approver_for, parse_answer};
pub use event::{SessionEvent, SessionJournal};
pub use record::{Session, SessionOutcome};
pub use runner::{Patcher, SessionRunner, SessionRunnerConfig};
pub use state::{SessionState, StopReason};
