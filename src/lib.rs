//! Fixloop - run a script in a container, diagnose its failure, ask a model
//! for a fix, apply it and try again.
//!
//! The pieces are independent and recover their own failures:
//! [`sandbox`] runs code, [`diagnose`] parses stderr, [`propose`] asks the
//! model (through the [`store`] cache), [`patch`] writes the fix with a backup.
//! [`session`] drives them through a bounded number of attempts.

pub mod config;
pub mod diagnose;
pub mod diff;
pub mod error;
pub mod id;
pub mod language;
pub mod llm;
pub mod patch;
pub mod prompt;
pub mod propose;
pub mod sandbox;
pub mod session;
pub mod store;
pub mod workspace;

pub use error::{FixloopError, Result};
