//! Per-session scratch directories.
//!
//! Each session gets its own directory holding the working copy of the
//! user's script and its `.bak`; the loop patches that copy, never the
//! original, and the directory is removed at terminal state.

mod manager;

pub use manager::WorkspaceManager;
