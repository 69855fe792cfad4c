//! Session runner - drives one script through execute, diagnose, fix, apply.
//!
//! Each attempt runs the working copy in a fresh sandbox. On failure the
//! stderr is classified, a fix is proposed and (once accepted) written over
//! the working copy, and the next attempt starts. The loop ends on success or
//! at the first stop condition.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::approve::{FixApprover, FixReview};
use super::event::SessionJournal;
use super::record::{Session, SessionOutcome};
use super::state::{SessionState, StopReason};
use crate::diagnose::Classifier;
use crate::error::Result;
use crate::id::generate_session_id;
use crate::language::Language;
use crate::llm::LlmClient;
use crate::patch;
use crate::propose::FixProposer;
use crate::sandbox::Sandbox;
use crate::workspace::WorkspaceManager;

/// Configuration for the SessionRunner.
#[derive(Debug, Clone)]
pub struct SessionRunnerConfig {
    /// Executions allowed per session
    pub max_attempts: u32,
    /// Where to write `<session-id>.jsonl` event logs, if anywhere
    pub journal_dir: Option<PathBuf>,
}

impl Default for SessionRunnerConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            journal_dir: None,
        }
    }
}

/// Writes a candidate over the working copy; `false` leaves it unchanged.
pub type Patcher = Arc<dyn Fn(&Path, &str) -> bool + Send + Sync>;

pub struct SessionRunner<S, L>
where
    S: Sandbox,
    L: LlmClient,
{
    sandbox: Arc<S>,
    classifier: Classifier,
    proposer: FixProposer<L>,
    approver: Arc<dyn FixApprover>,
    workspace: WorkspaceManager,
    patcher: Patcher,
    config: SessionRunnerConfig,
}

impl<S, L> SessionRunner<S, L>
where
    S: Sandbox,
    L: LlmClient,
{
    pub fn new(
        sandbox: Arc<S>,
        classifier: Classifier,
        proposer: FixProposer<L>,
        approver: Arc<dyn FixApprover>,
        workspace: WorkspaceManager,
    ) -> Self {
        Self::with_config(
            sandbox,
            classifier,
            proposer,
            approver,
            workspace,
            SessionRunnerConfig::default(),
        )
    }

    pub fn with_config(
        sandbox: Arc<S>,
        classifier: Classifier,
        proposer: FixProposer<L>,
        approver: Arc<dyn FixApprover>,
        workspace: WorkspaceManager,
        config: SessionRunnerConfig,
    ) -> Self {
        Self {
            sandbox,
            classifier,
            proposer,
            approver,
            workspace,
            patcher: Arc::new(patch::apply),
            config,
        }
    }

    /// Replace [`patch::apply`] as the way fixes reach the working copy.
    pub fn with_patcher(mut self, patcher: Patcher) -> Self {
        self.patcher = patcher;
        self
    }

    /// Run a full session on a private copy of `source` named `file_name`.
    ///
    /// The caller's file is never touched; the final source is returned in
    /// the outcome. The workspace is removed before returning, whatever the
    /// result.
    pub async fn run(&self, file_name: &str, source: &str, language: Language) -> Result<SessionOutcome> {
        let id = generate_session_id();
        let mut session = Session::new(&id, language, source, self.config.max_attempts)?;
        log::info!(
            "Starting session {} for {} ({}, max {} attempts)",
            id,
            file_name,
            language,
            session.max_attempts
        );

        let journal = self.config.journal_dir.as_deref().and_then(|dir| {
            SessionJournal::open(dir, &id)
                .map_err(|e| log::warn!("Session journal disabled: {}", e))
                .ok()
        });

        let working_copy = self.workspace.create(&id, file_name, source)?;
        let driven = self
            .drive(&mut session, &working_copy, file_name, journal.as_ref())
            .await;

        if let Err(e) = self.workspace.cleanup(&id) {
            log::warn!("Failed to clean up workspace for {}: {}", id, e);
        }
        driven?;

        log::info!("Session {} finished: {}", id, session.state);
        Ok(SessionOutcome::from(session))
    }

    async fn drive(
        &self,
        session: &mut Session,
        working_copy: &Path,
        file_name: &str,
        journal: Option<&SessionJournal>,
    ) -> Result<()> {
        let tag = session.language.tag();
        self.step(session, SessionState::Executing, "attempt 1", journal)?;

        loop {
            let result = self.sandbox.execute(working_copy, tag).await;
            let succeeded = result.succeeded();
            let status = result.exit_status;
            let stderr = result.stderr.clone();
            session.last_result = Some(result);

            if succeeded {
                return self.step(session, SessionState::Success, "exit status 0", journal);
            }
            self.step(
                session,
                SessionState::Classifying,
                format!("exit status {}", status),
                journal,
            )?;

            let Some(record) = self.classifier.classify(&stderr, tag) else {
                return self.stop(session, StopReason::Unparseable, journal);
            };
            let summary = record.summary();
            session.last_error = Some(record.clone());
            self.step(session, SessionState::ProposingFix, summary, journal)?;

            let Some(candidate) = self
                .proposer
                .propose(&session.current_source, &record, session.language)
                .await
            else {
                return self.stop(session, StopReason::NoFix, journal);
            };
            self.step(
                session,
                SessionState::AwaitingAccept,
                candidate.explanation.clone().unwrap_or_default(),
                journal,
            )?;

            let review = FixReview {
                attempt: session.attempt_count,
                max_attempts: session.max_attempts,
                file_name,
                error: &record,
                current_source: &session.current_source,
                candidate: &candidate,
            };
            let accepted = self.approver.approve(review).await;
            session.last_candidate = Some(candidate.clone());
            if !accepted {
                return self.stop(session, StopReason::Rejected, journal);
            }

            self.step(session, SessionState::Applying, "", journal)?;
            if !(self.patcher)(working_copy, &candidate.code) {
                return self.stop(session, StopReason::PatchFailed, journal);
            }
            session.current_source = candidate.code;

            if session.budget_spent() {
                return self.stop(session, StopReason::Exhausted, journal);
            }
            session.next_attempt()?;
            let detail = format!("attempt {}", session.attempt_count);
            self.step(session, SessionState::Executing, detail, journal)?;
        }
    }

    fn stop(&self, session: &mut Session, reason: StopReason, journal: Option<&SessionJournal>) -> Result<()> {
        self.step(session, SessionState::Stopped(reason), "", journal)
    }

    fn step(
        &self,
        session: &mut Session,
        to: SessionState,
        detail: impl Into<String>,
        journal: Option<&SessionJournal>,
    ) -> Result<()> {
        let event = session.transition(to, detail)?;
        if let Some(journal) = journal
            && let Err(e) = journal.append(&event)
        {
            log::warn!("Failed to append to {}: {}", journal.path().display(), e);
        }
        Ok(())
    }
}
