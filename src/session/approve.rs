//! Accept/reject decisions for candidate fixes.

use async_trait::async_trait;
use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use crate::config::ApprovalMode;
use crate::diagnose::ErrorRecord;
use crate::diff;
use crate::propose::FixCandidate;

/// What a reviewer sees before deciding.
#[derive(Debug, Clone, Copy)]
pub struct FixReview<'a> {
    pub attempt: u32,
    pub max_attempts: u32,
    pub file_name: &'a str,
    pub error: &'a ErrorRecord,
    pub current_source: &'a str,
    pub candidate: &'a FixCandidate,
}

impl FixReview<'_> {
    pub fn diff(&self) -> String {
        diff::unified(
            self.current_source,
            &self.candidate.code,
            self.file_name,
            &format!("{} (proposed)", self.file_name),
        )
    }
}

#[async_trait]
pub trait FixApprover: Send + Sync {
    async fn approve(&self, review: FixReview<'_>) -> bool;
}

/// Accepts every candidate (headless mode).
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoApprover;

#[async_trait]
impl FixApprover for AutoApprover {
    async fn approve(&self, _review: FixReview<'_>) -> bool {
        true
    }
}

/// Prints the explanation and a colored diff, then asks on stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleApprover;

impl ConsoleApprover {
    fn render(review: &FixReview<'_>) -> String {
        let mut out = format!(
            "\n{} attempt {}/{}: {}\n",
            "Proposed fix".bold(),
            review.attempt,
            review.max_attempts,
            review.error.summary()
        );
        if let Some(explanation) = &review.candidate.explanation {
            out.push_str(&format!("\n{}\n", explanation));
        }
        let diff = review.diff();
        if diff.is_empty() {
            out.push_str(&format!("\n{}\n", "(candidate is identical to the current source)".yellow()));
        } else {
            out.push_str(&format!("\n{}\n", diff::colorize(&diff)));
        }
        out
    }
}

/// `y`/`yes` (any case) accepts; anything else rejects.
pub fn parse_answer(line: &str) -> bool {
    matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[async_trait]
impl FixApprover for ConsoleApprover {
    async fn approve(&self, review: FixReview<'_>) -> bool {
        let text = Self::render(&review);
        let answer = tokio::task::spawn_blocking(move || -> io::Result<String> {
            let mut stdout = io::stdout().lock();
            write!(stdout, "{}\nApply this fix? [y/N] ", text)?;
            stdout.flush()?;
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            Ok(line)
        })
        .await;

        match answer {
            Ok(Ok(line)) => parse_answer(&line),
            Ok(Err(e)) => {
                log::warn!("Failed to read approval: {}", e);
                false
            }
            Err(e) => {
                log::warn!("Approval prompt task failed: {}", e);
                false
            }
        }
    }
}

/// Approver for the configured mode.
pub fn approver_for(mode: ApprovalMode) -> Arc<dyn FixApprover> {
    match mode {
        ApprovalMode::Auto => Arc::new(AutoApprover),
        ApprovalMode::Interactive => Arc::new(ConsoleApprover),
    }
}
