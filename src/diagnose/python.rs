//! Python traceback extraction.
//!
//! Two dialects are recognised:
//! - runtime: `File "x", line N, in scope` frames followed by `Kind: message`
//! - parse-time: a single `File "x", line N` frame (no scope) followed by a
//!   `SyntaxError`, `IndentationError` or `TabError` line

use std::sync::LazyLock;

use regex::Regex;

use super::record::ErrorRecord;

static FRAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*File "(?P<file>[^"]+)", line (?P<line>\d+)(?P<scope>, in .+)?\s*$"#)
        .expect("FRAME_RE regex should compile")
});

static TERMINAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<kind>(?:[A-Za-z_]\w*\.)*[A-Za-z_]\w*(?:Error|Exception|Warning|Interrupt|Exit|Iteration))(?::\s?(?P<message>.*))?$",
    )
    .expect("TERMINAL_RE regex should compile")
});

const PARSE_TIME_KINDS: &[&str] = &["SyntaxError", "IndentationError", "TabError"];

#[derive(Debug, Clone)]
struct Frame {
    file: String,
    line: u32,
    in_call: bool,
}

/// Extract an [`ErrorRecord`] from Python stderr.
pub fn classify(stderr: &str) -> Option<ErrorRecord> {
    let lines: Vec<&str> = stderr.lines().collect();
    let mut last_frame: Option<Frame> = None;
    let mut found: Option<(Frame, String, String)> = None;

    for (idx, line) in lines.iter().enumerate() {
        if let Some(caps) = FRAME_RE.captures(line) {
            let Ok(line_number) = caps["line"].parse::<u32>() else {
                continue;
            };
            last_frame = Some(Frame {
                file: caps["file"].to_string(),
                line: line_number,
                in_call: caps.name("scope").is_some(),
            });
            continue;
        }

        let Some(caps) = TERMINAL_RE.captures(line) else {
            continue;
        };
        let Some(frame) = last_frame.as_ref() else {
            continue;
        };

        let kind = caps["kind"].to_string();
        if !frame.in_call && !is_parse_time_kind(&kind) {
            continue;
        }

        let mut message = caps
            .name("message")
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();
        for continuation in continuation_lines(&lines[idx + 1..]) {
            if !message.is_empty() {
                message.push(' ');
            }
            message.push_str(continuation);
        }

        found = Some((frame.clone(), kind, message));
        last_frame = None;
    }

    found.map(|(frame, kind, message)| ErrorRecord::new(frame.file, frame.line, kind, message, stderr))
}

fn is_parse_time_kind(kind: &str) -> bool {
    let short = kind.rsplit('.').next().unwrap_or(kind);
    PARSE_TIME_KINDS.contains(&short)
}

/// Lines that continue a wrapped message, up to the next structural line.
fn continuation_lines<'a>(rest: &[&'a str]) -> Vec<&'a str> {
    rest.iter()
        .take_while(|l| {
            let t = l.trim();
            !t.is_empty()
                && !FRAME_RE.is_match(l)
                && !t.starts_with("Traceback (most recent call last)")
                && !t.starts_with("During handling of the above exception")
                && !t.starts_with("The above exception was the direct cause")
        })
        .map(|l| l.trim())
        .collect()
}
