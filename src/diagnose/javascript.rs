//! Node.js uncaught-exception report extraction.
//!
//! Node prints the throw site as a `path:line` header, the offending source
//! line with a caret, a blank line, then `Kind: message` and `at ...` frames.
//! Parse-time failures carry the same header but only internal frames (or
//! none at all).

use std::sync::LazyLock;

use regex::Regex;

use super::record::ErrorRecord;

static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<file>(?:file://)?[^\s:]+):(?P<line>\d+)$").expect("HEADER_RE regex should compile")
});

static TERMINAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:Uncaught )?(?P<kind>[A-Z][A-Za-z0-9_$]*(?:Error|Exception)|Error)(?:(?: \[(?P<code>[A-Z0-9_]+)\])?: ?(?P<message>.*))?$",
    )
    .expect("TERMINAL_RE regex should compile")
});

static FRAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s+at (?:(?P<func>.+?) \()?(?P<file>[^\s()]+?):(?P<line>\d+):(?P<col>\d+)\)?\s*$")
        .expect("FRAME_RE regex should compile")
});

#[derive(Debug, Clone)]
struct Location {
    file: String,
    line: u32,
}

/// Extract an [`ErrorRecord`] from Node.js stderr.
pub fn classify(stderr: &str) -> Option<ErrorRecord> {
    let lines: Vec<&str> = stderr.lines().collect();
    let mut header: Option<Location> = None;
    let mut found: Option<(Location, String, String)> = None;

    for (idx, line) in lines.iter().enumerate() {
        if let Some(caps) = HEADER_RE.captures(line) {
            if let Ok(line_number) = caps["line"].parse::<u32>() {
                header = Some(Location {
                    file: strip_file_scheme(&caps["file"]),
                    line: line_number,
                });
            }
            continue;
        }

        let Some(caps) = TERMINAL_RE.captures(line) else {
            continue;
        };
        let kind = caps["kind"].to_string();

        let rest = &lines[idx + 1..];
        let continuation = continuation_lines(rest);
        let frames: Vec<Location> = rest[continuation.len()..]
            .iter()
            .map_while(|l| parse_frame(l))
            .collect();

        let user_frame = frames.iter().find(|f| !is_internal(&f.file)).cloned();
        let location = match (&header, user_frame) {
            // runtime dialect: a stack follows the terminal line
            (Some(h), _) if !frames.is_empty() => Some(h.clone()),
            (None, Some(f)) => Some(f),
            // parse-time dialect: header plus SyntaxError, stack optional
            (Some(h), _) if kind == "SyntaxError" => Some(h.clone()),
            _ => None,
        };
        let Some(location) = location else {
            continue;
        };

        let mut message = caps
            .name("message")
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();
        for extra in continuation {
            if !message.is_empty() {
                message.push(' ');
            }
            message.push_str(extra);
        }

        found = Some((location, kind, message));
        header = None;
    }

    found.map(|(loc, kind, message)| ErrorRecord::new(loc.file, loc.line, kind, message, stderr))
}

fn parse_frame(line: &str) -> Option<Location> {
    let caps = FRAME_RE.captures(line)?;
    let line_number = caps["line"].parse::<u32>().ok()?;
    Some(Location {
        file: strip_file_scheme(&caps["file"]),
        line: line_number,
    })
}

fn is_internal(file: &str) -> bool {
    file.starts_with("node:") || file.starts_with("internal/")
}

fn strip_file_scheme(file: &str) -> String {
    file.strip_prefix("file://").unwrap_or(file).to_string()
}

fn continuation_lines<'a>(rest: &[&'a str]) -> Vec<&'a str> {
    rest.iter()
        .take_while(|l| !l.trim().is_empty() && !FRAME_RE.is_match(l))
        .map(|l| l.trim())
        .collect()
}
