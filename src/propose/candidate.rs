//! Fix candidates and parsing of raw model output.

use serde::{Deserialize, Serialize};

use crate::prompt::SEPARATOR;

/// A model-proposed replacement source plus optional rationale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixCandidate {
    pub explanation: Option<String>,
    pub code: String,
}

/// Split a raw response into explanation and code.
///
/// The first separator line divides the two; without one the whole response
/// is code. Returns `None` when no code remains after fence stripping.
pub fn parse_response(raw: &str, fence_tags: &[&str]) -> Option<FixCandidate> {
    let (explanation, code) = match raw.split_once(SEPARATOR) {
        Some((before, after)) => {
            let before = before.trim();
            ((!before.is_empty()).then(|| before.to_string()), after)
        }
        None => (None, raw),
    };

    let code = normalize_code(&strip_fences(code, fence_tags))?;
    Some(FixCandidate { explanation, code })
}

/// Drop the markdown fence wrapping the code: an opening ```` ``` ```` line
/// (bare or tagged with a known info string) as the first non-blank line,
/// and the matching bare closing line as the last non-blank one. Interior
/// lines are never touched; fences for other languages are left alone.
pub fn strip_fences(code: &str, fence_tags: &[&str]) -> String {
    let mut lines: Vec<&str> = code.lines().collect();
    let Some(open) = lines.iter().position(|l| !l.trim().is_empty()) else {
        return code.to_string();
    };
    if !is_opening_fence(lines[open], fence_tags) {
        return code.to_string();
    }
    lines.remove(open);
    if let Some(close) = lines.iter().rposition(|l| !l.trim().is_empty())
        && lines[close].trim() == "```"
    {
        lines.remove(close);
    }
    lines.join("\n")
}

fn is_opening_fence(line: &str, fence_tags: &[&str]) -> bool {
    let Some(info) = line.trim().strip_prefix("```") else {
        return false;
    };
    let info = info.trim();
    info.is_empty() || fence_tags.iter().any(|tag| tag.eq_ignore_ascii_case(info))
}

/// Remove leading blank lines and trailing whitespace, end with one newline.
fn normalize_code(code: &str) -> Option<String> {
    let body = code.trim_end();
    let body = match body.lines().position(|l| !l.trim().is_empty()) {
        Some(first) => body.lines().skip(first).collect::<Vec<_>>().join("\n"),
        None => return None,
    };
    Some(format!("{}\n", body))
}
