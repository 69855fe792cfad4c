//! ID generation utilities for fixloop
//!
//! Provides functions for generating identifiers for sessions and containers.

use rand::Rng;

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Generate a unique session ID
///
/// Format: `{timestamp_ms}-{random_hex}`
/// Example: `1738300800123-a1b2`
pub fn generate_session_id() -> String {
    let timestamp = now_ms();
    let random: u16 = rand::rng().random();
    format!("{}-{:04x}", timestamp, random)
}

/// Generate a container name for one execution
///
/// Format: `fixloop-{scope}-{random_hex}`. Names must be unique per engine,
/// so every call gets fresh randomness even for the same scope.
pub fn generate_container_name(scope: &str) -> String {
    let random: u32 = rand::rng().random();
    let scope: String = scope
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect();
    format!("fixloop-{}-{:08x}", scope, random)
}
