use sha2::{Digest, Sha256};

use crate::diagnose::ErrorRecord;

/// Cache key: SHA-256 hex over source ++ canonical record JSON ++ language tag.
pub fn cache_key(source: &str, record: &ErrorRecord, language: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(record.canonical_json().as_bytes());
    hasher.update(language.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(message: &str) -> ErrorRecord {
        ErrorRecord::new("/app/main.py", 3, "NameError", message, "trace")
    }

    #[test]
    fn test_key_is_64_hex_chars() {
        let key = cache_key("print(x)\n", &record("x"), "python");
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_key_is_deterministic() {
        assert_eq!(
            cache_key("a", &record("m"), "python"),
            cache_key("a", &record("m"), "python")
        );
    }

    #[test]
    fn test_each_input_changes_key() {
        let base = cache_key("a", &record("m"), "python");
        assert_ne!(base, cache_key("b", &record("m"), "python"));
        assert_ne!(base, cache_key("a", &record("n"), "python"));
        assert_ne!(base, cache_key("a", &record("m"), "javascript"));
    }
}
