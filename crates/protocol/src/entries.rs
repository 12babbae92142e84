use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Number of leading message characters that participate in the dedup key.
pub const DEDUP_MESSAGE_PREFIX_CHARS: usize = 80;

/// One diagnostic reported by the editor: a script that failed to load, or a line scraped from
/// an editor/runtime log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ErrorEntry {
    pub message: String,
    /// `res://` path of the offending script, empty when unknown.
    #[serde(default)]
    pub file: String,
    /// 1-based line number, `-1` when unknown.
    #[serde(default = "unknown_line")]
    pub line: i64,
    #[serde(default)]
    pub timestamp: i64,
}

pub type WarningEntry = ErrorEntry;

const fn unknown_line() -> i64 {
    -1
}

impl ErrorEntry {
    pub fn new(message: impl Into<String>, file: impl Into<String>, line: i64, timestamp: i64) -> Self {
        Self {
            message: message.into(),
            file: file.into(),
            line,
            timestamp,
        }
    }

    pub fn dedup_key(&self) -> String {
        dedup_key(&self.file, &self.message)
    }
}

/// `file|<first 80 chars of message>`.
///
/// Two different errors in the same file sharing the same 80-char prefix collapse into one.
#[must_use]
pub fn dedup_key(file: &str, message: &str) -> String {
    let prefix: String = message.chars().take(DEDUP_MESSAGE_PREFIX_CHARS).collect();
    format!("{file}|{prefix}")
}

/// Removes entries whose dedup key was already seen, keeping first-seen order.
#[must_use]
pub fn dedup_entries(entries: Vec<ErrorEntry>) -> Vec<ErrorEntry> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|entry| seen.insert(entry.dedup_key()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn same_prefix_in_same_file_collapses() {
        let long = "Invalid call. Nonexistent function 'take_damage' in base 'Nil'. This message is longer than eighty characters";
        let entries = vec![
            ErrorEntry::new(format!("{long} (a)"), "res://player.gd", 10, 0),
            ErrorEntry::new(format!("{long} (b)"), "res://player.gd", 42, 0),
        ];
        let deduped = dedup_entries(entries);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].line, 10);
    }

    #[test]
    fn same_message_in_different_files_is_kept() {
        let entries = vec![
            ErrorEntry::new("Parse Error: bad indent", "res://a.gd", 1, 0),
            ErrorEntry::new("Parse Error: bad indent", "res://b.gd", 1, 0),
            ErrorEntry::new("Parse Error: bad indent", "res://a.gd", 7, 0),
        ];
        let deduped = dedup_entries(entries);
        let files: Vec<&str> = deduped.iter().map(|e| e.file.as_str()).collect();
        assert_eq!(files, vec!["res://a.gd", "res://b.gd"]);
    }

    #[test]
    fn dedup_is_idempotent() {
        let entries = vec![
            ErrorEntry::new("x", "res://a.gd", 1, 0),
            ErrorEntry::new("y", "", -1, 0),
            ErrorEntry::new("x", "res://a.gd", 2, 0),
            ErrorEntry::new("y", "", -1, 5),
            ErrorEntry::new("z", "res://c.gd", 3, 0),
        ];
        let once = dedup_entries(entries);
        let twice = dedup_entries(once.clone());
        assert_eq!(once, twice);
        assert_eq!(once.len(), 3);
    }

    #[test]
    fn key_counts_chars_not_bytes() {
        let message = "é".repeat(100);
        let key = dedup_key("res://a.gd", &message);
        assert_eq!(key.chars().count(), "res://a.gd|".len() + 80);
    }

    #[test]
    fn missing_fields_default_on_decode() {
        let entry: ErrorEntry = serde_json::from_str(r#"{"message":"boom"}"#).unwrap();
        assert_eq!(entry.file, "");
        assert_eq!(entry.line, -1);
        assert_eq!(entry.timestamp, 0);
    }
}
