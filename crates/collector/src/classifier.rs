use once_cell::sync::Lazy;
use regex::Regex;

/// What a log line is evidence of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Error,
    Warning,
}

/// Decides which log lines are errors or warnings and where they point.
///
/// Kept behind a trait so the heuristics can be tested against fixed strings and swapped
/// without touching collection or routing.
pub trait LogLineClassifier: Send + Sync {
    fn classify(&self, line: &str) -> Option<LineKind>;

    /// `(res://path.gd, line)` referenced by a log line, if any.
    fn locate(&self, line: &str) -> Option<(String, i64)> {
        extract_script_location(line)
    }
}

const ERROR_MARKERS: &[&str] = &["ERROR:", "SCRIPT ERROR:", "Parse Error:", "Parser Error:"];
const WARNING_MARKER: &str = "WARNING:";
const PROJECT_PATH_MARKER: &str = "res://";

/// Substring heuristics matching Godot 4 editor and runtime output.
#[derive(Debug, Clone, Copy, Default)]
pub struct GodotLogClassifier;

impl LogLineClassifier for GodotLogClassifier {
    fn classify(&self, line: &str) -> Option<LineKind> {
        if ERROR_MARKERS.iter().any(|marker| line.contains(marker)) {
            return Some(LineKind::Error);
        }
        if line.to_ascii_lowercase().contains("error(") && line.contains(PROJECT_PATH_MARKER) {
            return Some(LineKind::Error);
        }
        if line.contains(WARNING_MARKER) {
            return Some(LineKind::Warning);
        }
        None
    }
}

static SCRIPT_LOCATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(res://[^\s:()\x22']+\.gd):(\d+)").expect("valid script location regex")
});

/// Finds the first `res://<path>.gd:<line>` reference in `line`.
pub fn extract_script_location(line: &str) -> Option<(String, i64)> {
    let caps = SCRIPT_LOCATION.captures(line)?;
    let file = caps.get(1)?.as_str().to_string();
    let line_no = caps.get(2)?.as_str().parse().ok()?;
    Some((file, line_no))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn classifies_godot_markers() {
        let classifier = GodotLogClassifier;
        for line in [
            "ERROR: Condition \"!is_inside_tree()\" is true.",
            "SCRIPT ERROR: Invalid call. Nonexistent function 'foo'.",
            "res://player.gd:12 - Parse Error: Expected end of statement",
            "Parser Error: Unexpected indent",
            "push_error(): at res://enemy.gd:40",
        ] {
            assert_eq!(classifier.classify(line), Some(LineKind::Error), "{line}");
        }
        assert_eq!(
            classifier.classify("WARNING: Unused variable 'speed'"),
            Some(LineKind::Warning)
        );
        assert_eq!(classifier.classify("Godot Engine v4.3.stable"), None);
        assert_eq!(classifier.classify("calling error() without a project path"), None);
    }

    #[test]
    fn extracts_script_location() {
        assert_eq!(
            extract_script_location("   at: _ready (res://scripts/player.gd:27)"),
            Some(("res://scripts/player.gd".to_string(), 27))
        );
        assert_eq!(extract_script_location("at: res://main.tscn:3"), None);
        assert_eq!(extract_script_location("no reference"), None);
    }
}
