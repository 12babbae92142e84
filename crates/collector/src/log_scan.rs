use crate::classifier::{LineKind, LogLineClassifier};
use gdbridge_protocol::ErrorEntry;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

/// Most recent entries kept per category when scraping logs.
pub const MAX_LOG_ENTRIES_PER_KIND: usize = 50;

/// Accumulates classified log lines across one or more log tails, keeping only the most recent
/// [`MAX_LOG_ENTRIES_PER_KIND`] errors and warnings (oldest dropped first).
pub struct LogScan<'a> {
    classifier: &'a dyn LogLineClassifier,
    timestamp: i64,
    errors: VecDeque<ErrorEntry>,
    warnings: VecDeque<ErrorEntry>,
}

impl<'a> LogScan<'a> {
    pub fn new(classifier: &'a dyn LogLineClassifier, timestamp: i64) -> Self {
        Self {
            classifier,
            timestamp,
            errors: VecDeque::new(),
            warnings: VecDeque::new(),
        }
    }

    pub fn push_text(&mut self, text: &str) {
        let lines: Vec<&str> = text.lines().collect();
        for (idx, raw) in lines.iter().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let Some(kind) = self.classifier.classify(line) else {
                continue;
            };
            // Godot prints the stack frame (`at: res://x.gd:12`) on the line after the message.
            let location = self.classifier.locate(line).or_else(|| {
                lines
                    .get(idx + 1)
                    .and_then(|next| self.classifier.locate(next))
            });
            let (file, line_no) = location.unwrap_or_else(|| (String::new(), -1));
            let entry = ErrorEntry::new(line, file, line_no, self.timestamp);
            let bucket = match kind {
                LineKind::Error => &mut self.errors,
                LineKind::Warning => &mut self.warnings,
            };
            bucket.push_back(entry);
            if bucket.len() > MAX_LOG_ENTRIES_PER_KIND {
                bucket.pop_front();
            }
        }
    }

    pub fn finish(self) -> (Vec<ErrorEntry>, Vec<ErrorEntry>) {
        (self.errors.into(), self.warnings.into())
    }
}

/// Where Godot writes logs for a project called `project_name`, plus the project-local ones.
///
/// All three desktop conventions are listed regardless of the current OS; callers read the ones
/// that exist.
pub fn default_log_paths(root: &Path, project_name: Option<&str>) -> Vec<PathBuf> {
    let mut paths = vec![
        root.join("logs").join("godot.log"),
        gdbridge_protocol::paths::run_log_path(root),
    ];

    let Some(name) = project_name.map(str::trim).filter(|n| !n.is_empty()) else {
        return paths;
    };
    let app_userdata = |base: PathBuf| {
        base.join("app_userdata")
            .join(name)
            .join("logs")
            .join("godot.log")
    };
    if let Some(home) = dirs::home_dir() {
        paths.push(app_userdata(home.join(".local").join("share").join("godot")));
        paths.push(app_userdata(
            home.join("Library")
                .join("Application Support")
                .join("Godot"),
        ));
    }
    if let Some(appdata) = std::env::var_os("APPDATA") {
        paths.push(app_userdata(PathBuf::from(appdata).join("Godot")));
    }
    paths.dedup();
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::GodotLogClassifier;
    use pretty_assertions::assert_eq;

    #[test]
    fn location_falls_back_to_next_line() {
        let classifier = GodotLogClassifier;
        let mut scan = LogScan::new(&classifier, 7);
        scan.push_text(
            "SCRIPT ERROR: Invalid get index 'hp' (on base: 'Nil').\n   at: _on_hit (res://scripts/enemy.gd:33)\nWARNING: Integer division\n",
        );
        let (errors, warnings) = scan.finish();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].file, "res://scripts/enemy.gd");
        assert_eq!(errors[0].line, 33);
        assert_eq!(errors[0].timestamp, 7);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].file, "");
        assert_eq!(warnings[0].line, -1);
    }

    #[test]
    fn caps_each_category_at_fifty_most_recent() {
        let classifier = GodotLogClassifier;
        let mut scan = LogScan::new(&classifier, 0);
        let mut text = String::new();
        for i in 0..500 {
            text.push_str(&format!("ERROR: failure {i}\nWARNING: note {i}\n"));
        }
        scan.push_text(&text);
        scan.push_text("ERROR: last one\n");
        let (errors, warnings) = scan.finish();
        assert_eq!(errors.len(), MAX_LOG_ENTRIES_PER_KIND);
        assert_eq!(warnings.len(), MAX_LOG_ENTRIES_PER_KIND);
        assert_eq!(errors.last().unwrap().message, "ERROR: last one");
        assert_eq!(errors.first().unwrap().message, "ERROR: failure 451");
        assert_eq!(warnings.first().unwrap().message, "WARNING: note 450");
    }

    #[test]
    fn blank_and_unclassified_lines_are_ignored() {
        let classifier = GodotLogClassifier;
        let mut scan = LogScan::new(&classifier, 0);
        scan.push_text("\n\nGodot Engine v4.3\n   \n");
        let (errors, warnings) = scan.finish();
        assert!(errors.is_empty());
        assert!(warnings.is_empty());
    }

    #[test]
    fn log_paths_include_project_local_files() {
        let root = Path::new("/tmp/game");
        let paths = default_log_paths(root, None);
        assert_eq!(
            paths,
            vec![
                root.join("logs").join("godot.log"),
                root.join(".claude").join("run.log"),
            ]
        );
        let with_name = default_log_paths(root, Some("Space Dodge"));
        assert!(with_name.len() >= 2);
        assert!(with_name[2..]
            .iter()
            .all(|p| p.to_string_lossy().contains("Space Dodge")));
    }
}
