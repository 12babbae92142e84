//! Project-scoped state layout and `res://` path helpers.

use std::path::{Component, Path, PathBuf};

pub const STATE_DIR_NAME: &str = ".claude";
pub const PHASE_FILE_NAME: &str = "current_phase.json";
pub const BUILD_STATE_FILE_NAME: &str = "build_state.json";
pub const QUALITY_REPORTS_DIR_NAME: &str = "quality_reports";
pub const INTEGRATION_PACKS_DIR_NAME: &str = "integration_packs";
pub const RUN_LOG_FILE_NAME: &str = "run.log";

pub const PROJECT_FILE_NAME: &str = "project.godot";
pub const RES_SCHEME: &str = "res://";
pub const UID_SCHEME: &str = "uid://";

#[must_use]
pub fn state_dir_for_project_root(root: &Path) -> PathBuf {
    root.join(STATE_DIR_NAME)
}

#[must_use]
pub fn phase_file_path(root: &Path) -> PathBuf {
    state_dir_for_project_root(root).join(PHASE_FILE_NAME)
}

#[must_use]
pub fn build_state_path(root: &Path) -> PathBuf {
    state_dir_for_project_root(root).join(BUILD_STATE_FILE_NAME)
}

#[must_use]
pub fn quality_reports_dir(root: &Path) -> PathBuf {
    state_dir_for_project_root(root).join(QUALITY_REPORTS_DIR_NAME)
}

#[must_use]
pub fn integration_packs_dir(root: &Path) -> PathBuf {
    state_dir_for_project_root(root).join(INTEGRATION_PACKS_DIR_NAME)
}

#[must_use]
pub fn run_log_path(root: &Path) -> PathBuf {
    state_dir_for_project_root(root).join(RUN_LOG_FILE_NAME)
}

/// Renders an on-disk path as `res://relative/path` (forward slashes).
///
/// Paths outside `root` are returned as-is (lossy display form).
#[must_use]
pub fn to_res_path(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) => {
            let parts: Vec<String> = rel
                .components()
                .filter_map(|component| match component {
                    Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
                    _ => None,
                })
                .collect();
            format!("{RES_SCHEME}{}", parts.join("/"))
        }
        Err(_) => path.to_string_lossy().into_owned(),
    }
}

/// Resolves `res://a/b.gd` (or a plain relative path) under `root`.
///
/// Returns `None` for `uid://` references, absolute paths, and anything that would escape the
/// project via `..`.
#[must_use]
pub fn resolve_res_path(root: &Path, raw: &str) -> Option<PathBuf> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with(UID_SCHEME) {
        return None;
    }
    let rel = raw.strip_prefix(RES_SCHEME).unwrap_or(raw).replace('\\', "/");
    let rel_path = Path::new(&rel);
    let mut out = root.to_path_buf();
    for component in rel_path.components() {
        match component {
            Component::Normal(name) => out.push(name),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if out == root {
        return None;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn res_paths_round_trip_under_root() {
        let root = Path::new("/tmp/game");
        let on_disk = root.join("scenes").join("menu.tscn");
        assert_eq!(to_res_path(root, &on_disk), "res://scenes/menu.tscn");
        assert_eq!(resolve_res_path(root, "res://scenes/menu.tscn"), Some(on_disk));
    }

    #[test]
    fn resolve_rejects_escapes_and_uids() {
        let root = Path::new("/tmp/game");
        assert_eq!(resolve_res_path(root, "res://../etc/passwd"), None);
        assert_eq!(resolve_res_path(root, "uid://b8x2"), None);
        assert_eq!(resolve_res_path(root, "/etc/passwd"), None);
        assert_eq!(resolve_res_path(root, "res://"), None);
        assert_eq!(
            resolve_res_path(root, "player.gd"),
            Some(root.join("player.gd"))
        );
    }

    #[test]
    fn state_files_live_under_claude_dir() {
        let root = Path::new("/tmp/game");
        assert_eq!(
            phase_file_path(root),
            PathBuf::from("/tmp/game/.claude/current_phase.json")
        );
        assert_eq!(
            quality_reports_dir(root),
            PathBuf::from("/tmp/game/.claude/quality_reports")
        );
    }
}
