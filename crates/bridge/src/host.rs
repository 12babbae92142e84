use crate::godot::{GodotScriptLoader, RunningScene};
use crate::{BridgeError, Result};
use async_trait::async_trait;
use gdbridge_collector::{ScriptLoader, StaticScriptLoader};
use gdbridge_protocol::paths::{resolve_res_path, run_log_path, to_res_path};
use gdbridge_scanner::{FileScanner, ScanOptions};
use gdbridge_scene::ProjectSettings;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;

/// Project files known to the host, as `res://` paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileIndex {
    pub scripts: Vec<String>,
    pub scenes: Vec<String>,
}

/// What the bridge needs from the running editor.
#[async_trait]
pub trait EditorHost: Send + Sync {
    fn project_root(&self) -> &Path;

    fn project_name(&self) -> Option<String>;

    /// Configured main scene, exactly as written in project settings.
    fn main_scene(&self) -> Option<String>;

    /// Snapshot of the file index as of the last rescan.
    fn file_index(&self) -> FileIndex;

    /// Re-walks the project and replaces the file index.
    async fn rescan(&self) -> Result<FileIndex>;

    /// Force-reload primitive used by the error collector.
    fn script_loader(&self) -> Arc<dyn ScriptLoader>;

    /// Plays `scene`, replacing anything already playing.
    async fn play_scene(&self, scene: &str) -> Result<()>;

    /// Stops the running scene; `Ok(false)` when nothing was playing.
    async fn stop_playing(&self) -> Result<bool>;

    /// Scene currently playing, if any.
    async fn playing_scene(&self) -> Option<String>;

    fn read_text(&self, res_path: &str) -> Result<String> {
        let path = resolve_res_path(self.project_root(), res_path)
            .ok_or_else(|| BridgeError::InvalidPath(res_path.to_string()))?;
        Ok(std::fs::read_to_string(path)?)
    }

    fn write_text(&self, res_path: &str, text: &str) -> Result<()> {
        let path = resolve_res_path(self.project_root(), res_path)
            .ok_or_else(|| BridgeError::InvalidPath(res_path.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(std::fs::write(path, text)?)
    }
}

/// Host backed by the project directory and, optionally, a Godot executable.
///
/// Without an executable, scripts are checked statically and running scenes is unavailable.
pub struct LocalEditorHost {
    root: PathBuf,
    godot_bin: Option<PathBuf>,
    index: RwLock<FileIndex>,
    running: Mutex<Option<RunningScene>>,
}

impl LocalEditorHost {
    pub fn new(root: impl Into<PathBuf>, godot_bin: Option<PathBuf>) -> Self {
        let root = root.into();
        let index = scan_index(&root);
        Self {
            root,
            godot_bin,
            index: RwLock::new(index),
            running: Mutex::new(None),
        }
    }

    fn settings(&self) -> Option<ProjectSettings> {
        match ProjectSettings::load(&self.root) {
            Ok(settings) => settings,
            Err(err) => {
                log::warn!("Failed to read project.godot: {err}");
                None
            }
        }
    }
}

fn scan_index(root: &Path) -> FileIndex {
    let res_paths = |options: ScanOptions| {
        FileScanner::new(root, options)
            .scan()
            .iter()
            .map(|path| to_res_path(root, path))
            .collect()
    };
    FileIndex {
        scripts: res_paths(ScanOptions::scripts()),
        scenes: res_paths(ScanOptions::scenes()),
    }
}

#[async_trait]
impl EditorHost for LocalEditorHost {
    fn project_root(&self) -> &Path {
        &self.root
    }

    fn project_name(&self) -> Option<String> {
        self.settings()
            .and_then(|settings| settings.project_name().map(str::to_string))
    }

    fn main_scene(&self) -> Option<String> {
        self.settings()
            .and_then(|settings| settings.main_scene().map(str::to_string))
    }

    fn file_index(&self) -> FileIndex {
        match self.index.read() {
            Ok(index) => index.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    async fn rescan(&self) -> Result<FileIndex> {
        let root = self.root.clone();
        let index = tokio::task::spawn_blocking(move || scan_index(&root))
            .await
            .map_err(|err| BridgeError::Unavailable(format!("rescan task failed: {err}")))?;
        match self.index.write() {
            Ok(mut guard) => *guard = index.clone(),
            Err(poisoned) => *poisoned.into_inner() = index.clone(),
        }
        log::debug!(
            "Rescanned project: {} scripts, {} scenes",
            index.scripts.len(),
            index.scenes.len()
        );
        Ok(index)
    }

    fn script_loader(&self) -> Arc<dyn ScriptLoader> {
        match &self.godot_bin {
            Some(bin) => Arc::new(GodotScriptLoader::new(bin.clone(), self.root.clone())),
            None => Arc::new(StaticScriptLoader),
        }
    }

    async fn play_scene(&self, scene: &str) -> Result<()> {
        let Some(bin) = &self.godot_bin else {
            return Err(BridgeError::Unavailable(
                "no Godot executable configured (set GODOT_BIN or pass --godot-bin)".to_string(),
            ));
        };
        if resolve_res_path(&self.root, scene).is_none() && !scene.starts_with("uid://") {
            return Err(BridgeError::InvalidPath(scene.to_string()));
        }

        let mut running = self.running.lock().await;
        if let Some(previous) = running.take() {
            previous.stop().await?;
        }
        let started = RunningScene::spawn(bin, &self.root, scene, &run_log_path(&self.root)).await?;
        *running = Some(started);
        Ok(())
    }

    async fn stop_playing(&self) -> Result<bool> {
        let mut running = self.running.lock().await;
        let Some(mut scene) = running.take() else {
            return Ok(false);
        };
        if !scene.is_alive() {
            return Ok(false);
        }
        scene.stop().await?;
        Ok(true)
    }

    async fn playing_scene(&self) -> Option<String> {
        let mut running = self.running.lock().await;
        let alive = running.as_mut().is_some_and(RunningScene::is_alive);
        if !alive {
            *running = None;
        }
        running.as_ref().map(|scene| scene.scene.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    fn project() -> tempfile::TempDir {
        let temp = tempdir().unwrap();
        fs::write(
            temp.path().join("project.godot"),
            "[application]\nconfig/name=\"Dodge\"\nrun/main_scene=\"res://main.tscn\"\n",
        )
        .unwrap();
        fs::write(temp.path().join("main.tscn"), "[gd_scene format=3]\n").unwrap();
        fs::write(temp.path().join("player.gd"), "extends Node\n").unwrap();
        temp
    }

    #[tokio::test]
    async fn indexes_and_rescans_project_files() {
        let temp = project();
        let host = LocalEditorHost::new(temp.path(), None);
        assert_eq!(host.project_name().as_deref(), Some("Dodge"));
        assert_eq!(host.main_scene().as_deref(), Some("res://main.tscn"));
        assert_eq!(
            host.file_index(),
            FileIndex {
                scripts: vec!["res://player.gd".to_string()],
                scenes: vec!["res://main.tscn".to_string()],
            }
        );

        fs::write(temp.path().join("enemy.gd"), "extends Node\n").unwrap();
        assert_eq!(host.file_index().scripts.len(), 1);
        let index = host.rescan().await.unwrap();
        assert_eq!(index.scripts, vec!["res://enemy.gd", "res://player.gd"]);
        assert_eq!(host.file_index(), index);
    }

    #[tokio::test]
    async fn running_without_godot_is_unavailable() {
        let temp = project();
        let host = LocalEditorHost::new(temp.path(), None);
        assert!(matches!(
            host.play_scene("res://main.tscn").await,
            Err(BridgeError::Unavailable(_))
        ));
        assert_eq!(host.playing_scene().await, None);
        assert!(!host.stop_playing().await.unwrap());
    }

    #[test]
    fn text_access_stays_inside_project() {
        let temp = project();
        let host = LocalEditorHost::new(temp.path(), None);
        host.write_text("res://notes/todo.txt", "hello").unwrap();
        assert_eq!(host.read_text("res://notes/todo.txt").unwrap(), "hello");
        assert!(matches!(
            host.read_text("res://../outside.txt"),
            Err(BridgeError::InvalidPath(_))
        ));
    }
}
