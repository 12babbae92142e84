//! Godot executable integration: running scenes and headless script checks.

use async_trait::async_trait;
use gdbridge_collector::{
    CollectorError, GodotLogClassifier, LineKind, LogLineClassifier, ScriptLoadReport,
    ScriptLoader,
};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};

pub const GODOT_BIN_ENV: &str = "GODOT_BIN";
pub const SCRIPT_CHECK_TIMEOUT: Duration = Duration::from_secs(20);

/// Validates scripts with `godot --headless --check-only --script <res://path>`.
///
/// Every call spawns a fresh process, so nothing is served from a resource cache.
#[derive(Debug, Clone)]
pub struct GodotScriptLoader {
    godot_bin: PathBuf,
    project_root: PathBuf,
    timeout: Duration,
}

impl GodotScriptLoader {
    pub fn new(godot_bin: impl Into<PathBuf>, project_root: impl Into<PathBuf>) -> Self {
        Self {
            godot_bin: godot_bin.into(),
            project_root: project_root.into(),
            timeout: SCRIPT_CHECK_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl ScriptLoader for GodotScriptLoader {
    async fn reload_script(
        &self,
        res_path: &str,
        _abs_path: &Path,
    ) -> gdbridge_collector::Result<ScriptLoadReport> {
        let mut command = Command::new(&self.godot_bin);
        command
            .arg("--headless")
            .arg("--path")
            .arg(&self.project_root)
            .arg("--check-only")
            .arg("--script")
            .arg(res_path)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                return Err(CollectorError::LoaderUnavailable(format!(
                    "failed to run {}: {err}",
                    self.godot_bin.display()
                )))
            }
            Err(_) => {
                return Err(CollectorError::LoaderUnavailable(format!(
                    "script check for {res_path} timed out after {:?}",
                    self.timeout
                )))
            }
        };

        let mut text = String::from_utf8_lossy(&output.stderr).into_owned();
        text.push('\n');
        text.push_str(&String::from_utf8_lossy(&output.stdout));
        Ok(report_from_check_output(output.status.success(), &text))
    }
}

/// Maps check-only output to a load report: the first error line becomes the message.
pub fn report_from_check_output(success: bool, output: &str) -> ScriptLoadReport {
    let classifier = GodotLogClassifier;
    let lines: Vec<&str> = output.lines().map(str::trim).collect();
    let first_error = lines
        .iter()
        .position(|line| classifier.classify(line) == Some(LineKind::Error));

    match (success, first_error) {
        (true, None) => ScriptLoadReport::ok(),
        (_, Some(idx)) => {
            let line_no = classifier
                .locate(lines[idx])
                .or_else(|| lines.get(idx + 1).and_then(|next| classifier.locate(next)))
                .map(|(_, line)| line);
            ScriptLoadReport::failed(lines[idx], line_no)
        }
        (false, None) => ScriptLoadReport::failed("Script check failed without diagnostics", None),
    }
}

/// A scene launched with `godot --path <root> <scene>`, output captured to the run log.
pub struct RunningScene {
    pub scene: String,
    child: Child,
}

impl RunningScene {
    pub async fn spawn(
        godot_bin: &Path,
        project_root: &Path,
        scene: &str,
        run_log: &Path,
    ) -> std::io::Result<Self> {
        if let Some(parent) = run_log.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let stdout = std::fs::File::create(run_log)?;
        let stderr = stdout.try_clone()?;
        let child = Command::new(godot_bin)
            .arg("--path")
            .arg(project_root)
            .arg(scene)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .kill_on_drop(true)
            .spawn()?;
        log::info!("Playing {scene} (pid {:?})", child.id());
        Ok(Self {
            scene: scene.to_string(),
            child,
        })
    }

    /// `false` once the game process has exited on its own.
    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    pub async fn stop(mut self) -> std::io::Result<()> {
        if self.is_alive() {
            self.child.kill().await?;
        }
        log::info!("Stopped {}", self.scene);
        Ok(())
    }
}
