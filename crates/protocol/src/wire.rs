use crate::entries::ErrorEntry;
use crate::phase::{PhaseState, PhaseStatus};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `POST /run` body. An empty or absent `scene_path` means "the project's main scene".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RunBody {
    #[serde(default)]
    pub scene_path: Option<String>,
}

impl RunBody {
    pub fn requested_scene(&self) -> Option<&str> {
        self.scene_path
            .as_deref()
            .map(str::trim)
            .filter(|path| !path.is_empty())
    }
}

/// `POST /log` body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LogBody {
    #[serde(default)]
    pub message: String,
}

/// `POST /phase` body. Missing fields fall back to their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PhaseUpdate {
    #[serde(default)]
    pub phase_number: u32,
    #[serde(default)]
    pub phase_name: String,
    #[serde(default)]
    pub status: PhaseStatus,
    #[serde(default)]
    pub quality_gates: BTreeMap<String, bool>,
}

impl From<PhaseUpdate> for PhaseState {
    fn from(update: PhaseUpdate) -> Self {
        Self {
            phase_number: update.phase_number,
            phase_name: update.phase_name,
            status: update.status,
            quality_gates: update.quality_gates,
            updated_at: None,
        }
    }
}

/// `GET /status` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StatusReport {
    pub ok: bool,
    pub project_name: String,
    pub main_scene: String,
    pub scripts: Vec<String>,
    pub scenes: Vec<String>,
    pub is_playing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playing_scene: Option<String>,
}

/// `GET /errors` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ErrorsReport {
    pub ok: bool,
    pub errors: Vec<ErrorEntry>,
    pub warnings: Vec<ErrorEntry>,
    pub error_count: usize,
    pub warning_count: usize,
}

impl ErrorsReport {
    pub fn new(errors: Vec<ErrorEntry>, warnings: Vec<ErrorEntry>) -> Self {
        Self {
            ok: true,
            error_count: errors.len(),
            warning_count: warnings.len(),
            errors,
            warnings,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0 || !self.errors.is_empty()
    }
}

/// One entry of the bridge's in-process event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EventRecord {
    pub kind: String,
    pub message: String,
    pub timestamp: i64,
}
