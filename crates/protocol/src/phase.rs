use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Lifecycle of a build phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    #[default]
    Pending,
    #[serde(alias = "in-progress", alias = "inprogress", alias = "started")]
    InProgress,
    #[serde(alias = "complete", alias = "done")]
    Completed,
}

impl PhaseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseStatusParseError(pub String);

impl fmt::Display for PhaseStatusParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown phase status '{}' (expected pending, in_progress or completed)",
            self.0
        )
    }
}

impl std::error::Error for PhaseStatusParseError {}

impl FromStr for PhaseStatus {
    type Err = PhaseStatusParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "pending" => Ok(Self::Pending),
            "in_progress" | "inprogress" | "started" | "starting" | "begin" | "beginning" => {
                Ok(Self::InProgress)
            }
            "completed" | "complete" | "done" | "finished" => Ok(Self::Completed),
            _ => Err(PhaseStatusParseError(raw.to_string())),
        }
    }
}

/// The build phase the agent is currently working through.
///
/// Replaced wholesale on every update; the bridge mirrors it to `.claude/current_phase.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PhaseState {
    #[serde(default)]
    pub phase_number: u32,
    #[serde(default)]
    pub phase_name: String,
    #[serde(default)]
    pub status: PhaseStatus,
    #[serde(default)]
    pub quality_gates: BTreeMap<String, bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl PhaseState {
    pub fn new(phase_number: u32, phase_name: impl Into<String>, status: PhaseStatus) -> Self {
        Self {
            phase_number,
            phase_name: phase_name.into(),
            status,
            quality_gates: BTreeMap::new(),
            updated_at: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == PhaseStatus::Completed
    }
}
