use rmcp::schemars;
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RunSceneRequest {
    /// Scene to play
    #[schemars(
        description = "Scene to play as a res:// path (e.g. res://scenes/level.tscn). Omit to play the project's main scene."
    )]
    pub scene_path: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct LogRequest {
    #[schemars(
        description = "Progress message for the editor event stream. Lines like 'Phase 3: Core Mechanics started' also move the tracked phase."
    )]
    pub message: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdatePhaseRequest {
    #[schemars(description = "Phase number (0 = not started)")]
    pub phase_number: u32,

    #[schemars(description = "Human-readable phase name")]
    pub phase_name: String,

    /// pending | in_progress | completed
    #[schemars(
        description = "pending | in_progress | completed. Completion is checked against collected errors and, from phase 5, the quality gates."
    )]
    pub status: String,

    #[schemars(description = "Caller-reported gate results, merged with the automatic gates")]
    pub quality_gates: Option<BTreeMap<String, bool>>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct EvaluateQualityRequest {
    #[schemars(
        description = "Phase to evaluate the gates for. Defaults to the bridge's current phase (0 if the editor is unreachable)."
    )]
    pub phase_number: Option<u32>,

    #[schemars(description = "Write a manual_evaluation report under .claude/quality_reports (default: true)")]
    pub persist: Option<bool>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ScorePocRequest {
    #[schemars(description = "Phase recorded with the score. Defaults to the bridge's current phase.")]
    pub phase_number: Option<u32>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListQualityReportsRequest {
    #[schemars(description = "Only reports for this phase")]
    pub phase_number: Option<u32>,

    #[schemars(description = "Maximum number of reports, newest first (default: 10)")]
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ParseSceneRequest {
    /// Scene file
    #[schemars(description = "Scene file as a res:// path or a path relative to the project root")]
    pub path: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SaveBuildStateRequest {
    #[schemars(description = "Opaque JSON checkpoint, stored verbatim in .claude/build_state.json")]
    pub state: serde_json::Value,
}
