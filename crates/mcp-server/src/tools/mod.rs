//! MCP surface of the proxy.
//!
//! Editor tools forward to the bridge; quality, scene and build-state tools work on the project
//! tree directly so they keep working while the editor is down.

mod output;
pub mod schemas;

use crate::bridge_client::{BridgeApi, BridgeClient};
use crate::config::ProxyConfig;
use crate::phase_gate::{apply_phase_update, evaluate_in_background};
use gdbridge_protocol::paths::{build_state_path, resolve_res_path};
use gdbridge_protocol::{ErrorEnvelope, LogBody, PhaseStatus, PhaseUpdate, RunBody};
use gdbridge_quality::{
    score_project, QualityReportStore, ReportTrigger, DEFAULT_REPORT_LIMIT,
};
use gdbridge_scene::SceneDocument;
use output::{bridge_error, error_envelope, internal_error, invalid_request, json_result};
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Implementation, ServerCapabilities, ServerInfo};
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use schemas::{
    EvaluateQualityRequest, ListQualityReportsRequest, LogRequest, ParseSceneRequest,
    RunSceneRequest, SaveBuildStateRequest, ScorePocRequest, UpdatePhaseRequest,
};
use serde_json::{json, Map, Value};
use std::path::Path;
use std::sync::Arc;

const MAX_REPORT_LIMIT: usize = 100;

/// Tool proxy between an MCP client and one Godot project.
#[derive(Clone)]
pub struct GodotProxyService {
    config: Arc<ProxyConfig>,
    client: BridgeClient,
    tool_router: ToolRouter<Self>,
}

impl GodotProxyService {
    pub fn new(config: ProxyConfig) -> Self {
        let client = BridgeClient::new(&config);
        Self {
            config: Arc::new(config),
            client,
            tool_router: Self::tool_router(),
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.config.project_root
    }

    /// Adds live `error_count`/`warning_count` to a bridge reply.
    ///
    /// A failed `/errors` call leaves the reply intact and records the failure code instead.
    async fn with_error_counts(&self, reply: Value) -> Value {
        let mut body = match reply {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("bridge".to_string(), other);
                map
            }
        };
        match self.client.errors().await {
            Ok(report) => {
                body.insert("error_count".to_string(), json!(report.error_count));
                body.insert("warning_count".to_string(), json!(report.warning_count));
            }
            Err(err) => {
                log::debug!("Error counts unavailable: {err}");
                body.insert("errors_unavailable".to_string(), json!(err.code()));
            }
        }
        Value::Object(body)
    }

    /// `requested`, or the bridge's phase number. Falls back to 0 when the bridge is down.
    async fn resolve_phase(&self, requested: Option<u32>) -> (u32, String) {
        match self.client.phase().await {
            Ok(current) => match requested {
                Some(number) if number != current.phase_number => (number, String::new()),
                _ => (current.phase_number, current.phase_name),
            },
            Err(err) => {
                log::debug!("Current phase unavailable ({err}); using {requested:?}");
                (requested.unwrap_or(0), String::new())
            }
        }
    }
}

#[tool_router]
impl GodotProxyService {
    #[tool(
        description = "Editor status: project name, main scene, script and scene lists, whether a scene is playing."
    )]
    pub async fn godot_status(&self) -> Result<CallToolResult, McpError> {
        Ok(match self.client.status().await {
            Ok(status) => json_result("godot_status", &status),
            Err(err) => bridge_error(&err),
        })
    }

    #[tool(
        description = "Force-reload every script and scrape recent editor logs. Returns deduplicated errors and warnings (at most 50 each)."
    )]
    pub async fn godot_get_errors(&self) -> Result<CallToolResult, McpError> {
        Ok(match self.client.errors().await {
            Ok(report) => json_result("godot_get_errors", &report),
            Err(err) => bridge_error(&err),
        })
    }

    #[tool(description = "Play a scene in the editor (the main scene when scene_path is omitted).")]
    pub async fn godot_run_scene(
        &self,
        Parameters(request): Parameters<RunSceneRequest>,
    ) -> Result<CallToolResult, McpError> {
        let body = RunBody {
            scene_path: request.scene_path,
        };
        Ok(match self.client.run_scene(&body).await {
            Ok(value) => json_result("godot_run_scene", &self.with_error_counts(value).await),
            Err(err) => bridge_error(&err),
        })
    }

    #[tool(description = "Stop the scene currently playing in the editor.")]
    pub async fn godot_stop_scene(&self) -> Result<CallToolResult, McpError> {
        Ok(match self.client.stop_scene().await {
            Ok(value) => json_result("godot_stop_scene", &self.with_error_counts(value).await),
            Err(err) => bridge_error(&err),
        })
    }

    #[tool(
        description = "Rescan the project filesystem, then collect errors. Use after writing or deleting project files."
    )]
    pub async fn godot_reload_filesystem(&self) -> Result<CallToolResult, McpError> {
        let reload = match self.client.reload().await {
            Ok(value) => value,
            Err(err) => return Ok(bridge_error(&err)),
        };
        let errors = match self.client.errors().await {
            Ok(report) => report,
            Err(err) => return Ok(bridge_error(&err)),
        };
        Ok(json_result(
            "godot_reload_filesystem",
            &json!({ "ok": true, "reload": reload, "errors": errors }),
        ))
    }

    #[tool(description = "Append a progress message to the editor's event stream.")]
    pub async fn godot_log(
        &self,
        Parameters(request): Parameters<LogRequest>,
    ) -> Result<CallToolResult, McpError> {
        let body = LogBody {
            message: request.message,
        };
        Ok(match self.client.log(&body).await {
            Ok(value) => json_result("godot_log", &value),
            Err(err) => bridge_error(&err),
        })
    }

    #[tool(description = "Current build phase as tracked by the editor bridge.")]
    pub async fn godot_get_phase(&self) -> Result<CallToolResult, McpError> {
        Ok(match self.client.phase().await {
            Ok(phase) => json_result("godot_get_phase", &phase),
            Err(err) => bridge_error(&err),
        })
    }

    #[tool(
        description = "Set the build phase. Marking a phase completed is refused (ok:false, rejected:true, phase left in_progress) while errors exist or, from phase 5, while quality gates fail."
    )]
    pub async fn godot_update_phase(
        &self,
        Parameters(request): Parameters<UpdatePhaseRequest>,
    ) -> Result<CallToolResult, McpError> {
        let status = match request.status.parse::<PhaseStatus>() {
            Ok(status) => status,
            Err(err) => {
                return Ok(invalid_request(
                    err.to_string(),
                    Some("Use pending, in_progress or completed."),
                ))
            }
        };
        let update = PhaseUpdate {
            phase_number: request.phase_number,
            phase_name: request.phase_name,
            status,
            quality_gates: request.quality_gates.unwrap_or_default(),
        };
        let api: &dyn BridgeApi = &self.client;
        Ok(
            match apply_phase_update(api, self.project_root(), update).await {
                Ok(value) => json_result("godot_update_phase", &value),
                Err(err) => bridge_error(&err),
            },
        )
    }

    #[tool(
        description = "Evaluate the heuristic quality gates for a phase. Persisted as a manual_evaluation report unless persist is false."
    )]
    pub async fn godot_evaluate_quality(
        &self,
        Parameters(request): Parameters<EvaluateQualityRequest>,
    ) -> Result<CallToolResult, McpError> {
        let (phase_number, phase_name) = self.resolve_phase(request.phase_number).await;
        let evaluation =
            evaluate_in_background(self.project_root(), phase_number, &phase_name).await;

        let mut payload = json!({ "ok": true, "evaluation": evaluation });
        if request.persist.unwrap_or(true) {
            let store = QualityReportStore::for_project(self.project_root());
            let meta = json!({ "source": "godot_evaluate_quality" });
            match store.persist(ReportTrigger::ManualEvaluation, phase_number, meta, &evaluation) {
                Ok(path) => payload["report_path"] = json!(path.to_string_lossy()),
                Err(err) => {
                    log::warn!("Failed to persist quality evaluation: {err}");
                    payload["report_error"] = json!(err.to_string());
                }
            }
        }
        Ok(json_result("godot_evaluate_quality", &payload))
    }

    #[tool(
        description = "Score the project 0-100 against the proof-of-concept rubric (grade A-F) and persist it as a poc_rubric_score report."
    )]
    pub async fn godot_score_poc(
        &self,
        Parameters(request): Parameters<ScorePocRequest>,
    ) -> Result<CallToolResult, McpError> {
        let (phase_number, _) = self.resolve_phase(request.phase_number).await;
        let root = self.project_root().to_path_buf();
        let score = match tokio::task::spawn_blocking(move || score_project(&root, phase_number))
            .await
        {
            Ok(score) => score,
            Err(err) => return Ok(internal_error(format!("rubric scoring failed ({err})"))),
        };

        let mut payload = json!({ "ok": true, "score": score });
        let store = QualityReportStore::for_project(self.project_root());
        match store.persist(
            ReportTrigger::PocRubricScore,
            phase_number,
            json!({ "source": "godot_score_poc" }),
            &score,
        ) {
            Ok(path) => payload["report_path"] = json!(path.to_string_lossy()),
            Err(err) => {
                log::warn!("Failed to persist rubric score: {err}");
                payload["report_error"] = json!(err.to_string());
            }
        }
        Ok(json_result("godot_score_poc", &payload))
    }

    #[tool(description = "List persisted quality reports, newest first.")]
    pub async fn godot_list_quality_reports(
        &self,
        Parameters(request): Parameters<ListQualityReportsRequest>,
    ) -> Result<CallToolResult, McpError> {
        let limit = request
            .limit
            .unwrap_or(DEFAULT_REPORT_LIMIT)
            .clamp(1, MAX_REPORT_LIMIT);
        let store = QualityReportStore::for_project(self.project_root());
        Ok(match store.list(request.phase_number, limit) {
            Ok(reports) => json_result(
                "godot_list_quality_reports",
                &json!({ "ok": true, "count": reports.len(), "reports": reports }),
            ),
            Err(err) => error_envelope(ErrorEnvelope::new("report_list_failed", err.to_string())),
        })
    }

    #[tool(
        description = "Parse a .tscn scene into resources, nodes and signal connections, plus the node tree as parent/name paths."
    )]
    pub async fn godot_parse_scene(
        &self,
        Parameters(request): Parameters<ParseSceneRequest>,
    ) -> Result<CallToolResult, McpError> {
        let Some(path) = resolve_res_path(self.project_root(), &request.path) else {
            return Ok(invalid_request(
                format!("Not a project path: {}", request.path),
                Some("Pass a res:// path or a path relative to the project root (uid:// is not accepted)."),
            ));
        };
        if !path.is_file() {
            return Ok(error_envelope(
                ErrorEnvelope::new("not_found", format!("Scene not found: {}", request.path))
                    .with_details(json!({ "path": request.path })),
            ));
        }
        Ok(match SceneDocument::load(&path) {
            Ok(scene) => json_result(
                "godot_parse_scene",
                &json!({
                    "ok": true,
                    "path": request.path,
                    "node_tree": scene.node_tree(),
                    "scene": scene,
                }),
            ),
            Err(err) => error_envelope(
                ErrorEnvelope::new("scene_parse_failed", err.to_string())
                    .with_details(json!({ "path": request.path })),
            ),
        })
    }

    #[tool(description = "Save an opaque build checkpoint to .claude/build_state.json.")]
    pub async fn godot_save_build_state(
        &self,
        Parameters(request): Parameters<SaveBuildStateRequest>,
    ) -> Result<CallToolResult, McpError> {
        let path = build_state_path(self.project_root());
        Ok(match write_build_state(&path, &request.state) {
            Ok(()) => json_result(
                "godot_save_build_state",
                &json!({ "ok": true, "path": path.to_string_lossy() }),
            ),
            Err(err) => internal_error(format!("failed to save build state ({err})")),
        })
    }

    #[tool(description = "Load the build checkpoint saved by godot_save_build_state (state is null if none).")]
    pub async fn godot_load_build_state(&self) -> Result<CallToolResult, McpError> {
        let path = build_state_path(self.project_root());
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(json_result(
                    "godot_load_build_state",
                    &json!({ "ok": true, "exists": false, "state": Value::Null }),
                ));
            }
            Err(err) => return Ok(internal_error(format!("failed to read build state ({err})"))),
        };
        Ok(match serde_json::from_str::<Value>(&raw) {
            Ok(state) => json_result(
                "godot_load_build_state",
                &json!({ "ok": true, "exists": true, "state": state }),
            ),
            Err(err) => error_envelope(
                ErrorEnvelope::new("invalid_build_state", err.to_string())
                    .with_details(json!({ "path": path.to_string_lossy() })),
            ),
        })
    }
}

fn write_build_state(path: &Path, state: &Value) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let bytes = serde_json::to_vec_pretty(state).map_err(std::io::Error::other)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)
}

#[tool_handler]
impl ServerHandler for GodotProxyService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Godot editor bridge. Start with godot_status; after editing files call \
                 godot_reload_filesystem and fix everything godot_get_errors reports before \
                 godot_update_phase(status=completed). From phase 5 completion also requires \
                 the quality gates (see godot_evaluate_quality)."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            ..Default::default()
        }
    }
}
