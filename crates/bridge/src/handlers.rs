use crate::events::{EventStream, EVENT_KIND_LOG, EVENT_KIND_PHASE};
use crate::host::EditorHost;
use crate::http::HttpResponse;
use crate::phase_detector::PhaseLogDetector;
use crate::phase_store::PhaseRepository;
use crate::request::BridgeRequest;
use gdbridge_collector::{default_log_paths, ErrorCollector};
use gdbridge_protocol::{
    unix_now_secs, ErrorsReport, LogBody, PhaseState, PhaseUpdate, RunBody, StatusReport,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

/// Everything a request handler can touch. Shared by all connection tasks.
pub struct BridgeState {
    pub host: Arc<dyn EditorHost>,
    pub phases: Arc<dyn PhaseRepository>,
    pub events: EventStream,
    pub detector: Box<dyn PhaseLogDetector>,
    started_at: Instant,
}

impl BridgeState {
    pub fn new(
        host: Arc<dyn EditorHost>,
        phases: Arc<dyn PhaseRepository>,
        detector: Box<dyn PhaseLogDetector>,
    ) -> Self {
        Self {
            host,
            phases,
            events: EventStream::new(),
            detector,
            started_at: Instant::now(),
        }
    }

    pub async fn handle(&self, request: BridgeRequest) -> HttpResponse {
        match request {
            BridgeRequest::Status => self.status().await,
            BridgeRequest::Errors => self.errors().await,
            BridgeRequest::Run(body) => self.run(body).await,
            BridgeRequest::Stop => self.stop().await,
            BridgeRequest::Reload => self.reload().await,
            BridgeRequest::Log(body) => self.log(body),
            BridgeRequest::SetPhase(update) => self.set_phase(update).await,
            BridgeRequest::GetPhase => HttpResponse::ok(self.phases.current()),
            BridgeRequest::Events => HttpResponse::ok(json!({
                "ok": true,
                "events": self.events.recent(),
            })),
            BridgeRequest::Health => HttpResponse::ok(json!({
                "ok": true,
                "version": env!("CARGO_PKG_VERSION"),
                "uptime_secs": self.started_at.elapsed().as_secs(),
            })),
        }
    }

    async fn status(&self) -> HttpResponse {
        let index = self.host.file_index();
        let playing_scene = self.host.playing_scene().await;
        HttpResponse::ok(StatusReport {
            ok: true,
            project_name: self.host.project_name().unwrap_or_default(),
            main_scene: self.host.main_scene().unwrap_or_default(),
            scripts: index.scripts,
            scenes: index.scenes,
            is_playing: playing_scene.is_some(),
            playing_scene,
        })
    }

    pub async fn collect_errors(&self) -> ErrorsReport {
        let root = self.host.project_root();
        let project_name = self.host.project_name();
        let collector = ErrorCollector::new(
            root,
            self.host.script_loader(),
            default_log_paths(root, project_name.as_deref()),
        );
        let diagnostics = collector.collect().await;
        ErrorsReport::new(diagnostics.errors, diagnostics.warnings)
    }

    async fn errors(&self) -> HttpResponse {
        HttpResponse::ok(self.collect_errors().await)
    }

    async fn run(&self, body: RunBody) -> HttpResponse {
        let scene = match body.requested_scene() {
            Some(scene) => scene.to_string(),
            None => match self.host.main_scene() {
                Some(scene) => scene,
                None => {
                    return HttpResponse::ok(json!({
                        "ok": false,
                        "error": "No scene_path given and no main scene configured",
                    }))
                }
            },
        };
        match self.host.play_scene(&scene).await {
            Ok(()) => HttpResponse::ok(json!({ "ok": true, "scene": scene })),
            Err(err) => {
                log::warn!("Failed to play {scene}: {err}");
                HttpResponse::ok(json!({ "ok": false, "scene": scene, "error": err.to_string() }))
            }
        }
    }

    async fn stop(&self) -> HttpResponse {
        match self.host.stop_playing().await {
            Ok(was_playing) => HttpResponse::ok(json!({ "ok": true, "was_playing": was_playing })),
            Err(err) => HttpResponse::ok(json!({ "ok": false, "error": err.to_string() })),
        }
    }

    async fn reload(&self) -> HttpResponse {
        match self.host.rescan().await {
            Ok(index) => HttpResponse::ok(json!({
                "ok": true,
                "scripts": index.scripts.len(),
                "scenes": index.scenes.len(),
            })),
            Err(err) => HttpResponse::ok(json!({ "ok": false, "error": err.to_string() })),
        }
    }

    fn log(&self, body: LogBody) -> HttpResponse {
        let message = body.message.trim().to_string();
        self.events.publish(EVENT_KIND_LOG, message.clone());

        let current = self.phases.current();
        if let Some(next) = self.detector.detect(&message, &current) {
            match self.store_phase(next) {
                Ok(state) => log::info!(
                    "Phase {} ({}) is now {} from log",
                    state.phase_number,
                    state.phase_name,
                    state.status
                ),
                Err(err) => log::debug!("Phase detection update failed: {err}"),
            }
        }
        HttpResponse::ok(json!({ "ok": true }))
    }

    async fn set_phase(&self, update: PhaseUpdate) -> HttpResponse {
        let state = match self.store_phase(PhaseState::from(update)) {
            Ok(state) => state,
            Err(err) => {
                log::warn!("Failed to persist phase: {err}");
                return HttpResponse::ok(json!({ "ok": false, "error": err.to_string() }));
            }
        };
        if let Err(err) = self.host.rescan().await {
            log::debug!("Rescan after phase update failed: {err}");
        }
        HttpResponse::ok(json!({ "ok": true, "phase": state }))
    }

    fn store_phase(&self, mut state: PhaseState) -> crate::Result<PhaseState> {
        state.updated_at = Some(unix_now_secs());
        self.phases.save(state.clone())?;
        self.events.publish(
            EVENT_KIND_PHASE,
            format!(
                "Phase {}: {} {}",
                state.phase_number, state.phase_name, state.status
            ),
        );
        Ok(state)
    }
}
