//! # gdbridge bridge
//!
//! Loopback HTTP server exposing a Godot project to an external agent.
//!
//! Each accepted connection gets its own task: the request is buffered until its headers (and
//! `Content-Length` body) are complete, dispatched exactly once against a fixed route table,
//! answered with JSON and `Connection: close`.
//!
//! | Method | Path | |
//! |---|---|---|
//! | GET | `/status` | project name, main scene, scripts, scenes, play state |
//! | GET | `/errors` | fresh error collection pass |
//! | POST | `/run` | play `scene_path` or the main scene |
//! | POST | `/stop` | stop playing |
//! | POST | `/reload` | rescan project files |
//! | POST | `/log` | append to the event stream, detect phase phrases |
//! | POST | `/phase` | replace and persist the phase state |
//! | GET | `/phase` | current phase state |
//! | GET | `/events` | recent event stream |
//! | GET | `/health` | liveness |

mod error;
pub mod events;
pub mod godot;
mod handlers;
pub mod host;
pub mod http;
pub mod phase_detector;
pub mod phase_store;
pub mod request;
pub mod security;
mod server;

pub use error::{BridgeError, Result};
pub use events::EventStream;
pub use godot::{GodotScriptLoader, GODOT_BIN_ENV};
pub use handlers::BridgeState;
pub use host::{EditorHost, FileIndex, LocalEditorHost};
pub use phase_detector::{PhaseLogDetector, PhrasePhaseDetector};
pub use phase_store::{FilePhaseRepository, MemoryPhaseRepository, PhaseRepository};
pub use request::{BridgeRequest, Route};
pub use server::{dispatch, serve, serve_connection};

use std::path::PathBuf;
use std::sync::Arc;

/// Production wiring: local host, file-backed phase state, phrase detector.
pub fn local_bridge_state(project_root: PathBuf, godot_bin: Option<PathBuf>) -> BridgeState {
    let phases = Arc::new(FilePhaseRepository::open(&project_root));
    let host = Arc::new(LocalEditorHost::new(project_root, godot_bin));
    BridgeState::new(host, phases, Box::new(PhrasePhaseDetector))
}
