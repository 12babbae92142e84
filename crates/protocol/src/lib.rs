//! Shared wire contract between the in-editor bridge and the tool proxy.
//!
//! Everything that crosses the loopback HTTP boundary (or lands in `.claude/`) is defined here
//! so both processes agree on field names and defaults.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

mod entries;
pub mod paths;
mod phase;
mod wire;

pub use entries::{dedup_entries, dedup_key, ErrorEntry, WarningEntry, DEDUP_MESSAGE_PREFIX_CHARS};
pub use phase::{PhaseState, PhaseStatus, PhaseStatusParseError};
pub use wire::{
    ErrorsReport, EventRecord, LogBody, PhaseUpdate, RunBody, StatusReport,
};

pub const DEFAULT_BRIDGE_PORT: u16 = 6100;
pub const BRIDGE_PORT_ENV: &str = "GODOT_BRIDGE_PORT";
pub const PROJECT_ROOT_ENV: &str = "GODOT_PROJECT_ROOT";

#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema)]
pub struct ToolNextAction {
    pub tool: String,
    pub args: serde_json::Value,
    pub reason: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema)]
pub struct ErrorEnvelope {
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
    pub hint: Option<String>,
    #[serde(default)]
    pub next_actions: Vec<ToolNextAction>,
}

impl ErrorEnvelope {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            hint: None,
            next_actions: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    #[must_use]
    pub fn with_next_action(
        mut self,
        tool: impl Into<String>,
        args: serde_json::Value,
        reason: impl Into<String>,
    ) -> Self {
        self.next_actions.push(ToolNextAction {
            tool: tool.into(),
            args,
            reason: reason.into(),
        });
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Current unix time in whole seconds (0 if the clock is before the epoch).
#[must_use]
pub fn unix_now_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .ok()
        .and_then(|dur| i64::try_from(dur.as_secs()).ok())
        .unwrap_or(0)
}
