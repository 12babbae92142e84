//! Tool proxy for the gdbridge editor bridge.
//!
//! Translates MCP tool calls into bridge HTTP requests and runs the quality evaluator against
//! the project tree. The phase-completion guard lives here, not in the bridge.

pub mod bridge_client;
pub mod config;
pub mod phase_gate;
pub mod tools;

pub use bridge_client::{BridgeApi, BridgeCallError, BridgeClient, BridgeResult, Speed};
pub use config::ProxyConfig;
pub use phase_gate::{
    apply_phase_update, decide_completion, evaluate_in_background, PhaseDecision, Remediation,
    REASON_ERRORS_PRESENT, REASON_QUALITY_GATES_FAILED,
};
pub use tools::GodotProxyService;
