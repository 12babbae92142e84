//! # gdbridge collector
//!
//! Produces the error and warning lists reported by `GET /errors`.
//!
//! Two strategies feed one list per category:
//!
//! 1. **Active validation**: every project script is force-reloaded through a [`ScriptLoader`]
//!    and broken or non-instantiable scripts become errors.
//! 2. **Log tailing**: the tail of each known log file is classified line by line through a
//!    [`LogLineClassifier`].
//!
//! The merged lists are deduplicated by `file|message prefix`, first occurrence wins.

mod classifier;
mod collector;
mod error;
mod loader;
mod log_scan;

pub use classifier::{extract_script_location, GodotLogClassifier, LineKind, LogLineClassifier};
pub use collector::{
    Diagnostics, ErrorCollector, ValidationOutcome, DEFAULT_VALIDATION_BUDGET,
    DEFAULT_VALIDATION_CONCURRENCY,
};
pub use error::{CollectorError, Result};
pub use loader::{ScriptLoadReport, ScriptLoader, StaticScriptLoader};
pub use log_scan::{default_log_paths, LogScan, MAX_LOG_ENTRIES_PER_KIND};
