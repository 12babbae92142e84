//! # gdbridge quality
//!
//! Heuristic quality signals for a Godot project and the phase gates built on them.
//!
//! [`QualitySignals::collect`] scans scripts, scenes and text resources once; the result feeds
//! both the pass/fail [`QualityEvaluation`] used to guard phase completion and the graded
//! [`PocScore`]. [`QualityReportStore`] keeps every evaluation as an append-only JSON file.

mod error;
mod gates;
mod reports;
mod rubric;
mod signals;

pub use error::{QualityError, Result};
pub use gates::{
    QualityEvaluation, QualityGate, QualityGateDetail, QualityMetrics, POLISH_PHASE,
    STRUCTURE_PHASE,
};
pub use reports::{
    QualityReportStore, ReportDocument, ReportTrigger, StoredReport, DEFAULT_REPORT_LIMIT,
    REPORT_FORMAT_VERSION,
};
pub use rubric::{grade_for, PocScore, RubricDimension};
pub use signals::{
    category_coverage, find_stub_functions, vocabulary_hits, KeywordCategory, MainSceneSignal,
    QualitySignals, StubFunction, FEEDBACK_CATEGORIES, FLOW_CATEGORIES,
};

use std::path::Path;

/// Collects signals under `root` and evaluates the gates applicable at `phase_number`.
pub fn evaluate_project(root: &Path, phase_number: u32, phase_name: &str) -> QualityEvaluation {
    QualityEvaluation::from_signals(&QualitySignals::collect(root), phase_number, phase_name)
}

/// Collects signals under `root` and scores them against the rubric.
pub fn score_project(root: &Path, phase_number: u32) -> PocScore {
    PocScore::from_signals(&QualitySignals::collect(root), phase_number)
}
