//! Guard on phase completion.
//!
//! A phase may only be marked `completed` when the project has no collected errors and, from
//! the polish phase on, every applicable quality gate passes. A refused completion is not an
//! error: the bridge is told the phase is still `in_progress` and the caller gets a soft
//! rejection describing what to fix.

use crate::bridge_client::{BridgeApi, BridgeResult};
use gdbridge_protocol::{ErrorEntry, ErrorsReport, PhaseStatus, PhaseUpdate};
use gdbridge_quality::{
    evaluate_project, QualityEvaluation, QualityReportStore, QualitySignals, ReportTrigger,
};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};

pub const REASON_ERRORS_PRESENT: &str = "errors_present";
pub const REASON_QUALITY_GATES_FAILED: &str = "quality_gates_failed";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Remediation {
    pub gate: String,
    pub hint: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PhaseDecision {
    Accept,
    RejectErrors {
        errors: Vec<ErrorEntry>,
    },
    RejectGates {
        failed_quality_gates: Vec<String>,
        remediation: Vec<Remediation>,
    },
}

impl PhaseDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accept)
    }

    pub fn reason(&self) -> Option<&'static str> {
        match self {
            Self::Accept => None,
            Self::RejectErrors { .. } => Some(REASON_ERRORS_PRESENT),
            Self::RejectGates { .. } => Some(REASON_QUALITY_GATES_FAILED),
        }
    }
}

/// Decides a completion request. Errors are checked before gates.
///
/// Gates only block from the polish phase on; below it the evaluation carries no applicable
/// gates anyway.
pub fn decide_completion(errors: &ErrorsReport, evaluation: &QualityEvaluation) -> PhaseDecision {
    if errors.has_errors() {
        return PhaseDecision::RejectErrors {
            errors: errors.errors.clone(),
        };
    }
    if evaluation.phase_number >= gdbridge_quality::POLISH_PHASE && !evaluation.gates_passed {
        return PhaseDecision::RejectGates {
            failed_quality_gates: evaluation.failed_quality_gates.clone(),
            remediation: evaluation
                .remediation()
                .into_iter()
                .map(|(gate, hint)| Remediation { gate, hint })
                .collect(),
        };
    }
    PhaseDecision::Accept
}

/// Gate verdicts merged over the caller's own `quality_gates`.
fn merged_gates(update: &PhaseUpdate, evaluation: &QualityEvaluation) -> PhaseUpdate {
    let mut merged = update.clone();
    for (gate, detail) in &evaluation.gate_details {
        merged.quality_gates.insert(gate.clone(), detail.passed);
    }
    merged
}

/// Runs [`evaluate_project`] off the async workers.
///
/// A failed task yields the evaluation of an empty project, which fails every polish gate.
pub async fn evaluate_in_background(
    project_root: &Path,
    phase_number: u32,
    phase_name: &str,
) -> QualityEvaluation {
    let root = project_root.to_path_buf();
    let name = phase_name.to_string();
    tokio::task::spawn_blocking(move || evaluate_project(&root, phase_number, &name))
        .await
        .unwrap_or_else(|err| {
            log::warn!("Quality evaluation task failed: {err}");
            QualityEvaluation::from_signals(&QualitySignals::default(), phase_number, phase_name)
        })
}

/// Applies a phase update through the bridge, enforcing the completion guard.
///
/// Non-completion updates are forwarded unchanged. Every completion attempt, accepted or not,
/// is recorded as a `phase_completion_check` report.
pub async fn apply_phase_update(
    api: &dyn BridgeApi,
    project_root: &Path,
    update: PhaseUpdate,
) -> BridgeResult<Value> {
    if update.status != PhaseStatus::Completed {
        return api.post_phase(&update).await;
    }

    let errors = api.errors().await?;
    let evaluation =
        evaluate_in_background(project_root, update.phase_number, &update.phase_name).await;
    let decision = decide_completion(&errors, &evaluation);

    let report_path = persist_check(project_root, &update, &errors, &evaluation, &decision);

    let mut forwarded = merged_gates(&update, &evaluation);
    if !decision.is_accepted() {
        forwarded.status = PhaseStatus::InProgress;
    }
    let bridge_response = api.post_phase(&forwarded).await?;

    let mut body = match decision {
        PhaseDecision::Accept => {
            let mut body = match bridge_response {
                Value::Object(map) => map,
                other => {
                    let mut map = Map::new();
                    map.insert("bridge".to_string(), other);
                    map
                }
            };
            body.insert("quality_gates_passed".to_string(), json!(true));
            body
        }
        PhaseDecision::RejectErrors { ref errors } => rejection(
            REASON_ERRORS_PRESENT,
            &forwarded,
            json!({
                "error_count": errors.len(),
                "errors": errors,
                "message": "Fix every reported error before completing this phase.",
            }),
        ),
        PhaseDecision::RejectGates {
            ref failed_quality_gates,
            ref remediation,
        } => rejection(
            REASON_QUALITY_GATES_FAILED,
            &forwarded,
            json!({
                "failed_quality_gates": failed_quality_gates,
                "remediation": remediation,
                "gate_details": evaluation.gate_details,
                "message": "Quality gates failed; address the remediation hints and retry.",
            }),
        ),
    };
    if let Some(path) = report_path {
        body.insert("report_path".to_string(), json!(path.to_string_lossy()));
    }
    Ok(Value::Object(body))
}

fn rejection(reason: &str, forwarded: &PhaseUpdate, extra: Value) -> Map<String, Value> {
    let mut body = Map::new();
    body.insert("ok".to_string(), json!(false));
    body.insert("rejected".to_string(), json!(true));
    body.insert("reason".to_string(), json!(reason));
    body.insert("phase_number".to_string(), json!(forwarded.phase_number));
    body.insert("phase_name".to_string(), json!(forwarded.phase_name));
    body.insert("status".to_string(), json!(forwarded.status));
    if let Value::Object(extra) = extra {
        body.extend(extra);
    }
    body
}

fn persist_check(
    project_root: &Path,
    update: &PhaseUpdate,
    errors: &ErrorsReport,
    evaluation: &QualityEvaluation,
    decision: &PhaseDecision,
) -> Option<PathBuf> {
    let meta = json!({
        "requested_status": update.status,
        "accepted": decision.is_accepted(),
        "reason": decision.reason(),
        "error_count": errors.error_count,
    });
    match QualityReportStore::for_project(project_root).persist(
        ReportTrigger::PhaseCompletionCheck,
        update.phase_number,
        meta,
        evaluation,
    ) {
        Ok(path) => Some(path),
        Err(err) => {
            log::warn!("Failed to persist phase completion check: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gdbridge_quality::{QualityGateDetail, QualityMetrics};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    fn evaluation(phase_number: u32, failed: &[&str]) -> QualityEvaluation {
        let mut gate_details = BTreeMap::new();
        for gate in failed {
            gate_details.insert(
                gate.to_string(),
                QualityGateDetail {
                    passed: false,
                    expected: ">= 2".to_string(),
                    actual: json!(0),
                    hint: format!("fix {gate}"),
                },
            );
        }
        QualityEvaluation {
            phase_number,
            phase_name: "Polish".to_string(),
            gates_passed: failed.is_empty(),
            failed_quality_gates: failed.iter().map(|g| g.to_string()).collect(),
            gate_details,
            quality_metrics: QualityMetrics::default(),
        }
    }

    fn errors(count: usize) -> ErrorsReport {
        ErrorsReport::new(
            (0..count)
                .map(|i| ErrorEntry::new(format!("boom {i}"), "res://a.gd", i as i64 + 1, 0))
                .collect(),
            Vec::new(),
        )
    }

    #[test]
    fn errors_block_before_gates() {
        let decision = decide_completion(&errors(1), &evaluation(5, &["auto_ui_styling"]));
        assert_eq!(decision.reason(), Some(REASON_ERRORS_PRESENT));
    }

    #[test]
    fn failed_gates_only_block_from_polish_phase() {
        let early = evaluation(4, &["auto_ui_styling"]);
        assert!(decide_completion(&errors(0), &early).is_accepted());

        let decision = decide_completion(&errors(0), &evaluation(5, &["auto_ui_styling"]));
        assert_eq!(
            decision,
            PhaseDecision::RejectGates {
                failed_quality_gates: vec!["auto_ui_styling".to_string()],
                remediation: vec![Remediation {
                    gate: "auto_ui_styling".to_string(),
                    hint: "fix auto_ui_styling".to_string(),
                }],
            }
        );
    }

    #[test]
    fn adding_failures_never_turns_rejection_into_acceptance() {
        let gate_sets: [&[&str]; 3] = [&[], &["auto_visual_depth"], &["auto_visual_depth", "auto_ui_styling"]];
        for phase in [3, 5, 6, 9] {
            for error_count in 0..3 {
                for (index, gates) in gate_sets.iter().enumerate() {
                    let base = decide_completion(&errors(error_count), &evaluation(phase, gates));
                    if base.is_accepted() {
                        continue;
                    }
                    let worse_errors =
                        decide_completion(&errors(error_count + 1), &evaluation(phase, gates));
                    assert!(!worse_errors.is_accepted(), "phase {phase} gates {index}");
                    let worse_gates = gate_sets[gate_sets.len() - 1];
                    let worse = decide_completion(&errors(error_count), &evaluation(phase, worse_gates));
                    assert!(!worse.is_accepted(), "phase {phase} gates {index}");
                }
            }
        }
    }

    #[derive(Default)]
    struct FakeBridge {
        errors: usize,
        posted: Mutex<Vec<PhaseUpdate>>,
    }

    #[async_trait]
    impl BridgeApi for FakeBridge {
        async fn errors(&self) -> BridgeResult<ErrorsReport> {
            Ok(errors(self.errors))
        }

        async fn post_phase(&self, update: &PhaseUpdate) -> BridgeResult<Value> {
            self.posted.lock().unwrap().push(update.clone());
            Ok(json!({ "ok": true, "phase": update }))
        }
    }

    fn completion(phase_number: u32) -> PhaseUpdate {
        PhaseUpdate {
            phase_number,
            phase_name: "Polish".to_string(),
            status: PhaseStatus::Completed,
            quality_gates: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn in_progress_updates_pass_straight_through() {
        let temp = tempfile::tempdir().unwrap();
        let bridge = FakeBridge::default();
        let update = PhaseUpdate {
            status: PhaseStatus::InProgress,
            ..completion(5)
        };
        let body = apply_phase_update(&bridge, temp.path(), update.clone())
            .await
            .unwrap();
        assert_eq!(body["ok"], json!(true));
        assert_eq!(bridge.posted.lock().unwrap().as_slice(), &[update]);
        assert!(!temp.path().join(".claude/quality_reports").exists());
    }

    #[tokio::test]
    async fn errors_force_in_progress_and_record_the_check() {
        let temp = tempfile::tempdir().unwrap();
        let bridge = FakeBridge {
            errors: 2,
            ..FakeBridge::default()
        };
        let body = apply_phase_update(&bridge, temp.path(), completion(2))
            .await
            .unwrap();
        assert_eq!(body["ok"], json!(false));
        assert_eq!(body["rejected"], json!(true));
        assert_eq!(body["reason"], json!(REASON_ERRORS_PRESENT));
        assert_eq!(body["error_count"], json!(2));

        let posted = bridge.posted.lock().unwrap();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].status, PhaseStatus::InProgress);

        let reports = QualityReportStore::for_project(temp.path())
            .list(Some(2), 10)
            .unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].trigger, "phase_completion_check");
        assert_eq!(reports[0].document.meta["accepted"], json!(false));
    }

    #[tokio::test]
    async fn clean_early_phase_completes_with_gate_verdicts() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("main.gd"), "extends Node\n").unwrap();
        let bridge = FakeBridge::default();
        let body = apply_phase_update(&bridge, temp.path(), completion(3))
            .await
            .unwrap();
        assert_eq!(body["ok"], json!(true));
        assert_eq!(body["quality_gates_passed"], json!(true));
        assert!(body["report_path"].is_string());
        assert_eq!(
            bridge.posted.lock().unwrap()[0].status,
            PhaseStatus::Completed
        );
    }
}
