use crate::signals::{QualitySignals, FEEDBACK_CATEGORIES, FLOW_CATEGORIES};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Phase from which the visual polish gates apply.
pub const POLISH_PHASE: u32 = 5;
/// Phase from which the structural gates apply.
pub const STRUCTURE_PHASE: u32 = 6;

pub const MIN_UI_STYLING_HITS: usize = 2;
pub const MIN_POLISH_EFFECTS_HITS: usize = 3;
pub const MIN_VISUAL_DEPTH_HITS: usize = 2;
pub const MIN_FEEDBACK_CATEGORIES: usize = 3;
pub const MIN_IMAGE_ASSETS: usize = 6;
pub const MIN_FLOW_CATEGORIES: usize = 3;
pub const MIN_SCENES: usize = 2;

/// The fixed gate table, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityGate {
    AutoUiStyling,
    AutoPolishEffects,
    AutoVisualDepth,
    AutoFeedbackCoverage,
    AutoVisualAssetsCoverage,
    AutoMainSceneConfigured,
    AutoGameFlowStates,
    AutoSceneStructure,
    AutoNoStubFunctions,
}

impl QualityGate {
    pub const ALL: [QualityGate; 9] = [
        Self::AutoUiStyling,
        Self::AutoPolishEffects,
        Self::AutoVisualDepth,
        Self::AutoFeedbackCoverage,
        Self::AutoVisualAssetsCoverage,
        Self::AutoMainSceneConfigured,
        Self::AutoGameFlowStates,
        Self::AutoSceneStructure,
        Self::AutoNoStubFunctions,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::AutoUiStyling => "auto_ui_styling",
            Self::AutoPolishEffects => "auto_polish_effects",
            Self::AutoVisualDepth => "auto_visual_depth",
            Self::AutoFeedbackCoverage => "auto_feedback_coverage",
            Self::AutoVisualAssetsCoverage => "auto_visual_assets_coverage",
            Self::AutoMainSceneConfigured => "auto_main_scene_configured",
            Self::AutoGameFlowStates => "auto_game_flow_states",
            Self::AutoSceneStructure => "auto_scene_structure",
            Self::AutoNoStubFunctions => "auto_no_stub_functions",
        }
    }

    pub fn min_phase(self) -> u32 {
        match self {
            Self::AutoUiStyling
            | Self::AutoPolishEffects
            | Self::AutoVisualDepth
            | Self::AutoFeedbackCoverage
            | Self::AutoVisualAssetsCoverage => POLISH_PHASE,
            Self::AutoMainSceneConfigured
            | Self::AutoGameFlowStates
            | Self::AutoSceneStructure
            | Self::AutoNoStubFunctions => STRUCTURE_PHASE,
        }
    }

    pub fn applies_to(self, phase_number: u32) -> bool {
        phase_number >= self.min_phase()
    }

    pub fn expected(self) -> String {
        match self {
            Self::AutoUiStyling => format!(">= {MIN_UI_STYLING_HITS} UI styling keywords"),
            Self::AutoPolishEffects => format!(">= {MIN_POLISH_EFFECTS_HITS} polish/effects keywords"),
            Self::AutoVisualDepth => format!(">= {MIN_VISUAL_DEPTH_HITS} visual depth keywords"),
            Self::AutoFeedbackCoverage => format!(
                ">= {MIN_FEEDBACK_CATEGORIES} of {} feedback categories",
                FEEDBACK_CATEGORIES.len()
            ),
            Self::AutoVisualAssetsCoverage => format!(">= {MIN_IMAGE_ASSETS} image assets"),
            Self::AutoMainSceneConfigured => "main scene configured and present".to_string(),
            Self::AutoGameFlowStates => format!(
                ">= {MIN_FLOW_CATEGORIES} of {} game flow states",
                FLOW_CATEGORIES.len()
            ),
            Self::AutoSceneStructure => format!(">= {MIN_SCENES} scenes"),
            Self::AutoNoStubFunctions => "0 functions whose body is only `pass`".to_string(),
        }
    }

    pub fn hint(self) -> &'static str {
        match self {
            Self::AutoUiStyling => {
                "Style the UI: add StyleBoxFlat panels, theme overrides, or custom font sizes instead of default controls."
            }
            Self::AutoPolishEffects => {
                "Add juice: tweens on UI and pickups, particles on hits, screen shake, and hit flashes."
            }
            Self::AutoVisualDepth => {
                "Add visual depth: parallax backgrounds, z_index layering, CanvasLayer overlays, or 2D lights and shadows."
            }
            Self::AutoFeedbackCoverage => {
                "Give feedback for damage, death, pickups/score, and abilities (sound, flash, particles, or UI change)."
            }
            Self::AutoVisualAssetsCoverage => {
                "Replace placeholder shapes with real sprites: the project needs at least 6 image assets."
            }
            Self::AutoMainSceneConfigured => {
                "Set application/run/main_scene in project.godot to an existing scene."
            }
            Self::AutoGameFlowStates => {
                "Implement the game loop states: main menu, game over, restart/retry, and pause."
            }
            Self::AutoSceneStructure => {
                "Split the game into multiple scenes (e.g. main menu, level, HUD) instead of a single scene."
            }
            Self::AutoNoStubFunctions => {
                "Implement or remove functions whose body is only `pass`."
            }
        }
    }

    /// Threshold test plus the observed value reported as `actual`.
    fn check(self, signals: &QualitySignals) -> (bool, Value) {
        match self {
            Self::AutoUiStyling => hits(&signals.ui_styling_hits, MIN_UI_STYLING_HITS),
            Self::AutoPolishEffects => hits(&signals.polish_effects_hits, MIN_POLISH_EFFECTS_HITS),
            Self::AutoVisualDepth => hits(&signals.visual_depth_hits, MIN_VISUAL_DEPTH_HITS),
            Self::AutoFeedbackCoverage => {
                hits(&signals.feedback_categories, MIN_FEEDBACK_CATEGORIES)
            }
            Self::AutoVisualAssetsCoverage => (
                signals.image_asset_count >= MIN_IMAGE_ASSETS,
                json!({ "count": signals.image_asset_count }),
            ),
            Self::AutoMainSceneConfigured => (
                signals.main_scene.exists,
                json!({
                    "main_scene": signals.main_scene.configured,
                    "resolved": signals.main_scene.resolved,
                    "exists": signals.main_scene.exists,
                }),
            ),
            Self::AutoGameFlowStates => hits(&signals.flow_categories, MIN_FLOW_CATEGORIES),
            Self::AutoSceneStructure => (
                signals.scene_count >= MIN_SCENES,
                json!({ "count": signals.scene_count }),
            ),
            Self::AutoNoStubFunctions => (
                signals.stub_functions.is_empty(),
                json!({
                    "count": signals.pass_stub_count(),
                    "functions": signals.stub_functions,
                }),
            ),
        }
    }
}

fn hits(found: &[String], min: usize) -> (bool, Value) {
    (
        found.len() >= min,
        json!({ "count": found.len(), "found": found }),
    )
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityGateDetail {
    pub passed: bool,
    pub expected: String,
    pub actual: Value,
    pub hint: String,
}

/// Numeric summary of the signals behind an evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub ui_styling_hits: usize,
    pub polish_effects_hits: usize,
    pub visual_depth_hits: usize,
    pub feedback_category_count: usize,
    pub flow_category_count: usize,
    pub image_asset_count: usize,
    pub scene_count: usize,
    pub script_count: usize,
    pub pass_stub_count: usize,
    pub main_scene_exists: bool,
}

impl From<&QualitySignals> for QualityMetrics {
    fn from(signals: &QualitySignals) -> Self {
        Self {
            ui_styling_hits: signals.ui_styling_hits.len(),
            polish_effects_hits: signals.polish_effects_hits.len(),
            visual_depth_hits: signals.visual_depth_hits.len(),
            feedback_category_count: signals.feedback_categories.len(),
            flow_category_count: signals.flow_categories.len(),
            image_asset_count: signals.image_asset_count,
            scene_count: signals.scene_count,
            script_count: signals.script_count,
            pass_stub_count: signals.pass_stub_count(),
            main_scene_exists: signals.main_scene.exists,
        }
    }
}

/// Verdict for one phase. Built once and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityEvaluation {
    pub phase_number: u32,
    pub phase_name: String,
    pub gates_passed: bool,
    pub failed_quality_gates: Vec<String>,
    pub gate_details: BTreeMap<String, QualityGateDetail>,
    pub quality_metrics: QualityMetrics,
}

impl QualityEvaluation {
    /// Evaluates every gate applicable at `phase_number`; the rest are left out entirely.
    pub fn from_signals(
        signals: &QualitySignals,
        phase_number: u32,
        phase_name: impl Into<String>,
    ) -> Self {
        let mut gate_details = BTreeMap::new();
        let mut failed_quality_gates = Vec::new();
        for gate in QualityGate::ALL {
            if !gate.applies_to(phase_number) {
                continue;
            }
            let (passed, actual) = gate.check(signals);
            if !passed {
                failed_quality_gates.push(gate.name().to_string());
            }
            gate_details.insert(
                gate.name().to_string(),
                QualityGateDetail {
                    passed,
                    expected: gate.expected(),
                    actual,
                    hint: gate.hint().to_string(),
                },
            );
        }
        Self {
            phase_number,
            phase_name: phase_name.into(),
            gates_passed: failed_quality_gates.is_empty(),
            failed_quality_gates,
            gate_details,
            quality_metrics: QualityMetrics::from(signals),
        }
    }

    /// `(gate, hint)` for each failing gate, in evaluation order.
    pub fn remediation(&self) -> Vec<(String, String)> {
        self.failed_quality_gates
            .iter()
            .filter_map(|name| {
                self.gate_details
                    .get(name)
                    .map(|detail| (name.clone(), detail.hint.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::{MainSceneSignal, StubFunction};
    use pretty_assertions::assert_eq;

    fn words(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn polished() -> QualitySignals {
        QualitySignals {
            ui_styling_hits: words(&["stylebox", "theme_override"]),
            polish_effects_hits: words(&["tween", "particles", "shake"]),
            visual_depth_hits: words(&["parallax", "z_index"]),
            feedback_categories: words(&["damage", "death", "pickup_score"]),
            flow_categories: words(&["menu", "game_over", "pause"]),
            image_asset_count: 6,
            scene_count: 2,
            script_count: 3,
            main_scene: MainSceneSignal {
                configured: Some("res://main.tscn".to_string()),
                resolved: Some("res://main.tscn".to_string()),
                exists: true,
            },
            stub_functions: Vec::new(),
        }
    }

    #[test]
    fn early_phases_evaluate_no_gates() {
        let evaluation = QualityEvaluation::from_signals(&QualitySignals::default(), 4, "Core");
        assert!(evaluation.gates_passed);
        assert!(evaluation.gate_details.is_empty());
    }

    #[test]
    fn phase_five_skips_structure_gates() {
        let mut signals = polished();
        signals.stub_functions.push(StubFunction {
            file: "res://a.gd".to_string(),
            function: "f".to_string(),
            line: 1,
        });
        let evaluation = QualityEvaluation::from_signals(&signals, 5, "Polish");
        assert!(evaluation.gates_passed);
        assert_eq!(evaluation.gate_details.len(), 5);
        assert!(!evaluation.gate_details.contains_key("auto_no_stub_functions"));

        let evaluation = QualityEvaluation::from_signals(&signals, 6, "Structure");
        assert!(!evaluation.gates_passed);
        assert_eq!(evaluation.failed_quality_gates, vec!["auto_no_stub_functions"]);
        assert_eq!(evaluation.quality_metrics.pass_stub_count, 1);
    }

    #[test]
    fn image_threshold_is_inclusive_at_six() {
        let mut signals = polished();
        let evaluation = QualityEvaluation::from_signals(&signals, 5, "Polish");
        assert!(evaluation.gate_details["auto_visual_assets_coverage"].passed);

        signals.image_asset_count = 5;
        let evaluation = QualityEvaluation::from_signals(&signals, 5, "Polish");
        assert_eq!(
            evaluation.failed_quality_gates,
            vec!["auto_visual_assets_coverage"]
        );
        assert_eq!(
            evaluation.gate_details["auto_visual_assets_coverage"].actual,
            json!({ "count": 5 })
        );
    }

    #[test]
    fn feedback_coverage_needs_three_of_four() {
        let mut signals = polished();
        assert!(QualityEvaluation::from_signals(&signals, 5, "Polish").gates_passed);
        signals.feedback_categories = words(&["damage", "death"]);
        let evaluation = QualityEvaluation::from_signals(&signals, 5, "Polish");
        assert_eq!(evaluation.failed_quality_gates, vec!["auto_feedback_coverage"]);
    }

    #[test]
    fn missing_main_scene_reports_exists_false() {
        let mut signals = polished();
        signals.main_scene = MainSceneSignal {
            configured: Some("res://missing.tscn".to_string()),
            resolved: Some("res://missing.tscn".to_string()),
            exists: false,
        };
        let evaluation = QualityEvaluation::from_signals(&signals, 6, "Structure");
        let detail = &evaluation.gate_details["auto_main_scene_configured"];
        assert!(!detail.passed);
        assert_eq!(detail.actual["exists"], json!(false));
        assert_eq!(detail.actual["main_scene"], json!("res://missing.tscn"));
    }

    #[test]
    fn failures_keep_table_order_with_hints() {
        let evaluation = QualityEvaluation::from_signals(&QualitySignals::default(), 6, "Late");
        let names: Vec<&str> = QualityGate::ALL
            .iter()
            .filter(|gate| **gate != QualityGate::AutoNoStubFunctions)
            .map(|gate| gate.name())
            .collect();
        assert_eq!(evaluation.failed_quality_gates, names);
        let remediation = evaluation.remediation();
        assert_eq!(remediation.len(), 8);
        assert_eq!(remediation[0].1, QualityGate::AutoUiStyling.hint());
    }
}
