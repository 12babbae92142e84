//! Proof-of-concept rubric: a 0-100 score over the same signals as the gates.
//!
//! Unlike the gates, every dimension is scored regardless of phase and earns partial credit in
//! proportion to how close its signal is to the gate threshold.

use crate::gates::{
    QualityGate, MIN_FEEDBACK_CATEGORIES, MIN_FLOW_CATEGORIES, MIN_IMAGE_ASSETS,
    MIN_POLISH_EFFECTS_HITS, MIN_SCENES, MIN_UI_STYLING_HITS, MIN_VISUAL_DEPTH_HITS,
};
use crate::signals::QualitySignals;
use serde::{Deserialize, Serialize};

/// Stubs at or above this count zero the stub dimension.
const STUB_PENALTY_CEILING: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RubricDimension {
    pub gate: String,
    pub score: u32,
    pub max_score: u32,
    /// Observed signal value.
    pub observed: usize,
    /// Threshold the gate requires.
    pub target: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PocScore {
    pub phase_number: u32,
    pub total_score: u32,
    pub max_score: u32,
    pub grade: char,
    pub dimensions: Vec<RubricDimension>,
    /// Hints for every dimension below full marks.
    pub improvements: Vec<String>,
}

fn weight(gate: QualityGate) -> u32 {
    match gate {
        QualityGate::AutoUiStyling => 10,
        QualityGate::AutoPolishEffects => 15,
        QualityGate::AutoVisualDepth => 10,
        QualityGate::AutoFeedbackCoverage => 15,
        QualityGate::AutoVisualAssetsCoverage => 15,
        QualityGate::AutoMainSceneConfigured => 10,
        QualityGate::AutoGameFlowStates => 10,
        QualityGate::AutoSceneStructure => 5,
        QualityGate::AutoNoStubFunctions => 10,
    }
}

fn observed_and_target(gate: QualityGate, signals: &QualitySignals) -> (usize, usize) {
    match gate {
        QualityGate::AutoUiStyling => (signals.ui_styling_hits.len(), MIN_UI_STYLING_HITS),
        QualityGate::AutoPolishEffects => {
            (signals.polish_effects_hits.len(), MIN_POLISH_EFFECTS_HITS)
        }
        QualityGate::AutoVisualDepth => (signals.visual_depth_hits.len(), MIN_VISUAL_DEPTH_HITS),
        QualityGate::AutoFeedbackCoverage => {
            (signals.feedback_categories.len(), MIN_FEEDBACK_CATEGORIES)
        }
        QualityGate::AutoVisualAssetsCoverage => (signals.image_asset_count, MIN_IMAGE_ASSETS),
        QualityGate::AutoMainSceneConfigured => (usize::from(signals.main_scene.exists), 1),
        QualityGate::AutoGameFlowStates => (signals.flow_categories.len(), MIN_FLOW_CATEGORIES),
        QualityGate::AutoSceneStructure => (signals.scene_count, MIN_SCENES),
        QualityGate::AutoNoStubFunctions => (signals.pass_stub_count(), 0),
    }
}

fn dimension_score(gate: QualityGate, observed: usize, target: usize) -> u32 {
    let max = weight(gate);
    let ratio = if gate == QualityGate::AutoNoStubFunctions {
        let capped = observed.min(STUB_PENALTY_CEILING);
        (STUB_PENALTY_CEILING - capped) as f64 / STUB_PENALTY_CEILING as f64
    } else if target == 0 {
        1.0
    } else {
        (observed as f64 / target as f64).min(1.0)
    };
    (f64::from(max) * ratio).round() as u32
}

pub fn grade_for(score: u32) -> char {
    match score {
        90.. => 'A',
        80..=89 => 'B',
        70..=79 => 'C',
        60..=69 => 'D',
        _ => 'F',
    }
}

impl PocScore {
    pub fn from_signals(signals: &QualitySignals, phase_number: u32) -> Self {
        let mut dimensions = Vec::with_capacity(QualityGate::ALL.len());
        let mut improvements = Vec::new();
        for gate in QualityGate::ALL {
            let (observed, target) = observed_and_target(gate, signals);
            let score = dimension_score(gate, observed, target);
            let max_score = weight(gate);
            if score < max_score {
                improvements.push(gate.hint().to_string());
            }
            dimensions.push(RubricDimension {
                gate: gate.name().to_string(),
                score,
                max_score,
                observed,
                target,
            });
        }
        let total_score = dimensions.iter().map(|d| d.score).sum();
        let max_score = dimensions.iter().map(|d| d.max_score).sum();
        Self {
            phase_number,
            total_score,
            max_score,
            grade: grade_for(total_score),
            dimensions,
            improvements,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn weights_sum_to_one_hundred() {
        let total: u32 = QualityGate::ALL.iter().map(|gate| weight(*gate)).sum();
        assert_eq!(total, 100);
    }

    #[test]
    fn empty_project_only_scores_stub_dimension() {
        let score = PocScore::from_signals(&QualitySignals::default(), 2);
        assert_eq!(score.total_score, 10);
        assert_eq!(score.max_score, 100);
        assert_eq!(score.grade, 'F');
        assert_eq!(score.improvements.len(), 8);
    }

    #[test]
    fn partial_credit_is_proportional() {
        let signals = QualitySignals {
            image_asset_count: 3,
            polish_effects_hits: vec!["tween".to_string()],
            ..QualitySignals::default()
        };
        let score = PocScore::from_signals(&signals, 5);
        let by_gate = |name: &str| {
            score
                .dimensions
                .iter()
                .find(|d| d.gate == name)
                .map(|d| d.score)
        };
        assert_eq!(by_gate("auto_visual_assets_coverage"), Some(8));
        assert_eq!(by_gate("auto_polish_effects"), Some(5));
    }

    #[test]
    fn grade_boundaries() {
        assert_eq!(grade_for(100), 'A');
        assert_eq!(grade_for(90), 'A');
        assert_eq!(grade_for(89), 'B');
        assert_eq!(grade_for(70), 'C');
        assert_eq!(grade_for(60), 'D');
        assert_eq!(grade_for(59), 'F');
    }
}
