use gdbridge_protocol::{PhaseState, PhaseStatus};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

/// Derives a phase transition from a free-form log line.
///
/// Best effort: `None` for anything that does not announce a phase. A detected state is never
/// `completed`; completion only goes through `POST /phase` from the proxy's guarded path.
pub trait PhaseLogDetector: Send + Sync {
    fn detect(&self, line: &str, current: &PhaseState) -> Option<PhaseState>;
}

/// `Phase 3: Core Mechanics started`, `Starting Phase 2 - Scenes`, `Phase 4 complete`.
static PHASE_PHRASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(?P<lead>starting|beginning|begin|start)?\s*phase\s+(?P<num>\d+)\s*(?:[:\-–]\s*(?P<name>.*?))?\s*(?P<status>started|starting|begun|in progress|complete|completed|done|finished)?\s*[.!]?\s*$",
    )
    .expect("valid phase phrase regex")
});

#[derive(Debug, Clone, Copy, Default)]
pub struct PhrasePhaseDetector;

impl PhaseLogDetector for PhrasePhaseDetector {
    fn detect(&self, line: &str, current: &PhaseState) -> Option<PhaseState> {
        let caps = PHASE_PHRASE.captures(line)?;
        let phase_number: u32 = caps.name("num")?.as_str().parse().ok()?;

        // Any announcement, including "Phase N complete", means work on phase N.
        if caps.name("status").is_none() && caps.name("lead").is_none() {
            return None;
        }
        let status = PhaseStatus::InProgress;

        let same_phase = phase_number == current.phase_number;
        let parsed_name = caps
            .name("name")
            .map(|m| m.as_str().trim())
            .filter(|name| !name.is_empty());
        let phase_name = match parsed_name {
            Some(name) => name.to_string(),
            None if same_phase && !current.phase_name.is_empty() => current.phase_name.clone(),
            None => format!("Phase {phase_number}"),
        };
        let quality_gates = if same_phase {
            current.quality_gates.clone()
        } else {
            BTreeMap::new()
        };

        Some(PhaseState {
            phase_number,
            phase_name,
            status,
            quality_gates,
            updated_at: None,
        })
    }
}
