use crate::{QualityError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use gdbridge_protocol::paths::quality_reports_dir;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

pub const REPORT_FORMAT_VERSION: u32 = 1;
pub const DEFAULT_REPORT_LIMIT: usize = 10;
const MAX_COLLISION_SUFFIX: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportTrigger {
    ManualEvaluation,
    PhaseCompletionCheck,
    PocRubricScore,
}

impl ReportTrigger {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ManualEvaluation => "manual_evaluation",
            Self::PhaseCompletionCheck => "phase_completion_check",
            Self::PocRubricScore => "poc_rubric_score",
        }
    }
}

/// On-disk report document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDocument {
    pub version: u32,
    pub generated_at: String,
    pub trigger: ReportTrigger,
    #[serde(default)]
    pub meta: Value,
    pub report: Value,
}

/// A report found by [`QualityReportStore::list`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReport {
    pub file_name: String,
    pub phase_number: u32,
    pub trigger: String,
    pub document: ReportDocument,
}

static REPORT_FILE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{8}T\d{6}\.\d{3}Z)-phase(\d+)-([a-z_]+?)(?:-(\d+))?\.json$")
        .expect("valid report file regex")
});

/// Append-only audit log of evaluations under `.claude/quality_reports/`.
#[derive(Debug, Clone)]
pub struct QualityReportStore {
    dir: PathBuf,
}

impl QualityReportStore {
    pub fn for_project(root: &Path) -> Self {
        Self {
            dir: quality_reports_dir(root),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn persist(
        &self,
        trigger: ReportTrigger,
        phase_number: u32,
        meta: Value,
        report: &impl Serialize,
    ) -> Result<PathBuf> {
        self.persist_at(Utc::now(), trigger, phase_number, meta, report)
    }

    /// Writes a new report file stamped `now`. Existing files are never touched: a clashing
    /// name gets a `-1`, `-2`, ... suffix.
    pub fn persist_at(
        &self,
        now: DateTime<Utc>,
        trigger: ReportTrigger,
        phase_number: u32,
        meta: Value,
        report: &impl Serialize,
    ) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let document = ReportDocument {
            version: REPORT_FORMAT_VERSION,
            generated_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            trigger,
            meta,
            report: serde_json::to_value(report)?,
        };
        let bytes = serde_json::to_vec_pretty(&document)?;
        let stem = format!(
            "{}-phase{phase_number}-{}",
            now.format("%Y%m%dT%H%M%S%.3fZ"),
            trigger.as_str()
        );

        for attempt in 0..MAX_COLLISION_SUFFIX {
            let name = if attempt == 0 {
                format!("{stem}.json")
            } else {
                format!("{stem}-{attempt}.json")
            };
            let path = self.dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(&bytes)?;
                    file.flush()?;
                    log::debug!("Persisted quality report {}", path.display());
                    return Ok(path);
                }
                Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Err(QualityError::IoError(std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!("no free report file name for {stem}"),
        )))
    }

    /// Most recent reports first, optionally for a single phase.
    ///
    /// Files whose names do not follow the report pattern are ignored; unreadable or invalid
    /// report files are skipped with a warning.
    pub fn list(&self, phase_number: Option<u32>, limit: usize) -> Result<Vec<StoredReport>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut candidates = Vec::new();
        for entry in entries {
            let entry = entry?;
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let Some(caps) = REPORT_FILE.captures(&file_name) else {
                continue;
            };
            let Ok(phase) = caps[2].parse::<u32>() else {
                continue;
            };
            if phase_number.is_some_and(|wanted| wanted != phase) {
                continue;
            }
            let stamp = caps[1].to_string();
            let trigger = caps[3].to_string();
            let suffix: u32 = caps
                .get(4)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0);
            candidates.push((stamp, suffix, phase, trigger, file_name));
        }
        candidates.sort_by(|a, b| (&b.0, b.1).cmp(&(&a.0, a.1)));

        let mut reports = Vec::new();
        for (_, _, phase, trigger, file_name) in candidates {
            if reports.len() >= limit {
                break;
            }
            match self.read(&file_name) {
                Ok(document) => reports.push(StoredReport {
                    file_name,
                    phase_number: phase,
                    trigger,
                    document,
                }),
                Err(err) => log::warn!("Skipping report {file_name}: {err}"),
            }
        }
        Ok(reports)
    }

    fn read(&self, file_name: &str) -> Result<ReportDocument> {
        let text = std::fs::read_to_string(self.dir.join(file_name))?;
        serde_json::from_str(&text).map_err(|err| QualityError::InvalidReport {
            file: file_name.to_string(),
            message: err.to_string(),
        })
    }
}
