use crate::classifier::{GodotLogClassifier, LogLineClassifier};
use crate::loader::{ScriptLoadReport, ScriptLoader};
use crate::log_scan::LogScan;
use gdbridge_protocol::{dedup_entries, paths::to_res_path, unix_now_secs, ErrorEntry};
use gdbridge_scanner::{tail_file, FileScanner, ScanOptions, DEFAULT_TAIL_BYTES};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Scripts validated at the same time.
pub const DEFAULT_VALIDATION_CONCURRENCY: usize = 4;

/// Wall-clock cap on one validation pass. Stays under the proxy's slow request timeout.
pub const DEFAULT_VALIDATION_BUDGET: Duration = Duration::from_secs(6);

/// Deduplicated errors and warnings from one collection pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub errors: Vec<ErrorEntry>,
    pub warnings: Vec<ErrorEntry>,
    /// Scripts left unvalidated because the pass ran out of time.
    pub unchecked_scripts: usize,
}

/// Result of active validation; partial when the budget ran out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub errors: Vec<ErrorEntry>,
    pub unchecked: usize,
}

/// Merges active script validation with log tail scraping.
///
/// Holds no state between calls: every [`ErrorCollector::collect`] reruns both strategies from
/// scratch. Validation runs at most `concurrency` loader calls at once and gives up on whatever
/// is still pending once `validation_budget` has elapsed.
pub struct ErrorCollector {
    root: PathBuf,
    loader: Arc<dyn ScriptLoader>,
    classifier: Arc<dyn LogLineClassifier>,
    log_paths: Vec<PathBuf>,
    tail_bytes: u64,
    concurrency: usize,
    validation_budget: Duration,
}

impl ErrorCollector {
    pub fn new(root: impl AsRef<Path>, loader: Arc<dyn ScriptLoader>, log_paths: Vec<PathBuf>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            loader,
            classifier: Arc::new(GodotLogClassifier),
            log_paths,
            tail_bytes: DEFAULT_TAIL_BYTES,
            concurrency: DEFAULT_VALIDATION_CONCURRENCY,
            validation_budget: DEFAULT_VALIDATION_BUDGET,
        }
    }

    #[must_use]
    pub fn with_classifier(mut self, classifier: Arc<dyn LogLineClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    #[must_use]
    pub fn with_tail_bytes(mut self, tail_bytes: u64) -> Self {
        self.tail_bytes = tail_bytes;
        self
    }

    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    #[must_use]
    pub fn with_validation_budget(mut self, budget: Duration) -> Self {
        self.validation_budget = budget;
        self
    }

    pub fn log_paths(&self) -> &[PathBuf] {
        &self.log_paths
    }

    pub async fn collect(&self) -> Diagnostics {
        let timestamp = unix_now_secs();
        let (validation, (log_errors, log_warnings)) =
            tokio::join!(self.validate_scripts(timestamp), self.scan_logs(timestamp));

        let mut errors = validation.errors;
        errors.extend(log_errors);
        Diagnostics {
            errors: dedup_entries(errors),
            warnings: dedup_entries(log_warnings),
            unchecked_scripts: validation.unchecked,
        }
    }

    /// Strategy A: force-reload every project script.
    ///
    /// Errors come back in script path order regardless of completion order.
    pub async fn validate_scripts(&self, timestamp: i64) -> ValidationOutcome {
        let root = self.root.clone();
        let scripts = tokio::task::spawn_blocking(move || {
            FileScanner::new(&root, ScanOptions::scripts()).scan()
        })
        .await
        .unwrap_or_else(|err| {
            log::warn!("Script scan task failed: {err}");
            Vec::new()
        });

        let deadline = tokio::time::Instant::now() + self.validation_budget;
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();
        for (order, path) in scripts.into_iter().enumerate() {
            let res_path = to_res_path(&self.root, &path);
            let loader = Arc::clone(&self.loader);
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.ok()?;
                let outcome = loader.reload_script(&res_path, &path).await;
                Some((order, res_path, outcome))
            });
        }

        let mut finished = Vec::new();
        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok(Some(done)))) => finished.push(done),
                Ok(Some(Ok(None))) => {}
                Ok(Some(Err(err))) => log::debug!("Script validation task failed: {err}"),
                Ok(None) => break,
                Err(_) => {
                    log::warn!(
                        "Script validation exceeded {:?}; {} scripts left unchecked",
                        self.validation_budget,
                        tasks.len()
                    );
                    break;
                }
            }
        }
        let unchecked = tasks.len();
        tasks.abort_all();

        finished.sort_by_key(|(order, ..)| *order);
        let errors = finished
            .into_iter()
            .filter_map(|(_, res_path, outcome)| match outcome {
                Ok(report) => failure_entry(&res_path, report, timestamp),
                Err(err) => {
                    log::debug!("Skipping validation of {res_path}: {err}");
                    None
                }
            })
            .collect();
        ValidationOutcome { errors, unchecked }
    }

    /// Strategy B: classify the tail of every log file that exists.
    pub async fn scan_logs(&self, timestamp: i64) -> (Vec<ErrorEntry>, Vec<ErrorEntry>) {
        let classifier = Arc::clone(&self.classifier);
        let log_paths = self.log_paths.clone();
        let tail_bytes = self.tail_bytes;
        tokio::task::spawn_blocking(move || {
            scan_log_tails(classifier.as_ref(), &log_paths, tail_bytes, timestamp)
        })
        .await
        .unwrap_or_else(|err| {
            log::warn!("Log scan task failed: {err}");
            (Vec::new(), Vec::new())
        })
    }
}

fn failure_entry(res_path: &str, report: ScriptLoadReport, timestamp: i64) -> Option<ErrorEntry> {
    if report.is_healthy() {
        return None;
    }
    let message = match (report.loaded, report.message) {
        (false, Some(detail)) => format!("Failed to load script {res_path}: {detail}"),
        (false, None) => format!("Failed to load script {res_path}"),
        (true, Some(detail)) => format!("Script {res_path} cannot be instantiated: {detail}"),
        (true, None) => format!("Script {res_path} cannot be instantiated"),
    };
    Some(ErrorEntry::new(
        message,
        res_path,
        report.line.unwrap_or(-1),
        timestamp,
    ))
}

fn scan_log_tails(
    classifier: &dyn LogLineClassifier,
    log_paths: &[PathBuf],
    tail_bytes: u64,
    timestamp: i64,
) -> (Vec<ErrorEntry>, Vec<ErrorEntry>) {
    let mut scan = LogScan::new(classifier, timestamp);
    for path in log_paths {
        match tail_file(path, tail_bytes) {
            Ok(Some(text)) => scan.push_text(&text),
            Ok(None) => {}
            Err(err) => log::warn!("Failed to read log {}: {err}", path.display()),
        }
    }
    scan.finish()
}
