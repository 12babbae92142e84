use crate::Result;
use gdbridge_protocol::{paths::phase_file_path, PhaseState};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Owner of the current [`PhaseState`].
///
/// `save` replaces the state wholesale; there is no partial update.
pub trait PhaseRepository: Send + Sync {
    fn current(&self) -> PhaseState;
    fn save(&self, state: PhaseState) -> Result<()>;
}

/// In-memory only. Used by tests and when the state directory is not writable.
#[derive(Debug, Default)]
pub struct MemoryPhaseRepository {
    state: RwLock<PhaseState>,
}

impl MemoryPhaseRepository {
    pub fn new(initial: PhaseState) -> Self {
        Self {
            state: RwLock::new(initial),
        }
    }
}

impl PhaseRepository for MemoryPhaseRepository {
    fn current(&self) -> PhaseState {
        match self.state.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn save(&self, state: PhaseState) -> Result<()> {
        match self.state.write() {
            Ok(mut guard) => *guard = state,
            Err(poisoned) => *poisoned.into_inner() = state,
        }
        Ok(())
    }
}

/// Mirrors the state to `.claude/current_phase.json`.
///
/// The file is read once at startup; afterwards memory is authoritative and every save rewrites
/// the file through a temp file + rename.
#[derive(Debug)]
pub struct FilePhaseRepository {
    path: PathBuf,
    cache: MemoryPhaseRepository,
}

impl FilePhaseRepository {
    pub fn open(project_root: &Path) -> Self {
        let path = phase_file_path(project_root);
        let initial = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|err| {
                log::warn!("Ignoring unreadable phase file {}: {err}", path.display());
                PhaseState::default()
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => PhaseState::default(),
            Err(err) => {
                log::warn!("Failed to read phase file {}: {err}", path.display());
                PhaseState::default()
            }
        };
        Self {
            path,
            cache: MemoryPhaseRepository::new(initial),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PhaseRepository for FilePhaseRepository {
    fn current(&self) -> PhaseState {
        self.cache.current()
    }

    fn save(&self, state: PhaseState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec_pretty(&state)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &self.path)?;
        self.cache.save(state)
    }
}
