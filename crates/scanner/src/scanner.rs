use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// What a [`FileScanner`] walk should return.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Lower-case extensions without the dot.
    pub extensions: Vec<String>,
    /// Directory names (any depth) that are never entered.
    pub excluded_dirs: Vec<String>,
    pub include_hidden: bool,
    pub respect_gitignore: bool,
    /// Upper bound on returned files; keeps a single request from walking forever.
    pub max_files: usize,
    pub max_file_size_bytes: u64,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            extensions: Vec::new(),
            excluded_dirs: DEFAULT_EXCLUDED_DIRS.iter().map(|d| d.to_string()).collect(),
            include_hidden: false,
            respect_gitignore: false,
            max_files: DEFAULT_MAX_FILES,
            max_file_size_bytes: MAX_FILE_SIZE_BYTES,
        }
    }
}

impl ScanOptions {
    pub fn with_extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            ..Self::default()
        }
    }

    /// GDScript sources.
    pub fn scripts() -> Self {
        Self::with_extensions(SCRIPT_EXTENSIONS)
    }

    /// Text scenes.
    pub fn scenes() -> Self {
        Self::with_extensions(SCENE_EXTENSIONS)
    }

    /// Every text file the quality signals read (scripts, scenes, text resources).
    pub fn text_sources() -> Self {
        Self::with_extensions(SCRIPT_EXTENSIONS.iter().chain(TEXT_RESOURCE_EXTENSIONS))
    }

    /// Raster and vector images.
    pub fn images() -> Self {
        Self::with_extensions(IMAGE_EXTENSIONS)
    }
}

/// Walks a Godot project and returns files matching a [`ScanOptions`] filter.
pub struct FileScanner {
    root: PathBuf,
    options: ScanOptions,
}

impl FileScanner {
    pub fn new(root: impl AsRef<Path>, options: ScanOptions) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            options,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scan the project tree. Results are sorted for deterministic output.
    pub fn scan(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();

        let root = self.root.clone();
        let excluded = self.options.excluded_dirs.clone();
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .hidden(!self.options.include_hidden)
            .git_ignore(self.options.respect_gitignore)
            .git_global(self.options.respect_gitignore)
            .git_exclude(self.options.respect_gitignore)
            .parents(self.options.respect_gitignore)
            .ignore(false);
        builder.filter_entry(move |entry| !is_excluded_scope(entry.path(), &root, &excluded));

        for result in builder.build() {
            match result {
                Ok(entry) => {
                    let Some(file_type) = entry.file_type() else {
                        continue;
                    };
                    if !file_type.is_file() {
                        continue;
                    }

                    let path = entry.path();
                    if !self.matches_extension(path) {
                        continue;
                    }

                    if let Ok(meta) = entry.metadata() {
                        if meta.len() > self.options.max_file_size_bytes {
                            log::debug!(
                                "Skipping large file {} ({} bytes > {})",
                                path.display(),
                                meta.len(),
                                self.options.max_file_size_bytes
                            );
                            continue;
                        }
                    }

                    files.push(path.to_path_buf());
                    if files.len() >= self.options.max_files {
                        log::warn!(
                            "Scan of {} stopped at {} files",
                            self.root.display(),
                            self.options.max_files
                        );
                        break;
                    }
                }
                Err(e) => log::warn!("Failed to read entry: {e}"),
            }
        }

        files.sort();
        log::debug!("Found {} matching files under {}", files.len(), self.root.display());
        files
    }

    fn matches_extension(&self, path: &Path) -> bool {
        if self.options.extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .is_some_and(|ext| self.options.extensions.iter().any(|c| c == &ext))
    }
}

fn is_excluded_scope(path: &Path, root: &Path, excluded: &[String]) -> bool {
    if let Ok(relative) = path.strip_prefix(root) {
        for component in relative.components() {
            if let std::path::Component::Normal(name) = component {
                let lowered = name.to_string_lossy().to_lowercase();
                if excluded.iter().any(|ignored| ignored == &lowered) {
                    return true;
                }
            }
        }
    }
    false
}

/// Plugin code and reference docs are not part of the game being built.
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &["addons", "docs", ".godot", ".import", ".claude"];

pub const SCRIPT_EXTENSIONS: &[&str] = &["gd"];
pub const SCENE_EXTENSIONS: &[&str] = &["tscn"];
pub const TEXT_RESOURCE_EXTENSIONS: &[&str] = &["tscn", "tres"];
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "svg"];

const DEFAULT_MAX_FILES: usize = 20_000;
const MAX_FILE_SIZE_BYTES: u64 = 4 * 1_048_576;
