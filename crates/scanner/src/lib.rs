//! # gdbridge scanner
//!
//! Leaf utilities shared by the bridge and the tool proxy:
//!
//! - [`FileScanner`] walks a Godot project and returns files by extension, skipping hidden
//!   directories, `addons/`, and `docs/`.
//! - [`tail_file`] reads the bounded tail of a (possibly huge) log file.

mod error;
mod log_tail;
mod scanner;

pub use error::{Result, ScannerError};
pub use log_tail::{read_text_bounded, tail_file, DEFAULT_TAIL_BYTES};
pub use scanner::{
    FileScanner, ScanOptions, DEFAULT_EXCLUDED_DIRS, IMAGE_EXTENSIONS, SCENE_EXTENSIONS,
    SCRIPT_EXTENSIONS, TEXT_RESOURCE_EXTENSIONS,
};
