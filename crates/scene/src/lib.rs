//! # gdbridge scene
//!
//! Godot stores scenes (`.tscn`), resources (`.tres`), and `project.godot` in the same
//! line-oriented text format: `[section key="value" ...]` headers followed by `key = value`
//! lines. [`parse_sections`] is the shared scanner; [`SceneDocument`] and [`ProjectSettings`]
//! are typed views over it.

mod error;
mod parser;
mod project;
mod scene;

pub use error::{Result, SceneError};
pub use parser::{parse_sections, unquote, Section};
pub use project::ProjectSettings;
pub use scene::{SceneConnection, SceneDocument, SceneNode, SceneResource};
