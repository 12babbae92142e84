use gdbridge_protocol::paths::{resolve_res_path, to_res_path, UID_SCHEME};
use gdbridge_scanner::{read_text_bounded, FileScanner, ScanOptions};
use gdbridge_scene::{parse_sections, ProjectSettings};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Larger sources (usually generated `.tres` data) are left out of the corpus.
const MAX_SOURCE_BYTES: u64 = 2 * 1024 * 1024;

/// Themed controls, style boxes, font overrides.
pub const UI_STYLING_TERMS: &[&str] = &[
    "stylebox",
    "theme_override",
    "add_theme_",
    "font_size",
    "label_settings",
    "panelcontainer",
    "ninepatchrect",
    "custom_fonts",
];

/// Tweens, particles, screen shake and other juice.
pub const POLISH_EFFECTS_TERMS: &[&str] = &[
    "tween",
    "particles",
    "shake",
    "animationplayer",
    "flash",
    "set_ease",
    "set_trans",
    "trail",
    "glow",
];

/// Layering, lighting, parallax.
pub const VISUAL_DEPTH_TERMS: &[&str] = &[
    "parallax",
    "z_index",
    "canvaslayer",
    "light2d",
    "shadow",
    "worldenvironment",
    "canvasmodulate",
    "y_sort",
];

/// A named group of keyword variants; satisfied when any variant appears.
#[derive(Debug, Clone, Copy)]
pub struct KeywordCategory {
    pub name: &'static str,
    pub variants: &'static [&'static str],
}

pub const FEEDBACK_CATEGORIES: &[KeywordCategory] = &[
    KeywordCategory {
        name: "damage",
        variants: &["damage", "hurt", "take_hit", "hitbox"],
    },
    KeywordCategory {
        name: "death",
        variants: &["death", "_die", "died", "game_over_effect", "killed"],
    },
    KeywordCategory {
        name: "pickup_score",
        variants: &["pickup", "collect", "score", "coin"],
    },
    KeywordCategory {
        name: "ability",
        variants: &["ability", "dash", "powerup", "power_up", "cooldown"],
    },
];

pub const FLOW_CATEGORIES: &[KeywordCategory] = &[
    KeywordCategory {
        name: "menu",
        variants: &["menu", "title_screen"],
    },
    KeywordCategory {
        name: "game_over",
        variants: &["game_over", "gameover", "game over"],
    },
    KeywordCategory {
        name: "restart_retry",
        variants: &["restart", "retry", "reload_current_scene"],
    },
    KeywordCategory {
        name: "pause",
        variants: &["pause"],
    },
];

/// Where the configured main scene points and whether it exists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MainSceneSignal {
    /// Value of `application/run/main_scene`.
    pub configured: Option<String>,
    /// `res://` path the value resolved to.
    pub resolved: Option<String>,
    pub exists: bool,
}

/// A function whose body is only `pass`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StubFunction {
    pub file: String,
    pub function: String,
    pub line: usize,
}

/// Everything the gates look at, computed from the project tree in one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualitySignals {
    pub ui_styling_hits: Vec<String>,
    pub polish_effects_hits: Vec<String>,
    pub visual_depth_hits: Vec<String>,
    pub feedback_categories: Vec<String>,
    pub flow_categories: Vec<String>,
    pub image_asset_count: usize,
    pub scene_count: usize,
    pub script_count: usize,
    pub main_scene: MainSceneSignal,
    pub stub_functions: Vec<StubFunction>,
}

impl QualitySignals {
    pub fn collect(root: &Path) -> Self {
        let sources = FileScanner::new(root, ScanOptions::text_sources()).scan();
        let mut corpus = String::new();
        let mut stub_functions = Vec::new();
        let mut scene_files = Vec::new();
        let mut script_count = 0;

        for path in &sources {
            let text = match read_text_bounded(path, MAX_SOURCE_BYTES) {
                Ok(Some(text)) => text,
                Ok(None) => continue,
                Err(err) => {
                    log::debug!("Skipping unreadable {}: {err}", path.display());
                    continue;
                }
            };
            match extension_of(path).as_deref() {
                Some("gd") => {
                    script_count += 1;
                    let res_path = to_res_path(root, path);
                    stub_functions.extend(find_stub_functions(&text).into_iter().map(
                        |(function, line)| StubFunction {
                            file: res_path.clone(),
                            function,
                            line,
                        },
                    ));
                }
                Some("tscn") => scene_files.push(path.clone()),
                _ => {}
            }
            corpus.push_str(&text.to_lowercase());
            corpus.push('\n');
        }

        let image_asset_count = FileScanner::new(root, ScanOptions::images()).scan().len();

        Self {
            ui_styling_hits: vocabulary_hits(&corpus, UI_STYLING_TERMS),
            polish_effects_hits: vocabulary_hits(&corpus, POLISH_EFFECTS_TERMS),
            visual_depth_hits: vocabulary_hits(&corpus, VISUAL_DEPTH_TERMS),
            feedback_categories: category_coverage(&corpus, FEEDBACK_CATEGORIES),
            flow_categories: category_coverage(&corpus, FLOW_CATEGORIES),
            image_asset_count,
            scene_count: scene_files.len(),
            script_count,
            main_scene: resolve_main_scene(root, &scene_files),
            stub_functions,
        }
    }

    pub fn pass_stub_count(&self) -> usize {
        self.stub_functions.len()
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

/// Vocabulary terms present in `corpus` (already lower-cased), in vocabulary order.
pub fn vocabulary_hits(corpus: &str, terms: &[&str]) -> Vec<String> {
    terms
        .iter()
        .filter(|term| corpus.contains(*term))
        .map(|term| term.to_string())
        .collect()
}

/// Names of categories with at least one variant present in `corpus`.
pub fn category_coverage(corpus: &str, categories: &[KeywordCategory]) -> Vec<String> {
    categories
        .iter()
        .filter(|category| category.variants.iter().any(|v| corpus.contains(v)))
        .map(|category| category.name.to_string())
        .collect()
}

/// Functions whose first body statement is `pass`, as `(name, 1-based line)`.
///
/// Handles inline bodies (`func f(): pass`) and signatures wrapped over several lines.
pub fn find_stub_functions(source: &str) -> Vec<(String, usize)> {
    let lines: Vec<&str> = source.lines().collect();
    let mut stubs = Vec::new();
    let mut idx = 0;
    while idx < lines.len() {
        let line = lines[idx];
        let Some(name) = function_name(line) else {
            idx += 1;
            continue;
        };
        let start = idx;
        let indent = indentation(line);

        // Join wrapped signatures until the parameter list closes.
        let mut signature = strip_comment(line).to_string();
        while paren_depth(&signature) > 0 && idx + 1 < lines.len() {
            idx += 1;
            signature.push(' ');
            signature.push_str(strip_comment(lines[idx]));
        }
        idx += 1;

        let inline_body = signature_body(&signature);
        let is_stub = match inline_body {
            Some(body) if !body.is_empty() => body == "pass",
            _ => lines[idx..]
                .iter()
                .map(|l| (indentation(l), strip_comment(l).trim()))
                .find(|(_, code)| !code.is_empty())
                .is_some_and(|(body_indent, code)| body_indent > indent && code == "pass"),
        };
        if is_stub {
            stubs.push((name, start + 1));
        }
    }
    stubs
}

fn function_name(line: &str) -> Option<String> {
    let trimmed = line.trim_start();
    let rest = trimmed.strip_prefix("static ").unwrap_or(trimmed).trim_start();
    let rest = rest.strip_prefix("func ")?;
    let name: String = rest
        .trim_start()
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    (!name.is_empty()).then_some(name)
}

fn indentation(line: &str) -> usize {
    line.chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

fn paren_depth(text: &str) -> i32 {
    text.chars().fold(0, |depth, c| match c {
        '(' => depth + 1,
        ')' => depth - 1,
        _ => depth,
    })
}

/// Code after the signature's terminating `:`, trimmed. `None` if the signature never closes.
fn signature_body(signature: &str) -> Option<&str> {
    let close = signature.rfind(')')?;
    let after = &signature[close + 1..];
    let colon = after.find(':')?;
    Some(after[colon + 1..].trim())
}

fn resolve_main_scene(root: &Path, scene_files: &[PathBuf]) -> MainSceneSignal {
    let configured = match ProjectSettings::load(root) {
        Ok(Some(settings)) => settings.main_scene().map(str::to_string),
        Ok(None) => None,
        Err(err) => {
            log::warn!("Failed to parse project.godot: {err}");
            None
        }
    };
    let Some(value) = configured.clone() else {
        return MainSceneSignal::default();
    };

    let resolved = if value.starts_with(UID_SCHEME) {
        scene_files
            .iter()
            .find(|path| scene_uid(path).as_deref() == Some(value.as_str()))
            .cloned()
    } else {
        resolve_res_path(root, &value)
    };
    let exists = resolved.as_deref().is_some_and(Path::is_file);
    MainSceneSignal {
        configured,
        resolved: resolved.map(|path| to_res_path(root, &path)),
        exists,
    }
}

/// `uid` attribute of the scene header, reading only up to the header line.
fn scene_uid(path: &Path) -> Option<String> {
    let text = std::fs::read_to_string(path).ok()?;
    let header = text.lines().find(|line| line.trim_start().starts_with('['))?;
    let sections = parse_sections(header).ok()?;
    sections.first()?.attr("uid").map(str::to_string)
}
