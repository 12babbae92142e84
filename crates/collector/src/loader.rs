use crate::Result;
use async_trait::async_trait;
use std::path::Path;

/// Outcome of force-reloading one script, bypassing any cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptLoadReport {
    pub loaded: bool,
    pub can_instantiate: bool,
    /// Host-provided failure detail, if any.
    pub message: Option<String>,
    pub line: Option<i64>,
}

impl ScriptLoadReport {
    pub fn ok() -> Self {
        Self {
            loaded: true,
            can_instantiate: true,
            message: None,
            line: None,
        }
    }

    pub fn failed(message: impl Into<String>, line: Option<i64>) -> Self {
        Self {
            loaded: false,
            can_instantiate: false,
            message: Some(message.into()),
            line,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.loaded && self.can_instantiate
    }
}

/// Host primitive used by active validation.
///
/// `Err` means the host could not perform the check at all (the script is then skipped), not
/// that the script is broken.
#[async_trait]
pub trait ScriptLoader: Send + Sync {
    async fn reload_script(&self, res_path: &str, abs_path: &Path) -> Result<ScriptLoadReport>;
}

/// Parser-free validation used when no Godot executable is available.
///
/// Catches what the GDScript tokenizer rejects before anything else: unreadable or non-UTF-8
/// files, mixed tab/space indentation, and brackets left open at end of file.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticScriptLoader;

#[async_trait]
impl ScriptLoader for StaticScriptLoader {
    async fn reload_script(&self, _res_path: &str, abs_path: &Path) -> Result<ScriptLoadReport> {
        let bytes = tokio::fs::read(abs_path).await?;
        let Ok(source) = String::from_utf8(bytes) else {
            return Ok(ScriptLoadReport::failed(
                "Script is not valid UTF-8",
                None,
            ));
        };
        Ok(check_source(&source))
    }
}

pub(crate) fn check_source(source: &str) -> ScriptLoadReport {
    let mut depth: Vec<(char, i64)> = Vec::new();
    let mut in_multiline_string = false;
    for (idx, line) in source.lines().enumerate() {
        let line_no = i64::try_from(idx + 1).unwrap_or(i64::MAX);
        let triple_quotes = line.matches("\"\"\"").count();
        if in_multiline_string {
            if triple_quotes % 2 == 1 {
                in_multiline_string = false;
            }
            continue;
        }
        let line = if triple_quotes % 2 == 1 {
            in_multiline_string = true;
            line.split("\"\"\"").next().unwrap_or_default()
        } else {
            line
        };
        let indent: String = line
            .chars()
            .take_while(|c| *c == ' ' || *c == '\t')
            .collect();
        if indent.contains(' ') && indent.contains('\t') && depth.is_empty() {
            return ScriptLoadReport::failed(
                format!("Parse Error: Mixed use of tabs and spaces for indentation. (line {line_no})"),
                Some(line_no),
            );
        }

        let mut in_string: Option<char> = None;
        let mut escaped = false;
        for ch in line.chars() {
            if let Some(quote) = in_string {
                if escaped {
                    escaped = false;
                } else if ch == '\\' {
                    escaped = true;
                } else if ch == quote {
                    in_string = None;
                }
                continue;
            }
            match ch {
                '#' => break,
                '"' | '\'' => in_string = Some(ch),
                '(' | '[' | '{' => depth.push((ch, line_no)),
                ')' | ']' | '}' => {
                    let expected = match ch {
                        ')' => '(',
                        ']' => '[',
                        _ => '{',
                    };
                    match depth.pop() {
                        Some((open, _)) if open == expected => {}
                        _ => {
                            return ScriptLoadReport::failed(
                                format!("Parse Error: Unexpected \"{ch}\". (line {line_no})"),
                                Some(line_no),
                            )
                        }
                    }
                }
                _ => {}
            }
        }
    }

    if let Some((open, line_no)) = depth.last() {
        return ScriptLoadReport::failed(
            format!("Parse Error: \"{open}\" was never closed. (line {line_no})"),
            Some(*line_no),
        );
    }
    ScriptLoadReport::ok()
}
