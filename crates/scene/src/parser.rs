use crate::{Result, SceneError};
use std::collections::BTreeMap;

/// One `[header ...]` block of a Godot text resource with the `key = value` lines under it.
///
/// Lines that appear before the first header land in a section with an empty name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
    pub properties: BTreeMap<String, String>,
    /// 1-based line of the header (0 for the implicit leading section).
    pub line: usize,
}

impl Section {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// Splits Godot resource text (`.tscn`, `.tres`, `project.godot`) into sections.
///
/// Single pass, no backtracking. Values that open a bracket, brace, paren, or string and close
/// it on a later line are joined before being stored.
pub fn parse_sections(text: &str) -> Result<Vec<Section>> {
    let mut sections = Vec::new();
    let mut current = Section::default();
    let mut lines = text.lines().enumerate();

    while let Some((idx, raw)) = lines.next() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with(';') {
            continue;
        }

        if line.starts_with('[') {
            let (name, attributes) = parse_header(line, line_no)?;
            let finished = std::mem::replace(
                &mut current,
                Section {
                    name,
                    attributes,
                    properties: BTreeMap::new(),
                    line: line_no,
                },
            );
            if !finished.name.is_empty() || !finished.properties.is_empty() {
                sections.push(finished);
            }
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            log::debug!("Ignoring line {line_no} without '=': {line}");
            continue;
        };
        let key = key.trim().to_string();
        let mut value = value.trim().to_string();
        while !is_balanced(&value) {
            match lines.next() {
                Some((_, next)) => {
                    value.push('\n');
                    value.push_str(next);
                }
                None => {
                    return Err(SceneError::parse(
                        line_no,
                        format!("unterminated value for '{key}'"),
                    ))
                }
            }
        }
        current.properties.insert(key, unquote(value.trim()));
    }

    if !current.name.is_empty() || !current.properties.is_empty() {
        sections.push(current);
    }
    Ok(sections)
}

fn parse_header(line: &str, line_no: usize) -> Result<(String, BTreeMap<String, String>)> {
    let Some(inner) = line
        .strip_prefix('[')
        .and_then(|rest| rest.trim_end().strip_suffix(']'))
    else {
        return Err(SceneError::parse(line_no, "section header is missing ']'"));
    };
    let inner = inner.trim();
    let (name, rest) = match inner.find(char::is_whitespace) {
        Some(pos) => (&inner[..pos], &inner[pos..]),
        None => (inner, ""),
    };
    if name.is_empty() {
        return Err(SceneError::parse(line_no, "section header has no name"));
    }

    let mut attributes = BTreeMap::new();
    for token in split_attributes(rest) {
        match token.split_once('=') {
            Some((key, value)) => {
                attributes.insert(key.trim().to_string(), unquote(value.trim()));
            }
            None => {
                attributes.insert(token.trim().to_string(), String::new());
            }
        }
    }
    Ok((name.to_string(), attributes))
}

/// Splits `a=1 b="x y" c=ExtResource("1_k")` on whitespace outside quotes and brackets.
fn split_attributes(raw: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut token = String::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for ch in raw.chars() {
        if in_string {
            token.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => {
                in_string = true;
                token.push(ch);
            }
            '(' | '[' | '{' => {
                depth += 1;
                token.push(ch);
            }
            ')' | ']' | '}' => {
                depth = depth.saturating_sub(1);
                token.push(ch);
            }
            c if c.is_whitespace() && depth == 0 => {
                if !token.is_empty() {
                    out.push(std::mem::take(&mut token));
                }
            }
            c => token.push(c),
        }
    }
    if !token.is_empty() {
        out.push(token);
    }
    out
}

fn is_balanced(value: &str) -> bool {
    let mut depth = 0i64;
    let mut in_string = false;
    let mut escaped = false;
    for ch in value.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            _ => {}
        }
    }
    !in_string && depth <= 0
}

/// Strips one pair of surrounding double quotes and resolves `\"` / `\\` escapes.
pub fn unquote(value: &str) -> String {
    let Some(inner) = value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    else {
        return value.to_string();
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('"') => out.push('"'),
                Some('\\') => out.push('\\'),
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(ch);
        }
    }
    out
}
