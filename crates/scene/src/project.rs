use crate::parser::parse_sections;
use crate::Result;
use std::collections::BTreeMap;
use std::path::Path;

/// Parsed `project.godot`: `section -> key -> value`, quotes stripped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectSettings {
    sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl ProjectSettings {
    pub fn parse(text: &str) -> Result<Self> {
        let mut sections: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        for section in parse_sections(text)? {
            sections
                .entry(section.name)
                .or_default()
                .extend(section.properties);
        }
        Ok(Self { sections })
    }

    /// Reads `<root>/project.godot`; `Ok(None)` when the file does not exist.
    pub fn load(root: &Path) -> Result<Option<Self>> {
        let path = root.join("project.godot");
        match std::fs::read_to_string(&path) {
            Ok(text) => Self::parse(&text).map(Some),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|props| props.get(key))
            .map(String::as_str)
    }

    pub fn project_name(&self) -> Option<&str> {
        self.get("application", "config/name")
            .filter(|name| !name.trim().is_empty())
    }

    /// `res://...` or `uid://...` exactly as configured.
    pub fn main_scene(&self) -> Option<&str> {
        self.get("application", "run/main_scene")
            .filter(|scene| !scene.trim().is_empty())
    }
}
