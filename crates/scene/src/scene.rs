use crate::parser::{parse_sections, Section};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// `[ext_resource ...]` or `[sub_resource ...]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneResource {
    pub id: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneNode {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneConnection {
    pub signal: String,
    pub from: String,
    pub to: String,
    pub method: String,
}

/// Structural view of a `.tscn` file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneDocument {
    pub format: Option<u32>,
    pub load_steps: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    pub ext_resources: Vec<SceneResource>,
    pub sub_resources: Vec<SceneResource>,
    pub nodes: Vec<SceneNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub connections: Vec<SceneConnection>,
}

impl SceneDocument {
    pub fn parse(text: &str) -> Result<Self> {
        let mut doc = Self::default();
        for section in parse_sections(text)? {
            match section.name.as_str() {
                "gd_scene" | "gd_resource" => {
                    doc.format = section.attr("format").and_then(|v| v.parse().ok());
                    doc.load_steps = section.attr("load_steps").and_then(|v| v.parse().ok());
                    doc.uid = section.attr("uid").map(str::to_string);
                }
                "ext_resource" => doc.ext_resources.push(resource_from(section)),
                "sub_resource" => doc.sub_resources.push(resource_from(section)),
                "node" => doc.nodes.push(node_from(section)),
                "connection" => doc.connections.push(SceneConnection {
                    signal: section.attr("signal").unwrap_or_default().to_string(),
                    from: section.attr("from").unwrap_or_default().to_string(),
                    to: section.attr("to").unwrap_or_default().to_string(),
                    method: section.attr("method").unwrap_or_default().to_string(),
                }),
                other => log::debug!("Ignoring scene section [{other}]"),
            }
        }
        Ok(doc)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn root(&self) -> Option<&SceneNode> {
        self.nodes.iter().find(|node| node.parent.is_none())
    }

    /// Node paths rooted at the scene root, e.g. `Main`, `Main/Player`, `Main/Player/Sprite`.
    pub fn node_tree(&self) -> Vec<String> {
        let root_name = self.root().map(|n| n.name.as_str()).unwrap_or_default();
        self.nodes
            .iter()
            .map(|node| match node.parent.as_deref() {
                None => node.name.clone(),
                Some(".") => format!("{root_name}/{}", node.name),
                Some(parent) => format!("{root_name}/{parent}/{}", node.name),
            })
            .collect()
    }
}

fn resource_from(section: Section) -> SceneResource {
    SceneResource {
        id: section.attr("id").unwrap_or_default().to_string(),
        resource_type: section.attr("type").unwrap_or_default().to_string(),
        path: section.attr("path").map(str::to_string),
        uid: section.attr("uid").map(str::to_string),
        properties: section.properties,
    }
}

fn node_from(section: Section) -> SceneNode {
    SceneNode {
        name: section.attr("name").unwrap_or_default().to_string(),
        node_type: section.attr("type").map(str::to_string),
        parent: section.attr("parent").map(str::to_string),
        instance: section.attr("instance").map(str::to_string),
        properties: section.properties,
    }
}
