//! Checkpoint reader
//!
//! Reads the engine's persisted checkpoint for a stack from the backend
//! store named by `PULUMI_BACKEND_URL` and renders the deployed resource
//! graph as an indented tree. Read-only: the checkpoint format is owned
//! by the engine.

use crate::error::{EngineError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const BACKEND_URL_ENV: &str = "PULUMI_BACKEND_URL";

const SUPPORTED_VERSION: u64 = 3;

#[derive(Debug, Deserialize)]
pub struct CheckpointFile {
    pub version: u64,
    pub checkpoint: Checkpoint,
}

#[derive(Debug, Deserialize)]
pub struct Checkpoint {
    #[serde(default)]
    pub stack: String,
    #[serde(default)]
    pub latest: Option<Deployment>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Deployment {
    #[serde(default)]
    pub resources: Vec<Resource>,
}

/// One deployed resource as recorded in the checkpoint. Only the fields
/// needed for the tree rendering are modeled.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Resource {
    #[serde(default)]
    pub urn: String,
    #[serde(rename = "type", default)]
    pub resource_type: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub parent: String,
    #[serde(default)]
    pub outputs: serde_json::Map<String, serde_json::Value>,
}

impl Resource {
    /// Last segment of the URN, used as the node name in the tree.
    pub fn urn_name(&self) -> &str {
        self.urn.rsplit("::").next().unwrap_or(&self.urn)
    }

    fn parent_name(&self) -> &str {
        if self.parent.is_empty() {
            "root"
        } else {
            self.parent.rsplit("::").next().unwrap_or(&self.parent)
        }
    }

    /// Provider-side instance name, when the resource surfaces one.
    pub fn instance_name(&self) -> Option<&str> {
        self.outputs.get("name").and_then(|v| v.as_str())
    }
}

/// Resolves the checkpoint file path for `stack_name` under the backend
/// store. Only file backends are supported for display.
pub fn checkpoint_path(stack_name: &str) -> Result<PathBuf> {
    let backend = std::env::var(BACKEND_URL_ENV).map_err(|_| EngineError::BackendUrlNotSet)?;
    if backend.is_empty() {
        return Err(EngineError::BackendUrlNotSet);
    }
    let root = backend.strip_prefix("file://").unwrap_or(&backend);
    Ok(PathBuf::from(root)
        .join(".pulumi")
        .join("stacks")
        .join(format!("{stack_name}.json")))
}

/// Reads and parses the latest checkpoint for `stack_name`.
pub fn read_checkpoint(stack_name: &str) -> Result<CheckpointFile> {
    let path = checkpoint_path(stack_name)?;
    let text = std::fs::read_to_string(&path)?;
    let file: CheckpointFile = serde_json::from_str(&text)?;
    if file.version != SUPPORTED_VERSION {
        return Err(EngineError::UnsupportedCheckpoint(file.version));
    }
    Ok(file)
}

/// Groups resources by parent URN name; parentless resources go under
/// `"root"`.
fn group_by_parent(resources: &[Resource]) -> BTreeMap<&str, Vec<&Resource>> {
    let mut nodes: BTreeMap<&str, Vec<&Resource>> = BTreeMap::new();
    for r in resources {
        nodes.entry(r.parent_name()).or_default().push(r);
    }
    nodes
}

/// Renders the resource graph as indented lines, depth-first from the
/// root.
pub fn render_tree(resources: &[Resource]) -> Vec<String> {
    let nodes = group_by_parent(resources);
    let mut lines = Vec::new();
    render_children(&nodes, "root", 0, &mut lines);
    lines
}

fn render_children(
    nodes: &BTreeMap<&str, Vec<&Resource>>,
    parent: &str,
    depth: usize,
    lines: &mut Vec<String>,
) {
    let Some(children) = nodes.get(parent) else {
        return;
    };
    for r in children {
        let indent = "\t".repeat(depth);
        let instance = r.instance_name().unwrap_or("");
        lines.push(format!(
            "{indent}{}[{}]: {} {}",
            r.urn_name(),
            r.resource_type,
            instance,
            r.id
        ));
        render_children(nodes, r.urn_name(), depth + 1, lines);
    }
}

/// Logs the deployed resource tree for `stack_name` at debug level.
pub fn log_resource_tree(stack_name: &str) -> Result<()> {
    let file = read_checkpoint(stack_name)?;
    let Some(latest) = file.checkpoint.latest else {
        tracing::debug!(stack = stack_name, "checkpoint has no deployment yet");
        return Ok(());
    };
    tracing::debug!(stack = stack_name, "stack resources:");
    for line in render_tree(&latest.resources) {
        tracing::debug!("\t{line}");
    }
    Ok(())
}
