//! Workspace configuration (.trellis.toml)

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = ".trellis.toml";

/// Tunables for resolution and watching. Every field has a default, so a
/// missing or partial config file is fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Extension trial list for extensionless imports, in order.
    pub extensions: Vec<String>,
    /// Resolver backends, in trial order.
    pub resolvers: Vec<String>,
    /// Glob patterns the watcher reacts to.
    pub watch: Vec<String>,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        WorkspaceConfig {
            extensions: vec![".fsm".to_string()],
            resolvers: vec!["filesystem".to_string(), "url".to_string()],
            watch: vec!["**/*.fsm".to_string()],
        }
    }
}

impl WorkspaceConfig {
    /// Load `.trellis.toml` from the workspace root, falling back to
    /// defaults when the file is absent.
    pub fn load(root: &Path) -> anyhow::Result<Self> {
        let path = root.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        let config: WorkspaceConfig = toml::from_str(&raw)
            .with_context(|| format!("invalid config in {}", path.display()))?;
        tracing::debug!("loaded workspace config from {}", path.display());
        Ok(config)
    }
}
