//! KDL schema for `config.kdl`.

use crate::{Error, Result};
use kdl::KdlDocument;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Output format preference for CLI commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output (default)
    #[default]
    Human,
    /// JSON output, one document per command
    Json,
}

impl OutputFormat {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "human" => Some(OutputFormat::Human),
            _ => None,
        }
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Human => "human",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Value of the `action-log` node that turns the log off.
pub const ACTION_LOG_OFF: &str = "off";

/// User preferences stored in config.kdl.
///
/// # KDL Schema
///
/// ```kdl
/// rigs-base "~/git"
/// crew-base "~/crew"
/// control-mode #false
/// default-branch "main"
/// agent-command "claude"
/// output-format "human"
/// action-log "off"   // or a path
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RigConfig {
    pub rigs_base: Option<String>,
    pub crew_base: Option<String>,
    pub control_mode: Option<bool>,
    pub default_branch: Option<String>,
    pub agent_command: Option<String>,
    pub output_format: Option<OutputFormat>,
    pub action_log: Option<String>,
}

impl RigConfig {
    /// Create an empty config with no values set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a config file. A missing file yields an empty config.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let raw = fs::read_to_string(path)?;
        let doc: KdlDocument = raw
            .parse()
            .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))?;
        let config = Self::from_kdl(&doc);
        config
            .validate()
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Ok(config)
    }

    /// Validate the config values.
    ///
    /// Returns an error message if any value is invalid.
    pub fn validate(&self) -> std::result::Result<(), String> {
        for (key, value) in [
            ("rigs-base", &self.rigs_base),
            ("crew-base", &self.crew_base),
            ("default-branch", &self.default_branch),
            ("agent-command", &self.agent_command),
        ] {
            if let Some(value) = value {
                if value.trim().is_empty() {
                    return Err(format!("{} must not be empty", key));
                }
            }
        }
        Ok(())
    }

    /// Parse config from a KDL document.
    ///
    /// Unknown nodes and values of the wrong type are ignored.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        Self {
            rigs_base: string_node(doc, "rigs-base"),
            crew_base: string_node(doc, "crew-base"),
            control_mode: doc
                .get("control-mode")
                .and_then(|node| node.entries().first())
                .and_then(|entry| entry.value().as_bool()),
            default_branch: string_node(doc, "default-branch"),
            agent_command: string_node(doc, "agent-command"),
            output_format: string_node(doc, "output-format")
                .and_then(|s| OutputFormat::parse(&s)),
            action_log: string_node(doc, "action-log"),
        }
    }
}

fn string_node(doc: &KdlDocument, name: &str) -> Option<String> {
    doc.get(name)
        .and_then(|node| node.entries().first())
        .and_then(|entry| entry.value().as_string())
        .map(|s| s.to_string())
}
