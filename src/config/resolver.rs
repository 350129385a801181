//! Precedence resolution for rig settings.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flags (passed at runtime)
//! 2. Environment variables (`RIGS_BASE`, `CREW_BASE`, ...)
//! 3. `config.kdl` (`~/.config/rig/config.kdl`, or `RIG_CONFIG`)
//! 4. Built-in defaults
//!
//! Empty environment variables count as unset.

use crate::Result;
use crate::commands::{CommandResult, json};
use crate::config::schema::{ACTION_LOG_OFF, OutputFormat, RigConfig};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const RIGS_BASE_ENV: &str = "RIGS_BASE";
pub const CREW_BASE_ENV: &str = "CREW_BASE";
pub const USE_CC_ENV: &str = "RIG_USE_CC";
pub const DEFAULT_BRANCH_ENV: &str = "RIG_DEFAULT_BRANCH";
pub const AGENT_ENV: &str = "RIG_AGENT";
pub const ACTION_LOG_ENV: &str = "RIG_ACTION_LOG";
pub const CONFIG_PATH_ENV: &str = "RIG_CONFIG";

const DEFAULT_BRANCH: &str = "main";
const DEFAULT_AGENT: &str = "claude";

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from environment variable
    EnvVar(String),
    /// Value from config.kdl
    ConfigFile,
    /// Value from CLI flag
    CliFlag,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::ConfigFile => write!(f, "config"),
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone)]
pub struct Resolved<T> {
    /// The resolved value
    pub value: T,
    /// Where the value came from
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    /// Create a new resolved value.
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Values that can be set from the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub output_format: Option<OutputFormat>,
}

/// Immutable settings for one invocation.
///
/// Resolved once in `main` and passed explicitly to every operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    /// Where repositories live (`<repos_root>/<repo>`)
    pub repos_root: PathBuf,
    /// Where worker worktrees live (`<workers_root>/<repo>/<worker>`)
    pub workers_root: PathBuf,
    /// Use iTerm2 tmux integration (`tmux -CC`)
    pub control_mode: bool,
    /// Branch tried after the remote default when looking for a base branch
    pub default_branch: String,
    /// Program started in the agent window of every session
    pub agent_command: String,
    pub output_format: OutputFormat,
    /// Action log location, `None` when logging is off
    pub action_log: Option<PathBuf>,
}

impl Settings {
    /// Settings with the given roots and built-in defaults for everything else.
    pub fn new(repos_root: impl Into<PathBuf>, workers_root: impl Into<PathBuf>) -> Self {
        Self {
            repos_root: repos_root.into(),
            workers_root: workers_root.into(),
            control_mode: false,
            default_branch: DEFAULT_BRANCH.to_string(),
            agent_command: DEFAULT_AGENT.to_string(),
            output_format: OutputFormat::Human,
            action_log: None,
        }
    }

    /// Resolve settings from the process environment and config file.
    pub fn load(overrides: &ConfigOverrides) -> Result<ResolvedSettings> {
        let env = |name: &str| std::env::var(name).ok();
        let path = config_file_path(&env);
        let file = match &path {
            Some(path) => RigConfig::load(path)?,
            None => RigConfig::new(),
        };
        Ok(resolve_settings(overrides, &env, &file, path))
    }

    /// `true` when output should be JSON.
    pub fn is_json(&self) -> bool {
        self.output_format == OutputFormat::Json
    }
}

/// Fully resolved settings with source tracking.
#[derive(Debug, Clone)]
pub struct ResolvedSettings {
    pub repos_root: Resolved<PathBuf>,
    pub workers_root: Resolved<PathBuf>,
    pub control_mode: Resolved<bool>,
    pub default_branch: Resolved<String>,
    pub agent_command: Resolved<String>,
    pub output_format: Resolved<OutputFormat>,
    pub action_log: Resolved<Option<PathBuf>>,
    /// The config file consulted, if any
    pub config_file: Option<PathBuf>,
}

impl ResolvedSettings {
    /// Drop source tracking.
    pub fn settings(&self) -> Settings {
        Settings {
            repos_root: self.repos_root.value.clone(),
            workers_root: self.workers_root.value.clone(),
            control_mode: self.control_mode.value,
            default_branch: self.default_branch.value.clone(),
            agent_command: self.agent_command.value.clone(),
            output_format: self.output_format.value,
            action_log: self.action_log.value.clone(),
        }
    }
}

/// Location of config.kdl: `RIG_CONFIG`, else `<config_dir>/rig/config.kdl`.
pub fn config_file_path(env: &dyn Fn(&str) -> Option<String>) -> Option<PathBuf> {
    match non_empty(env, CONFIG_PATH_ENV) {
        Some(path) => Some(expand_home(&path)),
        None => dirs::config_dir().map(|dir| dir.join("rig").join("config.kdl")),
    }
}

/// Default action log location: `<data_dir>/rig/action.log`.
pub fn default_action_log_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("rig").join("action.log"))
}

/// Resolve every setting from its sources.
///
/// `env` looks up an environment variable; passing a closure keeps this
/// function free of process-wide state.
pub fn resolve_settings(
    overrides: &ConfigOverrides,
    env: &dyn Fn(&str) -> Option<String>,
    file: &RigConfig,
    config_file: Option<PathBuf>,
) -> ResolvedSettings {
    let repos_root = resolve_path(env, RIGS_BASE_ENV, file.rigs_base.as_deref(), "git");
    let workers_root = resolve_path(env, CREW_BASE_ENV, file.crew_base.as_deref(), "crew");

    let control_mode = match non_empty(env, USE_CC_ENV) {
        Some(value) => Resolved::new(value == "true", ValueSource::EnvVar(USE_CC_ENV.into())),
        None => match file.control_mode {
            Some(value) => Resolved::new(value, ValueSource::ConfigFile),
            None => Resolved::new(false, ValueSource::Default),
        },
    };

    let default_branch = resolve_string(
        env,
        DEFAULT_BRANCH_ENV,
        file.default_branch.as_deref(),
        DEFAULT_BRANCH,
    );
    let agent_command = resolve_string(env, AGENT_ENV, file.agent_command.as_deref(), DEFAULT_AGENT);

    let output_format = if let Some(format) = overrides.output_format {
        Resolved::new(format, ValueSource::CliFlag)
    } else if let Some(format) = file.output_format {
        Resolved::new(format, ValueSource::ConfigFile)
    } else {
        Resolved::new(OutputFormat::Human, ValueSource::Default)
    };

    let action_log = match non_empty(env, ACTION_LOG_ENV) {
        Some(value) => Resolved::new(
            action_log_value(&value),
            ValueSource::EnvVar(ACTION_LOG_ENV.into()),
        ),
        None => match &file.action_log {
            Some(value) => Resolved::new(action_log_value(value), ValueSource::ConfigFile),
            None => Resolved::new(default_action_log_path(), ValueSource::Default),
        },
    };

    ResolvedSettings {
        repos_root,
        workers_root,
        control_mode,
        default_branch,
        agent_command,
        output_format,
        action_log,
        config_file,
    }
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    let home = dirs::home_dir();
    match (path, home) {
        ("~", Some(home)) => home,
        (p, Some(home)) if p.starts_with("~/") => home.join(&p[2..]),
        (p, _) => PathBuf::from(p),
    }
}

fn action_log_value(value: &str) -> Option<PathBuf> {
    if value.eq_ignore_ascii_case(ACTION_LOG_OFF) {
        None
    } else {
        Some(expand_home(value))
    }
}

fn non_empty(env: &dyn Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    env(name).filter(|value| !value.trim().is_empty())
}

fn resolve_path(
    env: &dyn Fn(&str) -> Option<String>,
    var: &str,
    file_value: Option<&str>,
    home_subdir: &str,
) -> Resolved<PathBuf> {
    if let Some(value) = non_empty(env, var) {
        return Resolved::new(expand_home(&value), ValueSource::EnvVar(var.into()));
    }
    if let Some(value) = file_value {
        return Resolved::new(expand_home(value), ValueSource::ConfigFile);
    }
    let home = dirs::home_dir().unwrap_or_else(|| Path::new(".").to_path_buf());
    Resolved::new(home.join(home_subdir), ValueSource::Default)
}

fn resolve_string(
    env: &dyn Fn(&str) -> Option<String>,
    var: &str,
    file_value: Option<&str>,
    default: &str,
) -> Resolved<String> {
    if let Some(value) = non_empty(env, var) {
        return Resolved::new(value, ValueSource::EnvVar(var.into()));
    }
    match file_value {
        Some(value) => Resolved::new(value.to_string(), ValueSource::ConfigFile),
        None => Resolved::new(default.to_string(), ValueSource::Default),
    }
}

impl ResolvedSettings {
    fn rows(&self) -> Vec<(&'static str, String, &ValueSource)> {
        let path = |p: &Path| p.display().to_string();
        vec![
            ("rigs-base", path(&self.repos_root.value), &self.repos_root.source),
            ("crew-base", path(&self.workers_root.value), &self.workers_root.source),
            (
                "control-mode",
                self.control_mode.value.to_string(),
                &self.control_mode.source,
            ),
            (
                "default-branch",
                self.default_branch.value.clone(),
                &self.default_branch.source,
            ),
            (
                "agent-command",
                self.agent_command.value.clone(),
                &self.agent_command.source,
            ),
            (
                "output-format",
                self.output_format.value.to_string(),
                &self.output_format.source,
            ),
            (
                "action-log",
                self.action_log
                    .value
                    .as_deref()
                    .map(path)
                    .unwrap_or_else(|| ACTION_LOG_OFF.to_string()),
                &self.action_log.source,
            ),
        ]
    }
}

impl CommandResult for ResolvedSettings {
    fn to_json(&self) -> String {
        let mut values = serde_json::Map::new();
        for (key, value, source) in self.rows() {
            values.insert(
                key.to_string(),
                serde_json::json!({ "value": value, "source": source.to_string() }),
            );
        }
        let config_file = self.config_file.as_ref().map(|p| p.display().to_string());
        json(&serde_json::json!({ "config_file": config_file, "settings": values }))
    }

    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        match &self.config_file {
            Some(file) if file.exists() => lines.push(format!("Config file: {}", file.display())),
            Some(file) => lines.push(format!("Config file: {} (not found)", file.display())),
            None => lines.push("Config file: none".to_string()),
        }
        lines.push(String::new());
        for (key, value, source) in self.rows() {
            lines.push(format!("  {:<16} {} ({})", key, value, source));
        }
        lines.join("\n")
    }
}
