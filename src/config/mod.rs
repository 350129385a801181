//! Configuration for rig.
//!
//! ## config.kdl - User preferences
//!
//! Located at `~/.config/rig/config.kdl` (override with `RIG_CONFIG`).
//!
//! Contains:
//! - `rigs-base` - Directory holding repositories
//! - `crew-base` - Directory holding worker worktrees
//! - `control-mode` - Use iTerm2 tmux integration
//! - `default-branch` - Base branch fallback
//! - `agent-command` - Program started in each session
//! - `output-format` - "json" or "human"
//! - `action-log` - "off" or a path
//!
//! ## Precedence
//!
//! CLI flag > environment > config.kdl > defaults
//!
//! Use the [`resolver`] module for precedence resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{
    ConfigOverrides, Resolved, ResolvedSettings, Settings, ValueSource, expand_home,
    resolve_settings,
};
pub use schema::{OutputFormat, RigConfig};
