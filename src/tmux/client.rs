//! Runs tmux commands against the local server.

use super::command::TmuxCommand;
use super::layout::{SessionSpec, agent_target, build_layout};
use super::SessionBackend;
use crate::naming::normalize_session_name;
use crate::{Error, Result};
use std::io::ErrorKind;
use std::process::{Command, Output};

/// Environment variable tmux sets inside its sessions.
pub const TMUX_ENV: &str = "TMUX";

/// [`SessionBackend`] backed by the `tmux` binary.
#[derive(Debug, Clone)]
pub struct TmuxClient {
    control_mode: bool,
    inside_tmux: bool,
}

impl TmuxClient {
    pub fn new(control_mode: bool, inside_tmux: bool) -> Self {
        Self {
            control_mode,
            inside_tmux,
        }
    }

    /// Read `TMUX` once to learn whether rig runs inside a session.
    pub fn from_env(control_mode: bool) -> Self {
        let inside = std::env::var(TMUX_ENV)
            .map(|v| !v.is_empty())
            .unwrap_or(false);
        Self::new(control_mode, inside)
    }

    fn output(&self, command: &TmuxCommand) -> Result<Output> {
        let args = &command.args()[1..];
        tracing::debug!(?args, "tmux");
        Command::new("tmux").args(args).output().map_err(spawn_error)
    }

    fn run(&self, command: &TmuxCommand) -> Result<String> {
        let output = self.output(command)?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            Err(Error::Tmux(format!(
                "{}: {}",
                command.clone().build(),
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }

    /// Run with the terminal attached (attach and switch-client).
    fn run_interactive(&self, command: &TmuxCommand) -> Result<()> {
        let args = &command.args()[1..];
        tracing::debug!(?args, "tmux (interactive)");
        let status = Command::new("tmux")
            .args(args)
            .status()
            .map_err(spawn_error)?;
        if status.success() {
            Ok(())
        } else {
            Err(Error::Tmux(format!("{} exited with {}", command.clone().build(), status)))
        }
    }
}

fn spawn_error(e: std::io::Error) -> Error {
    if e.kind() == ErrorKind::NotFound {
        Error::Tmux("tmux binary not found in PATH. Please install tmux.".to_string())
    } else {
        Error::Tmux(format!("failed to run tmux: {}", e))
    }
}

/// Targets starting with `=` match a session name exactly instead of by prefix.
fn exact(name: &str) -> String {
    format!("={}", normalize_session_name(name))
}

impl SessionBackend for TmuxClient {
    fn exists(&self, name: &str) -> bool {
        self.output(&TmuxCommand::has_session(&exact(name)))
            .map(|out| out.status.success())
            .unwrap_or(false)
    }

    fn list(&self) -> Vec<String> {
        // list-sessions fails when no server is running
        self.run(&TmuxCommand::list_sessions("#{session_name}"))
            .map(|out| {
                out.lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn create(&self, spec: &SessionSpec) -> Result<()> {
        let mut started = false;
        for step in build_layout(spec, self.control_mode) {
            match self.run(&step.command) {
                Ok(_) => started = true,
                Err(e) if step.required => {
                    // never kill a session that was already there
                    if started {
                        let _ = self.kill(&spec.name);
                    }
                    return Err(Error::SessionCreationFailed(e.to_string()));
                }
                Err(e) => tracing::debug!(error = %e, "ignoring cosmetic layout step"),
            }
        }
        tracing::info!(session = %spec.name, "created session");
        Ok(())
    }

    fn kill(&self, name: &str) -> Result<()> {
        self.run(&TmuxCommand::kill_session(&exact(name)))
            .map(|_| ())
    }

    fn attach(&self, name: &str) -> Result<()> {
        let target = exact(name);
        if self.inside_tmux {
            self.run_interactive(&TmuxCommand::switch_client(&target))
        } else {
            self.run_interactive(&TmuxCommand::attach_session(Some(&target), self.control_mode))
        }
    }

    fn attach_default(&self) -> Result<()> {
        if self.inside_tmux {
            return Err(Error::Tmux("already in a tmux session".to_string()));
        }
        self.run_interactive(&TmuxCommand::attach_session(None, self.control_mode))
    }

    fn current_session_name(&self) -> Option<String> {
        if !self.inside_tmux {
            return None;
        }
        self.run(&TmuxCommand::display_message("#S"))
            .ok()
            .map(|out| out.trim().to_string())
            .filter(|name| !name.is_empty())
    }

    fn send_keys(&self, target: &str, keys: &str) {
        if let Err(e) = self.run(&TmuxCommand::send_keys(target, keys, false)) {
            tracing::warn!(pane = target, error = %e, "send-keys failed");
        }
    }

    fn agent_target(&self, session: &str) -> String {
        agent_target(session, self.control_mode)
    }
}
