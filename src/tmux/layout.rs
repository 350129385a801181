//! Session layouts.
//!
//! Repository and worker sessions share one builder. A layout is an ordered
//! list of tmux commands; steps marked `required` abort session creation on
//! failure, the rest are cosmetic.

use super::command::{Size, Split, TmuxCommand};
use crate::naming::normalize_session_name;
use crate::polecat::is_polecat;
use std::path::PathBuf;

/// Window running the agent (native mode).
pub const AGENT_WINDOW: &str = "agent";
/// Window with a plain shell (native mode).
pub const TERMINAL_WINDOW: &str = "terminal";

const AGENT_PANE: &str = "{left}";
const TERMINAL_PANE: &str = "{right}";
const AGENT_PANE_WIDTH: u8 = 70;

/// What a session is for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionKind {
    Repository {
        repo: String,
    },
    Worker {
        repo: String,
        worker: String,
        branch: String,
    },
}

/// Everything needed to create a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSpec {
    pub name: String,
    pub dir: PathBuf,
    pub kind: SessionKind,
    /// Program started in the agent window or pane.
    pub agent_command: String,
}

impl SessionSpec {
    pub fn repository(name: &str, repo: &str, dir: PathBuf, agent_command: &str) -> Self {
        Self {
            name: name.to_string(),
            dir,
            kind: SessionKind::Repository {
                repo: repo.to_string(),
            },
            agent_command: agent_command.to_string(),
        }
    }

    pub fn worker(
        name: &str,
        repo: &str,
        worker: &str,
        branch: &str,
        dir: PathBuf,
        agent_command: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            dir,
            kind: SessionKind::Worker {
                repo: repo.to_string(),
                worker: worker.to_string(),
                branch: branch.to_string(),
            },
            agent_command: agent_command.to_string(),
        }
    }

    /// First line printed in the terminal window.
    pub fn header(&self) -> String {
        match &self.kind {
            SessionKind::Repository { repo } => format!("# {} terminal", repo),
            SessionKind::Worker {
                repo,
                worker,
                branch,
            } => format!("# {} on {} (branch: {})", worker, repo, branch),
        }
    }

    /// Window title in control mode.
    pub fn window_title(&self) -> String {
        let name = normalize_session_name(&self.name);
        match &self.kind {
            SessionKind::Repository { .. } => format!("🏗️  {}", name),
            SessionKind::Worker { worker, .. } if is_polecat(worker) => format!("🐱 {}", name),
            SessionKind::Worker { .. } => format!("👤 {}", name),
        }
    }
}

/// One tmux command in a layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutStep {
    pub command: TmuxCommand,
    pub required: bool,
}

impl LayoutStep {
    fn required(command: TmuxCommand) -> Self {
        Self {
            command,
            required: true,
        }
    }

    fn cosmetic(command: TmuxCommand) -> Self {
        Self {
            command,
            required: false,
        }
    }
}

/// The pane or window that receives the agent's keystrokes.
pub fn agent_target(session: &str, control_mode: bool) -> String {
    let session = normalize_session_name(session);
    if control_mode {
        format!("{}:.{}", session, AGENT_PANE)
    } else {
        format!("{}:{}", session, AGENT_WINDOW)
    }
}

fn terminal_target(session: &str, control_mode: bool) -> String {
    if control_mode {
        format!("{}:.{}", session, TERMINAL_PANE)
    } else {
        format!("{}:{}", session, TERMINAL_WINDOW)
    }
}

/// Commands that create the session described by `spec`.
pub fn build_layout(spec: &SessionSpec, control_mode: bool) -> Vec<LayoutStep> {
    let name = normalize_session_name(&spec.name);
    let dir = spec.dir.to_string_lossy().to_string();
    let agent = agent_target(&name, control_mode);
    let terminal = terminal_target(&name, control_mode);
    let mut steps = Vec::new();

    if control_mode {
        steps.push(LayoutStep::required(TmuxCommand::new_session(
            &name,
            &spec.window_title(),
            &dir,
        )));
        steps.push(LayoutStep::cosmetic(TmuxCommand::set_window_option(
            &name,
            "automatic-rename",
            "off",
        )));
        steps.push(LayoutStep::required(TmuxCommand::split_window(
            &name,
            Split::Horizontal,
            &dir,
        )));
        steps.push(LayoutStep::cosmetic(TmuxCommand::select_pane(
            &agent,
            Some(AGENT_WINDOW),
        )));
        steps.push(LayoutStep::cosmetic(TmuxCommand::select_pane(
            &terminal,
            Some(TERMINAL_WINDOW),
        )));
        steps.push(LayoutStep::cosmetic(TmuxCommand::resize_pane(
            &agent,
            Size::Percentage(AGENT_PANE_WIDTH),
        )));
    } else {
        steps.push(LayoutStep::required(TmuxCommand::new_session(
            &name,
            AGENT_WINDOW,
            &dir,
        )));
        steps.push(LayoutStep::required(TmuxCommand::new_window(
            TERMINAL_WINDOW,
            &name,
            &dir,
        )));
    }

    steps.push(LayoutStep::cosmetic(TmuxCommand::send_line(
        &agent,
        &spec.agent_command,
    )));
    steps.push(LayoutStep::cosmetic(TmuxCommand::send_line(
        &terminal,
        &format!("echo '{}'", spec.header()),
    )));
    steps.push(LayoutStep::cosmetic(TmuxCommand::send_line(
        &terminal,
        "git status",
    )));

    if control_mode {
        steps.push(LayoutStep::cosmetic(TmuxCommand::select_pane(&agent, None)));
    } else {
        steps.push(LayoutStep::cosmetic(TmuxCommand::select_window(&agent)));
    }

    steps
}
