//! Tmux command generation.
//!
//! This module provides a builder for tmux command lines. It does not
//! execute commands; [`super::TmuxClient`] runs what it builds.

/// Split orientation for panes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    /// Side by side (`-h`)
    Horizontal,
    /// Stacked (`-v`)
    Vertical,
}

/// Size specification for panes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Size {
    Percentage(u8),
    Lines(u16),
}

impl Size {
    fn as_arg(&self) -> String {
        match self {
            Size::Percentage(p) => format!("{}%", p),
            Size::Lines(l) => l.to_string(),
        }
    }
}

/// Builder for tmux command lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TmuxCommand {
    args: Vec<String>,
}

impl TmuxCommand {
    fn new(command: &str) -> Self {
        Self {
            args: vec!["tmux".to_string(), command.to_string()],
        }
    }

    fn flag(mut self, flag: &str) -> Self {
        self.args.push(flag.to_string());
        self
    }

    fn flag_with_value(mut self, flag: &str, value: &str) -> Self {
        self.args.push(flag.to_string());
        self.args.push(value.to_string());
        self
    }

    fn arg(mut self, arg: &str) -> Self {
        self.args.push(arg.to_string());
        self
    }

    /// Build the command as one display string.
    pub fn build(self) -> String {
        self.args.join(" ")
    }

    /// Create a detached session whose first window is named `window_name`.
    ///
    /// # Example
    /// ```
    /// use rig::tmux::command::TmuxCommand;
    /// let cmd = TmuxCommand::new_session("app@tracy", "agent", "/crew/app/tracy");
    /// assert_eq!(cmd.build(), "tmux new-session -d -s app@tracy -n agent -c /crew/app/tracy");
    /// ```
    pub fn new_session(session_name: &str, window_name: &str, start_directory: &str) -> Self {
        Self::new("new-session")
            .flag("-d")
            .flag_with_value("-s", session_name)
            .flag_with_value("-n", window_name)
            .flag_with_value("-c", start_directory)
    }

    /// Add a window to a session.
    pub fn new_window(window_name: &str, target_session: &str, start_directory: &str) -> Self {
        Self::new("new-window")
            .flag_with_value("-t", target_session)
            .flag_with_value("-n", window_name)
            .flag_with_value("-c", start_directory)
    }

    /// Split a window pane.
    ///
    /// # Example
    /// ```
    /// use rig::tmux::command::{Split, TmuxCommand};
    /// let cmd = TmuxCommand::split_window("app", Split::Horizontal, "/git/app");
    /// assert_eq!(cmd.build(), "tmux split-window -h -t app -c /git/app");
    /// ```
    pub fn split_window(target: &str, split: Split, start_directory: &str) -> Self {
        let cmd = Self::new("split-window");
        let cmd = match split {
            Split::Horizontal => cmd.flag("-h"),
            Split::Vertical => cmd.flag("-v"),
        };
        cmd.flag_with_value("-t", target)
            .flag_with_value("-c", start_directory)
    }

    /// Send keys to a pane.
    ///
    /// Without `literal`, tmux interprets key names such as `C-m`.
    pub fn send_keys(target: &str, keys: &str, literal: bool) -> Self {
        let mut cmd = Self::new("send-keys").flag_with_value("-t", target);
        if literal {
            cmd = cmd.flag("-l");
        }
        cmd.arg(keys)
    }

    /// Type a line into a pane and press Enter.
    pub fn send_line(target: &str, line: &str) -> Self {
        Self::send_keys(target, line, false).arg("C-m")
    }

    /// Set a window option.
    pub fn set_window_option(target: &str, option: &str, value: &str) -> Self {
        Self::new("set-window-option")
            .flag_with_value("-t", target)
            .arg(option)
            .arg(value)
    }

    pub fn select_window(target: &str) -> Self {
        Self::new("select-window").flag_with_value("-t", target)
    }

    /// Select a pane, optionally setting its title.
    pub fn select_pane(target: &str, title: Option<&str>) -> Self {
        let cmd = Self::new("select-pane").flag_with_value("-t", target);
        match title {
            Some(title) => cmd.flag_with_value("-T", title),
            None => cmd,
        }
    }

    /// Resize a pane to the given width.
    pub fn resize_pane(target: &str, width: Size) -> Self {
        Self::new("resize-pane")
            .flag_with_value("-t", target)
            .flag_with_value("-x", &width.as_arg())
    }

    pub fn has_session(session_name: &str) -> Self {
        Self::new("has-session").flag_with_value("-t", session_name)
    }

    pub fn kill_session(session_name: &str) -> Self {
        Self::new("kill-session").flag_with_value("-t", session_name)
    }

    pub fn list_sessions(format: &str) -> Self {
        Self::new("list-sessions").flag_with_value("-F", format)
    }

    /// Print a format string for the current client.
    pub fn display_message(format: &str) -> Self {
        Self::new("display-message").flag("-p").arg(format)
    }

    /// Attach to a session (or the most recent one when `session_name` is
    /// `None`). `control_mode` adds iTerm2's `-CC`.
    ///
    /// # Example
    /// ```
    /// use rig::tmux::command::TmuxCommand;
    /// let cmd = TmuxCommand::attach_session(Some("app"), true);
    /// assert_eq!(cmd.build(), "tmux -CC attach-session -t app");
    /// ```
    pub fn attach_session(session_name: Option<&str>, control_mode: bool) -> Self {
        let mut cmd = Self::new("attach-session");
        if control_mode {
            cmd.args.insert(1, "-CC".to_string());
        }
        match session_name {
            Some(name) => cmd.flag_with_value("-t", name),
            None => cmd,
        }
    }

    /// Move the current client to another session.
    pub fn switch_client(session_name: &str) -> Self {
        Self::new("switch-client").flag_with_value("-t", session_name)
    }

    /// The arguments, starting with `tmux`.
    pub fn args(&self) -> &[String] {
        &self.args
    }
}
