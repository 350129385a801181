//! CLI argument definitions for rig.

use clap::{Parser, Subcommand};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("RIG_GIT_COMMIT"),
    " ",
    env!("RIG_BUILD_TIMESTAMP"),
    ")"
);

/// Rig - Manage tmux-based development environments.
///
/// Examples:
///     rig up myapp            Start rig for ~/git/myapp
///     rig up                  Start rig (infers from current directory)
///     rig status              Show all running rigs and crew
///     rig down myapp          Shut down the myapp rig
///     rig down                Shut down current rig (infers from context)
#[derive(Parser, Debug)]
#[command(name = "rig")]
#[command(author, version, long_version = LONG_VERSION, about = "Manage tmux-based development environments", verbatim_doc_comment)]
pub struct Cli {
    /// Output JSON instead of human-readable text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Bring up a rig (creates or switches)
    Up {
        /// Repository name under the rigs base (inferred when omitted)
        name: Option<String>,
    },

    /// Shut down a rig
    Down {
        /// Repository name (inferred when omitted)
        name: Option<String>,
    },

    /// Show all active rigs and crew
    #[command(visible_alias = "ls")]
    Status,

    /// List available repos
    List,

    /// Switch to a rig or crew session
    Switch {
        /// Session name, e.g. `myapp` or `myapp@tracy`
        name: String,
    },

    /// Attach to a tmux session (default session if no name provided)
    At {
        /// Session name
        name: Option<String>,
    },

    /// Shut down all rigs (add --crew to include crew)
    Killall {
        /// Kill both rigs and crew
        #[arg(long, conflicts_with = "crew_only")]
        crew: bool,

        /// Kill only crew sessions
        #[arg(long)]
        crew_only: bool,
    },

    /// Manage crew workspaces (persistent workers and polecats)
    Crew {
        #[command(subcommand)]
        command: CrewCommands,
    },

    /// Manage feature work
    Work {
        #[command(subcommand)]
        command: WorkCommands,
    },

    /// Display the hook file for current work
    Hook,

    /// Assign work to a crew member or polecat
    ///
    /// Without --to or --self a new polecat is created for the work item.
    Sling {
        /// Work item path, e.g. `work/build-frontend`
        work: String,

        /// Assign to existing crew member
        #[arg(long, conflicts_with = "self_")]
        to: Option<String>,

        /// Formula to use (default: build)
        #[arg(long)]
        formula: Option<String>,

        /// Work on it yourself in current session
        #[arg(long = "self")]
        self_: bool,
    },

    /// Show resolved configuration and where each value came from
    Config,
}

/// Crew subcommands
#[derive(Subcommand, Debug)]
pub enum CrewCommands {
    /// Create a crew workspace (worktree + session) and attach
    Add {
        /// Worker name
        name: String,

        /// Repository (inferred from the current directory or session)
        #[arg(long)]
        rig: Option<String>,
    },

    /// Attach to an existing crew workspace, recreating its session if needed
    Start {
        /// Worker name
        name: String,

        /// Repository (inferred when omitted)
        #[arg(long)]
        rig: Option<String>,
    },

    /// Remove a crew workspace, its session and optionally its branch
    #[command(visible_alias = "rm")]
    Remove {
        /// Worker name
        name: String,

        /// Repository (inferred when omitted)
        #[arg(long)]
        rig: Option<String>,
    },

    /// List crew workspaces across all rigs
    #[command(name = "ls", visible_alias = "list")]
    Ls {
        /// Only show workers with this name
        name: Option<String>,
    },

    /// Show active crew sessions
    Status,

    /// Remove every polecat workspace
    Prune,
}

/// Work subcommands
#[derive(Subcommand, Debug)]
pub enum WorkCommands {
    /// Create a new work directory with feature branch
    Create {
        /// Work item name
        name: String,
    },

    /// Show all active work across all rigs
    Status,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_sling_flags() {
        let cli = Cli::try_parse_from(["rig", "sling", "work/login", "--to", "tracy", "--json"]).unwrap();
        match cli.command {
            Commands::Sling { work, to, self_, formula } => {
                assert_eq!(work, "work/login");
                assert_eq!(to.as_deref(), Some("tracy"));
                assert!(!self_);
                assert_eq!(formula, None);
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert!(cli.json);
    }

    #[test]
    fn test_sling_to_and_self_conflict() {
        assert!(Cli::try_parse_from(["rig", "sling", "work/x", "--to", "a", "--self"]).is_err());
    }

    #[test]
    fn test_aliases() {
        assert!(matches!(
            Cli::try_parse_from(["rig", "ls"]).unwrap().command,
            Commands::Status
        ));
        let cli = Cli::try_parse_from(["rig", "crew", "rm", "tracy", "--rig", "app"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Crew {
                command: CrewCommands::Remove { .. }
            }
        ));
    }

    #[test]
    fn test_killall_flags_conflict() {
        assert!(Cli::try_parse_from(["rig", "killall", "--crew", "--crew-only"]).is_err());
    }
}
