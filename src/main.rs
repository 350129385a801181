//! Rig CLI - tmux sessions, crew worktrees and polecats for your repositories.

use clap::Parser;
use rig::action_log::{self, ActionLog};
use rig::cli::{Cli, Commands, CrewCommands, WorkCommands};
use rig::commands::CommandResult;
use rig::config::{ConfigOverrides, OutputFormat, ResolvedSettings, Settings};
use rig::context::resolve_repository;
use rig::git::GitCli;
use rig::prompt::TerminalPrompt;
use rig::rigs::KillScope;
use rig::sling::{Mode, SlingRequest, SlingTiming};
use rig::tmux::TmuxClient;
use rig::{Ctx, crew, rigs, sling, work};
use std::env;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let overrides = ConfigOverrides {
        output_format: cli.json.then_some(OutputFormat::Json),
    };
    let resolved = match Settings::load(&overrides) {
        Ok(resolved) => resolved,
        Err(e) => exit_with_error(&e, cli.json),
    };
    let settings = resolved.settings();
    let json = settings.is_json();

    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    // Serialize command for logging
    let (cmd_name, args_json) = serialize_command(&cli.command);

    let start = Instant::now();

    let git = GitCli::new();
    let tmux = TmuxClient::from_env(settings.control_mode);
    let prompt = TerminalPrompt::new(json);
    let ctx = Ctx::new(&settings, &git, &tmux, &prompt);

    let result = run_command(cli.command, &ctx, &resolved, &cwd);

    let entry = ActionLog::new(
        &cmd_name,
        args_json,
        result.as_ref().err().map(|e| e.to_string()),
        start.elapsed(),
        &cwd,
    );
    action_log::log_action(settings.action_log.as_deref(), &entry);

    if let Err(e) = result {
        exit_with_error(&e, json);
    }
}

/// Diagnostics go to stderr, filtered by `RIG_LOG` (default: warn).
fn init_tracing() {
    let filter = EnvFilter::try_from_env("RIG_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn exit_with_error(e: &rig::Error, json: bool) -> ! {
    if json {
        eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
    } else {
        eprintln!("Error: {}", e);
    }
    process::exit(1);
}

fn run_command(
    command: Commands,
    ctx: &Ctx<'_>,
    resolved: &ResolvedSettings,
    cwd: &Path,
) -> Result<(), rig::Error> {
    let json = ctx.settings.is_json();
    match command {
        Commands::Up { name } => output(&rigs::up(ctx, name.as_deref(), cwd)?, json),
        Commands::Down { name } => output(&rigs::down(ctx, name.as_deref(), cwd)?, json),
        Commands::Status => output(&rigs::status(ctx), json),
        Commands::List => output(&rigs::list(ctx)?, json),
        Commands::Switch { name } => output(&rigs::switch(ctx, &name)?, json),
        Commands::At { name } => output(&rigs::at(ctx, name.as_deref())?, json),
        Commands::Killall { crew, crew_only } => {
            let scope = if crew_only {
                KillScope::CrewOnly
            } else if crew {
                KillScope::RigsAndCrew
            } else {
                KillScope::Rigs
            };
            output(&rigs::killall(ctx, scope), json);
        }

        Commands::Crew { command } => match command {
            CrewCommands::Add { name, rig } => {
                let repo = resolve_repository(ctx, rig.as_deref(), cwd)?.repo;
                output(&crew::add(ctx, &repo, &name)?, json);
            }
            CrewCommands::Start { name, rig } => {
                let repo = resolve_repository(ctx, rig.as_deref(), cwd)?.repo;
                output(&crew::start(ctx, &repo, &name)?, json);
            }
            CrewCommands::Remove { name, rig } => {
                let repo = resolve_repository(ctx, rig.as_deref(), cwd)?.repo;
                output(&crew::remove(ctx, &repo, &name)?, json);
            }
            CrewCommands::Ls { name } => output(&crew::list(ctx, name.as_deref())?, json),
            CrewCommands::Status => output(&crew::status(ctx), json),
            CrewCommands::Prune => output(&crew::prune_polecats(ctx)?, json),
        },

        Commands::Work { command } => match command {
            WorkCommands::Create { name } => output(&work::create(ctx, cwd, &name)?, json),
            WorkCommands::Status => output(&work::status(ctx)?, json),
        },

        Commands::Hook => output(&work::read_hook(ctx, cwd)?, json),

        Commands::Sling {
            work,
            to,
            formula,
            self_,
        } => {
            let mode = match (to, self_) {
                (Some(worker), _) => Mode::Crew(worker),
                (None, true) => Mode::Current,
                (None, false) => Mode::Polecat,
            };
            let request = SlingRequest {
                reference: work,
                formula,
                mode,
            };
            output(
                &sling::sling(ctx, cwd, &request, SlingTiming::default())?,
                json,
            );
        }

        Commands::Config => output(resolved, json),
    }
    Ok(())
}

fn output<T: CommandResult>(result: &T, json: bool) {
    if json {
        println!("{}", result.to_json());
    } else {
        println!("{}", result.to_human());
    }
}

/// Command name and arguments as recorded in the action log.
fn serialize_command(command: &Commands) -> (String, serde_json::Value) {
    match command {
        Commands::Up { name } => ("up".to_string(), serde_json::json!({ "name": name })),
        Commands::Down { name } => ("down".to_string(), serde_json::json!({ "name": name })),
        Commands::Status => ("status".to_string(), serde_json::json!({})),
        Commands::List => ("list".to_string(), serde_json::json!({})),
        Commands::Switch { name } => ("switch".to_string(), serde_json::json!({ "name": name })),
        Commands::At { name } => ("at".to_string(), serde_json::json!({ "name": name })),
        Commands::Killall { crew, crew_only } => (
            "killall".to_string(),
            serde_json::json!({ "crew": crew, "crew_only": crew_only }),
        ),

        Commands::Crew { command } => match command {
            CrewCommands::Add { name, rig } => (
                "crew add".to_string(),
                serde_json::json!({ "name": name, "rig": rig }),
            ),
            CrewCommands::Start { name, rig } => (
                "crew start".to_string(),
                serde_json::json!({ "name": name, "rig": rig }),
            ),
            CrewCommands::Remove { name, rig } => (
                "crew remove".to_string(),
                serde_json::json!({ "name": name, "rig": rig }),
            ),
            CrewCommands::Ls { name } => {
                ("crew ls".to_string(), serde_json::json!({ "name": name }))
            }
            CrewCommands::Status => ("crew status".to_string(), serde_json::json!({})),
            CrewCommands::Prune => ("crew prune".to_string(), serde_json::json!({})),
        },

        Commands::Work { command } => match command {
            WorkCommands::Create { name } => {
                ("work create".to_string(), serde_json::json!({ "name": name }))
            }
            WorkCommands::Status => ("work status".to_string(), serde_json::json!({})),
        },

        Commands::Hook => ("hook".to_string(), serde_json::json!({})),

        Commands::Sling {
            work,
            to,
            formula,
            self_,
        } => (
            "sling".to_string(),
            serde_json::json!({ "work": work, "to": to, "formula": formula, "self": self_ }),
        ),

        Commands::Config => ("config".to_string(), serde_json::json!({})),
    }
}
