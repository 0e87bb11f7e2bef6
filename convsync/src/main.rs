//! convsync - searchable conversation history for a project
//!
//! Runs as an assistant hook (Stop, PreCompact): reads the hook payload on
//! stdin, syncs the session into `<project>/.conversations/` and prints the
//! completion signal. Manual subcommands sync, preview and inspect chains.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Logs: $XDG_STATE_HOME/convsync/convsync.log (~/.local/state/convsync/convsync.log)
//! - Config: $XDG_CONFIG_HOME/convsync/config.toml (~/.config/convsync/config.toml)

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use convsync_core::hook::{HookInput, HookOutput};
use convsync_core::ingest::extract_active_branch;
use convsync_core::render::format_messages;
use convsync_core::sync::SyncCoordinator;
use convsync_core::workspace::ConversationDir;
use convsync_core::Config;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "convsync")]
#[command(about = "Keep searchable markdown transcripts of assistant sessions")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run as a hook: read the payload from stdin (default)
    Hook,

    /// Sync one session log into a project
    Sync {
        /// Path to the session log (.jsonl)
        log: PathBuf,

        /// Project root (default: current directory)
        #[arg(long)]
        project: Option<PathBuf>,

        /// Session id (default: log file stem)
        #[arg(long)]
        session_id: Option<String>,

        /// Sync every log in the log's directory first
        #[arg(long)]
        backfill: bool,
    },

    /// Print the active branch of a log as markdown
    Show {
        /// Path to the session log (.jsonl)
        log: PathBuf,
    },

    /// List detected session chains
    Chains {
        /// Project root (default: current directory)
        #[arg(long)]
        project: Option<PathBuf>,

        /// Directory holding the project's session logs
        #[arg(long)]
        logs: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    match args.command.unwrap_or(Command::Hook) {
        Command::Hook => {
            run_hook();
            Ok(())
        }
        Command::Sync {
            log,
            project,
            session_id,
            backfill,
        } => {
            let config = Config::load().context("failed to load configuration")?;
            let _log_guard = convsync_core::logging::init(&config.logging)
                .context("failed to initialize logging")?;
            cmd_sync(&config, &log, project, session_id, backfill)
        }
        Command::Show { log } => cmd_show(&log),
        Command::Chains { project, logs } => {
            let config = Config::load().context("failed to load configuration")?;
            cmd_chains(&config, project, &logs)
        }
    }
}

/// Hook mode never fails: problems are logged and stdout only ever
/// carries the completion signal.
fn run_hook() {
    let config = Config::load().unwrap_or_default();
    let _log_guard = convsync_core::logging::init(&config.logging).ok();

    let input = HookInput::read_from(std::io::stdin().lock());
    if let Err(e) = hook_sync(&config, &input) {
        tracing::warn!(error = %e, "Hook sync failed");
    }

    println!("{}", HookOutput::suppress().to_json());
}

fn hook_sync(config: &Config, input: &HookInput) -> convsync_core::Result<()> {
    let target = match input.resolve(&config.paths.claude_projects_root()) {
        Ok(target) => target,
        Err(e) => {
            tracing::debug!(error = %e, "Nothing to sync");
            return Ok(());
        }
    };

    tracing::info!(
        session_id = %target.session_id,
        project = %target.project_root.display(),
        "Hook triggered"
    );

    let coordinator = SyncCoordinator::open(&target.project_root, config)?;
    coordinator.update(&target.transcript, &target.session_id, false)?;
    Ok(())
}

fn cmd_sync(
    config: &Config,
    log: &Path,
    project: Option<PathBuf>,
    session_id: Option<String>,
    backfill: bool,
) -> Result<()> {
    let project = project_or_cwd(project)?;
    let session_id = match session_id {
        Some(id) => id,
        None => HookInput::default().session_id_for(log),
    };

    let coordinator = SyncCoordinator::open(&project, config)
        .with_context(|| format!("failed to set up {}", project.display()))?;
    let report = coordinator
        .update(log, &session_id, backfill)
        .with_context(|| format!("failed to sync {}", log.display()))?;

    if let Some(backfill) = &report.backfill {
        println!(
            "Backfill: {} updated, {} unchanged, {} errors",
            backfill.sessions_updated,
            backfill.sessions_unchanged,
            backfill.errors.len()
        );
        for (path, error) in &backfill.errors {
            eprintln!("  {}: {}", path.display(), error);
        }
    }

    let status = if report.session.is_updated() {
        "updated"
    } else {
        "unchanged"
    };
    println!(
        "{} {} ({} messages)",
        session_id, status, report.session.messages
    );
    println!(
        "Output: {}",
        coordinator.conversation_dir().root().display()
    );

    Ok(())
}

fn cmd_show(log: &Path) -> Result<()> {
    let branch = extract_active_branch(log)
        .with_context(|| format!("failed to read {}", log.display()))?;

    for warning in &branch.warnings {
        eprintln!("warning: {}", warning);
    }
    print!("{}", format_messages(&branch.messages));
    Ok(())
}

fn cmd_chains(config: &Config, project: Option<PathBuf>, logs: &Path) -> Result<()> {
    let project = project_or_cwd(project)?;
    let conv = ConversationDir::new(&project, &config.output.dir_name);
    let store = conv.state_store();
    let coordinator = SyncCoordinator::with_store(conv, store, config.output.clone());

    let chains = coordinator
        .detect_chains(logs)
        .with_context(|| format!("failed to scan {}", logs.display()))?;

    for chain in chains.iter().filter(|c| c.is_linked()) {
        println!("{}", chain.sessions().join(" -> "));
    }
    Ok(())
}

fn project_or_cwd(project: Option<PathBuf>) -> Result<PathBuf> {
    match project {
        Some(project) => Ok(project),
        None => std::env::current_dir().context("failed to resolve current directory"),
    }
}
