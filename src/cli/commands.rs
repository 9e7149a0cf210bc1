//! Command dispatch

use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use tracing::{debug, instrument};

use crate::cli::args::{Cli, Commands, ConfigCommands, Overrides};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::cli::render::{render, RenderOptions};
use crate::cli::repl::run_repl;
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{EditRequest, Ledger};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let config_dir = resolve_config_dir(cli.config_dir.as_deref())?;
    let settings = effective_settings(&config_dir, &cli.overrides)?;
    let mut opts = RenderOptions::from(&settings.display);
    if cli.overrides.no_color {
        opts.color = false;
    }
    let container = ServiceContainer::new(settings);

    match &cli.command {
        Some(Commands::Show { file }) => show(&container, file.as_deref(), &opts),
        Some(Commands::Edit {
            file,
            id,
            percent,
            value,
        }) => edit(&container, file.as_deref(), id, *percent, *value, &opts),
        Some(Commands::Apply {
            file,
            script,
            steps,
        }) => apply(&container, file.as_deref(), script, *steps, &opts),
        Some(Commands::Repl { file }) => repl(&container, file.as_deref(), &opts),
        Some(Commands::Sample) => sample(),
        Some(Commands::Config { command }) => config_command(&container, &config_dir, command),
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(*shell, &mut cmd, "ledgertree", &mut io::stdout());
            Ok(())
        }
        None => Err(CliError::Usage(
            "no command given (try 'ledgertree --help')".to_string(),
        )),
    }
}

fn resolve_config_dir(dir: Option<&Path>) -> CliResult<PathBuf> {
    match dir {
        Some(dir) => Ok(dir.to_path_buf()),
        None => std::env::current_dir()
            .map_err(|e| InfraError::io("resolve working directory", e).into()),
    }
}

/// Merged config with command-line overrides applied last.
fn effective_settings(config_dir: &Path, overrides: &Overrides) -> CliResult<Settings> {
    let mut settings = Settings::load(Some(config_dir))?;
    if let Some(format) = overrides.format {
        settings.display.format = format;
    }
    if let Some(lookup) = overrides.baseline_lookup {
        settings.recalc.baseline_lookup = lookup;
    }
    if let Some(policy) = overrides.zero_baseline {
        settings.recalc.zero_baseline = policy;
    }
    debug!("effective settings: {:?}", settings);
    Ok(settings)
}

#[instrument(skip(container, opts))]
fn show(container: &ServiceContainer, file: Option<&Path>, opts: &RenderOptions) -> CliResult<()> {
    let session = container.session(container.load_ledger(file)?);
    let ledger = session.controller().recalculate(session.current());
    output::info(&render(&ledger, session.inputs(), opts)?);
    Ok(())
}

#[instrument(skip(container, opts))]
fn edit(
    container: &ServiceContainer,
    file: Option<&Path>,
    id: &str,
    percent: Option<f64>,
    value: Option<f64>,
    opts: &RenderOptions,
) -> CliResult<()> {
    let request = match (percent, value) {
        (Some(p), None) => EditRequest::percentage(id, p),
        (None, Some(v)) => EditRequest::direct(id, v),
        _ => {
            return Err(CliError::InvalidArgs(
                "exactly one of --percent or --value is required".to_string(),
            ))
        }
    };

    let mut session = container.session(container.load_ledger(file)?);
    if !session.apply(&request) {
        output::warning(&format!("unknown id '{id}', ledger unchanged"));
    }
    output::info(&render(session.current(), session.inputs(), opts)?);
    Ok(())
}

#[instrument(skip(container, opts))]
fn apply(
    container: &ServiceContainer,
    file: Option<&Path>,
    script: &Path,
    steps: bool,
    opts: &RenderOptions,
) -> CliResult<()> {
    let edits = container.ledger_files.load_script(script)?;
    let mut session = container.session(container.load_ledger(file)?);

    for (n, request) in edits.iter().enumerate() {
        if !session.apply(request) {
            output::warning(&format!(
                "edit {}: unknown id '{}', skipped",
                n + 1,
                request.target_id
            ));
            continue;
        }
        if steps {
            output::header(&format!(
                "[{}] {} {}{}",
                n + 1,
                request.mode,
                request.target_id,
                request.amount.map(|a| format!(" {a}")).unwrap_or_default()
            ));
            output::info(&render(session.current(), session.inputs(), opts)?);
        }
    }

    if !steps {
        output::info(&render(session.current(), session.inputs(), opts)?);
    }
    Ok(())
}

fn repl(container: &ServiceContainer, file: Option<&Path>, opts: &RenderOptions) -> CliResult<()> {
    let mut session = container.session(container.load_ledger(file)?);
    let stdin = io::stdin();
    let stdout = io::stdout();
    run_repl(&mut session, opts, stdin.lock(), stdout.lock())
}

fn sample() -> CliResult<()> {
    let text = toml::to_string_pretty(&Ledger::sample()).map_err(|e| {
        crate::application::ApplicationError::OperationFailed {
            context: "serialize sample ledger".to_string(),
            source: Box::new(e),
        }
    })?;
    output::info(&text);
    Ok(())
}

fn config_command(
    container: &ServiceContainer,
    config_dir: &Path,
    command: &ConfigCommands,
) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            output::info(&container.settings.to_toml()?);
            Ok(())
        }
        ConfigCommands::Init { global, force } => {
            let path = if *global {
                global_config_path().ok_or_else(|| {
                    CliError::Usage("cannot determine global config directory".to_string())
                })?
            } else {
                local_config_path(config_dir)
            };
            if container.fs.exists(&path) && !force {
                return Err(CliError::Usage(format!(
                    "config already exists: {} (use --force to overwrite)",
                    path.display()
                )));
            }
            container
                .fs
                .ensure_parent(&path)
                .map_err(|e| InfraError::io(format!("create parent of {}", path.display()), e))?;
            container
                .fs
                .write(&path, &Settings::template())
                .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
            output::success(&format!("created {}", path.display()));
            Ok(())
        }
        ConfigCommands::Path => {
            let describe = |path: &Path| {
                if container.fs.is_file(path) {
                    format!("{} (exists)", path.display())
                } else {
                    format!("{} (not found)", path.display())
                }
            };
            match global_config_path() {
                Some(global) => output::action("global", &describe(&global)),
                None => output::action("global", "unavailable"),
            }
            output::action("local", &describe(&local_config_path(config_dir)));
            Ok(())
        }
    }
}
