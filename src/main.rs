mod cli;
mod doctor;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use cli::{Cli, Command};
use zip2commit::{
    archive_commit, error_json, init_tracing, outcome_json, prepare, print_error, print_outcome,
    print_plan, prompt_commit, resolve_settings, script_emitter_for, select_toolset,
    set_color_mode, ui, ArchiveError, ArchiveRequest, CliOverrides, ExecutionMode, PlanPreview,
    RepositoryInspector, RunOutcome, SystemRunner, EXIT_NOTHING_TO_COMPRESS,
};

const CANCEL_NOTICE: &str =
    "cancellation during checkout or archiving may require manual recovery of the working tree";

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(code) => ExitCode::from(code),
        Err(err) => match err.downcast_ref::<ArchiveError>() {
            Some(e) => {
                if cli.json {
                    println!("{:#}", error_json(e));
                } else {
                    print_error(e);
                }
                ExitCode::from(e.exit_code())
            }
            None => {
                eprintln!("zip2commit: {err:#}");
                ExitCode::from(1)
            }
        },
    }
}

fn run(cli: &Cli) -> Result<u8> {
    let runner = SystemRunner;
    let start = cli.repo.clone().unwrap_or_else(|| PathBuf::from("."));
    let root = RepositoryInspector::new(&runner, &start).toplevel();

    let overrides = CliOverrides {
        shell: cli.shell.clone(),
        toolset: cli.toolset,
        color: cli.color,
    };
    let settings_root = root.as_ref().cloned().unwrap_or_else(|_| start.clone());
    let settings = resolve_settings(&overrides, &settings_root)?;
    if let Some(mode) = settings.color {
        set_color_mode(mode);
    }

    if let Some(Command::Doctor) = &cli.command {
        doctor::run_doctor(
            &runner,
            &settings,
            root.map_err(|e| e.to_string()),
            cli.verbose,
        );
        return Ok(0);
    }

    let root = root?;
    let commit = match &cli.commit {
        Some(c) if !c.trim().is_empty() => c.trim().to_string(),
        Some(_) => return Err(ArchiveError::InputMissing.into()),
        None => prompt_commit()?,
    };

    if cli.dry_run {
        let preview = prepare(&runner, &commit, &root)?;
        if cli.json {
            println!("{:#}", serde_json::json!({ "plan": &preview }));
        } else {
            print_plan(&preview);
        }
        return Ok(0);
    }

    let toolset = select_toolset(settings.toolset, settings.shell.as_deref())?;

    if cli.print_script {
        let preview = prepare(&runner, &commit, &root)?;
        let emitter = script_emitter_for(&toolset, settings.shell.as_deref())?;
        let body = emitter
            .render_script(&preview.plan)
            .map_err(ArchiveError::from)?;
        print!("{body}");
        return Ok(0);
    }

    let request = ArchiveRequest {
        commit,
        workspace_root: root,
        toolset,
        mode: if cli.via_shell {
            ExecutionMode::Script
        } else {
            ExecutionMode::Steps
        },
        shell: settings.shell.clone(),
    };
    if !cli.json {
        ui::notify_info(CANCEL_NOTICE);
    }

    let mut seen: Option<PlanPreview> = None;
    let outcome = archive_commit(&runner, &request, |preview| {
        if !cli.json {
            print_plan(preview);
        }
        seen = Some(preview.clone());
    })?;

    if cli.json {
        let v = outcome_json(seen.as_ref(), &outcome);
        println!(
            "{}",
            serde_json::to_string_pretty(&v).context("failed to serialize outcome")?
        );
    } else {
        print_outcome(&outcome);
    }

    Ok(match outcome {
        RunOutcome::Archived { .. } => 0,
        RunOutcome::NothingToCompress { .. } => EXIT_NOTHING_TO_COMPRESS,
    })
}
