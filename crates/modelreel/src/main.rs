mod cli;
mod error;
mod run;
mod settings;

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use cli::{Command, InspectArgs};
use error::{exit_code_for, PipelineError};
use renderjob::{inspect_args, PathResolver, ProcessRunner};
use run::RunOutcome;

fn main() -> ExitCode {
    let cli = cli::parse();
    run::initialise_tracing();

    let result = match cli.command {
        Some(Command::Inspect(args)) => handle_inspect(args),
        None => run::run(cli.run).map(report_outcome),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::from(exit_code_for(&err))
        }
    }
}

fn report_outcome(outcome: RunOutcome) {
    match outcome {
        RunOutcome::Rendered { generated, .. } => {
            if let Some(texture) = generated {
                tracing::info!(path = %texture.path.display(), "generated texture used for render");
            }
        }
        RunOutcome::TextureOnly { generated, .. } => match generated {
            Some(texture) => println!("{}", texture.path.display()),
            None => tracing::info!("nothing to render; pass --blender to run the renderer"),
        },
    }
}

fn handle_inspect(args: InspectArgs) -> Result<()> {
    let paths = PathResolver::new();
    let blender = args
        .blender
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| {
            PipelineError::Config("--blender (or BLENDER_PATH) is required for inspect".into())
        })?;
    let blend = paths
        .resolve("blend file", &args.blend)
        .ok_or_else(|| PipelineError::Config("a .blend file is required".into()))?;
    let script = paths
        .resolve("inspect script", &args.script)
        .unwrap_or_else(|| Path::new(&args.script).to_path_buf());

    let runner = ProcessRunner::new(run::resolve_program(&paths, &blender));
    runner.preflight().map_err(PipelineError::from)?;
    runner
        .run(&inspect_args(&script, &blend))
        .map_err(PipelineError::from)
        .with_context(|| format!("failed to inspect {}", blend.display()))?;
    Ok(())
}
