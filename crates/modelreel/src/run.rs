use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use reelconfig::JobFile;
use renderjob::{
    display_command, resolve_textures, Launcher, PathResolver, ProcessOutcome, ProcessRunner,
    RenderJobConfig, ResolvedTextures, SystemLauncher, TextureSources,
};
use texturegen::{
    GeminiClient, GeneratedTexture, GenerationConfig, GenerationError, GenerationRequest,
    TextureGenerator,
};
use tracing_subscriber::EnvFilter;

use crate::cli::RunArgs;
use crate::error::PipelineError;
use crate::settings::Settings;

/// How a successful run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Rendered {
        outcome: ProcessOutcome,
        generated: Option<GeneratedTexture>,
    },
    /// No renderer configured: textures were resolved (and possibly generated) only.
    TextureOnly {
        generated: Option<GeneratedTexture>,
        textures: ResolvedTextures,
    },
}

pub fn run(args: RunArgs) -> Result<RunOutcome> {
    let job = load_job_file(args.config.as_deref())?;
    let settings = Settings::merge(args, job)?;
    let paths = PathResolver::new();
    let outcome = execute(&settings, &paths, GeminiClient::new, SystemLauncher)?;
    Ok(outcome)
}

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_job_file(path: Option<&Path>) -> Result<Option<JobFile>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let job = JobFile::load(path)
        .map_err(PipelineError::from)
        .with_context(|| format!("failed to load job file {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded job file");
    Ok(Some(job))
}

/// Runs the whole pipeline: pre-flight checks, optional generation, texture
/// resolution, argument building and finally the renderer.
///
/// `make_generator` is only called once a credential has been validated.
pub fn execute<G, F, L>(
    settings: &Settings,
    paths: &PathResolver,
    make_generator: F,
    launcher: L,
) -> Result<RunOutcome, PipelineError>
where
    G: TextureGenerator,
    F: FnOnce(GenerationConfig) -> Result<G, GenerationError>,
    L: Launcher,
{
    let runner = settings
        .blender
        .as_deref()
        .map(|blender| ProcessRunner::with_launcher(resolve_program(paths, blender), launcher));

    if let Some(runner) = &runner {
        runner.preflight()?;
        if settings.model.is_none() {
            return Err(PipelineError::Config(
                "--model is required when a renderer is configured".into(),
            ));
        }
    }

    let generation = match settings.prompt.as_deref() {
        Some(prompt) => Some(prepare_generation(settings, paths, prompt, make_generator)?),
        None => None,
    };

    let generated = match generation {
        Some((generator, request)) => Some(generator.generate(&request)?),
        None => None,
    };

    let textures = resolve_textures(
        &TextureSources {
            legacy: settings.texture.clone(),
            legacy_target: settings.texture_target,
            explicit: settings.textures.clone(),
            generated: generated.as_ref().map(|texture| texture.path.clone()),
        },
        paths,
    );
    log_textures(&textures);

    let job = settings
        .model
        .as_deref()
        .and_then(|model| paths.resolve("model", model))
        .map(|model| build_job(settings, paths, model, textures.clone()));

    let Some(runner) = runner else {
        tracing::info!("no renderer configured; texture-only run complete");
        if let Some(job) = &job {
            tracing::info!(
                command = %display_command(Path::new("<blender>"), &job.renderer_args()),
                aspect_ratio = %job.aspect_ratio,
                resolution = %job.resolution,
                "renderer command (not executed)"
            );
        }
        return Ok(RunOutcome::TextureOnly {
            generated,
            textures,
        });
    };

    let Some(job) = job else {
        return Err(PipelineError::Config(
            "--model could not be resolved to a path".into(),
        ));
    };

    tracing::info!(
        model = %job.model.display(),
        output = %job.output.display(),
        frames = job.frames,
        rotations = job.rotations,
        aspect_ratio = %job.aspect_ratio,
        resolution = %job.resolution,
        "rendering started; this may take a while"
    );
    let outcome = runner.run(&job.renderer_args())?;
    tracing::info!(output = %job.output.display(), "rendering finished successfully");

    Ok(RunOutcome::Rendered { outcome, generated })
}

fn prepare_generation<G, F>(
    settings: &Settings,
    paths: &PathResolver,
    prompt: &str,
    make_generator: F,
) -> Result<(G, GenerationRequest), PipelineError>
where
    G: TextureGenerator,
    F: FnOnce(GenerationConfig) -> Result<G, GenerationError>,
{
    let mut config = GenerationConfig::new(settings.api_key.clone().unwrap_or_default())?
        .with_proxy(settings.proxy.as_deref());
    if let Some(endpoint) = settings.endpoint.as_deref() {
        config = config.with_endpoint(endpoint)?;
    }

    let output = paths
        .resolve("generated output", &settings.generated_output)
        .ok_or_else(|| {
            PipelineError::Config("generated texture filename must not be empty".into())
        })?;
    let reference_image = settings
        .reference_image
        .as_deref()
        .and_then(|reference| paths.resolve("reference image", reference));

    let request = GenerationRequest {
        prompt: prompt.to_string(),
        reference_image,
        output,
        aspect_ratio: Some(settings.aspect_ratio.clone()),
        resolution: Some(settings.resolution.clone()),
    };
    let generator = make_generator(config)?;
    Ok((generator, request))
}

fn build_job(
    settings: &Settings,
    paths: &PathResolver,
    model: PathBuf,
    textures: ResolvedTextures,
) -> RenderJobConfig {
    RenderJobConfig {
        script: resolve_or_raw(paths, "script", &settings.script),
        project: settings
            .project
            .as_deref()
            .and_then(|project| paths.resolve("project", project)),
        model,
        output: resolve_or_raw(paths, "output", &settings.output),
        frames: settings.frames,
        rotations: settings.rotations,
        aspect_ratio: settings.aspect_ratio.clone(),
        resolution: settings.resolution.clone(),
        legacy: textures.legacy,
        textures: textures.assignment,
    }
}

fn resolve_or_raw(paths: &PathResolver, label: &str, input: &str) -> PathBuf {
    paths
        .resolve(label, input)
        .unwrap_or_else(|| PathBuf::from(input))
}

/// Explicit executable paths are absolutised; bare names are left for `PATH` lookup.
pub(crate) fn resolve_program(paths: &PathResolver, program: &str) -> PathBuf {
    if Path::new(program).components().count() > 1 || program.starts_with('~') {
        resolve_or_raw(paths, "blender", program)
    } else {
        PathBuf::from(program)
    }
}

fn log_textures(textures: &ResolvedTextures) {
    if textures.is_empty() {
        tracing::debug!("no texture overrides");
        return;
    }
    if let Some(legacy) = &textures.legacy {
        tracing::info!(
            path = %legacy.path.display(),
            target = %legacy.target,
            "legacy texture"
        );
    }
    for (target, path) in textures.assignment.iter() {
        tracing::info!(%target, path = %path.display(), "texture override");
    }
}
