use reelconfig::ConfigError;
use renderjob::ProcessError;
use texturegen::GenerationError;

const EXIT_CONFIG: u8 = 2;
const EXIT_GENERATION: u8 = 3;
const EXIT_RENDERER: u8 = 4;

/// Fatal pipeline failures. `main` is the only place these become exit codes.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    JobFile(#[from] ConfigError),
    #[error("texture generation failed: {0}")]
    Generation(#[from] GenerationError),
    #[error("rendering failed: {0}")]
    Renderer(#[from] ProcessError),
}

impl PipelineError {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) | Self::JobFile(_) => EXIT_CONFIG,
            Self::Generation(
                GenerationError::MissingCredential
                | GenerationError::EmptyPrompt
                | GenerationError::InvalidEndpoint { .. }
                | GenerationError::InvalidProxy { .. },
            ) => EXIT_CONFIG,
            Self::Generation(_) => EXIT_GENERATION,
            Self::Renderer(ProcessError::NotFound(_)) => EXIT_CONFIG,
            Self::Renderer(ProcessError::Exit(code)) => u8::try_from(*code)
                .ok()
                .filter(|code| *code != 0)
                .unwrap_or(EXIT_RENDERER),
            Self::Renderer(_) => EXIT_RENDERER,
        }
    }
}

/// Exit code for any error surfaced to `main`.
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<PipelineError>()
        .map(PipelineError::exit_code)
        .unwrap_or(1)
}
