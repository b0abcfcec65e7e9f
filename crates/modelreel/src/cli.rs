use std::path::PathBuf;

use clap::{Parser, Subcommand};
use renderjob::{TextureTarget, DEFAULT_INSPECT_SCRIPT};

#[derive(Parser, Debug)]
#[command(
    name = "modelreel",
    author,
    version,
    about = "Render turntable videos of 3D models through Blender",
    arg_required_else_help = false,
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Blender executable; when omitted only texture generation runs.
    #[arg(long, env = "BLENDER_PATH", value_name = "PATH")]
    pub blender: Option<String>,

    /// Render script handed to Blender (resolved against the current directory).
    #[arg(long, value_name = "PATH")]
    pub script: Option<String>,

    /// Optional `.blend` template; its scene is kept instead of building a default one.
    #[arg(long, value_name = "FILE")]
    pub project: Option<String>,

    /// 3D model to render (obj, fbx, glb, ...).
    #[arg(long, value_name = "FILE")]
    pub model: Option<String>,

    /// Legacy single texture, applied to `--texture-target`.
    #[arg(long, value_name = "FILE")]
    pub texture: Option<String>,

    /// Target for the legacy texture and for a generated texture (`front`, `back`, `background`).
    #[arg(long, value_name = "TARGET", value_parser = parse_target)]
    pub texture_target: Option<TextureTarget>,

    /// Texture for the front surface; overrides a generated texture.
    #[arg(long, value_name = "FILE")]
    pub texture_front: Option<String>,

    /// Texture for the back surface; overrides a generated texture.
    #[arg(long, value_name = "FILE")]
    pub texture_back: Option<String>,

    /// Texture for the background; overrides a generated texture.
    #[arg(long, value_name = "FILE")]
    pub texture_background: Option<String>,

    /// File the generated texture is written to.
    #[arg(long, value_name = "FILE")]
    pub generated_output: Option<String>,

    /// Reference image sent alongside the prompt.
    #[arg(long, value_name = "FILE")]
    pub reference_image: Option<String>,

    /// Prompt for AI texture generation.
    #[arg(long)]
    pub prompt: Option<String>,

    /// Image generation API key; can also be supplied via the `GEMINI_API_KEY` env var.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Output video path.
    #[arg(long, value_name = "FILE")]
    pub output: Option<String>,

    /// Number of frames to render (0 lets the render script decide).
    #[arg(long, value_name = "COUNT")]
    pub frames: Option<u32>,

    /// Full turntable rotations over the clip (-1 lets the render script decide).
    #[arg(long, value_name = "COUNT", allow_negative_numbers = true)]
    pub rotations: Option<f64>,

    /// Proxy for image generation requests (e.g. `http://127.0.0.1:7890`).
    #[arg(long, value_name = "URL")]
    pub proxy: Option<String>,

    /// Aspect ratio hint for generated textures (e.g. `1:1`, `16:9`).
    #[arg(long, value_name = "RATIO")]
    pub aspect_ratio: Option<String>,

    /// Resolution tier hint for generated textures (e.g. `1K`, `2K`, `4K`).
    #[arg(long, value_name = "TIER")]
    pub resolution: Option<String>,

    /// Override the image generation endpoint.
    #[arg(long, value_name = "URL", hide = true)]
    pub endpoint: Option<String>,

    /// TOML job file providing defaults for any of the flags above.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the render settings stored in a `.blend` file.
    Inspect(InspectArgs),
}

#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// `.blend` file to inspect.
    #[arg(value_name = "BLEND")]
    pub blend: String,

    /// Blender executable.
    #[arg(long, env = "BLENDER_PATH", value_name = "PATH")]
    pub blender: Option<String>,

    /// Inspection script handed to Blender.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_INSPECT_SCRIPT)]
    pub script: String,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_target(value: &str) -> Result<TextureTarget, String> {
    if value.trim().is_empty() {
        return Err("texture target must not be empty".to_string());
    }
    value.parse::<TextureTarget>().map_err(|err| err.to_string())
}
