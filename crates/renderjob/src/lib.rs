//! Render job resolution and renderer process orchestration.
//!
//! The flow through this crate is:
//!
//! ```text
//!   raw flags ──▶ PathResolver ──▶ resolve_textures() ──▶ RenderJobConfig
//!                                                              │ renderer_args()
//!                                                              ▼
//!                                      ProcessRunner::run ──▶ ProcessOutcome
//! ```
//!
//! The render script itself (scene setup, materials, encoding) lives outside this
//! crate; only its command-line contract is encoded here.

mod job;
mod path;
mod process;
mod targets;

pub use job::{
    display_command, format_rotations, inspect_args, RenderJobConfig, AUTO_FRAMES,
    AUTO_ROTATIONS, DEFAULT_INSPECT_SCRIPT, DEFAULT_SCRIPT,
};
pub use path::{PathError, PathResolver};
pub use process::{Launcher, ProcessError, ProcessOutcome, ProcessRunner, SystemLauncher};
pub use targets::{
    resolve_textures, LegacyTexture, ResolvedTextures, TextureAssignment, TextureSources,
    TextureTarget, UnknownTarget,
};
