use std::collections::BTreeMap;

use reelconfig::JobFile;
use renderjob::{TextureTarget, AUTO_FRAMES, AUTO_ROTATIONS, DEFAULT_SCRIPT};

use crate::cli::RunArgs;
use crate::error::PipelineError;

pub const DEFAULT_OUTPUT: &str = "output.mp4";
pub const DEFAULT_GENERATED_OUTPUT: &str = "generated_texture.png";
pub const DEFAULT_ASPECT_RATIO: &str = "1:1";
pub const DEFAULT_RESOLUTION: &str = "1K";

/// One run's settings after applying CLI > job file > built-in default.
///
/// Blank strings count as "not provided" at every layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub blender: Option<String>,
    pub script: String,
    pub project: Option<String>,
    pub model: Option<String>,
    pub output: String,
    pub frames: u32,
    pub rotations: f64,
    pub texture: Option<String>,
    pub texture_target: TextureTarget,
    pub textures: BTreeMap<TextureTarget, String>,
    pub generated_output: String,
    pub reference_image: Option<String>,
    pub prompt: Option<String>,
    pub api_key: Option<String>,
    pub proxy: Option<String>,
    pub aspect_ratio: String,
    pub resolution: String,
    pub endpoint: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            blender: None,
            script: DEFAULT_SCRIPT.to_string(),
            project: None,
            model: None,
            output: DEFAULT_OUTPUT.to_string(),
            frames: AUTO_FRAMES,
            rotations: AUTO_ROTATIONS,
            texture: None,
            texture_target: TextureTarget::default(),
            textures: BTreeMap::new(),
            generated_output: DEFAULT_GENERATED_OUTPUT.to_string(),
            reference_image: None,
            prompt: None,
            api_key: None,
            proxy: None,
            aspect_ratio: DEFAULT_ASPECT_RATIO.to_string(),
            resolution: DEFAULT_RESOLUTION.to_string(),
            endpoint: None,
        }
    }
}

impl Settings {
    pub fn merge(args: RunArgs, job: Option<JobFile>) -> Result<Self, PipelineError> {
        let job = job.unwrap_or_default();
        let defaults = Settings::default();

        let texture_target = match args.texture_target {
            Some(target) => target,
            None => match present(job.texture_target.clone()) {
                Some(raw) => raw
                    .parse::<TextureTarget>()
                    .map_err(|err| PipelineError::Config(err.to_string()))?,
                None => defaults.texture_target,
            },
        };

        let mut textures = BTreeMap::new();
        let explicit = [
            (TextureTarget::Front, args.texture_front),
            (TextureTarget::Back, args.texture_back),
            (TextureTarget::Background, args.texture_background),
        ];
        for (target, flag) in explicit {
            let from_job = job.texture_for(target.as_str()).map(str::to_string);
            if let Some(path) = present(flag).or_else(|| present(from_job)) {
                textures.insert(target, path);
            }
        }

        let rotations = args.rotations.or(job.rotations).unwrap_or(defaults.rotations);
        if !rotations.is_finite() {
            return Err(PipelineError::Config(
                "rotations must be a finite number".into(),
            ));
        }

        Ok(Self {
            blender: layered(args.blender, job.blender),
            script: layered(args.script, job.script).unwrap_or(defaults.script),
            project: layered(args.project, job.project),
            model: layered(args.model, job.model),
            output: layered(args.output, job.output).unwrap_or(defaults.output),
            frames: args.frames.or(job.frames).unwrap_or(defaults.frames),
            rotations,
            texture: layered(args.texture, job.texture),
            texture_target,
            textures,
            generated_output: layered(args.generated_output, job.generated_output)
                .unwrap_or(defaults.generated_output),
            reference_image: layered(args.reference_image, job.reference_image),
            prompt: layered(args.prompt, job.prompt),
            api_key: present(args.api_key),
            proxy: layered(args.proxy, job.proxy),
            aspect_ratio: layered(args.aspect_ratio, job.aspect_ratio)
                .unwrap_or(defaults.aspect_ratio),
            resolution: layered(args.resolution, job.resolution).unwrap_or(defaults.resolution),
            endpoint: layered(args.endpoint, job.endpoint),
        })
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn layered(flag: Option<String>, file: Option<String>) -> Option<String> {
    present(flag).or_else(|| present(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_flags_or_job_file() {
        let settings = Settings::merge(RunArgs::default(), None).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.frames, 0);
        assert_eq!(settings.rotations, -1.0);
        assert_eq!(settings.texture_target, TextureTarget::Front);
    }

    #[test]
    fn flags_override_job_file() {
        let job = JobFile::from_toml_str(
            r#"
model = "from_job.glb"
frames = 90
texture_target = "background"

[textures]
front = "job_front.png"
back = "job_back.png"
"#,
        )
        .unwrap();
        let args = RunArgs {
            model: Some("from_flag.glb".into()),
            texture_back: Some("flag_back.png".into()),
            ..RunArgs::default()
        };

        let settings = Settings::merge(args, Some(job)).unwrap();
        assert_eq!(settings.model.as_deref(), Some("from_flag.glb"));
        assert_eq!(settings.frames, 90);
        assert_eq!(settings.texture_target, TextureTarget::Background);
        assert_eq!(
            settings.textures.get(&TextureTarget::Front).map(String::as_str),
            Some("job_front.png")
        );
        assert_eq!(
            settings.textures.get(&TextureTarget::Back).map(String::as_str),
            Some("flag_back.png")
        );
    }

    #[test]
    fn blank_values_count_as_absent() {
        let args = RunArgs {
            blender: Some(String::new()),
            prompt: Some("  ".into()),
            api_key: Some(String::new()),
            texture_front: Some(String::new()),
            ..RunArgs::default()
        };
        let settings = Settings::merge(args, None).unwrap();
        assert!(settings.blender.is_none());
        assert!(settings.prompt.is_none());
        assert!(settings.api_key.is_none());
        assert!(settings.textures.is_empty());
    }

    #[test]
    fn mixed_case_job_file_targets_are_applied() {
        let job = JobFile::from_toml_str("[textures]\nFront = \"front.png\"\n").unwrap();
        let settings = Settings::merge(RunArgs::default(), Some(job)).unwrap();
        assert_eq!(
            settings.textures.get(&TextureTarget::Front).map(String::as_str),
            Some("front.png")
        );
    }

    #[test]
    fn rejects_non_finite_rotations() {
        let args = RunArgs {
            rotations: Some(f64::NAN),
            ..RunArgs::default()
        };
        assert!(matches!(
            Settings::merge(args, None),
            Err(PipelineError::Config(_))
        ));
    }
}
