use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Render target names accepted in `texture_target` and the `[textures]` table.
pub const TARGET_NAMES: [&str; 3] = ["front", "back", "background"];

const SUPPORTED_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read job file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse job file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid job file: {0}")]
    Invalid(String),
}

/// Optional defaults for a render run, loaded from a TOML job file.
///
/// Every field mirrors a long CLI flag; flags given on the command line win.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct JobFile {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub blender: Option<String>,
    #[serde(default)]
    pub script: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub frames: Option<u32>,
    #[serde(default)]
    pub rotations: Option<f64>,
    #[serde(default)]
    pub texture: Option<String>,
    #[serde(default)]
    pub texture_target: Option<String>,
    #[serde(default)]
    pub generated_output: Option<String>,
    #[serde(default)]
    pub reference_image: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub proxy: Option<String>,
    #[serde(default)]
    pub aspect_ratio: Option<String>,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub textures: BTreeMap<String, String>,
}

impl Default for JobFile {
    fn default() -> Self {
        Self {
            version: SUPPORTED_VERSION,
            blender: None,
            script: None,
            project: None,
            model: None,
            output: None,
            frames: None,
            rotations: None,
            texture: None,
            texture_target: None,
            generated_output: None,
            reference_image: None,
            prompt: None,
            proxy: None,
            aspect_ratio: None,
            resolution: None,
            endpoint: None,
            textures: BTreeMap::new(),
        }
    }
}

fn default_version() -> u32 {
    SUPPORTED_VERSION
}

impl JobFile {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let mut raw: JobFile = toml::from_str(input)?;
        raw.validate()?;
        raw.normalize_texture_keys()?;
        Ok(raw)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Texture path configured for `target` in the `[textures]` table.
    pub fn texture_for(&self, target: &str) -> Option<&str> {
        self.textures
            .get(&normalize_target_name(target))
            .map(String::as_str)
    }

    /// Rewrites `[textures]` keys to their canonical lowercase names.
    ///
    /// Two keys naming the same target (`front` and `Front`) are rejected.
    fn normalize_texture_keys(&mut self) -> Result<(), ConfigError> {
        let mut normalized = BTreeMap::new();
        for (key, path) in std::mem::take(&mut self.textures) {
            let name = normalize_target_name(&key);
            if normalized.contains_key(&name) {
                return Err(ConfigError::Invalid(format!(
                    "texture target '{name}' is listed more than once in [textures]"
                )));
            }
            normalized.insert(name, path);
        }
        self.textures = normalized;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != SUPPORTED_VERSION {
            return Err(ConfigError::Invalid(format!(
                "unsupported job file version {}; expected {SUPPORTED_VERSION}",
                self.version
            )));
        }

        if let Some(target) = &self.texture_target {
            validate_target_name(target)?;
        }

        for target in self.textures.keys() {
            validate_target_name(target)?;
        }

        if let Some(rotations) = self.rotations {
            if !rotations.is_finite() {
                return Err(ConfigError::Invalid(
                    "rotations must be a finite number".into(),
                ));
            }
        }

        if let Some(prompt) = &self.prompt {
            if prompt.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "prompt may not be blank; omit the key instead".into(),
                ));
            }
        }

        Ok(())
    }
}

fn normalize_target_name(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

fn validate_target_name(name: &str) -> Result<(), ConfigError> {
    let normalized = normalize_target_name(name);
    if TARGET_NAMES.contains(&normalized.as_str()) {
        return Ok(());
    }
    Err(ConfigError::Invalid(format!(
        "texture target '{name}' is invalid; expected one of {}",
        TARGET_NAMES.join(", ")
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
version = 1
blender = "/opt/blender/blender"
model = "models/chair.glb"
output = "renders/chair.mp4"
frames = 120
rotations = 2.5
texture_target = "back"
prompt = "weathered oak veneer"
aspect_ratio = "16:9"
resolution = "2K"

[textures]
front = "textures/front.png"
background = "textures/studio.jpg"
"#;

    #[test]
    fn parses_sample_job_file() {
        let job = JobFile::from_toml_str(SAMPLE).expect("parse job file");
        assert_eq!(job.version, 1);
        assert_eq!(job.frames, Some(120));
        assert_eq!(job.rotations, Some(2.5));
        assert_eq!(job.texture_target.as_deref(), Some("back"));
        assert_eq!(job.texture_for("front"), Some("textures/front.png"));
        assert_eq!(job.texture_for("back"), None);
    }

    #[test]
    fn empty_file_uses_defaults() {
        let job = JobFile::from_toml_str("").expect("parse empty job file");
        assert_eq!(job.version, 1);
        assert!(job.textures.is_empty());
        assert!(job.prompt.is_none());
    }

    #[test]
    fn rejects_unknown_texture_target() {
        let err = JobFile::from_toml_str(
            r#"
[textures]
side = "side.png"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(err.to_string().contains("side"));
    }

    #[test]
    fn texture_keys_are_case_insensitive() {
        let job = JobFile::from_toml_str(
            r#"
[textures]
Front = "front.png"
" BACK " = "back.png"
"#,
        )
        .expect("parse mixed-case keys");
        assert_eq!(job.texture_for("front"), Some("front.png"));
        assert_eq!(job.texture_for("back"), Some("back.png"));
        assert_eq!(
            job.textures.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["back", "front"]
        );
    }

    #[test]
    fn rejects_duplicate_texture_keys_after_normalizing() {
        let err = JobFile::from_toml_str(
            r#"
[textures]
front = "a.png"
Front = "b.png"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn rejects_unsupported_version() {
        let err = JobFile::from_toml_str("version = 2").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = JobFile::from_toml_str("durationn = 5").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_blank_prompt() {
        let err = JobFile::from_toml_str("prompt = \"   \"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn load_reports_missing_file() {
        let temp = tempfile::tempdir().unwrap();
        let err = JobFile::load(&temp.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
