use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::debug;

use crate::path::PathResolver;

/// A named surface of the model that can receive its own texture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TextureTarget {
    #[default]
    Front,
    Back,
    Background,
}

impl TextureTarget {
    pub const ALL: [TextureTarget; 3] = [Self::Front, Self::Back, Self::Background];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Front => "front",
            Self::Back => "back",
            Self::Background => "background",
        }
    }

    /// Renderer flag carrying the texture for this target.
    pub fn flag(self) -> &'static str {
        match self {
            Self::Front => "--texture_front",
            Self::Back => "--texture_back",
            Self::Background => "--texture_background",
        }
    }
}

impl fmt::Display for TextureTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown texture target '{0}'; expected front, back, or background")]
pub struct UnknownTarget(pub String);

impl FromStr for TextureTarget {
    type Err = UnknownTarget;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "front" => Ok(Self::Front),
            "back" => Ok(Self::Back),
            "background" => Ok(Self::Background),
            _ => Err(UnknownTarget(value.to_string())),
        }
    }
}

/// Final texture per target. Iterates in front, back, background order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextureAssignment {
    entries: BTreeMap<TextureTarget, PathBuf>,
}

impl TextureAssignment {
    pub fn get(&self, target: TextureTarget) -> Option<&Path> {
        self.entries.get(&target).map(PathBuf::as_path)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TextureTarget, &Path)> {
        self.entries
            .iter()
            .map(|(target, path)| (*target, path.as_path()))
    }
}

/// The deprecated single-texture channel, forwarded to the renderer as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTexture {
    pub path: PathBuf,
    pub target: TextureTarget,
}

/// Unresolved texture inputs collected from flags, the job file and generation.
#[derive(Debug, Clone, Default)]
pub struct TextureSources {
    pub legacy: Option<String>,
    pub legacy_target: TextureTarget,
    pub explicit: BTreeMap<TextureTarget, String>,
    pub generated: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedTextures {
    pub legacy: Option<LegacyTexture>,
    pub assignment: TextureAssignment,
}

impl ResolvedTextures {
    pub fn is_empty(&self) -> bool {
        self.legacy.is_none() && self.assignment.is_empty()
    }
}

/// Applies target precedence: explicit flag, then the generated texture when the
/// legacy selector names the target, then nothing.
pub fn resolve_textures(sources: &TextureSources, paths: &PathResolver) -> ResolvedTextures {
    let mut assignment = TextureAssignment::default();

    for target in TextureTarget::ALL {
        let explicit = sources
            .explicit
            .get(&target)
            .and_then(|raw| paths.resolve(target.as_str(), raw));

        let chosen = match explicit {
            Some(path) => Some(path),
            None if sources.legacy_target == target => sources.generated.clone(),
            None => None,
        };

        if let Some(path) = chosen {
            debug!(%target, path = %path.display(), "assigned texture");
            assignment.entries.insert(target, path);
        }
    }

    if let (Some(generated), Some(explicit)) = (
        sources.generated.as_ref(),
        assignment.get(sources.legacy_target),
    ) {
        if explicit != generated.as_path() {
            debug!(
                target = %sources.legacy_target,
                generated = %generated.display(),
                "explicit texture overrides generated texture"
            );
        }
    }

    let legacy = sources
        .legacy
        .as_deref()
        .and_then(|raw| paths.resolve("texture", raw))
        .map(|path| LegacyTexture {
            path,
            target: sources.legacy_target,
        });

    ResolvedTextures { legacy, assignment }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> PathResolver {
        PathResolver::with_cwd("/work")
    }

    #[test]
    fn parses_target_names() {
        assert_eq!("front".parse::<TextureTarget>(), Ok(TextureTarget::Front));
        assert_eq!(" BACK ".parse::<TextureTarget>(), Ok(TextureTarget::Back));
        assert_eq!(
            "background".parse::<TextureTarget>(),
            Ok(TextureTarget::Background)
        );
        assert!("side".parse::<TextureTarget>().is_err());
        assert_eq!(TextureTarget::default(), TextureTarget::Front);
    }

    #[test]
    fn nothing_supplied_resolves_to_nothing() {
        let resolved = resolve_textures(&TextureSources::default(), &resolver());
        assert!(resolved.assignment.is_empty());
        assert!(resolved.legacy.is_none());
        assert!(resolved.is_empty());
    }

    #[test]
    fn explicit_texture_beats_generated_for_every_target() {
        for target in TextureTarget::ALL {
            let mut explicit = BTreeMap::new();
            explicit.insert(target, "explicit.png".to_string());
            let sources = TextureSources {
                legacy: None,
                legacy_target: target,
                explicit,
                generated: Some(PathBuf::from("/tmp/generated.png")),
            };
            let resolved = resolve_textures(&sources, &resolver());
            assert_eq!(
                resolved.assignment.get(target),
                Some(Path::new("/work/explicit.png")),
                "target {target}"
            );
            assert_eq!(resolved.assignment.len(), 1);
        }
    }

    #[test]
    fn generated_texture_follows_legacy_selector() {
        let sources = TextureSources {
            legacy_target: TextureTarget::Back,
            generated: Some(PathBuf::from("/tmp/generated.png")),
            ..TextureSources::default()
        };
        let resolved = resolve_textures(&sources, &resolver());
        assert_eq!(
            resolved.assignment.get(TextureTarget::Back),
            Some(Path::new("/tmp/generated.png"))
        );
        assert_eq!(resolved.assignment.get(TextureTarget::Front), None);
        assert_eq!(resolved.assignment.get(TextureTarget::Background), None);
        assert!(resolved.legacy.is_none());
    }

    #[test]
    fn generated_texture_fills_selector_while_other_targets_stay_explicit() {
        let mut explicit = BTreeMap::new();
        explicit.insert(TextureTarget::Background, "/studio/bg.jpg".to_string());
        let sources = TextureSources {
            legacy: None,
            legacy_target: TextureTarget::Front,
            explicit,
            generated: Some(PathBuf::from("/tmp/generated.png")),
        };
        let resolved = resolve_textures(&sources, &resolver());
        let entries: Vec<_> = resolved.assignment.iter().collect();
        assert_eq!(
            entries,
            vec![
                (TextureTarget::Front, Path::new("/tmp/generated.png")),
                (TextureTarget::Background, Path::new("/studio/bg.jpg")),
            ]
        );
    }

    #[test]
    fn legacy_channel_is_kept_separate() {
        let sources = TextureSources {
            legacy: Some("legacy.png".into()),
            legacy_target: TextureTarget::Back,
            ..TextureSources::default()
        };
        let resolved = resolve_textures(&sources, &resolver());
        assert_eq!(
            resolved.legacy,
            Some(LegacyTexture {
                path: PathBuf::from("/work/legacy.png"),
                target: TextureTarget::Back,
            })
        );
        assert!(resolved.assignment.is_empty());
    }

    #[test]
    fn blank_inputs_are_treated_as_absent() {
        let mut explicit = BTreeMap::new();
        explicit.insert(TextureTarget::Front, "  ".to_string());
        let sources = TextureSources {
            legacy: Some(String::new()),
            legacy_target: TextureTarget::Front,
            explicit,
            generated: Some(PathBuf::from("/tmp/generated.png")),
        };
        let resolved = resolve_textures(&sources, &resolver());
        assert!(resolved.legacy.is_none());
        assert_eq!(
            resolved.assignment.get(TextureTarget::Front),
            Some(Path::new("/tmp/generated.png"))
        );
    }
}
