use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use crate::targets::{LegacyTexture, TextureAssignment};

pub const DEFAULT_SCRIPT: &str = "render_script.py";
pub const DEFAULT_INSPECT_SCRIPT: &str = "inspect_settings.py";

/// Frame count that lets the render script pick its own length.
pub const AUTO_FRAMES: u32 = 0;
/// Rotation count that lets the render script pick its own turntable speed.
pub const AUTO_ROTATIONS: f64 = -1.0;

/// Everything needed to invoke the renderer once. Paths are already absolute.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderJobConfig {
    pub script: PathBuf,
    pub project: Option<PathBuf>,
    pub model: PathBuf,
    pub output: PathBuf,
    pub frames: u32,
    pub rotations: f64,
    pub aspect_ratio: String,
    pub resolution: String,
    pub legacy: Option<LegacyTexture>,
    pub textures: TextureAssignment,
}

impl RenderJobConfig {
    /// Arguments for the renderer, in the order the render script expects them.
    pub fn renderer_args(&self) -> Vec<OsString> {
        let mut args = Vec::new();

        if let Some(project) = &self.project {
            args.push(project.into());
        }
        push_script_prelude(&mut args, &self.script);

        push_pair(&mut args, "--input", &self.model);
        push_pair(&mut args, "--output", &self.output);
        push_pair(&mut args, "--frames", self.frames.to_string());
        push_pair(&mut args, "--rotations", format_rotations(self.rotations));

        if let Some(legacy) = &self.legacy {
            if !legacy.path.as_os_str().is_empty() {
                push_pair(&mut args, "--texture", &legacy.path);
                push_pair(&mut args, "--texture_target", legacy.target.as_str());
            }
        }

        for (target, path) in self.textures.iter() {
            if !path.as_os_str().is_empty() {
                push_pair(&mut args, target.flag(), path);
            }
        }

        if self.project.is_some() {
            args.push("--keep-scene".into());
        }

        args
    }
}

/// Arguments that run the settings inspection script against a `.blend` file.
pub fn inspect_args(script: &Path, blend: &Path) -> Vec<OsString> {
    let mut args = Vec::new();
    push_script_prelude(&mut args, script);
    args.push(blend.into());
    args
}

/// Fixed-point, locale-independent rendering of the rotation count.
///
/// Values that round to zero are printed unsigned.
pub fn format_rotations(rotations: f64) -> String {
    let text = format!("{rotations:.6}");
    match text.strip_prefix('-') {
        Some(magnitude) if magnitude.bytes().all(|b| b == b'0' || b == b'.') => {
            magnitude.to_string()
        }
        _ => text,
    }
}

/// Shell-style rendering of a command line, for logs only.
pub fn display_command(program: &Path, args: &[OsString]) -> String {
    std::iter::once(program.as_os_str())
        .chain(args.iter().map(OsString::as_os_str))
        .map(quote)
        .collect::<Vec<_>>()
        .join(" ")
}

fn push_script_prelude(args: &mut Vec<OsString>, script: &Path) {
    args.push("--background".into());
    args.push("--python".into());
    args.push(script.into());
    args.push("--".into());
}

fn push_pair(args: &mut Vec<OsString>, flag: &str, value: impl AsRef<OsStr>) {
    args.push(flag.into());
    args.push(value.as_ref().to_os_string());
}

fn quote(arg: &OsStr) -> String {
    let text = arg.to_string_lossy();
    let safe = !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=,+@%".contains(c));
    if safe {
        text.into_owned()
    } else {
        format!("'{}'", text.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::PathResolver;
    use crate::targets::{resolve_textures, TextureSources, TextureTarget};
    use std::collections::BTreeMap;

    fn base_job() -> RenderJobConfig {
        RenderJobConfig {
            script: PathBuf::from("/work/render_script.py"),
            project: None,
            model: PathBuf::from("/work/chair.glb"),
            output: PathBuf::from("/work/out.mp4"),
            frames: AUTO_FRAMES,
            rotations: AUTO_ROTATIONS,
            aspect_ratio: "1:1".into(),
            resolution: "1K".into(),
            legacy: None,
            textures: TextureAssignment::default(),
        }
    }

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn core_arguments_keep_auto_sentinels() {
        let args = strings(&base_job().renderer_args());
        assert_eq!(
            args,
            vec![
                "--background",
                "--python",
                "/work/render_script.py",
                "--",
                "--input",
                "/work/chair.glb",
                "--output",
                "/work/out.mp4",
                "--frames",
                "0",
                "--rotations",
                "-1.000000",
            ]
        );
    }

    #[test]
    fn rotations_are_fixed_point() {
        assert_eq!(format_rotations(2.0), "2.000000");
        assert_eq!(format_rotations(0.25), "0.250000");
        assert_eq!(format_rotations(1.0 / 3.0), "0.333333");
        assert_eq!(format_rotations(-1.0), "-1.000000");
    }

    #[test]
    fn negative_zero_rotations_print_unsigned() {
        assert_eq!(format_rotations(-0.0), "0.000000");
        assert_eq!(format_rotations(-0.0000001), "0.000000");
    }

    #[test]
    fn texture_arguments_follow_fixed_order() {
        let mut explicit = BTreeMap::new();
        explicit.insert(TextureTarget::Background, "/t/bg.png".to_string());
        explicit.insert(TextureTarget::Front, "/t/front.png".to_string());
        explicit.insert(TextureTarget::Back, "/t/back.png".to_string());
        let resolved = resolve_textures(
            &TextureSources {
                legacy: Some("/t/legacy.png".into()),
                legacy_target: TextureTarget::Back,
                explicit,
                generated: None,
            },
            &PathResolver::with_cwd("/work"),
        );

        let mut job = base_job();
        job.frames = 48;
        job.rotations = 1.5;
        job.legacy = resolved.legacy;
        job.textures = resolved.assignment;

        let args = strings(&job.renderer_args());
        assert_eq!(
            &args[8..],
            &[
                "--frames",
                "48",
                "--rotations",
                "1.500000",
                "--texture",
                "/t/legacy.png",
                "--texture_target",
                "back",
                "--texture_front",
                "/t/front.png",
                "--texture_back",
                "/t/back.png",
                "--texture_background",
                "/t/bg.png",
            ]
        );
    }

    #[test]
    fn generated_back_texture_only_emits_back_flag() {
        let resolved = resolve_textures(
            &TextureSources {
                legacy_target: TextureTarget::Back,
                generated: Some(PathBuf::from("/work/generated_texture.png")),
                ..TextureSources::default()
            },
            &PathResolver::with_cwd("/work"),
        );
        let mut job = base_job();
        job.legacy = resolved.legacy;
        job.textures = resolved.assignment;

        let args = strings(&job.renderer_args());
        let position = args.iter().position(|a| a == "--texture_back").unwrap();
        assert_eq!(args[position + 1], "/work/generated_texture.png");
        assert!(!args.iter().any(|a| a == "--texture_front"));
        assert!(!args.iter().any(|a| a == "--texture_background"));
        assert!(!args.iter().any(|a| a == "--texture"));
    }

    #[test]
    fn project_template_wraps_arguments() {
        let mut job = base_job();
        job.project = Some(PathBuf::from("/work/studio.blend"));
        let args = strings(&job.renderer_args());
        assert_eq!(args[0], "/work/studio.blend");
        assert_eq!(args[1], "--background");
        assert_eq!(args.last().map(String::as_str), Some("--keep-scene"));
    }

    #[test]
    fn inspect_arguments_pass_blend_after_separator() {
        let args = strings(&inspect_args(
            Path::new("/work/inspect_settings.py"),
            Path::new("/work/studio.blend"),
        ));
        assert_eq!(
            args,
            vec![
                "--background",
                "--python",
                "/work/inspect_settings.py",
                "--",
                "/work/studio.blend",
            ]
        );
    }

    #[test]
    fn display_command_quotes_unsafe_arguments() {
        let args = vec![
            OsString::from("--output"),
            OsString::from("/my renders/it's.mp4"),
        ];
        assert_eq!(
            display_command(Path::new("/usr/bin/blender"), &args),
            r"/usr/bin/blender --output '/my renders/it'\''s.mp4'"
        );
    }
}
