//! Turns user-supplied paths into absolute ones before they are handed to the
//! renderer, whose working directory may differ from ours.
//!
//! Types:
//!
//! - `PathResolver` remembers the orchestrator's working directory and performs
//!   `$VAR`/`~` expansion followed by absolutisation.
//! - `PathError` describes why a strict resolution failed.
//!
//! Functions:
//!
//! - `PathResolver::absolutize` is the strict form used by tests and diagnostics.
//! - `PathResolver::resolve` is the lenient form used by the pipeline: empty input
//!   stays unset and failures fall back to the original string with a warning.
use std::env;
use std::path::{Path, PathBuf};

use directories_next::BaseDirs;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PathError {
    #[error("working directory is unavailable")]
    NoWorkingDirectory,
    #[error("environment variable '{0}' is not set")]
    UnsetVariable(String),
    #[error("missing closing '}}' in environment variable reference")]
    UnclosedBrace,
    #[error("environment variable name must not be empty")]
    EmptyVariableName,
    #[error("unable to determine home directory for '~' expansion")]
    HomeUnavailable,
    #[error("user-specific home expansion ('{0}') is not supported")]
    UnsupportedHome(String),
}

#[derive(Debug, Clone)]
pub struct PathResolver {
    cwd: Option<PathBuf>,
}

impl PathResolver {
    /// Captures the current working directory. Failure is remembered, not fatal.
    pub fn new() -> Self {
        match env::current_dir() {
            Ok(cwd) => Self { cwd: Some(cwd) },
            Err(err) => {
                warn!(%err, "failed to resolve current working directory; relative paths will be passed through");
                Self { cwd: None }
            }
        }
    }

    pub fn with_cwd<P: Into<PathBuf>>(cwd: P) -> Self {
        Self {
            cwd: Some(cwd.into()),
        }
    }

    pub fn cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    pub fn absolutize(&self, input: &str) -> Result<PathBuf, PathError> {
        let expanded = expand_home(&expand_env_vars(input)?)?;
        let path = PathBuf::from(expanded);
        if path.is_absolute() {
            return Ok(path);
        }
        let cwd = self.cwd.as_ref().ok_or(PathError::NoWorkingDirectory)?;
        Ok(cwd.join(path))
    }

    /// Lenient resolution: `None` for empty input, the original string when resolution fails.
    pub fn resolve(&self, label: &str, input: &str) -> Option<PathBuf> {
        if input.trim().is_empty() {
            return None;
        }
        match self.absolutize(input) {
            Ok(path) => {
                debug!(label, original = %input, resolved = %path.display(), "resolved path");
                Some(path)
            }
            Err(err) => {
                warn!(label, original = %input, %err, "could not resolve absolute path; using it as given");
                Some(PathBuf::from(input))
            }
        }
    }
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn expand_home(input: &str) -> Result<String, PathError> {
    if !input.starts_with('~') {
        return Ok(input.to_string());
    }

    let base_dirs = BaseDirs::new().ok_or(PathError::HomeUnavailable)?;
    let home_dir = base_dirs.home_dir();

    if input == "~" {
        return Ok(home_dir.to_string_lossy().into_owned());
    }

    if let Some(rest) = input.strip_prefix("~/") {
        return Ok(home_dir.join(rest).to_string_lossy().into_owned());
    }

    Err(PathError::UnsupportedHome(input.to_string()))
}

fn expand_env_vars(input: &str) -> Result<String, PathError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            output.push(ch);
            continue;
        }

        match chars.peek() {
            Some('{') => {
                chars.next();
                let mut name = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    name.push(c);
                }
                if !closed {
                    return Err(PathError::UnclosedBrace);
                }
                if name.is_empty() {
                    return Err(PathError::EmptyVariableName);
                }
                output.push_str(&lookup(&name)?);
            }
            Some(&c) if is_env_name_char(c) => {
                let mut name = String::new();
                while let Some(&c) = chars.peek() {
                    if !is_env_name_char(c) {
                        break;
                    }
                    name.push(c);
                    chars.next();
                }
                output.push_str(&lookup(&name)?);
            }
            _ => output.push('$'),
        }
    }

    Ok(output)
}

fn lookup(name: &str) -> Result<String, PathError> {
    env::var(name).map_err(|_| PathError::UnsetVariable(name.to_string()))
}

fn is_env_name_char(ch: char) -> bool {
    ch == '_' || ch.is_ascii_alphanumeric()
}
