//! Layered configuration: CLI flags > environment > YAML file > defaults.
//!
//! File lookup: `ZIP2COMMIT_CONFIG`, then `<repo>/.zip2commit.yml`, then `~/.zip2commit.yml`.
//! Keys: `shell`, `toolset`, `color`. Unknown keys are rejected.

use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::color::{parse_color_mode, ColorMode};
use crate::errors::ArchiveError;

pub const ENV_CONFIG: &str = "ZIP2COMMIT_CONFIG";
pub const ENV_SHELL: &str = "ZIP2COMMIT_SHELL";
pub const ENV_TOOLSET: &str = "ZIP2COMMIT_TOOLSET";
pub const ENV_COLOR: &str = "ZIP2COMMIT_COLOR";
pub const CONFIG_FILE_NAME: &str = ".zip2commit.yml";

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolsetChoice {
    #[default]
    Auto,
    Native,
    Posix,
    #[value(name = "powershell")]
    PowerShell,
}

impl ToolsetChoice {
    pub fn parse(s: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(s.trim(), true).ok()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub shell: Option<PathBuf>,
    pub toolset: Option<ToolsetChoice>,
    pub color: Option<String>,
}

/// Values given on the command line; None means "not given".
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub shell: Option<PathBuf>,
    pub toolset: Option<ToolsetChoice>,
    pub color: Option<ColorMode>,
}

/// Effective settings for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Settings {
    pub shell: Option<PathBuf>,
    pub toolset: ToolsetChoice,
    #[serde(skip)]
    pub color: Option<ColorMode>,
    pub config_file: Option<PathBuf>,
}

/// Locate the config file. An explicit `ZIP2COMMIT_CONFIG` is returned even if missing.
pub fn config_path_with(
    repo: &Path,
    env: &dyn Fn(&str) -> Option<String>,
    home: Option<PathBuf>,
) -> Option<PathBuf> {
    if let Some(p) = env(ENV_CONFIG).map(|v| v.trim().to_string()) {
        if !p.is_empty() {
            return Some(PathBuf::from(p));
        }
    }
    let in_repo = repo.join(CONFIG_FILE_NAME);
    if in_repo.is_file() {
        return Some(in_repo);
    }
    home.map(|h| h.join(CONFIG_FILE_NAME)).filter(|p| p.is_file())
}

pub fn load_file(path: &Path) -> Result<FileConfig, ArchiveError> {
    let content = fs::read_to_string(path)
        .map_err(|e| ArchiveError::Config(format!("cannot read {}: {}", path.display(), e)))?;
    if content.trim().is_empty() {
        return Ok(FileConfig::default());
    }
    serde_yaml::from_str(&content)
        .map_err(|e| ArchiveError::Config(format!("cannot parse {}: {}", path.display(), e)))
}

/// Merge all layers. `env` stands in for `std::env::var` so tests stay hermetic.
pub fn resolve_settings_with(
    cli: &CliOverrides,
    repo: &Path,
    env: &dyn Fn(&str) -> Option<String>,
    home: Option<PathBuf>,
) -> Result<Settings, ArchiveError> {
    let config_file = config_path_with(repo, env, home);
    let file = match &config_file {
        Some(p) => load_file(p)?,
        None => FileConfig::default(),
    };
    let env_nonempty = |k: &str| env(k).filter(|v| !v.trim().is_empty());

    let env_toolset = match env_nonempty(ENV_TOOLSET) {
        Some(v) => Some(ToolsetChoice::parse(&v).ok_or_else(|| {
            ArchiveError::Config(format!(
                "{ENV_TOOLSET}={v}: expected one of auto, native, posix, powershell"
            ))
        })?),
        None => None,
    };
    let toolset = cli
        .toolset
        .or(env_toolset)
        .or(file.toolset)
        .unwrap_or_default();

    let shell = cli
        .shell
        .clone()
        .or_else(|| env_nonempty(ENV_SHELL).map(PathBuf::from))
        .or(file.shell);

    let file_color = match file.color.as_deref() {
        Some(v) => Some(parse_color_mode(v).ok_or_else(|| {
            ArchiveError::Config(format!("color: {v}: expected auto, always or never"))
        })?),
        None => None,
    };
    let color = cli
        .color
        .or_else(|| env_nonempty(ENV_COLOR).and_then(|v| parse_color_mode(&v)))
        .or(file_color);

    tracing::debug!(
        ?toolset,
        shell = ?shell,
        config = ?config_file,
        "settings resolved"
    );
    Ok(Settings {
        shell,
        toolset,
        color,
        config_file,
    })
}

pub fn resolve_settings(cli: &CliOverrides, repo: &Path) -> Result<Settings, ArchiveError> {
    resolve_settings_with(cli, repo, &|k| std::env::var(k).ok(), home::home_dir())
}
