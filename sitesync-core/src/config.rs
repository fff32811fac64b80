//! YAML configuration at `~/.sitesync/config.yaml`.
//!
//! # API pattern
//!
//! Every function has two forms:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`
//!
//! Tests must NEVER call the no-arg wrappers; always use `_at`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};
use crate::manifest::TemplateManifest;
use crate::types::RepoSlug;

/// Everything sitesync needs to know about the user's fork and its template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// The user's repository (the fork that receives content and updates).
    pub repository: RepoSlug,
    #[serde(default = "default_branch")]
    pub default_branch: String,
    /// Folder in the remote repository mirroring the local content set.
    #[serde(default = "default_content_dir")]
    pub content_dir: String,
    /// Local folder holding the authored content units.
    pub local_content_dir: PathBuf,
    /// File extensions (without dot) that count as content. Empty = all files.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Upstream template the repository was forked from.
    pub template: RepoSlug,
    /// Branch of the template that releases are cut from.
    #[serde(default = "default_branch")]
    pub template_branch: String,
    #[serde(default = "default_branch_prefix")]
    pub branch_prefix: String,
    /// Name of the environment variable holding the API token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Replaces the built-in template manifest when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<TemplateManifest>,
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_content_dir() -> String {
    "src/site/notes".to_string()
}

fn default_extensions() -> Vec<String> {
    vec!["md".to_string()]
}

fn default_branch_prefix() -> String {
    "update-template-to-v".to_string()
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

impl Config {
    /// A config with every optional field at its default.
    pub fn new(repository: RepoSlug, template: RepoSlug, local_content_dir: PathBuf) -> Self {
        Self {
            repository,
            default_branch: default_branch(),
            content_dir: default_content_dir(),
            local_content_dir,
            extensions: default_extensions(),
            template,
            template_branch: default_branch(),
            branch_prefix: default_branch_prefix(),
            token_env: default_token_env(),
            api_base: default_api_base(),
            manifest: None,
        }
    }

    /// The effective manifest: the override if configured, else the built-in one.
    pub fn manifest(&self) -> TemplateManifest {
        self.manifest.clone().unwrap_or_default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_branch.trim().is_empty() {
            return Err(ConfigError::Invalid("default_branch must not be empty".into()));
        }
        if self.template_branch.trim().is_empty() {
            return Err(ConfigError::Invalid("template_branch must not be empty".into()));
        }
        if self.branch_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid("branch_prefix must not be empty".into()));
        }
        if self.token_env.trim().is_empty() {
            return Err(ConfigError::Invalid("token_env must not be empty".into()));
        }
        if self.repository == self.template {
            return Err(ConfigError::Invalid(format!(
                "repository and template are both '{}'",
                self.repository
            )));
        }
        self.manifest().validate()
    }
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// `<home>/.sitesync/`: pure, no I/O.
pub fn state_dir_at(home: &Path) -> PathBuf {
    home.join(".sitesync")
}

/// `<home>/.sitesync/config.yaml`: pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    state_dir_at(home).join("config.yaml")
}

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

/// Load and validate the config.
///
/// Returns `ConfigError::NotFound` if absent, `ConfigError::Parse` (with the
/// file path) if the YAML is malformed.
pub fn load_at(home: &Path) -> Result<Config, ConfigError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Err(ConfigError::NotFound { path });
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    let config: Config =
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse { path, source: e })?;
    config.validate()?;
    Ok(config)
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Config, ConfigError> {
    load_at(&home()?)
}

/// Atomically save the config.
///
/// Write flow: serialize → `config.yaml.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_at(home: &Path, config: &Config) -> Result<(), ConfigError> {
    config.validate()?;
    let dir = state_dir_at(home);
    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        set_dir_permissions(&dir)?;
    }
    let path = config_path_at(home);
    let tmp_path = path.with_file_name("config.yaml.tmp");

    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp_path, yaml).map_err(|e| io_err(&tmp_path, e))?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, &path).map_err(|e| io_err(&path, e))?;
    Ok(())
}

/// `save_at` convenience wrapper.
pub fn save(config: &Config) -> Result<(), ConfigError> {
    save_at(&home()?, config)
}

/// Write `config` unless a config already exists.
///
/// Idempotent: an existing config is loaded and returned unchanged unless
/// `force` is set.
pub fn init_at(home: &Path, config: Config, force: bool) -> Result<Config, ConfigError> {
    if config_path_at(home).exists() && !force {
        return load_at(home);
    }
    save_at(home, &config)?;
    Ok(config)
}

/// `init_at` convenience wrapper.
pub fn init(config: Config, force: bool) -> Result<Config, ConfigError> {
    init_at(&home()?, config, force)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub(crate) fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

#[cfg(unix)]
pub(crate) fn set_dir_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
pub(crate) fn set_dir_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

#[cfg(unix)]
pub(crate) fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
pub(crate) fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
