//! Precedence resolution for console settings.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. Environment variables (`VENOM_HISTORY_PATH`, `VENOM_CHAT_TOKEN`,
//!    `NO_COLOR`)
//! 2. config.kdl / state.kdl
//! 3. Built-in defaults
//!
//! Loading never fails: a file that cannot be read or parsed is reported as
//! a warning and the defaults are used in its place.

use std::fs;
use std::path::{Path, PathBuf};

use kdl::KdlDocument;

use crate::config::schema::{ColorMode, ConsoleConfig, ConsoleState, mask_token};
use crate::history::default_history_path;
use crate::{Error, Result};

/// Directory holding both config.kdl and state.kdl, overriding the
/// platform locations.
pub const CONFIG_DIR_ENV: &str = "VENOM_CONFIG_DIR";
/// History file override.
pub const HISTORY_PATH_ENV: &str = "VENOM_HISTORY_PATH";
/// Chat bearer token override.
pub const CHAT_TOKEN_ENV: &str = "VENOM_CHAT_TOKEN";
/// Any non-empty value disables color.
pub const NO_COLOR_ENV: &str = "NO_COLOR";

pub const CONFIG_FILE_NAME: &str = "config.kdl";
pub const STATE_FILE_NAME: &str = "state.kdl";

pub const DEFAULT_PROMPT_LABEL: &str = "venom.console >";
pub const DEFAULT_CHAT_ENDPOINT: &str = "https://router.huggingface.co/v1/chat/completions";
pub const DEFAULT_CHAT_MODEL: &str = "MiniMaxAI/MiniMax-M2";

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from environment variable
    EnvVar(String),
    /// Value from config.kdl
    ConfigFile,
    /// Value from state.kdl
    StateFile,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::ConfigFile => write!(f, "config"),
            ValueSource::StateFile => write!(f, "state"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<T> {
    /// The resolved value
    pub value: T,
    /// Where the value came from
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    /// Create a new resolved value.
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }

    fn default_value(value: T) -> Self {
        Self::new(value, ValueSource::Default)
    }
}

/// Fully resolved settings with source tracking.
#[derive(Debug, Clone)]
pub struct Settings {
    pub prompt_label: Resolved<String>,
    pub history_path: Resolved<PathBuf>,
    pub color: Resolved<ColorMode>,
    pub chat_endpoint: Resolved<String>,
    pub chat_model: Resolved<String>,
    pub chat_token: Option<Resolved<String>>,
    /// Problems found while loading, shown once at startup.
    pub warnings: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            prompt_label: Resolved::default_value(DEFAULT_PROMPT_LABEL.to_string()),
            history_path: Resolved::default_value(default_history_path()),
            color: Resolved::default_value(ColorMode::Auto),
            chat_endpoint: Resolved::default_value(DEFAULT_CHAT_ENDPOINT.to_string()),
            chat_model: Resolved::default_value(DEFAULT_CHAT_MODEL.to_string()),
            chat_token: None,
            warnings: Vec::new(),
        }
    }
}

impl Settings {
    pub fn prompt_label(&self) -> &str {
        &self.prompt_label.value
    }

    pub fn history_path(&self) -> &Path {
        &self.history_path.value
    }

    pub fn color(&self) -> ColorMode {
        self.color.value
    }

    pub fn chat_endpoint(&self) -> &str {
        &self.chat_endpoint.value
    }

    pub fn chat_model(&self) -> &str {
        &self.chat_model.value
    }

    /// Chat token, if one is configured.
    pub fn chat_token(&self) -> Option<&str> {
        self.chat_token.as_ref().map(|r| r.value.as_str())
    }

    /// Chat token for display.
    pub fn masked_token(&self) -> Option<String> {
        self.chat_token().map(mask_token)
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

/// Locations of the two settings files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigPaths {
    pub config_file: Option<PathBuf>,
    pub state_file: Option<PathBuf>,
}

impl ConfigPaths {
    /// Resolve file locations, honoring `VENOM_CONFIG_DIR`.
    pub fn from_env(env: &impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = env(CONFIG_DIR_ENV) {
            let dir = PathBuf::from(dir);
            return Self {
                config_file: Some(dir.join(CONFIG_FILE_NAME)),
                state_file: Some(dir.join(STATE_FILE_NAME)),
            };
        }
        Self {
            config_file: dirs::config_dir().map(|d| d.join("venom").join(CONFIG_FILE_NAME)),
            state_file: dirs::data_local_dir().map(|d| d.join("venom").join(STATE_FILE_NAME)),
        }
    }
}

/// Read and parse a KDL file. A missing file is an empty document.
fn read_kdl(path: &Path) -> Result<KdlDocument> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(KdlDocument::new()),
        Err(e) => {
            return Err(Error::Config(format!(
                "cannot read {}: {}",
                path.display(),
                e
            )));
        }
    };
    text.parse::<KdlDocument>()
        .map_err(|e| Error::Config(format!("cannot parse {}: {}", path.display(), e)))
}

/// Load config.kdl; missing is not an error.
pub fn load_config(path: &Path) -> Result<ConsoleConfig> {
    let config = ConsoleConfig::from_kdl(&read_kdl(path)?);
    config
        .validate()
        .map_err(|msg| Error::Config(format!("{}: {}", path.display(), msg)))?;
    Ok(config)
}

/// Load state.kdl; missing is not an error.
pub fn load_state(path: &Path) -> Result<ConsoleState> {
    Ok(ConsoleState::from_kdl(&read_kdl(path)?))
}

/// Warning text when state.kdl is readable by anyone but its owner.
#[cfg(unix)]
pub fn state_permission_warning(path: &Path) -> Option<String> {
    use crate::config::schema::STATE_FILE_MODE;
    use std::os::unix::fs::PermissionsExt;

    let mode = fs::metadata(path).ok()?.permissions().mode() & 0o777;
    if mode & !STATE_FILE_MODE != 0 {
        Some(format!(
            "{} has permissions {:o}; it holds secrets and should be {:o}",
            path.display(),
            mode,
            STATE_FILE_MODE
        ))
    } else {
        None
    }
}

#[cfg(not(unix))]
pub fn state_permission_warning(_path: &Path) -> Option<String> {
    None
}

/// Merge file contents and environment into settings.
///
/// `env` looks up a variable; empty values count as unset.
pub fn resolve(
    config: &ConsoleConfig,
    state: &ConsoleState,
    env: &impl Fn(&str) -> Option<String>,
) -> Settings {
    let mut settings = Settings::default();

    if let Some(ref label) = config.prompt_label {
        settings.prompt_label = Resolved::new(label.clone(), ValueSource::ConfigFile);
    }

    if let Some(path) = env(HISTORY_PATH_ENV) {
        settings.history_path = Resolved::new(
            PathBuf::from(path),
            ValueSource::EnvVar(HISTORY_PATH_ENV.to_string()),
        );
    } else if let Some(ref path) = config.history_path {
        settings.history_path = Resolved::new(PathBuf::from(path), ValueSource::ConfigFile);
    }

    if env(NO_COLOR_ENV).is_some() {
        settings.color = Resolved::new(
            ColorMode::Never,
            ValueSource::EnvVar(NO_COLOR_ENV.to_string()),
        );
    } else if let Some(mode) = config.color {
        settings.color = Resolved::new(mode, ValueSource::ConfigFile);
    }

    if let Some(ref endpoint) = config.chat_endpoint {
        settings.chat_endpoint = Resolved::new(endpoint.clone(), ValueSource::ConfigFile);
    }
    if let Some(ref model) = config.chat_model {
        settings.chat_model = Resolved::new(model.clone(), ValueSource::ConfigFile);
    }

    if let Some(token) = env(CHAT_TOKEN_ENV) {
        settings.chat_token = Some(Resolved::new(
            token,
            ValueSource::EnvVar(CHAT_TOKEN_ENV.to_string()),
        ));
    } else if let Some(ref token) = state.chat_token {
        settings.chat_token = Some(Resolved::new(token.clone(), ValueSource::StateFile));
    }

    settings
}

/// Load settings from the process environment and the settings files.
pub fn load_settings() -> Settings {
    load_settings_with(&|name: &str| {
        std::env::var(name).ok().filter(|value| !value.is_empty())
    })
}

/// Load settings using `env` for variable lookup.
pub fn load_settings_with(env: &impl Fn(&str) -> Option<String>) -> Settings {
    let paths = ConfigPaths::from_env(env);
    let mut warnings = Vec::new();

    let config = match paths.config_file.as_deref().map(load_config) {
        Some(Ok(config)) => config,
        Some(Err(e)) => {
            tracing::warn!("{}", e);
            warnings.push(format!("{}; using defaults", e));
            ConsoleConfig::default()
        }
        None => ConsoleConfig::default(),
    };

    let state = match paths.state_file.as_deref() {
        Some(path) => {
            if let Some(warning) = state_permission_warning(path) {
                warnings.push(warning);
            }
            load_state(path).unwrap_or_else(|e| {
                tracing::warn!("{}", e);
                warnings.push(format!("{}; chat token not loaded", e));
                ConsoleState::default()
            })
        }
        None => ConsoleState::default(),
    };

    let mut settings = resolve(&config, &state, env);
    settings.warnings = warnings;
    tracing::debug!(
        history = %settings.history_path().display(),
        history_source = %settings.history_path.source,
        color = %settings.color(),
        token = ?settings.masked_token(),
        "settings resolved"
    );
    settings
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = resolve(
            &ConsoleConfig::default(),
            &ConsoleState::default(),
            &env_from(&[]),
        );
        assert_eq!(settings.prompt_label(), "venom.console >");
        assert_eq!(settings.color(), ColorMode::Auto);
        assert_eq!(settings.chat_endpoint(), DEFAULT_CHAT_ENDPOINT);
        assert_eq!(settings.chat_model(), DEFAULT_CHAT_MODEL);
        assert_eq!(settings.chat_token(), None);
        assert_eq!(settings.history_path.source, ValueSource::Default);
        assert!(settings.history_path().ends_with("venom_history.txt"));
    }

    #[test]
    fn test_file_values_beat_defaults() {
        let config = ConsoleConfig {
            prompt_label: Some("lab >".to_string()),
            history_path: Some("/var/tmp/h.txt".to_string()),
            color: Some(ColorMode::Always),
            ..Default::default()
        };
        let state = ConsoleState {
            chat_token: Some("from-state-file".to_string()),
        };
        let settings = resolve(&config, &state, &env_from(&[]));
        assert_eq!(settings.prompt_label(), "lab >");
        assert_eq!(settings.history_path(), Path::new("/var/tmp/h.txt"));
        assert_eq!(settings.history_path.source, ValueSource::ConfigFile);
        assert_eq!(settings.color(), ColorMode::Always);
        assert_eq!(settings.chat_token(), Some("from-state-file"));
        assert_eq!(
            settings.chat_token.as_ref().unwrap().source,
            ValueSource::StateFile
        );
    }

    #[test]
    fn test_env_beats_files() {
        let config = ConsoleConfig {
            history_path: Some("/var/tmp/h.txt".to_string()),
            color: Some(ColorMode::Always),
            ..Default::default()
        };
        let state = ConsoleState {
            chat_token: Some("from-state-file".to_string()),
        };
        let env = env_from(&[
            (HISTORY_PATH_ENV, "/elsewhere/h.txt"),
            (CHAT_TOKEN_ENV, "from-env"),
            (NO_COLOR_ENV, "1"),
        ]);
        let settings = resolve(&config, &state, &env);
        assert_eq!(settings.history_path(), Path::new("/elsewhere/h.txt"));
        assert_eq!(
            settings.history_path.source,
            ValueSource::EnvVar(HISTORY_PATH_ENV.to_string())
        );
        assert_eq!(settings.chat_token(), Some("from-env"));
        assert_eq!(settings.color(), ColorMode::Never);
    }

    #[test]
    fn test_value_source_display() {
        assert_eq!(
            ValueSource::EnvVar("NO_COLOR".to_string()).to_string(),
            "env:NO_COLOR"
        );
        assert_eq!(ValueSource::ConfigFile.to_string(), "config");
        assert_eq!(ValueSource::Default.to_string(), "default");
    }

    #[test]
    fn test_config_dir_override() {
        let env = env_from(&[(CONFIG_DIR_ENV, "/opt/venom")]);
        let paths = ConfigPaths::from_env(&env);
        assert_eq!(
            paths.config_file,
            Some(PathBuf::from("/opt/venom").join(CONFIG_FILE_NAME))
        );
        assert_eq!(
            paths.state_file,
            Some(PathBuf::from("/opt/venom").join(STATE_FILE_NAME))
        );
    }

    #[test]
    fn test_load_settings_from_files() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "prompt-label \"test >\"\ncolor \"never\"\n",
        )
        .unwrap();
        fs::write(dir.path().join(STATE_FILE_NAME), "chat-token \"abcd1234efgh5678\"\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(
                dir.path().join(STATE_FILE_NAME),
                fs::Permissions::from_mode(0o600),
            )
            .unwrap();
        }

        let dir_str = dir.path().to_string_lossy().to_string();
        let settings = load_settings_with(&env_from(&[(CONFIG_DIR_ENV, dir_str.as_str())]));
        assert_eq!(settings.prompt_label(), "test >");
        assert_eq!(settings.color(), ColorMode::Never);
        assert_eq!(settings.masked_token().as_deref(), Some("abcd...5678"));
        assert!(settings.warnings().is_empty(), "{:?}", settings.warnings());
    }

    #[test]
    fn test_malformed_config_falls_back_with_warning() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "prompt-label \"unterminated\n").unwrap();

        let dir_str = dir.path().to_string_lossy().to_string();
        let settings = load_settings_with(&env_from(&[(CONFIG_DIR_ENV, dir_str.as_str())]));
        assert_eq!(settings.prompt_label(), DEFAULT_PROMPT_LABEL);
        assert_eq!(settings.warnings().len(), 1);
        assert!(settings.warnings()[0].contains("config.kdl"));
    }

    #[test]
    fn test_missing_files_are_fine() {
        let dir = TempDir::new().unwrap();
        let dir_str = dir.path().to_string_lossy().to_string();
        let settings = load_settings_with(&env_from(&[(CONFIG_DIR_ENV, dir_str.as_str())]));
        assert_eq!(settings.prompt_label(), DEFAULT_PROMPT_LABEL);
        assert!(settings.warnings().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_state_permission_warning() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join(STATE_FILE_NAME);
        fs::write(&path, "chat-token \"x\"\n").unwrap();

        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
        assert!(state_permission_warning(&path).unwrap().contains("644"));

        fs::set_permissions(&path, fs::Permissions::from_mode(0o600)).unwrap();
        assert!(state_permission_warning(&path).is_none());
    }
}
