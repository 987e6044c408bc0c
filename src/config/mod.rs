//! Configuration management for `plaintrack`.
//!
//! Configuration sources and precedence (highest wins):
//! 1. CLI overrides
//! 2. Environment variables (`PLAINTRACK_*`)
//! 3. Project config (.plaintrack/config.yaml)
//! 4. User config (~/.config/plaintrack/config.yaml)
//! 5. Defaults

use crate::error::{Result, TrackError};
use crate::storage::{CONTAINER_EXTENSION, WorkingArea};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the working-area directory.
pub const TRACKER_DIR: &str = ".plaintrack";
/// Default primary container name.
pub const DEFAULT_PRIMARY: &str = "issues.jsonl";
/// Default conflict ledger name.
pub const DEFAULT_LEDGER: &str = "conflicts.jsonl";
/// Environment variable that pins the working-area directory.
pub const DIR_ENV: &str = "PLAINTRACK_DIR";
const ENV_PREFIX: &str = "PLAINTRACK_";

/// Behaviour switches read once per invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Settings {
    /// Merge pending containers before every command except `merge`.
    pub auto_merge: bool,
}

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// The `.plaintrack` directory.
    pub dir: PathBuf,
    pub working_area: WorkingArea,
    pub settings: Settings,
    pub actor: String,
}

impl Config {
    /// Resolve configuration from a merged layer.
    ///
    /// # Errors
    ///
    /// Returns `TrackError::Config` for an invalid boolean, a container name
    /// without the `.jsonl` extension, or a ledger that is also the primary.
    pub fn from_layer(dir: &Path, layer: &ConfigLayer) -> Result<Self> {
        let auto_merge = match layer.get("auto-merge") {
            Some(value) => parse_bool(value).ok_or_else(|| {
                TrackError::Config(format!("Invalid boolean for auto-merge: {value}"))
            })?,
            None => false,
        };

        let primary = container_setting(layer, "primary", DEFAULT_PRIMARY)?;
        let ledger = container_setting(layer, "ledger", DEFAULT_LEDGER)?;
        if primary == ledger {
            return Err(TrackError::Config(format!(
                "Primary container and ledger are both {primary}"
            )));
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            working_area: WorkingArea::new(dir.join(primary), dir.join(ledger)),
            settings: Settings { auto_merge },
            actor: resolve_actor(layer),
        })
    }

    /// Discover the working area and load every layer.
    ///
    /// # Errors
    ///
    /// Returns an error if no working area is found or a config file is invalid.
    pub fn load(cli: &CliOverrides) -> Result<Self> {
        let dir = match &cli.dir {
            Some(dir) => dir.clone(),
            None => discover_tracker_dir(None)?,
        };
        let layer = load_config(&dir, cli)?;
        let config = Self::from_layer(&dir, &layer)?;

        tracing::debug!(
            dir = %config.dir.display(),
            primary = %config.working_area.primary.display(),
            auto_merge = config.settings.auto_merge,
            "Configuration loaded"
        );
        Ok(config)
    }
}

fn container_setting(layer: &ConfigLayer, key: &str, default: &str) -> Result<String> {
    let name = layer
        .get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .unwrap_or(default);
    let has_extension = Path::new(name)
        .extension()
        .is_some_and(|ext| ext == CONTAINER_EXTENSION);
    if !has_extension {
        return Err(TrackError::Config(format!(
            "{key} must name a .{CONTAINER_EXTENSION} file, got {name}"
        )));
    }
    Ok(name.to_string())
}

/// Discover the active `.plaintrack` directory.
///
/// Honors `PLAINTRACK_DIR` when set, otherwise walks up from `start` (or CWD).
///
/// # Errors
///
/// Returns `NotInitialized` if no directory is found, or an I/O error if the
/// CWD cannot be read.
pub fn discover_tracker_dir(start: Option<&Path>) -> Result<PathBuf> {
    let env_override = env::var(DIR_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from);
    discover_tracker_dir_with_env(start, env_override.as_deref())
}

fn discover_tracker_dir_with_env(start: Option<&Path>, env_override: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = env_override {
        if path.is_dir() {
            return Ok(path.to_path_buf());
        }
    }

    let mut current = match start {
        Some(path) => path.to_path_buf(),
        None => env::current_dir()?,
    };

    loop {
        let candidate = current.join(TRACKER_DIR);
        if candidate.is_dir() {
            return Ok(candidate);
        }

        if !current.pop() {
            break;
        }
    }

    Err(TrackError::NotInitialized)
}

/// One source of configuration values, keyed by normalized name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigLayer {
    pub values: HashMap<String, String>,
}

impl ConfigLayer {
    /// Merge another layer on top of this one (higher precedence wins).
    pub fn merge_from(&mut self, other: &Self) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// Merge multiple layers in precedence order (lowest to highest).
    #[must_use]
    pub fn merge_layers(layers: &[Self]) -> Self {
        let mut merged = Self::default();
        for layer in layers {
            merged.merge_from(layer);
        }
        merged
    }

    /// Look up a value by any spelling of its key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&String> {
        self.values.get(&normalize_key(key))
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(normalize_key(key), value.into());
    }

    /// Build a layer from a YAML file path. Missing files return empty config.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn from_yaml(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| TrackError::storage(path, e))?;
        let value: serde_yaml::Value = serde_yaml::from_str(&contents)?;
        Ok(layer_from_yaml_value(&value))
    }

    /// Build a layer from `PLAINTRACK_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_vars(env::vars())
    }

    fn from_env_vars(vars: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut layer = Self::default();
        for (key, value) in vars {
            if key == DIR_ENV {
                continue;
            }
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                layer.set(stripped, value);
            }
        }
        layer
    }
}

/// CLI overrides for config loading (optional).
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub dir: Option<PathBuf>,
    pub auto_merge: Option<bool>,
    pub actor: Option<String>,
}

impl CliOverrides {
    #[must_use]
    pub fn as_layer(&self) -> ConfigLayer {
        let mut layer = ConfigLayer::default();
        if let Some(auto_merge) = self.auto_merge {
            layer.set("auto-merge", auto_merge.to_string());
        }
        if let Some(actor) = &self.actor {
            layer.set("actor", actor.clone());
        }
        layer
    }
}

/// Load project config (.plaintrack/config.yaml).
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_project_config(tracker_dir: &Path) -> Result<ConfigLayer> {
    ConfigLayer::from_yaml(&tracker_dir.join("config.yaml"))
}

/// Load user config (~/.config/plaintrack/config.yaml).
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<ConfigLayer> {
    let Ok(home) = env::var("HOME") else {
        return Ok(ConfigLayer::default());
    };
    let path = Path::new(&home)
        .join(".config")
        .join("plaintrack")
        .join("config.yaml");
    ConfigLayer::from_yaml(&path)
}

/// Default config layer (lowest precedence).
#[must_use]
pub fn default_config_layer() -> ConfigLayer {
    let mut layer = ConfigLayer::default();
    layer.set("auto-merge", "false");
    layer.set("primary", DEFAULT_PRIMARY);
    layer.set("ledger", DEFAULT_LEDGER);
    layer
}

/// Load configuration with the full precedence order.
///
/// # Errors
///
/// Returns an error if any config file cannot be read or parsed.
pub fn load_config(tracker_dir: &Path, cli: &CliOverrides) -> Result<ConfigLayer> {
    let defaults = default_config_layer();
    let user = load_user_config()?;
    let project = load_project_config(tracker_dir)?;
    let env_layer = ConfigLayer::from_env();
    let cli_layer = cli.as_layer();

    Ok(ConfigLayer::merge_layers(&[
        defaults, user, project, env_layer, cli_layer,
    ]))
}

/// Resolve actor with fallback to USER and a safe default.
#[must_use]
pub fn resolve_actor(layer: &ConfigLayer) -> String {
    layer
        .get("actor")
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .or_else(|| env::var("USER").ok().map(|value| value.trim().to_string()))
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase().replace('_', "-")
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn layer_from_yaml_value(value: &serde_yaml::Value) -> ConfigLayer {
    let mut layer = ConfigLayer::default();
    let mut flat = HashMap::new();
    flatten_yaml(value, "", &mut flat);

    for (key, value) in flat {
        layer.set(&key, value);
    }

    layer
}

fn flatten_yaml(value: &serde_yaml::Value, prefix: &str, out: &mut HashMap<String, String>) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (key, value) in map {
                let Some(key_str) = key.as_str() else {
                    continue;
                };
                let next_prefix = if prefix.is_empty() {
                    key_str.to_string()
                } else {
                    format!("{prefix}.{key_str}")
                };
                flatten_yaml(value, &next_prefix, out);
            }
        }
        serde_yaml::Value::Sequence(values) => {
            let joined = values
                .iter()
                .filter_map(yaml_scalar_to_string)
                .collect::<Vec<_>>()
                .join(",");
            out.insert(prefix.to_string(), joined);
        }
        _ => {
            if let Some(value) = yaml_scalar_to_string(value) {
                out.insert(prefix.to_string(), value);
            }
        }
    }
}

fn yaml_scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Bool(v) => Some(v.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Null
        | serde_yaml::Value::Sequence(_)
        | serde_yaml::Value::Mapping(_) => None,
        serde_yaml::Value::Tagged(tagged) => yaml_scalar_to_string(&tagged.value),
    }
}
