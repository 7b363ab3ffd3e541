//! Configuration resolution: process environment layered over a local TOML file.
//!
//! Every key is looked up in the environment first, then in the file. An
//! empty environment variable counts as unset; a file entry counts as soon as
//! it is present, even when empty. Resolution is a pure function over
//! a [`ConfigSources`] snapshot so callers (and tests) control exactly what
//! the resolver sees.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

/// Default config file, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "cli-template.toml";

pub const PYTHON_ENV: &str = "PYTHON_ENV";
/// Alias for [`PYTHON_ENV`], consulted only when that key is unset.
pub const APP_ENV: &str = "APP_ENV";
pub const SERVICE_NAME: &str = "SERVICE_NAME";
pub const DATABASE_URL: &str = "DATABASE_URL";
pub const POSTGRES_USER: &str = "POSTGRES_USER";
pub const POSTGRES_PASSWORD: &str = "POSTGRES_PASSWORD";
pub const POSTGRES_HOST: &str = "POSTGRES_HOST";
pub const POSTGRES_PORT: &str = "POSTGRES_PORT";
pub const POSTGRES_DB: &str = "POSTGRES_DB";

pub const DEFAULT_ENVIRONMENT: &str = "development";
pub const DEFAULT_SERVICE_NAME: &str = "python-tool";

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Snapshot of the two configuration sources.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    pub env: HashMap<String, String>,
    pub file: HashMap<String, String>,
}

impl ConfigSources {
    pub fn new(env: HashMap<String, String>, file: HashMap<String, String>) -> Self {
        Self { env, file }
    }

    /// Capture the current process environment and the given config file.
    pub fn from_process(file: &ConfigFile) -> Self {
        Self {
            env: std::env::vars().collect(),
            file: load_file_or_empty(&file.path, file.explicit),
        }
    }
}

/// Resolve `key`: a non-empty environment value wins, otherwise the file
/// entry if present.
pub fn resolve(key: &str, sources: &ConfigSources) -> Option<String> {
    sources
        .env
        .get(key)
        .filter(|value| !value.is_empty())
        .or_else(|| sources.file.get(key))
        .cloned()
}

// ---------------------------------------------------------------------------
// Config file
// ---------------------------------------------------------------------------

/// Read a flat TOML table of `KEY = value` pairs.
///
/// Scalars are stringified; arrays, tables and datetimes are skipped.
pub fn load_file(path: &Path) -> Result<HashMap<String, String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    let table: toml::Table = toml::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;

    let mut values = HashMap::with_capacity(table.len());
    for (key, value) in table {
        let text = match value {
            toml::Value::String(s) => s,
            toml::Value::Integer(i) => i.to_string(),
            toml::Value::Float(f) => f.to_string(),
            toml::Value::Boolean(b) => b.to_string(),
            other => {
                warn!(%key, kind = other.type_str(), "ignoring non-scalar config value");
                continue;
            }
        };
        values.insert(key, text);
    }

    info!(path = %path.display(), keys = values.len(), "loaded config file");
    Ok(values)
}

/// Like [`load_file`], but a missing or broken file yields an empty map.
///
/// A missing file is only worth a warning when the user named it.
pub fn load_file_or_empty(path: &Path, explicit: bool) -> HashMap<String, String> {
    if !path.exists() {
        if explicit {
            warn!(path = %path.display(), "config file not found, using environment only");
        } else {
            debug!(path = %path.display(), "no config file, using environment only");
        }
        return HashMap::new();
    }
    match load_file(path) {
        Ok(values) => values,
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "config file could not be loaded, using environment only"
            );
            HashMap::new()
        }
    }
}

/// Config file location, and whether it came from `--config` or the
/// environment rather than the default name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub path: PathBuf,
    pub explicit: bool,
}

pub fn config_path(explicit: Option<PathBuf>) -> ConfigFile {
    match explicit {
        Some(path) => ConfigFile {
            path,
            explicit: true,
        },
        None => ConfigFile {
            path: PathBuf::from(DEFAULT_CONFIG_FILE),
            explicit: false,
        },
    }
}

// ---------------------------------------------------------------------------
// Resolved view
// ---------------------------------------------------------------------------

/// Store connection parameters. Each one is optional on its own; the
/// storage layer decides which combination it needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseParams {
    pub url: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub host: Option<String>,
    pub port: Option<String>,
    pub name: Option<String>,
}

/// Everything a command needs from configuration, resolved once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub environment: String,
    pub service_name: String,
    pub database: DatabaseParams,
}

impl ResolvedConfig {
    pub fn resolve(sources: &ConfigSources) -> Self {
        Self {
            environment: resolve(PYTHON_ENV, sources)
                .or_else(|| resolve(APP_ENV, sources))
                .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string()),
            service_name: resolve(SERVICE_NAME, sources)
                .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string()),
            database: DatabaseParams {
                url: resolve(DATABASE_URL, sources),
                user: resolve(POSTGRES_USER, sources),
                password: resolve(POSTGRES_PASSWORD, sources),
                host: resolve(POSTGRES_HOST, sources),
                port: resolve(POSTGRES_PORT, sources),
                name: resolve(POSTGRES_DB, sources),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_env_wins_over_file() {
        let sources = ConfigSources::new(
            map(&[(SERVICE_NAME, "from-env")]),
            map(&[(SERVICE_NAME, "from-file")]),
        );
        assert_eq!(resolve(SERVICE_NAME, &sources).as_deref(), Some("from-env"));
    }

    #[test]
    fn test_empty_env_falls_through_to_file() {
        let sources = ConfigSources::new(
            map(&[(POSTGRES_HOST, "")]),
            map(&[(POSTGRES_HOST, "db.internal")]),
        );
        assert_eq!(resolve(POSTGRES_HOST, &sources).as_deref(), Some("db.internal"));
    }

    #[test]
    fn test_empty_file_value_is_kept() {
        let sources = ConfigSources::new(HashMap::new(), map(&[(SERVICE_NAME, "")]));
        assert_eq!(resolve(SERVICE_NAME, &sources).as_deref(), Some(""));
        assert_eq!(ResolvedConfig::resolve(&sources).service_name, "");
    }

    #[test]
    fn test_python_env_names_the_environment() {
        let sources = ConfigSources::new(map(&[(PYTHON_ENV, "production")]), HashMap::new());
        assert_eq!(ResolvedConfig::resolve(&sources).environment, "production");
    }

    #[test]
    fn test_python_env_wins_over_app_env_alias() {
        let sources = ConfigSources::new(
            map(&[(APP_ENV, "staging")]),
            map(&[(PYTHON_ENV, "production")]),
        );
        assert_eq!(ResolvedConfig::resolve(&sources).environment, "production");

        let alias_only = ConfigSources::new(map(&[(APP_ENV, "staging")]), HashMap::new());
        assert_eq!(ResolvedConfig::resolve(&alias_only).environment, "staging");
    }

    #[test]
    fn test_missing_key_is_none() {
        let sources = ConfigSources::default();
        assert_eq!(resolve(POSTGRES_DB, &sources), None);
    }

    #[test]
    fn test_defaults_apply() {
        let cfg = ResolvedConfig::resolve(&ConfigSources::default());
        assert_eq!(cfg.environment, "development");
        assert_eq!(cfg.service_name, "python-tool");
        assert_eq!(cfg.database, DatabaseParams::default());
    }

    #[test]
    fn test_resolved_config_mixes_sources() {
        let sources = ConfigSources::new(
            map(&[(APP_ENV, "production"), (POSTGRES_USER, "svc")]),
            map(&[(SERVICE_NAME, "billing"), (POSTGRES_PORT, "5432")]),
        );
        let cfg = ResolvedConfig::resolve(&sources);
        assert_eq!(cfg.environment, "production");
        assert_eq!(cfg.service_name, "billing");
        assert_eq!(cfg.database.user.as_deref(), Some("svc"));
        assert_eq!(cfg.database.port.as_deref(), Some("5432"));
        assert_eq!(cfg.database.host, None);
    }

    #[test]
    fn test_load_file_stringifies_scalars() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("cli-template.toml");
        std::fs::write(
            &path,
            r#"
SERVICE_NAME = "ledger"
POSTGRES_PORT = 5433
DEBUG = true
TAGS = ["a", "b"]
"#,
        )
        .unwrap();

        let values = load_file(&path).unwrap();
        assert_eq!(values.get(SERVICE_NAME).map(String::as_str), Some("ledger"));
        assert_eq!(values.get(POSTGRES_PORT).map(String::as_str), Some("5433"));
        assert_eq!(values.get("DEBUG").map(String::as_str), Some("true"));
        assert!(!values.contains_key("TAGS"));
    }

    #[test]
    fn test_missing_file_is_empty() {
        let path = Path::new("/nonexistent/cli-template.toml");
        assert!(load_file_or_empty(path, false).is_empty());
        assert!(load_file_or_empty(path, true).is_empty());
    }

    #[test]
    fn test_malformed_file_is_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "SERVICE_NAME = ").unwrap();

        assert!(load_file(&path).is_err());
        assert!(load_file_or_empty(&path, true).is_empty());
    }

    #[test]
    fn test_config_path_default() {
        let default = config_path(None);
        assert_eq!(default.path, PathBuf::from(DEFAULT_CONFIG_FILE));
        assert!(!default.explicit);

        let named = config_path(Some(PathBuf::from("/etc/tool.toml")));
        assert_eq!(named.path, PathBuf::from("/etc/tool.toml"));
        assert!(named.explicit);
    }
}
