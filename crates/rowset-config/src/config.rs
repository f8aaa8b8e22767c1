use std::{
    fs,
    path::{Path, PathBuf},
    sync::{LazyLock, PoisonError, RwLock},
};

use documented::{Documented, DocumentedFields};
use serde::{Deserialize, Serialize};
use toml_edit::DocumentMut;
use tracing::{debug, info};

use crate::{
    annotations::annotate_toml_table,
    error::{ConfigError, Result},
    utils::{resolve_path, xdg_config_home, xdg_data_home},
};

pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_MAX_FILTER_DEPTH: usize = 4;
pub const DEFAULT_ID_COLUMN: &str = "id";

/// Application's configuration
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, Documented, DocumentedFields)]
pub struct Config {
    /// Database connection settings.
    pub database: DatabaseConfig,

    /// Query composition settings.
    #[serde(default)]
    pub query: QueryConfig,
}

/// Settings for the SQLite database that queries run against.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, Documented, DocumentedFields)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    /// Overridden by the ROWSET_DB environment variable.
    pub path: String,

    /// How long a connection waits on a locked database, in milliseconds.
    /// Default: 5000
    pub busy_timeout_ms: Option<u64>,

    /// If true, LIKE comparisons are case sensitive.
    /// Default: true
    pub case_sensitive_like: Option<bool>,
}

/// Settings for how filters are compiled.
#[derive(
    Clone, Debug, Default, PartialEq, Deserialize, Serialize, Documented, DocumentedFields,
)]
pub struct QueryConfig {
    /// Maximum number of related-field hops a filter may take.
    /// Default: 4
    pub max_filter_depth: Option<usize>,

    /// Identifier column assumed for tables without a primary key.
    /// Default: "id"
    pub id_column: Option<String>,
}

pub static CONFIG: LazyLock<RwLock<Option<Config>>> = LazyLock::new(|| RwLock::new(None));

pub static CONFIG_PATH: LazyLock<RwLock<PathBuf>> = LazyLock::new(|| {
    RwLock::new(match std::env::var("ROWSET_CONFIG") {
        Ok(path_str) => PathBuf::from(path_str),
        Err(_) => xdg_config_home().join("rowset").join("config.toml"),
    })
});

pub fn config_path() -> PathBuf {
    CONFIG_PATH
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .to_path_buf()
}

/// Points the global config at `path` instead of the default location.
pub fn set_config_path<P: AsRef<Path>>(path: P) {
    let mut guard = CONFIG_PATH.write().unwrap_or_else(PoisonError::into_inner);
    *guard = path.as_ref().to_path_buf();
}

/// Loads the config file into the process-wide config.
pub fn init() -> Result<()> {
    let config = Config::new()?;
    let mut global_config = CONFIG.write().unwrap_or_else(PoisonError::into_inner);
    *global_config = Some(config);
    Ok(())
}

/// Returns the process-wide config, falling back to defaults before `init`.
pub fn get_config() -> Config {
    if let Some(config) = CONFIG
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .as_ref()
    {
        return config.clone();
    }

    let mut guard = CONFIG.write().unwrap_or_else(PoisonError::into_inner);
    guard.get_or_insert_with(Config::default_config).clone()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: xdg_data_home()
                .join("rowset")
                .join("rowset.db")
                .display()
                .to_string(),
            busy_timeout_ms: Some(DEFAULT_BUSY_TIMEOUT_MS),
            case_sensitive_like: Some(true),
        }
    }
}

impl Config {
    pub fn default_config() -> Self {
        Self {
            database: DatabaseConfig::default(),
            query: QueryConfig {
                max_filter_depth: Some(DEFAULT_MAX_FILTER_DEPTH),
                id_column: Some(DEFAULT_ID_COLUMN.to_string()),
            },
        }
    }

    /// Creates a new configuration by loading it from the configuration file.
    /// If the configuration file is not found, it uses the default configuration.
    pub fn new() -> Result<Self> {
        Self::load(config_path())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut config = match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no config at {}, using defaults", path.display());
                Self::default_config()
            }
            Err(err) => return Err(ConfigError::IoError(err)),
        };

        config.resolve()?;

        Ok(config)
    }

    /// Fills unset values with defaults and validates the rest.
    pub fn resolve(&mut self) -> Result<()> {
        if self.database.path.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "database.path",
                reason: "must not be empty".into(),
            });
        }

        self.database
            .busy_timeout_ms
            .get_or_insert(DEFAULT_BUSY_TIMEOUT_MS);
        self.database.case_sensitive_like.get_or_insert(true);

        match self.query.max_filter_depth {
            Some(0) => {
                return Err(ConfigError::InvalidValue {
                    field: "query.max_filter_depth",
                    reason: "must be at least 1".into(),
                })
            }
            Some(_) => {}
            None => self.query.max_filter_depth = Some(DEFAULT_MAX_FILTER_DEPTH),
        }

        match self.query.id_column.as_deref() {
            Some(column) if column.trim().is_empty() => {
                return Err(ConfigError::InvalidValue {
                    field: "query.id_column",
                    reason: "must not be empty".into(),
                })
            }
            Some(_) => {}
            None => self.query.id_column = Some(DEFAULT_ID_COLUMN.to_string()),
        }

        Ok(())
    }

    pub fn get_db_path(&self) -> Result<PathBuf> {
        if let Ok(env_path) = std::env::var("ROWSET_DB") {
            return resolve_path(&env_path);
        }
        resolve_path(&self.database.path)
    }

    pub fn busy_timeout_ms(&self) -> u64 {
        self.database
            .busy_timeout_ms
            .unwrap_or(DEFAULT_BUSY_TIMEOUT_MS)
    }

    pub fn case_sensitive_like(&self) -> bool {
        self.database.case_sensitive_like.unwrap_or(true)
    }

    pub fn max_filter_depth(&self) -> usize {
        self.query
            .max_filter_depth
            .unwrap_or(DEFAULT_MAX_FILTER_DEPTH)
    }

    pub fn id_column(&self) -> &str {
        self.query.id_column.as_deref().unwrap_or(DEFAULT_ID_COLUMN)
    }

    pub fn to_annotated_document(&self) -> Result<DocumentMut> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut doc = toml_string.parse::<DocumentMut>()?;

        annotate_toml_table::<Config>(doc.as_table_mut(), true)?;

        if let Some(table) = doc.get_mut("database").and_then(|i| i.as_table_mut()) {
            annotate_toml_table::<DatabaseConfig>(table, false)?;
        }

        if let Some(table) = doc.get_mut("query").and_then(|i| i.as_table_mut()) {
            annotate_toml_table::<QueryConfig>(table, false)?;
        }

        Ok(doc)
    }
}

/// Writes the annotated default config to the config path.
///
/// Refuses to overwrite an existing file.
pub fn generate_default_config() -> Result<PathBuf> {
    let config_path = config_path();

    if config_path.exists() {
        return Err(ConfigError::ConfigAlreadyExists);
    }

    let annotated_doc = Config::default_config().to_annotated_document()?;

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(&config_path, annotated_doc.to_string())?;
    info!(
        "Default configuration file generated with documentation at: {}",
        config_path.display()
    );
    Ok(config_path)
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;
    use crate::test_utils::with_env;

    #[test]
    fn test_default_config_creation() {
        let config = Config::default_config();

        assert!(config.database.path.ends_with("rowset.db"));
        assert_eq!(config.busy_timeout_ms(), 5000);
        assert!(config.case_sensitive_like());
        assert_eq!(config.max_filter_depth(), 4);
        assert_eq!(config.id_column(), "id");
    }

    #[test]
    fn test_config_resolve_sets_defaults() {
        let mut config: Config = toml::from_str("[database]\npath = \"/tmp/app.db\"\n").unwrap();
        assert_eq!(config.query.max_filter_depth, None);

        config.resolve().unwrap();

        assert_eq!(config.database.busy_timeout_ms, Some(5000));
        assert_eq!(config.database.case_sensitive_like, Some(true));
        assert_eq!(config.query.max_filter_depth, Some(4));
        assert_eq!(config.query.id_column.as_deref(), Some("id"));
    }

    #[test]
    fn test_config_resolve_rejects_zero_depth() {
        let mut config = Config::default_config();
        config.query.max_filter_depth = Some(0);

        assert!(matches!(
            config.resolve(),
            Err(ConfigError::InvalidValue {
                field: "query.max_filter_depth",
                ..
            })
        ));
    }

    #[test]
    fn test_config_resolve_rejects_empty_values() {
        let mut config = Config::default_config();
        config.database.path = " ".into();
        assert!(config.resolve().is_err());

        let mut config = Config::default_config();
        config.query.id_column = Some(String::new());
        assert!(config.resolve().is_err());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().join("missing.toml")).unwrap();

        assert_eq!(config, Config::default_config());
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[database]\npath = \"/srv/app.db\"\ncase_sensitive_like = false\n\n[query]\nmax_filter_depth = 2\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();

        assert_eq!(config.database.path, "/srv/app.db");
        assert!(!config.case_sensitive_like());
        assert_eq!(config.max_filter_depth(), 2);
        assert_eq!(config.busy_timeout_ms(), 5000);
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[database\n").unwrap();

        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::TomlDeError(_))
        ));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default_config();
        let serialized = toml::to_string(&config).unwrap();

        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized, config);
    }

    #[test]
    fn test_annotated_document_round_trips() {
        let config = Config::default_config();
        let doc = config.to_annotated_document().unwrap();

        let parsed: Config = toml::from_str(&doc.to_string()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    #[serial]
    fn test_db_path_env_override() {
        with_env(vec![("ROWSET_DB", "/custom/app.db")], || {
            let config = Config::default_config();
            assert_eq!(config.get_db_path().unwrap(), PathBuf::from("/custom/app.db"));
        });
    }

    #[test]
    #[serial]
    fn test_generate_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        set_config_path(&path);

        let written = generate_default_config().unwrap();
        assert_eq!(written, path);
        assert!(fs::read_to_string(&path).unwrap().contains("[query]"));

        assert!(matches!(
            generate_default_config(),
            Err(ConfigError::ConfigAlreadyExists)
        ));

        init().unwrap();
        assert_eq!(get_config(), Config::default_config());
    }
}
