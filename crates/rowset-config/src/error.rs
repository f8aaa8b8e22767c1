use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("TOML serialization error: {0}")]
    #[diagnostic(
        code(rowset_config::toml_serialize),
        help("Check your configuration structure for invalid values")
    )]
    TomlSerError(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    #[diagnostic(
        code(rowset_config::toml_deserialize),
        help("Check your config.toml syntax and structure")
    )]
    TomlDeError(#[from] toml::de::Error),

    #[error("Configuration file already exists")]
    #[diagnostic(
        code(rowset_config::already_exists),
        help("Remove the existing config file or use a different location")
    )]
    ConfigAlreadyExists,

    #[error("Invalid value for '{field}': {reason}")]
    #[diagnostic(
        code(rowset_config::invalid_value),
        help("Fix the value in your config file or remove it to use the default")
    )]
    InvalidValue { field: &'static str, reason: String },

    #[error("Path cannot be empty")]
    #[diagnostic(code(rowset_config::empty_path))]
    EmptyPath,

    #[error("IO error: {0}")]
    #[diagnostic(code(rowset_config::io))]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    #[diagnostic(code(rowset_config::toml))]
    Toml(#[from] toml_edit::TomlError),

    #[error("Encountered unexpected TOML item: {0}")]
    #[diagnostic(code(rowset_config::unexpected_toml_item))]
    UnexpectedTomlItem(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
