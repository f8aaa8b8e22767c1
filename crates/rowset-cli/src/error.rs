use miette::Diagnostic;
use rowset_config::error::ConfigError;
use rowset_db::DbError;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum CliError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid rule '{rule}': {reason}")]
    #[diagnostic(
        code(rowset_cli::invalid_rule),
        help("Write rules as FIELD<OP>VALUE, e.g. `age>=18` or `name~ann`")
    )]
    InvalidRule { rule: String, reason: &'static str },

    #[error("JSON serialization error: {0}")]
    #[diagnostic(code(rowset_cli::json))]
    Json(#[from] serde_json::Error),
}

pub type CliResult<T> = std::result::Result<T, CliError>;
