use crate::app::config::ConfigError;
use thiserror::Error;

/// Top-level error type for callers that want a `Result` instead of the
/// facade's boolean vocabulary.
#[derive(Error, Debug)]
pub enum UpdaterError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid configuration: {}", join_errors(.0))]
    InvalidConfig(Vec<ConfigError>),
}

fn join_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
