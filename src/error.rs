use thiserror::Error;

use crate::{
    auth::AuthError,
    collection::CollectionError,
    configuration::ConfigurationError,
    exit_codes::TerminusExitCode,
    format::FormattingError,
    model::ModelError,
    session::SessionError,
    transport::TransportError,
};

/// Error types that can occur during CLI command execution
#[derive(Debug, Error)]
pub enum CliError {
    /// Error when an unsupported or undefined subcommand is encountered
    #[error("Undefined or unsupported subcommand {0}")]
    UnsupportedSubcommand(String),
    /// Error when a required command-line argument is missing
    #[error("Missing required argument: {0}")]
    MissingRequiredArgument(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(#[from] ConfigurationError),
    #[error("Formatting error: {0}")]
    FormattingError(#[from] FormattingError),
    #[error("{0}")]
    AuthError(#[from] AuthError),
    #[error("{0}")]
    CollectionError(#[from] CollectionError),
    #[error("{0}")]
    ModelError(#[from] ModelError),
    #[error("{0}")]
    TransportError(#[from] TransportError),
}

impl CliError {
    /// Get the appropriate exit code for this error
    pub fn exit_code(&self) -> TerminusExitCode {
        match self {
            CliError::UnsupportedSubcommand(_) | CliError::MissingRequiredArgument(_) => {
                TerminusExitCode::UsageError
            }
            CliError::ConfigurationError(_) => TerminusExitCode::ConfigError,
            CliError::FormattingError(_) | CliError::ModelError(_) => TerminusExitCode::DataError,
            CliError::AuthError(e) => auth_exit_code(e),
            CliError::CollectionError(e) => collection_exit_code(e),
            CliError::TransportError(e) => transport_exit_code(e),
        }
    }
}

fn auth_exit_code(error: &AuthError) -> TerminusExitCode {
    match error {
        AuthError::InvalidEmail { .. } => TerminusExitCode::UsageError,
        AuthError::Credentials(e) => collection_exit_code(e),
        AuthError::Session(SessionError::IoError { .. }) => TerminusExitCode::IoError,
        AuthError::Session(SessionError::JsonError { .. }) => TerminusExitCode::DataError,
        _ => TerminusExitCode::AuthError,
    }
}

fn collection_exit_code(error: &CollectionError) -> TerminusExitCode {
    match error {
        CollectionError::NotFound { .. } => TerminusExitCode::NotFound,
        CollectionError::TransportError(e) => transport_exit_code(e),
        CollectionError::IoError(_) => TerminusExitCode::IoError,
        _ => TerminusExitCode::DataError,
    }
}

fn transport_exit_code(error: &TransportError) -> TerminusExitCode {
    match error {
        TransportError::UnexpectedStatus { .. } => TerminusExitCode::ApiError,
        TransportError::JsonError(_) => TerminusExitCode::DataError,
        TransportError::UrlError(_) => TerminusExitCode::ConfigError,
        TransportError::HttpError(_) | TransportError::Other(_) => TerminusExitCode::NetworkError,
    }
}
