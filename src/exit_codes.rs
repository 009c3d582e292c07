//! Process exit codes.
//!
//! Codes follow the BSD sysexits.h conventions where possible, with
//! application-specific codes from 100 up.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminusExitCode {
    /// Command completed successfully
    Success = 0,

    /// Command line usage error (64)
    UsageError = 64,

    /// Data format error (65), e.g. a malformed token or session file
    DataError = 65,

    /// Resource not found (67)
    NotFound = 67,

    /// Internal software error (70)
    SoftwareError = 70,

    /// Local file could not be read or written (74)
    IoError = 74,

    /// Configuration error (78)
    ConfigError = 78,

    /// Login failed or no usable credentials (100)
    AuthError = 100,

    /// Network error (101)
    NetworkError = 101,

    /// The API answered with an error status (102)
    ApiError = 102,
}

impl TerminusExitCode {
    pub fn code(&self) -> i32 {
        *self as i32
    }

    pub fn message(&self) -> &'static str {
        match self {
            TerminusExitCode::Success => "Success",
            TerminusExitCode::UsageError => "Command line usage error",
            TerminusExitCode::DataError => "Data format error",
            TerminusExitCode::NotFound => "Resource not found",
            TerminusExitCode::SoftwareError => "Internal software error",
            TerminusExitCode::IoError => "Input/output error",
            TerminusExitCode::ConfigError => "Configuration error",
            TerminusExitCode::AuthError => "Authentication error",
            TerminusExitCode::NetworkError => "Network communication error",
            TerminusExitCode::ApiError => "Remote API error",
        }
    }
}

impl From<TerminusExitCode> for i32 {
    fn from(code: TerminusExitCode) -> Self {
        code.code()
    }
}
