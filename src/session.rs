//! Persisted login session.
//!
//! The session is the JSON object returned by the last successful login,
//! saved as-is so that later invocations can reuse it.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, trace, warn};

pub const DEFAULT_SESSION_FILE_NAME: &str = "session.json";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to access session file {path:?}: {cause}")]
    IoError {
        path: PathBuf,
        #[source]
        cause: std::io::Error,
    },
    #[error("session file {path:?} is not valid JSON: {cause}")]
    JsonError {
        path: PathBuf,
        #[source]
        cause: serde_json::Error,
    },
}

pub type SessionData = Map<String, Value>;

#[derive(Debug)]
pub struct Session {
    path: PathBuf,
    data: Option<SessionData>,
}

impl Session {
    /// Loads the session saved at `path`.
    ///
    /// A missing, unreadable or unparsable file means no session.
    pub fn load(path: impl Into<PathBuf>) -> Result<Session, SessionError> {
        let path = path.into();
        if !path.exists() {
            trace!("No session file at {:?}", path);
            return Ok(Session { path, data: None });
        }

        let data = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<SessionData>(&content) {
                Ok(data) => {
                    debug!("Loaded session from {:?}", path);
                    Some(data)
                }
                Err(cause) => {
                    warn!("Ignoring session file {:?}: {}", path, cause);
                    None
                }
            },
            Err(cause) => {
                warn!("Ignoring unreadable session file {:?}: {}", path, cause);
                None
            }
        };
        Ok(Session { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn data(&self) -> Option<&SessionData> {
        self.data.as_ref()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.as_ref().and_then(|data| data.get(key))
    }

    /// Token presented to the API for the current session
    pub fn session_token(&self) -> Option<&str> {
        self.get("session").and_then(Value::as_str)
    }

    pub fn user_id(&self) -> Option<&str> {
        self.get("user_id").and_then(Value::as_str)
    }

    pub fn machine_token(&self) -> Option<&str> {
        self.get("machine_token").and_then(Value::as_str)
    }

    pub fn expires_at(&self) -> Option<i64> {
        self.get("expires_at").and_then(Value::as_i64)
    }

    /// Whether a session exists and has not expired; `test_mode` ignores
    /// expiry.
    pub fn is_active(&self, test_mode: bool) -> bool {
        if self.session_token().is_none() {
            return false;
        }
        test_mode || self.expires_at().is_some_and(|expires_at| expires_at >= now())
    }

    /// Replaces the session data wholesale and saves it.
    ///
    /// A machine token already held locally survives when `data` has none.
    pub fn set_data(&mut self, mut data: SessionData) -> Result<(), SessionError> {
        if !data.contains_key("machine_token") {
            if let Some(machine_token) = self.machine_token() {
                data.insert(
                    "machine_token".to_string(),
                    Value::String(machine_token.to_string()),
                );
            }
        }
        self.save(&data)?;
        self.data = Some(data);
        Ok(())
    }

    /// Forgets the session and removes its file. Destroying twice is fine.
    pub fn destroy(&mut self) -> Result<(), SessionError> {
        self.data = None;
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("Removed session file {:?}", self.path);
                Ok(())
            }
            Err(cause) if cause.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(cause) => Err(SessionError::IoError {
                path: self.path.clone(),
                cause,
            }),
        }
    }

    fn save(&self, data: &SessionData) -> Result<(), SessionError> {
        let io_error = |cause| SessionError::IoError {
            path: self.path.clone(),
            cause,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let content = serde_json::to_string_pretty(data).map_err(|cause| SessionError::JsonError {
            path: self.path.clone(),
            cause,
        })?;
        fs::write(&self.path, content).map_err(io_error)?;
        Ok(())
    }
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or_default()
}
