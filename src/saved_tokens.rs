//! Machine tokens saved on this machine.
//!
//! The store is a [`Collection`] of [`SavedToken`] models whose record source
//! is a JSON file mapping email addresses to machine tokens. The file is read
//! in full on first access and rewritten in full on every change.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use crate::collection::{Collection, CollectionError, Record, RecordSource};
use crate::model::{Attributes, Model, ModelBase, ModelError, ModelOptions};
use crate::transport::RequestOptions;

pub const DEFAULT_TOKENS_FILE_NAME: &str = "tokens.json";

/// A machine token and the account it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct SavedToken {
    base: ModelBase,
}

impl Model for SavedToken {
    const KIND: &'static str = "machine token";

    fn from_base(base: ModelBase) -> Result<Self, ModelError> {
        base.get_str("token")?;
        Ok(SavedToken { base })
    }

    fn base(&self) -> &ModelBase {
        &self.base
    }
}

impl SavedToken {
    pub fn token(&self) -> &str {
        // checked in from_base
        self.base.get_opt_str("token").unwrap_or_default()
    }

    pub fn email(&self) -> Option<&str> {
        self.base.get_opt_str("email")
    }
}

/// Reads the token file as collection records
struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    fn read(path: &Path) -> Result<Map<String, Value>, CollectionError> {
        if !path.exists() {
            debug!("No saved tokens file found at {:?}", path);
            return Ok(Map::new());
        }
        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    /// The string entries of a file that failed to load; anything else is
    /// dropped.
    fn salvage(path: &Path) -> Map<String, Value> {
        match Self::read(path) {
            Ok(stored) => stored
                .into_iter()
                .filter(|(email, token)| {
                    if token.is_string() {
                        true
                    } else {
                        warn!("Discarding malformed saved token for {}: {}", email, token);
                        false
                    }
                })
                .collect(),
            Err(error) => {
                warn!("Discarding unreadable saved tokens file {:?}: {}", path, error);
                Map::new()
            }
        }
    }

    fn write(path: &Path, tokens: &Map<String, Value>) -> Result<(), CollectionError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(tokens)?;
        fs::write(path, content)?;
        trace!("Saved {} machine token(s) to {:?}", tokens.len(), path);
        Ok(())
    }
}

impl RecordSource for TokenFile {
    fn fetch_records(&self, _fetch_args: &RequestOptions) -> Result<Vec<Record>, CollectionError> {
        let stored = Self::read(&self.path)?;
        stored
            .into_iter()
            .map(|(email, token)| match token {
                Value::String(token) => Ok(Record {
                    key: email.clone(),
                    data: token_record(&email, &token),
                }),
                _ => Err(CollectionError::MalformedRecord { key: email }),
            })
            .collect()
    }
}

fn token_record(email: &str, token: &str) -> Attributes {
    let mut record = Map::new();
    record.insert("id".to_string(), Value::String(email.to_string()));
    record.insert("email".to_string(), Value::String(email.to_string()));
    record.insert("token".to_string(), Value::String(token.to_string()));
    record
}

/// Persistent collection of saved machine tokens, keyed by email
pub struct CredentialStore {
    path: PathBuf,
    tokens: Collection<SavedToken>,
}

impl CredentialStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let tokens = Collection::new(TokenFile { path: path.clone() });
        Self { path, tokens }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Saves `token` for `email`, replacing any token saved for that email.
    ///
    /// The file is written before the in-memory view changes. An unreadable
    /// file is rewritten with whatever valid entries it still holds.
    pub fn add(&mut self, email: &str, token: &str) -> Result<&SavedToken, CollectionError> {
        let (mut stored, salvaged) = match self.tokens.populate() {
            Ok(()) => {
                let stored: Map<String, Value> = self
                    .tokens
                    .iter()
                    .filter_map(|saved| {
                        saved
                            .email()
                            .map(|email| (email.to_string(), Value::String(saved.token().to_string())))
                    })
                    .collect();
                (stored, false)
            }
            Err(error) => {
                warn!("Rewriting saved tokens file {:?}: {}", self.path, error);
                (TokenFile::salvage(&self.path), true)
            }
        };
        stored.insert(email.to_string(), Value::String(token.to_string()));
        TokenFile::write(&self.path, &stored)?;

        if salvaged {
            let others = stored
                .iter()
                .filter(|(saved_email, _)| saved_email.as_str() != email)
                .filter_map(|(saved_email, saved_token)| saved_token.as_str().map(|t| (saved_email, t)));
            for (saved_email, saved_token) in others {
                self.tokens.add(
                    token_record(saved_email, saved_token),
                    ModelOptions::default().with_id(saved_email),
                )?;
            }
        }

        debug!("Saved machine token for {}", email);
        self.tokens
            .add(token_record(email, token), ModelOptions::default().with_id(email))
    }

    /// Resolves an email address or a token string to one saved token.
    pub fn get(&mut self, key: &str) -> Result<&SavedToken, CollectionError> {
        self.tokens.populate()?;
        if let Some(saved) = self.tokens.lookup(key) {
            return Ok(saved);
        }
        self.tokens
            .iter()
            .find(|saved| saved.token() == key)
            .ok_or_else(|| CollectionError::NotFound {
                kind: SavedToken::KIND,
                id: key.to_string(),
            })
    }

    pub fn find_by_email(&mut self, email: &str) -> Result<Option<&SavedToken>, CollectionError> {
        self.tokens.populate()?;
        Ok(self.tokens.iter().find(|saved| saved.email() == Some(email)))
    }

    pub fn token_exists_for_email(&mut self, email: &str) -> Result<bool, CollectionError> {
        Ok(self.find_by_email(email)?.is_some())
    }

    pub fn all(&mut self) -> Result<Vec<&SavedToken>, CollectionError> {
        self.tokens.all()
    }

    pub fn ids(&mut self) -> Result<Vec<String>, CollectionError> {
        self.tokens.ids()
    }

    /// Every email address with a saved token
    pub fn emails(&mut self) -> Result<Vec<String>, CollectionError> {
        Ok(self
            .all()?
            .into_iter()
            .filter_map(|saved| saved.email().map(str::to_string))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> CredentialStore {
        CredentialStore::open(dir.path().join("cache").join(DEFAULT_TOKENS_FILE_NAME))
    }

    #[test]
    fn test_empty_store() {
        let dir = TempDir::new().unwrap();
        let mut tokens = store(&dir);
        assert!(tokens.all().unwrap().is_empty());
        assert!(!tokens.token_exists_for_email("a@x.com").unwrap());
    }

    #[test]
    fn test_add_replaces_token_for_same_email() {
        let dir = TempDir::new().unwrap();
        let mut tokens = store(&dir);
        tokens.add("a@x.com", "T1").unwrap();
        tokens.add("a@x.com", "T2").unwrap();

        assert_eq!(tokens.ids().unwrap(), vec!["a@x.com"]);
        assert_eq!(tokens.get("a@x.com").unwrap().token(), "T2");

        let mut reopened = store(&dir);
        let all = reopened.all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].token(), "T2");
    }

    #[test]
    fn test_add_keeps_tokens_already_on_disk() {
        let dir = TempDir::new().unwrap();
        store(&dir).add("a@x.com", "T1").unwrap();

        let mut tokens = store(&dir);
        tokens.add("b@x.com", "T2").unwrap();

        let mut reopened = store(&dir);
        assert_eq!(reopened.emails().unwrap(), vec!["a@x.com", "b@x.com"]);
    }

    #[test]
    fn test_add_rewrites_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache").join(DEFAULT_TOKENS_FILE_NAME);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, r#"{"old@x.com": 42, "keep@x.com": "T0"}"#).unwrap();

        let mut tokens = store(&dir);
        assert!(tokens.all().is_err());
        assert_eq!(tokens.add("a@x.com", "T1").unwrap().token(), "T1");
        assert_eq!(tokens.get("keep@x.com").unwrap().token(), "T0");

        let mut reopened = store(&dir);
        assert_eq!(reopened.emails().unwrap(), vec!["keep@x.com", "a@x.com"]);
    }

    #[test]
    fn test_add_replaces_unparsable_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache").join(DEFAULT_TOKENS_FILE_NAME);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{not json").unwrap();

        store(&dir).add("a@x.com", "T1").unwrap();

        let mut reopened = store(&dir);
        assert_eq!(reopened.emails().unwrap(), vec!["a@x.com"]);
    }

    #[test]
    fn test_get_by_email_or_token() {
        let dir = TempDir::new().unwrap();
        let mut tokens = store(&dir);
        tokens.add("a@x.com", "T1").unwrap();

        assert_eq!(tokens.get("T1").unwrap().email(), Some("a@x.com"));
        assert_eq!(tokens.get("a@x.com").unwrap().token(), "T1");
        assert!(tokens.token_exists_for_email("a@x.com").unwrap());
        assert_eq!(
            tokens.find_by_email("a@x.com").unwrap().map(SavedToken::token),
            Some("T1")
        );
    }

    #[test]
    fn test_get_miss_is_not_found() {
        let dir = TempDir::new().unwrap();
        let mut tokens = store(&dir);
        tokens.add("a@x.com", "T1").unwrap();

        match tokens.get("b@x.com") {
            Err(CollectionError::NotFound { kind, id }) => {
                assert_eq!(kind, "machine token");
                assert_eq!(id, "b@x.com");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_TOKENS_FILE_NAME);
        fs::write(&path, r#"{"a@x.com": 42}"#).unwrap();

        let mut tokens = CredentialStore::open(&path);
        assert!(matches!(
            tokens.all().map(|all| all.len()),
            Err(CollectionError::MalformedRecord { .. })
        ));
    }
}
