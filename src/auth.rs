//! Login and logout workflow.
//!
//! [`AuthSession`] picks a machine token (inline, by email, or the only one
//! saved), exchanges it for a session through the [`Transport`], and keeps
//! the resulting session on disk.

use std::rc::Rc;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use strum::Display;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::collection::CollectionError;
use crate::configuration::Configuration;
use crate::model::Model;
use crate::resources::{user_profile, User};
use crate::saved_tokens::CredentialStore;
use crate::session::{Session, SessionData, SessionError};
use crate::transport::{RequestOptions, Response, Transport};

const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";
const CLIENT_NAME: &str = "terminus";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{email} is not a valid email address.")]
    InvalidEmail { email: String },
    #[error("No machine token for \"{email}\" found.")]
    NoTokenForEmail { email: String },
    #[error(
        "Tokens were saved for the following email addresses:\n{}\nYou may log in via `terminus auth login --email=<email>`, or you may visit the dashboard to generate a machine token:\n{url}",
        .emails.join("\n")
    )]
    AmbiguousCredentials { emails: Vec<String>, url: String },
    #[error("Please visit the dashboard to generate a machine token:\n{url}")]
    NoCredentialsAvailable { url: String },
    #[error("{}", login_failure_message(.email.as_deref()))]
    LoginFailed { email: Option<String> },
    #[error("You are not logged in.")]
    NotLoggedIn,
    #[error(transparent)]
    Credentials(#[from] CollectionError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

fn login_failure_message(email: Option<&str>) -> String {
    match email {
        Some(email) => format!("Login unsuccessful for {}", email),
        None => "The provided machine token is not valid.".to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum AuthState {
    Unauthenticated,
    ResolvingCredential,
    Authenticating,
    Authenticated,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginRequest {
    pub machine_token: Option<String>,
    pub email: Option<String>,
}

impl LoginRequest {
    pub fn with_machine_token(mut self, machine_token: &str) -> Self {
        self.machine_token = Some(machine_token.to_string());
        self
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }
}

/// Where the machine token used for a login came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum CredentialSource {
    /// Given on the command line and not saved before
    Inline,
    /// Given on the command line and already saved
    Saved,
    SavedForEmail,
    /// The only token saved on this machine
    AutoSelected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub email: Option<String>,
    pub source: CredentialSource,
    /// The token was saved to the credential store by this login
    pub newly_saved: bool,
}

struct ResolvedCredential {
    token: String,
    email: Option<String>,
    source: CredentialSource,
}

pub struct AuthSession {
    transport: Rc<dyn Transport>,
    session: Session,
    tokens: CredentialStore,
    dashboard_protocol: String,
    dashboard_host: String,
    test_mode: bool,
    hostname: String,
    state: AuthState,
}

impl AuthSession {
    /// Opens the saved session and token store under the configured cache
    /// directory. An active saved session is installed on the transport.
    pub fn new(transport: Rc<dyn Transport>, configuration: &Configuration) -> Result<Self, AuthError> {
        let session = Session::load(configuration.session_path())?;
        let tokens = CredentialStore::open(configuration.tokens_path());
        let hostname = hostname::get()
            .ok()
            .and_then(|name| name.into_string().ok())
            .unwrap_or_else(|| "localhost".to_string());

        let mut auth = Self {
            transport,
            session,
            tokens,
            dashboard_protocol: configuration.dashboard_protocol().to_string(),
            dashboard_host: configuration.dashboard_host().to_string(),
            test_mode: configuration.test_mode(),
            hostname,
            state: AuthState::Unauthenticated,
        };

        if auth.logged_in() {
            debug!("Resuming saved session");
            auth.transport.authorize(auth.session.session_token());
            auth.state = AuthState::Authenticated;
        }
        Ok(auth)
    }

    pub fn with_hostname(mut self, hostname: &str) -> Self {
        self.hostname = hostname.to_string();
        self
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn tokens(&mut self) -> &mut CredentialStore {
        &mut self.tokens
    }

    /// Dashboard page where a machine token for this host can be created
    pub fn machine_token_creation_url(&self) -> String {
        format!(
            "{}://{}/machine-token/create/{}",
            self.dashboard_protocol, self.dashboard_host, self.hostname
        )
    }

    pub fn logged_in(&self) -> bool {
        self.session.is_active(self.test_mode)
    }

    /// Logs in with the best available machine token.
    ///
    /// An inline token wins over an email, which wins over the only saved
    /// token. An inline token not saved yet is saved once the login works.
    pub fn log_in(&mut self, request: &LoginRequest) -> Result<LoginOutcome, AuthError> {
        self.state = AuthState::ResolvingCredential;
        let credential = match self.resolve_credential(request) {
            Ok(credential) => credential,
            Err(error) => {
                self.state = AuthState::Unauthenticated;
                return Err(error);
            }
        };

        self.authenticate(&credential.token, credential.email.as_deref())?;

        let mut outcome = LoginOutcome {
            email: credential.email,
            source: credential.source,
            newly_saved: false,
        };
        if credential.source == CredentialSource::Inline {
            let user = self.current_user()?;
            let email = user.email().map_err(CollectionError::from)?.to_string();
            self.tokens.add(&email, &credential.token)?;
            outcome.email = Some(email);
            outcome.newly_saved = true;
        }
        Ok(outcome)
    }

    /// Exchanges `machine_token` for a session without consulting the store
    pub fn log_in_via_machine_token(&mut self, machine_token: &str) -> Result<(), AuthError> {
        self.authenticate(machine_token, None)
    }

    pub fn log_in_via_username_and_password(&mut self, email: &str, password: &str) -> Result<(), AuthError> {
        if !is_valid_email(email) {
            return Err(AuthError::InvalidEmail {
                email: email.to_string(),
            });
        }

        let options = RequestOptions::post()
            .with_form_param("email", email)
            .with_form_param("password", password);
        self.exchange("authorize", &options, Some(email), |response| {
            response.status_code == 200
        })
    }

    /// Forgets the session locally. Logging out twice is fine.
    pub fn log_out(&mut self) -> Result<(), AuthError> {
        self.session.destroy()?;
        self.transport.authorize(None);
        self.state = AuthState::Unauthenticated;
        info!("You have been logged out of Pantheon.");
        Ok(())
    }

    /// Profile of the user the session belongs to
    pub fn current_user(&self) -> Result<User, AuthError> {
        let user_id = self.session.user_id().ok_or(AuthError::NotLoggedIn)?;
        let mut users = user_profile(self.transport.clone(), user_id);
        Ok(users.get(user_id)?.clone())
    }

    fn resolve_credential(&mut self, request: &LoginRequest) -> Result<ResolvedCredential, AuthError> {
        if let Some(token) = &request.machine_token {
            match self.tokens.get(token) {
                Ok(saved) => {
                    return Ok(ResolvedCredential {
                        token: saved.token().to_string(),
                        email: saved.email().map(str::to_string),
                        source: CredentialSource::Saved,
                    })
                }
                Err(CollectionError::NotFound { .. }) => {}
                Err(error) => warn!("Could not read saved machine tokens: {}", error),
            }
            info!("Logging in via machine token.");
            return Ok(ResolvedCredential {
                token: token.clone(),
                email: None,
                source: CredentialSource::Inline,
            });
        }

        if let Some(email) = &request.email {
            let saved = self.tokens.get(email).map_err(|error| match error {
                CollectionError::NotFound { .. } => AuthError::NoTokenForEmail {
                    email: email.clone(),
                },
                other => other.into(),
            })?;
            return Ok(ResolvedCredential {
                token: saved.token().to_string(),
                email: Some(email.clone()),
                source: CredentialSource::SavedForEmail,
            });
        }

        let saved: Vec<(String, String)> = self
            .tokens
            .all()?
            .into_iter()
            .map(|saved| (saved.id().to_string(), saved.token().to_string()))
            .collect();

        match saved.as_slice() {
            [] => Err(AuthError::NoCredentialsAvailable {
                url: self.machine_token_creation_url(),
            }),
            [(email, token)] => {
                info!("Found a machine token for {}.", email);
                Ok(ResolvedCredential {
                    token: token.clone(),
                    email: Some(email.clone()),
                    source: CredentialSource::AutoSelected,
                })
            }
            _ => Err(AuthError::AmbiguousCredentials {
                emails: saved.iter().map(|(email, _)| email.clone()).collect(),
                url: self.machine_token_creation_url(),
            }),
        }
    }

    fn authenticate(&mut self, machine_token: &str, email: Option<&str>) -> Result<(), AuthError> {
        let options = RequestOptions::post()
            .with_form_param("machine_token", machine_token)
            .with_form_param("client", CLIENT_NAME);
        self.exchange("authorize/machine-token", &options, email, Response::is_success)
    }

    /// Posts login credentials and starts a session from the response.
    fn exchange(
        &mut self,
        path: &str,
        options: &RequestOptions,
        email: Option<&str>,
        accepted: impl Fn(&Response) -> bool,
    ) -> Result<(), AuthError> {
        self.state = AuthState::Authenticating;

        let data = match self.transport.request(path, options) {
            Ok(response) if accepted(&response) => match response.data {
                Value::Object(data) => Some(data),
                other => {
                    debug!("Login response from {} is not an object: {}", path, other);
                    None
                }
            },
            Ok(response) => {
                debug!("Login request to {} returned HTTP {}", path, response.status_code);
                None
            }
            Err(error) => {
                debug!("Login request to {} failed: {}", path, error);
                None
            }
        };

        match data {
            Some(data) => self.start_session(data),
            None => {
                self.state = AuthState::Failed;
                Err(AuthError::LoginFailed {
                    email: email.map(str::to_string),
                })
            }
        }
    }

    fn start_session(&mut self, data: SessionData) -> Result<(), AuthError> {
        if let Err(error) = self.session.set_data(data) {
            self.state = AuthState::Failed;
            return Err(error.into());
        }
        self.transport.authorize(self.session.session_token());
        self.state = AuthState::Authenticated;
        Ok(())
    }
}

fn is_valid_email(email: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(EMAIL_PATTERN).ok())
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(email))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockTransport;
    use serde_json::json;
    use tempfile::TempDir;

    fn configuration(dir: &TempDir) -> Configuration {
        let mut configuration = Configuration::default();
        configuration.set_cache_dir(dir.path().to_path_buf());
        configuration
    }

    fn auth_session(dir: &TempDir) -> (AuthSession, Rc<MockTransport>) {
        let transport = Rc::new(MockTransport::new());
        let auth = AuthSession::new(transport.clone(), &configuration(dir))
            .unwrap()
            .with_hostname("workstation");
        (auth, transport)
    }

    fn session_response() -> Value {
        json!({"session": "S1", "user_id": "u1", "expires_at": 4102444800i64})
    }

    #[test]
    fn test_inline_token_miss_is_used_and_saved() {
        let dir = TempDir::new().unwrap();
        let (mut auth, transport) = auth_session(&dir);
        transport
            .respond(200, session_response())
            .respond(200, json!({"id": "u1", "email": "a@x.com"}));

        let outcome = auth
            .log_in(&LoginRequest::default().with_machine_token("T-new"))
            .unwrap();

        assert_eq!(outcome.source, CredentialSource::Inline);
        assert!(outcome.newly_saved);
        assert_eq!(outcome.email.as_deref(), Some("a@x.com"));
        assert_eq!(auth.state(), AuthState::Authenticated);
        assert_eq!(transport.session_token().as_deref(), Some("S1"));

        let calls = transport.calls();
        assert_eq!(calls[0].path, "authorize/machine-token");
        assert_eq!(
            calls[0].options.form_params.get("machine_token").map(String::as_str),
            Some("T-new")
        );
        assert_eq!(
            calls[0].options.form_params.get("client").map(String::as_str),
            Some("terminus")
        );
        assert_eq!(calls[1].path, "users/u1");

        let mut reopened = CredentialStore::open(configuration(&dir).tokens_path());
        assert_eq!(reopened.get("a@x.com").unwrap().token(), "T-new");
    }

    #[test]
    fn test_inline_token_with_malformed_token_file() {
        let dir = TempDir::new().unwrap();
        let tokens_path = configuration(&dir).tokens_path();
        std::fs::create_dir_all(tokens_path.parent().unwrap()).unwrap();
        std::fs::write(&tokens_path, r#"{"old@x.com": 42}"#).unwrap();

        let (mut auth, transport) = auth_session(&dir);
        transport
            .respond(200, session_response())
            .respond(200, json!({"id": "u1", "email": "a@x.com"}));

        let outcome = auth
            .log_in(&LoginRequest::default().with_machine_token("T-new"))
            .unwrap();

        assert_eq!(outcome.source, CredentialSource::Inline);
        assert!(outcome.newly_saved);
        assert!(auth.logged_in());

        let mut reopened = CredentialStore::open(tokens_path);
        assert_eq!(reopened.emails().unwrap(), vec!["a@x.com"]);
        assert_eq!(reopened.get("a@x.com").unwrap().token(), "T-new");
    }

    #[test]
    fn test_log_out_with_corrupt_session_file() {
        let dir = TempDir::new().unwrap();
        let session_path = configuration(&dir).session_path();
        std::fs::create_dir_all(session_path.parent().unwrap()).unwrap();
        std::fs::write(&session_path, "{not json").unwrap();

        let (mut auth, transport) = auth_session(&dir);
        assert!(!auth.logged_in());

        auth.log_out().unwrap();
        auth.log_out().unwrap();
        assert!(!session_path.exists());
        assert_eq!(transport.session_token(), None);
    }

    #[test]
    fn test_inline_token_hit_uses_saved_credential() {
        let dir = TempDir::new().unwrap();
        let (mut auth, transport) = auth_session(&dir);
        auth.tokens().add("a@x.com", "T1").unwrap();
        transport.respond(200, session_response());

        let outcome = auth
            .log_in(&LoginRequest::default().with_machine_token("T1"))
            .unwrap();

        assert_eq!(outcome.source, CredentialSource::Saved);
        assert_eq!(outcome.email.as_deref(), Some("a@x.com"));
        assert!(!outcome.newly_saved);
        assert_eq!(transport.call_count(), 1);
    }

    #[test]
    fn test_inline_token_wins_over_email() {
        let dir = TempDir::new().unwrap();
        let (mut auth, transport) = auth_session(&dir);
        auth.tokens().add("a@x.com", "T1").unwrap();
        auth.tokens().add("b@x.com", "T2").unwrap();
        transport.respond(200, session_response());

        auth.log_in(
            &LoginRequest::default()
                .with_machine_token("T2")
                .with_email("a@x.com"),
        )
        .unwrap();

        let calls = transport.calls();
        assert_eq!(
            calls[0].options.form_params.get("machine_token").map(String::as_str),
            Some("T2")
        );
    }

    #[test]
    fn test_email_selects_saved_token() {
        let dir = TempDir::new().unwrap();
        let (mut auth, transport) = auth_session(&dir);
        auth.tokens().add("a@x.com", "T1").unwrap();
        auth.tokens().add("b@x.com", "T2").unwrap();
        transport.respond(200, session_response());

        let outcome = auth
            .log_in(&LoginRequest::default().with_email("b@x.com"))
            .unwrap();

        assert_eq!(outcome.source, CredentialSource::SavedForEmail);
        assert_eq!(
            transport.calls()[0].options.form_params.get("machine_token").map(String::as_str),
            Some("T2")
        );
    }

    #[test]
    fn test_unknown_email_has_no_token() {
        let dir = TempDir::new().unwrap();
        let (mut auth, transport) = auth_session(&dir);
        auth.tokens().add("a@x.com", "T1").unwrap();

        let error = auth
            .log_in(&LoginRequest::default().with_email("c@x.com"))
            .unwrap_err();

        assert!(matches!(error, AuthError::NoTokenForEmail { ref email } if email == "c@x.com"));
        assert_eq!(error.to_string(), "No machine token for \"c@x.com\" found.");
        assert_eq!(auth.state(), AuthState::Unauthenticated);
        assert_eq!(transport.call_count(), 0);
    }

    #[test]
    fn test_single_saved_token_is_selected() {
        let dir = TempDir::new().unwrap();
        let (mut auth, transport) = auth_session(&dir);
        auth.tokens().add("a@x.com", "T1").unwrap();
        transport.respond(200, session_response());

        let outcome = auth.log_in(&LoginRequest::default()).unwrap();

        assert_eq!(outcome.source, CredentialSource::AutoSelected);
        assert_eq!(outcome.email.as_deref(), Some("a@x.com"));
        assert!(auth.logged_in());
    }

    #[test]
    fn test_no_saved_tokens() {
        let dir = TempDir::new().unwrap();
        let (mut auth, transport) = auth_session(&dir);

        match auth.log_in(&LoginRequest::default()) {
            Err(AuthError::NoCredentialsAvailable { url }) => {
                assert_eq!(
                    url,
                    "https://dashboard.pantheon.io/machine-token/create/workstation"
                );
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(auth.state(), AuthState::Unauthenticated);
        assert_eq!(transport.call_count(), 0);
    }

    #[test]
    fn test_several_saved_tokens_are_ambiguous() {
        let dir = TempDir::new().unwrap();
        let (mut auth, transport) = auth_session(&dir);
        auth.tokens().add("a@x.com", "T1").unwrap();
        auth.tokens().add("b@x.com", "T2").unwrap();

        let error = auth.log_in(&LoginRequest::default()).unwrap_err();
        match &error {
            AuthError::AmbiguousCredentials { emails, url } => {
                assert_eq!(emails, &vec!["a@x.com".to_string(), "b@x.com".to_string()]);
                assert!(url.ends_with("/machine-token/create/workstation"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        let message = error.to_string();
        assert!(message.starts_with("Tokens were saved for the following email addresses:\na@x.com\nb@x.com\n"));
        assert_eq!(transport.call_count(), 0);
    }

    #[test]
    fn test_rejected_token_fails_login() {
        let dir = TempDir::new().unwrap();
        let (mut auth, transport) = auth_session(&dir);
        auth.tokens().add("a@x.com", "T1").unwrap();
        transport.respond(401, json!({"message": "invalid"}));

        let error = auth.log_in(&LoginRequest::default()).unwrap_err();

        assert!(matches!(error, AuthError::LoginFailed { email: Some(ref email) } if email == "a@x.com"));
        assert_eq!(error.to_string(), "Login unsuccessful for a@x.com");
        assert_eq!(auth.state(), AuthState::Failed);
        assert!(!auth.logged_in());
    }

    #[test]
    fn test_rejected_inline_token_is_not_saved() {
        let dir = TempDir::new().unwrap();
        let (mut auth, transport) = auth_session(&dir);
        transport.fail("connection refused");

        let error = auth
            .log_in(&LoginRequest::default().with_machine_token("T-bad"))
            .unwrap_err();

        assert_eq!(error.to_string(), "The provided machine token is not valid.");
        assert!(auth.tokens().all().unwrap().is_empty());
    }

    #[test]
    fn test_session_keeps_machine_token_when_response_omits_it() {
        let dir = TempDir::new().unwrap();
        let (mut auth, transport) = auth_session(&dir);
        transport
            .respond(200, json!({"session": "S1", "machine_token": "T1"}))
            .respond(200, json!({"session": "S2"}));

        auth.log_in_via_machine_token("T1").unwrap();
        auth.log_in_via_machine_token("T1").unwrap();

        assert_eq!(auth.session().session_token(), Some("S2"));
        assert_eq!(auth.session().machine_token(), Some("T1"));
    }

    #[test]
    fn test_password_login_validates_email_first() {
        let dir = TempDir::new().unwrap();
        let (mut auth, transport) = auth_session(&dir);

        let error = auth
            .log_in_via_username_and_password("not-an-email", "secret")
            .unwrap_err();

        assert!(matches!(error, AuthError::InvalidEmail { .. }));
        assert_eq!(error.to_string(), "not-an-email is not a valid email address.");
        assert_eq!(transport.call_count(), 0);
    }

    #[test]
    fn test_email_validation_is_repeatable() {
        for _ in 0..3 {
            assert!(is_valid_email("a@x.com"));
            assert!(!is_valid_email("a@x"));
            assert!(!is_valid_email("a b@x.com"));
        }
    }

    #[test]
    fn test_password_login_requires_ok_status() {
        let dir = TempDir::new().unwrap();
        let (mut auth, transport) = auth_session(&dir);
        transport
            .respond(201, session_response())
            .respond(200, session_response());

        assert!(matches!(
            auth.log_in_via_username_and_password("a@x.com", "secret"),
            Err(AuthError::LoginFailed { .. })
        ));
        auth.log_in_via_username_and_password("a@x.com", "secret")
            .unwrap();

        let calls = transport.calls();
        assert_eq!(calls[1].path, "authorize");
        assert_eq!(
            calls[1].options.form_params.get("email").map(String::as_str),
            Some("a@x.com")
        );
        assert_eq!(auth.state(), AuthState::Authenticated);
    }

    #[test]
    fn test_log_out_twice() {
        let dir = TempDir::new().unwrap();
        let (mut auth, transport) = auth_session(&dir);
        transport.respond(200, session_response());
        auth.log_in_via_machine_token("T1").unwrap();
        assert!(auth.session().path().exists());

        auth.log_out().unwrap();
        auth.log_out().unwrap();

        assert!(!auth.logged_in());
        assert!(!auth.session().path().exists());
        assert_eq!(transport.session_token(), None);
        assert_eq!(auth.state(), AuthState::Unauthenticated);
    }

    #[test]
    fn test_saved_session_is_resumed() {
        let dir = TempDir::new().unwrap();
        let (mut auth, transport) = auth_session(&dir);
        transport.respond(200, session_response());
        auth.log_in_via_machine_token("T1").unwrap();

        let (resumed, transport) = auth_session(&dir);
        assert_eq!(resumed.state(), AuthState::Authenticated);
        assert_eq!(transport.session_token().as_deref(), Some("S1"));
    }

    #[test]
    fn test_current_user_requires_session() {
        let dir = TempDir::new().unwrap();
        let (auth, _) = auth_session(&dir);
        assert!(matches!(auth.current_user(), Err(AuthError::NotLoggedIn)));
    }
}
