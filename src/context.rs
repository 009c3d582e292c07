//! Execution context shared by CLI actions.
//!
//! Holds the configuration, the transport every collection fetches through,
//! and the authentication session built on both.

use std::rc::Rc;

use tracing::trace;

use crate::{
    auth::{AuthError, AuthSession},
    collection::Collection,
    configuration::Configuration,
    error::CliError,
    http_utils::{HttpRequestConfig, HttpTransport},
    resources::{site_environments, user_sites, Environment, Site},
    transport::Transport,
};

pub struct ExecutionContext {
    configuration: Configuration,
    transport: Rc<dyn Transport>,
    auth: AuthSession,
}

impl ExecutionContext {
    /// Create a context talking to the configured API over HTTP.
    pub fn from_configuration(configuration: Configuration) -> Result<Self, CliError> {
        let transport = HttpTransport::new(HttpRequestConfig::from_configuration(&configuration))?;
        Self::with_transport(configuration, Rc::new(transport))
    }

    pub fn with_transport(
        configuration: Configuration,
        transport: Rc<dyn Transport>,
    ) -> Result<Self, CliError> {
        trace!("Cache directory: {:?}", configuration.cache_dir());
        let auth = AuthSession::new(transport.clone(), &configuration)?;
        Ok(ExecutionContext {
            configuration,
            transport,
            auth,
        })
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn auth(&mut self) -> &mut AuthSession {
        &mut self.auth
    }

    /// Id of the logged-in user, failing when there is no active session
    pub fn require_login(&self) -> Result<String, CliError> {
        if !self.auth.logged_in() {
            return Err(AuthError::NotLoggedIn.into());
        }
        self.auth
            .session()
            .user_id()
            .map(str::to_string)
            .ok_or_else(|| AuthError::NotLoggedIn.into())
    }

    /// Sites of the logged-in user
    pub fn sites(&self) -> Result<Collection<Site>, CliError> {
        let user_id = self.require_login()?;
        Ok(user_sites(self.transport.clone(), &user_id))
    }

    pub fn environments(&self, site_id: &str) -> Collection<Environment> {
        site_environments(self.transport.clone(), site_id)
    }
}
