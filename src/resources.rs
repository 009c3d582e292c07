//! Platform resources: sites, environments and users.
//!
//! These are plain data holders over [`ModelBase`]; the interesting
//! behaviour lives in [`crate::collection`].

use std::rc::Rc;

use crate::collection::{Collection, Endpoint};
use crate::model::{Model, ModelBase, ModelError};
use crate::transport::Transport;

#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    base: ModelBase,
}

impl Model for Site {
    const KIND: &'static str = "site";

    fn from_base(base: ModelBase) -> Result<Self, ModelError> {
        Ok(Site { base })
    }

    fn base(&self) -> &ModelBase {
        &self.base
    }
}

impl Site {
    pub fn name(&self) -> Result<&str, ModelError> {
        self.base.get_str("name")
    }

    pub fn framework(&self) -> Option<&str> {
        self.base.get_opt_str("framework")
    }

    pub fn created(&self) -> Option<i64> {
        self.base.get_opt_i64("created")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Environment {
    base: ModelBase,
}

impl Model for Environment {
    const KIND: &'static str = "environment";

    fn from_base(base: ModelBase) -> Result<Self, ModelError> {
        Ok(Environment { base })
    }

    fn base(&self) -> &ModelBase {
        &self.base
    }
}

impl Environment {
    /// Id of the site this environment belongs to
    pub fn site_id(&self) -> Option<&str> {
        self.base.property("site_id").and_then(|v| v.as_str())
    }

    pub fn domain(&self) -> Option<&str> {
        self.base.get_opt_str("dns_zone")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    base: ModelBase,
}

impl Model for User {
    const KIND: &'static str = "user";

    fn from_base(base: ModelBase) -> Result<Self, ModelError> {
        Ok(User { base })
    }

    fn base(&self) -> &ModelBase {
        &self.base
    }
}

impl User {
    pub fn email(&self) -> Result<&str, ModelError> {
        self.base.get_str("email")
    }
}

/// Sites the user is a member of
pub fn user_sites(transport: Rc<dyn Transport>, user_id: &str) -> Collection<Site> {
    Collection::remote(
        transport,
        Endpoint::new(format!("users/{}/memberships/sites", user_id)).paged(),
    )
}

/// Environments of one site, keyed by environment name
pub fn site_environments(transport: Rc<dyn Transport>, site_id: &str) -> Collection<Environment> {
    Collection::remote(
        transport,
        Endpoint::new(format!("sites/{}/environments", site_id)),
    )
    .with_member_property("site_id", site_id)
}

/// Single-member collection holding the user profile
pub fn user_profile(transport: Rc<dyn Transport>, user_id: &str) -> Collection<User> {
    Collection::remote(
        transport,
        Endpoint::new(format!("users/{}", user_id)).single(),
    )
}
