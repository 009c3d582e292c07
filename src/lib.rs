//! Command-line client library for the hosting platform REST API.
//!
//! Every remote resource is a lazily populated [`collection::Collection`]
//! of typed [`model::Model`]s fetched through a [`transport::Transport`].
//! Logins go through [`auth::AuthSession`], which draws machine tokens from
//! the [`saved_tokens::CredentialStore`] and persists the resulting
//! [`session::Session`].
//!
//! # Modules
//!
//! - `collection`: generic, identity-indexed collections and their fetch protocol
//! - `model`: the map-backed model base and the `Model` trait
//! - `resources`: sites, environments and users
//! - `saved_tokens`: machine tokens saved on this machine
//! - `session`: the persisted login session
//! - `auth`: the login and logout workflow
//! - `transport`, `http_utils`: the request contract and its HTTP implementation
//! - `commands`, `actions`, `cli`: the command-line interface

pub mod actions;
pub mod auth;
pub mod cli;
pub mod collection;
pub mod commands;
pub mod configuration;
pub mod context;
pub mod error;
pub mod exit_codes;
pub mod format;
pub mod http_utils;
pub mod model;
pub mod param_utils;
pub mod resources;
pub mod saved_tokens;
pub mod session;
pub mod transport;

#[cfg(test)]
mod test_utils;
