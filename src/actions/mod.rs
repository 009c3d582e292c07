//! Command actions: each runs one subcommand against an
//! [`crate::context::ExecutionContext`] and prints its result.

pub mod auth;
pub mod sites;
