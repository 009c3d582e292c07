//! Shared command parameters for all CLI commands.
//!
//! Parameter and command names live here so that command definitions and
//! actions agree on them.

use crate::format::OutputFormat;
use clap::{Arg, ArgAction};

pub const COMMAND_LIST: &str = "list";

// Auth commands
pub const COMMAND_AUTH: &str = "auth";
pub const COMMAND_LOGIN: &str = "login";
pub const COMMAND_LOGOUT: &str = "logout";
pub const COMMAND_WHOAMI: &str = "whoami";

// Resource commands
pub const COMMAND_SITE: &str = "site";
pub const COMMAND_ENV: &str = "env";

// Parameter names
pub const PARAMETER_VERBOSE: &str = "verbose";
pub const PARAMETER_FORMAT: &str = "format";
pub const PARAMETER_PRETTY: &str = "pretty";
pub const PARAMETER_HEADERS: &str = "headers";
pub const PARAMETER_MACHINE_TOKEN: &str = "machine-token";
pub const PARAMETER_EMAIL: &str = "email";
pub const PARAMETER_FRAMEWORK: &str = "framework";
pub const PARAMETER_SITE: &str = "site";

/// Create the global format parameter.
pub fn format_parameter() -> Arg {
    Arg::new(PARAMETER_FORMAT)
        .short('f')
        .long(PARAMETER_FORMAT)
        .num_args(1)
        .required(false)
        .env("TERMINUS_FORMAT")
        .default_value("json")
        .global(true)
        .help("Output data format")
        .value_parser(OutputFormat::names())
}

pub fn format_pretty_parameter() -> Arg {
    Arg::new(PARAMETER_PRETTY)
        .long(PARAMETER_PRETTY)
        .action(ArgAction::SetTrue)
        .required(false)
        .global(true)
        .help("Format the output pretty")
}

pub fn format_with_headers_parameter() -> Arg {
    Arg::new(PARAMETER_HEADERS)
        .long(PARAMETER_HEADERS)
        .action(ArgAction::SetTrue)
        .required(false)
        .global(true)
        .env("TERMINUS_HEADERS")
        .help("Format the output with headers")
}

/// Create the machine token parameter.
pub fn machine_token_parameter() -> Arg {
    Arg::new(PARAMETER_MACHINE_TOKEN)
        .long(PARAMETER_MACHINE_TOKEN)
        .num_args(1)
        .required(false)
        .help("Machine token to log in with; saved for later use once the login succeeds")
}

/// Create the email parameter.
pub fn email_parameter() -> Arg {
    Arg::new(PARAMETER_EMAIL)
        .long(PARAMETER_EMAIL)
        .num_args(1)
        .required(false)
        .help("Email address of a previously saved machine token")
}

pub fn framework_parameter() -> Arg {
    Arg::new(PARAMETER_FRAMEWORK)
        .long(PARAMETER_FRAMEWORK)
        .num_args(1)
        .required(false)
        .help("Only list sites built on this framework (e.g. drupal8, wordpress)")
}

pub fn site_parameter() -> Arg {
    Arg::new(PARAMETER_SITE)
        .short('s')
        .long(PARAMETER_SITE)
        .num_args(1)
        .required(true)
        .help("Site name or ID")
}
