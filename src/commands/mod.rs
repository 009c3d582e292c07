//! CLI command definitions and argument parsing.
//!
//! Commands are built with the clap builder API, one submodule per command
//! group.

use clap::{Arg, ArgAction, ArgMatches, Command};

pub mod auth;
pub mod params;
pub mod site;

use params::{
    format_parameter, format_pretty_parameter, format_with_headers_parameter, PARAMETER_VERBOSE,
};

/// The full command tree, without parsing anything.
pub fn cli_command() -> Command {
    Command::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .propagate_version(true)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new(PARAMETER_VERBOSE)
                .short('v')
                .long(PARAMETER_VERBOSE)
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Enable verbose output for debugging"),
        )
        .arg(format_parameter())
        .arg(format_pretty_parameter())
        .arg(format_with_headers_parameter())
        .subcommand(auth::auth_command())
        .subcommand(site::site_command())
        .subcommand(site::env_command())
}

/// Parse the process arguments.
pub fn create_cli_commands() -> ArgMatches {
    cli_command().get_matches()
}
