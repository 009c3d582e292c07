use clap::ArgMatches;
use tracing::trace;

use crate::{
    actions,
    commands::params::{
        COMMAND_AUTH, COMMAND_ENV, COMMAND_LIST, COMMAND_LOGIN, COMMAND_LOGOUT, COMMAND_SITE,
        COMMAND_WHOAMI,
    },
    configuration::Configuration,
    context::ExecutionContext,
    error::CliError,
};

fn extract_subcommand_name(sub_matches: &ArgMatches) -> String {
    let message = match sub_matches.subcommand() {
        Some(m) => m.0,
        None => "unknown",
    };

    message.to_string()
}

/// Runs the parsed command line against a fresh execution context.
pub fn execute_command(configuration: Configuration, matches: &ArgMatches) -> Result<(), CliError> {
    let mut context = ExecutionContext::from_configuration(configuration)?;
    dispatch(&mut context, matches)
}

pub fn dispatch(context: &mut ExecutionContext, matches: &ArgMatches) -> Result<(), CliError> {
    match matches.subcommand() {
        Some((COMMAND_AUTH, sub_matches)) => match sub_matches.subcommand() {
            Some((COMMAND_LOGIN, sub_matches)) => {
                trace!("Executing \"auth login\"...");
                actions::auth::login(context, sub_matches)
            }
            Some((COMMAND_LOGOUT, _)) => {
                trace!("Executing \"auth logout\"...");
                actions::auth::logout(context)
            }
            Some((COMMAND_WHOAMI, sub_matches)) => {
                trace!("Executing \"auth whoami\"...");
                actions::auth::whoami(context, sub_matches)
            }
            _ => Err(CliError::UnsupportedSubcommand(extract_subcommand_name(
                sub_matches,
            ))),
        },
        Some((COMMAND_SITE, sub_matches)) => match sub_matches.subcommand() {
            Some((COMMAND_LIST, sub_matches)) => {
                trace!("Executing \"site list\"...");
                actions::sites::list_sites(context, sub_matches)
            }
            _ => Err(CliError::UnsupportedSubcommand(extract_subcommand_name(
                sub_matches,
            ))),
        },
        Some((COMMAND_ENV, sub_matches)) => match sub_matches.subcommand() {
            Some((COMMAND_LIST, sub_matches)) => {
                trace!("Executing \"env list\"...");
                actions::sites::list_environments(context, sub_matches)
            }
            _ => Err(CliError::UnsupportedSubcommand(extract_subcommand_name(
                sub_matches,
            ))),
        },
        _ => Err(CliError::UnsupportedSubcommand(extract_subcommand_name(
            matches,
        ))),
    }
}
