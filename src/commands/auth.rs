//! Authentication command definitions.

use crate::commands::params::{
    email_parameter, machine_token_parameter, COMMAND_AUTH, COMMAND_LOGIN, COMMAND_LOGOUT,
    COMMAND_WHOAMI,
};
use clap::Command;

/// Create the authentication command with all its subcommands.
pub fn auth_command() -> Command {
    Command::new(COMMAND_AUTH)
        .about("Authentication operations")
        .subcommand_required(true)
        .subcommand(
            Command::new(COMMAND_LOGIN)
                .about("Log in with a machine token, or with a token saved earlier")
                .arg(machine_token_parameter())
                .arg(email_parameter()),
        )
        .subcommand(Command::new(COMMAND_LOGOUT).about("Log out and remove the saved session"))
        .subcommand(Command::new(COMMAND_WHOAMI).about("Show the currently logged-in user"))
}
