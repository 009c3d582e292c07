//! Site and environment command definitions.

use crate::commands::params::{
    framework_parameter, site_parameter, COMMAND_ENV, COMMAND_LIST, COMMAND_SITE,
};
use clap::Command;

pub fn site_command() -> Command {
    Command::new(COMMAND_SITE)
        .about("Site operations")
        .subcommand_required(true)
        .subcommand(
            Command::new(COMMAND_LIST)
                .about("List the sites you are a member of")
                .arg(framework_parameter()),
        )
}

pub fn env_command() -> Command {
    Command::new(COMMAND_ENV)
        .about("Environment operations")
        .subcommand_required(true)
        .subcommand(
            Command::new(COMMAND_LIST)
                .about("List the environments of a site")
                .arg(site_parameter()),
        )
}
