use clap::ArgMatches;
use tracing::{debug, info};

use crate::{
    auth::LoginRequest,
    commands::params::{PARAMETER_EMAIL, PARAMETER_MACHINE_TOKEN},
    context::ExecutionContext,
    error::CliError,
    format::{Formattable, Record},
    model::Model,
    param_utils::get_format_parameter_value,
};

/// Builds the login request from `auth login` arguments
pub fn login_request(sub_matches: &ArgMatches) -> LoginRequest {
    LoginRequest {
        machine_token: sub_matches.get_one::<String>(PARAMETER_MACHINE_TOKEN).cloned(),
        email: sub_matches.get_one::<String>(PARAMETER_EMAIL).cloned(),
    }
}

pub fn login(context: &mut ExecutionContext, sub_matches: &ArgMatches) -> Result<(), CliError> {
    let request = login_request(sub_matches);
    let outcome = context.auth().log_in(&request)?;

    if outcome.newly_saved {
        debug!("Saved the machine token for later use");
    }
    match outcome.email {
        Some(email) => info!("Logged in as {}.", email),
        None => info!("Logged in."),
    }
    Ok(())
}

pub fn logout(context: &mut ExecutionContext) -> Result<(), CliError> {
    context.auth().log_out()?;
    Ok(())
}

/// Serialized profile of the current user, or `None` without a session
pub fn current_user_record(context: &mut ExecutionContext) -> Result<Option<Record>, CliError> {
    if !context.auth().logged_in() {
        return Ok(None);
    }
    let user = context.auth().current_user()?;
    Ok(Some(Record(user.serialize())))
}

pub fn whoami(context: &mut ExecutionContext, sub_matches: &ArgMatches) -> Result<(), CliError> {
    let format = get_format_parameter_value(sub_matches)?;
    match current_user_record(context)? {
        Some(record) => println!("{}", record.format(&format)?),
        None => info!("You are not logged in."),
    }
    Ok(())
}
