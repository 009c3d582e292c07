use clap::ArgMatches;
use tracing::trace;

use crate::{
    commands::params::{PARAMETER_FORMAT, PARAMETER_HEADERS, PARAMETER_PRETTY},
    error::CliError,
    format::{OutputFormat, OutputFormatOptions},
};

/// Resolves the output format from the global format flags.
pub fn get_format_parameter_value(sub_matches: &ArgMatches) -> Result<OutputFormat, CliError> {
    trace!("Resolving output format options...");

    let format = sub_matches
        .get_one::<String>(PARAMETER_FORMAT)
        .ok_or_else(|| CliError::MissingRequiredArgument(PARAMETER_FORMAT.to_string()))?;
    let with_headers = sub_matches.get_flag(PARAMETER_HEADERS);
    let pretty = sub_matches.get_flag(PARAMETER_PRETTY);

    trace!("Format: {}", format);
    trace!("With headers: {}", with_headers);
    trace!("Pretty: {}", pretty);

    let options = OutputFormatOptions {
        with_headers,
        pretty,
    };
    Ok(OutputFormat::from_string_with_options(format, options)?)
}
