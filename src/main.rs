use terminus::{
    cli::execute_command,
    commands::{create_cli_commands, params::PARAMETER_VERBOSE},
    configuration::Configuration,
    error::CliError,
};
use tracing_subscriber::EnvFilter;

/// Main entry point for the program
fn main() {
    let matches = create_cli_commands();

    // RUST_LOG wins over the verbosity flag
    let default_directive = if matches.get_flag(PARAMETER_VERBOSE) {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let result = Configuration::load_or_create_default()
        .map_err(CliError::from)
        .and_then(|configuration| execute_command(configuration, &matches));

    if let Err(e) = result {
        eprintln!("ERROR: {}", e);
        ::std::process::exit(e.exit_code().code());
    }
}
