//! Resolve Bridge CLI: run one editing operation inside DaVinci Resolve.
//!
//! Usage:
//!   resolve-bridge <operation> [payload]
//!
//! Prints exactly one JSON object on stdout. Diagnostics go to stderr.
//! Exits 1 when the operation name is missing or unknown, 0 otherwise.

use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::process::ExitCode;

use clap::Parser;

use resolve_bridge_common::{config::BridgeConfig, logging, BridgeError};
use resolve_bridge_operations::{dispatch, Context, Response, FALLBACK_LINE};

// Help and version flags are disabled: every argument vector, including
// `--help`, must answer with a single JSON line.
#[derive(Parser)]
#[command(
    name = "resolve-bridge",
    about = "Run an editing operation in DaVinci Resolve and print a JSON result",
    version,
    author,
    disable_help_flag = true,
    disable_version_flag = true
)]
struct Cli {
    /// Enable verbose logging on stderr
    #[arg(short, long)]
    verbose: bool,

    /// Operation name, e.g. exportInOutVideo or diagInOut
    function: Option<String>,

    /// JSON payload for the operation
    #[arg(default_value = "{}", allow_hyphen_values = true)]
    payload: String,

    /// Ignored
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, num_args = 0.., hide = true)]
    extra: Vec<String>,
}

fn main() -> anyhow::Result<ExitCode> {
    let mut config = BridgeConfig::load();
    let (line, code) = match Cli::try_parse() {
        Ok(cli) => {
            if cli.verbose {
                config.logging.level = "debug".to_string();
            }
            logging::init_logging(&config.logging);
            execute(&cli, config)
        }
        Err(e) => {
            logging::init_logging(&config.logging);
            tracing::debug!(kind = ?e.kind(), "Rejected command line");
            let args: Vec<String> = std::env::args_os()
                .skip(1)
                .map(|arg| arg.to_string_lossy().into_owned())
                .collect();
            let response = Response::failure(&rejected_arguments(&args));
            (response.to_line(), ExitCode::FAILURE)
        }
    };

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{line}")?;
    stdout.flush()?;
    Ok(code)
}

fn execute(cli: &Cli, config: BridgeConfig) -> (String, ExitCode) {
    if !cli.extra.is_empty() {
        tracing::debug!(extra = ?cli.extra, "Ignoring trailing arguments");
    }
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| run(cli, config)));
    match outcome {
        Ok((response, code)) => (response.to_line(), code),
        Err(_) => {
            tracing::error!("Operation panicked");
            (FALLBACK_LINE.to_string(), ExitCode::FAILURE)
        }
    }
}

fn run(cli: &Cli, config: BridgeConfig) -> (Response, ExitCode) {
    // An unknown name must not pay for starting the scripting host.
    if let Err(e) = precheck(cli.function.as_deref()) {
        return (Response::failure(&e), ExitCode::FAILURE);
    }

    let session = resolve_bridge_automation_resolve::connect();
    let ctx = Context::new(session, config);
    match dispatch(&ctx, cli.function.as_deref(), &cli.payload) {
        Ok(response) => (response, ExitCode::SUCCESS),
        Err(e) => {
            let code = if e.is_dispatch_error() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
            (Response::failure(&e), code)
        }
    }
}

fn precheck(function: Option<&str>) -> Result<(), BridgeError> {
    let name = function.ok_or(BridgeError::NoFunction)?;
    name.parse::<resolve_bridge_operations::OperationKind>()?;
    Ok(())
}

/// The error reported when clap rejects the command line: the first
/// argument other than the verbose flag is taken as the operation name.
fn rejected_arguments(args: &[String]) -> BridgeError {
    match args.iter().find(|arg| !matches!(arg.as_str(), "-v" | "--verbose")) {
        Some(name) => BridgeError::UnknownFunction { name: name.clone() },
        None => BridgeError::NoFunction,
    }
}
