use std::env;
use std::io;
use std::process::ExitCode;

use curve_cli_core::{Dispatcher, RootConfig};
use tracing_subscriber::EnvFilter;

mod fs;
mod output;
mod version;

use fs::FsCommandFactory;
use version::BuildVersion;

const PROGRAM: &str = "curve";

/// Environment variable holding the log filter (e.g. `debug`).
const LOG_ENV: &str = "CURVE_LOG";

fn main() -> ExitCode {
    init_logging();

    let config = RootConfig::new(PROGRAM, &BuildVersion);
    let fs = FsCommandFactory::new(&config.version);
    let dispatcher = match Dispatcher::new(config, &[&fs]) {
        Ok(dispatcher) => dispatcher,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let args: Vec<String> = env::args_os()
        .skip(1)
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();

    let stdout = io::stdout();
    let stderr = io::stderr();
    dispatcher
        .run(&args, &mut stdout.lock(), &mut stderr.lock())
        .into()
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
