//! # vpcmig CLI Entry Point

use std::process::ExitCode;

use clap::Parser;
use vpcmig_cli::{exit, logging, migrate, Cli};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.global.verbose, cli.global.log_json);

    match migrate::run(&cli.global, &cli.command).await {
        Ok(()) => ExitCode::from(exit::SUCCESS),
        Err(err) => {
            let code = exit::exit_code_for(&err);
            tracing::error!(exit_code = code, "{err:#}");
            ExitCode::from(code)
        }
    }
}
