mod auth;
mod cli;
mod config;
mod error;
mod jenkins;
mod orchestrator;
mod output;
mod registry;

use clap::Parser;
use cli::Cli;
use error::JenkinsError;
use log::{debug, LevelFilter};

fn log_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG still wins over -v when it is set.
    env_logger::Builder::new()
        .filter_level(log_level(cli.verbose))
        .parse_default_env()
        .format_timestamp(None)
        .init();

    debug!("Starting jj {}", env!("CARGO_PKG_VERSION"));

    let code = match cli.execute().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", output::bright_red("error:"), e);
            match e.downcast_ref::<JenkinsError>() {
                Some(jenkins) => {
                    debug!("Failed with {:?}", jenkins.kind());
                    jenkins.exit_code()
                }
                None => 1,
            }
        }
    };

    std::process::exit(code);
}
