use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{debug, info};
use std::path::PathBuf;
use tokio::sync::watch;

use crate::auth::Credentials;
use crate::config::Config;
use crate::jenkins::DEFAULT_BUILD_LIMIT;
use crate::orchestrator::{Orchestrator, RunRequest};
use crate::output;
use crate::registry::Environment;

#[derive(Parser)]
#[command(name = "jj")]
#[command(author, version, about = "jj - simple command line utility which just runs any Jenkins job", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to <config dir>/jj/config.toml)
    #[arg(long, global = true, env = "JJ_CONFIG")]
    config: Option<PathBuf>,

    /// Log more details to stderr (repeat for more)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a job and follow its console output
    Run {
        job: String,

        /// Jenkins environment to use instead of the current one
        #[arg(short, long, default_value = "")]
        name: String,

        /// Build parameter, repeatable
        #[arg(short, long = "param", value_name = "KEY=VALUE", value_parser = parse_parameter)]
        params: Vec<(String, String)>,

        /// Return as soon as the build has a number
        #[arg(long, default_value_t = false)]
        no_follow: bool,
    },

    /// List jobs, or the recent builds of a job
    Get {
        job: Option<String>,

        #[arg(short, long, default_value = "")]
        name: String,

        /// Number of builds to show
        #[arg(short, long, default_value_t = DEFAULT_BUILD_LIMIT)]
        limit: usize,

        /// Print bare names only
        #[arg(long, default_value_t = false)]
        no_headers: bool,

        /// List configured Jenkins environments instead
        #[arg(short, long, default_value_t = false)]
        environments: bool,
    },

    /// Stop a running build (the newest one when no number is given)
    Stop {
        job: String,

        number: Option<u64>,

        #[arg(short, long, default_value = "")]
        name: String,
    },

    /// Configure access to a Jenkins instance
    Set {
        name: String,

        #[arg(short, long)]
        url: String,

        #[arg(long, env = "JJ_USERNAME")]
        username: String,

        #[arg(short, long, env = "JJ_TOKEN", hide_env_values = true)]
        token: String,
    },

    /// Make a Jenkins environment the current one
    Use { name: String },

    /// Remove a Jenkins environment
    #[command(alias = "del")]
    Delete { name: String },
}

fn parse_parameter(raw: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    if key.is_empty() {
        return Err(format!("parameter name is empty in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Sends `true` once the user presses Ctrl-C.
fn cancel_on_ctrl_c() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Ctrl-C received");
            let _ = tx.send(true);
        }
    });
    rx
}

impl Cli {
    fn config_path(&self) -> Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => Config::default_path(),
        }
    }

    /// Runs the selected command and returns the process exit code.
    pub async fn execute(&self) -> Result<i32> {
        let config_path = self.config_path()?;
        let mut config = Config::load(&config_path)?;
        let policy = config.settings.poll_policy();
        let mut orchestrator = Orchestrator::new(config.registry()?, policy);

        match &self.command {
            Commands::Run {
                job,
                name,
                params,
                no_follow,
            } => {
                let request = RunRequest {
                    environment: name.clone(),
                    job: job.clone(),
                    parameters: params.iter().cloned().collect(),
                    follow: !no_follow,
                };
                let mut observer = output::ConsoleObserver::default();
                let outcome = orchestrator
                    .run(&request, cancel_on_ctrl_c(), &mut observer)
                    .await?;
                output::print_run_outcome(&outcome);
                Ok(outcome.exit_code())
            }
            Commands::Get {
                job,
                name,
                limit,
                no_headers,
                environments,
            } => {
                if *environments {
                    output::print_environments(orchestrator.registry(), *no_headers);
                } else if let Some(job) = job {
                    let builds = orchestrator.builds(name, job, *limit).await?;
                    output::print_builds(&builds, *no_headers);
                } else {
                    let jobs = orchestrator.jobs(name).await?;
                    output::print_jobs(&jobs, *no_headers);
                }
                Ok(0)
            }
            Commands::Stop { job, number, name } => {
                let report = orchestrator.stop(name, job, *number).await?;
                output::print_stop(&report);
                Ok(0)
            }
            Commands::Set {
                name,
                url,
                username,
                token,
            } => {
                let env = Environment::new(
                    name.clone(),
                    url,
                    Credentials::new(username.clone(), token.clone()),
                )?;
                orchestrator.set_environment(env);
                self.save(&mut config, &orchestrator, &config_path)?;
                eprintln!("Jenkins '{name}' saved");
                Ok(0)
            }
            Commands::Use { name } => {
                orchestrator.use_environment(name)?;
                self.save(&mut config, &orchestrator, &config_path)?;
                eprintln!("Jenkins '{name}' is now the current one");
                Ok(0)
            }
            Commands::Delete { name } => {
                orchestrator.delete_environment(name)?;
                self.save(&mut config, &orchestrator, &config_path)?;
                eprintln!("Jenkins '{name}' deleted");
                Ok(0)
            }
        }
    }

    fn save(
        &self,
        config: &mut Config,
        orchestrator: &Orchestrator,
        path: &std::path::Path,
    ) -> Result<()> {
        config.store_registry(orchestrator.registry());
        config
            .save(path)
            .with_context(|| format!("Failed to save environments to {}", path.display()))?;
        info!("Configuration written to: {}", path.display());
        Ok(())
    }
}
