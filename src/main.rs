mod check;
mod cli;
mod client;
mod config;
mod dryrun;
mod policy;
mod progress;
mod report;
mod suite;
mod types;
mod wait;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
use regex::Regex;

use client::{HttpClient, Transport};
use config::Config;
use report::SessionReport;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            suites,
            filter,
            output_dir,
            no_wait,
            dry_run,
            json,
        } => {
            let cfg = match load_config_with_overrides(
                &cli.config,
                cli.base_url.as_deref(),
                cli.username.as_deref(),
                cli.password.as_deref(),
            ) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("Error: {e:#}");
                    std::process::exit(2);
                }
            };

            let filter = match filter.as_deref().map(Regex::new).transpose() {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("Error: invalid --filter: {e}");
                    std::process::exit(2);
                }
            };

            if dry_run {
                std::process::exit(print_dry_run_plan(
                    &cfg,
                    suites.as_deref(),
                    filter.as_ref(),
                    json,
                ));
            }

            let verbose = cli.verbose;
            let result = tokio::task::spawn_blocking(move || {
                run_session(&cfg, suites.as_deref(), filter.as_ref(), no_wait, verbose)
            })
            .await;

            let session = match result {
                Ok(Ok(session)) => session,
                Ok(Err(e)) => {
                    eprintln!("Error: {e:#}");
                    std::process::exit(2);
                }
                Err(e) => {
                    eprintln!("Error: run panicked: {e}");
                    std::process::exit(2);
                }
            };

            report::print_session(&session);

            let json_path = Path::new(&output_dir).join("results.json");
            if let Err(e) = report::write_json(&session, &json_path) {
                eprintln!("Error writing JSON: {e:#}");
                std::process::exit(2);
            }
            println!("Results written to {}", json_path.display());

            std::process::exit(if session.all_passed() { 0 } else { 1 });
        }
        Commands::Wait => {
            let cfg = match load_config_with_overrides(
                &cli.config,
                cli.base_url.as_deref(),
                cli.username.as_deref(),
                cli.password.as_deref(),
            ) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("Error: {e:#}");
                    std::process::exit(2);
                }
            };

            let base_url = cfg.server.base_url.clone();
            let verbose = cli.verbose;
            let result = tokio::task::spawn_blocking(move || -> anyhow::Result<u32> {
                let client = HttpClient::new(cfg.server.client_settings())?;
                wait::wait_for_service(&client, &cfg.wait, verbose)
            })
            .await;

            match result {
                Ok(Ok(attempts)) => {
                    println!("Service available at {base_url} (attempt {attempts})");
                    std::process::exit(0);
                }
                Ok(Err(e)) => {
                    eprintln!("Error: {e:#}");
                    std::process::exit(2);
                }
                Err(e) => {
                    eprintln!("Error: wait panicked: {e}");
                    std::process::exit(2);
                }
            }
        }
        Commands::Results { output_dir } => {
            let json_path = Path::new(&output_dir).join("results.json");
            match report::read_json(&json_path) {
                Ok(session) => {
                    report::print_session(&session);
                    std::process::exit(if session.all_passed() { 0 } else { 1 });
                }
                Err(e) => {
                    eprintln!("Error: {e:#}");
                    eprintln!("Expected: {}", json_path.display());
                    std::process::exit(2);
                }
            }
        }
    }
}

/// Load the suite config and apply command-line server overrides.
fn load_config_with_overrides(
    path: &Path,
    base_url: Option<&str>,
    username: Option<&str>,
    password: Option<&str>,
) -> anyhow::Result<Config> {
    let mut cfg = config::load_config(path)?;
    if let Some(url) = base_url {
        cfg.server.base_url = url.to_string();
    }
    if let Some(user) = username {
        cfg.server.username = Some(user.to_string());
    }
    if let Some(pass) = password {
        cfg.server.password = Some(pass.to_string());
    }
    Ok(cfg)
}

/// Wait for the server (unless skipped) and run the selected suites.
/// Blocking: call from `spawn_blocking`.
fn run_session(
    cfg: &Config,
    selection: Option<&str>,
    filter: Option<&Regex>,
    no_wait: bool,
    verbose: bool,
) -> anyhow::Result<SessionReport> {
    let selected = suite::select_suites(cfg, selection).map_err(anyhow::Error::msg)?;
    let client = HttpClient::new(cfg.server.client_settings())?;

    if !no_wait {
        wait::wait_for_service(&client, &cfg.wait, verbose).context("Service unavailable")?;
    }

    let transport: Arc<dyn Transport> = Arc::new(client);
    let session = suite::run_suites(&selected, transport, &cfg.server.base_url, filter, |s| {
        Box::new(progress::SpinnerObserver::new(&s.key, verbose))
    });
    Ok(session)
}

/// Print the checks a run would execute. Returns the exit code.
fn print_dry_run_plan(
    cfg: &Config,
    selection: Option<&str>,
    filter: Option<&Regex>,
    json_output: bool,
) -> i32 {
    let selected = match suite::select_suites(cfg, selection) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {e}");
            return 2;
        }
    };
    let planned = dryrun::plan_checks(&selected, filter);
    if json_output {
        dryrun::print_json(&planned);
    } else {
        dryrun::print_table(&planned);
    }
    0
}
