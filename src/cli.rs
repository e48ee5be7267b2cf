use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::default_config_path;

#[derive(Parser, Debug)]
#[command(
    name = "oracle-smoke",
    about = "Smoke checks against a running Oracle MCP server REST API"
)]
pub struct Cli {
    /// Enable verbose output
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Suite configuration file
    #[arg(long, global = true, default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Override server.base_url from the config (e.g. http://db-host:8080)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Override server.username from the config
    #[arg(long, global = true)]
    pub username: Option<String>,

    /// Override server.password from the config
    #[arg(long, global = true)]
    pub password: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Wait for the server, run the selected suites and report
    Run {
        /// Suites to run, comma-separated keys (e.g. "core,analytics"). Default: all
        #[arg(long)]
        suites: Option<String>,

        /// Only run checks whose name matches this regex
        #[arg(long)]
        filter: Option<String>,

        /// Directory for results.json
        #[arg(long, default_value = "./smoke-output")]
        output_dir: String,

        /// Skip the availability wait before the first check
        #[arg(long)]
        no_wait: bool,

        /// Print the checks that would run without calling the server
        #[arg(long)]
        dry_run: bool,

        /// Output the dry-run plan as JSON (requires --dry-run)
        #[arg(long, requires = "dry_run")]
        json: bool,
    },

    /// Poll the health endpoint until the server answers
    Wait,

    /// Re-print results from a previous run
    Results {
        /// Directory containing results.json
        #[arg(long, default_value = "./smoke-output")]
        output_dir: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_defaults() {
        let cli = Cli::try_parse_from(["oracle-smoke", "run"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("config/suites.toml"));
        match cli.command {
            Commands::Run {
                suites,
                output_dir,
                no_wait,
                dry_run,
                ..
            } => {
                assert!(suites.is_none());
                assert_eq!(output_dir, "./smoke-output");
                assert!(!no_wait);
                assert!(!dry_run);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_json_requires_dry_run() {
        assert!(Cli::try_parse_from(["oracle-smoke", "run", "--json"]).is_err());
        assert!(Cli::try_parse_from(["oracle-smoke", "run", "--dry-run", "--json"]).is_ok());
    }

    #[test]
    fn test_global_overrides_after_subcommand() {
        let cli = Cli::try_parse_from([
            "oracle-smoke",
            "wait",
            "--base-url",
            "http://db:9090",
            "--verbose",
        ])
        .unwrap();
        assert_eq!(cli.base_url.as_deref(), Some("http://db:9090"));
        assert!(cli.verbose);
    }
}
