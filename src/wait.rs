use std::time::Duration;

use anyhow::bail;

use crate::client::{ApiRequest, Transport};
use crate::config::WaitConfig;
use crate::progress;

/// Poll the health endpoint until it answers 200.
///
/// Fixed delay between attempts, no sleep after the last one. Returns the
/// attempt number that succeeded.
pub fn wait_for_service(
    transport: &dyn Transport,
    cfg: &WaitConfig,
    verbose: bool,
) -> anyhow::Result<u32> {
    let request = ApiRequest::get(&cfg.endpoint);
    let delay = Duration::from_secs(cfg.delay_secs);

    let pb = progress::stage_spinner(&format!("Waiting for service ({})...", cfg.endpoint));
    let mut last_problem = String::new();

    for attempt in 1..=cfg.max_attempts {
        pb.set_message(format!(
            "Attempt {}/{}: checking {}...",
            attempt, cfg.max_attempts, cfg.endpoint
        ));

        match transport.call(&request) {
            Ok(response) if response.status == 200 => {
                progress::finish_spinner(&pb, true);
                if verbose {
                    eprintln!("  Service available after {} attempt(s)", attempt);
                }
                return Ok(attempt);
            }
            Ok(response) => last_problem = format!("HTTP {}", response.status),
            Err(e) => last_problem = format!("{e:#}"),
        }

        if verbose {
            eprintln!(
                "  Attempt {}/{}: service not ready ({})",
                attempt, cfg.max_attempts, last_problem
            );
        }

        if attempt < cfg.max_attempts {
            std::thread::sleep(delay);
        }
    }

    progress::finish_spinner(&pb, false);
    bail!(
        "Service not available after {} attempt(s): {}\n  Suggestion: check that the server is running and {} is reachable",
        cfg.max_attempts,
        last_problem,
        cfg.endpoint
    )
}
