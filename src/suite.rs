//! Turns configured suites into check runners and runs them in order.

use std::sync::Arc;
use std::time::Instant;

use regex::Regex;

use crate::check::{Check, CheckRunner, RunObserver};
use crate::client::Transport;
use crate::config::{CheckConfig, Config, SuiteConfig};
use crate::report::{SessionReport, SuiteReport};

/// Resolve a comma-separated list of suite keys, keeping the given order.
///
/// `None` selects every suite in file order.
pub fn select_suites<'a>(
    config: &'a Config,
    selection: Option<&str>,
) -> Result<Vec<&'a SuiteConfig>, String> {
    let Some(selection) = selection else {
        return Ok(config.suites.iter().collect());
    };

    let mut selected: Vec<&SuiteConfig> = Vec::new();
    for key in selection.split(',') {
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let Some(suite) = config.suites.iter().find(|s| s.key == key) else {
            return Err(format!(
                "Unknown suite '{}'. Known: {}",
                key,
                config.suite_keys().join(", ")
            ));
        };
        if !selected.iter().any(|s| s.key == suite.key) {
            selected.push(suite);
        }
    }
    if selected.is_empty() {
        return Err("No suites specified".to_string());
    }
    Ok(selected)
}

/// Checks of a suite whose names match the optional filter.
pub fn matching_checks<'a>(
    suite: &'a SuiteConfig,
    filter: Option<&'a Regex>,
) -> impl Iterator<Item = &'a CheckConfig> + 'a {
    suite
        .checks
        .iter()
        .filter(move |c| filter.is_none_or(|re| re.is_match(&c.name)))
}

/// Register one check per matching configured call, all sharing `transport`.
pub fn build_runner(
    suite: &SuiteConfig,
    transport: &Arc<dyn Transport>,
    filter: Option<&Regex>,
) -> CheckRunner {
    let mut runner = CheckRunner::new();
    for check in matching_checks(suite, filter) {
        let request = check.request();
        let transport = Arc::clone(transport);
        runner.register(Check::new(
            check.name.clone(),
            suite.policy_for(check),
            move || transport.call(&request),
        ));
    }
    runner
}

/// Run the selected suites one after another.
///
/// With a filter, suites left without any matching check are skipped.
pub fn run_suites<F>(
    suites: &[&SuiteConfig],
    transport: Arc<dyn Transport>,
    base_url: &str,
    filter: Option<&Regex>,
    mut make_observer: F,
) -> SessionReport
where
    F: FnMut(&SuiteConfig) -> Box<dyn RunObserver>,
{
    let started_at = chrono::Utc::now().to_rfc3339();
    let start = Instant::now();
    let mut reports = Vec::with_capacity(suites.len());

    for suite in suites {
        let runner = build_runner(suite, &transport, filter);
        if runner.is_empty() && filter.is_some() {
            continue;
        }
        let mut observer = make_observer(suite);
        let report = runner.run(observer.as_mut());
        reports.push(SuiteReport {
            key: suite.key.clone(),
            name: suite.name.clone(),
            report,
        });
    }

    SessionReport::new(
        started_at,
        base_url.to_string(),
        start.elapsed().as_secs_f64(),
        reports,
    )
}
