use regex::Regex;
use serde::Serialize;

use crate::config::SuiteConfig;
use crate::suite::matching_checks;

/// One check as it would be executed, for dry-run display.
#[derive(Debug, Serialize)]
pub struct PlannedCheck {
    pub suite: String,
    pub name: String,
    pub method: String,
    pub endpoint: String,
    pub query: String,
    pub expect: String,
    pub has_body: bool,
}

/// Resolve the checks a run would execute, in execution order.
pub fn plan_checks(suites: &[&SuiteConfig], filter: Option<&Regex>) -> Vec<PlannedCheck> {
    suites
        .iter()
        .flat_map(|suite| {
            matching_checks(suite, filter).map(move |check| {
                let query = check
                    .request()
                    .query
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect::<Vec<_>>()
                    .join("&");
                PlannedCheck {
                    suite: suite.key.clone(),
                    name: check.name.clone(),
                    method: check.method.to_string(),
                    endpoint: check.endpoint.clone(),
                    query,
                    expect: suite.policy_for(check).expectation.to_string(),
                    has_body: check.body.is_some(),
                }
            })
        })
        .collect()
}

/// Print a human-readable table of planned checks.
pub fn print_table(planned: &[PlannedCheck]) {
    println!(
        "{:<12} {:<36} {:<7} {:<10} {}",
        "SUITE", "CHECK", "METHOD", "EXPECT", "ENDPOINT"
    );
    println!(
        "{:<12} {:<36} {:<7} {:<10} {}",
        "-----", "-----", "------", "------", "--------"
    );
    for pc in planned {
        let endpoint = if pc.query.is_empty() {
            pc.endpoint.clone()
        } else {
            format!("{}?{}", pc.endpoint, pc.query)
        };
        println!(
            "{:<12} {:<36} {:<7} {:<10} {}",
            pc.suite, pc.name, pc.method, pc.expect, endpoint
        );
    }
    println!("\n{} check(s) planned", planned.len());
}

/// Print planned checks as JSON.
pub fn print_json(planned: &[PlannedCheck]) {
    match serde_json::to_string_pretty(planned) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Error serializing plan: {e}"),
    }
}
