use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use console::Style;
use serde::{Deserialize, Serialize};

use crate::check::detail_preview;
use crate::types::{CheckResult, Outcome, RunReport, pass_rate};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    pub key: String,
    pub name: String,
    pub report: RunReport,
}

impl SuiteReport {
    pub fn passed(&self) -> bool {
        self.report.all_passed()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub suites: usize,
    pub passed_suites: usize,
    pub checks: usize,
    pub passed_checks: usize,
}

/// Everything one invocation ran; persisted as `results.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub started_at: String,
    pub base_url: String,
    pub duration_secs: f64,
    pub totals: Totals,
    pub suites: Vec<SuiteReport>,
}

impl SessionReport {
    pub fn new(
        started_at: String,
        base_url: String,
        duration_secs: f64,
        suites: Vec<SuiteReport>,
    ) -> Self {
        let totals = Totals {
            suites: suites.len(),
            passed_suites: suites.iter().filter(|s| s.passed()).count(),
            checks: suites.iter().map(|s| s.report.total).sum(),
            passed_checks: suites.iter().map(|s| s.report.passed).sum(),
        };
        Self {
            started_at,
            base_url,
            duration_secs,
            totals,
            suites,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.totals.passed_checks == self.totals.checks
    }

    /// Rebuild every count from the recorded check outcomes.
    fn recounted(self) -> Self {
        let suites = self
            .suites
            .into_iter()
            .map(|suite| {
                let SuiteReport { key, name, report } = suite;
                let checks = report
                    .checks
                    .into_iter()
                    .map(|mut check| {
                        check.passed = check.outcome.is_pass();
                        check
                    })
                    .collect();
                SuiteReport {
                    key,
                    name,
                    report: RunReport::from_results(checks, report.duration_secs),
                }
            })
            .collect();
        Self::new(self.started_at, self.base_url, self.duration_secs, suites)
    }
}

pub fn format_rate(rate: Option<f64>) -> String {
    match rate {
        Some(r) => format!("{r:.1}%"),
        None => "n/a".to_string(),
    }
}

fn outcome_label(result: &CheckResult) -> String {
    let green = Style::new().green().bold();
    let yellow = Style::new().yellow().bold();
    let red = Style::new().red().bold();

    match result.outcome {
        Outcome::Passed => green.apply_to("PASS ").to_string(),
        Outcome::NotImplemented | Outcome::Tolerated => yellow.apply_to("PASS*").to_string(),
        Outcome::Failed => red.apply_to("FAIL ").to_string(),
        Outcome::Errored => red.apply_to("ERROR").to_string(),
    }
}

/// Print per-check results of one suite.
pub fn print_suite(suite: &SuiteReport) {
    let dim = Style::new().dim();
    let report = &suite.report;

    println!();
    println!("{} [{}]", suite.name, suite.key);
    println!("{}", "-".repeat(60));

    for check in &report.checks {
        let status = check
            .status_code
            .map(|s| format!("HTTP {s}"))
            .unwrap_or_else(|| "no response".to_string());
        println!(
            "  {} {} ({}, {}ms)",
            outcome_label(check),
            check.name,
            status,
            check.duration_ms
        );
        match check.outcome {
            Outcome::NotImplemented => {
                println!("        {}", dim.apply_to("endpoint not implemented yet"))
            }
            Outcome::Tolerated => {
                if let Some(msg) = &check.message {
                    println!("        {}", dim.apply_to(format!("tolerated: {msg}")));
                }
            }
            Outcome::Failed | Outcome::Errored => {
                if let Some(msg) = &check.message {
                    println!("        {msg}");
                }
                let preview = detail_preview(&check.detail, 200);
                if !preview.is_empty() && check.outcome == Outcome::Failed {
                    println!("        {}", dim.apply_to(preview));
                }
            }
            Outcome::Passed => {}
        }
    }

    println!("{}", "-".repeat(60));
    println!(
        "{}/{} passed, {} failed ({}, {:.1}s)",
        report.passed,
        report.total,
        report.failed(),
        format_rate(report.pass_rate()),
        report.duration_secs
    );
}

/// Print every suite followed by overall statistics.
pub fn print_session(session: &SessionReport) {
    let green = Style::new().green().bold();
    let red = Style::new().red().bold();

    for suite in &session.suites {
        print_suite(suite);
    }

    let totals = &session.totals;
    println!();
    println!("Summary ({})", session.base_url);
    println!("{}", "=".repeat(60));
    for suite in &session.suites {
        let label = if suite.passed() {
            green.apply_to("PASS")
        } else {
            red.apply_to("FAIL")
        };
        println!(
            "  {} {:<35} {}/{}",
            label, suite.name, suite.report.passed, suite.report.total
        );
    }
    println!("{}", "=".repeat(60));
    println!(
        "Suites: {}/{} passed ({})",
        totals.passed_suites,
        totals.suites,
        format_rate(pass_rate(totals.passed_suites, totals.suites))
    );
    println!(
        "Checks: {}/{} passed ({}) in {:.1}s",
        totals.passed_checks,
        totals.checks,
        format_rate(pass_rate(totals.passed_checks, totals.checks)),
        session.duration_secs
    );

    let failed: Vec<&SuiteReport> = session.suites.iter().filter(|s| !s.passed()).collect();
    if failed.is_empty() {
        println!("{}", green.apply_to("All checks passed."));
    } else {
        println!();
        println!("Failed checks:");
        for suite in failed {
            for check in suite.report.failures() {
                println!(
                    "  {} {}::{}: {}",
                    red.apply_to("-"),
                    suite.key,
                    check.name,
                    check.message.as_deref().unwrap_or("failed")
                );
            }
        }
    }
    println!();
}

/// Write the session as pretty-printed JSON, creating parent directories.
pub fn write_json(session: &SessionReport, output_path: &Path) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json =
        serde_json::to_string_pretty(session).context("Failed to serialize results to JSON")?;
    fs::write(output_path, json)
        .with_context(|| format!("Failed to write results to {}", output_path.display()))?;
    Ok(())
}

/// Read a session previously written by [`write_json`].
///
/// Saved counts are ignored and recomputed from the check outcomes.
pub fn read_json(path: &Path) -> Result<SessionReport> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let saved: SessionReport = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(saved.recounted())
}
