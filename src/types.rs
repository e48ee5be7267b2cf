use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    /// Endpoint answered 404; accepted as not implemented yet.
    NotImplemented,
    /// Business error whose message is on the suite's tolerated list.
    Tolerated,
    Failed,
    /// The check never got a response: transport error, timeout or panic.
    Errored,
}

impl Outcome {
    pub fn is_pass(self) -> bool {
        matches!(self, Outcome::Passed | Outcome::NotImplemented | Outcome::Tolerated)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    pub outcome: Outcome,
    pub status_code: Option<u16>,
    pub message: Option<String>,
    pub detail: Value,
    pub duration_ms: u64,
}

/// Results of one runner execution, in registration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub total: usize,
    pub passed: usize,
    pub duration_secs: f64,
    pub checks: Vec<CheckResult>,
}

impl RunReport {
    pub fn from_results(checks: Vec<CheckResult>, duration_secs: f64) -> Self {
        let passed = checks.iter().filter(|c| c.passed).count();
        Self {
            total: checks.len(),
            passed,
            duration_secs,
            checks,
        }
    }

    pub fn failed(&self) -> usize {
        self.total.saturating_sub(self.passed)
    }

    pub fn all_passed(&self) -> bool {
        self.passed == self.total
    }

    /// Percentage of passing checks; `None` for an empty run.
    pub fn pass_rate(&self) -> Option<f64> {
        pass_rate(self.passed, self.total)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(|c| !c.passed)
    }
}

pub fn pass_rate(passed: usize, total: usize) -> Option<f64> {
    if total == 0 {
        None
    } else {
        Some(passed as f64 * 100.0 / total as f64)
    }
}
