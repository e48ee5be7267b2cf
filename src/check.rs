use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use anyhow::Result;
use serde_json::{Value, json};

use crate::client::ApiResponse;
use crate::policy::{StatusPolicy, Verdict, classify};
use crate::types::{CheckResult, Outcome, RunReport};

pub type Action = Box<dyn FnOnce() -> Result<ApiResponse> + Send>;

/// A named remote call plus the policy its response is judged by.
pub struct Check {
    name: String,
    policy: StatusPolicy,
    action: Action,
}

impl Check {
    pub fn new<F>(name: impl Into<String>, policy: StatusPolicy, action: F) -> Self
    where
        F: FnOnce() -> Result<ApiResponse> + Send + 'static,
    {
        Self {
            name: name.into(),
            policy,
            action: Box::new(action),
        }
    }
}

/// Receives progress notifications while a runner executes.
pub trait RunObserver {
    fn check_started(&mut self, _index: usize, _total: usize, _name: &str) {}
    fn check_finished(&mut self, _result: &CheckResult) {}
}

/// Observer that reports nothing.
pub struct Silent;

impl RunObserver for Silent {}

/// Executes registered checks sequentially, exactly once.
#[derive(Default)]
pub struct CheckRunner {
    checks: Vec<Check>,
}

impl CheckRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, check: Check) {
        self.checks.push(check);
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Run every check in registration order and build the report.
    ///
    /// Never fails: action errors and panics become `Errored` results and the
    /// remaining checks still run. A panicking action still goes through the
    /// process panic hook, so its message is also printed to stderr, possibly
    /// over a live spinner line.
    pub fn run(self, observer: &mut dyn RunObserver) -> RunReport {
        let start = Instant::now();
        let total = self.checks.len();
        let mut results = Vec::with_capacity(total);

        for (index, check) in self.checks.into_iter().enumerate() {
            observer.check_started(index + 1, total, &check.name);
            let result = execute(check);
            observer.check_finished(&result);
            results.push(result);
        }

        RunReport::from_results(results, start.elapsed().as_secs_f64())
    }
}

fn execute(check: Check) -> CheckResult {
    let Check {
        name,
        policy,
        action,
    } = check;
    let start = Instant::now();
    let outcome = panic::catch_unwind(AssertUnwindSafe(action));
    let duration_ms = start.elapsed().as_millis() as u64;

    match outcome {
        Ok(Ok(response)) => judged(name, &policy, &response, duration_ms),
        Ok(Err(e)) => errored(name, format!("{e:#}"), duration_ms),
        Err(payload) => errored(
            name,
            format!("check panicked: {}", panic_message(payload.as_ref())),
            duration_ms,
        ),
    }
}

fn judged(
    name: String,
    policy: &StatusPolicy,
    response: &ApiResponse,
    duration_ms: u64,
) -> CheckResult {
    let verdict = classify(response, policy);
    let passed = verdict.is_pass();
    let (outcome, message) = match verdict {
        Verdict::Passed => (Outcome::Passed, None),
        Verdict::NotImplemented => (
            Outcome::NotImplemented,
            Some("endpoint not implemented yet".to_string()),
        ),
        Verdict::Tolerated(msg) => (Outcome::Tolerated, Some(msg)),
        Verdict::Failed(msg) => (Outcome::Failed, Some(msg)),
    };
    CheckResult {
        name,
        passed,
        outcome,
        status_code: Some(response.status),
        message,
        detail: response.body.to_detail(),
        duration_ms,
    }
}

fn errored(name: String, message: String, duration_ms: u64) -> CheckResult {
    CheckResult {
        name,
        passed: false,
        outcome: Outcome::Errored,
        status_code: None,
        detail: json!({ "error": message }),
        message: Some(message),
        duration_ms,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Detail value trimmed for console output.
pub fn detail_preview(detail: &Value, max_chars: usize) -> String {
    let text = match detail {
        Value::Null => return String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if text.chars().count() <= max_chars {
        text
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}
