//! Classification of remote responses into pass/fail verdicts.
//!
//! Every check goes through [`classify`]; suites only choose the
//! [`Expectation`] and the business-error messages they are willing to accept.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::{ApiResponse, ResponseBody};

const NOT_FOUND: u16 = 404;

/// What a check expects from the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Expectation {
    /// 2xx without an error payload passes; 404 counts as "not implemented
    /// yet" and also passes.
    #[default]
    Tolerant,
    /// 200 with `"status": "success"` in the body. 404 fails.
    Success,
    /// Any 2xx passes, body ignored. 404 fails.
    Reachable,
}

impl std::fmt::Display for Expectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expectation::Tolerant => write!(f, "tolerant"),
            Expectation::Success => write!(f, "success"),
            Expectation::Reachable => write!(f, "reachable"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusPolicy {
    pub expectation: Expectation,
    /// Fragments of business-error messages that are accepted as a pass.
    pub tolerated_messages: Vec<String>,
}

impl StatusPolicy {
    pub fn new(expectation: Expectation) -> Self {
        Self {
            expectation,
            tolerated_messages: Vec::new(),
        }
    }

    pub fn tolerant() -> Self {
        Self::new(Expectation::Tolerant)
    }

    pub fn tolerating(mut self, fragments: &[String]) -> Self {
        self.tolerated_messages.extend(fragments.iter().cloned());
        self
    }

    fn tolerates(&self, message: &str) -> bool {
        self.tolerated_messages
            .iter()
            .any(|fragment| !fragment.is_empty() && message.contains(fragment.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Passed,
    NotImplemented,
    /// Business error whose message matched a tolerated fragment.
    Tolerated(String),
    Failed(String),
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        !matches!(self, Verdict::Failed(_))
    }
}

/// Business-level error carried by a successful HTTP status, if any.
///
/// Returns the server's message (or a generic one) when the body says
/// `"status": "error"|"failed"` or `"success": false`.
pub fn business_error(body: &ResponseBody) -> Option<String> {
    let status_says_error = body
        .str_field("status")
        .map(|s| s.eq_ignore_ascii_case("error") || s.eq_ignore_ascii_case("failed"))
        .unwrap_or(false);
    let success_false = matches!(body.field("success"), Some(Value::Bool(false)));

    if !status_says_error && !success_false {
        return None;
    }

    let message = body
        .str_field("message")
        .or_else(|| body.str_field("error"))
        .unwrap_or("operation reported an error");
    Some(message.to_string())
}

fn is_success_status(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Classify a response. Pure: the same input always yields the same verdict.
pub fn classify(response: &ApiResponse, policy: &StatusPolicy) -> Verdict {
    let status = response.status;

    match policy.expectation {
        Expectation::Reachable => {
            if is_success_status(status) {
                Verdict::Passed
            } else {
                Verdict::Failed(format!("HTTP {status}"))
            }
        }
        Expectation::Tolerant => {
            if status == NOT_FOUND {
                return Verdict::NotImplemented;
            }
            if !is_success_status(status) {
                return Verdict::Failed(format!("HTTP {status}"));
            }
            if let ResponseBody::Malformed(_) = response.body {
                return Verdict::Failed("malformed response body".to_string());
            }
            business_verdict(&response.body, policy).unwrap_or(Verdict::Passed)
        }
        Expectation::Success => {
            if status != 200 {
                return Verdict::Failed(format!("HTTP {status}"));
            }
            if let Some(verdict) = business_verdict(&response.body, policy) {
                return verdict;
            }
            match response.body.str_field("status") {
                Some("success") => Verdict::Passed,
                Some(other) => Verdict::Failed(format!("unexpected status '{other}'")),
                None => Verdict::Failed("response carries no success status".to_string()),
            }
        }
    }
}

fn business_verdict(body: &ResponseBody, policy: &StatusPolicy) -> Option<Verdict> {
    let message = business_error(body)?;
    if policy.tolerates(&message) {
        Some(Verdict::Tolerated(message))
    } else {
        Some(Verdict::Failed(format!("operation error: {message}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ok(body: Value) -> ApiResponse {
        ApiResponse::json(200, body)
    }

    #[test]
    fn test_tolerant_success() {
        let verdict = classify(&ok(json!({"status": "success"})), &StatusPolicy::tolerant());
        assert_eq!(verdict, Verdict::Passed);
    }

    #[test]
    fn test_tolerant_empty_body_passes() {
        let response = ApiResponse::new(204, ResponseBody::Empty);
        assert_eq!(classify(&response, &StatusPolicy::tolerant()), Verdict::Passed);
    }

    #[test]
    fn test_tolerant_not_found_is_not_implemented() {
        let response = ApiResponse::new(404, ResponseBody::Empty);
        let verdict = classify(&response, &StatusPolicy::tolerant());
        assert_eq!(verdict, Verdict::NotImplemented);
        assert!(verdict.is_pass());
    }

    #[test]
    fn test_tolerant_server_error_fails() {
        let response = ApiResponse::json(500, json!({"error": "boom"}));
        let verdict = classify(&response, &StatusPolicy::tolerant());
        assert_eq!(verdict, Verdict::Failed("HTTP 500".to_string()));
        assert!(!verdict.is_pass());
    }

    #[test]
    fn test_tolerant_business_error_fails() {
        let response = ok(json!({"status": "error", "message": "ORA-00942: table does not exist"}));
        match classify(&response, &StatusPolicy::tolerant()) {
            Verdict::Failed(msg) => assert!(msg.contains("ORA-00942")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_success_false_is_business_error() {
        let response = ok(json!({"success": false, "error": "denied"}));
        assert_eq!(business_error(&response.body), Some("denied".to_string()));
        assert!(!classify(&response, &StatusPolicy::tolerant()).is_pass());
    }

    #[test]
    fn test_tolerated_message_fragment() {
        let policy = StatusPolicy::tolerant().tolerating(&["SQL grammar".to_string()]);
        let response = ok(json!({
            "status": "error",
            "message": "bad SQL grammar [SELECT ...]"
        }));
        assert_eq!(
            classify(&response, &policy),
            Verdict::Tolerated("bad SQL grammar [SELECT ...]".to_string())
        );
    }

    #[test]
    fn test_empty_fragment_tolerates_nothing() {
        let policy = StatusPolicy::tolerant().tolerating(&[String::new()]);
        let response = ok(json!({"status": "error", "message": "anything"}));
        assert!(!classify(&response, &policy).is_pass());
    }

    #[test]
    fn test_tolerant_malformed_body_fails() {
        let response = ApiResponse::new(200, ResponseBody::Malformed("<html>".to_string()));
        assert_eq!(
            classify(&response, &StatusPolicy::tolerant()),
            Verdict::Failed("malformed response body".to_string())
        );
    }

    #[test]
    fn test_strict_success_requires_status_field() {
        let policy = StatusPolicy::new(Expectation::Success);
        assert_eq!(classify(&ok(json!({"status": "success"})), &policy), Verdict::Passed);
        assert!(!classify(&ok(json!({"tables": []})), &policy).is_pass());
        assert!(!classify(&ok(json!({"status": "pending"})), &policy).is_pass());
    }

    #[test]
    fn test_strict_and_reachable_reject_not_found() {
        let response = ApiResponse::new(404, ResponseBody::Empty);
        assert!(!classify(&response, &StatusPolicy::new(Expectation::Success)).is_pass());
        assert!(!classify(&response, &StatusPolicy::new(Expectation::Reachable)).is_pass());
    }

    #[test]
    fn test_reachable_ignores_body() {
        let policy = StatusPolicy::new(Expectation::Reachable);
        let response = ApiResponse::new(200, ResponseBody::Malformed("UP".to_string()));
        assert_eq!(classify(&response, &policy), Verdict::Passed);
        let response = ok(json!({"status": "error"}));
        assert_eq!(classify(&response, &policy), Verdict::Passed);
    }

    #[test]
    fn test_classify_is_idempotent() {
        let policy = StatusPolicy::tolerant();
        let responses = [
            ok(json!({"status": "success"})),
            ApiResponse::new(404, ResponseBody::Empty),
            ApiResponse::json(503, json!({})),
        ];
        for response in &responses {
            assert_eq!(classify(response, &policy), classify(response, &policy));
        }
    }
}
