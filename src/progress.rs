use indicatif::{ProgressBar, ProgressStyle};

use crate::check::{RunObserver, detail_preview};
use crate::types::{CheckResult, Outcome};

pub fn stage_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
            .template("{spinner} {msg}")
            .expect("invalid spinner template"),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}

pub fn finish_spinner(pb: &ProgressBar, success: bool) {
    if success {
        pb.finish_with_message(format!("✓ {}", pb.message()));
    } else {
        pb.finish_with_message(format!("✗ {}", pb.message()));
    }
}

/// Shows one spinner per check while a suite runs.
pub struct SpinnerObserver {
    suite: String,
    verbose: bool,
    current: Option<ProgressBar>,
}

impl SpinnerObserver {
    pub fn new(suite: &str, verbose: bool) -> Self {
        Self {
            suite: suite.to_string(),
            verbose,
            current: None,
        }
    }
}

impl RunObserver for SpinnerObserver {
    fn check_started(&mut self, index: usize, total: usize, name: &str) {
        self.current = Some(stage_spinner(&format!(
            "[{}/{}] {}: {}",
            index, total, self.suite, name
        )));
    }

    fn check_finished(&mut self, result: &CheckResult) {
        if let Some(pb) = self.current.take() {
            if result.outcome == Outcome::NotImplemented {
                pb.set_message(format!("{} (not implemented)", pb.message()));
            }
            finish_spinner(&pb, result.passed);
        }
        if self.verbose {
            let status = result
                .status_code
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string());
            eprintln!(
                "    status={} time={}ms {}",
                status,
                result.duration_ms,
                detail_preview(&result.detail, 200)
            );
        }
    }
}
