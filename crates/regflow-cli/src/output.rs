//! Console output for step progress

use std::time::Duration;

use console::{style, Term};
use regflow::{RegflowError, Screenshot, StepReporter};

/// Prints one line per finished step to stderr
#[derive(Debug)]
pub struct ConsoleReporter {
    term: Term,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl ConsoleReporter {
    /// Create a new console reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            use_color,
            quiet,
        }
    }

    /// Line for a passed step
    #[must_use]
    pub fn passed_line(&self, index: usize, label: &str, elapsed: Duration) -> String {
        let prefix = if self.use_color {
            style("✓").green().bold().to_string()
        } else {
            "PASS".to_string()
        };
        format!(
            "{prefix} {:>2}. {label} ({:.1}s)",
            index + 1,
            elapsed.as_secs_f64()
        )
    }

    /// Line for a failed step
    #[must_use]
    pub fn failed_line(&self, index: usize, label: &str, error: &RegflowError) -> String {
        let prefix = if self.use_color {
            style("✗").red().bold().to_string()
        } else {
            "FAIL".to_string()
        };
        let hint = if error.is_external() {
            " (waiting on a person)"
        } else {
            ""
        };
        format!("{prefix} {:>2}. {label}: {error}{hint}", index + 1)
    }

    /// Print the final outcome line
    pub fn summary(&self, line: &str, passed: bool) {
        if self.quiet && passed {
            return;
        }
        let styled = match (self.use_color, passed) {
            (true, true) => style(line).green().bold().to_string(),
            (true, false) => style(line).red().bold().to_string(),
            (false, _) => line.to_string(),
        };
        let _ = self.term.write_line(&styled);
    }
}

impl StepReporter for ConsoleReporter {
    fn step_started(&mut self, _index: usize, _label: &str) {}

    fn step_passed(&mut self, index: usize, label: &str, elapsed: Duration) {
        if !self.quiet {
            let _ = self.term.write_line(&self.passed_line(index, label, elapsed));
        }
    }

    fn step_failed(
        &mut self,
        index: usize,
        label: &str,
        _elapsed: Duration,
        error: &RegflowError,
        _screenshot: Option<&Screenshot>,
    ) {
        // Always print failures, even in quiet mode
        let _ = self.term.write_line(&self.failed_line(index, label, error));
    }
}
