//! Step reporting.
//!
//! Reporters observe a run; they never influence control flow. The
//! orchestrator calls them around every step and hands over a screenshot when
//! one could be taken after a failure.
//!
//! - [`TracingReporter`]: one structured `tracing` event per step
//! - [`JsonReporter`]: collects [`StepRecord`]s and writes `report.json` plus
//!   failure screenshots into a directory

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::driver::Screenshot;
use crate::result::{RegflowError, RegflowResult};

/// Receives step lifecycle events
pub trait StepReporter {
    /// A step is about to run
    fn step_started(&mut self, index: usize, label: &str);

    /// A step completed
    fn step_passed(&mut self, index: usize, label: &str, elapsed: Duration);

    /// A step failed; the run stops after this
    fn step_failed(
        &mut self,
        index: usize,
        label: &str,
        elapsed: Duration,
        error: &RegflowError,
        screenshot: Option<&Screenshot>,
    );
}

impl<R: StepReporter + ?Sized> StepReporter for &mut R {
    fn step_started(&mut self, index: usize, label: &str) {
        (**self).step_started(index, label);
    }

    fn step_passed(&mut self, index: usize, label: &str, elapsed: Duration) {
        (**self).step_passed(index, label, elapsed);
    }

    fn step_failed(
        &mut self,
        index: usize,
        label: &str,
        elapsed: Duration,
        error: &RegflowError,
        screenshot: Option<&Screenshot>,
    ) {
        (**self).step_failed(index, label, elapsed, error, screenshot);
    }
}

impl<A: StepReporter, B: StepReporter> StepReporter for (A, B) {
    fn step_started(&mut self, index: usize, label: &str) {
        self.0.step_started(index, label);
        self.1.step_started(index, label);
    }

    fn step_passed(&mut self, index: usize, label: &str, elapsed: Duration) {
        self.0.step_passed(index, label, elapsed);
        self.1.step_passed(index, label, elapsed);
    }

    fn step_failed(
        &mut self,
        index: usize,
        label: &str,
        elapsed: Duration,
        error: &RegflowError,
        screenshot: Option<&Screenshot>,
    ) {
        self.0.step_failed(index, label, elapsed, error, screenshot);
        self.1.step_failed(index, label, elapsed, error, screenshot);
    }
}

/// Logs each step through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl StepReporter for TracingReporter {
    fn step_started(&mut self, index: usize, label: &str) {
        info!(step = index + 1, label, "step started");
    }

    fn step_passed(&mut self, index: usize, label: &str, elapsed: Duration) {
        info!(step = index + 1, label, elapsed_ms = elapsed.as_millis() as u64, "step passed");
    }

    fn step_failed(
        &mut self,
        index: usize,
        label: &str,
        elapsed: Duration,
        error: &RegflowError,
        screenshot: Option<&Screenshot>,
    ) {
        error!(
            step = index + 1,
            label,
            elapsed_ms = elapsed.as_millis() as u64,
            error = %error,
            external = error.is_external(),
            screenshot_bytes = screenshot.map_or(0, Screenshot::size_bytes),
            "step failed"
        );
    }
}

/// Step result status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Step passed
    Passed,
    /// Step failed
    Failed,
}

impl StepStatus {
    /// Check if passed
    #[must_use]
    pub const fn is_passed(self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Check if failed
    #[must_use]
    pub const fn is_failed(self) -> bool {
        matches!(self, Self::Failed)
    }
}

/// Result of one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Step index (0-based)
    pub index: usize,
    /// Step label
    pub label: String,
    /// Outcome
    pub status: StepStatus,
    /// Step duration in milliseconds
    pub duration_ms: u64,
    /// Error message if failed
    pub error: Option<String>,
    /// Whether the failure was a human-gated timeout
    #[serde(default)]
    pub external: bool,
    /// Screenshot file name, relative to the report directory
    pub screenshot: Option<String>,
    /// When the step finished
    pub finished_at: DateTime<Utc>,
}

impl StepRecord {
    /// Create a passing record
    #[must_use]
    pub fn passed(index: usize, label: impl Into<String>, duration: Duration) -> Self {
        Self {
            index,
            label: label.into(),
            status: StepStatus::Passed,
            duration_ms: duration.as_millis() as u64,
            error: None,
            external: false,
            screenshot: None,
            finished_at: Utc::now(),
        }
    }

    /// Create a failing record
    #[must_use]
    pub fn failed(
        index: usize,
        label: impl Into<String>,
        duration: Duration,
        error: &RegflowError,
    ) -> Self {
        Self {
            index,
            label: label.into(),
            status: StepStatus::Failed,
            duration_ms: duration.as_millis() as u64,
            error: Some(error.to_string()),
            external: error.is_external(),
            screenshot: None,
            finished_at: Utc::now(),
        }
    }
}

#[derive(Serialize)]
struct Report<'a> {
    run_id: Uuid,
    scenario: &'a str,
    started_at: DateTime<Utc>,
    passed: usize,
    failed: usize,
    steps: &'a [StepRecord],
}

/// Collects step records and writes a JSON report
#[derive(Debug, Clone)]
pub struct JsonReporter {
    run_id: Uuid,
    scenario: String,
    started_at: DateTime<Utc>,
    records: Vec<StepRecord>,
    screenshots: Vec<(String, Screenshot)>,
}

impl JsonReporter {
    /// Create a reporter for one run of `scenario`
    #[must_use]
    pub fn new(scenario: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            scenario: scenario.into(),
            started_at: Utc::now(),
            records: Vec::new(),
            screenshots: Vec::new(),
        }
    }

    /// Identifier of this run
    #[must_use]
    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Recorded steps
    #[must_use]
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// Get number of passed steps
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.records.iter().filter(|r| r.status.is_passed()).count()
    }

    /// Get number of failed steps
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.records.iter().filter(|r| r.status.is_failed()).count()
    }

    /// Check if all recorded steps passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed_count() == 0
    }

    /// Generate summary string
    #[must_use]
    pub fn summary(&self) -> String {
        let status = if self.all_passed() { "passed" } else { "FAILED" };
        format!(
            "{}: {} ({} steps passed, {} failed)",
            self.scenario,
            status,
            self.passed_count(),
            self.failed_count()
        )
    }

    /// Render the report as pretty JSON
    pub fn render_json(&self) -> RegflowResult<String> {
        let report = Report {
            run_id: self.run_id,
            scenario: &self.scenario,
            started_at: self.started_at,
            passed: self.passed_count(),
            failed: self.failed_count(),
            steps: &self.records,
        };
        Ok(serde_json::to_string_pretty(&report)?)
    }

    /// Write `report.json` and failure screenshots into `dir`, creating it if needed
    ///
    /// # Errors
    ///
    /// Returns error if the directory or a file cannot be written
    pub fn write(&self, dir: &Path) -> RegflowResult<PathBuf> {
        std::fs::create_dir_all(dir)?;
        for (name, screenshot) in &self.screenshots {
            std::fs::write(dir.join(name), &screenshot.data)?;
        }
        let path = dir.join("report.json");
        std::fs::write(&path, self.render_json()?)?;
        Ok(path)
    }
}

impl StepReporter for JsonReporter {
    fn step_started(&mut self, _index: usize, _label: &str) {}

    fn step_passed(&mut self, index: usize, label: &str, elapsed: Duration) {
        self.records.push(StepRecord::passed(index, label, elapsed));
    }

    fn step_failed(
        &mut self,
        index: usize,
        label: &str,
        elapsed: Duration,
        error: &RegflowError,
        screenshot: Option<&Screenshot>,
    ) {
        let mut record = StepRecord::failed(index, label, elapsed, error);
        if let Some(shot) = screenshot.filter(|s| s.is_valid()) {
            let name = format!("step-{:02}.png", index + 1);
            record.screenshot = Some(name.clone());
            self.screenshots.push((name, shot.clone()));
        }
        self.records.push(record);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn timeout() -> RegflowError {
        RegflowError::LocatorTimeout {
            role: "search input".to_string(),
            elapsed: Duration::from_secs(120),
        }
    }

    #[test]
    fn test_counts_and_summary() {
        let mut reporter = JsonReporter::new("registration");
        reporter.step_passed(0, "Start login by phone", Duration::from_millis(800));
        reporter.step_failed(1, "Find chat", Duration::from_secs(120), &timeout(), None);

        assert_eq!(reporter.passed_count(), 1);
        assert_eq!(reporter.failed_count(), 1);
        assert!(!reporter.all_passed());
        assert_eq!(
            reporter.summary(),
            "registration: FAILED (1 steps passed, 1 failed)"
        );
    }

    #[test]
    fn test_write_report_and_screenshot() {
        let dir = tempfile::tempdir().unwrap();
        let mut reporter = JsonReporter::new("registration");
        let shot = Screenshot::new(vec![0x89, 0x50, 0x4E, 0x47]);
        reporter.step_failed(2, "Enter code", Duration::from_secs(1), &timeout(), Some(&shot));

        let path = reporter.write(dir.path()).unwrap();
        assert!(dir.path().join("step-03.png").exists());

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(json["scenario"], "registration");
        assert_eq!(json["failed"], 1);
        assert_eq!(json["steps"][0]["status"], "failed");
        assert_eq!(json["steps"][0]["screenshot"], "step-03.png");
        assert_eq!(json["run_id"], reporter.run_id().to_string());
    }

    #[test]
    fn test_empty_screenshot_is_dropped() {
        let mut reporter = JsonReporter::new("registration");
        let empty = Screenshot::new(Vec::new());
        reporter.step_failed(0, "Start", Duration::ZERO, &timeout(), Some(&empty));
        assert!(reporter.records()[0].screenshot.is_none());
    }

    #[test]
    fn test_pair_forwards_to_both() {
        let mut first = JsonReporter::new("a");
        let mut second = JsonReporter::new("b");
        {
            let mut pair = (&mut first, &mut second);
            pair.step_passed(0, "Start the bot", Duration::from_millis(5));
        }
        assert_eq!(first.records().len(), 1);
        assert_eq!(second.records().len(), 1);
    }

    #[test]
    fn test_record_round_trips_through_json() {
        let record = StepRecord::failed(4, "Find chat", Duration::from_millis(1500), &timeout());
        let json = serde_json::to_string(&record).unwrap();
        let back: StepRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
        assert_eq!(back.duration_ms, 1500);
    }
}
