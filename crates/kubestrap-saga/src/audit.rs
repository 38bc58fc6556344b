use std::borrow::Cow;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{error, info, warn};

/// Prefix marking a non-fatal failure. The post-run summary scans for it.
pub const WARNING_PREFIX: &str = "Warning:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for AuditLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// What a record is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum AuditEvent {
    Note,
    StepStarted,
    StepCompleted,
    StepWarning,
    StepFailed,
    Compensated,
    CompensationFailed,
    ServiceRestored,
    ServiceRestoreFailed,
}

#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub timestamp: DateTime<Local>,
    pub level: AuditLevel,
    pub event: AuditEvent,
    /// Step the record belongs to, when there is one.
    pub step: Option<String>,
    pub message: String,
}

impl AuditRecord {
    /// The single-line form written to the durable sink. Embedded line
    /// breaks are folded into ` | ` separators.
    #[must_use]
    pub fn to_line(&self) -> String {
        format!(
            "{} [{}] {}",
            self.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Secs, false),
            self.level,
            single_line(&self.message)
        )
    }
}

/// Append-only record of a pipeline run.
///
/// Every record is kept in memory, mirrored to `tracing`, and, when the log
/// was created with [`AuditLog::create`], appended to a file that outlives the
/// process.
#[derive(Debug, Default)]
pub struct AuditLog {
    records: Vec<AuditRecord>,
    sink: Option<File>,
    path: Option<PathBuf>,
    sink_failed: bool,
}

impl AuditLog {
    /// An audit log with no durable sink.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open (or create) an audit file at `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be created.
    pub fn create(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            records: Vec::new(),
            sink: Some(file),
            path: Some(path),
            sink_failed: false,
        })
    }

    /// Audit file location for a pipeline `kind` started at `started_at`.
    #[must_use]
    pub fn path_for(dir: &Path, kind: &str, started_at: DateTime<Local>) -> PathBuf {
        dir.join(format!(
            "kubestrap-{kind}-{}.log",
            started_at.format("%Y%m%d-%H%M%S")
        ))
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.record(AuditLevel::Info, AuditEvent::Note, None, message.into());
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.record(AuditLevel::Warning, AuditEvent::Note, None, message.into());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.record(AuditLevel::Error, AuditEvent::Note, None, message.into());
    }

    pub(crate) fn step_started(&mut self, step: &str) {
        self.record(
            AuditLevel::Info,
            AuditEvent::StepStarted,
            Some(step),
            format!("Starting step '{step}'"),
        );
    }

    pub(crate) fn step_completed(&mut self, step: &str) {
        self.record(
            AuditLevel::Info,
            AuditEvent::StepCompleted,
            Some(step),
            format!("Completed step '{step}'"),
        );
    }

    pub(crate) fn step_warning(&mut self, step: &str, reason: &str) {
        self.record(
            AuditLevel::Error,
            AuditEvent::StepWarning,
            Some(step),
            format!("{WARNING_PREFIX} step '{step}' failed: {reason}"),
        );
    }

    pub(crate) fn step_failed(&mut self, step: &str, reason: &str) {
        self.record(
            AuditLevel::Error,
            AuditEvent::StepFailed,
            Some(step),
            format!("Step '{step}' failed: {reason}"),
        );
    }

    pub(crate) fn compensated(&mut self, description: &str) {
        self.record(
            AuditLevel::Info,
            AuditEvent::Compensated,
            None,
            format!("Rolled back: {description}"),
        );
    }

    pub(crate) fn compensation_failed(&mut self, description: &str, reason: &str) {
        self.record(
            AuditLevel::Error,
            AuditEvent::CompensationFailed,
            None,
            format!("Rollback action '{description}' failed: {reason}"),
        );
    }

    pub(crate) fn service_restored(&mut self, service: &str) {
        self.record(
            AuditLevel::Info,
            AuditEvent::ServiceRestored,
            None,
            format!("Restarted service '{service}' to its pre-run state"),
        );
    }

    pub(crate) fn service_restore_failed(&mut self, service: &str, reason: &str) {
        self.record(
            AuditLevel::Error,
            AuditEvent::ServiceRestoreFailed,
            None,
            format!("Could not restart service '{service}': {reason}"),
        );
    }

    fn record(
        &mut self,
        level: AuditLevel,
        event: AuditEvent,
        step: Option<&str>,
        message: String,
    ) {
        let message = if message.contains(['\n', '\r']) {
            single_line(&message).into_owned()
        } else {
            message
        };
        match level {
            AuditLevel::Info => info!("{message}"),
            AuditLevel::Warning => warn!("{message}"),
            AuditLevel::Error => error!("{message}"),
        }

        let record = AuditRecord {
            timestamp: Local::now(),
            level,
            event,
            step: step.map(str::to_string),
            message,
        };
        self.write_line(&record);
        self.records.push(record);
    }

    fn write_line(&mut self, record: &AuditRecord) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        let result = writeln!(sink, "{}", record.to_line()).and_then(|()| sink.flush());
        if let Err(e) = result {
            // Keep the run going on the in-memory records; complain once.
            if !self.sink_failed {
                warn!(error = %e, path = ?self.path, "failed to write audit log");
                self.sink_failed = true;
            }
        }
    }

    #[must_use]
    pub fn records(&self) -> &[AuditRecord] {
        &self.records
    }

    /// Names of the steps that were started, in order.
    #[must_use]
    pub fn started_steps(&self) -> Vec<&str> {
        self.records
            .iter()
            .filter(|r| r.event == AuditEvent::StepStarted)
            .filter_map(|r| r.step.as_deref())
            .collect()
    }

    /// Text of every warning-step failure, without the [`WARNING_PREFIX`].
    #[must_use]
    pub fn warnings(&self) -> Vec<&str> {
        self.records
            .iter()
            .filter(|r| r.event == AuditEvent::StepWarning)
            .filter_map(|r| r.message.strip_prefix(WARNING_PREFIX))
            .map(str::trim)
            .collect()
    }
}

/// Read an audit file back and extract every `Warning:` entry.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn scan_warnings(path: &Path) -> io::Result<Vec<String>> {
    let reader = BufReader::new(File::open(path)?);
    let mut warnings = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if let Some(text) = warning_text(&line) {
            warnings.push(text.to_string());
        }
    }
    Ok(warnings)
}

/// Message of a `<timestamp> [LEVEL] message` line, if it opens with the
/// warning prefix.
fn warning_text(line: &str) -> Option<&str> {
    let (_, message) = line.split_once("] ")?;
    message.strip_prefix(WARNING_PREFIX).map(str::trim)
}

fn single_line(text: &str) -> Cow<'_, str> {
    if !text.contains(['\n', '\r']) {
        return Cow::Borrowed(text);
    }
    let parts: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    Cow::Owned(parts.join(" | "))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn new_audit_log_is_empty() {
        let log = AuditLog::in_memory();
        assert!(log.records().is_empty());
        assert!(log.path().is_none());
    }

    #[test]
    fn step_started_records_step_name() {
        let mut log = AuditLog::in_memory();
        log.step_started("disable_swap");

        assert_eq!(log.records().len(), 1);
        assert_eq!(log.records()[0].event, AuditEvent::StepStarted);
        assert_eq!(log.records()[0].step.as_deref(), Some("disable_swap"));
        assert_eq!(log.started_steps(), vec!["disable_swap"]);
    }

    #[test]
    fn step_warning_is_error_level_with_prefix() {
        let mut log = AuditLog::in_memory();
        log.step_warning("flush_iptables", "iptables not found");

        let record = &log.records()[0];
        assert_eq!(record.level, AuditLevel::Error);
        assert!(record.message.starts_with("Warning:"));
        assert_eq!(
            log.warnings(),
            vec!["step 'flush_iptables' failed: iptables not found"]
        );
    }

    #[test]
    fn fatal_failure_is_not_a_warning() {
        let mut log = AuditLog::in_memory();
        log.step_failed("kubeadm_init", "exit status 1");

        assert!(log.warnings().is_empty());
    }

    #[test]
    fn path_for_includes_kind_and_timestamp() {
        let started = Local
            .with_ymd_and_hms(2026, 3, 4, 5, 6, 7)
            .single()
            .expect("valid timestamp");

        let path = AuditLog::path_for(Path::new("/var/log/kubestrap"), "reset", started);

        assert_eq!(
            path,
            PathBuf::from("/var/log/kubestrap/kubestrap-reset-20260304-050607.log")
        );
    }

    #[test]
    fn multiline_message_is_folded_into_one_line() {
        let mut log = AuditLog::in_memory();
        log.step_failed("install_cni", "kubectl apply failed\nerror: unable to recognize\r\n");

        let record = &log.records()[0];
        assert_eq!(
            record.message,
            "Step 'install_cni' failed: kubectl apply failed | error: unable to recognize"
        );
        assert_eq!(record.to_line().lines().count(), 1);
    }

    #[test]
    fn warning_prefix_only_counts_at_message_start() {
        let fatal = "2026-03-04T05:06:07+00:00 [ERROR] Step 'install_cni' failed: \
                     Warning: policy/v1beta1 PodDisruptionBudget is deprecated";
        let warning = "2026-03-04T05:06:07+00:00 [ERROR] Warning: step 'flush_iptables' failed";

        assert_eq!(warning_text(fatal), None);
        assert_eq!(warning_text(warning), Some("step 'flush_iptables' failed"));
    }

    #[test]
    fn warnings_ignore_prefixed_notes() {
        let mut log = AuditLog::in_memory();
        log.info("Warning: this is only a note");

        assert!(log.warnings().is_empty());
    }

    #[test]
    fn line_format_has_level_tag() {
        let mut log = AuditLog::in_memory();
        log.info("hello");

        let line = log.records()[0].to_line();
        assert!(line.ends_with("[INFO] hello"));
    }
}
