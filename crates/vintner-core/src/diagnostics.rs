use std::path::Path;

use tracing::debug;

/// Payload handed to the error-classification hook after every supervised
/// run, success or failure.
#[derive(Debug)]
pub struct ErrorReport<'a> {
    /// Concatenated stdout and stderr of the run.
    pub output: &'a str,
    pub log_path: Option<&'a Path>,
    /// Which runner produced the output (store runner or wine invocation).
    pub runner_label: &'a str,
    pub app_name: &'a str,
}

/// Fire-and-forget diagnostics hook. Implementations decide whether the
/// outcome warrants a user-facing dialog; the launch machinery only logs
/// and returns.
pub trait DiagnosticsSink: Send + Sync {
    fn classify_and_report(&self, report: ErrorReport<'_>);
}

/// Default sink: records the report and surfaces nothing.
#[derive(Debug, Default)]
pub struct LogDiagnostics;

impl DiagnosticsSink for LogDiagnostics {
    fn classify_and_report(&self, report: ErrorReport<'_>) {
        debug!(
            target: "launcher",
            runner = report.runner_label,
            app = report.app_name,
            log = ?report.log_path,
            "run finished with {} bytes of output",
            report.output.len()
        );
    }
}

/// Whether a failure should reach the user as a dialog. Deliberate
/// signal-kills and deleted binaries are expected during cancellation and
/// uninstall, so they stay in the log.
pub fn should_surface_dialog(error_text: &str) -> bool {
    !error_text.contains("signal") && !error_text.contains("appears to be deleted")
}
