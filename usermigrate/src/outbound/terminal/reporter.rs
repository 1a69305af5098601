//! `RunReporter` adapter writing announcements to stdout.

use std::io::Write;

use tracing::warn;

use crate::domain::ports::RunReporter;

/// Writes each announcement to stdout followed by a newline.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutReporter;

impl RunReporter for StdoutReporter {
    fn announce(&self, message: &str) {
        let mut stdout = std::io::stdout().lock();
        if let Err(error) = writeln!(stdout, "{message}").and_then(|()| stdout.flush()) {
            warn!(error = %error, "failed to write announcement");
        }
    }
}
