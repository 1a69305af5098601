//! Driven port for operator-facing progress messages.

/// Port for announcing run progress and pass summaries to the operator.
#[cfg_attr(test, mockall::automock)]
pub trait RunReporter: Send + Sync {
    /// Show one message. Messages may span several lines.
    fn announce(&self, message: &str);
}
