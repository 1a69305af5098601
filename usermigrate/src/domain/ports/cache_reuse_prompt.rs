//! Driven port for asking whether a stale discovery cache may be reused.

use std::path::Path;

use super::define_port_error;

define_port_error! {
    /// Errors raised while asking the operator.
    pub enum PromptError {
        /// No terminal is attached to answer the question.
        NotInteractive =>
            "cannot prompt without an interactive terminal",
        /// The terminal failed while reading the answer.
        Terminal { message: String } =>
            "terminal prompt failed: {message}",
    }
}

/// Port for the interactive cache-reuse question.
#[cfg_attr(test, mockall::automock)]
pub trait CacheReusePrompt: Send + Sync {
    /// Ask whether the discovery cache at `cache_path` should be reused.
    fn confirm_reuse(&self, cache_path: &Path) -> Result<bool, PromptError>;
}
