//! Interactive prompts backed by `dialoguer`.

use std::io::IsTerminal;
use std::path::Path;

use dialoguer::{Confirm, Password};
use zeroize::Zeroizing;

use crate::domain::ports::{CacheReusePrompt, PromptError};

/// Whether both stdin and stdout are attached to a terminal.
pub fn is_interactive_terminal() -> bool {
    std::io::stdin().is_terminal() && std::io::stdout().is_terminal()
}

/// Prompts on the controlling terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompt;

impl TerminalPrompt {
    /// Read a secret without echoing it.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::NotInteractive`] without a terminal and
    /// [`PromptError::Terminal`] when reading fails.
    pub fn secret(&self, prompt: &str) -> Result<Zeroizing<String>, PromptError> {
        if !is_interactive_terminal() {
            return Err(PromptError::not_interactive());
        }
        Password::new()
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()
            .map(Zeroizing::new)
            .map_err(|error| PromptError::terminal(error.to_string()))
    }
}

impl CacheReusePrompt for TerminalPrompt {
    fn confirm_reuse(&self, cache_path: &Path) -> Result<bool, PromptError> {
        if !is_interactive_terminal() {
            return Err(PromptError::not_interactive());
        }
        Confirm::new()
            .with_prompt(format!(
                "Use the cached users at {}? Answering no rediscovers them",
                cache_path.display()
            ))
            .default(true)
            .interact()
            .map_err(|error| PromptError::terminal(error.to_string()))
    }
}
