//! Terminal adapters: operator prompts, stdout announcements, and progress
//! bars.

mod progress;
mod prompt;
mod reporter;

pub use progress::IndicatifProgress;
pub use prompt::{TerminalPrompt, is_interactive_terminal};
pub use reporter::StdoutReporter;
