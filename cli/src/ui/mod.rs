//! Terminal user interface: colored output and numbered prompts.

mod printer;
mod prompt;

pub use printer::Printer;
pub use prompt::TerminalPrompter;
