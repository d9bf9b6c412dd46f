//! Numbered selection prompt on the terminal.

use std::io::{self, BufRead, Write};

use kbridge_core::application::{parse_choice, Choice};
use kbridge_core::ports::Prompter;
use kbridge_core::{Error, Result};

use super::Printer;

/// Prompter reading choices from stdin.
///
/// Reads run on the blocking pool so the runtime keeps observing Ctrl+C.
#[derive(Debug, Clone, Copy)]
pub struct TerminalPrompter {
    printer: Printer,
}

impl TerminalPrompter {
    pub fn new(printer: Printer) -> Self {
        Self { printer }
    }
}

impl Prompter for TerminalPrompter {
    async fn choose(&self, title: &str, options: &[String]) -> Result<Option<usize>> {
        let printer = self.printer;
        let title = title.to_string();
        let options = options.to_vec();

        let choice = tokio::task::spawn_blocking(move || {
            let stdin = io::stdin();
            let stdout = io::stdout();
            prompt_choice(&mut stdin.lock(), &mut stdout.lock(), &printer, &title, &options)
        })
        .await
        .map_err(|e| Error::Io(io::Error::other(e)))??;

        Ok(choice)
    }
}

/// Lists `options` and reads until a valid number or `q`.
///
/// End of input counts as quitting.
pub fn prompt_choice<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    printer: &Printer,
    title: &str,
    options: &[String],
) -> io::Result<Option<usize>> {
    writeln!(output, "\n{}", title)?;
    for (i, option) in options.iter().enumerate() {
        writeln!(output, "{}", printer.option_line(i + 1, option))?;
    }

    loop {
        write!(output, "\nEnter number (q to quit): ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(output)?;
            return Ok(None);
        }

        match parse_choice(&line, options.len()) {
            Choice::Index(index) => return Ok(Some(index)),
            Choice::Quit => return Ok(None),
            Choice::Invalid => {
                writeln!(
                    output,
                    "{}",
                    printer.error_line("Invalid selection. Please try again.")
                )?;
            }
        }
    }
}
