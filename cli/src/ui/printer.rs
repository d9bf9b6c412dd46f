//! Colored operator-facing output.

use std::fmt::Display;

use crossterm::style::{Color, Stylize};
use kbridge_core::kubernetes::ServicePort;
use kbridge_core::ports::TunnelNotifier;
use kbridge_core::TunnelEvent;

/// Writes tunnel progress to stdout and failures to stderr.
#[derive(Debug, Clone, Copy)]
pub struct Printer {
    color: bool,
}

impl Printer {
    /// Colors are on only for a terminal without `NO_COLOR` set.
    pub fn new() -> Self {
        let color = atty::is(atty::Stream::Stdout) && std::env::var_os("NO_COLOR").is_none();
        Self { color }
    }

    #[cfg(test)]
    pub fn plain() -> Self {
        Self { color: false }
    }

    pub fn paint(&self, text: impl Display, color: Color) -> String {
        if self.color {
            text.to_string().with(color).to_string()
        } else {
            text.to_string()
        }
    }

    pub fn cyan(&self, text: impl Display) -> String {
        self.paint(text, Color::Cyan)
    }

    pub fn green(&self, text: impl Display) -> String {
        self.paint(text, Color::Green)
    }

    pub fn gray(&self, text: impl Display) -> String {
        self.paint(text, Color::DarkGrey)
    }

    pub fn red(&self, text: impl Display) -> String {
        self.paint(text, Color::Red)
    }

    /// One enumerated option of a selection list.
    pub fn option_line(&self, index: usize, option: &str) -> String {
        format!("{} {}", self.cyan(format!("[{}]", index)), self.green(option))
    }

    pub fn error_line(&self, message: impl Display) -> String {
        self.red(format!("❌ {}", message))
    }

    pub fn error(&self, message: impl Display) {
        eprintln!("{}", self.error_line(message));
    }

    /// Announces the only port of a service, used without prompting.
    pub fn using_port(&self, port: &ServicePort) {
        println!("\n⚡ Using port {}", self.option_line(1, &port.option_label()));
    }

    /// Renders an event as the lines shown to the operator.
    pub fn render(&self, event: &TunnelEvent) -> Vec<String> {
        match event {
            TunnelEvent::TargetSelected { target } => {
                vec![format!("\nSelected pod: {}", self.cyan(&target.name))]
            }
            TunnelEvent::Ready { spec } => vec![
                format!(
                    "\n🚀 Forwarding port {} {} {}",
                    self.cyan(spec.local_port),
                    self.gray("→"),
                    self.cyan(spec.remote_port)
                ),
                format!("💻 Local URL: {}\n", self.green(spec.local_url())),
                self.gray("⌨️  Press Ctrl+C to exit"),
            ],
            TunnelEvent::Retrying {
                attempt,
                max_retries,
                delay,
                reason,
            } => vec![
                format!(
                    "\nConnection lost. Retrying in {}s... (Attempt {}/{})",
                    delay.as_secs(),
                    attempt,
                    max_retries
                ),
                self.gray(reason),
            ],
            TunnelEvent::Stopped => vec![format!("\n{}", self.gray("Port forwarding stopped."))],
        }
    }
}

impl Default for Printer {
    fn default() -> Self {
        Self::new()
    }
}

impl TunnelNotifier for Printer {
    fn notify(&self, event: TunnelEvent) {
        for line in self.render(&event) {
            println!("{}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kbridge_core::{ForwardSpec, Target, TargetPhase};
    use std::time::Duration;

    #[test]
    fn test_plain_printer_has_no_escape_codes() {
        let printer = Printer::plain();
        assert_eq!(printer.option_line(2, "api → 80/TCP"), "[2] api → 80/TCP");
        assert_eq!(printer.error_line("boom"), "❌ boom");
    }

    #[test]
    fn test_render_ready() {
        let printer = Printer::plain();
        let lines = printer.render(&TunnelEvent::Ready {
            spec: ForwardSpec {
                target: Target::new("web-0", "default", TargetPhase::Running),
                local_port: 43121,
                remote_port: 80,
            },
        });

        assert_eq!(lines[0], "\n🚀 Forwarding port 43121 → 80");
        assert_eq!(lines[1], "💻 Local URL: http://localhost:43121\n");
        assert!(lines[2].contains("Ctrl+C"));
    }

    #[test]
    fn test_render_retry_notice() {
        let printer = Printer::plain();
        let lines = printer.render(&TunnelEvent::Retrying {
            attempt: 2,
            max_retries: 5,
            delay: Duration::from_secs(5),
            reason: "port forward lost".to_string(),
        });

        assert_eq!(lines[0], "\nConnection lost. Retrying in 5s... (Attempt 2/5)");
        assert_eq!(lines[1], "port forward lost");
    }
}
