//! kubectl port-forward transport.
//!
//! Each attempt runs one `kubectl port-forward` child process. Readiness is
//! read from its stdout, failures from its exit and stderr.

use std::net::TcpListener;
use std::process::{ExitStatus, Stdio};
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::discovery::KubernetesDiscovery;
use crate::domain::ForwardSpec;
use crate::error::TransportError;
use crate::ports::{ForwardLoop, PortForwarder};

/// Grace period between SIGTERM and a forced kill.
const KILL_GRACE_PERIOD: Duration = Duration::from_millis(300);

/// Upper bound on reading leftover output once kubectl has exited.
const DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

/// kubectl prints one of these per listener once it is accepting connections.
static FORWARDING_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Forwarding from (\S+):(\d+) -> (\d+)").expect("valid forwarding regex")
});

/// Transport that forwards through `kubectl port-forward`.
#[derive(Debug, Clone)]
pub struct KubectlPortForwarder {
    discovery: KubernetesDiscovery,
}

impl KubectlPortForwarder {
    pub fn new(discovery: KubernetesDiscovery) -> Self {
        Self { discovery }
    }
}

impl PortForwarder for KubectlPortForwarder {
    type Loop = KubectlForwardLoop;

    fn prepare(&self, spec: &ForwardSpec) -> Result<Self::Loop, TransportError> {
        let mut command = self
            .discovery
            .kubectl_command()
            .map_err(|e| TransportError::Spawn(e.to_string()))?;

        command
            .args([
                "port-forward",
                "-n",
                &spec.target.namespace,
                &spec.target.resource(),
                &spec.port_mapping(),
                "--address=127.0.0.1",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Keep kubectl out of the terminal's process group: Ctrl+C goes to
        // kbridge alone, and kubectl is stopped through `terminate`.
        #[cfg(unix)]
        command.process_group(0);

        Ok(KubectlForwardLoop {
            command,
            local_port: spec.local_port,
        })
    }
}

/// One kubectl port-forward child, not yet started.
#[derive(Debug)]
pub struct KubectlForwardLoop {
    command: Command,
    local_port: u16,
}

impl ForwardLoop for KubectlForwardLoop {
    fn run(
        self,
        ready: oneshot::Sender<()>,
        stop: CancellationToken,
    ) -> impl std::future::Future<Output = Result<(), TransportError>> + Send + 'static {
        async move {
            let KubectlForwardLoop {
                mut command,
                local_port,
            } = self;

            let mut child = command
                .spawn()
                .map_err(|e| TransportError::Spawn(format!("Failed to start kubectl: {}", e)))?;

            let stdout = child.stdout.take().ok_or(TransportError::Closed)?;
            let stderr = child.stderr.take().ok_or(TransportError::Closed)?;
            let mut stdout_lines = BufReader::new(stdout).lines();
            let mut stderr_lines = BufReader::new(stderr).lines();

            let mut ready = Some(ready);
            let mut stderr_report = StderrReport::default();
            let mut stdout_open = true;
            let mut stderr_open = true;

            loop {
                tokio::select! {
                    _ = stop.cancelled() => {
                        terminate(&mut child).await;
                        return Ok(());
                    }
                    line = stdout_lines.next_line(), if stdout_open => match line {
                        Ok(Some(line)) => {
                            debug!(%line, "kubectl stdout");
                            if is_forwarding_line(&line) {
                                if let Some(tx) = ready.take() {
                                    let _ = tx.send(());
                                }
                            }
                        }
                        _ => stdout_open = false,
                    },
                    line = stderr_lines.next_line(), if stderr_open => match line {
                        Ok(Some(line)) => stderr_report.record(line),
                        _ => stderr_open = false,
                    },
                    status = child.wait() => {
                        let status = status.map_err(|e| TransportError::Aborted(e.to_string()))?;

                        // The exit can be seen before the last lines kubectl wrote are read.
                        let drained = tokio::time::timeout(DRAIN_TIMEOUT, async {
                            while let Ok(Some(line)) = stderr_lines.next_line().await {
                                stderr_report.record(line);
                            }
                            while let Ok(Some(line)) = stdout_lines.next_line().await {
                                debug!(%line, "kubectl stdout");
                            }
                        })
                        .await;
                        if drained.is_err() {
                            debug!("kubectl output still open after exit");
                        }

                        // kubectl reports a taken port as an exit, but the local port is the culprit.
                        if stderr_report.port_conflict == Some(local_port) {
                            return Err(TransportError::PortInUse(local_port));
                        }
                        return Err(exit_error(status, stderr_report.last_error));
                    }
                }
            }
        }
    }
}

/// What kubectl's stderr said before it exited.
#[derive(Debug, Default)]
struct StderrReport {
    last_error: Option<String>,
    port_conflict: Option<u16>,
}

impl StderrReport {
    fn record(&mut self, line: String) {
        if let Some(port) = detect_port_conflict(&line) {
            self.port_conflict = Some(port);
        }
        if is_error_line(&line) {
            warn!(%line, "kubectl port-forward error");
            self.last_error = Some(line);
        }
    }
}

fn exit_error(status: ExitStatus, last_error: Option<String>) -> TransportError {
    let status = match status.code() {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    };
    TransportError::Exited {
        status,
        detail: last_error.unwrap_or_else(|| "lost connection to pod".to_string()),
    }
}

/// Stops kubectl: SIGTERM first, then a forced kill after the grace period.
async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Ok(pid) = i32::try_from(pid) {
            let _ = kill(Pid::from_raw(pid), Signal::SIGTERM);
            if tokio::time::timeout(KILL_GRACE_PERIOD, child.wait()).await.is_ok() {
                return;
            }
        }
    }

    let _ = child.kill().await;
}

// ============================================================================
// Local Port Allocation
// ============================================================================

/// Asks the OS for a free local port.
///
/// The listener is dropped right away, so another process could claim the
/// port before kubectl binds it; kubectl then reports a port conflict.
pub fn allocate_local_port() -> std::io::Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    drop(listener);
    Ok(port)
}

// ============================================================================
// Output Parsing
// ============================================================================

/// Checks if a stdout line reports an established listener.
pub fn is_forwarding_line(line: &str) -> bool {
    FORWARDING_LINE.is_match(line.trim())
}

/// Checks if a line indicates an error.
pub fn is_error_line(line: &str) -> bool {
    let line_lower = line.to_lowercase();
    line_lower.contains("error")
        || line_lower.contains("failed")
        || line_lower.contains("unable to")
        || line_lower.contains("connection refused")
        || line_lower.contains("lost connection")
        || line_lower.contains("an error occurred")
}

/// Detects port conflict from output line.
/// Returns the conflicting port if detected.
pub fn detect_port_conflict(line: &str) -> Option<u16> {
    // kubectl format: "Unable to listen on port 8080: Listeners failed to create with the
    // following errors: [unable to create listener: Error listen tcp4 127.0.0.1:8080: bind:
    // address already in use]"
    if !line.to_lowercase().contains("address already in use") {
        return None;
    }

    // Take the digits after each colon; IP octets never appear after a colon.
    line.split(':').skip(1).find_map(|part| {
        let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
        digits.parse::<u16>().ok().filter(|port| *port > 255)
    })
}
