//! Tunnel session: one forwarding attempt driven as a state machine.

use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::{ForwardSpec, SessionOutcome, TunnelEvent};
use crate::error::{SessionError, TransportError};
use crate::ports::{ForwardLoop, TunnelNotifier};

/// How long a stopped forwarding task may take to wind down before it is aborted.
const JOIN_GRACE_PERIOD: Duration = Duration::from_secs(2);

/// Lifecycle of a single session.
#[derive(Debug)]
pub enum SessionState {
    /// Forwarding task started, waiting for the ready signal.
    Connecting,
    /// Tunnel is listening locally.
    Ready,
    /// The forwarding task ended on its own.
    Failed(SessionError),
    /// The operator asked to stop.
    Stopped,
}

/// One streamed tunnel from a local port to one target.
///
/// A session is built per attempt and consumed by [`TunnelSession::run`].
pub struct TunnelSession {
    spec: ForwardSpec,
}

impl TunnelSession {
    pub fn new(spec: ForwardSpec) -> Self {
        Self { spec }
    }

    /// Run `forward_loop` until it fails or `shutdown` is cancelled.
    ///
    /// The loop gets its own child token, so stopping one session never
    /// cancels the caller's token. The forwarding task is always finished
    /// or aborted when this returns.
    pub async fn run<F, N>(
        self,
        forward_loop: F,
        shutdown: &CancellationToken,
        notifier: &N,
    ) -> SessionOutcome
    where
        F: ForwardLoop,
        N: TunnelNotifier,
    {
        let stop = shutdown.child_token();
        let (ready_tx, mut ready_rx) = oneshot::channel();
        let mut task = tokio::spawn(forward_loop.run(ready_tx, stop.clone()));
        let mut ready_pending = true;

        let mut state = SessionState::Connecting;
        loop {
            debug!(pod = %self.spec.target.id(), ?state, "session state");

            state = match state {
                SessionState::Connecting => tokio::select! {
                    biased;

                    ready = &mut ready_rx, if ready_pending => match ready {
                        Ok(()) => {
                            info!(
                                pod = %self.spec.target.id(),
                                local_port = self.spec.local_port,
                                remote_port = self.spec.remote_port,
                                "tunnel ready"
                            );
                            notifier.notify(TunnelEvent::Ready {
                                spec: self.spec.clone(),
                            });
                            SessionState::Ready
                        }
                        // Sender dropped without firing: the loop is ending, its result follows.
                        Err(_) => {
                            ready_pending = false;
                            SessionState::Connecting
                        }
                    },
                    _ = shutdown.cancelled() => SessionState::Stopped,
                    joined = &mut task => {
                        SessionState::Failed(SessionError::NeverReady(loop_error(joined)))
                    }
                },

                SessionState::Ready => tokio::select! {
                    biased;

                    _ = shutdown.cancelled() => SessionState::Stopped,
                    joined = &mut task => SessionState::Failed(SessionError::Lost(loop_error(joined))),
                },

                SessionState::Failed(err) => {
                    warn!(pod = %self.spec.target.id(), error = %err, "session failed");
                    return match err {
                        SessionError::NeverReady(_) => SessionOutcome::NeverReadyFailed(err),
                        SessionError::Lost(_) => SessionOutcome::ReadyThenFailed(err),
                    };
                }

                SessionState::Stopped => {
                    stop.cancel();
                    if tokio::time::timeout(JOIN_GRACE_PERIOD, &mut task).await.is_err() {
                        warn!(pod = %self.spec.target.id(), "forwarding task did not stop, aborting");
                        task.abort();
                    }
                    return SessionOutcome::CleanStop;
                }
            };
        }
    }
}

/// Maps the forwarding task's join result to the error that ended it.
fn loop_error(joined: Result<Result<(), TransportError>, JoinError>) -> TransportError {
    match joined {
        Ok(Ok(())) => TransportError::Closed,
        Ok(Err(err)) => err,
        Err(err) => TransportError::Aborted(err.to_string()),
    }
}
