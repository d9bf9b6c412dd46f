//! Tunnel transport port (interface).

use std::future::Future;

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::domain::ForwardSpec;
use crate::error::TransportError;

/// Port for the streamed tunnel transport.
///
/// The wire protocol lives behind this trait. The session layer only sees a
/// forwarding loop plus its ready and stop signals.
pub trait PortForwarder: Send + Sync {
    type Loop: ForwardLoop;

    /// Prepare a forwarding loop for one attempt. Nothing is started yet.
    fn prepare(&self, spec: &ForwardSpec) -> Result<Self::Loop, TransportError>;
}

/// One attempt's forwarding loop, consumed when run.
pub trait ForwardLoop: Send + 'static {
    /// Run until the tunnel fails or `stop` is cancelled.
    ///
    /// `ready` is fired once the local listener accepts connections. Returns
    /// `Ok(())` only after a requested stop.
    fn run(
        self,
        ready: oneshot::Sender<()>,
        stop: CancellationToken,
    ) -> impl Future<Output = Result<(), TransportError>> + Send + 'static;
}
