//! Tunnel notification port (interface).

use crate::domain::TunnelEvent;

/// Port for surfacing tunnel progress to the operator.
pub trait TunnelNotifier: Send + Sync {
    fn notify(&self, event: TunnelEvent);
}
