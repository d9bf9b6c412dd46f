//! Ports layer - Trait definitions (interfaces).
//!
//! This module defines the interfaces that the application layer uses
//! to interact with external systems. Implementations live in `kubernetes`
//! and in the CLI.

mod lister;
mod notifier;
mod prompt;
mod transport;

pub use lister::TargetLister;
pub use notifier::TunnelNotifier;
pub use prompt::Prompter;
pub use transport::{ForwardLoop, PortForwarder};
