//! Domain layer - Pure data models for targets, selectors, and tunnels.
//!
//! These types have no I/O dependencies and can be tested in isolation.

mod forward;
mod selector;
mod target;

// Re-export all domain types
pub use forward::{ForwardOptions, ForwardSpec, SessionOutcome, TunnelEvent};
pub use selector::{Label, LabelParseError, LabelSelector, SelectorSpec, TargetKind};
pub use target::{ContainerPort, Target, TargetPhase};
