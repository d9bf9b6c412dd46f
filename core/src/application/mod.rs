//! Application layer - Use case services.
//!
//! These services orchestrate domain logic through the traits in `ports`,
//! so every collaborator can be swapped for a test double:
//! - `TargetResolver`: selector spec to candidate targets
//! - `TargetSelector`: candidates to exactly one target
//! - `TunnelSession`: one forwarding attempt
//! - `ResilienceController`: the retrying loop around all three

mod controller;
mod resolver;
mod selector;
mod session;

pub use controller::{
    ControllerOutcome, ResilienceController, RetryPolicy, DEFAULT_MAX_RETRIES,
    DEFAULT_RETRY_INTERVAL,
};
pub use resolver::TargetResolver;
pub use selector::{parse_choice, Choice, SelectionMode, TargetSelector};
pub use session::{SessionState, TunnelSession};
