//! Kubernetes module for target discovery and port forwarding.
//!
//! This module provides:
//! - Pod and service discovery via kubectl
//! - The kubectl port-forward transport
//! - Local port allocation

pub mod discovery;
pub mod errors;
pub mod models;
pub mod port_forward;

// Re-export commonly used types
pub use discovery::KubernetesDiscovery;
pub use errors::{KubectlError, Result};
pub use models::{KubernetesService, ServicePort};
pub use port_forward::{allocate_local_port, KubectlForwardLoop, KubectlPortForwarder};
