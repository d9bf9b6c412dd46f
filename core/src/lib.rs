//! KBridge Core Library
//!
//! Keeps a local TCP tunnel open to one pod in a Kubernetes cluster.
//! Provides functionality to:
//! - Resolve pods by label, by name, or through a service's selector
//! - Narrow candidates to one running pod, interactively when needed
//! - Run `kubectl port-forward` and detect readiness and failure
//! - Re-resolve and reconnect with a bounded retry budget
//! - Manage user configuration (kubectl path, kubeconfig, context)
//!
//! # Architecture
//! This library follows hexagonal architecture (ports & adapters):
//! - `domain`: Pure data models
//! - `ports`: Trait definitions (interfaces)
//! - `application`: Use case services
//! - `kubernetes`: kubectl-backed adapters

// Hexagonal architecture layers
pub mod application;
pub mod domain;
pub mod kubernetes;
pub mod ports;

pub mod config;
pub mod error;

// Re-export domain types (primary API)
pub use domain::{
    ForwardOptions, ForwardSpec, Label, LabelSelector, SelectorSpec, SessionOutcome, Target,
    TargetKind, TargetPhase, TunnelEvent,
};

// Re-export other commonly used types
pub use application::{ControllerOutcome, ResilienceController, RetryPolicy};
pub use config::{Config, ConfigStore, DEFAULT_NAMESPACE};
pub use error::{Error, Result, SessionError, TransportError};
pub use kubernetes::{allocate_local_port, KubectlPortForwarder, KubernetesDiscovery};
