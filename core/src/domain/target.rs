//! Forwarding target domain model.

use serde::{Deserialize, Serialize};

// ============================================================================
// TargetPhase
// ============================================================================

/// Reachability state of a target as reported by the control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum TargetPhase {
    /// Scheduled but not yet running.
    Pending,
    /// Running and able to accept a tunnel.
    Running,
    /// Finished, either successfully or not.
    Terminated,
    /// Phase could not be determined.
    #[default]
    Unknown,
}

impl TargetPhase {
    /// Maps a Kubernetes pod phase (`status.phase`) to a target phase.
    pub fn from_pod_phase(phase: &str) -> Self {
        match phase {
            "Pending" => Self::Pending,
            "Running" => Self::Running,
            "Succeeded" | "Failed" => Self::Terminated,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Running => "Running",
            Self::Terminated => "Terminated",
            Self::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for TargetPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Target
// ============================================================================

/// A port exposed by one of the target's containers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerPort {
    pub name: Option<String>,
    pub port: u16,
    pub protocol: Option<String>,
}

/// An addressable remote endpoint (a pod).
///
/// Targets are produced fresh by every resolution and never mutated, since
/// their phase can change between attempts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub namespace: String,
    pub phase: TargetPhase,
    pub ports: Vec<ContainerPort>,
}

impl Target {
    /// Creates a target without any declared container ports.
    pub fn new(name: impl Into<String>, namespace: impl Into<String>, phase: TargetPhase) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            phase,
            ports: Vec::new(),
        }
    }

    /// Whether the target can currently accept a tunnel.
    pub fn is_running(&self) -> bool {
        self.phase == TargetPhase::Running
    }

    /// Returns the target ID in the format "namespace/name".
    pub fn id(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    /// Returns the kubectl resource reference, e.g. "pod/api-7d9f".
    pub fn resource(&self) -> String {
        format!("pod/{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_mapping() {
        assert_eq!(TargetPhase::from_pod_phase("Running"), TargetPhase::Running);
        assert_eq!(TargetPhase::from_pod_phase("Pending"), TargetPhase::Pending);
        assert_eq!(TargetPhase::from_pod_phase("Succeeded"), TargetPhase::Terminated);
        assert_eq!(TargetPhase::from_pod_phase("Failed"), TargetPhase::Terminated);
        assert_eq!(TargetPhase::from_pod_phase("Evicted"), TargetPhase::Unknown);
    }

    #[test]
    fn test_target_identity() {
        let target = Target::new("api-7d9f", "staging", TargetPhase::Running);
        assert!(target.is_running());
        assert_eq!(target.id(), "staging/api-7d9f");
        assert_eq!(target.resource(), "pod/api-7d9f");
    }
}
