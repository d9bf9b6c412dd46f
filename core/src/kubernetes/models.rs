//! Kubernetes data models for services, pods, and kubectl JSON parsing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{ContainerPort, Target, TargetPhase};

// ============================================================================
// Kubernetes Discovery Models
// ============================================================================

/// A port exposed by a Kubernetes service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePort {
    pub name: Option<String>,
    pub port: u16,
    pub target_port: u16,
    pub protocol: Option<String>,
}

impl ServicePort {
    /// Returns the label shown in port prompts (e.g., "443/TCP (https)").
    pub fn option_label(&self) -> String {
        let protocol = self.protocol.as_deref().unwrap_or("TCP");
        match &self.name {
            Some(name) if !name.is_empty() => format!("{}/{} ({})", self.port, protocol, name),
            _ => format!("{}/{}", self.port, protocol),
        }
    }
}

/// A Kubernetes service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KubernetesService {
    pub name: String,
    pub namespace: String,
    pub service_type: String,
    pub cluster_ip: Option<String>,
    /// Label selector for backing pods. Empty for selector-less services.
    pub selector: BTreeMap<String, String>,
    pub ports: Vec<ServicePort>,
}

impl KubernetesService {
    /// Returns the service ID in the format "namespace/name".
    pub fn id(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    /// Returns the label shown in service prompts (e.g., "api → 80/TCP, 443/TCP").
    pub fn option_label(&self) -> String {
        let ports: Vec<String> = self
            .ports
            .iter()
            .map(|p| format!("{}/{}", p.port, p.protocol.as_deref().unwrap_or("TCP")))
            .collect();
        format!("{} → {}", self.name, ports.join(", "))
    }

    /// Maps a requested service port to the pod port it targets.
    ///
    /// Ports the service does not declare are passed through unchanged.
    pub fn target_port_for(&self, port: u16) -> u16 {
        self.ports
            .iter()
            .find(|p| p.port == port)
            .map(|p| p.target_port)
            .unwrap_or(port)
    }
}

// ============================================================================
// kubectl JSON Response Parsing
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ObjectMetadata {
    pub name: String,
    #[serde(default)]
    pub namespace: Option<String>,
}

/// Response structure for `kubectl get services -o json`.
#[derive(Debug, Deserialize)]
pub struct ServiceListResponse {
    pub items: Vec<ServiceItem>,
}

/// A single service, as returned by `kubectl get service <name> -o json`.
#[derive(Debug, Deserialize)]
pub struct ServiceItem {
    pub metadata: ObjectMetadata,
    pub spec: ServiceSpec,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSpec {
    #[serde(rename = "type")]
    pub service_type: Option<String>,
    pub cluster_ip: Option<String>,
    pub selector: Option<BTreeMap<String, String>>,
    pub ports: Option<Vec<ServicePortSpec>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePortSpec {
    pub name: Option<String>,
    pub port: u16,
    pub target_port: Option<TargetPort>,
    pub protocol: Option<String>,
}

/// Kubernetes targetPort can be either an integer or a string (named port).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TargetPort {
    Int(u16),
    String(String),
}

impl TargetPort {
    /// Returns the integer value if available.
    pub fn as_int(&self) -> Option<u16> {
        match self {
            TargetPort::Int(v) => Some(*v),
            TargetPort::String(_) => None,
        }
    }
}

impl ServiceItem {
    /// Converts one kubectl service item, defaulting the namespace if omitted.
    pub fn into_service(self, default_namespace: &str) -> KubernetesService {
        KubernetesService {
            name: self.metadata.name,
            namespace: self
                .metadata
                .namespace
                .unwrap_or_else(|| default_namespace.to_string()),
            service_type: self
                .spec
                .service_type
                .unwrap_or_else(|| "ClusterIP".to_string()),
            cluster_ip: self.spec.cluster_ip,
            selector: self.spec.selector.unwrap_or_default(),
            ports: self
                .spec
                .ports
                .unwrap_or_default()
                .into_iter()
                .map(|p| ServicePort {
                    name: p.name,
                    port: p.port,
                    // Named target ports resolve on the pod side; fall back to the service port.
                    target_port: p.target_port.and_then(|tp| tp.as_int()).unwrap_or(p.port),
                    protocol: p.protocol,
                })
                .collect(),
        }
    }
}

impl ServiceListResponse {
    /// Converts the kubectl response to a list of KubernetesService.
    pub fn into_services(self, default_namespace: &str) -> Vec<KubernetesService> {
        self.items
            .into_iter()
            .map(|item| item.into_service(default_namespace))
            .collect()
    }
}

/// Response structure for `kubectl get pods -o json`.
#[derive(Debug, Deserialize)]
pub struct PodListResponse {
    pub items: Vec<PodItem>,
}

/// A single pod, as returned by `kubectl get pod <name> -o json`.
#[derive(Debug, Deserialize)]
pub struct PodItem {
    pub metadata: ObjectMetadata,
    #[serde(default)]
    pub spec: Option<PodSpec>,
    #[serde(default)]
    pub status: Option<PodStatus>,
}

#[derive(Debug, Deserialize)]
pub struct PodSpec {
    #[serde(default)]
    pub containers: Vec<ContainerSpec>,
}

#[derive(Debug, Deserialize)]
pub struct ContainerSpec {
    #[serde(default)]
    pub ports: Vec<ContainerPortSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerPortSpec {
    pub name: Option<String>,
    pub container_port: u16,
    pub protocol: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PodStatus {
    pub phase: Option<String>,
}

impl PodItem {
    /// Converts one kubectl pod item into a target.
    pub fn into_target(self, default_namespace: &str) -> Target {
        let phase = self
            .status
            .and_then(|s| s.phase)
            .map(|p| TargetPhase::from_pod_phase(&p))
            .unwrap_or_default();

        let ports = self
            .spec
            .map(|spec| {
                spec.containers
                    .into_iter()
                    .flat_map(|c| c.ports)
                    .map(|p| ContainerPort {
                        name: p.name,
                        port: p.container_port,
                        protocol: p.protocol,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Target {
            name: self.metadata.name,
            namespace: self
                .metadata
                .namespace
                .unwrap_or_else(|| default_namespace.to_string()),
            phase,
            ports,
        }
    }
}

impl PodListResponse {
    /// Converts the kubectl response to targets, keeping kubectl's order.
    pub fn into_targets(self, default_namespace: &str) -> Vec<Target> {
        self.items
            .into_iter()
            .map(|item| item.into_target(default_namespace))
            .collect()
    }
}
