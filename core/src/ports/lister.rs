//! Target listing port (interface).

use std::future::Future;

use crate::domain::Target;
use crate::kubernetes::errors::Result;
use crate::kubernetes::KubernetesService;

/// Port for listing targets and services from the control plane.
///
/// Implementations must return fresh data on every call. Callers rely on
/// this to notice targets that disappeared between attempts.
pub trait TargetLister: Send + Sync {
    /// List targets matching a rendered label selector (`key=value,...`).
    ///
    /// An empty result is not an error.
    fn list_targets(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> impl Future<Output = Result<Vec<Target>>> + Send;

    /// Fetch a single target by exact name.
    fn get_target(&self, namespace: &str, name: &str) -> impl Future<Output = Result<Target>> + Send;

    /// Fetch a single service by name.
    fn get_service(
        &self,
        namespace: &str,
        name: &str,
    ) -> impl Future<Output = Result<KubernetesService>> + Send;

    /// List all services in a namespace.
    fn list_services(
        &self,
        namespace: &str,
    ) -> impl Future<Output = Result<Vec<KubernetesService>>> + Send;
}
