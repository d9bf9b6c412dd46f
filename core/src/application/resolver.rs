//! Target resolution application service.

use tracing::debug;

use crate::domain::{LabelSelector, SelectorSpec, Target, TargetKind};
use crate::error::{Error, Result};
use crate::ports::TargetLister;

/// Resolves a selector spec to the current set of candidate targets.
///
/// Listing failures surface as `Error::Resolution` and are never retried
/// here; retrying is the resilience controller's job.
pub struct TargetResolver<L: TargetLister> {
    lister: L,
}

impl<L: TargetLister> TargetResolver<L> {
    pub fn new(lister: L) -> Self {
        Self { lister }
    }

    pub fn lister(&self) -> &L {
        &self.lister
    }

    /// Resolve `spec` against the control plane.
    ///
    /// Direct modes return an empty list when nothing matches. Service mode
    /// fails with `NoSelector` or `NoTargets` instead.
    pub async fn resolve(&self, spec: &SelectorSpec) -> Result<Vec<Target>> {
        let namespace = spec.namespace.as_str();

        let targets = match &spec.kind {
            TargetKind::Labels(selector) => {
                self.lister
                    .list_targets(namespace, &selector.to_string())
                    .await?
            }
            TargetKind::Name(name) => match self.lister.get_target(namespace, name).await {
                Ok(target) => vec![target],
                Err(e) if e.is_not_found() => Vec::new(),
                Err(e) => return Err(e.into()),
            },
            TargetKind::Service(service) => self.resolve_service(namespace, service).await?,
        };

        debug!(%spec, count = targets.len(), "resolved targets");
        Ok(targets)
    }

    async fn resolve_service(&self, namespace: &str, service_name: &str) -> Result<Vec<Target>> {
        let service = self.lister.get_service(namespace, service_name).await?;

        let selector = LabelSelector::from_map(&service.selector);
        if selector.is_empty() {
            return Err(Error::NoSelector {
                service: service.name,
            });
        }

        let targets = self
            .lister
            .list_targets(namespace, &selector.to_string())
            .await?;

        if !targets.iter().any(Target::is_running) {
            return Err(Error::NoTargets {
                selector: format!("service {} in namespace {}", service.name, namespace),
            });
        }

        Ok(targets)
    }
}
