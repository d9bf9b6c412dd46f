//! Target selection application service.

use tracing::debug;

use crate::domain::Target;
use crate::error::{Error, Result};
use crate::kubernetes::{KubernetesService, ServicePort};
use crate::ports::Prompter;

/// How to narrow several running candidates down to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// Ask the operator (pods selected by label or name).
    Interactive,
    /// Take the first running target in resolver order (pods behind a service).
    FirstRunning,
}

/// A parsed line of operator input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    /// Zero-based index into the presented options.
    Index(usize),
    Quit,
    Invalid,
}

/// Parses one line of prompt input against a 1-indexed list of `len` options.
pub fn parse_choice(input: &str, len: usize) -> Choice {
    let input = input.trim();
    if input.eq_ignore_ascii_case("q") {
        return Choice::Quit;
    }

    match input.parse::<usize>() {
        Ok(n) if (1..=len).contains(&n) => Choice::Index(n - 1),
        _ => Choice::Invalid,
    }
}

/// Narrows candidates to exactly one target.
pub struct TargetSelector<P: Prompter> {
    prompter: P,
}

impl<P: Prompter> TargetSelector<P> {
    pub fn new(prompter: P) -> Self {
        Self { prompter }
    }

    pub fn prompter(&self) -> &P {
        &self.prompter
    }

    /// Select one running target from `candidates`.
    ///
    /// `describe` names the selector in the `NoRunningTargets` error.
    pub async fn select(
        &self,
        candidates: Vec<Target>,
        mode: SelectionMode,
        describe: &str,
    ) -> Result<Target> {
        let mut running: Vec<Target> = candidates.into_iter().filter(Target::is_running).collect();

        if running.is_empty() {
            return Err(Error::NoRunningTargets {
                selector: describe.to_string(),
            });
        }

        if running.len() == 1 || mode == SelectionMode::FirstRunning {
            return Ok(running.swap_remove(0));
        }

        let options: Vec<String> = running
            .iter()
            .map(|t| format!("{} (Status: {})", t.name, t.phase))
            .collect();

        debug!(count = running.len(), "prompting for target");
        match self
            .prompter
            .choose("Multiple pods found. Please select one:", &options)
            .await?
        {
            Some(index) if index < running.len() => Ok(running.swap_remove(index)),
            _ => Err(Error::Cancelled),
        }
    }

    /// Let the operator pick a service from `services`.
    pub async fn choose_service(
        &self,
        namespace: &str,
        mut services: Vec<KubernetesService>,
    ) -> Result<KubernetesService> {
        if services.is_empty() {
            return Err(Error::NoServices {
                namespace: namespace.to_string(),
            });
        }

        let options: Vec<String> = services.iter().map(KubernetesService::option_label).collect();
        match self.prompter.choose("🔍 Select service:", &options).await? {
            Some(index) if index < services.len() => Ok(services.swap_remove(index)),
            _ => Err(Error::Cancelled),
        }
    }

    /// Pick the service port to forward to. A single port is used without asking.
    pub async fn choose_port(&self, service: &KubernetesService) -> Result<ServicePort> {
        match service.ports.as_slice() {
            [] => Err(Error::NoPorts {
                service: service.name.clone(),
            }),
            [only] => Ok(only.clone()),
            ports => {
                let options: Vec<String> = ports.iter().map(ServicePort::option_label).collect();
                match self.prompter.choose("🔌 Select port:", &options).await? {
                    Some(index) if index < ports.len() => Ok(ports[index].clone()),
                    _ => Err(Error::Cancelled),
                }
            }
        }
    }
}
