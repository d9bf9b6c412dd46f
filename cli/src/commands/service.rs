//! Service command - forward to a running pod behind a service.

use anyhow::Result;
use clap::Args;
use kbridge_core::kubernetes::{KubernetesService, ServicePort};
use kbridge_core::ports::TargetLister;
use kbridge_core::{allocate_local_port, Config, Error, ForwardOptions, SelectorSpec};

use super::{build_controller, forward, shutdown_on_ctrl_c, until_cancelled};
use crate::ui::Printer;

#[derive(Args, Debug)]
pub struct ServiceArgs {
    /// Service to forward to (lists services in the namespace if omitted)
    pub name: Option<String>,

    /// The namespace where the service is located
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Local port to forward from (random if not specified)
    #[arg(short = 'L', long)]
    pub local_port: Option<u16>,

    /// Service port to forward to (prompts when the service has several)
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,
}

impl ServiceArgs {
    fn namespace_or_default(&self, config: &Config) -> String {
        self.namespace
            .clone()
            .unwrap_or_else(|| config.default_namespace.clone())
    }

    /// Builds the invocation's options once the service is known.
    ///
    /// `chosen` is the port picked from the service when `--port` was not given.
    pub fn into_options(
        self,
        config: &Config,
        service: &KubernetesService,
        chosen: Option<&ServicePort>,
    ) -> Result<ForwardOptions> {
        let namespace = self.namespace_or_default(config);

        // kubectl forwards to the pod, so a service port becomes its target port.
        let remote_port = match (self.port, chosen) {
            (Some(port), _) => service.target_port_for(port),
            (None, Some(port)) => port.target_port,
            (None, None) => {
                return Err(Error::NoPorts {
                    service: service.name.clone(),
                }
                .into())
            }
        };

        let local_port = match self.local_port {
            Some(port) => port,
            None => allocate_local_port()?,
        };

        Ok(ForwardOptions::new(
            SelectorSpec::service(namespace, service.name.clone()),
            local_port,
            remote_port,
        ))
    }
}

pub async fn run(config: &Config, args: ServiceArgs, printer: Printer) -> Result<()> {
    let controller = build_controller(config, printer)?;
    let shutdown = shutdown_on_ctrl_c();
    let namespace = args.namespace_or_default(config);

    let service = match &args.name {
        Some(name) => {
            let lookup = controller.lister().get_service(&namespace, name);
            until_cancelled(&shutdown, async { lookup.await.map_err(Error::from) }).await?
        }
        None => {
            let listing = controller.lister().list_services(&namespace);
            let services =
                until_cancelled(&shutdown, async { listing.await.map_err(Error::from) }).await?;
            until_cancelled(
                &shutdown,
                controller.selector().choose_service(&namespace, services),
            )
            .await?
        }
    };

    let chosen = match args.port {
        Some(_) => None,
        None => {
            let port =
                until_cancelled(&shutdown, controller.selector().choose_port(&service)).await?;
            if service.ports.len() == 1 {
                printer.using_port(&port);
            }
            Some(port)
        }
    };

    let options = args.into_options(config, &service, chosen.as_ref())?;
    forward(&controller, &options, &shutdown).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use kbridge_core::TargetKind;
    use std::collections::BTreeMap;

    fn service_port(port: u16, target_port: u16, name: &str) -> ServicePort {
        ServicePort {
            name: Some(name.to_string()),
            port,
            target_port,
            protocol: Some("TCP".to_string()),
        }
    }

    fn web_service() -> KubernetesService {
        KubernetesService {
            name: "web".to_string(),
            namespace: "shop".to_string(),
            service_type: "ClusterIP".to_string(),
            cluster_ip: Some("10.0.0.12".to_string()),
            selector: BTreeMap::from([("app".to_string(), "web".to_string())]),
            ports: vec![service_port(80, 8080, "http"), service_port(443, 8443, "https")],
        }
    }

    fn args(port: Option<u16>, local_port: Option<u16>) -> ServiceArgs {
        ServiceArgs {
            name: Some("web".to_string()),
            namespace: Some("shop".to_string()),
            local_port,
            port,
        }
    }

    #[test]
    fn test_explicit_port_maps_to_target_port() {
        let service = web_service();

        let options = args(Some(80), Some(9000))
            .into_options(&Config::default(), &service, None)
            .unwrap();

        assert_eq!(
            options.selector.kind,
            TargetKind::Service("web".to_string())
        );
        assert_eq!(options.selector.namespace, "shop");
        assert_eq!(options.local_port, 9000);
        assert_eq!(options.remote_port, 8080);

        // Undeclared ports go to the pod as given.
        let options = args(Some(5000), Some(9000))
            .into_options(&Config::default(), &service, None)
            .unwrap();
        assert_eq!(options.remote_port, 5000);
    }

    #[test]
    fn test_chosen_port_uses_its_target_port() {
        let service = web_service();
        let chosen = service.ports[1].clone();

        let options = args(None, Some(9000))
            .into_options(&Config::default(), &service, Some(&chosen))
            .unwrap();

        assert_eq!(options.remote_port, 8443);
    }

    #[test]
    fn test_local_port_is_allocated_when_unset() {
        let service = web_service();
        let config = Config {
            default_namespace: "payments".to_string(),
            ..Config::default()
        };
        let mut service_args = args(Some(80), None);
        service_args.namespace = None;

        let options = service_args.into_options(&config, &service, None).unwrap();

        assert_ne!(options.local_port, 0);
        assert_eq!(options.selector.namespace, "payments");
        assert_eq!(options.remote_port, 8080);
    }

    #[test]
    fn test_no_port_to_forward_is_an_error() {
        let err = args(None, Some(9000))
            .into_options(&Config::default(), &web_service(), None)
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::NoPorts { service }) if service == "web"
        ));
    }
}
