//! Config command - show and edit `~/.kbridge/config.json`.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Subcommand, ValueEnum};
use kbridge_core::{Config, ConfigStore, DEFAULT_NAMESPACE};

use crate::ui::Printer;

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set { key: ConfigKey, value: String },
    /// Reset a configuration value to its default
    Unset { key: ConfigKey },
    /// Print the configuration file path
    Path,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigKey {
    KubectlPath,
    Kubeconfig,
    Context,
    DefaultNamespace,
}

pub async fn run(store: &ConfigStore, action: ConfigAction, printer: Printer) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = store.load().await?;
            for line in describe(&config, &printer) {
                println!("{}", line);
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = store.load().await?;
            apply(&mut config, key, Some(value));
            store.save(&config).await?;
            println!("Saved {}", printer.cyan(store.config_path().display()));
        }
        ConfigAction::Unset { key } => {
            let mut config = store.load().await?;
            apply(&mut config, key, None);
            store.save(&config).await?;
            println!("Saved {}", printer.cyan(store.config_path().display()));
        }
        ConfigAction::Path => println!("{}", store.config_path().display()),
    }
    Ok(())
}

fn apply(config: &mut Config, key: ConfigKey, value: Option<String>) {
    match key {
        ConfigKey::KubectlPath => config.kubectl_path = value.map(PathBuf::from),
        ConfigKey::Kubeconfig => config.kubeconfig = value.map(PathBuf::from),
        ConfigKey::Context => config.context = value,
        ConfigKey::DefaultNamespace => {
            config.default_namespace = value.unwrap_or_else(|| DEFAULT_NAMESPACE.to_string())
        }
    }
}

fn describe(config: &Config, printer: &Printer) -> Vec<String> {
    let unset = || printer.gray("(not set)");
    let path = |p: &Option<PathBuf>| {
        p.as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(unset)
    };

    vec![
        format!("kubectl-path:      {}", path(&config.kubectl_path)),
        format!("kubeconfig:        {}", path(&config.kubeconfig)),
        format!(
            "context:           {}",
            config.context.clone().unwrap_or_else(unset)
        ),
        format!("default-namespace: {}", config.default_namespace),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_apply_and_unset() {
        let mut config = Config::default();

        apply(&mut config, ConfigKey::Context, Some("staging".to_string()));
        apply(&mut config, ConfigKey::DefaultNamespace, Some("payments".to_string()));
        assert_eq!(config.context.as_deref(), Some("staging"));
        assert_eq!(config.default_namespace, "payments");

        apply(&mut config, ConfigKey::DefaultNamespace, None);
        apply(&mut config, ConfigKey::Context, None);
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_describe_marks_unset_values() {
        let lines = describe(&Config::default(), &Printer::plain());
        assert_eq!(lines[2], "context:           (not set)");
        assert_eq!(lines[3], "default-namespace: default");
    }

    #[tokio::test]
    async fn test_set_persists() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::with_path(dir.path().join("config.json"));

        run(
            &store,
            ConfigAction::Set {
                key: ConfigKey::KubectlPath,
                value: "/usr/local/bin/kubectl".to_string(),
            },
            Printer::plain(),
        )
        .await
        .unwrap();

        let config = store.load().await.unwrap();
        assert_eq!(config.kubectl_path, Some(PathBuf::from("/usr/local/bin/kubectl")));
    }
}
