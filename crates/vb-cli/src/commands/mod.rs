//! CLI commands

use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::debug;

use crate::config::{resolve_kubeconfig, VbConfig};
use crate::{Error, Result};

pub mod backup;
pub mod output;

/// Build a kube [`Client`] using the vb kubeconfig resolution chain.
///
/// If `context` is provided, selects that context from the resolved
/// kubeconfig. Every failure here is a configuration error: nothing has been
/// sent to the cluster yet.
pub async fn resolve_kube_client(
    explicit_kubeconfig: Option<&str>,
    context: Option<&str>,
    config: &VbConfig,
) -> Result<Client> {
    let kubeconfig = match resolve_kubeconfig(explicit_kubeconfig, config) {
        Some(path) => {
            debug!(path = %path, "reading kubeconfig");
            Kubeconfig::read_from(&path).map_err(|e| {
                Error::configuration(format!("failed to read kubeconfig {}: {}", path, e))
            })?
        }
        None => Kubeconfig::read()
            .map_err(|e| Error::configuration(format!("failed to read kubeconfig: {}", e)))?,
    };

    let options = KubeConfigOptions {
        context: context.map(str::to_string),
        ..Default::default()
    };
    kube_client_from_kubeconfig(kubeconfig, &options).await
}

/// Build a kube [`Client`] from an already-loaded [`Kubeconfig`] with options.
pub async fn kube_client_from_kubeconfig(
    kubeconfig: Kubeconfig,
    options: &KubeConfigOptions,
) -> Result<Client> {
    let config = Config::from_custom_kubeconfig(kubeconfig, options)
        .await
        .map_err(|e| Error::configuration(format!("invalid kubeconfig: {}", e)))?;
    Client::try_from(config)
        .map_err(|e| Error::configuration(format!("failed to create client: {}", e)))
}
