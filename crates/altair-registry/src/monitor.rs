//! Background connection monitor for the registry client.

use crate::client::RegistryClient;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Periodically probe the registry and rebuild the connection on failure.
///
/// Runs for the lifetime of the process. A persistently unreachable registry
/// only produces log lines; pipeline stages fail their current operation and
/// wait for the next trigger.
pub async fn monitor_connection(client: Arc<RegistryClient>, token: CancellationToken) {
    let interval = client.config().probe_interval;
    info!("Starting registry connection monitor (interval: {:?})", interval);

    loop {
        if !client.is_connected().await {
            warn!("Lost connection to registry, reconnecting");
            match client.reconnect().await {
                Ok(()) => info!("Reconnected to registry"),
                Err(e) => warn!("Registry reconnect failed, will retry: {}", e),
            }
        }

        tokio::select! {
            _ = token.cancelled() => {
                info!("Registry monitor shutting down");
                return;
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }
}
