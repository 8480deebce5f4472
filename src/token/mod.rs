use crate::catalog::{CatalogGateway, Credential};
use crate::error::CatalogError;
use arc_swap::ArcSwap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Owns the shared commerce API credential and keeps it fresh.
///
/// `current()` is a lock-free pointer load — conversation turns never wait on
/// a refresh. The refresh task re-authenticates before the reported validity
/// elapses and swaps the cell atomically; readers see either the old or the
/// new credential, never a torn one.
pub struct TokenManager {
    current: ArcSwap<Credential>,
    gateway: Arc<CatalogGateway>,
    client_id: String,
    client_secret: String,
}

impl TokenManager {
    /// Perform the initial authentication and build the manager around it.
    pub async fn bootstrap(
        gateway: Arc<CatalogGateway>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Arc<Self>, CatalogError> {
        let client_id = client_id.into();
        let client_secret = client_secret.into();
        let credential = gateway.authenticate(&client_id, &client_secret).await?;
        tracing::info!(
            valid_for_secs = credential.valid_for.as_secs(),
            "obtained commerce API token"
        );
        Ok(Arc::new(Self {
            current: ArcSwap::from_pointee(credential),
            gateway,
            client_id,
            client_secret,
        }))
    }

    /// Latest credential. Never blocks; never observes a half-applied swap.
    pub fn current(&self) -> Arc<Credential> {
        self.current.load_full()
    }

    /// Re-authenticate and swap in the fresh credential.
    pub async fn refresh(&self) -> Result<(), CatalogError> {
        let fresh = self
            .gateway
            .authenticate(&self.client_id, &self.client_secret)
            .await?;
        self.current.store(Arc::new(fresh));
        Ok(())
    }

    /// Sleep 90% of the current credential's validity before refreshing, so
    /// the swap lands before expiry rather than after it.
    pub fn refresh_interval(&self) -> Duration {
        self.current()
            .valid_for
            .mul_f64(0.9)
            .max(MIN_REFRESH_INTERVAL)
    }

    /// Background refresh cycle. A failed refresh keeps the stale credential
    /// and is retried on the next tick, not immediately — in-flight
    /// conversations keep working until the backend actually rejects it.
    pub fn spawn_refresh(self: &Arc<Self>) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(manager.refresh_interval()).await;
                match manager.refresh().await {
                    Ok(()) => tracing::debug!("commerce API token refreshed"),
                    Err(e) => {
                        tracing::warn!("token refresh failed, keeping previous credential: {e}");
                    }
                }
            }
        })
    }
}
