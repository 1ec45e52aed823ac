pub mod apply;
pub mod destroy;
pub mod plan;
pub mod wait;

use anyhow::{Context, Result};
use ordersync_config::AppConfig;
use ordersync_core::ProviderContext;
use ordersync_http::{ApiClient, HttpOrderClient, HttpReferenceClient};
use tokio_util::sync::CancellationToken;

/// Remote collaborators for one order.
pub struct Remote {
    pub provider: ProviderContext,
    pub order: HttpOrderClient,
    pub reference: HttpReferenceClient,
}

impl Remote {
    pub fn connect(cfg: &AppConfig, order_id: &str) -> Result<Self> {
        let provider = cfg.provider_context().map_err(anyhow::Error::msg)?;
        let base_url = cfg.api_base_url().map_err(anyhow::Error::msg)?;
        let api = ApiClient::new(&base_url, cfg.provider.token.clone(), cfg.request_timeout())
            .context("Failed to create API client")?;
        Ok(Self {
            order: HttpOrderClient::new(api.clone(), &provider, order_id),
            reference: HttpReferenceClient::new(api),
            provider,
        })
    }
}

/// Token cancelled on the first Ctrl-C.
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling");
            trigger.cancel();
        }
    });
    cancel
}
