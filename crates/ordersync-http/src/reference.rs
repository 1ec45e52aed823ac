use async_trait::async_trait;
use ordersync_order::{OrderError, ReferenceService, RolePermissions};
use url::Url;

use crate::client::ApiClient;
use crate::wire::{WireLayout, WireList, WireRole, WireVersion};

/// Read-only reference directory of the remote service.
#[derive(Debug, Clone)]
pub struct HttpReferenceClient {
    api: ApiClient,
}

impl HttpReferenceClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    fn url(&self, tail: &[&str]) -> Url {
        self.api
            .url(["references", "api", "v1"].iter().chain(tail))
    }
}

#[async_trait]
impl ReferenceService for HttpReferenceClient {
    async fn resolve_layout(&self, layout_id: &str) -> Result<String, OrderError> {
        let layout: WireLayout = self.api.get(self.url(&["layouts", layout_id]), &[]).await?;
        Ok(layout.name)
    }

    async fn resolve_layout_id(&self, descriptor: &str) -> Result<String, OrderError> {
        let found: WireList<WireLayout> = self
            .api
            .get(self.url(&["layouts"]), &[("name", descriptor)])
            .await?;
        found
            .list
            .into_iter()
            .find(|layout| layout.name == descriptor)
            .map(|layout| layout.id)
            .ok_or_else(|| OrderError::not_found(format!("layout '{descriptor}'")))
    }

    async fn role_permissions(&self, filter: &str) -> Result<RolePermissions, OrderError> {
        let roles: WireList<WireRole> = self
            .api
            .get(self.url(&["roles"]), &[("filter", filter)])
            .await?;
        Ok(roles
            .list
            .into_iter()
            .map(|role| (role.name, role.permissions))
            .collect())
    }

    async fn latest_product_version(&self, product: &str) -> Result<String, OrderError> {
        let latest: WireVersion = self
            .api
            .get(self.url(&["products", product, "versions", "latest"]), &[])
            .await?;
        Ok(latest.version)
    }
}
