use async_trait::async_trait;
use ordersync_core::{Credential, FlavorSpec, OrderHandle, ProviderContext};
use ordersync_order::{
    HorizontalScale, MountExpansion, Operation, OrderError, OrderService, RoleGrant,
};
use reqwest::Method;
use serde_json::{Value, json};
use tokio::sync::OnceCell;
use url::Url;

use crate::client::ApiClient;
use crate::wire::WireOrder;

/// One order of the remote order service.
///
/// Mutations are addressed to the order's primary item. Its id is taken from
/// the first `describe` and reused for the lifetime of the client.
#[derive(Debug)]
pub struct HttpOrderClient {
    api: ApiClient,
    project: String,
    order_id: String,
    item_id: OnceCell<String>,
}

impl HttpOrderClient {
    pub fn new(api: ApiClient, provider: &ProviderContext, order_id: impl Into<String>) -> Self {
        Self {
            api,
            project: provider.project.clone(),
            order_id: order_id.into(),
            item_id: OnceCell::new(),
        }
    }

    fn order_url(&self) -> Url {
        self.api.url([
            "order-service",
            "api",
            "v1",
            "projects",
            self.project.as_str(),
            "orders",
            self.order_id.as_str(),
        ])
    }

    fn action_url(&self, operation: Operation) -> Url {
        let mut url = self.order_url();
        if let Ok(mut path) = url.path_segments_mut() {
            path.extend(["actions", operation.as_str()]);
        }
        url
    }

    async fn fetch(&self) -> Result<OrderHandle, OrderError> {
        let order: WireOrder = self.api.get(self.order_url(), &[]).await?;
        let handle = order.into_handle()?;
        // First describe wins; the primary item does not change.
        let _ = self.item_id.set(handle.item_id.clone());
        Ok(handle)
    }

    async fn item_id(&self) -> Result<&str, OrderError> {
        self.item_id
            .get_or_try_init(|| async { self.fetch().await.map(|h| h.item_id) })
            .await
            .map(String::as_str)
    }

    async fn act(&self, operation: Operation, params: Value) -> Result<(), OrderError> {
        let item_id = self.item_id().await?;
        let body = json!({ "item_id": item_id, "order": params });
        tracing::info!(order_id = %self.order_id, operation = %operation, "issuing order action");
        self.api
            .send(Method::PATCH, self.action_url(operation), &body)
            .await
    }
}

#[async_trait]
impl OrderService for HttpOrderClient {
    fn order_id(&self) -> &str {
        &self.order_id
    }

    async fn describe(&self) -> Result<OrderHandle, OrderError> {
        self.fetch().await
    }

    async fn change_label(&self, label: &str) -> Result<(), OrderError> {
        self.act(Operation::ChangeLabel, json!({ "label": label }))
            .await
    }

    async fn change_financial_project(&self, project_id: &str) -> Result<(), OrderError> {
        self.act(
            Operation::ChangeFinancialProject,
            json!({ "financial_project_id": project_id }),
        )
        .await
    }

    async fn add_access_group(
        &self,
        target_id: &str,
        grant: &RoleGrant,
        permissions: &[String],
    ) -> Result<(), OrderError> {
        self.act(
            Operation::AddAccessGroup,
            json!({
                "target_id": target_id,
                "role": grant.role,
                "groups": grant.groups,
                "permissions": permissions,
            }),
        )
        .await
    }

    async fn change_access_group(
        &self,
        target_id: &str,
        grant: &RoleGrant,
    ) -> Result<(), OrderError> {
        self.act(
            Operation::ChangeAccessGroup,
            json!({ "target_id": target_id, "role": grant.role, "groups": grant.groups }),
        )
        .await
    }

    async fn delete_access_group(
        &self,
        target_id: &str,
        grant: &RoleGrant,
    ) -> Result<(), OrderError> {
        self.act(
            Operation::DeleteAccessGroup,
            json!({ "target_id": target_id, "role": grant.role, "groups": grant.groups }),
        )
        .await
    }

    async fn change_password(&self, credential: &Credential) -> Result<(), OrderError> {
        self.act(
            Operation::ChangePassword,
            json!({ "user": credential.user, "password": credential.secret }),
        )
        .await
    }

    async fn change_flavor(&self, flavor: &FlavorSpec) -> Result<(), OrderError> {
        self.act(Operation::ChangeFlavor, json!({ "flavor": flavor }))
            .await
    }

    async fn expand_mount_point(&self, expansion: &MountExpansion) -> Result<(), OrderError> {
        self.act(
            Operation::ExpandMountPoint,
            json!({
                "mount": expansion.path,
                "size": expansion.increment_gb,
                "new_size": expansion.new_size_gb,
            }),
        )
        .await
    }

    async fn horizontal_scale(&self, request: &HorizontalScale) -> Result<(), OrderError> {
        let params = serde_json::to_value(request)
            .map_err(|e| OrderError::decode(format!("cannot encode scaling request: {e}")))?;
        self.act(Operation::HorizontalScale, params).await
    }

    async fn update_product_version(&self) -> Result<(), OrderError> {
        self.act(Operation::UpdateProductVersion, json!({})).await
    }

    async fn delete(&self) -> Result<(), OrderError> {
        tracing::info!(order_id = %self.order_id, "deleting order");
        self.api.delete(self.order_url()).await
    }
}
