//! Response payloads of the remote services.

use ordersync_core::{ItemConfig, LifecycleState, OrderHandle};
use ordersync_order::OrderError;
use serde::Deserialize;
use serde_json::{Value, json};

/// Item types the engine understands. Others are carried without config.
const KNOWN_ITEM_TYPES: [&str; 4] = ["vm", "cluster", "app", "project"];

#[derive(Debug, Deserialize)]
pub(crate) struct WireOrder {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub deletable: bool,
    #[serde(default)]
    pub data: Vec<WireItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireItem {
    pub item_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub config: Value,
}

impl WireItem {
    fn decode_config(&self) -> Result<Option<ItemConfig>, OrderError> {
        if !KNOWN_ITEM_TYPES.contains(&self.kind.as_str()) {
            tracing::debug!(
                item_id = %self.item_id,
                kind = %self.kind,
                "item type without config mapping"
            );
            return Ok(None);
        }
        let tagged = json!({ "type": self.kind, "config": self.config });
        serde_json::from_value(tagged).map(Some).map_err(|e| {
            OrderError::decode(format!(
                "item {} has malformed {} config: {e}",
                self.item_id, self.kind
            ))
        })
    }
}

impl WireOrder {
    /// The first item is the primary one; the rest are auxiliary resources.
    pub fn into_handle(self) -> Result<OrderHandle, OrderError> {
        let primary = self
            .data
            .first()
            .ok_or_else(|| OrderError::decode(format!("order {} has no items", self.id)))?;
        Ok(OrderHandle {
            item_id: primary.item_id.clone(),
            item: primary.decode_config()?,
            order_id: self.id,
            deletable: self.deletable,
            state: LifecycleState::from(self.status.as_str()),
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireList<T> {
    #[serde(default = "Vec::new")]
    pub list: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireLayout {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireRole {
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireVersion {
    pub version: String,
}
