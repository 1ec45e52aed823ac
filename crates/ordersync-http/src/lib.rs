//! # ordersync-http
//!
//! reqwest implementation of the ordersync collaborator traits.
//!
//! - [`HttpOrderClient`] - one order of the remote order service
//! - [`HttpReferenceClient`] - layout, role and product reference lookups
//!
//! Both share an [`ApiClient`] that owns the connection pool, the bearer token
//! and the mapping of HTTP failures onto [`ordersync_order::OrderError`].
//! Non-2xx bodies are passed through verbatim so the operator sees exactly
//! what the remote side said.
//!
//! The item config of an order is polymorphic on the wire; it is decoded here
//! into [`ordersync_core::ItemConfig`] and never inspected dynamically again.

mod client;
mod order;
mod reference;
mod wire;

pub use client::ApiClient;
pub use order::HttpOrderClient;
pub use reference::HttpReferenceClient;
