use std::time::Duration;

use ordersync_order::OrderError;
use reqwest::{Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

/// Shared HTTP plumbing for the order and reference clients.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl ApiClient {
    /// Creates a client rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Transport` if `base_url` cannot carry a path or
    /// the HTTP client cannot be built.
    pub fn new(
        base_url: &Url,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, OrderError> {
        if base_url.cannot_be_a_base() {
            return Err(OrderError::transport(format!(
                "base url '{base_url}' cannot carry a path"
            )));
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OrderError::transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.clone(),
            token,
        })
    }

    /// `base_url` with `segments` appended, each percent-encoded.
    pub fn url<I, S>(&self, segments: I) -> Url
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let req = self
            .http
            .request(method, url)
            .header("Accept", "application/json");
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, &str)],
    ) -> Result<T, OrderError> {
        tracing::debug!(method = "GET", %url, "remote request");
        let resp = self
            .request(Method::GET, url)
            .query(query)
            .send()
            .await
            .map_err(transport)?;
        let body = checked_body(resp).await?;
        serde_json::from_str(&body)
            .map_err(|e| OrderError::decode(format!("unexpected response body: {e}")))
    }

    pub async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: &B,
    ) -> Result<(), OrderError> {
        tracing::debug!(method = %method, %url, "remote request");
        let resp = self
            .request(method, url)
            .json(body)
            .send()
            .await
            .map_err(transport)?;
        checked_body(resp).await.map(drop)
    }

    pub async fn delete(&self, url: Url) -> Result<(), OrderError> {
        tracing::debug!(method = "DELETE", %url, "remote request");
        let resp = self
            .request(Method::DELETE, url)
            .send()
            .await
            .map_err(transport)?;
        checked_body(resp).await.map(drop)
    }
}

fn transport(e: reqwest::Error) -> OrderError {
    tracing::warn!(error = %e, "remote request did not complete");
    OrderError::transport(e.to_string())
}

/// Returns the body of a 2xx response; any other status becomes
/// `OrderError::Status` carrying the body verbatim.
async fn checked_body(resp: Response) -> Result<String, OrderError> {
    let status = resp.status();
    let body = resp.text().await.map_err(transport)?;
    if !status.is_success() {
        return Err(OrderError::status(status.as_u16(), body));
    }
    Ok(body)
}
