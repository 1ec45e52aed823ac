use url::Url;

/// Immutable provider settings handed to every component call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderContext {
    pub environment: String,
    pub organization: String,
    pub project: String,
    /// Operator-facing portal root, used for remediation links.
    pub portal_url: Url,
}

impl ProviderContext {
    pub fn new(
        environment: impl Into<String>,
        organization: impl Into<String>,
        project: impl Into<String>,
        portal_url: Url,
    ) -> Self {
        Self {
            environment: environment.into(),
            organization: organization.into(),
            project: project.into(),
            portal_url,
        }
    }

    /// Link to an order in the operator portal.
    pub fn order_url(&self, order_id: &str) -> String {
        let mut url = self.portal_url.clone();
        url.path_segments_mut()
            .map(|mut segments| {
                segments
                    .pop_if_empty()
                    .extend(["projects", self.project.as_str(), "orders", order_id]);
            })
            .ok();
        url.query_pairs_mut()
            .append_pair("context", &self.organization);
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_url() {
        let ctx = ProviderContext::new(
            "prod",
            "acme",
            "proj-1",
            Url::parse("https://portal.example.com/all/").unwrap(),
        );
        assert_eq!(
            ctx.order_url("ord-42"),
            "https://portal.example.com/all/projects/proj-1/orders/ord-42?context=acme"
        );
    }
}
