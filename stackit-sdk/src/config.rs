//! Client configuration

/// Region used when the caller does not pick one
pub const DEFAULT_REGION: &str = "eu01";

/// Default endpoint of a service
pub fn default_endpoint(service: &str) -> String {
    format!("https://{}.api.stackit.cloud", service)
}

/// Settings an [`ApiClient`](crate::ApiClient) is bound to
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    pub service: String,
    pub endpoint: String,
    pub region: String,
    pub token: Option<String>,
    pub user_agent: String,
}

impl Configuration {
    pub fn new(service: impl Into<String>) -> Self {
        let service = service.into();
        Self {
            endpoint: default_endpoint(&service),
            service,
            region: DEFAULT_REGION.to_string(),
            token: None,
            user_agent: format!("stackit-sdk-rust/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Override the endpoint; `None` keeps the default
    pub fn with_endpoint(mut self, endpoint: Option<&str>) -> Self {
        if let Some(endpoint) = endpoint {
            self.endpoint = endpoint.trim_end_matches('/').to_string();
        }
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_endpoint_per_service() {
        let config = Configuration::new("kms");
        assert_eq!(config.endpoint, "https://kms.api.stackit.cloud");
        assert_eq!(config.region, "eu01");
    }

    #[test]
    fn custom_endpoint_overrides_default() {
        let config = Configuration::new("ske")
            .with_endpoint(Some("http://localhost:8080/"))
            .with_region("eu02");
        assert_eq!(config.endpoint, "http://localhost:8080");
        assert_eq!(config.region, "eu02");

        let config = Configuration::new("ske").with_endpoint(None);
        assert_eq!(config.endpoint, "https://ske.api.stackit.cloud");
    }
}
