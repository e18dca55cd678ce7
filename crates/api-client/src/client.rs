//! Main ESI client handle

use crate::agent::{Agent, HttpAgent};
use crate::config::ClientConfig;
use crate::endpoints::{
    AllianceFamily, AssetFamily, CharacterFamily, CorporationFamily, MailFamily, TypeFamily,
};
use crate::error::ApiResult;
use crate::operation::{AccessToken, Request};
use esi_core::{Id, Page};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Entry point to the ESI entity families
///
/// Cheap to clone; clones share the agent and configuration.
#[derive(Clone)]
pub struct EsiClient {
    agent: Arc<dyn Agent>,
    config: Arc<ClientConfig>,
}

impl fmt::Debug for EsiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EsiClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl EsiClient {
    /// Create a client configured from the environment
    pub fn new() -> ApiResult<Self> {
        let config = ClientConfig::from_env()?;
        Self::with_config(config)
    }

    /// Create a client talking HTTP with a specific configuration
    pub fn with_config(config: ClientConfig) -> ApiResult<Self> {
        let agent = HttpAgent::new(&config)?;
        Ok(Self::with_agent(Arc::new(agent), config))
    }

    /// Create a client over a caller-supplied agent
    #[must_use]
    pub fn with_agent(agent: Arc<dyn Agent>, config: ClientConfig) -> Self {
        Self {
            agent,
            config: Arc::new(config),
        }
    }

    /// Get the current configuration
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Perform one request and deserialize its body
    pub async fn call<T: DeserializeOwned>(&self, request: Request) -> ApiResult<T> {
        self.agent.request(request).await?.json()
    }

    /// Fetch one page of a paginated operation
    pub async fn call_page<T: DeserializeOwned>(
        &self,
        request: Request,
        page: u32,
    ) -> ApiResult<Page<T>> {
        let operation = request.operation().id;
        let response = self.agent.request(request.query("page", page)).await?;
        let total_pages = response.pages;
        let items: Vec<T> = response.json()?;
        trace!(operation, page, items = items.len(), ?total_pages, "page received");

        let page = Page::new(items);
        Ok(match total_pages {
            Some(total) => page.with_total_pages(total),
            None => page,
        })
    }

    // -------------------------------------------------------------------------
    // Entity family accessors
    // -------------------------------------------------------------------------

    /// Alliances
    #[must_use]
    pub fn alliances(&self) -> AllianceFamily {
        AllianceFamily::new(self.clone())
    }

    /// Characters
    #[must_use]
    pub fn characters(&self) -> CharacterFamily {
        CharacterFamily::new(self.clone())
    }

    /// Corporations
    #[must_use]
    pub fn corporations(&self) -> CorporationFamily {
        CorporationFamily::new(self.clone())
    }

    /// Inventory types
    #[must_use]
    pub fn types(&self) -> TypeFamily {
        TypeFamily::new(self.clone())
    }

    /// Assets owned by a character (requires `esi-assets.read_assets.v1`)
    #[must_use]
    pub fn assets(&self, character_id: Id, token: AccessToken) -> AssetFamily {
        AssetFamily::new(self.clone(), character_id, token)
    }

    /// A character's mailbox (requires `esi-mail.read_mail.v1`)
    #[must_use]
    pub fn mail(&self, character_id: Id, token: AccessToken) -> MailFamily {
        MailFamily::new(self.clone(), character_id, token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::Operation;
    use crate::test_support::FakeAgent;
    use serde_json::json;

    const GET_TYPES: Operation = Operation::get("get_universe_types", "/universe/types/");

    #[test]
    fn test_client_creation() {
        let client = EsiClient::with_config(ClientConfig::singularity()).unwrap();
        assert_eq!(client.config().datasource.as_str(), "singularity");
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = ClientConfig::default().with_base_url("esi.evetech.net");
        assert!(EsiClient::with_config(config).is_err());
    }

    #[tokio::test]
    async fn test_call_page_adds_page_and_total() {
        let agent = FakeAgent::new().with_pages(GET_TYPES.id, 3, |request| {
            assert_eq!(request.query_value("page"), Some("2"));
            json!([4, 5, 6])
        });
        let client = agent.client();

        let page: Page<i64> = client.call_page(Request::new(GET_TYPES), 2).await.unwrap();
        assert_eq!(page.items, vec![4, 5, 6]);
        assert_eq!(page.total_pages, Some(3));
    }
}
