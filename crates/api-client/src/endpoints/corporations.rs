//! Corporation endpoints

use super::names::name_batcher;
use super::{per_id, require_batched};
use crate::client::EsiClient;
use crate::error::{ApiError, ApiResult};
use crate::operation::{Operation, Request};
use chrono::{DateTime, Utc};
use esi_core::{
    Id, IdSet, IdSource, Identifier, MappedResource, NoCollection, ResourceFamily, SingleResource,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const GET_CORPORATION: Operation = Operation::get(
    "get_corporations_corporation_id",
    "/corporations/{corporation_id}/",
);

/// Public corporation information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorporationDetails {
    pub alliance_id: Option<Id>,
    pub ceo_id: Id,
    pub creator_id: Id,
    pub date_founded: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub faction_id: Option<Id>,
    pub home_station_id: Option<Id>,
    pub member_count: u32,
    pub name: String,
    pub shares: Option<i64>,
    pub tax_rate: f64,
    pub ticker: String,
    pub url: Option<String>,
    pub war_eligible: Option<bool>,
}

async fn details(client: EsiClient, corporation_id: Id) -> ApiResult<CorporationDetails> {
    client
        .call(Request::new(GET_CORPORATION).path_param("corporation_id", corporation_id))
        .await
}

/// Entry point for corporation lookups
#[derive(Debug, Clone)]
pub struct CorporationFamily {
    client: EsiClient,
}

impl CorporationFamily {
    pub(crate) fn new(client: EsiClient) -> Self {
        Self { client }
    }

    /// One corporation
    pub fn get(&self, id: impl Into<Identifier<ApiError>>) -> Corporation {
        self.single(id.into())
    }

    /// An explicit set of corporations
    pub fn get_many(&self, ids: impl Into<IdSource<ApiError>>) -> Corporations {
        self.mapped(ids.into())
    }
}

impl ResourceFamily for CorporationFamily {
    type Error = ApiError;
    type Single = Corporation;
    type Mapped = Corporations;
    type Iterated = NoCollection;

    fn single(&self, id: Identifier<ApiError>) -> Corporation {
        Corporation {
            client: self.client.clone(),
            inner: SingleResource::new(id),
        }
    }

    fn mapped(&self, ids: IdSource<ApiError>) -> Corporations {
        Corporations {
            client: self.client.clone(),
            inner: MappedResource::new(ids),
        }
    }

    fn iterated(&self) -> NoCollection {
        NoCollection
    }
}

/// One corporation
#[derive(Debug, Clone)]
pub struct Corporation {
    client: EsiClient,
    inner: SingleResource<ApiError>,
}

impl Corporation {
    /// The corporation id
    pub async fn id(&self) -> ApiResult<Id> {
        self.inner.id().await
    }

    /// Public information about the corporation
    pub async fn details(&self) -> ApiResult<CorporationDetails> {
        self.inner.fetch(|id| details(self.client.clone(), id)).await
    }

    /// The corporation name
    pub async fn name(&self) -> ApiResult<String> {
        require_batched(&self.inner, &name_batcher(&self.client), "corporation").await
    }
}

/// An explicit set of corporations
#[derive(Debug, Clone)]
pub struct Corporations {
    client: EsiClient,
    inner: MappedResource<ApiError>,
}

impl Corporations {
    /// The resolved corporation ids
    pub async fn ids(&self) -> ApiResult<IdSet> {
        self.inner.ids().await
    }

    /// Public information, keyed by corporation id
    pub async fn details(&self) -> ApiResult<HashMap<Id, CorporationDetails>> {
        self.inner
            .fetch_batched(&per_id(&self.client, details))
            .await
    }

    /// Names, keyed by corporation id
    pub async fn name(&self) -> ApiResult<HashMap<Id, String>> {
        self.inner.fetch_batched(&name_batcher(&self.client)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{body_ids, path_id, FakeAgent};
    use esi_core::{Selection, Variant};
    use serde_json::{json, Value};

    fn agent() -> FakeAgent {
        FakeAgent::new()
            .on(GET_CORPORATION.id, |request| {
                let id = path_id(request, "corporation_id");
                json!({
                    "alliance_id": 434_243_723,
                    "ceo_id": 180_548_812,
                    "creator_id": 180_548_812,
                    "date_founded": "2004-11-28T16:42:51Z",
                    "member_count": 656,
                    "name": format!("Corp {id}"),
                    "tax_rate": 0.256,
                    "ticker": "C C P",
                    "war_eligible": false
                })
            })
            .on("post_universe_names", |request| {
                let entries: Vec<Value> = body_ids(request)
                    .into_iter()
                    .map(|id| json!({"id": id, "name": format!("Corp {id}"), "category": "corporation"}))
                    .collect();
                Value::from(entries)
            })
    }

    #[tokio::test]
    async fn test_single_details() {
        let details = agent()
            .client()
            .corporations()
            .get(109_299_958_i64)
            .details()
            .await
            .unwrap();

        assert_eq!(details.name, "Corp 109299958");
        assert_eq!(details.alliance_id, Some(434_243_723));
        assert_eq!(details.war_eligible, Some(false));
        assert!(details.date_founded.is_some());
    }

    #[tokio::test]
    async fn test_mapped_name_and_details() {
        let agent = agent();
        let corporations = agent.client().corporations().get_many([1_i64, 2]);

        let names = corporations.name().await.unwrap();
        assert_eq!(names[&2], "Corp 2");

        let details = corporations.details().await.unwrap();
        assert_eq!(details.len(), 2);
        assert_eq!(agent.call_count(GET_CORPORATION.id), 2);
    }

    #[tokio::test]
    async fn test_empty_set_makes_no_requests() {
        let agent = agent();
        let corporations = agent.client().corporations().get_many(Vec::<Id>::new());

        assert!(corporations.details().await.unwrap().is_empty());
        assert!(corporations.name().await.unwrap().is_empty());
        assert_eq!(agent.call_count(GET_CORPORATION.id), 0);
        assert_eq!(agent.call_count("post_universe_names"), 0);
    }

    #[tokio::test]
    async fn test_select_variants() {
        let family = agent().client().corporations();

        match family.select(Selection::from(42_i64)) {
            Variant::Single(corporation) => assert_eq!(corporation.id().await.unwrap(), 42),
            other => panic!("expected a single corporation, got {:?}", other.kind()),
        }
        match family.select(Selection::from(vec![3_i64, 1, 3])) {
            Variant::Mapped(corporations) => assert_eq!(corporations.ids().await.unwrap().len(), 2),
            other => panic!("expected mapped corporations, got {:?}", other.kind()),
        }
        assert!(matches!(
            family.select(Selection::All),
            Variant::Iterated(NoCollection)
        ));
    }
}
