//! Alliance endpoints
//!
//! ESI lists every alliance id in one response, so all three access modes
//! are available.

use super::names::name_batcher;
use super::{per_id, require_batched};
use crate::client::EsiClient;
use crate::error::{ApiError, ApiResult};
use crate::operation::{Operation, Request};
use chrono::{DateTime, Utc};
use esi_core::{
    Id, IdSet, IdSource, Identifier, IteratedResource, MappedResource, ResourceFamily,
    SingleResource, Streamer,
};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const GET_ALLIANCES: Operation = Operation::get("get_alliances", "/alliances/");
const GET_ALLIANCE: Operation =
    Operation::get("get_alliances_alliance_id", "/alliances/{alliance_id}/");
const GET_ALLIANCE_CORPORATIONS: Operation = Operation::get(
    "get_alliances_alliance_id_corporations",
    "/alliances/{alliance_id}/corporations/",
);

/// Public alliance information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllianceDetails {
    pub creator_corporation_id: Id,
    pub creator_id: Id,
    pub date_founded: DateTime<Utc>,
    pub executor_corporation_id: Option<Id>,
    pub faction_id: Option<Id>,
    pub name: String,
    pub ticker: String,
}

async fn details(client: EsiClient, alliance_id: Id) -> ApiResult<AllianceDetails> {
    client
        .call(Request::new(GET_ALLIANCE).path_param("alliance_id", alliance_id))
        .await
}

async fn corporations(client: EsiClient, alliance_id: Id) -> ApiResult<Vec<Id>> {
    client
        .call(Request::new(GET_ALLIANCE_CORPORATIONS).path_param("alliance_id", alliance_id))
        .await
}

/// Entry point for alliance lookups
#[derive(Debug, Clone)]
pub struct AllianceFamily {
    client: EsiClient,
}

impl AllianceFamily {
    pub(crate) fn new(client: EsiClient) -> Self {
        Self { client }
    }

    /// One alliance
    pub fn get(&self, id: impl Into<Identifier<ApiError>>) -> Alliance {
        self.single(id.into())
    }

    /// An explicit set of alliances
    pub fn get_many(&self, ids: impl Into<IdSource<ApiError>>) -> Alliances {
        self.mapped(ids.into())
    }

    /// Every alliance in New Eden
    pub fn get_all(&self) -> AllAlliances {
        self.iterated()
    }
}

impl ResourceFamily for AllianceFamily {
    type Error = ApiError;
    type Single = Alliance;
    type Mapped = Alliances;
    type Iterated = AllAlliances;

    fn single(&self, id: Identifier<ApiError>) -> Alliance {
        Alliance {
            client: self.client.clone(),
            inner: SingleResource::new(id),
        }
    }

    fn mapped(&self, ids: IdSource<ApiError>) -> Alliances {
        Alliances {
            client: self.client.clone(),
            inner: MappedResource::new(ids),
        }
    }

    fn iterated(&self) -> AllAlliances {
        let client = self.client.clone();
        let concurrency = client.config().max_concurrency;
        let inner = IteratedResource::new(
            move || {
                let client = client.clone();
                Streamer::once(move || {
                    let client = client.clone();
                    async move { client.call::<Vec<Id>>(Request::new(GET_ALLIANCES)).await }
                })
            },
            |id: &Id| *id,
        )
        .with_concurrency(concurrency);

        AllAlliances {
            client: self.client.clone(),
            inner,
        }
    }
}

/// One alliance
#[derive(Debug, Clone)]
pub struct Alliance {
    client: EsiClient,
    inner: SingleResource<ApiError>,
}

impl Alliance {
    /// The alliance id
    pub async fn id(&self) -> ApiResult<Id> {
        self.inner.id().await
    }

    /// Public information about the alliance
    pub async fn details(&self) -> ApiResult<AllianceDetails> {
        self.inner.fetch(|id| details(self.client.clone(), id)).await
    }

    /// Ids of the member corporations
    pub async fn corporations(&self) -> ApiResult<Vec<Id>> {
        self.inner
            .fetch(|id| corporations(self.client.clone(), id))
            .await
    }

    /// The alliance name
    pub async fn name(&self) -> ApiResult<String> {
        require_batched(&self.inner, &name_batcher(&self.client), "alliance").await
    }
}

/// An explicit set of alliances
#[derive(Debug, Clone)]
pub struct Alliances {
    client: EsiClient,
    inner: MappedResource<ApiError>,
}

impl Alliances {
    /// The resolved alliance ids
    pub async fn ids(&self) -> ApiResult<IdSet> {
        self.inner.ids().await
    }

    /// Public information, keyed by alliance id
    pub async fn details(&self) -> ApiResult<HashMap<Id, AllianceDetails>> {
        self.inner
            .fetch_batched(&per_id(&self.client, details))
            .await
    }

    /// Member corporation ids, keyed by alliance id
    pub async fn corporations(&self) -> ApiResult<HashMap<Id, Vec<Id>>> {
        self.inner
            .fetch_batched(&per_id(&self.client, corporations))
            .await
    }

    /// Names, keyed by alliance id
    pub async fn name(&self) -> ApiResult<HashMap<Id, String>> {
        self.inner.fetch_batched(&name_batcher(&self.client)).await
    }
}

/// Every alliance
///
/// The id list is fetched again for every stream started.
#[derive(Debug, Clone)]
pub struct AllAlliances {
    client: EsiClient,
    inner: IteratedResource<Id, ApiError>,
}

impl AllAlliances {
    /// Every alliance id
    pub fn ids(&self) -> BoxStream<'static, ApiResult<Id>> {
        self.inner.ids()
    }

    /// Public information for every alliance
    pub fn details(&self) -> BoxStream<'static, ApiResult<(Id, AllianceDetails)>> {
        let client = self.client.clone();
        self.inner.each(move |id| details(client.clone(), id))
    }

    /// Member corporation ids for every alliance
    pub fn corporations(&self) -> BoxStream<'static, ApiResult<(Id, Vec<Id>)>> {
        let client = self.client.clone();
        self.inner.each(move |id| corporations(client.clone(), id))
    }

    /// Every alliance name
    pub fn name(&self) -> BoxStream<'static, ApiResult<(Id, String)>> {
        self.inner.batched(name_batcher(&self.client))
    }
}
