//! Inventory type endpoints
//!
//! `/universe/types/` is paginated, 1000 ids per page, with the page count in
//! `X-Pages`.

use super::names::{ids_by_name, name_batcher};
use super::{per_id, require_batched};
use crate::client::EsiClient;
use crate::error::{ApiError, ApiResult};
use crate::operation::{Operation, Request};
use esi_core::{
    Id, IdSet, IdSource, Identifier, IteratedResource, MappedResource, ResourceFamily,
    SingleResource, Streamer,
};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Ids per page of `/universe/types/`
pub const TYPES_PAGE_SIZE: usize = 1000;

const GET_TYPES: Operation = Operation::get("get_universe_types", "/universe/types/");
const GET_TYPE: Operation = Operation::get("get_universe_types_type_id", "/universe/types/{type_id}/");

/// Static information about an inventory type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemTypeDetails {
    pub type_id: Id,
    pub name: String,
    pub description: String,
    pub group_id: Id,
    pub published: bool,
    pub market_group_id: Option<Id>,
    pub icon_id: Option<i32>,
    pub graphic_id: Option<i32>,
    pub capacity: Option<f64>,
    pub mass: Option<f64>,
    pub packaged_volume: Option<f64>,
    pub portion_size: Option<i32>,
    pub radius: Option<f64>,
    pub volume: Option<f64>,
}

async fn details(client: EsiClient, type_id: Id) -> ApiResult<ItemTypeDetails> {
    client
        .call(Request::new(GET_TYPE).path_param("type_id", type_id))
        .await
}

fn all_type_ids(client: EsiClient) -> Streamer<Id, ApiError> {
    Streamer::paged(TYPES_PAGE_SIZE, move |page| {
        let client = client.clone();
        async move { client.call_page::<Id>(Request::new(GET_TYPES), page).await }
    })
}

/// Entry point for inventory type lookups
#[derive(Debug, Clone)]
pub struct TypeFamily {
    client: EsiClient,
}

impl TypeFamily {
    pub(crate) fn new(client: EsiClient) -> Self {
        Self { client }
    }

    /// One type
    pub fn get(&self, id: impl Into<Identifier<ApiError>>) -> ItemType {
        self.single(id.into())
    }

    /// An explicit set of types
    pub fn get_many(&self, ids: impl Into<IdSource<ApiError>>) -> ItemTypes {
        self.mapped(ids.into())
    }

    /// Every type in the static data
    pub fn get_all(&self) -> AllItemTypes {
        self.iterated()
    }

    /// Types with exactly these names, looked up on every operation
    pub fn by_names<I, S>(&self, names: I) -> ItemTypes
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names = names.into_iter().map(Into::into).collect();
        self.mapped(ids_by_name(&self.client, names, |found| {
            found.inventory_types
        }))
    }
}

impl ResourceFamily for TypeFamily {
    type Error = ApiError;
    type Single = ItemType;
    type Mapped = ItemTypes;
    type Iterated = AllItemTypes;

    fn single(&self, id: Identifier<ApiError>) -> ItemType {
        ItemType {
            client: self.client.clone(),
            inner: SingleResource::new(id),
        }
    }

    fn mapped(&self, ids: IdSource<ApiError>) -> ItemTypes {
        ItemTypes {
            client: self.client.clone(),
            inner: MappedResource::new(ids),
        }
    }

    fn iterated(&self) -> AllItemTypes {
        let client = self.client.clone();
        let concurrency = client.config().max_concurrency;
        AllItemTypes {
            client: self.client.clone(),
            inner: IteratedResource::new(move || all_type_ids(client.clone()), |id: &Id| *id)
                .with_concurrency(concurrency),
        }
    }
}

/// One inventory type
#[derive(Debug, Clone)]
pub struct ItemType {
    client: EsiClient,
    inner: SingleResource<ApiError>,
}

impl ItemType {
    /// The type id
    pub async fn id(&self) -> ApiResult<Id> {
        self.inner.id().await
    }

    /// Static information about the type
    pub async fn details(&self) -> ApiResult<ItemTypeDetails> {
        self.inner.fetch(|id| details(self.client.clone(), id)).await
    }

    /// The type name
    pub async fn name(&self) -> ApiResult<String> {
        require_batched(&self.inner, &name_batcher(&self.client), "type").await
    }
}

/// An explicit set of inventory types
#[derive(Debug, Clone)]
pub struct ItemTypes {
    client: EsiClient,
    inner: MappedResource<ApiError>,
}

impl ItemTypes {
    /// The resolved type ids
    pub async fn ids(&self) -> ApiResult<IdSet> {
        self.inner.ids().await
    }

    /// Static information, keyed by type id
    pub async fn details(&self) -> ApiResult<HashMap<Id, ItemTypeDetails>> {
        self.inner
            .fetch_batched(&per_id(&self.client, details))
            .await
    }

    /// Names, keyed by type id
    pub async fn name(&self) -> ApiResult<HashMap<Id, String>> {
        self.inner.fetch_batched(&name_batcher(&self.client)).await
    }
}

/// Every inventory type
#[derive(Debug, Clone)]
pub struct AllItemTypes {
    client: EsiClient,
    inner: IteratedResource<Id, ApiError>,
}

impl AllItemTypes {
    /// Every type id, page by page
    pub fn ids(&self) -> BoxStream<'static, ApiResult<Id>> {
        self.inner.ids()
    }

    /// Static information for every type
    pub fn details(&self) -> BoxStream<'static, ApiResult<(Id, ItemTypeDetails)>> {
        let client = self.client.clone();
        self.inner.each(move |id| details(client.clone(), id))
    }

    /// Every type name
    pub fn name(&self) -> BoxStream<'static, ApiResult<(Id, String)>> {
        self.inner.batched(name_batcher(&self.client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{body_ids, path_id, FakeAgent};
    use futures::{StreamExt, TryStreamExt};
    use serde_json::{json, Value};

    /// 2300 type ids over three pages
    fn agent() -> FakeAgent {
        FakeAgent::new()
            .with_pages(GET_TYPES.id, 3, |request| {
                let page: i64 = request.query_value("page").unwrap().parse().unwrap();
                let start = (page - 1) * 1000;
                let end = (start + 1000).min(2_300);
                Value::from((start..end).collect::<Vec<i64>>())
            })
            .on(GET_TYPE.id, |request| {
                let id = path_id(request, "type_id");
                json!({
                    "type_id": id,
                    "name": format!("Type {id}"),
                    "description": "",
                    "group_id": 18,
                    "published": true,
                    "volume": 0.01
                })
            })
            .on("post_universe_names", |request| {
                let entries: Vec<Value> = body_ids(request)
                    .into_iter()
                    .map(|id| json!({"id": id, "name": format!("Type {id}"), "category": "inventory_type"}))
                    .collect();
                Value::from(entries)
            })
    }

    #[tokio::test]
    async fn test_iterated_ids_walk_every_page() {
        let agent = agent();
        let ids: Vec<Id> = agent.client().types().get_all().ids().try_collect().await.unwrap();

        assert_eq!(ids.len(), 2_300);
        assert_eq!(ids[1_500], 1_500);
        let pages: Vec<String> = agent
            .calls(GET_TYPES.id)
            .iter()
            .map(|request| request.query_value("page").unwrap().to_string())
            .collect();
        assert_eq!(pages, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_iterated_names_batch_after_ids() {
        let agent = agent();
        let names: Vec<(Id, String)> = agent
            .client()
            .types()
            .get_all()
            .name()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(names.len(), 2_300);
        assert_eq!(names[0], (0, "Type 0".to_string()));
        assert_eq!(agent.call_count("post_universe_names"), 3);
    }

    #[tokio::test]
    async fn test_iterated_details_can_stop_early() {
        let agent = agent();
        let first: Vec<(Id, ItemTypeDetails)> = agent
            .client()
            .types()
            .get_all()
            .details()
            .take(5)
            .try_collect()
            .await
            .unwrap();

        assert_eq!(first.len(), 5);
        assert_eq!(first[4].1.name, "Type 4");
        assert_eq!(agent.call_count(GET_TYPES.id), 1);
    }

    #[tokio::test]
    async fn test_by_names_resolves_then_fetches() {
        let agent = agent().on("post_universe_ids", |_| {
            json!({"inventory_types": [{"id": 34, "name": "Tritanium"}, {"id": 35, "name": "Pyerite"}]})
        });

        let details = agent
            .client()
            .types()
            .by_names(["Tritanium", "Pyerite"])
            .details()
            .await
            .unwrap();

        assert_eq!(details.len(), 2);
        assert_eq!(details[&34].volume, Some(0.01));
    }

    #[tokio::test]
    async fn test_single_name() {
        let name = agent().client().types().get(587_i64).name().await.unwrap();
        assert_eq!(name, "Type 587");
    }
}
