//! Character asset endpoints
//!
//! The asset list is paginated at 1000 items per page and there is no
//! single-item route, so single and mapped `details` filter the list.
//! Locations and names come from capped POST routes.

use super::{require_batched, require_in_collection, CharacterScope};
use crate::client::EsiClient;
use crate::error::{ApiError, ApiResult};
use crate::operation::{AccessToken, Operation};
use esi_core::{
    Batcher, Id, IdSet, IdSource, Identifier, IteratedResource, MappedResource, ResourceFamily,
    SingleResource, Streamer,
};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Items per page of the asset list
pub const ASSETS_PAGE_SIZE: usize = 1000;

/// Most item ids the location and name routes accept at once
pub const MAX_ASSET_IDS: usize = 1000;

const GET_ASSETS: Operation = Operation::get(
    "get_characters_character_id_assets",
    "/characters/{character_id}/assets/",
);
const POST_ASSET_LOCATIONS: Operation = Operation::post(
    "post_characters_character_id_assets_locations",
    "/characters/{character_id}/assets/locations/",
);
const POST_ASSET_NAMES: Operation = Operation::post(
    "post_characters_character_id_assets_names",
    "/characters/{character_id}/assets/names/",
);

/// What an asset's `location_id` refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationType {
    Station,
    SolarSystem,
    Item,
    #[serde(other)]
    Other,
}

/// One entry of the asset list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetItem {
    pub item_id: Id,
    pub type_id: Id,
    pub location_id: Id,
    pub location_flag: String,
    pub location_type: LocationType,
    pub quantity: i32,
    pub is_singleton: bool,
    pub is_blueprint_copy: Option<bool>,
}

/// Coordinates in space, in metres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Position of an item in space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssetLocation {
    pub item_id: Id,
    pub position: Position,
}

#[derive(Debug, Deserialize)]
struct AssetName {
    item_id: Id,
    name: String,
}

fn item_id(item: &AssetItem) -> Id {
    item.item_id
}

impl CharacterScope {
    fn asset_list(&self) -> Streamer<AssetItem, ApiError> {
        let scope = self.clone();
        Streamer::paged(ASSETS_PAGE_SIZE, move |page| {
            let scope = scope.clone();
            async move {
                scope
                    .client
                    .call_page::<AssetItem>(scope.request(GET_ASSETS), page)
                    .await
            }
        })
    }

    fn asset_locations(&self) -> Batcher<AssetLocation, Position, ApiError> {
        self.post_batcher(POST_ASSET_LOCATIONS, MAX_ASSET_IDS, |location: AssetLocation| {
            (location.item_id, location.position)
        })
    }

    fn asset_names(&self) -> Batcher<AssetName, String, ApiError> {
        self.post_batcher(POST_ASSET_NAMES, MAX_ASSET_IDS, |entry: AssetName| {
            (entry.item_id, entry.name)
        })
    }
}

/// Entry point for one character's assets
#[derive(Debug, Clone)]
pub struct AssetFamily {
    scope: CharacterScope,
}

impl AssetFamily {
    pub(crate) fn new(client: EsiClient, character_id: Id, token: AccessToken) -> Self {
        Self {
            scope: CharacterScope::new(client, character_id, token),
        }
    }

    /// The owning character
    #[must_use]
    pub fn character_id(&self) -> Id {
        self.scope.character_id
    }

    /// One item
    pub fn get(&self, item_id: impl Into<Identifier<ApiError>>) -> Asset {
        self.single(item_id.into())
    }

    /// An explicit set of items
    pub fn get_many(&self, item_ids: impl Into<IdSource<ApiError>>) -> Assets {
        self.mapped(item_ids.into())
    }

    /// Every item the character owns
    pub fn get_all(&self) -> AllAssets {
        self.iterated()
    }
}

impl ResourceFamily for AssetFamily {
    type Error = ApiError;
    type Single = Asset;
    type Mapped = Assets;
    type Iterated = AllAssets;

    fn single(&self, id: Identifier<ApiError>) -> Asset {
        Asset {
            scope: self.scope.clone(),
            inner: SingleResource::new(id),
        }
    }

    fn mapped(&self, ids: IdSource<ApiError>) -> Assets {
        Assets {
            scope: self.scope.clone(),
            inner: MappedResource::new(ids),
        }
    }

    fn iterated(&self) -> AllAssets {
        let scope = self.scope.clone();
        let concurrency = scope.client.config().max_concurrency;
        AllAssets {
            scope: self.scope.clone(),
            inner: IteratedResource::new(move || scope.asset_list(), item_id)
                .with_concurrency(concurrency),
        }
    }
}

/// One owned item
#[derive(Debug, Clone)]
pub struct Asset {
    scope: CharacterScope,
    inner: SingleResource<ApiError>,
}

impl Asset {
    /// The item id
    pub async fn id(&self) -> ApiResult<Id> {
        self.inner.id().await
    }

    /// The item's asset list entry
    pub async fn details(&self) -> ApiResult<AssetItem> {
        require_in_collection(&self.inner, &self.scope.asset_list(), item_id, "asset").await
    }

    /// Position in space
    pub async fn location(&self) -> ApiResult<Position> {
        require_batched(&self.inner, &self.scope.asset_locations(), "asset").await
    }

    /// Player-given name
    pub async fn name(&self) -> ApiResult<String> {
        require_batched(&self.inner, &self.scope.asset_names(), "asset").await
    }
}

/// An explicit set of owned items
#[derive(Debug, Clone)]
pub struct Assets {
    scope: CharacterScope,
    inner: MappedResource<ApiError>,
}

impl Assets {
    /// The resolved item ids
    pub async fn ids(&self) -> ApiResult<IdSet> {
        self.inner.ids().await
    }

    /// Asset list entries, keyed by item id
    ///
    /// Walks the asset list until every requested item has been seen.
    pub async fn details(&self) -> ApiResult<HashMap<Id, AssetItem>> {
        self.inner
            .filter_collection(&self.scope.asset_list(), item_id)
            .await
    }

    /// Positions, keyed by item id
    pub async fn location(&self) -> ApiResult<HashMap<Id, Position>> {
        self.inner.fetch_batched(&self.scope.asset_locations()).await
    }

    /// Names, keyed by item id
    pub async fn name(&self) -> ApiResult<HashMap<Id, String>> {
        self.inner.fetch_batched(&self.scope.asset_names()).await
    }
}

/// Every owned item
#[derive(Debug, Clone)]
pub struct AllAssets {
    scope: CharacterScope,
    inner: IteratedResource<AssetItem, ApiError>,
}

impl AllAssets {
    /// Every item id, page by page
    pub fn ids(&self) -> BoxStream<'static, ApiResult<Id>> {
        self.inner.ids()
    }

    /// Every asset list entry
    pub fn details(&self) -> BoxStream<'static, ApiResult<(Id, AssetItem)>> {
        self.inner.records()
    }

    /// Every item position
    pub fn location(&self) -> BoxStream<'static, ApiResult<(Id, Position)>> {
        self.inner.batched(self.scope.asset_locations())
    }

    /// Every item name
    pub fn name(&self) -> BoxStream<'static, ApiResult<(Id, String)>> {
        self.inner.batched(self.scope.asset_names())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{body_ids, FakeAgent};
    use futures::TryStreamExt;
    use serde_json::{json, Value};

    const CHARACTER_ID: Id = 2_112_625_428;
    const TOTAL_ITEMS: i64 = 1_250;

    fn item_json(item_id: Id) -> Value {
        json!({
            "item_id": item_id,
            "type_id": 34,
            "location_id": 60_003_760,
            "location_flag": "Hangar",
            "location_type": "station",
            "quantity": 100,
            "is_singleton": false
        })
    }

    /// Item ids 1..=1250 over two pages
    fn agent() -> FakeAgent {
        FakeAgent::new()
            .on(GET_ASSETS.id, |request| {
                assert_eq!(request.access_token().map(AccessToken::secret), Some("token"));
                assert_eq!(request.path_value("character_id"), Some("2112625428"));
                let page: i64 = request.query_value("page").unwrap().parse().unwrap();
                let start = (page - 1) * 1_000 + 1;
                let end = (start + 1_000).min(TOTAL_ITEMS + 1);
                Value::from((start..end).map(item_json).collect::<Vec<_>>())
            })
            .on(POST_ASSET_LOCATIONS.id, |request| {
                let rows: Vec<Value> = body_ids(request)
                    .into_iter()
                    .map(|id| json!({"item_id": id, "position": {"x": id as f64, "y": 0.0, "z": -1.0}}))
                    .collect();
                Value::from(rows)
            })
            .on(POST_ASSET_NAMES.id, |request| {
                let rows: Vec<Value> = body_ids(request)
                    .into_iter()
                    .map(|id| json!({"item_id": id, "name": format!("Container {id}")}))
                    .collect();
                Value::from(rows)
            })
    }

    fn assets(agent: &FakeAgent) -> AssetFamily {
        agent.client().assets(CHARACTER_ID, AccessToken::new("token"))
    }

    #[tokio::test]
    async fn test_single_details_stops_at_match() {
        let agent = agent();
        let item = assets(&agent).get(42_i64).details().await.unwrap();

        assert_eq!(item.item_id, 42);
        assert_eq!(item.location_type, LocationType::Station);
        assert_eq!(agent.call_count(GET_ASSETS.id), 1);
    }

    #[tokio::test]
    async fn test_single_details_missing_item() {
        let agent = agent();
        let err = assets(&agent).get(99_999_i64).details().await.unwrap_err();

        assert!(matches!(err, ApiError::NotFound { resource: "asset", id: 99_999 }));
        assert_eq!(agent.call_count(GET_ASSETS.id), 2);
    }

    #[tokio::test]
    async fn test_mapped_details_filters_collection() {
        let agent = agent();
        let details = assets(&agent)
            .get_many([3_i64, 1_100, 424_242])
            .details()
            .await
            .unwrap();

        assert_eq!(details.len(), 2);
        assert!(details.contains_key(&3) && details.contains_key(&1_100));
    }

    #[tokio::test]
    async fn test_mapped_location_and_name() {
        let agent = agent();
        let items = assets(&agent).get_many(vec![5_i64, 6]);

        let locations = items.location().await.unwrap();
        assert_eq!(locations[&6].x, 6.0);

        let names = items.name().await.unwrap();
        assert_eq!(names[&5], "Container 5");
        assert_eq!(agent.calls(POST_ASSET_NAMES.id)[0].json_body(), Some(&json!([5, 6])));
    }

    #[tokio::test]
    async fn test_iterated_location_chunks_by_limit() {
        let agent = agent();
        let locations: Vec<(Id, Position)> = assets(&agent)
            .get_all()
            .location()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(locations.len(), 1_250);
        assert_eq!(locations.last().map(|(id, _)| *id), Some(1_250));
        let sizes: Vec<usize> = agent
            .calls(POST_ASSET_LOCATIONS.id)
            .iter()
            .map(|request| body_ids(request).len())
            .collect();
        assert_eq!(sizes, vec![1_000, 250]);
    }

    #[tokio::test]
    async fn test_iterated_details_are_records() {
        let agent = agent();
        let all = assets(&agent).get_all();
        let details: Vec<(Id, AssetItem)> = all.details().try_collect().await.unwrap();

        assert_eq!(details.len(), 1_250);
        assert!(details.iter().all(|(id, item)| *id == item.item_id));
        assert!(all.inner.is_initialized());
    }
}
