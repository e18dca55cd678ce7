//! Name and id lookups shared by every family
//!
//! `POST /universe/names/` resolves up to 1000 ids of any kind per request.
//! `POST /universe/ids/` goes the other way, from exact names to ids.

use super::id_body;
use crate::client::EsiClient;
use crate::error::{ApiError, ApiResult};
use crate::operation::{Operation, Request};
use esi_core::{Batcher, Id, IdSource};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Most ids `POST /universe/names/` accepts at once
pub const MAX_NAME_IDS: usize = 1000;

/// Most names `POST /universe/ids/` accepts at once
pub const MAX_LOOKUP_NAMES: usize = 500;

const POST_UNIVERSE_NAMES: Operation = Operation::post("post_universe_names", "/universe/names/");
const POST_UNIVERSE_IDS: Operation = Operation::post("post_universe_ids", "/universe/ids/");

/// Kind of entity a name belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameCategory {
    Alliance,
    Character,
    Constellation,
    Corporation,
    InventoryType,
    Region,
    SolarSystem,
    Station,
    Faction,
    /// A category this client does not know yet
    #[serde(other)]
    Other,
}

/// One entry of a `/universe/names/` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityName {
    pub id: Id,
    pub name: String,
    pub category: NameCategory,
}

/// An exact-name match from `/universe/ids/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedId {
    pub id: Id,
    pub name: String,
}

/// `/universe/ids/` response; categories without matches are empty
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniverseIds {
    pub agents: Vec<NamedId>,
    pub alliances: Vec<NamedId>,
    pub characters: Vec<NamedId>,
    pub constellations: Vec<NamedId>,
    pub corporations: Vec<NamedId>,
    pub factions: Vec<NamedId>,
    pub inventory_types: Vec<NamedId>,
    pub regions: Vec<NamedId>,
    pub stations: Vec<NamedId>,
    pub systems: Vec<NamedId>,
}

/// Batcher over `POST /universe/names/` yielding `id -> name`
pub(crate) fn name_batcher(client: &EsiClient) -> Batcher<EntityName, String, ApiError> {
    let limit = client.config().max_concurrency;
    let client = client.clone();
    Batcher::new(
        MAX_NAME_IDS,
        move |ids: Vec<Id>| {
            let client = client.clone();
            async move {
                client
                    .call::<Vec<EntityName>>(Request::new(POST_UNIVERSE_NAMES).body(id_body(&ids)))
                    .await
            }
        },
        |entry: EntityName| (entry.id, entry.name),
    )
    .with_in_flight_limit(limit)
}

/// Resolve exact names to ids of every category
pub(crate) async fn lookup_ids(client: &EsiClient, names: &[String]) -> ApiResult<UniverseIds> {
    let mut merged = UniverseIds::default();
    for chunk in names.chunks(MAX_LOOKUP_NAMES) {
        let found: UniverseIds = client
            .call(Request::new(POST_UNIVERSE_IDS).body(Value::from(chunk.to_vec())))
            .await?;
        merged.extend(found);
    }
    Ok(merged)
}

/// An id source that resolves `names` within one category on every use
pub(crate) fn ids_by_name(
    client: &EsiClient,
    names: Vec<String>,
    pick: fn(UniverseIds) -> Vec<NamedId>,
) -> IdSource<ApiError> {
    let client = client.clone();
    IdSource::deferred(move || {
        let client = client.clone();
        let names = names.clone();
        async move {
            let found = lookup_ids(&client, &names).await?;
            Ok::<Vec<Id>, ApiError>(pick(found).into_iter().map(|entry| entry.id).collect())
        }
    })
}

impl UniverseIds {
    fn extend(&mut self, other: Self) {
        self.agents.extend(other.agents);
        self.alliances.extend(other.alliances);
        self.characters.extend(other.characters);
        self.constellations.extend(other.constellations);
        self.corporations.extend(other.corporations);
        self.factions.extend(other.factions);
        self.inventory_types.extend(other.inventory_types);
        self.regions.extend(other.regions);
        self.stations.extend(other.stations);
        self.systems.extend(other.systems);
    }
}
