//! Character endpoints
//!
//! ESI has no list of all characters, so this family only offers the single
//! and mapped shapes; its iterated shape is [`NoCollection`].

use super::corporations::{Corporation, CorporationFamily, Corporations};
use super::names::{ids_by_name, name_batcher};
use super::{id_body, per_id, require_batched};
use crate::client::EsiClient;
use crate::error::{ApiError, ApiResult};
use crate::operation::{Operation, Request};
use chrono::{DateTime, Utc};
use esi_core::{
    Batcher, Id, IdSet, IdSource, Identifier, MappedResource, NoCollection, ResourceFamily,
    SingleResource,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Most ids `POST /characters/affiliation/` accepts at once
pub const MAX_AFFILIATION_IDS: usize = 1000;

const GET_CHARACTER: Operation =
    Operation::get("get_characters_character_id", "/characters/{character_id}/");
const GET_CORPORATION_HISTORY: Operation = Operation::get(
    "get_characters_character_id_corporationhistory",
    "/characters/{character_id}/corporationhistory/",
);
const POST_AFFILIATION: Operation =
    Operation::post("post_characters_affiliation", "/characters/affiliation/");

/// Character gender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Female,
    Male,
}

/// Public character information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterDetails {
    pub alliance_id: Option<Id>,
    pub birthday: DateTime<Utc>,
    pub bloodline_id: i32,
    pub corporation_id: Id,
    pub description: Option<String>,
    pub faction_id: Option<Id>,
    pub gender: Gender,
    pub name: String,
    pub race_id: i32,
    pub security_status: Option<f64>,
    pub title: Option<String>,
}

/// Current corporation, alliance and faction of a character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Affiliation {
    pub character_id: Id,
    pub corporation_id: Id,
    pub alliance_id: Option<Id>,
    pub faction_id: Option<Id>,
}

/// One stint in a corporation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorporationHistoryEntry {
    pub corporation_id: Id,
    #[serde(default)]
    pub is_deleted: bool,
    pub record_id: i64,
    pub start_date: DateTime<Utc>,
}

async fn details(client: EsiClient, character_id: Id) -> ApiResult<CharacterDetails> {
    client
        .call(Request::new(GET_CHARACTER).path_param("character_id", character_id))
        .await
}

fn affiliation_batcher(client: &EsiClient) -> Batcher<Affiliation, Affiliation, ApiError> {
    let limit = client.config().max_concurrency;
    let client = client.clone();
    Batcher::new(
        MAX_AFFILIATION_IDS,
        move |ids: Vec<Id>| {
            let client = client.clone();
            async move {
                client
                    .call::<Vec<Affiliation>>(Request::new(POST_AFFILIATION).body(id_body(&ids)))
                    .await
            }
        },
        |affiliation: Affiliation| (affiliation.character_id, affiliation),
    )
    .with_in_flight_limit(limit)
}

/// Entry point for character lookups
#[derive(Debug, Clone)]
pub struct CharacterFamily {
    client: EsiClient,
}

impl CharacterFamily {
    pub(crate) fn new(client: EsiClient) -> Self {
        Self { client }
    }

    /// One character
    pub fn get(&self, id: impl Into<Identifier<ApiError>>) -> Character {
        self.single(id.into())
    }

    /// An explicit set of characters
    pub fn get_many(&self, ids: impl Into<IdSource<ApiError>>) -> Characters {
        self.mapped(ids.into())
    }

    /// Characters with exactly these names, looked up on every operation
    pub fn by_names<I, S>(&self, names: I) -> Characters
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names = names.into_iter().map(Into::into).collect();
        self.get_many(ids_by_name(&self.client, names, |found| found.characters))
    }
}

impl ResourceFamily for CharacterFamily {
    type Error = ApiError;
    type Single = Character;
    type Mapped = Characters;
    type Iterated = NoCollection;

    fn single(&self, id: Identifier<ApiError>) -> Character {
        Character {
            client: self.client.clone(),
            inner: SingleResource::new(id),
        }
    }

    fn mapped(&self, ids: IdSource<ApiError>) -> Characters {
        Characters {
            client: self.client.clone(),
            inner: MappedResource::new(ids),
        }
    }

    fn iterated(&self) -> NoCollection {
        NoCollection
    }
}

/// One character
#[derive(Debug, Clone)]
pub struct Character {
    client: EsiClient,
    inner: SingleResource<ApiError>,
}

impl Character {
    /// The character id
    pub async fn id(&self) -> ApiResult<Id> {
        self.inner.id().await
    }

    /// Public information about the character
    pub async fn details(&self) -> ApiResult<CharacterDetails> {
        self.inner.fetch(|id| details(self.client.clone(), id)).await
    }

    /// Current affiliation
    pub async fn affiliation(&self) -> ApiResult<Affiliation> {
        require_batched(&self.inner, &affiliation_batcher(&self.client), "character").await
    }

    /// The character name
    pub async fn name(&self) -> ApiResult<String> {
        require_batched(&self.inner, &name_batcher(&self.client), "character").await
    }

    /// Past and present corporations, newest first
    pub async fn corporation_history(&self) -> ApiResult<Vec<CorporationHistoryEntry>> {
        self.inner
            .fetch(|id| {
                self.client.call(
                    Request::new(GET_CORPORATION_HISTORY).path_param("character_id", id),
                )
            })
            .await
    }

    /// The character's current corporation
    ///
    /// The corporation id is looked up through the affiliation endpoint each
    /// time an operation on the returned handle needs it.
    #[must_use]
    pub fn corporation(&self) -> Corporation {
        let character = self.clone();
        let id = Identifier::deferred(move || {
            let character = character.clone();
            async move { Ok::<_, ApiError>(character.affiliation().await?.corporation_id) }
        });
        CorporationFamily::new(self.client.clone()).get(id)
    }
}

/// An explicit set of characters
#[derive(Debug, Clone)]
pub struct Characters {
    client: EsiClient,
    inner: MappedResource<ApiError>,
}

impl Characters {
    /// The resolved character ids
    pub async fn ids(&self) -> ApiResult<IdSet> {
        self.inner.ids().await
    }

    /// Public information, keyed by character id
    pub async fn details(&self) -> ApiResult<HashMap<Id, CharacterDetails>> {
        self.inner
            .fetch_batched(&per_id(&self.client, details))
            .await
    }

    /// Affiliations, keyed by character id
    pub async fn affiliation(&self) -> ApiResult<HashMap<Id, Affiliation>> {
        self.inner
            .fetch_batched(&affiliation_batcher(&self.client))
            .await
    }

    /// Names, keyed by character id
    pub async fn name(&self) -> ApiResult<HashMap<Id, String>> {
        self.inner.fetch_batched(&name_batcher(&self.client)).await
    }

    /// The distinct corporations these characters belong to
    #[must_use]
    pub fn corporations(&self) -> Corporations {
        let characters = self.clone();
        let ids = IdSource::deferred(move || {
            let characters = characters.clone();
            async move {
                let affiliations = characters.affiliation().await?;
                Ok::<Vec<Id>, ApiError>(
                    affiliations
                        .into_values()
                        .map(|affiliation| affiliation.corporation_id)
                        .collect(),
                )
            }
        });
        CorporationFamily::new(self.client.clone()).get_many(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{body_ids, path_id, FakeAgent};
    use esi_core::{Selection, VariantKind};
    use serde_json::{json, Value};

    fn agent() -> FakeAgent {
        FakeAgent::new()
            .on(GET_CHARACTER.id, |request| {
                let id = path_id(request, "character_id");
                json!({
                    "birthday": "2015-03-24T11:37:00Z",
                    "bloodline_id": 3,
                    "corporation_id": 109_299_958,
                    "gender": "male",
                    "name": format!("Pilot {id}"),
                    "race_id": 2,
                    "security_status": -0.5
                })
            })
            .on(POST_AFFILIATION.id, |request| {
                let rows: Vec<Value> = body_ids(request)
                    .into_iter()
                    .map(|id| json!({"character_id": id, "corporation_id": 1_000 + id % 2}))
                    .collect();
                Value::from(rows)
            })
            .on("get_corporations_corporation_id", |request| {
                let id = path_id(request, "corporation_id");
                json!({
                    "ceo_id": 1,
                    "creator_id": 1,
                    "member_count": 12,
                    "name": format!("Corp {id}"),
                    "tax_rate": 0.1,
                    "ticker": "CRP"
                })
            })
            .on(GET_CORPORATION_HISTORY.id, |_| {
                json!([
                    {"corporation_id": 90_000_001, "record_id": 500, "start_date": "2016-06-26T20:00:00Z"},
                    {"corporation_id": 1_000_168, "is_deleted": true, "record_id": 499, "start_date": "2015-03-24T11:37:00Z"}
                ])
            })
    }

    #[tokio::test]
    async fn test_single_details_and_history() {
        let character = agent().client().characters().get(2_112_625_428_i64);

        let details = character.details().await.unwrap();
        assert_eq!(details.name, "Pilot 2112625428");
        assert_eq!(details.gender, Gender::Male);
        assert_eq!(details.alliance_id, None);

        let history = character.corporation_history().await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(!history[0].is_deleted);
        assert!(history[1].is_deleted);
    }

    #[tokio::test]
    async fn test_corporation_is_deferred() {
        let agent = agent();
        let corporation = agent.client().characters().get(7_i64).corporation();
        assert_eq!(agent.call_count(POST_AFFILIATION.id), 0);

        assert_eq!(corporation.id().await.unwrap(), 1_001);
        let details = corporation.details().await.unwrap();
        assert_eq!(details.name, "Corp 1001");
        assert_eq!(agent.call_count(POST_AFFILIATION.id), 2);
    }

    #[tokio::test]
    async fn test_mapped_affiliation_is_one_batch() {
        let agent = agent();
        let characters = agent.client().characters().get_many(vec![1_i64, 2, 3, 3]);

        let affiliations = characters.affiliation().await.unwrap();
        assert_eq!(affiliations.len(), 3);
        assert_eq!(affiliations[&2].corporation_id, 1_000);
        assert_eq!(agent.calls(POST_AFFILIATION.id)[0].json_body(), Some(&json!([1, 2, 3])));
    }

    #[tokio::test]
    async fn test_corporations_of_characters() {
        let agent = agent();
        let corporations = agent
            .client()
            .characters()
            .get_many(vec![1_i64, 2, 3, 4])
            .corporations();

        let ids = corporations.ids().await.unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(1_000) && ids.contains(1_001));
    }

    #[tokio::test]
    async fn test_by_names() {
        let agent = agent().on("post_universe_ids", |request| {
            assert_eq!(request.json_body(), Some(&json!(["CCP Bartender"])));
            json!({"characters": [{"id": 95_465_499, "name": "CCP Bartender"}]})
        });

        let details = agent
            .client()
            .characters()
            .by_names(["CCP Bartender"])
            .details()
            .await
            .unwrap();
        assert_eq!(details.keys().copied().collect::<Vec<_>>(), vec![95_465_499]);
    }

    #[test]
    fn test_select_variants() {
        let family = agent().client().characters();

        assert_eq!(family.select(Selection::from(7_i64)).kind(), VariantKind::Single);
        assert_eq!(family.select(Selection::from(vec![1_i64, 2])).kind(), VariantKind::Mapped);
        assert_eq!(family.select(Selection::All).kind(), VariantKind::Iterated);
    }
}
