//! ESI entity families
//!
//! Each family is reachable one entity at a time (`get`), for an explicit
//! set of ids (`get_many`) or, where ESI lists the collection, as a whole
//! (`get_all`). Operations keep their names across the three shapes.
//!
//! | Module | ESI routes | Collection |
//! |--------|------------|------------|
//! | `alliances` | `/alliances/`, `/alliances/{id}/`, `/alliances/{id}/corporations/` | single response |
//! | `characters` | `/characters/{id}/`, `/characters/affiliation/`, `/characters/{id}/corporationhistory/` | none |
//! | `corporations` | `/corporations/{id}/` | none |
//! | `types` | `/universe/types/`, `/universe/types/{id}/` | paged |
//! | `assets` | `/characters/{id}/assets/`, `.../assets/locations/`, `.../assets/names/` | paged, authenticated |
//! | `mail` | `/characters/{id}/mail/`, `/characters/{id}/mail/{mail_id}/` | `last_mail_id` watermark, authenticated |
//! | `names` | `/universe/names/`, `/universe/ids/` | shared lookups |

pub mod alliances;
pub mod assets;
pub mod characters;
pub mod corporations;
pub mod mail;
pub mod names;
pub mod types;

pub use alliances::{AllAlliances, Alliance, AllianceDetails, AllianceFamily, Alliances};
pub use assets::{
    AllAssets, Asset, AssetFamily, AssetItem, AssetLocation, Assets, LocationType, Position,
};
pub use characters::{
    Affiliation, Character, CharacterDetails, CharacterFamily, Characters, CorporationHistoryEntry,
    Gender,
};
pub use corporations::{Corporation, CorporationDetails, CorporationFamily, Corporations};
pub use mail::{AllMail, Mail, MailContent, MailFamily, MailHeader, Mails, Recipient, RecipientType};
pub use names::{EntityName, NameCategory, NamedId, UniverseIds};
pub use types::{AllItemTypes, ItemType, ItemTypeDetails, ItemTypes, TypeFamily};

use crate::client::EsiClient;
use crate::error::{ApiError, ApiResult};
use crate::operation::{AccessToken, Operation, Request};
use esi_core::{Batcher, Id, SingleResource, Streamer};
use serde::de::DeserializeOwned;
use std::future::Future;

/// One backend call per id, bounded by the client's concurrency setting
pub(crate) fn per_id<V, F, Fut>(client: &EsiClient, fetch: F) -> Batcher<(Id, V), V, ApiError>
where
    V: Send + 'static,
    F: Fn(EsiClient, Id) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ApiResult<V>> + Send + 'static,
{
    let limit = client.config().max_concurrency;
    let client = client.clone();
    Batcher::per_id(move |id| fetch(client.clone(), id)).with_in_flight_limit(limit)
}

/// Run one id through `batcher`; a missing entry is a [`ApiError::NotFound`]
pub(crate) async fn require_batched<R, V>(
    single: &SingleResource<ApiError>,
    batcher: &Batcher<R, V, ApiError>,
    resource: &'static str,
) -> ApiResult<V>
where
    R: Send + 'static,
    V: Send + 'static,
{
    single
        .fetch(|id| async move {
            SingleResource::new(id)
                .fetch_batched(batcher)
                .await?
                .ok_or_else(|| ApiError::not_found(resource, id))
        })
        .await
}

/// Find one id in a full-collection traversal; absence is a [`ApiError::NotFound`]
pub(crate) async fn require_in_collection<T>(
    single: &SingleResource<ApiError>,
    collection: &Streamer<T, ApiError>,
    id_of: fn(&T) -> Id,
    resource: &'static str,
) -> ApiResult<T>
where
    T: Send + 'static,
{
    single
        .fetch(|id| async move {
            SingleResource::new(id)
                .find_in(collection, id_of)
                .await?
                .ok_or_else(|| ApiError::not_found(resource, id))
        })
        .await
}

/// Ids as a JSON array body
pub(crate) fn id_body(ids: &[Id]) -> serde_json::Value {
    serde_json::Value::from(ids.to_vec())
}

/// A character plus the token that unlocks its private endpoints
#[derive(Debug, Clone)]
pub(crate) struct CharacterScope {
    pub(crate) client: EsiClient,
    pub(crate) character_id: Id,
    token: AccessToken,
}

impl CharacterScope {
    pub(crate) fn new(client: EsiClient, character_id: Id, token: AccessToken) -> Self {
        Self {
            client,
            character_id,
            token,
        }
    }

    /// Authenticated request with `{character_id}` filled in
    pub(crate) fn request(&self, operation: Operation) -> Request {
        Request::new(operation)
            .path_param("character_id", self.character_id)
            .token(Some(self.token.clone()))
    }

    /// Batcher over an authenticated endpoint that takes an id list as body
    pub(crate) fn post_batcher<R, V>(
        &self,
        operation: Operation,
        max_size: usize,
        extract: fn(R) -> (Id, V),
    ) -> Batcher<R, V, ApiError>
    where
        R: DeserializeOwned + Send + 'static,
        V: Send + 'static,
    {
        let limit = self.client.config().max_concurrency;
        let scope = self.clone();
        Batcher::new(
            max_size,
            move |ids: Vec<Id>| {
                let scope = scope.clone();
                async move {
                    scope
                        .client
                        .call::<Vec<R>>(scope.request(operation).body(id_body(&ids)))
                        .await
                }
            },
            extract,
        )
        .with_in_flight_limit(limit)
    }
}
