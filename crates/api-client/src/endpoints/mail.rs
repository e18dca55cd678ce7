//! Character mail endpoints
//!
//! The mailbox is walked newest first in batches of 50 headers, each batch
//! asking for mail older than the oldest one seen so far.

use super::{require_in_collection, CharacterScope};
use crate::client::EsiClient;
use crate::error::{ApiError, ApiResult};
use crate::operation::{AccessToken, Operation};
use chrono::{DateTime, Utc};
use esi_core::{
    Batcher, Id, IdSet, IdSource, Identifier, IteratedResource, MappedResource, ResourceFamily,
    SingleResource, Streamer,
};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::trace;

/// Headers returned per mailbox request
pub const MAIL_BATCH_SIZE: usize = 50;

const GET_MAIL_HEADERS: Operation = Operation::get(
    "get_characters_character_id_mail",
    "/characters/{character_id}/mail/",
);
const GET_MAIL: Operation = Operation::get(
    "get_characters_character_id_mail_mail_id",
    "/characters/{character_id}/mail/{mail_id}/",
);

/// Kind of mail recipient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientType {
    Alliance,
    Character,
    Corporation,
    MailingList,
}

/// One addressee of a mail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub recipient_id: Id,
    pub recipient_type: RecipientType,
}

/// Mailbox entry without the body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailHeader {
    pub mail_id: Id,
    pub from: Option<Id>,
    pub is_read: Option<bool>,
    #[serde(default)]
    pub labels: Vec<i64>,
    #[serde(default)]
    pub recipients: Vec<Recipient>,
    pub subject: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Full mail including the body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailContent {
    pub body: Option<String>,
    pub from: Option<Id>,
    #[serde(default)]
    pub labels: Vec<i64>,
    pub read: Option<bool>,
    #[serde(default)]
    pub recipients: Vec<Recipient>,
    pub subject: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

fn mail_id(header: &MailHeader) -> Id {
    header.mail_id
}

impl CharacterScope {
    fn mailbox(&self) -> Streamer<MailHeader, ApiError> {
        let scope = self.clone();
        Streamer::max_id(MAIL_BATCH_SIZE, mail_id, move |watermark: Option<Id>| {
            let mut request = scope.request(GET_MAIL_HEADERS);
            // `last_mail_id` only returns mail strictly older than itself
            if let Some(watermark) = watermark {
                request = request.query("last_mail_id", watermark + 1);
            }
            trace!(character_id = scope.character_id, ?watermark, "fetching mail headers");
            let client = scope.client.clone();
            async move { client.call::<Vec<MailHeader>>(request).await }
        })
    }

    async fn mail_content(self, mail_id: Id) -> ApiResult<MailContent> {
        self.client
            .call(self.request(GET_MAIL).path_param("mail_id", mail_id))
            .await
    }
}

/// Entry point for one character's mailbox
#[derive(Debug, Clone)]
pub struct MailFamily {
    scope: CharacterScope,
}

impl MailFamily {
    pub(crate) fn new(client: EsiClient, character_id: Id, token: AccessToken) -> Self {
        Self {
            scope: CharacterScope::new(client, character_id, token),
        }
    }

    /// The mailbox owner
    #[must_use]
    pub fn character_id(&self) -> Id {
        self.scope.character_id
    }

    /// One mail
    pub fn get(&self, mail_id: impl Into<Identifier<ApiError>>) -> Mail {
        self.single(mail_id.into())
    }

    /// An explicit set of mails
    pub fn get_many(&self, mail_ids: impl Into<IdSource<ApiError>>) -> Mails {
        self.mapped(mail_ids.into())
    }

    /// The whole mailbox, newest first
    pub fn get_all(&self) -> AllMail {
        self.iterated()
    }
}

impl ResourceFamily for MailFamily {
    type Error = ApiError;
    type Single = Mail;
    type Mapped = Mails;
    type Iterated = AllMail;

    fn single(&self, id: Identifier<ApiError>) -> Mail {
        Mail {
            scope: self.scope.clone(),
            inner: SingleResource::new(id),
        }
    }

    fn mapped(&self, ids: IdSource<ApiError>) -> Mails {
        Mails {
            scope: self.scope.clone(),
            inner: MappedResource::new(ids),
        }
    }

    fn iterated(&self) -> AllMail {
        let scope = self.scope.clone();
        let concurrency = scope.client.config().max_concurrency;
        AllMail {
            scope: self.scope.clone(),
            inner: IteratedResource::new(move || scope.mailbox(), mail_id)
                .with_concurrency(concurrency),
        }
    }
}

/// One mail
#[derive(Debug, Clone)]
pub struct Mail {
    scope: CharacterScope,
    inner: SingleResource<ApiError>,
}

impl Mail {
    /// The mail id
    pub async fn id(&self) -> ApiResult<Id> {
        self.inner.id().await
    }

    /// The mailbox header, found by walking the mailbox
    pub async fn header(&self) -> ApiResult<MailHeader> {
        require_in_collection(&self.inner, &self.scope.mailbox(), mail_id, "mail").await
    }

    /// Subject, body and metadata
    pub async fn content(&self) -> ApiResult<MailContent> {
        let scope = self.scope.clone();
        self.inner.fetch(|id| scope.mail_content(id)).await
    }
}

/// An explicit set of mails
#[derive(Debug, Clone)]
pub struct Mails {
    scope: CharacterScope,
    inner: MappedResource<ApiError>,
}

impl Mails {
    /// The resolved mail ids
    pub async fn ids(&self) -> ApiResult<IdSet> {
        self.inner.ids().await
    }

    /// Mailbox headers, keyed by mail id
    pub async fn header(&self) -> ApiResult<HashMap<Id, MailHeader>> {
        self.inner
            .filter_collection(&self.scope.mailbox(), mail_id)
            .await
    }

    /// Full mails, keyed by mail id
    pub async fn content(&self) -> ApiResult<HashMap<Id, MailContent>> {
        let limit = self.scope.client.config().max_concurrency;
        let scope = self.scope.clone();
        let batcher = Batcher::per_id(move |id| scope.clone().mail_content(id))
            .with_in_flight_limit(limit);
        self.inner.fetch_batched(&batcher).await
    }
}

/// The whole mailbox
#[derive(Debug, Clone)]
pub struct AllMail {
    scope: CharacterScope,
    inner: IteratedResource<MailHeader, ApiError>,
}

impl AllMail {
    /// Every mail id, newest first
    pub fn ids(&self) -> BoxStream<'static, ApiResult<Id>> {
        self.inner.ids()
    }

    /// Every mailbox header
    pub fn header(&self) -> BoxStream<'static, ApiResult<(Id, MailHeader)>> {
        self.inner.records()
    }

    /// Every full mail, in mailbox order
    pub fn content(&self) -> BoxStream<'static, ApiResult<(Id, MailContent)>> {
        let scope = self.scope.clone();
        self.inner.each(move |id| scope.clone().mail_content(id))
    }
}
