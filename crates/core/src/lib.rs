//! Core building blocks for EVE Online ESI clients
//!
//! ESI is a large REST surface, but most of its endpoints fall into a handful
//! of shapes. This crate holds the reusable machinery the entity wrappers in
//! `esi-client` are built from:
//!
//! - **Identifiers**: known or deferred ids and de-duplicated id sets
//! - **Streamer**: page-based and max-id based traversals as lazy streams
//! - **Batcher**: chunked fan-out over capped batch endpoints
//! - **Resource adapters**: single / mapped / iterated access to one entity family
//!
//! The crate is transport-agnostic. Every fetch is a closure supplied by the
//! caller, and every error type is the caller's: failures pass through
//! unchanged.
//!
//! # Example
//!
//! ```rust,no_run
//! use esi_core::{Batcher, IdSet, Streamer};
//!
//! # async fn run() -> Result<(), String> {
//! // All alliance ids come back in a single response.
//! let alliances: Streamer<i64, String> = Streamer::once(|| async { Ok(vec![99_000_001, 99_000_002]) });
//! let ids: IdSet = alliances.collect_all().await?.into();
//!
//! // `/universe/names/` resolves up to 1000 ids per request.
//! let names: Batcher<(i64, String), String, String> = Batcher::new(
//!     1000,
//!     |ids: Vec<i64>| async move { Ok(ids.into_iter().map(|id| (id, format!("{id}"))).collect()) },
//!     |pair| pair,
//! );
//! let by_id = names.fetch_map(&ids).await?;
//! assert_eq!(by_id.len(), 2);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod batcher;
pub mod id;
pub mod resource;
pub mod streamer;

pub use batcher::Batcher;
pub use id::{Id, IdSet, IdSource, Identifier, Selection};
pub use resource::{
    IteratedResource, MappedResource, NoCollection, ResourceFamily, SingleResource, Variant,
    VariantKind,
};
pub use streamer::{Page, Streamer};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::batcher::Batcher;
    pub use crate::id::{Id, IdSet, IdSource, Identifier, Selection};
    pub use crate::resource::{
        IteratedResource, MappedResource, NoCollection, ResourceFamily, SingleResource, Variant,
        VariantKind,
    };
    pub use crate::streamer::{Page, Streamer};
}
