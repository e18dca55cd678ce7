//! Typed client for EVE Online's ESI
//!
//! Every entity family is reachable in the shape that fits the call site:
//! one entity (`get`), an explicit set (`get_many`) or the whole collection
//! (`get_all`). Operations keep their names across the three shapes and
//! differ only in what they return: a value, a `HashMap` keyed by id, or a
//! stream of `(id, value)` pairs.
//!
//! # Features
//!
//! - **Environment-based configuration**: base URL, datasource, language and
//!   `User-Agent` from `ESI_*` variables
//! - **Pagination**: page-numbered and `last_mail_id` collections as lazy streams
//! - **Batching**: id lists split to the size each route accepts
//! - **Request correlation**: every call carries an `X-Request-ID`
//!
//! Retries, caching and rate limiting are left to the caller's [`Agent`].
//!
//! # Example
//!
//! ```rust,no_run
//! use esi_client::EsiClient;
//! use futures::TryStreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = EsiClient::new()?;
//!
//!     let alliance_id: i64 = 99_000_006;
//!     let details = client.alliances().get(alliance_id).details().await?;
//!     println!("{} [{}]", details.name, details.ticker);
//!
//!     let names = client.types().by_names(["Tritanium", "Pyerite"]).name().await?;
//!     println!("resolved {} types", names.len());
//!
//!     let mut ids = client.alliances().get_all().ids();
//!     while let Some(id) = ids.try_next().await? {
//!         println!("{id}");
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod agent;
pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod operation;

#[cfg(test)]
mod test_support;

pub use agent::{Agent, HttpAgent};
pub use client::EsiClient;
pub use config::{ClientConfig, Datasource};
pub use error::{ApiError, ApiResult};
pub use operation::{AccessToken, HttpMethod, Operation, Request, Response};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::agent::{Agent, HttpAgent};
    pub use crate::client::EsiClient;
    pub use crate::config::{ClientConfig, Datasource};
    pub use crate::endpoints::{
        AllianceFamily, AssetFamily, CharacterFamily, CorporationFamily, MailFamily, TypeFamily,
    };
    pub use crate::error::{ApiError, ApiResult};
    pub use crate::operation::{AccessToken, Operation, Request};
    pub use esi_core::prelude::*;
}
