//! Lazy traversal of paginated backend collections
//!
//! ESI exposes large collections in one of two ways:
//!
//! - **Page-based**: `?page=N`, 1-based, with the page count in `X-Pages`
//! - **Max-id based**: `?from_id=` / `?last_mail_id=`, returning items strictly
//!   older than the watermark
//!
//! A [`Streamer`] describes how to walk either style. It holds no cursor
//! itself: every call to [`Streamer::stream`] starts a fresh traversal from the
//! first page.
//!
//! # Example
//!
//! ```rust,no_run
//! use esi_core::streamer::{Page, Streamer};
//!
//! # async fn run() -> Result<(), String> {
//! // One id per page, three pages in total
//! let streamer: Streamer<i64, String> = Streamer::paged(1, |page| async move {
//!     Ok(Page::new(vec![i64::from(page)]).with_total_pages(3))
//! });
//!
//! let everything = streamer.collect_all().await?;
//! assert_eq!(everything, vec![1, 2, 3]);
//! # Ok(())
//! # }
//! ```

use crate::id::Id;
use futures::future::BoxFuture;
use futures::stream::{self, BoxStream};
use futures::{FutureExt, StreamExt, TryStreamExt};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::trace;

type PageFn<T, E> = Arc<dyn Fn(u32) -> BoxFuture<'static, Result<Page<T>, E>> + Send + Sync>;
type WatermarkFn<T, E> =
    Arc<dyn Fn(Option<Id>) -> BoxFuture<'static, Result<Vec<T>, E>> + Send + Sync>;
type IdOf<T> = Arc<dyn Fn(&T) -> Id + Send + Sync>;

/// One page returned by the backend
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// Total number of pages, when the backend reports it
    pub total_pages: Option<u32>,
}

impl<T> Page<T> {
    /// Create a page without a reported total
    #[must_use]
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            total_pages: None,
        }
    }

    /// Attach the backend-reported page count
    #[must_use]
    pub fn with_total_pages(mut self, total_pages: u32) -> Self {
        self.total_pages = Some(total_pages);
        self
    }
}

enum Strategy<T, E> {
    Paged {
        fetch: PageFn<T, E>,
        page_size: usize,
        max_pages: Option<u32>,
    },
    MaxId {
        fetch: WatermarkFn<T, E>,
        batch_size: usize,
        id_of: IdOf<T>,
    },
}

impl<T, E> Clone for Strategy<T, E> {
    fn clone(&self) -> Self {
        match self {
            Self::Paged {
                fetch,
                page_size,
                max_pages,
            } => Self::Paged {
                fetch: Arc::clone(fetch),
                page_size: *page_size,
                max_pages: *max_pages,
            },
            Self::MaxId {
                fetch,
                batch_size,
                id_of,
            } => Self::MaxId {
                fetch: Arc::clone(fetch),
                batch_size: *batch_size,
                id_of: Arc::clone(id_of),
            },
        }
    }
}

/// Restartable description of a paginated traversal
pub struct Streamer<T, E> {
    strategy: Strategy<T, E>,
}

impl<T, E> Clone for Streamer<T, E> {
    fn clone(&self) -> Self {
        Self {
            strategy: self.strategy.clone(),
        }
    }
}

impl<T, E> fmt::Debug for Streamer<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.strategy {
            Strategy::Paged {
                page_size,
                max_pages,
                ..
            } => f
                .debug_struct("Streamer::Paged")
                .field("page_size", page_size)
                .field("max_pages", max_pages)
                .finish_non_exhaustive(),
            Strategy::MaxId { batch_size, .. } => f
                .debug_struct("Streamer::MaxId")
                .field("batch_size", batch_size)
                .finish_non_exhaustive(),
        }
    }
}

impl<T, E> Streamer<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Walk a page-numbered collection
    ///
    /// `fetch` receives the 1-based page number. The traversal stops after a
    /// page holding fewer than `page_size` items, an empty page, or the last
    /// page reported through [`Page::total_pages`].
    pub fn paged<F, Fut>(page_size: usize, fetch: F) -> Self
    where
        F: Fn(u32) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Page<T>, E>> + Send + 'static,
    {
        Self {
            strategy: Strategy::Paged {
                fetch: Arc::new(move |page| fetch(page).boxed()),
                page_size,
                max_pages: None,
            },
        }
    }

    /// Wrap a collection the backend returns in a single response
    pub fn once<F, Fut>(fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<T>, E>> + Send + 'static,
    {
        Self::paged(usize::MAX, move |_| {
            let items = fetch();
            async move { items.await.map(Page::new) }
        })
        .with_max_pages(1)
    }

    /// Walk a collection addressed by a descending max-id watermark
    ///
    /// `fetch` receives `None` first, then the smallest id seen so far minus
    /// one. The traversal stops after a batch smaller than `batch_size`, or
    /// once the watermark would stop moving downward.
    pub fn max_id<F, Fut, I>(batch_size: usize, id_of: I, fetch: F) -> Self
    where
        F: Fn(Option<Id>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<T>, E>> + Send + 'static,
        I: Fn(&T) -> Id + Send + Sync + 'static,
    {
        Self {
            strategy: Strategy::MaxId {
                fetch: Arc::new(move |watermark| fetch(watermark).boxed()),
                batch_size,
                id_of: Arc::new(id_of),
            },
        }
    }

    /// Stop a page-based traversal after `max_pages` pages
    ///
    /// Has no effect on max-id streamers.
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        if let Strategy::Paged { max_pages: limit, .. } = &mut self.strategy {
            *limit = Some(max_pages);
        }
        self
    }

    /// Start a fresh traversal
    ///
    /// A fetch error is yielded once and ends the stream.
    pub fn stream(&self) -> BoxStream<'static, Result<T, E>> {
        let batches = match self.strategy.clone() {
            Strategy::Paged {
                fetch,
                page_size,
                max_pages,
            } => paged_batches(fetch, page_size, max_pages),
            Strategy::MaxId {
                fetch,
                batch_size,
                id_of,
            } => watermark_batches(fetch, batch_size, id_of),
        };

        batches
            .map_ok(|items| stream::iter(items.into_iter().map(Ok)))
            .try_flatten()
            .boxed()
    }

    /// Drain a fresh traversal into one ordered list
    pub async fn collect_all(&self) -> Result<Vec<T>, E> {
        self.stream().try_collect().await
    }
}

fn paged_batches<T, E>(
    fetch: PageFn<T, E>,
    page_size: usize,
    max_pages: Option<u32>,
) -> BoxStream<'static, Result<Vec<T>, E>>
where
    T: Send + 'static,
    E: Send + 'static,
{
    stream::try_unfold(Some(1u32), move |cursor| {
        let fetch = Arc::clone(&fetch);
        async move {
            let Some(page) = cursor else {
                return Ok(None);
            };

            let Page { items, total_pages } = fetch(page).await?;
            trace!(page, items = items.len(), ?total_pages, "fetched page");

            let last = items.is_empty()
                || items.len() < page_size
                || total_pages.is_some_and(|total| page >= total)
                || max_pages.is_some_and(|limit| page >= limit);

            let next = if last { None } else { page.checked_add(1) };
            Ok::<_, E>(Some((items, next)))
        }
    })
    .boxed()
}

fn watermark_batches<T, E>(
    fetch: WatermarkFn<T, E>,
    batch_size: usize,
    id_of: IdOf<T>,
) -> BoxStream<'static, Result<Vec<T>, E>>
where
    T: Send + 'static,
    E: Send + 'static,
{
    // Outer option: traversal finished. Inner option: the watermark itself.
    stream::try_unfold(Some(None::<Id>), move |cursor| {
        let fetch = Arc::clone(&fetch);
        let id_of = Arc::clone(&id_of);
        async move {
            let Some(watermark) = cursor else {
                return Ok(None);
            };

            let items = fetch(watermark).await?;
            let lowest = items.iter().map(|item| id_of(item)).min();
            trace!(?watermark, items = items.len(), ?lowest, "fetched batch");

            let next = match lowest {
                Some(lowest) if items.len() >= batch_size => {
                    let candidate = lowest.saturating_sub(1);
                    let moved = watermark.map_or(true, |current| candidate < current);
                    moved.then_some(Some(candidate))
                }
                _ => None,
            };
            Ok::<_, E>(Some((items, next)))
        }
    })
    .boxed()
}
