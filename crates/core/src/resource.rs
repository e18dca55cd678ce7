//! The single / mapped / iterated resource adapters
//!
//! Every entity family (alliances, assets, mail, ...) exposes the same named
//! operations in three shapes, chosen by how many entities the caller
//! addresses:
//!
//! | Variant | Addresses | Operation returns |
//! |---------|-----------|-------------------|
//! | Single | one [`Identifier`] | one value |
//! | Mapped | an [`IdSource`] | `HashMap<Id, V>` |
//! | Iterated | the whole collection | a stream of `(Id, V)` |
//!
//! The building blocks here hold the id plumbing; entity wrappers supply the
//! endpoint calls.

use crate::batcher::Batcher;
use crate::id::{Id, IdSet, IdSource, Identifier, Selection};
use crate::streamer::Streamer;
use futures::stream::{self, BoxStream};
use futures::{StreamExt, TryStreamExt};
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Default look-ahead for per-id calls in iterated operations
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Which of the three access modes an adapter is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariantKind {
    /// One entity
    Single,
    /// An explicit set of entities
    Mapped,
    /// The whole collection
    Iterated,
}

/// An adapter in one of the three access modes
#[derive(Debug, Clone)]
pub enum Variant<S, M, I> {
    /// One entity
    Single(S),
    /// An explicit set of entities
    Mapped(M),
    /// The whole collection
    Iterated(I),
}

impl<S, M, I> Variant<S, M, I> {
    /// The access mode of this adapter
    #[must_use]
    pub fn kind(&self) -> VariantKind {
        match self {
            Self::Single(_) => VariantKind::Single,
            Self::Mapped(_) => VariantKind::Mapped,
            Self::Iterated(_) => VariantKind::Iterated,
        }
    }
}

/// Iterated adapter of a family whose backend has no collection endpoint
///
/// Selecting [`Selection::All`] on such a family yields this marker, which
/// offers no operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NoCollection;

/// An entity family reachable in all three access modes
pub trait ResourceFamily {
    /// Error produced by the family's backend calls
    type Error;
    /// Adapter for one entity
    type Single;
    /// Adapter for an explicit set of entities
    type Mapped;
    /// Adapter for the whole collection
    type Iterated;

    /// Address one entity
    fn single(&self, id: Identifier<Self::Error>) -> Self::Single;

    /// Address an explicit set of entities
    fn mapped(&self, ids: IdSource<Self::Error>) -> Self::Mapped;

    /// Address the whole collection
    fn iterated(&self) -> Self::Iterated;

    /// Pick the adapter matching `selection`
    fn select(
        &self,
        selection: Selection<Self::Error>,
    ) -> Variant<Self::Single, Self::Mapped, Self::Iterated> {
        match selection {
            Selection::One(id) => Variant::Single(self.single(id)),
            Selection::Many(ids) => Variant::Mapped(self.mapped(ids)),
            Selection::All => Variant::Iterated(self.iterated()),
        }
    }
}

/// Id plumbing for a single-entity adapter
pub struct SingleResource<E> {
    id: Identifier<E>,
}

impl<E> Clone for SingleResource<E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
        }
    }
}

impl<E> fmt::Debug for SingleResource<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingleResource").field("id", &self.id).finish()
    }
}

impl<E> SingleResource<E>
where
    E: Send + 'static,
{
    /// Wrap an identifier
    pub fn new(id: impl Into<Identifier<E>>) -> Self {
        Self { id: id.into() }
    }

    /// The wrapped identifier
    pub fn identifier(&self) -> &Identifier<E> {
        &self.id
    }

    /// Resolve the id
    pub async fn id(&self) -> Result<Id, E> {
        self.id.resolve().await
    }

    /// Call a single-item endpoint with the resolved id
    pub async fn fetch<V, F, Fut>(&self, fetch: F) -> Result<V, E>
    where
        F: FnOnce(Id) -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let id = self.id().await?;
        fetch(id).await
    }

    /// Derive the value by scanning a full-collection traversal
    ///
    /// Stops at the first matching item; `None` if the collection has none.
    pub async fn find_in<T>(
        &self,
        collection: &Streamer<T, E>,
        id_of: impl Fn(&T) -> Id,
    ) -> Result<Option<T>, E>
    where
        T: Send + 'static,
    {
        let id = self.id().await?;
        let mut items = collection.stream();
        while let Some(item) = items.try_next().await? {
            if id_of(&item) == id {
                return Ok(Some(item));
            }
        }
        Ok(None)
    }

    /// Run a batch of one through `batcher`
    pub async fn fetch_batched<R, V>(&self, batcher: &Batcher<R, V, E>) -> Result<Option<V>, E>
    where
        R: Send + 'static,
        V: Send + 'static,
    {
        let id = self.id().await?;
        let mut values = batcher.fetch_map(&IdSet::from([id])).await?;
        Ok(values.remove(&id))
    }
}

/// Id plumbing for an adapter over an explicit set of entities
pub struct MappedResource<E> {
    ids: IdSource<E>,
}

impl<E> Clone for MappedResource<E> {
    fn clone(&self) -> Self {
        Self {
            ids: self.ids.clone(),
        }
    }
}

impl<E> fmt::Debug for MappedResource<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedResource")
            .field("ids", &self.ids)
            .finish()
    }
}

impl<E> MappedResource<E>
where
    E: Send + 'static,
{
    /// Wrap an id source
    pub fn new(ids: impl Into<IdSource<E>>) -> Self {
        Self { ids: ids.into() }
    }

    /// The wrapped id source
    pub fn source(&self) -> &IdSource<E> {
        &self.ids
    }

    /// Resolve the id set
    pub async fn ids(&self) -> Result<IdSet, E> {
        self.ids.resolve().await
    }

    /// Keep only the requested ids from one full-collection traversal
    ///
    /// Stops early once every requested id has been seen.
    pub async fn filter_collection<T>(
        &self,
        collection: &Streamer<T, E>,
        id_of: impl Fn(&T) -> Id,
    ) -> Result<HashMap<Id, T>, E>
    where
        T: Send + 'static,
    {
        let wanted = self.ids().await?;
        let mut found = HashMap::with_capacity(wanted.len());
        if wanted.is_empty() {
            return Ok(found);
        }

        let mut items = collection.stream();
        while let Some(item) = items.try_next().await? {
            let id = id_of(&item);
            if wanted.contains(id) {
                found.insert(id, item);
                if found.len() == wanted.len() {
                    break;
                }
            }
        }
        Ok(found)
    }

    /// Fan the resolved ids out through `batcher`
    pub async fn fetch_batched<R, V>(
        &self,
        batcher: &Batcher<R, V, E>,
    ) -> Result<HashMap<Id, V>, E>
    where
        R: Send + 'static,
        V: Send + 'static,
    {
        let ids = self.ids().await?;
        batcher.fetch_map(&ids).await
    }
}

/// Collection plumbing for an adapter over a whole backend collection
///
/// The backing [`Streamer`] is built on first use and shared by every clone
/// of the adapter.
pub struct IteratedResource<T, E> {
    collection: Arc<OnceCell<Streamer<T, E>>>,
    build: Arc<dyn Fn() -> Streamer<T, E> + Send + Sync>,
    id_of: fn(&T) -> Id,
    concurrency: usize,
}

impl<T, E> Clone for IteratedResource<T, E> {
    fn clone(&self) -> Self {
        Self {
            collection: Arc::clone(&self.collection),
            build: Arc::clone(&self.build),
            id_of: self.id_of,
            concurrency: self.concurrency,
        }
    }
}

impl<T, E> fmt::Debug for IteratedResource<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IteratedResource")
            .field("initialized", &self.collection.get().is_some())
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

impl<T, E> IteratedResource<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Create an adapter whose collection is built lazily by `build`
    pub fn new<B>(build: B, id_of: fn(&T) -> Id) -> Self
    where
        B: Fn() -> Streamer<T, E> + Send + Sync + 'static,
    {
        Self {
            collection: Arc::new(OnceCell::new()),
            build: Arc::new(build),
            id_of,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Bound how many per-id calls [`IteratedResource::each`] keeps in flight
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Whether the backing streamer has been built yet
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.collection.get().is_some()
    }

    /// The memoized collection streamer
    pub fn collection(&self) -> &Streamer<T, E> {
        self.collection.get_or_init(|| (self.build)())
    }

    /// Ids of every entity in the collection
    pub fn ids(&self) -> BoxStream<'static, Result<Id, E>> {
        let id_of = self.id_of;
        self.collection()
            .stream()
            .map_ok(move |item| id_of(&item))
            .boxed()
    }

    /// Every collection record, keyed by its id
    pub fn records(&self) -> BoxStream<'static, Result<(Id, T), E>> {
        let id_of = self.id_of;
        self.collection()
            .stream()
            .map_ok(move |item| (id_of(&item), item))
            .boxed()
    }

    /// Call a single-item endpoint for every id, in collection order
    pub fn each<V, F, Fut>(&self, fetch: F) -> BoxStream<'static, Result<(Id, V), E>>
    where
        V: Send + 'static,
        F: Fn(Id) -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        self.ids()
            .map_ok(move |id| {
                let request = fetch(id);
                async move { request.await.map(|value| (id, value)) }
            })
            .try_buffered(self.concurrency)
            .boxed()
    }

    /// Fan every id in the collection out through `batcher`
    ///
    /// The id traversal completes before the first chunk is requested.
    pub fn batched<R, V>(&self, batcher: Batcher<R, V, E>) -> BoxStream<'static, Result<(Id, V), E>>
    where
        R: Send + 'static,
        V: Send + 'static,
    {
        let ids = self.ids();
        stream::once(async move { ids.try_collect::<IdSet>().await })
            .map_ok(move |ids| batcher.fetch_stream(&ids))
            .try_flatten()
            .boxed()
    }
}
