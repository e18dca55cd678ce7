//! Entity identifiers and the collections that carry them
//!
//! ESI addresses everything by integer id. A caller can know an id up front,
//! or only learn it from another request (the corporation of a character,
//! the ids matching a name lookup). Both cases are modeled here:
//!
//! - [`Identifier`]: one id, known or deferred
//! - [`IdSet`]: an ordered, duplicate-free set of ids
//! - [`IdSource`]: a fixed [`IdSet`] or a deferred supplier of ids
//! - [`Selection`]: which of one / many / all entities an adapter addresses

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Numeric id of an ESI entity (character, alliance, item, mail, ...)
pub type Id = i64;

type Supplier<T, E> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, E>> + Send + Sync>;

/// Ordered set of unique ids
///
/// Keeps the first occurrence of every id in insertion order, so chunking
/// an `IdSet` is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Id>", into = "Vec<Id>")]
pub struct IdSet {
    ids: Vec<Id>,
    seen: HashSet<Id>,
}

impl IdSet {
    /// Create an empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an id, returning `false` if it was already present
    pub fn insert(&mut self, id: Id) -> bool {
        if self.seen.insert(id) {
            self.ids.push(id);
            true
        } else {
            false
        }
    }

    /// Number of distinct ids
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the set holds no ids
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Whether `id` is in the set
    #[must_use]
    pub fn contains(&self, id: Id) -> bool {
        self.seen.contains(&id)
    }

    /// Ids in insertion order
    pub fn iter(&self) -> impl Iterator<Item = Id> + '_ {
        self.ids.iter().copied()
    }

    /// Ids as a slice, in insertion order
    #[must_use]
    pub fn as_slice(&self) -> &[Id] {
        &self.ids
    }

    /// Contiguous chunks of at most `size` ids (a size of zero is treated as one)
    pub fn chunks(&self, size: usize) -> std::slice::Chunks<'_, Id> {
        self.ids.chunks(size.max(1))
    }

    /// Consume the set, returning the ids in insertion order
    #[must_use]
    pub fn into_vec(self) -> Vec<Id> {
        self.ids
    }
}

impl Extend<Id> for IdSet {
    fn extend<I: IntoIterator<Item = Id>>(&mut self, iter: I) {
        for id in iter {
            self.insert(id);
        }
    }
}

impl FromIterator<Id> for IdSet {
    fn from_iter<I: IntoIterator<Item = Id>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl From<Vec<Id>> for IdSet {
    fn from(ids: Vec<Id>) -> Self {
        ids.into_iter().collect()
    }
}

impl From<&[Id]> for IdSet {
    fn from(ids: &[Id]) -> Self {
        ids.iter().copied().collect()
    }
}

impl<const N: usize> From<[Id; N]> for IdSet {
    fn from(ids: [Id; N]) -> Self {
        ids.into_iter().collect()
    }
}

impl From<HashSet<Id>> for IdSet {
    fn from(ids: HashSet<Id>) -> Self {
        ids.into_iter().collect()
    }
}

impl From<BTreeSet<Id>> for IdSet {
    fn from(ids: BTreeSet<Id>) -> Self {
        ids.into_iter().collect()
    }
}

impl From<IdSet> for Vec<Id> {
    fn from(set: IdSet) -> Self {
        set.ids
    }
}

impl IntoIterator for IdSet {
    type Item = Id;
    type IntoIter = std::vec::IntoIter<Id>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.into_iter()
    }
}

impl<'a> IntoIterator for &'a IdSet {
    type Item = Id;
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, Id>>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.iter().copied()
    }
}

/// A single entity id, either known now or produced by another request
pub enum Identifier<E> {
    /// Id known at construction time
    Known(Id),
    /// Id resolved by an async supplier each time it is needed
    Deferred(Supplier<Id, E>),
}

impl<E> Identifier<E> {
    /// Wrap an async supplier of the id
    pub fn deferred<F, Fut>(supplier: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Id, E>> + Send + 'static,
    {
        Self::Deferred(Arc::new(move || supplier().boxed()))
    }

    /// The id, if it is already known
    #[must_use]
    pub fn known(&self) -> Option<Id> {
        match self {
            Self::Known(id) => Some(*id),
            Self::Deferred(_) => None,
        }
    }

    /// Resolve the id, running the supplier if it is deferred
    pub async fn resolve(&self) -> Result<Id, E> {
        match self {
            Self::Known(id) => Ok(*id),
            Self::Deferred(supplier) => supplier().await,
        }
    }
}

impl<E> Clone for Identifier<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Known(id) => Self::Known(*id),
            Self::Deferred(supplier) => Self::Deferred(Arc::clone(supplier)),
        }
    }
}

impl<E> fmt::Debug for Identifier<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(id) => f.debug_tuple("Known").field(id).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

impl<E> From<Id> for Identifier<E> {
    fn from(id: Id) -> Self {
        Self::Known(id)
    }
}

/// Where a set of ids comes from
pub enum IdSource<E> {
    /// A set given directly by the caller
    Fixed(IdSet),
    /// Ids produced by an async supplier (a search, a name lookup, ...)
    Deferred(Supplier<Vec<Id>, E>),
}

impl<E> IdSource<E> {
    /// Wrap an async supplier of ids
    pub fn deferred<F, Fut>(supplier: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<Id>, E>> + Send + 'static,
    {
        Self::Deferred(Arc::new(move || supplier().boxed()))
    }

    /// Resolve to a concrete, de-duplicated set
    ///
    /// Deferred sources run their supplier on every call.
    pub async fn resolve(&self) -> Result<IdSet, E> {
        match self {
            Self::Fixed(ids) => Ok(ids.clone()),
            Self::Deferred(supplier) => Ok(supplier().await?.into()),
        }
    }
}

impl<E> Clone for IdSource<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Fixed(ids) => Self::Fixed(ids.clone()),
            Self::Deferred(supplier) => Self::Deferred(Arc::clone(supplier)),
        }
    }
}

impl<E> fmt::Debug for IdSource<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(ids) => f.debug_tuple("Fixed").field(&ids.as_slice()).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

impl<E> From<IdSet> for IdSource<E> {
    fn from(ids: IdSet) -> Self {
        Self::Fixed(ids)
    }
}

impl<E> From<Vec<Id>> for IdSource<E> {
    fn from(ids: Vec<Id>) -> Self {
        Self::Fixed(ids.into())
    }
}

impl<E> From<&[Id]> for IdSource<E> {
    fn from(ids: &[Id]) -> Self {
        Self::Fixed(ids.into())
    }
}

impl<E, const N: usize> From<[Id; N]> for IdSource<E> {
    fn from(ids: [Id; N]) -> Self {
        Self::Fixed(ids.into())
    }
}

impl<E> From<HashSet<Id>> for IdSource<E> {
    fn from(ids: HashSet<Id>) -> Self {
        Self::Fixed(ids.into())
    }
}

impl<E> From<BTreeSet<Id>> for IdSource<E> {
    fn from(ids: BTreeSet<Id>) -> Self {
        Self::Fixed(ids.into())
    }
}

/// Which entities of a family an adapter addresses
pub enum Selection<E> {
    /// Exactly one entity
    One(Identifier<E>),
    /// An explicit subset
    Many(IdSource<E>),
    /// The whole backend collection
    All,
}

impl<E> fmt::Debug for Selection<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::One(id) => f.debug_tuple("One").field(id).finish(),
            Self::Many(ids) => f.debug_tuple("Many").field(ids).finish(),
            Self::All => f.write_str("All"),
        }
    }
}

impl<E> From<Id> for Selection<E> {
    fn from(id: Id) -> Self {
        Self::One(Identifier::Known(id))
    }
}

impl<E> From<Identifier<E>> for Selection<E> {
    fn from(id: Identifier<E>) -> Self {
        Self::One(id)
    }
}

impl<E> From<IdSource<E>> for Selection<E> {
    fn from(ids: IdSource<E>) -> Self {
        Self::Many(ids)
    }
}

impl<E> From<IdSet> for Selection<E> {
    fn from(ids: IdSet) -> Self {
        Self::Many(ids.into())
    }
}

impl<E> From<Vec<Id>> for Selection<E> {
    fn from(ids: Vec<Id>) -> Self {
        Self::Many(ids.into())
    }
}

impl<E> From<&[Id]> for Selection<E> {
    fn from(ids: &[Id]) -> Self {
        Self::Many(ids.into())
    }
}

impl<E, const N: usize> From<[Id; N]> for Selection<E> {
    fn from(ids: [Id; N]) -> Self {
        Self::Many(ids.into())
    }
}

impl<E> From<HashSet<Id>> for Selection<E> {
    fn from(ids: HashSet<Id>) -> Self {
        Self::Many(ids.into())
    }
}

impl<E> From<BTreeSet<Id>> for Selection<E> {
    fn from(ids: BTreeSet<Id>) -> Self {
        Self::Many(ids.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_id_set_dedup_keeps_first_occurrence() {
        let input: Vec<Id> = vec![3, 1, 3, 2, 1];
        let set = IdSet::from(input.as_slice());

        assert_eq!(set.as_slice(), &[3, 1, 2]);
        assert_eq!(input, vec![3, 1, 3, 2, 1]);
    }

    #[test]
    fn test_id_set_chunks() {
        let set: IdSet = (1..=7).collect();
        let chunks: Vec<&[Id]> = set.chunks(3).collect();

        assert_eq!(chunks, vec![&[1, 2, 3][..], &[4, 5, 6][..], &[7][..]]);
        assert_eq!(set.chunks(0).count(), 7);
    }

    #[test]
    fn test_id_set_serde() {
        let set = IdSet::from([5, 5, 9]);
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, "[5,9]");

        let back: IdSet = serde_json::from_str("[1,2,2]").unwrap();
        assert_eq!(back, IdSet::from([1, 2]));
    }

    #[tokio::test]
    async fn test_deferred_identifier() {
        let id: Identifier<String> = Identifier::deferred(|| async { Ok(98_000_001) });

        assert_eq!(id.known(), None);
        assert_eq!(id.resolve().await, Ok(98_000_001));
    }

    #[tokio::test]
    async fn test_deferred_source_dedups_and_propagates_errors() {
        let ok: IdSource<String> = IdSource::deferred(|| async { Ok(vec![4, 4, 2]) });
        assert_eq!(ok.resolve().await.unwrap().as_slice(), &[4, 2]);

        let failing: IdSource<String> =
            IdSource::deferred(|| async { Err("search failed".to_string()) });
        assert_eq!(failing.resolve().await, Err("search failed".to_string()));
    }

    #[test]
    fn test_selection_from_inputs() {
        assert!(matches!(
            Selection::<()>::from(7_i64),
            Selection::One(Identifier::Known(7))
        ));
        assert!(matches!(
            Selection::<()>::from(vec![1_i64, 2]),
            Selection::Many(IdSource::Fixed(_))
        ));
        let hashed: HashSet<Id> = [1, 2].into_iter().collect();
        assert!(matches!(Selection::<()>::from(hashed), Selection::Many(_)));
    }

    proptest! {
        #[test]
        fn prop_id_set_has_each_distinct_id_once(input in proptest::collection::vec(0i64..50, 0..200)) {
            let original = input.clone();
            let set = IdSet::from(input.as_slice());

            let distinct: HashSet<Id> = input.iter().copied().collect();
            prop_assert_eq!(set.len(), distinct.len());
            for id in &distinct {
                prop_assert_eq!(set.iter().filter(|x| x == id).count(), 1);
            }
            prop_assert_eq!(input, original);
        }

        #[test]
        fn prop_deferred_source_dedups(input in proptest::collection::vec(0i64..20, 0..60)) {
            let ids = input.clone();
            let source: IdSource<()> = IdSource::deferred(move || {
                let ids = ids.clone();
                async move { Ok(ids) }
            });
            let resolved = tokio_test::block_on(source.resolve()).unwrap();

            let distinct: HashSet<Id> = input.iter().copied().collect();
            prop_assert_eq!(resolved.len(), distinct.len());
        }
    }
}
