//! Fan-out of large id lists over capped-size backend requests
//!
//! Several ESI endpoints accept a list of ids in one call but cap its length
//! (`/universe/names/` and `/characters/affiliation/` take 1000). A
//! [`Batcher`] splits an [`IdSet`] into chunks of at most that size, issues one
//! request per chunk, and reassembles the `(id, value)` pairs.

use crate::id::{Id, IdSet};
use futures::future::BoxFuture;
use futures::stream::{self, BoxStream};
use futures::{FutureExt, StreamExt, TryStreamExt};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

type ChunkFn<R, E> = Arc<dyn Fn(Vec<Id>) -> BoxFuture<'static, Result<Vec<R>, E>> + Send + Sync>;
type ExtractFn<R, V> = Arc<dyn Fn(R) -> (Id, V) + Send + Sync>;

/// Chunked fan-out over a batch endpoint
pub struct Batcher<R, V, E> {
    fetch: ChunkFn<R, E>,
    extract: ExtractFn<R, V>,
    max_size: usize,
    in_flight: Option<usize>,
}

impl<R, V, E> Clone for Batcher<R, V, E> {
    fn clone(&self) -> Self {
        Self {
            fetch: Arc::clone(&self.fetch),
            extract: Arc::clone(&self.extract),
            max_size: self.max_size,
            in_flight: self.in_flight,
        }
    }
}

impl<R, V, E> fmt::Debug for Batcher<R, V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Batcher")
            .field("max_size", &self.max_size)
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}

impl<R, V, E> Batcher<R, V, E>
where
    R: Send + 'static,
    V: Send + 'static,
    E: Send + 'static,
{
    /// Create a batcher
    ///
    /// `fetch` is called once per chunk of at most `max_size` ids (a size of
    /// zero is treated as one); `extract` turns each returned record into an
    /// `(id, value)` pair.
    pub fn new<F, Fut, X>(max_size: usize, fetch: F, extract: X) -> Self
    where
        F: Fn(Vec<Id>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<R>, E>> + Send + 'static,
        X: Fn(R) -> (Id, V) + Send + Sync + 'static,
    {
        Self {
            fetch: Arc::new(move |ids| fetch(ids).boxed()),
            extract: Arc::new(extract),
            max_size: max_size.max(1),
            in_flight: None,
        }
    }

    /// Bound how many chunk requests run at once (unbounded by default)
    #[must_use]
    pub fn with_in_flight_limit(mut self, limit: usize) -> Self {
        self.in_flight = Some(limit.max(1));
        self
    }

    /// Maximum number of ids sent in one request
    #[must_use]
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Split `ids` into the chunks this batcher would request
    #[must_use]
    pub fn chunks(&self, ids: &IdSet) -> Vec<Vec<Id>> {
        ids.chunks(self.max_size).map(<[Id]>::to_vec).collect()
    }

    fn limit_for(&self, chunks: usize) -> usize {
        self.in_flight.unwrap_or(chunks).max(1)
    }

    /// Fetch every chunk and merge the results into one map
    ///
    /// Fails with the first chunk error; results of the other chunks are
    /// dropped. Records are merged in chunk order, so a key produced twice
    /// keeps the value from the later chunk.
    pub async fn fetch_map(&self, ids: &IdSet) -> Result<HashMap<Id, V>, E> {
        let chunks = self.chunks(ids);
        let limit = self.limit_for(chunks.len());
        debug!(
            ids = ids.len(),
            chunks = chunks.len(),
            max_size = self.max_size,
            "dispatching batched fetch"
        );

        let fetch = Arc::clone(&self.fetch);
        let mut completed: Vec<(usize, Vec<R>)> = stream::iter(chunks.into_iter().enumerate())
            .map(move |(index, chunk)| {
                let request = fetch(chunk);
                async move { request.await.map(|records| (index, records)) }
            })
            .buffer_unordered(limit)
            .try_collect()
            .await?;
        completed.sort_unstable_by_key(|(index, _)| *index);

        let mut merged = HashMap::new();
        for record in completed.into_iter().flat_map(|(_, records)| records) {
            let (id, value) = (self.extract)(record);
            merged.insert(id, value);
        }
        Ok(merged)
    }

    /// Lazily fetch chunks, yielding `(id, value)` pairs in chunk order
    ///
    /// Later chunks may be requested ahead of consumption, but their records
    /// are only yielded once every earlier chunk has been. A failed chunk
    /// yields its error at its own position and ends the stream.
    pub fn fetch_stream(&self, ids: &IdSet) -> BoxStream<'static, Result<(Id, V), E>> {
        let chunks = self.chunks(ids);
        let limit = self.limit_for(chunks.len());
        debug!(
            ids = ids.len(),
            chunks = chunks.len(),
            max_size = self.max_size,
            "streaming batched fetch"
        );

        let fetch = Arc::clone(&self.fetch);
        let extract = Arc::clone(&self.extract);
        stream::iter(chunks)
            .map(move |chunk| fetch(chunk))
            .buffered(limit)
            .map_ok(move |records| {
                let extract = Arc::clone(&extract);
                stream::iter(records.into_iter().map(move |record| Ok(extract(record))))
            })
            .try_flatten()
            .take_while(continue_after_error())
            .boxed()
    }
}

impl<V, E> Batcher<(Id, V), V, E>
where
    V: Send + 'static,
    E: Send + 'static,
{
    /// Fan out one backend call per id
    ///
    /// For endpoints with no batch form. Calls run concurrently, bounded by
    /// [`Batcher::with_in_flight_limit`].
    pub fn per_id<F, Fut>(fetch_one: F) -> Self
    where
        F: Fn(Id) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        Self::new(
            1,
            move |chunk: Vec<Id>| {
                let requests: Vec<(Id, Fut)> =
                    chunk.into_iter().map(|id| (id, fetch_one(id))).collect();
                async move {
                    let mut records = Vec::with_capacity(requests.len());
                    for (id, request) in requests {
                        records.push((id, request.await?));
                    }
                    Ok::<_, E>(records)
                }
            },
            |pair| pair,
        )
    }
}

/// Stop after the first error so nothing is yielded past a failed chunk
fn continue_after_error<T, E>() -> impl FnMut(&Result<T, E>) -> futures::future::Ready<bool> {
    let mut failed = false;
    move |item| {
        let keep = !failed;
        failed |= item.is_err();
        futures::future::ready(keep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    struct Affiliation {
        character_id: Id,
        corporation_id: Id,
    }

    fn affiliations(ids: Vec<Id>) -> Vec<Affiliation> {
        ids.into_iter()
            .map(|character_id| Affiliation {
                character_id,
                corporation_id: character_id * 10,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_chunks_and_merges() {
        let sizes = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&sizes);
        let batcher: Batcher<Affiliation, Id, String> = Batcher::new(
            1000,
            move |ids: Vec<Id>| {
                seen.lock().unwrap().push(ids.len());
                async move { Ok(affiliations(ids)) }
            },
            |a: Affiliation| (a.character_id, a.corporation_id),
        );

        let ids: IdSet = (1..=2500).collect();
        let map = batcher.fetch_map(&ids).await.unwrap();

        let mut sizes = sizes.lock().unwrap().clone();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![500, 1000, 1000]);
        assert_eq!(map.len(), 2500);
        assert_eq!(map[&1234], 12340);
    }

    #[tokio::test]
    async fn test_keys_come_from_extraction() {
        // The backend answers for fewer ids than asked, plus one it was not asked about.
        let batcher: Batcher<(Id, &'static str), &'static str, String> = Batcher::new(
            2,
            |ids: Vec<Id>| async move {
                let mut records: Vec<(Id, &'static str)> =
                    ids.into_iter().filter(|id| id % 2 == 0).map(|id| (id, "even")).collect();
                records.push((-1, "extra"));
                Ok(records)
            },
            |pair| pair,
        );

        let map = batcher.fetch_map(&IdSet::from([1, 2, 3, 4])).await.unwrap();

        assert_eq!(map.len(), 3);
        assert_eq!(map.get(&2), Some(&"even"));
        assert_eq!(map.get(&4), Some(&"even"));
        assert_eq!(map.get(&-1), Some(&"extra"));
        assert!(!map.contains_key(&1));
    }

    #[tokio::test]
    async fn test_bulk_fails_with_chunk_error() {
        let batcher: Batcher<Affiliation, Id, String> = Batcher::new(
            1000,
            |ids: Vec<Id>| async move {
                match ids[0] {
                    1001 => Err("chunk 2 rejected".to_string()),
                    // The third chunk never resolves; the failure must not wait on it.
                    2001 => futures::future::pending().await,
                    _ => Ok(affiliations(ids)),
                }
            },
            |a: Affiliation| (a.character_id, a.corporation_id),
        );

        let ids: IdSet = (1..=2500).collect();
        let result = tokio::time::timeout(Duration::from_secs(5), batcher.fetch_map(&ids))
            .await
            .expect("bulk fetch should fail fast");

        assert_eq!(result, Err("chunk 2 rejected".to_string()));
    }

    #[tokio::test]
    async fn test_stream_preserves_chunk_order() {
        // Earlier chunks resolve later, so completion order is the reverse of submission.
        let batcher: Batcher<Affiliation, Id, String> = Batcher::new(
            2,
            |ids: Vec<Id>| async move {
                let delay = 40 - ids[0] as u64 * 5;
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok(affiliations(ids))
            },
            |a: Affiliation| (a.character_id, a.corporation_id),
        );

        let ids: IdSet = (1..=7).collect();
        let pairs: Vec<(Id, Id)> = batcher.fetch_stream(&ids).try_collect().await.unwrap();

        let order: Vec<Id> = pairs.iter().map(|(id, _)| *id).collect();
        assert_eq!(order, vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[tokio::test]
    async fn test_stream_errors_at_failed_chunk() {
        let batcher: Batcher<Affiliation, Id, String> = Batcher::new(
            2,
            |ids: Vec<Id>| async move {
                if ids[0] == 3 {
                    Err("chunk 2 rejected".to_string())
                } else {
                    Ok(affiliations(ids))
                }
            },
            |a: Affiliation| (a.character_id, a.corporation_id),
        );

        let items: Vec<Result<(Id, Id), String>> =
            batcher.fetch_stream(&IdSet::from([1, 2, 3, 4, 5])).collect().await;

        assert_eq!(
            items,
            vec![
                Ok((1, 10)),
                Ok((2, 20)),
                Err("chunk 2 rejected".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_per_id_fans_out() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&calls);
        let batcher: Batcher<(Id, String), String, String> = Batcher::per_id(move |id| {
            seen.lock().unwrap().push(id);
            async move { Ok(format!("alliance {id}")) }
        })
        .with_in_flight_limit(2);

        let map = batcher.fetch_map(&IdSet::from([7, 8, 9])).await.unwrap();

        assert_eq!(map.len(), 3);
        assert_eq!(map[&8], "alliance 8");
        let mut calls = calls.lock().unwrap().clone();
        calls.sort_unstable();
        assert_eq!(calls, vec![7, 8, 9]);
    }

    #[tokio::test]
    async fn test_empty_set_makes_no_requests() {
        let batcher: Batcher<Affiliation, Id, String> = Batcher::new(
            10,
            |_ids: Vec<Id>| async move { Err("should not be called".to_string()) },
            |a: Affiliation| (a.character_id, a.corporation_id),
        );

        assert!(batcher.fetch_map(&IdSet::new()).await.unwrap().is_empty());
        assert!(batcher.chunks(&IdSet::new()).is_empty());
    }
}
