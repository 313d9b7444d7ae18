use chrono::{DateTime, Utc};
use futures::FutureExt;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{BoxFuture, QueryKey};

/// Status of one cache entry as seen by a reader
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryStatus {
  /// No data yet; a fetch is running or about to start
  Pending,
  /// Data is available (possibly being refetched in the background)
  Ready,
  /// The last fetch failed
  Error(String),
}

/// Point-in-time view of a cache entry
#[derive(Debug)]
pub struct QuerySnapshot<'a, T> {
  pub status: QueryStatus,
  pub data: Option<&'a T>,
  /// A fetch for this key is in flight
  pub is_fetching: bool,
  pub fetched_at: Option<DateTime<Utc>>,
}

impl<T> QuerySnapshot<'_, T> {
  pub fn is_pending(&self) -> bool {
    self.status == QueryStatus::Pending
  }

  pub fn error(&self) -> Option<&str> {
    match &self.status {
      QueryStatus::Error(e) => Some(e),
      _ => None,
    }
  }
}

struct Entry<K, T> {
  key: K,
  data: Option<T>,
  error: Option<String>,
  fetched_at: Option<DateTime<Utc>>,
  fetched_instant: Option<Instant>,
  /// Marked by invalidate; cleared when a fetch starts
  invalidated: bool,
  in_flight: bool,
  /// Handle of the in-flight fetch, aborted when a newer one replaces it
  task: Option<JoinHandle<()>>,
  /// Bumped per fetch; only the latest fetch may write
  generation: u64,
  /// Last `get` of this key; idle entries are evicted after `gc_time`
  last_read: Instant,
}

impl<K, T> Entry<K, T> {
  fn new(key: K) -> Self {
    Self {
      key,
      data: None,
      error: None,
      fetched_at: None,
      fetched_instant: None,
      invalidated: false,
      in_flight: false,
      task: None,
      generation: 0,
      last_read: Instant::now(),
    }
  }
}

/// A finished fetch on its way back from the runtime
struct Settled<T> {
  hash: String,
  generation: u64,
  result: Result<T, String>,
}

/// Factory producing the fetch future for a key
type FetcherFn<K, T> = Arc<dyn Fn(&K) -> BoxFuture<T> + Send + Sync>;

/// Keyed result cache with per-key fetch deduplication.
///
/// The cache is owned by whoever drives the UI loop and is handed to views
/// explicitly. All mutation goes through `&mut self`, so there is no locking;
/// fetches run on the tokio runtime and report back through a channel that
/// `poll()` drains.
pub struct QueryCache<K, T> {
  entries: HashMap<String, Entry<K, T>>,
  fetcher: FetcherFn<K, T>,
  tx: mpsc::UnboundedSender<Settled<T>>,
  rx: mpsc::UnboundedReceiver<Settled<T>>,
  stale_time: Duration,
  gc_time: Duration,
}

impl<K: QueryKey, T: Send + 'static> QueryCache<K, T> {
  /// Create a cache whose entries are loaded by `fetcher`.
  pub fn new<F, Fut>(fetcher: F) -> Self
  where
    F: Fn(&K) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, String>> + Send + 'static,
  {
    let (tx, rx) = mpsc::unbounded_channel();
    Self {
      entries: HashMap::new(),
      fetcher: Arc::new(move |key: &K| -> BoxFuture<T> { fetcher(key).boxed() }),
      tx,
      rx,
      stale_time: Duration::from_secs(60), // Default 1 minute
      gc_time: Duration::from_secs(300),   // Default 5 minutes
    }
  }

  /// Set how long fetched data is served before a read triggers a refetch.
  pub fn with_stale_time(mut self, duration: Duration) -> Self {
    self.stale_time = duration;
    self
  }

  /// Read an entry, starting a fetch if it is missing or stale.
  ///
  /// Readers of a key with a fetch already in flight share that fetch.
  /// Entries in error stay in error until `refetch` or `invalidate`.
  pub fn get(&mut self, key: &K) -> QuerySnapshot<'_, T> {
    let hash = key.cache_hash();
    if self.needs_fetch(&hash) {
      self.start_fetch(hash.clone(), key);
    }
    if let Some(entry) = self.entries.get_mut(&hash) {
      entry.last_read = Instant::now();
    }
    self.snapshot(&hash)
  }

  /// Read an entry without side effects.
  pub fn peek(&self, key: &K) -> QuerySnapshot<'_, T> {
    self.snapshot(&key.cache_hash())
  }

  /// Force a new fetch for `key`. A fetch of the same key still in flight is
  /// aborted, and any response from it that already got out is dropped.
  pub fn refetch(&mut self, key: &K) {
    self.start_fetch(key.cache_hash(), key);
  }

  /// Mark every entry under `prefix` stale so the next read refetches it.
  /// Fetches already in flight are left alone and still land.
  pub fn invalidate(&mut self, prefix: &[&str]) -> usize {
    let mut count = 0;
    for entry in self.entries.values_mut() {
      if entry.key.matches(prefix) {
        entry.invalidated = true;
        count += 1;
      }
    }
    debug!(prefix = ?prefix, count, "invalidated queries");
    count
  }

  /// Apply `transform` to the data of every entry under `prefix`, without
  /// touching the network. Entries that have no data yet are skipped.
  pub fn patch<F>(&mut self, prefix: &[&str], mut transform: F) -> usize
  where
    F: FnMut(&K, &mut T),
  {
    let mut count = 0;
    for entry in self.entries.values_mut() {
      if !entry.key.matches(prefix) {
        continue;
      }
      if let Some(data) = entry.data.as_mut() {
        transform(&entry.key, data);
        count += 1;
      }
    }
    debug!(prefix = ?prefix, count, "patched queries");
    count
  }

  /// Collect finished fetches and evict entries idle for longer than the gc
  /// time. Returns `true` if any entry changed.
  /// Call this in your event loop tick handler.
  pub fn poll(&mut self) -> bool {
    let mut changed = false;
    while let Ok(settled) = self.rx.try_recv() {
      let Some(entry) = self.entries.get_mut(&settled.hash) else {
        continue;
      };
      if settled.generation != entry.generation {
        debug!(
          key = %entry.key.description(),
          "dropping superseded response"
        );
        continue;
      }

      entry.in_flight = false;
      entry.task = None;
      match settled.result {
        Ok(data) => {
          entry.data = Some(data);
          entry.error = None;
          entry.fetched_at = Some(Utc::now());
          entry.fetched_instant = Some(Instant::now());
        }
        Err(error) => {
          warn!(key = %entry.key.description(), %error, "query failed");
          entry.error = Some(error);
        }
      }
      changed = true;
    }

    let before = self.entries.len();
    let gc_time = self.gc_time;
    self
      .entries
      .retain(|_, entry| entry.in_flight || entry.last_read.elapsed() <= gc_time);
    let evicted = before - self.entries.len();
    if evicted > 0 {
      debug!(evicted, "evicted idle queries");
      changed = true;
    }
    changed
  }

  fn needs_fetch(&self, hash: &str) -> bool {
    let Some(entry) = self.entries.get(hash) else {
      return true;
    };
    if entry.in_flight {
      return false;
    }
    if entry.invalidated {
      return true;
    }
    if entry.error.is_some() {
      return false;
    }
    match entry.fetched_instant {
      Some(at) => at.elapsed() > self.stale_time,
      None => true,
    }
  }

  fn start_fetch(&mut self, hash: String, key: &K) {
    let entry = self
      .entries
      .entry(hash.clone())
      .or_insert_with(|| Entry::new(key.clone()));

    // One request per key: a newer fetch replaces the running one
    if let Some(task) = entry.task.take() {
      task.abort();
    }
    entry.generation += 1;
    entry.in_flight = true;
    entry.invalidated = false;
    entry.error = None;
    debug!(key = %entry.key.description(), generation = entry.generation, "fetching");

    let future = (self.fetcher)(&entry.key);
    let tx = self.tx.clone();
    let generation = entry.generation;
    entry.task = Some(tokio::spawn(async move {
      let result = future.await;
      // Ignore send errors - the cache may have been dropped
      let _ = tx.send(Settled {
        hash,
        generation,
        result,
      });
    }));
  }

  fn snapshot(&self, hash: &str) -> QuerySnapshot<'_, T> {
    let Some(entry) = self.entries.get(hash) else {
      return QuerySnapshot {
        status: QueryStatus::Pending,
        data: None,
        is_fetching: false,
        fetched_at: None,
      };
    };

    let status = if let Some(error) = &entry.error {
      QueryStatus::Error(error.clone())
    } else if entry.data.is_some() {
      QueryStatus::Ready
    } else {
      QueryStatus::Pending
    };

    QuerySnapshot {
      status,
      data: entry.data.as_ref(),
      is_fetching: entry.in_flight,
      fetched_at: entry.fetched_at,
    }
  }
}

impl<K, T> std::fmt::Debug for QueryCache<K, T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("QueryCache")
      .field("entries", &self.entries.len())
      .field("stale_time", &self.stale_time)
      .finish_non_exhaustive()
  }
}
