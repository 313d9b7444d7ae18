//! Async data fetching with a keyed cache, inspired by TanStack Query.
//!
//! [`QueryCache`] memoizes results by key, runs at most one fetch per key and
//! lets callers patch or invalidate groups of entries by key prefix.
//! [`Mutation`] tracks a one-shot write operation.
//!
//! Both are driven from the UI event loop: work is spawned on tokio and the
//! results are collected with non-blocking `poll()` calls on each tick.
//!
//! # Example
//!
//! ```ignore
//! let mut cache = QueryCache::new(move |key: &ProductQueryKey| {
//!     let client = client.clone();
//!     let key = key.clone();
//!     async move { client.list(10, key.page * 10, &key.search).await.map_err(|e| e.to_string()) }
//! });
//!
//! // In event loop tick
//! cache.poll();
//!
//! // In render
//! match cache.get(&key).status {
//!     QueryStatus::Pending => render_spinner(),
//!     QueryStatus::Ready => render_data(..),
//!     QueryStatus::Error(e) => render_error(e),
//! }
//! ```

mod cache;
mod mutation;

pub use cache::{QueryCache, QuerySnapshot, QueryStatus};
pub use mutation::{Mutation, MutationState};

/// A boxed future that returns a Result<T, String>
pub type BoxFuture<T> = futures::future::BoxFuture<'static, Result<T, String>>;

/// Identifies one cached result.
pub trait QueryKey: Clone + Send + 'static {
  /// Stable, fixed-length hash; equal keys must hash equally.
  fn cache_hash(&self) -> String;

  /// Hierarchical segments, resource name first. Prefix operations match on these.
  fn path(&self) -> Vec<String>;

  /// Human-readable form for logs
  fn description(&self) -> String;

  /// Whether this key falls under `prefix`. An empty prefix matches everything.
  fn matches(&self, prefix: &[&str]) -> bool {
    let path = self.path();
    path.len() >= prefix.len() && path.iter().zip(prefix).all(|(a, b)| a == b)
  }
}
