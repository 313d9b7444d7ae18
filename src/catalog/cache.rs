//! Product listing cache: query keys and cross-page patches.

use sha2::{Digest, Sha256};
use std::time::Duration;

use crate::query::{QueryCache, QueryKey, QuerySnapshot};

use super::client::CatalogClient;
use super::types::{PageResult, Product, ProductPatch, Saved};

/// Resource tag shared by every product listing entry
pub const PRODUCTS: &str = "products";

// ============================================================================
// Query key
// ============================================================================

/// One page of a listing or search.
///
/// Search text is kept verbatim: different spellings of a search are
/// different entries even when their results overlap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProductQueryKey {
  pub page: usize,
  pub search: String,
}

impl ProductQueryKey {
  pub fn new(page: usize, search: impl Into<String>) -> Self {
    Self {
      page,
      search: search.into(),
    }
  }
}

impl QueryKey for ProductQueryKey {
  fn cache_hash(&self) -> String {
    let input = format!("{}:{}:{}", PRODUCTS, self.page, self.search);

    // SHA256 hash for stable, fixed-length keys
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
  }

  fn path(&self) -> Vec<String> {
    vec![
      PRODUCTS.to_string(),
      self.page.to_string(),
      self.search.clone(),
    ]
  }

  fn description(&self) -> String {
    if self.search.is_empty() {
      format!("products page {}", self.page)
    } else {
      format!("products page {} matching {:?}", self.page, self.search)
    }
  }
}

// ============================================================================
// Page patches
// ============================================================================

/// Drop `id` from a page and count one fewer match.
pub fn remove_product(page: &mut PageResult, id: u64) {
  page.items.retain(|p| p.id != id);
  page.total = page.total.saturating_sub(1);
}

/// Merge server-returned fields into the item with the same id.
pub fn merge_product(page: &mut PageResult, patch: &ProductPatch) {
  for item in page.items.iter_mut().filter(|p| p.id == patch.id) {
    item.apply(patch);
  }
}

/// Count one more match; first pages also show the new product on top.
pub fn prepend_product(
  key: &ProductQueryKey,
  page: &mut PageResult,
  product: &Product,
  page_size: usize,
) {
  page.total += 1;
  if key.page == 0 {
    page.items.insert(0, product.clone());
    page.items.truncate(page_size);
  }
}

// ============================================================================
// Cache service
// ============================================================================

/// Product listing cache, created at startup and handed to the table view.
pub struct ProductCache {
  queries: QueryCache<ProductQueryKey, PageResult>,
  page_size: usize,
}

impl ProductCache {
  pub fn new(client: CatalogClient, page_size: usize, stale_time: Duration) -> Self {
    let queries = QueryCache::new(move |key: &ProductQueryKey| {
      let client = client.clone();
      let key = key.clone();
      async move {
        client
          .list(page_size, key.page * page_size, &key.search)
          .await
          .map_err(|e| e.to_string())
      }
    })
    .with_stale_time(stale_time);

    Self { queries, page_size }
  }

  pub fn page_size(&self) -> usize {
    self.page_size
  }

  /// Read a page, fetching it if needed.
  pub fn page(&mut self, key: &ProductQueryKey) -> QuerySnapshot<'_, PageResult> {
    self.queries.get(key)
  }

  pub fn peek(&self, key: &ProductQueryKey) -> QuerySnapshot<'_, PageResult> {
    self.queries.peek(key)
  }

  pub fn refetch(&mut self, key: &ProductQueryKey) {
    self.queries.refetch(key);
  }

  pub fn poll(&mut self) -> bool {
    self.queries.poll()
  }

  /// Reflect a successful delete in every cached page, then mark them stale.
  pub fn record_deleted(&mut self, id: u64) {
    self
      .queries
      .patch(&[PRODUCTS], |_, page| remove_product(page, id));
    self.queries.invalidate(&[PRODUCTS]);
  }

  /// Reflect a successful save in every cached page, then mark them stale.
  pub fn record_saved(&mut self, saved: &Saved) {
    let page_size = self.page_size;
    match saved {
      Saved::Edited(patch) => {
        self
          .queries
          .patch(&[PRODUCTS], |_, page| merge_product(page, patch));
      }
      Saved::Added(product) => {
        self.queries.patch(&[PRODUCTS], |key, page| {
          prepend_product(key, page, product, page_size)
        });
      }
    }
    self.queries.invalidate(&[PRODUCTS]);
  }
}
