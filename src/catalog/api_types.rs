//! Serde-deserializable types matching the catalog API responses.
//!
//! These types are separate from domain types so that loosely typed payloads
//! (numbers sent as strings, missing fields) are normalized in one place.

use serde::Deserialize;
use serde_json::Value;

use super::types::{PageResult, Product, ProductPatch};

// ============================================================================
// Product payloads
// ============================================================================

#[derive(Debug, Deserialize, Default)]
pub struct ApiProduct {
  pub id: Option<Value>,
  pub title: Option<String>,
  pub price: Option<Value>,
  pub category: Option<String>,
  pub stock: Option<Value>,
}

// ============================================================================
// Listing and search endpoint response
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiProductsResponse {
  #[serde(default)]
  pub products: Vec<ApiProduct>,
  #[serde(default)]
  pub total: u64,
}

// ============================================================================
// Conversions to domain types
// ============================================================================

impl ApiProduct {
  pub fn id(&self) -> Option<u64> {
    self.id.as_ref().and_then(coerce_u64)
  }

  /// Convert to a full product, defaulting missing fields.
  /// Returns `None` without a usable id.
  pub fn into_product(self) -> Option<Product> {
    let id = self.id()?;
    Some(Product {
      id,
      title: self.title.unwrap_or_default(),
      price: self.price.as_ref().and_then(coerce_f64).unwrap_or(0.0),
      category: self.category.unwrap_or_default(),
      stock: self.stock.as_ref().and_then(coerce_u64).unwrap_or(0),
    })
  }

  /// Convert to a patch, keeping only the fields the server sent.
  pub fn into_patch(self, fallback_id: u64) -> ProductPatch {
    ProductPatch {
      id: self.id().unwrap_or(fallback_id),
      title: self.title,
      price: self.price.as_ref().and_then(coerce_f64),
      category: self.category,
      stock: self.stock.as_ref().and_then(coerce_u64),
    }
  }
}

impl From<ApiProductsResponse> for PageResult {
  fn from(resp: ApiProductsResponse) -> Self {
    let items = resp
      .products
      .into_iter()
      .filter_map(|p| {
        let product = p.into_product();
        if product.is_none() {
          tracing::warn!("skipping product without id in listing");
        }
        product
      })
      .collect();
    PageResult {
      items,
      total: resp.total,
    }
  }
}

// ============================================================================
// Helpers
// ============================================================================

/// Numeric fields may arrive as numbers, numeric strings or null
fn coerce_f64(value: &Value) -> Option<f64> {
  let n = match value {
    Value::Number(n) => n.as_f64(),
    Value::String(s) => s.trim().parse::<f64>().ok(),
    _ => None,
  }?;
  n.is_finite().then_some(n)
}

fn coerce_u64(value: &Value) -> Option<u64> {
  match value {
    Value::Number(n) => n.as_u64().or_else(|| {
      n.as_f64()
        .filter(|f| f.is_finite() && *f >= 0.0)
        .map(|f| f as u64)
    }),
    Value::String(s) => s.trim().parse::<u64>().ok(),
    _ => None,
  }
}
