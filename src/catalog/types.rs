use serde::Serialize;

/// A product as shown in list views
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
  pub id: u64,
  pub title: String,
  pub price: f64,
  pub category: String,
  pub stock: u64,
}

impl Product {
  /// Overwrite every field the server sent back; leave the rest alone.
  pub fn apply(&mut self, patch: &ProductPatch) {
    if let Some(title) = &patch.title {
      self.title = title.clone();
    }
    if let Some(price) = patch.price {
      self.price = price;
    }
    if let Some(category) = &patch.category {
      self.category = category.clone();
    }
    if let Some(stock) = patch.stock {
      self.stock = stock;
    }
  }
}

/// One page of products plus the server-side match count
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageResult {
  pub items: Vec<Product>,
  pub total: u64,
}

/// Request body for create and update
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductDraft {
  pub title: String,
  pub price: f64,
  pub category: String,
  pub stock: u64,
}

/// Fields returned by an update; `None` means the server didn't echo it
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProductPatch {
  pub id: u64,
  pub title: Option<String>,
  pub price: Option<f64>,
  pub category: Option<String>,
  pub stock: Option<u64>,
}

/// Result of a successful save, tagged with how it was saved
#[derive(Debug, Clone, PartialEq)]
pub enum Saved {
  Added(Product),
  Edited(ProductPatch),
}
