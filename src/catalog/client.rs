use crate::catalog::api_types::{ApiProduct, ApiProductsResponse};
use crate::catalog::types::{PageResult, Product, ProductDraft, ProductPatch};
use crate::config::Config;
use color_eyre::{eyre::eyre, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

/// Failure of a single catalog API call
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
  /// The request never completed (connect, TLS, body read...)
  #[error("network error: {0}")]
  Network(#[from] reqwest::Error),
  /// The server answered with a non-2xx status
  #[error("{context} ({status}) {body}")]
  Http {
    context: &'static str,
    status: u16,
    body: String,
  },
  /// A 2xx answer whose body wasn't the JSON we expected
  #[error("{context}: {reason}")]
  Decode {
    context: &'static str,
    reason: String,
  },
}

impl ApiError {
  pub fn status(&self) -> Option<u16> {
    match self {
      ApiError::Http { status, .. } => Some(*status),
      _ => None,
    }
  }
}

/// Catalog REST API client
#[derive(Clone)]
pub struct CatalogClient {
  http: reqwest::Client,
  base_url: Url,
}

impl CatalogClient {
  pub fn new(config: &Config) -> Result<Self> {
    let base_url = config.base_url()?;
    Self::with_base_url(base_url)
  }

  pub fn with_base_url(base_url: Url) -> Result<Self> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    // No timeout: a call waits until the server or the network gives up
    let http = reqwest::Client::builder()
      .default_headers(headers)
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { http, base_url })
  }

  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  /// Fetch one page of products; a non-empty `query` uses the search endpoint.
  pub async fn list(&self, limit: usize, skip: usize, query: &str) -> Result<PageResult, ApiError> {
    let mut url = if query.is_empty() {
      self.endpoint(&["products"])
    } else {
      self.endpoint(&["products", "search"])
    };
    {
      let mut pairs = url.query_pairs_mut();
      if !query.is_empty() {
        pairs.append_pair("q", query);
      }
      pairs
        .append_pair("limit", &limit.to_string())
        .append_pair("skip", &skip.to_string());
    }

    debug!(%url, "fetching products");
    let response = self.http.get(url).send().await?;
    let body: ApiProductsResponse = decode(response, "Error fetching products").await?;
    Ok(body.into())
  }

  /// Create a product; the server assigns the id.
  pub async fn create(&self, draft: &ProductDraft) -> Result<Product, ApiError> {
    let url = self.endpoint(&["products", "add"]);
    debug!(%url, title = %draft.title, "creating product");

    let response = self.http.post(url).json(draft).send().await?;
    let body: ApiProduct = decode(response, "Error adding product").await?;
    let product = body.into_product().ok_or_else(|| ApiError::Decode {
      context: "Error adding product",
      reason: "response has no id".to_string(),
    })?;

    info!(id = product.id, "product created");
    Ok(product)
  }

  /// Update a product; the patch holds whatever fields the server echoed.
  pub async fn update(&self, id: u64, draft: &ProductDraft) -> Result<ProductPatch, ApiError> {
    let url = self.endpoint(&["products", &id.to_string()]);
    debug!(%url, "updating product");

    let response = self.http.patch(url).json(draft).send().await?;
    let body: ApiProduct = decode(response, "Error updating product").await?;

    info!(id, "product updated");
    Ok(body.into_patch(id))
  }

  /// Delete a product. The acknowledgment body is parsed but not used.
  pub async fn delete(&self, id: u64) -> Result<(), ApiError> {
    let url = self.endpoint(&["products", &id.to_string()]);
    debug!(%url, "deleting product");

    let response = self.http.delete(url).send().await?;
    let _ack: Value = decode(response, "Error deleting product").await?;

    info!(id, "product deleted");
    Ok(())
  }

  /// Append path segments to the base URL, keeping any base path.
  fn endpoint(&self, segments: &[&str]) -> Url {
    let mut url = self.base_url.clone();
    if let Ok(mut path) = url.path_segments_mut() {
      path.pop_if_empty().extend(segments);
    }
    url
  }
}

/// Turn a response into `T`, or into an `ApiError::Http` for non-2xx statuses.
async fn decode<T: DeserializeOwned>(
  response: reqwest::Response,
  context: &'static str,
) -> Result<T, ApiError> {
  let status = response.status();

  if !status.is_success() {
    let text = response.text().await.unwrap_or_default();
    return Err(http_error(context, status, text));
  }

  let text = response.text().await?;
  serde_json::from_str(&text).map_err(|e| ApiError::Decode {
    context,
    reason: e.to_string(),
  })
}

fn http_error(context: &'static str, status: StatusCode, text: String) -> ApiError {
  let body = if text.trim().is_empty() {
    status.canonical_reason().unwrap_or_default().to_string()
  } else {
    text
  };
  ApiError::Http {
    context,
    status: status.as_u16(),
    body,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_support::FakeApi;
  use serde_json::json;

  fn draft() -> ProductDraft {
    ProductDraft {
      title: "Phone".to_string(),
      price: 199.0,
      category: "smartphones".to_string(),
      stock: 12,
    }
  }

  #[test]
  fn test_endpoint_keeps_base_path() {
    let client = CatalogClient::with_base_url(Url::parse("http://host/api/v1").unwrap()).unwrap();
    assert_eq!(
      client.endpoint(&["products", "add"]).as_str(),
      "http://host/api/v1/products/add"
    );

    let client = CatalogClient::with_base_url(Url::parse("http://host/").unwrap()).unwrap();
    assert_eq!(client.endpoint(&["products"]).as_str(), "http://host/products");
  }

  #[test]
  fn test_http_error_falls_back_to_reason() {
    let err = http_error("Error fetching products", StatusCode::NOT_FOUND, String::new());
    assert_eq!(err.to_string(), "Error fetching products (404) Not Found");
    assert_eq!(err.status(), Some(404));
  }

  #[tokio::test]
  async fn test_list_uses_listing_endpoint_without_query() {
    let api = FakeApi::start(FakeApi::sample_products(3)).await;
    let page = api.client().list(10, 0, "").await.unwrap();

    assert_eq!(page.items.len(), 3);
    assert_eq!(page.total, 3);

    let requests = api.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].path, "/products");
    assert_eq!(requests[0].query.get("limit").map(String::as_str), Some("10"));
    assert_eq!(requests[0].query.get("skip").map(String::as_str), Some("0"));
    assert!(!requests[0].query.contains_key("q"));
  }

  #[tokio::test]
  async fn test_list_uses_search_endpoint_with_query() {
    let api = FakeApi::start(FakeApi::sample_products(25)).await;
    api.client().list(10, 20, "phone case").await.unwrap();

    let requests = api.requests();
    assert_eq!(requests[0].path, "/products/search");
    assert_eq!(
      requests[0].query.get("q").map(String::as_str),
      Some("phone case")
    );
    assert_eq!(requests[0].query.get("skip").map(String::as_str), Some("20"));
  }

  #[tokio::test]
  async fn test_list_pages_with_skip() {
    let api = FakeApi::start(FakeApi::sample_products(15)).await;
    let page = api.client().list(10, 10, "").await.unwrap();
    assert_eq!(page.items.len(), 5);
    assert_eq!(page.items[0].id, 11);
    assert_eq!(page.total, 15);
  }

  #[tokio::test]
  async fn test_create_sends_json_and_returns_server_id() {
    let api = FakeApi::start(FakeApi::sample_products(2)).await;
    let created = api.client().create(&draft()).await.unwrap();

    assert_eq!(created.id, 3);
    assert_eq!(created.title, "Phone");

    let requests = api.requests();
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].path, "/products/add");
    assert_eq!(
      requests[0].body,
      Some(json!({"title": "Phone", "price": 199.0, "category": "smartphones", "stock": 12}))
    );
  }

  #[tokio::test]
  async fn test_update_patches_by_id() {
    let api = FakeApi::start(FakeApi::sample_products(2)).await;
    let patch = api.client().update(2, &draft()).await.unwrap();

    assert_eq!(patch.id, 2);
    assert_eq!(patch.title.as_deref(), Some("Phone"));
    assert_eq!(patch.stock, Some(12));

    let requests = api.requests();
    assert_eq!(requests[0].method, "PATCH");
    assert_eq!(requests[0].path, "/products/2");
  }

  #[tokio::test]
  async fn test_delete_by_id() {
    let api = FakeApi::start(FakeApi::sample_products(2)).await;
    api.client().delete(1).await.unwrap();

    let requests = api.requests();
    assert_eq!(requests[0].method, "DELETE");
    assert_eq!(requests[0].path, "/products/1");
  }

  #[tokio::test]
  async fn test_non_success_becomes_http_error() {
    let api = FakeApi::start(FakeApi::sample_products(2)).await;
    let err = api.client().delete(404).await.unwrap_err();

    match err {
      ApiError::Http {
        status,
        ref body,
        context,
      } => {
        assert_eq!(status, 404);
        assert!(body.contains("not found"));
        assert_eq!(context, "Error deleting product");
      }
      other => panic!("expected http error, got {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_server_error_on_list() {
    let api = FakeApi::start(FakeApi::sample_products(2)).await;
    api.fail_with(500);
    let err = api.client().list(10, 0, "").await.unwrap_err();
    assert_eq!(err.status(), Some(500));
  }

  #[tokio::test]
  async fn test_unreachable_server_is_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let url = Url::parse(&format!("http://{}", addr)).unwrap();
    let client = CatalogClient::with_base_url(url).unwrap();
    let err = client.list(10, 0, "").await.unwrap_err();
    assert!(matches!(err, ApiError::Network(_)));
  }
}
