//! In-process fake of the catalog API, served by axum on a loopback port.

use crate::catalog::client::CatalogClient;
use axum::extract::{Path, Query, State};
use axum::http::{Method, StatusCode, Uri};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use url::Url;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
  pub method: String,
  pub path: String,
  pub query: HashMap<String, String>,
  pub body: Option<Value>,
}

#[derive(Debug, Default)]
pub struct FakeState {
  pub products: Vec<Value>,
  pub requests: Vec<RecordedRequest>,
  /// When set, every request fails with this status
  pub fail_status: Option<u16>,
  next_id: u64,
}

type Shared = Arc<Mutex<FakeState>>;
type Reply = Result<Json<Value>, (StatusCode, String)>;

pub struct FakeApi {
  pub base_url: Url,
  pub state: Shared,
}

impl FakeApi {
  pub async fn start(products: Vec<Value>) -> Self {
    let next_id = products
      .iter()
      .filter_map(|p| p.get("id").and_then(Value::as_u64))
      .max()
      .unwrap_or(0)
      + 1;
    let state: Shared = Arc::new(Mutex::new(FakeState {
      products,
      next_id,
      ..Default::default()
    }));

    let app = Router::new()
      .route("/products", get(list_products))
      .route("/products/search", get(search_products))
      .route("/products/add", post(add_product))
      .route(
        "/products/:id",
        axum::routing::patch(update_product).delete(delete_product),
      )
      .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      axum::serve(listener, app).await.unwrap();
    });

    let base_url = Url::parse(&format!("http://{}", addr)).unwrap();
    Self { base_url, state }
  }

  /// `count` products with ids 1..=count
  pub fn sample_products(count: u64) -> Vec<Value> {
    (1..=count)
      .map(|id| {
        json!({
          "id": id,
          "title": format!("Product {}", id),
          "price": id as f64 * 1.5,
          "category": if id % 2 == 0 { "even" } else { "odd" },
          "stock": id,
        })
      })
      .collect()
  }

  pub fn client(&self) -> CatalogClient {
    CatalogClient::with_base_url(self.base_url.clone()).unwrap()
  }

  pub fn requests(&self) -> Vec<RecordedRequest> {
    self.state.lock().unwrap().requests.clone()
  }

  pub fn fail_with(&self, status: u16) {
    self.state.lock().unwrap().fail_status = Some(status);
  }

  pub fn recover(&self) {
    self.state.lock().unwrap().fail_status = None;
  }
}

fn record(
  state: &mut FakeState,
  method: &Method,
  uri: &Uri,
  query: HashMap<String, String>,
  body: Option<Value>,
) -> Result<(), (StatusCode, String)> {
  state.requests.push(RecordedRequest {
    method: method.to_string(),
    path: uri.path().to_string(),
    query,
    body,
  });
  match state.fail_status {
    Some(code) => Err((
      StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
      "boom".to_string(),
    )),
    None => Ok(()),
  }
}

fn page(products: &[Value], params: &HashMap<String, String>) -> Value {
  let limit = params
    .get("limit")
    .and_then(|v| v.parse::<usize>().ok())
    .unwrap_or(30);
  let skip = params
    .get("skip")
    .and_then(|v| v.parse::<usize>().ok())
    .unwrap_or(0);
  let items: Vec<Value> = products.iter().skip(skip).take(limit).cloned().collect();
  json!({
    "products": items,
    "total": products.len(),
    "skip": skip,
    "limit": limit,
  })
}

fn not_found(id: u64) -> (StatusCode, String) {
  (
    StatusCode::NOT_FOUND,
    json!({ "message": format!("Product with id '{}' not found", id) }).to_string(),
  )
}

async fn list_products(
  State(state): State<Shared>,
  method: Method,
  uri: Uri,
  Query(params): Query<HashMap<String, String>>,
) -> Reply {
  let mut state = state.lock().unwrap();
  record(&mut state, &method, &uri, params.clone(), None)?;
  Ok(Json(page(&state.products, &params)))
}

async fn search_products(
  State(state): State<Shared>,
  method: Method,
  uri: Uri,
  Query(params): Query<HashMap<String, String>>,
) -> Reply {
  let mut state = state.lock().unwrap();
  record(&mut state, &method, &uri, params.clone(), None)?;
  let needle = params.get("q").cloned().unwrap_or_default().to_lowercase();
  let matching: Vec<Value> = state
    .products
    .iter()
    .filter(|p| {
      p.get("title")
        .and_then(Value::as_str)
        .is_some_and(|t| t.to_lowercase().contains(&needle))
    })
    .cloned()
    .collect();
  Ok(Json(page(&matching, &params)))
}

async fn add_product(
  State(state): State<Shared>,
  method: Method,
  uri: Uri,
  Json(body): Json<Value>,
) -> Reply {
  let mut state = state.lock().unwrap();
  record(&mut state, &method, &uri, HashMap::new(), Some(body.clone()))?;
  let mut product = body.as_object().cloned().unwrap_or_else(Map::new);
  product.insert("id".to_string(), json!(state.next_id));
  state.next_id += 1;
  // Like the public demo API, additions are echoed but not stored
  Ok(Json(Value::Object(product)))
}

async fn update_product(
  State(state): State<Shared>,
  method: Method,
  uri: Uri,
  Path(id): Path<u64>,
  Json(body): Json<Value>,
) -> Reply {
  let mut state = state.lock().unwrap();
  record(&mut state, &method, &uri, HashMap::new(), Some(body.clone()))?;
  let product = state
    .products
    .iter_mut()
    .find(|p| p.get("id").and_then(Value::as_u64) == Some(id))
    .ok_or_else(|| not_found(id))?;
  if let (Some(target), Some(fields)) = (product.as_object_mut(), body.as_object()) {
    for (k, v) in fields {
      target.insert(k.clone(), v.clone());
    }
  }
  Ok(Json(product.clone()))
}

async fn delete_product(
  State(state): State<Shared>,
  method: Method,
  uri: Uri,
  Path(id): Path<u64>,
) -> Reply {
  let mut state = state.lock().unwrap();
  record(&mut state, &method, &uri, HashMap::new(), None)?;
  let index = state
    .products
    .iter()
    .position(|p| p.get("id").and_then(Value::as_u64) == Some(id))
    .ok_or_else(|| not_found(id))?;
  let mut removed = state.products.remove(index);
  if let Some(obj) = removed.as_object_mut() {
    obj.insert("isDeleted".to_string(), json!(true));
  }
  Ok(Json(removed))
}
