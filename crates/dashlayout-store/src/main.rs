//! Dashlayout Layout Store
//!
//! In-memory implementation of the remote layout store used by
//! `dashlayout-core`. Handy for local development and integration testing.
//!
//! ## Endpoints
//!
//! ```text
//! GET    /api/component-layouts?filters[componentId][$eq]=..&filters[breakpoint][$eq]=..
//! POST   /api/component-layouts                 { "data": { "componentId": .., "breakpoint": .., .. } }
//! PUT    /api/component-layouts/{documentId}    { "data": { .. } }
//! DELETE /api/component-layouts/{documentId}
//! GET    /health
//! ```
//!
//! Plain `componentId`/`breakpoint` query parameters are accepted too.
//! Errors use the `{ "error": { status, name, message, details } }` shape.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use dashmap::{mapref::entry::Entry, DashMap};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use uuid::Uuid;

/// Breakpoint names accepted in records.
const BREAKPOINTS: [&str; 8] = ["xs", "sm", "md", "lg", "xl", "xxl", "xxxl", "xxxxl"];

const DEFAULT_PORT: u16 = 1337;

fn one() -> f64 {
    1.0
}

fn one_i32() -> i32 {
    1
}

/// Fields of a layout record as sent by clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutAttributes {
    #[serde(default)]
    pub component_id: String,
    #[serde(default)]
    pub breakpoint: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default = "one")]
    pub scale: f64,
    #[serde(default = "one_i32")]
    pub z_index: i32,
    #[serde(default = "one")]
    pub opacity: f64,
    #[serde(default)]
    pub rotation: f64,
}

impl LayoutAttributes {
    fn key(&self) -> (String, String) {
        (self.component_id.clone(), self.breakpoint.clone())
    }

    fn validate(&self) -> Result<(), ApiError> {
        if self.component_id.is_empty() || self.breakpoint.is_empty() {
            return Err(ApiError::validation("componentId and breakpoint are required"));
        }
        if !BREAKPOINTS.contains(&self.breakpoint.as_str()) {
            return Err(ApiError::validation(format!(
                "Unknown breakpoint {:?}, expected one of {}",
                self.breakpoint,
                BREAKPOINTS.join(", ")
            )));
        }
        let numbers = [self.x, self.y, self.width, self.height, self.scale, self.opacity, self.rotation];
        if numbers.iter().any(|n| !n.is_finite()) {
            return Err(ApiError::validation("Layout fields must be finite numbers"));
        }
        Ok(())
    }
}

/// A stored record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutRecord {
    pub id: u64,
    pub document_id: String,
    #[serde(flatten)]
    pub attributes: LayoutAttributes,
}

/// Request body wrapper.
#[derive(Debug, Deserialize)]
pub struct DataBody {
    pub data: LayoutAttributes,
}

/// Error answered to clients.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    status: StatusCode,
    name: &'static str,
    message: String,
}

impl ApiError {
    fn validation(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            name: "ValidationError",
            message: message.into(),
        }
    }

    fn not_found(document_id: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            name: "NotFoundError",
            message: format!("Component layout {document_id} not found"),
        }
    }

    fn conflict(key: &(String, String)) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            name: "ConflictError",
            message: format!("Component layout already exists for {}@{}", key.0, key.1),
        }
    }

    fn body(&self) -> Value {
        json!({
            "data": null,
            "error": {
                "status": self.status.as_u16(),
                "name": self.name,
                "message": self.message,
                "details": {},
            }
        })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body())).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(format!("Invalid request data: {}", rejection.body_text()))
    }
}

/// Shared application state
struct AppState {
    /// Records by document id
    records: DashMap<String, LayoutRecord>,
    /// Document id by (componentId, breakpoint)
    index: DashMap<(String, String), String>,
    next_id: AtomicU64,
}

impl AppState {
    fn new() -> Self {
        Self {
            records: DashMap::new(),
            index: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Records matching the filters, oldest first.
    fn query(&self, component_id: Option<&str>, breakpoint: Option<&str>) -> Vec<LayoutRecord> {
        let mut records: Vec<LayoutRecord> = self
            .records
            .iter()
            .filter(|r| component_id.is_none_or(|c| r.attributes.component_id == c))
            .filter(|r| breakpoint.is_none_or(|b| r.attributes.breakpoint == b))
            .map(|r| r.value().clone())
            .collect();
        records.sort_by_key(|r| r.id);
        records
    }

    fn create(&self, attributes: LayoutAttributes) -> Result<LayoutRecord, ApiError> {
        attributes.validate()?;
        let key = attributes.key();
        match self.index.entry(key) {
            Entry::Occupied(entry) => Err(ApiError::conflict(entry.key())),
            Entry::Vacant(entry) => {
                let record = LayoutRecord {
                    id: self.next_id.fetch_add(1, Ordering::SeqCst),
                    document_id: Uuid::new_v4().simple().to_string(),
                    attributes,
                };
                self.records.insert(record.document_id.clone(), record.clone());
                entry.insert(record.document_id.clone());
                Ok(record)
            }
        }
    }

    /// Replace the fields of a record.
    ///
    /// Never holds a `records` guard while touching `index`: `create` holds an
    /// `index` guard while inserting into `records`.
    fn update(&self, document_id: &str, attributes: LayoutAttributes) -> Result<LayoutRecord, ApiError> {
        attributes.validate()?;
        let old_key = self
            .records
            .get(document_id)
            .map(|record| record.attributes.key())
            .ok_or_else(|| ApiError::not_found(document_id))?;

        let new_key = attributes.key();
        let rekeyed = old_key != new_key;
        if rekeyed {
            match self.index.entry(new_key.clone()) {
                Entry::Occupied(entry) => return Err(ApiError::conflict(entry.key())),
                Entry::Vacant(entry) => {
                    entry.insert(document_id.to_string());
                }
            }
            self.index.remove(&old_key);
        }

        let Some(mut record) = self.records.get_mut(document_id) else {
            // Deleted concurrently.
            if rekeyed {
                self.index.remove_if(&new_key, |_, id| id == document_id);
            }
            return Err(ApiError::not_found(document_id));
        };
        record.attributes = attributes;
        Ok(record.clone())
    }

    fn delete(&self, document_id: &str) -> Result<LayoutRecord, ApiError> {
        let (_, record) = self
            .records
            .remove(document_id)
            .ok_or_else(|| ApiError::not_found(document_id))?;
        self.index.remove(&record.attributes.key());
        Ok(record)
    }
}

fn filter<'a>(params: &'a HashMap<String, String>, field: &str) -> Option<&'a str> {
    params
        .get(&format!("filters[{field}][$eq]"))
        .or_else(|| params.get(field))
        .map(String::as_str)
        .filter(|v| !v.is_empty())
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dashlayout_store=info,tower_http=info".into()),
        )
        .init();

    let state = Arc::new(AppState::new());
    let app = router(state);

    let host: std::net::IpAddr = std::env::var("HOST")
        .ok()
        .and_then(|h| h.parse().ok())
        .unwrap_or([0, 0, 0, 0].into());
    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);
    let addr = SocketAddr::new(host, port);
    info!("Dashlayout store listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/component-layouts", get(list_layouts).post(create_layout))
        .route(
            "/api/component-layouts/{document_id}",
            put(update_layout).delete(delete_layout),
        )
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

async fn list_layouts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let records = state.query(filter(&params, "componentId"), filter(&params, "breakpoint"));
    let total = records.len();
    Json(json!({
        "data": records,
        "meta": {
            "pagination": { "page": 1, "pageSize": total, "pageCount": 1, "total": total }
        }
    }))
}

async fn create_layout(
    State(state): State<Arc<AppState>>,
    body: Result<Json<DataBody>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(body) = body?;
    let record = state.create(body.data).inspect_err(|e| warn!("Create rejected: {}", e.message))?;
    info!(
        "Created {} for {}@{}",
        record.document_id, record.attributes.component_id, record.attributes.breakpoint
    );
    Ok((StatusCode::CREATED, Json(json!({ "data": record, "meta": {} }))))
}

async fn update_layout(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<String>,
    body: Result<Json<DataBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = body?;
    let record = state
        .update(&document_id, body.data)
        .inspect_err(|e| warn!("Update of {} rejected: {}", document_id, e.message))?;
    info!("Updated {}", record.document_id);
    Ok(Json(json!({ "data": record, "meta": {} })))
}

async fn delete_layout(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let record = state.delete(&document_id)?;
    info!("Deleted {}", record.document_id);
    Ok(Json(json!({ "data": record, "meta": {} })))
}
