//! Handlers for `/decisions/{id}` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/decisions/{id}` | 404 if not found |
//! | `PATCH`  | `/decisions/{id}` | Body: `{"title":"..."}` |
//! | `DELETE` | `/decisions/{id}` | Removes every record and its history |
//! | `GET`    | `/decisions/{id}/records` | Oldest first |
//! | `POST`   | `/decisions/{id}/records` | Body: content fields plus optional `status` |
//! | `GET`    | `/decisions/{id}/timeline` | |
//! | `GET`    | `/decisions/{id}/implementation-history` | |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use curio_core::{
  decision::Decision,
  record::{DecisionRecord, NewRecord, RecordContent},
  store::DecisionStore,
  timeline::{ImplementationHistory, Timeline},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

// ─── Decision ─────────────────────────────────────────────────────────────────

/// `GET /decisions/{id}`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Decision>, ApiError>
where
  S: DecisionStore,
{
  let decision = store
    .get_decision(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("decision {id} not found")))?;
  Ok(Json(decision))
}

#[derive(Debug, Deserialize)]
pub struct RenameBody {
  pub title: String,
}

/// `PATCH /decisions/{id}`
pub async fn rename<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<RenameBody>,
) -> Result<Json<Decision>, ApiError>
where
  S: DecisionStore,
{
  let decision = store
    .rename_decision(id, body.title)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(decision))
}

/// `DELETE /decisions/{id}`
pub async fn delete_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: DecisionStore,
{
  if store.delete_decision(id).await.map_err(ApiError::store)? {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound(format!("decision {id} not found")))
  }
}

// ─── Records ──────────────────────────────────────────────────────────────────

/// `GET /decisions/{id}/records`
pub async fn list_records<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<DecisionRecord>>, ApiError>
where
  S: DecisionStore,
{
  let records = store.list_records(id).await.map_err(ApiError::store)?;
  Ok(Json(records))
}

/// Record creation body. The owning decision comes from the path.
#[derive(Debug, Deserialize)]
pub struct CreateRecordBody {
  pub status:  Option<String>,
  #[serde(flatten)]
  pub content: RecordContent,
}

/// `POST /decisions/{id}/records`
pub async fn create_record<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<CreateRecordBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DecisionStore,
{
  let input = NewRecord {
    decision_id: id,
    status:      body.status,
    content:     body.content,
  };
  let record = store.create_record(input).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(record)))
}

// ─── Projections ──────────────────────────────────────────────────────────────

/// `GET /decisions/{id}/timeline`
pub async fn timeline<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Timeline>, ApiError>
where
  S: DecisionStore,
{
  let timeline = store.get_timeline(id).await.map_err(ApiError::store)?;
  Ok(Json(timeline))
}

/// `GET /decisions/{id}/implementation-history`
pub async fn implementation_history<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<ImplementationHistory>, ApiError>
where
  S: DecisionStore,
{
  let history = store
    .get_implementation_history(id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(history))
}
