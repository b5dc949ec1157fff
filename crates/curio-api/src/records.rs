//! Handlers for `/records/{id}` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/records/{id}` | 404 if not found |
//! | `PUT`    | `/records/{id}` | Partial content; optional `expected_version` |
//! | `DELETE` | `/records/{id}` | |
//! | `PATCH`  | `/records/{id}/status` | Body: `{"new_status":"accepted","reason":"..."}` |
//! | `GET`    | `/records/{id}/history` | Newest first |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use curio_core::{
  record::{ContentPatch, DecisionRecord},
  status::{StatusChange, StatusChangeOutcome, StatusHistory},
  store::DecisionStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

// ─── Record ───────────────────────────────────────────────────────────────────

/// `GET /records/{id}`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<DecisionRecord>, ApiError>
where
  S: DecisionStore,
{
  let record = store
    .get_record(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("record {id} not found")))?;
  Ok(Json(record))
}

/// `PUT /records/{id}`: body is any subset of the content fields.
pub async fn update<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(patch): Json<ContentPatch>,
) -> Result<Json<DecisionRecord>, ApiError>
where
  S: DecisionStore,
{
  let record = store
    .update_content(id, patch)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(record))
}

/// `DELETE /records/{id}`
pub async fn delete_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: DecisionStore,
{
  if store.delete_record(id).await.map_err(ApiError::store)? {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound(format!("record {id} not found")))
  }
}

// ─── Status ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  #[serde(alias = "status")]
  pub new_status:            String,
  pub reason:                Option<String>,
  #[serde(default = "enabled")]
  pub auto_handle_conflicts: bool,
}

fn enabled() -> bool { true }

/// `PATCH /records/{id}/status`
pub async fn change_status<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<StatusBody>,
) -> Result<Json<StatusChangeOutcome>, ApiError>
where
  S: DecisionStore,
{
  let change = StatusChange {
    record_id:             id,
    new_status:            body.new_status,
    reason:                body.reason,
    auto_handle_conflicts: body.auto_handle_conflicts,
  };
  let outcome = store.change_status(change).await.map_err(ApiError::store)?;
  Ok(Json(outcome))
}

/// `GET /records/{id}/history`
pub async fn history<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<StatusHistory>>, ApiError>
where
  S: DecisionStore,
{
  let history = store.get_status_history(id).await.map_err(ApiError::store)?;
  Ok(Json(history))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn conflict_handling_defaults_to_enabled() {
    let body: StatusBody = serde_json::from_str(r#"{"status":"accepted"}"#).unwrap();
    assert_eq!(body.new_status, "accepted");
    assert!(body.auto_handle_conflicts);

    let body: StatusBody = serde_json::from_str(
      r#"{"new_status":"accepted","auto_handle_conflicts":false}"#,
    )
    .unwrap();
    assert!(!body.auto_handle_conflicts);
  }
}
