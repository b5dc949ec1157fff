//! Handlers for record versioning.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/records/{id}/versions` | Stored snapshots, newest first |
//! | `GET`  | `/records/{id}/versions/{version}` | 404 if never snapshotted |
//! | `GET`  | `/records/{id}/changelog` | Newest first |
//! | `GET`  | `/records/{id}/diff?from=1&to=current` | `to` defaults to `current` |
//! | `POST` | `/records/{id}/revert` | Body: `{"version":2,"reason":"..."}` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use curio_core::{
  record::DecisionRecord,
  store::DecisionStore,
  version::{ChangelogEntry, RecordVersion, VersionDiff, VersionRef},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

// ─── Snapshots ────────────────────────────────────────────────────────────────

/// `GET /records/{id}/versions`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<RecordVersion>>, ApiError>
where
  S: DecisionStore,
{
  let versions = store.get_record_versions(id).await.map_err(ApiError::store)?;
  Ok(Json(versions))
}

/// `GET /records/{id}/versions/{version}`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path((id, version)): Path<(Uuid, u32)>,
) -> Result<Json<RecordVersion>, ApiError>
where
  S: DecisionStore,
{
  let snapshot = store
    .get_at_version(id, version)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(snapshot))
}

/// `GET /records/{id}/changelog`
pub async fn changelog<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<ChangelogEntry>>, ApiError>
where
  S: DecisionStore,
{
  let entries = store.get_changelog(id).await.map_err(ApiError::store)?;
  Ok(Json(entries))
}

// ─── Diff ─────────────────────────────────────────────────────────────────────

/// Versions arrive as raw strings so a malformed one gets the same JSON error
/// body as every other validation failure.
#[derive(Debug, Deserialize)]
pub struct DiffParams {
  pub from: String,
  pub to:   Option<String>,
}

/// `GET /records/{id}/diff?from=<n|current>[&to=<n|current>]`
pub async fn diff<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Query(params): Query<DiffParams>,
) -> Result<Json<VersionDiff>, ApiError>
where
  S: DecisionStore,
{
  let from: VersionRef = params.from.parse()?;
  let to = match params.to.as_deref() {
    Some(raw) => raw.parse()?,
    None => VersionRef::Current,
  };
  let diff = store.diff(id, from, to).await.map_err(ApiError::store)?;
  Ok(Json(diff))
}

// ─── Revert ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RevertBody {
  pub version: u32,
  pub reason:  Option<String>,
}

/// `POST /records/{id}/revert`
pub async fn revert<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<RevertBody>,
) -> Result<Json<DecisionRecord>, ApiError>
where
  S: DecisionStore,
{
  let record = store
    .revert_to_version(id, body.version, body.reason)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(record))
}
