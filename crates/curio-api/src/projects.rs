//! Handlers for `/projects` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/projects` | Newest first |
//! | `POST` | `/projects` | Body: `{"name":"...","description":"..."}` |
//! | `GET`  | `/projects/{id}` | 404 if not found |
//! | `PUT`  | `/projects/{id}` | Body: `{"name":"...","description":"..."}`, both optional |
//! | `DELETE` | `/projects/{id}` | Removes every decision and record under it |
//! | `GET`  | `/projects/{id}/decisions` | Oldest first, with `status_counts`; optional `?status=accepted` |
//! | `POST` | `/projects/{id}/decisions` | Body: `{"title":"..."}` |
//! | `GET`  | `/projects/{id}/decisions/accepted` | Decisions paired with their accepted record |
//! | `GET`  | `/projects/{id}/records` | Every record, tagged with `decision_title` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use curio_core::{
  decision::{
    AcceptedDecision,
    DecisionSummary,
    NewProject,
    Project,
    ProjectRecord,
    ProjectUpdate,
  },
  record::RecordStatus,
  store::DecisionStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /projects`
pub async fn list<S>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<Project>>, ApiError>
where
  S: DecisionStore,
{
  let projects = store.list_projects().await.map_err(ApiError::store)?;
  Ok(Json(projects))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /projects`
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<NewProject>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DecisionStore,
{
  let project = store.create_project(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(project)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /projects/{id}`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Project>, ApiError>
where
  S: DecisionStore,
{
  let project = store
    .get_project(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("project {id} not found")))?;
  Ok(Json(project))
}

// ─── Update & delete ──────────────────────────────────────────────────────────

/// `PUT /projects/{id}`
pub async fn update<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ProjectUpdate>,
) -> Result<Json<Project>, ApiError>
where
  S: DecisionStore,
{
  let project = store.update_project(id, body).await.map_err(ApiError::store)?;
  Ok(Json(project))
}

/// `DELETE /projects/{id}`
pub async fn delete_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: DecisionStore,
{
  if store.delete_project(id).await.map_err(ApiError::store)? {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound(format!("project {id} not found")))
  }
}

// ─── Decisions ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DecisionListParams {
  pub status: Option<String>,
}

/// `GET /projects/{id}/decisions[?status=<status>]`
pub async fn list_decisions<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Query(params): Query<DecisionListParams>,
) -> Result<Json<Vec<DecisionSummary>>, ApiError>
where
  S: DecisionStore,
{
  let status = params.status.as_deref().map(RecordStatus::parse).transpose()?;
  let decisions = store
    .list_decision_summaries(id, status)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(decisions))
}

/// `GET /projects/{id}/decisions/accepted`
pub async fn accepted_decisions<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<AcceptedDecision>>, ApiError>
where
  S: DecisionStore,
{
  let accepted = store
    .list_accepted_decisions(id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(accepted))
}

#[derive(Debug, Deserialize)]
pub struct CreateDecisionBody {
  pub title: String,
}

/// `POST /projects/{id}/decisions`
pub async fn create_decision<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<CreateDecisionBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DecisionStore,
{
  let decision = store
    .create_decision(id, body.title)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(decision)))
}

// ─── Records ──────────────────────────────────────────────────────────────────

/// `GET /projects/{id}/records`
pub async fn list_records<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<ProjectRecord>>, ApiError>
where
  S: DecisionStore,
{
  let records = store
    .list_project_records(id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(records))
}
