//! Handlers for record and decision relationships.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/records/{id}/relationships` | `{"outgoing":[..],"incoming":[..]}` |
//! | `POST`   | `/records/{id}/relationships` | Body: `{"target_record_id":"..","relationship_type":"supersedes"}` |
//! | `GET`    | `/relationships?source=..&target=..[&type=..]` | 404 if no edge, 409 if ambiguous |
//! | `PATCH`  | `/relationships/{id}` | Body: `{"relationship_type":"..","description":".."}` |
//! | `DELETE` | `/relationships/{id}` | |
//! | `GET`    | `/decisions/{id}/relationships` | |
//! | `POST`   | `/decisions/{id}/relationships` | Body: `{"target_decision_id":"..","relationship_type":".."}` |
//! | `PATCH`  | `/decision-relationships/{id}` | |
//! | `DELETE` | `/decision-relationships/{id}` | |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use curio_core::{
  relationship::{
    DecisionRelationship,
    DecisionRelationships,
    NewDecisionRelationship,
    NewRelationship,
    RecordRelationships,
    Relationship,
    RelationshipType,
    RelationshipUpdate,
  },
  store::DecisionStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

/// Relationship types arrive as strings so an unknown one is reported as a
/// validation failure naming the offending value.
fn parse_type(raw: Option<&str>) -> Result<Option<RelationshipType>, ApiError> {
  Ok(raw.map(RelationshipType::parse).transpose()?)
}

#[derive(Debug, Deserialize)]
pub struct UpdateBody {
  pub relationship_type: Option<String>,
  pub description:       Option<String>,
}

impl UpdateBody {
  fn into_update(self) -> Result<RelationshipUpdate, ApiError> {
    Ok(RelationshipUpdate {
      relationship_type: parse_type(self.relationship_type.as_deref())?,
      description:       self.description,
    })
  }
}

// ─── Record-level ─────────────────────────────────────────────────────────────

/// `GET /records/{id}/relationships`
pub async fn list_for_record<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<RecordRelationships>, ApiError>
where
  S: DecisionStore,
{
  let edges = store.list_relationships(id).await.map_err(ApiError::store)?;
  Ok(Json(edges))
}

#[derive(Debug, Deserialize)]
pub struct CreateRecordEdgeBody {
  pub target_record_id:  Uuid,
  pub relationship_type: String,
  pub description:       Option<String>,
}

/// `POST /records/{id}/relationships`
pub async fn create_for_record<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<CreateRecordEdgeBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DecisionStore,
{
  let input = NewRelationship {
    source_record_id:  id,
    target_record_id:  body.target_record_id,
    relationship_type: RelationshipType::parse(&body.relationship_type)?,
    description:       body.description,
  };
  let edge = store
    .create_relationship(input)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(edge)))
}

#[derive(Debug, Deserialize)]
pub struct FindParams {
  pub source: Uuid,
  pub target: Uuid,
  #[serde(rename = "type")]
  pub kind:   Option<String>,
}

/// `GET /relationships?source=<id>&target=<id>[&type=<type>]`
pub async fn find<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<FindParams>,
) -> Result<Json<Relationship>, ApiError>
where
  S: DecisionStore,
{
  let kind = parse_type(params.kind.as_deref())?;
  let edge = store
    .find_relationship(params.source, params.target, kind)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| {
      ApiError::NotFound(format!(
        "no relationship from {} to {}",
        params.source, params.target
      ))
    })?;
  Ok(Json(edge))
}

/// `PATCH /relationships/{id}`
pub async fn update_record_edge<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<UpdateBody>,
) -> Result<Json<Relationship>, ApiError>
where
  S: DecisionStore,
{
  let edge = store
    .update_relationship(id, body.into_update()?)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(edge))
}

/// `DELETE /relationships/{id}`
pub async fn delete_record_edge<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: DecisionStore,
{
  if store.delete_relationship(id).await.map_err(ApiError::store)? {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound(format!("relationship {id} not found")))
  }
}

// ─── Decision-level ───────────────────────────────────────────────────────────

/// `GET /decisions/{id}/relationships`
pub async fn list_for_decision<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<DecisionRelationships>, ApiError>
where
  S: DecisionStore,
{
  let edges = store
    .list_decision_relationships(id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(edges))
}

#[derive(Debug, Deserialize)]
pub struct CreateDecisionEdgeBody {
  pub target_decision_id: Uuid,
  pub relationship_type:  String,
  pub description:        Option<String>,
}

/// `POST /decisions/{id}/relationships`
pub async fn create_for_decision<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<CreateDecisionEdgeBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DecisionStore,
{
  let input = NewDecisionRelationship {
    source_decision_id: id,
    target_decision_id: body.target_decision_id,
    relationship_type:  RelationshipType::parse(&body.relationship_type)?,
    description:        body.description,
  };
  let edge = store
    .create_decision_relationship(input)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(edge)))
}

/// `PATCH /decision-relationships/{id}`
pub async fn update_decision_edge<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<UpdateBody>,
) -> Result<Json<DecisionRelationship>, ApiError>
where
  S: DecisionStore,
{
  let edge = store
    .update_decision_relationship(id, body.into_update()?)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(edge))
}

/// `DELETE /decision-relationships/{id}`
pub async fn delete_decision_edge<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: DecisionStore,
{
  if store
    .delete_decision_relationship(id)
    .await
    .map_err(ApiError::store)?
  {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound(format!("decision relationship {id} not found")))
  }
}
