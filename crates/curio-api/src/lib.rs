//! JSON REST API for Curio.
//!
//! Exposes an axum [`Router`] backed by any
//! [`curio_core::store::DecisionStore`]. Auth, TLS and transport concerns are
//! the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", curio_api::api_router(store.clone()))
//! ```

pub mod decisions;
pub mod error;
pub mod projects;
pub mod records;
pub mod relationships;
pub mod versions;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, patch, post},
};
use curio_core::store::DecisionStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: DecisionStore + 'static,
{
  Router::new()
    // Projects
    .route("/projects", get(projects::list::<S>).post(projects::create::<S>))
    .route(
      "/projects/{id}",
      get(projects::get_one::<S>)
        .put(projects::update::<S>)
        .delete(projects::delete_one::<S>),
    )
    .route(
      "/projects/{id}/decisions",
      get(projects::list_decisions::<S>).post(projects::create_decision::<S>),
    )
    .route(
      "/projects/{id}/decisions/accepted",
      get(projects::accepted_decisions::<S>),
    )
    .route("/projects/{id}/records", get(projects::list_records::<S>))
    // Decisions
    .route(
      "/decisions/{id}",
      get(decisions::get_one::<S>)
        .patch(decisions::rename::<S>)
        .delete(decisions::delete_one::<S>),
    )
    .route(
      "/decisions/{id}/records",
      get(decisions::list_records::<S>).post(decisions::create_record::<S>),
    )
    .route("/decisions/{id}/timeline", get(decisions::timeline::<S>))
    .route(
      "/decisions/{id}/implementation-history",
      get(decisions::implementation_history::<S>),
    )
    .route(
      "/decisions/{id}/relationships",
      get(relationships::list_for_decision::<S>)
        .post(relationships::create_for_decision::<S>),
    )
    .route(
      "/decision-relationships/{id}",
      patch(relationships::update_decision_edge::<S>)
        .delete(relationships::delete_decision_edge::<S>),
    )
    // Records
    .route(
      "/records/{id}",
      get(records::get_one::<S>)
        .put(records::update::<S>)
        .delete(records::delete_one::<S>),
    )
    .route("/records/{id}/status", patch(records::change_status::<S>))
    .route("/records/{id}/history", get(records::history::<S>))
    .route(
      "/records/{id}/relationships",
      get(relationships::list_for_record::<S>)
        .post(relationships::create_for_record::<S>),
    )
    .route("/relationships", get(relationships::find::<S>))
    .route(
      "/relationships/{id}",
      patch(relationships::update_record_edge::<S>)
        .delete(relationships::delete_record_edge::<S>),
    )
    // Versions
    .route("/records/{id}/versions", get(versions::list::<S>))
    .route("/records/{id}/versions/{version}", get(versions::get_one::<S>))
    .route("/records/{id}/changelog", get(versions::changelog::<S>))
    .route("/records/{id}/diff", get(versions::diff::<S>))
    .route("/records/{id}/revert", post(versions::revert::<S>))
    .with_state(store)
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use curio_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;
  use uuid::Uuid;

  use super::*;

  async fn app() -> Router {
    let store = SqliteStore::open_in_memory().await.unwrap();
    api_router(Arc::new(store))
  }

  async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
  ) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
      Some(body) => builder
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    let value = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
  }

  /// Create a project and one decision, returning the decision id.
  async fn decision(app: &Router) -> String {
    let (status, project) =
      send(app, "POST", "/projects", Some(json!({ "name": "platform" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let uri = format!("/projects/{}/decisions", project["id"].as_str().unwrap());
    let (status, decision) =
      send(app, "POST", &uri, Some(json!({ "title": "Database" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    decision["id"].as_str().unwrap().to_owned()
  }

  async fn record(app: &Router, decision_id: &str, description: &str) -> String {
    let uri = format!("/decisions/{decision_id}/records");
    let (status, record) = send(
      app,
      "POST",
      &uri,
      Some(json!({ "decision_description": description })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(record["status"], "proposed");
    assert_eq!(record["version"], 1);
    record["id"].as_str().unwrap().to_owned()
  }

  // ─── Projects & decisions ──────────────────────────────────────────────────

  #[tokio::test]
  async fn duplicate_project_name_is_bad_request() {
    let app = app().await;
    let body = json!({ "name": "platform" });
    let (status, _) = send(&app, "POST", "/projects", Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, err) = send(&app, "POST", "/projects", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(err["error"].is_string());
  }

  #[tokio::test]
  async fn unknown_ids_are_not_found() {
    let app = app().await;
    let id = Uuid::new_v4();
    for uri in [
      format!("/projects/{id}"),
      format!("/decisions/{id}"),
      format!("/records/{id}"),
      format!("/records/{id}/history"),
      format!("/decisions/{id}/timeline"),
    ] {
      let (status, _) = send(&app, "GET", &uri, None).await;
      assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
    }
  }

  #[tokio::test]
  async fn deleting_a_decision_removes_its_records() {
    let app = app().await;
    let decision_id = decision(&app).await;
    let record_id = record(&app, &decision_id, "Use Postgres").await;

    let uri = format!("/decisions/{decision_id}");
    let (status, _) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) =
      send(&app, "GET", &format!("/records/{record_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn project_views_and_lifecycle() {
    let app = app().await;
    let decision_id = decision(&app).await;
    let first = record(&app, &decision_id, "Use Postgres").await;
    record(&app, &decision_id, "Use SQLite").await;
    let (_, found) = send(&app, "GET", &format!("/decisions/{decision_id}"), None).await;
    let project_id = found["project_id"].as_str().unwrap().to_owned();

    let (status, _) = send(
      &app,
      "PATCH",
      &format!("/records/{first}/status"),
      Some(json!({ "new_status": "accepted" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, decisions) =
      send(&app, "GET", &format!("/projects/{project_id}/decisions"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decisions[0]["record_count"], 2);
    assert_eq!(decisions[0]["status_counts"]["accepted"], 1);
    assert_eq!(decisions[0]["status_counts"]["proposed"], 1);

    let uri = format!("/projects/{project_id}/decisions?status=rejected");
    let (_, rejected) = send(&app, "GET", &uri, None).await;
    assert_eq!(rejected, json!([]));
    let uri = format!("/projects/{project_id}/decisions?status=shipped");
    let (status, _) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let uri = format!("/projects/{project_id}/decisions/accepted");
    let (_, accepted) = send(&app, "GET", &uri, None).await;
    assert_eq!(accepted[0]["accepted_record"]["id"], first);

    let uri = format!("/projects/{project_id}/records");
    let (_, records) = send(&app, "GET", &uri, None).await;
    assert_eq!(records.as_array().unwrap().len(), 2);
    assert_eq!(records[0]["decision_title"], "Database");

    let uri = format!("/projects/{project_id}");
    let (status, renamed) =
      send(&app, "PUT", &uri, Some(json!({ "name": "infrastructure" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["name"], "infrastructure");

    let (status, _) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) =
      send(&app, "GET", &format!("/decisions/{decision_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  // ─── Status ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn accepting_a_second_record_rejects_the_first() {
    let app = app().await;
    let decision_id = decision(&app).await;
    let first = record(&app, &decision_id, "Use Postgres").await;
    let second = record(&app, &decision_id, "Use SQLite").await;

    let accept = json!({ "new_status": "accepted" });
    let (status, _) = send(
      &app,
      "PATCH",
      &format!("/records/{first}/status"),
      Some(accept.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, outcome) = send(
      &app,
      "PATCH",
      &format!("/records/{second}/status"),
      Some(accept),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["record"]["status"], "accepted");
    assert_eq!(outcome["affected_records"], json!([first]));

    let (_, rejected) = send(&app, "GET", &format!("/records/{first}"), None).await;
    assert_eq!(rejected["status"], "rejected");

    let (_, edges) =
      send(&app, "GET", &format!("/records/{first}/relationships"), None).await;
    assert_eq!(edges["outgoing"][0]["relationship_type"], "superseded_by");
    assert_eq!(edges["outgoing"][0]["target_record_id"], second);
  }

  #[tokio::test]
  async fn disabled_conflict_handling_is_a_conflict() {
    let app = app().await;
    let decision_id = decision(&app).await;
    let first = record(&app, &decision_id, "Use Postgres").await;
    let second = record(&app, &decision_id, "Use SQLite").await;

    let (status, _) = send(
      &app,
      "PATCH",
      &format!("/records/{first}/status"),
      Some(json!({ "new_status": "accepted" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, err) = send(
      &app,
      "PATCH",
      &format!("/records/{second}/status"),
      Some(json!({ "new_status": "accepted", "auto_handle_conflicts": false })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(err["error"].as_str().unwrap().contains(&first));
  }

  #[tokio::test]
  async fn bad_statuses_are_bad_requests() {
    let app = app().await;
    let decision_id = decision(&app).await;
    let id = record(&app, &decision_id, "Use Postgres").await;
    let uri = format!("/records/{id}/status");

    let (status, _) =
      send(&app, "PATCH", &uri, Some(json!({ "new_status": "shipped" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // proposed -> implemented skips acceptance
    let (status, _) =
      send(&app, "PATCH", &uri, Some(json!({ "new_status": "implemented" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, history) =
      send(&app, "GET", &format!("/records/{id}/history"), None).await;
    assert_eq!(history.as_array().unwrap().len(), 1);
  }

  // ─── Versions ──────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn update_diff_and_revert() {
    let app = app().await;
    let decision_id = decision(&app).await;
    let id = record(&app, &decision_id, "Use Postgres").await;
    let uri = format!("/records/{id}");

    let (status, updated) = send(
      &app,
      "PUT",
      &uri,
      Some(json!({ "rationale": "Mature", "expected_version": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["version"], 2);

    let (status, _) = send(
      &app,
      "PUT",
      &uri,
      Some(json!({ "rationale": "Stale", "expected_version": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, diff) =
      send(&app, "GET", &format!("{uri}/diff?from=1&to=current"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(diff["to_version_number"], 2);
    assert_eq!(diff["changes"]["rationale"]["new"], "Mature");

    let (status, _) =
      send(&app, "GET", &format!("{uri}/diff?from=latest"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, snapshot) =
      send(&app, "GET", &format!("{uri}/versions/1"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["version"], 1);

    let (status, _) = send(&app, "GET", &format!("{uri}/versions/9"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, reverted) = send(
      &app,
      "POST",
      &format!("{uri}/revert"),
      Some(json!({ "version": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reverted["version"], 3);
    assert!(reverted["rationale"].is_null());

    let (_, changelog) =
      send(&app, "GET", &format!("{uri}/changelog"), None).await;
    assert_eq!(changelog[0]["summary"], "Reverted to version 1");
  }

  // ─── Relationships ─────────────────────────────────────────────────────────

  #[tokio::test]
  async fn relationship_lifecycle() {
    let app = app().await;
    let decision_id = decision(&app).await;
    let a = record(&app, &decision_id, "Use Postgres").await;
    let b = record(&app, &decision_id, "Use SQLite").await;

    let (status, _) = send(
      &app,
      "POST",
      &format!("/records/{a}/relationships"),
      Some(json!({ "target_record_id": b, "relationship_type": "blocks" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, edge) = send(
      &app,
      "POST",
      &format!("/records/{a}/relationships"),
      Some(json!({ "target_record_id": b, "relationship_type": "related_to" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let edge_id = edge["id"].as_str().unwrap().to_owned();

    let (status, found) = send(
      &app,
      "GET",
      &format!("/relationships?source={a}&target={b}"),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["id"], edge_id);

    let (status, updated) = send(
      &app,
      "PATCH",
      &format!("/relationships/{edge_id}"),
      Some(json!({ "relationship_type": "depends_on" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["relationship_type"], "depends_on");

    let (status, _) =
      send(&app, "DELETE", &format!("/relationships/{edge_id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
      &app,
      "GET",
      &format!("/relationships?source={a}&target={b}"),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn decision_cannot_relate_to_itself() {
    let app = app().await;
    let decision_id = decision(&app).await;
    let (status, _) = send(
      &app,
      "POST",
      &format!("/decisions/{decision_id}/relationships"),
      Some(json!({
        "target_decision_id": decision_id,
        "relationship_type": "related_to",
      })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }
}
