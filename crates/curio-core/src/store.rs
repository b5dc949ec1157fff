//! The `DecisionStore` trait: the full lifecycle engine as seen by callers.
//!
//! The trait is implemented by storage backends (e.g. `curio-store-sqlite`).
//! The HTTP layer (`curio-api`) depends on this abstraction, not on any
//! concrete backend.
//!
//! Every mutating method is atomic: it either commits all of its writes
//! (cascaded transitions, snapshots, history, changelog, edges) or none.

use std::future::Future;

use uuid::Uuid;

use crate::{
  decision::{
    AcceptedDecision,
    Decision,
    DecisionSummary,
    NewProject,
    Project,
    ProjectRecord,
    ProjectUpdate,
  },
  error::Classify,
  record::{ContentPatch, DecisionRecord, NewRecord, RecordStatus},
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
  status::{StatusChange, StatusChangeOutcome, StatusHistory},
  timeline::{ImplementationHistory, Timeline},
  version::{ChangelogEntry, RecordVersion, VersionDiff, VersionRef},
};

/// Abstraction over a decision-record store backend.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait DecisionStore: Send + Sync {
  type Error: std::error::Error + Classify + Send + Sync + 'static;

  // ── Projects ──────────────────────────────────────────────────────────

  /// Create a project. Names are unique; a duplicate fails with a
  /// validation error.
  fn create_project(
    &self,
    input: NewProject,
  ) -> impl Future<Output = Result<Project, Self::Error>> + Send + '_;

  fn get_project(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Project>, Self::Error>> + Send + '_;

  fn get_project_by_name(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Option<Project>, Self::Error>> + Send + '_;

  /// All projects, newest first.
  fn list_projects(
    &self,
  ) -> impl Future<Output = Result<Vec<Project>, Self::Error>> + Send + '_;

  /// Rename a project or change its description. A new name must be
  /// non-empty and unique.
  fn update_project(
    &self,
    id: Uuid,
    update: ProjectUpdate,
  ) -> impl Future<Output = Result<Project, Self::Error>> + Send + '_;

  /// Delete a project together with its decisions and everything under
  /// them. Returns `false` if it did not exist.
  fn delete_project(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Decisions ─────────────────────────────────────────────────────────

  /// Create a decision under an existing project. The title must not be
  /// empty.
  fn create_decision(
    &self,
    project_id: Uuid,
    title: String,
  ) -> impl Future<Output = Result<Decision, Self::Error>> + Send + '_;

  fn get_decision(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Decision>, Self::Error>> + Send + '_;

  /// Decisions of a project, oldest first.
  fn list_decisions(
    &self,
    project_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Decision>, Self::Error>> + Send + '_;

  /// Decisions of a project with their per-status record counts, oldest
  /// first. With `status`, only decisions holding at least one record in
  /// that status are returned.
  fn list_decision_summaries(
    &self,
    project_id: Uuid,
    status: Option<RecordStatus>,
  ) -> impl Future<Output = Result<Vec<DecisionSummary>, Self::Error>> + Send + '_;

  /// Decisions of a project that currently have an accepted record, paired
  /// with that record.
  fn list_accepted_decisions(
    &self,
    project_id: Uuid,
  ) -> impl Future<Output = Result<Vec<AcceptedDecision>, Self::Error>> + Send + '_;

  fn rename_decision(
    &self,
    id: Uuid,
    title: String,
  ) -> impl Future<Output = Result<Decision, Self::Error>> + Send + '_;

  /// Delete a decision together with its records and their history.
  /// Returns `false` if it did not exist.
  fn delete_decision(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Records ───────────────────────────────────────────────────────────

  /// Create a record at version 1, writing its creation history row and
  /// its version-1 snapshot.
  fn create_record(
    &self,
    input: NewRecord,
  ) -> impl Future<Output = Result<DecisionRecord, Self::Error>> + Send + '_;

  fn get_record(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<DecisionRecord>, Self::Error>> + Send + '_;

  /// Records of a decision, oldest first.
  fn list_records(
    &self,
    decision_id: Uuid,
  ) -> impl Future<Output = Result<Vec<DecisionRecord>, Self::Error>> + Send + '_;

  /// Every record of every decision in a project, grouped by decision in
  /// decision order, each tagged with its decision's title.
  fn list_project_records(
    &self,
    project_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ProjectRecord>, Self::Error>> + Send + '_;

  /// Delete a record and everything hanging off it. Returns `false` if it
  /// did not exist.
  fn delete_record(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Apply a partial content update.
  ///
  /// A patch that changes nothing is a true no-op. Otherwise the current
  /// version is snapshotted (if not already), the version is bumped and a
  /// changelog entry is written.
  fn update_content(
    &self,
    record_id: Uuid,
    patch: ContentPatch,
  ) -> impl Future<Output = Result<DecisionRecord, Self::Error>> + Send + '_;

  /// Validate and apply a status transition, cascading to sibling records
  /// where the single-accepted / single-implemented rules require it.
  fn change_status(
    &self,
    change: StatusChange,
  ) -> impl Future<Output = Result<StatusChangeOutcome, Self::Error>> + Send + '_;

  /// Status history of a record, newest first.
  fn get_status_history(
    &self,
    record_id: Uuid,
  ) -> impl Future<Output = Result<Vec<StatusHistory>, Self::Error>> + Send + '_;

  // ── Versioning ────────────────────────────────────────────────────────

  /// Stored snapshots of a record, newest version first. The live version
  /// appears only once something has superseded it.
  fn get_record_versions(
    &self,
    record_id: Uuid,
  ) -> impl Future<Output = Result<Vec<RecordVersion>, Self::Error>> + Send + '_;

  /// The snapshot stored for `version`. Never the live row: the live version
  /// has no snapshot until something supersedes it.
  fn get_at_version(
    &self,
    record_id: Uuid,
    version: u32,
  ) -> impl Future<Output = Result<RecordVersion, Self::Error>> + Send + '_;

  /// Changelog of a record, newest first.
  fn get_changelog(
    &self,
    record_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ChangelogEntry>, Self::Error>> + Send + '_;

  /// Compare two states of a record. [`VersionRef::Current`] reads the live
  /// row instead of the snapshot table, as does a number equal to the live
  /// version that has not been snapshotted yet.
  fn diff(
    &self,
    record_id: Uuid,
    from: VersionRef,
    to: VersionRef,
  ) -> impl Future<Output = Result<VersionDiff, Self::Error>> + Send + '_;

  /// Restore the stored snapshot of `version` as a new version. The version
  /// counter only ever moves forward. A version with no snapshot, including
  /// the live one, fails with a not-found error.
  fn revert_to_version(
    &self,
    record_id: Uuid,
    version: u32,
    reason: Option<String>,
  ) -> impl Future<Output = Result<DecisionRecord, Self::Error>> + Send + '_;

  // ── Record relationships ──────────────────────────────────────────────

  fn create_relationship(
    &self,
    input: NewRelationship,
  ) -> impl Future<Output = Result<Relationship, Self::Error>> + Send + '_;

  fn list_relationships(
    &self,
    record_id: Uuid,
  ) -> impl Future<Output = Result<RecordRelationships, Self::Error>> + Send + '_;

  /// The single edge from `source` to `target`, optionally of a given type.
  /// Fails if more than one edge matches.
  fn find_relationship(
    &self,
    source: Uuid,
    target: Uuid,
    kind: Option<RelationshipType>,
  ) -> impl Future<Output = Result<Option<Relationship>, Self::Error>> + Send + '_;

  fn update_relationship(
    &self,
    id: Uuid,
    update: RelationshipUpdate,
  ) -> impl Future<Output = Result<Relationship, Self::Error>> + Send + '_;

  fn delete_relationship(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Decision relationships ────────────────────────────────────────────

  fn create_decision_relationship(
    &self,
    input: NewDecisionRelationship,
  ) -> impl Future<Output = Result<DecisionRelationship, Self::Error>> + Send + '_;

  fn list_decision_relationships(
    &self,
    decision_id: Uuid,
  ) -> impl Future<Output = Result<DecisionRelationships, Self::Error>> + Send + '_;

  fn update_decision_relationship(
    &self,
    id: Uuid,
    update: RelationshipUpdate,
  ) -> impl Future<Output = Result<DecisionRelationship, Self::Error>> + Send + '_;

  fn delete_decision_relationship(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Projections ───────────────────────────────────────────────────────

  /// Creation, status and content events of every record of a decision,
  /// newest first.
  fn get_timeline(
    &self,
    decision_id: Uuid,
  ) -> impl Future<Output = Result<Timeline, Self::Error>> + Send + '_;

  fn get_implementation_history(
    &self,
    decision_id: Uuid,
  ) -> impl Future<Output = Result<ImplementationHistory, Self::Error>> + Send + '_;
}
