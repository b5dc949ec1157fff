//! [`SqliteStore`]: the SQLite implementation of [`DecisionStore`].

use std::path::Path;

use chrono::{DateTime, SubsecRound as _, Utc};
use curio_core::{
  Error as CoreError,
  conflict::{TransitionPlan, check_initial_status, plan_status_change},
  decision::{
    AcceptedDecision,
    Decision,
    DecisionSummary,
    NewProject,
    Project,
    ProjectRecord,
    ProjectUpdate,
    require_text,
  },
  record::{
    ContentField,
    ContentPatch,
    DecisionRecord,
    NewRecord,
    RecordContent,
    RecordStatus,
  },
  relationship::{
    DecisionRelationship,
    DecisionRelationships,
    NewDecisionRelationship,
    NewRelationship,
    RecordRelationships,
    Relationship,
    RelationshipType,
    RelationshipUpdate,
    select_unique,
  },
  status::{StatusChange, StatusChangeOutcome, StatusHistory, TransitionTable},
  store::DecisionStore,
  timeline::{self, ImplementationHistory, Timeline},
  version::{
    ChangelogEntry,
    ContentChanges,
    RecordVersion,
    VersionDiff,
    VersionRef,
    apply_changes,
    diff_content,
    diff_patch,
    revert_summary,
    update_summary,
  },
};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{Result, queries, schema::SCHEMA};

const INITIAL_REASON: &str = "Initial creation";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Curio decision store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `op` inside a `BEGIN IMMEDIATE` transaction.
  ///
  /// The write lock is taken before the first read, so two writers can never
  /// both observe the same pre-state. The transaction commits only if `op`
  /// succeeds; on error it is dropped and rolls back. `op` receives the one
  /// timestamp every row written by this operation carries.
  async fn write<T, F>(&self, op: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Transaction<'_>, DateTime<Utc>) -> Result<T> + Send + 'static,
  {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let now = Utc::now().trunc_subsecs(6);
        let out = op(&tx, now);
        if out.is_ok() {
          tx.commit()?;
        }
        Ok(out)
      })
      .await?
  }

  /// Run `op` inside a deferred transaction, giving multi-query reads one
  /// consistent view.
  async fn read<T, F>(&self, op: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
  {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        Ok(op(&tx))
      })
      .await?
  }
}

/// Apply every step of a plan: cascades first, then the primary transition,
/// then the `superseded_by` edges.
fn apply_plan(tx: &Connection, plan: &TransitionPlan, at: DateTime<Utc>) -> Result<()> {
  for step in plan.cascades.iter().chain([&plan.primary]) {
    queries::set_status(tx, step.record_id, step.to, at)?;
    queries::insert_history(tx, &StatusHistory {
      id:          Uuid::new_v4(),
      record_id:   step.record_id,
      from_status: Some(step.from),
      to_status:   step.to,
      reason:      step.reason.clone(),
      metadata:    step.metadata.clone(),
      changed_at:  at,
    })?;
  }
  for edge in &plan.edges {
    queries::insert_relationship(tx, &Relationship {
      id:                Uuid::new_v4(),
      source_record_id:  edge.source_record_id,
      target_record_id:  edge.target_record_id,
      relationship_type: edge.relationship_type,
      description:       edge.description.clone(),
      created_at:        at,
    })?;
  }
  Ok(())
}

/// Snapshot `current`, move its live row to `content` as the next version and
/// log the change. Returns the new live record and its changelog entry.
fn advance_version(
  tx: &Connection,
  current: &DecisionRecord,
  content: RecordContent,
  summary: impl FnOnce(&ContentChanges) -> String,
  at: DateTime<Utc>,
) -> Result<(DecisionRecord, ChangelogEntry)> {
  queries::ensure_snapshot(tx, current, at)?;

  let changes = diff_content(&current.content, &content);
  let updated = DecisionRecord {
    content,
    version: current.version + 1,
    updated_at: at,
    ..current.clone()
  };
  queries::write_content(tx, &updated)?;

  let entry = ChangelogEntry {
    id:           Uuid::new_v4(),
    record_id:    current.id,
    from_version: current.version,
    to_version:   updated.version,
    summary:      summary(&changes),
    changes,
    changed_at:   at,
  };
  queries::insert_changelog(tx, &entry)?;
  Ok((updated, entry))
}

// ─── DecisionStore impl ──────────────────────────────────────────────────────

impl DecisionStore for SqliteStore {
  type Error = crate::Error;

  // ── Projects ──────────────────────────────────────────────────────────────

  async fn create_project(&self, input: NewProject) -> Result<Project> {
    require_text("name", &input.name)?;

    let project = self
      .write(move |tx, now| {
        if queries::project_by_name(tx, &input.name)?.is_some() {
          return Err(
            CoreError::Validation(format!("project {:?} already exists", input.name))
              .into(),
          );
        }
        let project = Project {
          id:          Uuid::new_v4(),
          name:        input.name,
          description: input.description,
          created_at:  now,
          updated_at:  now,
        };
        queries::insert_project(tx, &project)?;
        Ok(project)
      })
      .await?;

    debug!(project = %project.id, name = %project.name, "created project");
    Ok(project)
  }

  async fn get_project(&self, id: Uuid) -> Result<Option<Project>> {
    self.read(move |conn| queries::project(conn, id)).await
  }

  async fn get_project_by_name(&self, name: String) -> Result<Option<Project>> {
    self
      .read(move |conn| queries::project_by_name(conn, &name))
      .await
  }

  async fn list_projects(&self) -> Result<Vec<Project>> {
    self.read(queries::projects).await
  }

  async fn update_project(&self, id: Uuid, update: ProjectUpdate) -> Result<Project> {
    update.validate()?;

    let project = self
      .write(move |tx, now| {
        let mut project = queries::require_project(tx, id)?;
        if let Some(name) = update.name.as_deref()
          && name != project.name
          && queries::project_by_name(tx, name)?.is_some()
        {
          return Err(
            CoreError::Validation(format!("project {name:?} already exists")).into(),
          );
        }
        update.apply(&mut project);
        project.updated_at = now;
        queries::update_project(tx, &project)?;
        Ok(project)
      })
      .await?;

    debug!(project = %id, name = %project.name, "updated project");
    Ok(project)
  }

  async fn delete_project(&self, id: Uuid) -> Result<bool> {
    let deleted = self
      .write(move |tx, _| queries::delete_by_id(tx, "projects", "project_id", id))
      .await?;
    if deleted {
      debug!(project = %id, "deleted project");
    }
    Ok(deleted)
  }

  // ── Decisions ─────────────────────────────────────────────────────────────

  async fn create_decision(&self, project_id: Uuid, title: String) -> Result<Decision> {
    require_text("title", &title)?;

    let decision = self
      .write(move |tx, now| {
        queries::require_project(tx, project_id)?;
        let decision = Decision {
          id: Uuid::new_v4(),
          project_id,
          title,
          created_at: now,
          updated_at: now,
        };
        queries::insert_decision(tx, &decision)?;
        Ok(decision)
      })
      .await?;

    debug!(decision = %decision.id, project = %project_id, "created decision");
    Ok(decision)
  }

  async fn get_decision(&self, id: Uuid) -> Result<Option<Decision>> {
    self.read(move |conn| queries::decision(conn, id)).await
  }

  async fn list_decisions(&self, project_id: Uuid) -> Result<Vec<Decision>> {
    self
      .read(move |conn| {
        queries::require_project(conn, project_id)?;
        queries::decisions_of(conn, project_id)
      })
      .await
  }

  async fn list_decision_summaries(
    &self,
    project_id: Uuid,
    status: Option<RecordStatus>,
  ) -> Result<Vec<DecisionSummary>> {
    self
      .read(move |conn| {
        queries::require_project(conn, project_id)?;
        let mut summaries = Vec::new();
        for decision in queries::decisions_of(conn, project_id)? {
          let records = queries::records_of(conn, decision.id)?;
          let summary = DecisionSummary::new(decision, &records);
          if status.is_none_or(|s| summary.has_status(s)) {
            summaries.push(summary);
          }
        }
        Ok(summaries)
      })
      .await
  }

  async fn list_accepted_decisions(&self, project_id: Uuid) -> Result<Vec<AcceptedDecision>> {
    self
      .read(move |conn| {
        queries::require_project(conn, project_id)?;
        let mut accepted = Vec::new();
        for decision in queries::decisions_of(conn, project_id)? {
          let records = queries::records_of(conn, decision.id)?;
          accepted.extend(AcceptedDecision::find(decision, records));
        }
        Ok(accepted)
      })
      .await
  }

  async fn rename_decision(&self, id: Uuid, title: String) -> Result<Decision> {
    require_text("title", &title)?;

    let decision = self
      .write(move |tx, now| {
        let mut decision = queries::require_decision(tx, id)?;
        decision.title = title;
        decision.updated_at = now;
        queries::rename_decision(tx, &decision)?;
        Ok(decision)
      })
      .await?;

    debug!(decision = %id, title = %decision.title, "renamed decision");
    Ok(decision)
  }

  async fn delete_decision(&self, id: Uuid) -> Result<bool> {
    let deleted = self
      .write(move |tx, _| queries::delete_by_id(tx, "decisions", "decision_id", id))
      .await?;
    if deleted {
      debug!(decision = %id, "deleted decision");
    }
    Ok(deleted)
  }

  // ── Records ───────────────────────────────────────────────────────────────

  async fn create_record(&self, input: NewRecord) -> Result<DecisionRecord> {
    let status = input.validate()?;

    let record = self
      .write(move |tx, now| {
        queries::require_decision(tx, input.decision_id)?;
        let siblings = queries::records_of(tx, input.decision_id)?;
        check_initial_status(input.decision_id, status, &siblings)?;

        let record = DecisionRecord {
          id: Uuid::new_v4(),
          decision_id: input.decision_id,
          status,
          content: input.content,
          version: 1,
          created_at: now,
          updated_at: now,
        };
        queries::insert_record(tx, &record)?;
        queries::insert_history(tx, &StatusHistory {
          id:          Uuid::new_v4(),
          record_id:   record.id,
          from_status: None,
          to_status:   status,
          reason:      Some(INITIAL_REASON.to_owned()),
          metadata:    None,
          changed_at:  now,
        })?;
        queries::ensure_snapshot(tx, &record, now)?;
        Ok(record)
      })
      .await?;

    debug!(
      record = %record.id,
      decision = %record.decision_id,
      status = %record.status,
      "created record"
    );
    Ok(record)
  }

  async fn get_record(&self, id: Uuid) -> Result<Option<DecisionRecord>> {
    self.read(move |conn| queries::record(conn, id)).await
  }

  async fn list_records(&self, decision_id: Uuid) -> Result<Vec<DecisionRecord>> {
    self
      .read(move |conn| {
        queries::require_decision(conn, decision_id)?;
        queries::records_of(conn, decision_id)
      })
      .await
  }

  async fn list_project_records(&self, project_id: Uuid) -> Result<Vec<ProjectRecord>> {
    self
      .read(move |conn| {
        queries::require_project(conn, project_id)?;
        queries::records_of_project(conn, project_id)
      })
      .await
  }

  async fn delete_record(&self, id: Uuid) -> Result<bool> {
    let deleted = self
      .write(move |tx, _| queries::delete_by_id(tx, "decision_records", "record_id", id))
      .await?;
    if deleted {
      debug!(record = %id, "deleted record");
    }
    Ok(deleted)
  }

  async fn update_content(
    &self,
    record_id: Uuid,
    patch: ContentPatch,
  ) -> Result<DecisionRecord> {
    if let Some(description) = patch.fields.get(ContentField::DecisionDescription) {
      require_text("decision_description", description)?;
    }

    let (record, entry) = self
      .write(move |tx, now| {
        let current = queries::require_record(tx, record_id)?;
        if let Some(expected) = patch.expected_version
          && expected != current.version
        {
          return Err(
            CoreError::VersionConflict { expected, actual: current.version }.into(),
          );
        }

        let changes = diff_patch(&current.content, &patch);
        if changes.is_empty() {
          return Ok((current, None));
        }

        let mut content = current.content.clone();
        apply_changes(&mut content, &changes);
        let (updated, entry) =
          advance_version(tx, &current, content, update_summary, now)?;
        Ok((updated, Some(entry)))
      })
      .await?;

    match entry {
      Some(entry) => debug!(
        record = %record_id,
        from = entry.from_version,
        to = entry.to_version,
        summary = %entry.summary,
        "updated record content"
      ),
      None => debug!(record = %record_id, "content update was a no-op"),
    }
    Ok(record)
  }

  async fn change_status(&self, change: StatusChange) -> Result<StatusChangeOutcome> {
    let new_status = RecordStatus::parse(&change.new_status)?;

    let (plan, record) = self
      .write(move |tx, now| {
        let target = queries::require_record(tx, change.record_id)?;
        let siblings = queries::records_of(tx, target.decision_id)?;
        let plan = plan_status_change(
          TransitionTable::standard(),
          &target,
          &siblings,
          new_status,
          change.reason,
          change.auto_handle_conflicts,
        )?;
        apply_plan(tx, &plan, now)?;
        let record = queries::require_record(tx, target.id)?;
        Ok((plan, record))
      })
      .await?;

    for cascade in &plan.cascades {
      info!(
        record = %cascade.record_id,
        from = %cascade.from,
        to = %cascade.to,
        triggered_by = %plan.primary.record_id,
        decision = %plan.decision_id,
        "automatically transitioned sibling record"
      );
    }
    debug!(
      record = %record.id,
      from = %plan.primary.from,
      to = %plan.primary.to,
      "changed record status"
    );

    Ok(StatusChangeOutcome {
      message: plan.message(),
      affected_records: plan.affected_records(),
      record,
    })
  }

  async fn get_status_history(&self, record_id: Uuid) -> Result<Vec<StatusHistory>> {
    self
      .read(move |conn| {
        queries::require_record(conn, record_id)?;
        queries::history_of_record(conn, record_id)
      })
      .await
  }

  // ── Versioning ────────────────────────────────────────────────────────────

  async fn get_record_versions(&self, record_id: Uuid) -> Result<Vec<RecordVersion>> {
    self
      .read(move |conn| {
        queries::require_record(conn, record_id)?;
        queries::snapshots_of(conn, record_id)
      })
      .await
  }

  async fn get_at_version(&self, record_id: Uuid, version: u32) -> Result<RecordVersion> {
    self
      .read(move |conn| {
        queries::require_record(conn, record_id)?;
        queries::snapshot(conn, record_id, version)?
          .ok_or_else(|| CoreError::VersionNotFound { record_id, version }.into())
      })
      .await
  }

  async fn get_changelog(&self, record_id: Uuid) -> Result<Vec<ChangelogEntry>> {
    self
      .read(move |conn| {
        queries::require_record(conn, record_id)?;
        queries::changelog_of_record(conn, record_id)
      })
      .await
  }

  async fn diff(
    &self,
    record_id: Uuid,
    from: VersionRef,
    to: VersionRef,
  ) -> Result<VersionDiff> {
    self
      .read(move |conn| {
        let live = queries::require_record(conn, record_id)?;
        let resolve = |side: VersionRef| -> Result<_> {
          match side {
            VersionRef::Current => Ok((live.version, live.content.clone())),
            VersionRef::Number(n) => Ok((n, queries::content_at(conn, &live, n)?)),
          }
        };
        let (from_number, from_content) = resolve(from)?;
        let (to_number, to_content) = resolve(to)?;

        Ok(VersionDiff {
          record_id,
          from_version: from,
          from_version_number: from_number,
          to_version: to,
          to_version_number: to_number,
          changes: diff_content(&from_content, &to_content),
        })
      })
      .await
  }

  async fn revert_to_version(
    &self,
    record_id: Uuid,
    version: u32,
    reason: Option<String>,
  ) -> Result<DecisionRecord> {
    let (record, entry) = self
      .write(move |tx, now| {
        let current = queries::require_record(tx, record_id)?;
        let target = queries::snapshot(tx, record_id, version)?
          .ok_or(CoreError::VersionNotFound { record_id, version })?;
        let summary = reason.unwrap_or_else(|| revert_summary(version));
        advance_version(tx, &current, target.snapshot.content, |_| summary, now)
      })
      .await?;

    debug!(
      record = %record_id,
      reverted_to = version,
      new_version = entry.to_version,
      "reverted record"
    );
    Ok(record)
  }

  // ── Record relationships ──────────────────────────────────────────────────

  async fn create_relationship(&self, input: NewRelationship) -> Result<Relationship> {
    let relationship = self
      .write(move |tx, now| {
        queries::require_record(tx, input.source_record_id)?;
        queries::require_record(tx, input.target_record_id)?;
        let relationship = Relationship {
          id:                Uuid::new_v4(),
          source_record_id:  input.source_record_id,
          target_record_id:  input.target_record_id,
          relationship_type: input.relationship_type,
          description:       input.description,
          created_at:        now,
        };
        queries::insert_relationship(tx, &relationship)?;
        Ok(relationship)
      })
      .await?;

    debug!(
      relationship = %relationship.id,
      kind = %relationship.relationship_type,
      "created record relationship"
    );
    Ok(relationship)
  }

  async fn list_relationships(&self, record_id: Uuid) -> Result<RecordRelationships> {
    self
      .read(move |conn| {
        queries::require_record(conn, record_id)?;
        Ok(RecordRelationships {
          outgoing: queries::relationships_from(conn, record_id)?,
          incoming: queries::relationships_to(conn, record_id)?,
        })
      })
      .await
  }

  async fn find_relationship(
    &self,
    source: Uuid,
    target: Uuid,
    kind: Option<RelationshipType>,
  ) -> Result<Option<Relationship>> {
    let edges = self
      .read(move |conn| {
        let mut edges = queries::relationships_from(conn, source)?;
        edges.retain(|e| e.target_record_id == target);
        Ok(edges)
      })
      .await?;
    Ok(select_unique(edges, source, target, kind, |e| e.relationship_type)?)
  }

  async fn update_relationship(
    &self,
    id: Uuid,
    update: RelationshipUpdate,
  ) -> Result<Relationship> {
    let relationship = self
      .write(move |tx, _| {
        let mut relationship = queries::relationship(tx, id)?
          .ok_or(CoreError::RelationshipNotFound(id))?;
        if let Some(kind) = update.relationship_type {
          relationship.relationship_type = kind;
        }
        if let Some(description) = update.description {
          relationship.description = Some(description);
        }
        queries::update_relationship(tx, &relationship)?;
        Ok(relationship)
      })
      .await?;

    debug!(relationship = %id, "updated record relationship");
    Ok(relationship)
  }

  async fn delete_relationship(&self, id: Uuid) -> Result<bool> {
    self
      .write(move |tx, _| {
        queries::delete_by_id(tx, "record_relationships", "relationship_id", id)
      })
      .await
  }

  // ── Decision relationships ────────────────────────────────────────────────

  async fn create_decision_relationship(
    &self,
    input: NewDecisionRelationship,
  ) -> Result<DecisionRelationship> {
    input.validate()?;

    let relationship = self
      .write(move |tx, now| {
        queries::require_decision(tx, input.source_decision_id)?;
        queries::require_decision(tx, input.target_decision_id)?;
        let relationship = DecisionRelationship {
          id:                 Uuid::new_v4(),
          source_decision_id: input.source_decision_id,
          target_decision_id: input.target_decision_id,
          relationship_type:  input.relationship_type,
          description:        input.description,
          created_at:         now,
        };
        queries::insert_decision_relationship(tx, &relationship)?;
        Ok(relationship)
      })
      .await?;

    debug!(
      relationship = %relationship.id,
      kind = %relationship.relationship_type,
      "created decision relationship"
    );
    Ok(relationship)
  }

  async fn list_decision_relationships(
    &self,
    decision_id: Uuid,
  ) -> Result<DecisionRelationships> {
    self
      .read(move |conn| {
        queries::require_decision(conn, decision_id)?;
        Ok(DecisionRelationships {
          outgoing: queries::decision_relationships_from(conn, decision_id)?,
          incoming: queries::decision_relationships_to(conn, decision_id)?,
        })
      })
      .await
  }

  async fn update_decision_relationship(
    &self,
    id: Uuid,
    update: RelationshipUpdate,
  ) -> Result<DecisionRelationship> {
    self
      .write(move |tx, _| {
        let mut relationship = queries::decision_relationship(tx, id)?
          .ok_or(CoreError::RelationshipNotFound(id))?;
        if let Some(kind) = update.relationship_type {
          relationship.relationship_type = kind;
        }
        if let Some(description) = update.description {
          relationship.description = Some(description);
        }
        queries::update_decision_relationship(tx, &relationship)?;
        Ok(relationship)
      })
      .await
  }

  async fn delete_decision_relationship(&self, id: Uuid) -> Result<bool> {
    self
      .write(move |tx, _| {
        queries::delete_by_id(tx, "decision_relationships", "relationship_id", id)
      })
      .await
  }

  // ── Projections ───────────────────────────────────────────────────────────

  async fn get_timeline(&self, decision_id: Uuid) -> Result<Timeline> {
    self
      .read(move |conn| {
        let decision = queries::require_decision(conn, decision_id)?;
        let records = queries::records_of(conn, decision_id)?;
        let history = queries::history_of_decision(conn, decision_id)?;
        let changelog = queries::changelog_of_decision(conn, decision_id)?;
        Ok(timeline::project_timeline(&decision, &records, &history, &changelog))
      })
      .await
  }

  async fn get_implementation_history(
    &self,
    decision_id: Uuid,
  ) -> Result<ImplementationHistory> {
    self
      .read(move |conn| {
        let decision = queries::require_decision(conn, decision_id)?;
        let records = queries::records_of(conn, decision_id)?;
        let history = queries::history_of_decision(conn, decision_id)?;
        Ok(timeline::implementation_history(&decision, &records, &history))
      })
      .await
  }
}
