//! Synchronous row-level helpers.
//!
//! Everything here runs on the `tokio_rusqlite` connection thread, inside the
//! transaction opened by [`crate::SqliteStore`]. `Transaction` derefs to
//! `Connection`, so the same helpers serve reads and writes.

use chrono::{DateTime, Utc};
use curio_core::{
  Error as CoreError,
  decision::{Decision, Project, ProjectRecord},
  record::{DecisionRecord, RecordContent, RecordStatus},
  relationship::{DecisionRelationship, Relationship},
  status::StatusHistory,
  version::{ChangelogEntry, RecordVersion},
};
use rusqlite::{Connection, OptionalExtension as _, params};
use uuid::Uuid;

use crate::{
  Result,
  encode::{
    CHANGELOG_COLUMNS,
    DECISION_COLUMNS,
    DECISION_RELATIONSHIP_COLUMNS,
    HISTORY_COLUMNS,
    PROJECT_COLUMNS,
    RECORD_COLUMNS,
    RELATIONSHIP_COLUMNS,
    RawChangelog,
    RawDecision,
    RawEdge,
    RawHistory,
    RawProject,
    RawRecord,
    RawVersion,
    VERSION_COLUMNS,
    encode_changes,
    encode_dt,
    encode_metadata,
    encode_snapshot,
    encode_uuid,
  },
};

// ─── Projects ────────────────────────────────────────────────────────────────

pub fn project(conn: &Connection, id: Uuid) -> Result<Option<Project>> {
  conn
    .query_row(
      &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE project_id = ?1"),
      params![encode_uuid(id)],
      RawProject::from_row,
    )
    .optional()?
    .map(RawProject::into_project)
    .transpose()
}

pub fn project_by_name(conn: &Connection, name: &str) -> Result<Option<Project>> {
  conn
    .query_row(
      &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE name = ?1"),
      params![name],
      RawProject::from_row,
    )
    .optional()?
    .map(RawProject::into_project)
    .transpose()
}

pub fn require_project(conn: &Connection, id: Uuid) -> Result<Project> {
  project(conn, id)?.ok_or_else(|| CoreError::ProjectNotFound(id).into())
}

pub fn projects(conn: &Connection) -> Result<Vec<Project>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY created_at DESC, rowid DESC"
  ))?;
  let raws = stmt
    .query_map([], RawProject::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawProject::into_project).collect()
}

pub fn insert_project(conn: &Connection, p: &Project) -> Result<()> {
  conn.execute(
    "INSERT INTO projects (project_id, name, description, created_at, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?5)",
    params![
      encode_uuid(p.id),
      p.name,
      p.description,
      encode_dt(p.created_at),
      encode_dt(p.updated_at),
    ],
  )?;
  Ok(())
}

/// Write back a project's name, description and `updated_at`.
pub fn update_project(conn: &Connection, p: &Project) -> Result<()> {
  conn.execute(
    "UPDATE projects SET name = ?2, description = ?3, updated_at = ?4
     WHERE project_id = ?1",
    params![encode_uuid(p.id), p.name, p.description, encode_dt(p.updated_at)],
  )?;
  Ok(())
}

// ─── Decisions ───────────────────────────────────────────────────────────────

pub fn decision(conn: &Connection, id: Uuid) -> Result<Option<Decision>> {
  conn
    .query_row(
      &format!("SELECT {DECISION_COLUMNS} FROM decisions WHERE decision_id = ?1"),
      params![encode_uuid(id)],
      RawDecision::from_row,
    )
    .optional()?
    .map(RawDecision::into_decision)
    .transpose()
}

pub fn require_decision(conn: &Connection, id: Uuid) -> Result<Decision> {
  decision(conn, id)?.ok_or_else(|| CoreError::DecisionNotFound(id).into())
}

pub fn decisions_of(conn: &Connection, project_id: Uuid) -> Result<Vec<Decision>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {DECISION_COLUMNS} FROM decisions
     WHERE project_id = ?1
     ORDER BY created_at, rowid"
  ))?;
  let raws = stmt
    .query_map(params![encode_uuid(project_id)], RawDecision::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawDecision::into_decision).collect()
}

pub fn insert_decision(conn: &Connection, d: &Decision) -> Result<()> {
  conn.execute(
    "INSERT INTO decisions (decision_id, project_id, title, created_at, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?5)",
    params![
      encode_uuid(d.id),
      encode_uuid(d.project_id),
      d.title,
      encode_dt(d.created_at),
      encode_dt(d.updated_at),
    ],
  )?;
  Ok(())
}

pub fn rename_decision(conn: &Connection, d: &Decision) -> Result<()> {
  conn.execute(
    "UPDATE decisions SET title = ?2, updated_at = ?3 WHERE decision_id = ?1",
    params![encode_uuid(d.id), d.title, encode_dt(d.updated_at)],
  )?;
  Ok(())
}

// ─── Records ─────────────────────────────────────────────────────────────────

pub fn record(conn: &Connection, id: Uuid) -> Result<Option<DecisionRecord>> {
  conn
    .query_row(
      &format!("SELECT {RECORD_COLUMNS} FROM decision_records WHERE record_id = ?1"),
      params![encode_uuid(id)],
      RawRecord::from_row,
    )
    .optional()?
    .map(RawRecord::into_record)
    .transpose()
}

pub fn require_record(conn: &Connection, id: Uuid) -> Result<DecisionRecord> {
  record(conn, id)?.ok_or_else(|| CoreError::RecordNotFound(id).into())
}

/// Every record of a decision, oldest first.
pub fn records_of(conn: &Connection, decision_id: Uuid) -> Result<Vec<DecisionRecord>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {RECORD_COLUMNS} FROM decision_records
     WHERE decision_id = ?1
     ORDER BY created_at, rowid"
  ))?;
  let raws = stmt
    .query_map(params![encode_uuid(decision_id)], RawRecord::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawRecord::into_record).collect()
}

/// Every record of a project, in decision order and then record order.
pub fn records_of_project(conn: &Connection, project_id: Uuid) -> Result<Vec<ProjectRecord>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {RECORD_COLUMNS}, d.decision_title FROM decision_records
     JOIN (
       SELECT decision_id AS d_id, title AS decision_title,
              created_at AS d_created, rowid AS d_rowid
       FROM decisions WHERE project_id = ?1
     ) d ON d.d_id = decision_records.decision_id
     ORDER BY d.d_created, d.d_rowid, decision_records.created_at, decision_records.rowid"
  ))?;
  let raws = stmt
    .query_map(params![encode_uuid(project_id)], |row| {
      Ok((RawRecord::from_row(row)?, row.get::<_, String>(15)?))
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws
    .into_iter()
    .map(|(raw, decision_title)| {
      Ok(ProjectRecord { record: raw.into_record()?, decision_title })
    })
    .collect()
}

pub fn insert_record(conn: &Connection, r: &DecisionRecord) -> Result<()> {
  let c = &r.content;
  conn.execute(
    &format!(
      "INSERT INTO decision_records ({RECORD_COLUMNS})
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
    ),
    params![
      encode_uuid(r.id),
      encode_uuid(r.decision_id),
      r.status.as_ref(),
      c.context,
      c.constraints,
      c.decision_description,
      c.rationale,
      c.assumptions,
      c.consequences,
      c.tradeoffs,
      c.evidence,
      c.options_considered,
      r.version,
      encode_dt(r.created_at),
      encode_dt(r.updated_at),
    ],
  )?;
  Ok(())
}

/// Overwrite the content columns, version and `updated_at` of a live row.
pub fn write_content(conn: &Connection, r: &DecisionRecord) -> Result<()> {
  let c: &RecordContent = &r.content;
  conn.execute(
    "UPDATE decision_records SET
       context = ?2, constraints = ?3, decision_description = ?4,
       rationale = ?5, assumptions = ?6, consequences = ?7, tradeoffs = ?8,
       evidence = ?9, options_considered = ?10, version = ?11, updated_at = ?12
     WHERE record_id = ?1",
    params![
      encode_uuid(r.id),
      c.context,
      c.constraints,
      c.decision_description,
      c.rationale,
      c.assumptions,
      c.consequences,
      c.tradeoffs,
      c.evidence,
      c.options_considered,
      r.version,
      encode_dt(r.updated_at),
    ],
  )?;
  Ok(())
}

pub fn set_status(
  conn: &Connection,
  id: Uuid,
  status: RecordStatus,
  at: DateTime<Utc>,
) -> Result<()> {
  conn.execute(
    "UPDATE decision_records SET status = ?2, updated_at = ?3 WHERE record_id = ?1",
    params![encode_uuid(id), status.as_ref(), encode_dt(at)],
  )?;
  Ok(())
}

// ─── Status history ──────────────────────────────────────────────────────────

pub fn insert_history(conn: &Connection, h: &StatusHistory) -> Result<()> {
  conn.execute(
    "INSERT INTO status_history
       (history_id, record_id, from_status, to_status, reason, metadata, changed_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    params![
      encode_uuid(h.id),
      encode_uuid(h.record_id),
      h.from_status.map(|s| s.to_string()),
      h.to_status.as_ref(),
      h.reason,
      encode_metadata(h.metadata.as_ref())?,
      encode_dt(h.changed_at),
    ],
  )?;
  Ok(())
}

/// Newest first; rows of one transaction share a timestamp, so insertion
/// order breaks the tie.
pub fn history_of_record(conn: &Connection, record_id: Uuid) -> Result<Vec<StatusHistory>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {HISTORY_COLUMNS} FROM status_history h
     WHERE h.record_id = ?1
     ORDER BY h.changed_at DESC, h.rowid DESC"
  ))?;
  let raws = stmt
    .query_map(params![encode_uuid(record_id)], RawHistory::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawHistory::into_history).collect()
}

pub fn history_of_decision(
  conn: &Connection,
  decision_id: Uuid,
) -> Result<Vec<StatusHistory>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {HISTORY_COLUMNS} FROM status_history h
     JOIN decision_records r ON r.record_id = h.record_id
     WHERE r.decision_id = ?1
     ORDER BY h.changed_at DESC, h.rowid DESC"
  ))?;
  let raws = stmt
    .query_map(params![encode_uuid(decision_id)], RawHistory::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawHistory::into_history).collect()
}

// ─── Snapshots ───────────────────────────────────────────────────────────────

/// Snapshot the record at its current version unless one already exists.
/// An existing row is authoritative and is left untouched.
pub fn ensure_snapshot(conn: &Connection, r: &DecisionRecord, at: DateTime<Utc>) -> Result<bool> {
  let inserted = conn.execute(
    "INSERT INTO record_versions (version_id, record_id, version, snapshot, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5)
     ON CONFLICT (record_id, version) DO NOTHING",
    params![
      encode_uuid(Uuid::new_v4()),
      encode_uuid(r.id),
      r.version,
      encode_snapshot(r)?,
      encode_dt(at),
    ],
  )?;
  Ok(inserted > 0)
}

pub fn snapshot(conn: &Connection, record_id: Uuid, version: u32) -> Result<Option<RecordVersion>> {
  conn
    .query_row(
      &format!(
        "SELECT {VERSION_COLUMNS} FROM record_versions
         WHERE record_id = ?1 AND version = ?2"
      ),
      params![encode_uuid(record_id), version],
      RawVersion::from_row,
    )
    .optional()?
    .map(RawVersion::into_version)
    .transpose()
}

pub fn snapshots_of(conn: &Connection, record_id: Uuid) -> Result<Vec<RecordVersion>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {VERSION_COLUMNS} FROM record_versions
     WHERE record_id = ?1
     ORDER BY version DESC"
  ))?;
  let raws = stmt
    .query_map(params![encode_uuid(record_id)], RawVersion::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawVersion::into_version).collect()
}

/// Content of `record` as it was at `version`: the stored snapshot, or the
/// live row if `version` is the live version and not yet snapshotted.
pub fn content_at(
  conn: &Connection,
  record: &DecisionRecord,
  version: u32,
) -> Result<RecordContent> {
  if let Some(v) = snapshot(conn, record.id, version)? {
    return Ok(v.snapshot.content);
  }
  if version == record.version {
    return Ok(record.content.clone());
  }
  Err(CoreError::VersionNotFound { record_id: record.id, version }.into())
}

// ─── Changelog ───────────────────────────────────────────────────────────────

pub fn insert_changelog(conn: &Connection, e: &ChangelogEntry) -> Result<()> {
  conn.execute(
    "INSERT INTO changelog
       (entry_id, record_id, from_version, to_version, changes, summary, changed_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    params![
      encode_uuid(e.id),
      encode_uuid(e.record_id),
      e.from_version,
      e.to_version,
      encode_changes(&e.changes)?,
      e.summary,
      encode_dt(e.changed_at),
    ],
  )?;
  Ok(())
}

pub fn changelog_of_record(conn: &Connection, record_id: Uuid) -> Result<Vec<ChangelogEntry>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {CHANGELOG_COLUMNS} FROM changelog c
     WHERE c.record_id = ?1
     ORDER BY c.changed_at DESC, c.to_version DESC"
  ))?;
  let raws = stmt
    .query_map(params![encode_uuid(record_id)], RawChangelog::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawChangelog::into_entry).collect()
}

pub fn changelog_of_decision(
  conn: &Connection,
  decision_id: Uuid,
) -> Result<Vec<ChangelogEntry>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {CHANGELOG_COLUMNS} FROM changelog c
     JOIN decision_records r ON r.record_id = c.record_id
     WHERE r.decision_id = ?1
     ORDER BY c.changed_at DESC, c.rowid DESC"
  ))?;
  let raws = stmt
    .query_map(params![encode_uuid(decision_id)], RawChangelog::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawChangelog::into_entry).collect()
}

// ─── Record relationships ────────────────────────────────────────────────────

pub fn insert_relationship(conn: &Connection, r: &Relationship) -> Result<()> {
  conn.execute(
    &format!(
      "INSERT INTO record_relationships ({RELATIONSHIP_COLUMNS})
       VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
    ),
    params![
      encode_uuid(r.id),
      encode_uuid(r.source_record_id),
      encode_uuid(r.target_record_id),
      r.relationship_type.as_ref(),
      r.description,
      encode_dt(r.created_at),
    ],
  )?;
  Ok(())
}

pub fn relationship(conn: &Connection, id: Uuid) -> Result<Option<Relationship>> {
  conn
    .query_row(
      &format!(
        "SELECT {RELATIONSHIP_COLUMNS} FROM record_relationships
         WHERE relationship_id = ?1"
      ),
      params![encode_uuid(id)],
      RawEdge::from_row,
    )
    .optional()?
    .map(RawEdge::into_relationship)
    .transpose()
}

/// Edges whose `column` equals `record_id`, oldest first.
fn relationships_where(
  conn: &Connection,
  column: &str,
  record_id: Uuid,
) -> Result<Vec<Relationship>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {RELATIONSHIP_COLUMNS} FROM record_relationships
     WHERE {column} = ?1
     ORDER BY created_at, rowid"
  ))?;
  let raws = stmt
    .query_map(params![encode_uuid(record_id)], RawEdge::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawEdge::into_relationship).collect()
}

pub fn relationships_from(conn: &Connection, record_id: Uuid) -> Result<Vec<Relationship>> {
  relationships_where(conn, "source_record_id", record_id)
}

pub fn relationships_to(conn: &Connection, record_id: Uuid) -> Result<Vec<Relationship>> {
  relationships_where(conn, "target_record_id", record_id)
}

pub fn update_relationship(conn: &Connection, r: &Relationship) -> Result<()> {
  conn.execute(
    "UPDATE record_relationships SET relationship_type = ?2, description = ?3
     WHERE relationship_id = ?1",
    params![encode_uuid(r.id), r.relationship_type.as_ref(), r.description],
  )?;
  Ok(())
}

// ─── Decision relationships ──────────────────────────────────────────────────

pub fn insert_decision_relationship(
  conn: &Connection,
  r: &DecisionRelationship,
) -> Result<()> {
  conn.execute(
    &format!(
      "INSERT INTO decision_relationships ({DECISION_RELATIONSHIP_COLUMNS})
       VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
    ),
    params![
      encode_uuid(r.id),
      encode_uuid(r.source_decision_id),
      encode_uuid(r.target_decision_id),
      r.relationship_type.as_ref(),
      r.description,
      encode_dt(r.created_at),
    ],
  )?;
  Ok(())
}

pub fn decision_relationship(
  conn: &Connection,
  id: Uuid,
) -> Result<Option<DecisionRelationship>> {
  conn
    .query_row(
      &format!(
        "SELECT {DECISION_RELATIONSHIP_COLUMNS} FROM decision_relationships
         WHERE relationship_id = ?1"
      ),
      params![encode_uuid(id)],
      RawEdge::from_row,
    )
    .optional()?
    .map(RawEdge::into_decision_relationship)
    .transpose()
}

fn decision_relationships_where(
  conn: &Connection,
  column: &str,
  decision_id: Uuid,
) -> Result<Vec<DecisionRelationship>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {DECISION_RELATIONSHIP_COLUMNS} FROM decision_relationships
     WHERE {column} = ?1
     ORDER BY created_at, rowid"
  ))?;
  let raws = stmt
    .query_map(params![encode_uuid(decision_id)], RawEdge::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawEdge::into_decision_relationship).collect()
}

pub fn decision_relationships_from(
  conn: &Connection,
  decision_id: Uuid,
) -> Result<Vec<DecisionRelationship>> {
  decision_relationships_where(conn, "source_decision_id", decision_id)
}

pub fn decision_relationships_to(
  conn: &Connection,
  decision_id: Uuid,
) -> Result<Vec<DecisionRelationship>> {
  decision_relationships_where(conn, "target_decision_id", decision_id)
}

pub fn update_decision_relationship(
  conn: &Connection,
  r: &DecisionRelationship,
) -> Result<()> {
  conn.execute(
    "UPDATE decision_relationships SET relationship_type = ?2, description = ?3
     WHERE relationship_id = ?1",
    params![encode_uuid(r.id), r.relationship_type.as_ref(), r.description],
  )?;
  Ok(())
}

// ─── Deletes ─────────────────────────────────────────────────────────────────

/// Delete one row by primary key; foreign keys cascade to dependents.
/// Returns whether a row existed.
pub fn delete_by_id(conn: &Connection, table: &str, key: &str, id: Uuid) -> Result<bool> {
  let n = conn.execute(
    &format!("DELETE FROM {table} WHERE {key} = ?1"),
    params![encode_uuid(id)],
  )?;
  Ok(n > 0)
}
