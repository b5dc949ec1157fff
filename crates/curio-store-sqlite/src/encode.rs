//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings with a fixed microsecond
//! precision and a `Z` suffix, so lexical order equals chronological order
//! and `ORDER BY` on the text column is correct. Structured fields (status
//! metadata, changelog diffs, snapshots) are stored as compact JSON. UUIDs are
//! stored as hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, Utc};
use curio_core::{
  decision::{Decision, Project},
  record::{DecisionRecord, RecordContent, RecordStatus},
  relationship::{DecisionRelationship, Relationship, RelationshipType},
  status::{StatusChangeMetadata, StatusHistory},
  version::{ChangelogEntry, ContentChanges, RecordVersion},
};
use rusqlite::Row;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn decode_status(column: &'static str, s: &str) -> Result<RecordStatus> {
  s.parse().map_err(|_| Error::Decode { column, value: s.to_owned() })
}

pub fn decode_relationship_type(s: &str) -> Result<RelationshipType> {
  s.parse().map_err(|_| Error::Decode {
    column: "relationship_type",
    value:  s.to_owned(),
  })
}

// ─── JSON columns ────────────────────────────────────────────────────────────

pub fn encode_metadata(m: Option<&StatusChangeMetadata>) -> Result<Option<String>> {
  Ok(m.map(serde_json::to_string).transpose()?)
}

pub fn encode_changes(c: &ContentChanges) -> Result<String> {
  Ok(serde_json::to_string(c)?)
}

pub fn encode_snapshot(r: &DecisionRecord) -> Result<String> {
  Ok(serde_json::to_string(r)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const PROJECT_COLUMNS: &str =
  "project_id, name, description, created_at, updated_at";

/// Raw strings read directly from a `projects` row.
pub struct RawProject {
  pub project_id:  String,
  pub name:        String,
  pub description: Option<String>,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawProject {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      project_id:  row.get(0)?,
      name:        row.get(1)?,
      description: row.get(2)?,
      created_at:  row.get(3)?,
      updated_at:  row.get(4)?,
    })
  }

  pub fn into_project(self) -> Result<Project> {
    Ok(Project {
      id:          decode_uuid(&self.project_id)?,
      name:        self.name,
      description: self.description,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

pub const DECISION_COLUMNS: &str =
  "decision_id, project_id, title, created_at, updated_at";

/// Raw strings read directly from a `decisions` row.
pub struct RawDecision {
  pub decision_id: String,
  pub project_id:  String,
  pub title:       String,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawDecision {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      decision_id: row.get(0)?,
      project_id:  row.get(1)?,
      title:       row.get(2)?,
      created_at:  row.get(3)?,
      updated_at:  row.get(4)?,
    })
  }

  pub fn into_decision(self) -> Result<Decision> {
    Ok(Decision {
      id:         decode_uuid(&self.decision_id)?,
      project_id: decode_uuid(&self.project_id)?,
      title:      self.title,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

pub const RECORD_COLUMNS: &str = "record_id, decision_id, status, context, \
   constraints, decision_description, rationale, assumptions, consequences, \
   tradeoffs, evidence, options_considered, version, created_at, updated_at";

/// Raw values read directly from a `decision_records` row. Content columns
/// are plain nullable text and need no decoding.
pub struct RawRecord {
  pub record_id:   String,
  pub decision_id: String,
  pub status:      String,
  pub content:     RecordContent,
  pub version:     u32,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawRecord {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      record_id:   row.get(0)?,
      decision_id: row.get(1)?,
      status:      row.get(2)?,
      content:     RecordContent {
        context:              row.get(3)?,
        constraints:          row.get(4)?,
        decision_description: row.get(5)?,
        rationale:            row.get(6)?,
        assumptions:          row.get(7)?,
        consequences:         row.get(8)?,
        tradeoffs:            row.get(9)?,
        evidence:             row.get(10)?,
        options_considered:   row.get(11)?,
      },
      version:     row.get(12)?,
      created_at:  row.get(13)?,
      updated_at:  row.get(14)?,
    })
  }

  pub fn into_record(self) -> Result<DecisionRecord> {
    Ok(DecisionRecord {
      id:          decode_uuid(&self.record_id)?,
      decision_id: decode_uuid(&self.decision_id)?,
      status:      decode_status("status", &self.status)?,
      content:     self.content,
      version:     self.version,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

pub const HISTORY_COLUMNS: &str = "h.history_id, h.record_id, h.from_status, \
   h.to_status, h.reason, h.metadata, h.changed_at";

/// Raw strings read directly from a `status_history` row.
pub struct RawHistory {
  pub history_id:  String,
  pub record_id:   String,
  pub from_status: Option<String>,
  pub to_status:   String,
  pub reason:      Option<String>,
  pub metadata:    Option<String>,
  pub changed_at:  String,
}

impl RawHistory {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      history_id:  row.get(0)?,
      record_id:   row.get(1)?,
      from_status: row.get(2)?,
      to_status:   row.get(3)?,
      reason:      row.get(4)?,
      metadata:    row.get(5)?,
      changed_at:  row.get(6)?,
    })
  }

  pub fn into_history(self) -> Result<StatusHistory> {
    Ok(StatusHistory {
      id:          decode_uuid(&self.history_id)?,
      record_id:   decode_uuid(&self.record_id)?,
      from_status: self
        .from_status
        .as_deref()
        .map(|s| decode_status("from_status", s))
        .transpose()?,
      to_status:   decode_status("to_status", &self.to_status)?,
      reason:      self.reason,
      metadata:    self
        .metadata
        .as_deref()
        .map(serde_json::from_str)
        .transpose()?,
      changed_at:  decode_dt(&self.changed_at)?,
    })
  }
}

pub const VERSION_COLUMNS: &str =
  "version_id, record_id, version, snapshot, created_at";

/// Raw values read directly from a `record_versions` row.
pub struct RawVersion {
  pub version_id: String,
  pub record_id:  String,
  pub version:    u32,
  pub snapshot:   String,
  pub created_at: String,
}

impl RawVersion {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      version_id: row.get(0)?,
      record_id:  row.get(1)?,
      version:    row.get(2)?,
      snapshot:   row.get(3)?,
      created_at: row.get(4)?,
    })
  }

  pub fn into_version(self) -> Result<RecordVersion> {
    Ok(RecordVersion {
      id:         decode_uuid(&self.version_id)?,
      record_id:  decode_uuid(&self.record_id)?,
      version:    self.version,
      snapshot:   serde_json::from_str(&self.snapshot)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub const CHANGELOG_COLUMNS: &str = "c.entry_id, c.record_id, c.from_version, \
   c.to_version, c.changes, c.summary, c.changed_at";

/// Raw values read directly from a `changelog` row.
pub struct RawChangelog {
  pub entry_id:     String,
  pub record_id:    String,
  pub from_version: u32,
  pub to_version:   u32,
  pub changes:      String,
  pub summary:      String,
  pub changed_at:   String,
}

impl RawChangelog {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      entry_id:     row.get(0)?,
      record_id:    row.get(1)?,
      from_version: row.get(2)?,
      to_version:   row.get(3)?,
      changes:      row.get(4)?,
      summary:      row.get(5)?,
      changed_at:   row.get(6)?,
    })
  }

  pub fn into_entry(self) -> Result<ChangelogEntry> {
    Ok(ChangelogEntry {
      id:           decode_uuid(&self.entry_id)?,
      record_id:    decode_uuid(&self.record_id)?,
      from_version: self.from_version,
      to_version:   self.to_version,
      changes:      serde_json::from_str(&self.changes)?,
      summary:      self.summary,
      changed_at:   decode_dt(&self.changed_at)?,
    })
  }
}

pub const RELATIONSHIP_COLUMNS: &str = "relationship_id, source_record_id, \
   target_record_id, relationship_type, description, created_at";

pub const DECISION_RELATIONSHIP_COLUMNS: &str = "relationship_id, \
   source_decision_id, target_decision_id, relationship_type, description, \
   created_at";

/// Raw strings read from either relationship table; both share one layout.
pub struct RawEdge {
  pub relationship_id:   String,
  pub source_id:         String,
  pub target_id:         String,
  pub relationship_type: String,
  pub description:       Option<String>,
  pub created_at:        String,
}

impl RawEdge {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      relationship_id:   row.get(0)?,
      source_id:         row.get(1)?,
      target_id:         row.get(2)?,
      relationship_type: row.get(3)?,
      description:       row.get(4)?,
      created_at:        row.get(5)?,
    })
  }

  pub fn into_relationship(self) -> Result<Relationship> {
    Ok(Relationship {
      id:                decode_uuid(&self.relationship_id)?,
      source_record_id:  decode_uuid(&self.source_id)?,
      target_record_id:  decode_uuid(&self.target_id)?,
      relationship_type: decode_relationship_type(&self.relationship_type)?,
      description:       self.description,
      created_at:        decode_dt(&self.created_at)?,
    })
  }

  pub fn into_decision_relationship(self) -> Result<DecisionRelationship> {
    Ok(DecisionRelationship {
      id:                 decode_uuid(&self.relationship_id)?,
      source_decision_id: decode_uuid(&self.source_id)?,
      target_decision_id: decode_uuid(&self.target_id)?,
      relationship_type:  decode_relationship_type(&self.relationship_type)?,
      description:        self.description,
      created_at:         decode_dt(&self.created_at)?,
    })
  }
}
