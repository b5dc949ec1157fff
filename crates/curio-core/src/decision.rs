//! Projects and decisions: the containers that records live under.
//!
//! A decision is a named topic. Its identity never changes; only its title
//! does. All lifecycle state lives on the records it owns.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error,
  Result,
  record::{DecisionRecord, RecordStatus},
};

/// A named collection of decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
  pub id:          Uuid,
  /// Unique across the store.
  pub name:        String,
  pub description: Option<String>,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

/// Input to [`crate::store::DecisionStore::create_project`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewProject {
  pub name:        String,
  pub description: Option<String>,
}

impl NewProject {
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into(), description: None }
  }
}

/// Partial update of a project. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectUpdate {
  pub name:        Option<String>,
  pub description: Option<String>,
}

impl ProjectUpdate {
  pub fn validate(&self) -> Result<()> {
    match &self.name {
      Some(name) => require_text("name", name),
      None => Ok(()),
    }
  }

  pub fn apply(self, project: &mut Project) {
    if let Some(name) = self.name {
      project.name = name;
    }
    if let Some(description) = self.description {
      project.description = Some(description);
    }
  }
}

/// A topic requiring a choice. Owns zero or more decision records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
  pub id:         Uuid,
  pub project_id: Uuid,
  pub title:      String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

// ─── Project-level views ─────────────────────────────────────────────────────

/// A decision with per-status counts of its records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionSummary {
  #[serde(flatten)]
  pub decision:      Decision,
  pub record_count:  usize,
  /// Only statuses that occur are present.
  pub status_counts: BTreeMap<RecordStatus, usize>,
}

impl DecisionSummary {
  pub fn new(decision: Decision, records: &[DecisionRecord]) -> Self {
    let mut status_counts = BTreeMap::new();
    for record in records {
      *status_counts.entry(record.status).or_insert(0) += 1;
    }
    Self { decision, record_count: records.len(), status_counts }
  }

  /// Whether at least one record of the decision has `status`.
  pub fn has_status(&self, status: RecordStatus) -> bool {
    self.status_counts.contains_key(&status)
  }
}

/// A record listed across a whole project, tagged with its decision's title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
  #[serde(flatten)]
  pub record:         DecisionRecord,
  pub decision_title: String,
}

/// A decision whose accepted record is ready to implement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedDecision {
  pub decision:        Decision,
  pub accepted_record: DecisionRecord,
}

impl AcceptedDecision {
  /// Pair `decision` with its accepted record, if it has one.
  pub fn find(decision: Decision, records: Vec<DecisionRecord>) -> Option<Self> {
    records
      .into_iter()
      .find(|r| r.status == RecordStatus::Accepted)
      .map(|accepted_record| Self { decision, accepted_record })
  }
}

/// Reject empty or whitespace-only required text.
pub fn require_text(field: &str, value: &str) -> Result<()> {
  if value.trim().is_empty() {
    return Err(Error::Validation(format!("{field} must not be empty")));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn blank_text_is_rejected() {
    assert!(matches!(require_text("title", "  \n"), Err(Error::Validation(_))));
    assert!(require_text("title", "Database engine").is_ok());
  }

  fn record(decision_id: Uuid, status: RecordStatus) -> DecisionRecord {
    let now = Utc::now();
    DecisionRecord {
      id: Uuid::new_v4(),
      decision_id,
      status,
      content: Default::default(),
      version: 1,
      created_at: now,
      updated_at: now,
    }
  }

  fn decision() -> Decision {
    let now = Utc::now();
    Decision {
      id:         Uuid::new_v4(),
      project_id: Uuid::new_v4(),
      title:      "Cache layer".into(),
      created_at: now,
      updated_at: now,
    }
  }

  #[test]
  fn summary_counts_each_status() {
    let d = decision();
    let records = [
      record(d.id, RecordStatus::Rejected),
      record(d.id, RecordStatus::Accepted),
      record(d.id, RecordStatus::Rejected),
    ];
    let summary = DecisionSummary::new(d, &records);
    assert_eq!(summary.record_count, 3);
    assert_eq!(summary.status_counts[&RecordStatus::Rejected], 2);
    assert!(summary.has_status(RecordStatus::Accepted));
    assert!(!summary.has_status(RecordStatus::Proposed));

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["title"], "Cache layer");
    assert_eq!(json["status_counts"]["rejected"], 2);
  }

  #[test]
  fn accepted_decision_needs_an_accepted_record() {
    let d = decision();
    let proposed = vec![record(d.id, RecordStatus::Proposed)];
    assert!(AcceptedDecision::find(d.clone(), proposed).is_none());

    let accepted = record(d.id, RecordStatus::Accepted);
    let found = AcceptedDecision::find(d, vec![accepted.clone()]).unwrap();
    assert_eq!(found.accepted_record, accepted);
  }

  #[test]
  fn blank_project_rename_is_rejected() {
    let update = ProjectUpdate { name: Some(" ".into()), description: None };
    assert!(matches!(update.validate(), Err(Error::Validation(_))));
  }
}
