//! The status state machine and the append-only status history.
//!
//! Allowed transitions are data: a [`TransitionTable`] maps each status to
//! the statuses it may move to. Adding a status or an edge means editing
//! [`STANDARD_TRANSITIONS`], not the code that consults it.

use std::{
  collections::{BTreeMap, BTreeSet},
  sync::LazyLock,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, record::RecordStatus};

// ─── Transition table ────────────────────────────────────────────────────────

/// The edges of the standard lifecycle. `rejected` and `deprecated` have no
/// outbound edges; `implemented_inferred` is never a target.
pub const STANDARD_TRANSITIONS: &[(RecordStatus, &[RecordStatus])] = &[
  (RecordStatus::Proposed, &[RecordStatus::Accepted, RecordStatus::Rejected]),
  (
    RecordStatus::Accepted,
    &[
      RecordStatus::Implemented,
      RecordStatus::Rejected,
      RecordStatus::Deprecated,
    ],
  ),
  (RecordStatus::Implemented, &[RecordStatus::Deprecated]),
  (RecordStatus::ImplementedInferred, &[RecordStatus::Deprecated]),
  (RecordStatus::Rejected, &[]),
  (RecordStatus::Deprecated, &[]),
];

static STANDARD: LazyLock<TransitionTable> =
  LazyLock::new(|| TransitionTable::new(STANDARD_TRANSITIONS.iter().copied()));

/// A finite-state machine over [`RecordStatus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionTable {
  edges: BTreeMap<RecordStatus, BTreeSet<RecordStatus>>,
}

impl TransitionTable {
  pub fn new<'a>(
    edges: impl IntoIterator<Item = (RecordStatus, &'a [RecordStatus])>,
  ) -> Self {
    let edges = edges
      .into_iter()
      .map(|(from, to)| (from, to.iter().copied().collect()))
      .collect();
    Self { edges }
  }

  /// The lifecycle every store uses.
  pub fn standard() -> &'static Self { &STANDARD }

  pub fn allows(&self, from: RecordStatus, to: RecordStatus) -> bool {
    self.edges.get(&from).is_some_and(|targets| targets.contains(&to))
  }

  /// Statuses reachable from `from` in one step.
  pub fn targets(&self, from: RecordStatus) -> impl Iterator<Item = RecordStatus> + '_ {
    self.edges.get(&from).into_iter().flatten().copied()
  }

  pub fn is_terminal(&self, status: RecordStatus) -> bool {
    self.targets(status).next().is_none()
  }

  /// Fail with [`Error::InvalidTransition`] unless `from → to` is an edge.
  pub fn check(&self, from: RecordStatus, to: RecordStatus) -> Result<()> {
    if self.allows(from, to) {
      Ok(())
    } else {
      Err(Error::InvalidTransition { from, to })
    }
  }
}

// ─── History ─────────────────────────────────────────────────────────────────

/// Whether a transition was requested by a caller or made by the system to
/// keep a decision's invariants intact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
  #[default]
  Manual,
  Automatic,
}

/// Structured provenance attached to a status history row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChangeMetadata {
  pub change_type:                   ChangeType,
  /// The record whose transition caused this one.
  pub triggering_decision_record_id: Option<Uuid>,
}

impl StatusChangeMetadata {
  pub fn automatic(triggered_by: Uuid) -> Self {
    Self {
      change_type:                   ChangeType::Automatic,
      triggering_decision_record_id: Some(triggered_by),
    }
  }
}

/// One status transition. The row written at creation has
/// `from_status = None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusHistory {
  pub id:          Uuid,
  pub record_id:   Uuid,
  pub from_status: Option<RecordStatus>,
  pub to_status:   RecordStatus,
  pub reason:      Option<String>,
  pub metadata:    Option<StatusChangeMetadata>,
  pub changed_at:  DateTime<Utc>,
}

impl StatusHistory {
  pub fn is_automatic(&self) -> bool {
    self
      .metadata
      .as_ref()
      .is_some_and(|m| m.change_type == ChangeType::Automatic)
  }
}

/// Input to [`crate::store::DecisionStore::change_status`].
#[derive(Debug, Clone)]
pub struct StatusChange {
  pub record_id:             Uuid,
  /// Wire form of the target status; unrecognised values fail with
  /// [`Error::InvalidStatus`].
  pub new_status:            String,
  pub reason:                Option<String>,
  /// When false, an occupied slot fails with [`Error::Conflict`] instead of
  /// cascading.
  pub auto_handle_conflicts: bool,
}

impl StatusChange {
  pub fn new(record_id: Uuid, new_status: RecordStatus) -> Self {
    Self {
      record_id,
      new_status: new_status.to_string(),
      reason: None,
      auto_handle_conflicts: true,
    }
  }

  pub fn reason(mut self, reason: impl Into<String>) -> Self {
    self.reason = Some(reason.into());
    self
  }

  pub fn without_auto_resolution(mut self) -> Self {
    self.auto_handle_conflicts = false;
    self
  }
}

/// Result of a successful status change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChangeOutcome {
  pub message:          String,
  pub record:           crate::record::DecisionRecord,
  /// Sibling records that were transitioned automatically.
  pub affected_records: Vec<Uuid>,
}

#[cfg(test)]
mod tests {
  use strum::IntoEnumIterator as _;

  use super::*;

  #[test]
  fn standard_table_matches_lifecycle() {
    let t = TransitionTable::standard();
    assert!(t.allows(RecordStatus::Proposed, RecordStatus::Accepted));
    assert!(t.allows(RecordStatus::Proposed, RecordStatus::Rejected));
    assert!(!t.allows(RecordStatus::Proposed, RecordStatus::Implemented));
    assert!(t.allows(RecordStatus::Accepted, RecordStatus::Implemented));
    assert!(t.allows(RecordStatus::Accepted, RecordStatus::Deprecated));
    assert!(t.allows(RecordStatus::ImplementedInferred, RecordStatus::Deprecated));
    assert!(!t.allows(RecordStatus::Implemented, RecordStatus::Accepted));
  }

  #[test]
  fn terminal_statuses_have_no_exits() {
    let t = TransitionTable::standard();
    for to in RecordStatus::iter() {
      assert!(matches!(
        t.check(RecordStatus::Rejected, to),
        Err(Error::InvalidTransition { from: RecordStatus::Rejected, .. })
      ));
      assert!(t.check(RecordStatus::Deprecated, to).is_err());
    }
    assert!(t.is_terminal(RecordStatus::Rejected));
    assert!(t.is_terminal(RecordStatus::Deprecated));
    assert!(!t.is_terminal(RecordStatus::Implemented));
  }

  #[test]
  fn implemented_inferred_is_never_a_target() {
    let t = TransitionTable::standard();
    for from in RecordStatus::iter() {
      assert!(!t.allows(from, RecordStatus::ImplementedInferred));
    }
  }

  #[test]
  fn custom_tables_are_plain_data() {
    let t = TransitionTable::new([(
      RecordStatus::Rejected,
      &[RecordStatus::Proposed][..],
    )]);
    assert!(t.allows(RecordStatus::Rejected, RecordStatus::Proposed));
    assert!(t.is_terminal(RecordStatus::Proposed));
  }
}
