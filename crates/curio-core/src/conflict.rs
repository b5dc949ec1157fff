//! Conflict resolution: keep at most one `accepted` and at most one
//! implemented-equivalent record per decision.
//!
//! Planning is pure. [`plan_status_change`] looks at the target record and
//! its siblings and returns every transition, history row and relationship
//! edge the change requires. The store applies a [`TransitionPlan`] inside a
//! single transaction, so either all of it lands or none of it does.

use uuid::Uuid;

use crate::{
  Error,
  Result,
  record::{DecisionRecord, RecordStatus},
  relationship::{NewRelationship, RelationshipType},
  status::{StatusChangeMetadata, TransitionTable},
};

const REJECTED_ON_ACCEPT: &str =
  "Automatically rejected: Another record was accepted";
const DEPRECATED_ON_IMPLEMENT: &str =
  "Automatically deprecated: Another record was implemented";

/// One status move the store must apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedTransition {
  pub record_id: Uuid,
  pub from:      RecordStatus,
  pub to:        RecordStatus,
  pub reason:    Option<String>,
  pub metadata:  Option<StatusChangeMetadata>,
}

/// Everything a single status change entails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionPlan {
  pub decision_id: Uuid,
  /// The transition the caller asked for.
  pub primary:     PlannedTransition,
  /// Automatic transitions of sibling records, in application order.
  pub cascades:    Vec<PlannedTransition>,
  /// `superseded_by` edges from each displaced sibling to the target.
  pub edges:       Vec<NewRelationship>,
}

impl TransitionPlan {
  /// Sibling records touched by the cascade.
  pub fn affected_records(&self) -> Vec<Uuid> {
    self.cascades.iter().map(|t| t.record_id).collect()
  }

  pub fn message(&self) -> String {
    format!(
      "Status changed from '{}' to '{}'",
      self.primary.from, self.primary.to
    )
  }
}

/// Plan moving `target` to `new_status`.
///
/// `siblings` are the records of the same decision; the target itself may be
/// included and is skipped. Fails with [`Error::InvalidTransition`] if the
/// move is not an edge of `table`, or [`Error::Conflict`] if a sibling holds
/// a slot the target needs and `auto_handle_conflicts` is off.
pub fn plan_status_change(
  table: &TransitionTable,
  target: &DecisionRecord,
  siblings: &[DecisionRecord],
  new_status: RecordStatus,
  reason: Option<String>,
  auto_handle_conflicts: bool,
) -> Result<TransitionPlan> {
  table.check(target.status, new_status)?;

  let others = || siblings.iter().filter(|s| s.id != target.id);
  let mut displaced: Vec<(&DecisionRecord, RecordStatus, &str)> = Vec::new();

  match new_status {
    RecordStatus::Accepted => {
      for s in others().filter(|s| s.status == RecordStatus::Accepted) {
        displaced.push((s, RecordStatus::Rejected, REJECTED_ON_ACCEPT));
      }
    }
    RecordStatus::Implemented => {
      // Implemented siblings first, then any sibling still accepted.
      for s in others().filter(|s| s.status.is_implemented()) {
        displaced.push((s, RecordStatus::Deprecated, DEPRECATED_ON_IMPLEMENT));
      }
      for s in others().filter(|s| s.status == RecordStatus::Accepted) {
        displaced.push((s, RecordStatus::Deprecated, DEPRECATED_ON_IMPLEMENT));
      }
    }
    _ => {}
  }

  if let Some((existing, _, _)) = displaced.first()
    && !auto_handle_conflicts
  {
    return Err(Error::Conflict {
      decision_id: target.decision_id,
      existing:    existing.id,
      status:      existing.status,
    });
  }

  let verb = if new_status == RecordStatus::Accepted {
    "accepted"
  } else {
    "implemented"
  };

  let mut cascades = Vec::with_capacity(displaced.len());
  let mut edges = Vec::with_capacity(displaced.len());
  for (sibling, to, why) in displaced {
    table.check(sibling.status, to)?;
    cascades.push(PlannedTransition {
      record_id: sibling.id,
      from:      sibling.status,
      to,
      reason:    Some(why.to_owned()),
      metadata:  Some(StatusChangeMetadata::automatic(target.id)),
    });
    edges.push(NewRelationship {
      source_record_id:  sibling.id,
      target_record_id:  target.id,
      relationship_type: RelationshipType::SupersededBy,
      description:       Some(format!(
        "Automatically superseded when record {} was {verb}",
        target.id
      )),
    });
  }

  Ok(TransitionPlan {
    decision_id: target.decision_id,
    primary: PlannedTransition {
      record_id: target.id,
      from: target.status,
      to: new_status,
      reason,
      metadata: None,
    },
    cascades,
    edges,
  })
}

/// Check that a record created directly with `status` does not take a slot
/// a sibling already holds. Creation never cascades.
pub fn check_initial_status(
  decision_id: Uuid,
  status: RecordStatus,
  siblings: &[DecisionRecord],
) -> Result<()> {
  if !status.holds_exclusive_slot() {
    return Ok(());
  }
  let clash = siblings.iter().find(|s| {
    if status == RecordStatus::Accepted {
      s.status == RecordStatus::Accepted
    } else {
      s.status.is_implemented()
    }
  });
  match clash {
    Some(existing) => Err(Error::Conflict {
      decision_id,
      existing: existing.id,
      status: existing.status,
    }),
    None => Ok(()),
  }
}
