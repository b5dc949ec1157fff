//! Typed, directed edges between records and between decisions.
//!
//! There is no uniqueness constraint on a pair: several edges of different
//! types may connect the same two endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use uuid::Uuid;

use crate::{Error, Result};

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
  EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RelationshipType {
  SupersededBy,
  Supersedes,
  RelatedTo,
  DependsOn,
  MergedFrom,
  DerivedFrom,
  ConflictsWith,
}

impl RelationshipType {
  pub fn parse(s: &str) -> Result<Self> {
    s.parse().map_err(|_| Error::InvalidRelationshipType(s.to_owned()))
  }
}

// ─── Record-level ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
  pub id:                Uuid,
  pub source_record_id:  Uuid,
  pub target_record_id:  Uuid,
  pub relationship_type: RelationshipType,
  pub description:       Option<String>,
  pub created_at:        DateTime<Utc>,
}

/// Input to [`crate::store::DecisionStore::create_relationship`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewRelationship {
  pub source_record_id:  Uuid,
  pub target_record_id:  Uuid,
  pub relationship_type: RelationshipType,
  pub description:       Option<String>,
}

/// Both directions of a record's edges.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordRelationships {
  pub outgoing: Vec<Relationship>,
  pub incoming: Vec<Relationship>,
}

// ─── Decision-level ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRelationship {
  pub id:                 Uuid,
  pub source_decision_id: Uuid,
  pub target_decision_id: Uuid,
  pub relationship_type:  RelationshipType,
  pub description:        Option<String>,
  pub created_at:         DateTime<Utc>,
}

/// Input to [`crate::store::DecisionStore::create_decision_relationship`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewDecisionRelationship {
  pub source_decision_id: Uuid,
  pub target_decision_id: Uuid,
  pub relationship_type:  RelationshipType,
  pub description:        Option<String>,
}

impl NewDecisionRelationship {
  /// A decision cannot be related to itself.
  pub fn validate(&self) -> Result<()> {
    if self.source_decision_id == self.target_decision_id {
      return Err(Error::Validation(
        "source and target decision cannot be the same".into(),
      ));
    }
    Ok(())
  }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecisionRelationships {
  pub outgoing: Vec<DecisionRelationship>,
  pub incoming: Vec<DecisionRelationship>,
}

/// Partial update for either kind of edge.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelationshipUpdate {
  pub relationship_type: Option<RelationshipType>,
  pub description:       Option<String>,
}

/// Pick the single edge between a pair, optionally narrowed by type.
///
/// Returns `Ok(None)` when nothing matches and
/// [`Error::AmbiguousRelationship`] when more than one edge does.
pub fn select_unique<T, F>(
  edges: Vec<T>,
  source_id: Uuid,
  target_id: Uuid,
  wanted: Option<RelationshipType>,
  type_of: F,
) -> Result<Option<T>>
where
  F: Fn(&T) -> RelationshipType,
{
  let mut matching: Vec<T> = edges
    .into_iter()
    .filter(|e| wanted.is_none_or(|w| type_of(e) == w))
    .collect();
  match matching.len() {
    0 => Ok(None),
    1 => Ok(matching.pop()),
    count => Err(Error::AmbiguousRelationship { source_id, target_id, count }),
  }
}
