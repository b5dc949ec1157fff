//! Decision records, the versioned and status-tracked unit of the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator as _};
use uuid::Uuid;

use crate::{Error, Result, decision::require_text};

// ─── Status ──────────────────────────────────────────────────────────────────

/// Lifecycle status of a record. Allowed moves between statuses are defined
/// by [`crate::status::TransitionTable`].
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
  EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecordStatus {
  Proposed,
  Accepted,
  Implemented,
  /// Recorded after the fact, e.g. reconstructed from an existing codebase.
  /// Only reachable by direct creation.
  ImplementedInferred,
  Rejected,
  Deprecated,
}

impl RecordStatus {
  /// Parse the wire form, failing with [`Error::InvalidStatus`].
  pub fn parse(s: &str) -> Result<Self> {
    s.parse().map_err(|_| Error::InvalidStatus(s.to_owned()))
  }

  /// `implemented` and `implemented_inferred` share one slot per decision.
  pub fn is_implemented(self) -> bool {
    matches!(self, Self::Implemented | Self::ImplementedInferred)
  }

  /// The statuses of which a decision may hold at most one record.
  pub fn holds_exclusive_slot(self) -> bool {
    self == Self::Accepted || self.is_implemented()
  }
}

// ─── Content ─────────────────────────────────────────────────────────────────

/// The narrative fields that are versioned, diffed and reverted. Declaration
/// order is the order changes are reported in.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  Display,
  AsRefStr,
  EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContentField {
  Context,
  Constraints,
  DecisionDescription,
  Rationale,
  Assumptions,
  Consequences,
  Tradeoffs,
  Evidence,
  OptionsConsidered,
}

/// The versioned content of a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordContent {
  pub context:              Option<String>,
  pub constraints:          Option<String>,
  pub decision_description: Option<String>,
  pub rationale:            Option<String>,
  pub assumptions:          Option<String>,
  pub consequences:         Option<String>,
  pub tradeoffs:            Option<String>,
  pub evidence:             Option<String>,
  pub options_considered:   Option<String>,
}

impl RecordContent {
  pub fn get(&self, field: ContentField) -> Option<&str> {
    self.slot(field).as_deref()
  }

  pub fn set(&mut self, field: ContentField, value: Option<String>) {
    *self.slot_mut(field) = value;
  }

  fn slot(&self, field: ContentField) -> &Option<String> {
    match field {
      ContentField::Context => &self.context,
      ContentField::Constraints => &self.constraints,
      ContentField::DecisionDescription => &self.decision_description,
      ContentField::Rationale => &self.rationale,
      ContentField::Assumptions => &self.assumptions,
      ContentField::Consequences => &self.consequences,
      ContentField::Tradeoffs => &self.tradeoffs,
      ContentField::Evidence => &self.evidence,
      ContentField::OptionsConsidered => &self.options_considered,
    }
  }

  fn slot_mut(&mut self, field: ContentField) -> &mut Option<String> {
    match field {
      ContentField::Context => &mut self.context,
      ContentField::Constraints => &mut self.constraints,
      ContentField::DecisionDescription => &mut self.decision_description,
      ContentField::Rationale => &mut self.rationale,
      ContentField::Assumptions => &mut self.assumptions,
      ContentField::Consequences => &mut self.consequences,
      ContentField::Tradeoffs => &mut self.tradeoffs,
      ContentField::Evidence => &mut self.evidence,
      ContentField::OptionsConsidered => &mut self.options_considered,
    }
  }
}

/// A partial content update. `None` means "leave unchanged"; there is no way
/// to clear a field through a patch.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentPatch {
  #[serde(flatten)]
  pub fields:           RecordContent,
  /// If set, the update fails with [`Error::VersionConflict`] unless the live
  /// record is still at this version.
  pub expected_version: Option<u32>,
}

impl ContentPatch {
  /// Builder-style setter used mostly by tests and adapters.
  pub fn with(mut self, field: ContentField, value: impl Into<String>) -> Self {
    self.fields.set(field, Some(value.into()));
    self
  }

  pub fn expecting(mut self, version: u32) -> Self {
    self.expected_version = Some(version);
    self
  }

  /// The supplied (non-null) fields.
  pub fn supplied(&self) -> impl Iterator<Item = (ContentField, &str)> + '_ {
    ContentField::iter()
      .filter_map(|f| self.fields.get(f).map(|v| (f, v)))
  }
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// One concrete proposal or outcome for a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRecord {
  pub id:          Uuid,
  pub decision_id: Uuid,
  pub status:      RecordStatus,
  #[serde(flatten)]
  pub content:     RecordContent,
  /// Starts at 1; bumped by every content update or revert, never by a
  /// status change.
  pub version:     u32,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

/// Input to [`crate::store::DecisionStore::create_record`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewRecord {
  pub decision_id: Uuid,
  /// Wire form of the initial status; defaults to `proposed`.
  pub status:      Option<String>,
  #[serde(flatten)]
  pub content:     RecordContent,
}

impl NewRecord {
  pub fn new(decision_id: Uuid, description: impl Into<String>) -> Self {
    Self {
      decision_id,
      status: None,
      content: RecordContent {
        decision_description: Some(description.into()),
        ..RecordContent::default()
      },
    }
  }

  pub fn with_status(mut self, status: RecordStatus) -> Self {
    self.status = Some(status.to_string());
    self
  }

  /// Check required fields and resolve the initial status.
  pub fn validate(&self) -> Result<RecordStatus> {
    require_text(
      "decision_description",
      self.content.decision_description.as_deref().unwrap_or_default(),
    )?;
    self
      .status
      .as_deref()
      .map(RecordStatus::parse)
      .transpose()
      .map(|s| s.unwrap_or(RecordStatus::Proposed))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_wire_form_is_snake_case() {
    assert_eq!(RecordStatus::ImplementedInferred.to_string(), "implemented_inferred");
    assert_eq!(RecordStatus::parse("accepted").unwrap(), RecordStatus::Accepted);
    assert!(matches!(
      RecordStatus::parse("approved"),
      Err(Error::InvalidStatus(s)) if s == "approved"
    ));
  }

  #[test]
  fn implemented_inferred_shares_the_implemented_slot() {
    assert!(RecordStatus::ImplementedInferred.is_implemented());
    assert!(RecordStatus::ImplementedInferred.holds_exclusive_slot());
    assert!(!RecordStatus::Proposed.holds_exclusive_slot());
  }

  #[test]
  fn new_record_requires_description() {
    let decision_id = Uuid::new_v4();
    let mut input = NewRecord::new(decision_id, "   ");
    assert!(matches!(input.validate(), Err(Error::Validation(_))));

    input.content.decision_description = Some("Use Postgres".into());
    assert_eq!(input.validate().unwrap(), RecordStatus::Proposed);

    input.status = Some("bogus".into());
    assert!(matches!(input.validate(), Err(Error::InvalidStatus(_))));
  }

  #[test]
  fn patch_reports_only_supplied_fields_in_order() {
    let patch = ContentPatch::default()
      .with(ContentField::Rationale, "cheaper")
      .with(ContentField::Context, "scaling");
    let supplied: Vec<_> = patch.supplied().map(|(f, _)| f).collect();
    assert_eq!(supplied, [ContentField::Context, ContentField::Rationale]);
  }
}
