//! Error types for `curio-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::record::RecordStatus;

#[derive(Debug, Error)]
pub enum Error {
  #[error("project not found: {0}")]
  ProjectNotFound(Uuid),

  #[error("decision not found: {0}")]
  DecisionNotFound(Uuid),

  #[error("record not found: {0}")]
  RecordNotFound(Uuid),

  #[error("version {version} not found for record {record_id}")]
  VersionNotFound { record_id: Uuid, version: u32 },

  #[error("relationship not found: {0}")]
  RelationshipNotFound(Uuid),

  #[error("invalid status: {0:?}")]
  InvalidStatus(String),

  #[error("invalid relationship type: {0:?}")]
  InvalidRelationshipType(String),

  #[error("invalid status transition from '{from}' to '{to}'")]
  InvalidTransition { from: RecordStatus, to: RecordStatus },

  /// Another record of the same decision already holds the slot and
  /// automatic conflict handling was disabled.
  #[error(
    "record {existing} of decision {decision_id} is already {status}; \
     enable auto_handle_conflicts to supersede it"
  )]
  Conflict {
    decision_id: Uuid,
    existing:    Uuid,
    status:      RecordStatus,
  },

  #[error("record was modified concurrently (expected version {expected}, found {actual})")]
  VersionConflict { expected: u32, actual: u32 },

  #[error("{count} relationships exist from {source_id} to {target_id}; specify a type")]
  AmbiguousRelationship {
    source_id: Uuid,
    target_id: Uuid,
    count:     usize,
  },

  #[error("validation error: {0}")]
  Validation(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ─── Classification ──────────────────────────────────────────────────────────

/// Coarse failure category, independent of the storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  NotFound,
  InvalidStatus,
  InvalidTransition,
  Conflict,
  VersionConflict,
  Validation,
  Internal,
}

/// Implemented by every error a [`crate::store::DecisionStore`] can return, so
/// callers can react to the failure category without knowing the backend.
pub trait Classify {
  fn kind(&self) -> ErrorKind;
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::ProjectNotFound(_)
      | Self::DecisionNotFound(_)
      | Self::RecordNotFound(_)
      | Self::VersionNotFound { .. }
      | Self::RelationshipNotFound(_) => ErrorKind::NotFound,
      Self::InvalidStatus(_) => ErrorKind::InvalidStatus,
      Self::InvalidTransition { .. } => ErrorKind::InvalidTransition,
      Self::Conflict { .. } | Self::AmbiguousRelationship { .. } => {
        ErrorKind::Conflict
      }
      Self::VersionConflict { .. } => ErrorKind::VersionConflict,
      Self::Validation(_) | Self::InvalidRelationshipType(_) => {
        ErrorKind::Validation
      }
      Self::Serialization(_) => ErrorKind::Internal,
    }
  }
}
