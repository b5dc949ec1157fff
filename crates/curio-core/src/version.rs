//! Snapshots, changelog entries and field-level content diffs.
//!
//! A record's live row always holds its newest version. Older versions exist
//! only as [`RecordVersion`] snapshots, written lazily just before the live
//! row moves past them, so the snapshot table never contains the live
//! version until something supersedes it.

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use strum::IntoEnumIterator as _;
use uuid::Uuid;

use crate::{
  Error,
  record::{ContentField, ContentPatch, DecisionRecord, RecordContent},
};

// ─── Diffs ───────────────────────────────────────────────────────────────────

/// Old and new value of one content field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
  pub old: Option<String>,
  pub new: Option<String>,
}

/// Field-level diff, keyed and ordered by [`ContentField`].
pub type ContentChanges = BTreeMap<ContentField, FieldChange>;

/// Compare every content field of `from` against `to`.
pub fn diff_content(from: &RecordContent, to: &RecordContent) -> ContentChanges {
  ContentField::iter()
    .filter_map(|field| {
      let (old, new) = (from.get(field), to.get(field));
      (old != new).then(|| {
        (field, FieldChange {
          old: old.map(str::to_owned),
          new: new.map(str::to_owned),
        })
      })
    })
    .collect()
}

/// Compare only the fields a patch supplies. Fields left `None` in the patch
/// never appear in the result.
pub fn diff_patch(current: &RecordContent, patch: &ContentPatch) -> ContentChanges {
  patch
    .supplied()
    .filter(|(field, value)| current.get(*field) != Some(*value))
    .map(|(field, value)| {
      (field, FieldChange {
        old: current.get(field).map(str::to_owned),
        new: Some(value.to_owned()),
      })
    })
    .collect()
}

/// Write the `new` side of every change into `content`.
pub fn apply_changes(content: &mut RecordContent, changes: &ContentChanges) {
  for (field, change) in changes {
    content.set(*field, change.new.clone());
  }
}

/// Changelog summary for a content update: `"Updated: a, b"`.
pub fn update_summary(changes: &ContentChanges) -> String {
  let names: Vec<&str> = changes.keys().map(|f| f.as_ref()).collect();
  format!("Updated: {}", names.join(", "))
}

/// Changelog summary for a revert with no caller-supplied reason.
pub fn revert_summary(version: u32) -> String {
  format!("Reverted to version {version}")
}

// ─── Snapshots & changelog ───────────────────────────────────────────────────

/// The frozen state of a record at one version. At most one exists per
/// `(record_id, version)`; the first one written is authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordVersion {
  pub id:         Uuid,
  pub record_id:  Uuid,
  pub version:    u32,
  pub snapshot:   DecisionRecord,
  pub created_at: DateTime<Utc>,
}

/// One content update or revert, from one version to the next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangelogEntry {
  pub id:           Uuid,
  pub record_id:    Uuid,
  pub from_version: u32,
  pub to_version:   u32,
  pub changes:      ContentChanges,
  pub summary:      String,
  pub changed_at:   DateTime<Utc>,
}

// ─── Version references ──────────────────────────────────────────────────────

/// Either a concrete version number or the live record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionRef {
  Number(u32),
  Current,
}

impl fmt::Display for VersionRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Number(n) => write!(f, "{n}"),
      Self::Current => f.write_str("current"),
    }
  }
}

impl FromStr for VersionRef {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    if s.eq_ignore_ascii_case("current") {
      return Ok(Self::Current);
    }
    s.parse().map(Self::Number).map_err(|_| {
      Error::Validation(format!(
        "version must be a positive integer or \"current\", got {s:?}"
      ))
    })
  }
}

impl From<u32> for VersionRef {
  fn from(n: u32) -> Self { Self::Number(n) }
}

impl Serialize for VersionRef {
  fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
    match self {
      Self::Number(n) => s.serialize_u32(*n),
      Self::Current => s.serialize_str("current"),
    }
  }
}

impl<'de> Deserialize<'de> for VersionRef {
  fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
    struct Visitor;

    impl de::Visitor<'_> for Visitor {
      type Value = VersionRef;

      fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a version number or \"current\"")
      }

      fn visit_u64<E: de::Error>(self, v: u64) -> Result<VersionRef, E> {
        u32::try_from(v).map(VersionRef::Number).map_err(E::custom)
      }

      fn visit_i64<E: de::Error>(self, v: i64) -> Result<VersionRef, E> {
        u32::try_from(v).map(VersionRef::Number).map_err(E::custom)
      }

      fn visit_str<E: de::Error>(self, v: &str) -> Result<VersionRef, E> {
        v.parse().map_err(E::custom)
      }
    }

    d.deserialize_any(Visitor)
  }
}

/// The result of comparing two states of a record. Both resolved version
/// numbers are reported, so a `current` side still says exactly what was
/// compared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionDiff {
  pub record_id:           Uuid,
  pub from_version:        VersionRef,
  pub from_version_number: u32,
  pub to_version:          VersionRef,
  pub to_version_number:   u32,
  pub changes:             ContentChanges,
}

impl VersionDiff {
  pub fn is_empty(&self) -> bool { self.changes.is_empty() }
}
