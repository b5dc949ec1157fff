//! Read-side projections over a decision's history.
//!
//! [`project_timeline`] merges record creation, status changes and content
//! changes into one newest-first stream. Events sharing an exact timestamp
//! (typically a transition and the cascade it caused, which commit together)
//! are flagged as concurrent: their relative order carries no meaning.
//!
//! [`implementation_history`] answers "what is implemented now, and what
//! was implemented before".

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  decision::Decision,
  record::{DecisionRecord, RecordStatus},
  status::{StatusChangeMetadata, StatusHistory},
  version::{ChangelogEntry, ContentChanges},
};

const DESCRIPTION_PREVIEW: usize = 100;

// ─── Timeline ────────────────────────────────────────────────────────────────

/// What happened, tagged by `event_type` with the payload under `details`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type", content = "details", rename_all = "snake_case")]
pub enum TimelineEventKind {
  RecordCreated {
    initial_status: RecordStatus,
  },
  StatusChange {
    from_status:  Option<RecordStatus>,
    to_status:    RecordStatus,
    reason:       Option<String>,
    metadata:     Option<StatusChangeMetadata>,
    is_automatic: bool,
  },
  ContentChange {
    from_version: u32,
    to_version:   u32,
    summary:      String,
    changes:      ContentChanges,
  },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEvent {
  #[serde(flatten)]
  pub kind:                  TimelineEventKind,
  pub timestamp:             DateTime<Utc>,
  pub record_id:             Uuid,
  pub record_version:        u32,
  /// The record's description, cut to 100 characters.
  pub decision_description:  Option<String>,
  pub has_concurrent_events: bool,
  /// Number of events sharing this exact timestamp; 1 when alone.
  pub concurrent_count:      usize,
}

/// Events of one calendar day (UTC), newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineDay {
  pub date:   NaiveDate,
  pub events: Vec<TimelineEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeline {
  pub decision_id:     Uuid,
  pub decision_title:  String,
  pub total_events:    usize,
  pub events:          Vec<TimelineEvent>,
  /// Newest day first.
  pub grouped_by_date: Vec<TimelineDay>,
}

fn preview(description: Option<&str>) -> Option<String> {
  description.map(|d| {
    if d.chars().count() > DESCRIPTION_PREVIEW {
      let cut: String = d.chars().take(DESCRIPTION_PREVIEW).collect();
      format!("{cut}...")
    } else {
      d.to_owned()
    }
  })
}

/// Build the timeline for `decision` from its records and their history.
///
/// `history` may include the creation rows (`from_status = None`); they are
/// represented by the record-created events instead.
pub fn project_timeline(
  decision: &Decision,
  records: &[DecisionRecord],
  history: &[StatusHistory],
  changelog: &[ChangelogEntry],
) -> Timeline {
  let by_id: HashMap<Uuid, &DecisionRecord> =
    records.iter().map(|r| (r.id, r)).collect();

  let initial_status: HashMap<Uuid, RecordStatus> = history
    .iter()
    .filter(|h| h.from_status.is_none())
    .map(|h| (h.record_id, h.to_status))
    .collect();

  let event = |kind: TimelineEventKind,
               timestamp: DateTime<Utc>,
               record: &DecisionRecord,
               version: u32| TimelineEvent {
    kind,
    timestamp,
    record_id: record.id,
    record_version: version,
    decision_description: preview(record.content.decision_description.as_deref()),
    has_concurrent_events: false,
    concurrent_count: 1,
  };

  let mut events = Vec::new();

  for record in records {
    let initial = initial_status
      .get(&record.id)
      .copied()
      .unwrap_or(record.status);
    events.push(event(
      TimelineEventKind::RecordCreated { initial_status: initial },
      record.created_at,
      record,
      1,
    ));
  }

  for h in history.iter().filter(|h| h.from_status.is_some()) {
    let Some(&record) = by_id.get(&h.record_id) else { continue };
    events.push(event(
      TimelineEventKind::StatusChange {
        from_status:  h.from_status,
        to_status:    h.to_status,
        reason:       h.reason.clone(),
        metadata:     h.metadata.clone(),
        is_automatic: h.is_automatic(),
      },
      h.changed_at,
      record,
      record.version,
    ));
  }

  for c in changelog {
    let Some(&record) = by_id.get(&c.record_id) else { continue };
    events.push(event(
      TimelineEventKind::ContentChange {
        from_version: c.from_version,
        to_version:   c.to_version,
        summary:      c.summary.clone(),
        changes:      c.changes.clone(),
      },
      c.changed_at,
      record,
      c.to_version,
    ));
  }

  // Stable: ties keep source order, which callers must not rely on anyway.
  events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

  let mut per_instant: HashMap<DateTime<Utc>, usize> = HashMap::new();
  for e in &events {
    *per_instant.entry(e.timestamp).or_default() += 1;
  }
  for e in &mut events {
    let count = per_instant[&e.timestamp];
    e.concurrent_count = count;
    e.has_concurrent_events = count > 1;
  }

  let mut grouped_by_date: Vec<TimelineDay> = Vec::new();
  for e in &events {
    let date = e.timestamp.date_naive();
    match grouped_by_date.last_mut() {
      Some(day) if day.date == date => day.events.push(e.clone()),
      _ => grouped_by_date.push(TimelineDay { date, events: vec![e.clone()] }),
    }
  }

  Timeline {
    decision_id: decision.id,
    decision_title: decision.title.clone(),
    total_events: events.len(),
    events,
    grouped_by_date,
  }
}

// ─── Implementation history ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImplementationEntry {
  pub record:             DecisionRecord,
  pub implemented_at:     Option<DateTime<Utc>>,
  pub deprecated_at:      Option<DateTime<Utc>>,
  pub deprecation_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImplementationHistory {
  pub decision_id:            Uuid,
  pub decision_title:         String,
  pub current_implementation: Option<ImplementationEntry>,
  /// Formerly implemented records, most recently deprecated first.
  pub past_implementations:   Vec<ImplementationEntry>,
  pub total_implementations:  usize,
}

/// Derive the implementation history of `decision` from its records'
/// status history.
pub fn implementation_history(
  decision: &Decision,
  records: &[DecisionRecord],
  history: &[StatusHistory],
) -> ImplementationHistory {
  let rows_for = |id: Uuid| history.iter().filter(move |h| h.record_id == id);

  let last_implemented = |id: Uuid| {
    rows_for(id)
      .filter(|h| h.to_status.is_implemented())
      .map(|h| h.changed_at)
      .max()
  };

  let current_implementation = records
    .iter()
    .find(|r| r.status.is_implemented())
    .map(|r| ImplementationEntry {
      record:             r.clone(),
      implemented_at:     last_implemented(r.id),
      deprecated_at:      None,
      deprecation_reason: None,
    });

  let mut past_implementations: Vec<ImplementationEntry> = records
    .iter()
    .filter(|r| r.status == RecordStatus::Deprecated)
    .filter_map(|r| {
      let deprecation = rows_for(r.id)
        .filter(|h| {
          h.to_status == RecordStatus::Deprecated
            && h.from_status.is_some_and(RecordStatus::is_implemented)
        })
        .max_by_key(|h| h.changed_at)?;
      Some(ImplementationEntry {
        record:             r.clone(),
        implemented_at:     last_implemented(r.id),
        deprecated_at:      Some(deprecation.changed_at),
        deprecation_reason: deprecation.reason.clone(),
      })
    })
    .collect();
  past_implementations.sort_by(|a, b| b.deprecated_at.cmp(&a.deprecated_at));

  ImplementationHistory {
    decision_id: decision.id,
    decision_title: decision.title.clone(),
    total_implementations: past_implementations.len()
      + usize::from(current_implementation.is_some()),
    current_implementation,
    past_implementations,
  }
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, TimeZone as _};

  use super::*;
  use crate::{
    record::{ContentField, RecordContent},
    status::ChangeType,
    version::FieldChange,
  };

  fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap()
  }

  fn decision() -> Decision {
    Decision {
      id:         Uuid::new_v4(),
      project_id: Uuid::new_v4(),
      title:      "Primary datastore".into(),
      created_at: at(1, 9),
      updated_at: at(1, 9),
    }
  }

  fn record(d: &Decision, status: RecordStatus, created: DateTime<Utc>) -> DecisionRecord {
    DecisionRecord {
      id: Uuid::new_v4(),
      decision_id: d.id,
      status,
      content: RecordContent {
        decision_description: Some("Use Postgres".into()),
        ..RecordContent::default()
      },
      version: 1,
      created_at: created,
      updated_at: created,
    }
  }

  fn row(
    record_id: Uuid,
    from: Option<RecordStatus>,
    to: RecordStatus,
    when: DateTime<Utc>,
  ) -> StatusHistory {
    StatusHistory {
      id: Uuid::new_v4(),
      record_id,
      from_status: from,
      to_status: to,
      reason: None,
      metadata: None,
      changed_at: when,
    }
  }

  #[test]
  fn creation_rows_are_not_duplicated() {
    let d = decision();
    let a = record(&d, RecordStatus::Proposed, at(1, 10));
    let history = vec![row(a.id, None, RecordStatus::Proposed, at(1, 10))];

    let t = project_timeline(&d, std::slice::from_ref(&a), &history, &[]);
    assert_eq!(t.total_events, 1);
    assert!(matches!(
      t.events[0].kind,
      TimelineEventKind::RecordCreated { initial_status: RecordStatus::Proposed }
    ));
  }

  #[test]
  fn initial_status_comes_from_history_not_live_status() {
    let d = decision();
    let mut a = record(&d, RecordStatus::Proposed, at(1, 10));
    let history = vec![
      row(a.id, None, RecordStatus::Proposed, at(1, 10)),
      row(a.id, Some(RecordStatus::Proposed), RecordStatus::Accepted, at(2, 10)),
    ];
    a.status = RecordStatus::Accepted;

    let t = project_timeline(&d, std::slice::from_ref(&a), &history, &[]);
    let created = t
      .events
      .iter()
      .find(|e| matches!(e.kind, TimelineEventKind::RecordCreated { .. }))
      .unwrap();
    assert!(matches!(
      created.kind,
      TimelineEventKind::RecordCreated { initial_status: RecordStatus::Proposed }
    ));
  }

  #[test]
  fn events_sorted_newest_first_and_grouped_by_day() {
    let d = decision();
    let a = record(&d, RecordStatus::Accepted, at(1, 10));
    let history = vec![row(
      a.id,
      Some(RecordStatus::Proposed),
      RecordStatus::Accepted,
      at(3, 8),
    )];
    let changelog = vec![ChangelogEntry {
      id:           Uuid::new_v4(),
      record_id:    a.id,
      from_version: 1,
      to_version:   2,
      changes:      [(ContentField::Rationale, FieldChange {
        old: None,
        new: Some("mature".into()),
      })]
      .into_iter()
      .collect(),
      summary:      "Updated: rationale".into(),
      changed_at:   at(3, 7),
    }];

    let t = project_timeline(&d, std::slice::from_ref(&a), &history, &changelog);
    let stamps: Vec<_> = t.events.iter().map(|e| e.timestamp).collect();
    assert_eq!(stamps, vec![at(3, 8), at(3, 7), at(1, 10)]);
    assert_eq!(t.events[1].record_version, 2);

    assert_eq!(t.grouped_by_date.len(), 2);
    assert_eq!(t.grouped_by_date[0].date, at(3, 0).date_naive());
    assert_eq!(t.grouped_by_date[0].events.len(), 2);
    assert!(t.events.iter().all(|e| !e.has_concurrent_events));
  }

  #[test]
  fn identical_timestamps_are_flagged_concurrent() {
    let d = decision();
    let a = record(&d, RecordStatus::Rejected, at(1, 10));
    let b = record(&d, RecordStatus::Accepted, at(1, 11));
    let when = at(2, 12);
    let mut auto = row(a.id, Some(RecordStatus::Accepted), RecordStatus::Rejected, when);
    auto.metadata = Some(StatusChangeMetadata::automatic(b.id));
    let history = vec![
      auto,
      row(b.id, Some(RecordStatus::Proposed), RecordStatus::Accepted, when),
    ];

    let t = project_timeline(&d, &[a, b], &history, &[]);
    let concurrent: Vec<_> = t.events.iter().filter(|e| e.timestamp == when).collect();
    assert_eq!(concurrent.len(), 2);
    assert!(concurrent.iter().all(|e| e.has_concurrent_events && e.concurrent_count == 2));
    assert!(concurrent.iter().any(|e| matches!(
      &e.kind,
      TimelineEventKind::StatusChange { is_automatic: true, metadata: Some(m), .. }
        if m.change_type == ChangeType::Automatic
    )));
  }

  #[test]
  fn long_descriptions_are_truncated() {
    let long = "x".repeat(150);
    let shown = preview(Some(&long)).unwrap();
    assert_eq!(shown.len(), 103);
    assert!(shown.ends_with("..."));
    assert_eq!(preview(Some("short")).as_deref(), Some("short"));
  }

  #[test]
  fn implementation_history_tracks_current_and_past() {
    let d = decision();
    let mut old = record(&d, RecordStatus::Deprecated, at(1, 9));
    let new = record(&d, RecordStatus::Implemented, at(2, 9));
    let rejected = record(&d, RecordStatus::Deprecated, at(2, 10));
    old.version = 3;

    let t0 = at(1, 9);
    let history = vec![
      row(old.id, None, RecordStatus::Proposed, t0),
      row(old.id, Some(RecordStatus::Proposed), RecordStatus::Accepted, t0 + Duration::hours(1)),
      row(old.id, Some(RecordStatus::Accepted), RecordStatus::Implemented, t0 + Duration::hours(2)),
      StatusHistory {
        reason: Some("Automatically deprecated: Another record was implemented".into()),
        ..row(old.id, Some(RecordStatus::Implemented), RecordStatus::Deprecated, at(4, 9))
      },
      row(new.id, Some(RecordStatus::Accepted), RecordStatus::Implemented, at(4, 9)),
      // Deprecated straight from accepted: never implemented.
      row(rejected.id, Some(RecordStatus::Accepted), RecordStatus::Deprecated, at(4, 9)),
    ];

    let h = implementation_history(&d, &[old.clone(), new.clone(), rejected], &history);
    let current = h.current_implementation.unwrap();
    assert_eq!(current.record.id, new.id);
    assert_eq!(current.implemented_at, Some(at(4, 9)));

    assert_eq!(h.past_implementations.len(), 1);
    let past = &h.past_implementations[0];
    assert_eq!(past.record.id, old.id);
    assert_eq!(past.implemented_at, Some(t0 + Duration::hours(2)));
    assert_eq!(past.deprecated_at, Some(at(4, 9)));
    assert!(past.deprecation_reason.as_deref().unwrap().starts_with("Automatically"));
    assert_eq!(h.total_implementations, 2);
  }
}
