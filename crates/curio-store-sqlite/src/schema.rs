//! SQL schema for the Curio SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS projects (
    project_id  TEXT PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE,
    description TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS decisions (
    decision_id TEXT PRIMARY KEY,
    project_id  TEXT NOT NULL REFERENCES projects(project_id) ON DELETE CASCADE,
    title       TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

-- The live row always holds the newest version of a record.
CREATE TABLE IF NOT EXISTS decision_records (
    record_id            TEXT PRIMARY KEY,
    decision_id          TEXT NOT NULL REFERENCES decisions(decision_id) ON DELETE CASCADE,
    status               TEXT NOT NULL,
    context              TEXT,
    constraints          TEXT,
    decision_description TEXT NOT NULL,
    rationale            TEXT,
    assumptions          TEXT,
    consequences         TEXT,
    tradeoffs            TEXT,
    evidence             TEXT,
    options_considered   TEXT,
    version              INTEGER NOT NULL DEFAULT 1 CHECK (version >= 1),
    created_at           TEXT NOT NULL,
    updated_at           TEXT NOT NULL
);

-- Append-only. The creation row has from_status NULL.
CREATE TABLE IF NOT EXISTS status_history (
    history_id  TEXT PRIMARY KEY,
    record_id   TEXT NOT NULL REFERENCES decision_records(record_id) ON DELETE CASCADE,
    from_status TEXT,
    to_status   TEXT NOT NULL,
    reason      TEXT,
    metadata    TEXT,            -- JSON StatusChangeMetadata or NULL
    changed_at  TEXT NOT NULL
);

-- Written at most once per (record_id, version); the first row wins.
CREATE TABLE IF NOT EXISTS record_versions (
    version_id TEXT PRIMARY KEY,
    record_id  TEXT NOT NULL REFERENCES decision_records(record_id) ON DELETE CASCADE,
    version    INTEGER NOT NULL,
    snapshot   TEXT NOT NULL,    -- JSON DecisionRecord
    created_at TEXT NOT NULL,
    UNIQUE (record_id, version)
);

CREATE TABLE IF NOT EXISTS changelog (
    entry_id     TEXT PRIMARY KEY,
    record_id    TEXT NOT NULL REFERENCES decision_records(record_id) ON DELETE CASCADE,
    from_version INTEGER NOT NULL,
    to_version   INTEGER NOT NULL,
    changes      TEXT NOT NULL,  -- JSON {field: {old, new}}
    summary      TEXT NOT NULL,
    changed_at   TEXT NOT NULL,
    CHECK (to_version > from_version)
);

-- No uniqueness on the pair: several typed edges may connect two records.
CREATE TABLE IF NOT EXISTS record_relationships (
    relationship_id   TEXT PRIMARY KEY,
    source_record_id  TEXT NOT NULL REFERENCES decision_records(record_id) ON DELETE CASCADE,
    target_record_id  TEXT NOT NULL REFERENCES decision_records(record_id) ON DELETE CASCADE,
    relationship_type TEXT NOT NULL,
    description       TEXT,
    created_at        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS decision_relationships (
    relationship_id    TEXT PRIMARY KEY,
    source_decision_id TEXT NOT NULL REFERENCES decisions(decision_id) ON DELETE CASCADE,
    target_decision_id TEXT NOT NULL REFERENCES decisions(decision_id) ON DELETE CASCADE,
    relationship_type  TEXT NOT NULL,
    description        TEXT,
    created_at         TEXT NOT NULL,
    CHECK (source_decision_id != target_decision_id)
);

CREATE INDEX IF NOT EXISTS decisions_project_idx   ON decisions(project_id);
CREATE INDEX IF NOT EXISTS records_decision_idx    ON decision_records(decision_id);
CREATE INDEX IF NOT EXISTS history_record_idx      ON status_history(record_id, changed_at);
CREATE INDEX IF NOT EXISTS changelog_record_idx    ON changelog(record_id, changed_at);
CREATE INDEX IF NOT EXISTS rel_source_idx          ON record_relationships(source_record_id);
CREATE INDEX IF NOT EXISTS rel_target_idx          ON record_relationships(target_record_id);
CREATE INDEX IF NOT EXISTS decision_rel_source_idx ON decision_relationships(source_decision_id);
CREATE INDEX IF NOT EXISTS decision_rel_target_idx ON decision_relationships(target_decision_id);

PRAGMA user_version = 1;
";
