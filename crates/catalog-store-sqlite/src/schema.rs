//! SQL schema for the catalog SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Courses are never deleted; retired courses have is_offered = 0.
CREATE TABLE IF NOT EXISTS courses (
    course_id             TEXT PRIMARY KEY,
    external_code         TEXT NOT NULL UNIQUE,
    external_uuid         TEXT,
    name                  TEXT NOT NULL,
    credits               REAL NOT NULL DEFAULT 0,
    length                INTEGER NOT NULL DEFAULT 1,
    gpa_weight            REAL NOT NULL DEFAULT 4.0,
    subject               TEXT NOT NULL,
    is_elective           INTEGER NOT NULL DEFAULT 0,
    is_offered            INTEGER NOT NULL DEFAULT 1,
    is_new                INTEGER NOT NULL DEFAULT 1,
    description           TEXT NOT NULL DEFAULT '',   -- curated
    notes                 TEXT NOT NULL DEFAULT '',   -- curated
    last_snapshot_payload TEXT NOT NULL DEFAULT '{}',
    created_at            TEXT NOT NULL,
    updated_at            TEXT NOT NULL,
    last_seen_at          TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS course_tags (
    course_id TEXT NOT NULL REFERENCES courses(course_id),
    tag       TEXT NOT NULL,
    PRIMARY KEY (course_id, tag)
);

CREATE TABLE IF NOT EXISTS course_eligibility (
    course_id   TEXT NOT NULL REFERENCES courses(course_id),
    grade       INTEGER NOT NULL,
    term_number INTEGER,           -- NULL = every term
    term_name   TEXT,
    can_plan    INTEGER NOT NULL DEFAULT 1
);

-- NULL terms must collide too, which a plain UNIQUE would not enforce.
CREATE UNIQUE INDEX IF NOT EXISTS course_eligibility_key
    ON course_eligibility(course_id, grade, COALESCE(term_number, -1));

-- variant_code is unique across the whole catalog.
CREATE TABLE IF NOT EXISTS course_variants (
    variant_code  TEXT PRIMARY KEY,
    course_id     TEXT NOT NULL REFERENCES courses(course_id),
    name          TEXT NOT NULL DEFAULT '',
    delivery_mode TEXT,
    is_offered    INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS course_relationships (
    relationship_id     TEXT PRIMARY KEY,
    course_id           TEXT NOT NULL REFERENCES courses(course_id),
    related_course_id   TEXT REFERENCES courses(course_id),  -- NULL = unresolved
    related_course_code TEXT,
    relationship_type   TEXT NOT NULL,   -- 'prerequisite' | 'corequisite' | 'recommended'
    group_id            TEXT,
    logic_type          TEXT NOT NULL DEFAULT 'OR',
    description         TEXT
);

CREATE INDEX IF NOT EXISTS course_variants_course_idx      ON course_variants(course_id);
CREATE INDEX IF NOT EXISTS course_relationships_course_idx ON course_relationships(course_id);
CREATE INDEX IF NOT EXISTS course_relationships_unresolved_idx
    ON course_relationships(related_course_id) WHERE related_course_id IS NULL;

PRAGMA user_version = 1;
";
