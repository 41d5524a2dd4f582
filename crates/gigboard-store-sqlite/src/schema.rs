//! SQL schema for the gigboard SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Accounts are never deleted; `status` soft-marks them.
CREATE TABLE IF NOT EXISTS accounts (
    id               TEXT PRIMARY KEY,
    name             TEXT NOT NULL,
    email            TEXT NOT NULL UNIQUE,
    phone            TEXT,
    password_hash    TEXT,               -- NULL for Google-only accounts
    role             TEXT NOT NULL,      -- 'freelancer' | 'employer'
    status           TEXT NOT NULL DEFAULT 'active',
    bio              TEXT,
    skill_ids        TEXT NOT NULL DEFAULT '[]',
    avatar_url       TEXT,
    avatar_delete_id TEXT,
    refresh_token    TEXT,
    created_at       TEXT NOT NULL,      -- RFC 3339 UTC, fixed width
    updated_at       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS categories (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE COLLATE NOCASE,
    description TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS skills (
    id         TEXT PRIMARY KEY,
    name       TEXT NOT NULL UNIQUE COLLATE NOCASE,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS projects (
    id            TEXT PRIMARY KEY,
    employer_id   TEXT NOT NULL REFERENCES accounts(id),
    title         TEXT NOT NULL,
    description   TEXT NOT NULL,
    category_id   TEXT NOT NULL REFERENCES categories(id),
    skill_ids     TEXT NOT NULL,       -- JSON array of ids
    salary_min    INTEGER NOT NULL,
    salary_max    INTEGER NOT NULL,
    job_type      TEXT NOT NULL,       -- 'remote' | 'onsite' | 'hybrid'
    contact_name  TEXT NOT NULL,
    contact_email TEXT NOT NULL,
    contact_phone TEXT,
    status        TEXT NOT NULL DEFAULT 'open',
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL,
    CHECK (salary_min <= salary_max)
);

CREATE TABLE IF NOT EXISTS applicants (
    id            TEXT PRIMARY KEY,
    project_id    TEXT NOT NULL REFERENCES projects(id),
    freelancer_id TEXT NOT NULL REFERENCES accounts(id),
    cover_letter  TEXT,
    status        TEXT NOT NULL DEFAULT 'pending',
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL,
    UNIQUE (project_id, freelancer_id)
);

CREATE INDEX IF NOT EXISTS projects_employer_idx  ON projects(employer_id);
CREATE INDEX IF NOT EXISTS projects_category_idx  ON projects(category_id);
CREATE INDEX IF NOT EXISTS projects_created_idx   ON projects(created_at);
CREATE INDEX IF NOT EXISTS applicants_project_idx ON applicants(project_id);

PRAGMA user_version = 1;
";
