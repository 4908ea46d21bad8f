//! v001 -- Initial schema creation.
//!
//! Creates the `users` and `apps` tables.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users (single admin role)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id            TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    username      TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,              -- argon2id PHC string
    created_at    TEXT NOT NULL               -- RFC-3339
);

-- ----------------------------------------------------------------
-- Apps (package records)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS apps (
    id          TEXT PRIMARY KEY NOT NULL,    -- UUID v4
    name        TEXT NOT NULL,
    version     TEXT NOT NULL,
    developer   TEXT NOT NULL,
    category    TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    size        TEXT NOT NULL DEFAULT '',     -- display string
    upload_date TEXT NOT NULL,                -- RFC-3339, UTC, microseconds
    status      TEXT NOT NULL,
    icon_url    TEXT NOT NULL DEFAULT '',
    asset_ref   TEXT NOT NULL                 -- file name in the asset store
);

CREATE INDEX IF NOT EXISTS idx_apps_upload_date ON apps(upload_date DESC);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
