//! SQL schema for the sitegraph SQLite store.
//!
//! Executed once at connection startup. Migrations are out of scope; the
//! version is recorded in `PRAGMA user_version` for when they are not.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id     TEXT PRIMARY KEY,
    tenant      TEXT NOT NULL,
    auth_id     TEXT NOT NULL,
    email       TEXT NOT NULL,
    first_name  TEXT NOT NULL DEFAULT '',
    last_name   TEXT NOT NULL DEFAULT '',
    status      TEXT NOT NULL DEFAULT 'ACTIVE',      -- 'ACTIVE' | 'DEACTIVATED'
    role        TEXT NOT NULL DEFAULT 'USER',        -- 'USER' | 'ADMIN' | 'OWNER'
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    UNIQUE (tenant, auth_id)
);

-- Every ownable kind other than users.
CREATE TABLE IF NOT EXISTS entities (
    entity_id   TEXT PRIMARY KEY,
    tenant      TEXT NOT NULL,
    kind        TEXT NOT NULL,   -- 'LOCATION' | 'WORK_ORDER' | 'SITE_SURVEY' | 'EQUIPMENT'
    name        TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

-- Owners are polymorphic, so there is no foreign key on (entity_kind,
-- entity_id); the owner is checked once, when the row is inserted.
CREATE TABLE IF NOT EXISTS attachments (
    attachment_id TEXT PRIMARY KEY,
    tenant        TEXT NOT NULL,
    entity_kind   TEXT NOT NULL,
    entity_id     TEXT NOT NULL,
    store_key     TEXT NOT NULL UNIQUE,
    name          TEXT NOT NULL,
    size          INTEGER NOT NULL CHECK (size >= 0),
    content_type  TEXT NOT NULL,
    file_kind     TEXT NOT NULL,   -- 'IMAGE' | 'FILE'
    category      TEXT,
    modified_at   TEXT NOT NULL,   -- RFC 3339 UTC; uploader-supplied
    uploaded_at   TEXT NOT NULL    -- RFC 3339 UTC; server-assigned
);

CREATE INDEX IF NOT EXISTS entities_tenant_kind_idx ON entities(tenant, kind);
CREATE INDEX IF NOT EXISTS attachments_owner_idx
    ON attachments(tenant, entity_kind, entity_id);

PRAGMA user_version = 1;
";
