//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, UUIDs hyphenated lowercase, enums their
//! `SCREAMING_SNAKE_CASE` wire names.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use sitegraph_core::{
  attachment::{Attachment, FileKind},
  entity::{Entity, EntityKind, EntityRef},
  user::{User, UserRole, UserStatus},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

/// Fixed-width RFC 3339 so that text order in SQL matches time order.
pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_enum<T: FromStr>(column: &'static str, s: &str) -> Result<T> {
  s.parse().map_err(|_| Error::UnknownValue { column, value: s.to_owned() })
}

/// True for UNIQUE and PRIMARY KEY violations, the constraints a caller can
/// trip by reusing a key.
pub fn is_unique_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(f, _)
      if f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        || f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
  )
}

// ─── Users ───────────────────────────────────────────────────────────────────

pub const USER_COLUMNS: &str = "user_id, tenant, auth_id, email, first_name, \
                                last_name, status, role, created_at, updated_at";

/// Raw strings read directly from a `users` row.
pub struct RawUser {
  pub user_id:    String,
  pub tenant:     String,
  pub auth_id:    String,
  pub email:      String,
  pub first_name: String,
  pub last_name:  String,
  pub status:     String,
  pub role:       String,
  pub created_at: String,
  pub updated_at: String,
}

impl RawUser {
  /// Read a row selected with [`USER_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:    row.get(0)?,
      tenant:     row.get(1)?,
      auth_id:    row.get(2)?,
      email:      row.get(3)?,
      first_name: row.get(4)?,
      last_name:  row.get(5)?,
      status:     row.get(6)?,
      role:       row.get(7)?,
      created_at: row.get(8)?,
      updated_at: row.get(9)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      id:         decode_uuid(&self.user_id)?,
      tenant:     self.tenant,
      auth_id:    self.auth_id,
      email:      self.email,
      first_name: self.first_name,
      last_name:  self.last_name,
      status:     decode_enum::<UserStatus>("status", &self.status)?,
      role:       decode_enum::<UserRole>("role", &self.role)?,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

// ─── Entities ────────────────────────────────────────────────────────────────

pub const ENTITY_COLUMNS: &str = "entity_id, tenant, kind, name, created_at";

/// Raw strings read directly from an `entities` row.
pub struct RawEntity {
  pub entity_id:  String,
  pub tenant:     String,
  pub kind:       String,
  pub name:       String,
  pub created_at: String,
}

impl RawEntity {
  /// Read a row selected with [`ENTITY_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      entity_id:  row.get(0)?,
      tenant:     row.get(1)?,
      kind:       row.get(2)?,
      name:       row.get(3)?,
      created_at: row.get(4)?,
    })
  }

  pub fn into_entity(self) -> Result<Entity> {
    Ok(Entity {
      id:         decode_uuid(&self.entity_id)?,
      kind:       decode_enum::<EntityKind>("kind", &self.kind)?,
      tenant:     self.tenant,
      name:       self.name,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

// ─── Attachments ─────────────────────────────────────────────────────────────

pub const ATTACHMENT_COLUMNS: &str = "attachment_id, entity_kind, entity_id, \
                                      store_key, name, size, content_type, \
                                      file_kind, category, modified_at, \
                                      uploaded_at";

/// Raw values read directly from an `attachments` row.
pub struct RawAttachment {
  pub attachment_id: String,
  pub entity_kind:   String,
  pub entity_id:     String,
  pub store_key:     String,
  pub name:          String,
  pub size:          i64,
  pub content_type:  String,
  pub file_kind:     String,
  pub category:      Option<String>,
  pub modified_at:   String,
  pub uploaded_at:   String,
}

impl RawAttachment {
  /// Read a row selected with [`ATTACHMENT_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      attachment_id: row.get(0)?,
      entity_kind:   row.get(1)?,
      entity_id:     row.get(2)?,
      store_key:     row.get(3)?,
      name:          row.get(4)?,
      size:          row.get(5)?,
      content_type:  row.get(6)?,
      file_kind:     row.get(7)?,
      category:      row.get(8)?,
      modified_at:   row.get(9)?,
      uploaded_at:   row.get(10)?,
    })
  }

  pub fn into_attachment(self) -> Result<Attachment> {
    let entity = EntityRef::new(
      decode_enum::<EntityKind>("entity_kind", &self.entity_kind)?,
      decode_uuid(&self.entity_id)?,
    );
    Ok(Attachment {
      id: decode_uuid(&self.attachment_id)?,
      entity,
      store_key: self.store_key,
      name: self.name,
      size: self.size,
      content_type: self.content_type,
      kind: decode_enum::<FileKind>("file_kind", &self.file_kind)?,
      category: self.category,
      modified_at: decode_dt(&self.modified_at)?,
      uploaded_at: decode_dt(&self.uploaded_at)?,
    })
  }
}
