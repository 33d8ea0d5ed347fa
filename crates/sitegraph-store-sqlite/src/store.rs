//! [`SqliteStore`]: the SQLite implementation of [`GraphStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use sitegraph_core::{
  attachment::{Attachment, NewAttachment},
  entity::{Entity, EntityKind, EntityRef},
  store::GraphStore,
  user::{EditUserInput, NewUser, User, UserStatus},
};

use crate::{
  Error, Result,
  encode::{
    ATTACHMENT_COLUMNS, ENTITY_COLUMNS, RawAttachment, RawEntity, RawUser,
    USER_COLUMNS, encode_dt, encode_uuid, is_unique_violation,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A sitegraph store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  #[cfg(test)]
  pub(crate) fn connection(&self) -> &tokio_rusqlite::Connection { &self.conn }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    tracing::debug!("schema initialised");
    Ok(())
  }

  async fn query_user(
    &self,
    clause: &'static str,
    tenant: &str,
    key: String,
  ) -> Result<Option<User>> {
    let tenant = tenant.to_owned();

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {USER_COLUMNS} FROM users WHERE tenant = ?1 AND {clause} = ?2"),
              rusqlite::params![tenant, key],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }
}

// ─── GraphStore impl ─────────────────────────────────────────────────────────

impl GraphStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn add_user(&self, tenant: &str, input: NewUser) -> Result<User> {
    let now = Utc::now();
    let user = User {
      id:         Uuid::new_v4(),
      tenant:     tenant.to_owned(),
      auth_id:    input.auth_id,
      email:      input.email,
      first_name: String::new(),
      last_name:  String::new(),
      status:     UserStatus::default(),
      role:       input.role,
      created_at: now,
      updated_at: now,
    };

    let id_str     = encode_uuid(user.id);
    let tenant_str = user.tenant.clone();
    let auth_id    = user.auth_id.clone();
    let email      = user.email.clone();
    let status_str = user.status.to_string();
    let role_str   = user.role.to_string();
    let at_str     = encode_dt(now);

    let inserted = self
      .conn
      .call(move |conn| {
        let res = conn.execute(
          "INSERT INTO users (
             user_id, tenant, auth_id, email, status, role, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
          rusqlite::params![
            id_str, tenant_str, auth_id, email, status_str, role_str, at_str
          ],
        );
        match res {
          Ok(_) => Ok(true),
          Err(e) if is_unique_violation(&e) => Ok(false),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    if !inserted {
      return Err(Error::DuplicateUser(user.auth_id));
    }
    Ok(user)
  }

  async fn get_user(&self, tenant: &str, id: Uuid) -> Result<Option<User>> {
    self.query_user("user_id", tenant, encode_uuid(id)).await
  }

  async fn get_user_by_auth_id(
    &self,
    tenant: &str,
    auth_id: &str,
  ) -> Result<Option<User>> {
    self.query_user("auth_id", tenant, auth_id.to_owned()).await
  }

  async fn list_users(&self, tenant: &str) -> Result<Vec<User>> {
    let tenant = tenant.to_owned();

    let raws: Vec<RawUser> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {USER_COLUMNS} FROM users WHERE tenant = ?1 ORDER BY created_at, user_id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![tenant], RawUser::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUser::into_user).collect()
  }

  async fn update_user(
    &self,
    tenant: &str,
    input: EditUserInput,
    protect_owner: bool,
  ) -> Result<Option<User>> {
    let tenant     = tenant.to_owned();
    let id_str     = encode_uuid(input.id);
    let status_str = input.status.map(|s| s.to_string());
    let role_str   = input.role.map(|r| r.to_string());
    let at_str     = encode_dt(Utc::now());

    // NULL parameters leave the column as it is, so absent fields are never
    // written. The owner guard is evaluated against the row being updated,
    // in the same statement.
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "UPDATE users SET
                   first_name = COALESCE(?3, first_name),
                   last_name  = COALESCE(?4, last_name),
                   email      = COALESCE(?5, email),
                   status     = COALESCE(?6, status),
                   role       = COALESCE(?7, role),
                   updated_at = ?8
                 WHERE tenant = ?1 AND user_id = ?2
                   AND (?9 = 0 OR role <> 'OWNER')
                 RETURNING {USER_COLUMNS}"
              ),
              rusqlite::params![
                tenant,
                id_str,
                input.first_name,
                input.last_name,
                input.email,
                status_str,
                role_str,
                at_str,
                protect_owner,
              ],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  // ── Entities ──────────────────────────────────────────────────────────────

  async fn create_entity(
    &self,
    tenant: &str,
    kind: EntityKind,
    name: &str,
  ) -> Result<Entity> {
    if !kind.is_generic() {
      return Err(Error::UnsupportedKind(kind));
    }

    let entity = Entity {
      id:         Uuid::new_v4(),
      kind,
      tenant:     tenant.to_owned(),
      name:       name.to_owned(),
      created_at: Utc::now(),
    };

    let id_str     = encode_uuid(entity.id);
    let tenant_str = entity.tenant.clone();
    let kind_str   = kind.as_str();
    let name_str   = entity.name.clone();
    let at_str     = encode_dt(entity.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO entities (entity_id, tenant, kind, name, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, tenant_str, kind_str, name_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(entity)
  }

  async fn find_entity(
    &self,
    tenant: &str,
    entity: EntityRef,
  ) -> Result<Option<Entity>> {
    if entity.kind == EntityKind::User {
      let user = self.get_user(tenant, entity.id).await?;
      return Ok(user.map(|u| Entity {
        id:         u.id,
        kind:       EntityKind::User,
        name:       u.display_name(),
        tenant:     u.tenant,
        created_at: u.created_at,
      }));
    }

    let tenant_str = tenant.to_owned();
    let kind_str   = entity.kind.as_str();
    let id_str     = encode_uuid(entity.id);

    let raw: Option<RawEntity> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {ENTITY_COLUMNS} FROM entities
                 WHERE tenant = ?1 AND kind = ?2 AND entity_id = ?3"
              ),
              rusqlite::params![tenant_str, kind_str, id_str],
              RawEntity::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawEntity::into_entity).transpose()
  }

  // ── Attachments ───────────────────────────────────────────────────────────

  async fn insert_attachment(&self, input: NewAttachment) -> Result<Attachment> {
    let attachment = Attachment {
      id:           Uuid::new_v4(),
      entity:       input.entity,
      store_key:    input.store_key,
      name:         input.name,
      size:         input.size,
      content_type: input.content_type,
      kind:         input.kind,
      category:     input.category,
      modified_at:  input.modified_at,
      uploaded_at:  Utc::now(),
    };

    let id_str        = encode_uuid(attachment.id);
    let tenant        = input.tenant;
    let kind_str      = attachment.entity.kind.as_str();
    let entity_id_str = encode_uuid(attachment.entity.id);
    let store_key     = attachment.store_key.clone();
    let name          = attachment.name.clone();
    let size          = attachment.size;
    let content_type  = attachment.content_type.clone();
    let file_kind_str = attachment.kind.to_string();
    let category      = attachment.category.clone();
    let modified_str  = encode_dt(attachment.modified_at);
    let uploaded_str  = encode_dt(attachment.uploaded_at);

    let inserted = self
      .conn
      .call(move |conn| {
        let res = conn.execute(
          "INSERT INTO attachments (
             attachment_id, tenant, entity_kind, entity_id, store_key, name,
             size, content_type, file_kind, category, modified_at, uploaded_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
          rusqlite::params![
            id_str,
            tenant,
            kind_str,
            entity_id_str,
            store_key,
            name,
            size,
            content_type,
            file_kind_str,
            category,
            modified_str,
            uploaded_str,
          ],
        );
        match res {
          Ok(_) => Ok(true),
          Err(e) if is_unique_violation(&e) => Ok(false),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    if !inserted {
      return Err(Error::DuplicateStoreKey(attachment.store_key));
    }
    Ok(attachment)
  }

  async fn list_attachments(
    &self,
    tenant: &str,
    entity: EntityRef,
  ) -> Result<Vec<Attachment>> {
    let tenant        = tenant.to_owned();
    let kind_str      = entity.kind.as_str();
    let entity_id_str = encode_uuid(entity.id);

    let raws: Vec<RawAttachment> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ATTACHMENT_COLUMNS} FROM attachments
           WHERE tenant = ?1 AND entity_kind = ?2 AND entity_id = ?3"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![tenant, kind_str, entity_id_str],
            RawAttachment::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAttachment::into_attachment).collect()
  }

  async fn delete_attachment(
    &self,
    tenant: &str,
    entity: EntityRef,
    id: Uuid,
  ) -> Result<Option<Attachment>> {
    let tenant        = tenant.to_owned();
    let kind_str      = entity.kind.as_str();
    let entity_id_str = encode_uuid(entity.id);
    let id_str        = encode_uuid(id);

    // Ownership check and removal in one statement: a row owned by another
    // entity is simply not matched.
    let raw: Option<RawAttachment> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "DELETE FROM attachments
                 WHERE attachment_id = ?1 AND tenant = ?2
                   AND entity_kind = ?3 AND entity_id = ?4
                 RETURNING {ATTACHMENT_COLUMNS}"
              ),
              rusqlite::params![id_str, tenant, kind_str, entity_id_str],
              RawAttachment::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAttachment::into_attachment).transpose()
  }
}
