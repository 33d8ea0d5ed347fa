//! The `GraphStore` trait, the storage collaborator.
//!
//! The trait is implemented by storage backends (e.g.
//! `sitegraph-store-sqlite`). Services depend on this abstraction only.
//!
//! Every method is scoped to a tenant: a record belonging to another tenant
//! is indistinguishable from a missing one. Implementations must make each
//! method atomic; readers never see a half-applied write. Nothing returned
//! by a store may be cached by the caller.

use std::future::Future;

use uuid::Uuid;

use crate::{
  attachment::{Attachment, NewAttachment},
  entity::{Entity, EntityKind, EntityRef},
  user::{EditUserInput, NewUser, User},
};

/// Abstraction over a sitegraph storage backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait GraphStore: Send + Sync {
  /// Backend error. Converting it into [`crate::Error`] is where constraint
  /// violations become [`crate::Error::Conflict`].
  type Error: std::error::Error + Send + Sync + Into<crate::Error> + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Create a user with default status and empty names.
  fn add_user<'a>(
    &'a self,
    tenant: &'a str,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + 'a;

  fn get_user<'a>(
    &'a self,
    tenant: &'a str,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  fn get_user_by_auth_id<'a>(
    &'a self,
    tenant: &'a str,
    auth_id: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  /// All users of a tenant, oldest first.
  fn list_users<'a>(
    &'a self,
    tenant: &'a str,
  ) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + 'a;

  /// Apply the present fields of `input` in one atomic step and return the
  /// full updated record, or `None` if nothing matched.
  ///
  /// With `protect_owner` set, a user who holds the owner role at the time
  /// of the write does not match.
  fn update_user<'a>(
    &'a self,
    tenant: &'a str,
    input: EditUserInput,
    protect_owner: bool,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  // ── Entities ──────────────────────────────────────────────────────────

  /// Create a non-user entity. Returns an error for [`EntityKind::User`].
  fn create_entity<'a>(
    &'a self,
    tenant: &'a str,
    kind: EntityKind,
    name: &'a str,
  ) -> impl Future<Output = Result<Entity, Self::Error>> + Send + 'a;

  /// Look up any kind of entity, users included. For users, `name` is the
  /// display name.
  fn find_entity<'a>(
    &'a self,
    tenant: &'a str,
    entity: EntityRef,
  ) -> impl Future<Output = Result<Option<Entity>, Self::Error>> + Send + 'a;

  // ── Attachments ───────────────────────────────────────────────────────

  /// Persist a new attachment. Fails if `store_key` is already taken.
  fn insert_attachment(
    &self,
    input: NewAttachment,
  ) -> impl Future<Output = Result<Attachment, Self::Error>> + Send + '_;

  /// Every attachment currently linked to `entity`, in no particular order.
  fn list_attachments<'a>(
    &'a self,
    tenant: &'a str,
    entity: EntityRef,
  ) -> impl Future<Output = Result<Vec<Attachment>, Self::Error>> + Send + 'a;

  /// Delete attachment `id` if and only if it belongs to `entity`. Returns
  /// the deleted record, or `None` when nothing matched.
  fn delete_attachment<'a>(
    &'a self,
    tenant: &'a str,
    entity: EntityRef,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Attachment>, Self::Error>> + Send + 'a;
}
