//! Entity references: the polymorphic owners of attachments.
//!
//! An attachment never names a concrete entity type. It names an
//! [`EntityRef`], a closed `{kind, id}` pair, and the resolver turns that pair
//! into an [`EntityHandle`] once it has confirmed the record exists.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::{Error, Result};

/// Every kind of record that can own attachments.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumIter,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum EntityKind {
  Location,
  WorkOrder,
  SiteSurvey,
  Equipment,
  User,
}

impl EntityKind {
  /// The stored and wire spelling, e.g. `WORK_ORDER`.
  pub fn as_str(self) -> &'static str { self.into() }

  /// Kinds created through [`crate::store::GraphStore::create_entity`];
  /// users have their own lifecycle.
  pub fn is_generic(self) -> bool { !matches!(self, Self::User) }
}

/// A typed pointer at one owning record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
  pub kind: EntityKind,
  pub id:   Uuid,
}

impl EntityRef {
  pub fn new(kind: EntityKind, id: Uuid) -> Self { Self { kind, id } }

  pub fn user(id: Uuid) -> Self { Self::new(EntityKind::User, id) }

  /// Parse an externally supplied `(kind, id)` pair.
  ///
  /// Unknown kinds fail with [`Error::InvalidKind`]; ids that are not UUIDs
  /// fail with [`Error::InvalidEntity`].
  pub fn parse(kind: &str, id: &str) -> Result<Self> {
    let kind = kind
      .parse::<EntityKind>()
      .map_err(|_| Error::InvalidKind(kind.to_owned()))?;
    let id = Uuid::parse_str(id)
      .map_err(|_| Error::InvalidEntity(format!("malformed id {id:?}")))?;
    Ok(Self { kind, id })
  }
}

impl fmt::Display for EntityRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.kind, self.id)
  }
}

/// A stored non-user entity (location, work order, …).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
  pub id:         Uuid,
  pub kind:       EntityKind,
  pub tenant:     String,
  pub name:       String,
  pub created_at: DateTime<Utc>,
}

impl Entity {
  pub fn reference(&self) -> EntityRef { EntityRef::new(self.kind, self.id) }
}

/// Proof that an [`EntityRef`] resolved to an existing record in a tenant.
///
/// Only the resolver constructs handles, so holding one means the owner was
/// checked at least once during this request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityHandle {
  reference: EntityRef,
  tenant:    String,
  name:      String,
}

impl EntityHandle {
  pub(crate) fn new(reference: EntityRef, tenant: String, name: String) -> Self {
    Self { reference, tenant, name }
  }

  pub fn reference(&self) -> EntityRef { self.reference }
  pub fn kind(&self) -> EntityKind { self.reference.kind }
  pub fn id(&self) -> Uuid { self.reference.id }
  pub fn tenant(&self) -> &str { &self.tenant }
  pub fn name(&self) -> &str { &self.name }
}
