//! User records and the partial-edit input that mutates them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use uuid::Uuid;

/// Whether a user may act within their tenant. Closed set; any value may
/// replace any other.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
  #[default]
  Active,
  Deactivated,
}

/// Permission scope of a user. Variants are ordered from least to most
/// privileged.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum UserRole {
  #[default]
  User,
  Admin,
  Owner,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub id:         Uuid,
  pub tenant:     String,
  /// Identity asserted by the authenticating gateway; unique per tenant.
  pub auth_id:    String,
  pub email:      String,
  pub first_name: String,
  pub last_name:  String,
  pub status:     UserStatus,
  pub role:       UserRole,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl User {
  /// "First Last", falling back to the auth id when both names are empty.
  pub fn display_name(&self) -> String {
    let full = format!("{} {}", self.first_name, self.last_name);
    let full = full.trim();
    if full.is_empty() { self.auth_id.clone() } else { full.to_owned() }
  }
}

/// Input to [`crate::store::GraphStore::add_user`].
#[derive(Debug, Clone)]
pub struct NewUser {
  pub auth_id: String,
  pub email:   String,
  pub role:    UserRole,
}

/// A partial edit of one user. `None` means "leave unchanged"; `Some`
/// overwrites unconditionally, including with an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditUserInput {
  pub id:         Uuid,
  pub first_name: Option<String>,
  pub last_name:  Option<String>,
  pub email:      Option<String>,
  pub status:     Option<UserStatus>,
  pub role:       Option<UserRole>,
}

impl EditUserInput {
  pub fn new(id: Uuid) -> Self { Self { id, ..Self::default() } }

  /// True when no field is present; applying it is a no-op.
  pub fn is_empty(&self) -> bool {
    self.first_name.is_none()
      && self.last_name.is_none()
      && self.email.is_none()
      && self.status.is_none()
      && self.role.is_none()
  }

  /// True when the edit touches fields only administrators may change.
  pub fn is_privileged(&self) -> bool {
    self.status.is_some() || self.role.is_some()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn user() -> User {
    let now = Utc::now();
    User {
      id:         Uuid::new_v4(),
      tenant:     "acme".into(),
      auth_id:    "jane@acme.test".into(),
      email:      "jane@acme.test".into(),
      first_name: String::new(),
      last_name:  "Doe".into(),
      status:     UserStatus::Active,
      role:       UserRole::User,
      created_at: now,
      updated_at: now,
    }
  }

  #[test]
  fn privileged_fields() {
    let id = Uuid::new_v4();
    assert!(EditUserInput::new(id).is_empty());
    assert!(!EditUserInput::new(id).is_privileged());
    let input = EditUserInput { role: Some(UserRole::Admin), ..EditUserInput::new(id) };
    assert!(input.is_privileged());
  }

  #[test]
  fn display_name_falls_back_to_auth_id() {
    let mut u = user();
    assert_eq!(u.display_name(), "Doe");
    u.last_name.clear();
    assert_eq!(u.display_name(), "jane@acme.test");
  }

  #[test]
  fn roles_are_ordered() {
    assert!(UserRole::User < UserRole::Admin);
    assert!(UserRole::Admin < UserRole::Owner);
    assert_eq!("admin".parse::<UserRole>().unwrap(), UserRole::Admin);
  }

  #[test]
  fn status_wire_names() {
    assert_eq!(UserStatus::Deactivated.to_string(), "DEACTIVATED");
    assert_eq!(
      serde_json::to_string(&UserStatus::Active).unwrap(),
      "\"ACTIVE\""
    );
  }
}
