//! Default authorization policy.
//!
//! Plain functions over the viewer and the request; the services call them
//! after the viewer is known and before anything is written.

use crate::{
  Error, Result,
  entity::{EntityKind, EntityRef},
  user::{EditUserInput, User, UserRole},
  viewer::Viewer,
};

/// May `viewer` apply `input` to `target`?
///
/// Anyone may edit their own names and e-mail. Editing someone else, or
/// touching status or role, takes an admin. Only owners may grant or revoke
/// the owner role.
pub fn check_edit_user(
  viewer: &Viewer,
  target: &User,
  input: &EditUserInput,
) -> Result<()> {
  let is_self = viewer.user_id == target.id;

  if !is_self && !viewer.is_admin() {
    return Err(Error::PermissionDenied(format!(
      "cannot edit user {}",
      target.id
    )));
  }
  if input.is_privileged() && !viewer.is_admin() {
    return Err(Error::PermissionDenied(
      "changing status or role requires an admin".into(),
    ));
  }

  let touches_owner = input.role == Some(UserRole::Owner)
    || (input.role.is_some() && target.role == UserRole::Owner);
  if touches_owner && viewer.role != UserRole::Owner {
    return Err(Error::PermissionDenied(
      "only owners may grant or revoke the owner role".into(),
    ));
  }

  Ok(())
}

/// Whether the write for `input` must not touch a current owner. The
/// store re-checks this at write time, since the target's role may have
/// changed since [`check_edit_user`] saw it.
pub fn must_protect_owner(viewer: &Viewer, input: &EditUserInput) -> bool {
  input.role.is_some() && viewer.role != UserRole::Owner
}

/// May `viewer` add or remove attachments on `entity`?
///
/// Attachments on a user other than the viewer take an admin; every other
/// kind is open to any viewer of the tenant.
pub fn check_write_attachment(viewer: &Viewer, entity: EntityRef) -> Result<()> {
  if entity.kind == EntityKind::User
    && entity.id != viewer.user_id
    && !viewer.is_admin()
  {
    return Err(Error::PermissionDenied(format!(
      "cannot change attachments of user {}",
      entity.id
    )));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use uuid::Uuid;

  use super::*;
  use crate::user::UserStatus;

  fn viewer(role: UserRole) -> Viewer {
    Viewer {
      tenant: "acme".into(),
      user_id: Uuid::new_v4(),
      auth_id: "viewer@acme.test".into(),
      role,
    }
  }

  fn user(id: Uuid, role: UserRole) -> User {
    let now = Utc::now();
    User {
      id,
      tenant: "acme".into(),
      auth_id: "target@acme.test".into(),
      email: "target@acme.test".into(),
      first_name: String::new(),
      last_name: String::new(),
      status: UserStatus::Active,
      role,
      created_at: now,
      updated_at: now,
    }
  }

  #[test]
  fn user_may_rename_self() {
    let v = viewer(UserRole::User);
    let me = user(v.user_id, UserRole::User);
    let input = EditUserInput {
      first_name: Some("John".into()),
      ..EditUserInput::new(me.id)
    };
    assert!(check_edit_user(&v, &me, &input).is_ok());
  }

  #[test]
  fn user_may_not_deactivate_self() {
    let v = viewer(UserRole::User);
    let me = user(v.user_id, UserRole::User);
    let input = EditUserInput {
      status: Some(UserStatus::Deactivated),
      ..EditUserInput::new(me.id)
    };
    assert!(matches!(
      check_edit_user(&v, &me, &input),
      Err(Error::PermissionDenied(_))
    ));
  }

  #[test]
  fn user_may_not_edit_others() {
    let v = viewer(UserRole::User);
    let other = user(Uuid::new_v4(), UserRole::User);
    let input = EditUserInput {
      last_name: Some("X".into()),
      ..EditUserInput::new(other.id)
    };
    assert!(check_edit_user(&v, &other, &input).is_err());
  }

  #[test]
  fn admin_may_deactivate_others_but_not_promote_to_owner() {
    let v = viewer(UserRole::Admin);
    let other = user(Uuid::new_v4(), UserRole::User);
    let deactivate = EditUserInput {
      status: Some(UserStatus::Deactivated),
      ..EditUserInput::new(other.id)
    };
    assert!(check_edit_user(&v, &other, &deactivate).is_ok());

    let promote = EditUserInput {
      role: Some(UserRole::Owner),
      ..EditUserInput::new(other.id)
    };
    assert!(check_edit_user(&v, &other, &promote).is_err());
  }

  #[test]
  fn admin_may_not_demote_owner() {
    let v = viewer(UserRole::Admin);
    let owner = user(Uuid::new_v4(), UserRole::Owner);
    let demote = EditUserInput {
      role: Some(UserRole::User),
      ..EditUserInput::new(owner.id)
    };
    assert!(check_edit_user(&v, &owner, &demote).is_err());
  }

  #[test]
  fn owner_may_do_anything() {
    let v = viewer(UserRole::Owner);
    let other = user(Uuid::new_v4(), UserRole::Owner);
    let input = EditUserInput {
      role: Some(UserRole::User),
      status: Some(UserStatus::Deactivated),
      ..EditUserInput::new(other.id)
    };
    assert!(check_edit_user(&v, &other, &input).is_ok());
  }

  #[test]
  fn role_changes_by_non_owners_protect_owners() {
    let admin = viewer(UserRole::Admin);
    let owner = viewer(UserRole::Owner);
    let role = EditUserInput {
      role: Some(UserRole::Admin),
      ..EditUserInput::new(Uuid::new_v4())
    };
    let rename = EditUserInput {
      first_name: Some("John".into()),
      ..EditUserInput::new(Uuid::new_v4())
    };
    assert!(must_protect_owner(&admin, &role));
    assert!(!must_protect_owner(&admin, &rename));
    assert!(!must_protect_owner(&owner, &role));
  }

  #[test]
  fn attachment_writes() {
    let v = viewer(UserRole::User);
    assert!(check_write_attachment(&v, EntityRef::user(v.user_id)).is_ok());
    assert!(check_write_attachment(&v, EntityRef::user(Uuid::new_v4())).is_err());
    let loc = EntityRef::new(EntityKind::Location, Uuid::new_v4());
    assert!(check_write_attachment(&v, loc).is_ok());
    let admin = viewer(UserRole::Admin);
    assert!(check_write_attachment(&admin, EntityRef::user(Uuid::new_v4())).is_ok());
  }
}
