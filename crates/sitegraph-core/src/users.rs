//! User Mutation Service: partial edits and viewer-scoped reads of users.

use std::sync::Arc;

use tracing::instrument;
use uuid::Uuid;

use crate::{
  Error, Result,
  policy,
  store::GraphStore,
  user::{EditUserInput, NewUser, User, UserRole, UserStatus},
  viewer::{Context, Viewer, viewer_from_context},
};

fn from_store<E: Into<Error>>(e: E) -> Error { e.into() }

pub struct UserService<S> {
  store: Arc<S>,
}

impl<S> Clone for UserService<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

impl<S: GraphStore> UserService<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// Turn a gateway-asserted identity into a [`Viewer`], creating the user
  /// record on first sight. `role` only applies to newly created users; the
  /// stored role wins afterwards.
  ///
  /// Deactivated users are refused.
  #[instrument(skip(self))]
  pub async fn establish_viewer(
    &self,
    tenant: &str,
    auth_id: &str,
    role: UserRole,
  ) -> Result<Viewer> {
    if tenant.is_empty() || auth_id.is_empty() {
      return Err(Error::Unauthenticated);
    }

    let existing = self
      .store
      .get_user_by_auth_id(tenant, auth_id)
      .await
      .map_err(from_store)?;

    let user = match existing {
      Some(u) => u,
      None => {
        let input = NewUser {
          auth_id: auth_id.to_owned(),
          email:   auth_id.to_owned(),
          role,
        };
        match self.store.add_user(tenant, input).await.map_err(from_store) {
          Ok(u) => {
            tracing::info!(user_id = %u.id, "user created for new identity");
            u
          }
          // Lost a race with a concurrent first request for the same identity.
          Err(Error::Conflict(_)) => self
            .store
            .get_user_by_auth_id(tenant, auth_id)
            .await
            .map_err(from_store)?
            .ok_or_else(|| Error::not_found("user", auth_id))?,
          Err(e) => return Err(e),
        }
      }
    };

    if user.status == UserStatus::Deactivated {
      tracing::warn!(user_id = %user.id, "deactivated user refused");
      return Err(Error::PermissionDenied(format!(
        "user {} is deactivated",
        user.id
      )));
    }

    Ok(Viewer {
      tenant:  user.tenant,
      user_id: user.id,
      auth_id: user.auth_id,
      role:    user.role,
    })
  }

  /// The stored record of the viewer themself.
  pub async fn current_user(&self, ctx: &Context) -> Result<User> {
    let viewer = viewer_from_context(ctx)?;
    self.user(ctx, viewer.user_id).await
  }

  pub async fn user(&self, ctx: &Context, id: Uuid) -> Result<User> {
    let viewer = viewer_from_context(ctx)?;
    ctx
      .run(self.store.get_user(&viewer.tenant, id))
      .await?
      .ok_or_else(|| Error::not_found("user", id))
  }

  pub async fn users(&self, ctx: &Context) -> Result<Vec<User>> {
    let viewer = viewer_from_context(ctx)?;
    ctx.run(self.store.list_users(&viewer.tenant)).await
  }

  /// Apply a partial edit. Absent fields are left exactly as stored; the
  /// returned record reflects every field after the update.
  #[instrument(skip(self, ctx, input), fields(user_id = %input.id))]
  pub async fn edit_user(
    &self,
    ctx: &Context,
    input: EditUserInput,
  ) -> Result<User> {
    let viewer = viewer_from_context(ctx)?;
    let target = self.user(ctx, input.id).await?;

    if let Err(e) = policy::check_edit_user(viewer, &target, &input) {
      tracing::warn!(viewer = %viewer.user_id, "user edit denied");
      return Err(e);
    }
    if input.is_empty() {
      return Ok(target);
    }

    let id = input.id;
    let protect_owner = policy::must_protect_owner(viewer, &input);
    let updated = ctx
      .commit(self.store.update_user(&viewer.tenant, input, protect_owner))
      .await?;

    let Some(user) = updated else {
      // Still there, so it was promoted to owner after the policy check.
      if protect_owner && self.user(ctx, id).await.is_ok() {
        tracing::warn!(viewer = %viewer.user_id, "user edit denied at write");
        return Err(Error::PermissionDenied(
          "only owners may grant or revoke the owner role".into(),
        ));
      }
      return Err(Error::not_found("user", id));
    };
    tracing::info!(status = %user.status, "user edited");
    Ok(user)
  }
}
