//! Handlers for `/me` and `/users` endpoints.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `GET`   | `/me` | The viewer's own record |
//! | `GET`   | `/users` | Every user of the viewer's tenant |
//! | `GET`   | `/users/:id` | 404 if not found |
//! | `PATCH` | `/users/:id` | Body: [`EditUserBody`]; only present fields change |
//! | `GET`   | `/users/:id/profile-photo` | Attachment or `null` |

use axum::{
  Json,
  extract::{Path, State},
};
use serde::Deserialize;
use sitegraph_core::{
  attachment::Attachment,
  store::GraphStore,
  user::{EditUserInput, User, UserRole, UserStatus},
};
use uuid::Uuid;

use crate::{AppState, error::ApiError, viewer::RequestContext};

/// `GET /me`
pub async fn me<S>(
  State(state): State<AppState<S>>,
  rc: RequestContext,
) -> Result<Json<User>, ApiError>
where
  S: GraphStore + Clone + Send + Sync + 'static,
{
  let user = state.services.users.current_user(&rc.ctx).await?;
  Ok(Json(user))
}

/// `GET /users`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  rc: RequestContext,
) -> Result<Json<Vec<User>>, ApiError>
where
  S: GraphStore + Clone + Send + Sync + 'static,
{
  let users = state.services.users.users(&rc.ctx).await?;
  Ok(Json(users))
}

/// `GET /users/:id`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  rc: RequestContext,
) -> Result<Json<User>, ApiError>
where
  S: GraphStore + Clone + Send + Sync + 'static,
{
  let user = state.services.users.user(&rc.ctx, id).await?;
  Ok(Json(user))
}

// ─── Edit ─────────────────────────────────────────────────────────────────────

/// JSON body accepted by `PATCH /users/:id`. Omitted keys are left alone.
#[derive(Debug, Default, Deserialize)]
pub struct EditUserBody {
  pub first_name: Option<String>,
  pub last_name:  Option<String>,
  pub email:      Option<String>,
  pub status:     Option<UserStatus>,
  pub role:       Option<UserRole>,
}

impl EditUserBody {
  fn into_input(self, id: Uuid) -> EditUserInput {
    EditUserInput {
      id,
      first_name: self.first_name,
      last_name:  self.last_name,
      email:      self.email,
      status:     self.status,
      role:       self.role,
    }
  }
}

/// `PATCH /users/:id`, returns the full updated user.
pub async fn edit<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  rc: RequestContext,
  Json(body): Json<EditUserBody>,
) -> Result<Json<User>, ApiError>
where
  S: GraphStore + Clone + Send + Sync + 'static,
{
  let user = state
    .services
    .users
    .edit_user(&rc.ctx, body.into_input(id))
    .await?;
  Ok(Json(user))
}

// ─── Profile photo ────────────────────────────────────────────────────────────

/// `GET /users/:id/profile-photo`: `null` when the user has none.
pub async fn profile_photo<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  rc: RequestContext,
) -> Result<Json<Option<Attachment>>, ApiError>
where
  S: GraphStore + Clone + Send + Sync + 'static,
{
  let user = state.services.users.user(&rc.ctx, id).await?;
  let photo = state.services.attachments.profile_photo(&rc.ctx, &user).await?;
  Ok(Json(photo))
}
