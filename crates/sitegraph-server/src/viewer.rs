//! Viewer extraction from trusted gateway headers.
//!
//! Authentication happens in front of this service. The gateway forwards the
//! organization and the user's identity in headers; this extractor turns
//! them into a request [`Context`]. A request without them still gets a
//! context, just an anonymous one, and the services refuse it.

use axum::{extract::FromRequestParts, http::request::Parts};
use sitegraph_core::{store::GraphStore, user::UserRole, viewer::Context};
use tokio_util::sync::DropGuard;

use crate::{AppState, error::ApiError};

pub const TENANT_HEADER: &str = "x-auth-organization";
pub const USER_HEADER: &str = "x-auth-user-email";
pub const ROLE_HEADER: &str = "x-auth-user-role";

/// The per-request context. Dropping it (request finished or client gone)
/// cancels any storage call still running under it.
pub struct RequestContext {
  pub ctx: Context,
  _guard:  DropGuard,
}

impl RequestContext {
  fn new(ctx: Context) -> Self {
    let guard = ctx.cancellation_token().drop_guard();
    Self { ctx, _guard: guard }
  }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
  parts
    .headers
    .get(name)
    .and_then(|v| v.to_str().ok())
    .map(str::trim)
    .filter(|v| !v.is_empty())
}

impl<S> FromRequestParts<AppState<S>> for RequestContext
where
  S: GraphStore + Clone + Send + Sync + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let (Some(tenant), Some(auth_id)) =
      (header(parts, TENANT_HEADER), header(parts, USER_HEADER))
    else {
      return Ok(Self::new(Context::anonymous()));
    };

    let role = match header(parts, ROLE_HEADER) {
      Some(r) => r
        .parse::<UserRole>()
        .map_err(|_| ApiError::BadRequest(format!("unknown role {r:?}")))?,
      None => UserRole::default(),
    };

    let viewer = state
      .services
      .users
      .establish_viewer(tenant, auth_id, role)
      .await?;
    Ok(Self::new(Context::new(viewer)))
  }
}
