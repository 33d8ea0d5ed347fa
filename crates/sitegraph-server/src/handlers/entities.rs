//! Handlers for `/entities` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/entities/:kind` | Body: `{"name":"..."}`; not for users |
//! | `GET`  | `/entities/:kind/:id` | The resolved handle |
//! | `GET`  | `/entities/:kind/:id/attachments` | Newest first |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use sitegraph_core::{
  Error,
  attachment::Attachment,
  entity::{EntityHandle, EntityKind, EntityRef},
  store::GraphStore,
};

use crate::{AppState, error::ApiError, viewer::RequestContext};

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub name: String,
}

/// `POST /entities/:kind`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Path(kind): Path<String>,
  rc: RequestContext,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: GraphStore + Clone + Send + Sync + 'static,
{
  let kind = kind
    .parse::<EntityKind>()
    .map_err(|_| Error::InvalidKind(kind.clone()))?;
  let entity = state
    .services
    .entities
    .create_entity(&rc.ctx, kind, &body.name)
    .await?;
  Ok((StatusCode::CREATED, Json(entity)))
}

/// `GET /entities/:kind/:id`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path((kind, id)): Path<(String, String)>,
  rc: RequestContext,
) -> Result<Json<EntityHandle>, ApiError>
where
  S: GraphStore + Clone + Send + Sync + 'static,
{
  let handle = state.services.entities.resolve_str(&rc.ctx, &kind, &id).await?;
  Ok(Json(handle))
}

/// `GET /entities/:kind/:id/attachments`
pub async fn attachments<S>(
  State(state): State<AppState<S>>,
  Path((kind, id)): Path<(String, String)>,
  rc: RequestContext,
) -> Result<Json<Vec<Attachment>>, ApiError>
where
  S: GraphStore + Clone + Send + Sync + 'static,
{
  let entity = EntityRef::parse(&kind, &id)?;
  let all = state.services.attachments.attachments(&rc.ctx, entity).await?;
  Ok(Json(all))
}
