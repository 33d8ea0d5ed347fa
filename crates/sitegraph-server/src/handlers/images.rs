//! Handlers for `/images` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/images` | Body: `AddImageInput`; returns 201 + attachment |
//! | `DELETE` | `/images/:kind/:entity_id/:attachment_id` | Returns the deleted attachment |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use sitegraph_core::{
  attachment::{AddImageInput, Attachment},
  entity::EntityRef,
  store::GraphStore,
};
use uuid::Uuid;

use crate::{AppState, error::ApiError, viewer::RequestContext};

/// `POST /images`
pub async fn add<S>(
  State(state): State<AppState<S>>,
  rc: RequestContext,
  Json(input): Json<AddImageInput>,
) -> Result<impl IntoResponse, ApiError>
where
  S: GraphStore + Clone + Send + Sync + 'static,
{
  let attachment = state.services.attachments.add_image(&rc.ctx, input).await?;
  Ok((StatusCode::CREATED, Json(attachment)))
}

/// `DELETE /images/:kind/:entity_id/:attachment_id`
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  Path((kind, entity_id, attachment_id)): Path<(String, String, Uuid)>,
  rc: RequestContext,
) -> Result<Json<Attachment>, ApiError>
where
  S: GraphStore + Clone + Send + Sync + 'static,
{
  let entity = EntityRef::parse(&kind, &entity_id)?;
  let deleted = state
    .services
    .attachments
    .delete_image(&rc.ctx, entity.kind, entity.id, attachment_id)
    .await?;
  Ok(Json(deleted))
}
