//! Attachment Manager: create, list, select-primary and delete attachments
//! for any kind of owning entity.

use std::sync::Arc;

use tracing::instrument;
use uuid::Uuid;

use crate::{
  Error, Result,
  attachment::{
    AddImageInput, Attachment, FileKind, NewAttachment, select_primary,
    sort_newest_first,
  },
  entity::{EntityHandle, EntityKind, EntityRef},
  policy,
  resolver::EntityResolver,
  store::GraphStore,
  user::User,
  viewer::{Context, viewer_from_context},
};

pub struct AttachmentManager<S> {
  store:    Arc<S>,
  resolver: EntityResolver<S>,
}

impl<S> Clone for AttachmentManager<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), resolver: self.resolver.clone() }
  }
}

fn validate(input: &AddImageInput) -> Result<()> {
  if input.file_name.trim().is_empty() {
    return Err(Error::InvalidInput("file name must not be empty".into()));
  }
  if input.img_key.trim().is_empty() {
    return Err(Error::InvalidInput("image key must not be empty".into()));
  }
  if input.file_size < 0 {
    return Err(Error::InvalidInput(format!(
      "file size must not be negative, got {}",
      input.file_size
    )));
  }
  Ok(())
}

impl<S: GraphStore> AttachmentManager<S> {
  pub fn new(store: Arc<S>) -> Self {
    let resolver = EntityResolver::new(Arc::clone(&store));
    Self { store, resolver }
  }

  /// Attach a new image or file to the entity named in `input`.
  #[instrument(
    skip(self, ctx, input),
    fields(entity = %input.entity(), file_name = %input.file_name)
  )]
  pub async fn add_image(
    &self,
    ctx: &Context,
    input: AddImageInput,
  ) -> Result<Attachment> {
    let viewer = viewer_from_context(ctx)?;
    validate(&input)?;

    let handle = self
      .resolver
      .resolve(ctx, input.entity_type, input.entity_id)
      .await
      .map_err(|e| match e {
        Error::NotFound { .. } | Error::InvalidKind(_) => {
          Error::InvalidEntity(format!("no such owner {}", input.entity()))
        }
        other => other,
      })?;

    if let Err(e) = policy::check_write_attachment(viewer, handle.reference()) {
      tracing::warn!(viewer = %viewer.user_id, "attachment write denied");
      return Err(e);
    }

    let new = NewAttachment {
      tenant:       handle.tenant().to_owned(),
      entity:       handle.reference(),
      kind:         FileKind::from_content_type(&input.content_type),
      store_key:    input.img_key,
      name:         input.file_name,
      size:         input.file_size,
      content_type: input.content_type,
      category:     input.category,
      modified_at:  input.modified,
    };

    let attachment = ctx.commit(self.store.insert_attachment(new)).await?;
    tracing::info!(attachment_id = %attachment.id, "attachment added");
    Ok(attachment)
  }

  /// Every attachment of `entity`, most recently modified first.
  #[instrument(skip(self, ctx), fields(entity = %entity))]
  pub async fn attachments(
    &self,
    ctx: &Context,
    entity: EntityRef,
  ) -> Result<Vec<Attachment>> {
    let viewer = viewer_from_context(ctx)?;
    let mut all = ctx
      .run(self.store.list_attachments(&viewer.tenant, entity))
      .await?;
    sort_newest_first(&mut all);
    Ok(all)
  }

  /// The attachment that currently represents `entity`, if any.
  ///
  /// Always read from the store, so a delete that has returned is visible
  /// here.
  #[instrument(skip(self, ctx, entity), fields(entity = %entity.reference()))]
  pub async fn primary_attachment(
    &self,
    ctx: &Context,
    entity: &EntityHandle,
  ) -> Result<Option<Attachment>> {
    let viewer = viewer_from_context(ctx)?;
    if entity.tenant() != viewer.tenant {
      return Err(Error::not_found(entity.kind().as_str(), entity.id()));
    }

    let all = ctx
      .run(self.store.list_attachments(&viewer.tenant, entity.reference()))
      .await?;
    Ok(select_primary(&all).cloned())
  }

  /// The profile photo of `user`: the primary attachment of the user entity.
  pub async fn profile_photo(
    &self,
    ctx: &Context,
    user: &User,
  ) -> Result<Option<Attachment>> {
    let handle = EntityHandle::new(
      EntityRef::user(user.id),
      user.tenant.clone(),
      user.display_name(),
    );
    self.primary_attachment(ctx, &handle).await
  }

  /// Permanently remove attachment `attachment_id` from the given entity.
  #[instrument(skip(self, ctx))]
  pub async fn delete_image(
    &self,
    ctx: &Context,
    entity_type: EntityKind,
    entity_id: Uuid,
    attachment_id: Uuid,
  ) -> Result<Attachment> {
    let viewer = viewer_from_context(ctx)?;
    let entity = EntityRef::new(entity_type, entity_id);

    if let Err(e) = policy::check_write_attachment(viewer, entity) {
      tracing::warn!(viewer = %viewer.user_id, "attachment delete denied");
      return Err(e);
    }

    let deleted = ctx
      .commit(self.store.delete_attachment(&viewer.tenant, entity, attachment_id))
      .await?
      .ok_or_else(|| Error::not_found("attachment", attachment_id))?;
    tracing::info!("attachment deleted");
    Ok(deleted)
  }
}
