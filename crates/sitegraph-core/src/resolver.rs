//! Entity Reference Resolver.
//!
//! Maps an `(EntityKind, id)` pair to an existing record in the viewer's
//! tenant. The attachment manager goes through here for every owner check,
//! which keeps it ignorant of the concrete entity kinds.

use std::sync::Arc;

use tracing::instrument;
use uuid::Uuid;

use crate::{
  Error, Result,
  entity::{Entity, EntityHandle, EntityKind, EntityRef},
  store::GraphStore,
  viewer::{Context, viewer_from_context},
};

pub struct EntityResolver<S> {
  store: Arc<S>,
}

impl<S> Clone for EntityResolver<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

impl<S: GraphStore> EntityResolver<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// Resolve `kind`/`id` in the viewer's tenant. Read-only.
  #[instrument(skip(self, ctx))]
  pub async fn resolve(
    &self,
    ctx: &Context,
    kind: EntityKind,
    id: Uuid,
  ) -> Result<EntityHandle> {
    let viewer = viewer_from_context(ctx)?;
    let reference = EntityRef::new(kind, id);

    let entity = ctx
      .run(self.store.find_entity(&viewer.tenant, reference))
      .await?
      .ok_or_else(|| Error::not_found(kind.as_str(), id))?;

    Ok(EntityHandle::new(reference, entity.tenant, entity.name))
  }

  /// Like [`Self::resolve`], for an unparsed kind and id as they arrive from
  /// a client.
  pub async fn resolve_str(
    &self,
    ctx: &Context,
    kind: &str,
    id: &str,
  ) -> Result<EntityHandle> {
    let reference = EntityRef::parse(kind, id)?;
    self.resolve(ctx, reference.kind, reference.id).await
  }

  /// Create a non-user entity in the viewer's tenant.
  #[instrument(skip(self, ctx))]
  pub async fn create_entity(
    &self,
    ctx: &Context,
    kind: EntityKind,
    name: &str,
  ) -> Result<Entity> {
    let viewer = viewer_from_context(ctx)?;
    if !kind.is_generic() {
      return Err(Error::InvalidKind(format!(
        "{kind} entities are not created through this path"
      )));
    }
    if name.trim().is_empty() {
      return Err(Error::InvalidInput("name must not be empty".into()));
    }

    let entity = ctx
      .commit(self.store.create_entity(&viewer.tenant, kind, name.trim()))
      .await?;
    tracing::info!(entity = %entity.reference(), "entity created");
    Ok(entity)
  }
}
