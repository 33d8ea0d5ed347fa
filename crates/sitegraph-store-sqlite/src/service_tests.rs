//! Service-level tests: the core services wired to a real `SqliteStore`.

use std::{sync::Arc, time::Duration as StdDuration};

use chrono::{Duration, Utc};
use sitegraph_core::{
  Error, Services,
  attachment::{AddImageInput, FileKind, NewAttachment},
  entity::{EntityKind, EntityRef},
  store::GraphStore,
  user::{EditUserInput, UserRole, UserStatus},
  viewer::{Context, viewer_from_context},
};
use uuid::Uuid;

use crate::SqliteStore;

struct Harness {
  store:    Arc<SqliteStore>,
  services: Services<SqliteStore>,
  ctx:      Context,
}

async fn harness() -> Harness {
  let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
  let services = Services::new(Arc::clone(&store));
  let viewer = services
    .users
    .establish_viewer("acme", "owner@acme.test", UserRole::Owner)
    .await
    .unwrap();
  Harness { store, services, ctx: Context::new(viewer) }
}

impl Harness {
  async fn login(&self, auth_id: &str, role: UserRole) -> Context {
    let viewer = self
      .services
      .users
      .establish_viewer("acme", auth_id, role)
      .await
      .unwrap();
    Context::new(viewer)
  }
}

fn image_for(entity: EntityRef, file_name: &str) -> AddImageInput {
  AddImageInput {
    entity_type:  entity.kind,
    entity_id:    entity.id,
    img_key:      Uuid::new_v4().to_string(),
    file_name:    file_name.into(),
    file_size:    123,
    modified:     Utc::now(),
    content_type: "image/png".into(),
    category:     None,
  }
}

// ─── Viewer ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn establish_viewer_is_idempotent() {
  let h = harness().await;
  let me = viewer_from_context(&h.ctx).unwrap().clone();
  let again = h
    .services
    .users
    .establish_viewer("acme", "owner@acme.test", UserRole::User)
    .await
    .unwrap();
  assert_eq!(again.user_id, me.user_id);
  // The stored role wins over the asserted one.
  assert_eq!(again.role, UserRole::Owner);
  assert_eq!(h.services.users.users(&h.ctx).await.unwrap().len(), 1);
}

#[tokio::test]
async fn anonymous_context_is_rejected_everywhere() {
  let h = harness().await;
  let anon = Context::anonymous();
  let me = h.services.users.current_user(&h.ctx).await.unwrap();

  assert!(matches!(
    h.services.users.current_user(&anon).await,
    Err(Error::Unauthenticated)
  ));
  assert!(matches!(
    h.services.users.edit_user(&anon, EditUserInput::new(me.id)).await,
    Err(Error::Unauthenticated)
  ));
  assert!(matches!(
    h.services
      .attachments
      .add_image(&anon, image_for(EntityRef::user(me.id), "a.png"))
      .await,
    Err(Error::Unauthenticated)
  ));
  assert!(matches!(
    h.services.attachments.profile_photo(&anon, &me).await,
    Err(Error::Unauthenticated)
  ));
  assert!(matches!(
    h.services
      .attachments
      .delete_image(&anon, EntityKind::User, me.id, Uuid::new_v4())
      .await,
    Err(Error::Unauthenticated)
  ));
}

#[tokio::test]
async fn deactivated_users_cannot_establish_a_viewer() {
  let h = harness().await;
  let worker = h.login("worker@acme.test", UserRole::User).await;
  let worker_id = viewer_from_context(&worker).unwrap().user_id;

  h.services
    .users
    .edit_user(&h.ctx, EditUserInput {
      status: Some(UserStatus::Deactivated),
      ..EditUserInput::new(worker_id)
    })
    .await
    .unwrap();

  let err = h
    .services
    .users
    .establish_viewer("acme", "worker@acme.test", UserRole::User)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::PermissionDenied(_)));
}

#[tokio::test]
async fn cancelled_context_aborts_calls() {
  let h = harness().await;
  let ctx = h.login("owner@acme.test", UserRole::Owner).await;
  ctx.cancel();
  assert!(matches!(
    h.services.users.users(&ctx).await,
    Err(Error::Cancelled)
  ));
  // Another context of the same viewer is unaffected.
  assert!(h.services.users.users(&h.ctx).await.is_ok());
}

impl Harness {
  /// Occupy the connection thread for `dur`, queueing every later call.
  async fn hold_connection(&self, dur: StdDuration) -> tokio::task::JoinHandle<()> {
    let conn = self.store.connection().clone();
    let handle = tokio::spawn(async move {
      conn
        .call(move |_| {
          std::thread::sleep(dur);
          Ok(())
        })
        .await
        .unwrap();
    });
    // Let the blocking call reach the connection thread first.
    tokio::time::sleep(StdDuration::from_millis(20)).await;
    handle
  }
}

fn cancel_after(ctx: &Context, after: StdDuration) {
  let ctx = ctx.clone();
  tokio::spawn(async move {
    tokio::time::sleep(after).await;
    ctx.cancel();
  });
}

#[tokio::test]
async fn write_queued_before_cancel_reports_its_commit() {
  let h = harness().await;
  let u = h.services.users.current_user(&h.ctx).await.unwrap();
  let ctx = h.login("owner@acme.test", UserRole::Owner).await;

  let blocker = h.hold_connection(StdDuration::from_millis(300)).await;
  cancel_after(&ctx, StdDuration::from_millis(100));

  let new = NewAttachment {
    tenant:       "acme".into(),
    entity:       EntityRef::user(u.id),
    store_key:    Uuid::new_v4().to_string(),
    name:         "queued.png".into(),
    size:         1,
    content_type: "image/png".into(),
    kind:         FileKind::Image,
    category:     None,
    modified_at:  Utc::now(),
  };
  let added = ctx.commit(h.store.insert_attachment(new)).await.unwrap();
  assert!(ctx.is_cancelled());
  blocker.await.unwrap();

  let stored = h
    .services
    .attachments
    .attachments(&h.ctx, EntityRef::user(u.id))
    .await
    .unwrap();
  assert_eq!(stored.len(), 1);
  assert_eq!(stored[0].id, added.id);
}

#[tokio::test]
async fn cancelled_add_image_leaves_no_row() {
  let h = harness().await;
  let u = h.services.users.current_user(&h.ctx).await.unwrap();
  let ctx = h.login("owner@acme.test", UserRole::Owner).await;

  let blocker = h.hold_connection(StdDuration::from_millis(300)).await;
  cancel_after(&ctx, StdDuration::from_millis(100));

  let out = h
    .services
    .attachments
    .add_image(&ctx, image_for(EntityRef::user(u.id), "late.png"))
    .await;
  assert!(matches!(out, Err(Error::Cancelled)));
  blocker.await.unwrap();

  let stored = h
    .services
    .attachments
    .attachments(&h.ctx, EntityRef::user(u.id))
    .await
    .unwrap();
  assert!(stored.is_empty());
}

#[tokio::test]
async fn cancelled_edit_leaves_user_unchanged() {
  let h = harness().await;
  let u = h.services.users.current_user(&h.ctx).await.unwrap();
  let ctx = h.login("owner@acme.test", UserRole::Owner).await;

  let blocker = h.hold_connection(StdDuration::from_millis(300)).await;
  cancel_after(&ctx, StdDuration::from_millis(100));

  let input = EditUserInput {
    first_name: Some("Late".into()),
    ..EditUserInput::new(u.id)
  };
  let out = h.services.users.edit_user(&ctx, input).await;
  assert!(matches!(out, Err(Error::Cancelled)));
  blocker.await.unwrap();

  let stored = h.services.users.user(&h.ctx, u.id).await.unwrap();
  assert_eq!(stored.first_name, u.first_name);
}

// ─── EditUser ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn edit_user_status_and_first_name() {
  let h = harness().await;
  let before = h.services.users.current_user(&h.ctx).await.unwrap();
  assert_eq!(before.status, UserStatus::Active);
  assert!(before.first_name.is_empty());

  let after = h
    .services
    .users
    .edit_user(&h.ctx, EditUserInput {
      status: Some(UserStatus::Deactivated),
      first_name: Some("John".into()),
      ..EditUserInput::new(before.id)
    })
    .await
    .unwrap();

  assert_eq!(after.status, UserStatus::Deactivated);
  assert_eq!(after.first_name, "John");
  assert_eq!(after.last_name, before.last_name);
  assert_eq!(after.email, before.email);
  assert_eq!(after.role, before.role);
  assert_eq!(after.auth_id, before.auth_id);
}

#[tokio::test]
async fn edit_user_transitions_are_unrestricted() {
  let h = harness().await;
  let me = h.services.users.current_user(&h.ctx).await.unwrap();
  for status in [UserStatus::Deactivated, UserStatus::Active, UserStatus::Active] {
    let u = h
      .services
      .users
      .edit_user(&h.ctx, EditUserInput {
        status: Some(status),
        ..EditUserInput::new(me.id)
      })
      .await
      .unwrap();
    assert_eq!(u.status, status);
  }
}

#[tokio::test]
async fn empty_edit_changes_nothing() {
  let h = harness().await;
  let before = h.services.users.current_user(&h.ctx).await.unwrap();
  let after = h
    .services
    .users
    .edit_user(&h.ctx, EditUserInput::new(before.id))
    .await
    .unwrap();
  assert_eq!(after, before);
}

#[tokio::test]
async fn edit_unknown_user_is_not_found() {
  let h = harness().await;
  let err = h
    .services
    .users
    .edit_user(&h.ctx, EditUserInput {
      first_name: Some("Ghost".into()),
      ..EditUserInput::new(Uuid::new_v4())
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::NotFound { what: "user", .. }));
}

#[tokio::test]
async fn denied_edit_leaves_user_unchanged() {
  let h = harness().await;
  let worker = h.login("worker@acme.test", UserRole::User).await;
  let owner = h.services.users.current_user(&h.ctx).await.unwrap();

  let err = h
    .services
    .users
    .edit_user(&worker, EditUserInput {
      last_name: Some("Hacked".into()),
      ..EditUserInput::new(owner.id)
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::PermissionDenied(_)));

  let stored = h.services.users.current_user(&h.ctx).await.unwrap();
  assert_eq!(stored, owner);
}

#[tokio::test]
async fn users_in_other_tenants_are_invisible() {
  let h = harness().await;
  let outsider = h
    .services
    .users
    .establish_viewer("globex", "boss@globex.test", UserRole::Owner)
    .await
    .unwrap();

  let err = h
    .services
    .users
    .edit_user(&h.ctx, EditUserInput {
      first_name: Some("X".into()),
      ..EditUserInput::new(outsider.user_id)
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::NotFound { .. }));
}

// ─── Attachments ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_delete_profile_image() {
  let h = harness().await;
  let u = h.services.users.current_user(&h.ctx).await.unwrap();
  let attachments = &h.services.attachments;

  let file = attachments
    .add_image(&h.ctx, image_for(EntityRef::user(u.id), "profile_photo.png"))
    .await
    .unwrap();

  let photo = attachments.profile_photo(&h.ctx, &u).await.unwrap().unwrap();
  assert_eq!(photo.name, "profile_photo.png");

  attachments
    .delete_image(&h.ctx, EntityKind::User, u.id, file.id)
    .await
    .unwrap();

  assert!(attachments.profile_photo(&h.ctx, &u).await.unwrap().is_none());
}

#[tokio::test]
async fn uncategorized_upload_is_primary_whatever_its_content_type() {
  let h = harness().await;
  let u = h.services.users.current_user(&h.ctx).await.unwrap();
  let attachments = &h.services.attachments;

  for content_type in ["application/octet-stream", ""] {
    let mut input = image_for(EntityRef::user(u.id), "blob.bin");
    input.content_type = content_type.into();
    let added = attachments.add_image(&h.ctx, input).await.unwrap();

    let photo = attachments.profile_photo(&h.ctx, &u).await.unwrap();
    assert_eq!(photo.unwrap().name, "blob.bin");

    attachments
      .delete_image(&h.ctx, EntityKind::User, u.id, added.id)
      .await
      .unwrap();
  }
}

#[tokio::test]
async fn newest_uncategorized_image_is_primary() {
  let h = harness().await;
  let loc = h
    .services
    .entities
    .create_entity(&h.ctx, EntityKind::Location, "Tower 12")
    .await
    .unwrap();
  let attachments = &h.services.attachments;

  let mut old = image_for(loc.reference(), "old.png");
  old.modified = Utc::now() - Duration::days(1);
  attachments.add_image(&h.ctx, old).await.unwrap();

  let newest = attachments
    .add_image(&h.ctx, image_for(loc.reference(), "new.png"))
    .await
    .unwrap();

  let mut plan = image_for(loc.reference(), "plan.png");
  plan.category = Some("floor plan".into());
  plan.modified = Utc::now() + Duration::days(1);
  attachments.add_image(&h.ctx, plan).await.unwrap();

  let mut manual = image_for(loc.reference(), "manual.pdf");
  manual.content_type = "application/pdf".into();
  manual.category = Some("manuals".into());
  manual.modified = Utc::now() + Duration::days(2);
  attachments.add_image(&h.ctx, manual).await.unwrap();

  let handle = h
    .services
    .entities
    .resolve(&h.ctx, EntityKind::Location, loc.id)
    .await
    .unwrap();
  let primary = attachments.primary_attachment(&h.ctx, &handle).await.unwrap();
  assert_eq!(primary.unwrap().id, newest.id);

  // Deleting the primary promotes the next candidate.
  attachments
    .delete_image(&h.ctx, EntityKind::Location, loc.id, newest.id)
    .await
    .unwrap();
  let primary = attachments.primary_attachment(&h.ctx, &handle).await.unwrap();
  assert_eq!(primary.unwrap().name, "old.png");

  let listed = attachments.attachments(&h.ctx, loc.reference()).await.unwrap();
  let names: Vec<_> = listed.iter().map(|a| a.name.as_str()).collect();
  assert_eq!(names, ["manual.pdf", "plan.png", "old.png"]);
}

#[tokio::test]
async fn delete_unknown_attachment_is_not_found() {
  let h = harness().await;
  let u = h.services.users.current_user(&h.ctx).await.unwrap();
  let attachments = &h.services.attachments;
  let kept = attachments
    .add_image(&h.ctx, image_for(EntityRef::user(u.id), "keep.png"))
    .await
    .unwrap();

  let err = attachments
    .delete_image(&h.ctx, EntityKind::User, u.id, Uuid::new_v4())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::NotFound { what: "attachment", .. }));

  let photo = attachments.profile_photo(&h.ctx, &u).await.unwrap().unwrap();
  assert_eq!(photo.id, kept.id);
}

#[tokio::test]
async fn delete_through_wrong_owner_is_not_found() {
  let h = harness().await;
  let u = h.services.users.current_user(&h.ctx).await.unwrap();
  let eq = h
    .services
    .entities
    .create_entity(&h.ctx, EntityKind::Equipment, "Generator")
    .await
    .unwrap();
  let attachments = &h.services.attachments;
  let a = attachments
    .add_image(&h.ctx, image_for(eq.reference(), "gen.png"))
    .await
    .unwrap();

  let err = attachments
    .delete_image(&h.ctx, EntityKind::User, u.id, a.id)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::NotFound { .. }));
  assert_eq!(attachments.attachments(&h.ctx, eq.reference()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn add_image_to_missing_owner_is_invalid_entity() {
  let h = harness().await;
  let ghost = EntityRef::new(EntityKind::WorkOrder, Uuid::new_v4());
  let err = h
    .services
    .attachments
    .add_image(&h.ctx, image_for(ghost, "a.png"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::InvalidEntity(_)));
  assert!(h.services.attachments.attachments(&h.ctx, ghost).await.unwrap().is_empty());
}

#[tokio::test]
async fn add_image_validates_input() {
  let h = harness().await;
  let u = h.services.users.current_user(&h.ctx).await.unwrap();
  let owner = EntityRef::user(u.id);

  let mut blank = image_for(owner, "");
  blank.file_name = "   ".into();
  let mut negative = image_for(owner, "a.png");
  negative.file_size = -1;

  for input in [blank, negative] {
    let err = h.services.attachments.add_image(&h.ctx, input).await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
  }
  assert!(h.services.attachments.attachments(&h.ctx, owner).await.unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_image_key_conflicts() {
  let h = harness().await;
  let u = h.services.users.current_user(&h.ctx).await.unwrap();
  let first = image_for(EntityRef::user(u.id), "a.png");
  let mut second = image_for(EntityRef::user(u.id), "b.png");
  second.img_key = first.img_key.clone();

  h.services.attachments.add_image(&h.ctx, first).await.unwrap();
  let err = h.services.attachments.add_image(&h.ctx, second).await.unwrap_err();
  assert!(matches!(err, Error::Conflict(_)));

  let photo = h.services.attachments.profile_photo(&h.ctx, &u).await.unwrap();
  assert_eq!(photo.unwrap().name, "a.png");
}

#[tokio::test]
async fn users_cannot_touch_other_users_photos() {
  let h = harness().await;
  let worker = h.login("worker@acme.test", UserRole::User).await;
  let owner = h.services.users.current_user(&h.ctx).await.unwrap();

  let err = h
    .services
    .attachments
    .add_image(&worker, image_for(EntityRef::user(owner.id), "x.png"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::PermissionDenied(_)));

  let own = h
    .services
    .attachments
    .add_image(&h.ctx, image_for(EntityRef::user(owner.id), "me.png"))
    .await
    .unwrap();
  let err = h
    .services
    .attachments
    .delete_image(&worker, EntityKind::User, owner.id, own.id)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::PermissionDenied(_)));
}

#[tokio::test]
async fn resolver_rejects_bad_references() {
  let h = harness().await;
  let resolver = &h.services.entities;

  let err = resolver
    .resolve_str(&h.ctx, "spaceship", &Uuid::new_v4().to_string())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::InvalidKind(_)));

  let err = resolver.resolve_str(&h.ctx, "location", "42").await.unwrap_err();
  assert!(matches!(err, Error::InvalidEntity(_)));

  let err = resolver
    .resolve(&h.ctx, EntityKind::Location, Uuid::new_v4())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::NotFound { what: "LOCATION", .. }));

  let u = h.services.users.current_user(&h.ctx).await.unwrap();
  let handle = resolver
    .resolve_str(&h.ctx, "user", &u.id.to_string())
    .await
    .unwrap();
  assert_eq!(handle.reference(), EntityRef::user(u.id));
  assert_eq!(handle.tenant(), "acme");
}
