//! Attachment records and the primary-selection rule.
//!
//! Attachments are immutable once written. An "update" is a delete followed
//! by a create. No pointer to the primary attachment is stored; it is
//! derived from the current set on every read.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::entity::{EntityKind, EntityRef};

/// Coarse media class, derived from the content type at creation.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum FileKind {
  Image,
  File,
}

impl FileKind {
  pub fn from_content_type(content_type: &str) -> Self {
    let is_image = content_type
      .get(..6)
      .is_some_and(|p| p.eq_ignore_ascii_case("image/"));
    if is_image { Self::Image } else { Self::File }
  }
}

/// A file or image durably linked to one owning entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
  pub id:           Uuid,
  pub entity:       EntityRef,
  /// Key of the object in the blob store; unique across all attachments.
  pub store_key:    String,
  pub name:         String,
  pub size:         i64,
  pub content_type: String,
  pub kind:         FileKind,
  pub category:     Option<String>,
  /// Modification time reported by the uploader.
  pub modified_at:  DateTime<Utc>,
  /// Server-assigned creation time.
  pub uploaded_at:  DateTime<Utc>,
}

impl Attachment {
  /// Whether this attachment may stand in as "the" image of its owner:
  /// anything uploaded without a category. `kind` plays no part.
  pub fn is_primary_candidate(&self) -> bool {
    self.category.as_deref().is_none_or(|c| c.trim().is_empty())
  }
}

/// Ordering used to pick a primary: most recently modified wins, then most
/// recently uploaded, then highest id so that the choice is total.
fn recency(a: &Attachment, b: &Attachment) -> Ordering {
  a.modified_at
    .cmp(&b.modified_at)
    .then_with(|| a.uploaded_at.cmp(&b.uploaded_at))
    .then_with(|| a.id.cmp(&b.id))
}

/// Pick the primary attachment out of an entity's current attachments.
pub fn select_primary<'a, I>(attachments: I) -> Option<&'a Attachment>
where
  I: IntoIterator<Item = &'a Attachment>,
{
  attachments
    .into_iter()
    .filter(|a| a.is_primary_candidate())
    .max_by(|a, b| recency(a, b))
}

/// Sort newest first using the same ordering as [`select_primary`].
pub fn sort_newest_first(attachments: &mut [Attachment]) {
  attachments.sort_by(|a, b| recency(b, a));
}

/// Input of the `addImage` operation.
#[derive(Debug, Clone, Deserialize)]
pub struct AddImageInput {
  pub entity_type:  EntityKind,
  pub entity_id:    Uuid,
  pub img_key:      String,
  pub file_name:    String,
  pub file_size:    i64,
  pub modified:     DateTime<Utc>,
  pub content_type: String,
  #[serde(default)]
  pub category:     Option<String>,
}

impl AddImageInput {
  pub fn entity(&self) -> EntityRef {
    EntityRef::new(self.entity_type, self.entity_id)
  }
}

/// Input to [`crate::store::GraphStore::insert_attachment`]. The id and
/// `uploaded_at` are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewAttachment {
  pub tenant:       String,
  pub entity:       EntityRef,
  pub store_key:    String,
  pub name:         String,
  pub size:         i64,
  pub content_type: String,
  pub kind:         FileKind,
  pub category:     Option<String>,
  pub modified_at:  DateTime<Utc>,
}
