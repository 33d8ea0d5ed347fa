//! Core types, the storage trait and the services of sitegraph.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::GraphStore`]; transports build a
//! [`viewer::Context`] per request and call into [`Services`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod attachment;
pub mod attachments;
pub mod entity;
pub mod error;
pub mod policy;
pub mod resolver;
pub mod store;
pub mod user;
pub mod users;
pub mod viewer;

use std::sync::Arc;

pub use error::{Error, Result};

use attachments::AttachmentManager;
use resolver::EntityResolver;
use store::GraphStore;
use users::UserService;

/// Every service, wired to one shared store.
pub struct Services<S> {
  pub entities:    EntityResolver<S>,
  pub attachments: AttachmentManager<S>,
  pub users:       UserService<S>,
}

impl<S> Clone for Services<S> {
  fn clone(&self) -> Self {
    Self {
      entities:    self.entities.clone(),
      attachments: self.attachments.clone(),
      users:       self.users.clone(),
    }
  }
}

impl<S: GraphStore> Services<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self {
      entities:    EntityResolver::new(Arc::clone(&store)),
      attachments: AttachmentManager::new(Arc::clone(&store)),
      users:       UserService::new(store),
    }
  }
}
