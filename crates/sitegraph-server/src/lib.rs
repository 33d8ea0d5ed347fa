//! HTTP facade for sitegraph.
//!
//! Exposes an axum [`Router`] over [`Services`] backed by any
//! [`GraphStore`]. Authentication is the gateway's job; see [`viewer`] for
//! the headers it must forward.

pub mod error;
pub mod handlers;
pub mod viewer;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{delete, get, post},
};
use serde::Deserialize;
use sitegraph_core::{Services, store::GraphStore};
use tower_http::trace::TraceLayer;

use handlers::{entities, images, users};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `SITEGRAPH_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:       "127.0.0.1".to_string(),
      port:       8080,
      store_path: PathBuf::from("sitegraph.db"),
    }
  }
}

impl ServerConfig {
  /// `host:port`, as passed to the listener.
  pub fn bind_address(&self) -> String {
    format!("{}:{}", self.host, self.port)
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: GraphStore> {
  pub services: Services<S>,
  pub config:   Arc<ServerConfig>,
}

impl<S: GraphStore> AppState<S> {
  pub fn new(store: Arc<S>, config: ServerConfig) -> Self {
    Self { services: Services::new(store), config: Arc::new(config) }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the API router for `state`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: GraphStore + Clone + Send + Sync + 'static,
{
  Router::new()
    // Users
    .route("/me", get(users::me::<S>))
    .route("/users", get(users::list::<S>))
    .route("/users/{id}", get(users::get_one::<S>).patch(users::edit::<S>))
    .route("/users/{id}/profile-photo", get(users::profile_photo::<S>))
    // Entities
    .route("/entities/{kind}", post(entities::create::<S>))
    .route("/entities/{kind}/{id}", get(entities::get_one::<S>))
    .route("/entities/{kind}/{id}/attachments", get(entities::attachments::<S>))
    // Images
    .route("/images", post(images::add::<S>))
    .route(
      "/images/{kind}/{entity_id}/{attachment_id}",
      delete(images::delete::<S>),
    )
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────
