//! The request-scoped viewer context.
//!
//! A [`Context`] is built once per request by the transport layer and passed
//! by reference through every service call. Services never accept a bare
//! [`Viewer`]; they pull it out with [`viewer_from_context`], so tenant
//! scoping cannot be skipped by forgetting an argument.

use std::future::Future;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{Error, Result, user::UserRole};

/// The authenticated caller of one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Viewer {
  /// Organization the request is scoped to.
  pub tenant:  String,
  pub user_id: Uuid,
  pub auth_id: String,
  pub role:    UserRole,
}

impl Viewer {
  pub fn is_admin(&self) -> bool { self.role >= UserRole::Admin }
}

/// Per-request execution context: the bound viewer, if any, and a
/// cancellation signal for in-flight storage calls.
#[derive(Debug, Clone)]
pub struct Context {
  viewer: Option<Viewer>,
  cancel: CancellationToken,
}

impl Context {
  pub fn new(viewer: Viewer) -> Self {
    Self { viewer: Some(viewer), cancel: CancellationToken::new() }
  }

  /// A context with no viewer bound; every service call on it fails with
  /// [`Error::Unauthenticated`].
  pub fn anonymous() -> Self {
    Self { viewer: None, cancel: CancellationToken::new() }
  }

  pub fn cancel(&self) { self.cancel.cancel() }

  pub fn is_cancelled(&self) -> bool { self.cancel.is_cancelled() }

  /// A token that fires when this context is cancelled; for transports that
  /// want to tie it to a connection.
  pub fn cancellation_token(&self) -> CancellationToken { self.cancel.clone() }

  /// Await a storage read, giving up with [`Error::Cancelled`] as soon as
  /// the context is cancelled. Store errors are converted into
  /// [`crate::Error`].
  ///
  /// Only for reads: a write abandoned here may still commit.
  pub async fn run<F, T, E>(&self, fut: F) -> Result<T>
  where
    F: Future<Output = Result<T, E>>,
    E: Into<Error>,
  {
    if self.is_cancelled() {
      return Err(Error::Cancelled);
    }
    tokio::select! {
      biased;
      _ = self.cancel.cancelled() => Err(Error::Cancelled),
      res = fut => res.map_err(Into::into),
    }
  }

  /// Dispatch a storage write unless the context is already cancelled.
  ///
  /// Once dispatched the write is awaited to completion, so the result
  /// always matches what the store holds: `Ok` means committed, `Cancelled`
  /// means nothing was sent.
  pub async fn commit<F, T, E>(&self, fut: F) -> Result<T>
  where
    F: Future<Output = Result<T, E>>,
    E: Into<Error>,
  {
    if self.is_cancelled() {
      return Err(Error::Cancelled);
    }
    fut.await.map_err(Into::into)
  }
}

/// Return the viewer bound to `ctx`, or [`Error::Unauthenticated`].
pub fn viewer_from_context(ctx: &Context) -> Result<&Viewer> {
  ctx.viewer.as_ref().ok_or(Error::Unauthenticated)
}
