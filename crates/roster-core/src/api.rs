//! The `UserAdminApi` port: the three backend operations the console uses.
//!
//! Implemented over HTTP by `roster-cli`; tests use in-process fakes.

use std::future::Future;

use thiserror::Error;

use crate::user::{UserId, UserRecord, UserUpdate};

/// A failed call to the user-management API.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
  #[error("request failed: {0}")]
  Transport(String),

  #[error("server returned {status}{}", suffix(.detail))]
  Status {
    status: u16,
    /// Reason reported in the `{ "detail": ... }` error body, if any.
    detail: Option<String>,
  },

  #[error("unexpected response body: {0}")]
  Decode(String),
}

impl ApiError {
  /// The server-reported reason, when the backend supplied one.
  pub fn detail(&self) -> Option<&str> {
    match self {
      Self::Status { detail, .. } => detail.as_deref(),
      _ => None,
    }
  }
}

fn suffix(detail: &Option<String>) -> String {
  detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default()
}

/// Abstraction over the backend's user-management endpoints.
///
/// The backend is the authority of record; callers never patch local state
/// from these results beyond replacing the whole directory with
/// [`UserAdminApi::list_users`].
pub trait UserAdminApi: Send + Sync {
  /// `GET /auth/users`
  fn list_users(
    &self,
  ) -> impl Future<Output = Result<Vec<UserRecord>, ApiError>> + Send + '_;

  /// `PUT /auth/users/{id}` with body `{ full_name, is_active }`.
  fn update_user<'a>(
    &'a self,
    id: UserId,
    update: &'a UserUpdate,
  ) -> impl Future<Output = Result<(), ApiError>> + Send + 'a;

  /// `DELETE /auth/users/{id}`. Dependent resources are removed server-side.
  fn delete_user(
    &self,
    id: UserId,
  ) -> impl Future<Output = Result<(), ApiError>> + Send + '_;
}
