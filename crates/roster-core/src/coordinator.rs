//! Orchestration of edit and delete requests against the backend.
//!
//! Every successful mutation is followed by a full directory refetch; the
//! directory is never patched locally. Failures leave the directory as it
//! was and are reported through the notification channel. Nothing is
//! retried automatically.

use std::{
  collections::HashSet,
  sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
  api::{ApiError, UserAdminApi},
  directory::{FetchOutcome, UserDirectory},
  notification::{self, Notification, NotificationSender},
  policy::{self, Denial, Verdict},
  session::ActorResolution,
  user::{EditDraft, UserId, UserUpdate},
};

/// A mutation that did not go through.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MutationError {
  #[error("a change to user {0} is already in progress")]
  InFlight(UserId),

  #[error("user {0} is not in the directory")]
  UnknownUser(UserId),

  #[error("{0}")]
  Denied(Denial),

  #[error(transparent)]
  Api(#[from] ApiError),
}

pub type SharedDirectory = Arc<Mutex<UserDirectory>>;

/// Coordinates mutations, directory refreshes and outcome notifications.
///
/// Cheap to clone; clones share the directory and the in-flight set.
pub struct MutationCoordinator<A> {
  api:       Arc<A>,
  directory: SharedDirectory,
  in_flight: Arc<Mutex<HashSet<UserId>>>,
  notices:   NotificationSender,
}

impl<A> Clone for MutationCoordinator<A> {
  fn clone(&self) -> Self {
    Self {
      api:       Arc::clone(&self.api),
      directory: Arc::clone(&self.directory),
      in_flight: Arc::clone(&self.in_flight),
      notices:   self.notices.clone(),
    }
  }
}

impl<A: UserAdminApi> MutationCoordinator<A> {
  /// Create a coordinator over an empty directory.
  pub fn new(api: A, notices: NotificationSender) -> Self {
    Self {
      api: Arc::new(api),
      directory: Arc::new(Mutex::new(UserDirectory::new())),
      in_flight: Arc::new(Mutex::new(HashSet::new())),
      notices,
    }
  }

  /// Lock the directory for reading or for updating the search query.
  ///
  /// Never hold the guard across an `.await`.
  pub fn directory(&self) -> MutexGuard<'_, UserDirectory> {
    lock(&self.directory)
  }

  /// Whether a mutation for `id` is outstanding.
  pub fn is_pending(&self, id: UserId) -> bool {
    lock(&self.in_flight).contains(&id)
  }

  // ── Directory ─────────────────────────────────────────────────────────────

  /// Refetch the full directory. If fetches overlap, the most recently
  /// started one determines the contents.
  pub async fn refresh(&self) -> FetchOutcome {
    let ticket = self.directory().begin_fetch();
    let result = self.api.list_users().await;
    if let Err(e) = &result {
      warn!(error = %e, "loading users failed");
    }
    let outcome = self.directory().apply_fetch(ticket, result);
    debug!(?outcome, "directory fetch finished");
    outcome
  }

  // ── Mutations ─────────────────────────────────────────────────────────────

  /// Send `draft` as the new name and status of user `id`.
  ///
  /// The transmitted body never carries a role.
  pub async fn update_user(
    &self,
    id: UserId,
    draft: &EditDraft,
  ) -> Result<(), MutationError> {
    let _claim = self.claim(id)?;
    let update = UserUpdate::from(draft);

    match self.api.update_user(id, &update).await {
      Ok(()) => {
        info!(user = %id, "user updated");
        self.notify(Notification::success(notification::UPDATED));
        self.refresh().await;
        Ok(())
      }
      Err(e) => {
        warn!(user = %id, error = %e, "updating user failed");
        self.notify(Notification::failure(e.detail(), notification::UPDATE_FAILED));
        Err(e.into())
      }
    }
  }

  /// Delete user `id`. Dependent resources are removed by the server.
  ///
  /// The deletion policy is checked against the current, unfiltered
  /// directory first; a denied request never reaches the backend.
  pub async fn delete_user(
    &self,
    actor: &ActorResolution,
    id: UserId,
  ) -> Result<(), MutationError> {
    let verdict = {
      let dir = self.directory();
      let target = dir.get(id).ok_or(MutationError::UnknownUser(id))?;
      policy::can_delete(actor, target, dir.users())
    };
    if let Verdict::Denied(denial) = verdict {
      debug!(user = %id, %denial, "delete refused by policy");
      return Err(MutationError::Denied(denial));
    }

    let _claim = self.claim(id)?;
    match self.api.delete_user(id).await {
      Ok(()) => {
        info!(user = %id, "user deleted");
        self.notify(Notification::success(notification::DELETED));
        self.refresh().await;
        Ok(())
      }
      Err(e) => {
        warn!(user = %id, error = %e, "deleting user failed");
        self.notify(Notification::failure(e.detail(), notification::DELETE_FAILED));
        Err(e.into())
      }
    }
  }

  // ── Helpers ───────────────────────────────────────────────────────────────

  fn claim(&self, id: UserId) -> Result<InFlight, MutationError> {
    if !lock(&self.in_flight).insert(id) {
      debug!(user = %id, "mutation already in flight");
      return Err(MutationError::InFlight(id));
    }
    Ok(InFlight {
      set: Arc::clone(&self.in_flight),
      id,
    })
  }

  fn notify(&self, n: Notification) {
    // The receiver is gone only when the console is shutting down.
    let _ = self.notices.send(n);
  }
}

/// Releases a user's in-flight claim when dropped.
struct InFlight {
  set: Arc<Mutex<HashSet<UserId>>>,
  id:  UserId,
}

impl Drop for InFlight {
  fn drop(&mut self) { lock(&self.set).remove(&self.id); }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
  m.lock().unwrap_or_else(PoisonError::into_inner)
}
