//! The in-memory user directory and its filtered view.
//!
//! The directory is a cache of the last successful `GET /auth/users`. It is
//! only ever replaced wholesale, never patched. A failed fetch keeps the
//! previous contents and records the error instead.

use tracing::debug;

use crate::{
  api::ApiError,
  search,
  user::{UserId, UserRecord},
};

/// Identifies one initiated fetch. Only the most recently issued ticket may
/// replace the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket(u64);

/// What happened to a fetch result handed to [`UserDirectory::apply_fetch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
  /// The directory now holds this many records.
  Applied(usize),
  /// The fetch failed; previous contents retained.
  Failed,
  /// A newer fetch was initiated since; the result was dropped.
  Stale,
}

#[derive(Debug, Default)]
pub struct UserDirectory {
  users:      Vec<UserRecord>,
  query:      String,
  /// Derived from `users` and `query`; recomputed on every change to either.
  view:       Vec<UserRecord>,
  load_error: Option<ApiError>,
  issued:     u64,
  loading:    bool,
}

impl UserDirectory {
  pub fn new() -> Self { Self::default() }

  /// Full, unfiltered directory.
  pub fn users(&self) -> &[UserRecord] { &self.users }

  /// Records matching the current query, in directory order.
  pub fn view(&self) -> &[UserRecord] { &self.view }

  pub fn query(&self) -> &str { &self.query }

  pub fn get(&self, id: UserId) -> Option<&UserRecord> {
    self.users.iter().find(|u| u.id == id)
  }

  /// The error from the latest fetch, if it failed.
  pub fn load_error(&self) -> Option<&ApiError> { self.load_error.as_ref() }

  /// Whether the most recently initiated fetch is still outstanding.
  pub fn is_loading(&self) -> bool { self.loading }

  pub fn set_query(&mut self, query: impl Into<String>) {
    self.query = query.into();
    self.recompute();
  }

  /// Record that a fetch is starting and return its ticket.
  pub fn begin_fetch(&mut self) -> FetchTicket {
    self.issued += 1;
    self.loading = true;
    debug!(ticket = self.issued, "directory fetch started");
    FetchTicket(self.issued)
  }

  /// Apply a fetch result if `ticket` is the latest one issued.
  pub fn apply_fetch(
    &mut self,
    ticket: FetchTicket,
    result: Result<Vec<UserRecord>, ApiError>,
  ) -> FetchOutcome {
    if ticket.0 != self.issued {
      debug!(ticket = ticket.0, latest = self.issued, "dropping stale fetch");
      return FetchOutcome::Stale;
    }
    self.loading = false;
    match result {
      Ok(users) => {
        self.users = users;
        self.load_error = None;
        self.recompute();
        FetchOutcome::Applied(self.users.len())
      }
      Err(e) => {
        self.load_error = Some(e);
        FetchOutcome::Failed
      }
    }
  }

  fn recompute(&mut self) {
    self.view = search::filter(&self.users, &self.query)
      .into_iter()
      .cloned()
      .collect();
  }
}
