//! Deletion safety policy.
//!
//! An admin may not delete their own account, and the directory may never
//! lose its last administrator. When the acting administrator cannot be
//! identified every deletion is denied.

use std::fmt;

use crate::{
  session::ActorResolution,
  user::UserRecord,
};

/// Why a deletion was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
  OwnAccount,
  LastAdministrator,
  UnresolvedActor,
}

impl Denial {
  pub fn reason(&self) -> &'static str {
    match self {
      Self::OwnAccount => "Cannot delete your own account.",
      Self::LastAdministrator => "Cannot delete the last administrator.",
      Self::UnresolvedActor => {
        "Cannot verify the signed-in administrator; sign in again."
      }
    }
  }
}

impl fmt::Display for Denial {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.reason())
  }
}

/// A definite allow/deny answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
  Allowed,
  Denied(Denial),
}

impl Verdict {
  pub fn is_allowed(&self) -> bool { matches!(self, Self::Allowed) }

  /// Human-readable reason; empty when allowed.
  pub fn reason(&self) -> &'static str {
    match self {
      Self::Allowed => "",
      Self::Denied(d) => d.reason(),
    }
  }
}

/// Decide whether `actor` may delete `target`.
///
/// `directory` must be the full, unfiltered directory: the administrator
/// count is taken from it, inactive administrators included.
pub fn can_delete(
  actor: &ActorResolution,
  target: &UserRecord,
  directory: &[UserRecord],
) -> Verdict {
  let Some(actor) = actor.actor() else {
    return Verdict::Denied(Denial::UnresolvedActor);
  };
  if target.id == actor.id {
    return Verdict::Denied(Denial::OwnAccount);
  }
  if target.role.is_admin() && admin_count(directory) <= 1 {
    return Verdict::Denied(Denial::LastAdministrator);
  }
  Verdict::Allowed
}

/// Number of records with the admin role.
pub fn admin_count(directory: &[UserRecord]) -> usize {
  directory.iter().filter(|u| u.role.is_admin()).count()
}
