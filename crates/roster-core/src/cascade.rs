//! What the server removes along with an account.
//!
//! The cascade itself runs server-side and is not verified here. This module
//! only describes it so the console can show it before a delete is confirmed.

use crate::user::Role;

/// Shown above every delete confirmation.
pub const IRREVERSIBLE: &str = "This action cannot be undone.";

/// The resources permanently removed with an account of a given role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeNotice {
  pub removed: &'static [&'static str],
  pub note:    Option<&'static str>,
}

pub fn notice(role: &Role) -> CascadeNotice {
  match role {
    Role::Student => CascadeNotice {
      removed: &[
        "All student resumes",
        "All internship applications",
        "All matching data",
        "Resume embeddings",
      ],
      note:    None,
    },
    Role::Company => CascadeNotice {
      removed: &[
        "All posted internships",
        "All student applications to their internships",
        "All matching data",
      ],
      note:    None,
    },
    Role::Admin => CascadeNotice {
      removed: &["Admin user account"],
      note:    Some("At least one admin must remain in the system."),
    },
    Role::Other(_) => CascadeNotice {
      removed: &["User account"],
      note:    None,
    },
  }
}
