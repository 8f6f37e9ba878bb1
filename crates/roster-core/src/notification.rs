//! Outcome notifications surfaced after a mutation.

use tokio::sync::mpsc;

pub const UPDATED: &str = "User updated successfully";
pub const UPDATE_FAILED: &str = "Failed to update user";
pub const DELETED: &str = "User deleted successfully";
pub const DELETE_FAILED: &str = "Failed to delete user";
pub const LOAD_FAILED: &str =
  "Failed to load users. Please ensure you have admin privileges.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
  Success,
  Error,
}

/// A transient, user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
  pub severity: Severity,
  pub message:  String,
}

impl Notification {
  pub fn success(message: impl Into<String>) -> Self {
    Self {
      severity: Severity::Success,
      message:  message.into(),
    }
  }

  pub fn error(message: impl Into<String>) -> Self {
    Self {
      severity: Severity::Error,
      message:  message.into(),
    }
  }

  /// An error carrying the server-reported reason if there is one,
  /// otherwise `fallback`.
  pub fn failure(detail: Option<&str>, fallback: &str) -> Self {
    Self::error(detail.filter(|d| !d.trim().is_empty()).unwrap_or(fallback))
  }
}

pub type NotificationSender = mpsc::UnboundedSender<Notification>;
pub type NotificationReceiver = mpsc::UnboundedReceiver<Notification>;

/// Create a notification channel.
pub fn channel() -> (NotificationSender, NotificationReceiver) {
  mpsc::unbounded_channel()
}
