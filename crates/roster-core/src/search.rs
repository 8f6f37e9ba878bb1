//! Free-text filtering of the user directory.

use crate::user::UserRecord;

/// Returns the records matching `query`, in directory order.
///
/// A record matches when the query is a case-insensitive substring of its
/// full name, email or role. An empty or whitespace-only query matches
/// everything.
pub fn filter<'a>(users: &'a [UserRecord], query: &str) -> Vec<&'a UserRecord> {
  if query.trim().is_empty() {
    return users.iter().collect();
  }
  let needle = query.to_lowercase();
  users.iter().filter(|u| matches(u, &needle)).collect()
}

fn matches(user: &UserRecord, needle: &str) -> bool {
  [user.full_name.as_str(), user.email.as_str(), user.role.as_str()]
    .iter()
    .any(|field| field.to_lowercase().contains(needle))
}
