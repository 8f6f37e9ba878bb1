//! User records as served by `GET /auth/users`, and the edit payloads sent
//! back by `PUT /auth/users/{id}`.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ─── Identity ────────────────────────────────────────────────────────────────

/// Backend-assigned account identifier. Opaque to the console.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
  Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

// ─── Role ────────────────────────────────────────────────────────────────────

/// The platform role of an account. Never changed through this console.
///
/// Unknown role strings are preserved in [`Role::Other`] so that a single
/// unexpected record does not fail an entire directory load.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
  Student,
  Company,
  Admin,
  Other(String),
}

impl Role {
  pub fn as_str(&self) -> &str {
    match self {
      Self::Student => "student",
      Self::Company => "company",
      Self::Admin => "admin",
      Self::Other(s) => s,
    }
  }

  pub fn is_admin(&self) -> bool { matches!(self, Self::Admin) }
}

impl From<String> for Role {
  fn from(s: String) -> Self {
    match s.as_str() {
      "student" => Self::Student,
      "company" => Self::Company,
      "admin" => Self::Admin,
      _ => Self::Other(s),
    }
  }
}

impl From<Role> for String {
  fn from(role: Role) -> Self { role.as_str().to_owned() }
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// One account, exactly as last returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
  pub id:         UserId,
  pub full_name:  String,
  pub email:      String,
  pub role:       Role,
  /// Carried as `1`/`0` on the wire. Absent means active.
  #[serde(with = "active_flag", default = "active_default")]
  pub is_active:  bool,
  #[serde(default, deserialize_with = "lenient_timestamp")]
  pub created_at: Option<DateTime<Utc>>,
}

fn active_default() -> bool { true }

// ─── Edit payloads ───────────────────────────────────────────────────────────

/// The editable subset of a [`UserRecord`], scoped to one edit dialog.
///
/// There is no role field: a crafted draft carrying `role` deserializes with
/// that key dropped.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EditDraft {
  pub full_name: String,
  #[serde(with = "active_flag", default = "active_default")]
  pub is_active: bool,
}

impl EditDraft {
  /// Seed a draft from the record being edited.
  pub fn for_user(user: &UserRecord) -> Self {
    Self {
      full_name: user.full_name.clone(),
      is_active: user.is_active,
    }
  }
}

/// Body of `PUT /auth/users/{id}`: `{ full_name, is_active }` and nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserUpdate {
  pub full_name: String,
  #[serde(with = "active_flag")]
  pub is_active: bool,
}

impl From<&EditDraft> for UserUpdate {
  fn from(draft: &EditDraft) -> Self {
    Self {
      full_name: draft.full_name.clone(),
      is_active: draft.is_active,
    }
  }
}

// ─── Wire helpers ────────────────────────────────────────────────────────────

/// `is_active` is an integer flag on the wire; booleans are accepted on input.
/// Any non-zero integer reads as active.
mod active_flag {
  use serde::{Deserialize, Deserializer, Serializer};

  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Flag {
    Bool(bool),
    Int(i64),
  }

  pub fn serialize<S: Serializer>(v: &bool, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u8(u8::from(*v))
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    match Flag::deserialize(d)? {
      Flag::Bool(b) => Ok(b),
      Flag::Int(n) => Ok(n != 0),
    }
  }
}

/// Accept RFC 3339 timestamps, naive ones (taken as UTC) and bare dates.
///
/// `created_at` is display-only: anything unparseable becomes `None` rather
/// than failing the whole record.
fn lenient_timestamp<'de, D>(d: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
  D: Deserializer<'de>,
{
  let Some(raw) = Option::<serde_json::Value>::deserialize(d)? else {
    return Ok(None);
  };
  let Some(text) = raw.as_str() else {
    tracing::debug!(value = %raw, "ignoring non-string created_at");
    return Ok(None);
  };
  let parsed = parse_timestamp(text);
  if parsed.is_none() {
    tracing::debug!(value = text, "ignoring unparseable created_at");
  }
  Ok(parsed)
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
    return Some(dt.with_timezone(&Utc));
  }
  ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    .or_else(|| {
      NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    })
    .map(|naive| naive.and_utc())
}
