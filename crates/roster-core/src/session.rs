//! Identity of the signed-in administrator, read from the persisted session.
//!
//! The session record is a JSON object of the form
//! `{ "token": "...", "user": { "id": 1, ... } }`. Only `user.id` matters to
//! the policy engine; the token is handed to the HTTP client.

use std::{
  io::ErrorKind,
  path::{Path, PathBuf},
};

use serde::Deserialize;
use tracing::debug;

use crate::{
  Error, Result,
  user::UserId,
};

// ─── Actor ───────────────────────────────────────────────────────────────────

/// The administrator operating the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentActor {
  pub id: UserId,
}

/// Outcome of [`CurrentActorResolver::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorResolution {
  Resolved(CurrentActor),
  /// No usable identity in the session. Every deletion is denied.
  Unresolved,
}

impl ActorResolution {
  pub fn actor(&self) -> Option<&CurrentActor> {
    match self {
      Self::Resolved(a) => Some(a),
      Self::Unresolved => None,
    }
  }
}

impl From<Option<UserId>> for ActorResolution {
  fn from(id: Option<UserId>) -> Self {
    id.map_or(Self::Unresolved, |id| Self::Resolved(CurrentActor { id }))
  }
}

// ─── Session record ──────────────────────────────────────────────────────────

/// The persisted session, as written at sign-in.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Session {
  #[serde(default)]
  pub token: Option<String>,
  #[serde(default)]
  pub user:  Option<serde_json::Value>,
}

impl Session {
  pub fn parse(raw: &str) -> Result<Self> { Ok(serde_json::from_str(raw)?) }

  /// The embedded user id, if present and an integer.
  pub fn user_id(&self) -> Result<UserId> {
    self
      .user
      .as_ref()
      .and_then(|u| u.get("id"))
      .and_then(serde_json::Value::as_i64)
      .map(UserId)
      .ok_or(Error::SessionMalformed)
  }
}

/// Somewhere a raw session record can be read from.
pub trait SessionSource: Send + Sync {
  fn read_raw(&self) -> Result<String>;

  fn load(&self) -> Result<Session> { Session::parse(&self.read_raw()?) }
}

/// A session record stored as a JSON file on disk.
#[derive(Debug, Clone)]
pub struct FileSession {
  path: PathBuf,
}

impl FileSession {
  pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }

  pub fn path(&self) -> &Path { &self.path }
}

impl SessionSource for FileSession {
  fn read_raw(&self) -> Result<String> {
    std::fs::read_to_string(&self.path).map_err(|source| match source.kind() {
      ErrorKind::NotFound => Error::SessionMissing,
      _ => Error::SessionIo {
        path: self.path.clone(),
        source,
      },
    })
  }
}

/// A session held in memory; used when the record is supplied directly.
#[derive(Debug, Clone, Default)]
pub struct StaticSession(pub Option<String>);

impl SessionSource for StaticSession {
  fn read_raw(&self) -> Result<String> {
    self.0.clone().ok_or(Error::SessionMissing)
  }
}

// ─── Resolver ────────────────────────────────────────────────────────────────

/// Resolves the acting administrator from a [`SessionSource`].
///
/// Each call re-reads the source so decisions see the session as it is at
/// decision time.
#[derive(Debug, Clone)]
pub struct CurrentActorResolver<S> {
  source: S,
}

impl<S: SessionSource> CurrentActorResolver<S> {
  pub fn new(source: S) -> Self { Self { source } }

  /// Never fails: a missing or malformed session resolves to
  /// [`ActorResolution::Unresolved`].
  pub fn resolve(&self) -> ActorResolution {
    match self.source.load().and_then(|s| s.user_id()) {
      Ok(id) => ActorResolution::Resolved(CurrentActor { id }),
      Err(e) => {
        debug!(error = %e, "current actor unresolved");
        ActorResolution::Unresolved
      }
    }
  }

  /// Bearer token stored alongside the identity, if any.
  pub fn token(&self) -> Option<String> {
    self.source.load().ok().and_then(|s| s.token)
  }
}

#[cfg(test)]
mod tests {
  use std::io::Write as _;

  use super::*;

  fn resolve(raw: Option<&str>) -> ActorResolution {
    CurrentActorResolver::new(StaticSession(raw.map(str::to_owned))).resolve()
  }

  #[test]
  fn well_formed_session_resolves() {
    let res = resolve(Some(r#"{"token":"t","user":{"id":4,"role":"admin"}}"#));
    assert_eq!(res, ActorResolution::Resolved(CurrentActor { id: UserId(4) }));
  }

  #[test]
  fn missing_or_malformed_sessions_are_unresolved() {
    for raw in [
      None,
      Some(""),
      Some("not json"),
      Some("{}"),
      Some(r#"{"user":null}"#),
      Some(r#"{"user":{}}"#),
      Some(r#"{"user":{"id":"4"}}"#),
      Some(r#"{"user":{"id":4.5}}"#),
      Some("[1,2,3]"),
    ] {
      assert_eq!(resolve(raw), ActorResolution::Unresolved, "{raw:?}");
    }
  }

  #[test]
  fn file_session_reads_token_and_identity() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"token":"abc","user":{{"id":12}}}}"#).unwrap();

    let resolver = CurrentActorResolver::new(FileSession::new(file.path()));
    assert_eq!(resolver.token().as_deref(), Some("abc"));
    assert_eq!(resolver.resolve().actor().map(|a| a.id), Some(UserId(12)));
  }

  #[test]
  fn absent_file_is_reported_as_missing() {
    let dir = tempfile::tempdir().unwrap();
    let source = FileSession::new(dir.path().join("session.json"));
    assert!(matches!(source.read_raw(), Err(Error::SessionMissing)));
    assert_eq!(
      CurrentActorResolver::new(source).resolve(),
      ActorResolution::Unresolved
    );
  }
}
