//! Application state machine and event dispatcher.
//!
//! Backend calls run on spawned tasks; their completions come back as
//! [`AppEvent`]s so keyboard input stays live while a request is outstanding.

use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use roster_core::{
  api::UserAdminApi,
  cascade::{self, CascadeNotice},
  coordinator::{MutationCoordinator, MutationError},
  notification::{self, Notification, NotificationReceiver},
  policy::{self, Verdict},
  session::{ActorResolution, CurrentActorResolver, SessionSource},
  user::{EditDraft, UserId, UserRecord},
};
use tokio::sync::mpsc;

/// How long an outcome notification stays on screen.
pub const NOTICE_TTL: Duration = Duration::from_secs(6);

// ─── Modes ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditField {
  Name,
  Active,
}

/// State of the edit dialog. Dropped on submit success or cancel.
#[derive(Debug, Clone)]
pub struct EditDialog {
  pub user:       UserRecord,
  pub draft:      EditDraft,
  pub field:      EditField,
  pub submitting: bool,
  /// Submission this dialog is waiting on. A completion for any other
  /// attempt belongs to a dialog that was cancelled.
  pub attempt:    u64,
}

/// State of the delete confirmation dialog.
#[derive(Debug, Clone)]
pub struct DeleteDialog {
  pub user:       UserRecord,
  pub cascade:    CascadeNotice,
  pub submitting: bool,
}

#[derive(Debug, Clone)]
pub enum Mode {
  Browse,
  /// Typing into the search box; every keystroke refilters.
  Search,
  Edit(EditDialog),
  ConfirmDelete(DeleteDialog),
}

/// Completion of a spawned backend call.
#[derive(Debug)]
pub enum AppEvent {
  Refreshed,
  EditFinished {
    id:      UserId,
    attempt: u64,
    result:  Result<(), MutationError>,
  },
  DeleteFinished {
    id:     UserId,
    result: Result<(), MutationError>,
  },
}

// ─── App ──────────────────────────────────────────────────────────────────────

/// Top-level application state.
pub struct App<A, S> {
  pub mode:        Mode,
  /// Cursor position within the *filtered* view.
  pub list_cursor: usize,
  /// Identity snapshot taken at the last load or delete decision.
  pub actor:       ActorResolution,
  /// One-line hint or policy reason shown in the status bar.
  pub status_msg:  String,
  /// Latest outcome notification and when it arrived.
  pub notice:      Option<(Notification, Instant)>,

  pub coordinator: MutationCoordinator<A>,
  resolver:        CurrentActorResolver<S>,
  notices:         NotificationReceiver,
  events_tx:       mpsc::UnboundedSender<AppEvent>,
  events_rx:       mpsc::UnboundedReceiver<AppEvent>,
  attempts:        u64,
}

impl<A, S> App<A, S>
where
  A: UserAdminApi + 'static,
  S: SessionSource,
{
  pub fn new(api: A, resolver: CurrentActorResolver<S>) -> Self {
    let (notice_tx, notices) = notification::channel();
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    Self {
      mode: Mode::Browse,
      list_cursor: 0,
      actor: resolver.resolve(),
      status_msg: String::new(),
      notice: None,
      coordinator: MutationCoordinator::new(api, notice_tx),
      resolver,
      notices,
      events_tx,
      events_rx,
      attempts: 0,
    }
  }

  // ── Data loading ──────────────────────────────────────────────────────────

  /// Start a full directory fetch in the background.
  pub fn start_refresh(&mut self) {
    self.actor = self.resolver.resolve();
    let coord = self.coordinator.clone();
    let tx = self.events_tx.clone();
    tokio::spawn(async move {
      coord.refresh().await;
      let _ = tx.send(AppEvent::Refreshed);
    });
  }

  // ── Background results ────────────────────────────────────────────────────

  /// Drain completed work and expire the notification. Called every frame.
  pub fn tick(&mut self) {
    while let Ok(event) = self.events_rx.try_recv() {
      self.apply(event);
    }
    self.drain_notices();
    if self
      .notice
      .as_ref()
      .is_some_and(|(_, at)| at.elapsed() >= NOTICE_TTL)
    {
      self.notice = None;
    }
  }

  /// Wait for the next background completion and apply it.
  #[cfg(test)]
  pub async fn next_event(&mut self) {
    if let Some(event) = self.events_rx.recv().await {
      self.apply(event);
    }
    self.drain_notices();
  }

  fn drain_notices(&mut self) {
    while let Ok(n) = self.notices.try_recv() {
      self.notice = Some((n, Instant::now()));
    }
  }

  fn apply(&mut self, event: AppEvent) {
    match event {
      AppEvent::Refreshed => {}
      AppEvent::EditFinished { id, attempt, result } => {
        if let Mode::Edit(dialog) = &mut self.mode
          && dialog.user.id == id
          && dialog.submitting
          && dialog.attempt == attempt
        {
          match result {
            Ok(()) => self.mode = Mode::Browse,
            // Stay open so the admin can retry or cancel.
            Err(_) => dialog.submitting = false,
          }
        }
      }
      AppEvent::DeleteFinished { id, result } => {
        if matches!(&self.mode, Mode::ConfirmDelete(d) if d.user.id == id) {
          self.mode = Mode::Browse;
        }
        if let Err(MutationError::Denied(denial)) = result {
          self.status_msg = denial.reason().to_owned();
        }
      }
    }
    self.clamp_cursor();
  }

  // ── Filtered list ─────────────────────────────────────────────────────────

  /// Number of records in the filtered view.
  pub fn visible_len(&self) -> usize { self.coordinator.directory().view().len() }

  /// The record under the list cursor in the filtered view, if any.
  pub fn cursor_user(&self) -> Option<UserRecord> {
    self
      .coordinator
      .directory()
      .view()
      .get(self.list_cursor)
      .cloned()
  }

  /// The delete verdict for `target` given the current actor snapshot.
  pub fn delete_verdict(&self, target: &UserRecord) -> Verdict {
    let dir = self.coordinator.directory();
    policy::can_delete(&self.actor, target, dir.users())
  }

  fn clamp_cursor(&mut self) {
    let len = self.visible_len();
    if self.list_cursor >= len {
      self.list_cursor = len.saturating_sub(1);
    }
  }

  fn set_query(&mut self, query: String) {
    self.coordinator.directory().set_query(query);
    self.list_cursor = 0;
  }

  // ── Key handling ──────────────────────────────────────────────────────────

  /// Process a key event. Returns `true` to continue, `false` to quit.
  pub fn handle_key(&mut self, key: KeyEvent) -> bool {
    // Global: Ctrl-C quits from anywhere.
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
      return false;
    }

    match self.mode {
      Mode::Browse => return self.handle_browse_key(key),
      Mode::Search => self.handle_search_key(key),
      Mode::Edit(_) => self.handle_edit_key(key),
      Mode::ConfirmDelete(_) => self.handle_delete_key(key),
    }
    true
  }

  fn handle_browse_key(&mut self, key: KeyEvent) -> bool {
    self.status_msg.clear();
    match key.code {
      KeyCode::Char('q') => return false,

      KeyCode::Down | KeyCode::Char('j') => {
        if self.list_cursor + 1 < self.visible_len() {
          self.list_cursor += 1;
        }
      }
      KeyCode::Up | KeyCode::Char('k') => {
        self.list_cursor = self.list_cursor.saturating_sub(1);
      }

      KeyCode::Char('/') => self.mode = Mode::Search,
      KeyCode::Esc => self.set_query(String::new()),
      KeyCode::Char('r') => self.start_refresh(),
      KeyCode::Enter | KeyCode::Char('e') => self.open_edit(),
      KeyCode::Char('d') | KeyCode::Delete => self.open_delete(),

      _ => {}
    }
    true
  }

  fn handle_search_key(&mut self, key: KeyEvent) {
    let mut query = self.coordinator.directory().query().to_owned();
    match key.code {
      KeyCode::Esc => {
        self.mode = Mode::Browse;
        query.clear();
      }
      KeyCode::Enter => {
        self.mode = Mode::Browse;
        return;
      }
      KeyCode::Backspace => {
        query.pop();
      }
      KeyCode::Char(c) => query.push(c),
      _ => return,
    }
    self.set_query(query);
  }

  fn handle_edit_key(&mut self, key: KeyEvent) {
    let Mode::Edit(dialog) = &mut self.mode else {
      return;
    };
    match (key.code, dialog.field) {
      (KeyCode::Esc, _) => self.mode = Mode::Browse,
      (KeyCode::Enter, _) => self.submit_edit(),
      (KeyCode::Tab | KeyCode::BackTab | KeyCode::Down | KeyCode::Up, field) => {
        dialog.field = match field {
          EditField::Name => EditField::Active,
          EditField::Active => EditField::Name,
        };
      }
      (KeyCode::Char(' ') | KeyCode::Left | KeyCode::Right, EditField::Active) => {
        dialog.draft.is_active = !dialog.draft.is_active;
      }
      (KeyCode::Backspace, EditField::Name) => {
        dialog.draft.full_name.pop();
      }
      (KeyCode::Char(c), EditField::Name) => dialog.draft.full_name.push(c),
      _ => {}
    }
  }

  fn handle_delete_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Char('y') | KeyCode::Enter => self.confirm_delete(),
      KeyCode::Char('n') | KeyCode::Esc => {
        if matches!(&self.mode, Mode::ConfirmDelete(d) if !d.submitting) {
          self.mode = Mode::Browse;
        }
      }
      _ => {}
    }
  }

  // ── Dialogs ───────────────────────────────────────────────────────────────

  fn open_edit(&mut self) {
    if let Some(user) = self.cursor_user() {
      self.mode = Mode::Edit(EditDialog {
        draft: EditDraft::for_user(&user),
        user,
        field: EditField::Name,
        submitting: false,
        attempt: 0,
      });
    }
  }

  /// Open the confirmation only when the policy allows the deletion;
  /// otherwise show the reason.
  fn open_delete(&mut self) {
    let Some(user) = self.cursor_user() else {
      return;
    };
    self.actor = self.resolver.resolve();
    match self.delete_verdict(&user) {
      Verdict::Allowed => {
        self.mode = Mode::ConfirmDelete(DeleteDialog {
          cascade: cascade::notice(&user.role),
          user,
          submitting: false,
        });
      }
      Verdict::Denied(denial) => self.status_msg = denial.reason().to_owned(),
    }
  }

  fn submit_edit(&mut self) {
    let Mode::Edit(dialog) = &mut self.mode else {
      return;
    };
    if dialog.submitting {
      return;
    }
    self.attempts += 1;
    let attempt = self.attempts;
    dialog.submitting = true;
    dialog.attempt = attempt;

    let id = dialog.user.id;
    let draft = dialog.draft.clone();
    let coord = self.coordinator.clone();
    let tx = self.events_tx.clone();
    tokio::spawn(async move {
      let result = coord.update_user(id, &draft).await;
      let _ = tx.send(AppEvent::EditFinished { id, attempt, result });
    });
  }

  fn confirm_delete(&mut self) {
    let Mode::ConfirmDelete(dialog) = &mut self.mode else {
      return;
    };
    if dialog.submitting {
      return;
    }
    dialog.submitting = true;

    let id = dialog.user.id;
    let actor = self.resolver.resolve();
    let coord = self.coordinator.clone();
    let tx = self.events_tx.clone();
    tokio::spawn(async move {
      let result = coord.delete_user(&actor, id).await;
      let _ = tx.send(AppEvent::DeleteFinished { id, result });
    });
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use roster_core::{
    api::ApiError,
    notification::Severity,
    session::StaticSession,
    user::{Role, UserUpdate},
  };

  use super::*;

  #[derive(Clone, Default)]
  struct FakeApi {
    users:     Arc<Mutex<Vec<UserRecord>>>,
    put_error: Arc<Mutex<Option<ApiError>>>,
    del_error: Arc<Mutex<Option<ApiError>>>,
  }

  impl UserAdminApi for FakeApi {
    async fn list_users(&self) -> Result<Vec<UserRecord>, ApiError> {
      Ok(self.users.lock().unwrap().clone())
    }

    async fn update_user(&self, id: UserId, update: &UserUpdate) -> Result<(), ApiError> {
      if let Some(e) = self.put_error.lock().unwrap().clone() {
        return Err(e);
      }
      for u in self.users.lock().unwrap().iter_mut().filter(|u| u.id == id) {
        u.full_name = update.full_name.clone();
        u.is_active = update.is_active;
      }
      Ok(())
    }

    async fn delete_user(&self, id: UserId) -> Result<(), ApiError> {
      if let Some(e) = self.del_error.lock().unwrap().clone() {
        return Err(e);
      }
      self.users.lock().unwrap().retain(|u| u.id != id);
      Ok(())
    }
  }

  fn user(id: i64, name: &str, role: Role) -> UserRecord {
    UserRecord {
      id: UserId(id),
      full_name: name.into(),
      email: format!("{}@x.com", name.to_lowercase()),
      role,
      is_active: true,
      created_at: None,
    }
  }

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn type_str(app: &mut App<FakeApi, StaticSession>, s: &str) {
    for c in s.chars() {
      app.handle_key(key(KeyCode::Char(c)));
    }
  }

  async fn app() -> (FakeApi, App<FakeApi, StaticSession>) {
    let api = FakeApi::default();
    *api.users.lock().unwrap() = vec![
      user(1, "Root", Role::Admin),
      user(2, "Bob", Role::Student),
      user(3, "Acme", Role::Company),
    ];
    let session = StaticSession(Some(r#"{"token":"t","user":{"id":1}}"#.into()));
    let mut app = App::new(api.clone(), CurrentActorResolver::new(session));
    app.start_refresh();
    app.next_event().await;
    (api, app)
  }

  #[tokio::test]
  async fn search_filters_live_and_escape_clears() {
    let (_api, mut app) = app().await;
    assert_eq!(app.visible_len(), 3);

    app.handle_key(key(KeyCode::Char('/')));
    type_str(&mut app, "bo");
    assert_eq!(app.visible_len(), 1);
    assert_eq!(app.cursor_user().unwrap().id, UserId(2));

    app.handle_key(key(KeyCode::Esc));
    assert!(matches!(app.mode, Mode::Browse));
    assert_eq!(app.visible_len(), 3);
  }

  #[tokio::test]
  async fn own_account_cannot_open_delete() {
    let (_api, mut app) = app().await;
    app.handle_key(key(KeyCode::Char('d')));
    assert!(matches!(app.mode, Mode::Browse));
    assert_eq!(app.status_msg, "Cannot delete your own account.");
  }

  #[tokio::test]
  async fn edit_success_closes_dialog_and_refreshes() {
    let (_api, mut app) = app().await;
    app.handle_key(key(KeyCode::Down));
    app.handle_key(key(KeyCode::Char('e')));
    assert!(matches!(&app.mode, Mode::Edit(d) if d.user.id == UserId(2)));

    type_str(&mut app, "by");
    app.handle_key(key(KeyCode::Tab));
    app.handle_key(key(KeyCode::Char(' ')));
    app.handle_key(key(KeyCode::Enter));
    assert!(matches!(&app.mode, Mode::Edit(d) if d.submitting));

    app.next_event().await;
    assert!(matches!(app.mode, Mode::Browse));
    let bob = app.coordinator.directory().get(UserId(2)).cloned().unwrap();
    assert_eq!(bob.full_name, "Bobby");
    assert!(!bob.is_active);
    let (notice, _) = app.notice.clone().unwrap();
    assert_eq!(notice.severity, Severity::Success);
  }

  #[tokio::test]
  async fn edit_failure_keeps_dialog_open() {
    let (api, mut app) = app().await;
    *api.put_error.lock().unwrap() = Some(ApiError::Status {
      status: 400,
      detail: Some("name too long".into()),
    });
    app.handle_key(key(KeyCode::Down));
    app.handle_key(key(KeyCode::Enter));
    app.handle_key(key(KeyCode::Enter));

    app.next_event().await;
    assert!(matches!(&app.mode, Mode::Edit(d) if !d.submitting));
    assert_eq!(app.notice.clone().unwrap().0.message, "name too long");
    assert_eq!(app.coordinator.directory().get(UserId(2)).unwrap().full_name, "Bob");
  }

  #[tokio::test]
  async fn confirmed_delete_closes_and_removes() {
    let (_api, mut app) = app().await;
    app.handle_key(key(KeyCode::Char('/')));
    type_str(&mut app, "acme");
    app.handle_key(key(KeyCode::Enter));
    app.handle_key(key(KeyCode::Char('d')));
    let Mode::ConfirmDelete(dialog) = &app.mode else {
      panic!("expected delete confirmation");
    };
    assert_eq!(dialog.cascade, cascade::notice(&Role::Company));

    app.handle_key(key(KeyCode::Char('y')));
    app.next_event().await;
    assert!(matches!(app.mode, Mode::Browse));
    assert!(app.coordinator.directory().get(UserId(3)).is_none());
    assert_eq!(app.visible_len(), 0);
    assert_eq!(app.list_cursor, 0);
  }

  #[tokio::test]
  async fn failed_delete_closes_dialog_and_reports_detail() {
    let (api, mut app) = app().await;
    *api.del_error.lock().unwrap() = Some(ApiError::Status {
      status: 409,
      detail: Some("company has open internships".into()),
    });
    app.handle_key(key(KeyCode::Down));
    app.handle_key(key(KeyCode::Down));
    app.handle_key(key(KeyCode::Char('d')));
    assert!(matches!(&app.mode, Mode::ConfirmDelete(d) if d.user.id == UserId(3)));

    app.handle_key(key(KeyCode::Char('y')));
    app.next_event().await;
    assert!(matches!(app.mode, Mode::Browse));
    let (notice, _) = app.notice.clone().unwrap();
    assert_eq!(notice.severity, Severity::Error);
    assert_eq!(notice.message, "company has open internships");
    assert!(app.coordinator.directory().get(UserId(3)).is_some());
    assert_eq!(app.visible_len(), 3);
  }

  #[tokio::test]
  async fn cancelled_edit_completion_leaves_reopened_dialog_alone() {
    let (_api, mut app) = app().await;
    app.handle_key(key(KeyCode::Down));
    app.handle_key(key(KeyCode::Char('e')));
    type_str(&mut app, "by");
    app.handle_key(key(KeyCode::Enter));
    app.handle_key(key(KeyCode::Esc));
    assert!(matches!(app.mode, Mode::Browse));

    app.handle_key(key(KeyCode::Char('e')));
    type_str(&mut app, "!");

    app.next_event().await;
    let Mode::Edit(dialog) = &app.mode else {
      panic!("reopened edit dialog was closed");
    };
    assert_eq!(dialog.user.id, UserId(2));
    assert!(!dialog.submitting);
    assert!(dialog.draft.full_name.ends_with('!'));
  }

  #[tokio::test]
  async fn notice_expires_after_ttl() {
    let (_api, mut app) = app().await;
    app.notice = Some((Notification::success("fresh"), Instant::now()));
    app.tick();
    assert!(app.notice.is_some());

    let Some(stale) = Instant::now().checked_sub(NOTICE_TTL) else {
      return;
    };
    app.notice = Some((Notification::success("stale"), stale));
    app.tick();
    assert!(app.notice.is_none());
  }
}
