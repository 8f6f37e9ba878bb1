//! TUI rendering: header, user table, status bar and dialogs.

pub mod dialogs;
pub mod user_list;

use chrono::Local;
use ratatui::{
  Frame,
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Paragraph},
};
use roster_core::{
  api::UserAdminApi,
  notification::{self, Severity},
  session::SessionSource,
};

use crate::app::{App, Mode};

// ─── Root draw ────────────────────────────────────────────────────────────────

/// Main draw function called each frame.
pub fn draw<A, S>(f: &mut Frame, app: &App<A, S>)
where
  A: UserAdminApi + 'static,
  S: SessionSource,
{
  let area = f.area();
  let banner = app.coordinator.directory().load_error().is_some();

  // Vertical stack: header, optional banner, body, status bar.
  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1),                         // header
      Constraint::Length(if banner { 1 } else { 0 }), // load failure
      Constraint::Min(0),                            // body
      Constraint::Length(1),                         // status bar
    ])
    .split(area);

  draw_header(f, rows[0], app);
  if banner {
    draw_banner(f, rows[1]);
  }
  user_list::draw(f, rows[2], app);
  draw_status(f, rows[3], app);

  match &app.mode {
    Mode::Edit(dialog) => dialogs::draw_edit(f, area, dialog),
    Mode::ConfirmDelete(dialog) => dialogs::draw_delete(f, area, dialog),
    Mode::Browse | Mode::Search => {}
  }
}

// ─── Header ───────────────────────────────────────────────────────────────────

fn draw_header<A, S>(f: &mut Frame, area: Rect, app: &App<A, S>)
where
  A: UserAdminApi + 'static,
  S: SessionSource,
{
  let date = Local::now().format("%Y-%m-%d").to_string();
  let (shown, loading) = {
    let dir = app.coordinator.directory();
    (dir.view().len(), dir.is_loading())
  };

  let left = Span::styled(
    format!(" roster · manage users  {shown} Users{}", if loading { "  loading…" } else { "" }),
    Style::default()
      .fg(Color::White)
      .add_modifier(Modifier::BOLD),
  );
  let right = Span::styled(
    format!("{date} "),
    Style::default().fg(Color::DarkGray),
  );

  // Simple left-right header: pad the middle.
  let left_width = left.width() as u16;
  let right_width = right.width() as u16;
  let pad = area
    .width
    .saturating_sub(left_width)
    .saturating_sub(right_width);

  let line = Line::from(vec![
    left,
    Span::raw(" ".repeat(pad as usize)),
    right,
  ]);

  let block = Block::default().style(Style::default().bg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);
  f.render_widget(Paragraph::new(line), inner);
}

fn draw_banner(f: &mut Frame, area: Rect) {
  f.render_widget(
    Paragraph::new(format!(" ⚠ {}", notification::LOAD_FAILED))
      .style(Style::default().fg(Color::Black).bg(Color::Yellow)),
    area,
  );
}

// ─── Status bar ───────────────────────────────────────────────────────────────

fn draw_status<A, S>(f: &mut Frame, area: Rect, app: &App<A, S>)
where
  A: UserAdminApi + 'static,
  S: SessionSource,
{
  let (mode_label, hints) = match &app.mode {
    Mode::Search => ("SEARCH", "Type to filter by name, email or role  Esc clear  Enter done"),
    Mode::Browse => (
      "NORMAL",
      "↑↓/jk navigate  / search  e edit  d delete  r refresh  q quit",
    ),
    Mode::Edit(_) => ("EDIT", "Tab switch field  Space toggle status  Enter save  Esc cancel"),
    Mode::ConfirmDelete(_) => ("DELETE", "y confirm  n cancel"),
  };

  let mode_span = Span::styled(
    format!(" {mode_label} "),
    Style::default()
      .fg(Color::Black)
      .bg(Color::Cyan)
      .add_modifier(Modifier::BOLD),
  );

  // Outcome notifications take precedence over hints.
  let message_span = if let Some((n, _)) = &app.notice {
    let color = match n.severity {
      Severity::Success => Color::Green,
      Severity::Error => Color::Red,
    };
    Span::styled(format!("  {}", n.message), Style::default().fg(color))
  } else if !app.status_msg.is_empty() {
    Span::styled(format!("  {}", app.status_msg), Style::default().fg(Color::Yellow))
  } else {
    Span::styled(format!("  {hints}"), Style::default().fg(Color::DarkGray))
  };

  let line = Line::from(vec![mode_span, message_span]);
  f.render_widget(
    Paragraph::new(line).style(Style::default().bg(Color::Black)),
    area,
  );
}
