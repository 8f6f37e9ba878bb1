//! Modal dialogs drawn over the user table.

use ratatui::{
  Frame,
  layout::{Constraint, Flex, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use roster_core::cascade;

use crate::app::{DeleteDialog, EditDialog, EditField};

/// Render the edit dialog centred in `area`.
pub fn draw_edit(f: &mut Frame, area: Rect, dialog: &EditDialog) {
  let popup = centered(area, 60, 11);
  let block = Block::default()
    .title(" Edit User ")
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Cyan));
  let inner = block.inner(popup);
  f.render_widget(Clear, popup);
  f.render_widget(block, popup);

  let label = Style::default().fg(Color::DarkGray);
  let focused = |field: EditField| {
    if dialog.field == field {
      Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
      Style::default()
    }
  };
  let cursor = if dialog.field == EditField::Name { "_" } else { "" };
  let status = if dialog.draft.is_active { "[Active]" } else { "[Inactive]" };

  let mut lines = vec![
    Line::from(vec![
      Span::styled(format!("{:<11}", "Email"), label),
      Span::raw(dialog.user.email.clone()),
    ]),
    Line::from(vec![
      Span::styled(format!("{:<11}", "Role"), label),
      Span::raw(dialog.user.role.to_string()),
      Span::styled("  (cannot be changed)", label),
    ]),
    Line::from(""),
    Line::from(vec![
      Span::styled(format!("{:<11}", "Full name"), label),
      Span::styled(format!("{}{cursor}", dialog.draft.full_name), focused(EditField::Name)),
    ]),
    Line::from(vec![
      Span::styled(format!("{:<11}", "Status"), label),
      Span::styled(status, focused(EditField::Active)),
    ]),
    Line::from(""),
  ];
  lines.push(if dialog.submitting {
    Line::from(Span::styled("Saving…", Style::default().fg(Color::Yellow)))
  } else {
    Line::from(Span::styled("Enter save   Esc cancel", label))
  });

  f.render_widget(Paragraph::new(lines), inner);
}

/// Render the delete confirmation centred in `area`.
pub fn draw_delete(f: &mut Frame, area: Rect, dialog: &DeleteDialog) {
  let body = dialog.cascade.removed.len() as u16
    + u16::from(dialog.cascade.note.is_some());
  let popup = centered(area, 64, 12 + body);
  let block = Block::default()
    .title(" Delete User ")
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Red));
  let inner = block.inner(popup);
  f.render_widget(Clear, popup);
  f.render_widget(block, popup);

  let mut lines = vec![
    Line::from("Are you sure you want to delete this user?"),
    Line::from(""),
    Line::from(Span::styled(
      dialog.user.full_name.clone(),
      Style::default().add_modifier(Modifier::BOLD),
    )),
    Line::from(format!("{}  ·  {}", dialog.user.email, dialog.user.role)),
    Line::from(""),
    Line::from(Span::styled(
      format!("⚠ {}", cascade::IRREVERSIBLE),
      Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
    )),
    Line::from("The following data will be permanently deleted:"),
  ];
  lines.extend(
    dialog
      .cascade
      .removed
      .iter()
      .map(|item| Line::from(format!("  • {item}"))),
  );
  if let Some(note) = dialog.cascade.note {
    lines.push(Line::from(Span::styled(
      format!("  Note: {note}"),
      Style::default().fg(Color::Yellow),
    )));
  }
  lines.push(Line::from(""));
  lines.push(if dialog.submitting {
    Line::from(Span::styled("Deleting…", Style::default().fg(Color::Yellow)))
  } else {
    Line::from(Span::styled(
      "y delete   n cancel",
      Style::default().fg(Color::DarkGray),
    ))
  });

  f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
}

/// A `width` x `height` rectangle centred in `area`, clipped to it.
fn centered(area: Rect, width: u16, height: u16) -> Rect {
  let [row] = Layout::vertical([Constraint::Length(height.min(area.height))])
    .flex(Flex::Center)
    .areas(area);
  let [cell] = Layout::horizontal([Constraint::Length(width.min(area.width))])
    .flex(Flex::Center)
    .areas(row);
  cell
}
