//! User table, the main pane.

use ratatui::{
  Frame,
  layout::{Constraint, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
};
use roster_core::{
  api::UserAdminApi,
  policy,
  session::SessionSource,
  user::{Role, UserRecord},
};

use crate::app::{App, Mode};

/// Render the filtered user table into `area`.
pub fn draw<A, S>(f: &mut Frame, area: Rect, app: &App<A, S>)
where
  A: UserAdminApi + 'static,
  S: SessionSource,
{
  let dir = app.coordinator.directory();
  let filtered = dir.view();
  let total = dir.users().len();
  let searching = matches!(app.mode, Mode::Search);

  // Title with count.
  let title = if searching || !dir.query().is_empty() {
    format!(" Users ({}/{}) ", filtered.len(), total)
  } else {
    format!(" Users ({}) ", total)
  };

  let block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));

  let mut inner_area = block.inner(area);
  f.render_widget(block, area);

  // Search bar on the last inner line while a query is being typed or set.
  if (searching || !dir.query().is_empty()) && inner_area.height > 2 {
    let search_area = Rect {
      x:      inner_area.x,
      y:      inner_area.y + inner_area.height - 1,
      width:  inner_area.width,
      height: 1,
    };
    inner_area.height = inner_area.height.saturating_sub(1);

    let text = if searching {
      format!("/{}_", dir.query())
    } else {
      format!("/{}", dir.query())
    };
    f.render_widget(
      Paragraph::new(text).style(Style::default().fg(Color::Yellow)),
      search_area,
    );
  }

  if filtered.is_empty() {
    f.render_widget(
      Paragraph::new(Line::from(Span::styled(
        "No users found",
        Style::default().fg(Color::DarkGray),
      ))),
      inner_area,
    );
    return;
  }

  let rows: Vec<Row> = filtered
    .iter()
    .map(|user| {
      // Admin count comes from the full directory, not the filtered view.
      let verdict = policy::can_delete(&app.actor, user, dir.users());
      let lock = if verdict.is_allowed() { "" } else { "🔒" };
      let pending = if app.coordinator.is_pending(user.id) { "…" } else { "" };
      Row::new(vec![
        Cell::from(format!("{} {}", role_icon(&user.role), user.full_name)),
        Cell::from(user.email.clone()).style(Style::default().fg(Color::Gray)),
        Cell::from(user.role.to_string()).style(role_style(&user.role)),
        Cell::from(joined(user)).style(Style::default().fg(Color::DarkGray)),
        Cell::from(if user.is_active { "active" } else { "inactive" }),
        Cell::from(format!("{lock}{pending}")),
      ])
    })
    .collect();

  let header = Row::new(["Name", "Email", "Role", "Joined", "Status", ""])
    .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));

  let widths = [
    Constraint::Percentage(28),
    Constraint::Percentage(30),
    Constraint::Length(9),
    Constraint::Length(11),
    Constraint::Length(9),
    Constraint::Length(3),
  ];

  // Scrollable table with cursor tracking.
  let mut state = TableState::default();
  state.select(Some(app.list_cursor.min(filtered.len() - 1)));

  f.render_stateful_widget(
    Table::new(rows, widths)
      .header(header)
      .row_highlight_style(
        Style::default()
          .bg(Color::Blue)
          .fg(Color::White)
          .add_modifier(Modifier::BOLD),
      ),
    inner_area,
    &mut state,
  );
}

fn role_icon(role: &Role) -> &'static str {
  match role {
    Role::Student => "👤",
    Role::Company => "🏢",
    Role::Admin => "🛡",
    Role::Other(_) => "·",
  }
}

fn role_style(role: &Role) -> Style {
  let color = match role {
    Role::Student => Color::Blue,
    Role::Company => Color::Green,
    Role::Admin => Color::Red,
    Role::Other(_) => Color::Gray,
  };
  Style::default().fg(color)
}

fn joined(user: &UserRecord) -> String {
  user
    .created_at
    .map(|ts| ts.format("%Y-%m-%d").to_string())
    .unwrap_or_else(|| "—".into())
}
