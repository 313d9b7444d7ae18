pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use crate::app::App;
use ratatui::prelude::*;
use ratatui::widgets::TableState;

/// Main draw function
pub fn draw(frame: &mut Frame, app: &mut App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Breadcrumb
    ])
    .split(frame.area());

  renderfns::draw_header(
    frame,
    chunks[0],
    app.host(),
    app.title(),
    &app.shortcuts(),
  );

  app.view_mut().render(frame, chunks[1]);

  renderfns::draw_footer(frame, chunks[2], &app.breadcrumb());
}

/// Keep a table selection inside `0..len`, selecting the first row when
/// there was none
pub fn ensure_valid_selection(state: &mut TableState, len: usize) {
  if len == 0 {
    state.select(None);
    return;
  }
  match state.selected() {
    Some(i) if i >= len => state.select(Some(len - 1)),
    None => state.select(Some(0)),
    _ => {}
  }
}
