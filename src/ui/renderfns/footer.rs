use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

const QUIT_HINT: &str = "<ctrl-c> quit ";

/// Draw the footer bar: breadcrumb on the left, quit hint on the right
pub fn draw_footer(frame: &mut Frame, area: Rect, breadcrumb: &[String]) {
  frame.render_widget(Paragraph::new("").style(Style::default().bg(Color::Black)), area);

  let [left, right] = Layout::horizontal([
    Constraint::Min(0),
    Constraint::Length(QUIT_HINT.len() as u16),
  ])
  .areas(area);

  let last = breadcrumb.len().saturating_sub(1);
  let mut spans = vec![Span::raw(" ")];
  for (i, part) in breadcrumb.iter().enumerate() {
    if i > 0 {
      spans.push(Span::styled(" > ", Style::default().fg(Color::DarkGray)));
    }
    // Current view highlighted
    let style = if i == last {
      Style::default().fg(Color::Cyan).bold()
    } else {
      Style::default().fg(Color::White)
    };
    spans.push(Span::styled(part.clone(), style));
  }

  frame.render_widget(Paragraph::new(Line::from(spans)), left);
  frame.render_widget(
    Paragraph::new(QUIT_HINT).style(Style::default().fg(Color::DarkGray)),
    right,
  );
}
