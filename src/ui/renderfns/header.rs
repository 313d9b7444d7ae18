use crate::ui::view::ShortcutInfo;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the header bar with app name, backend host, title and shortcuts
pub fn draw_header(
  frame: &mut Frame,
  area: Rect,
  host: &str,
  title: &str,
  shortcuts: &[ShortcutInfo],
) {
  let mut spans = vec![
    Span::styled(" catadmin ", Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(format!(" {} ", host), Style::default().fg(Color::White)),
  ];
  // Without a configured title the title is the host itself
  if title != host {
    spans.push(Span::styled("│", Style::default().fg(Color::DarkGray)));
    spans.push(Span::styled(
      format!(" {} ", title),
      Style::default().fg(Color::Yellow).bold(),
    ));
  }
  spans.push(Span::raw(" "));

  // Shortcuts - keys and brackets highlighted, descriptions dimmed
  let mut sorted: Vec<&ShortcutInfo> = shortcuts.iter().collect();
  sorted.sort_by_key(|s| s.priority);
  for shortcut in sorted {
    spans.push(Span::raw("  "));
    spans.push(Span::styled(
      format!("<{}>", shortcut.key),
      Style::default().fg(Color::Cyan),
    ));
    spans.push(Span::styled(
      format!(" {}", shortcut.label),
      Style::default().fg(Color::DarkGray),
    ));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));

  frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
  use super::*;
  use ratatui::backend::TestBackend;

  fn render(host: &str, title: &str, shortcuts: &[ShortcutInfo]) -> String {
    let mut terminal = Terminal::new(TestBackend::new(100, 1)).unwrap();
    terminal
      .draw(|frame| draw_header(frame, frame.area(), host, title, shortcuts))
      .unwrap();
    terminal
      .backend()
      .buffer()
      .content()
      .iter()
      .map(|cell| cell.symbol())
      .collect()
  }

  #[test]
  fn test_host_shown_once_when_title_is_host() {
    let line = render("127.0.0.1:8080", "127.0.0.1:8080", &[]);
    assert_eq!(line.matches("127.0.0.1:8080").count(), 1);

    let line = render("dummyjson.com", "Shop", &[]);
    assert!(line.contains(" dummyjson.com │ Shop "));
  }

  #[test]
  fn test_shortcuts_sorted_by_priority() {
    let shortcuts = [
      ShortcutInfo::new("q", "quit").with_priority(50),
      ShortcutInfo::new("/", "search").with_priority(10),
    ];
    let line = render("h", "h", &shortcuts);
    let search = line.find("</> search").unwrap();
    let quit = line.find("<q> quit").unwrap();
    assert!(search < quit);
  }
}
