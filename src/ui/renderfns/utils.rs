use ratatui::prelude::Color;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Render a price the way the catalog shows it: `$12.5`, `$10`
pub fn format_price(price: f64) -> String {
  format!("${}", price)
}

/// Highlight empty and low stock
pub fn stock_color(stock: u64) -> Color {
  match stock {
    0 => Color::Red,
    1..=5 => Color::Yellow,
    _ => Color::White,
  }
}
