use super::input::TextInput;
use super::KeyResult;
use crate::catalog::client::CatalogClient;
use crate::catalog::types::{Product, ProductDraft, Saved};
use crate::query::{Mutation, MutationState};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use tracing::warn;

/// What the dialog is editing
#[derive(Debug, Clone, PartialEq)]
pub enum FormMode {
  Add,
  Edit(Product),
}

/// Events emitted by the form that the parent view needs to handle
#[derive(Debug, Clone, PartialEq)]
pub enum FormEvent {
  /// The save went through; the dialog is done
  Saved(Saved),
  /// User closed the dialog without saving
  Cancelled,
}

const LABELS: [&str; 4] = ["Title", "Price", "Category", "Stock"];
const TITLE: usize = 0;
const PRICE: usize = 1;
const CATEGORY: usize = 2;
const STOCK: usize = 3;

/// Add/edit dialog for a single product.
///
/// The form owns its save mutation: on success it reports `FormEvent::Saved`
/// from `tick()`, on failure it stays open so the user can try again.
pub struct ProductForm {
  mode: FormMode,
  client: CatalogClient,
  inputs: [TextInput; 4],
  focus: usize,
  invalid: Option<String>,
  save: Mutation<Saved>,
}

impl ProductForm {
  pub fn new(mode: FormMode, client: CatalogClient) -> Self {
    let inputs = match &mode {
      FormMode::Add => [
        TextInput::new(),
        TextInput::with_value("0"),
        TextInput::new(),
        TextInput::with_value("0"),
      ],
      FormMode::Edit(p) => [
        TextInput::with_value(p.title.clone()),
        TextInput::with_value(p.price.to_string()),
        TextInput::with_value(p.category.clone()),
        TextInput::with_value(p.stock.to_string()),
      ],
    };

    Self {
      mode,
      client,
      inputs,
      focus: 0,
      invalid: None,
      save: Mutation::new(),
    }
  }

  pub fn heading(&self) -> &'static str {
    match self.mode {
      FormMode::Add => "Add Product",
      FormMode::Edit(_) => "Edit Product",
    }
  }

  pub fn is_saving(&self) -> bool {
    self.save.is_pending()
  }

  pub fn save_state(&self) -> &MutationState {
    self.save.state()
  }

  /// Validation message from the last submit attempt, if it was rejected
  pub fn invalid(&self) -> Option<&str> {
    self.invalid.as_deref()
  }

  pub fn values(&self) -> [&str; 4] {
    [
      self.inputs[TITLE].value(),
      self.inputs[PRICE].value(),
      self.inputs[CATEGORY].value(),
      self.inputs[STOCK].value(),
    ]
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<FormEvent> {
    match key.code {
      KeyCode::Esc => {
        // Cancel is disabled while a save is outstanding
        if self.is_saving() {
          KeyResult::Handled
        } else {
          KeyResult::Event(FormEvent::Cancelled)
        }
      }
      KeyCode::Enter => {
        self.submit();
        KeyResult::Handled
      }
      KeyCode::Tab | KeyCode::Down => {
        self.focus = (self.focus + 1) % self.inputs.len();
        KeyResult::Handled
      }
      KeyCode::BackTab | KeyCode::Up => {
        self.focus = (self.focus + self.inputs.len() - 1) % self.inputs.len();
        KeyResult::Handled
      }
      _ => {
        self.inputs[self.focus].handle_key(key);
        // Modal: nothing leaks to the view behind
        KeyResult::Handled
      }
    }
  }

  /// Validate and start the save. Returns `false` if nothing was sent.
  pub fn submit(&mut self) -> bool {
    if self.is_saving() {
      return false;
    }

    let [title, price, category, stock] = self.values();
    let draft = match validate(title, price, category, stock) {
      Ok(draft) => draft,
      Err(message) => {
        self.invalid = Some(message);
        return false;
      }
    };
    self.invalid = None;

    let client = self.client.clone();
    match &self.mode {
      FormMode::Add => self.save.start(async move {
        client
          .create(&draft)
          .await
          .map(Saved::Added)
          .map_err(|e| e.to_string())
      }),
      FormMode::Edit(product) => {
        let id = product.id;
        self.save.start(async move {
          client
            .update(id, &draft)
            .await
            .map(Saved::Edited)
            .map_err(|e| e.to_string())
        })
      }
    }
  }

  /// Collect the save outcome. Call this on every tick.
  pub fn tick(&mut self) -> Option<FormEvent> {
    match self.save.poll()? {
      Ok(saved) => Some(FormEvent::Saved(saved)),
      Err(error) => {
        warn!(%error, form = self.heading(), "save failed");
        None
      }
    }
  }

  /// Render the dialog centered over `area`
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    let width = area.width.saturating_sub(4).min(50).max(area.width.min(20));
    let height = area.height.min(12);
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    let overlay_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(format!(" {} ", self.heading()))
      .title_alignment(Alignment::Center);

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    if inner.height == 0 {
      return;
    }

    let mut lines = vec![
      Line::from(Span::styled(
        "Fill out the details below.",
        Style::default().fg(Color::DarkGray),
      )),
      Line::raw(""),
    ];

    for (i, label) in LABELS.iter().enumerate() {
      let focused = i == self.focus;
      let label_style = if focused {
        Style::default().fg(Color::Cyan).bold()
      } else {
        Style::default().fg(Color::White)
      };
      let mut spans = vec![Span::styled(format!("{:<10}", label), label_style)];
      if focused {
        spans.extend(self.inputs[i].cursor_spans(Style::default().fg(Color::Black).bg(Color::Yellow)));
      } else {
        spans.push(Span::raw(self.inputs[i].value().to_string()));
      }
      lines.push(Line::from(spans));
    }

    lines.push(Line::raw(""));
    lines.push(self.status_line());

    frame.render_widget(Paragraph::new(lines), inner);
  }

  fn status_line(&self) -> Line<'static> {
    if let Some(message) = self.invalid() {
      return Line::from(Span::styled(
        message.to_string(),
        Style::default().fg(Color::Red),
      ));
    }
    match self.save_state() {
      MutationState::Pending => Line::from(Span::styled(
        "Saving...",
        Style::default().fg(Color::Yellow),
      )),
      MutationState::Failed(_) => Line::from(vec![
        Span::styled("Save failed", Style::default().fg(Color::Red)),
        Span::styled("  <enter> retry  <esc> cancel", Style::default().fg(Color::DarkGray)),
      ]),
      MutationState::Idle | MutationState::Succeeded => Line::from(Span::styled(
        "<enter> save  <tab> next field  <esc> cancel",
        Style::default().fg(Color::DarkGray),
      )),
    }
  }
}

/// Check required fields and coerce the numeric ones.
pub fn validate(title: &str, price: &str, category: &str, stock: &str) -> Result<ProductDraft, String> {
  let title = title.trim();
  if title.is_empty() {
    return Err("Title is required".to_string());
  }

  let price = price
    .trim()
    .parse::<f64>()
    .ok()
    .filter(|p| p.is_finite() && *p >= 0.0)
    .ok_or_else(|| "Price must be a non-negative number".to_string())?;

  let category = category.trim();
  if category.is_empty() {
    return Err("Category is required".to_string());
  }

  let stock = stock
    .trim()
    .parse::<u64>()
    .map_err(|_| "Stock must be a non-negative whole number".to_string())?;

  Ok(ProductDraft {
    title: title.to_string(),
    price,
    category: category.to_string(),
    stock,
  })
}
