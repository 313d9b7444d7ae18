use crate::catalog::cache::{ProductCache, ProductQueryKey};
use crate::catalog::client::CatalogClient;
use crate::catalog::types::{PageResult, Product};
use crate::query::{Mutation, QueryStatus};
use crate::ui::components::{FormEvent, FormMode, KeyResult, ProductForm, SearchEvent, SearchInput};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{format_price, stock_color, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState};
use tracing::{debug, warn};

/// Paged, searchable product table with add/edit/delete.
///
/// Reads go through the shared [`ProductCache`]; writes go straight to the
/// API and are then folded into every cached page.
pub struct ProductTableView {
  client: CatalogClient,
  products: ProductCache,
  page: usize,
  search: SearchInput,
  /// Search text the current key is built from
  search_text: String,
  /// Last page shown, kept on screen while the next key loads
  placeholder: Option<PageResult>,
  table_state: TableState,
  delete: Mutation<u64>,
  form: Option<ProductForm>,
}

impl ProductTableView {
  pub fn new(client: CatalogClient, products: ProductCache) -> Self {
    let mut view = Self {
      client,
      products,
      page: 0,
      search: SearchInput::new(),
      search_text: String::new(),
      placeholder: None,
      table_state: TableState::default(),
      delete: Mutation::new(),
      form: None,
    };

    // Start fetching immediately
    view.load();
    view
  }

  fn current_key(&self) -> ProductQueryKey {
    ProductQueryKey::new(self.page, self.search_text.clone())
  }

  /// Data fetched for the current key, if any
  fn current_page(&self) -> Option<&PageResult> {
    self.products.peek(&self.current_key()).data
  }

  /// What the table shows: current data, else the placeholder while loading
  fn visible_page(&self) -> Option<&PageResult> {
    let snapshot = self.products.peek(&self.current_key());
    if snapshot.error().is_some() {
      return None;
    }
    snapshot.data.or(self.placeholder.as_ref())
  }

  fn selected_product(&self) -> Option<&Product> {
    let idx = self.table_state.selected()?;
    self.visible_page()?.items.get(idx)
  }

  /// A short page means there is nothing after it
  fn next_disabled(&self) -> bool {
    self
      .current_page()
      .map_or(true, |p| p.items.len() < self.products.page_size())
  }

  fn prev_disabled(&self) -> bool {
    self.page == 0
  }

  /// Read the current key, which fetches it if missing or stale
  fn load(&mut self) {
    let key = self.current_key();
    self.products.page(&key);
  }

  /// Remember what is on screen before switching keys
  fn keep_placeholder(&mut self) {
    if let Some(page) = self.current_page().cloned() {
      self.placeholder = Some(page);
    }
  }

  fn go_to_page(&mut self, page: usize) {
    self.keep_placeholder();
    self.page = page;
    self.table_state.select(Some(0));
    self.load();
  }

  /// A new search always starts from the first page
  fn set_search(&mut self, text: String) {
    if text == self.search_text {
      return;
    }
    self.keep_placeholder();
    self.search_text = text;
    self.page = 0;
    self.table_state.select(Some(0));
    self.load();
  }

  fn start_delete(&mut self) {
    let Some(id) = self.selected_product().map(|p| p.id) else {
      return;
    };
    let client = self.client.clone();
    self.delete.start(async move {
      match client.delete(id).await {
        Ok(()) => Ok(id),
        // Someone else got there first
        Err(e) if e.status() == Some(404) => Err(format!("product {} no longer exists", id)),
        Err(e) => Err(e.to_string()),
      }
    });
  }

  fn open_form(&mut self, mode: FormMode) {
    self.form = Some(ProductForm::new(mode, self.client.clone()));
  }

  // ==========================================================================
  // Rendering
  // ==========================================================================

  fn render_table(&mut self, frame: &mut Frame, area: Rect) {
    let key = self.current_key();
    let snapshot = self.products.peek(&key);

    let mut block = Block::default()
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if let QueryStatus::Error(_) = snapshot.status {
      let paragraph = Paragraph::new("Error loading products")
        .block(block.title(" Products "))
        .style(Style::default().fg(Color::Red));
      frame.render_widget(paragraph, area);
      return;
    }

    let loading = snapshot.is_pending();
    let Some(page) = snapshot.data.or(self.placeholder.as_ref()) else {
      let paragraph = Paragraph::new("Loading products...")
        .block(block.title(" Products (loading...) "))
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    };

    let mut title = if self.search_text.is_empty() {
      format!(" Products ({}) ", page.total)
    } else {
      format!(" Products matching {:?} ({}) ", self.search_text, page.total)
    };
    if snapshot.is_fetching {
      title.push_str("(loading...) ");
    }
    block = block.title(title);

    if page.items.is_empty() {
      let paragraph = Paragraph::new("No products found.")
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    // Placeholder rows are dimmed until the real page arrives
    let row_style = if loading {
      Style::default().fg(Color::DarkGray)
    } else {
      Style::default()
    };
    let len = page.items.len();
    let rows: Vec<Row> = page
      .items
      .iter()
      .map(|p| {
        Row::new(vec![
          Cell::from(truncate(&p.title, 40)),
          Cell::from(format_price(p.price)),
          Cell::from(p.category.clone()),
          Cell::from(p.stock.to_string()).style(Style::default().fg(stock_color(p.stock))),
        ])
        .style(row_style)
      })
      .collect();

    let header = Row::new(vec!["Title", "Price", "Category", "Stock"])
      .style(Style::default().fg(Color::Yellow).bold());

    let table = Table::new(
      rows,
      [
        Constraint::Min(20),
        Constraint::Length(12),
        Constraint::Length(20),
        Constraint::Length(8),
      ],
    )
    .header(header)
    .block(block)
    .row_highlight_style(
      Style::default()
        .bg(Color::DarkGray)
        .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("> ");

    ensure_valid_selection(&mut self.table_state, len);
    frame.render_stateful_widget(table, area, &mut self.table_state);
  }

  fn render_status(&self, frame: &mut Frame, area: Rect) {
    let enabled = Style::default().fg(Color::Cyan);
    let disabled = Style::default().fg(Color::DarkGray);

    let mut spans = vec![
      Span::styled(
        "<p> prev",
        if self.prev_disabled() { disabled } else { enabled },
      ),
      Span::raw("  "),
      Span::styled(
        format!("Page {}", self.page + 1),
        Style::default().fg(Color::White).bold(),
      ),
      Span::raw("  "),
      Span::styled(
        "<n> next",
        if self.next_disabled() { disabled } else { enabled },
      ),
    ];

    if let Some(at) = self.products.peek(&self.current_key()).fetched_at {
      spans.push(Span::styled(
        format!("   updated {}", at.with_timezone(&chrono::Local).format("%H:%M:%S")),
        disabled,
      ));
    }
    if self.delete.is_pending() {
      spans.push(Span::styled("   Deleting...", Style::default().fg(Color::Yellow)));
    }
    if let Some(error) = self.delete.error() {
      spans.push(Span::styled(
        format!("   Delete failed: {}", error),
        Style::default().fg(Color::Red),
      ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
  }

  // ==========================================================================
  // Key handling helpers for or_else chain pattern
  // ==========================================================================

  fn handle_form(&mut self, key: KeyEvent) -> Option<ViewAction> {
    let form = self.form.as_mut()?;
    if let KeyResult::Event(FormEvent::Cancelled) = form.handle_key(key) {
      self.form = None;
    }
    // The dialog is modal
    Some(ViewAction::None)
  }

  fn handle_overlays(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match self.search.handle_key(key) {
      KeyResult::Handled => Some(ViewAction::None),
      KeyResult::Event(SearchEvent::Changed(text)) => {
        self.set_search(text);
        Some(ViewAction::None)
      }
      KeyResult::Event(SearchEvent::Submitted) => Some(ViewAction::None),
      KeyResult::NotHandled => None,
    }
  }

  fn handle_navigation(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        self.table_state.select_next();
        Some(ViewAction::None)
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.table_state.select_previous();
        Some(ViewAction::None)
      }
      KeyCode::Char('n') | KeyCode::Right => {
        if !self.next_disabled() {
          self.go_to_page(self.page + 1);
        }
        Some(ViewAction::None)
      }
      KeyCode::Char('p') | KeyCode::Left => {
        if !self.prev_disabled() {
          self.go_to_page(self.page - 1);
        }
        Some(ViewAction::None)
      }
      _ => None,
    }
  }

  fn handle_actions(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match key.code {
      KeyCode::Char('r') => {
        self.products.refetch(&self.current_key());
        Some(ViewAction::None)
      }
      KeyCode::Char('a') => {
        self.open_form(FormMode::Add);
        Some(ViewAction::None)
      }
      KeyCode::Char('e') | KeyCode::Enter => {
        if let Some(product) = self.selected_product().cloned() {
          self.open_form(FormMode::Edit(product));
        }
        Some(ViewAction::None)
      }
      KeyCode::Char('d') => {
        self.start_delete();
        Some(ViewAction::None)
      }
      KeyCode::Char('q') | KeyCode::Esc => Some(ViewAction::Pop),
      _ => None,
    }
  }
}

impl View for ProductTableView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    self
      .handle_form(key)
      .or_else(|| self.handle_overlays(key))
      .or_else(|| self.handle_navigation(key))
      .or_else(|| self.handle_actions(key))
      .unwrap_or(ViewAction::None)
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Min(3), Constraint::Length(1)])
      .split(area);

    self.render_table(frame, chunks[0]);
    self.render_status(frame, chunks[1]);
    self.search.render_overlay(frame, chunks[0]);
    if let Some(form) = &self.form {
      form.render_overlay(frame, area);
    }
  }

  fn breadcrumb_label(&self) -> String {
    if self.search_text.is_empty() {
      "Products".to_string()
    } else {
      format!("Products /{}", self.search_text)
    }
  }

  fn tick(&mut self) {
    self.products.poll();
    self.load();
    let len = self.visible_page().map_or(0, |p| p.items.len());
    ensure_valid_selection(&mut self.table_state, len);

    if let Some(outcome) = self.delete.poll() {
      match outcome {
        Ok(id) => {
          debug!(id, "removing deleted product from cached pages");
          self.products.record_deleted(id);
        }
        Err(error) => warn!(%error, "delete failed"),
      }
    }

    match self.form.as_mut().and_then(|form| form.tick()) {
      Some(FormEvent::Saved(saved)) => {
        debug!(?saved, "patching cached pages after save");
        self.products.record_saved(&saved);
        self.form = None;
      }
      Some(FormEvent::Cancelled) => self.form = None,
      None => {}
    }
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    if self.search.is_active() {
      return vec![
        ShortcutInfo::new("enter", "apply").with_priority(10),
        ShortcutInfo::new("esc", "clear").with_priority(20),
      ];
    }
    if self.form.is_some() {
      return vec![
        ShortcutInfo::new("tab", "next field").with_priority(10),
        ShortcutInfo::new("enter", "save").with_priority(20),
        ShortcutInfo::new("esc", "cancel").with_priority(30),
      ];
    }
    vec![
      ShortcutInfo::new("/", "search").with_priority(10),
      ShortcutInfo::new("a", "add").with_priority(20),
      ShortcutInfo::new("e", "edit").with_priority(21),
      ShortcutInfo::new("d", "delete").with_priority(22),
      ShortcutInfo::new("n/p", "page").with_priority(30),
      ShortcutInfo::new("r", "refresh").with_priority(40),
      ShortcutInfo::new("q", "quit").with_priority(50),
    ]
  }
}
