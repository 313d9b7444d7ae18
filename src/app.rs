use crate::catalog::cache::ProductCache;
use crate::catalog::client::CatalogClient;
use crate::config::{host_label, Config};
use crate::event::{Event, EventHandler};
use crate::ui;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::ProductTableView;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;
use tracing::info;

/// Main application state
pub struct App {
  /// Root view: the product table
  view: Box<dyn View>,

  /// API host, shown in the header
  host: String,

  /// Header title
  title: String,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub fn new(config: &Config) -> Result<Self> {
    let client = CatalogClient::new(config)?;
    let host = host_label(client.base_url());
    info!(base_url = %client.base_url(), page_size = config.page_size, "starting");

    // The cache lives as long as the root view, which is the app's lifetime
    let products = ProductCache::new(client.clone(), config.page_size, config.stale_time());
    let root = ProductTableView::new(client, products);

    Ok(Self {
      view: Box::new(root),
      host,
      title: config.display_title(),
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;

    let result = self.event_loop().await;

    // Restore the terminal even when the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop(&mut self) -> Result<()> {
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    let mut events = EventHandler::new(Duration::from_millis(250));

    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(event) => self.handle_event(event),
        None => break,
      }
    }

    info!("shutting down");
    Ok(())
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Resize => {}
      Event::Tick => {}
    }
    // Poll async work after every event so results show up promptly
    self.view.tick();
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    match self.view.handle_key(key) {
      ViewAction::None => {}
      // Backing out of the root view quits
      ViewAction::Pop => self.should_quit = true,
    }
  }

  pub fn view_mut(&mut self) -> &mut dyn View {
    self.view.as_mut()
  }

  pub fn host(&self) -> &str {
    &self.host
  }

  pub fn title(&self) -> &str {
    &self.title
  }

  pub fn shortcuts(&self) -> Vec<ShortcutInfo> {
    self.view.shortcuts()
  }

  pub fn breadcrumb(&self) -> Vec<String> {
    vec![self.view.breadcrumb_label()]
  }
}
