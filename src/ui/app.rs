use crate::error::SessionError;
use crate::game::GameSession;
use crate::session::GameController;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{backend::Backend, Terminal};
use std::io;
use tokio::runtime::Handle;

pub struct App {
    runtime: Handle,
    controller: GameController,
    session: GameSession,
    selected_column: usize,
    should_quit: bool,
    message: Option<String>,
}

impl App {
    /// `runtime` drives the controller's storage calls; the UI loop itself
    /// stays synchronous.
    pub fn new(runtime: Handle, controller: GameController, session: GameSession) -> Self {
        let selected_column = session.board().cols() / 2; // Start in middle
        App {
            runtime,
            controller,
            session,
            selected_column,
            should_quit: false,
            message: None,
        }
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn selected_column(&self) -> usize {
        self.selected_column
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn into_controller(self) -> GameController {
        self.controller
    }

    /// Main application loop
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if self.should_quit {
                break;
            }

            self.handle_events()?;
        }
        Ok(())
    }

    /// Handle keyboard events
    fn handle_events(&mut self) -> io::Result<()> {
        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    self.handle_key(key);
                }
            }
        }
        Ok(())
    }

    /// Handle key press
    pub fn handle_key(&mut self, key: KeyEvent) {
        // Clear message on any key press
        self.message = None;
        let cols = self.session.board().cols();

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Left => {
                self.selected_column = self.selected_column.saturating_sub(1);
            }
            KeyCode::Right => {
                if self.selected_column + 1 < cols {
                    self.selected_column += 1;
                }
            }
            KeyCode::Char(c @ '1'..='9') => {
                let column = c as usize - '1' as usize;
                if column < cols {
                    self.selected_column = column;
                    self.drop_piece();
                }
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                self.drop_piece();
            }
            KeyCode::Char('r') => {
                self.restart();
            }
            _ => {}
        }
    }

    /// Drop piece in selected column
    fn drop_piece(&mut self) {
        let result = self
            .runtime
            .block_on(self.controller.drop_piece(&self.session, self.selected_column));

        match result {
            Ok(turn) => {
                self.message = turn.notice.message();
                self.session = turn.session;
            }
            Err(SessionError::InvalidColumn { column, .. }) => {
                tracing::error!("UI selected column {} outside the board", column);
                self.message = Some("Invalid column!".to_string());
            }
            Err(SessionError::Persistence(e)) => {
                self.message = Some(format!("Move not saved: {e}"));
            }
        }
    }

    fn restart(&mut self) {
        match self.runtime.block_on(self.controller.restart()) {
            Ok(session) => {
                self.selected_column = session.board().cols() / 2;
                self.session = session;
                self.message = Some("New game started!".to_string());
            }
            Err(e) => {
                self.message = Some(format!("Restart not saved: {e}"));
            }
        }
    }

    /// Render the UI
    fn render(&self, frame: &mut ratatui::Frame) {
        super::game_view::render(
            frame,
            &self.session,
            self.selected_column,
            &self.message,
            self.controller.document_key(),
        );
    }
}
