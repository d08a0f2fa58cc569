use crate::prompts;
use crate::session::{Rejection, SessionController, Settled, SubmitOutcome};
use crate::ui::conversation::commands::{get_examples_text, get_help_text, ParsedCommand, SlashCommand};
use crate::ui::conversation::composer::{ConversationComposer, ConversationResult};
use crate::ui::conversation::history::ConversationView;
use crate::ui::conversation::status::StatusLine;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    widgets::Widget,
};
use std::cell::Cell;
use tracing::debug;

/// Actions that can be requested by the conversation manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationAction {
    None,
    Exit,
}

/// Glues the session controller to the conversation widgets
pub struct ConversationManager {
    session: SessionController,
    composer: ConversationComposer,
    notice: Option<String>,
    scroll: usize,
    max_scroll: Cell<usize>,
    page_size: Cell<usize>,
    tick: usize,
}

impl ConversationManager {
    pub fn new(session: SessionController) -> Self {
        let composer = ConversationComposer::new("Ask a coding question, e.g. \"React useState example\"");
        composer.set_content(session.state().pending_query());

        Self {
            session,
            composer,
            notice: None,
            scroll: 0,
            max_scroll: Cell::new(0),
            page_size: Cell::new(10),
            tick: 0,
        }
    }

    pub fn session(&self) -> &SessionController {
        &self.session
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ConversationAction {
        if key.kind != KeyEventKind::Press {
            return ConversationAction::None;
        }

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return ConversationAction::Exit;
            }
            KeyCode::PageUp => {
                self.scroll = (self.scroll + self.page_size.get()).min(self.max_scroll.get());
                return ConversationAction::None;
            }
            KeyCode::PageDown => {
                self.scroll = self.scroll.saturating_sub(self.page_size.get());
                return ConversationAction::None;
            }
            _ => {}
        }

        let result = self.composer.handle_key(key);
        self.handle_result(result)
    }

    pub fn handle_paste(&mut self, text: &str) -> ConversationAction {
        let result = self.composer.handle_paste(text);
        self.handle_result(result)
    }

    /// Advance the loading animation
    pub fn on_tick(&mut self) {
        if self.session.state().is_loading() {
            self.tick = self.tick.wrapping_add(1);
        }
    }

    /// Apply finished requests (called from main loop)
    pub fn process_settlements(&mut self) -> Vec<Settled> {
        let settled = self.session.poll_settlements();
        if settled.is_empty() {
            return settled;
        }

        if settled.contains(&Settled::Success) {
            self.scroll = 0;
        }
        self.sync_from_session();
        settled
    }

    fn handle_result(&mut self, result: ConversationResult) -> ConversationAction {
        match result {
            ConversationResult::Edited(draft) => {
                self.session.set_pending_query(draft);
                ConversationAction::None
            }
            ConversationResult::Submitted(draft) => {
                self.submit(&draft);
                ConversationAction::None
            }
            ConversationResult::Command(command) => {
                self.session.set_pending_query(self.composer.content());
                self.handle_slash_command(command)
            }
            ConversationResult::None => ConversationAction::None,
        }
    }

    fn submit(&mut self, draft: &str) {
        match self.session.submit(draft) {
            SubmitOutcome::Accepted => {
                self.notice = None;
                self.scroll = 0;
                self.tick = 0;
            }
            SubmitOutcome::Ignored(Rejection::RequestInFlight) => {
                debug!("Submission ignored, answer still pending");
            }
            SubmitOutcome::Ignored(Rejection::EmptyInput) => {}
        }
        self.sync_from_session();
    }

    fn handle_slash_command(&mut self, command: ParsedCommand) -> ConversationAction {
        debug!(command = command.command.command(), argument = ?command.argument(), "Slash command");

        match command.command {
            SlashCommand::Quit => return ConversationAction::Exit,
            SlashCommand::Help => {
                self.notice = Some(get_help_text());
            }
            SlashCommand::Example => match command.example_number() {
                Some(number) => match prompts::example(number) {
                    Some(prompt) => {
                        self.session.set_pending_query(prompt);
                        self.notice = None;
                    }
                    None => {
                        self.notice = Some(format!("There is no example {number}.\n\n{}", get_examples_text()));
                    }
                },
                None => {
                    self.notice = Some(get_examples_text());
                }
            },
        }

        self.scroll = 0;
        self.sync_from_session();
        ConversationAction::None
    }

    /// Mirror the session draft and loading flag into the composer
    fn sync_from_session(&mut self) {
        self.composer.set_content(self.session.state().pending_query());
        self.composer.set_busy(self.session.state().is_loading());
    }

    /// Render the conversation UI components
    pub fn render(&self, area: Rect, buf: &mut Buffer) {
        let draft_lines = self.composer.content().split('\n').count().min(6) as u16;
        let composer_height = (draft_lines + 2).clamp(3, 8);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(3),
                Constraint::Length(1),
                Constraint::Length(composer_height),
            ])
            .split(area);

        let view = ConversationView::new(self.session.history().all())
            .in_flight(self.session.in_flight_query())
            .notice(self.notice.as_deref())
            .scroll(self.scroll);
        self.max_scroll.set(view.max_scroll(chunks[0]));
        self.page_size
            .set(chunks[0].height.saturating_sub(2).max(1) as usize);
        view.render(chunks[0], buf);

        StatusLine::new(self.session.state(), self.tick).render(chunks[1], buf);
        self.composer.render(chunks[2], buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{CompletionClient, CompletionError};
    use crate::session::UPSTREAM_FAILURE_MESSAGE;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EchoClient {
        fail: bool,
        calls: AtomicUsize,
    }

    impl EchoClient {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                fail,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl CompletionClient for EchoClient {
        async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(CompletionError::Api {
                    status: 400,
                    body: "API key not valid".to_string(),
                })
            } else {
                Ok(format!("answer to {prompt}"))
            }
        }
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(manager: &mut ConversationManager, text: &str) {
        for c in text.chars() {
            manager.handle_key(press(KeyCode::Char(c)));
        }
    }

    async fn wait_for_settlement(manager: &mut ConversationManager) -> Vec<Settled> {
        loop {
            let settled = manager.process_settlements();
            if !settled.is_empty() {
                return settled;
            }
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_typed_query_is_submitted_and_cleared_on_success() {
        let client = EchoClient::new(false);
        let mut manager = ConversationManager::new(SessionController::new(client.clone()));

        type_text(&mut manager, "What is cloud computing?");
        assert_eq!(manager.session().state().pending_query(), "What is cloud computing?");

        manager.handle_key(press(KeyCode::Enter));
        assert!(manager.session().state().is_loading());

        assert_eq!(wait_for_settlement(&mut manager).await, vec![Settled::Success]);
        let history = manager.session().history().all();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].response(), "answer to What is cloud computing?");
        assert_eq!(manager.composer.content(), "");
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_keeps_draft_in_composer() {
        let mut manager = ConversationManager::new(SessionController::new(EchoClient::new(true)));

        type_text(&mut manager, "React useEffect example");
        manager.handle_key(press(KeyCode::Enter));

        assert_eq!(wait_for_settlement(&mut manager).await, vec![Settled::Failure]);
        assert_eq!(
            manager.session().state().last_error(),
            Some(UPSTREAM_FAILURE_MESSAGE)
        );
        assert_eq!(manager.composer.content(), "React useEffect example");
        assert!(manager.session().history().is_empty());
    }

    #[tokio::test]
    async fn test_enter_while_loading_is_ignored() {
        let client = EchoClient::new(false);
        let mut manager = ConversationManager::new(SessionController::new(client.clone()));

        type_text(&mut manager, "first");
        manager.handle_key(press(KeyCode::Enter));
        type_text(&mut manager, " again");
        manager.handle_key(press(KeyCode::Enter));

        wait_for_settlement(&mut manager).await;
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
        assert_eq!(manager.session().history().all()[0].query(), "first");
    }

    #[tokio::test]
    async fn test_example_command_sets_draft_without_submitting() {
        let client = EchoClient::new(false);
        let mut manager = ConversationManager::new(SessionController::new(client.clone()));

        type_text(&mut manager, "/example 5");
        assert_eq!(manager.handle_key(press(KeyCode::Enter)), ConversationAction::None);

        assert_eq!(manager.session().state().pending_query(), "Explain Docker containers");
        assert_eq!(manager.composer.content(), "Explain Docker containers");
        assert!(!manager.session().state().is_loading());
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_example_lists_examples() {
        let mut manager = ConversationManager::new(SessionController::new(EchoClient::new(false)));

        type_text(&mut manager, "/example 9");
        manager.handle_key(press(KeyCode::Enter));

        let notice = manager.notice.clone().unwrap_or_default();
        assert!(notice.contains("There is no example 9."));
        assert!(notice.contains("1. React useState example"));
        assert_eq!(manager.session().state().pending_query(), "");
    }

    #[tokio::test]
    async fn test_quit_and_ctrl_c_exit() {
        let mut manager = ConversationManager::new(SessionController::new(EchoClient::new(false)));

        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(manager.handle_key(ctrl_c), ConversationAction::Exit);

        type_text(&mut manager, "/quit");
        assert_eq!(manager.handle_key(press(KeyCode::Enter)), ConversationAction::Exit);
    }

    #[tokio::test]
    async fn test_unknown_slash_word_reaches_the_client() {
        let client = EchoClient::new(false);
        let mut manager = ConversationManager::new(SessionController::new(client.clone()));

        type_text(&mut manager, "/usr");
        manager.handle_key(press(KeyCode::Enter));
        assert!(manager.session().state().is_loading());

        assert_eq!(wait_for_settlement(&mut manager).await, vec![Settled::Success]);
        assert_eq!(manager.session().history().all()[0].query(), "/usr");
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_render_survives_huge_multiline_paste() {
        let mut manager = ConversationManager::new(SessionController::new(EchoClient::new(false)));
        manager.handle_paste(&"\n".repeat(65_534));
        manager.handle_paste("tail");

        let area = Rect::new(0, 0, 80, 24);
        let mut buf = Buffer::empty(area);
        manager.render(area, &mut buf);

        let screen: String = buf.content.iter().map(|cell| cell.symbol()).collect();
        assert!(screen.contains("tail"));
    }

    #[tokio::test]
    async fn test_render_shows_status_and_draft() {
        let mut manager = ConversationManager::new(SessionController::new(EchoClient::new(false)));
        type_text(&mut manager, "Explain Docker containers");

        let area = Rect::new(0, 0, 80, 24);
        let mut buf = Buffer::empty(area);
        manager.render(area, &mut buf);

        let screen: String = buf.content.iter().map(|cell| cell.symbol()).collect();
        assert!(screen.contains("Popular examples"));
        assert!(screen.contains("Explain Docker containers"));
        assert!(screen.contains("/help"));
    }
}
