use crate::ui::conversation::commands::{
    command_entries, parse_slash_command, CommandEntry, ParsedCommand,
};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};
use std::cell::{Cell, RefCell};

/// Result returned when the user interacts with the conversation composer
#[derive(Debug, PartialEq)]
pub enum ConversationResult {
    /// Enter pressed on a draft; the draft stays in the composer
    Submitted(String),
    Command(ParsedCommand),
    /// Draft text changed
    Edited(String),
    None,
}

/// State for the text area within the composer.
///
/// `cursor_position` is a byte offset that always sits on a char boundary.
#[derive(Debug, Clone, Default)]
pub struct TextAreaState {
    pub content: String,
    pub cursor_position: usize,
}

impl TextAreaState {
    fn previous_boundary(&self) -> Option<usize> {
        self.content[..self.cursor_position]
            .char_indices()
            .next_back()
            .map(|(index, _)| index)
    }

    fn next_boundary(&self) -> Option<usize> {
        self.content[self.cursor_position..]
            .chars()
            .next()
            .map(|c| self.cursor_position + c.len_utf8())
    }
}

/// Draft editor with a slash-command palette
pub struct ConversationComposer {
    state: RefCell<TextAreaState>,
    placeholder: String,
    busy: bool,
    command_entries: Vec<CommandEntry>,
    filtered_commands: RefCell<Vec<CommandEntry>>,
    show_command_palette: Cell<bool>,
    selected_command: Cell<Option<usize>>,
}

impl ConversationComposer {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            state: RefCell::new(TextAreaState::default()),
            placeholder: placeholder.into(),
            busy: false,
            command_entries: command_entries(),
            filtered_commands: RefCell::new(Vec::new()),
            show_command_palette: Cell::new(false),
            selected_command: Cell::new(None),
        }
    }

    /// Handle key input
    pub fn handle_key(&self, key: KeyEvent) -> ConversationResult {
        if key.kind != KeyEventKind::Press {
            return ConversationResult::None;
        }

        let mut state = self.state.borrow_mut();

        match key.code {
            KeyCode::Enter => {
                if key.modifiers.contains(KeyModifiers::SHIFT) {
                    Self::insert_char(&mut state, '\n');
                    self.close_command_palette();
                    return ConversationResult::Edited(state.content.clone());
                }

                if let Some(command) = parse_slash_command(&state.content) {
                    state.content.clear();
                    state.cursor_position = 0;
                    self.close_command_palette();
                    return ConversationResult::Command(command);
                }

                // With no matching command the draft is an ordinary question.
                if self.show_command_palette.get() && self.apply_selected_command(&mut state) {
                    return ConversationResult::Edited(state.content.clone());
                }

                self.close_command_palette();
                return ConversationResult::Submitted(state.content.clone());
            }
            KeyCode::Up => {
                if self.show_command_palette.get() {
                    self.move_command_selection(-1);
                }
            }
            KeyCode::Down => {
                if self.show_command_palette.get() {
                    self.move_command_selection(1);
                }
            }
            KeyCode::Esc => {
                if self.show_command_palette.get() {
                    self.close_command_palette();
                }
            }
            KeyCode::Tab => {
                if self.show_command_palette.get() && self.apply_selected_command(&mut state) {
                    return ConversationResult::Edited(state.content.clone());
                }
            }
            KeyCode::Char(c) => {
                if key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
                    return ConversationResult::None;
                }

                Self::insert_char(&mut state, c);
                self.sync_command_palette(&state);
                return ConversationResult::Edited(state.content.clone());
            }
            KeyCode::Backspace => {
                if Self::backspace(&mut state) {
                    self.sync_command_palette(&state);
                    return ConversationResult::Edited(state.content.clone());
                }
            }
            KeyCode::Delete => {
                if Self::delete(&mut state) {
                    self.sync_command_palette(&state);
                    return ConversationResult::Edited(state.content.clone());
                }
            }
            KeyCode::Left => {
                if let Some(previous) = state.previous_boundary() {
                    state.cursor_position = previous;
                }
            }
            KeyCode::Right => {
                if let Some(next) = state.next_boundary() {
                    state.cursor_position = next;
                }
            }
            KeyCode::Home => {
                state.cursor_position = 0;
            }
            KeyCode::End => {
                state.cursor_position = state.content.len();
            }
            _ => {}
        }

        ConversationResult::None
    }

    /// Insert pasted text at the cursor
    pub fn handle_paste(&self, text: &str) -> ConversationResult {
        if text.is_empty() {
            return ConversationResult::None;
        }

        let mut state = self.state.borrow_mut();
        let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
        let position = state.cursor_position;
        state.content.insert_str(position, &normalized);
        state.cursor_position += normalized.len();
        self.sync_command_palette(&state);
        ConversationResult::Edited(state.content.clone())
    }

    fn insert_char(state: &mut TextAreaState, c: char) {
        let position = state.cursor_position;
        state.content.insert(position, c);
        state.cursor_position += c.len_utf8();
    }

    /// Delete character before cursor
    fn backspace(state: &mut TextAreaState) -> bool {
        match state.previous_boundary() {
            Some(previous) => {
                state.content.remove(previous);
                state.cursor_position = previous;
                true
            }
            None => false,
        }
    }

    /// Delete character at cursor
    fn delete(state: &mut TextAreaState) -> bool {
        if state.cursor_position < state.content.len() {
            state.content.remove(state.cursor_position);
            true
        } else {
            false
        }
    }

    /// Palette is open while the draft is a single-word slash command
    fn sync_command_palette(&self, state: &TextAreaState) {
        let typing_command = state.content.starts_with('/')
            && !state.content.chars().any(char::is_whitespace);

        if !typing_command {
            self.close_command_palette();
        } else if self.show_command_palette.get() {
            self.refresh_command_palette(state);
        } else {
            self.open_command_palette(state);
        }
    }

    fn open_command_palette(&self, state: &TextAreaState) {
        self.show_command_palette.set(true);
        self.selected_command.set(Some(0));
        self.refresh_command_palette(state);
    }

    fn close_command_palette(&self) {
        self.show_command_palette.set(false);
        self.filtered_commands.borrow_mut().clear();
        self.selected_command.set(None);
    }

    fn refresh_command_palette(&self, state: &TextAreaState) {
        let query = state.content.trim_start_matches('/').to_lowercase();
        let mut filtered = self.filtered_commands.borrow_mut();
        filtered.clear();

        for entry in &self.command_entries {
            if query.is_empty() || entry.keyword.starts_with(&query) {
                filtered.push(*entry);
            }
        }

        if filtered.is_empty() {
            self.selected_command.set(None);
        } else {
            let index = self.selected_command.get().unwrap_or(0);
            self.selected_command.set(Some(index.min(filtered.len() - 1)));
        }
    }

    fn move_command_selection(&self, delta: isize) {
        let filtered = self.filtered_commands.borrow();
        if filtered.is_empty() {
            self.selected_command.set(None);
            return;
        }

        let len = filtered.len() as isize;
        let current = self.selected_command.get().unwrap_or(0) as isize;
        let next = (current + delta).rem_euclid(len);
        self.selected_command.set(Some(next as usize));
    }

    fn apply_selected_command(&self, state: &mut TextAreaState) -> bool {
        let entry = {
            let filtered = self.filtered_commands.borrow();
            match self.selected_command.get().and_then(|index| filtered.get(index)) {
                Some(entry) => *entry,
                None => return false,
            }
        };

        state.content = format!("/{} ", entry.keyword);
        state.cursor_position = state.content.len();
        self.close_command_palette();
        true
    }

    /// Dim the border while a request is in flight
    pub fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }

    pub fn content(&self) -> String {
        self.state.borrow().content.clone()
    }

    /// Replace the draft and move the cursor to its end
    pub fn set_content(&self, content: &str) {
        let mut state = self.state.borrow_mut();
        if state.content == content {
            return;
        }

        state.content = content.to_string();
        state.cursor_position = state.content.len();
        self.sync_command_palette(&state);
    }

    pub fn is_palette_open(&self) -> bool {
        self.show_command_palette.get()
    }
}

impl Widget for &ConversationComposer {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let state = self.state.borrow();

        let (title, border) = if self.busy {
            (" Ask a coding question (waiting for answer) ", Color::DarkGray)
        } else {
            (" Ask a coding question ", Color::Green)
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .style(Style::default().fg(border));

        let inner_area = block.inner(area);
        block.render(area, buf);

        if state.content.is_empty() {
            let placeholder_line = Line::from(vec![
                Span::styled("▌", Style::default().fg(Color::White)),
                Span::styled(self.placeholder.as_str(), Style::default().fg(Color::DarkGray)),
            ]);
            buf.set_line(inner_area.x, inner_area.y, &placeholder_line, inner_area.width);
        } else {
            let mut content = state.content.clone();
            content.insert(state.cursor_position.min(content.len()), '▌');

            let lines: Vec<&str> = content.split('\n').collect();
            let height = inner_area.height as usize;
            let cursor_line = content[..state.cursor_position.min(content.len())]
                .matches('\n')
                .count();
            let first = (cursor_line + 1).saturating_sub(height);

            for (row, line_text) in lines.iter().skip(first).take(height).enumerate() {
                let line = Line::from(Span::styled(*line_text, Style::default().fg(Color::White)));
                buf.set_line(inner_area.x, inner_area.y + row as u16, &line, inner_area.width);
            }
        }

        if self.is_palette_open() {
            let filtered = self.filtered_commands.borrow();
            let palette_height = (filtered.len().min(5) + 2) as u16;
            let palette_area = Rect {
                x: inner_area.x,
                y: area.y.saturating_sub(palette_height),
                width: inner_area.width,
                height: palette_height.min(area.y),
            };
            if palette_area.height < 3 {
                return;
            }

            let block = Block::default()
                .borders(Borders::ALL)
                .title("Commands")
                .style(Style::default().fg(Color::Blue));
            let inner = block.inner(palette_area);
            block.render(palette_area, buf);

            let selected = self.selected_command.get();
            for (index, entry) in filtered.iter().enumerate().take(inner.height as usize) {
                let style = if selected == Some(index) {
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::Cyan)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::White)
                };

                let line = Line::from(vec![
                    Span::styled(format!("/{}", entry.keyword), style),
                    Span::styled("  ", Style::default()),
                    Span::styled(entry.description, Style::default().fg(Color::Gray)),
                ]);

                buf.set_line(inner.x, inner.y + index as u16, &line, inner.width);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::conversation::commands::SlashCommand;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(composer: &ConversationComposer, text: &str) {
        for c in text.chars() {
            composer.handle_key(press(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_enter_submits_without_clearing() {
        let composer = ConversationComposer::new("Ask...");
        type_text(&composer, "What is cloud computing?");

        assert_eq!(
            composer.handle_key(press(KeyCode::Enter)),
            ConversationResult::Submitted("What is cloud computing?".to_string())
        );
        assert_eq!(composer.content(), "What is cloud computing?");
    }

    #[test]
    fn test_shift_enter_inserts_newline() {
        let composer = ConversationComposer::new("Ask...");
        type_text(&composer, "line one");

        let result = composer.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT));
        assert_eq!(result, ConversationResult::Edited("line one\n".to_string()));
    }

    #[test]
    fn test_editing_multibyte_text() {
        let composer = ConversationComposer::new("Ask...");
        type_text(&composer, "héllo→");

        composer.handle_key(press(KeyCode::Left));
        composer.handle_key(press(KeyCode::Left));
        assert_eq!(
            composer.handle_key(press(KeyCode::Backspace)),
            ConversationResult::Edited("hélo→".to_string())
        );

        composer.handle_key(press(KeyCode::Home));
        composer.handle_key(press(KeyCode::Right));
        assert_eq!(
            composer.handle_key(press(KeyCode::Delete)),
            ConversationResult::Edited("hlo→".to_string())
        );

        composer.handle_key(press(KeyCode::End));
        composer.handle_key(press(KeyCode::Backspace));
        assert_eq!(composer.content(), "hlo");
    }

    #[test]
    fn test_slash_command_clears_draft() {
        let composer = ConversationComposer::new("Ask...");
        type_text(&composer, "/example 2");

        match composer.handle_key(press(KeyCode::Enter)) {
            ConversationResult::Command(command) => {
                assert_eq!(command.command, SlashCommand::Example);
                assert_eq!(command.example_number(), Some(2));
            }
            other => panic!("expected command, got {other:?}"),
        }
        assert_eq!(composer.content(), "");
    }

    #[test]
    fn test_palette_completes_selected_command() {
        let composer = ConversationComposer::new("Ask...");
        type_text(&composer, "/he");
        assert!(composer.is_palette_open());

        assert_eq!(
            composer.handle_key(press(KeyCode::Tab)),
            ConversationResult::Edited("/help ".to_string())
        );
        assert!(!composer.is_palette_open());
    }

    #[test]
    fn test_unknown_slash_word_is_submitted() {
        let composer = ConversationComposer::new("Ask...");
        type_text(&composer, "/etc");
        assert!(composer.is_palette_open());

        assert_eq!(
            composer.handle_key(press(KeyCode::Enter)),
            ConversationResult::Submitted("/etc".to_string())
        );
        assert!(!composer.is_palette_open());
        assert_eq!(composer.content(), "/etc");
    }

    #[test]
    fn test_set_content_moves_cursor_to_end() {
        let composer = ConversationComposer::new("Ask...");
        composer.set_content("Explain Docker containers");
        type_text(&composer, "!");
        assert_eq!(composer.content(), "Explain Docker containers!");

        composer.set_content("");
        assert_eq!(composer.content(), "");
    }

    #[test]
    fn test_paste_inserts_at_cursor() {
        let composer = ConversationComposer::new("Ask...");
        type_text(&composer, "ab");
        composer.handle_key(press(KeyCode::Left));

        assert_eq!(
            composer.handle_paste("x\r\ny"),
            ConversationResult::Edited("ax\nyb".to_string())
        );
    }
}
