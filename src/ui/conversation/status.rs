use crate::session::SessionState;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

const HINT: &str = "Enter send · Shift+Enter new line · PgUp/PgDn scroll · /help · Ctrl+C quit";

/// One-line status: loading indicator, the last error, or a key hint
pub struct StatusLine<'a> {
    state: &'a SessionState,
    tick: usize,
}

impl<'a> StatusLine<'a> {
    /// `tick` animates the loading indicator
    pub fn new(state: &'a SessionState, tick: usize) -> Self {
        Self { state, tick }
    }

    fn line(&self) -> Line<'a> {
        if self.state.is_loading() {
            let dots = ".".repeat(self.tick % 3 + 1);
            return Line::from(vec![
                Span::styled(
                    format!("⏳ Processing{dots}"),
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ),
            ]);
        }

        if let Some(error) = self.state.last_error() {
            return Line::from(vec![
                Span::styled(
                    "✗ ",
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                ),
                Span::styled(error, Style::default().fg(Color::Red)),
            ]);
        }

        Line::from(Span::styled(HINT, Style::default().fg(Color::DarkGray)))
    }
}

impl Widget for StatusLine<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }
        let line = self.line();
        buf.set_line(area.x, area.y, &line, area.width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::UPSTREAM_FAILURE_MESSAGE;

    fn text(line: &Line<'_>) -> String {
        line.spans.iter().map(|span| span.content.as_ref()).collect()
    }

    #[test]
    fn test_idle_state_shows_hint() {
        let state = SessionState::default();
        assert_eq!(text(&StatusLine::new(&state, 0).line()), HINT);
    }

    #[test]
    fn test_loading_dots_cycle() {
        let state = SessionState::with_flags(true, None);
        assert_eq!(text(&StatusLine::new(&state, 0).line()), "⏳ Processing.");
        assert_eq!(text(&StatusLine::new(&state, 2).line()), "⏳ Processing...");
        assert_eq!(text(&StatusLine::new(&state, 3).line()), "⏳ Processing.");
    }

    #[test]
    fn test_error_is_shown_when_idle() {
        let state = SessionState::with_flags(false, Some(UPSTREAM_FAILURE_MESSAGE));
        assert_eq!(
            text(&StatusLine::new(&state, 0).line()),
            "✗ Failed to get response. Please check your API key."
        );
    }
}
