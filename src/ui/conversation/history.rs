//! Conversation view: recorded exchanges, the query in flight and the
//! welcome panel.

use crate::events::{Exchange, ResponseKind};
use crate::prompts::EXAMPLE_PROMPTS;
use crate::segments::Segment;
use chrono::Local;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

const CODE_GUTTER: &str = "│ ";

/// Renders the conversation bottom-anchored, `scroll` lines up from the end
pub struct ConversationView<'a> {
    exchanges: &'a [Exchange],
    in_flight: Option<&'a str>,
    notice: Option<&'a str>,
    scroll: usize,
}

impl<'a> ConversationView<'a> {
    pub fn new(exchanges: &'a [Exchange]) -> Self {
        Self {
            exchanges,
            in_flight: None,
            notice: None,
            scroll: 0,
        }
    }

    pub fn in_flight(mut self, query: Option<&'a str>) -> Self {
        self.in_flight = query;
        self
    }

    /// Informational text (help, example list) shown after the conversation
    pub fn notice(mut self, notice: Option<&'a str>) -> Self {
        self.notice = notice;
        self
    }

    pub fn scroll(mut self, scroll: usize) -> Self {
        self.scroll = scroll;
        self
    }

    /// Largest useful scroll offset for a viewport of the given outer size
    pub fn max_scroll(&self, area: Rect) -> usize {
        let inner = Block::default().borders(Borders::ALL).inner(area);
        self.build_lines(inner.width as usize)
            .len()
            .saturating_sub(inner.height as usize)
    }

    fn build_lines(&self, width: usize) -> Vec<Line<'a>> {
        let mut lines = Vec::new();

        if self.exchanges.is_empty() && self.in_flight.is_none() {
            lines.extend(welcome_lines());
        }

        for exchange in self.exchanges {
            lines.extend(exchange_lines(exchange, width));
            lines.push(Line::default());
        }

        if let Some(query) = self.in_flight {
            lines.push(query_header("asking...", Color::Yellow));
            lines.extend(wrapped(query.trim(), width, Style::default().fg(Color::Cyan)));
            lines.push(Line::from(Span::styled(
                "  Thinking...",
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            )));
            lines.push(Line::default());
        }

        if let Some(notice) = self.notice {
            let style = Style::default().fg(Color::Yellow);
            for line in notice.lines() {
                lines.extend(wrapped(line, width, style));
            }
        }

        lines
    }
}

impl Widget for ConversationView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title = match self.exchanges.len() {
            0 => " Conversation ".to_string(),
            1 => " Conversation (1 answer) ".to_string(),
            n => format!(" Conversation ({n} answers) "),
        };
        let block = Block::default().borders(Borders::ALL).title(title);
        let inner = block.inner(area);
        block.render(area, buf);

        let lines = self.build_lines(inner.width as usize);
        let height = inner.height as usize;
        let scroll = self.scroll.min(lines.len().saturating_sub(height));
        let end = lines.len() - scroll;
        let start = end.saturating_sub(height);

        for (row, line) in lines[start..end].iter().enumerate() {
            buf.set_line(inner.x, inner.y + row as u16, line, inner.width);
        }
    }
}

fn welcome_lines() -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(Span::styled(
            "Ask any coding question",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )),
        Line::default(),
        Line::from(Span::styled(
            "Popular examples:",
            Style::default().fg(Color::Gray),
        )),
    ];

    for (index, prompt) in EXAMPLE_PROMPTS.iter().enumerate() {
        lines.push(Line::from(vec![
            Span::styled(format!("  {}. ", index + 1), Style::default().fg(Color::DarkGray)),
            Span::styled(*prompt, Style::default().fg(Color::Cyan)),
        ]));
    }

    lines.push(Line::default());
    lines.push(Line::from(Span::styled(
        "Type /example <n> to use one, /help for commands.",
        Style::default().fg(Color::DarkGray),
    )));
    lines.push(Line::default());
    lines
}

fn query_header(label: &str, color: Color) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            "Q ",
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("{label} {}", "─".repeat(20)),
            Style::default().fg(Color::DarkGray),
        ),
    ])
}

fn exchange_lines(exchange: &Exchange, width: usize) -> Vec<Line<'static>> {
    let time = exchange
        .completed_at()
        .with_timezone(&Local)
        .format("%H:%M:%S")
        .to_string();

    let mut lines = vec![query_header(&time, Color::Blue)];
    lines.extend(wrapped(
        exchange.query().trim(),
        width,
        Style::default().fg(Color::Cyan),
    ));

    let answer_label = match exchange.kind() {
        ResponseKind::Prose => "A",
        ResponseKind::Code => "A (code)",
    };
    lines.push(Line::from(Span::styled(
        answer_label,
        Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD),
    )));

    for segment in exchange.segments() {
        match segment {
            Segment::Prose(text) => {
                for line in text.lines() {
                    lines.extend(wrapped(line, width, Style::default().fg(Color::White)));
                }
            }
            Segment::Code { language, body } => {
                if let Some(language) = language {
                    lines.push(Line::from(Span::styled(
                        format!("  {language}"),
                        Style::default().fg(Color::DarkGray),
                    )));
                }
                for line in body.lines() {
                    lines.push(Line::from(vec![
                        Span::styled(format!("  {CODE_GUTTER}"), Style::default().fg(Color::DarkGray)),
                        Span::styled(line.to_string(), Style::default().fg(Color::Yellow)),
                    ]));
                }
            }
        }
    }

    lines
}

/// Indent and word-wrap one source line
fn wrapped(text: &str, width: usize, style: Style) -> Vec<Line<'static>> {
    wrap_text(text, width.saturating_sub(2))
        .into_iter()
        .map(|line| Line::from(vec![Span::raw("  "), Span::styled(line, style)]))
        .collect()
}

/// Word-wrap `text` to `width` columns, counting chars rather than bytes.
///
/// Words longer than the width are split. A blank input yields one empty line.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();

        while word.len() > width {
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(width);
            lines.push(word.into_iter().collect());
            word = rest;
        }

        let needed = if current_len == 0 { word.len() } else { current_len + 1 + word.len() };
        if needed > width && current_len > 0 {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current_len += word.len();
        current.extend(word);
    }

    if current_len > 0 || lines.is_empty() {
        lines.push(current);
    }

    lines
}
