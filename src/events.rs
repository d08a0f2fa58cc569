use chrono::{DateTime, Utc};

use crate::segments::{contains_code, split_segments, Segment};

/// TUI-specific events (keyboard, paste, resize, ticks)
#[derive(Debug, Clone)]
pub enum TuiEvent {
    /// Key press event
    Key(crossterm::event::KeyEvent),

    /// Bracketed paste
    Paste(String),

    /// Terminal resize
    Resize(u16, u16),

    /// Redraw tick
    Tick,
}

/// How an answer should be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// Plain explanatory text
    Prose,
    /// Contains at least one fenced source-code block
    Code,
}

impl ResponseKind {
    pub fn classify(response: &str) -> Self {
        if contains_code(response) {
            ResponseKind::Code
        } else {
            ResponseKind::Prose
        }
    }
}

/// One completed question/answer pair.
///
/// Only built by the session controller on a successful settlement; the
/// fields are private so an exchange cannot change after it is recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    query: String,
    response: String,
    kind: ResponseKind,
    completed_at: DateTime<Utc>,
}

impl Exchange {
    pub(crate) fn new(query: impl Into<String>, response: impl Into<String>) -> Self {
        let response = response.into();
        Self {
            query: query.into(),
            kind: ResponseKind::classify(&response),
            response,
            completed_at: Utc::now(),
        }
    }

    /// The query exactly as the user submitted it
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn response(&self) -> &str {
        &self.response
    }

    pub fn kind(&self) -> ResponseKind {
        self.kind
    }

    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    /// Answer split into prose and code segments for display
    pub fn segments(&self) -> Vec<Segment> {
        split_segments(&self.response)
    }
}
