use crate::events::Exchange;

/// Append-only log of completed exchanges, in completion order.
///
/// There is no removal, reordering or capacity bound; the log lives as long
/// as the session that owns it.
#[derive(Debug, Clone, Default)]
pub struct HistoryStore {
    entries: Vec<Exchange>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn append(&mut self, exchange: Exchange) {
        self.entries.push(exchange);
    }

    /// Every exchange, oldest first
    pub fn all(&self) -> &[Exchange] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_preserves_order() {
        let mut history = HistoryStore::new();
        assert!(history.is_empty());

        history.append(Exchange::new("first", "one"));
        history.append(Exchange::new("second", "two"));
        history.append(Exchange::new("third", "three"));

        let queries: Vec<&str> = history.all().iter().map(Exchange::query).collect();
        assert_eq!(queries, vec!["first", "second", "third"]);
        assert_eq!(history.len(), 3);
        assert_eq!(history.all()[2].response(), "three");
    }
}
