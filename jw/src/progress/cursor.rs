//! CursorTracker - position in the incremental message feed

use tracing::debug;

use crate::domain::{Message, MessageBatch};

/// Tracks which messages a wait session has already consumed
///
/// The first batch of a session only positions the cursor at the feed's
/// tail; its messages belong to history that predates this wait and are
/// never shown. A previous run's "100%" must not become the floor of a fresh
/// wait.
#[derive(Debug, Clone, Default)]
pub struct CursorTracker {
    last_seq: Option<u64>,
    primed: bool,
}

impl CursorTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value to pass as `since` on the next message query
    pub fn since(&self) -> Option<u64> {
        self.last_seq
    }

    /// Whether the priming fetch has happened
    pub fn is_primed(&self) -> bool {
        self.primed
    }

    /// Fold a fetched batch into the cursor and return the visible messages
    ///
    /// The position never moves backwards, even if a card reports a smaller
    /// sequence number than one already seen on another card.
    pub fn advance(&mut self, batch: MessageBatch) -> Vec<Message> {
        let mark = batch.high_water_mark();
        debug!(
            ?mark,
            last_seq = ?self.last_seq,
            primed = self.primed,
            count = batch.messages.len(),
            "CursorTracker::advance: called"
        );

        if let Some(mark) = mark {
            self.last_seq = Some(self.last_seq.map_or(mark, |seen| seen.max(mark)));
        }

        if !self.primed {
            debug!("CursorTracker::advance: priming fetch, discarding history");
            self.primed = true;
            return Vec::new();
        }

        batch.messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn batch(seqs: &[u64], last_seq: Option<u64>) -> MessageBatch {
        MessageBatch::new(
            seqs.iter().map(|s| Message::new(*s, json!({"progress": 100}))).collect(),
            last_seq,
        )
    }

    #[test]
    fn test_first_fetch_primes_and_hides_history() {
        let mut cursor = CursorTracker::new();
        assert_eq!(cursor.since(), None);
        assert!(!cursor.is_primed());

        let visible = cursor.advance(batch(&[1, 2, 3], Some(3)));

        assert!(visible.is_empty());
        assert!(cursor.is_primed());
        assert_eq!(cursor.since(), Some(3));
    }

    #[test]
    fn test_priming_on_empty_feed() {
        let mut cursor = CursorTracker::new();
        assert!(cursor.advance(MessageBatch::default()).is_empty());
        assert!(cursor.is_primed());
        assert_eq!(cursor.since(), None);

        let visible = cursor.advance(batch(&[1], None));
        assert_eq!(visible.len(), 1);
        assert_eq!(cursor.since(), Some(1));
    }

    #[test]
    fn test_subsequent_fetches_are_visible() {
        let mut cursor = CursorTracker::new();
        cursor.advance(batch(&[1, 2], None));

        let visible = cursor.advance(batch(&[3, 4], None));
        assert_eq!(visible.len(), 2);
        assert_eq!(cursor.since(), Some(4));
    }

    #[test]
    fn test_cursor_never_moves_backwards() {
        let mut cursor = CursorTracker::new();
        cursor.advance(batch(&[10], None));

        // A second card with its own, smaller numbering
        let visible = cursor.advance(batch(&[2], None));
        assert_eq!(visible.len(), 1);
        assert_eq!(cursor.since(), Some(10));
    }
}
