use crate::roster::Sender;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A single line of the conversation. Never mutated once appended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub id: u64,
    pub content: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}

/// Append-only log of the conversation, in chronological order.
#[derive(Debug, Default, Clone)]
pub struct Transcript {
    messages: Vec<Message>,
    next_id: u64,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message stamped with the current time.
    pub fn append(&mut self, sender: Sender, content: impl Into<String>) -> &Message {
        self.append_at(sender, content, Utc::now())
    }

    /// Appends a message stamped `at`, or with the previous message's
    /// timestamp if `at` is earlier, so timestamps never decrease.
    pub fn append_at(
        &mut self,
        sender: Sender,
        content: impl Into<String>,
        at: DateTime<Utc>,
    ) -> &Message {
        let timestamp = match self.messages.last() {
            Some(last) if last.timestamp > at => last.timestamp,
            _ => at,
        };
        self.next_id += 1;
        self.messages.push(Message {
            id: self.next_id,
            content: content.into(),
            sender,
            timestamp,
        });
        &self.messages[self.messages.len() - 1]
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The contents of the last `n` messages, oldest first.
    pub fn recent_contents(&self, n: usize) -> Vec<String> {
        let start = self.messages.len().saturating_sub(n);
        self.messages[start..]
            .iter()
            .map(|m| m.content.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_ids_increase_with_append_order() {
        let mut transcript = Transcript::new();
        let a = transcript.append(Sender::end_user(), "one").id;
        let b = transcript.append(Sender::end_user(), "two").id;
        assert!(b > a);
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.last().map(|m| m.content.as_str()), Some("two"));
    }

    #[test]
    fn test_backwards_clock_is_clamped() {
        let mut transcript = Transcript::new();
        let now = Utc::now();
        transcript.append_at(Sender::end_user(), "first", now);
        let second = transcript
            .append_at(Sender::end_user(), "second", now - Duration::seconds(30))
            .timestamp;
        assert_eq!(second, now);

        let third = transcript
            .append_at(Sender::end_user(), "third", now + Duration::seconds(1))
            .timestamp;
        assert!(third > second);
    }

    #[test]
    fn test_timestamps_are_non_decreasing() {
        let mut transcript = Transcript::new();
        for i in 0..50 {
            transcript.append(Sender::end_user(), format!("message {}", i));
        }
        assert!(
            transcript
                .messages()
                .windows(2)
                .all(|w| w[0].timestamp <= w[1].timestamp)
        );
    }

    #[test]
    fn test_recent_contents() {
        let mut transcript = Transcript::new();
        assert!(transcript.recent_contents(3).is_empty());
        for text in ["a", "b", "c", "d"] {
            transcript.append(Sender::end_user(), text);
        }
        assert_eq!(transcript.recent_contents(2), vec!["c", "d"]);
        assert_eq!(transcript.recent_contents(10).len(), 4);
    }
}
