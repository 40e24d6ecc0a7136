use serde::Serialize;
use crate::models::message::{Message, Role};

/// Plain text of an uploaded journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JournalEntry {
    pub file_name: String,
    pub content: String,
}

#[derive(Debug, Clone, Default)]
pub struct UserSession {
    pub document: Option<JournalEntry>,
    pub history: Vec<Message>,
    /// Set while the model is still answering the last user message.
    pub pending_reply: bool,
    /// Bumped on every upload so late replies for an old entry can be dropped.
    pub generation: u64,
}

impl UserSession {
    /// Replaces the journal entry and starts the dialogue over.
    pub fn load_document(&mut self, entry: JournalEntry) {
        self.document = Some(entry);
        self.history.clear();
        self.pending_reply = false;
        self.generation += 1;
    }

    pub fn push(&mut self, message: Message) {
        self.history.push(message);
    }

    /// Number of completed user/assistant exchanges.
    pub fn exchange_count(&self) -> usize {
        self.history.iter().filter(|m| m.role == Role::Assistant).count()
    }

    pub fn remaining_exchanges(&self, max_exchanges: usize) -> usize {
        max_exchanges.saturating_sub(self.exchange_count())
    }

    pub fn is_complete(&self, max_exchanges: usize) -> bool {
        self.exchange_count() >= max_exchanges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(text: &str) -> JournalEntry {
        JournalEntry { file_name: "entry.txt".to_string(), content: text.to_string() }
    }

    #[test]
    fn test_new_document_clears_history() {
        let mut session = UserSession::default();
        session.load_document(entry("first"));
        session.push(Message::user("hello"));
        session.push(Message::assistant("hi"));

        session.pending_reply = true;
        let generation = session.generation;

        session.load_document(entry("second"));
        assert!(session.history.is_empty());
        assert!(!session.pending_reply);
        assert_eq!(session.generation, generation + 1);
        assert_eq!(session.document.as_ref().unwrap().content, "second");
    }

    #[test]
    fn test_exchange_counting() {
        let mut session = UserSession::default();
        session.push(Message::user("a"));
        assert_eq!(session.exchange_count(), 0);
        session.push(Message::assistant("b"));
        session.push(Message::user("c"));
        session.push(Message::assistant("d"));
        assert_eq!(session.exchange_count(), 2);
        assert_eq!(session.remaining_exchanges(5), 3);
        assert!(!session.is_complete(5));
        assert!(session.is_complete(2));
        assert_eq!(session.remaining_exchanges(1), 0);
    }
}
