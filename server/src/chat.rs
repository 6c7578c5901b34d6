//! Bounded chat history replayed to joining sessions

use std::collections::VecDeque;
use worldsync_shared::{server_time, ChatEntry};

/// Append-only chat log keeping the most recent `capacity` lines.
///
/// A capacity of zero is raised to one.
#[derive(Debug)]
pub struct ChatLog {
    entries: VecDeque<ChatEntry>,
    capacity: usize,
}

impl ChatLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
        }
    }

    /// Appends a line stamped with the current server time, evicting the
    /// oldest line once the log is full.
    pub fn append(&mut self, message: impl Into<String>) -> ChatEntry {
        let entry = ChatEntry {
            time: server_time(),
            message: message.into(),
        };
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry.clone());
        entry
    }

    /// Lines in insertion order, oldest first
    pub fn history(&self) -> Vec<ChatEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Cleans up a client chat line: trims surrounding whitespace and truncates
/// to `max_chars` characters. Returns `None` for lines that end up empty.
pub fn sanitize_message(raw: &str, max_chars: usize) -> Option<String> {
    let cleaned: String = raw.trim().chars().take(max_chars).collect();
    if cleaned.is_empty() {
        return None;
    }
    Some(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_keeps_insertion_order() {
        let mut log = ChatLog::new(10);
        log.append("first");
        log.append("second");
        log.append("third");

        let messages: Vec<String> = log.history().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut log = ChatLog::new(2);
        log.append("a");
        log.append("b");
        log.append("c");

        assert_eq!(log.len(), 2);
        let messages: Vec<String> = log.history().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["b", "c"]);
    }

    #[test]
    fn test_append_returns_stamped_entry() {
        let mut log = ChatLog::new(4);
        assert!(log.is_empty());

        let entry = log.append("hello");
        assert_eq!(entry.message, "hello");
        assert!(entry.time > 0);
        assert_eq!(log.history(), vec![entry]);
    }

    #[test]
    fn test_sanitize_message() {
        assert_eq!(sanitize_message("  hi  ", 10), Some("hi".to_string()));
        assert_eq!(sanitize_message("   ", 10), None);
        assert_eq!(sanitize_message("", 10), None);
        assert_eq!(sanitize_message("abcdef", 3), Some("abc".to_string()));
        // Truncation counts characters, not bytes
        assert_eq!(sanitize_message("héllo", 2), Some("hé".to_string()));
    }

    #[test]
    fn test_sanitize_with_zero_limit_drops_line() {
        assert_eq!(sanitize_message("hello", 0), None);
    }

    #[test]
    fn test_zero_capacity_keeps_latest_line() {
        let mut log = ChatLog::new(0);
        log.append("a");
        log.append("b");
        assert_eq!(log.len(), 1);
        assert_eq!(log.history()[0].message, "b");
    }
}
