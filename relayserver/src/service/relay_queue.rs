//! 중계 큐
//!
//! 모든 수신자가 공유하는 FIFO 큐입니다. 전달은 항상 맨 앞 항목부터
//! 이루어지며, 맨 앞 항목을 받을 수 없으면 뒤 항목도 기다립니다.

use shared::protocol::Message;
use std::collections::VecDeque;

/// 중계 대기 항목
#[derive(Debug, Clone, PartialEq)]
pub struct RelayEntry {
    pub recipient: String,
    pub message: Message,
}

#[derive(Debug, Default)]
pub struct RelayQueue {
    entries: VecDeque<RelayEntry>,
}

impl RelayQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, recipient: &str, message: Message) {
        self.entries.push_back(RelayEntry {
            recipient: recipient.to_string(),
            message,
        });
    }

    pub fn front(&self) -> Option<&RelayEntry> {
        self.entries.front()
    }

    pub fn pop_front(&mut self) -> Option<RelayEntry> {
        self.entries.pop_front()
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
    fn test_fifo_across_recipients() {
        let mut queue = RelayQueue::new();
        queue.push("bob", Message::chat("alice", "bob", "1"));
        queue.push("carol", Message::chat("alice", "carol", "2"));
        queue.push("bob", Message::chat("carol", "bob", "3"));
        assert_eq!(queue.len(), 3);

        assert_eq!(queue.front().map(|e| e.recipient.as_str()), Some("bob"));
        let texts: Vec<_> = std::iter::from_fn(|| queue.pop_front())
            .filter_map(|e| e.message.text)
            .collect();
        assert_eq!(texts, vec!["1", "2", "3"]);
        assert!(queue.is_empty());
    }
}
