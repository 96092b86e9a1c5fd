//! relay/history.rs — 固定容量的訊息環

use std::collections::VecDeque;

use super::ChatMessage;

/// FIFO:滿了就丟最舊的一筆
#[derive(Debug)]
pub struct HistoryBuffer {
    buf: VecDeque<ChatMessage>,
    capacity: usize,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        Self { buf: VecDeque::new(), capacity }
    }

    pub fn append(&mut self, msg: ChatMessage) {
        self.buf.push_back(msg);
        while self.buf.len() > self.capacity {
            self.buf.pop_front();
        }
    }

    /// 舊→新的複本;之後的 append 不會動到已取出的快照
    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.buf.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}
