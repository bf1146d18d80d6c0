use std::collections::VecDeque;

use hqos_wire::QueueDiscItem;
use tracing::trace;

use crate::QueueSize;

/// A bounded FIFO that rejects arrivals once full, without evicting anything already queued.
#[derive(Debug)]
pub struct DropTailQueue {
    items: VecDeque<QueueDiscItem>,
    max_size: QueueSize,
    n_bytes: usize,
}

impl DropTailQueue {
    pub fn new(max_size: QueueSize) -> Self {
        Self { items: VecDeque::new(), max_size, n_bytes: 0 }
    }

    #[inline]
    pub fn max_size(&self) -> QueueSize {
        self.max_size
    }

    /// Appends the item, or hands it back if it doesn't fit.
    pub fn enqueue(&mut self, item: QueueDiscItem) -> Result<(), QueueDiscItem> {
        if !self.max_size.admits(self.items.len(), self.n_bytes, item.size()) {
            trace!(
                packets = self.items.len(),
                bytes = self.n_bytes,
                max_size = %self.max_size,
                "drop-tail queue full"
            );
            return Err(item);
        }

        self.n_bytes += item.size();
        self.items.push_back(item);
        Ok(())
    }

    pub fn dequeue(&mut self) -> Option<QueueDiscItem> {
        let item = self.items.pop_front()?;
        self.n_bytes -= item.size();
        Some(item)
    }

    #[inline]
    pub fn peek(&self) -> Option<&QueueDiscItem> {
        self.items.front()
    }

    #[inline]
    pub fn n_packets(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn n_bytes(&self) -> usize {
        self.n_bytes
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drops every queued item, returning how many there were.
    pub fn clear(&mut self) -> usize {
        let n = self.items.len();
        self.items.clear();
        self.n_bytes = 0;
        n
    }
}
