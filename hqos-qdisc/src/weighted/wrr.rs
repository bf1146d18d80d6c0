use hqos_wire::QueueDiscItem;

use super::{DscpMap, Quanta, Subbands};
use crate::{
    ConfigError, DisciplineConfig, Dropped, Lifecycle, QueueDisc, QueueDiscStats, QueueSize,
};

/// Position in the current round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Cursor {
    subband: usize,
    /// Packets served from `subband` in this visit.
    served: u32,
}

/// Weighted round robin: each visit to sub-band `i` serves up to `quanta[i]` packets
/// before moving on. Empty sub-bands are skipped.
#[derive(Debug)]
pub struct WrrQueueDisc {
    inner: Subbands,
    cursor: Cursor,
}

impl WrrQueueDisc {
    /// Name reported by [`QueueDisc::kind`].
    pub const KIND: &'static str = "WrrQueueDisc";

    pub fn new(config: DisciplineConfig, quanta: Quanta, map: DscpMap) -> Self {
        Self { inner: Subbands::new(Self::KIND, config, quanta, map), cursor: Cursor::default() }
    }

    pub fn quanta(&self) -> &Quanta {
        &self.inner.quanta
    }

    pub fn dscp_map(&self) -> &DscpMap {
        &self.inner.map
    }

    /// Number of items held by `subband`.
    pub fn subband_len(&self, subband: usize) -> Option<usize> {
        self.inner.queues.get(subband).map(|queue| queue.n_packets())
    }

    /// The sub-band the next dequeue serves, and the cursor after serving it.
    fn select(&self) -> Option<(usize, Cursor)> {
        let queues = &self.inner.queues;
        let n = queues.len();

        (0..n).find_map(|step| {
            let subband = (self.cursor.subband + step) % n;
            let served = if step == 0 { self.cursor.served } else { 0 };
            let quantum = self.inner.quanta.get(subband)?;

            if queues[subband].is_empty() || served >= quantum {
                return None;
            }

            let served = served + 1;
            let next = if served == quantum {
                Cursor { subband: (subband + 1) % n, served: 0 }
            } else {
                Cursor { subband, served }
            };
            Some((subband, next))
        })
    }
}

impl QueueDisc for WrrQueueDisc {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn enqueue(&mut self, item: QueueDiscItem) -> Result<(), Dropped> {
        self.inner.enqueue(item)
    }

    fn dequeue(&mut self) -> Option<QueueDiscItem> {
        if !self.inner.lifecycle.is_operating() {
            return None;
        }

        let (subband, next) = self.select()?;
        self.cursor = next;
        self.inner.pop(subband)
    }

    fn peek(&self) -> Option<&QueueDiscItem> {
        if !self.inner.lifecycle.is_operating() {
            return None;
        }

        let (subband, _) = self.select()?;
        self.inner.queues[subband].peek()
    }

    fn n_packets(&self) -> usize {
        self.inner.n_packets()
    }

    fn n_bytes(&self) -> usize {
        self.inner.n_bytes()
    }

    fn max_size(&self) -> Option<QueueSize> {
        Some(self.inner.max_size)
    }

    fn stats(&self) -> &QueueDiscStats {
        &self.inner.stats
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.inner.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.inner.lifecycle
    }

    fn check_config(&mut self) -> Result<(), ConfigError> {
        self.inner.check_config()
    }

    fn initialize_params(&mut self) {
        self.cursor = Cursor::default();
    }

    fn dispose(&mut self) {
        self.inner.dispose();
    }
}
