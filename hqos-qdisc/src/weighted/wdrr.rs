use hqos_wire::QueueDiscItem;

use super::{DscpMap, Quanta, Subbands};
use crate::{
    ConfigError, DisciplineConfig, Dropped, DropTailQueue, Lifecycle, QueueDisc, QueueDiscStats,
    QueueSize,
};

/// Deficit round robin bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Round {
    subband: usize,
    /// Whether `subband` already received its quantum for the current visit.
    credited: bool,
    deficits: Vec<u64>,
}

impl Round {
    fn new(subbands: usize) -> Self {
        Self { subband: 0, credited: false, deficits: vec![0; subbands] }
    }

    fn advance(&mut self) {
        self.subband = (self.subband + 1) % self.deficits.len();
        self.credited = false;
    }

    /// Moves to the sub-band whose head the next dequeue sends, crediting quanta along the
    /// way. Returns `None` when every queue is empty.
    fn select(&mut self, queues: &[DropTailQueue], quanta: &Quanta) -> Option<usize> {
        if self.deficits.is_empty() || queues.iter().all(DropTailQueue::is_empty) {
            return None;
        }

        loop {
            let subband = self.subband;
            let Some(head) = queues[subband].peek() else {
                self.deficits[subband] = 0;
                self.advance();
                continue;
            };

            if !self.credited {
                self.deficits[subband] += u64::from(quanta.get(subband).unwrap_or(1));
                self.credited = true;
            }

            if head.size() as u64 <= self.deficits[subband] {
                return Some(subband);
            }

            self.advance();
        }
    }

    /// Charges `bytes` to the current sub-band.
    fn charge(&mut self, bytes: usize, emptied: bool) {
        let subband = self.subband;
        self.deficits[subband] = self.deficits[subband].saturating_sub(bytes as u64);

        if emptied {
            self.deficits[subband] = 0;
            self.advance();
        }
    }
}

/// Weighted deficit round robin: each visit to sub-band `i` adds `quanta[i]` bytes of
/// credit, and the sub-band sends packets for as long as its credit covers the head. Credit
/// left over carries to the next round unless the sub-band runs empty.
#[derive(Debug)]
pub struct WdrrQueueDisc {
    inner: Subbands,
    round: Round,
}

impl WdrrQueueDisc {
    /// Name reported by [`QueueDisc::kind`].
    pub const KIND: &'static str = "WdrrQueueDisc";

    pub fn new(config: DisciplineConfig, quanta: Quanta, map: DscpMap) -> Self {
        Self { inner: Subbands::new(Self::KIND, config, quanta, map), round: Round::default() }
    }

    pub fn quanta(&self) -> &Quanta {
        &self.inner.quanta
    }

    pub fn dscp_map(&self) -> &DscpMap {
        &self.inner.map
    }

    pub fn subband_len(&self, subband: usize) -> Option<usize> {
        self.inner.queues.get(subband).map(DropTailQueue::n_packets)
    }

    /// Credit `subband` holds, in bytes.
    pub fn deficit(&self, subband: usize) -> Option<u64> {
        self.round.deficits.get(subband).copied()
    }
}

impl QueueDisc for WdrrQueueDisc {
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

        let subband = self.round.select(&self.inner.queues, &self.inner.quanta)?;
        let item = self.inner.pop(subband)?;
        self.round.charge(item.size(), self.inner.queues[subband].is_empty());
        Some(item)
    }

    fn peek(&self) -> Option<&QueueDiscItem> {
        if !self.inner.lifecycle.is_operating() {
            return None;
        }

        let mut round = self.round.clone();
        let subband = round.select(&self.inner.queues, &self.inner.quanta)?;
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
        self.round = Round::new(self.inner.quanta.len());
    }

    fn dispose(&mut self) {
        self.inner.dispose();
        self.round = Round::new(self.inner.quanta.len());
    }
}
