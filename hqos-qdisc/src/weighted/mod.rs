//! Weighted child disciplines.
//!
//! Both [`WrrQueueDisc`] and [`WdrrQueueDisc`] split their traffic into sub-bands by DSCP
//! value and share the link between sub-bands in proportion to per-sub-band [`Quanta`].
//! They differ in what a quantum counts: packets per round for WRR, bytes per round for
//! WDRR.
//!
//! Items whose DSCP isn't in the [`DscpMap`] (or can't be read) go to the last sub-band.

use hqos_wire::{Dscp, QueueDiscItem};
use tracing::{debug, trace};

use crate::{
    ConfigError, DisciplineConfig, DropReason, DropTailQueue, Dropped, Lifecycle, PacketFilter,
    QueueDisc, QueueDiscStats, QueueSize,
};

mod wdrr;
pub use wdrr::WdrrQueueDisc;

mod wrr;
pub use wrr::WrrQueueDisc;

/// Capacity of a weighted discipline when the configuration doesn't set one.
pub const DEFAULT_WEIGHTED_SIZE: QueueSize = QueueSize::packets(1_000);

/// Per-sub-band service weights. Sub-band `i` gets quantum `i`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Quanta(Vec<u32>);

impl Quanta {
    pub fn new(quanta: Vec<u32>) -> Self {
        Self(quanta)
    }

    /// Number of sub-bands.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn get(&self, subband: usize) -> Option<u32> {
        self.0.get(subband).copied()
    }

    #[inline]
    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }
}

impl From<Vec<u32>> for Quanta {
    fn from(quanta: Vec<u32>) -> Self {
        Self(quanta)
    }
}

impl<const N: usize> From<[u32; N]> for Quanta {
    fn from(quanta: [u32; N]) -> Self {
        Self(quanta.to_vec())
    }
}

impl FromIterator<u32> for Quanta {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// DSCP value to sub-band assignments.
#[derive(Clone, PartialEq, Eq)]
pub struct DscpMap {
    subbands: [Option<usize>; Dscp::MAX as usize + 1],
}

impl DscpMap {
    pub const fn new() -> Self {
        Self { subbands: [None; Dscp::MAX as usize + 1] }
    }

    pub fn with_entry(mut self, dscp: Dscp, subband: usize) -> Self {
        self.insert(dscp, subband);
        self
    }

    pub fn insert(&mut self, dscp: Dscp, subband: usize) {
        self.subbands[dscp.value() as usize] = Some(subband);
    }

    #[inline]
    pub fn subband_for(&self, dscp: Dscp) -> Option<usize> {
        self.subbands[dscp.value() as usize]
    }

    /// Mapped code points with their sub-bands, in ascending DSCP order.
    pub fn iter(&self) -> impl Iterator<Item = (Dscp, usize)> + '_ {
        self.subbands
            .iter()
            .enumerate()
            .filter_map(|(dscp, subband)| subband.map(|subband| (Dscp::from_bits(dscp as u8), subband)))
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

impl Default for DscpMap {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DscpMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl FromIterator<(Dscp, usize)> for DscpMap {
    fn from_iter<I: IntoIterator<Item = (Dscp, usize)>>(iter: I) -> Self {
        iter.into_iter().fold(Self::new(), |map, (dscp, subband)| map.with_entry(dscp, subband))
    }
}

/// State shared by the weighted disciplines: the sub-band queues, their classification and
/// everything but the round bookkeeping.
#[derive(Debug)]
struct Subbands {
    kind: &'static str,
    max_size: QueueSize,
    quanta: Quanta,
    map: DscpMap,
    queues: Vec<DropTailQueue>,
    classes: Vec<Box<dyn QueueDisc>>,
    filters: Vec<Box<dyn PacketFilter>>,
    lifecycle: Lifecycle,
    stats: QueueDiscStats,
}

impl Subbands {
    fn new(kind: &'static str, config: DisciplineConfig, quanta: Quanta, map: DscpMap) -> Self {
        Self {
            kind,
            max_size: config.max_size.unwrap_or(DEFAULT_WEIGHTED_SIZE),
            quanta,
            map,
            queues: config.internal_queues,
            classes: config.classes,
            filters: config.filters,
            lifecycle: Lifecycle::default(),
            stats: QueueDiscStats::default(),
        }
    }

    fn subband_for(&self, item: &QueueDiscItem) -> usize {
        let last = self.queues.len().saturating_sub(1);
        item.dscp().ok().and_then(|dscp| self.map.subband_for(dscp)).unwrap_or(last)
    }

    fn n_packets(&self) -> usize {
        self.queues.iter().map(DropTailQueue::n_packets).sum()
    }

    fn n_bytes(&self) -> usize {
        self.queues.iter().map(DropTailQueue::n_bytes).sum()
    }

    fn reject(&mut self, item: QueueDiscItem, reason: DropReason) -> Dropped {
        self.stats.record_drop(&reason);
        Dropped::new(item, reason)
    }

    /// Admits `item` into its sub-band.
    fn enqueue(&mut self, item: QueueDiscItem) -> Result<(), Dropped> {
        if let Err(reason) = self.lifecycle.ensure_operating() {
            return Err(self.reject(item, reason));
        }

        self.stats.record_received(item.size());

        if !self.max_size.admits(self.n_packets(), self.n_bytes(), item.size()) {
            trace!(kind = self.kind, max_size = %self.max_size, "capacity exceeded, dropping");
            return Err(self.reject(item, DropReason::CapacityExceeded));
        }

        let subband = self.subband_for(&item);
        match self.queues[subband].enqueue(item) {
            Ok(()) => {
                trace!(kind = self.kind, subband, packets = self.queues[subband].n_packets(), "enqueued");
                self.stats.record_enqueued();
                Ok(())
            }
            Err(item) => Err(self.reject(item, DropReason::InternalQueueFull { band: subband })),
        }
    }

    /// Pops the head of `subband`.
    fn pop(&mut self, subband: usize) -> Option<QueueDiscItem> {
        let item = self.queues[subband].dequeue()?;
        trace!(kind = self.kind, subband, remaining = self.queues[subband].n_packets(), "popped");
        self.stats.record_dequeued(item.size());
        Some(item)
    }

    fn check_config(&mut self) -> Result<(), ConfigError> {
        let kind = self.kind;

        if !self.classes.is_empty() {
            return Err(ConfigError::HasClasses { kind });
        }

        if !self.filters.is_empty() {
            return Err(ConfigError::HasPacketFilters { kind });
        }

        if self.quanta.is_empty() {
            return Err(ConfigError::EmptyQuanta { kind });
        }

        if let Some(index) = self.quanta.as_slice().iter().position(|&quantum| quantum == 0) {
            return Err(ConfigError::ZeroQuantum { kind, index });
        }

        let subbands = self.quanta.len();
        if let Some((dscp, subband)) = self.map.iter().find(|&(_, subband)| subband >= subbands) {
            return Err(ConfigError::SubbandOutOfRange { kind, dscp, subband, subbands });
        }

        if self.queues.is_empty() {
            self.queues = (0..subbands).map(|_| DropTailQueue::new(self.max_size)).collect();
            debug!(kind, subbands, max_size = %self.max_size, "created drop-tail internal queues");
        }

        if self.queues.len() != subbands {
            return Err(ConfigError::InternalQueueCount { kind, expected: subbands, got: self.queues.len() });
        }

        for (index, queue) in self.queues.iter().enumerate() {
            let capacity = queue.max_size();
            match capacity.covers(&self.max_size) {
                Some(true) => {}
                None => {
                    return Err(ConfigError::UnitMismatch {
                        kind,
                        expected: self.max_size.unit(),
                        got: capacity.unit(),
                    })
                }
                Some(false) => {
                    return Err(ConfigError::UndersizedQueue {
                        kind,
                        index,
                        capacity,
                        required: self.max_size,
                    })
                }
            }
        }

        let (packets, bytes) = (self.n_packets(), self.n_bytes());
        if !self.max_size.holds(packets, bytes) {
            return Err(ConfigError::Overfilled { kind, packets, bytes, max_size: self.max_size });
        }

        Ok(())
    }

    fn dispose(&mut self) {
        let dropped: usize = self.queues.iter_mut().map(DropTailQueue::clear).sum();
        debug!(kind = self.kind, dropped, "flushed internal queues");
        self.lifecycle.dispose(self.kind);
    }
}
