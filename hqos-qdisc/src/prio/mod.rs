//! The classful priority scheduler.
//!
//! [`PrioQueueDisc`] owns N bands, each backed by a child [`QueueDisc`], and always serves
//! the lowest-numbered non-empty band. Under sustained load on band 0 the other bands
//! starve; that is the point of strict priority.
//!
//! Band selection, in order:
//! 1. the first installed [`PacketFilter`] that matches, if its result is a valid band;
//! 2. `priomap[0]` if a filter matched with an out-of-range band;
//! 3. `priomap[priority % 16]` if no filter matched.

use hqos_wire::QueueDiscItem;
use tracing::{debug, trace};

use crate::{
    ConfigError, DisciplineConfig, DropReason, DropTailQueue, Dropped, FifoQueueDisc, Lifecycle,
    PacketFilter, QueueDisc, QueueDiscStats, QueueSize,
};

mod priomap;
pub use priomap::*;

/// Fewest bands a priority scheduler may have.
pub const MIN_BANDS: usize = 2;

/// Classful strict-priority scheduler. Band 0 is always served first.
#[derive(Debug)]
pub struct PrioQueueDisc {
    priomap: Priomap,
    max_size: Option<QueueSize>,
    bands: Vec<Box<dyn QueueDisc>>,
    filters: Vec<Box<dyn PacketFilter>>,
    internal_queues: Vec<DropTailQueue>,
    lifecycle: Lifecycle,
    stats: QueueDiscStats,
}

impl Default for PrioQueueDisc {
    fn default() -> Self {
        Self::new(DisciplineConfig::new(), Priomap::default())
    }
}

impl PrioQueueDisc {
    /// Name reported by [`QueueDisc::kind`].
    pub const KIND: &'static str = "PrioQueueDisc";

    /// Creates an unconfigured scheduler. Without classes in `config`, two default FIFO
    /// children are installed.
    pub fn new(config: DisciplineConfig, priomap: Priomap) -> Self {
        let mut bands = config.classes;
        if bands.is_empty() {
            bands = (0..MIN_BANDS)
                .map(|_| Box::new(FifoQueueDisc::default()) as Box<dyn QueueDisc>)
                .collect();
        }

        Self {
            priomap,
            max_size: config.max_size,
            bands,
            filters: config.filters,
            internal_queues: config.internal_queues,
            lifecycle: Lifecycle::default(),
            stats: QueueDiscStats::default(),
        }
    }

    #[inline]
    pub fn priomap(&self) -> &Priomap {
        &self.priomap
    }

    /// The band items with `priority` go to when no filter classifies them.
    #[inline]
    pub fn band_for_priority(&self, priority: u8) -> usize {
        self.priomap.band_for(priority)
    }

    /// Changes the priomap entry for `priority`. Only possible before activation.
    pub fn set_band_for_priority(&mut self, priority: u8, band: usize) -> Result<(), ConfigError> {
        self.lifecycle.ensure_unconfigured(Self::KIND)?;
        self.priomap.set_band(priority, band);
        Ok(())
    }

    #[inline]
    pub fn n_bands(&self) -> usize {
        self.bands.len()
    }

    /// The child discipline serving `band`.
    pub fn band(&self, band: usize) -> Option<&dyn QueueDisc> {
        self.bands.get(band).map(|child| child.as_ref())
    }

    /// The band `item` would be queued in.
    pub fn classify(&self, item: &QueueDiscItem) -> usize {
        match self.filters.iter().find_map(|filter| filter.classify(item)) {
            Some(band) if band < self.bands.len() => band,
            Some(band) => {
                trace!(band, "filter returned an invalid band, using priomap[0]");
                self.priomap.band_for(0)
            }
            None => self.priomap.band_for(item.priority()),
        }
    }

    fn reject(&mut self, item: QueueDiscItem, reason: DropReason) -> Dropped {
        self.stats.record_drop(&reason);
        Dropped::new(item, reason)
    }
}

impl QueueDisc for PrioQueueDisc {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn enqueue(&mut self, item: QueueDiscItem) -> Result<(), Dropped> {
        if let Err(reason) = self.lifecycle.ensure_operating() {
            return Err(self.reject(item, reason));
        }

        self.stats.record_received(item.size());

        if let Some(max_size) = self.max_size {
            if !max_size.admits(self.n_packets(), self.n_bytes(), item.size()) {
                trace!(%max_size, "capacity exceeded, dropping");
                return Err(self.reject(item, DropReason::CapacityExceeded));
            }
        }

        let band = self.classify(&item);
        match self.bands[band].enqueue(item) {
            Ok(()) => {
                trace!(band, packets = self.bands[band].n_packets(), "enqueued");
                self.stats.record_enqueued();
                Ok(())
            }
            Err(Dropped { item, reason }) => {
                trace!(band, %reason, "child dropped the item");
                Err(self.reject(item, DropReason::ChildDropped { band, reason: Box::new(reason) }))
            }
        }
    }

    fn dequeue(&mut self) -> Option<QueueDiscItem> {
        if !self.lifecycle.is_operating() {
            return None;
        }

        for (band, child) in self.bands.iter_mut().enumerate() {
            if let Some(item) = child.dequeue() {
                trace!(band, "popped");
                self.stats.record_dequeued(item.size());
                return Some(item);
            }
        }

        None
    }

    fn peek(&self) -> Option<&QueueDiscItem> {
        if !self.lifecycle.is_operating() {
            return None;
        }

        self.bands.iter().find_map(|child| child.peek())
    }

    fn n_packets(&self) -> usize {
        self.bands.iter().map(|child| child.n_packets()).sum()
    }

    fn n_bytes(&self) -> usize {
        self.bands.iter().map(|child| child.n_bytes()).sum()
    }

    fn max_size(&self) -> Option<QueueSize> {
        self.max_size
    }

    fn stats(&self) -> &QueueDiscStats {
        &self.stats
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }

    fn check_config(&mut self) -> Result<(), ConfigError> {
        let kind = Self::KIND;

        if !self.internal_queues.is_empty() {
            return Err(ConfigError::HasInternalQueues { kind });
        }

        if self.bands.len() < MIN_BANDS {
            return Err(ConfigError::TooFewBands { kind, min: MIN_BANDS, got: self.bands.len() });
        }

        let bands = self.bands.len();
        for (priority, &band) in self.priomap.as_array().iter().enumerate() {
            if band >= bands {
                return Err(ConfigError::PriomapOutOfRange { priority, band, bands });
            }
        }

        for (band, child) in self.bands.iter_mut().enumerate() {
            if !child.lifecycle().is_operating() {
                child
                    .activate()
                    .map_err(|source| ConfigError::Child { band, source: Box::new(source) })?;
            }

            if let (Some(required), Some(capacity)) = (self.max_size, child.max_size()) {
                match capacity.covers(&required) {
                    Some(true) => {}
                    None => {
                        return Err(ConfigError::UnitMismatch {
                            kind,
                            expected: required.unit(),
                            got: capacity.unit(),
                        })
                    }
                    Some(false) => {
                        return Err(ConfigError::UndersizedQueue { kind, index: band, capacity, required })
                    }
                }
            }
        }

        debug!(bands, priomap = %self.priomap, filters = self.filters.len(), "bands configured");
        Ok(())
    }

    fn dispose(&mut self) {
        for child in &mut self.bands {
            child.dispose();
        }
        self.lifecycle.dispose(Self::KIND);
    }
}

#[cfg(test)]
mod tests {
    use hqos_wire::{DatagramBuilder, Dscp};

    use super::*;
    use crate::{DiscState, DscpFilter};

    fn scenario_b() -> PrioQueueDisc {
        let priomap = Priomap::uniform(1).with_band(0, 0).with_band(7, 1);
        let mut prio = PrioQueueDisc::new(DisciplineConfig::new(), priomap);
        prio.activate().unwrap();
        prio
    }

    #[test]
    fn installs_two_fifos_by_default() {
        let mut prio = PrioQueueDisc::default();
        assert_eq!(prio.n_bands(), 2);

        prio.activate().unwrap();
        assert_eq!(prio.band(0).unwrap().kind(), FifoQueueDisc::KIND);
        assert_eq!(prio.band(1).unwrap().state(), DiscState::Operating);
    }

    #[test]
    fn strict_priority_across_bands() {
        let _ = tracing_subscriber::fmt::try_init();
        let mut prio = scenario_b();

        let x = DatagramBuilder::udp(1).with_priority(7).build_item();
        let y = DatagramBuilder::udp(2).with_priority(0).build_item();
        prio.enqueue(x.clone()).unwrap();
        prio.enqueue(y.clone()).unwrap();

        assert_eq!(prio.band(0).unwrap().n_packets(), 1);
        assert_eq!(prio.band(1).unwrap().n_packets(), 1);

        assert_eq!(prio.peek(), Some(&y));
        assert_eq!(prio.dequeue(), Some(y));
        assert_eq!(prio.dequeue(), Some(x));
        assert_eq!(prio.dequeue(), None);
    }

    #[test]
    fn high_band_starves_low_band() {
        let mut prio = scenario_b();

        prio.enqueue(DatagramBuilder::udp(1).with_priority(7).build_item()).unwrap();
        for _ in 0..10 {
            prio.enqueue(DatagramBuilder::udp(2).build_item()).unwrap();
            let item = prio.dequeue().unwrap();
            assert_eq!(item.priority(), 0);
        }
        assert_eq!(prio.n_packets(), 1);
    }

    #[test]
    fn filter_overrides_priomap() {
        let filter = DscpFilter::new().with_rule(Dscp::EF, 0).with_rule(Dscp::CS1, 9);
        let config = DisciplineConfig::new().with_filter(filter);
        let mut prio = PrioQueueDisc::new(config, Priomap::uniform(1));
        prio.activate().unwrap();

        let ef = DatagramBuilder::udp(1).with_dscp(Dscp::EF).build_item();
        let cs1 = DatagramBuilder::udp(1).with_dscp(Dscp::CS1).with_priority(0).build_item();
        let be = DatagramBuilder::udp(1).build_item();

        assert_eq!(prio.classify(&ef), 0);
        // Out-of-range filter result falls back to priomap[0].
        assert_eq!(prio.classify(&cs1), 1);
        assert_eq!(prio.classify(&be), 1);
    }

    #[test]
    fn child_drop_is_reported() {
        let config = DisciplineConfig::new()
            .with_class(FifoQueueDisc::with_max_size(QueueSize::packets(1)))
            .with_class(FifoQueueDisc::with_max_size(QueueSize::packets(1)));
        let mut prio = PrioQueueDisc::new(config, Priomap::uniform(0));
        prio.activate().unwrap();

        prio.enqueue(DatagramBuilder::udp(1).build_item()).unwrap();
        let dropped = prio.enqueue(DatagramBuilder::udp(2).build_item()).unwrap_err();

        assert_eq!(
            dropped.reason,
            DropReason::ChildDropped { band: 0, reason: Box::new(DropReason::CapacityExceeded) }
        );
        assert_eq!(dropped.reason.root_cause(), &DropReason::CapacityExceeded);
        assert_eq!(prio.stats().drops().capacity_exceeded, 1);
        assert_eq!(prio.n_packets(), 1);
    }

    #[test]
    fn aggregate_capacity() {
        let config = DisciplineConfig::new()
            .with_max_size(QueueSize::packets(2))
            .with_class(FifoQueueDisc::with_max_size(QueueSize::packets(2)))
            .with_class(FifoQueueDisc::with_max_size(QueueSize::packets(2)));
        let mut prio = PrioQueueDisc::new(config, Priomap::uniform(1).with_band(0, 0));
        prio.activate().unwrap();

        prio.enqueue(DatagramBuilder::udp(1).build_item()).unwrap();
        prio.enqueue(DatagramBuilder::udp(1).with_priority(3).build_item()).unwrap();
        let dropped = prio.enqueue(DatagramBuilder::udp(1).build_item()).unwrap_err();
        assert_eq!(dropped.reason, DropReason::CapacityExceeded);
    }

    #[test]
    fn validation() {
        let mut prio = PrioQueueDisc::new(
            DisciplineConfig::new().with_class(FifoQueueDisc::default()),
            Priomap::uniform(0),
        );
        assert_eq!(
            prio.activate(),
            Err(ConfigError::TooFewBands { kind: PrioQueueDisc::KIND, min: 2, got: 1 })
        );

        let mut prio = PrioQueueDisc::new(DisciplineConfig::new(), Priomap::default().with_band(3, 2));
        assert_eq!(
            prio.activate(),
            Err(ConfigError::PriomapOutOfRange { priority: 3, band: 2, bands: 2 })
        );

        let mut prio = PrioQueueDisc::new(
            DisciplineConfig::new().with_internal_queue(DropTailQueue::new(QueueSize::packets(1))),
            Priomap::default(),
        );
        assert_eq!(prio.activate(), Err(ConfigError::HasInternalQueues { kind: PrioQueueDisc::KIND }));

        let bad_child = FifoQueueDisc::new(
            DisciplineConfig::new()
                .with_max_size(QueueSize::packets(10))
                .with_internal_queue(DropTailQueue::new(QueueSize::packets(1))),
        );
        let mut prio = PrioQueueDisc::new(
            DisciplineConfig::new().with_class(FifoQueueDisc::default()).with_class(bad_child),
            Priomap::default(),
        );
        assert!(matches!(prio.activate(), Err(ConfigError::Child { band: 1, .. })));
        assert_eq!(prio.state(), DiscState::Unconfigured);

        let mut prio = PrioQueueDisc::new(
            DisciplineConfig::new()
                .with_max_size(QueueSize::packets(100))
                .with_class(FifoQueueDisc::with_max_size(QueueSize::packets(100)))
                .with_class(FifoQueueDisc::with_max_size(QueueSize::packets(50))),
            Priomap::default(),
        );
        assert!(matches!(prio.activate(), Err(ConfigError::UndersizedQueue { index: 1, .. })));
    }

    #[test]
    fn priomap_is_frozen_after_activation() {
        let mut prio = PrioQueueDisc::default();
        prio.set_band_for_priority(3, 0).unwrap();
        assert_eq!(prio.band_for_priority(19), 0);

        prio.activate().unwrap();
        assert!(prio.set_band_for_priority(3, 1).is_err());
    }

    #[test]
    fn dispose_flushes_children() {
        let mut prio = scenario_b();
        prio.enqueue(DatagramBuilder::udp(1).build_item()).unwrap();
        prio.dispose();

        assert_eq!(prio.n_packets(), 0);
        assert_eq!(prio.band(0).unwrap().state(), DiscState::Disposed);
        let dropped = prio.enqueue(DatagramBuilder::udp(1).build_item()).unwrap_err();
        assert_eq!(dropped.reason, DropReason::NotOperating(DiscState::Disposed));
    }
}
