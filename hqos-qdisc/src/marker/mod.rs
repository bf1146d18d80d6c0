//! The marking stage.
//!
//! [`MarkerQueueDisc`] looks up the UDP destination port of every datagram in its
//! [`MarkingRules`], rewrites the DSCP field accordingly and queues the datagram in one of
//! four drop-tail bands. Dequeue serves the bands in ascending order, FIFO within a band.

use hqos_wire::{Dscp, QueueDiscItem};
use tracing::{debug, trace, warn};

use crate::{
    ConfigError, DisciplineConfig, DropReason, DropTailQueue, Dropped, Lifecycle, PacketFilter,
    QueueDisc, QueueDiscStats, QueueSize, QueueSizeUnit,
};

mod rules;
pub use rules::*;

/// Number of internal queues the marker operates with.
pub const MARKER_BANDS: usize = 4;

/// Capacity used when the configuration doesn't set one.
pub const DEFAULT_MARKER_SIZE: QueueSize = QueueSize::packets(10_024);

/// Class given to datagrams no rule matches, including non-UDP traffic.
pub const DEFAULT_CLASS: Dscp = Dscp::CS4;

/// Band every marked datagram is queued in.
const MARKED_BAND: usize = 0;

/// Stamps a DSCP value on every datagram by destination port and queues it for the
/// scheduler.
#[derive(Debug)]
pub struct MarkerQueueDisc {
    rules: MarkingRules,
    max_size: QueueSize,
    bands: Vec<DropTailQueue>,
    classes: Vec<Box<dyn QueueDisc>>,
    filters: Vec<Box<dyn PacketFilter>>,
    lifecycle: Lifecycle,
    stats: QueueDiscStats,
}

impl Default for MarkerQueueDisc {
    fn default() -> Self {
        Self::new(DisciplineConfig::new(), MarkingRules::default())
    }
}

impl MarkerQueueDisc {
    /// Name reported by [`QueueDisc::kind`].
    pub const KIND: &'static str = "MarkerQueueDisc";

    /// Creates an unconfigured marker. Call [`QueueDisc::activate`] before use.
    pub fn new(config: DisciplineConfig, rules: MarkingRules) -> Self {
        Self {
            rules,
            max_size: config.max_size.unwrap_or(DEFAULT_MARKER_SIZE),
            bands: config.internal_queues,
            classes: config.classes,
            filters: config.filters,
            lifecycle: Lifecycle::default(),
            stats: QueueDiscStats::default(),
        }
    }

    #[inline]
    pub fn rules(&self) -> &MarkingRules {
        &self.rules
    }

    /// The internal queue of `band`, if it exists.
    pub fn band(&self, band: usize) -> Option<&DropTailQueue> {
        self.bands.get(band)
    }

    /// The DSCP value for a datagram with the given destination port.
    pub fn classify(&self, destination_port: Option<u16>) -> Dscp {
        destination_port
            .and_then(|port| self.rules.lookup(port))
            .map_or(DEFAULT_CLASS, |rule| rule.dscp())
    }

    fn reject(&mut self, item: QueueDiscItem, reason: DropReason) -> Dropped {
        self.stats.record_drop(&reason);
        Dropped::new(item, reason)
    }
}

impl QueueDisc for MarkerQueueDisc {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn enqueue(&mut self, mut item: QueueDiscItem) -> Result<(), Dropped> {
        if let Err(reason) = self.lifecycle.ensure_operating() {
            return Err(self.reject(item, reason));
        }

        self.stats.record_received(item.size());

        if !self.max_size.admits(self.n_packets(), self.n_bytes(), item.size()) {
            trace!(max_size = %self.max_size, "capacity exceeded, dropping");
            return Err(self.reject(item, DropReason::CapacityExceeded));
        }

        let headers = match item.headers() {
            Ok(headers) => headers,
            Err(e) => {
                warn!(error = %e, size = item.size(), "dropping malformed item");
                return Err(self.reject(item, e.into()));
            }
        };

        let dscp = self.classify(headers.destination_port());
        if let Err(e) = item.set_dscp(dscp) {
            warn!(error = %e, "failed to rewrite DSCP");
            return Err(self.reject(item, e.into()));
        }
        self.stats.record_mark(dscp);

        // Marked traffic is never spread over the other bands: they stay empty unless
        // filled by whoever built them, and dequeue drains them after band 0.
        let band = MARKED_BAND;
        trace!(port = ?headers.destination_port(), %dscp, band, "marked");

        match self.bands[band].enqueue(item) {
            Ok(()) => {
                self.stats.record_enqueued();
                Ok(())
            }
            Err(item) => {
                warn!(band, "Packet enqueue failed. Check the size of the internal queues");
                Err(self.reject(item, DropReason::InternalQueueFull { band }))
            }
        }
    }

    fn dequeue(&mut self) -> Option<QueueDiscItem> {
        if !self.lifecycle.is_operating() {
            return None;
        }

        for (band, queue) in self.bands.iter_mut().enumerate() {
            if let Some(item) = queue.dequeue() {
                trace!(band, remaining = queue.n_packets(), "popped");
                self.stats.record_dequeued(item.size());
                return Some(item);
            }
        }

        trace!("queue empty");
        None
    }

    fn peek(&self) -> Option<&QueueDiscItem> {
        if !self.lifecycle.is_operating() {
            return None;
        }

        self.bands.iter().find_map(DropTailQueue::peek)
    }

    fn n_packets(&self) -> usize {
        self.bands.iter().map(DropTailQueue::n_packets).sum()
    }

    fn n_bytes(&self) -> usize {
        self.bands.iter().map(DropTailQueue::n_bytes).sum()
    }

    fn max_size(&self) -> Option<QueueSize> {
        Some(self.max_size)
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

        if !self.classes.is_empty() {
            return Err(ConfigError::HasClasses { kind });
        }

        if !self.filters.is_empty() {
            return Err(ConfigError::HasPacketFilters { kind });
        }

        if self.max_size.unit() != QueueSizeUnit::Packets {
            return Err(ConfigError::UnitMismatch {
                kind,
                expected: QueueSizeUnit::Packets,
                got: self.max_size.unit(),
            });
        }

        if self.bands.is_empty() {
            self.bands = (0..MARKER_BANDS).map(|_| DropTailQueue::new(self.max_size)).collect();
            debug!(bands = MARKER_BANDS, max_size = %self.max_size, "created drop-tail internal queues");
        }

        if self.bands.len() != MARKER_BANDS {
            return Err(ConfigError::InternalQueueCount {
                kind,
                expected: MARKER_BANDS,
                got: self.bands.len(),
            });
        }

        for (index, queue) in self.bands.iter().enumerate() {
            let capacity = queue.max_size();
            match capacity.covers(&self.max_size) {
                None => {
                    return Err(ConfigError::UnitMismatch {
                        kind,
                        expected: QueueSizeUnit::Packets,
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
                Some(true) => {}
            }
        }

        let (packets, bytes) = (self.n_packets(), self.n_bytes());
        if !self.max_size.holds(packets, bytes) {
            return Err(ConfigError::Overfilled { kind, packets, bytes, max_size: self.max_size });
        }

        Ok(())
    }

    fn dispose(&mut self) {
        let dropped: usize = self.bands.iter_mut().map(DropTailQueue::clear).sum();
        debug!(dropped, "flushed internal queues");
        self.lifecycle.dispose(Self::KIND);
    }
}
