use hqos_wire::QueueDiscItem;
use tracing::{debug, trace};

use crate::{
    ConfigError, DisciplineConfig, DropReason, DropTailQueue, Dropped, Lifecycle, PacketFilter,
    QueueDisc, QueueDiscStats, QueueSize,
};

/// Capacity of a FIFO when the configuration doesn't set one.
pub const DEFAULT_FIFO_SIZE: QueueSize = QueueSize::packets(1_000);

/// A single drop-tail queue. The default child of every priority band.
#[derive(Debug)]
pub struct FifoQueueDisc {
    max_size: QueueSize,
    queue: Option<DropTailQueue>,
    extra_queues: usize,
    classes: Vec<Box<dyn QueueDisc>>,
    filters: Vec<Box<dyn PacketFilter>>,
    lifecycle: Lifecycle,
    stats: QueueDiscStats,
}

impl Default for FifoQueueDisc {
    fn default() -> Self {
        Self::new(DisciplineConfig::new())
    }
}

impl FifoQueueDisc {
    /// Name reported by [`QueueDisc::kind`].
    pub const KIND: &'static str = "FifoQueueDisc";

    pub fn new(config: DisciplineConfig) -> Self {
        let mut queues = config.internal_queues.into_iter();
        let queue = queues.next();

        Self {
            max_size: config.max_size.unwrap_or(DEFAULT_FIFO_SIZE),
            queue,
            extra_queues: queues.count(),
            classes: config.classes,
            filters: config.filters,
            lifecycle: Lifecycle::default(),
            stats: QueueDiscStats::default(),
        }
    }

    /// Shorthand for a FIFO holding at most `max_size`.
    pub fn with_max_size(max_size: QueueSize) -> Self {
        Self::new(DisciplineConfig::new().with_max_size(max_size))
    }

    fn reject(&mut self, item: QueueDiscItem, reason: DropReason) -> Dropped {
        self.stats.record_drop(&reason);
        Dropped::new(item, reason)
    }
}

impl QueueDisc for FifoQueueDisc {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn enqueue(&mut self, item: QueueDiscItem) -> Result<(), Dropped> {
        if let Err(reason) = self.lifecycle.ensure_operating() {
            return Err(self.reject(item, reason));
        }

        self.stats.record_received(item.size());

        if !self.max_size.admits(self.n_packets(), self.n_bytes(), item.size()) {
            trace!(max_size = %self.max_size, "capacity exceeded, dropping");
            return Err(self.reject(item, DropReason::CapacityExceeded));
        }

        let Some(queue) = self.queue.as_mut() else {
            return Err(self.reject(item, DropReason::InternalQueueFull { band: 0 }));
        };

        match queue.enqueue(item) {
            Ok(()) => {
                trace!(packets = queue.n_packets(), bytes = queue.n_bytes(), "enqueued");
                self.stats.record_enqueued();
                Ok(())
            }
            Err(item) => Err(self.reject(item, DropReason::InternalQueueFull { band: 0 })),
        }
    }

    fn dequeue(&mut self) -> Option<QueueDiscItem> {
        if !self.lifecycle.is_operating() {
            return None;
        }

        let item = self.queue.as_mut()?.dequeue()?;
        self.stats.record_dequeued(item.size());
        Some(item)
    }

    fn peek(&self) -> Option<&QueueDiscItem> {
        if !self.lifecycle.is_operating() {
            return None;
        }

        self.queue.as_ref()?.peek()
    }

    fn n_packets(&self) -> usize {
        self.queue.as_ref().map_or(0, DropTailQueue::n_packets)
    }

    fn n_bytes(&self) -> usize {
        self.queue.as_ref().map_or(0, DropTailQueue::n_bytes)
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

        if self.extra_queues > 0 {
            return Err(ConfigError::InternalQueueCount {
                kind,
                expected: 1,
                got: 1 + self.extra_queues,
            });
        }

        let max_size = self.max_size;
        let queue = self.queue.get_or_insert_with(|| {
            debug!(%max_size, "created drop-tail internal queue");
            DropTailQueue::new(max_size)
        });

        let capacity = queue.max_size();
        match capacity.covers(&max_size) {
            None => {
                return Err(ConfigError::UnitMismatch { kind, expected: max_size.unit(), got: capacity.unit() })
            }
            Some(false) => {
                return Err(ConfigError::UndersizedQueue { kind, index: 0, capacity, required: max_size })
            }
            Some(true) => {}
        }

        let (packets, bytes) = (queue.n_packets(), queue.n_bytes());
        if !max_size.holds(packets, bytes) {
            return Err(ConfigError::Overfilled { kind, packets, bytes, max_size });
        }

        Ok(())
    }

    fn dispose(&mut self) {
        if let Some(queue) = self.queue.as_mut() {
            queue.clear();
        }
        self.lifecycle.dispose(Self::KIND);
    }
}
