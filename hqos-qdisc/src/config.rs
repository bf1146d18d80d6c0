use crate::{DropTailQueue, PacketFilter, QueueDisc, QueueSize};

/// The parts every discipline is built from: a capacity, and optionally pre-built internal
/// queues, child classes and packet filters.
///
/// Which parts are allowed depends on the discipline; that is checked on activation. The
/// marker, for instance, accepts internal queues but rejects children and filters, while the
/// priority scheduler wants children and rejects internal queues.
#[derive(Debug, Default)]
pub struct DisciplineConfig {
    pub(crate) max_size: Option<QueueSize>,
    pub(crate) internal_queues: Vec<DropTailQueue>,
    pub(crate) classes: Vec<Box<dyn QueueDisc>>,
    pub(crate) filters: Vec<Box<dyn PacketFilter>>,
}

impl DisciplineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the overall capacity. Disciplines fall back to their own default when unset.
    pub fn with_max_size(mut self, max_size: QueueSize) -> Self {
        self.max_size = Some(max_size);
        self
    }

    /// Adds an internal queue. Queues are numbered in insertion order.
    pub fn with_internal_queue(mut self, queue: DropTailQueue) -> Self {
        self.internal_queues.push(queue);
        self
    }

    /// Adds a child discipline. Children are numbered (banded) in insertion order.
    pub fn with_class(self, class: impl QueueDisc + 'static) -> Self {
        self.with_boxed_class(Box::new(class))
    }

    pub fn with_boxed_class(mut self, class: Box<dyn QueueDisc>) -> Self {
        self.classes.push(class);
        self
    }

    /// Adds a packet filter. Filters are consulted in insertion order.
    pub fn with_filter(mut self, filter: impl PacketFilter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    #[inline]
    pub fn max_size(&self) -> Option<QueueSize> {
        self.max_size
    }
}
