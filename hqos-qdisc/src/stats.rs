use hqos_wire::Dscp;

use crate::DropReason;

/// Drop counters, one per [`DropReason`] kind. Child drops are attributed to the child's
/// own reason.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DropCounters {
    pub capacity_exceeded: u64,
    pub internal_queue_full: u64,
    pub malformed: u64,
    pub not_operating: u64,
}

impl DropCounters {
    pub fn total(&self) -> u64 {
        self.capacity_exceeded + self.internal_queue_full + self.malformed + self.not_operating
    }
}

/// Statistics for a queue discipline. Owned by the discipline; no synchronisation needed.
#[derive(Debug, Clone)]
pub struct QueueDiscStats {
    received_packets: u64,
    received_bytes: u64,
    enqueued_packets: u64,
    dequeued_packets: u64,
    dequeued_bytes: u64,
    drops: DropCounters,
    /// Items stamped with each DSCP value, indexed by code point.
    marks: [u64; Dscp::MAX as usize + 1],
}

impl Default for QueueDiscStats {
    fn default() -> Self {
        Self {
            received_packets: 0,
            received_bytes: 0,
            enqueued_packets: 0,
            dequeued_packets: 0,
            dequeued_bytes: 0,
            drops: DropCounters::default(),
            marks: [0; Dscp::MAX as usize + 1],
        }
    }
}

impl QueueDiscStats {
    #[inline]
    pub(crate) fn record_received(&mut self, bytes: usize) {
        self.received_packets += 1;
        self.received_bytes += bytes as u64;
    }

    #[inline]
    pub(crate) fn record_enqueued(&mut self) {
        self.enqueued_packets += 1;
    }

    #[inline]
    pub(crate) fn record_dequeued(&mut self, bytes: usize) {
        self.dequeued_packets += 1;
        self.dequeued_bytes += bytes as u64;
    }

    pub(crate) fn record_drop(&mut self, reason: &DropReason) {
        match reason {
            DropReason::CapacityExceeded => self.drops.capacity_exceeded += 1,
            DropReason::InternalQueueFull { .. } => self.drops.internal_queue_full += 1,
            DropReason::MalformedItem(_) => self.drops.malformed += 1,
            DropReason::NotOperating(_) => self.drops.not_operating += 1,
            DropReason::ChildDropped { reason, .. } => self.record_drop(reason),
        }
    }

    #[inline]
    pub(crate) fn record_mark(&mut self, dscp: Dscp) {
        self.marks[dscp.value() as usize] += 1;
    }

    #[inline]
    pub fn received_packets(&self) -> u64 {
        self.received_packets
    }

    #[inline]
    pub fn received_bytes(&self) -> u64 {
        self.received_bytes
    }

    #[inline]
    pub fn enqueued_packets(&self) -> u64 {
        self.enqueued_packets
    }

    #[inline]
    pub fn dequeued_packets(&self) -> u64 {
        self.dequeued_packets
    }

    #[inline]
    pub fn dequeued_bytes(&self) -> u64 {
        self.dequeued_bytes
    }

    #[inline]
    pub fn drops(&self) -> DropCounters {
        self.drops
    }

    #[inline]
    pub fn dropped_packets(&self) -> u64 {
        self.drops.total()
    }

    /// Number of items the discipline stamped with `dscp`.
    #[inline]
    pub fn marked(&self, dscp: Dscp) -> u64 {
        self.marks[dscp.value() as usize]
    }
}
