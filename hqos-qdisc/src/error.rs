use hqos_wire::{Dscp, InspectError, QueueDiscItem};
use thiserror::Error;

use crate::{DiscState, QueueSize, QueueSizeUnit};

/// Why an item was not admitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DropReason {
    #[error("capacity exceeded")]
    CapacityExceeded,
    #[error("internal queue {band} is full")]
    InternalQueueFull { band: usize },
    #[error("malformed item: {0}")]
    MalformedItem(#[from] InspectError),
    #[error("child in band {band} dropped the item: {reason}")]
    ChildDropped { band: usize, reason: Box<DropReason> },
    #[error("queue disc is not operating (state: {0:?})")]
    NotOperating(DiscState),
}

impl DropReason {
    /// Follows [`DropReason::ChildDropped`] down to the discipline that made the decision.
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::ChildDropped { reason, .. } => reason.root_cause(),
            other => other,
        }
    }
}

/// A rejected item, handed back to the producing layer.
#[derive(Debug, Error)]
#[error("dropped {} byte item: {reason}", .item.size())]
pub struct Dropped {
    pub item: QueueDiscItem,
    pub reason: DropReason,
}

impl Dropped {
    pub fn new(item: QueueDiscItem, reason: DropReason) -> Self {
        Self { item, reason }
    }

    pub fn into_item(self) -> QueueDiscItem {
        self.item
    }
}

/// An invalid discipline configuration. Raised once, by `activate`, and never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{kind} cannot have classes")]
    HasClasses { kind: &'static str },
    #[error("{kind} needs no packet filter")]
    HasPacketFilters { kind: &'static str },
    #[error("{kind} cannot have internal queues")]
    HasInternalQueues { kind: &'static str },
    #[error("{kind} needs {expected} internal queues, got {got}")]
    InternalQueueCount { kind: &'static str, expected: usize, got: usize },
    #[error("{kind} needs sizes in {expected:?} mode, got {got:?}")]
    UnitMismatch { kind: &'static str, expected: QueueSizeUnit, got: QueueSizeUnit },
    #[error("{kind}: internal queue {index} holds {capacity}, less than the queue disc capacity {required}")]
    UndersizedQueue { kind: &'static str, index: usize, capacity: QueueSize, required: QueueSize },
    #[error("{kind}: internal queues already hold {packets} packets ({bytes} bytes), more than {max_size}")]
    Overfilled { kind: &'static str, packets: usize, bytes: usize, max_size: QueueSize },
    #[error("{kind} needs at least {min} bands, got {got}")]
    TooFewBands { kind: &'static str, min: usize, got: usize },
    #[error("priority {priority} maps to band {band}, but only {bands} bands exist")]
    PriomapOutOfRange { priority: usize, band: usize, bands: usize },
    #[error("child in band {band}: {source}")]
    Child {
        band: usize,
        #[source]
        source: Box<ConfigError>,
    },
    #[error("{kind} needs at least one quantum")]
    EmptyQuanta { kind: &'static str },
    #[error("{kind}: quantum of sub-band {index} is zero")]
    ZeroQuantum { kind: &'static str, index: usize },
    #[error("{kind}: DSCP {dscp} maps to sub-band {subband}, but only {subbands} sub-bands exist")]
    SubbandOutOfRange { kind: &'static str, dscp: Dscp, subband: usize, subbands: usize },
    #[error("{kind} is already {state:?}")]
    AlreadyActivated { kind: &'static str, state: DiscState },
    #[error("{kind} was rejected by an earlier validation")]
    Rejected { kind: &'static str },
}
