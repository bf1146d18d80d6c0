#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! Queue disciplines for a QoS-enabled forwarding node.
//!
//! Traffic crosses two stages:
//!
//! ```text
//!   producer ──► MarkerQueueDisc ──► PrioQueueDisc ──► link
//!                 (DSCP by port)      │
//!                                     ├── band 0: child (e.g. FIFO)
//!                                     ├── band 1: child (e.g. WRR / WDRR)
//!                                     └── ...
//! ```
//!
//! The marker stamps a DSCP value on every UDP datagram according to its destination port.
//! The priority scheduler sorts items into bands and always serves the lowest-numbered
//! non-empty band first; what happens inside a band is up to the child discipline.
//!
//! Every discipline implements [`QueueDisc`], so children are interchangeable. All calls
//! are synchronous and run to completion; an instance driven from several threads must be
//! serialized by the caller.

use std::fmt;

use hqos_wire::QueueDiscItem;

mod config;
pub use config::DisciplineConfig;

mod error;
pub use error::*;

mod fifo;
pub use fifo::*;

mod filter;
pub use filter::*;

mod lifecycle;
pub use lifecycle::{DiscState, Lifecycle};

pub mod marker;
pub use marker::{MarkerQueueDisc, MarkingRule, MarkingRules};

pub mod prio;
pub use prio::{Priomap, PrioQueueDisc};

mod queue;
pub use queue::DropTailQueue;

mod size;
pub use size::*;

mod stats;
pub use stats::{DropCounters, QueueDiscStats};

pub mod weighted;
pub use weighted::{DscpMap, Quanta, WdrrQueueDisc, WrrQueueDisc};

/// The contract every queue discipline fulfils, and the only view a classful parent has of
/// its children.
///
/// A discipline starts out [`DiscState::Unconfigured`]. [`activate`](QueueDisc::activate)
/// validates the configuration and, on success, moves it to [`DiscState::Operating`]; only
/// then are items accepted. A rejected configuration is final.
pub trait QueueDisc: fmt::Debug + Send {
    /// Short name used in logs and errors.
    fn kind(&self) -> &'static str;

    /// Offers an item to the discipline. On rejection the item is handed back inside
    /// [`Dropped`], together with the reason.
    fn enqueue(&mut self, item: QueueDiscItem) -> Result<(), Dropped>;

    /// Removes and returns the next item to transmit, if any.
    fn dequeue(&mut self) -> Option<QueueDiscItem>;

    /// Returns the item the next [`dequeue`](QueueDisc::dequeue) would yield, without
    /// removing it or touching any scheduling state.
    fn peek(&self) -> Option<&QueueDiscItem>;

    /// Number of items currently held.
    fn n_packets(&self) -> usize;

    /// Number of bytes currently held.
    fn n_bytes(&self) -> usize;

    /// The configured capacity, if the discipline enforces one itself.
    fn max_size(&self) -> Option<QueueSize>;

    fn stats(&self) -> &QueueDiscStats;

    fn lifecycle(&self) -> &Lifecycle;

    fn lifecycle_mut(&mut self) -> &mut Lifecycle;

    /// Validates the configuration, creating default internal queues or children where the
    /// discipline allows it. Called once, by [`activate`](QueueDisc::activate).
    fn check_config(&mut self) -> Result<(), ConfigError>;

    /// Resets scheduling state before the first item flows.
    fn initialize_params(&mut self) {}

    /// Drops everything held and retires the discipline.
    fn dispose(&mut self);

    fn state(&self) -> DiscState {
        self.lifecycle().state()
    }

    fn is_empty(&self) -> bool {
        self.n_packets() == 0
    }

    /// Validates the configuration and starts the discipline.
    fn activate(&mut self) -> Result<(), ConfigError> {
        let kind = self.kind();
        self.lifecycle().ensure_unconfigured(kind)?;

        let checked = self.check_config();
        self.lifecycle_mut().configured(kind, checked)?;

        self.initialize_params();
        self.lifecycle_mut().operate(kind);

        Ok(())
    }
}
