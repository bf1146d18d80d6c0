use hqos_qdisc::{ConfigError, Dropped, MarkerQueueDisc, PrioQueueDisc, QueueDisc};
use hqos_wire::QueueDiscItem;
use tracing::{debug, trace};

/// Outcome of [`Node::forward`].
#[derive(Debug, Default)]
pub struct Forwarded {
    /// Items the scheduler accepted.
    pub accepted: usize,
    /// Items the scheduler rejected, handed back for the caller to account for.
    pub dropped: Vec<Dropped>,
}

/// A QoS-enabled forwarding node: traffic is marked on ingress and scheduled on egress.
///
/// ```text
///   receive ──► marker ──forward──► scheduler ──► transmit
/// ```
#[derive(Debug)]
pub struct Node<S = PrioQueueDisc> {
    marker: MarkerQueueDisc,
    scheduler: S,
}

impl<S: QueueDisc> Node<S> {
    /// Activates both stages (unless already operating) and wires them together.
    pub fn new(mut marker: MarkerQueueDisc, mut scheduler: S) -> Result<Self, ConfigError> {
        if !marker.lifecycle().is_operating() {
            marker.activate()?;
        }
        if !scheduler.lifecycle().is_operating() {
            scheduler.activate()?;
        }

        debug!(marker = marker.kind(), scheduler = scheduler.kind(), "node ready");
        Ok(Self { marker, scheduler })
    }

    /// Hands an item from the producing layer to the marking stage.
    pub fn receive(&mut self, item: QueueDiscItem) -> Result<(), Dropped> {
        self.marker.enqueue(item)
    }

    /// Moves everything the marker holds into the scheduler, in marker dequeue order.
    pub fn forward(&mut self) -> Forwarded {
        let mut forwarded = Forwarded::default();

        while let Some(item) = self.marker.dequeue() {
            match self.scheduler.enqueue(item) {
                Ok(()) => forwarded.accepted += 1,
                Err(dropped) => {
                    trace!(reason = %dropped.reason, "scheduler dropped forwarded item");
                    forwarded.dropped.push(dropped);
                }
            }
        }

        forwarded
    }

    /// The next item for the link, if the scheduler holds one.
    pub fn transmit(&mut self) -> Option<QueueDiscItem> {
        self.scheduler.dequeue()
    }

    /// Forwards pending items, then drains the scheduler.
    pub fn flush(&mut self) -> (Forwarded, Vec<QueueDiscItem>) {
        let forwarded = self.forward();
        let transmitted = std::iter::from_fn(|| self.transmit()).collect();
        (forwarded, transmitted)
    }

    pub fn marker(&self) -> &MarkerQueueDisc {
        &self.marker
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Drops everything held by both stages.
    pub fn dispose(&mut self) {
        self.marker.dispose();
        self.scheduler.dispose();
    }
}

#[cfg(test)]
mod tests {
    use hqos_qdisc::{
        DisciplineConfig, DropReason, DscpFilter, FifoQueueDisc, MarkingRules, Priomap, QueueSize,
    };
    use std::sync::{Arc, Mutex};

    use hqos_wire::{DatagramBuilder, Dscp};

    use super::*;

    #[test]
    fn marks_then_schedules() {
        let marker = MarkerQueueDisc::new(DisciplineConfig::new(), MarkingRules::default());
        let config = DisciplineConfig::new().with_filter(DscpFilter::new().with_rule(Dscp::EF, 0));
        let scheduler = PrioQueueDisc::new(config, Priomap::uniform(1));
        let mut node = Node::new(marker, scheduler).unwrap();

        node.receive(DatagramBuilder::udp(5000).build_item()).unwrap();
        node.receive(DatagramBuilder::udp(8080).build_item()).unwrap();

        let forwarded = node.forward();
        assert_eq!(forwarded.accepted, 2);
        assert!(forwarded.dropped.is_empty());
        assert_eq!(node.marker().n_packets(), 0);

        assert_eq!(node.transmit().unwrap().dscp().unwrap(), Dscp::EF);
        assert_eq!(node.transmit().unwrap().dscp().unwrap(), Dscp::CS4);
        assert!(node.transmit().is_none());
    }

    #[test]
    fn scheduler_drops_are_reported() {
        let marker = MarkerQueueDisc::new(DisciplineConfig::new(), MarkingRules::empty());
        let config = DisciplineConfig::new()
            .with_class(FifoQueueDisc::with_max_size(QueueSize::packets(1)))
            .with_class(FifoQueueDisc::with_max_size(QueueSize::packets(1)));
        let mut node = Node::new(marker, PrioQueueDisc::new(config, Priomap::uniform(0))).unwrap();

        for port in [1, 2, 3] {
            node.receive(DatagramBuilder::udp(port).build_item()).unwrap();
        }

        let (forwarded, transmitted) = node.flush();
        assert_eq!(forwarded.accepted, 1);
        assert_eq!(forwarded.dropped.len(), 2);
        assert_eq!(forwarded.dropped[0].reason.root_cause(), &DropReason::CapacityExceeded);
        assert_eq!(transmitted.len(), 1);
    }

    #[test]
    fn node_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Node>();
        assert_send::<PrioQueueDisc>();
        assert_send::<DisciplineConfig>();

        let marker = MarkerQueueDisc::new(DisciplineConfig::new(), MarkingRules::default());
        let node = Arc::new(Mutex::new(Node::new(marker, PrioQueueDisc::default()).unwrap()));

        let producer = Arc::clone(&node);
        std::thread::spawn(move || {
            let mut node = producer.lock().unwrap();
            node.receive(DatagramBuilder::udp(8080).build_item()).unwrap();
            node.forward();
        })
        .join()
        .unwrap();

        assert_eq!(node.lock().unwrap().transmit().unwrap().dscp().unwrap(), Dscp::EF);
    }

    #[test]
    fn invalid_stage_is_refused() {
        let marker = MarkerQueueDisc::new(
            DisciplineConfig::new().with_max_size(QueueSize::bytes(1_000)),
            MarkingRules::default(),
        );

        let node = Node::new(marker, PrioQueueDisc::default());
        assert!(matches!(node, Err(ConfigError::UnitMismatch { .. })));
    }
}
