use hqos::{
    DatagramBuilder, DisciplineConfig, DropReason, Dscp, DscpFilter, DscpMap, FifoQueueDisc,
    PrioQueueDisc, Priomap, QueueDisc, QueueSize, Quanta, WdrrQueueDisc, WrrQueueDisc,
};

fn scenario_b_priomap() -> Priomap {
    Priomap::default().with_band(0, 0).with_band(7, 1)
}

#[test]
fn scenario_b() {
    let _ = tracing_subscriber::fmt::try_init();

    let config = DisciplineConfig::new()
        .with_class(FifoQueueDisc::default())
        .with_class(FifoQueueDisc::default());
    let mut prio = PrioQueueDisc::new(config, scenario_b_priomap());
    prio.activate().unwrap();

    let x = DatagramBuilder::udp(1).with_priority(7).build_item();
    let y = DatagramBuilder::udp(2).with_priority(0).build_item();
    prio.enqueue(x.clone()).unwrap();
    prio.enqueue(y.clone()).unwrap();

    assert_eq!(prio.dequeue(), Some(y));
    assert_eq!(prio.dequeue(), Some(x));
}

#[test]
fn lower_band_always_first() {
    let mut prio = PrioQueueDisc::new(DisciplineConfig::new(), Priomap::uniform(1).with_band(0, 0));
    prio.activate().unwrap();

    // Interleave arrivals; every band 0 item must leave before any band 1 item.
    for i in 0..20u8 {
        let priority = if i % 2 == 0 { 1 } else { 0 };
        let item = DatagramBuilder::udp(u16::from(i)).with_priority(priority).build_item();
        prio.enqueue(item).unwrap();
    }

    let priorities: Vec<u8> =
        std::iter::from_fn(|| prio.dequeue()).map(|item| item.priority()).collect();
    assert_eq!(priorities.len(), 20);
    assert!(priorities[..10].iter().all(|&p| p == 0));
    assert!(priorities[10..].iter().all(|&p| p == 1));
}

#[test]
fn heterogeneous_children() {
    let map = DscpMap::new().with_entry(Dscp::CS1, 0).with_entry(Dscp::CS2, 1);
    let filter =
        DscpFilter::new().with_rule(Dscp::EF, 0).with_rule(Dscp::CS1, 1).with_rule(Dscp::CS2, 2);
    let config = DisciplineConfig::new()
        .with_class(FifoQueueDisc::default())
        .with_class(WrrQueueDisc::new(DisciplineConfig::new(), Quanta::new(vec![2, 1]), map.clone()))
        .with_class(WdrrQueueDisc::new(DisciplineConfig::new(), Quanta::new(vec![1_500; 2]), map))
        .with_filter(filter);
    let mut prio = PrioQueueDisc::new(config, Priomap::uniform(2));
    prio.activate().unwrap();

    for dscp in [Dscp::CS2, Dscp::CS1, Dscp::EF, Dscp::CS1, Dscp::EF] {
        prio.enqueue(DatagramBuilder::udp(1).with_dscp(dscp).build_item()).unwrap();
    }
    assert_eq!(prio.band(1).unwrap().n_packets(), 2);

    let mut order = Vec::new();
    while let Some(peeked) = prio.peek().cloned() {
        let item = prio.dequeue().unwrap();
        assert_eq!(item, peeked);
        order.push(item.dscp().unwrap());
    }
    assert_eq!(order, [Dscp::EF, Dscp::EF, Dscp::CS1, Dscp::CS1, Dscp::CS2]);
}

#[test]
fn full_child_drops_without_side_effects() {
    let config = DisciplineConfig::new()
        .with_class(FifoQueueDisc::with_max_size(QueueSize::packets(2)))
        .with_class(FifoQueueDisc::with_max_size(QueueSize::packets(2)));
    let mut prio = PrioQueueDisc::new(config, Priomap::uniform(1));
    prio.activate().unwrap();

    for _ in 0..2 {
        prio.enqueue(DatagramBuilder::udp(1).build_item()).unwrap();
    }
    let dropped = prio.enqueue(DatagramBuilder::udp(1).build_item()).unwrap_err();

    assert!(matches!(dropped.reason, DropReason::ChildDropped { band: 1, .. }));
    assert_eq!(prio.n_packets(), 2);
    assert_eq!(prio.band(1).unwrap().stats().drops().capacity_exceeded, 1);
}

#[test]
fn invalid_child_blocks_activation() {
    let config = DisciplineConfig::new()
        .with_class(FifoQueueDisc::default())
        .with_class(WrrQueueDisc::new(DisciplineConfig::new(), Quanta::new(vec![]), DscpMap::new()));
    let mut prio = PrioQueueDisc::new(config, Priomap::default());

    let err = prio.activate().unwrap_err();
    assert!(matches!(err, hqos::ConfigError::Child { band: 1, .. }));
    assert!(std::error::Error::source(&err).is_some());
}
