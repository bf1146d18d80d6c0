use hqos::{
    marker::DEFAULT_CLASS, DatagramBuilder, DisciplineConfig, DropReason, DropTailQueue, Dscp,
    MarkerQueueDisc, MarkingRules, QueueDisc, QueueSize,
};
use rand::Rng;

fn scenario_a_rules() -> MarkingRules {
    MarkingRules::empty().with_rule(8080, Dscp::EF).with_rule(8081, Dscp::CS1)
}

fn marker(max_size: u32) -> MarkerQueueDisc {
    let config = DisciplineConfig::new().with_max_size(QueueSize::packets(max_size));
    let mut marker = MarkerQueueDisc::new(config, scenario_a_rules());
    marker.activate().unwrap();
    marker
}

#[test]
fn scenario_a() {
    let _ = tracing_subscriber::fmt::try_init();
    let mut marker = marker(100);

    marker.enqueue(DatagramBuilder::udp(8080).build_item()).unwrap();
    marker.enqueue(DatagramBuilder::udp(8200).build_item()).unwrap();

    let first = marker.dequeue().unwrap();
    let second = marker.dequeue().unwrap();

    assert_eq!(first.headers().unwrap().destination_port(), Some(8080));
    assert_eq!(first.dscp().unwrap().value(), 46);
    assert_eq!(second.headers().unwrap().destination_port(), Some(8200));
    assert_eq!(second.dscp().unwrap(), DEFAULT_CLASS);
}

#[test]
fn random_ports_are_marked_by_range() {
    let mut rng = rand::thread_rng();
    let mut marker = marker(1_000);

    for _ in 0..1_000 {
        let port: u16 = rng.gen();
        marker.enqueue(DatagramBuilder::udp(port).with_dscp(Dscp::CS7).build_item()).unwrap();

        let expected = match port {
            8080..=8179 => Dscp::EF,
            // 8081..=8179 overlaps the first rule, which wins.
            8180 => Dscp::CS1,
            _ => DEFAULT_CLASS,
        };
        assert_eq!(marker.dequeue().unwrap().dscp().unwrap(), expected, "port {port}");
    }
}

#[test]
fn accepts_up_to_capacity() {
    let capacity = 64;
    let mut marker = marker(capacity);

    for i in 0..capacity {
        marker.enqueue(DatagramBuilder::udp(8000 + i as u16).build_item()).unwrap();
    }
    assert_eq!(marker.n_packets(), capacity as usize);
    assert_eq!(marker.stats().dropped_packets(), 0);

    let dropped = marker.enqueue(DatagramBuilder::udp(8080).build_item()).unwrap_err();
    assert_eq!(dropped.reason, DropReason::CapacityExceeded);
    assert_eq!(dropped.into_item().dscp().unwrap(), Dscp::DEFAULT);

    // Prior items keep their position and marking.
    for i in 0..capacity {
        let item = marker.dequeue().unwrap();
        let port = 8000 + i as u16;
        assert_eq!(item.headers().unwrap().destination_port(), Some(port));
        let expected = if (8080..8180).contains(&port) { Dscp::EF } else { DEFAULT_CLASS };
        assert_eq!(item.dscp().unwrap(), expected);
    }
}

#[test]
fn peek_is_idempotent() {
    let mut marker = marker(10);
    marker.enqueue(DatagramBuilder::udp(8081).build_item()).unwrap();
    marker.enqueue(DatagramBuilder::udp(8080).build_item()).unwrap();

    for _ in 0..5 {
        assert_eq!(marker.peek().unwrap().headers().unwrap().destination_port(), Some(8081));
        assert_eq!(marker.n_packets(), 2);
    }
}

#[test]
fn queue_count_must_be_four() {
    for count in [0, 3, 4, 5] {
        let config = (0..count).fold(
            DisciplineConfig::new().with_max_size(QueueSize::packets(100)),
            |config, _| config.with_internal_queue(DropTailQueue::new(QueueSize::packets(100))),
        );
        let mut marker = MarkerQueueDisc::new(config, scenario_a_rules());

        // No queues means they get created.
        assert_eq!(marker.activate().is_ok(), count == 0 || count == 4, "{count} queues");
    }
}

#[test]
fn undersized_queue_is_rejected() {
    let mut config = DisciplineConfig::new().with_max_size(QueueSize::packets(100));
    for capacity in [100, 100, 100, 99] {
        config = config.with_internal_queue(DropTailQueue::new(QueueSize::packets(capacity)));
    }

    let mut marker = MarkerQueueDisc::new(config, scenario_a_rules());
    let err = marker.activate().unwrap_err();
    assert!(err.to_string().contains("internal queue 3"), "{err}");
}
