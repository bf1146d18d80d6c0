use hqos::{DatagramBuilder, QueueDisc, Scenario};

fn main() {
    tracing_subscriber::fmt::init();

    let path = std::env::args().nth(1);
    let scenario = match path {
        Some(path) => Scenario::from_file(path).unwrap(),
        None => Scenario::from_json(
            r#"{
                "Marking_Port": "8080 46 10800 8 10900 16 11000 24",
                "Weights": "9 1 1",
                "MapQueue": "8 0 16 1 24 2",
                "QSD": "Wrr"
            }"#,
        )
        .unwrap(),
    };

    let mut node = scenario.node().unwrap();

    // A burst of traffic from every class.
    for round in 0..10u16 {
        for port in [8_080, 10_800, 10_900, 11_000, 5_000] {
            let item = DatagramBuilder::udp(port + round).with_payload(b"hello").build_item();
            if let Err(dropped) = node.receive(item) {
                println!("Dropped at ingress: {dropped}");
            }
        }
    }

    let (forwarded, transmitted) = node.flush();
    println!("Forwarded {} items, {} dropped", forwarded.accepted, forwarded.dropped.len());

    for item in transmitted {
        let headers = item.headers().unwrap();
        println!(
            "port {:>5} -> {:<4} ({} bytes)",
            headers.destination_port().unwrap_or_default(),
            headers.network.dscp.to_string(),
            item.size()
        );
    }

    let stats = node.marker().stats();
    println!("Marker: {} received, {} dropped", stats.received_packets(), stats.dropped_packets());
}
