use std::io::Write;

use hqos::{
    marker::DEFAULT_CLASS, scenario::SchedulerKind, DatagramBuilder, Dscp, QueueDisc, QueueSize,
    Scenario, ScenarioError, WdrrQueueDisc, WrrQueueDisc,
};

const SCENARIO: &str = r#"{
    "Name": "juniper",
    "Marking_Port": "8080 46 10800 8 10900 16 11000 24",
    "Weights": "2 1 1",
    "MapQueue": "8 0 16 1 24 2",
    "QSD": "\"Wrr\""
}"#;

#[test]
fn loads_scenario() {
    let scenario = Scenario::from_json(SCENARIO).unwrap();

    assert_eq!(scenario.scheduler, SchedulerKind::Wrr);
    assert_eq!(scenario.marking_rules.len(), 4);
    assert_eq!(scenario.quanta.as_slice(), &[2, 1, 1]);
    assert_eq!(scenario.dscp_map.subband_for(Dscp::CS2), Some(1));
    assert_eq!(scenario.max_size, None);

    let prio = scenario.scheduler();
    assert_eq!(prio.n_bands(), 2);
}

#[test]
fn node_end_to_end() {
    let _ = tracing_subscriber::fmt::try_init();
    let mut node = Scenario::from_json(SCENARIO).unwrap().node().unwrap();
    assert_eq!(node.scheduler().band(1).unwrap().kind(), WrrQueueDisc::KIND);

    for port in [10_800, 10_801, 10_900, 11_000, 8_080, 5_000] {
        node.receive(DatagramBuilder::udp(port).build_item()).unwrap();
    }

    let (forwarded, transmitted) = node.flush();
    assert_eq!(forwarded.accepted, 6);

    let dscps: Vec<_> = transmitted.iter().map(|item| item.dscp().unwrap()).collect();
    // EF first, then the weighted band: two CS1, then CS2, CS3 and the unmapped default.
    assert_eq!(dscps, [Dscp::EF, Dscp::CS1, Dscp::CS1, Dscp::CS2, Dscp::CS3, DEFAULT_CLASS]);
}

#[test]
fn wdrr_and_max_size() {
    let json = r#"{
        "Marking_Port": "8080 46",
        "Weights": "1500 500",
        "MapQueue": "8 0",
        "QSD": "Wdrr",
        "MaxSize": "100p"
    }"#;
    let scenario = Scenario::from_json(json).unwrap();
    assert_eq!(scenario.max_size, Some(QueueSize::packets(100)));

    let node = scenario.node().unwrap();
    assert_eq!(node.marker().max_size(), Some(QueueSize::packets(100)));
    assert_eq!(node.scheduler().band(1).unwrap().kind(), WdrrQueueDisc::KIND);
}

#[test]
fn from_file() {
    let path = std::env::temp_dir().join(format!("hqos-scenario-{}.json", std::process::id()));
    std::fs::File::create(&path).unwrap().write_all(SCENARIO.as_bytes()).unwrap();

    let scenario = Scenario::from_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(scenario.scheduler, SchedulerKind::Wrr);

    assert!(matches!(Scenario::from_file(&path), Err(ScenarioError::Io { .. })));
}

#[test]
fn bad_scenarios() {
    let unknown = r#"{ "QSD": "Wfq" }"#;
    assert!(matches!(Scenario::from_json(unknown), Err(ScenarioError::Json(_))));

    let bad_rules = r#"{ "QSD": "Fifo", "Marking_Port": "8080" }"#;
    assert!(Scenario::from_json(bad_rules).unwrap_err().to_string().contains("pairs"));

    let zero_weight = r#"{ "QSD": "Wrr", "Weights": "1 0", "MapQueue": "8 0" }"#;
    let err = Scenario::from_json(zero_weight).unwrap().node().unwrap_err();
    assert!(matches!(err, ScenarioError::Config(_)));
}
