use flowsim::{
    PacketLoss, Scenario, ScenarioConfig, SimTime, Topology,
    output::{read_series, series_path},
};
use std::time::Duration;

#[test]
fn writes_one_series_per_flow() {
    let dir = tempfile::tempdir().unwrap();
    let config = ScenarioConfig {
        packet_budget: 100,
        output_dir: Some(dir.path().to_owned()),
        file_prefix: "tp".to_owned(),
        ..ScenarioConfig::default()
    };
    let report = Scenario::new(config, Topology::Dumbbell { pairs: 2 })
        .run()
        .unwrap();

    // every 500ms from 1.1s up to 20s
    assert_eq!(report.samples, 38);

    for (i, flow) in report.flows.iter().enumerate() {
        let path = series_path(dir.path(), "tp", i);
        assert_eq!(flow.series.as_deref(), Some(path.as_path()));

        // only the periods in which something was received are written
        let series = read_series(&path).unwrap();
        assert!(!series.is_empty());
        assert!(series.len() < 38);
        assert_eq!(series[0].0, 1.1);
        assert!(series.iter().all(|&(_, value)| value > 0.0));
        assert!(series.windows(2).all(|pair| pair[0].0 < pair[1].0));

        // the written amounts add up to what the sink received
        let received: f64 = series.iter().map(|&(_, value)| value).sum();
        let expected = (flow.stats.rx_bytes * 8) as f64 / 1_000_000.0;
        assert_eq!(flow.stats.rx_bytes, 100 * 1_040);
        assert!((received - expected).abs() < 1e-6);

        // 100 datagrams of 1040 bytes are long delivered
        let last = flow.last_sample.unwrap();
        assert_eq!(last.time, SimTime::from_millis(19_600));
        assert_eq!(last.delta_bytes, 0);
    }
}

#[test]
fn same_seed_same_losses() {
    let config = ScenarioConfig {
        simulation_time: Duration::from_secs(5),
        bottleneck_loss: "10%".parse::<PacketLoss>().unwrap(),
        seed: 42,
        ..ScenarioConfig::default()
    };
    let run = || {
        Scenario::new(config.clone(), Topology::Chain { hops: 3 })
            .run()
            .unwrap()
    };

    let (a, b) = (run(), run());
    assert!(a.totals.lost_packets > 0);
    assert_eq!(a.totals.rx_packets, b.totals.rx_packets);
    assert_eq!(a.flows[0].stats.delay_sum, b.flows[0].stats.delay_sum);
    assert_eq!(a.to_string(), b.to_string());
}

#[test]
fn report_lists_flows_and_totals() {
    let config = ScenarioConfig {
        simulation_time: Duration::from_secs(3),
        packet_budget: 10,
        ..ScenarioConfig::default()
    };
    let report = Scenario::new(config, Topology::Star { stations: 3 })
        .run()
        .unwrap();
    let text = report.to_string();

    assert!(text.starts_with("Topology star:3 (5 nodes, 4 links)"));
    assert_eq!(text.matches("Tx Packets: 10").count(), 3);
    assert!(text.contains("--------Total Results of the simulation----------"));
    assert!(text.contains("Total sent packets: 30"));
    assert!(text.contains("Total lost packets: 0"));
    assert!(text.contains("Packet delivery ratio: 100%"));
}
