//! Integration tests for fleet simulation runs.

use harvest_sim::config::ScenarioConfig;
use harvest_sim::io::export::write_csv;
use harvest_sim::sim::engine::Engine;
use harvest_sim::sim::kpi::EnergyReport;
use harvest_sim::sim::types::{EnergySample, NodeKind};

fn run(scenario: &ScenarioConfig) -> Vec<EnergySample> {
    Engine::from_scenario(scenario)
        .expect("preset should build")
        .run()
}

#[test]
fn baseline_produces_expected_sample_count() {
    let scenario = ScenarioConfig::baseline();
    let samples = run(&scenario);
    let per_node = scenario.simulation.to_sim_config().expected_samples();
    // 2400 s every 20 s plus the final sample, for 12 nodes
    assert_eq!(per_node, 121);
    assert_eq!(samples.len(), per_node * 12);
}

#[test]
fn baseline_fleet_drains_after_harvest_window() {
    let samples = run(&ScenarioConfig::baseline());
    let report = EnergyReport::from_samples(&samples);

    let sat = report.node("satellite-0").expect("satellite summarised");
    assert_eq!(sat.kind, NodeKind::Satellite);
    assert!(sat.harvested_j > 0.0);
    // Window closes at 1200 s; the 4.66 A load empties the pack well before 2400 s.
    let depleted_at = sat.depleted_at_s.expect("satellite should deplete");
    assert!(depleted_at > 1200.0);

    let uav = report.node("uav-0").expect("uav summarised");
    assert_eq!(uav.harvested_j, 0.0);
    assert!(uav.depleted_at_s.is_some_and(|t| t < 1200.0));
}

#[test]
fn satellite_stays_full_while_window_open() {
    let samples = run(&ScenarioConfig::baseline());
    for s in samples
        .iter()
        .filter(|s| s.kind == NodeKind::Satellite && s.time_s < 1200.0)
    {
        assert!(
            (s.remaining_j - 2000.0).abs() < 1e-6,
            "satellite below capacity at {} s: {}",
            s.time_s,
            s.remaining_j
        );
    }
}

#[test]
fn leo_survives_eclipses() {
    let samples = run(&ScenarioConfig::leo());
    let report = EnergyReport::from_samples(&samples);
    assert_eq!(report.nodes.len(), 2);
    assert_eq!(report.depleted_count(), 0);

    let eclipsed: Vec<_> = samples
        .iter()
        .filter(|s| s.illuminated == Some(false))
        .map(|s| s.time_s)
        .collect();
    assert!(!eclipsed.is_empty());
    // First eclipse spans [3900, 5700).
    assert!(eclipsed.iter().all(|&t| (3900.0..5700.0).contains(&t) || t >= 9600.0));

    let sat = report.node("satellite-1").expect("satellite summarised");
    assert!(sat.min_energy_j < 2000.0);
    assert!(sat.min_energy_j > 1000.0);
}

#[test]
fn eclipse_stress_depletes_every_satellite() {
    let samples = run(&ScenarioConfig::eclipse_stress());
    let report = EnergyReport::from_samples(&samples);
    assert_eq!(report.nodes.len(), 4);
    assert_eq!(report.depleted_count(), 4);
}

#[test]
fn runs_are_deterministic() {
    let a = run(&ScenarioConfig::baseline());
    let b = run(&ScenarioConfig::baseline());
    assert_eq!(a, b);

    let mut csv_a = Vec::new();
    let mut csv_b = Vec::new();
    write_csv(&a, &mut csv_a).expect("csv write");
    write_csv(&b, &mut csv_b).expect("csv write");
    assert_eq!(csv_a, csv_b);
}

#[test]
fn toml_scenarios_match_presets() {
    for name in ScenarioConfig::PRESETS {
        let path = format!("{}/scenarios/{name}.toml", env!("CARGO_MANIFEST_DIR"));
        let from_file = ScenarioConfig::from_toml_file(std::path::Path::new(&path))
            .unwrap_or_else(|e| panic!("{path} should parse: {e}"));
        let preset = ScenarioConfig::from_preset(name).expect("preset exists");
        assert_eq!(
            run(&from_file),
            run(&preset),
            "scenario file {path} diverges from preset"
        );
    }
}
