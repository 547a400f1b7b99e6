//! Post-hoc energy summaries computed from recorded samples.

use std::fmt;

use super::types::{EnergySample, NodeKind};

/// Energy summary of a single node over a run.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSummary {
    pub node: String,
    pub kind: NodeKind,
    /// Remaining energy at the last sample (J).
    pub final_energy_j: f64,
    /// Lowest remaining energy observed (J).
    pub min_energy_j: f64,
    /// Cumulative harvested energy at the last sample (J).
    pub harvested_j: f64,
    /// Cumulative consumed energy at the last sample (J).
    pub consumed_j: f64,
    /// Time of the first sample reporting depletion (s).
    pub depleted_at_s: Option<f64>,
}

/// Per-node energy summaries derived from a complete simulation run.
///
/// Computed post-hoc from `Vec<EnergySample>` so reported figures always
/// agree with the exported sample stream. Nodes appear in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct EnergyReport {
    pub nodes: Vec<NodeSummary>,
}

impl EnergyReport {
    /// Summarises `samples`, which must be in chronological order per node.
    pub fn from_samples(samples: &[EnergySample]) -> Self {
        let mut nodes: Vec<NodeSummary> = Vec::new();

        for s in samples {
            let depleted_now = s.depleted.then_some(s.time_s);
            match nodes.iter_mut().find(|n| n.node == s.node) {
                Some(n) => {
                    n.final_energy_j = s.remaining_j;
                    n.min_energy_j = n.min_energy_j.min(s.remaining_j);
                    n.harvested_j = s.harvested_j;
                    n.consumed_j = s.consumed_j;
                    n.depleted_at_s = n.depleted_at_s.or(depleted_now);
                }
                None => nodes.push(NodeSummary {
                    node: s.node.clone(),
                    kind: s.kind,
                    final_energy_j: s.remaining_j,
                    min_energy_j: s.remaining_j,
                    harvested_j: s.harvested_j,
                    consumed_j: s.consumed_j,
                    depleted_at_s: depleted_now,
                }),
            }
        }

        Self { nodes }
    }

    pub fn node(&self, name: &str) -> Option<&NodeSummary> {
        self.nodes.iter().find(|n| n.node == name)
    }

    /// Number of nodes that depleted at least once.
    pub fn depleted_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.depleted_at_s.is_some())
            .count()
    }

    /// Total harvested energy across the fleet (J).
    pub fn total_harvested_j(&self) -> f64 {
        self.nodes.iter().map(|n| n.harvested_j).sum()
    }
}

impl fmt::Display for EnergyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Energy Report ---")?;
        for n in &self.nodes {
            write!(
                f,
                "{:<12} {:<9} final={:>9.2} J  min={:>9.2} J  harvested={:>10.2} J  consumed={:>10.2} J",
                n.node, n.kind, n.final_energy_j, n.min_energy_j, n.harvested_j, n.consumed_j
            )?;
            match n.depleted_at_s {
                Some(t) => writeln!(f, "  depleted at {t:.1} s")?,
                None => writeln!(f)?,
            }
        }
        writeln!(f, "Total harvested:  {:.2} J", self.total_harvested_j())?;
        write!(
            f,
            "Depleted nodes:   {}/{}",
            self.depleted_count(),
            self.nodes.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_sample(node: &str, time_s: f64, remaining_j: f64, depleted: bool) -> EnergySample {
        EnergySample {
            time_s,
            node: node.to_string(),
            kind: NodeKind::Uav,
            voltage_v: 3.8,
            remaining_j,
            remaining_ah: remaining_j / (3600.0 * 3.8),
            illuminated: None,
            harvested_j: time_s,
            consumed_j: 2.0 * time_s,
            depleted,
        }
    }

    #[test]
    fn tracks_final_and_minimum() {
        let samples = vec![
            make_sample("a", 0.0, 100.0, false),
            make_sample("a", 10.0, 40.0, false),
            make_sample("a", 20.0, 70.0, false),
        ];
        let report = EnergyReport::from_samples(&samples);
        let a = report.node("a").expect("summarised");
        assert_eq!(a.final_energy_j, 70.0);
        assert_eq!(a.min_energy_j, 40.0);
        assert_eq!(a.harvested_j, 20.0);
        assert_eq!(a.consumed_j, 40.0);
        assert_eq!(a.depleted_at_s, None);
    }

    #[test]
    fn records_first_depletion_only() {
        let samples = vec![
            make_sample("a", 0.0, 10.0, false),
            make_sample("a", 10.0, 0.0, true),
            make_sample("a", 20.0, 5.0, false),
            make_sample("a", 30.0, 0.0, true),
        ];
        let report = EnergyReport::from_samples(&samples);
        assert_eq!(report.node("a").and_then(|n| n.depleted_at_s), Some(10.0));
        assert_eq!(report.depleted_count(), 1);
    }

    #[test]
    fn nodes_keep_first_seen_order() {
        let samples = vec![
            make_sample("b", 0.0, 1.0, false),
            make_sample("a", 0.0, 1.0, false),
            make_sample("b", 1.0, 1.0, false),
        ];
        let report = EnergyReport::from_samples(&samples);
        let names: Vec<_> = report.nodes.iter().map(|n| n.node.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert!((report.total_harvested_j() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn empty_samples() {
        let report = EnergyReport::from_samples(&[]);
        assert!(report.nodes.is_empty());
        assert_eq!(report.depleted_count(), 0);
        assert!(format!("{report}").contains("0/0"));
    }
}
