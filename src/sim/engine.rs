//! Simulation engine that builds a node fleet and samples its energy state.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use tracing::info;

use crate::config::{FleetConfig, ScenarioConfig};
use crate::devices::battery::LiIonBattery;
use crate::devices::load::DeviceLoad;
use crate::devices::types::{EnergySource, Shared, shared};
use crate::energy::composite::CompositeEnergySource;
use crate::energy::harvest::{HarvestPolicy, secs};
use crate::error::EnergySourceError;

use super::clock::Simulator;
use super::schedule::CurrentSchedule;
use super::types::{EnergySample, NodeKind, SimConfig};

/// One simulated node: a battery, an optional harvester in front of it, and
/// the consumer drawing from whichever of the two is outermost.
pub struct Node {
    name: String,
    kind: NodeKind,
    battery: Shared<LiIonBattery>,
    harvester: Option<Shared<CompositeEnergySource<LiIonBattery>>>,
    load: Shared<DeviceLoad>,
}

impl Node {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn battery(&self) -> &Shared<LiIonBattery> {
        &self.battery
    }

    pub fn harvester(&self) -> Option<&Shared<CompositeEnergySource<LiIonBattery>>> {
        self.harvester.as_ref()
    }

    pub fn load(&self) -> &Shared<DeviceLoad> {
        &self.load
    }

    /// Snapshot of the node's energy state at `now`.
    pub fn sample(&self, now: Duration) -> EnergySample {
        let battery = self.battery.borrow();
        let (illuminated, harvested_j) = match &self.harvester {
            Some(h) => {
                let h = h.borrow();
                let illuminated = matches!(h.policy(), HarvestPolicy::IlluminationCycle(_))
                    .then(|| h.is_illuminated());
                (illuminated, h.harvested_j())
            }
            None => (None, 0.0),
        };
        EnergySample {
            time_s: now.as_secs_f64(),
            node: self.name.clone(),
            kind: self.kind,
            voltage_v: battery.supply_voltage_v(),
            remaining_j: battery.remaining_energy_j(),
            remaining_ah: battery.remaining_ah(),
            illuminated,
            harvested_j,
            consumed_j: self.load.borrow().consumed_j(),
            depleted: battery.is_depleted(),
        }
    }
}

/// Simulation engine owning the clock, the node fleet, and the recorded samples.
///
/// Nodes are created in a fixed order (UAVs first, then satellites) and every
/// callback is scheduled deterministically, so two engines built from the same
/// scenario produce identical sample streams.
pub struct Engine {
    config: SimConfig,
    sim: Simulator,
    nodes: Rc<Vec<Node>>,
    samples: Shared<Vec<EnergySample>>,
}

impl Engine {
    /// Builds and starts every node described by `scenario`.
    ///
    /// # Errors
    ///
    /// Returns [`EnergySourceError::InvalidConfig`] with every validation
    /// problem if the scenario is invalid.
    pub fn from_scenario(scenario: &ScenarioConfig) -> Result<Self, EnergySourceError> {
        let errors = scenario.validate();
        if !errors.is_empty() {
            return Err(EnergySourceError::InvalidConfig(errors));
        }

        let config = scenario.simulation.to_sim_config();
        let mut sim = Simulator::new();
        let mut nodes = Vec::with_capacity(scenario.uav.count + scenario.satellite.count);

        for (kind, fleet) in [
            (NodeKind::Uav, &scenario.uav),
            (NodeKind::Satellite, &scenario.satellite),
        ] {
            for i in 0..fleet.count {
                let name = format!("{kind}-{i}");
                nodes.push(build_node(name, kind, fleet, &config, &mut sim)?);
            }
        }

        info!(
            nodes = nodes.len(),
            duration_s = config.duration.as_secs_f64(),
            "fleet initialised"
        );

        let nodes = Rc::new(nodes);
        let samples = shared(Vec::with_capacity(
            config.expected_samples() * nodes.len(),
        ));
        schedule_sample(
            &mut sim,
            Duration::ZERO,
            Rc::downgrade(&nodes),
            Rc::downgrade(&samples),
            config.report_interval,
        );

        Ok(Self {
            config,
            sim,
            nodes,
            samples,
        })
    }

    /// Runs to the configured horizon and returns every recorded sample,
    /// including a final one per node at the horizon.
    pub fn run(&mut self) -> Vec<EnergySample> {
        self.sim.run_until(self.config.duration);
        let now = self.sim.now();
        self.samples
            .borrow_mut()
            .extend(self.nodes.iter().map(|n| n.sample(now)));

        info!(
            t_s = now.as_secs_f64(),
            events = self.sim.executed_events(),
            "simulation complete"
        );
        std::mem::take(&mut *self.samples.borrow_mut())
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Looks up a node by name (e.g., `"satellite-0"`).
    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn now(&self) -> Duration {
        self.sim.now()
    }

    /// Returns a reference to the simulation configuration.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }
}

fn build_node(
    name: String,
    kind: NodeKind,
    fleet: &FleetConfig,
    config: &SimConfig,
    sim: &mut Simulator,
) -> Result<Node, EnergySourceError> {
    let battery = shared(LiIonBattery::new(&fleet.battery)?);

    let mut harvester = None;
    let source: Shared<dyn EnergySource> = match &fleet.harvest {
        Some(harvest) => {
            let mut composite = CompositeEnergySource::with_config(*harvest)?;
            composite.attach_battery(battery.clone())?;
            let composite = shared(composite);
            CompositeEnergySource::start(&composite, sim)?;
            harvester = Some(composite.clone());
            composite
        }
        None => battery.clone(),
    };

    let load = shared(DeviceLoad::new(
        name.clone(),
        source,
        config.energy_update_interval,
    ));
    let l = &fleet.load;
    CurrentSchedule::active_window(
        l.idle_current_a,
        l.active_current_a,
        secs(l.active_start_s),
        secs(l.active_end_s),
    )
    .install(&load, sim);
    DeviceLoad::start(&load, sim);

    Ok(Node {
        name,
        kind,
        battery,
        harvester,
        load,
    })
}

/// Records one sample per node at `at`, then again every `interval`.
fn schedule_sample(
    sim: &mut Simulator,
    at: Duration,
    nodes: Weak<Vec<Node>>,
    samples: Weak<RefCell<Vec<EnergySample>>>,
    interval: Duration,
) {
    sim.schedule_at(at, move |sim| {
        let (Some(node_list), Some(out)) = (nodes.upgrade(), samples.upgrade()) else {
            return;
        };
        let now = sim.now();
        out.borrow_mut()
            .extend(node_list.iter().map(|n| n.sample(now)));

        let next = now.saturating_add(interval);
        schedule_sample(sim, next, nodes, samples, interval);
    });
}
