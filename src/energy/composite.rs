//! Battery + harvester composite energy source.

use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use crate::devices::types::{EnergySource, Shared};
use crate::error::EnergySourceError;
use crate::sim::clock::Simulator;
use crate::sim::event::EventId;

use super::harvest::{HarvestConfig, HarvestPolicy};
use super::illumination::IlluminationState;

/// An energy source that wraps one battery and periodically injects harvested
/// energy into it.
///
/// To consumers it behaves exactly like the battery it wraps (see the
/// [`EnergySource`] impl). Harvesting follows the configured
/// [`HarvestPolicy`]:
///
/// - **Fixed window**: a tick every `step_s` from `start_s`, adding
///   `rate_w * step_s` while inside `[start_s, end_s)`. The loop ends at the
///   first tick outside the window.
/// - **Illumination cycle**: a tick every `step_s` forever, adding
///   `panel power * step_s` while illuminated, plus a phase-toggle event at
///   every illumination/eclipse boundary.
///
/// Every tick first advances the illumination state to the current time, so a
/// toggle and a tick sharing a timestamp always resolve toggle-first.
///
/// Pending events are cancelled when the source is stopped or dropped.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use harvest_sim::config::BatteryConfig;
/// use harvest_sim::devices::{EnergySource, LiIonBattery, shared};
/// use harvest_sim::energy::{CompositeEnergySource, HarvestConfig};
/// use harvest_sim::sim::clock::Simulator;
///
/// let battery = shared(LiIonBattery::new(&BatteryConfig {
///     initial_energy_j: 2000.0,
///     capacity_j: 10_000.0,
///     ..BatteryConfig::default()
/// })?);
///
/// let source = shared(CompositeEnergySource::new());
/// source.borrow_mut().attach_battery(battery)?;
/// source
///     .borrow_mut()
///     .configure(HarvestConfig::fixed_window(500.0, 0.0, 10.0, 1.0))?;
///
/// let mut sim = Simulator::new();
/// CompositeEnergySource::start(&source, &mut sim)?;
/// sim.run_until(Duration::from_secs(10));
///
/// assert!((source.borrow().remaining_energy_j() - 7000.0).abs() < 1e-6);
/// # Ok::<(), harvest_sim::error::EnergySourceError>(())
/// ```
pub struct CompositeEnergySource<B> {
    battery: Option<Shared<B>>,
    config: HarvestConfig,
    illumination: Option<IlluminationState>,
    harvest_event: Option<EventId>,
    toggle_event: Option<EventId>,
    started: bool,
    /// Energy accepted by the battery across all ticks (J).
    harvested_j: f64,
    ticks: u64,
}

impl<B> Default for CompositeEnergySource<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> CompositeEnergySource<B> {
    /// Creates an unstarted source with the default harvest configuration
    /// and no battery.
    pub fn new() -> Self {
        Self {
            battery: None,
            config: HarvestConfig::default(),
            illumination: None,
            harvest_event: None,
            toggle_event: None,
            started: false,
            harvested_j: 0.0,
            ticks: 0,
        }
    }

    /// Creates an unstarted source with a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EnergySourceError::InvalidConfig`] if `config` is invalid.
    pub fn with_config(config: HarvestConfig) -> Result<Self, EnergySourceError> {
        let mut source = Self::new();
        source.configure(config)?;
        Ok(source)
    }

    /// Replaces the harvest configuration.
    ///
    /// Must be called before [`start`](Self::start). Configuring twice with
    /// identical parameters is equivalent to configuring once.
    ///
    /// # Errors
    ///
    /// - [`EnergySourceError::AlreadyStarted`] once harvesting is running.
    /// - [`EnergySourceError::InvalidConfig`] listing every violated
    ///   constraint; the previous configuration is kept.
    pub fn configure(&mut self, config: HarvestConfig) -> Result<(), EnergySourceError> {
        if self.started {
            return Err(EnergySourceError::AlreadyStarted);
        }
        let errors = config.validate();
        if !errors.is_empty() {
            return Err(EnergySourceError::InvalidConfig(errors));
        }
        debug!(policy = config.policy.name(), step_s = config.step_s, "harvest configured");
        self.config = config;
        Ok(())
    }

    /// Binds the battery this source wraps.
    ///
    /// The battery is shared: its owner (usually the scenario) keeps its own
    /// handle and the battery outlives nothing but this reference.
    ///
    /// # Errors
    ///
    /// Returns [`EnergySourceError::BatteryAlreadyAttached`] if a battery is
    /// already bound; rebinding is not supported.
    pub fn attach_battery(&mut self, battery: Shared<B>) -> Result<(), EnergySourceError> {
        if self.battery.is_some() {
            return Err(EnergySourceError::BatteryAlreadyAttached);
        }
        self.battery = Some(battery);
        Ok(())
    }

    /// The wrapped battery, if attached.
    pub fn battery(&self) -> Option<&Shared<B>> {
        self.battery.as_ref()
    }

    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    pub fn policy(&self) -> &HarvestPolicy {
        &self.config.policy
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Total energy accepted by the battery from harvesting (J).
    pub fn harvested_j(&self) -> f64 {
        self.harvested_j
    }

    /// Number of harvest ticks evaluated.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Current illumination phase as a boolean.
    ///
    /// Sources start illuminated; a fixed-window source never enters eclipse.
    pub fn is_illuminated(&self) -> bool {
        self.illumination
            .as_ref()
            .is_none_or(IlluminationState::is_illuminated)
    }

    /// Returns `true` while a harvest tick is pending.
    pub fn is_harvesting(&self) -> bool {
        self.harvest_event.as_ref().is_some_and(EventId::is_running)
    }

    /// Handle of the pending harvest tick, if any.
    pub fn harvest_event(&self) -> Option<&EventId> {
        self.harvest_event.as_ref()
    }

    /// Handle of the pending phase toggle, if any.
    pub fn toggle_event(&self) -> Option<&EventId> {
        self.toggle_event.as_ref()
    }

    /// Cancels every pending harvest and toggle event.
    pub fn stop(&mut self) {
        let mut cancelled = false;
        for event in [self.harvest_event.take(), self.toggle_event.take()]
            .into_iter()
            .flatten()
        {
            cancelled |= event.is_running();
            event.cancel();
        }
        if cancelled {
            debug!(harvested_j = self.harvested_j, "harvesting stopped");
        }
    }
}

impl<B: EnergySource + 'static> CompositeEnergySource<B> {
    /// Starts harvesting according to the configured policy.
    ///
    /// - Illumination cycle: enters the illuminated phase now, schedules the
    ///   first toggle and an immediate harvest tick.
    /// - Fixed window: schedules the first tick at `start_s`. A window that
    ///   already opened starts ticking immediately.
    ///
    /// # Errors
    ///
    /// Returns [`EnergySourceError::AlreadyStarted`] on a second call.
    pub fn start(source: &Shared<Self>, sim: &mut Simulator) -> Result<(), EnergySourceError> {
        let now = sim.now();
        let policy = {
            let mut this = source.borrow_mut();
            if this.started {
                return Err(EnergySourceError::AlreadyStarted);
            }
            this.started = true;
            this.config.policy
        };

        match policy {
            HarvestPolicy::IlluminationCycle(cycle) => {
                source.borrow_mut().illumination = Some(IlluminationState::new(
                    cycle.illumination(),
                    cycle.eclipse(),
                    now,
                ));
                Self::schedule_toggle(source, sim);
                Self::schedule_tick(source, sim, now);
                info!(
                    power_w = cycle.panel.power_w(),
                    illumination_s = cycle.illumination_s,
                    eclipse_s = cycle.eclipse_s,
                    "illumination-cycle harvesting started"
                );
            }
            HarvestPolicy::FixedWindow(window) => {
                if window.start() < now {
                    warn!(
                        start_s = window.start_s,
                        now_s = now.as_secs_f64(),
                        "harvest window already open; ticking from now"
                    );
                }
                Self::schedule_tick(source, sim, window.start());
                info!(
                    rate_w = window.rate_w,
                    start_s = window.start_s,
                    end_s = window.end_s,
                    "fixed-window harvesting scheduled"
                );
            }
        }
        Ok(())
    }

    fn schedule_tick(source: &Shared<Self>, sim: &mut Simulator, at: Duration) {
        let weak = Rc::downgrade(source);
        let event = sim.schedule_at(at, move |sim| {
            if let Some(source) = weak.upgrade() {
                Self::harvest_tick(&source, sim);
            }
        });
        source.borrow_mut().harvest_event = Some(event);
    }

    fn harvest_tick(source: &Shared<Self>, sim: &mut Simulator) {
        let now = sim.now();
        let (keep_running, step) = {
            let mut this = source.borrow_mut();
            (this.on_tick(now), this.config.step())
        };
        if keep_running {
            Self::schedule_tick(source, sim, now.saturating_add(step));
        }
    }

    fn schedule_toggle(source: &Shared<Self>, sim: &mut Simulator) {
        let Some(at) = source
            .borrow()
            .illumination
            .as_ref()
            .map(IlluminationState::next_toggle)
        else {
            return;
        };
        let weak = Rc::downgrade(source);
        let event = sim.schedule_at(at, move |sim| {
            if let Some(source) = weak.upgrade() {
                Self::toggle(&source, sim);
            }
        });
        source.borrow_mut().toggle_event = Some(event);
    }

    fn toggle(source: &Shared<Self>, sim: &mut Simulator) {
        {
            let mut this = source.borrow_mut();
            if let Some(state) = this.illumination.as_mut() {
                state.advance_to(sim.now());
                debug!(
                    t_s = sim.now().as_secs_f64(),
                    phase = %state.phase(),
                    "illumination phase changed"
                );
            }
        }
        Self::schedule_toggle(source, sim);
    }

    /// Evaluates one tick at `now`; returns whether the loop continues.
    fn on_tick(&mut self, now: Duration) -> bool {
        if let Some(state) = self.illumination.as_mut() {
            state.advance_to(now);
        }
        self.ticks += 1;

        let joules = self.config.energy_for_tick(now, self.is_illuminated());
        if joules > 0.0 {
            self.inject(joules, now);
        }

        match &self.config.policy {
            HarvestPolicy::IlluminationCycle(_) => true,
            HarvestPolicy::FixedWindow(window) => window.is_active(now),
        }
    }

    fn inject(&mut self, joules: f64, now: Duration) {
        let Some(battery) = &self.battery else {
            trace!(joules, "no battery attached; harvest dropped");
            return;
        };
        let accepted = battery.borrow_mut().add_energy_j(joules);
        self.harvested_j += accepted;
        debug!(
            t_s = now.as_secs_f64(),
            offered_j = joules,
            accepted_j = accepted,
            "harvested energy"
        );
    }
}

impl<B> Drop for CompositeEnergySource<B> {
    fn drop(&mut self) {
        self.stop();
    }
}

impl<B: EnergySource> EnergySource for CompositeEnergySource<B> {
    fn remaining_energy_j(&self) -> f64 {
        self.battery
            .as_ref()
            .map_or(0.0, |b| b.borrow().remaining_energy_j())
    }

    fn total_energy_j(&self) -> f64 {
        self.battery
            .as_ref()
            .map_or(0.0, |b| b.borrow().total_energy_j())
    }

    fn supply_voltage_v(&self) -> f64 {
        self.battery
            .as_ref()
            .map_or(0.0, |b| b.borrow().supply_voltage_v())
    }

    fn add_energy_j(&mut self, joules: f64) -> f64 {
        self.battery
            .as_ref()
            .map_or(0.0, |b| b.borrow_mut().add_energy_j(joules))
    }

    fn draw_energy_j(&mut self, joules: f64) -> f64 {
        self.battery
            .as_ref()
            .map_or(0.0, |b| b.borrow_mut().draw_energy_j(joules))
    }

    fn set_load_current_a(&mut self, current_a: f64) {
        if let Some(b) = &self.battery {
            b.borrow_mut().set_load_current_a(current_a);
        }
    }

    fn is_depleted(&self) -> bool {
        self.battery
            .as_ref()
            .is_some_and(|b| b.borrow().is_depleted())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BatteryConfig;
    use crate::devices::battery::LiIonBattery;
    use crate::devices::types::shared;
    use crate::energy::harvest::SolarPanel;

    type Source = CompositeEnergySource<LiIonBattery>;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    fn battery(initial_energy_j: f64, capacity_j: f64) -> Shared<LiIonBattery> {
        shared(
            LiIonBattery::new(&BatteryConfig {
                initial_energy_j,
                capacity_j,
                ..BatteryConfig::default()
            })
            .expect("valid battery"),
        )
    }

    fn source(config: HarvestConfig, battery: Shared<LiIonBattery>) -> Shared<Source> {
        let source = Source::with_config(config).expect("valid harvest config");
        let source = shared(source);
        source
            .borrow_mut()
            .attach_battery(battery)
            .expect("first attach");
        source
    }

    fn cycle(step_s: f64) -> HarvestConfig {
        let panel = SolarPanel {
            area_m2: 1.0,
            efficiency: 0.25,
            solar_constant_w_m2: 1361.0,
        };
        HarvestConfig::illumination_cycle(panel, 10.0, 5.0, step_s)
    }

    #[test]
    fn unattached_source_reports_zero() {
        let s = Source::new();
        assert_eq!(s.remaining_energy_j(), 0.0);
        assert_eq!(s.total_energy_j(), 0.0);
        assert_eq!(s.supply_voltage_v(), 0.0);
        assert_eq!(s.state_of_charge(), 0.0);
        assert!(!s.is_depleted());
    }

    #[test]
    fn unattached_source_ignores_energy_transfer() {
        let mut s = Source::new();
        assert_eq!(s.add_energy_j(100.0), 0.0);
        assert_eq!(s.draw_energy_j(100.0), 0.0);
        s.set_load_current_a(1.0);
    }

    #[test]
    fn harvesting_without_battery_is_noop() {
        let s = shared(Source::with_config(HarvestConfig::fixed_window(500.0, 0.0, 5.0, 1.0)).unwrap());
        let mut sim = Simulator::new();
        Source::start(&s, &mut sim).unwrap();
        sim.run_until(secs(10));
        assert_eq!(s.borrow().harvested_j(), 0.0);
        assert_eq!(s.borrow().ticks(), 6);
    }

    #[test]
    fn delegates_reads_to_battery() {
        let b = battery(1234.0, 5000.0);
        let s = source(HarvestConfig::default(), Rc::clone(&b));
        let s = s.borrow();
        assert_eq!(s.remaining_energy_j(), 1234.0);
        assert_eq!(s.total_energy_j(), 5000.0);
        assert_eq!(s.supply_voltage_v(), b.borrow().supply_voltage_v());
    }

    #[test]
    fn second_attach_rejected() {
        let s = source(HarvestConfig::default(), battery(1.0, 2.0));
        let err = s.borrow_mut().attach_battery(battery(1.0, 2.0));
        assert!(matches!(err, Err(EnergySourceError::BatteryAlreadyAttached)));
    }

    #[test]
    fn invalid_config_rejected_and_previous_kept() {
        let mut s = Source::new();
        let before = *s.config();
        let err = s.configure(HarvestConfig::fixed_window(1.0, 5.0, 1.0, 1.0));
        assert!(matches!(err, Err(EnergySourceError::InvalidConfig(_))));
        assert_eq!(*s.config(), before);
    }

    #[test]
    fn configure_after_start_rejected() {
        let s = source(cycle(1.0), battery(0.0, 100.0));
        let mut sim = Simulator::new();
        Source::start(&s, &mut sim).unwrap();
        let err = s.borrow_mut().configure(cycle(2.0));
        assert!(matches!(err, Err(EnergySourceError::AlreadyStarted)));
        assert!(matches!(
            Source::start(&s, &mut sim),
            Err(EnergySourceError::AlreadyStarted)
        ));
    }

    #[test]
    fn fixed_window_harvests_rate_times_width() {
        let b = battery(2000.0, 10_000.0);
        let s = source(HarvestConfig::fixed_window(500.0, 0.0, 10.0, 1.0), Rc::clone(&b));
        let mut sim = Simulator::new();
        Source::start(&s, &mut sim).unwrap();

        sim.run_until(secs(10));
        assert!((b.borrow().remaining_energy_j() - 7000.0).abs() < 1e-6);

        sim.run_until(secs(60));
        assert!((b.borrow().remaining_energy_j() - 7000.0).abs() < 1e-6);
        assert!(!s.borrow().is_harvesting());
    }

    #[test]
    fn fixed_window_nothing_before_start() {
        let b = battery(100.0, 10_000.0);
        let s = source(HarvestConfig::fixed_window(50.0, 20.0, 30.0, 1.0), Rc::clone(&b));
        let mut sim = Simulator::new();
        Source::start(&s, &mut sim).unwrap();

        sim.run_until(secs(20));
        assert_eq!(b.borrow().remaining_energy_j(), 100.0);
        assert_eq!(s.borrow().ticks(), 0);

        sim.run_until(secs(40));
        assert!((b.borrow().remaining_energy_j() - 600.0).abs() < 1e-9);
    }

    #[test]
    fn fixed_window_already_open_starts_now() {
        let b = battery(0.0, 10_000.0);
        let s = source(HarvestConfig::fixed_window(10.0, 0.0, 8.0, 1.0), Rc::clone(&b));
        let mut sim = Simulator::new();
        sim.run_until(secs(5));
        Source::start(&s, &mut sim).unwrap();
        sim.run_until(secs(20));
        // Ticks at 5, 6, 7 fall inside the window.
        assert!((b.borrow().remaining_energy_j() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn empty_window_harvests_nothing() {
        let b = battery(10.0, 100.0);
        let s = source(HarvestConfig::fixed_window(10.0, 3.0, 3.0, 1.0), Rc::clone(&b));
        let mut sim = Simulator::new();
        Source::start(&s, &mut sim).unwrap();
        sim.run_until(secs(10));
        assert_eq!(b.borrow().remaining_energy_j(), 10.0);
        assert_eq!(s.borrow().ticks(), 1);
    }

    #[test]
    fn harvest_is_clamped_by_capacity() {
        let b = battery(2000.0, 2000.0);
        let s = source(HarvestConfig::fixed_window(500.0, 0.0, 10.0, 1.0), Rc::clone(&b));
        let mut sim = Simulator::new();
        Source::start(&s, &mut sim).unwrap();
        sim.run_until(secs(10));
        assert_eq!(b.borrow().remaining_energy_j(), 2000.0);
        assert_eq!(s.borrow().harvested_j(), 0.0);
    }

    #[test]
    fn cycle_harvests_only_while_illuminated() {
        let b = battery(1000.0, 10_000.0);
        let s = source(cycle(1.0), Rc::clone(&b));
        let mut sim = Simulator::new();
        Source::start(&s, &mut sim).unwrap();

        sim.run_until(secs(30));
        let p = 1361.0 * 0.25;
        assert!((b.borrow().remaining_energy_j() - (1000.0 + p * 20.0)).abs() < 1e-6);
        assert!((s.borrow().harvested_j() - p * 20.0).abs() < 1e-6);
    }

    #[test]
    fn cycle_phase_tracks_clock() {
        let s = source(cycle(1.0), battery(0.0, 10_000.0));
        let mut sim = Simulator::new();
        Source::start(&s, &mut sim).unwrap();
        assert!(s.borrow().is_illuminated());

        sim.run_until(Duration::from_millis(10_500));
        assert!(!s.borrow().is_illuminated());

        sim.run_until(Duration::from_millis(15_500));
        assert!(s.borrow().is_illuminated());
    }

    #[test]
    fn tick_applies_due_toggle_itself() {
        // With the toggle event cancelled, ticks must still observe every
        // boundary at its exact timestamp.
        let b = battery(1000.0, 10_000.0);
        let s = source(cycle(1.0), Rc::clone(&b));
        let mut sim = Simulator::new();
        Source::start(&s, &mut sim).unwrap();
        s.borrow().toggle_event().unwrap().cancel();

        sim.run_until(secs(30));
        let p = 1361.0 * 0.25;
        assert!((b.borrow().remaining_energy_j() - (1000.0 + p * 20.0)).abs() < 1e-6);
    }

    #[test]
    fn boundary_tick_uses_new_phase() {
        let p = 1361.0 * 0.25;
        let b = battery(0.0, 10_000.0);
        let s = source(cycle(1.0), Rc::clone(&b));
        let mut sim = Simulator::new();
        Source::start(&s, &mut sim).unwrap();

        // Ticks at 0..=9 harvest; the tick at 10 already sees the eclipse.
        sim.run_until(Duration::from_millis(10_001));
        assert_eq!(s.borrow().ticks(), 11);
        assert!((b.borrow().remaining_energy_j() - 10.0 * p).abs() < 1e-6);

        // The tick at 15 sees the illumination again.
        sim.run_until(Duration::from_millis(15_001));
        assert!((b.borrow().remaining_energy_j() - 11.0 * p).abs() < 1e-6);
    }

    #[test]
    fn stop_cancels_pending_events() {
        let s = source(cycle(1.0), battery(0.0, 10_000.0));
        let mut sim = Simulator::new();
        Source::start(&s, &mut sim).unwrap();
        let tick = s.borrow().harvest_event().cloned().unwrap();
        let toggle = s.borrow().toggle_event().cloned().unwrap();

        s.borrow_mut().stop();
        assert!(!tick.is_running());
        assert!(!toggle.is_running());
        assert_eq!(sim.pending_events(), 0);
    }

    #[test]
    fn drop_cancels_pending_events() {
        let b = battery(0.0, 10_000.0);
        let s = source(cycle(1.0), Rc::clone(&b));
        let mut sim = Simulator::new();
        Source::start(&s, &mut sim).unwrap();
        sim.run_until(secs(3));
        let before = b.borrow().remaining_energy_j();
        assert!(before > 0.0);

        drop(s);
        assert_eq!(sim.pending_events(), 0);
        sim.run_until(secs(10));
        assert_eq!(b.borrow().remaining_energy_j(), before);
    }

    #[test]
    fn identical_configure_twice_is_idempotent() {
        let run = |configure_twice: bool| {
            let b = battery(500.0, 10_000.0);
            let s = source(cycle(1.0), Rc::clone(&b));
            if configure_twice {
                s.borrow_mut().configure(cycle(1.0)).unwrap();
            }
            let mut sim = Simulator::new();
            Source::start(&s, &mut sim).unwrap();
            sim.run_until(secs(47));
            let remaining = b.borrow().remaining_energy_j();
            remaining
        };
        assert_eq!(run(false), run(true));
    }
}
