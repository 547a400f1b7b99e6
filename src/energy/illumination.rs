//! Illumination / eclipse state machine for orbital harvesting.

use std::fmt;
use std::time::Duration;

/// Phase of the light/shadow cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Illuminated,
    Eclipsed,
}

impl Phase {
    /// The phase that follows this one.
    pub fn toggled(self) -> Self {
        match self {
            Self::Illuminated => Self::Eclipsed,
            Self::Eclipsed => Self::Illuminated,
        }
    }

    pub fn is_illuminated(self) -> bool {
        self == Self::Illuminated
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Illuminated => write!(f, "illuminated"),
            Self::Eclipsed => write!(f, "eclipsed"),
        }
    }
}

/// Binary state machine alternating between [`Phase::Illuminated`] and
/// [`Phase::Eclipsed`] on fixed durations.
///
/// The machine does not schedule anything itself: the owner calls
/// [`advance_to`](Self::advance_to) with the current time, which applies every
/// transition due at or before that instant. A toggle due at `t` is therefore
/// visible to any observer evaluating at `t`, whatever order the observer and
/// the toggle callback were scheduled in.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use harvest_sim::energy::illumination::{IlluminationState, Phase};
///
/// let mut state = IlluminationState::new(
///     Duration::from_secs(10),
///     Duration::from_secs(5),
///     Duration::ZERO,
/// );
/// assert_eq!(state.phase(), Phase::Illuminated);
/// state.advance_to(Duration::from_secs(12));
/// assert_eq!(state.phase(), Phase::Eclipsed);
/// assert_eq!(state.next_toggle(), Duration::from_secs(15));
/// ```
#[derive(Debug, Clone)]
pub struct IlluminationState {
    phase: Phase,
    illumination: Duration,
    eclipse: Duration,
    /// Absolute time of the next phase change.
    next_toggle: Duration,
    toggles: u64,
}

impl IlluminationState {
    /// Creates a machine entering [`Phase::Illuminated`] at `start`.
    ///
    /// # Panics
    ///
    /// Panics if either duration is zero.
    pub fn new(illumination: Duration, eclipse: Duration, start: Duration) -> Self {
        assert!(!illumination.is_zero(), "illumination duration must be > 0");
        assert!(!eclipse.is_zero(), "eclipse duration must be > 0");
        Self {
            phase: Phase::Illuminated,
            illumination,
            eclipse,
            next_toggle: start.saturating_add(illumination),
            toggles: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_illuminated(&self) -> bool {
        self.phase.is_illuminated()
    }

    /// Absolute time of the next transition.
    pub fn next_toggle(&self) -> Duration {
        self.next_toggle
    }

    /// Total number of transitions applied so far.
    pub fn toggles(&self) -> u64 {
        self.toggles
    }

    fn duration_of(&self, phase: Phase) -> Duration {
        match phase {
            Phase::Illuminated => self.illumination,
            Phase::Eclipsed => self.eclipse,
        }
    }

    /// Applies every transition due at or before `now`.
    ///
    /// # Returns
    ///
    /// The number of transitions applied (0 if the phase is unchanged).
    pub fn advance_to(&mut self, now: Duration) -> u32 {
        let mut applied = 0;
        while now >= self.next_toggle && self.next_toggle != Duration::MAX {
            self.phase = self.phase.toggled();
            self.next_toggle = self
                .next_toggle
                .saturating_add(self.duration_of(self.phase));
            self.toggles += 1;
            applied += 1;
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> IlluminationState {
        IlluminationState::new(Duration::from_secs(10), Duration::from_secs(5), Duration::ZERO)
    }

    #[test]
    fn starts_illuminated() {
        let s = state();
        assert!(s.is_illuminated());
        assert_eq!(s.next_toggle(), Duration::from_secs(10));
        assert_eq!(s.toggles(), 0);
    }

    #[test]
    fn no_transition_before_due_time() {
        let mut s = state();
        assert_eq!(s.advance_to(Duration::from_millis(9999)), 0);
        assert!(s.is_illuminated());
    }

    #[test]
    fn transition_applies_exactly_at_due_time() {
        let mut s = state();
        assert_eq!(s.advance_to(Duration::from_secs(10)), 1);
        assert_eq!(s.phase(), Phase::Eclipsed);
        assert_eq!(s.next_toggle(), Duration::from_secs(15));
    }

    #[test]
    fn catches_up_over_several_phases() {
        let mut s = state();
        // 10 -> eclipse, 15 -> lit, 25 -> eclipse, 30 -> lit
        assert_eq!(s.advance_to(Duration::from_secs(31)), 4);
        assert!(s.is_illuminated());
        assert_eq!(s.next_toggle(), Duration::from_secs(40));
    }

    #[test]
    fn advance_is_idempotent_for_same_instant() {
        let mut s = state();
        s.advance_to(Duration::from_secs(15));
        assert_eq!(s.advance_to(Duration::from_secs(15)), 0);
        assert!(s.is_illuminated());
        assert_eq!(s.toggles(), 2);
    }

    #[test]
    #[should_panic]
    fn zero_eclipse_panics() {
        IlluminationState::new(Duration::from_secs(1), Duration::ZERO, Duration::ZERO);
    }

    #[test]
    fn phase_display() {
        assert_eq!(Phase::Illuminated.to_string(), "illuminated");
        assert_eq!(Phase::Eclipsed.toggled(), Phase::Illuminated);
    }
}
