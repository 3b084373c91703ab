use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

/// Semantic action resolved from one gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TapAction {
    SingleTap,
    DoubleTap,
}

/// What the owner must do after feeding a pulse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseOutcome {
    /// Fire the double-tap action now
    DoubleTap,
    /// Arm the single-tap timer for `deadline`, tagged with `generation`
    ArmSingleTap { deadline: Instant, generation: u64 },
}

/// Single/double tap disambiguation.
///
/// A lone pulse resolves as a single tap only once the window has passed
/// without a second pulse, so single taps are always delayed by the window.
/// The owner drives the timer; this type only tracks the last tap and which
/// timer generation is current, so a stale timer can never fire.
#[derive(Debug)]
pub struct TapDisambiguator {
    window: Duration,
    last_tap: Option<Instant>,
    armed_generation: Option<u64>,
    next_generation: u64,
}

impl TapDisambiguator {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_tap: None,
            armed_generation: None,
            next_generation: 0,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Whether a single-tap timer is pending
    pub fn is_armed(&self) -> bool {
        self.armed_generation.is_some()
    }

    pub fn pulse(&mut self, now: Instant) -> PulseOutcome {
        // Any pending single tap is superseded by this pulse
        self.armed_generation = None;

        if let Some(last) = self.last_tap {
            if now.saturating_duration_since(last) < self.window {
                self.last_tap = None;
                return PulseOutcome::DoubleTap;
            }
        }

        self.last_tap = Some(now);
        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);
        self.armed_generation = Some(generation);

        PulseOutcome::ArmSingleTap {
            deadline: now + self.window,
            generation,
        }
    }

    /// Resolve a pending single tap whose window closed at or before `now`.
    ///
    /// Call before `pulse` when pulses can arrive after their timer should
    /// already have fired (a backed-up queue), so the earlier gesture still
    /// produces its action.
    pub fn take_overdue(&mut self, now: Instant) -> Option<TapAction> {
        let last = self.last_tap?;
        if self.armed_generation.is_none() || now.saturating_duration_since(last) < self.window {
            return None;
        }
        self.armed_generation = None;
        self.last_tap = None;
        Some(TapAction::SingleTap)
    }

    /// The timer for `generation` fired. Returns the action when it is
    /// still the armed timer.
    pub fn timer_fired(&mut self, generation: u64) -> Option<TapAction> {
        if self.armed_generation != Some(generation) {
            return None;
        }
        self.armed_generation = None;
        self.last_tap = None;
        Some(TapAction::SingleTap)
    }

    /// Drop the pending timer and the last tap
    pub fn reset(&mut self) {
        self.armed_generation = None;
        self.last_tap = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(300);

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_quick_pair_is_double_tap() {
        let t0 = Instant::now();
        let mut d = TapDisambiguator::new(WINDOW);

        let first = d.pulse(t0);
        let PulseOutcome::ArmSingleTap { generation, deadline } = first else {
            panic!("first pulse should arm the timer");
        };
        assert_eq!(deadline, t0 + WINDOW);

        assert_eq!(d.pulse(t0 + ms(150)), PulseOutcome::DoubleTap);
        assert!(!d.is_armed());
        // The superseded timer is ignored
        assert_eq!(d.timer_fired(generation), None);
    }

    #[test]
    fn test_lone_pulse_is_single_tap() {
        let t0 = Instant::now();
        let mut d = TapDisambiguator::new(WINDOW);

        let PulseOutcome::ArmSingleTap { generation, .. } = d.pulse(t0) else {
            panic!("expected timer");
        };
        assert_eq!(d.timer_fired(generation), Some(TapAction::SingleTap));
        assert_eq!(d.timer_fired(generation), None);
    }

    #[test]
    fn test_slow_pair_is_two_single_taps() {
        let t0 = Instant::now();
        let mut d = TapDisambiguator::new(WINDOW);

        let PulseOutcome::ArmSingleTap { generation: g1, .. } = d.pulse(t0) else {
            panic!("expected timer");
        };
        assert_eq!(d.timer_fired(g1), Some(TapAction::SingleTap));

        let PulseOutcome::ArmSingleTap { generation: g2, .. } = d.pulse(t0 + ms(400)) else {
            panic!("expected timer");
        };
        assert_ne!(g1, g2);
        assert_eq!(d.timer_fired(g2), Some(TapAction::SingleTap));
    }

    #[test]
    fn test_window_boundary_is_not_double() {
        let t0 = Instant::now();
        let mut d = TapDisambiguator::new(WINDOW);
        d.pulse(t0);
        assert!(matches!(d.pulse(t0 + WINDOW), PulseOutcome::ArmSingleTap { .. }));
    }

    #[test]
    fn test_three_pulses() {
        let t0 = Instant::now();
        let mut d = TapDisambiguator::new(WINDOW);

        d.pulse(t0);
        assert_eq!(d.pulse(t0 + ms(100)), PulseOutcome::DoubleTap);
        let PulseOutcome::ArmSingleTap { deadline, generation } = d.pulse(t0 + ms(450)) else {
            panic!("third pulse starts a fresh gesture");
        };
        assert_eq!(deadline, t0 + ms(750));
        assert_eq!(d.timer_fired(generation), Some(TapAction::SingleTap));
    }

    #[test]
    fn test_late_pulse_resolves_overdue_single_tap() {
        let t0 = Instant::now();
        let mut d = TapDisambiguator::new(WINDOW);

        let PulseOutcome::ArmSingleTap { generation, .. } = d.pulse(t0) else {
            panic!("expected timer");
        };
        assert_eq!(d.take_overdue(t0 + ms(299)), None);
        assert_eq!(d.take_overdue(t0 + ms(350)), Some(TapAction::SingleTap));
        assert_eq!(d.timer_fired(generation), None);

        // The late pulse then starts its own gesture
        assert!(matches!(d.pulse(t0 + ms(350)), PulseOutcome::ArmSingleTap { .. }));
    }

    #[test]
    fn test_nothing_overdue_after_double_tap() {
        let t0 = Instant::now();
        let mut d = TapDisambiguator::new(WINDOW);
        d.pulse(t0);
        assert_eq!(d.pulse(t0 + ms(100)), PulseOutcome::DoubleTap);
        assert_eq!(d.take_overdue(t0 + ms(900)), None);
    }

    #[test]
    fn test_reset_disarms() {
        let t0 = Instant::now();
        let mut d = TapDisambiguator::new(WINDOW);

        let PulseOutcome::ArmSingleTap { generation, .. } = d.pulse(t0) else {
            panic!("expected timer");
        };
        d.reset();
        assert_eq!(d.timer_fired(generation), None);
        // No memory of the earlier tap either
        assert!(matches!(d.pulse(t0 + ms(50)), PulseOutcome::ArmSingleTap { .. }));
    }
}
