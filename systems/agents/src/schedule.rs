//! Cancelable periodic work driven by explicit time steps.

use std::time::Duration;

/// Fixed-interval task that reports how many times it fired per tick.
///
/// A stopped task never fires and forgets any accumulated time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeriodicTask {
    interval: Duration,
    fire_on_start: bool,
    accumulator: Duration,
    pending_start_fire: bool,
    running: bool,
}

impl PeriodicTask {
    /// Creates a stopped task whose first fire happens one interval after start.
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            fire_on_start: false,
            accumulator: Duration::ZERO,
            pending_start_fire: false,
            running: false,
        }
    }

    /// Makes the task fire once on the first tick after it starts.
    #[must_use]
    pub const fn firing_on_start(mut self) -> Self {
        self.fire_on_start = true;
        self
    }

    /// Interval between fires.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether the task is currently scheduled.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Schedules the task. Starting a running task has no effect.
    pub fn start(&mut self) {
        if self.running {
            return;
        }

        self.running = true;
        self.accumulator = Duration::ZERO;
        self.pending_start_fire = self.fire_on_start;
    }

    /// Cancels the task and discards accumulated time.
    pub fn stop(&mut self) {
        self.running = false;
        self.accumulator = Duration::ZERO;
        self.pending_start_fire = false;
    }

    /// Advances the task clock and returns the number of fires due.
    ///
    /// A zero interval never fires on its own.
    pub fn advance(&mut self, dt: Duration) -> u32 {
        if !self.running {
            return 0;
        }

        let mut fires = 0;
        if self.pending_start_fire {
            self.pending_start_fire = false;
            fires += 1;
        }

        if self.interval.is_zero() {
            return fires;
        }

        self.accumulator = self.accumulator.saturating_add(dt);
        while self.accumulator >= self.interval {
            self.accumulator -= self.interval;
            fires += 1;
        }
        fires
    }
}

/// Repeating sequence of timed phases.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhaseCycle<P> {
    phases: Vec<(P, Duration)>,
    index: usize,
    elapsed: Duration,
    running: bool,
}

impl<P: Copy> PhaseCycle<P> {
    /// Creates a stopped cycle over the provided phases.
    #[must_use]
    pub fn new(phases: Vec<(P, Duration)>) -> Self {
        Self {
            phases,
            index: 0,
            elapsed: Duration::ZERO,
            running: false,
        }
    }

    /// Reports whether every phase has a non-zero duration.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        !self.phases.is_empty() && self.phases.iter().all(|(_, duration)| !duration.is_zero())
    }

    /// Whether the cycle is currently running.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Phase the cycle is in, or `None` when stopped or empty.
    #[must_use]
    pub fn current(&self) -> Option<P> {
        if !self.running {
            return None;
        }
        self.phases.get(self.index).map(|(phase, _)| *phase)
    }

    /// Restarts the cycle at its first phase. Starting a running cycle has no
    /// effect.
    pub fn start(&mut self) {
        if self.running {
            return;
        }

        self.running = true;
        self.index = 0;
        self.elapsed = Duration::ZERO;
    }

    /// Stops the cycle and rewinds it to the first phase.
    pub fn stop(&mut self) {
        self.running = false;
        self.index = 0;
        self.elapsed = Duration::ZERO;
    }

    /// Advances the cycle and returns the phase entered last, if any changed.
    pub fn advance(&mut self, dt: Duration) -> Option<P> {
        if !self.running || self.phases.is_empty() {
            return None;
        }

        self.elapsed = self.elapsed.saturating_add(dt);
        let mut entered = None;
        loop {
            let (_, duration) = self.phases[self.index];
            if duration.is_zero() || self.elapsed < duration {
                break;
            }

            self.elapsed -= duration;
            self.index = (self.index + 1) % self.phases.len();
            entered = Some(self.phases[self.index].0);
        }
        entered
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{PeriodicTask, PhaseCycle};

    const TICK: Duration = Duration::from_millis(100);

    #[test]
    fn stopped_task_never_fires() {
        let mut task = PeriodicTask::new(Duration::from_millis(200));
        assert_eq!(task.advance(Duration::from_secs(5)), 0);
        assert!(!task.is_running());
    }

    #[test]
    fn task_fires_once_per_elapsed_interval() {
        let mut task = PeriodicTask::new(Duration::from_millis(200));
        task.start();

        assert_eq!(task.advance(TICK), 0);
        assert_eq!(task.advance(TICK), 1);
        assert_eq!(task.advance(Duration::from_millis(650)), 3);
        assert_eq!(task.advance(Duration::from_millis(150)), 1);
    }

    #[test]
    fn start_fire_happens_on_first_tick_only() {
        let mut task = PeriodicTask::new(Duration::from_millis(300)).firing_on_start();
        task.start();

        assert_eq!(task.advance(Duration::ZERO), 1);
        assert_eq!(task.advance(TICK), 0);
        assert_eq!(task.advance(Duration::from_millis(200)), 1);
    }

    #[test]
    fn stop_discards_accumulated_time() {
        let mut task = PeriodicTask::new(Duration::from_millis(200));
        task.start();
        assert_eq!(task.advance(Duration::from_millis(150)), 0);

        task.stop();
        assert_eq!(task.advance(Duration::from_millis(150)), 0);

        task.start();
        assert_eq!(task.advance(Duration::from_millis(150)), 0);
        assert_eq!(task.advance(Duration::from_millis(50)), 1);
    }

    #[test]
    fn zero_interval_task_does_not_spin() {
        let mut task = PeriodicTask::new(Duration::ZERO).firing_on_start();
        task.start();
        assert_eq!(task.advance(Duration::from_secs(1)), 1);
        assert_eq!(task.advance(Duration::from_secs(1)), 0);
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum Light {
        Red,
        Green,
    }

    fn traffic_light() -> PhaseCycle<Light> {
        PhaseCycle::new(vec![
            (Light::Red, Duration::from_secs(3)),
            (Light::Green, Duration::from_secs(1)),
        ])
    }

    #[test]
    fn cycle_reports_entered_phases() {
        let mut cycle = traffic_light();
        assert_eq!(cycle.current(), None);

        cycle.start();
        assert_eq!(cycle.current(), Some(Light::Red));
        assert_eq!(cycle.advance(Duration::from_millis(2900)), None);
        assert_eq!(cycle.advance(TICK), Some(Light::Green));
        assert_eq!(cycle.advance(Duration::from_secs(1)), Some(Light::Red));
        assert_eq!(cycle.current(), Some(Light::Red));
    }

    #[test]
    fn cycle_wraps_across_multiple_phases_in_one_step() {
        let mut cycle = traffic_light();
        cycle.start();

        assert_eq!(cycle.advance(Duration::from_millis(4500)), Some(Light::Red));
        assert_eq!(cycle.advance(Duration::from_millis(2500)), Some(Light::Green));
    }

    #[test]
    fn stopped_cycle_rewinds() {
        let mut cycle = traffic_light();
        cycle.start();
        let _ = cycle.advance(Duration::from_secs(3));
        assert_eq!(cycle.current(), Some(Light::Green));

        cycle.stop();
        assert_eq!(cycle.current(), None);
        assert_eq!(cycle.advance(Duration::from_secs(10)), None);

        cycle.start();
        assert_eq!(cycle.current(), Some(Light::Red));
    }

    #[test]
    fn well_formedness_requires_positive_durations() {
        assert!(traffic_light().is_well_formed());
        assert!(!PhaseCycle::<Light>::new(Vec::new()).is_well_formed());
        assert!(!PhaseCycle::new(vec![(Light::Red, Duration::ZERO)]).is_well_formed());
    }
}
