//! Simulated transfer progress
//!
//! [`ProgressSimulator`] is a pure generator: every call to
//! [`advance`](ProgressSimulator::advance) adds one step and reports either the
//! new value or completion. The machine drives it from a timer. Steps are
//! strictly positive, and the tick counter caps the run at
//! `ceil(100 / min_step)` ticks, so completion never depends on the random
//! draw.

use crate::config::ProgressSchedule;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Progress value at which a download is complete
pub const COMPLETE_PERCENT: f32 = 100.0;

/// Outcome of one tick
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Tick {
    /// Still running, new progress value (always below 100)
    Progress(f32),
    /// Reached 100; the simulator stops
    Complete,
}

/// Generator of non-decreasing progress values in `[0, 100]`
#[derive(Debug)]
pub struct ProgressSimulator {
    schedule: ProgressSchedule,
    rng: StdRng,
    progress: f32,
    ticks: u32,
    max_ticks: u32,
    finished: bool,
}

impl ProgressSimulator {
    /// Create a simulator starting at 0
    ///
    /// The schedule is expected to have been validated
    /// ([`Config::validate`](crate::Config::validate)); a non-positive minimum
    /// step degrades to a single-tick run rather than looping forever.
    pub fn new(schedule: ProgressSchedule, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            schedule,
            rng,
            progress: 0.0,
            ticks: 0,
            max_ticks: max_ticks_for(schedule.min_step()),
            finished: false,
        }
    }

    /// Current progress value
    pub fn progress(&self) -> f32 {
        self.progress
    }

    /// Ticks taken so far
    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    /// Upper bound on the number of ticks until completion
    pub fn max_ticks(&self) -> u32 {
        self.max_ticks
    }

    /// Whether completion has been reported
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Take one step
    ///
    /// After completion every further call keeps returning [`Tick::Complete`]
    /// without changing the value.
    pub fn advance(&mut self) -> Tick {
        if self.finished {
            return Tick::Complete;
        }

        self.ticks += 1;
        let candidate = self.progress + self.next_step();

        if candidate >= COMPLETE_PERCENT || self.ticks >= self.max_ticks {
            self.progress = COMPLETE_PERCENT;
            self.finished = true;
            Tick::Complete
        } else {
            self.progress = candidate;
            Tick::Progress(candidate)
        }
    }

    fn next_step(&mut self) -> f32 {
        match self.schedule {
            ProgressSchedule::Fixed { step } => step.clamp(0.0, COMPLETE_PERCENT),
            ProgressSchedule::Random { min_step, max_step } => {
                // Wider ranges overflow the uniform sampler
                let low = min_step.clamp(0.0, COMPLETE_PERCENT);
                let high = max_step.clamp(0.0, COMPLETE_PERCENT);
                if high > low {
                    self.rng.gen_range(low..=high)
                } else {
                    low
                }
            }
        }
    }
}

fn max_ticks_for(min_step: f32) -> u32 {
    if min_step > 0.0 && min_step.is_finite() {
        (COMPLETE_PERCENT / min_step).ceil().clamp(1.0, u32::MAX as f32) as u32
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_to_completion(sim: &mut ProgressSimulator) -> Vec<f32> {
        let mut seen = Vec::new();
        loop {
            match sim.advance() {
                Tick::Progress(p) => seen.push(p),
                Tick::Complete => return seen,
            }
            assert!(sim.ticks() <= sim.max_ticks(), "tick cap exceeded");
        }
    }

    #[test]
    fn fixed_schedule_is_deterministic() {
        let mut sim = ProgressSimulator::new(ProgressSchedule::Fixed { step: 25.0 }, None);
        assert_eq!(sim.max_ticks(), 4);
        assert_eq!(sim.advance(), Tick::Progress(25.0));
        assert_eq!(sim.advance(), Tick::Progress(50.0));
        assert_eq!(sim.advance(), Tick::Progress(75.0));
        assert_eq!(sim.advance(), Tick::Complete);
        assert_eq!(sim.progress(), 100.0);
    }

    #[test]
    fn overshoot_is_clamped_to_exactly_100() {
        let mut sim = ProgressSimulator::new(ProgressSchedule::Fixed { step: 30.0 }, None);
        let seen = run_to_completion(&mut sim);
        assert_eq!(seen, vec![30.0, 60.0, 90.0]);
        assert_eq!(sim.progress(), 100.0);
        assert!(sim.is_finished());
    }

    #[test]
    fn random_schedule_is_monotonic_bounded_and_terminates() {
        for seed in 0..50 {
            let mut sim = ProgressSimulator::new(
                ProgressSchedule::Random {
                    min_step: 2.0,
                    max_step: 15.0,
                },
                Some(seed),
            );
            let seen = run_to_completion(&mut sim);

            let mut previous = 0.0;
            for value in &seen {
                assert!(*value > previous, "seed {}: {:?}", seed, seen);
                assert!(*value < 100.0);
                previous = *value;
            }
            assert!(sim.ticks() <= 50);
            assert_eq!(sim.progress(), 100.0);
        }
    }

    #[test]
    fn same_seed_gives_same_sequence() {
        let schedule = ProgressSchedule::Random {
            min_step: 1.0,
            max_step: 20.0,
        };
        let a = run_to_completion(&mut ProgressSimulator::new(schedule, Some(7)));
        let b = run_to_completion(&mut ProgressSimulator::new(schedule, Some(7)));
        assert_eq!(a, b);
    }

    #[test]
    fn complete_is_sticky() {
        let mut sim = ProgressSimulator::new(ProgressSchedule::Fixed { step: 100.0 }, None);
        assert_eq!(sim.advance(), Tick::Complete);
        assert_eq!(sim.advance(), Tick::Complete);
        assert_eq!(sim.ticks(), 1);
    }

    #[test]
    fn tick_cap_forces_completion() {
        // ceil(100 / 3) = 34
        let mut sim = ProgressSimulator::new(ProgressSchedule::Fixed { step: 3.0 }, None);
        assert_eq!(sim.max_ticks(), 34);
        run_to_completion(&mut sim);
        assert_eq!(sim.ticks(), 34);
    }

    #[test]
    fn unbounded_step_range_completes_without_panicking() {
        let mut sim = ProgressSimulator::new(
            ProgressSchedule::Random {
                min_step: 1.0,
                max_step: f32::MAX,
            },
            Some(3),
        );
        let seen = run_to_completion(&mut sim);
        assert!(seen.iter().all(|p| *p < COMPLETE_PERCENT));
        assert_eq!(sim.progress(), COMPLETE_PERCENT);
    }

    #[test]
    fn degenerate_step_finishes_in_one_tick() {
        let mut sim = ProgressSimulator::new(ProgressSchedule::Fixed { step: 0.0 }, None);
        assert_eq!(sim.max_ticks(), 1);
        assert_eq!(sim.advance(), Tick::Complete);
    }
}
