//! Throughput of control steps.
use crate::record::{Record, RecordValue};
use std::time::{Duration, Instant};

/// Key of the total number of steps.
pub const TOTAL_EVAL_STEPS: &str = "step_stats/total_eval_steps";

/// Key of the steps per minute since the last emission.
pub const EVAL_STEPS_PER_MINUTE: &str = "step_stats/eval_steps_per_minute";

/// Key of the accumulated wall time in minutes.
pub const TOTAL_TIME_ELAPSED: &str = "total_time_elapsed";

/// Counts control steps and derives steps per minute.
///
/// The clock starts at the first step. Statistics are due once `interval`
/// has passed since the clock started or since the last emission.
#[derive(Debug)]
pub(crate) struct StepCounter {
    interval: Option<Duration>,
    total_steps: u64,
    steps_since_last_log: u64,
    time_elapsed: f64,
    last_log_time: Option<Instant>,
}

impl StepCounter {
    pub(crate) fn new(interval: Option<Duration>) -> Self {
        Self {
            interval,
            total_steps: 0,
            steps_since_last_log: 0,
            time_elapsed: 0.0,
            last_log_time: None,
        }
    }

    pub(crate) fn total_steps(&self) -> u64 {
        self.total_steps
    }

    /// Counts a step finished at `now` and returns statistics if they are due.
    pub(crate) fn step(&mut self, now: Instant) -> Option<Record> {
        self.total_steps += 1;
        let last = match self.last_log_time {
            None => {
                self.last_log_time = Some(now);
                return None;
            }
            Some(last) => last,
        };
        self.steps_since_last_log += 1;

        match self.interval {
            Some(interval) if now.saturating_duration_since(last) >= interval => self.stats(now),
            _ => None,
        }
    }

    /// Computes statistics at `now` and restarts the window.
    ///
    /// Returns `None` and starts the clock if no step has been counted yet.
    pub(crate) fn stats(&mut self, now: Instant) -> Option<Record> {
        let last = match self.last_log_time {
            None => {
                self.last_log_time = Some(now);
                return None;
            }
            Some(last) => last,
        };
        let minutes_elapsed = now.saturating_duration_since(last).as_secs_f64() / 60.0;
        self.time_elapsed += minutes_elapsed;
        let steps_per_minute = if minutes_elapsed > 0.0 {
            self.steps_since_last_log as f64 / minutes_elapsed
        } else {
            0.0
        };

        self.last_log_time = Some(now);
        self.steps_since_last_log = 0;

        Some(Record::from_slice(&[
            (TOTAL_EVAL_STEPS, RecordValue::Scalar(self.total_steps as f32)),
            (EVAL_STEPS_PER_MINUTE, RecordValue::Scalar(steps_per_minute as f32)),
            (TOTAL_TIME_ELAPSED, RecordValue::Scalar(self.time_elapsed as f32)),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throughput_over_one_minute() {
        let t0 = Instant::now();
        let mut counter = StepCounter::new(Some(Duration::from_secs(60)));

        assert!(counter.step(t0).is_none());
        let mut emitted = vec![];
        for k in 1..=20u64 {
            if let Some(record) = counter.step(t0 + Duration::from_secs(6 * k)) {
                emitted.push((k, record));
            }
        }

        assert_eq!(emitted.len(), 2);
        let (k, record) = &emitted[0];
        assert_eq!(*k, 10);
        assert!((record.get_scalar(EVAL_STEPS_PER_MINUTE).unwrap() - 10.0).abs() < 1e-3);
        assert_eq!(record.get_scalar(TOTAL_EVAL_STEPS).unwrap(), 11.0);
        assert!((record.get_scalar(TOTAL_TIME_ELAPSED).unwrap() - 1.0).abs() < 1e-6);

        let (_, record) = &emitted[1];
        assert!((record.get_scalar(TOTAL_TIME_ELAPSED).unwrap() - 2.0).abs() < 1e-6);
        assert_eq!(counter.total_steps(), 21);
    }

    #[test]
    fn test_no_interval_never_emits() {
        let t0 = Instant::now();
        let mut counter = StepCounter::new(None);
        for k in 0..100u64 {
            assert!(counter.step(t0 + Duration::from_secs(k * 60)).is_none());
        }
        let record = counter.stats(t0 + Duration::from_secs(100 * 60)).unwrap();
        // 99 steps after the clock started, over 100 minutes
        assert!((record.get_scalar(EVAL_STEPS_PER_MINUTE).unwrap() - 0.99).abs() < 1e-4);
    }

    #[test]
    fn test_stats_before_any_step_start_the_clock() {
        let mut counter = StepCounter::new(None);
        assert!(counter.stats(Instant::now()).is_none());
    }
}
