use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::debug;

#[derive(Debug, Clone)]
pub struct StepTiming {
    pub name: String,
    pub duration: Duration,
}

/// Durations of the steps of one render call, in execution order.
#[derive(Debug, Default)]
pub struct RenderTimings {
    steps: Vec<StepTiming>,
    step_map: HashMap<String, Duration>,
}

impl RenderTimings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_step(&mut self, name: impl Into<String>, duration: Duration) {
        let name = name.into();
        *self.step_map.entry(name.clone()).or_insert(Duration::ZERO) += duration;
        self.steps.push(StepTiming { name, duration });
    }

    pub fn record(&mut self, timer: Timer) {
        let (name, duration) = timer.stop();
        self.add_step(name, duration);
    }

    pub fn total_duration(&self) -> Duration {
        self.steps.iter().map(|s| s.duration).sum()
    }

    /// Summed duration of every step recorded under `name`.
    pub fn get_step(&self, name: &str) -> Option<Duration> {
        self.step_map.get(name).copied()
    }

    pub fn steps(&self) -> &[StepTiming] {
        &self.steps
    }

    /// One `(name, count, total)` row per distinct step, in first-run order.
    pub fn summary(&self) -> Vec<(&str, usize, Duration)> {
        let mut rows: Vec<(&str, usize, Duration)> = Vec::new();
        for step in &self.steps {
            match rows.iter().position(|(name, _, _)| *name == step.name) {
                Some(i) => {
                    rows[i].1 += 1;
                    rows[i].2 += step.duration;
                }
                None => rows.push((step.name.as_str(), 1, step.duration)),
            }
        }
        rows
    }

    pub fn log_summary(&self) {
        for (name, count, total) in self.summary() {
            debug!(step = name, runs = count, elapsed_us = total.as_micros() as u64, "Render step");
        }
        debug!(
            steps = self.steps.len(),
            elapsed_us = self.total_duration().as_micros() as u64,
            "Render timings"
        );
    }
}

pub struct Timer {
    start: Instant,
    name: String,
}

impl Timer {
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    pub fn stop(self) -> (String, Duration) {
        (self.name, self.start.elapsed())
    }
}
