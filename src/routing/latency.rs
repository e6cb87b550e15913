//! Observed generation latency per method.
//!
//! Estimates start at [`GenerationMethod::estimated_duration`]. The first
//! successful attempt replaces the static value; later ones are blended
//! in at a fixed weight.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;

use crate::types::GenerationMethod;

/// Weight of a new sample, in tenths.
const SAMPLE_WEIGHT: u128 = 3;

/// Smoothed latency for one method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MethodLatencyStats {
    pub average: Duration,
    pub samples: u64,
}

impl MethodLatencyStats {
    fn first(sample: Duration) -> Self {
        Self {
            average: sample,
            samples: 1,
        }
    }

    fn blend(&mut self, sample: Duration) {
        let weighted = self.average.as_micros() * (10 - SAMPLE_WEIGHT)
            + sample.as_micros() * SAMPLE_WEIGHT;
        let micros = u64::try_from(weighted / 10).unwrap_or(u64::MAX);
        self.average = Duration::from_micros(micros);
        self.samples = self.samples.saturating_add(1);
    }
}

/// Latency observed per method, written by the conductor after each
/// successful attempt and read by the router when it fills in
/// [`Strategy::estimated_duration`](crate::Strategy::estimated_duration).
#[derive(Debug, Default)]
pub struct LatencyTable {
    observed: Mutex<HashMap<GenerationMethod, MethodLatencyStats>>,
}

impl LatencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<GenerationMethod, MethodLatencyStats>> {
        self.observed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record(&self, method: GenerationMethod, elapsed: Duration) {
        self.lock()
            .entry(method)
            .and_modify(|stats| stats.blend(elapsed))
            .or_insert_with(|| MethodLatencyStats::first(elapsed));
    }

    /// Observed stats, or `None` before the first successful attempt.
    pub fn stats(&self, method: GenerationMethod) -> Option<MethodLatencyStats> {
        self.lock().get(&method).copied()
    }

    /// Observed average, else the method's static estimate.
    pub fn estimate(&self, method: GenerationMethod) -> Duration {
        self.stats(method)
            .map_or_else(|| method.estimated_duration(), |stats| stats.average)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unobserved_method_uses_static_estimate() {
        let table = LatencyTable::new();
        assert!(table.stats(GenerationMethod::Mermaid).is_none());
        assert_eq!(
            table.estimate(GenerationMethod::Mermaid),
            Duration::from_millis(500)
        );
    }

    #[test]
    fn first_sample_replaces_static_estimate() {
        let table = LatencyTable::new();
        table.record(GenerationMethod::Mermaid, Duration::from_millis(40));
        assert_eq!(
            table.estimate(GenerationMethod::Mermaid),
            Duration::from_millis(40)
        );
    }

    #[test]
    fn later_samples_are_blended() {
        let table = LatencyTable::new();
        table.record(GenerationMethod::SvgTemplate, Duration::from_millis(100));
        table.record(GenerationMethod::SvgTemplate, Duration::from_millis(200));
        assert_eq!(
            table.stats(GenerationMethod::SvgTemplate),
            Some(MethodLatencyStats {
                average: Duration::from_millis(130),
                samples: 2,
            })
        );
        // Other methods are unaffected.
        assert!(table.stats(GenerationMethod::PythonChart).is_none());
    }
}
