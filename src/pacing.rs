//! Cosmetic wall-clock pacing between slices.
//! Pacing never changes what a run produces, only how fast it narrates.

use std::sync::Arc;
use std::time::Duration;

pub trait Pacer: Send + Sync {
    /// Called once after each slice of `slice_ms` simulated milliseconds.
    fn pace(&self, slice_ms: u64);
}

/// Runs as fast as possible. The engine default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPacing;

impl Pacer for NoPacing {
    fn pace(&self, _slice_ms: u64) {}
}

/// Sleeps `slice_ms / divisor` real milliseconds per slice.
#[derive(Debug, Clone, Copy)]
pub struct ProportionalPacing {
    divisor: u64,
}

impl ProportionalPacing {
    /// A divisor of 0 is treated as 1.
    pub fn new(divisor: u64) -> Self {
        Self {
            divisor: divisor.max(1),
        }
    }

    pub fn delay_for(&self, slice_ms: u64) -> Duration {
        Duration::from_millis(slice_ms / self.divisor)
    }
}

impl Pacer for ProportionalPacing {
    fn pace(&self, slice_ms: u64) {
        let delay = self.delay_for(slice_ms);
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
}

/// Pacer for a configured divisor, where 0 disables pacing.
pub fn pacer_for_divisor(divisor: u64) -> Arc<dyn Pacer> {
    if divisor == 0 {
        Arc::new(NoPacing)
    } else {
        Arc::new(ProportionalPacing::new(divisor))
    }
}
