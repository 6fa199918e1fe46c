// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
// (none)

/// Adaptive capacity tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptiveConfig {
    /// Whether the mailbox resizes itself at all.
    pub enabled: bool,

    /// Capacity the mailbox starts with.
    pub initial_capacity: usize,

    /// Lower clamp for shrinking.
    pub min_capacity: usize,

    /// Upper clamp for growing.
    pub max_capacity: usize,

    /// Average occupancy at or above which the queue grows.
    pub grow_threshold: f64,

    /// Average occupancy at or below which the queue shrinks.
    pub shrink_threshold: f64,

    /// Multiplier applied when growing.
    pub growth_factor: f64,

    /// Multiplier applied when shrinking.
    pub shrink_factor: f64,

    /// Samples collected before a resize decision is made.
    pub min_samples: usize,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            initial_capacity: 1_000,
            min_capacity: 64,
            max_capacity: 65_536,
            grow_threshold: 0.8,
            shrink_threshold: 0.2,
            growth_factor: 2.0,
            shrink_factor: 0.5,
            min_samples: 32,
        }
    }
}

#[derive(Debug, Default)]
struct SampleWindow {
    sum: f64,
    count: usize,
}

/// Occupancy sampler deciding when to resize the queue.
///
/// After each successful enqueue the consumer-side occupancy
/// (`len / capacity`) is recorded. Once `min_samples` accumulated, the
/// average is compared against the thresholds and the capacity is scaled
/// by the matching factor, clamped into `[min_capacity, max_capacity]`.
/// The window resets after every decision.
#[derive(Debug)]
pub struct AdaptiveSizer {
    config: AdaptiveConfig,
    window: Mutex<SampleWindow>,
}

impl AdaptiveSizer {
    /// Create a sizer for the given tunables.
    pub fn new(config: AdaptiveConfig) -> Self {
        Self {
            config,
            window: Mutex::new(SampleWindow::default()),
        }
    }

    /// The configured tunables.
    pub fn config(&self) -> &AdaptiveConfig {
        &self.config
    }

    /// Record one occupancy sample; returns the new capacity when the
    /// window decided a resize.
    pub fn observe(&self, len: usize, capacity: usize) -> Option<usize> {
        if !self.config.enabled || capacity == 0 {
            return None;
        }

        let mut window = self.window.lock();
        window.sum += len as f64 / capacity as f64;
        window.count += 1;
        if window.count < self.config.min_samples.max(1) {
            return None;
        }

        let average = window.sum / window.count as f64;
        window.sum = 0.0;
        window.count = 0;
        drop(window);

        let scaled = if average >= self.config.grow_threshold {
            (capacity as f64 * self.config.growth_factor) as usize
        } else if average <= self.config.shrink_threshold {
            (capacity as f64 * self.config.shrink_factor) as usize
        } else {
            return None;
        };

        let clamped = scaled.clamp(self.config.min_capacity.max(1), self.config.max_capacity);
        if clamped == capacity {
            None
        } else {
            Some(clamped)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(min_samples: usize) -> AdaptiveConfig {
        AdaptiveConfig {
            enabled: true,
            initial_capacity: 100,
            min_capacity: 10,
            max_capacity: 400,
            grow_threshold: 0.8,
            shrink_threshold: 0.2,
            growth_factor: 2.0,
            shrink_factor: 0.5,
            min_samples,
        }
    }

    #[test]
    fn test_disabled_never_resizes() {
        let sizer = AdaptiveSizer::new(AdaptiveConfig {
            enabled: false,
            ..config(1)
        });

        assert_eq!(sizer.observe(100, 100), None);
    }

    #[test]
    fn test_no_decision_before_min_samples() {
        let sizer = AdaptiveSizer::new(config(4));

        assert_eq!(sizer.observe(100, 100), None);
        assert_eq!(sizer.observe(100, 100), None);
        assert_eq!(sizer.observe(100, 100), None);
        // Fourth sample completes the window.
        assert_eq!(sizer.observe(100, 100), Some(200));
    }

    #[test]
    fn test_high_average_grows() {
        let sizer = AdaptiveSizer::new(config(2));

        assert_eq!(sizer.observe(90, 100), None);
        assert_eq!(sizer.observe(90, 100), Some(200));
    }

    #[test]
    fn test_low_average_shrinks() {
        let sizer = AdaptiveSizer::new(config(2));

        assert_eq!(sizer.observe(5, 100), None);
        assert_eq!(sizer.observe(5, 100), Some(50));
    }

    #[test]
    fn test_middle_band_holds() {
        let sizer = AdaptiveSizer::new(config(2));

        assert_eq!(sizer.observe(50, 100), None);
        assert_eq!(sizer.observe(50, 100), None);
        // Window reset: two more mid samples, still no resize.
        assert_eq!(sizer.observe(50, 100), None);
        assert_eq!(sizer.observe(50, 100), None);
    }

    #[test]
    fn test_growth_clamped_to_max() {
        let sizer = AdaptiveSizer::new(config(1));

        assert_eq!(sizer.observe(380, 400), None); // already at max
    }

    #[test]
    fn test_shrink_clamped_to_min() {
        let sizer = AdaptiveSizer::new(config(1));

        assert_eq!(sizer.observe(0, 15), Some(10));
        assert_eq!(sizer.observe(0, 10), None); // already at min
    }

    #[test]
    fn test_window_resets_after_decision() {
        let sizer = AdaptiveSizer::new(config(2));

        assert_eq!(sizer.observe(90, 100), None);
        assert_eq!(sizer.observe(90, 100), Some(200));
        // A fresh window: one high sample alone decides nothing.
        assert_eq!(sizer.observe(190, 200), None);
    }
}
