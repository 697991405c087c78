/// Exponential lag filter for scroll scrubbing, stepped once per animation
/// frame. `lag_frames` is the device profile's smoothing factor: 1 passes
/// the target straight through, larger values trade latency for smoothness.
#[derive(Debug, Clone)]
pub struct ScrubFilter {
    lag_frames: f64,
    current: Option<f64>,
}

impl ScrubFilter {
    pub fn new(lag_frames: f64) -> Self {
        Self {
            lag_frames: lag_frames.max(1.0),
            current: None,
        }
    }

    /// Snap to the target on the next sample, discarding accumulated lag.
    pub fn reset(&mut self) {
        self.current = None;
    }

    pub fn sample(&mut self, target: f64) -> f64 {
        let next = match self.current {
            None => target,
            Some(current) => current + (target - current) / self.lag_frames,
        };
        self.current = Some(next);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unity_lag_is_passthrough() {
        let mut filter = ScrubFilter::new(1.0);
        assert_eq!(filter.sample(0.25), 0.25);
        assert_eq!(filter.sample(0.8), 0.8);
    }

    #[test]
    fn first_sample_snaps_to_target() {
        let mut filter = ScrubFilter::new(4.0);
        assert_eq!(filter.sample(0.5), 0.5);
    }

    #[test]
    fn lagged_samples_converge_monotonically() {
        let mut filter = ScrubFilter::new(4.0);
        filter.sample(0.0);

        let mut previous = 0.0;
        for _ in 0..40 {
            let value = filter.sample(1.0);
            assert!(value > previous);
            assert!(value <= 1.0);
            previous = value;
        }
        assert!((previous - 1.0).abs() < 1e-3);
    }

    #[test]
    fn reset_discards_lag() {
        let mut filter = ScrubFilter::new(8.0);
        filter.sample(0.0);
        filter.sample(1.0);
        filter.reset();
        assert_eq!(filter.sample(1.0), 1.0);
    }

    #[test]
    fn sub_unity_lag_is_clamped() {
        let mut filter = ScrubFilter::new(0.25);
        filter.sample(0.0);
        // A lag below 1 would overshoot; it must behave as passthrough.
        assert_eq!(filter.sample(1.0), 1.0);
    }
}
