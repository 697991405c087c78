use crate::EngineError;

const AFTER_MEDIA_THRESHOLD: f64 = 0.99;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryCrossing {
    Entered,
    Exited,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineSample {
    pub progress: f64,
    pub crossing: Option<BoundaryCrossing>,
}

/// Maps page scroll position to a normalized [0, 1] progress value for one
/// pinned container, and reports crossings of the near-end boundary so the
/// caller can fire its after-media hook once per direction.
#[derive(Debug, Clone)]
pub struct ScrollTimeline {
    container_top: f64,
    viewport_height: f64,
    extra_scroll: f64,
    threshold: f64,
    past_boundary: bool,
}

impl ScrollTimeline {
    pub fn new(extra_scroll: f64) -> Result<Self, EngineError> {
        if !extra_scroll.is_finite() || extra_scroll <= 0.0 {
            return Err(EngineError::NonPositiveSpan(extra_scroll));
        }
        Ok(Self {
            container_top: 0.0,
            viewport_height: 0.0,
            extra_scroll,
            threshold: AFTER_MEDIA_THRESHOLD,
            past_boundary: false,
        })
    }

    pub fn set_geometry(&mut self, container_top: f64, viewport_height: f64) {
        self.container_top = container_top;
        self.viewport_height = viewport_height;
    }

    pub fn extra_scroll(&self) -> f64 {
        self.extra_scroll
    }

    /// Height the pinned container must be given so the page exposes
    /// `extra_scroll` pixels of travel while the media stays on screen.
    pub fn pinned_height(&self) -> f64 {
        self.viewport_height + self.extra_scroll
    }

    pub fn progress(&self, scroll_y: f64) -> f64 {
        ((scroll_y - self.container_top) / self.extra_scroll).clamp(0.0, 1.0)
    }

    pub fn sample(&mut self, scroll_y: f64) -> TimelineSample {
        let progress = self.progress(scroll_y);
        let past = progress >= self.threshold;
        let crossing = match (self.past_boundary, past) {
            (false, true) => Some(BoundaryCrossing::Entered),
            (true, false) => Some(BoundaryCrossing::Exited),
            _ => None,
        };
        self.past_boundary = past;
        TimelineSample { progress, crossing }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_overscroll_both_directions() {
        let mut timeline = ScrollTimeline::new(3000.0).unwrap();
        timeline.set_geometry(500.0, 2000.0);

        assert_eq!(timeline.progress(-10_000.0), 0.0);
        assert_eq!(timeline.progress(0.0), 0.0);
        assert_eq!(timeline.progress(500.0), 0.0);
        assert_eq!(timeline.progress(2000.0), 0.5);
        assert_eq!(timeline.progress(3500.0), 1.0);
        assert_eq!(timeline.progress(50_000.0), 1.0);
    }

    #[test]
    fn midpoint_scenario() {
        // 2000px viewport, 3000px extra scroll: half the extra distance in.
        let mut timeline = ScrollTimeline::new(3000.0).unwrap();
        timeline.set_geometry(0.0, 2000.0);
        assert_eq!(timeline.pinned_height(), 5000.0);
        assert_eq!(timeline.progress(1500.0), 0.5);
    }

    #[test]
    fn boundary_fires_once_per_direction() {
        let mut timeline = ScrollTimeline::new(1000.0).unwrap();
        timeline.set_geometry(0.0, 800.0);

        assert_eq!(timeline.sample(500.0).crossing, None);
        let entered = timeline.sample(995.0);
        assert_eq!(entered.crossing, Some(BoundaryCrossing::Entered));
        // Still past the boundary: no repeat edge.
        assert_eq!(timeline.sample(1000.0).crossing, None);
        assert_eq!(timeline.sample(2000.0).crossing, None);

        let exited = timeline.sample(900.0);
        assert_eq!(exited.crossing, Some(BoundaryCrossing::Exited));
        assert_eq!(timeline.sample(100.0).crossing, None);

        // Crossing again re-fires.
        assert_eq!(
            timeline.sample(999.0).crossing,
            Some(BoundaryCrossing::Entered)
        );
    }

    #[test]
    fn rejects_non_positive_span() {
        assert!(ScrollTimeline::new(0.0).is_err());
        assert!(ScrollTimeline::new(-5.0).is_err());
    }
}
