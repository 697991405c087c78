use profiles::DeviceProfile;

// The time ramp alone never claims completion; the last stretch needs a real
// readiness signal or the hard timeout.
const RAMP_CEILING: f64 = 95.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaugeSample {
    /// Displayed progress in [0, 100], monotonically non-decreasing.
    pub value: f64,
    /// True on exactly one sample, after 100 was reached and the grace
    /// period elapsed.
    pub finished: bool,
}

/// Synthetic load progress: the max of a time-based ramp and the best real
/// readiness signal seen so far. Buffered-range reports regress on some
/// browsers; the emitted value never does. A hard timeout bounds the wait
/// even if no readiness signal ever fires.
#[derive(Debug, Clone)]
pub struct LoadGauge {
    started_at: f64,
    ramp_ms: f64,
    timeout_ms: f64,
    grace_ms: f64,
    emitted: f64,
    readiness: f64,
    full_since: Option<f64>,
    finish_fired: bool,
}

impl LoadGauge {
    pub fn new(profile: &DeviceProfile, now_ms: f64) -> Self {
        Self {
            started_at: now_ms,
            ramp_ms: profile.preload_ramp.as_secs_f64() * 1000.0,
            timeout_ms: profile.preload_timeout.as_secs_f64() * 1000.0,
            grace_ms: profile.preload_grace.as_secs_f64() * 1000.0,
            emitted: 0.0,
            readiness: 0.0,
            full_since: None,
            finish_fired: false,
        }
    }

    /// Report the buffered fraction of the media, in [0, 1]. Out-of-range
    /// and stale (lower) reports are absorbed.
    pub fn report_buffered(&mut self, ratio: f64) {
        let scaled = (ratio.clamp(0.0, 1.0)) * 100.0;
        if scaled > self.readiness {
            self.readiness = scaled;
        }
    }

    /// The media can play through without stalling: real readiness is done.
    pub fn report_can_play_through(&mut self) {
        self.readiness = 100.0;
    }

    pub fn value(&self) -> f64 {
        self.emitted
    }

    pub fn finished(&self) -> bool {
        self.finish_fired
    }

    pub fn tick(&mut self, now_ms: f64) -> GaugeSample {
        let elapsed = (now_ms - self.started_at).max(0.0);

        let ramp = if self.ramp_ms > 0.0 {
            (elapsed / self.ramp_ms).min(1.0) * RAMP_CEILING
        } else {
            RAMP_CEILING
        };

        let mut value = ramp.max(self.readiness);
        if elapsed >= self.timeout_ms {
            value = 100.0;
        }
        if value > self.emitted {
            self.emitted = value;
        }

        if self.emitted >= 100.0 && self.full_since.is_none() {
            self.full_since = Some(now_ms);
        }

        let finished = match self.full_since {
            Some(full_at) if !self.finish_fired && now_ms - full_at >= self.grace_ms => {
                self.finish_fired = true;
                true
            }
            _ => false,
        };

        GaugeSample {
            value: self.emitted,
            finished,
        }
    }
}
