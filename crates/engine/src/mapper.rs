use profiles::DeviceProfile;

// Progress above the knee is compressed toward the end cap so the media is
// never asked for a position at or past its true end.
const END_COMPRESSION_KNEE: f64 = 0.95;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaLength {
    Seconds(f64),
    Frames(u32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameTarget {
    /// Playback position in seconds for a video element.
    Time(f64),
    /// One-based frame number for an image sequence.
    Frame(u32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MapOutcome {
    Write(FrameTarget),
    Unchanged,
}

/// Maps normalized scroll progress to a media position. Carries one piece of
/// hidden state, the last written progress, used to suppress writes below the
/// epsilon threshold (every write costs a decoder seek).
#[derive(Debug, Clone)]
pub struct FrameMapper {
    epsilon: f64,
    end_margin_frames: f64,
    frame_rate: f64,
    last_progress: Option<f64>,
}

impl FrameMapper {
    pub fn new(profile: &DeviceProfile) -> Self {
        Self {
            epsilon: profile.progress_epsilon,
            end_margin_frames: profile.frames_before_end,
            frame_rate: profile.standard_frame_rate,
            last_progress: None,
        }
    }

    /// Gap kept between the largest mapped time and the true media end.
    pub fn end_margin_seconds(&self) -> f64 {
        self.end_margin_frames / self.frame_rate
    }

    /// Forget the last written progress. Call when the bound media element
    /// changes, otherwise the first write to the new element may be skipped.
    pub fn rebind(&mut self) {
        self.last_progress = None;
    }

    pub fn map(&mut self, progress: f64, length: MediaLength) -> MapOutcome {
        let progress = progress.clamp(0.0, 1.0);
        if let Some(last) = self.last_progress {
            if (progress - last).abs() < self.epsilon {
                return MapOutcome::Unchanged;
            }
        }
        self.last_progress = Some(progress);

        let target = match length {
            MediaLength::Seconds(duration) => {
                let margin_fraction = self.end_margin_seconds() / duration;
                let adjusted = compress_tail(progress, margin_fraction);
                FrameTarget::Time(adjusted * duration)
            }
            MediaLength::Frames(total) => {
                let margin_fraction = self.end_margin_frames / f64::from(total);
                let adjusted = compress_tail(progress, margin_fraction);
                let frame = (adjusted * f64::from(total)).floor() as u32 + 1;
                FrameTarget::Frame(frame.min(total))
            }
        };
        MapOutcome::Write(target)
    }
}

fn compress_tail(progress: f64, margin_fraction: f64) -> f64 {
    if progress <= END_COMPRESSION_KNEE {
        return progress;
    }
    // Short media could push the cap below the knee; keep the curve
    // monotone by never capping under it.
    let cap = (1.0 - margin_fraction).max(END_COMPRESSION_KNEE);
    let tail = (progress - END_COMPRESSION_KNEE) / (1.0 - END_COMPRESSION_KNEE);
    END_COMPRESSION_KNEE + tail * (cap - END_COMPRESSION_KNEE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use profiles::{DeviceClass, ProfileSet};

    fn mapper_for(class: DeviceClass) -> FrameMapper {
        let profile = ProfileSet::builtin().unwrap().resolve(class);
        FrameMapper::new(&profile)
    }

    #[test]
    fn sub_epsilon_progress_is_suppressed() {
        let mut mapper = mapper_for(DeviceClass::Desktop);
        let length = MediaLength::Seconds(20.0);

        assert!(matches!(mapper.map(0.5, length), MapOutcome::Write(_)));
        assert_eq!(mapper.map(0.5005, length), MapOutcome::Unchanged);
        // Far enough from the last written value: must write.
        assert!(matches!(mapper.map(0.502, length), MapOutcome::Write(_)));
    }

    #[test]
    fn rebind_clears_suppression_state() {
        let mut mapper = mapper_for(DeviceClass::Desktop);
        let length = MediaLength::Seconds(20.0);

        assert!(matches!(mapper.map(0.5, length), MapOutcome::Write(_)));
        mapper.rebind();
        assert!(matches!(mapper.map(0.5, length), MapOutcome::Write(_)));
    }

    #[test]
    fn midpoint_of_twenty_second_video_maps_to_ten() {
        let mut mapper = mapper_for(DeviceClass::Desktop);
        match mapper.map(0.5, MediaLength::Seconds(20.0)) {
            MapOutcome::Write(FrameTarget::Time(t)) => {
                assert!((t - 10.0).abs() < 1e-9, "expected 10s, got {t}");
            }
            other => panic!("expected a time write, got {other:?}"),
        }
    }

    #[test]
    fn end_of_video_stays_under_duration_by_margin() {
        let mut mapper = mapper_for(DeviceClass::Desktop);
        let duration = 20.0;
        match mapper.map(1.0, MediaLength::Seconds(duration)) {
            MapOutcome::Write(FrameTarget::Time(t)) => {
                assert!(t < duration);
                let margin = mapper.end_margin_seconds();
                assert!((t - (duration - margin)).abs() < 1e-9);
            }
            other => panic!("expected a time write, got {other:?}"),
        }
    }

    #[test]
    fn ios_is_allowed_closer_to_the_end() {
        let mut desktop = mapper_for(DeviceClass::Desktop);
        let mut ios = mapper_for(DeviceClass::Ios);
        let duration = 20.0;

        let desktop_end = match desktop.map(1.0, MediaLength::Seconds(duration)) {
            MapOutcome::Write(FrameTarget::Time(t)) => t,
            other => panic!("expected a time write, got {other:?}"),
        };
        let ios_end = match ios.map(1.0, MediaLength::Seconds(duration)) {
            MapOutcome::Write(FrameTarget::Time(t)) => t,
            other => panic!("expected a time write, got {other:?}"),
        };

        assert!(ios_end > desktop_end);
        assert!(ios_end < duration);
    }

    #[test]
    fn tail_compression_is_monotone() {
        let mut mapper = mapper_for(DeviceClass::Desktop);
        let length = MediaLength::Seconds(20.0);
        let mut previous = f64::NEG_INFINITY;
        for step in 0..=100 {
            let progress = step as f64 / 100.0;
            if let MapOutcome::Write(FrameTarget::Time(t)) = mapper.map(progress, length) {
                assert!(t >= previous, "regressed at progress {progress}: {t}");
                previous = t;
            }
        }
    }

    #[test]
    fn very_short_media_never_maps_past_its_end() {
        let mut mapper = mapper_for(DeviceClass::Desktop);
        // Margin (100ms) is longer than five percent of this clip.
        match mapper.map(1.0, MediaLength::Seconds(0.5)) {
            MapOutcome::Write(FrameTarget::Time(t)) => assert!(t < 0.5),
            other => panic!("expected a time write, got {other:?}"),
        }
    }

    #[test]
    fn image_sequence_frames_are_one_based_and_clamped() {
        let mut mapper = mapper_for(DeviceClass::Desktop);
        let length = MediaLength::Frames(120);

        match mapper.map(0.0, length) {
            MapOutcome::Write(FrameTarget::Frame(f)) => assert_eq!(f, 1),
            other => panic!("expected a frame write, got {other:?}"),
        }
        match mapper.map(0.5, length) {
            MapOutcome::Write(FrameTarget::Frame(f)) => assert_eq!(f, 61),
            other => panic!("expected a frame write, got {other:?}"),
        }
        match mapper.map(1.0, length) {
            MapOutcome::Write(FrameTarget::Frame(f)) => {
                assert!(f <= 120);
                assert!(f >= 117, "frame {f} lost more than the end margin");
            }
            other => panic!("expected a frame write, got {other:?}"),
        }
    }
}
