mod jack;
mod lock;
mod mapper;
mod preloader;
mod progress;
mod smoothing;
mod source;

pub use jack::{Direction, Gesture, JackEvent, JackPhase, ScrollJack};
pub use lock::{LockEdge, LockOwner, ScrollLockLedger};
pub use mapper::{FrameMapper, FrameTarget, MapOutcome, MediaLength};
pub use preloader::{GaugeSample, LoadGauge};
pub use progress::{BoundaryCrossing, ScrollTimeline, TimelineSample};
pub use smoothing::ScrubFilter;
pub use source::{negotiate, webm_variant, MediaContainer, MediaSource, Orientation, SourceSet};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("extra scroll span must be positive, got {0}")]
    NonPositiveSpan(f64),
}
