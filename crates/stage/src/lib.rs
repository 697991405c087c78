//! DOM and WebGL presentation layer for scroll-driven media.
//!
//! `stage` owns everything that touches the browser: element lookup, event
//! listeners, `requestAnimationFrame` scheduling, media element writes, and
//! the WebGL pattern canvas. All decisions about *what* to do live in the
//! [`engine`] crate; this crate feeds engine state machines with DOM
//! observations and applies the effects they return.
//!
//! ```text
//!   scroll / wheel / touch / key events        loadedmetadata / progress
//!                 |                                       |
//!                 v                                       v
//!   +------------------------------+        +---------------------------+
//!   | ScrollTriggerBinder (scrub)  |        | PreloaderController       |
//!   |   ScrollTimeline -> filter   |        |   LoadGauge ticks         |
//!   |   -> FrameMapper -> media    |        |   -> overlay + gate       |
//!   +------------------------------+        +---------------------------+
//!   +------------------------------+        +---------------------------+
//!   | ScrollJackController         |        | PatternRenderer           |
//!   |   ScrollJack -> ledger       |        |   WebGL1 quad, u_time /   |
//!   |   -> section classes + lock  |        |   u_scroll / u_resolution |
//!   +------------------------------+        +---------------------------+
//! ```
//!
//! Every controller follows the same lifecycle: `mount` wires listeners and
//! timers through a [`ListenerRegistry`] and the frame-loop state machines,
//! and `dispose` reverses every one of those registrations. Nothing in this
//! crate queries the document for elements by selector; callers pass in the
//! concrete elements each controller drives.

pub mod dom;
pub mod frame_loop;
pub mod jack_dom;
pub mod listeners;
pub mod loading;
pub mod lock_mirror;
pub mod media;
pub mod pattern;
pub mod scrub;

pub use frame_loop::{CoalescedFrame, FrameLoop, LoopState};
pub use jack_dom::ScrollJackController;
pub use listeners::ListenerRegistry;
pub use loading::PreloaderController;
pub use lock_mirror::LockMirror;
pub use media::{MediaBinding, SequenceBinding, VideoBinding};
pub use pattern::PatternRenderer;
pub use scrub::{ScrollTriggerBinder, ScrubOptions};

use wasm_bindgen::JsValue;

/// Errors produced while wiring controllers to the document.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("browser window is unavailable")]
    NoWindow,
    #[error("document is unavailable")]
    NoDocument,
    #[error("document has no body")]
    NoBody,
    #[error("element '{0}' not found")]
    MissingElement(String),
    #[error("element '{id}' is not a {expected}")]
    WrongElementType { id: String, expected: &'static str },
    #[error("frame template '{0}' is missing the {{frame}} placeholder")]
    BadFrameTemplate(String),
    #[error("scroll span {0} must be a positive number of pixels")]
    BadScrollSpan(f64),
    #[error("browser call failed: {0}")]
    Js(String),
}

impl From<JsValue> for StageError {
    fn from(value: JsValue) -> Self {
        StageError::Js(format!("{value:?}"))
    }
}
