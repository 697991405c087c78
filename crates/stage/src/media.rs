//! Write targets for scrubbed media.
//!
//! A [`MediaBinding`] hides whether scroll progress drives a `<video>`
//! element's `currentTime` or the `src` of an `<img>` stepping through a
//! numbered frame sequence. The binder only ever sees
//! [`engine::MediaLength`] and [`engine::FrameTarget`].

use std::cell::Cell;

use engine::{FrameTarget, MediaLength};
use tracing::debug;
use wasm_bindgen_futures::JsFuture;
use web_sys::{HtmlImageElement, HtmlMediaElement, HtmlVideoElement};

use crate::{dom, StageError};

const FRAME_PLACEHOLDER: &str = "{frame}";
const PLAY_RETRY_DELAY_MS: i32 = 350;

pub enum MediaBinding {
    Video(VideoBinding),
    Sequence(SequenceBinding),
}

impl MediaBinding {
    /// Media length once known. Video length stays `None` until metadata has
    /// loaded; sequences know their frame count up front.
    pub fn length(&self) -> Option<MediaLength> {
        match self {
            MediaBinding::Video(video) => video.length(),
            MediaBinding::Sequence(sequence) => Some(sequence.length()),
        }
    }

    pub fn ready(&self) -> bool {
        match self {
            MediaBinding::Video(video) => video.ready(),
            MediaBinding::Sequence(_) => true,
        }
    }

    pub fn apply(&self, target: &FrameTarget) {
        match (self, target) {
            (MediaBinding::Video(video), FrameTarget::Time(seconds)) => video.seek(*seconds),
            (MediaBinding::Sequence(sequence), FrameTarget::Frame(frame)) => {
                sequence.show_frame(*frame)
            }
            _ => debug!("frame target does not match bound media kind"),
        }
    }

    pub fn media_element(&self) -> Option<&HtmlMediaElement> {
        match self {
            MediaBinding::Video(video) => Some(video.element()),
            MediaBinding::Sequence(_) => None,
        }
    }
}

pub struct VideoBinding {
    element: HtmlVideoElement,
}

impl VideoBinding {
    pub fn new(element: HtmlVideoElement) -> Self {
        Self { element }
    }

    pub fn element(&self) -> &HtmlMediaElement {
        &self.element
    }

    pub fn length(&self) -> Option<MediaLength> {
        let duration = self.element.duration();
        if duration.is_finite() && duration > 0.0 {
            Some(MediaLength::Seconds(duration))
        } else {
            None
        }
    }

    pub fn ready(&self) -> bool {
        self.element.ready_state() >= HtmlMediaElement::HAVE_METADATA
    }

    pub fn seek(&self, seconds: f64) {
        self.element.set_current_time(seconds);
    }

    /// Plays and immediately pauses so the decoder is warm before the first
    /// scrubbed seek. iOS refuses to paint seeked frames otherwise. If the
    /// browser rejects the play call (autoplay policy), one retry runs after
    /// a short delay.
    pub fn warm_decoder(&self) {
        wasm_bindgen_futures::spawn_local(warm_with_retry(self.element.clone()));
    }
}

pub struct SequenceBinding {
    element: HtmlImageElement,
    template: String,
    frame_count: u32,
    current: Cell<Option<u32>>,
}

impl SequenceBinding {
    /// `template` must contain a `{frame}` placeholder, replaced with the
    /// zero-padded frame number (`0001`, `0002`, ...).
    pub fn new(
        element: HtmlImageElement,
        template: impl Into<String>,
        frame_count: u32,
    ) -> Result<Self, StageError> {
        let template = template.into();
        if !template.contains(FRAME_PLACEHOLDER) {
            return Err(StageError::BadFrameTemplate(template));
        }
        Ok(Self {
            element,
            template,
            frame_count,
            current: Cell::new(None),
        })
    }

    pub fn length(&self) -> MediaLength {
        MediaLength::Frames(self.frame_count)
    }

    pub fn show_frame(&self, frame: u32) {
        if self.current.get() == Some(frame) {
            return;
        }
        self.current.set(Some(frame));
        self.element.set_src(&sequence_frame_url(&self.template, frame));
    }
}

pub fn sequence_frame_url(template: &str, frame: u32) -> String {
    template.replace(FRAME_PLACEHOLDER, &format!("{frame:04}"))
}

/// Fraction of the media already buffered, when the element can tell us.
pub fn buffered_fraction(element: &HtmlMediaElement) -> Option<f64> {
    let duration = element.duration();
    if !duration.is_finite() || duration <= 0.0 {
        return None;
    }
    let ranges = element.buffered();
    if ranges.length() == 0 {
        return None;
    }
    let end = ranges.end(ranges.length() - 1).ok()?;
    Some((end / duration).clamp(0.0, 1.0))
}

async fn warm_with_retry(element: HtmlVideoElement) {
    if try_warm(&element).await {
        return;
    }
    if let Ok(window) = dom::window() {
        sleep(&window, PLAY_RETRY_DELAY_MS).await;
    }
    if !try_warm(&element).await {
        debug!("video playback rejected twice, leaving element paused");
    }
}

async fn try_warm(element: &HtmlVideoElement) -> bool {
    let Ok(promise) = element.play() else {
        return false;
    };
    let played = JsFuture::from(promise).await.is_ok();
    if played {
        let _ = element.pause();
    }
    played
}

async fn sleep(window: &web_sys::Window, ms: i32) {
    let promise = js_sys::Promise::new(&mut |resolve, _reject| {
        let scheduled = window
            .set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms);
        if scheduled.is_err() {
            let _ = resolve.call0(&wasm_bindgen::JsValue::NULL);
        }
    });
    let _ = JsFuture::from(promise).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_urls_are_zero_padded() {
        assert_eq!(
            sequence_frame_url("/seq/meditation_{frame}.jpg", 1),
            "/seq/meditation_0001.jpg"
        );
        assert_eq!(
            sequence_frame_url("/seq/meditation_{frame}.jpg", 117),
            "/seq/meditation_0117.jpg"
        );
        assert_eq!(
            sequence_frame_url("/seq/meditation_{frame}.jpg", 12345),
            "/seq/meditation_12345.jpg"
        );
    }
}
