//! Scroll-synchronized media scrubbing.
//!
//! [`ScrollTriggerBinder`] pins a container to `viewport + extra_scroll`
//! pixels of scroll travel and maps progress through that travel onto a
//! [`MediaBinding`]. Scroll events never write media directly; each event
//! schedules (or reschedules) one coalesced animation frame, and the frame
//! callback runs the engine pipeline:
//!
//! ```text
//! scrollY -> ScrollTimeline -> ScrubFilter -> FrameMapper -> media write
//! ```
//!
//! The binder activates once media metadata arrives, or after the profile's
//! fallback delay when it never does, so a stalled video cannot leave the
//! page inert.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use engine::{BoundaryCrossing, FrameMapper, MapOutcome, ScrollTimeline, ScrubFilter};
use profiles::DeviceProfile;
use tracing::{debug, warn};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{HtmlElement, ResizeObserver, Window};

use crate::frame_loop::CoalescedFrame;
use crate::listeners::ListenerRegistry;
use crate::media::MediaBinding;
use crate::{dom, StageError};

const ACTIVE_CLASS: &str = "is-active";

/// Callback invoked when scroll progress crosses the end-of-media boundary.
pub type AfterMediaFn = Box<dyn Fn(BoundaryCrossing)>;

pub struct ScrubOptions {
    extra_scroll: f64,
    after_media: Option<AfterMediaFn>,
}

impl ScrubOptions {
    /// `extra_scroll` is the scroll distance in pixels, beyond one viewport
    /// height, over which the media plays out.
    pub fn new(extra_scroll: f64) -> Self {
        Self {
            extra_scroll,
            after_media: None,
        }
    }

    pub fn after_media(mut self, callback: impl Fn(BoundaryCrossing) + 'static) -> Self {
        self.after_media = Some(Box::new(callback));
        self
    }
}

struct ScrubShared {
    window: Window,
    container: HtmlElement,
    media: MediaBinding,
    timeline: RefCell<ScrollTimeline>,
    filter: RefCell<ScrubFilter>,
    mapper: RefCell<FrameMapper>,
    after_media: Option<AfterMediaFn>,
    activated: Cell<bool>,
    activation_timer: Cell<Option<i32>>,
    activation_closure: RefCell<Option<Closure<dyn FnMut()>>>,
}

pub struct ScrollTriggerBinder {
    shared: Rc<ScrubShared>,
    listeners: ListenerRegistry,
    frame: CoalescedFrame,
    resize_observer: Option<ResizeObserver>,
    resize_closure: Option<Closure<dyn FnMut(js_sys::Array)>>,
    disposed: bool,
}

impl ScrollTriggerBinder {
    pub fn mount(
        window: &Window,
        container: HtmlElement,
        media: MediaBinding,
        profile: &DeviceProfile,
        options: ScrubOptions,
    ) -> Result<Self, StageError> {
        let timeline = ScrollTimeline::new(options.extra_scroll)
            .map_err(|_| StageError::BadScrollSpan(options.extra_scroll))?;
        let shared = Rc::new(ScrubShared {
            window: window.clone(),
            container,
            media,
            timeline: RefCell::new(timeline),
            filter: RefCell::new(ScrubFilter::new(profile.scrub_smoothing)),
            mapper: RefCell::new(FrameMapper::new(profile)),
            after_media: options.after_media,
            activated: Cell::new(false),
            activation_timer: Cell::new(None),
            activation_closure: RefCell::new(None),
        });
        measure(&shared);

        let frame = CoalescedFrame::new(window.clone());
        let mut listeners = ListenerRegistry::new();

        let scroll_frame = frame.clone();
        let scroll_shared = Rc::clone(&shared);
        listeners.add(window.as_ref(), "scroll", move |_event| {
            let shared = Rc::clone(&scroll_shared);
            scroll_frame.schedule(move |_timestamp| write_frame(&shared));
        })?;

        let resize_frame = frame.clone();
        let resize_shared = Rc::clone(&shared);
        listeners.add(window.as_ref(), "resize", move |_event| {
            measure(&resize_shared);
            let shared = Rc::clone(&resize_shared);
            resize_frame.schedule(move |_timestamp| write_frame(&shared));
        })?;

        // Content hydration above the container moves its document offset
        // without firing a window resize.
        let (resize_observer, resize_closure) =
            observe_body_layout(window, &shared, &frame)?;

        if shared.media.ready() {
            activate(&shared);
        } else {
            if let Some(element) = shared.media.media_element() {
                let metadata_shared = Rc::clone(&shared);
                listeners.add(element.as_ref(), "loadedmetadata", move |_event| {
                    activate(&metadata_shared);
                })?;
            }
            arm_activation_fallback(&shared, profile.activation_fallback);
        }

        let initial_shared = Rc::clone(&shared);
        frame.schedule(move |_timestamp| write_frame(&initial_shared));

        Ok(Self {
            shared,
            listeners,
            frame,
            resize_observer,
            resize_closure,
            disposed: false,
        })
    }

    pub fn is_active(&self) -> bool {
        self.shared.activated.get()
    }

    /// Unwinds everything `mount` set up: listeners, observers, the pending
    /// frame, the fallback timer, and the container sizing.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.listeners.clear();
        self.frame.dispose();
        if let Some(observer) = self.resize_observer.take() {
            observer.disconnect();
        }
        self.resize_closure = None;
        clear_activation_timer(&self.shared);
        let style = self.shared.container.style();
        if let Err(err) = style.remove_property("height") {
            debug!(?err, "failed to clear container height");
        }
        let _ = self.shared.container.class_list().remove_1(ACTIVE_CLASS);
    }
}

impl Drop for ScrollTriggerBinder {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn measure(shared: &ScrubShared) {
    let viewport = dom::viewport_height(&shared.window);
    let top = dom::absolute_top(&shared.window, &shared.container);
    let mut timeline = shared.timeline.borrow_mut();
    timeline.set_geometry(top, viewport);
    let height = timeline.pinned_height();
    drop(timeline);
    if let Err(err) = shared
        .container
        .style()
        .set_property("height", &format!("{height}px"))
    {
        warn!(?err, "failed to size scrub container");
    }
}

fn write_frame(shared: &Rc<ScrubShared>) {
    let scroll_y = dom::scroll_y(&shared.window);
    let sample = shared.timeline.borrow_mut().sample(scroll_y);
    let eased = shared.filter.borrow_mut().sample(sample.progress);
    if let Some(length) = shared.media.length() {
        let outcome = shared.mapper.borrow_mut().map(eased, length);
        if let MapOutcome::Write(target) = outcome {
            shared.media.apply(&target);
        }
    }
    if let Some(crossing) = sample.crossing {
        if let Some(callback) = &shared.after_media {
            callback(crossing);
        }
    }
}

fn activate(shared: &Rc<ScrubShared>) {
    if shared.activated.replace(true) {
        return;
    }
    clear_activation_timer(shared);
    if let Err(err) = shared.container.class_list().add_1(ACTIVE_CLASS) {
        warn!(?err, "failed to mark scrub container active");
    }
    if let MediaBinding::Video(video) = &shared.media {
        video.warm_decoder();
    }
    debug!("scroll trigger active");
}

fn arm_activation_fallback(shared: &Rc<ScrubShared>, delay: Duration) {
    let timer_shared = Rc::clone(shared);
    let closure = Closure::wrap(Box::new(move || {
        warn!("media metadata never arrived, activating scrub anyway");
        activate(&timer_shared);
    }) as Box<dyn FnMut()>);
    let armed = shared
        .window
        .set_timeout_with_callback_and_timeout_and_arguments_0(
            closure.as_ref().unchecked_ref(),
            delay.as_millis() as i32,
        );
    match armed {
        Ok(handle) => {
            shared.activation_timer.set(Some(handle));
            *shared.activation_closure.borrow_mut() = Some(closure);
        }
        Err(err) => {
            warn!(?err, "failed to arm activation fallback");
            activate(shared);
        }
    }
}

fn clear_activation_timer(shared: &ScrubShared) {
    if let Some(handle) = shared.activation_timer.take() {
        shared.window.clear_timeout_with_handle(handle);
    }
    shared.activation_closure.borrow_mut().take();
}

fn observe_body_layout(
    window: &Window,
    shared: &Rc<ScrubShared>,
    frame: &CoalescedFrame,
) -> Result<(Option<ResizeObserver>, Option<Closure<dyn FnMut(js_sys::Array)>>), StageError> {
    let document = dom::document(window)?;
    let body = dom::body(&document)?;
    let observed_shared = Rc::clone(shared);
    let observed_frame = frame.clone();
    let closure = Closure::wrap(Box::new(move |_entries: js_sys::Array| {
        measure(&observed_shared);
        let shared = Rc::clone(&observed_shared);
        observed_frame.schedule(move |_timestamp| write_frame(&shared));
    }) as Box<dyn FnMut(js_sys::Array)>);
    let observer = ResizeObserver::new(closure.as_ref().unchecked_ref())?;
    observer.observe(&body);
    Ok((Some(observer), Some(closure)))
}
