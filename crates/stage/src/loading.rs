//! Preload overlay driven by the [`LoadGauge`].
//!
//! An interval ticks the gauge on the `performance.now()` clock and paints
//! the displayed percentage; video buffering events feed the readiness side.
//! While loading, the controller holds its own owner entry in the scroll
//! lock ledger so the page cannot be scrolled behind the overlay. Completion
//! releases the lock, marks the overlay done, and fires the one-shot
//! callback.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use engine::{LoadGauge, LockOwner, ScrollLockLedger};
use profiles::DeviceProfile;
use tracing::{debug, info, warn};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{HtmlElement, HtmlMediaElement, Window};

use crate::listeners::ListenerRegistry;
use crate::lock_mirror::LockMirror;
use crate::media::buffered_fraction;
use crate::{dom, StageError};

const DONE_CLASS: &str = "is-done";
const GAUGE_TICK_MS: i32 = 100;
const LOCK_OWNER_ID: &str = "preloader";

struct PreloadShared {
    window: Window,
    overlay: HtmlElement,
    label: Option<HtmlElement>,
    gauge: RefCell<LoadGauge>,
    ledger: Rc<RefCell<ScrollLockLedger>>,
    mirror: Rc<LockMirror>,
    owner: LockOwner,
    interval: Cell<Option<i32>>,
    interval_closure: RefCell<Option<Closure<dyn FnMut()>>>,
    on_complete: RefCell<Option<Box<dyn FnOnce()>>>,
}

pub struct PreloaderController {
    shared: Rc<PreloadShared>,
    listeners: ListenerRegistry,
    disposed: bool,
}

impl PreloaderController {
    /// Starts the gauge immediately. `video`, when given, contributes real
    /// buffering readiness; without it the gauge runs on the time ramp and
    /// hard timeout alone.
    pub fn mount(
        window: &Window,
        overlay: HtmlElement,
        label: Option<HtmlElement>,
        video: Option<&HtmlMediaElement>,
        profile: &DeviceProfile,
        ledger: Rc<RefCell<ScrollLockLedger>>,
        mirror: Rc<LockMirror>,
        on_complete: impl FnOnce() + 'static,
    ) -> Result<Self, StageError> {
        let gauge = LoadGauge::new(profile, dom::now_ms(window));
        let shared = Rc::new(PreloadShared {
            window: window.clone(),
            overlay,
            label,
            gauge: RefCell::new(gauge),
            ledger,
            mirror,
            owner: LockOwner::new(LOCK_OWNER_ID),
            interval: Cell::new(None),
            interval_closure: RefCell::new(None),
            on_complete: RefCell::new(Some(Box::new(on_complete))),
        });
        if let Some(edge) = shared.ledger.borrow_mut().acquire(shared.owner.clone()) {
            shared.mirror.apply(edge);
        }

        let mut listeners = ListenerRegistry::new();
        if let Some(element) = video {
            let progress_shared = Rc::clone(&shared);
            let progress_element = element.clone();
            listeners.add(element.as_ref(), "progress", move |_event| {
                if let Some(fraction) = buffered_fraction(&progress_element) {
                    progress_shared.gauge.borrow_mut().report_buffered(fraction);
                }
            })?;

            let ready_shared = Rc::clone(&shared);
            listeners.add(element.as_ref(), "canplaythrough", move |_event| {
                ready_shared.gauge.borrow_mut().report_can_play_through();
            })?;
        }

        let tick_shared = Rc::clone(&shared);
        let closure = Closure::wrap(Box::new(move || {
            let sample = {
                let mut gauge = tick_shared.gauge.borrow_mut();
                gauge.tick(dom::now_ms(&tick_shared.window))
            };
            render(&tick_shared, sample.value);
            if sample.finished {
                complete(&tick_shared);
            }
        }) as Box<dyn FnMut()>);
        let armed = window.set_interval_with_callback_and_timeout_and_arguments_0(
            closure.as_ref().unchecked_ref(),
            GAUGE_TICK_MS,
        );
        match armed {
            Ok(handle) => {
                shared.interval.set(Some(handle));
                *shared.interval_closure.borrow_mut() = Some(closure);
            }
            Err(err) => {
                warn!(?err, "failed to start preload gauge, releasing page now");
                complete(&shared);
            }
        }

        Ok(Self {
            shared,
            listeners,
            disposed: false,
        })
    }

    pub fn value(&self) -> f64 {
        self.shared.gauge.borrow().value()
    }

    pub fn finished(&self) -> bool {
        self.shared.gauge.borrow().finished()
    }

    /// Tears down without firing the completion callback. Used when the
    /// page unmounts before loading finishes.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.listeners.clear();
        clear_interval(&self.shared);
        self.shared.on_complete.borrow_mut().take();
        if let Some(edge) = self.shared.ledger.borrow_mut().release(&self.shared.owner) {
            self.shared.mirror.apply(edge);
        }
    }
}

impl Drop for PreloaderController {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn render(shared: &PreloadShared, value: f64) {
    if let Some(label) = &shared.label {
        label.set_text_content(Some(&format!("{value:.0}%")));
    }
    if shared
        .overlay
        .set_attribute("data-progress", &format!("{value:.0}"))
        .is_err()
    {
        debug!("failed to publish preload progress attribute");
    }
}

fn complete(shared: &Rc<PreloadShared>) {
    clear_interval(shared);
    let Some(callback) = shared.on_complete.borrow_mut().take() else {
        return;
    };
    if let Err(err) = shared.overlay.class_list().add_1(DONE_CLASS) {
        warn!(?err, "failed to mark preload overlay done");
    }
    if let Some(edge) = shared.ledger.borrow_mut().release(&shared.owner) {
        shared.mirror.apply(edge);
    }
    info!("preload complete, releasing page");
    callback();
}

fn clear_interval(shared: &PreloadShared) {
    if let Some(handle) = shared.interval.take() {
        shared.window.clear_interval_with_handle(handle);
    }
    shared.interval_closure.borrow_mut().take();
}
