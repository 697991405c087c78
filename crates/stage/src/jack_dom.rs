//! DOM wiring for the discrete section scroll-jack.
//!
//! Captures wheel, touch, and keyboard input on the window, normalizes each
//! into an [`engine::Gesture`], and feeds it to the [`ScrollJack`] state
//! machine. Lock edges returned by the shared ledger are mirrored onto the
//! body element; section position is published through an `is-current` class
//! on the section elements and a `data-section` attribute on the container,
//! which page CSS animates.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use engine::{Direction, Gesture, JackEvent, LockOwner, ScrollJack, ScrollLockLedger};
use profiles::DeviceProfile;
use tracing::debug;
use wasm_bindgen::JsCast;
use web_sys::{Event, HtmlElement, KeyboardEvent, TouchEvent, WheelEvent, Window};

use crate::listeners::ListenerRegistry;
use crate::lock_mirror::LockMirror;
use crate::{dom, StageError};

const CURRENT_CLASS: &str = "is-current";
const JACKED_CLASS: &str = "is-jacked";
const WHEEL_LINE_PX: f64 = 16.0;
const WHEEL_PAGE_PX: f64 = 800.0;

/// Normalizes a wheel delta to pixels. Firefox reports line-mode deltas,
/// so a raw `delta_y` comparison against a pixel threshold would make the
/// wheel feel an order of magnitude heavier there.
pub fn wheel_delta_px(delta_y: f64, delta_mode: u32) -> f64 {
    match delta_mode {
        WheelEvent::DOM_DELTA_LINE => delta_y * WHEEL_LINE_PX,
        WheelEvent::DOM_DELTA_PAGE => delta_y * WHEEL_PAGE_PX,
        _ => delta_y,
    }
}

/// Maps navigation keys onto whole section steps.
pub fn key_step(key: &str) -> Option<Direction> {
    match key {
        "ArrowDown" | "PageDown" | " " | "Spacebar" => Some(Direction::Forward),
        "ArrowUp" | "PageUp" => Some(Direction::Backward),
        _ => None,
    }
}

struct JackShared {
    window: Window,
    container: HtmlElement,
    sections: Vec<HtmlElement>,
    jack: RefCell<ScrollJack>,
    ledger: Rc<RefCell<ScrollLockLedger>>,
    mirror: Rc<LockMirror>,
    owner: LockOwner,
    touch_start: Cell<Option<f64>>,
    on_complete: Option<Box<dyn Fn()>>,
}

impl JackShared {
    /// Pixels the page has scrolled past the container origin. Read from the
    /// live bounding rect so content hydrating in above the container cannot
    /// leave the machine working off a stale offset.
    fn container_offset(&self) -> f64 {
        -self.container.get_bounding_client_rect().top()
    }
}

pub struct ScrollJackController {
    shared: Rc<JackShared>,
    listeners: ListenerRegistry,
    disposed: bool,
}

impl ScrollJackController {
    /// Wires the jack over `sections` inside `container`. The ledger and
    /// mirror are shared across controllers; `owner_id` names this
    /// controller's hold on the lock.
    #[allow(clippy::too_many_arguments)]
    pub fn mount(
        window: &Window,
        container: HtmlElement,
        sections: Vec<HtmlElement>,
        profile: &DeviceProfile,
        ledger: Rc<RefCell<ScrollLockLedger>>,
        mirror: Rc<LockMirror>,
        owner_id: &str,
        on_complete: Option<Box<dyn Fn()>>,
    ) -> Result<Self, StageError> {
        let jack = ScrollJack::new(sections.len(), profile);
        let shared = Rc::new(JackShared {
            window: window.clone(),
            container,
            sections,
            jack: RefCell::new(jack),
            ledger,
            mirror,
            owner: LockOwner::new(owner_id),
            touch_start: Cell::new(None),
            on_complete,
        });
        mark_current(&shared, 0);

        let mut listeners = ListenerRegistry::new();

        let scroll_shared = Rc::clone(&shared);
        listeners.add(window.as_ref(), "scroll", move |_event| {
            let offset = scroll_shared.container_offset();
            let now = dom::now_ms(&scroll_shared.window);
            let events = scroll_shared.jack.borrow_mut().observe_offset(offset, now);
            apply(&scroll_shared, events);
        })?;

        let wheel_shared = Rc::clone(&shared);
        listeners.add_non_passive(window.as_ref(), "wheel", move |event: Event| {
            if !wheel_shared.jack.borrow().intercepting() {
                return;
            }
            let event = event.unchecked_into::<WheelEvent>();
            event.prevent_default();
            let delta = wheel_delta_px(event.delta_y(), event.delta_mode());
            let now = dom::now_ms(&wheel_shared.window);
            let events = wheel_shared
                .jack
                .borrow_mut()
                .on_gesture(Gesture::Wheel(delta), now);
            apply(&wheel_shared, events);
        })?;

        let touch_start_shared = Rc::clone(&shared);
        listeners.add(window.as_ref(), "touchstart", move |event: Event| {
            let event = event.unchecked_into::<TouchEvent>();
            let start = event.touches().get(0).map(|touch| f64::from(touch.client_y()));
            touch_start_shared.touch_start.set(start);
        })?;

        let touch_move_shared = Rc::clone(&shared);
        listeners.add_non_passive(window.as_ref(), "touchmove", move |event: Event| {
            if touch_move_shared.jack.borrow().intercepting() {
                event.prevent_default();
            }
        })?;

        let touch_end_shared = Rc::clone(&shared);
        listeners.add(window.as_ref(), "touchend", move |event: Event| {
            let Some(start) = touch_end_shared.touch_start.take() else {
                return;
            };
            if !touch_end_shared.jack.borrow().intercepting() {
                return;
            }
            let event = event.unchecked_into::<TouchEvent>();
            let Some(end) = event
                .changed_touches()
                .get(0)
                .map(|touch| f64::from(touch.client_y()))
            else {
                return;
            };
            // Finger moving up drags the page forward.
            let distance = start - end;
            let now = dom::now_ms(&touch_end_shared.window);
            let events = touch_end_shared
                .jack
                .borrow_mut()
                .on_gesture(Gesture::Swipe(distance), now);
            apply(&touch_end_shared, events);
        })?;

        let key_shared = Rc::clone(&shared);
        listeners.add(window.as_ref(), "keydown", move |event: Event| {
            if !key_shared.jack.borrow().intercepting() {
                return;
            }
            let event = event.unchecked_into::<KeyboardEvent>();
            let Some(direction) = key_step(&event.key()) else {
                return;
            };
            event.prevent_default();
            let now = dom::now_ms(&key_shared.window);
            let events = key_shared
                .jack
                .borrow_mut()
                .on_gesture(Gesture::Step(direction), now);
            apply(&key_shared, events);
        })?;

        Ok(Self {
            shared,
            listeners,
            disposed: false,
        })
    }

    pub fn section_index(&self) -> usize {
        self.shared.jack.borrow().index()
    }

    pub fn intercepting(&self) -> bool {
        self.shared.jack.borrow().intercepting()
    }

    /// Removes all listeners and releases this controller's hold on the
    /// scroll lock, then reconciles the body style against the ledger so an
    /// unmount mid-walkthrough cannot leave the page locked.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.listeners.clear();
        release_lock(&self.shared);
        self.shared.mirror.reconcile(&self.shared.ledger.borrow());
    }
}

impl Drop for ScrollJackController {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn apply(shared: &JackShared, events: Vec<JackEvent>) {
    for event in events {
        match event {
            JackEvent::Activated => {
                engage_lock(shared);
                mark_current(shared, 0);
                debug!("scroll jack engaged");
            }
            JackEvent::Moved { from, to } => {
                mark_current(shared, to);
                debug!(from, to, "section step");
            }
            JackEvent::Finished => {
                release_lock(shared);
                if let Some(callback) = &shared.on_complete {
                    callback();
                }
                debug!("scroll jack completed");
            }
            JackEvent::Rearmed { index } => {
                engage_lock(shared);
                mark_current(shared, index);
                debug!(index, "scroll jack re-entered");
            }
        }
    }
}

fn engage_lock(shared: &JackShared) {
    if let Some(edge) = shared.ledger.borrow_mut().acquire(shared.owner.clone()) {
        shared.mirror.apply(edge);
    }
    let _ = shared.container.class_list().add_1(JACKED_CLASS);
}

fn release_lock(shared: &JackShared) {
    if let Some(edge) = shared.ledger.borrow_mut().release(&shared.owner) {
        shared.mirror.apply(edge);
    }
    let _ = shared.container.class_list().remove_1(JACKED_CLASS);
}

fn mark_current(shared: &JackShared, index: usize) {
    for (position, section) in shared.sections.iter().enumerate() {
        let classes = section.class_list();
        let result = if position == index {
            classes.add_1(CURRENT_CLASS)
        } else {
            classes.remove_1(CURRENT_CLASS)
        };
        if result.is_err() {
            debug!(position, "failed to toggle section class");
        }
    }
    let _ = shared
        .container
        .set_attribute("data-section", &index.to_string());
}
