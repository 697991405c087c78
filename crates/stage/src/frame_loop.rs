//! `requestAnimationFrame` scheduling as explicit state machines.
//!
//! [`FrameLoop`] runs a callback once per animation frame until stopped, and
//! [`CoalescedFrame`] collapses any number of `schedule` calls between two
//! frames into a single callback run. Both refuse to restart after
//! `dispose`, so a torn-down controller can never leave a stray frame
//! callback behind.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::warn;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::Window;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Disposed,
}

struct FrameLoopInner {
    window: Window,
    state: Cell<LoopState>,
    pending: Cell<Option<i32>>,
    callback: RefCell<Option<Closure<dyn FnMut(f64)>>>,
}

impl FrameLoopInner {
    fn request(inner: &Rc<FrameLoopInner>) {
        let slot = inner.callback.borrow();
        let Some(closure) = slot.as_ref() else {
            return;
        };
        match inner
            .window
            .request_animation_frame(closure.as_ref().unchecked_ref())
        {
            Ok(handle) => inner.pending.set(Some(handle)),
            Err(err) => warn!(?err, "requestAnimationFrame rejected"),
        }
    }

    fn cancel_pending(&self) {
        if let Some(handle) = self.pending.take() {
            if let Err(err) = self.window.cancel_animation_frame(handle) {
                warn!(?err, "cancelAnimationFrame rejected");
            }
        }
    }
}

/// A continuous render loop. The tick callback receives the
/// `DOMHighResTimeStamp` the browser passes to frame callbacks.
#[derive(Clone)]
pub struct FrameLoop {
    inner: Rc<FrameLoopInner>,
}

impl FrameLoop {
    pub fn new(window: Window) -> Self {
        Self {
            inner: Rc::new(FrameLoopInner {
                window,
                state: Cell::new(LoopState::Idle),
                pending: Cell::new(None),
                callback: RefCell::new(None),
            }),
        }
    }

    pub fn state(&self) -> LoopState {
        self.inner.state.get()
    }

    /// Starts ticking. Ignored while already running; a disposed loop never
    /// restarts.
    pub fn start(&self, mut tick: impl FnMut(f64) + 'static) {
        match self.inner.state.get() {
            LoopState::Running => return,
            LoopState::Disposed => {
                warn!("frame loop started after dispose");
                return;
            }
            LoopState::Idle => {}
        }
        self.inner.state.set(LoopState::Running);
        let inner = Rc::clone(&self.inner);
        let closure = Closure::wrap(Box::new(move |timestamp: f64| {
            if inner.state.get() != LoopState::Running {
                return;
            }
            inner.pending.set(None);
            tick(timestamp);
            // A tick that stopped and restarted the loop already requested
            // the next frame; requesting again would double the cadence.
            if inner.state.get() == LoopState::Running && inner.pending.get().is_none() {
                FrameLoopInner::request(&inner);
            }
        }) as Box<dyn FnMut(f64)>);
        *self.inner.callback.borrow_mut() = Some(closure);
        FrameLoopInner::request(&self.inner);
    }

    /// Stops ticking but allows a later `start` with a fresh callback.
    pub fn stop(&self) {
        if self.inner.state.get() != LoopState::Running {
            return;
        }
        self.inner.cancel_pending();
        self.inner.state.set(LoopState::Idle);
    }

    /// Permanently stops the loop. The stored callback is released when the
    /// last handle drops; the state check keeps it from running again either
    /// way.
    pub fn dispose(&self) {
        self.inner.cancel_pending();
        self.inner.state.set(LoopState::Disposed);
    }
}

struct CoalescedInner {
    window: Window,
    pending: Cell<Option<i32>>,
    disposed: Cell<bool>,
    // Closure::once hands back the FnMut projection of the FnOnce callback;
    // the once-only contract is enforced at the JS boundary.
    slot: RefCell<Option<Closure<dyn FnMut(f64)>>>,
}

/// Schedules a callback for the next animation frame, cancelling any frame
/// still pending from an earlier `schedule`. Scroll handlers use this so a
/// burst of events produces exactly one media write per painted frame.
#[derive(Clone)]
pub struct CoalescedFrame {
    inner: Rc<CoalescedInner>,
}

impl CoalescedFrame {
    pub fn new(window: Window) -> Self {
        Self {
            inner: Rc::new(CoalescedInner {
                window,
                pending: Cell::new(None),
                disposed: Cell::new(false),
                slot: RefCell::new(None),
            }),
        }
    }

    pub fn is_scheduled(&self) -> bool {
        self.inner.pending.get().is_some()
    }

    /// Replaces any pending frame with `run`.
    pub fn schedule(&self, run: impl FnOnce(f64) + 'static) {
        if self.inner.disposed.get() {
            return;
        }
        self.cancel();
        let inner = Rc::clone(&self.inner);
        let closure = Closure::once(move |timestamp: f64| {
            inner.pending.set(None);
            if inner.disposed.get() {
                return;
            }
            run(timestamp);
        });
        match self
            .inner
            .window
            .request_animation_frame(closure.as_ref().unchecked_ref())
        {
            Ok(handle) => {
                self.inner.pending.set(Some(handle));
                *self.inner.slot.borrow_mut() = Some(closure);
            }
            Err(err) => warn!(?err, "requestAnimationFrame rejected"),
        }
    }

    /// Drops the pending frame, if any.
    pub fn cancel(&self) {
        if let Some(handle) = self.inner.pending.take() {
            if let Err(err) = self.inner.window.cancel_animation_frame(handle) {
                warn!(?err, "cancelAnimationFrame rejected");
            }
        }
    }

    pub fn dispose(&self) {
        self.inner.disposed.set(true);
        self.cancel();
    }
}
