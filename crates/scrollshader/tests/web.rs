//! Browser smoke tests for the DOM-facing pieces. Run with wasm-pack against
//! a headless browser; everything pure lives in the per-crate unit tests.

#![cfg(target_arch = "wasm32")]

use std::cell::Cell;
use std::rc::Rc;

use engine::{LockOwner, ScrollLockLedger};
use stage::{
    dom, CoalescedFrame, FrameLoop, ListenerRegistry, LockMirror, LoopState, SequenceBinding,
};
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use wasm_bindgen_test::*;
use web_sys::HtmlImageElement;

wasm_bindgen_test_configure!(run_in_browser);

fn document() -> web_sys::Document {
    web_sys::window().unwrap().document().unwrap()
}

/// Resolves after the next animation frame has fired. Frame callbacks run in
/// registration order, so anything scheduled before this call has run by the
/// time the future completes.
async fn next_frame(window: &web_sys::Window) {
    let promise = js_sys::Promise::new(&mut |resolve, _reject| {
        if window.request_animation_frame(&resolve).is_err() {
            let _ = resolve.call0(&wasm_bindgen::JsValue::NULL);
        }
    });
    let _ = JsFuture::from(promise).await;
}

#[wasm_bindgen_test]
fn listener_registry_reverses_registrations() {
    let element = document().create_element("div").unwrap();
    let hits = Rc::new(Cell::new(0u32));
    let counter = Rc::clone(&hits);
    let mut registry = ListenerRegistry::new();
    registry
        .add(element.as_ref(), "click", move |_event| {
            counter.set(counter.get() + 1);
        })
        .unwrap();

    let click = web_sys::Event::new("click").unwrap();
    element.dispatch_event(&click).unwrap();
    assert_eq!(hits.get(), 1);

    registry.clear();
    assert!(registry.is_empty());
    let click = web_sys::Event::new("click").unwrap();
    element.dispatch_event(&click).unwrap();
    assert_eq!(hits.get(), 1, "removed listener must not fire");
}

#[wasm_bindgen_test]
fn frame_loop_refuses_restart_after_dispose() {
    let frame_loop = FrameLoop::new(web_sys::window().unwrap());
    assert_eq!(frame_loop.state(), LoopState::Idle);

    frame_loop.start(|_timestamp| {});
    assert_eq!(frame_loop.state(), LoopState::Running);

    frame_loop.stop();
    assert_eq!(frame_loop.state(), LoopState::Idle);

    frame_loop.start(|_timestamp| {});
    frame_loop.dispose();
    assert_eq!(frame_loop.state(), LoopState::Disposed);

    frame_loop.start(|_timestamp| {});
    assert_eq!(frame_loop.state(), LoopState::Disposed);
}

#[wasm_bindgen_test]
async fn coalesced_frame_runs_only_the_latest_callback() {
    let window = web_sys::window().unwrap();
    let frame = CoalescedFrame::new(window.clone());
    let replaced = Rc::new(Cell::new(0u32));
    let kept = Rc::new(Cell::new(0u32));

    let hits = Rc::clone(&replaced);
    frame.schedule(move |_timestamp| hits.set(hits.get() + 1));
    let hits = Rc::clone(&kept);
    frame.schedule(move |_timestamp| hits.set(hits.get() + 1));
    assert!(frame.is_scheduled());

    next_frame(&window).await;
    assert_eq!(replaced.get(), 0, "cancelled frame must not run");
    assert_eq!(kept.get(), 1);
    assert!(!frame.is_scheduled());
}

#[wasm_bindgen_test]
async fn coalesced_frame_ignores_schedules_after_dispose() {
    let window = web_sys::window().unwrap();
    let frame = CoalescedFrame::new(window.clone());
    let hits = Rc::new(Cell::new(0u32));

    let counter = Rc::clone(&hits);
    frame.schedule(move |_timestamp| counter.set(counter.get() + 1));
    frame.dispose();
    assert!(!frame.is_scheduled());

    let counter = Rc::clone(&hits);
    frame.schedule(move |_timestamp| counter.set(counter.get() + 1));
    assert!(!frame.is_scheduled());

    next_frame(&window).await;
    assert_eq!(hits.get(), 0, "disposed scheduler must never fire");
}

#[wasm_bindgen_test]
fn lock_mirror_follows_ledger_edges() {
    let document = document();
    let body = document.body().unwrap();
    let mirror = LockMirror::new(&document).unwrap();
    let mut ledger = ScrollLockLedger::new();

    if let Some(edge) = ledger.acquire(LockOwner::new("test")) {
        mirror.apply(edge);
    }
    assert_eq!(body.style().get_property_value("overflow").unwrap(), "hidden");

    if let Some(edge) = ledger.release(&LockOwner::new("test")) {
        mirror.apply(edge);
    }
    assert_ne!(body.style().get_property_value("overflow").unwrap(), "hidden");
}

#[wasm_bindgen_test]
fn stale_lock_style_is_force_cleared() {
    let document = document();
    let body = document.body().unwrap();
    body.style().set_property("overflow", "hidden").unwrap();

    let mirror = LockMirror::new(&document).unwrap();
    let ledger = ScrollLockLedger::new();
    mirror.reconcile(&ledger);
    assert_ne!(body.style().get_property_value("overflow").unwrap(), "hidden");
}

#[wasm_bindgen_test]
fn sequence_binding_writes_padded_frame_urls() {
    let image: HtmlImageElement = document()
        .create_element("img")
        .unwrap()
        .dyn_into()
        .unwrap();
    let binding =
        SequenceBinding::new(image.clone(), "/seq/meditation_{frame}.jpg", 120).unwrap();

    binding.show_frame(7);
    assert!(image.src().ends_with("/seq/meditation_0007.jpg"));

    binding.show_frame(120);
    assert!(image.src().ends_with("/seq/meditation_0120.jpg"));
}

#[wasm_bindgen_test]
fn typed_lookup_rejects_wrong_element_kind() {
    let document = document();
    let body = document.body().unwrap();
    let element = document.create_element("div").unwrap();
    element.set_id("decidedly-not-a-video");
    body.append_child(&element).unwrap();

    let result = dom::typed_element_by_id::<web_sys::HtmlVideoElement>(
        &document,
        "decidedly-not-a-video",
        "video element",
    );
    element.remove();
    let err = result.unwrap_err();
    assert!(err.to_string().contains("video element"));
}
