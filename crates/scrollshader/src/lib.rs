//! WebAssembly entry point for the scroll-synchronized page runtime.
//!
//! The host page embeds a JSON config block naming the elements to drive
//! (see [`config::PageConfig`]), loads this module, and the runtime mounts
//! itself: preloader, hero scrub, section scroll-jacks, pattern canvas, CMS
//! hydration, and form wiring. Single-page navigations call [`dispose`]
//! before dropping the page so every listener, timer, and scroll lock is
//! unwound.

mod config;
mod hydrate;
mod run;

pub use config::PageConfig;
pub use run::App;

use wasm_bindgen::prelude::wasm_bindgen;

#[wasm_bindgen(start)]
pub fn start() {
    run::initialise_tracing();
    run::launch();
}

/// Tears the mounted runtime down. Safe to call repeatedly.
#[wasm_bindgen]
pub fn dispose() {
    run::teardown();
}
