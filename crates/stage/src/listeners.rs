//! Event listener bookkeeping.
//!
//! Browsers key listener removal on the exact callback reference, so every
//! registration has to keep its [`Closure`] alive until teardown. The
//! registry owns those closures and removes every listener it added, in
//! reverse order, when cleared or dropped.

use tracing::warn;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{AddEventListenerOptions, Event, EventTarget};

use crate::StageError;

struct ListenerEntry {
    target: EventTarget,
    event: &'static str,
    closure: Closure<dyn FnMut(Event)>,
}

#[derive(Default)]
pub struct ListenerRegistry {
    entries: Vec<ListenerEntry>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener with default options.
    pub fn add(
        &mut self,
        target: &EventTarget,
        event: &'static str,
        handler: impl FnMut(Event) + 'static,
    ) -> Result<(), StageError> {
        let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
        target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
        self.entries.push(ListenerEntry {
            target: target.clone(),
            event,
            closure,
        });
        Ok(())
    }

    /// Registers a listener with `passive: false` so the handler may call
    /// `preventDefault()` on wheel and touch events.
    pub fn add_non_passive(
        &mut self,
        target: &EventTarget,
        event: &'static str,
        handler: impl FnMut(Event) + 'static,
    ) -> Result<(), StageError> {
        let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
        let options = AddEventListenerOptions::new();
        options.set_passive(false);
        target.add_event_listener_with_callback_and_add_event_listener_options(
            event,
            closure.as_ref().unchecked_ref(),
            &options,
        )?;
        self.entries.push(ListenerEntry {
            target: target.clone(),
            event,
            closure,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every registered listener.
    pub fn clear(&mut self) {
        while let Some(entry) = self.entries.pop() {
            let removed = entry.target.remove_event_listener_with_callback(
                entry.event,
                entry.closure.as_ref().unchecked_ref(),
            );
            if let Err(err) = removed {
                warn!(event = entry.event, ?err, "failed to remove listener");
            }
        }
    }
}

impl Drop for ListenerRegistry {
    fn drop(&mut self) {
        self.clear();
    }
}
