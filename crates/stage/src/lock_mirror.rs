//! Body overflow mirror for the scroll lock ledger.
//!
//! The ledger decides when the page-level lock engages or releases; this
//! mirror is the only place that touches `document.body.style.overflow`, so
//! the DOM can never disagree with the ledger for longer than one edge.

use engine::{LockEdge, ScrollLockLedger};
use tracing::{debug, warn};
use web_sys::{Document, HtmlElement};

use crate::{dom, StageError};

pub struct LockMirror {
    body: HtmlElement,
}

impl LockMirror {
    pub fn new(document: &Document) -> Result<Self, StageError> {
        Ok(Self {
            body: dom::body(document)?,
        })
    }

    pub fn apply(&self, edge: LockEdge) {
        let result = match edge {
            LockEdge::Engaged => self.body.style().set_property("overflow", "hidden"),
            LockEdge::Released => self.body.style().remove_property("overflow").map(|_| ()),
        };
        if let Err(err) = result {
            warn!(?err, ?edge, "failed to mirror scroll lock to body style");
        }
    }

    /// Clears a stale lock style left behind when no owner holds the ledger.
    /// Called on teardown so an unmounted controller can never wedge the
    /// page in an unscrollable state.
    pub fn reconcile(&self, ledger: &ScrollLockLedger) {
        if ledger.locked() {
            return;
        }
        let current = self
            .body
            .style()
            .get_property_value("overflow")
            .unwrap_or_default();
        if current == "hidden" {
            warn!("scroll lock style held with no live owner, force-clearing");
            self.apply(LockEdge::Released);
        } else {
            debug!("scroll lock mirror consistent with ledger");
        }
    }
}
