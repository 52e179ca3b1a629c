//! Fault-tolerant element lookup
//!
//! Thin wrappers over [`Document::query_selector`] that never fail: an
//! invalid selector or a stale scope is logged once at warning level and
//! treated as "nothing found". Callers handle an empty result as a no-op.

use crate::document::{Document, ElementId};

/// First element matching `selector`, or `None`
pub fn query_one(doc: &Document, selector: &str, scope: Option<ElementId>) -> Option<ElementId> {
    match doc.query_selector(selector, scope) {
        Ok(found) => found,
        Err(err) => {
            tracing::warn!(selector, error = %err, "element query failed");
            None
        }
    }
}

/// Every element matching `selector` in document order, possibly empty
pub fn query_all(doc: &Document, selector: &str, scope: Option<ElementId>) -> Vec<ElementId> {
    match doc.query_selector_all(selector, scope) {
        Ok(found) => found,
        Err(err) => {
            tracing::warn!(selector, error = %err, "element query failed");
            Vec::new()
        }
    }
}
