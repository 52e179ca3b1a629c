//! Element tree
//!
//! [`Document`] owns every element of the page. Elements are addressed by
//! [`ElementId`] keys; the handle itself is cheap to clone and all clones
//! see the same tree. Nothing in the tree is ever borrowed across a
//! callback, so listeners are free to mutate the document.
//!
//! Layout is deliberately simple: each element carries a [`LayoutBox`]
//! (vertical offset and height in page coordinates) assigned by whoever
//! builds the page, and the [`Viewport`] is a vertical window over the page.

use indexmap::IndexMap;
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use linkdeck_core::EventType;

use crate::error::{DomError, Result};
use crate::event::{EventContext, EventTarget, ListenerEntry, ListenerId};
use crate::selector::SelectorList;

/// Default viewport height of a phone-sized screen
const DEFAULT_VIEWPORT_HEIGHT: f32 = 800.0;

new_key_type! {
    /// Handle to an element in a document
    pub struct ElementId;
    /// Handle to a viewport change listener
    pub struct ViewportListenerId;
}

/// Vertical placement of an element in page coordinates
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LayoutBox {
    pub top: f32,
    pub height: f32,
}

impl LayoutBox {
    pub fn new(top: f32, height: f32) -> Self {
        Self { top, height }
    }

    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }
}

/// The visible window over the page
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub scroll_y: f32,
    pub height: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scroll_y: 0.0,
            height: DEFAULT_VIEWPORT_HEIGHT,
        }
    }
}

/// Document loading phase
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    /// Markup still being parsed
    #[default]
    Loading,
    /// Structure parsed, sub-resources pending
    Interactive,
    /// Fully loaded
    Complete,
}

pub(crate) struct ElementNode {
    pub(crate) tag: String,
    pub(crate) attributes: IndexMap<String, String>,
    pub(crate) classes: SmallVec<[String; 4]>,
    pub(crate) text: String,
    pub(crate) style: IndexMap<String, String>,
    pub(crate) parent: Option<ElementId>,
    pub(crate) children: Vec<ElementId>,
    pub(crate) layout: LayoutBox,
}

impl ElementNode {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: IndexMap::new(),
            classes: SmallVec::new(),
            text: String::new(),
            style: IndexMap::new(),
            parent: None,
            children: Vec::new(),
            layout: LayoutBox::default(),
        }
    }
}

pub(crate) struct DocumentInner {
    pub(crate) nodes: RefCell<SlotMap<ElementId, ElementNode>>,
    root: ElementId,
    body: ElementId,
    viewport: Cell<Viewport>,
    ready_state: Cell<ReadyState>,
    pub(crate) listeners: RefCell<SlotMap<ListenerId, ListenerEntry>>,
    pub(crate) next_listener_seq: Cell<u64>,
    viewport_listeners: RefCell<SlotMap<ViewportListenerId, Rc<dyn Fn()>>>,
}

/// A page's element tree, viewport and listeners
#[derive(Clone)]
pub struct Document {
    pub(crate) inner: Rc<DocumentInner>,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("elements", &self.inner.nodes.borrow().len())
            .field("viewport", &self.inner.viewport.get())
            .field("ready_state", &self.inner.ready_state.get())
            .finish()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Non-owning [`Document`] handle for callbacks stored inside the document
#[derive(Clone)]
pub struct WeakDocument {
    inner: Weak<DocumentInner>,
}

impl WeakDocument {
    pub fn upgrade(&self) -> Option<Document> {
        self.inner.upgrade().map(|inner| Document { inner })
    }
}

impl Document {
    pub fn downgrade(&self) -> WeakDocument {
        WeakDocument {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Create a document with `<html>` and `<body>` elements
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(ElementNode::new("html"));
        let body = nodes.insert(ElementNode::new("body"));
        nodes[body].parent = Some(root);
        nodes[root].children.push(body);

        Self {
            inner: Rc::new(DocumentInner {
                nodes: RefCell::new(nodes),
                root,
                body,
                viewport: Cell::new(Viewport::default()),
                ready_state: Cell::new(ReadyState::Loading),
                listeners: RefCell::new(SlotMap::with_key()),
                next_listener_seq: Cell::new(0),
                viewport_listeners: RefCell::new(SlotMap::with_key()),
            }),
        }
    }

    /// The `<html>` element, which carries document-level marker classes
    pub fn root(&self) -> ElementId {
        self.inner.root
    }

    pub fn body(&self) -> ElementId {
        self.inner.body
    }

    pub fn element_count(&self) -> usize {
        self.inner.nodes.borrow().len()
    }

    pub fn contains(&self, el: ElementId) -> bool {
        self.inner.nodes.borrow().contains_key(el)
    }

    // =========================================================================
    // Tree structure
    // =========================================================================

    /// Create a detached element
    pub fn create_element(&self, tag: &str) -> ElementId {
        self.inner.nodes.borrow_mut().insert(ElementNode::new(tag))
    }

    /// Append `child` to `parent`, detaching it from any previous parent
    pub fn append_child(&self, parent: ElementId, child: ElementId) -> Result<()> {
        let mut nodes = self.inner.nodes.borrow_mut();
        if !nodes.contains_key(parent) {
            return Err(DomError::UnknownElement(parent));
        }
        if !nodes.contains_key(child) {
            return Err(DomError::UnknownElement(child));
        }

        if let Some(old) = nodes[child].parent.take() {
            if let Some(old_parent) = nodes.get_mut(old) {
                old_parent.children.retain(|c| *c != child);
            }
        }
        nodes[child].parent = Some(parent);
        nodes[parent].children.push(child);
        Ok(())
    }

    /// Remove an element and its subtree
    pub fn remove(&self, el: ElementId) -> Result<()> {
        let mut nodes = self.inner.nodes.borrow_mut();
        if !nodes.contains_key(el) {
            return Err(DomError::UnknownElement(el));
        }

        if let Some(parent) = nodes[el].parent {
            if let Some(p) = nodes.get_mut(parent) {
                p.children.retain(|c| *c != el);
            }
        }

        let mut doomed = vec![el];
        doomed.extend(collect_descendants(&nodes, el));
        for id in doomed {
            nodes.remove(id);
        }
        drop(nodes);

        self.inner.listeners.borrow_mut().retain(|_, entry| match entry.target {
            EventTarget::Element(target) => self.contains(target),
            EventTarget::Document => true,
        });
        Ok(())
    }

    pub fn parent(&self, el: ElementId) -> Option<ElementId> {
        self.inner.nodes.borrow().get(el)?.parent
    }

    pub fn children(&self, el: ElementId) -> Vec<ElementId> {
        self.inner
            .nodes
            .borrow()
            .get(el)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    pub fn tag(&self, el: ElementId) -> Option<String> {
        self.inner.nodes.borrow().get(el).map(|n| n.tag.clone())
    }

    // =========================================================================
    // Attributes, classes and text
    // =========================================================================

    pub fn set_attribute(&self, el: ElementId, name: &str, value: impl Into<String>) -> Result<()> {
        self.with_node_mut(el, |node| {
            node.attributes
                .insert(name.to_ascii_lowercase(), value.into());
        })
    }

    pub fn attribute(&self, el: ElementId, name: &str) -> Option<String> {
        self.inner
            .nodes
            .borrow()
            .get(el)?
            .attributes
            .get(&name.to_ascii_lowercase())
            .cloned()
    }

    pub fn has_attribute(&self, el: ElementId, name: &str) -> bool {
        self.attribute(el, name).is_some()
    }

    pub fn remove_attribute(&self, el: ElementId, name: &str) -> Result<()> {
        self.with_node_mut(el, |node| {
            node.attributes.shift_remove(&name.to_ascii_lowercase());
        })
    }

    pub fn add_class(&self, el: ElementId, class: &str) -> Result<()> {
        self.with_node_mut(el, |node| {
            if !node.classes.iter().any(|c| c == class) {
                node.classes.push(class.to_string());
            }
        })
    }

    pub fn remove_class(&self, el: ElementId, class: &str) -> Result<()> {
        self.with_node_mut(el, |node| node.classes.retain(|c| c != class))
    }

    /// Add or remove `class` depending on `present`
    pub fn toggle_class(&self, el: ElementId, class: &str, present: bool) -> Result<()> {
        if present {
            self.add_class(el, class)
        } else {
            self.remove_class(el, class)
        }
    }

    pub fn has_class(&self, el: ElementId, class: &str) -> bool {
        self.inner
            .nodes
            .borrow()
            .get(el)
            .is_some_and(|n| n.classes.iter().any(|c| c == class))
    }

    pub fn classes(&self, el: ElementId) -> Vec<String> {
        self.inner
            .nodes
            .borrow()
            .get(el)
            .map(|n| n.classes.to_vec())
            .unwrap_or_default()
    }

    /// Set the element's own text
    pub fn set_text(&self, el: ElementId, text: impl Into<String>) -> Result<()> {
        self.with_node_mut(el, |node| node.text = text.into())
    }

    /// Text of the element and all its descendants, in document order
    pub fn text_content(&self, el: ElementId) -> Option<String> {
        let nodes = self.inner.nodes.borrow();
        let node = nodes.get(el)?;
        let mut text = node.text.clone();
        for id in collect_descendants(&nodes, el) {
            text.push_str(&nodes[id].text);
        }
        Some(text)
    }

    // =========================================================================
    // Inline style
    // =========================================================================

    /// Set an inline style property
    pub fn set_style(&self, el: ElementId, property: &str, value: impl Into<String>) -> Result<()> {
        self.with_node_mut(el, |node| {
            node.style.insert(property.to_string(), value.into());
        })
    }

    pub fn style(&self, el: ElementId, property: &str) -> Option<String> {
        self.inner.nodes.borrow().get(el)?.style.get(property).cloned()
    }

    pub fn remove_style(&self, el: ElementId, property: &str) -> Result<()> {
        self.with_node_mut(el, |node| {
            node.style.shift_remove(property);
        })
    }

    /// Serialized inline style, `prop: value; ...`
    pub fn style_text(&self, el: ElementId) -> Option<String> {
        let nodes = self.inner.nodes.borrow();
        let node = nodes.get(el)?;
        Some(
            node.style
                .iter()
                .map(|(k, v)| format!("{}: {}", k, v))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    // =========================================================================
    // Layout and viewport
    // =========================================================================

    pub fn set_layout(&self, el: ElementId, layout: LayoutBox) -> Result<()> {
        self.with_node_mut(el, |node| node.layout = layout)?;
        self.notify_viewport_listeners();
        Ok(())
    }

    pub fn layout(&self, el: ElementId) -> Option<LayoutBox> {
        self.inner.nodes.borrow().get(el).map(|n| n.layout)
    }

    pub fn viewport(&self) -> Viewport {
        self.inner.viewport.get()
    }

    /// Scroll the viewport to `scroll_y` (clamped at zero)
    pub fn scroll_to(&self, scroll_y: f32) {
        let mut viewport = self.inner.viewport.get();
        viewport.scroll_y = scroll_y.max(0.0);
        self.inner.viewport.set(viewport);
        tracing::trace!(scroll_y = viewport.scroll_y, "viewport scrolled");
        self.notify_viewport_listeners();
    }

    pub fn set_viewport_height(&self, height: f32) {
        let mut viewport = self.inner.viewport.get();
        viewport.height = height.max(0.0);
        self.inner.viewport.set(viewport);
        self.notify_viewport_listeners();
    }

    /// Register a callback for scroll, resize and layout changes
    pub fn on_viewport_change<F>(&self, f: F) -> ViewportListenerId
    where
        F: Fn() + 'static,
    {
        self.inner.viewport_listeners.borrow_mut().insert(Rc::new(f))
    }

    pub fn remove_viewport_listener(&self, id: ViewportListenerId) -> bool {
        self.inner.viewport_listeners.borrow_mut().remove(id).is_some()
    }

    fn notify_viewport_listeners(&self) {
        let listeners: Vec<Rc<dyn Fn()>> = self
            .inner
            .viewport_listeners
            .borrow()
            .values()
            .cloned()
            .collect();
        for listener in listeners {
            listener();
        }
    }

    /// Intersection of an element with the viewport grown by `margin_px`
    ///
    /// Returns `(is_intersecting, visible_fraction)`. Edge-adjacent boxes
    /// count as intersecting with a fraction of zero.
    pub fn intersection(&self, el: ElementId, margin_px: f32) -> Option<(bool, f32)> {
        let layout = self.layout(el)?;
        let viewport = self.viewport();

        let root_top = viewport.scroll_y - margin_px;
        let root_bottom = viewport.scroll_y + viewport.height + margin_px;
        let overlap = layout.bottom().min(root_bottom) - layout.top.max(root_top);

        if overlap < 0.0 {
            return Some((false, 0.0));
        }
        if layout.height <= 0.0 {
            return Some((true, 1.0));
        }
        Some((true, (overlap / layout.height).clamp(0.0, 1.0)))
    }

    // =========================================================================
    // Loading lifecycle
    // =========================================================================

    pub fn ready_state(&self) -> ReadyState {
        self.inner.ready_state.get()
    }

    /// Advance the loading phase, firing `DOMContentLoaded` and `load`
    ///
    /// Moving backwards is ignored.
    pub fn set_ready_state(&self, state: ReadyState) {
        let previous = self.inner.ready_state.get();
        if state <= previous {
            return;
        }
        self.inner.ready_state.set(state);
        tracing::debug!(?previous, ?state, "document ready state changed");

        if previous < ReadyState::Interactive {
            self.dispatch_event(&EventContext::new(
                EventType::DomContentLoaded,
                EventTarget::Document,
            ));
        }
        if state == ReadyState::Complete {
            self.dispatch_event(&EventContext::new(EventType::Load, EventTarget::Document));
        }
    }

    // =========================================================================
    // Selectors
    // =========================================================================

    /// First element matching `selector` inside `scope` (whole document if `None`)
    pub fn query_selector(&self, selector: &str, scope: Option<ElementId>) -> Result<Option<ElementId>> {
        Ok(self.query_selector_all(selector, scope)?.into_iter().next())
    }

    /// Every element matching `selector` inside `scope`, in document order
    pub fn query_selector_all(&self, selector: &str, scope: Option<ElementId>) -> Result<Vec<ElementId>> {
        let list = SelectorList::parse(selector)?;
        let nodes = self.inner.nodes.borrow();
        let start = scope.unwrap_or(self.inner.root);
        if !nodes.contains_key(start) {
            return Err(DomError::UnknownElement(start));
        }

        let mut candidates = collect_descendants(&nodes, start);
        if scope.is_none() {
            candidates.insert(0, start);
        }
        Ok(candidates
            .into_iter()
            .filter(|id| list.matches_in(&nodes, *id))
            .collect())
    }

    /// Whether `el` matches `selector`
    pub fn matches(&self, el: ElementId, selector: &str) -> Result<bool> {
        let list = SelectorList::parse(selector)?;
        let nodes = self.inner.nodes.borrow();
        if !nodes.contains_key(el) {
            return Err(DomError::UnknownElement(el));
        }
        Ok(list.matches_in(&nodes, el))
    }

    fn with_node_mut<R>(&self, el: ElementId, f: impl FnOnce(&mut ElementNode) -> R) -> Result<R> {
        let mut nodes = self.inner.nodes.borrow_mut();
        let node = nodes.get_mut(el).ok_or(DomError::UnknownElement(el))?;
        Ok(f(node))
    }
}

/// Pre-order descendants of `start`, excluding `start`
pub(crate) fn collect_descendants(
    nodes: &SlotMap<ElementId, ElementNode>,
    start: ElementId,
) -> Vec<ElementId> {
    let mut result = Vec::new();
    let mut stack: Vec<ElementId> = match nodes.get(start) {
        Some(node) => node.children.iter().rev().copied().collect(),
        None => return result,
    };

    while let Some(id) = stack.pop() {
        if let Some(node) = nodes.get(id) {
            result.push(id);
            stack.extend(node.children.iter().rev().copied());
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_with_cards(doc: &Document, n: usize) -> (ElementId, Vec<ElementId>) {
        let main = doc.create_element("main");
        doc.add_class(main, "links").unwrap();
        doc.append_child(doc.body(), main).unwrap();

        let cards = (0..n)
            .map(|i| {
                let card = doc.create_element("a");
                doc.add_class(card, "link-card").unwrap();
                doc.set_attribute(card, "href", format!("https://x.example/{}", i))
                    .unwrap();
                doc.append_child(main, card).unwrap();
                card
            })
            .collect();
        (main, cards)
    }

    #[test]
    fn test_new_document_structure() {
        let doc = Document::new();
        assert_eq!(doc.tag(doc.root()).as_deref(), Some("html"));
        assert_eq!(doc.parent(doc.body()), Some(doc.root()));
        assert_eq!(doc.element_count(), 2);
        assert_eq!(doc.ready_state(), ReadyState::Loading);
    }

    #[test]
    fn test_append_moves_child() {
        let doc = Document::new();
        let a = doc.create_element("div");
        let b = doc.create_element("div");
        let child = doc.create_element("span");
        doc.append_child(a, child).unwrap();
        doc.append_child(b, child).unwrap();

        assert!(doc.children(a).is_empty());
        assert_eq!(doc.children(b), vec![child]);
        assert_eq!(doc.parent(child), Some(b));
    }

    #[test]
    fn test_text_content_concatenates_descendants() {
        let doc = Document::new();
        let card = doc.create_element("a");
        let title = doc.create_element("span");
        doc.set_text(title, "GitHub").unwrap();
        doc.append_child(card, title).unwrap();

        assert_eq!(doc.text_content(card).as_deref(), Some("GitHub"));
    }

    #[test]
    fn test_styles_keep_insertion_order() {
        let doc = Document::new();
        let el = doc.create_element("div");
        doc.set_style(el, "opacity", "0").unwrap();
        doc.set_style(el, "transform", "translateY(20px)").unwrap();
        doc.set_style(el, "opacity", "1").unwrap();

        assert_eq!(
            doc.style_text(el).as_deref(),
            Some("opacity: 1; transform: translateY(20px)")
        );
        doc.remove_style(el, "opacity").unwrap();
        assert_eq!(doc.style(el, "opacity"), None);
    }

    #[test]
    fn test_unknown_element_errors() {
        let doc = Document::new();
        let el = doc.create_element("div");
        doc.remove(el).unwrap();

        assert_eq!(doc.set_style(el, "opacity", "1"), Err(DomError::UnknownElement(el)));
        assert!(doc.layout(el).is_none());
    }

    #[test]
    fn test_query_selector_all_document_order() {
        let doc = Document::new();
        let (main, cards) = list_with_cards(&doc, 3);

        assert_eq!(doc.query_selector_all(".link-card", None).unwrap(), cards);
        assert_eq!(doc.query_selector_all("a", Some(main)).unwrap(), cards);
        assert_eq!(doc.query_selector("main.links", None).unwrap(), Some(main));
        assert_eq!(doc.query_selector("html", None).unwrap(), Some(doc.root()));
    }

    #[test]
    fn test_query_selector_scope_excludes_scope() {
        let doc = Document::new();
        let (main, _) = list_with_cards(&doc, 1);
        assert!(doc.query_selector("main", Some(main)).unwrap().is_none());
    }

    #[test]
    fn test_query_invalid_selector_is_error() {
        let doc = Document::new();
        assert!(matches!(
            doc.query_selector_all("..nope", None),
            Err(DomError::InvalidSelector { .. })
        ));
    }

    #[test]
    fn test_intersection_fraction() {
        let doc = Document::new();
        doc.set_viewport_height(100.0);
        let el = doc.create_element("div");
        doc.set_layout(el, LayoutBox::new(80.0, 40.0)).unwrap();

        assert_eq!(doc.intersection(el, 0.0), Some((true, 0.5)));

        doc.scroll_to(200.0);
        assert_eq!(doc.intersection(el, 0.0), Some((false, 0.0)));
        // Root margin pulls the element back in early
        assert_eq!(doc.intersection(el, 80.0), Some((true, 0.0)));
    }

    #[test]
    fn test_intersection_with_margin_before_entering() {
        let doc = Document::new();
        doc.set_viewport_height(100.0);
        let el = doc.create_element("div");
        doc.set_layout(el, LayoutBox::new(120.0, 40.0)).unwrap();

        assert_eq!(doc.intersection(el, 0.0), Some((false, 0.0)));
        assert_eq!(doc.intersection(el, 50.0), Some((true, 0.75)));
    }

    #[test]
    fn test_viewport_listeners() {
        let doc = Document::new();
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        let id = doc.on_viewport_change(move || c.set(c.get() + 1));

        doc.scroll_to(10.0);
        doc.set_viewport_height(500.0);
        assert_eq!(count.get(), 2);

        assert!(doc.remove_viewport_listener(id));
        doc.scroll_to(20.0);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_remove_drops_subtree() {
        let doc = Document::new();
        let (main, cards) = list_with_cards(&doc, 2);
        doc.remove(main).unwrap();

        assert!(!doc.contains(cards[0]));
        assert!(doc.children(doc.body()).is_empty());
        assert_eq!(doc.element_count(), 2);
    }

    #[test]
    fn test_weak_document() {
        let doc = Document::new();
        let weak = doc.downgrade();
        assert!(weak.upgrade().is_some());
        drop(doc);
        assert!(weak.upgrade().is_none());
    }
}
