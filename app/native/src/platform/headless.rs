//! In-memory implementation of every platform seam.
//!
//! The headless backend keeps a plain tree of nodes, records every mutation
//! the portal performs on hosted views and host layers, and never draws
//! anything. It backs the `simulate` CLI command and the test suites.
//!
//! Nodes own their children; parents and windows are referenced weakly, the
//! same way a real view hierarchy is wired.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use super::{
    DividerSegment, HostLayer, HostedView, SplitDivider, ViewId, ViewNode, WindowContext, WindowId,
};
use crate::config::Rgba;
use crate::geometry::{Point, Rect};

// ============================================================================
// Nodes
// ============================================================================

/// A node of the headless view tree.
pub struct HeadlessNode {
    id: ViewId,
    this: Weak<Self>,
    /// Frame in the parent's coordinate space.
    frame: Cell<Rect>,
    /// Scroll offset; becomes the origin of the node's bounds.
    scroll_offset: Cell<Point>,
    hidden: Cell<bool>,
    parent: RefCell<Weak<Self>>,
    children: RefCell<Vec<Rc<Self>>>,
    /// Only set on a window's root node.
    window: RefCell<Weak<HeadlessWindow>>,
}

impl HeadlessNode {
    /// Creates a detached node with the given frame.
    #[must_use]
    pub fn new(frame: Rect) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            id: ViewId::new(),
            this: this.clone(),
            frame: Cell::new(frame),
            scroll_offset: Cell::new(Point::default()),
            hidden: Cell::new(false),
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(Vec::new()),
            window: RefCell::new(Weak::new()),
        })
    }

    /// Appends `child`, detaching it from any previous parent first.
    pub fn add_child(&self, child: &Rc<Self>) {
        child.remove_from_parent();
        *child.parent.borrow_mut() = self.this.clone();
        self.children.borrow_mut().push(Rc::clone(child));
    }

    /// Creates a child with `frame` and returns it.
    pub fn new_child(&self, frame: Rect) -> Rc<Self> {
        let child = Self::new(frame);
        self.add_child(&child);
        child
    }

    /// Detaches this node from its parent. The caller's `Rc` keeps it alive.
    pub fn remove_from_parent(&self) {
        let parent = self.parent.replace(Weak::new());
        if let Some(parent) = parent.upgrade() {
            parent.children.borrow_mut().retain(|child| child.id != self.id);
        }
    }

    #[must_use]
    pub fn frame(&self) -> Rect { self.frame.get() }

    pub fn set_frame(&self, frame: Rect) { self.frame.set(frame); }

    pub fn set_hidden(&self, hidden: bool) { self.hidden.set(hidden); }

    pub fn set_scroll_offset(&self, offset: Point) { self.scroll_offset.set(offset); }

    #[must_use]
    pub fn child_count(&self) -> usize { self.children.borrow().len() }

    fn headless_window(&self) -> Option<Rc<HeadlessWindow>> {
        let parent = self.parent.borrow().upgrade();
        let Some(mut node) = parent else {
            return self.window.borrow().upgrade();
        };
        loop {
            let next = node.parent.borrow().upgrade();
            match next {
                Some(next) => node = next,
                None => return node.window.borrow().upgrade(),
            }
        }
    }

    /// Offset that maps this node's bounds into its parent's space.
    fn offset_in_parent(&self) -> (f64, f64) {
        let frame = self.frame.get();
        let scroll = self.scroll_offset.get();
        (frame.x - scroll.x, frame.y - scroll.y)
    }
}

impl ViewNode for HeadlessNode {
    fn id(&self) -> ViewId { self.id }

    fn parent(&self) -> Option<Rc<dyn ViewNode>> {
        let parent: Rc<dyn ViewNode> = self.parent.borrow().upgrade()?;
        Some(parent)
    }

    fn window(&self) -> Option<Rc<dyn WindowContext>> {
        let window: Rc<dyn WindowContext> = self.headless_window()?;
        Some(window)
    }

    fn bounds(&self) -> Rect {
        let frame = self.frame.get();
        let scroll = self.scroll_offset.get();
        Rect::new(scroll.x, scroll.y, frame.width, frame.height)
    }

    fn convert_to_window(&self, rect: Rect) -> Rect {
        let (dx, dy) = self.offset_in_parent();
        let mut converted = rect.offset_by(dx, dy);
        let mut node = self.parent.borrow().upgrade();
        while let Some(current) = node {
            let (dx, dy) = current.offset_in_parent();
            converted = converted.offset_by(dx, dy);
            node = current.parent.borrow().upgrade();
        }
        converted
    }

    fn is_hidden(&self) -> bool { self.hidden.get() }
}

// ============================================================================
// Hosted Views
// ============================================================================

/// Counters of every mutation the portal performed on a hosted view.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MutationCounts {
    pub frame_writes: usize,
    pub bounds_writes: usize,
    pub hidden_writes: usize,
    pub geometry_reconciles: usize,
    pub surface_refreshes: usize,
}

impl MutationCounts {
    /// Writes that change what is on screen.
    #[must_use]
    pub const fn state_writes(&self) -> usize {
        self.frame_writes + self.bounds_writes + self.hidden_writes
    }
}

/// A recording hosted view.
pub struct HeadlessHostedView {
    id: ViewId,
    frame: Cell<Rect>,
    bounds: Cell<Rect>,
    hidden: Cell<bool>,
    counts: Cell<MutationCounts>,
}

impl HeadlessHostedView {
    /// Creates a visible hosted view at a placeholder size.
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            id: ViewId::new(),
            frame: Cell::new(Rect::new(0.0, 0.0, 800.0, 600.0)),
            bounds: Cell::new(Rect::new(0.0, 0.0, 800.0, 600.0)),
            hidden: Cell::new(false),
            counts: Cell::new(MutationCounts::default()),
        })
    }

    #[must_use]
    pub fn counts(&self) -> MutationCounts { self.counts.get() }

    pub fn reset_counts(&self) { self.counts.set(MutationCounts::default()); }

    fn record(&self, update: impl FnOnce(&mut MutationCounts)) {
        let mut counts = self.counts.get();
        update(&mut counts);
        self.counts.set(counts);
    }
}

impl HostedView for HeadlessHostedView {
    fn id(&self) -> ViewId { self.id }

    fn frame(&self) -> Rect { self.frame.get() }

    fn set_frame(&self, frame: Rect) {
        self.frame.set(frame);
        self.record(|c| c.frame_writes += 1);
    }

    fn bounds(&self) -> Rect { self.bounds.get() }

    fn set_bounds(&self, bounds: Rect) {
        self.bounds.set(bounds);
        self.record(|c| c.bounds_writes += 1);
    }

    fn is_hidden(&self) -> bool { self.hidden.get() }

    fn set_hidden(&self, hidden: bool) {
        self.hidden.set(hidden);
        self.record(|c| c.hidden_writes += 1);
    }

    fn reconcile_geometry(&self) { self.record(|c| c.geometry_reconciles += 1); }

    fn refresh_surface(&self) { self.record(|c| c.surface_refreshes += 1); }
}

// ============================================================================
// Host Layer
// ============================================================================

/// Observable state of a headless host layer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HostLayerState {
    pub frame: Rect,
    /// Child ids, bottom to top.
    pub children: Vec<ViewId>,
    pub segments: Vec<DividerSegment>,
    pub divider_color: Option<Rgba>,
    pub installed: bool,
    /// Bring-to-front requests for children already in the stack.
    pub restacks: usize,
    pub overlay_draws: usize,
    pub transactions: usize,
    /// Transactions currently open.
    pub open_transactions: usize,
}

/// Host layer that records into a shared [`HostLayerState`].
pub struct HeadlessHostLayer {
    state: Rc<RefCell<HostLayerState>>,
}

impl HostLayer for HeadlessHostLayer {
    fn set_frame(&self, frame: Rect) { self.state.borrow_mut().frame = frame; }

    fn insert_child(&self, view: &Rc<dyn HostedView>) {
        let id = view.id();
        let mut state = self.state.borrow_mut();
        if !state.children.contains(&id) {
            state.children.push(id);
        }
    }

    fn bring_child_to_front(&self, id: ViewId) {
        let mut state = self.state.borrow_mut();
        if let Some(index) = state.children.iter().position(|child| *child == id) {
            if index + 1 != state.children.len() {
                let child = state.children.remove(index);
                state.children.push(child);
            }
            state.restacks += 1;
        }
    }

    fn remove_child(&self, id: ViewId) { self.state.borrow_mut().children.retain(|child| *child != id); }

    fn draw_dividers(&self, segments: &[DividerSegment], color: Rgba) {
        let mut state = self.state.borrow_mut();
        state.segments = segments.to_vec();
        state.divider_color = Some(color);
        state.overlay_draws += 1;
    }

    fn perform_without_animation(&self, apply: &mut dyn FnMut()) {
        {
            let mut state = self.state.borrow_mut();
            state.transactions += 1;
            state.open_transactions += 1;
        }
        apply();
        self.state.borrow_mut().open_transactions -= 1;
    }

    fn uninstall(&self) {
        let mut state = self.state.borrow_mut();
        state.installed = false;
        state.children.clear();
        state.segments.clear();
    }
}

// ============================================================================
// Window
// ============================================================================

/// A headless top-level window.
///
/// The root node spans the whole window; the content node is the portal's
/// reference node and is where callers build their placeholder tree.
pub struct HeadlessWindow {
    id: WindowId,
    scale: Cell<f64>,
    root: Rc<HeadlessNode>,
    content: Rc<HeadlessNode>,
    dividers: RefCell<Vec<SplitDivider>>,
    host: RefCell<Option<Rc<RefCell<HostLayerState>>>>,
    host_installs: Cell<usize>,
}

impl HeadlessWindow {
    /// Creates a window whose content node occupies `content_frame` in window space.
    #[must_use]
    pub fn new(id: u64, content_frame: Rect, scale: f64) -> Rc<Self> {
        let root = HeadlessNode::new(Rect::new(0.0, 0.0, content_frame.max_x(), content_frame.max_y()));
        let content = root.new_child(content_frame);

        Rc::new_cyclic(|weak: &Weak<Self>| {
            *root.window.borrow_mut() = weak.clone();
            Self {
                id: WindowId(id),
                scale: Cell::new(scale),
                root,
                content,
                dividers: RefCell::new(Vec::new()),
                host: RefCell::new(None),
                host_installs: Cell::new(0),
            }
        })
    }

    #[must_use]
    pub const fn window_id(&self) -> WindowId { self.id }

    #[must_use]
    pub fn root(&self) -> Rc<HeadlessNode> { Rc::clone(&self.root) }

    /// The reference node under which anchors are placed.
    #[must_use]
    pub fn content(&self) -> Rc<HeadlessNode> { Rc::clone(&self.content) }

    pub fn set_scale(&self, scale: f64) { self.scale.set(scale); }

    pub fn set_split_dividers(&self, dividers: Vec<SplitDivider>) { *self.dividers.borrow_mut() = dividers; }

    /// State of the most recently installed host layer.
    #[must_use]
    pub fn host_state(&self) -> Option<HostLayerState> {
        self.host.borrow().as_ref().map(|state| state.borrow().clone())
    }

    /// How many host layers have been installed over the window's lifetime.
    #[must_use]
    pub fn host_installs(&self) -> usize { self.host_installs.get() }
}

impl WindowContext for HeadlessWindow {
    fn id(&self) -> WindowId { self.id }

    fn reference_node(&self) -> Option<Rc<dyn ViewNode>> {
        let content: Rc<dyn ViewNode> = self.content.clone();
        Some(content)
    }

    fn backing_scale_factor(&self) -> f64 { self.scale.get() }

    fn install_host_layer(&self) -> Box<dyn HostLayer> {
        let state = Rc::new(RefCell::new(HostLayerState {
            installed: true,
            ..HostLayerState::default()
        }));
        *self.host.borrow_mut() = Some(Rc::clone(&state));
        self.host_installs.set(self.host_installs.get() + 1);
        Box::new(HeadlessHostLayer { state })
    }

    fn split_dividers(&self) -> Vec<SplitDivider> { self.dividers.borrow().clone() }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn convert_to_window_accumulates_offsets() {
        let window = HeadlessWindow::new(1, Rect::new(0.0, 30.0, 800.0, 570.0), 2.0);
        let pane = window.content().new_child(Rect::new(100.0, 10.0, 200.0, 200.0));
        let anchor = pane.new_child(Rect::new(5.0, 5.0, 50.0, 50.0));

        assert_eq!(anchor.convert_to_window(anchor.bounds()), Rect::new(105.0, 45.0, 50.0, 50.0));
    }

    #[test]
    fn scroll_offset_shifts_descendants() {
        let window = HeadlessWindow::new(1, Rect::new(0.0, 0.0, 800.0, 600.0), 1.0);
        let scroller = window.content().new_child(Rect::new(0.0, 0.0, 400.0, 300.0));
        scroller.set_scroll_offset(Point::new(0.0, 100.0));
        let anchor = scroller.new_child(Rect::new(0.0, 150.0, 400.0, 100.0));

        assert_eq!(anchor.convert_to_window(anchor.bounds()).y, 50.0);
    }

    #[test]
    fn window_is_resolved_through_root() {
        let window = HeadlessWindow::new(7, Rect::new(0.0, 0.0, 800.0, 600.0), 1.0);
        let anchor = window.content().new_child(Rect::new(0.0, 0.0, 10.0, 10.0));

        let resolved = anchor.window().map(|w| w.id());
        assert_eq!(resolved, Some(WindowId(7)));

        anchor.remove_from_parent();
        assert!(anchor.window().is_none());
        assert_eq!(window.content().child_count(), 0);
    }

    #[test]
    fn moving_a_node_changes_its_window() {
        let first = HeadlessWindow::new(1, Rect::new(0.0, 0.0, 800.0, 600.0), 1.0);
        let second = HeadlessWindow::new(2, Rect::new(0.0, 0.0, 800.0, 600.0), 1.0);
        let anchor = first.content().new_child(Rect::new(0.0, 0.0, 10.0, 10.0));

        second.content().add_child(&anchor);

        assert_eq!(first.content().child_count(), 0);
        assert_eq!(anchor.window().map(|w| w.id()), Some(WindowId(2)));
    }

    #[test]
    fn hosted_view_records_mutations() {
        let view = HeadlessHostedView::new();
        view.set_frame(Rect::new(0.0, 0.0, 10.0, 10.0));
        view.set_hidden(true);
        view.refresh_surface();

        let counts = view.counts();
        assert_eq!(counts.frame_writes, 1);
        assert_eq!(counts.hidden_writes, 1);
        assert_eq!(counts.surface_refreshes, 1);
        assert_eq!(counts.state_writes(), 2);
    }

    #[test]
    fn host_layer_tracks_stack_order() {
        let window = HeadlessWindow::new(1, Rect::new(0.0, 0.0, 800.0, 600.0), 1.0);
        let layer = window.install_host_layer();
        let a: Rc<dyn HostedView> = HeadlessHostedView::new();
        let b: Rc<dyn HostedView> = HeadlessHostedView::new();

        layer.insert_child(&a);
        layer.insert_child(&b);
        layer.insert_child(&a);
        layer.bring_child_to_front(a.id());

        let state = window.host_state().unwrap();
        assert_eq!(state.children, vec![b.id(), a.id()]);
        assert_eq!(state.restacks, 1);

        layer.uninstall();
        assert!(!window.host_state().unwrap().installed);
    }
}
