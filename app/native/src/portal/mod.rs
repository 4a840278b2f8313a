//! Per-window portal that keeps hosted views positioned over their anchors.
//!
//! A portal owns one host layer installed in its window, the window's entry
//! table and the divider overlay. Every reconciliation, whether for a single
//! entry or for all of them, goes through the same steps:
//!
//! 1. measure the anchor and its clip chain in window space
//! 2. run [`reconcile`] to get a [`Placement`]
//! 3. apply the placement inside an animation-free transaction, writing only
//!    what differs
//!
//! Full passes additionally prune dead entries, follow the reference node
//! with the host frame and redraw the divider overlay. They are never run
//! synchronously from a notification; they are coalesced by the
//! [`Scheduler`] and run on the next turn.

pub mod entry;
pub mod overlay;
pub mod registry;
pub mod scheduler;
pub mod snapshot;

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

pub use entry::{Entry, EntryTable};
pub use hit_test::{DragPayload, HitTarget, SidebarStrip};
pub use overlay::DividerOverlay;
pub use registry::{GeometryEvent, PortalRegistry};
pub use scheduler::{Scheduler, Trigger};
pub use snapshot::{EntrySnapshot, PortalSnapshot};

use crate::config::PortalConfig;
use crate::geometry::{GeometryInput, Placement, Point, Rect, reconcile};
use crate::platform::{
    HostLayer, HostedView, TurnDispatcher, ViewId, ViewNode, WindowContext, WindowId,
};

/// Ancestor rectangles of one anchor. Split trees rarely nest deeper than this.
type ClipChain = SmallVec<[Rect; 8]>;

/// Anchor geometry collected from the view tree.
struct Measurement {
    anchor_in_window: Rect,
    clip_chain: ClipChain,
    ancestor_hidden: bool,
    in_window: bool,
}

// ============================================================================
// Portal
// ============================================================================

/// Host container and synchronization engine for one window.
pub struct Portal {
    this: Weak<RefCell<Self>>,
    window: Weak<dyn WindowContext>,
    window_id: WindowId,
    host: Box<dyn HostLayer>,
    /// Host frame in window space.
    host_frame: Rect,
    entries: EntryTable,
    /// Hosted views removed from the table since the registry last asked.
    released: Vec<ViewId>,
    /// Mirror of the host's child stack, bottom to top.
    children: Vec<ViewId>,
    scheduler: Scheduler,
    overlay: DividerOverlay,
    sidebar: SidebarStrip,
    config: PortalConfig,
    torn_down: bool,
}

impl Portal {
    /// Install a host layer into `window` and create its portal.
    #[must_use]
    pub fn install(
        window: &Rc<dyn WindowContext>,
        dispatcher: Rc<dyn TurnDispatcher>,
        config: PortalConfig,
    ) -> Rc<RefCell<Self>> {
        let host = window.install_host_layer();
        let portal = Rc::new_cyclic(|this| {
            RefCell::new(Self {
                this: this.clone(),
                window: Rc::downgrade(window),
                window_id: window.id(),
                host,
                host_frame: Rect::zero(),
                entries: EntryTable::new(),
                released: Vec::new(),
                children: Vec::new(),
                scheduler: Scheduler::new(dispatcher),
                overlay: DividerOverlay::new(),
                sidebar: SidebarStrip::new(),
                config,
                torn_down: false,
            })
        });

        {
            let mut created = portal.borrow_mut();
            created.sync_host_frame();
            tracing::debug!(
                window = %created.window_id,
                host_frame = ?created.host_frame,
                "portal: installed host layer"
            );
        }
        portal
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    #[must_use]
    pub const fn window_id(&self) -> WindowId { self.window_id }

    #[must_use]
    pub const fn host_frame(&self) -> Rect { self.host_frame }

    #[must_use]
    pub const fn entries(&self) -> &EntryTable { &self.entries }

    /// Child stack, bottom to top.
    #[must_use]
    pub fn children(&self) -> &[ViewId] { &self.children }

    #[must_use]
    pub fn len(&self) -> usize { self.entries.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    #[must_use]
    pub fn is_bound(&self, hosted_id: ViewId) -> bool { self.entries.contains(hosted_id) }

    #[must_use]
    pub fn hosted_for_anchor(&self, anchor_id: ViewId) -> Option<ViewId> {
        self.entries.hosted_for_anchor(anchor_id)
    }

    #[must_use]
    pub const fn is_torn_down(&self) -> bool { self.torn_down }

    #[must_use]
    pub fn is_pending(&self, trigger: Trigger) -> bool { self.scheduler.is_pending(trigger) }

    #[must_use]
    pub const fn config(&self) -> &PortalConfig { &self.config }

    /// Drain the ids of hosted views displaced, detached or pruned since the
    /// last call.
    pub fn take_released(&mut self) -> Vec<ViewId> { std::mem::take(&mut self.released) }

    fn reference_node(&self) -> Option<Rc<dyn ViewNode>> {
        self.window.upgrade().and_then(|window| window.reference_node())
    }

    fn scale(&self) -> f64 { self.window.upgrade().map_or(1.0, |window| window.backing_scale_factor()) }

    // ------------------------------------------------------------------------
    // Binding
    // ------------------------------------------------------------------------

    /// Bind `hosted` to `anchor`, then reconcile it once.
    ///
    /// A hosted view already bound to `anchor` is detached first, and a
    /// previous anchor of `hosted` loses its mapping. The child stack only
    /// changes when the entry is new, becomes visible, or its z-priority
    /// goes up.
    pub fn bind(
        &mut self,
        hosted: &Rc<dyn HostedView>,
        anchor: &Rc<dyn ViewNode>,
        visible_in_ui: bool,
        z_priority: i32,
    ) {
        if self.torn_down {
            tracing::debug!(window = %self.window_id, "portal: bind after teardown ignored");
            return;
        }

        // The content area may have resized earlier in this turn.
        self.sync_host_frame();

        let hosted_id = hosted.id();
        let outcome = self
            .entries
            .upsert(hosted_id, Entry::new(hosted, anchor, visible_in_ui, z_priority));

        if let Some((displaced, _)) = outcome.displaced {
            self.remove_child(displaced);
            self.released.push(displaced);
            tracing::debug!(
                window = %self.window_id,
                hosted = %displaced,
                anchor = %anchor.id(),
                "portal: detached hosted view displaced from anchor"
            );
        }
        if let Some(stale) = outcome.stale_anchor {
            tracing::trace!(hosted = %hosted_id, anchor = %stale, "portal: cleared stale anchor mapping");
        }

        let reference = self.reference_node();
        let placement = self.placement(anchor, visible_in_ui, reference.as_ref());

        // Seed geometry before the view enters the stack so it never shows
        // at its placeholder size.
        if let (None, Some(frame)) = (placement.hide_reason, placement.frame) {
            let epsilon = self.config.geometry.frame_epsilon;
            if geometry_is_stale(hosted.as_ref(), frame, epsilon) {
                self.host.perform_without_animation(&mut || {
                    write_geometry(hosted.as_ref(), frame, epsilon);
                });
            }
        }

        if self.children.contains(&hosted_id) {
            if outcome.became_visible(visible_in_ui) || outcome.priority_increased(z_priority) {
                self.raise(hosted_id, z_priority);
            }
        } else {
            self.host.insert_child(hosted);
            self.children.push(hosted_id);
            self.keep_higher_priority_above(z_priority);
        }

        self.apply_placement(hosted, placement);

        tracing::debug!(
            window = %self.window_id,
            hosted = %hosted_id,
            anchor = %anchor.id(),
            visible = visible_in_ui,
            z = z_priority,
            hidden = placement.is_hidden(),
            "portal: bound hosted view"
        );

        self.schedule(Trigger::DeferredFullSync);
    }

    /// Remove the entry for `hosted_id` and take its view out of the host.
    ///
    /// The hosted view's own state is left as it is.
    pub fn detach(&mut self, hosted_id: ViewId) -> bool {
        if self.entries.remove(hosted_id).is_none() {
            return false;
        }
        self.remove_child(hosted_id);
        self.released.push(hosted_id);
        tracing::debug!(window = %self.window_id, hosted = %hosted_id, "portal: detached hosted view");
        self.schedule(Trigger::DeferredFullSync);
        true
    }

    /// Change only the visibility flag of a bound entry and reconcile it.
    pub fn update_visibility(&mut self, hosted_id: ViewId, visible_in_ui: bool) -> bool {
        let Some(previous) = self.entries.set_visible(hosted_id, visible_in_ui) else {
            return false;
        };

        if visible_in_ui
            && !previous
            && let Some(z_priority) = self.entries.get(hosted_id).map(|entry| entry.z_priority)
        {
            self.raise(hosted_id, z_priority);
        }

        self.sync_host_frame();
        let reference = self.reference_node();
        self.synchronize_entry(hosted_id, reference.as_ref());
        true
    }

    /// Mark an entry permanently invisible and hide its view right away.
    pub fn hide_entry(&mut self, hosted_id: ViewId) -> bool {
        if self.entries.set_visible(hosted_id, false).is_none() {
            return false;
        }

        if let Some(hosted) = self.entries.get(hosted_id).and_then(Entry::hosted_view)
            && !hosted.is_hidden()
        {
            self.host.perform_without_animation(&mut || hosted.set_hidden(true));
        }
        tracing::debug!(window = %self.window_id, hosted = %hosted_id, "portal: entry hidden");
        true
    }

    // ------------------------------------------------------------------------
    // Synchronization
    // ------------------------------------------------------------------------

    /// Reconcile whatever is bound to `anchor_id`, then arm a full pass.
    ///
    /// Returns `false` without doing anything if nothing is bound there.
    pub fn synchronize_hosted_view_for_anchor(&mut self, anchor_id: ViewId) -> bool {
        let Some(hosted_id) = self.entries.hosted_for_anchor(anchor_id) else {
            return false;
        };

        self.sync_host_frame();
        let reference = self.reference_node();
        self.synchronize_entry(hosted_id, reference.as_ref());
        // Sibling notifications of the same edit may arrive out of order or not at all.
        self.schedule(Trigger::DeferredFullSync);
        true
    }

    /// Arm the external geometry trigger.
    pub fn schedule_geometry_refresh(&self) -> bool { self.schedule(Trigger::ExternalGeometry) }

    /// Remove entries whose views are gone or whose anchor left this
    /// window's reference subtree.
    pub fn prune_dead_entries(&mut self) -> usize {
        let reference = self.reference_node();
        let window_id = self.window_id;

        let removed = self.entries.remove_where(|entry| {
            let Some(anchor) = entry.anchor_view() else {
                return true;
            };
            entry.is_dead()
                || anchor.window().map(|window| window.id()) != Some(window_id)
                || !is_descendant(&anchor, reference.as_ref())
        });

        for (hosted_id, entry) in &removed {
            self.remove_child(*hosted_id);
            self.released.push(*hosted_id);
            tracing::debug!(
                window = %self.window_id,
                hosted = %hosted_id,
                anchor = %entry.anchor_id,
                "portal: pruned entry"
            );
        }
        removed.len()
    }

    /// Full pass over every entry. Returns the number of entries whose
    /// hosted view was mutated.
    pub fn synchronize_all(&mut self) -> usize {
        if self.torn_down {
            return 0;
        }

        let pruned = self.prune_dead_entries();
        self.sync_host_frame();

        let reference = self.reference_node();
        let mutated = self
            .stack_order()
            .into_iter()
            .filter(|hosted_id| self.synchronize_entry(*hosted_id, reference.as_ref()))
            .count();

        self.refresh_overlay();

        tracing::trace!(
            window = %self.window_id,
            entries = self.entries.len(),
            pruned,
            mutated,
            "portal: full pass"
        );
        mutated
    }

    fn schedule(&self, trigger: Trigger) -> bool {
        let portal = self.this.clone();
        self.scheduler.arm(trigger, move || {
            let Some(portal) = portal.upgrade() else {
                return;
            };
            let Ok(mut portal) = portal.try_borrow_mut() else {
                tracing::warn!(trigger = trigger.as_str(), "portal: busy when coalesced pass ran, skipped");
                return;
            };
            portal.synchronize_all();
        })
    }

    fn synchronize_entry(&self, hosted_id: ViewId, reference: Option<&Rc<dyn ViewNode>>) -> bool {
        let Some(entry) = self.entries.get(hosted_id) else {
            return false;
        };
        let (Some(hosted), Some(anchor)) = (entry.hosted_view(), entry.anchor_view()) else {
            return false;
        };

        let placement = self.placement(&anchor, entry.visible_in_ui, reference);
        self.apply_placement(&hosted, placement)
    }

    fn sync_host_frame(&mut self) -> bool {
        let Some(reference) = self.reference_node() else {
            return false;
        };
        let frame = reference.convert_to_window(reference.bounds());
        if !frame.is_finite() || self.host_frame.approx_eq(&frame, self.config.geometry.frame_epsilon) {
            return false;
        }

        self.host.set_frame(frame);
        self.host_frame = frame;
        tracing::trace!(window = %self.window_id, frame = ?frame, "portal: host frame updated");
        true
    }

    /// Entries in stack order, followed by any not in the stack.
    fn stack_order(&self) -> Vec<ViewId> {
        let mut order: Vec<ViewId> = self
            .children
            .iter()
            .copied()
            .filter(|id| self.entries.contains(*id))
            .collect();
        let mut rest: Vec<ViewId> = self
            .entries
            .hosted_ids()
            .into_iter()
            .filter(|id| !self.children.contains(id))
            .collect();
        rest.sort_unstable();
        order.extend(rest);
        order
    }

    // ------------------------------------------------------------------------
    // Geometry
    // ------------------------------------------------------------------------

    fn measure(&self, anchor: &Rc<dyn ViewNode>, reference: Option<&Rc<dyn ViewNode>>) -> Measurement {
        let reference_id = reference.map(|node| node.id());
        let mut clip_chain = ClipChain::new();
        let mut ancestor_hidden = anchor.is_hidden();
        let mut reached_reference = false;

        let mut node = anchor.parent();
        while let Some(current) = node {
            if Some(current.id()) == reference_id {
                reached_reference = true;
            }
            if !reached_reference {
                clip_chain.push(current.convert_to_window(current.bounds()));
            }
            ancestor_hidden |= current.is_hidden();
            node = current.parent();
        }

        let in_window = reached_reference
            && anchor.window().map(|window| window.id()) == Some(self.window_id);

        Measurement {
            anchor_in_window: anchor.convert_to_window(anchor.bounds()),
            clip_chain,
            ancestor_hidden,
            in_window,
        }
    }

    fn placement(
        &self,
        anchor: &Rc<dyn ViewNode>,
        visible_in_ui: bool,
        reference: Option<&Rc<dyn ViewNode>>,
    ) -> Placement {
        let measurement = self.measure(anchor, reference);
        reconcile(&GeometryInput {
            anchor_in_window: measurement.anchor_in_window,
            clip_chain: &measurement.clip_chain,
            host_frame: self.host_frame,
            scale: self.scale(),
            visible_in_ui,
            ancestor_hidden: measurement.ancestor_hidden,
            in_window: measurement.in_window,
            min_visible_extent: self.config.geometry.min_visible_extent,
        })
    }

    /// Write a placement to a hosted view. Returns `true` if anything changed.
    fn apply_placement(&self, hosted: &Rc<dyn HostedView>, placement: Placement) -> bool {
        let epsilon = self.config.geometry.frame_epsilon;
        let hide = placement.is_hidden();
        // Hidden entries keep their last frame.
        let target = placement.frame.filter(|_| !hide);

        let frame_stale = target.is_some_and(|frame| geometry_is_stale(hosted.as_ref(), frame, epsilon));
        if !frame_stale && hosted.is_hidden() == hide {
            return false;
        }

        self.host.perform_without_animation(&mut || {
            if hide {
                hosted.set_hidden(true);
                return;
            }
            if let Some(frame) = target {
                write_geometry(hosted.as_ref(), frame, epsilon);
            }
            if hosted.is_hidden() {
                hosted.set_hidden(false);
            }
        });

        tracing::trace!(
            hosted = %hosted.id(),
            frame = ?target,
            reason = ?placement.hide_reason,
            "portal: applied placement"
        );
        true
    }

    // ------------------------------------------------------------------------
    // Child Stack
    // ------------------------------------------------------------------------

    fn bring_to_front(&mut self, hosted_id: ViewId) {
        let Some(index) = self.children.iter().position(|id| *id == hosted_id) else {
            return;
        };
        if index + 1 == self.children.len() {
            return;
        }
        let id = self.children.remove(index);
        self.children.push(id);
        self.host.bring_child_to_front(id);
    }

    fn raise(&mut self, hosted_id: ViewId, z_priority: i32) {
        self.bring_to_front(hosted_id);
        self.keep_higher_priority_above(z_priority);
    }

    /// Move every entry with a z-priority above `z_priority` back on top,
    /// keeping their relative order.
    fn keep_higher_priority_above(&mut self, z_priority: i32) {
        let higher: Vec<ViewId> = self
            .children
            .iter()
            .copied()
            .filter(|id| self.entries.get(*id).is_some_and(|entry| entry.z_priority > z_priority))
            .collect();
        for id in higher {
            self.bring_to_front(id);
        }
    }

    fn remove_child(&mut self, hosted_id: ViewId) {
        self.children.retain(|id| *id != hosted_id);
        self.host.remove_child(hosted_id);
    }

    // ------------------------------------------------------------------------
    // Overlay and Hit Testing
    // ------------------------------------------------------------------------

    /// Visible hosted views with their frames in host space, topmost first.
    fn visible_hosted_frames(&self) -> Vec<(ViewId, Rect)> {
        self.children
            .iter()
            .rev()
            .filter_map(|id| {
                let hosted = self.entries.get(*id)?.hosted_view()?;
                (!hosted.is_hidden()).then(|| (*id, hosted.frame()))
            })
            .collect()
    }

    fn refresh_overlay(&mut self) {
        let dividers = self.window.upgrade().map(|window| window.split_dividers()).unwrap_or_default();
        let frames: Vec<Rect> = self.visible_hosted_frames().into_iter().map(|(_, frame)| frame).collect();

        let segments = overlay::compute_segments(
            &dividers,
            &frames,
            self.host_frame,
            self.config.overlay.divider_thickness,
        );
        self.overlay.refresh(self.host.as_ref(), segments, &self.config.overlay);

        let host_x = self.host_frame.x;
        let leftmost = frames.iter().map(|frame| frame.min_x() + host_x).reduce(f64::min);
        self.sidebar.observe(leftmost, &self.config.hit_test);
    }

    /// Route a pointer event at `point` (window space).
    #[must_use]
    pub fn hit_test(&self, point: Point, drag: Option<&DragPayload>) -> HitTarget {
        let dividers = self.window.upgrade().map(|window| window.split_dividers()).unwrap_or_default();
        let host = self.host_frame;
        let hosted: Vec<(ViewId, Rect)> = self
            .visible_hosted_frames()
            .into_iter()
            .map(|(id, frame)| (id, frame.offset_by(host.x, host.y)))
            .collect();

        hit_test::route(
            &hit_test::HitTestInput {
                point,
                host_frame: host,
                dividers: &dividers,
                hosted: &hosted,
                drag,
            },
            &self.sidebar,
            &self.config.hit_test,
            &self.config.drag_routing,
        )
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Detach every entry and remove the host layer from the window.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }

        let detached = self.entries.drain();
        for (hosted_id, _) in &detached {
            self.host.remove_child(*hosted_id);
        }
        self.children.clear();
        self.released.clear();
        self.overlay.clear();
        self.host.uninstall();
        self.torn_down = true;

        tracing::debug!(window = %self.window_id, detached = detached.len(), "portal: torn down");
    }

    /// Capture the portal's current state.
    #[must_use]
    pub fn snapshot(&self) -> PortalSnapshot {
        let entries = self
            .stack_order()
            .into_iter()
            .filter_map(|hosted_id| {
                let entry = self.entries.get(hosted_id)?;
                let hosted = entry.hosted_view();
                Some(EntrySnapshot {
                    hosted: hosted_id,
                    anchor: entry.anchor_id,
                    visible_in_ui: entry.visible_in_ui,
                    z_priority: entry.z_priority,
                    stack_index: self.children.iter().position(|id| *id == hosted_id),
                    frame: hosted.as_ref().map(|view| view.frame()),
                    hidden: hosted.as_ref().map(|view| view.is_hidden()),
                })
            })
            .collect();

        PortalSnapshot {
            window: self.window_id,
            host_frame: self.host_frame,
            children: self.children.clone(),
            entries,
            segments: self.overlay.segments().to_vec(),
            sidebar_edge: self.sidebar.edge_x(),
        }
    }
}

impl std::fmt::Debug for Portal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Portal")
            .field("window_id", &self.window_id)
            .field("host_frame", &self.host_frame)
            .field("entries", &self.entries.len())
            .field("children", &self.children)
            .field("torn_down", &self.torn_down)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn geometry_is_stale(hosted: &dyn HostedView, frame: Rect, epsilon: f64) -> bool {
    !hosted.frame().approx_eq(&frame, epsilon) || !hosted.bounds().approx_eq(&frame.local_bounds(), epsilon)
}

/// Write frame and bounds where they differ, then let the hosted view relayout
/// and repaint.
fn write_geometry(hosted: &dyn HostedView, frame: Rect, epsilon: f64) -> bool {
    let mut changed = false;
    if !hosted.frame().approx_eq(&frame, epsilon) {
        hosted.set_frame(frame);
        changed = true;
    }
    let bounds = frame.local_bounds();
    if !hosted.bounds().approx_eq(&bounds, epsilon) {
        hosted.set_bounds(bounds);
        changed = true;
    }
    if changed {
        hosted.reconcile_geometry();
        hosted.refresh_surface();
    }
    changed
}

fn is_descendant(node: &Rc<dyn ViewNode>, reference: Option<&Rc<dyn ViewNode>>) -> bool {
    let Some(reference_id) = reference.map(|reference| reference.id()) else {
        return false;
    };
    let mut current = node.parent();
    while let Some(ancestor) = current {
        if ancestor.id() == reference_id {
            return true;
        }
        current = ancestor.parent();
    }
    false
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::platform::TurnQueue;
    use crate::platform::headless::{HeadlessHostedView, HeadlessNode, HeadlessWindow, MutationCounts};

    struct Fixture {
        queue: TurnQueue,
        window: Rc<HeadlessWindow>,
        portal: Rc<RefCell<Portal>>,
    }

    fn fixture() -> Fixture {
        let queue = TurnQueue::new();
        let window = HeadlessWindow::new(1, Rect::new(0.0, 40.0, 800.0, 560.0), 2.0);
        let context: Rc<dyn WindowContext> = window.clone();
        let portal = Portal::install(&context, Rc::new(queue.clone()), PortalConfig::default());
        Fixture { queue, window, portal }
    }

    fn pane(window: &HeadlessWindow, frame: Rect) -> Rc<HeadlessNode> { window.content().new_child(frame) }

    fn bind(fixture: &Fixture, hosted: &Rc<HeadlessHostedView>, anchor: &Rc<HeadlessNode>, visible: bool, z: i32) {
        let hosted: Rc<dyn HostedView> = hosted.clone();
        let anchor: Rc<dyn ViewNode> = anchor.clone();
        fixture.portal.borrow_mut().bind(&hosted, &anchor, visible, z);
    }

    #[test]
    fn test_install_tracks_reference_frame() {
        let fixture = fixture();
        assert_eq!(fixture.portal.borrow().host_frame(), Rect::new(0.0, 40.0, 800.0, 560.0));
        assert_eq!(fixture.window.host_state().unwrap().frame, Rect::new(0.0, 40.0, 800.0, 560.0));
    }

    #[test]
    fn test_bind_seeds_frame_in_host_space() {
        let fixture = fixture();
        let anchor = pane(&fixture.window, Rect::new(10.0, 20.0, 300.0, 200.0));
        let hosted = HeadlessHostedView::new();

        bind(&fixture, &hosted, &anchor, true, 0);

        assert_eq!(hosted.frame(), Rect::new(10.0, 20.0, 300.0, 200.0));
        assert_eq!(hosted.bounds(), Rect::new(0.0, 0.0, 300.0, 200.0));
        assert!(!hosted.is_hidden());
        let counts = hosted.counts();
        assert_eq!(counts.frame_writes, 1);
        assert_eq!(counts.geometry_reconciles, 1);
        assert_eq!(counts.surface_refreshes, 1);
    }

    #[test]
    fn test_bind_arms_one_deferred_pass() {
        let fixture = fixture();
        let hosted = HeadlessHostedView::new();
        let other = HeadlessHostedView::new();
        bind(&fixture, &hosted, &pane(&fixture.window, Rect::new(0.0, 0.0, 100.0, 100.0)), true, 0);
        bind(&fixture, &other, &pane(&fixture.window, Rect::new(100.0, 0.0, 100.0, 100.0)), true, 0);

        assert!(fixture.portal.borrow().is_pending(Trigger::DeferredFullSync));
        assert_eq!(fixture.queue.pending(), 1);

        fixture.queue.run_turn();
        assert!(!fixture.portal.borrow().is_pending(Trigger::DeferredFullSync));
    }

    #[test]
    fn test_full_pass_is_idempotent() {
        let fixture = fixture();
        let anchor = pane(&fixture.window, Rect::new(0.0, 0.0, 400.0, 300.0));
        let hosted = HeadlessHostedView::new();
        bind(&fixture, &hosted, &anchor, true, 0);
        fixture.queue.run_until_idle(4);

        hosted.reset_counts();
        assert_eq!(fixture.portal.borrow_mut().synchronize_all(), 0);
        assert_eq!(hosted.counts().state_writes(), 0);
    }

    #[test]
    fn test_geometry_change_does_not_restack() {
        let fixture = fixture();
        let first = HeadlessHostedView::new();
        let second = HeadlessHostedView::new();
        let first_anchor = pane(&fixture.window, Rect::new(0.0, 0.0, 400.0, 300.0));
        bind(&fixture, &first, &first_anchor, true, 0);
        bind(&fixture, &second, &pane(&fixture.window, Rect::new(400.0, 0.0, 400.0, 300.0)), true, 0);

        first_anchor.set_frame(Rect::new(0.0, 0.0, 380.0, 300.0));
        bind(&fixture, &first, &first_anchor, true, 0);

        let state = fixture.window.host_state().unwrap();
        assert_eq!(state.children, vec![first.id(), second.id()]);
        assert_eq!(state.restacks, 0);
        assert_eq!(first.frame().width, 380.0);
    }

    #[test]
    fn test_becoming_visible_raises_entry() {
        let fixture = fixture();
        let first = HeadlessHostedView::new();
        let second = HeadlessHostedView::new();
        let first_anchor = pane(&fixture.window, Rect::new(0.0, 0.0, 400.0, 300.0));
        bind(&fixture, &first, &first_anchor, false, 0);
        bind(&fixture, &second, &pane(&fixture.window, Rect::new(0.0, 0.0, 400.0, 300.0)), true, 0);

        bind(&fixture, &first, &first_anchor, true, 0);

        assert_eq!(fixture.portal.borrow().children(), &[second.id(), first.id()]);
    }

    #[test]
    fn test_higher_priority_stays_on_top() {
        let fixture = fixture();
        let floating = HeadlessHostedView::new();
        let base = HeadlessHostedView::new();
        let base_anchor = pane(&fixture.window, Rect::new(0.0, 0.0, 400.0, 300.0));
        bind(&fixture, &floating, &pane(&fixture.window, Rect::new(50.0, 50.0, 100.0, 100.0)), true, 5);
        bind(&fixture, &base, &base_anchor, true, 0);

        assert_eq!(fixture.portal.borrow().children(), &[base.id(), floating.id()]);

        bind(&fixture, &base, &base_anchor, true, 1);
        assert_eq!(fixture.portal.borrow().children(), &[base.id(), floating.id()]);
    }

    #[test]
    fn test_priority_increase_raises_above_peers() {
        let fixture = fixture();
        let first = HeadlessHostedView::new();
        let second = HeadlessHostedView::new();
        let first_anchor = pane(&fixture.window, Rect::new(0.0, 0.0, 400.0, 300.0));
        bind(&fixture, &first, &first_anchor, true, 0);
        bind(&fixture, &second, &pane(&fixture.window, Rect::new(0.0, 0.0, 400.0, 300.0)), true, 0);

        bind(&fixture, &first, &first_anchor, true, 2);

        assert_eq!(fixture.portal.borrow().children(), &[second.id(), first.id()]);
    }

    #[test]
    fn test_hidden_entry_keeps_last_frame() {
        let fixture = fixture();
        let anchor = pane(&fixture.window, Rect::new(0.0, 0.0, 400.0, 300.0));
        let hosted = HeadlessHostedView::new();
        bind(&fixture, &hosted, &anchor, true, 0);

        anchor.set_frame(Rect::new(0.0, 0.0, 0.0, 300.0));
        fixture.portal.borrow_mut().synchronize_all();

        assert!(hosted.is_hidden());
        assert_eq!(hosted.frame().width, 400.0);
    }

    #[test]
    fn test_hide_entry_hides_without_geometry() {
        let fixture = fixture();
        let hosted = HeadlessHostedView::new();
        bind(&fixture, &hosted, &pane(&fixture.window, Rect::new(0.0, 0.0, 400.0, 300.0)), true, 0);
        hosted.reset_counts();

        assert!(fixture.portal.borrow_mut().hide_entry(hosted.id()));

        assert!(hosted.is_hidden());
        assert_eq!(hosted.counts().frame_writes, 0);
        assert_eq!(fixture.portal.borrow().entries().get(hosted.id()).map(|e| e.visible_in_ui), Some(false));
    }

    #[test]
    fn test_detach_leaves_hosted_state_alone() {
        let fixture = fixture();
        let hosted = HeadlessHostedView::new();
        bind(&fixture, &hosted, &pane(&fixture.window, Rect::new(0.0, 0.0, 400.0, 300.0)), true, 0);
        hosted.reset_counts();

        assert!(fixture.portal.borrow_mut().detach(hosted.id()));
        assert!(!fixture.portal.borrow_mut().detach(hosted.id()));

        assert_eq!(hosted.counts(), MutationCounts::default());
        assert!(fixture.window.host_state().unwrap().children.is_empty());
    }

    #[test]
    fn test_anchor_outside_reference_is_pruned() {
        let fixture = fixture();
        let hosted = HeadlessHostedView::new();
        let anchor = pane(&fixture.window, Rect::new(0.0, 0.0, 400.0, 300.0));
        bind(&fixture, &hosted, &anchor, true, 0);

        // Reparent under the window root, outside the content node.
        fixture.window.root().add_child(&anchor);

        assert_eq!(fixture.portal.borrow_mut().prune_dead_entries(), 1);
        assert!(!fixture.portal.borrow().is_bound(hosted.id()));
    }

    #[test]
    fn test_host_frame_follows_reference_node() {
        let fixture = fixture();
        fixture.window.content().set_frame(Rect::new(0.0, 40.0, 1000.0, 700.0));

        fixture.portal.borrow_mut().synchronize_all();

        assert_eq!(fixture.window.host_state().unwrap().frame, Rect::new(0.0, 40.0, 1000.0, 700.0));
    }

    #[test]
    fn test_bind_uses_resized_host_frame() {
        let fixture = fixture();
        fixture.window.content().set_frame(Rect::new(0.0, 40.0, 1000.0, 560.0));
        let hosted = HeadlessHostedView::new();

        bind(&fixture, &hosted, &pane(&fixture.window, Rect::new(0.0, 0.0, 1000.0, 560.0)), true, 0);

        assert_eq!(fixture.portal.borrow().host_frame().width, 1000.0);
        assert_eq!(hosted.frame(), Rect::new(0.0, 0.0, 1000.0, 560.0));
        assert_eq!(hosted.counts().frame_writes, 1);
    }

    #[test]
    fn test_targeted_sync_follows_resized_host() {
        let fixture = fixture();
        let anchor = pane(&fixture.window, Rect::new(0.0, 0.0, 800.0, 560.0));
        let hosted = HeadlessHostedView::new();
        bind(&fixture, &hosted, &anchor, true, 0);

        fixture.window.content().set_frame(Rect::new(0.0, 40.0, 1000.0, 560.0));
        anchor.set_frame(Rect::new(0.0, 0.0, 1000.0, 560.0));
        assert!(fixture.portal.borrow_mut().synchronize_hosted_view_for_anchor(anchor.id()));

        assert_eq!(hosted.frame().width, 1000.0);
    }

    #[test]
    fn test_removed_entries_are_released() {
        let fixture = fixture();
        let anchor = pane(&fixture.window, Rect::new(0.0, 0.0, 400.0, 300.0));
        let first = HeadlessHostedView::new();
        let second = HeadlessHostedView::new();
        bind(&fixture, &first, &anchor, true, 0);
        bind(&fixture, &second, &anchor, true, 0);
        assert_eq!(fixture.portal.borrow_mut().take_released(), vec![first.id()]);

        drop(second);
        fixture.portal.borrow_mut().synchronize_all();
        assert_eq!(fixture.portal.borrow_mut().take_released().len(), 1);
        assert!(fixture.portal.borrow_mut().take_released().is_empty());
    }

    #[test]
    fn test_teardown_uninstalls_host() {
        let fixture = fixture();
        let hosted = HeadlessHostedView::new();
        bind(&fixture, &hosted, &pane(&fixture.window, Rect::new(0.0, 0.0, 400.0, 300.0)), true, 0);

        fixture.portal.borrow_mut().teardown();

        let portal = fixture.portal.borrow();
        assert!(portal.is_torn_down());
        assert!(portal.is_empty());
        assert!(!fixture.window.host_state().unwrap().installed);
        drop(portal);

        // A queued pass after teardown does nothing.
        fixture.queue.run_until_idle(4);
        assert!(fixture.portal.borrow().children().is_empty());
    }
}
