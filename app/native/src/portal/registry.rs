//! Process-wide routing from windows to their portals.
//!
//! The registry is the only entry point the declarative layer and window
//! management code need. It resolves the window of an anchor, creates that
//! window's portal on first use, follows hosted views that move between
//! windows and tears portals down when their window closes.
//!
//! Everything a window needs lives in its [`WindowPortalState`]; nothing is
//! attached to the window objects themselves.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};

use super::{DragPayload, HitTarget, Portal, PortalSnapshot};
use crate::config::PortalConfig;
use crate::error::{PortalError, PortalResult};
use crate::geometry::Point;
use crate::platform::{HostedView, TurnDispatcher, ViewId, ViewNode, WindowContext, WindowId};

// ============================================================================
// Types
// ============================================================================

/// Window notifications that move hosted views without touching anchors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GeometryEvent {
    /// The window's frame changed.
    WindowResized,
    /// The user finished a live resize.
    LiveResizeEnded,
    /// A split container or other structural container changed size.
    ContainerResized,
}

/// Everything the registry keeps for one window.
pub struct WindowPortalState {
    portal: Rc<RefCell<Portal>>,
    window: Weak<dyn WindowContext>,
    /// Geometry events received since the portal was created.
    geometry_events: u64,
}

impl WindowPortalState {
    fn new(window: &Rc<dyn WindowContext>, portal: Rc<RefCell<Portal>>) -> Self {
        Self {
            portal,
            window: Rc::downgrade(window),
            geometry_events: 0,
        }
    }

    fn is_window_alive(&self) -> bool { self.window.strong_count() > 0 }

    fn teardown(&self) {
        match self.portal.try_borrow_mut() {
            Ok(mut portal) => portal.teardown(),
            Err(_) => tracing::warn!("portal: busy during teardown, host layer left installed"),
        }
    }
}

// ============================================================================
// PortalRegistry
// ============================================================================

/// Map from window identity to portal.
pub struct PortalRegistry {
    dispatcher: Rc<dyn TurnDispatcher>,
    config: PortalConfig,
    windows: HashMap<WindowId, WindowPortalState>,
    hosted_to_window: HashMap<ViewId, WindowId>,
}

impl PortalRegistry {
    #[must_use]
    pub fn new(dispatcher: Rc<dyn TurnDispatcher>, config: PortalConfig) -> Self {
        Self {
            dispatcher,
            config,
            windows: HashMap::new(),
            hosted_to_window: HashMap::new(),
        }
    }

    // ------------------------------------------------------------------------
    // Binding
    // ------------------------------------------------------------------------

    /// Bind `hosted` to `anchor` in the anchor's window.
    ///
    /// Returns `false` if the anchor is not in a window yet; the caller binds
    /// again once it is.
    #[allow(clippy::needless_pass_by_value)]
    pub fn bind(
        &mut self,
        hosted: Rc<dyn HostedView>,
        anchor: Rc<dyn ViewNode>,
        visible_in_ui: bool,
        z_priority: i32,
    ) -> bool {
        self.collect_released();
        let hosted_id = hosted.id();
        let Some(window) = anchor.window() else {
            tracing::debug!(hosted = %hosted_id, anchor = %anchor.id(), "portal: anchor has no window, bind deferred");
            return false;
        };
        let window_id = window.id();

        if let Some(previous) = self.hosted_to_window.get(&hosted_id).copied()
            && previous != window_id
        {
            self.with_portal_mut(previous, |portal| portal.detach(hosted_id));
            tracing::debug!(
                hosted = %hosted_id,
                from = %previous,
                to = %window_id,
                "portal: hosted view moved between windows"
            );
        }

        self.ensure_portal(&window);
        let bound = self
            .with_portal_mut(window_id, |portal| portal.bind(&hosted, &anchor, visible_in_ui, z_priority))
            .is_some();
        if bound {
            self.hosted_to_window.insert(hosted_id, window_id);
        }
        self.collect_released();
        bound
    }

    /// Resync whatever is bound to `anchor`. No-op if nothing is.
    pub fn synchronize_for_anchor(&mut self, anchor: &dyn ViewNode) -> bool {
        self.collect_released();
        let Some(window) = anchor.window() else {
            return false;
        };
        let anchor_id = anchor.id();
        self.with_portal_mut(window.id(), |portal| portal.synchronize_hosted_view_for_anchor(anchor_id))
            .unwrap_or(false)
    }

    /// Update only the visibility flag of a bound hosted view.
    ///
    /// An unbound hosted view is left alone; its eventual bind carries its own
    /// flag and must not be overridden by an earlier update.
    pub fn update_entry_visibility(&mut self, hosted_id: ViewId, visible_in_ui: bool) -> bool {
        self.collect_released();
        let Some(window_id) = self.hosted_to_window.get(&hosted_id).copied() else {
            tracing::debug!(hosted = %hosted_id, visible = visible_in_ui, "portal: visibility update for unbound view ignored");
            return false;
        };
        self.with_portal_mut(window_id, |portal| portal.update_visibility(hosted_id, visible_in_ui))
            .unwrap_or(false)
    }

    /// Hide a hosted view for good; its section of the UI is gone.
    pub fn hide_entry(&mut self, hosted_id: ViewId) -> bool {
        self.collect_released();
        let Some(window_id) = self.hosted_to_window.get(&hosted_id).copied() else {
            return false;
        };
        self.with_portal_mut(window_id, |portal| portal.hide_entry(hosted_id)).unwrap_or(false)
    }

    /// Detach a hosted view from whichever portal holds it.
    pub fn detach(&mut self, hosted_id: ViewId) -> bool {
        let Some(window_id) = self.hosted_to_window.remove(&hosted_id) else {
            return false;
        };
        let detached = self.with_portal_mut(window_id, |portal| portal.detach(hosted_id)).unwrap_or(false);
        self.collect_released();
        detached
    }

    /// Forget the window mapping of every hosted view a portal displaced,
    /// detached or pruned on its own. Returns the number of mappings dropped.
    ///
    /// Coalesced passes run outside the registry, so this runs at the start
    /// of every registry mutation.
    pub fn collect_released(&mut self) -> usize {
        let mut dropped = 0;
        for (window_id, state) in &self.windows {
            let Ok(mut portal) = state.portal.try_borrow_mut() else {
                continue;
            };
            for hosted_id in portal.take_released() {
                let stale = self.hosted_to_window.get(&hosted_id) == Some(window_id) && !portal.is_bound(hosted_id);
                if stale {
                    self.hosted_to_window.remove(&hosted_id);
                    dropped += 1;
                }
            }
        }
        if dropped > 0 {
            tracing::trace!(dropped, mapped = self.hosted_to_window.len(), "portal: released hosted mappings");
        }
        dropped
    }

    // ------------------------------------------------------------------------
    // Window Lifecycle
    // ------------------------------------------------------------------------

    /// Tear down the window's portal and forget everything about the window.
    pub fn window_will_close(&mut self, window_id: WindowId) -> bool {
        let Some(state) = self.windows.remove(&window_id) else {
            return false;
        };
        state.teardown();
        self.hosted_to_window.retain(|_, window| *window != window_id);
        tracing::debug!(window = %window_id, "portal: window closed");
        true
    }

    /// Tear down portals whose window was dropped without a close notification.
    pub fn prune_closed_windows(&mut self) -> usize {
        self.collect_released();
        let closed: Vec<WindowId> = self
            .windows
            .iter()
            .filter(|(_, state)| !state.is_window_alive())
            .map(|(id, _)| *id)
            .collect();
        for window_id in &closed {
            self.window_will_close(*window_id);
        }
        closed.len()
    }

    /// Arm the window's external geometry pass.
    pub fn handle_geometry_event(&mut self, window_id: WindowId, event: GeometryEvent) -> bool {
        self.collect_released();
        let Some(state) = self.windows.get_mut(&window_id) else {
            return false;
        };
        state.geometry_events += 1;
        tracing::trace!(window = %window_id, event = ?event, "portal: geometry event");
        self.with_portal(window_id, Portal::schedule_geometry_refresh).unwrap_or(false)
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Route a pointer event in `window_id` at `point` (window space).
    #[must_use]
    pub fn hit_test(&self, window_id: WindowId, point: Point, drag: Option<&DragPayload>) -> HitTarget {
        self.with_portal(window_id, |portal| portal.hit_test(point, drag))
            .unwrap_or(HitTarget::PassThrough)
    }

    /// Snapshot a window's portal.
    ///
    /// # Errors
    ///
    /// Returns `PortalError::UnknownWindow` if the window has no portal.
    pub fn snapshot(&self, window_id: WindowId) -> PortalResult<PortalSnapshot> {
        self.with_portal(window_id, Portal::snapshot)
            .ok_or(PortalError::UnknownWindow(window_id))
    }

    /// The hosted view currently bound to `anchor`.
    #[must_use]
    pub fn hosted_view_for_anchor(&self, anchor: &dyn ViewNode) -> Option<ViewId> {
        let window = anchor.window()?;
        let anchor_id = anchor.id();
        self.with_portal(window.id(), |portal| portal.hosted_for_anchor(anchor_id)).flatten()
    }

    #[must_use]
    pub fn is_bound(&self, hosted_id: ViewId) -> bool {
        self.hosted_to_window
            .get(&hosted_id)
            .and_then(|window_id| self.with_portal(*window_id, |portal| portal.is_bound(hosted_id)))
            .unwrap_or(false)
    }

    /// The window whose portal holds `hosted_id`.
    #[must_use]
    pub fn window_for_hosted(&self, hosted_id: ViewId) -> Option<WindowId> {
        self.hosted_to_window.get(&hosted_id).copied().filter(|_| self.is_bound(hosted_id))
    }

    #[must_use]
    pub fn window_count(&self) -> usize { self.windows.len() }

    /// Hosted views the registry maps to a window.
    #[must_use]
    pub fn mapped_hosted_count(&self) -> usize { self.hosted_to_window.len() }

    /// Windows with a portal, in id order.
    #[must_use]
    pub fn window_ids(&self) -> Vec<WindowId> {
        let mut ids: Vec<WindowId> = self.windows.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Geometry events received by a window's portal.
    #[must_use]
    pub fn geometry_event_count(&self, window_id: WindowId) -> Option<u64> {
        self.windows.get(&window_id).map(|state| state.geometry_events)
    }

    /// The portal of a window, if one was created.
    #[must_use]
    pub fn portal(&self, window_id: WindowId) -> Option<Rc<RefCell<Portal>>> {
        self.windows.get(&window_id).map(|state| Rc::clone(&state.portal))
    }

    #[must_use]
    pub const fn config(&self) -> &PortalConfig { &self.config }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    fn ensure_portal(&mut self, window: &Rc<dyn WindowContext>) {
        let window_id = window.id();

        // A window id can be reused after the old window was dropped unannounced.
        if self.windows.get(&window_id).is_some_and(|state| !state.is_window_alive()) {
            self.window_will_close(window_id);
        }

        if !self.windows.contains_key(&window_id) {
            let portal = Portal::install(window, Rc::clone(&self.dispatcher), self.config.clone());
            self.windows.insert(window_id, WindowPortalState::new(window, portal));
            tracing::debug!(window = %window_id, windows = self.windows.len(), "portal: created portal");
        }
    }

    fn with_portal<R>(&self, window_id: WindowId, f: impl FnOnce(&Portal) -> R) -> Option<R> {
        let state = self.windows.get(&window_id)?;
        let Ok(portal) = state.portal.try_borrow() else {
            tracing::warn!(window = %window_id, "portal: busy, query skipped");
            return None;
        };
        Some(f(&portal))
    }

    fn with_portal_mut<R>(&self, window_id: WindowId, f: impl FnOnce(&mut Portal) -> R) -> Option<R> {
        let state = self.windows.get(&window_id)?;
        let Ok(mut portal) = state.portal.try_borrow_mut() else {
            tracing::warn!(window = %window_id, "portal: busy, re-entrant call skipped");
            return None;
        };
        Some(f(&mut portal))
    }
}

impl std::fmt::Debug for PortalRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortalRegistry")
            .field("windows", &self.window_ids())
            .field("hosted", &self.hosted_to_window.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
