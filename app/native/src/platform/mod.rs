//! Collaborator seams consumed by the portal.
//!
//! The portal never talks to a concrete UI toolkit. Everything it needs from
//! the declarative layer, from the owner of the hosted rendering surfaces and
//! from the window system is expressed by the traits in this module:
//!
//! - [`ViewNode`] - anchor placeholders and their ancestors
//! - [`HostedView`] - the externally-owned rendering surface container
//! - [`WindowContext`] - a top-level window
//! - [`HostLayer`] - the host container a portal installs into its window
//! - [`TurnDispatcher`] - "run this on the next UI turn"
//!
//! All of them are single-threaded and handed around as `Rc<dyn Trait>`;
//! the portal only ever keeps `Weak` references to nodes and hosted views.
//!
//! [`headless`] implements every seam in memory.

pub mod headless;
pub mod turn;

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Rgba;
use crate::geometry::{Point, Rect};

pub use turn::TurnQueue;

// ============================================================================
// Identity Tokens
// ============================================================================

/// Stable identity of a view node or hosted view.
///
/// Identity is never derived from value equality or from addresses: two
/// nodes with identical geometry are still distinct, and an id is never
/// reused after its node is dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewId(Uuid);

impl ViewId {
    /// Allocate a fresh identity.
    #[must_use]
    pub fn new() -> Self { Self(Uuid::now_v7()) }
}

impl Default for ViewId {
    fn default() -> Self { Self::new() }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The tail of a v7 UUID is random; the head is a timestamp shared by
        // views created in the same millisecond.
        let simple = self.0.simple().to_string();
        write!(f, "view-{}", &simple[simple.len() - 8..])
    }
}

/// Identity of a top-level window, as assigned by the window system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(pub u64);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "window-{}", self.0) }
}

// ============================================================================
// Declarative Layer
// ============================================================================

/// A node of the declarative layer's view tree.
pub trait ViewNode {
    /// Identity of this node.
    fn id(&self) -> ViewId;

    /// The node's parent, or `None` at the root or when detached.
    fn parent(&self) -> Option<Rc<dyn ViewNode>>;

    /// The window this node currently lives in.
    fn window(&self) -> Option<Rc<dyn WindowContext>>;

    /// Local bounds, in the node's own coordinate space.
    fn bounds(&self) -> Rect;

    /// Convert a rectangle from this node's space into window space.
    fn convert_to_window(&self, rect: Rect) -> Rect;

    /// Whether this node itself is hidden. Ancestors are not consulted.
    fn is_hidden(&self) -> bool;
}

// ============================================================================
// Hosted Surfaces
// ============================================================================

/// The container view of an externally-owned rendering surface.
///
/// Frame and bounds are in the host container's space. The portal treats
/// `reconcile_geometry` and `refresh_surface` as opaque, idempotent requests.
pub trait HostedView {
    /// Identity of this hosted view.
    fn id(&self) -> ViewId;

    fn frame(&self) -> Rect;

    fn set_frame(&self, frame: Rect);

    fn bounds(&self) -> Rect;

    fn set_bounds(&self, bounds: Rect);

    fn is_hidden(&self) -> bool;

    fn set_hidden(&self, hidden: bool);

    /// Recompute nested layout (scroll regions and the like) against the current frame.
    fn reconcile_geometry(&self);

    /// Repaint now instead of waiting for the surface's own invalidation.
    fn refresh_surface(&self);
}

// ============================================================================
// Window System
// ============================================================================

/// Axis along which a split container divides its panes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SplitAxis {
    /// Panes side by side; the divider is a vertical line.
    Horizontal,
    /// Panes stacked; the divider is a horizontal line.
    Vertical,
}

/// A resizable split container's divider, as reported by the window.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SplitDivider {
    pub axis: SplitAxis,
    /// Divider rectangle in window space.
    pub frame: Rect,
    /// Size of the leading pane along the split axis.
    pub leading_extent: f64,
    /// Size of the trailing pane along the split axis.
    pub trailing_extent: f64,
}

impl SplitDivider {
    /// The divider's centerline coordinate along the split axis.
    #[must_use]
    pub fn centerline(&self) -> f64 {
        match self.axis {
            SplitAxis::Horizontal => self.frame.center().x,
            SplitAxis::Vertical => self.frame.center().y,
        }
    }

    /// Whether both flanking panes are collapsed to `threshold` or less.
    #[must_use]
    pub fn is_collapsed(&self, threshold: f64) -> bool {
        self.leading_extent <= threshold && self.trailing_extent <= threshold
    }
}

/// A top-level window.
pub trait WindowContext {
    /// Identity of this window.
    fn id(&self) -> WindowId;

    /// The window's base content node. Anchors must descend from it.
    fn reference_node(&self) -> Option<Rc<dyn ViewNode>>;

    /// Device pixels per unit.
    fn backing_scale_factor(&self) -> f64;

    /// Install a host container above the base content and below any chrome overlay.
    fn install_host_layer(&self) -> Box<dyn HostLayer>;

    /// Every resizable split divider currently in the window.
    fn split_dividers(&self) -> Vec<SplitDivider>;
}

/// A line segment drawn by the divider overlay, in host space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DividerSegment {
    pub start: Point,
    pub end: Point,
    pub thickness: f64,
}

/// The host container installed by a portal.
///
/// The child stack is ordered bottom to top; the divider overlay always sits
/// above every child. The host clips children to its bounds.
pub trait HostLayer {
    /// Position the host in window space.
    fn set_frame(&self, frame: Rect);

    /// Add a hosted view on top of the existing children.
    fn insert_child(&self, view: &Rc<dyn HostedView>);

    /// Move an existing child to the top of the child stack.
    fn bring_child_to_front(&self, id: ViewId);

    /// Remove a child. Unknown ids are ignored.
    fn remove_child(&self, id: ViewId);

    /// Replace the overlay's divider segments and repaint it.
    fn draw_dividers(&self, segments: &[DividerSegment], color: Rgba);

    /// Run `apply` inside a transaction with implicit animations disabled.
    fn perform_without_animation(&self, apply: &mut dyn FnMut());

    /// Remove the host from its window.
    fn uninstall(&self);
}

// ============================================================================
// Scheduling
// ============================================================================

/// Posts work to the next turn of the UI thread's run loop.
pub trait TurnDispatcher {
    fn post(&self, task: Box<dyn FnOnce()>);
}
