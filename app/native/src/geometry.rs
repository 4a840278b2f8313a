//! Geometry primitives and the pure geometry reconciler.
//!
//! All rectangles use a top-left origin with `y` growing downwards. Window
//! space is the coordinate space of a top-level window's content; host space
//! is the local space of a portal's host container (origin at the host's
//! top-left corner).
//!
//! [`reconcile`] is the only place where the target frame of a hosted view
//! is decided. It takes already-collected inputs and performs no I/O, so the
//! same inputs always produce the same [`Placement`].

use serde::{Deserialize, Serialize};

// ============================================================================
// Point
// ============================================================================

/// A point in some 2D coordinate space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self { Self { x, y } }
}

// ============================================================================
// Rect
// ============================================================================

/// A rectangle with position and size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Create a new rectangle.
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Create a zero-sized rectangle at origin.
    #[must_use]
    pub const fn zero() -> Self { Self::new(0.0, 0.0, 0.0, 0.0) }

    /// Create a rectangle from its edges.
    #[must_use]
    pub fn from_edges(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    #[must_use]
    pub fn min_x(&self) -> f64 { self.x }

    #[must_use]
    pub fn min_y(&self) -> f64 { self.y }

    #[must_use]
    pub fn max_x(&self) -> f64 { self.x + self.width }

    #[must_use]
    pub fn max_y(&self) -> f64 { self.y + self.height }

    /// The same size, positioned at the origin.
    #[must_use]
    pub const fn local_bounds(&self) -> Self { Self::new(0.0, 0.0, self.width, self.height) }

    /// Check if this rectangle has valid dimensions.
    #[must_use]
    pub fn is_valid(&self) -> bool { self.width > 0.0 && self.height > 0.0 }

    /// Check that no component is NaN or infinite.
    #[must_use]
    pub const fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    /// Check if this rectangle contains a point.
    #[must_use]
    pub fn contains_point(&self, point: Point) -> bool {
        point.x >= self.x && point.x < self.max_x() && point.y >= self.y && point.y < self.max_y()
    }

    /// Check if this rectangle intersects with another.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.x < other.x + other.width
            && self.x + self.width > other.x
            && self.y < other.y + other.height
            && self.y + self.height > other.y
    }

    /// The overlapping region of two rectangles.
    ///
    /// Disjoint rectangles produce a zero-sized rectangle pinned at the
    /// corner where the overlap would start, never a negative size.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Self {
        let min_x = self.min_x().max(other.min_x());
        let min_y = self.min_y().max(other.min_y());
        let max_x = self.max_x().min(other.max_x()).max(min_x);
        let max_y = self.max_y().min(other.max_y()).max(min_y);
        Self::from_edges(min_x, min_y, max_x, max_y)
    }

    /// Translate by `(dx, dy)`.
    #[must_use]
    pub fn offset_by(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Grow by `dx` on the left and right and `dy` on the top and bottom.
    #[must_use]
    pub fn inset_by(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, 2.0f64.mul_add(-dx, self.width), 2.0f64.mul_add(-dy, self.height))
    }

    /// Get the center point of this rectangle.
    #[must_use]
    pub fn center(&self) -> Point { Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0) }

    /// Snap every edge to the device pixel grid for `scale`.
    ///
    /// Edges are snapped rather than origin and size independently, so two
    /// rectangles sharing an edge keep sharing it after snapping.
    #[must_use]
    pub fn pixel_snapped(&self, scale: f64) -> Self {
        let scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };
        let snap = |value: f64| (value * scale).round() / scale;
        Self::from_edges(
            snap(self.min_x()),
            snap(self.min_y()),
            snap(self.max_x()),
            snap(self.max_y()),
        )
    }

    /// Check if two rectangles are approximately equal (within epsilon).
    #[must_use]
    pub fn approx_eq(&self, other: &Self, epsilon: f64) -> bool {
        (self.x - other.x).abs() < epsilon
            && (self.y - other.y).abs() < epsilon
            && (self.width - other.width).abs() < epsilon
            && (self.height - other.height).abs() < epsilon
    }
}

// ============================================================================
// Reconciler
// ============================================================================

/// Why an entry was hidden by a reconciliation pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HideReason {
    /// The entry's own visibility flag is off.
    NotVisibleInUi,
    /// The anchor or one of its ancestors is hidden.
    AncestorHidden,
    /// The anchor left the portal's window, or the reference subtree.
    OutsideWindow,
    /// The target frame is too thin to be useful.
    TooSmall,
    /// The target frame does not overlap the host at all.
    OutsideHost,
    /// Some input or intermediate rectangle was NaN or infinite.
    NonFinite,
}

/// Everything the reconciler needs for a single entry.
#[derive(Clone, Debug)]
pub struct GeometryInput<'a> {
    /// Anchor bounds converted to window space.
    pub anchor_in_window: Rect,
    /// Ancestor bounds in window space, innermost first, stopping before the
    /// portal's reference node.
    pub clip_chain: &'a [Rect],
    /// Host container frame in window space.
    pub host_frame: Rect,
    /// Device pixels per unit.
    pub scale: f64,
    /// The entry's own visibility flag.
    pub visible_in_ui: bool,
    /// Whether the anchor or any ancestor up to the window root is hidden.
    pub ancestor_hidden: bool,
    /// Whether the anchor still belongs to the portal's window and reference subtree.
    pub in_window: bool,
    /// Width or height at or below which the entry is hidden.
    pub min_visible_extent: f64,
}

/// Outcome of reconciling one entry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    /// Target frame in host space. `None` when the computation produced a
    /// non-finite rectangle; the hosted view keeps its last frame.
    pub frame: Option<Rect>,
    /// The first reason the entry is hidden, if it is.
    pub hide_reason: Option<HideReason>,
}

impl Placement {
    #[must_use]
    pub const fn is_hidden(&self) -> bool { self.hide_reason.is_some() }
}

/// Clip the anchor through its ancestors into host space.
///
/// Returns the unclamped host-space rectangle together with the target frame,
/// or `None` if any step produced a non-finite rectangle.
fn clip_into_host(input: &GeometryInput<'_>) -> Option<(Rect, Rect)> {
    let mut visible = input.anchor_in_window;
    if !visible.is_finite() {
        return None;
    }

    for ancestor in input.clip_chain {
        if !ancestor.is_finite() {
            return None;
        }
        visible = visible.intersection(ancestor);
    }

    let host = input.host_frame;
    if !host.is_finite() {
        return None;
    }

    let in_host = visible.offset_by(-host.x, -host.y).pixel_snapped(input.scale);
    if !in_host.is_finite() {
        return None;
    }

    let clamped = in_host.intersection(&host.local_bounds());
    let target = if clamped.is_valid() { clamped } else { in_host };
    Some((in_host, target))
}

/// Decide the target frame and visibility of one entry.
#[must_use]
pub fn reconcile(input: &GeometryInput<'_>) -> Placement {
    let Some((_, target)) = clip_into_host(input) else {
        return Placement {
            frame: None,
            hide_reason: Some(HideReason::NonFinite),
        };
    };

    let host_bounds = input.host_frame.local_bounds();
    let hide_reason = if !input.visible_in_ui {
        Some(HideReason::NotVisibleInUi)
    } else if !input.in_window {
        Some(HideReason::OutsideWindow)
    } else if input.ancestor_hidden {
        Some(HideReason::AncestorHidden)
    } else if target.width <= input.min_visible_extent || target.height <= input.min_visible_extent {
        Some(HideReason::TooSmall)
    } else if !target.intersects(&host_bounds) {
        Some(HideReason::OutsideHost)
    } else {
        None
    };

    Placement { frame: Some(target), hide_reason }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    fn input<'a>(anchor: Rect, chain: &'a [Rect], host: Rect) -> GeometryInput<'a> {
        GeometryInput {
            anchor_in_window: anchor,
            clip_chain: chain,
            host_frame: host,
            scale: 2.0,
            visible_in_ui: true,
            ancestor_hidden: false,
            in_window: true,
            min_visible_extent: 1.0,
        }
    }

    mod rect_tests {
        use super::*;

        #[test]
        fn test_rect_intersection_overlapping() {
            let a = Rect::new(0.0, 0.0, 100.0, 100.0);
            let b = Rect::new(50.0, 25.0, 100.0, 100.0);
            assert_eq!(a.intersection(&b), Rect::new(50.0, 25.0, 50.0, 75.0));
        }

        #[test]
        fn test_rect_intersection_disjoint_is_empty() {
            let a = Rect::new(0.0, 0.0, 10.0, 10.0);
            let b = Rect::new(20.0, 20.0, 10.0, 10.0);
            let overlap = a.intersection(&b);
            assert!(!overlap.is_valid());
            assert!(overlap.width >= 0.0 && overlap.height >= 0.0);
        }

        #[test]
        fn test_rect_contains_point() {
            let rect = Rect::new(10.0, 10.0, 100.0, 100.0);
            assert!(rect.contains_point(Point::new(50.0, 50.0)));
            assert!(rect.contains_point(Point::new(10.0, 10.0)));
            assert!(!rect.contains_point(Point::new(110.0, 110.0)));
        }

        #[test]
        fn test_rect_pixel_snapped_keeps_shared_edges() {
            let left = Rect::new(0.0, 0.0, 100.3, 50.0);
            let right = Rect::new(100.3, 0.0, 99.7, 50.0);
            let left = left.pixel_snapped(2.0);
            let right = right.pixel_snapped(2.0);
            assert_eq!(left.max_x(), right.min_x());
            assert_eq!(left.max_x(), 100.5);
        }

        #[test]
        fn test_rect_pixel_snapped_ignores_bad_scale() {
            let rect = Rect::new(0.4, 0.4, 10.0, 10.0);
            assert_eq!(rect.pixel_snapped(0.0), rect.pixel_snapped(1.0));
            assert_eq!(rect.pixel_snapped(f64::NAN), rect.pixel_snapped(1.0));
        }

        #[test]
        fn test_rect_is_finite() {
            assert!(Rect::new(0.0, 0.0, 1.0, 1.0).is_finite());
            assert!(!Rect::new(f64::NAN, 0.0, 1.0, 1.0).is_finite());
            assert!(!Rect::new(0.0, 0.0, f64::INFINITY, 1.0).is_finite());
        }

        #[test]
        fn test_rect_approx_eq() {
            let a = Rect::new(10.0, 20.0, 100.0, 100.0);
            let b = Rect::new(10.001, 20.001, 100.001, 100.001);
            let c = Rect::new(10.1, 20.0, 100.0, 100.0);
            assert!(a.approx_eq(&b, 0.01));
            assert!(!a.approx_eq(&c, 0.01));
        }

        #[test]
        fn test_rect_inset_by_negative_grows() {
            let rect = Rect::new(10.0, 10.0, 2.0, 100.0).inset_by(-4.0, 0.0);
            assert_eq!(rect, Rect::new(6.0, 10.0, 10.0, 100.0));
        }
    }

    mod reconcile_tests {
        use super::*;

        #[test]
        fn test_unclipped_anchor_maps_into_host_space() {
            let host = Rect::new(0.0, 40.0, 800.0, 600.0);
            let placement = reconcile(&input(Rect::new(100.0, 140.0, 300.0, 200.0), &[], host));
            assert_eq!(placement.frame, Some(Rect::new(100.0, 100.0, 300.0, 200.0)));
            assert!(!placement.is_hidden());
        }

        #[test]
        fn test_narrow_ancestor_clips_width() {
            let host = Rect::new(0.0, 0.0, 800.0, 600.0);
            let chain = [Rect::new(0.0, 0.0, 50.0, 100.0)];
            let placement = reconcile(&input(Rect::new(0.0, 0.0, 100.0, 100.0), &chain, host));
            let frame = placement.frame.unwrap();
            assert!(frame.width <= 50.0);
            assert_eq!(frame, Rect::new(0.0, 0.0, 50.0, 100.0));
        }

        #[test]
        fn test_every_ancestor_in_chain_clips() {
            let host = Rect::new(0.0, 0.0, 800.0, 600.0);
            let chain = [
                Rect::new(0.0, 0.0, 400.0, 80.0),
                Rect::new(20.0, 0.0, 1000.0, 1000.0),
            ];
            let frame = reconcile(&input(Rect::new(0.0, 0.0, 300.0, 300.0), &chain, host))
                .frame
                .unwrap();
            assert_eq!(frame, Rect::new(20.0, 0.0, 280.0, 80.0));
        }

        #[test]
        fn test_frame_is_clamped_to_host() {
            let host = Rect::new(0.0, 0.0, 200.0, 200.0);
            let frame = reconcile(&input(Rect::new(150.0, 150.0, 100.0, 100.0), &[], host))
                .frame
                .unwrap();
            assert_eq!(frame, Rect::new(150.0, 150.0, 50.0, 50.0));
            assert_eq!(host.local_bounds().intersection(&frame), frame);
        }

        #[test]
        fn test_offscreen_falls_back_to_unclamped_and_hides() {
            let host = Rect::new(0.0, 0.0, 200.0, 200.0);
            let placement = reconcile(&input(Rect::new(500.0, 0.0, 100.0, 100.0), &[], host));
            assert_eq!(placement.frame, Some(Rect::new(500.0, 0.0, 100.0, 100.0)));
            assert_eq!(placement.hide_reason, Some(HideReason::OutsideHost));
        }

        #[test]
        fn test_zero_width_is_hidden() {
            let host = Rect::new(0.0, 0.0, 200.0, 200.0);
            let placement = reconcile(&input(Rect::new(10.0, 10.0, 0.0, 40.0), &[], host));
            assert_eq!(placement.hide_reason, Some(HideReason::TooSmall));
        }

        #[test]
        fn test_one_unit_extent_is_hidden() {
            let host = Rect::new(0.0, 0.0, 200.0, 200.0);
            let placement = reconcile(&input(Rect::new(10.0, 10.0, 40.0, 1.0), &[], host));
            assert_eq!(placement.hide_reason, Some(HideReason::TooSmall));
        }

        #[test]
        fn test_visibility_flag_wins_over_geometry() {
            let host = Rect::new(0.0, 0.0, 200.0, 200.0);
            let mut geometry = input(Rect::new(10.0, 10.0, 100.0, 100.0), &[], host);
            geometry.visible_in_ui = false;
            let placement = reconcile(&geometry);
            assert!(placement.frame.is_some());
            assert_eq!(placement.hide_reason, Some(HideReason::NotVisibleInUi));
        }

        #[test]
        fn test_hidden_ancestor_hides() {
            let host = Rect::new(0.0, 0.0, 200.0, 200.0);
            let mut geometry = input(Rect::new(10.0, 10.0, 100.0, 100.0), &[], host);
            geometry.ancestor_hidden = true;
            assert_eq!(reconcile(&geometry).hide_reason, Some(HideReason::AncestorHidden));
        }

        #[test]
        fn test_foreign_window_hides() {
            let host = Rect::new(0.0, 0.0, 200.0, 200.0);
            let mut geometry = input(Rect::new(10.0, 10.0, 100.0, 100.0), &[], host);
            geometry.in_window = false;
            assert_eq!(reconcile(&geometry).hide_reason, Some(HideReason::OutsideWindow));
        }

        #[test]
        fn test_non_finite_anchor_keeps_last_frame() {
            let host = Rect::new(0.0, 0.0, 200.0, 200.0);
            let placement = reconcile(&input(Rect::new(f64::NAN, 0.0, 10.0, 10.0), &[], host));
            assert_eq!(placement.frame, None);
            assert_eq!(placement.hide_reason, Some(HideReason::NonFinite));
        }

        #[test]
        fn test_non_finite_ancestor_keeps_last_frame() {
            let host = Rect::new(0.0, 0.0, 200.0, 200.0);
            let chain = [Rect::new(0.0, 0.0, f64::INFINITY, 10.0)];
            let placement = reconcile(&input(Rect::new(0.0, 0.0, 10.0, 10.0), &chain, host));
            assert_eq!(placement.frame, None);
        }

        #[test]
        fn test_fractional_frame_is_pixel_snapped() {
            let host = Rect::new(0.0, 0.0, 400.0, 400.0);
            let frame = reconcile(&input(Rect::new(10.2, 10.8, 100.1, 50.0), &[], host))
                .frame
                .unwrap();
            assert_eq!(frame.min_x(), 10.0);
            assert_eq!(frame.min_y(), 11.0);
            assert_eq!(frame.max_x(), 110.5);
        }

        #[test]
        fn test_wide_ancestor_leaves_anchor_untouched() {
            let host = Rect::new(0.0, 0.0, 800.0, 600.0);
            let anchor = Rect::new(30.0, 40.0, 200.0, 100.0);
            let chain = [Rect::new(0.0, 0.0, 500.0, 500.0), Rect::new(0.0, 0.0, 800.0, 600.0)];
            let frame = reconcile(&input(anchor, &chain, host)).frame.unwrap();
            assert_eq!(frame, anchor);
        }
    }
}
