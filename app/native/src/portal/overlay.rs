//! Divider overlay above hosted views.
//!
//! Hosted views are opaque and sit above the window's base content, so where
//! a hosted view covers a split divider the divider the chrome painted is lost.
//! The overlay redraws exactly those portions:
//!
//! - one segment per (divider, straddling hosted frame) pair
//! - the segment runs along the divider's centerline
//! - its span is the overlap of the hosted frame and the divider
//!
//! Dividers no hosted view straddles are left to the chrome. Drawing them
//! again would darken them.

use smallvec::SmallVec;

use crate::config::OverlayConfig;
use crate::geometry::{Point, Rect};
use crate::platform::{DividerSegment, HostLayer, SplitAxis, SplitDivider};

/// Segments for one divider. Most dividers are straddled by at most a couple of views.
type DividerSpans = SmallVec<[(f64, f64); 4]>;

/// Compute the overlay segments in host space.
///
/// `hosted_frames` are the frames of visible hosted views in host space;
/// `dividers` are in window space.
#[must_use]
pub fn compute_segments(
    dividers: &[SplitDivider],
    hosted_frames: &[Rect],
    host_frame: Rect,
    thickness: f64,
) -> Vec<DividerSegment> {
    let mut segments = Vec::new();

    for divider in dividers {
        let frame = divider.frame.offset_by(-host_frame.x, -host_frame.y);
        if !frame.is_finite() {
            continue;
        }
        let center = frame.center();

        let spans: DividerSpans = hosted_frames
            .iter()
            .filter_map(|hosted| straddling_span(divider.axis, &frame, hosted))
            .collect();

        for (start, end) in spans {
            let segment = match divider.axis {
                SplitAxis::Horizontal => DividerSegment {
                    start: Point::new(center.x, start),
                    end: Point::new(center.x, end),
                    thickness,
                },
                SplitAxis::Vertical => DividerSegment {
                    start: Point::new(start, center.y),
                    end: Point::new(end, center.y),
                    thickness,
                },
            };
            segments.push(segment);
        }
    }

    segments
}

/// The span along the divider covered by `hosted`, if `hosted` straddles the
/// divider's centerline.
fn straddling_span(axis: SplitAxis, divider: &Rect, hosted: &Rect) -> Option<(f64, f64)> {
    let center = divider.center();
    let (straddles, start, end) = match axis {
        SplitAxis::Horizontal => (
            hosted.min_x() < center.x && hosted.max_x() > center.x,
            hosted.min_y().max(divider.min_y()),
            hosted.max_y().min(divider.max_y()),
        ),
        SplitAxis::Vertical => (
            hosted.min_y() < center.y && hosted.max_y() > center.y,
            hosted.min_x().max(divider.min_x()),
            hosted.max_x().min(divider.max_x()),
        ),
    };
    (straddles && end > start).then_some((start, end))
}

/// The overlay's last drawn state.
#[derive(Debug, Default)]
pub struct DividerOverlay {
    segments: Vec<DividerSegment>,
}

impl DividerOverlay {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Segments currently drawn, in host space.
    #[must_use]
    pub fn segments(&self) -> &[DividerSegment] { &self.segments }

    /// Redraw the overlay if `segments` differ from what is drawn.
    ///
    /// A disabled overlay draws nothing. Returns `true` if the host was asked
    /// to repaint.
    pub fn refresh(
        &mut self,
        host: &dyn HostLayer,
        segments: Vec<DividerSegment>,
        config: &OverlayConfig,
    ) -> bool {
        let segments = if config.is_enabled() { segments } else { Vec::new() };
        if segments == self.segments {
            return false;
        }

        host.draw_dividers(&segments, config.color());
        tracing::trace!(segments = segments.len(), "portal: divider overlay redrawn");
        self.segments = segments;
        true
    }

    /// Forget the drawn state without repainting.
    pub fn clear(&mut self) { self.segments.clear(); }
}

// ============================================================================
// Tests
// ============================================================================
