//! Serializable dump of a portal's state, used by the CLI and by tests.

use serde::{Deserialize, Serialize};

use crate::geometry::Rect;
use crate::platform::{DividerSegment, ViewId, WindowId};

/// One entry as seen from outside.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrySnapshot {
    pub hosted: ViewId,
    pub anchor: ViewId,
    pub visible_in_ui: bool,
    pub z_priority: i32,
    /// Position in the host's child stack, bottom first.
    pub stack_index: Option<usize>,
    /// Current frame of the hosted view, in host space. `None` once the hosted view is gone.
    pub frame: Option<Rect>,
    pub hidden: Option<bool>,
}

/// A portal at one point in time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalSnapshot {
    pub window: WindowId,
    /// Host frame in window space.
    pub host_frame: Rect,
    /// Child stack, bottom to top.
    pub children: Vec<ViewId>,
    /// Entries ordered by stack position; entries not in the stack come last.
    pub entries: Vec<EntrySnapshot>,
    pub segments: Vec<DividerSegment>,
    /// Cached sidebar strip edge, in window space.
    pub sidebar_edge: Option<f64>,
}

impl PortalSnapshot {
    #[must_use]
    pub fn entry(&self, hosted: ViewId) -> Option<&EntrySnapshot> {
        self.entries.iter().find(|entry| entry.hosted == hosted)
    }

    /// Number of entries whose hosted view is currently shown.
    #[must_use]
    pub fn visible_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.hidden == Some(false)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let hosted = ViewId::new();
        let snapshot = PortalSnapshot {
            window: WindowId(3),
            host_frame: Rect::new(0.0, 0.0, 10.0, 10.0),
            children: vec![hosted],
            entries: vec![EntrySnapshot {
                hosted,
                anchor: ViewId::new(),
                visible_in_ui: true,
                z_priority: 0,
                stack_index: Some(0),
                frame: Some(Rect::new(0.0, 0.0, 10.0, 10.0)),
                hidden: Some(false),
            }],
            segments: Vec::new(),
            sidebar_edge: None,
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["window"], 3);
        assert_eq!(json["entries"][0]["visibleInUi"], true);
        assert!(json.get("hostFrame").is_some());
        assert_eq!(snapshot.visible_count(), 1);
        assert!(snapshot.entry(hosted).is_some());
    }
}
