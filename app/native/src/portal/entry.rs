//! Entry table: which hosted view is bound to which anchor.
//!
//! The table keeps two maps in lockstep:
//! - `entries`: hosted view id → [`Entry`]
//! - `anchor_to_hosted`: anchor id → hosted view id
//!
//! Every mutation goes through [`EntryTable::upsert`] or
//! [`EntryTable::remove`], which maintain:
//! - at most one entry per hosted view
//! - at most one hosted view per anchor
//! - an anchor mapping only ever points at an existing entry whose anchor is that anchor

use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::platform::{HostedView, ViewId, ViewNode};

// ============================================================================
// Entry
// ============================================================================

/// Association between a hosted view and the anchor it should cover.
///
/// Both references are weak; an entry never keeps either side alive.
#[derive(Clone)]
pub struct Entry {
    pub hosted: Weak<dyn HostedView>,
    pub anchor: Weak<dyn ViewNode>,
    /// Cached so the anchor mapping can be cleaned up after the anchor is gone.
    pub anchor_id: ViewId,
    pub visible_in_ui: bool,
    pub z_priority: i32,
}

impl Entry {
    #[must_use]
    pub fn new(hosted: &Rc<dyn HostedView>, anchor: &Rc<dyn ViewNode>, visible_in_ui: bool, z_priority: i32) -> Self {
        Self {
            hosted: Rc::downgrade(hosted),
            anchor: Rc::downgrade(anchor),
            anchor_id: anchor.id(),
            visible_in_ui,
            z_priority,
        }
    }

    #[must_use]
    pub fn hosted_view(&self) -> Option<Rc<dyn HostedView>> { self.hosted.upgrade() }

    #[must_use]
    pub fn anchor_view(&self) -> Option<Rc<dyn ViewNode>> { self.anchor.upgrade() }

    /// Whether either side of the association has been dropped.
    #[must_use]
    pub fn is_dead(&self) -> bool { self.hosted.strong_count() == 0 || self.anchor.strong_count() == 0 }
}

impl std::fmt::Debug for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entry")
            .field("anchor_id", &self.anchor_id)
            .field("visible_in_ui", &self.visible_in_ui)
            .field("z_priority", &self.z_priority)
            .field("dead", &self.is_dead())
            .finish()
    }
}

/// What an upsert replaced.
#[derive(Clone, Debug, Default)]
pub struct UpsertOutcome {
    /// The entry previously stored for this hosted view.
    pub previous: Option<Entry>,
    /// A different hosted view that was bound to the same anchor and has been removed.
    pub displaced: Option<(ViewId, Entry)>,
    /// The anchor this hosted view was bound to before, if it was a different one.
    pub stale_anchor: Option<ViewId>,
}

impl UpsertOutcome {
    /// Whether the entry is becoming visible with this upsert.
    #[must_use]
    pub fn became_visible(&self, visible_in_ui: bool) -> bool {
        visible_in_ui && !self.previous.as_ref().is_some_and(|entry| entry.visible_in_ui)
    }

    /// Whether the z-priority went up relative to the previous entry.
    #[must_use]
    pub fn priority_increased(&self, z_priority: i32) -> bool {
        self.previous.as_ref().is_some_and(|entry| z_priority > entry.z_priority)
    }
}

// ============================================================================
// EntryTable
// ============================================================================

/// Per-portal table of entries keyed by hosted view identity.
#[derive(Debug, Default)]
pub struct EntryTable {
    entries: HashMap<ViewId, Entry>,
    anchor_to_hosted: HashMap<ViewId, ViewId>,
}

impl EntryTable {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    #[must_use]
    pub fn len(&self) -> usize { self.entries.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    #[must_use]
    pub fn get(&self, hosted_id: ViewId) -> Option<&Entry> { self.entries.get(&hosted_id) }

    #[must_use]
    pub fn contains(&self, hosted_id: ViewId) -> bool { self.entries.contains_key(&hosted_id) }

    /// The hosted view currently bound to `anchor_id`.
    #[must_use]
    pub fn hosted_for_anchor(&self, anchor_id: ViewId) -> Option<ViewId> {
        self.anchor_to_hosted.get(&anchor_id).copied()
    }

    /// Ids of every entry, in no particular order.
    #[must_use]
    pub fn hosted_ids(&self) -> Vec<ViewId> { self.entries.keys().copied().collect() }

    pub fn iter(&self) -> impl Iterator<Item = (&ViewId, &Entry)> { self.entries.iter() }

    /// Insert or replace the entry for `hosted_id`.
    ///
    /// Any other hosted view bound to the same anchor is removed, and a
    /// previous anchor of this hosted view loses its mapping.
    pub fn upsert(&mut self, hosted_id: ViewId, entry: Entry) -> UpsertOutcome {
        let anchor_id = entry.anchor_id;
        let mut outcome = UpsertOutcome::default();

        if let Some(&bound) = self.anchor_to_hosted.get(&anchor_id)
            && bound != hosted_id
            && let Some(removed) = self.remove(bound)
        {
            outcome.displaced = Some((bound, removed));
        }

        if let Some(previous) = self.entries.get(&hosted_id)
            && previous.anchor_id != anchor_id
        {
            let stale = previous.anchor_id;
            if self.anchor_to_hosted.get(&stale) == Some(&hosted_id) {
                self.anchor_to_hosted.remove(&stale);
            }
            outcome.stale_anchor = Some(stale);
        }

        self.anchor_to_hosted.insert(anchor_id, hosted_id);
        outcome.previous = self.entries.insert(hosted_id, entry);
        outcome
    }

    /// Remove the entry for `hosted_id` and its anchor mapping.
    pub fn remove(&mut self, hosted_id: ViewId) -> Option<Entry> {
        let entry = self.entries.remove(&hosted_id)?;
        if self.anchor_to_hosted.get(&entry.anchor_id) == Some(&hosted_id) {
            self.anchor_to_hosted.remove(&entry.anchor_id);
        }
        Some(entry)
    }

    /// Update the visibility flag only. Returns the previous flag.
    pub fn set_visible(&mut self, hosted_id: ViewId, visible_in_ui: bool) -> Option<bool> {
        let entry = self.entries.get_mut(&hosted_id)?;
        Some(std::mem::replace(&mut entry.visible_in_ui, visible_in_ui))
    }

    /// Remove every entry matching `is_dead`, returning the removed ids.
    pub fn remove_where(&mut self, mut is_dead: impl FnMut(&Entry) -> bool) -> Vec<(ViewId, Entry)> {
        let doomed: Vec<ViewId> = self
            .entries
            .iter()
            .filter(|(_, entry)| is_dead(entry))
            .map(|(id, _)| *id)
            .collect();

        doomed
            .into_iter()
            .filter_map(|id| self.remove(id).map(|entry| (id, entry)))
            .collect()
    }

    /// Remove everything.
    pub fn drain(&mut self) -> Vec<(ViewId, Entry)> {
        self.anchor_to_hosted.clear();
        self.entries.drain().collect()
    }

    /// Check the table's structural invariants.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.anchor_to_hosted.iter().all(|(anchor_id, hosted_id)| {
            self.entries.get(hosted_id).is_some_and(|entry| entry.anchor_id == *anchor_id)
        }) && self.anchor_to_hosted.len() <= self.entries.len()
    }
}

// ============================================================================
// Tests
// ============================================================================
