use std::collections::BTreeSet;

use crate::domain::entities::record::RecordId;

/// Ids marked for a bulk operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    ids: BTreeSet<RecordId>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle(&mut self, id: RecordId) {
        if !self.ids.remove(&id) {
            self.ids.insert(id);
        }
    }

    pub fn set(&mut self, id: RecordId, selected: bool) {
        if selected {
            self.ids.insert(id);
        } else {
            self.ids.remove(&id);
        }
    }

    /// `true` replaces the selection with exactly `visible`; `false` clears it.
    pub fn toggle_all(&mut self, visible: &[RecordId], selected: bool) {
        self.ids.clear();
        if selected {
            self.ids.extend(visible.iter().copied());
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn is_selected(&self, id: RecordId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> Vec<RecordId> {
        self.ids.iter().copied().collect()
    }

    /// Header checkbox state: every visible id is selected.
    pub fn all_selected(&self, visible: &[RecordId]) -> bool {
        !visible.is_empty() && visible.iter().all(|id| self.ids.contains(id))
    }

    /// Drops ids that are no longer in the store.
    pub fn retain(&mut self, keep: impl Fn(RecordId) -> bool) {
        self.ids.retain(|id| keep(*id));
    }
}

impl FromIterator<RecordId> for SelectionSet {
    fn from_iter<T: IntoIterator<Item = RecordId>>(iter: T) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}
