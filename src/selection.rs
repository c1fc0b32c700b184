use crate::model::{Note, NoteCollection, NoteId};

/// Holds the id of the note on display. The note itself is always looked up
/// through [`SelectionModel::resolve`] so a refresh can never leave the view
/// pointing at a stale snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionModel {
    selected: Option<NoteId>,
}

impl SelectionModel {
    pub fn select(&mut self, id: Option<NoteId>) {
        self.selected = id;
    }

    pub fn selected(&self) -> Option<&NoteId> {
        self.selected.as_ref()
    }

    pub fn clear(&mut self) {
        self.selected = None;
    }

    /// Clears the selection only when it points at `id`.
    pub fn clear_if(&mut self, id: &NoteId) -> bool {
        if self.selected.as_ref() == Some(id) {
            self.selected = None;
            return true;
        }
        false
    }

    pub fn resolve<'a>(&self, notes: &'a NoteCollection) -> Option<&'a Note> {
        self.selected.as_ref().and_then(|id| notes.get(id))
    }

    /// Drops a selection that no longer resolves. Returns true when it did.
    pub fn reconcile(&mut self, notes: &NoteCollection) -> bool {
        if self.selected.is_some() && self.resolve(notes).is_none() {
            self.selected = None;
            return true;
        }
        false
    }
}
