use crate::model::{Note, NoteId};

/// Identifies one opening of a modal. Responses issued under an older
/// generation must not close the modal that replaced it.
pub type Generation = u64;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ModalState {
    #[default]
    Closed,
    /// `target: None` creates a new note.
    Editing {
        target: Option<Note>,
        submitting: bool,
    },
    ConfirmingDelete {
        target: Note,
        submitting: bool,
    },
}

impl ModalState {
    pub fn is_open(&self) -> bool {
        !matches!(self, ModalState::Closed)
    }

    pub fn is_editing(&self) -> bool {
        matches!(self, ModalState::Editing { .. })
    }

    pub fn is_submitting(&self) -> bool {
        match self {
            ModalState::Closed => false,
            ModalState::Editing { submitting, .. }
            | ModalState::ConfirmingDelete { submitting, .. } => *submitting,
        }
    }

    /// Id of the existing note the modal works on, if any.
    pub fn target_id(&self) -> Option<&NoteId> {
        match self {
            ModalState::Editing {
                target: Some(note), ..
            }
            | ModalState::ConfirmingDelete { target: note, .. } => Some(&note.id),
            _ => None,
        }
    }
}

/// At most one overlay is open. Opening a modal replaces whatever was open;
/// terminal transitions after a submit are only taken on behalf of the
/// generation that issued it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModalController {
    state: ModalState,
    generation: Generation,
}

impl ModalController {
    pub fn state(&self) -> &ModalState {
        &self.state
    }

    pub fn open_create(&mut self) -> Generation {
        self.replace(ModalState::Editing {
            target: None,
            submitting: false,
        })
    }

    pub fn open_edit(&mut self, note: Note) -> Generation {
        self.replace(ModalState::Editing {
            target: Some(note),
            submitting: false,
        })
    }

    pub fn open_delete(&mut self, note: Note) -> Generation {
        self.replace(ModalState::ConfirmingDelete {
            target: note,
            submitting: false,
        })
    }

    /// Closes whatever is open. Returns false when nothing was.
    pub fn cancel(&mut self) -> bool {
        let was_open = self.state.is_open();
        self.state = ModalState::Closed;
        was_open
    }

    /// Marks the open modal as having a request in flight and hands back the
    /// generation the request belongs to. Refused while closed or while a
    /// previous submit is still pending.
    pub fn begin_submit(&mut self) -> Option<Generation> {
        match &mut self.state {
            ModalState::Closed => None,
            ModalState::Editing { submitting, .. }
            | ModalState::ConfirmingDelete { submitting, .. } => {
                if *submitting {
                    return None;
                }
                *submitting = true;
                Some(self.generation)
            }
        }
    }

    /// A submit failed: the modal stays open and accepts another attempt.
    pub fn fail_submit(&mut self, generation: Generation) {
        if generation != self.generation {
            return;
        }
        if let ModalState::Editing { submitting, .. }
        | ModalState::ConfirmingDelete { submitting, .. } = &mut self.state
        {
            *submitting = false;
        }
    }

    /// True while no other modal has been opened since `generation` was
    /// handed out. A plain cancel keeps the generation current.
    pub fn is_current(&self, generation: Generation) -> bool {
        generation == self.generation
    }

    /// A submit succeeded: close the modal if it is still the one that
    /// issued the request.
    pub fn complete(&mut self, generation: Generation) -> bool {
        if generation != self.generation || !self.state.is_open() {
            return false;
        }
        self.state = ModalState::Closed;
        true
    }

    fn replace(&mut self, state: ModalState) -> Generation {
        self.generation += 1;
        self.state = state;
        self.generation
    }
}
