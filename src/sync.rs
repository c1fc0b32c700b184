//! Orchestration of user intents against the remote store.
//!
//! Every intent runs in three phases so the event loop never has to hold the
//! controller across a network call:
//!
//! - `request_*` inspects and updates local state and returns a request value,
//! - `perform_*` talks to the store and returns an outcome,
//! - `apply_*` folds the outcome back into local state.
//!
//! The collection is only ever replaced by a load. Selection and modal only
//! reach their terminal states after the store reported success.

use crate::modal::{Generation, ModalController, ModalState};
use crate::model::{Note, NoteCollection, NoteDraft, NoteId};
use crate::selection::SelectionModel;
use crate::store::{NoteStore, TransportError};
use chrono::{DateTime, Local};
use log::{debug, info, warn};
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// User-visible feedback about the last intent.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub at: DateTime<Local>,
}

impl Notice {
    fn info(message: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Info,
            message: message.into(),
            at: Local::now(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Error,
            message: message.into(),
            at: Local::now(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.at.format("%H:%M:%S"), self.message)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    seq: u64,
    select_after: Option<NoteId>,
}

#[derive(Debug)]
pub struct LoadOutcome {
    request: LoadRequest,
    result: Result<NoteCollection, TransportError>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SaveRequest {
    generation: Generation,
    target: Option<NoteId>,
    draft: NoteDraft,
}

#[derive(Debug)]
pub struct SaveOutcome {
    request: SaveRequest,
    result: Result<Note, TransportError>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteRequest {
    generation: Generation,
    target: Note,
}

#[derive(Debug)]
pub struct DeleteOutcome {
    request: DeleteRequest,
    result: Result<(), TransportError>,
}

pub struct SyncController<S> {
    store: Rc<S>,
    notes: NoteCollection,
    selection: SelectionModel,
    modal: ModalController,
    notice: Option<Notice>,
    loads_issued: u64,
    loads_applied: u64,
}

impl<S: NoteStore> SyncController<S> {
    pub fn new(store: S) -> Self {
        SyncController {
            store: Rc::new(store),
            notes: NoteCollection::new(),
            selection: SelectionModel::default(),
            modal: ModalController::default(),
            notice: None,
            loads_issued: 0,
            loads_applied: 0,
        }
    }

    pub fn store(&self) -> Rc<S> {
        Rc::clone(&self.store)
    }

    pub fn notes(&self) -> &NoteCollection {
        &self.notes
    }

    pub fn selection(&self) -> &SelectionModel {
        &self.selection
    }

    pub fn selected_note(&self) -> Option<&Note> {
        self.selection.resolve(&self.notes)
    }

    pub fn modal(&self) -> &ModalState {
        self.modal.state()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    /// Select intent. Ids that are not in the collection are ignored so the
    /// selection never dangles.
    pub fn select(&mut self, id: Option<NoteId>) {
        match id {
            Some(id) if !self.notes.contains(&id) => {
                debug!("event=select_ignored id={}", id);
            }
            other => self.selection.select(other),
        }
    }

    pub fn open_create(&mut self) {
        self.modal.open_create();
    }

    pub fn open_edit(&mut self, note: Note) {
        self.modal.open_edit(note);
    }

    pub fn open_delete(&mut self, note: Note) {
        self.modal.open_delete(note);
    }

    pub fn cancel_modal(&mut self) -> bool {
        self.modal.cancel()
    }

    // --- load ---

    pub fn request_load(&mut self) -> LoadRequest {
        self.next_load(None)
    }

    pub async fn perform_load(store: &S, request: LoadRequest) -> LoadOutcome {
        let result = store.list_notes().await;
        LoadOutcome { request, result }
    }

    pub fn apply_load(&mut self, outcome: LoadOutcome) {
        let LoadOutcome { request, result } = outcome;
        if request.seq < self.loads_applied {
            debug!(
                "event=load_stale seq={} applied={}",
                request.seq, self.loads_applied
            );
            self.select_if_present(request.select_after);
            return;
        }
        self.loads_applied = request.seq;
        match result {
            Ok(notes) => {
                info!("event=load status=ok count={}", notes.len());
                self.notes = notes;
                if self.selection.reconcile(&self.notes) {
                    debug!("event=selection_cleared reason=missing_after_load");
                }
                let target_gone = self
                    .modal
                    .state()
                    .target_id()
                    .is_some_and(|id| !self.notes.contains(id));
                if target_gone {
                    self.modal.cancel();
                    self.notice = Some(Notice::error("The note no longer exists."));
                }
            }
            Err(err) => {
                warn!("event=load status=error error={}", err);
                self.notes = NoteCollection::new();
                self.selection.clear();
                self.notice = Some(Notice::error("Failed to load notes."));
            }
        }
        self.select_if_present(request.select_after);
    }

    // --- save ---

    /// Turns the open edit form into a create or update request. Returns
    /// `None` when there is no edit form, a submit is already in flight, or
    /// the draft does not validate.
    pub fn request_save(&mut self, draft: NoteDraft) -> Option<SaveRequest> {
        let target = match self.modal.state() {
            ModalState::Editing { target, .. } => target.as_ref().map(|n| n.id.clone()),
            _ => {
                debug!("event=save_ignored reason=no_edit_modal");
                return None;
            }
        };
        if let Err(err) = draft.validate() {
            self.notice = Some(Notice::error(err.to_string()));
            return None;
        }
        let generation = self.modal.begin_submit()?;
        Some(SaveRequest {
            generation,
            target,
            draft,
        })
    }

    pub async fn perform_save(store: &S, request: SaveRequest) -> SaveOutcome {
        let result = match &request.target {
            Some(id) => store.update_note(id, &request.draft).await,
            None => store.create_note(&request.draft).await,
        };
        SaveOutcome { request, result }
    }

    /// On success returns the reload that must follow.
    pub fn apply_save(&mut self, outcome: SaveOutcome) -> Option<LoadRequest> {
        let SaveOutcome { request, result } = outcome;
        match result {
            Ok(note) => {
                let current = self.modal.is_current(request.generation);
                let closed = self.modal.complete(request.generation);
                info!(
                    "event=save status=ok id={} update={} current={} closed={}",
                    note.id,
                    request.target.is_some(),
                    current,
                    closed
                );
                self.notice = Some(Notice::info(format!("Saved \"{}\"", note.display_title())));
                let select_after = if current { Some(note.id) } else { None };
                Some(self.next_load(select_after))
            }
            Err(err) => {
                warn!("event=save status=error error={}", err);
                self.modal.fail_submit(request.generation);
                self.notice = Some(Notice::error("Failed to save note."));
                None
            }
        }
    }

    // --- delete ---

    /// Turns an open delete confirmation into a request.
    pub fn request_delete(&mut self) -> Option<DeleteRequest> {
        let target = match self.modal.state() {
            ModalState::ConfirmingDelete { target, .. } => target.clone(),
            _ => {
                debug!("event=delete_ignored reason=no_confirm_modal");
                return None;
            }
        };
        let generation = self.modal.begin_submit()?;
        Some(DeleteRequest { generation, target })
    }

    pub async fn perform_delete(store: &S, request: DeleteRequest) -> DeleteOutcome {
        let result = store.delete_note(&request.target.id).await;
        DeleteOutcome { request, result }
    }

    pub fn apply_delete(&mut self, outcome: DeleteOutcome) -> Option<LoadRequest> {
        let DeleteOutcome { request, result } = outcome;
        match result {
            Ok(()) => {
                let current = self.modal.complete(request.generation);
                info!(
                    "event=delete status=ok id={} current={}",
                    request.target.id, current
                );
                self.selection.clear_if(&request.target.id);
                self.notice = Some(Notice::info(format!(
                    "Deleted \"{}\"",
                    request.target.display_title()
                )));
                Some(self.next_load(None))
            }
            Err(err) => {
                warn!("event=delete status=error error={}", err);
                self.modal.fail_submit(request.generation);
                self.notice = Some(Notice::error("Failed to delete note."));
                None
            }
        }
    }

    // --- sequential drivers ---

    /// Load intent. Returns false when the fetch failed and the collection
    /// degraded to empty.
    pub async fn load(&mut self) -> bool {
        let request = self.request_load();
        self.run_load(request).await
    }

    /// Save intent for the open edit form. Returns true once the note is
    /// stored and the collection has been reloaded.
    pub async fn save(&mut self, draft: NoteDraft) -> bool {
        let Some(request) = self.request_save(draft) else {
            return false;
        };
        let store = self.store();
        let outcome = Self::perform_save(&store, request).await;
        match self.apply_save(outcome) {
            Some(reload) => {
                self.run_load(reload).await;
                true
            }
            None => false,
        }
    }

    /// Delete intent for the open confirmation.
    pub async fn confirm_delete(&mut self) -> bool {
        let Some(request) = self.request_delete() else {
            return false;
        };
        let store = self.store();
        let outcome = Self::perform_delete(&store, request).await;
        match self.apply_delete(outcome) {
            Some(reload) => {
                self.run_load(reload).await;
                true
            }
            None => false,
        }
    }

    async fn run_load(&mut self, request: LoadRequest) -> bool {
        let store = self.store();
        let outcome = Self::perform_load(&store, request).await;
        let ok = outcome.result.is_ok();
        self.apply_load(outcome);
        ok
    }

    fn next_load(&mut self, select_after: Option<NoteId>) -> LoadRequest {
        self.loads_issued += 1;
        LoadRequest {
            seq: self.loads_issued,
            select_after,
        }
    }

    fn select_if_present(&mut self, id: Option<NoteId>) {
        if let Some(id) = id {
            if self.notes.contains(&id) {
                self.selection.select(Some(id));
            }
        }
    }
}
