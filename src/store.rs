use crate::model::{Note, NoteCollection, NoteDraft, NoteId};

/// Any failure of a remote call. The controller reports all of them the same
/// way; the variants exist for logs and tests.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("could not reach {url}: {reason}")]
    Network { url: String, reason: String },
    #[error("{method} {url} returned status {status}")]
    Status {
        method: &'static str,
        url: String,
        status: u16,
    },
    #[error("note {0} not found")]
    NotFound(NoteId),
    #[error("unexpected response from {url}: {reason}")]
    Decode { url: String, reason: String },
    #[error("invalid api url: {0}")]
    InvalidUrl(String),
}

/// Remote accessor for the note resource. Each call maps to exactly one
/// request; nothing is retried.
#[allow(async_fn_in_trait)]
pub trait NoteStore {
    async fn list_notes(&self) -> Result<NoteCollection, TransportError>;

    async fn create_note(&self, draft: &NoteDraft) -> Result<Note, TransportError>;

    async fn update_note(&self, id: &NoteId, draft: &NoteDraft) -> Result<Note, TransportError>;

    async fn delete_note(&self, id: &NoteId) -> Result<(), TransportError>;
}
