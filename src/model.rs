use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

pub const TITLE_MAX_CHARS: usize = 60;
pub const CONTENT_MAX_CHARS: usize = 5000;

/// Server-assigned note identifier. The wire format allows either an
/// integer or a string; the client never looks inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NoteId {
    Int(i64),
    Text(String),
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoteId::Int(id) => write!(f, "{}", id),
            NoteId::Text(id) => f.write_str(id),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Note {
    pub id: NoteId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    /// Extra server fields (timestamps and the like), kept verbatim.
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl Note {
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            "(Untitled)"
        } else {
            &self.title
        }
    }
}

/// The `{title, content}` body sent on create and update.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DraftError {
    #[error("Title is required")]
    TitleRequired,
    #[error("Title is limited to 60 characters (got {0})")]
    TitleTooLong(usize),
    #[error("Content is limited to 5000 characters (got {0})")]
    ContentTooLong(usize),
}

impl NoteDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        NoteDraft {
            title: title.into(),
            content: content.into(),
        }
    }

    pub fn validate(&self) -> Result<(), DraftError> {
        if self.title.trim().is_empty() {
            return Err(DraftError::TitleRequired);
        }
        let title_len = self.title.chars().count();
        if title_len > TITLE_MAX_CHARS {
            return Err(DraftError::TitleTooLong(title_len));
        }
        let content_len = self.content.chars().count();
        if content_len > CONTENT_MAX_CHARS {
            return Err(DraftError::ContentTooLong(content_len));
        }
        Ok(())
    }
}

/// Ordered snapshot of the remote collection. Replaced wholesale on every
/// load, never patched in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteCollection {
    notes: Vec<Note>,
}

impl NoteCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a collection in server order. Duplicate ids keep the first
    /// occurrence.
    pub fn from_notes(notes: Vec<Note>) -> Self {
        let mut unique: Vec<Note> = Vec::with_capacity(notes.len());
        for note in notes {
            if unique.iter().any(|n| n.id == note.id) {
                warn!("event=duplicate_note_id id={}", note.id);
                continue;
            }
            unique.push(note);
        }
        NoteCollection { notes: unique }
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Note> {
        self.notes.iter()
    }

    pub fn get(&self, id: &NoteId) -> Option<&Note> {
        self.notes.iter().find(|n| &n.id == id)
    }

    pub fn contains(&self, id: &NoteId) -> bool {
        self.get(id).is_some()
    }

    pub fn position(&self, id: &NoteId) -> Option<usize> {
        self.notes.iter().position(|n| &n.id == id)
    }

    pub fn at(&self, index: usize) -> Option<&Note> {
        self.notes.get(index)
    }

    /// Looks a note up by the textual form of its id, as typed on a command line.
    pub fn find_by_label(&self, label: &str) -> Option<&Note> {
        self.notes.iter().find(|n| n.id.to_string() == label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn note(id: i64, title: &str) -> Note {
        Note {
            id: NoteId::Int(id),
            title: title.to_string(),
            content: String::new(),
            metadata: Map::new(),
        }
    }

    #[test]
    fn note_keeps_unknown_fields() {
        let raw = json!({
            "id": 7,
            "title": "Groceries",
            "content": "milk",
            "created_at": "2024-01-01T00:00:00Z",
            "pinned": false
        });
        let parsed: Note = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(parsed.id, NoteId::Int(7));
        assert_eq!(parsed.metadata.len(), 2);
        assert_eq!(serde_json::to_value(&parsed).unwrap(), raw);
    }

    #[test]
    fn string_ids_stay_strings() {
        let parsed: Note =
            serde_json::from_value(json!({"id": "a1b2", "title": "x", "content": ""})).unwrap();
        assert_eq!(parsed.id, NoteId::Text("a1b2".into()));
        assert_eq!(parsed.id.to_string(), "a1b2");
        assert_ne!(NoteId::Int(3), NoteId::Text("3".into()));
    }

    #[test]
    fn missing_title_and_content_default_to_empty() {
        let parsed: Note = serde_json::from_value(json!({"id": 1})).unwrap();
        assert_eq!(parsed.title, "");
        assert_eq!(parsed.display_title(), "(Untitled)");
    }

    #[test]
    fn draft_validation() {
        assert_eq!(
            NoteDraft::new("   ", "body").validate(),
            Err(DraftError::TitleRequired)
        );
        assert_eq!(
            NoteDraft::new("t".repeat(61), "").validate(),
            Err(DraftError::TitleTooLong(61))
        );
        assert_eq!(
            NoteDraft::new("ok", "c".repeat(5001)).validate(),
            Err(DraftError::ContentTooLong(5001))
        );
        assert!(NoteDraft::new("é".repeat(60), "c".repeat(5000))
            .validate()
            .is_ok());
    }

    #[test]
    fn collection_drops_duplicate_ids() {
        let notes = NoteCollection::from_notes(vec![note(1, "a"), note(2, "b"), note(1, "c")]);
        assert_eq!(notes.len(), 2);
        assert_eq!(notes.get(&NoteId::Int(1)).unwrap().title, "a");
        assert_eq!(notes.position(&NoteId::Int(2)), Some(1));
        assert_eq!(notes.find_by_label("2").unwrap().title, "b");
    }
}
