use crate::model::{Note, NoteCollection, NoteDraft, NoteId};
use crate::store::{NoteStore, TransportError};
use log::{debug, warn};
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// `NoteStore` over the JSON REST resource at `{base}/notes/`.
#[derive(Debug, Clone)]
pub struct HttpNoteStore {
    client: Client,
    base: Url,
}

impl HttpNoteStore {
    pub fn new(base: Url, timeout: Duration) -> Result<Self, TransportError> {
        if base.cannot_be_a_base() {
            return Err(TransportError::InvalidUrl(base.to_string()));
        }
        let client = Client::builder()
            .user_agent(concat!("notedesk/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network {
                url: base.to_string(),
                reason: format!("failed to create HTTP client: {}", e),
            })?;
        Ok(HttpNoteStore { client, base })
    }

    fn notes_url(&self) -> Result<Url, TransportError> {
        self.endpoint(&["notes", ""])
    }

    fn note_url(&self, id: &NoteId) -> Result<Url, TransportError> {
        self.endpoint(&["notes", &id.to_string(), ""])
    }

    /// Appends segments to the base path; the trailing empty segment gives
    /// the resource its trailing slash.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, TransportError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| TransportError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(
        &self,
        method: &'static str,
        url: &Url,
        request: reqwest::RequestBuilder,
        id: Option<&NoteId>,
    ) -> Result<Response, TransportError> {
        debug!("event=http_request method={} url={}", method, url);
        let response = request.send().await.map_err(|e| TransportError::Network {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let status = response.status();
        debug!(
            "event=http_response method={} url={} status={}",
            method,
            url,
            status.as_u16()
        );
        if status == StatusCode::NOT_FOUND {
            if let Some(id) = id {
                return Err(TransportError::NotFound(id.clone()));
            }
        }
        if !status.is_success() {
            return Err(TransportError::Status {
                method,
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn read_note(url: &Url, response: Response) -> Result<Note, TransportError> {
        response.json::<Note>().await.map_err(|e| TransportError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

impl NoteStore for HttpNoteStore {
    async fn list_notes(&self) -> Result<NoteCollection, TransportError> {
        let url = self.notes_url()?;
        let response = self
            .send("GET", &url, self.client.get(url.clone()), None)
            .await?;
        let body = response
            .json::<Value>()
            .await
            .map_err(|e| TransportError::Decode {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        let items = match body {
            Value::Array(items) => items,
            other => {
                warn!(
                    "event=list_not_array url={} kind={}",
                    url,
                    json_kind(&other)
                );
                return Ok(NoteCollection::new());
            }
        };
        let notes = items
            .into_iter()
            .map(serde_json::from_value::<Note>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| TransportError::Decode {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(NoteCollection::from_notes(notes))
    }

    async fn create_note(&self, draft: &NoteDraft) -> Result<Note, TransportError> {
        let url = self.notes_url()?;
        let response = self
            .send("POST", &url, self.client.post(url.clone()).json(draft), None)
            .await?;
        Self::read_note(&url, response).await
    }

    async fn update_note(&self, id: &NoteId, draft: &NoteDraft) -> Result<Note, TransportError> {
        let url = self.note_url(id)?;
        let response = self
            .send("PUT", &url, self.client.put(url.clone()).json(draft), Some(id))
            .await?;
        Self::read_note(&url, response).await
    }

    async fn delete_note(&self, id: &NoteId) -> Result<(), TransportError> {
        let url = self.note_url(id)?;
        self.send("DELETE", &url, self.client.delete(url.clone()), Some(id))
            .await?;
        Ok(())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serves exactly one canned response and hands back the raw request.
    async fn serve_once(status: &str, body: &str) -> (Url, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            request
        });
        let base = Url::parse(&format!("http://{}/api", addr)).unwrap();
        (base, handle)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut raw = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&raw).to_string();
            if let Some(header_end) = text.find("\r\n\r\n") {
                let body_len = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let lower = line.to_ascii_lowercase();
                        lower
                            .strip_prefix("content-length:")
                            .map(|v| v.trim().parse::<usize>().unwrap())
                    })
                    .unwrap_or(0);
                if raw.len() >= header_end + 4 + body_len {
                    break;
                }
            }
        }
        String::from_utf8(raw).unwrap()
    }

    fn store(base: Url) -> HttpNoteStore {
        HttpNoteStore::new(base, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn list_parses_notes_and_keeps_metadata() {
        let (base, server) = serve_once(
            "200 OK",
            r#"[{"id":1,"title":"a","content":"x","created_at":"2024-01-01"},{"id":2,"title":"b","content":""}]"#,
        )
        .await;
        let notes = store(base).list_notes().await.unwrap();
        let request = server.await.unwrap();
        assert!(request.starts_with("GET /api/notes/ HTTP/1.1"));
        assert_eq!(notes.len(), 2);
        let first = notes.get(&NoteId::Int(1)).unwrap();
        assert_eq!(first.metadata["created_at"], "2024-01-01");
    }

    #[tokio::test]
    async fn list_that_is_not_an_array_is_empty() {
        let (base, server) = serve_once("200 OK", r#"{"detail":"weird"}"#).await;
        let notes = store(base).list_notes().await.unwrap();
        server.await.unwrap();
        assert!(notes.is_empty());
    }

    #[tokio::test]
    async fn create_posts_json_draft() {
        let (base, server) =
            serve_once("201 Created", r#"{"id":"n-1","title":"A","content":"x"}"#).await;
        let note = store(base)
            .create_note(&NoteDraft::new("A", "x"))
            .await
            .unwrap();
        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/notes/ HTTP/1.1"));
        assert!(request
            .to_ascii_lowercase()
            .contains("content-type: application/json"));
        assert!(request.ends_with(r#"{"title":"A","content":"x"}"#));
        assert_eq!(note.id, NoteId::Text("n-1".into()));
    }

    #[tokio::test]
    async fn update_missing_note_is_not_found() {
        let (base, server) = serve_once("404 Not Found", r#"{"detail":"Not found."}"#).await;
        let err = store(base)
            .update_note(&NoteId::Int(9), &NoteDraft::new("A", ""))
            .await
            .unwrap_err();
        let request = server.await.unwrap();
        assert!(request.starts_with("PUT /api/notes/9/ HTTP/1.1"));
        assert_eq!(err, TransportError::NotFound(NoteId::Int(9)));
    }

    #[tokio::test]
    async fn delete_server_error_is_status_error() {
        let (base, server) = serve_once("500 Internal Server Error", "").await;
        let err = store(base.clone())
            .delete_note(&NoteId::Int(3))
            .await
            .unwrap_err();
        let request = server.await.unwrap();
        assert!(request.starts_with("DELETE /api/notes/3/ HTTP/1.1"));
        match err {
            TransportError::Status { method, status, .. } => {
                assert_eq!(method, "DELETE");
                assert_eq!(status, 500);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_server_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let base = Url::parse(&format!("http://{}/api", addr)).unwrap();
        let err = store(base).list_notes().await.unwrap_err();
        assert!(matches!(err, TransportError::Network { .. }));
    }

    #[test]
    fn endpoints_keep_base_path_and_escape_ids() {
        let store = store(Url::parse("http://example.com/v1/api/").unwrap());
        assert_eq!(
            store.notes_url().unwrap().as_str(),
            "http://example.com/v1/api/notes/"
        );
        assert_eq!(
            store.note_url(&NoteId::Text("a b".into())).unwrap().as_str(),
            "http://example.com/v1/api/notes/a%20b/"
        );
    }
}
