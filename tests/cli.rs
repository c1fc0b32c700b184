#![allow(deprecated)]

use assert_cmd::cargo::cargo_bin;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::thread;
use tempfile::TempDir;

fn notedesk_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(cargo_bin("notedesk"));
    cmd.env("NOTEDESK_HOME", home.as_os_str())
        .env_remove("NOTES_API_URL");
    cmd
}

/// Answers one HTTP request per `(status, body)` pair, in order, and
/// returns the API base URL.
fn serve_sequence(responses: Vec<(&'static str, &'static str)>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        for (status, body) in responses {
            let (mut stream, _) = listener.accept().unwrap();
            drain_request(&mut stream);
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).unwrap();
        }
    });
    format!("http://{}/api", addr)
}

fn serve_once(body: &'static str) -> String {
    serve_sequence(vec![("200 OK", body)])
}

/// Reads the request head and any body it announces.
fn drain_request(stream: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = stream.read(&mut chunk).unwrap();
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);
    };
    let head = String::from_utf8_lossy(&buf[..head_end]).to_ascii_lowercase();
    let body_len = head
        .lines()
        .find_map(|l| l.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < head_end + body_len {
        let n = stream.read(&mut chunk).unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/api", addr)
}

#[test]
fn theme_defaults_to_light_and_toggle_persists() {
    let home = TempDir::new().unwrap();

    notedesk_cmd(home.path())
        .args(["theme"])
        .assert()
        .success()
        .stdout(predicate::str::contains("light"));

    notedesk_cmd(home.path())
        .args(["theme", "toggle"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dark"));

    let stored = fs::read_to_string(home.path().join("theme")).unwrap();
    assert_eq!(stored.trim(), "dark");

    notedesk_cmd(home.path())
        .args(["theme", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dark"));
}

#[test]
fn theme_set_overrides_current_value() {
    let home = TempDir::new().unwrap();
    notedesk_cmd(home.path())
        .args(["theme", "set", "dark"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dark"));
    notedesk_cmd(home.path())
        .args(["theme", "set", "light"])
        .assert()
        .success()
        .stdout(predicate::str::contains("light"));
}

#[test]
fn first_run_writes_config_and_logs() {
    let home = TempDir::new().unwrap();
    notedesk_cmd(home.path()).args(["theme"]).assert().success();
    assert!(home.path().join("config.yml").exists());
    assert!(home.path().join("logs").is_dir());
}

#[test]
fn add_without_title_is_rejected_before_any_request() {
    let home = TempDir::new().unwrap();
    notedesk_cmd(home.path())
        .args(["add", "   ", "--api-url", &closed_port_url()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Title is required"));
}

#[test]
fn list_reports_unreachable_service() {
    let home = TempDir::new().unwrap();
    notedesk_cmd(home.path())
        .args(["list", "--api-url", &closed_port_url()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load notes."));
}

#[test]
fn list_prints_remote_notes() {
    let home = TempDir::new().unwrap();
    let url = serve_once(r#"[{"id":1,"title":"Groceries","content":"milk"},{"id":"b2","title":""}]"#);
    notedesk_cmd(home.path())
        .env("NOTES_API_URL", &url)
        .args(["list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1: Groceries"))
        .stdout(predicate::str::contains("b2: (Untitled)"));
}

#[test]
fn list_of_empty_collection_shows_hint() {
    let home = TempDir::new().unwrap();
    let url = serve_once("[]");
    notedesk_cmd(home.path())
        .args(["list", "--api-url", &url])
        .assert()
        .success()
        .stdout(predicate::str::contains("No notes. Create the first one!"));
}

#[test]
fn show_prints_content() {
    let home = TempDir::new().unwrap();
    let url = serve_once(r#"[{"id":7,"title":"Plan","content":"step one"}]"#);
    notedesk_cmd(home.path())
        .args(["show", "7", "--api-url", &url])
        .assert()
        .success()
        .stdout(predicate::str::contains("Plan (7)"))
        .stdout(predicate::str::contains("step one"));
}

#[test]
fn show_unknown_id_fails() {
    let home = TempDir::new().unwrap();
    let url = serve_once(r#"[{"id":7,"title":"Plan","content":""}]"#);
    notedesk_cmd(home.path())
        .args(["show", "8", "--api-url", &url])
        .assert()
        .failure()
        .stderr(predicate::str::contains("note 8 not found"));
}

#[test]
fn add_reports_failed_reload_after_create() {
    let home = TempDir::new().unwrap();
    let url = serve_sequence(vec![
        ("200 OK", "[]"),
        ("201 Created", r#"{"id":5,"title":"Fresh","content":""}"#),
        ("500 Internal Server Error", "{}"),
    ]);
    notedesk_cmd(home.path())
        .args(["add", "Fresh", "--api-url", &url])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load notes."));
}
