//! JSON batch handler: json.cgi
//!
//! Request shape:
//!
//! ```json
//! {"version":"1",
//!  "read":[{"var":"name"}, ...],
//!  "write":[{"var":"name","val":"v"}, ...]}
//! ```
//!
//! The body is scanned in a single pass and the response text is
//! assembled while the scan runs; nothing is ever collected into a
//! tree. Each `read` entry echoes the current value, each `write` entry
//! applies the write and echoes the post-write value. A `version` other
//! than `"1"` aborts the scan and the response stays an empty object.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use oscgate_common::json_scan::{JsonEvent, JsonScanner};

use crate::AppState;

/// Where the scan currently sits relative to the batch arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    /// top-level pairs (`version`)
    Top,
    /// saw the `read` key, array not yet open
    ReadPending,
    /// inside the `read` array; true until the first element is emitted
    InRead(bool),
    /// saw the `write` key, array not yet open
    WritePending,
    /// inside the `write` array
    InWrite(bool),
}

/// POST /cgi-bin/json.cgi
pub async fn json_batch(State(state): State<AppState>, body: Bytes) -> Response {
    let mut scanner = JsonScanner::new(&body, body.len());
    let mut out = String::from("{");
    let mut section = Section::Top;
    let mut sections_emitted = 0;
    // a write entry's variable name, held until its value arrives
    let mut pending_var = String::new();

    let mut pool = state.pool.lock().unwrap();

    while let Some(event) = scanner.next_event() {
        match event {
            JsonEvent::Pair => {
                if scanner.depth() == 1 {
                    let key = scanner.key();
                    if key == "read" || key == "write" {
                        if sections_emitted > 0 {
                            out.push(',');
                        }
                        sections_emitted += 1;
                        out.push('"');
                        out.push_str(&key);
                        out.push_str("\":");
                        section = if key == "read" {
                            Section::ReadPending
                        } else {
                            Section::WritePending
                        };
                    }
                }
            }
            JsonEvent::StartArray => {
                if scanner.depth() == 1 {
                    match section {
                        Section::ReadPending => {
                            section = Section::InRead(true);
                            out.push('[');
                        }
                        Section::WritePending => {
                            section = Section::InWrite(true);
                            out.push('[');
                        }
                        _ => {}
                    }
                }
            }
            JsonEvent::EndArray => {
                if scanner.depth() == 1 && section != Section::Top {
                    out.push(']');
                    section = Section::Top;
                }
            }
            JsonEvent::Value => match section {
                Section::Top => {
                    if scanner.key() == "version" && scanner.value() != "1" {
                        scanner.abort();
                    }
                }
                Section::InRead(first) => {
                    if scanner.key() == "var" {
                        let name = scanner.value().into_owned();
                        let value = pool.get_value(&name);
                        if !first {
                            out.push(',');
                        }
                        section = Section::InRead(false);
                        emit_entry(&mut out, &name, &value);
                    }
                }
                Section::InWrite(first) => {
                    if scanner.key() == "var" {
                        pending_var = scanner.value().into_owned();
                    } else if scanner.key() == "val" {
                        let value = scanner.value().into_owned();
                        pool.set_value(&pending_var, &value);
                        let stored = pool.get_value(&pending_var);
                        if !first {
                            out.push(',');
                        }
                        section = Section::InWrite(false);
                        emit_entry(&mut out, &pending_var, &stored);
                    }
                }
                Section::ReadPending | Section::WritePending => {}
            },
            JsonEvent::StartObject | JsonEvent::EndObject => {}
        }
    }

    out.push('}');
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        out,
    )
        .into_response()
}

/// Append one `{"var":...,"val":...}` element.
fn emit_entry(out: &mut String, name: &str, value: &str) {
    out.push_str("{\"var\":\"");
    escape_into(out, name);
    out.push_str("\",\"val\":\"");
    escape_into(out, value);
    out.push_str("\"}");
}

/// Escape quotes, backslashes and control bytes so stored values cannot
/// break the response envelope.
fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
}
