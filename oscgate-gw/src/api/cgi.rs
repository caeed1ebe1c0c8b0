//! Query-string CGI handlers: getValue.cgi and setValue.cgi
//!
//! The wire format is what the bundled web clients speak: the whole
//! decoded query string is the variable name on a read, and writes are
//! `name=value` pairs split on the first `=` and the next `&`, each
//! half percent-decoded on its own, with `+` in the decoded value
//! standing for a space.

use axum::extract::{RawQuery, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use oscgate_common::pool::DataPool;
use oscgate_common::textcodec::{percent_decode_str, plus_to_space};

use crate::AppState;

/// GET /cgi-bin/getValue.cgi?<name>
///
/// Renders the variable's current value as text/plain. An unknown name
/// is an empty body, not an error; a missing query string is 400.
pub async fn get_value(State(state): State<AppState>, RawQuery(query): RawQuery) -> Response {
    let Some(query) = query.filter(|q| !q.is_empty()) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    let name = percent_decode_str(&query);
    let value = state.pool.lock().unwrap().get_value(&name);
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain")],
        value,
    )
        .into_response()
}

/// GET /cgi-bin/setValue.cgi?<name>=<value>[&<name>=<value>...]
///
/// Applies every pair to the datapool and answers 200 with an empty
/// body whether or not any pair resolved to a known variable. In strict
/// mode the scan ends at the first remainder without `=`; otherwise the
/// malformed pair is skipped and the scan continues.
pub async fn set_value(State(state): State<AppState>, RawQuery(query): RawQuery) -> Response {
    let Some(query) = query.filter(|q| !q.is_empty()) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    let mut pool = state.pool.lock().unwrap();
    if state.strict_pair_scan {
        let mut rest = query.as_str();
        loop {
            let Some(eq) = rest.find('=') else {
                break;
            };
            let name_raw = &rest[..eq];
            let after = &rest[eq + 1..];
            let (value_raw, next) = match after.find('&') {
                Some(amp) => (&after[..amp], Some(&after[amp + 1..])),
                None => (after, None),
            };
            apply_pair(&mut pool, name_raw, value_raw);
            match next {
                Some(n) => rest = n,
                None => break,
            }
        }
    } else {
        for segment in query.split('&') {
            if let Some((name_raw, value_raw)) = segment.split_once('=') {
                apply_pair(&mut pool, name_raw, value_raw);
            }
        }
    }

    StatusCode::OK.into_response()
}

fn apply_pair(pool: &mut DataPool, name_raw: &str, value_raw: &str) {
    let name = percent_decode_str(name_raw);
    let value = plus_to_space(&percent_decode_str(value_raw));
    pool.set_value(&name, &value);
}

/// Any other name under /cgi-bin/ is forbidden.
pub async fn forbidden() -> Response {
    StatusCode::FORBIDDEN.into_response()
}
