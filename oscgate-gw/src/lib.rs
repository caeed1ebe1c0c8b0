//! oscgate-gw library - HTTP face of the OSC gateway
//!
//! Translates CGI-style GET requests and the JSON batch protocol into
//! datapool operations. The router and state live here so integration
//! tests can drive them in-process.

use std::path::Path;
use std::sync::{Arc, Mutex};

use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use oscgate_common::pool::DataPool;

pub mod api;
pub mod uservars;

/// Application state shared across HTTP handlers.
///
/// The datapool sits behind a mutex: each handler holds the lock for
/// the whole resolve-mutate-propagate sequence, so a value update and
/// its OSC side effect are observed as one unit and concurrent writers'
/// sends cannot interleave.
#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<Mutex<DataPool>>,
    /// Stop the setValue pair scan at the first pair lacking `=`.
    pub strict_pair_scan: bool,
}

impl AppState {
    pub fn new(pool: Arc<Mutex<DataPool>>, strict_pair_scan: bool) -> Self {
        Self {
            pool,
            strict_pair_scan,
        }
    }
}

/// Build the application router.
///
/// The CGI surface lives under `/cgi-bin/`; unrecognized names there
/// are forbidden rather than falling through to the static web root.
pub fn build_router(state: AppState, web_root: &Path) -> Router {
    use axum::routing::{any, get, post};

    let cgi = Router::new()
        .route("/cgi-bin/getValue.cgi", get(api::get_value))
        .route("/cgi-bin/setValue.cgi", get(api::set_value))
        .route("/cgi-bin/json.cgi", post(api::json_batch))
        .route("/cgi-bin/", any(api::forbidden))
        .route("/cgi-bin/*rest", any(api::forbidden));

    Router::new()
        .merge(cgi)
        .merge(api::health_routes())
        .fallback_service(ServeDir::new(web_root))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
