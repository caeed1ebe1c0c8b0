//! # OSC Gateway Common Library
//!
//! Shared code for the gateway service:
//! - Percent-encoding/decoding text utilities
//! - Streaming JSON scanner (single-pass, no parse tree)
//! - Tiered variable store ("datapool")
//! - OSC packet encoding and UDP transport
//! - Configuration loading

pub mod config;
pub mod error;
pub mod json_scan;
pub mod osc;
pub mod pool;
pub mod textcodec;

pub use error::{Error, Result};
