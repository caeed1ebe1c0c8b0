//! Propagation tests: datapool writes mirrored onto the OSC route
//!
//! Covers:
//! - exactly one outbound message per matching write, zero otherwise
//! - address equals the variable name, payload matches the inferred type
//! - seed-time batching into a single wrapped bundle
//! - user-space priority over a colliding dynamic entry

use std::sync::{Arc, Mutex};

use oscgate_common::osc::{OscRoute, OscTransport};
use oscgate_common::pool::{DataPool, NullUserVars, PoolOptions, SystemFacts, SystemSpace, UserVars};
use oscgate_common::Result;

/// Transport stub capturing every datagram.
#[derive(Clone, Default)]
struct RecordingTransport {
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl OscTransport for RecordingTransport {
    fn send(&self, packet: &[u8]) -> Result<()> {
        self.sent.lock().unwrap().push(packet.to_vec());
        Ok(())
    }
}

fn facts() -> SystemFacts {
    SystemFacts {
        app_name: "gw-test".into(),
        app_version: "0.0.0".into(),
        server_ip: "127.0.0.1".into(),
        server_port: 8080,
        user_prefix: "DPU.".into(),
        osc_host: "localhost".into(),
        osc_port: 3001,
        osc_prefix: "/".into(),
    }
}

fn pool_with_route(osc_prefix: &str) -> (DataPool, RecordingTransport) {
    let transport = RecordingTransport::default();
    let route = OscRoute::new(osc_prefix, Box::new(transport.clone()));
    let options = PoolOptions {
        on_the_fly_allocation: true,
        ..PoolOptions::default()
    };
    let pool = DataPool::new(
        options,
        SystemSpace::new(&facts()),
        Box::new(NullUserVars),
        Some(route),
    );
    (pool, transport)
}

#[test]
fn matching_write_sends_exactly_one_message() {
    let (mut pool, transport) = pool_with_route("/");
    pool.init(&[]);

    pool.set_value("/1/fader1", "0.5");

    let sent = transport.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    let packet = &sent[0];
    // unwrapped single message: padded address, float type tag, payload
    assert_eq!(&packet[0..12], b"/1/fader1\0\0\0");
    assert_eq!(&packet[12..16], b",f\0\0");
    assert_eq!(&packet[16..20], &0.5f32.to_be_bytes());
    assert_eq!(packet.len(), 20);
}

#[test]
fn integer_value_goes_out_as_int32() {
    let (mut pool, transport) = pool_with_route("/");
    pool.init(&[]);

    pool.set_value("/toggle", "1");

    let sent = transport.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    let packet = &sent[0];
    assert_eq!(&packet[0..8], b"/toggle\0");
    assert_eq!(&packet[8..12], b",i\0\0");
    assert_eq!(&packet[12..16], &1i32.to_be_bytes());
}

#[test]
fn text_value_goes_out_as_string() {
    let (mut pool, transport) = pool_with_route("/");
    pool.init(&[]);

    pool.set_value("/label", "hi");

    let sent = transport.sent.lock().unwrap();
    let packet = &sent[0];
    assert_eq!(&packet[0..8], b"/label\0\0");
    assert_eq!(&packet[8..12], b",s\0\0");
    assert_eq!(&packet[12..16], b"hi\0\0");
}

#[test]
fn non_matching_write_sends_nothing() {
    let (mut pool, transport) = pool_with_route("/");
    pool.init(&[]);

    pool.set_value("plain", "0.5");

    assert_eq!(pool.get_value("plain"), "0.5");
    assert!(transport.sent.lock().unwrap().is_empty());
}

#[test]
fn empty_prefix_mirrors_every_write() {
    let (mut pool, transport) = pool_with_route("");
    pool.init(&[]);

    pool.set_value("anything", "x");

    assert_eq!(transport.sent.lock().unwrap().len(), 1);
}

#[test]
fn propagation_is_independent_of_resolution() {
    // a write to a read-only system variable still goes out
    let (mut pool, transport) = pool_with_route("");
    pool.init(&[]);

    pool.set_value("APP_NAME", "other");

    assert_eq!(pool.get_value("APP_NAME"), "gw-test");
    assert_eq!(transport.sent.lock().unwrap().len(), 1);
}

#[test]
fn seeding_batches_one_wrapped_bundle() {
    let (mut pool, transport) = pool_with_route("/");
    let seeded = pool.init(&[
        ("/a".into(), "1".into()),
        ("x".into(), "2".into()),
        ("/b".into(), "t".into()),
    ]);
    assert_eq!(seeded, 3);

    let sent = transport.sent.lock().unwrap();
    assert_eq!(sent.len(), 1, "all seed entries share one bundle");
    let packet = &sent[0];
    assert_eq!(&packet[0..8], b"#bundle\0");
    assert_eq!(&packet[8..16], &1u64.to_be_bytes());
    // two size-prefixed 12-byte messages: /a (int) and /b (string); x is
    // not routed
    assert_eq!(packet.len(), 16 + (4 + 12) * 2);
    assert_eq!(&packet[16..20], &12u32.to_be_bytes());
    assert_eq!(&packet[20..24], b"/a\0\0");
    assert_eq!(&packet[36..40], b"/b\0\0");
}

#[test]
fn empty_seed_sends_no_bundle() {
    let (mut pool, transport) = pool_with_route("/");
    pool.init(&[]);
    assert!(transport.sent.lock().unwrap().is_empty());
}

/// Single fixed accessor used to probe address-space priority.
struct OneVar;

impl UserVars for OneVar {
    fn get(&mut self, name: &str) -> String {
        if name == "knob" {
            "user-side".to_string()
        } else {
            String::new()
        }
    }

    fn set(&mut self, _name: &str, _value: &str) {}
}

#[test]
fn user_space_wins_over_colliding_dynamic_entry() {
    let options = PoolOptions::default();
    let mut pool = DataPool::new(
        options,
        SystemSpace::new(&facts()),
        Box::new(OneVar),
        None,
    );
    // seeding bypasses resolution, so the literal name lands in dynamic
    // space despite carrying the user prefix
    pool.init(&[("DPU.knob".into(), "dynamic-side".into())]);
    assert_eq!(pool.dynamic_len(), 1);

    assert_eq!(pool.get_value("DPU.knob"), "user-side");
}
