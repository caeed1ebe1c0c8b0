//! Tiered variable store ("datapool")
//!
//! Resolves variable names across three address spaces in a fixed
//! priority order:
//!
//! 1. **User space** — names carrying the configured user prefix, served
//!    by pluggable accessors the embedding application supplies
//! 2. **System space** — a closed table of read-only gateway facts
//! 3. **Dynamic space** — an insertion-ordered list of name/value pairs,
//!    seeded at start-up and optionally grown on first reference
//!
//! A name resolves in at most one space; system entries shadow dynamic
//! entries of the same literal name. Every write whose name matches the
//! OSC route prefix is mirrored onto the control protocol as a side
//! effect of [`DataPool::set_value`].
//!
//! Lookups and writes never fail: a missing variable is observably
//! identical to an empty value. This is a deliberate contract of the
//! wire protocol, not an oversight.

mod system;
mod user;

pub use system::{SystemFacts, SystemSpace};
pub use user::{NullUserVars, UserVars};

use tracing::{info, warn};

use crate::osc::OscRoute;

/// Maximal stored length of a value, in bytes.
pub const VALUE_LEN_MAX: usize = 256;

/// One dynamic-space entry.
#[derive(Debug, Clone)]
struct DynamicEntry {
    name: String,
    value: String,
}

/// Construction options for a [`DataPool`].
pub struct PoolOptions {
    /// Prefix routing names to the user-space accessors.
    pub user_prefix: String,
    /// Create dynamic entries on first reference to an unknown name.
    pub on_the_fly_allocation: bool,
    /// Stored value cap; longer values are truncated.
    pub value_len_max: usize,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            user_prefix: "DPU.".to_string(),
            on_the_fly_allocation: false,
            value_len_max: VALUE_LEN_MAX,
        }
    }
}

/// The variable store. One instance per gateway process, owned by the
/// application state; tests build as many as they need.
pub struct DataPool {
    initialized: bool,
    user_prefix: String,
    user: Box<dyn UserVars>,
    system: SystemSpace,
    dynamic: Vec<DynamicEntry>,
    on_the_fly: bool,
    value_len_max: usize,
    route: Option<OscRoute>,
}

impl DataPool {
    pub fn new(
        options: PoolOptions,
        system: SystemSpace,
        user: Box<dyn UserVars>,
        route: Option<OscRoute>,
    ) -> Self {
        Self {
            initialized: false,
            user_prefix: options.user_prefix,
            user,
            system,
            dynamic: Vec::new(),
            on_the_fly: options.on_the_fly_allocation,
            value_len_max: options.value_len_max,
            route,
        }
    }

    /// Seed the dynamic space and arm the pool.
    ///
    /// Seed entries go straight into dynamic space in order, without
    /// address-space resolution; entries matching the OSC prefix are
    /// batched into one wrapped bundle and sent once. Returns the number
    /// of seeded entries. A second call before [`DataPool::teardown`] is
    /// a no-op returning zero.
    pub fn init(&mut self, seed: &[(String, String)]) -> usize {
        if self.initialized {
            return 0;
        }

        let mut count = 0;
        if let Some(route) = self.route.as_mut() {
            route.begin(true);
        }
        for (name, value) in seed {
            let value = clamp(value, self.value_len_max);
            if let Some(route) = self.route.as_mut() {
                if route.matches(name) {
                    route.append(name, &value);
                }
            }
            self.dynamic.push(DynamicEntry { name: name.clone(), value });
            count += 1;
        }
        if let Some(route) = self.route.as_mut() {
            if let Err(e) = route.flush() {
                warn!("seed propagation failed: {e}");
            }
        }

        self.initialized = true;
        self.user.init();
        info!(seeded = count, "datapool initialized");
        count
    }

    /// Resolve a variable to its current value.
    ///
    /// Returns the empty string on a total miss. With on-the-fly
    /// allocation enabled, a miss in dynamic space materializes a new
    /// empty entry as a side effect.
    pub fn get_value(&mut self, name: &str) -> String {
        if !self.initialized {
            return String::new();
        }

        if let Some(tail) = name.strip_prefix(self.user_prefix.as_str()) {
            return self.user.get(tail);
        }

        if let Some(value) = self.system.get(name) {
            return value;
        }

        if let Some(entry) = self.dynamic.iter().find(|e| e.name == name) {
            return entry.value.clone();
        }
        if self.on_the_fly {
            self.dynamic.push(DynamicEntry {
                name: name.to_string(),
                value: String::new(),
            });
        }
        String::new()
    }

    /// Write a variable, then mirror the write onto the OSC route when
    /// the name carries the propagation prefix.
    ///
    /// A write to an unknown dynamic name is silently dropped unless
    /// on-the-fly allocation is enabled; system-space names accept the
    /// write without changing (the table is read-only). The propagation
    /// check is independent of where (or whether) the name resolved, and
    /// a transport failure never rolls the stored value back.
    pub fn set_value(&mut self, name: &str, value: &str) {
        if !self.initialized {
            return;
        }

        if let Some(tail) = name.strip_prefix(self.user_prefix.as_str()) {
            self.user.set(tail, value);
        } else if !self.system.set(name, value) {
            let clamped = clamp(value, self.value_len_max);
            if let Some(entry) = self.dynamic.iter_mut().find(|e| e.name == name) {
                entry.value = clamped;
            } else if self.on_the_fly {
                self.dynamic.push(DynamicEntry {
                    name: name.to_string(),
                    value: clamped,
                });
            }
        }

        if let Some(route) = self.route.as_mut() {
            if route.matches(name) {
                if let Err(e) = route.send_single(name, value) {
                    warn!(variable = name, "propagation failed: {e}");
                }
            }
        }
    }

    /// Periodic driver, called on the order of every 100 ms. Forwards to
    /// the user-space accessors; tolerates irregular cadence.
    pub fn refresh(&mut self) {
        self.user.refresh();
    }

    /// Drop all dynamic entries and let the user-space accessors release
    /// their resources. Safe to call more than once.
    pub fn teardown(&mut self) {
        if !self.initialized {
            return;
        }
        self.user.teardown();
        self.initialized = false;
        self.dynamic.clear();
    }

    /// Number of dynamic-space entries.
    pub fn dynamic_len(&self) -> usize {
        self.dynamic.len()
    }
}

/// Truncate to the value cap without splitting a UTF-8 sequence.
fn clamp(value: &str, max: usize) -> String {
    if value.len() <= max {
        return value.to_string();
    }
    let mut end = max;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    value[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_pool(on_the_fly: bool) -> DataPool {
        let options = PoolOptions {
            on_the_fly_allocation: on_the_fly,
            ..PoolOptions::default()
        };
        let facts = SystemFacts {
            app_name: "gw-test".into(),
            app_version: "0.0.0".into(),
            server_ip: "127.0.0.1".into(),
            server_port: 8080,
            user_prefix: "DPU.".into(),
            osc_host: "localhost".into(),
            osc_port: 3001,
            osc_prefix: String::new(),
        };
        DataPool::new(options, SystemSpace::new(&facts), Box::new(NullUserVars), None)
    }

    #[test]
    fn set_then_get_round_trips() {
        let mut pool = bare_pool(true);
        pool.init(&[]);
        pool.set_value("fader", "0.5");
        assert_eq!(pool.get_value("fader"), "0.5");
    }

    #[test]
    fn seeded_entries_resolve_in_order() {
        let mut pool = bare_pool(false);
        let seeded = pool.init(&[
            ("a".into(), "1".into()),
            ("b".into(), "2".into()),
        ]);
        assert_eq!(seeded, 2);
        assert_eq!(pool.get_value("a"), "1");
        assert_eq!(pool.get_value("b"), "2");
    }

    #[test]
    fn second_init_is_a_noop() {
        let mut pool = bare_pool(false);
        assert_eq!(pool.init(&[("a".into(), "1".into())]), 1);
        assert_eq!(pool.init(&[("b".into(), "2".into())]), 0);
        assert_eq!(pool.get_value("b"), "");
    }

    #[test]
    fn system_space_is_read_only() {
        let mut pool = bare_pool(true);
        pool.init(&[]);
        let before = pool.get_value("APP_NAME");
        assert_eq!(before, "gw-test");
        pool.set_value("APP_NAME", "other");
        assert_eq!(pool.get_value("APP_NAME"), before);
        // the write neither created a dynamic shadow entry
        assert_eq!(pool.dynamic_len(), 0);
    }

    #[test]
    fn system_space_shadows_seeded_dynamic_entry() {
        let mut pool = bare_pool(false);
        pool.init(&[("APP_NAME".into(), "seeded".into())]);
        assert_eq!(pool.get_value("APP_NAME"), "gw-test");
    }

    #[test]
    fn unknown_name_without_allocation_stays_absent() {
        let mut pool = bare_pool(false);
        pool.init(&[]);
        assert_eq!(pool.get_value("ghost"), "");
        assert_eq!(pool.dynamic_len(), 0);
        pool.set_value("ghost", "1");
        assert_eq!(pool.get_value("ghost"), "");
        assert_eq!(pool.dynamic_len(), 0);
    }

    #[test]
    fn unknown_name_with_allocation_materializes_once() {
        let mut pool = bare_pool(true);
        pool.init(&[]);
        assert_eq!(pool.get_value("ghost"), "");
        assert_eq!(pool.dynamic_len(), 1);
        assert_eq!(pool.get_value("ghost"), "");
        assert_eq!(pool.dynamic_len(), 1);
    }

    #[test]
    fn exact_name_match_despite_shared_prefix() {
        let mut pool = bare_pool(true);
        pool.init(&[]);
        pool.set_value("knob", "1");
        pool.set_value("knob2", "2");
        assert_eq!(pool.get_value("knob"), "1");
        assert_eq!(pool.get_value("knob2"), "2");
        assert_eq!(pool.dynamic_len(), 2);
    }

    #[test]
    fn oversized_value_is_clamped() {
        let mut pool = bare_pool(true);
        pool.init(&[]);
        let long = "v".repeat(VALUE_LEN_MAX + 50);
        pool.set_value("big", &long);
        assert_eq!(pool.get_value("big").len(), VALUE_LEN_MAX);
    }

    #[test]
    fn uninitialized_pool_is_inert() {
        let mut pool = bare_pool(true);
        pool.set_value("x", "1");
        assert_eq!(pool.get_value("x"), "");
        assert_eq!(pool.dynamic_len(), 0);
    }

    #[test]
    fn teardown_clears_and_is_idempotent() {
        let mut pool = bare_pool(true);
        pool.init(&[("a".into(), "1".into())]);
        pool.teardown();
        pool.teardown();
        assert_eq!(pool.dynamic_len(), 0);
        // pool can be re-armed after teardown
        assert_eq!(pool.init(&[("b".into(), "2".into())]), 1);
        assert_eq!(pool.get_value("b"), "2");
    }
}
