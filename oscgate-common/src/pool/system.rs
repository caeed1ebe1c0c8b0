//! System address space: a closed table of gateway facts
//!
//! Every entry is either a constant string or a zero-argument getter.
//! The table carries setter slots for shape parity with the other
//! spaces, but none of the current entries is writable: a `set` against
//! a system name is claimed (so it never falls through to dynamic
//! space) and discarded.

/// Snapshot of the gateway facts the system table exposes.
#[derive(Debug, Clone)]
pub struct SystemFacts {
    pub app_name: String,
    pub app_version: String,
    pub server_ip: String,
    pub server_port: u16,
    pub user_prefix: String,
    pub osc_host: String,
    pub osc_port: u16,
    pub osc_prefix: String,
}

enum SystemValue {
    Const(String),
    Get(Box<dyn Fn() -> String + Send>),
}

type Setter = Box<dyn FnMut(&str) + Send>;

struct SystemEntry {
    name: &'static str,
    value: SystemValue,
    set: Option<Setter>,
}

/// The closed system-variable table.
pub struct SystemSpace {
    entries: Vec<SystemEntry>,
}

impl SystemSpace {
    pub fn new(facts: &SystemFacts) -> Self {
        let server_port = facts.server_port;
        let osc_port = facts.osc_port;
        let entries = vec![
            SystemEntry {
                name: "APP_NAME",
                value: SystemValue::Const(facts.app_name.clone()),
                set: None,
            },
            SystemEntry {
                name: "APP_VERSION",
                value: SystemValue::Const(facts.app_version.clone()),
                set: None,
            },
            SystemEntry {
                name: "SERVER_IP",
                value: SystemValue::Const(facts.server_ip.clone()),
                set: None,
            },
            SystemEntry {
                name: "SERVER_PORT",
                value: SystemValue::Get(Box::new(move || server_port.to_string())),
                set: None,
            },
            SystemEntry {
                name: "USER_PREFIX",
                value: SystemValue::Const(facts.user_prefix.clone()),
                set: None,
            },
            SystemEntry {
                name: "OSC_HOST",
                value: SystemValue::Const(facts.osc_host.clone()),
                set: None,
            },
            SystemEntry {
                name: "OSC_PORT",
                value: SystemValue::Get(Box::new(move || osc_port.to_string())),
                set: None,
            },
            SystemEntry {
                name: "OSC_PREFIX",
                value: SystemValue::Const(facts.osc_prefix.clone()),
                set: None,
            },
        ];
        Self { entries }
    }

    /// Exact-name lookup; `None` when the name is not a system variable.
    pub fn get(&self, name: &str) -> Option<String> {
        self.entries.iter().find(|e| e.name == name).map(|e| match &e.value {
            SystemValue::Const(v) => v.clone(),
            SystemValue::Get(f) => f(),
        })
    }

    /// Returns true when the name belongs to the system table, whether
    /// or not the entry accepted the write.
    pub fn set(&mut self, name: &str, value: &str) -> bool {
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(entry) => {
                if let Some(set) = entry.set.as_mut() {
                    set(value);
                }
                true
            }
            None => false,
        }
    }
}
