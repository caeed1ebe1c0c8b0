//! User address space: pluggable accessors supplied by the embedder
//!
//! Names carrying the user prefix are routed here with the prefix
//! already stripped; the implementation dispatches on the tail name.
//! The gateway binary registers its own implementation (see the demo
//! variables there); embedders integrating the gateway directly plug in
//! whatever reads their hardware.

/// Accessor set behind the user prefix.
///
/// `get` and `set` receive the prefix-stripped variable name. An
/// unknown tail name yields an empty value and a dropped write — user
/// space claims every prefixed name, so neither falls through to the
/// other address spaces.
pub trait UserVars: Send {
    /// Called once when the owning pool is initialized.
    fn init(&mut self) {}

    fn get(&mut self, name: &str) -> String;

    fn set(&mut self, name: &str, value: &str);

    /// Periodic hook, roughly every 100 ms; must not block.
    fn refresh(&mut self) {}

    /// Called on pool teardown to release accessor resources.
    fn teardown(&mut self) {}
}

/// Accessor set with no variables: every get is empty, every set is
/// dropped. Useful as a placeholder and in tests.
pub struct NullUserVars;

impl UserVars for NullUserVars {
    fn get(&mut self, _name: &str) -> String {
        String::new()
    }

    fn set(&mut self, _name: &str, _value: &str) {}
}
