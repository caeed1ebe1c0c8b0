//! Demo user-space variables
//!
//! Sample accessor set behind the user prefix, the place an embedder
//! wires in hardware-backed values (potentiometers, displays, ...).
//! Ships with two demo variables: `myIntVar`, a counter bumped every
//! tenth refresh tick, and `myStrVar`, a plain writable string slot.

use oscgate_common::pool::UserVars;

pub struct DemoVars {
    my_int_var: i32,
    my_str_var: String,
    ticks: u32,
}

impl DemoVars {
    pub fn new() -> Self {
        Self {
            my_int_var: 0,
            my_str_var: String::new(),
            ticks: 0,
        }
    }
}

impl Default for DemoVars {
    fn default() -> Self {
        Self::new()
    }
}

impl UserVars for DemoVars {
    fn init(&mut self) {
        self.my_int_var = 0;
        self.my_str_var = "String variable".to_string();
    }

    fn get(&mut self, name: &str) -> String {
        match name {
            "myIntVar" => self.my_int_var.to_string(),
            "myStrVar" => self.my_str_var.clone(),
            _ => String::new(),
        }
    }

    fn set(&mut self, name: &str, value: &str) {
        match name {
            "myIntVar" => self.my_int_var = value.parse().unwrap_or(0),
            "myStrVar" => self.my_str_var = value.to_string(),
            _ => {}
        }
    }

    fn refresh(&mut self) {
        self.ticks = self.ticks.wrapping_add(1);
        if self.ticks % 10 == 0 {
            self.my_int_var += 1;
        }
    }
}
