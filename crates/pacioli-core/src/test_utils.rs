//! Shared helpers for unit tests
//!
//! Integration tests keep their own fixtures in tests/common/mod.rs since
//! this module only exists under cfg(test).

use once_cell::sync::Lazy;
use std::env;

// Serializes environment variable changes across tests
pub static ENV_MUTEX: Lazy<tokio::sync::Mutex<()>> = Lazy::new(|| tokio::sync::Mutex::new(()));

/// Restores modified environment variables on drop
pub struct EnvVarGuard {
    vars: Vec<(String, Option<String>)>,
}

impl EnvVarGuard {
    pub fn new() -> Self {
        Self { vars: Vec::new() }
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.vars.push((key.to_string(), env::var(key).ok()));
        // env::set_var is unsafe since edition 2024
        unsafe {
            env::set_var(key, value);
        }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        for (key, value) in self.vars.iter().rev() {
            unsafe {
                match value {
                    Some(v) => env::set_var(key, v),
                    None => env::remove_var(key),
                }
            }
        }
    }
}

impl Default for EnvVarGuard {
    fn default() -> Self {
        Self::new()
    }
}
