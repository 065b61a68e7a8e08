//! # Diagnostic flags.
//!
//! [`Diag`] keeps a service's diagnostic flag set with the wall-clock time of
//! each flag's last transition. Purely observational: the engine flips a flag
//! per lifecycle state, and service code may set its own (e.g. while waiting
//! on an upstream) so operators can see where a service is spending time.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::SystemTime;

#[derive(Default)]
struct DiagInner {
    flags: HashMap<String, bool>,
    last_transition: HashMap<String, SystemTime>,
}

/// Per-service diagnostic flag set.
#[derive(Default)]
pub struct Diag {
    inner: Mutex<DiagInner>,
}

impl Diag {
    /// Raises a flag and stamps the transition.
    pub fn set_flag(&self, flag: impl Into<String>) {
        self.record(flag.into(), true);
    }

    /// Lowers a flag and stamps the transition.
    pub fn unset_flag(&self, flag: impl Into<String>) {
        self.record(flag.into(), false);
    }

    /// Returns the currently raised flags, sorted.
    pub fn flags(&self) -> Vec<String> {
        match self.inner.lock() {
            Ok(inner) => {
                let mut raised: Vec<String> = inner
                    .flags
                    .iter()
                    .filter(|(_, up)| **up)
                    .map(|(name, _)| name.clone())
                    .collect();
                raised.sort_unstable();
                raised
            }
            Err(_) => Vec::new(),
        }
    }

    /// Returns when the flag last changed, if it ever did.
    pub fn last_transition(&self, flag: &str) -> Option<SystemTime> {
        self.inner
            .lock()
            .ok()
            .and_then(|inner| inner.last_transition.get(flag).copied())
    }

    /// Drops all flags (lifecycle reset).
    pub(crate) fn reset(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.flags.clear();
            inner.last_transition.clear();
        }
    }

    fn record(&self, flag: String, up: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            let prev = inner.flags.insert(flag.clone(), up);
            if prev != Some(up) {
                inner.last_transition.insert(flag, SystemTime::now());
            }
        }
    }
}
