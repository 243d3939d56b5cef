//! Per-instance memoization of derivative functionals
//!
//! Every functional owns a [`DerivativeCache`] mapping `(parameter, index)` to the
//! derivative computed for that direction. Repeated requests return the same shared
//! [`Functional`], which keeps Hessian assembly from rebuilding or reparsing subtrees.

use crate::error::Result;
use crate::functionals::Functional;
use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};

/// Thread-safe cache of derivative functionals keyed by `(parameter, index)`
///
/// On a miss the derivative is computed without holding the lock. If two threads
/// race on the same key, the first insertion wins and both receive it.
#[derive(Default)]
pub struct DerivativeCache {
    entries: RwLock<HashMap<String, HashMap<usize, Functional>>>,
}

impl DerivativeCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a previously computed derivative
    pub fn get(&self, parameter: &str, index: usize) -> Option<Functional> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(parameter)
            .and_then(|by_index| by_index.get(&index))
            .cloned()
    }

    /// Return the cached derivative, computing and storing it on a miss
    ///
    /// Errors from `compute` are returned and nothing is stored.
    pub fn get_or_try_insert_with<F>(&self, parameter: &str, index: usize, compute: F) -> Result<Functional>
    where
        F: FnOnce() -> Result<Functional>,
    {
        if let Some(derivative) = self.get(parameter, index) {
            log::trace!("derivative cache hit for ({}, {})", parameter, index);
            return Ok(derivative);
        }

        log::trace!("derivative cache miss for ({}, {})", parameter, index);
        let derivative = compute()?;

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let stored = entries
            .entry(parameter.to_string())
            .or_default()
            .entry(index)
            .or_insert(derivative);
        Ok(stored.clone())
    }

    /// Number of cached derivatives
    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.values().map(HashMap::len).sum()
    }

    /// Whether nothing has been cached yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for DerivativeCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivativeCache")
            .field("len", &self.len())
            .finish()
    }
}
