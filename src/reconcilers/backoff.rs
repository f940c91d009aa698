// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Per-object exponential requeue delay for failed reconciliations.

use kube::runtime::controller;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Backoff key of an object: `namespace/name`, or just `name` when cluster scoped
pub fn object_key(namespace: Option<&str>, name: &str) -> String {
    match namespace {
        Some(ns) => format!("{}/{}", ns, name),
        None => name.to_string(),
    }
}

pub struct RequeueBackoff {
    base: Duration,
    max: Duration,
    failures: Mutex<HashMap<String, u32>>,
}

impl RequeueBackoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Record a failure for `key` and return the delay before the next attempt.
    /// The delay doubles with every consecutive failure, capped at the maximum.
    pub fn next_delay(&self, key: &str) -> Duration {
        let mut failures = self.failures.lock().unwrap_or_else(|e| e.into_inner());
        let count = failures.entry(key.to_string()).or_insert(0);
        let exponent = (*count).min(31);
        *count = count.saturating_add(1);

        self.base
            .checked_mul(1u32 << exponent)
            .map_or(self.max, |delay| delay.min(self.max))
    }

    /// Forget the failures of `key` after a successful reconciliation
    pub fn reset(&self, key: &str) {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
    }

    /// Forget an object the controller found gone when its requeue fired.
    /// Objects that fail and are then deleted only ever surface this way.
    pub fn forget_missing<R, Q>(&self, error: &controller::Error<R, Q>)
    where
        R: std::error::Error + 'static,
        Q: std::error::Error + 'static,
    {
        if let controller::Error::ObjectNotFound(obj_ref) = error {
            self.reset(&object_key(obj_ref.namespace.as_deref(), &obj_ref.name));
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.failures.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
