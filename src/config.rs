// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::{requeue, DEFAULT_PROTECTED_NAMESPACES};
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::env;
use std::time::Duration;

/// Operator configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Namespaces that are never synthesized as replication targets
    pub protected_namespaces: BTreeSet<String>,
    /// Delay before the first retry of a failed reconciliation
    pub requeue_base_delay: Duration,
    /// Upper bound for the retry delay
    pub requeue_max_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            protected_namespaces: DEFAULT_PROTECTED_NAMESPACES
                .iter()
                .map(|ns| ns.to_string())
                .collect(),
            requeue_base_delay: Duration::from_millis(requeue::BASE_DELAY_MS),
            requeue_max_delay: Duration::from_secs(requeue::MAX_DELAY_SECS),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Config::default();

        if let Some(list) = lookup("PROTECTED_NAMESPACES") {
            config.protected_namespaces = parse_namespace_list(&list);
        }

        if let Some(ms) = lookup("REQUEUE_BASE_DELAY_MS") {
            let ms: u64 = ms
                .trim()
                .parse()
                .context("REQUEUE_BASE_DELAY_MS must be a whole number of milliseconds")?;
            config.requeue_base_delay = Duration::from_millis(ms);
        }

        if let Some(secs) = lookup("REQUEUE_MAX_DELAY_SECS") {
            let secs: u64 = secs
                .trim()
                .parse()
                .context("REQUEUE_MAX_DELAY_SECS must be a whole number of seconds")?;
            config.requeue_max_delay = Duration::from_secs(secs);
        }

        anyhow::ensure!(
            config.requeue_base_delay <= config.requeue_max_delay,
            "REQUEUE_BASE_DELAY_MS must not exceed REQUEUE_MAX_DELAY_SECS"
        );

        Ok(config)
    }

    /// Check if a namespace is in the protected set
    pub fn is_protected(&self, namespace: &str) -> bool {
        self.protected_namespaces.contains(namespace)
    }
}

fn parse_namespace_list(list: &str) -> BTreeSet<String> {
    list.split(',')
        .map(str::trim)
        .filter(|ns| !ns.is_empty())
        .map(str::to_string)
        .collect()
}
