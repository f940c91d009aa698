// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Replication intent derived from a source resource's annotations.

use std::collections::BTreeSet;

/// Where a source resource should be mirrored to
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReplicationTarget {
    /// No replication configured, or explicitly disabled
    #[default]
    Skip,
    /// A static set of namespaces, never containing the source namespace
    Specific(BTreeSet<String>),
    /// Every non-protected namespace except the source namespace
    All,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReplicationIntent {
    pub target: ReplicationTarget,
    pub rollout_on_update: bool,
}

impl ReplicationIntent {
    /// The static target namespaces; empty unless the target is `Specific`
    pub fn target_namespaces(&self) -> BTreeSet<String> {
        match &self.target {
            ReplicationTarget::Specific(namespaces) => namespaces.clone(),
            ReplicationTarget::Skip | ReplicationTarget::All => BTreeSet::new(),
        }
    }

    pub fn replicate_all(&self) -> bool {
        matches!(self.target, ReplicationTarget::All)
    }

    pub fn skip_replication(&self) -> bool {
        matches!(self.target, ReplicationTarget::Skip)
    }
}
