// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Kubernetes annotation keys read from source Secrets and ConfigMaps
pub mod annotations {
    /// Comma separated target namespaces, or "true" (all) / "false" (skip)
    pub const REPLICATE: &str = "replizieren.dev/replicate";
    /// When "true", replicate to every namespace and ignore REPLICATE
    pub const REPLICATE_ALL: &str = "replizieren.dev/replicate-all";
    /// When "true", restart workloads using the resource after replication
    pub const ROLLOUT_ON_UPDATE: &str = "replizieren.dev/rollout-on-update";
    /// Set on every mirror, holds the namespace of its source
    pub const REPLICATED_FROM: &str = "replizieren.dev/replicated-from";
}

/// Pod template annotation keys written to force a rolling restart
pub mod restart {
    pub const SECRET: &str = "secret.restartedAt";
    pub const CONFIG_MAP: &str = "configmap.restartedAt";
}

/// The operator name used as field manager for all writes
pub const OPERATOR_NAME: &str = "replizieren";

/// System namespaces that never receive a synthesized mirror
pub const DEFAULT_PROTECTED_NAMESPACES: &[&str] = &["kube-system", "kube-public", "kube-node-lease"];

/// Requeue configuration for failed reconciliations
pub mod requeue {
    /// Initial delay in milliseconds after the first failure
    pub const BASE_DELAY_MS: u64 = 5;
    /// Maximum delay in seconds (exponential backoff cap)
    pub const MAX_DELAY_SECS: u64 = 1000;
}
