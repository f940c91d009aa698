// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Replication engine: intent resolution, mirroring, rollout and namespace cascade.

pub mod cascade;
pub mod controller;
pub mod intent;
pub mod replicator;
pub mod rollout;

pub use cascade::{CascadeOutcome, IgnoreReason, NamespaceCascade};
pub use controller::{ReplicationController, ReplicationReport};
pub use intent::resolve_intent;
pub use replicator::{upsert, UpsertOutcome};
pub use rollout::{trigger_rollout, uses_resource};
