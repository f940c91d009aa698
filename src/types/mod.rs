// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Domain types: replication intent and per-kind capabilities.

pub mod intent;
pub mod kind;

pub use intent::{ReplicationIntent, ReplicationTarget};
pub use kind::{mirror_origin, ReplicatedKind};
