// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes utilities for cached cluster-wide queries and namespace lifecycle.

pub mod cluster_view;
pub mod namespaces;

pub use cluster_view::{CachedKind, ClusterCache, ClusterView};
pub use namespaces::is_terminating;
