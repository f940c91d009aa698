// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes reconcilers that react to watch events.

pub mod backoff;
pub mod namespace;
pub mod source;

pub use namespace::NamespaceReconciler;
pub use source::{ConfigMapReconciler, SecretReconciler, SourceReconciler};
