// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Replication of a single source resource to its resolved target namespaces.

use crate::config::Config;
use crate::error::{ReplizierenError, Result};
use crate::kubernetes::ClusterView;
use crate::sync::intent::resolve_intent;
use crate::sync::replicator::{upsert, UpsertOutcome};
use crate::sync::rollout::trigger_rollout;
use crate::types::{mirror_origin, ReplicatedKind, ReplicationTarget};
use kube::{Client, ResourceExt};
use std::collections::BTreeSet;
use std::marker::PhantomData;
use tracing::{debug, error, info, instrument, warn};

/// Summary of one reconciliation of a source resource
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReplicationReport {
    /// Target namespaces whose mirror now matches the source
    pub replicated: BTreeSet<String>,
    /// The subset of `replicated` where a mirror was created or rewritten
    pub changed: BTreeSet<String>,
    /// Target namespaces skipped because they are missing, not accessible,
    /// rejected the mirror or hold another source
    pub skipped: BTreeSet<String>,
    /// Deployments patched to roll out the change
    pub restarted: usize,
}

/// Orchestrates intent resolution, replication and rollout for one resource kind
pub struct ReplicationController<K> {
    client: Client,
    view: ClusterView,
    config: Config,
    _kind: PhantomData<fn() -> K>,
}

impl<K: ReplicatedKind> ReplicationController<K> {
    pub fn new(client: Client, view: ClusterView, config: Config) -> Self {
        Self {
            client,
            view,
            config,
            _kind: PhantomData,
        }
    }

    /// Replicate `source` to every namespace its annotations resolve to, then
    /// roll out dependent workloads if requested and some mirror changed.
    ///
    /// Mirrors are never treated as sources. Every target is attempted even if
    /// earlier ones fail. Missing, forbidden or rejected targets are skipped; any
    /// other failure is returned after all targets and rollouts were processed so
    /// the caller can retry.
    #[instrument(
        skip(self, source),
        fields(kind = K::LABEL, source = %format!("{}/{}", source.namespace().unwrap_or_default(), source.name_any()))
    )]
    pub async fn reconcile(&self, source: &K) -> Result<ReplicationReport> {
        let name = source.name_any();
        let Some(namespace) = source.namespace() else {
            return Err(ReplizierenError::InvalidResource(format!(
                "{} {} has no namespace",
                K::LABEL,
                name
            )));
        };
        let mut report = ReplicationReport::default();

        if let Some(origin) = mirror_origin(source) {
            debug!("Mirror of {}/{}, skipping", origin, name);
            return Ok(report);
        }

        let intent = resolve_intent(source.annotations(), &namespace);
        if intent.skip_replication() {
            debug!("Replication not configured, skipping");
            return Ok(report);
        }

        let targets = self.resolve_targets(&intent.target, &namespace).await?;
        info!("Replicating {} {}/{} to {} namespaces", K::LABEL, namespace, name, targets.len());

        let mut deferred: Option<ReplizierenError> = None;

        for target in &targets {
            match upsert(&self.client, source, target).await {
                Ok(UpsertOutcome::OtherSource) => {
                    report.skipped.insert(target.clone());
                }
                Ok(outcome) => {
                    if outcome.changed() {
                        report.changed.insert(target.clone());
                    } else {
                        debug!("Mirror in {} already up to date", target);
                    }
                    report.replicated.insert(target.clone());
                }
                Err(e) if e.is_not_found() => {
                    warn!("Target namespace {} does not exist, skipping", target);
                    report.skipped.insert(target.clone());
                }
                Err(e) if e.is_forbidden() => {
                    warn!("Not allowed to replicate into {}, skipping: {}", target, e);
                    report.skipped.insert(target.clone());
                }
                Err(e) if e.is_invalid() => {
                    error!("Mirror of {} {}/{} rejected in {}, not retrying: {}", K::LABEL, namespace, name, target, e);
                    report.skipped.insert(target.clone());
                }
                Err(e) => {
                    error!("Failed to replicate {} {}/{} to {}: {}", K::LABEL, namespace, name, target, e);
                    deferred.get_or_insert(e);
                }
            }
        }

        if intent.rollout_on_update && !report.changed.is_empty() {
            let rollout_namespaces = std::iter::once(&namespace).chain(report.changed.iter());
            for ns in rollout_namespaces {
                match trigger_rollout::<K>(&self.client, ns, &name).await {
                    Ok(count) => report.restarted += count,
                    Err(e) => warn!("Failed to roll out workloads in {}: {}", ns, e),
                }
            }
        } else if intent.rollout_on_update {
            debug!("No mirror changed, skipping rollout");
        }

        match deferred {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }

    /// The concrete namespaces a target resolves to, never including the source
    /// namespace. `All` also leaves out protected namespaces.
    async fn resolve_targets(&self, target: &ReplicationTarget, source_namespace: &str) -> Result<BTreeSet<String>> {
        match target {
            ReplicationTarget::Skip => Ok(BTreeSet::new()),
            ReplicationTarget::Specific(namespaces) => Ok(namespaces.clone()),
            ReplicationTarget::All => Ok(self
                .view
                .namespace_names()
                .await?
                .into_iter()
                .filter(|ns| ns != source_namespace && !self.config.is_protected(ns))
                .collect()),
        }
    }
}
