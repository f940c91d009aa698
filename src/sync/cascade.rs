// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Cascade of broadcast resources into newly created namespaces.

use crate::config::Config;
use crate::constants::annotations;
use crate::error::{ReplizierenError, Result};
use crate::kubernetes::{is_terminating, CachedKind, ClusterView};
use crate::sync::replicator::{upsert, UpsertOutcome};
use crate::types::mirror_origin;
use k8s_openapi::api::core::v1::{ConfigMap, Namespace, Secret};
use kube::{Client, ResourceExt};
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    Terminating,
    Protected,
    /// This incarnation of the namespace was already scanned successfully
    AlreadyCascaded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CascadeOutcome {
    Ignored(IgnoreReason),
    /// Scan finished; `replicated` counts the mirrors now present in the namespace
    Done { replicated: usize },
}

pub struct NamespaceCascade {
    client: Client,
    view: ClusterView,
    config: Config,
    // namespace name -> uid of the incarnation that was scanned
    cascaded: Mutex<HashMap<String, String>>,
}

impl NamespaceCascade {
    pub fn new(client: Client, view: ClusterView, config: Config) -> Self {
        Self {
            client,
            view,
            config,
            cascaded: Mutex::new(HashMap::new()),
        }
    }

    /// Replicate every `replicate-all` Secret and ConfigMap into `namespace`.
    ///
    /// A namespace is scanned once per incarnation; later events for the same
    /// uid are ignored. Failures for single resources are logged and the scan
    /// continues; the first retryable failure is returned once both kinds were
    /// scanned, and the namespace is scanned again on retry.
    #[instrument(skip(self, namespace), fields(namespace = %namespace.name_any()))]
    pub async fn cascade(&self, namespace: &Namespace) -> Result<CascadeOutcome> {
        let name = namespace.name_any();

        if is_terminating(namespace) {
            debug!("Namespace is terminating, ignoring");
            return Ok(CascadeOutcome::Ignored(IgnoreReason::Terminating));
        }

        if self.config.is_protected(&name) {
            debug!("Namespace is protected, ignoring");
            return Ok(CascadeOutcome::Ignored(IgnoreReason::Protected));
        }

        let uid = namespace.uid();
        if uid.is_some() && self.scanned_uid(&name) == uid {
            debug!("Namespace was already scanned, ignoring");
            return Ok(CascadeOutcome::Ignored(IgnoreReason::AlreadyCascaded));
        }

        let mut deferred: Option<ReplizierenError> = None;
        let mut replicated = self.cascade_kind::<Secret>(&name, &mut deferred).await?;
        replicated += self.cascade_kind::<ConfigMap>(&name, &mut deferred).await?;

        if replicated > 0 {
            info!("Replicated {} broadcast resources into namespace {}", replicated, name);
        }

        if let Some(e) = deferred {
            return Err(e);
        }

        if let Some(uid) = uid {
            let live: BTreeSet<String> = self.view.namespace_names().await?.into_iter().collect();
            self.record_scan(&live, name, uid);
        }
        Ok(CascadeOutcome::Done { replicated })
    }

    fn scanned_uid(&self, name: &str) -> Option<String> {
        self.cascaded
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
    }

    // Entries of namespaces that are gone are dropped on every insert.
    fn record_scan(&self, live: &BTreeSet<String>, name: String, uid: String) {
        let mut cascaded = self.cascaded.lock().unwrap_or_else(|e| e.into_inner());
        cascaded.retain(|ns, _| live.contains(ns));
        cascaded.insert(name, uid);
    }

    async fn cascade_kind<K: CachedKind>(
        &self,
        namespace: &str,
        deferred: &mut Option<ReplizierenError>,
    ) -> Result<usize> {
        let sources = self
            .view
            .list_annotated::<K>(annotations::REPLICATE_ALL, "true")
            .await?;

        let mut replicated = 0;
        for source in sources
            .iter()
            .filter(|s| mirror_origin::<K>(s).is_none())
            .filter(|s| s.namespace().as_deref() != Some(namespace))
        {
            let source_ref = format!("{}/{}", source.namespace().unwrap_or_default(), source.name_any());
            match upsert::<K>(&self.client, source, namespace).await {
                Ok(UpsertOutcome::OtherSource) => {}
                Ok(_) => replicated += 1,
                Err(e) if !e.is_retryable() => {
                    warn!("Skipping {} {} for namespace {}: {}", K::LABEL, source_ref, namespace, e);
                }
                Err(e) => {
                    error!("Failed to replicate {} {} to namespace {}: {}", K::LABEL, source_ref, namespace, e);
                    deferred.get_or_insert(e);
                }
            }
        }

        Ok(replicated)
    }
}
