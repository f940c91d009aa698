// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Read-only, cluster-wide queries used to resolve "all namespaces" targets
//! and to find broadcast resources. Answers come from reflector stores kept
//! current by [`ClusterCache`], never from direct LIST calls.

use crate::error::{ReplizierenError, Result};
use crate::kubernetes::namespaces::is_terminating;
use crate::types::ReplicatedKind;
use futures::StreamExt;
use k8s_openapi::api::core::v1::{ConfigMap, Namespace, Secret};
use kube::{
    runtime::{
        reflector::{self, store::Writer, Store},
        watcher, WatchStreamExt,
    },
    Api, Client, Resource, ResourceExt,
};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

#[derive(Clone)]
pub struct ClusterView {
    namespaces: Store<Namespace>,
    secrets: Store<Secret>,
    config_maps: Store<ConfigMap>,
}

/// A replicated kind with a cache in [`ClusterView`]
pub trait CachedKind: ReplicatedKind {
    fn store(view: &ClusterView) -> &Store<Self>;
}

impl CachedKind for Secret {
    fn store(view: &ClusterView) -> &Store<Self> {
        &view.secrets
    }
}

impl CachedKind for ConfigMap {
    fn store(view: &ClusterView) -> &Store<Self> {
        &view.config_maps
    }
}

/// The watchers feeding a [`ClusterView`]
pub struct ClusterCache {
    client: Client,
    namespaces: Writer<Namespace>,
    secrets: Writer<Secret>,
    config_maps: Writer<ConfigMap>,
}

impl ClusterView {
    pub fn new(namespaces: Store<Namespace>, secrets: Store<Secret>, config_maps: Store<ConfigMap>) -> Self {
        Self {
            namespaces,
            secrets,
            config_maps,
        }
    }

    /// A view backed by empty stores, plus the cache that fills them once run
    pub fn cached(client: Client) -> (Self, ClusterCache) {
        let (namespaces, namespace_writer) = reflector::store::<Namespace>();
        let (secrets, secret_writer) = reflector::store::<Secret>();
        let (config_maps, config_map_writer) = reflector::store::<ConfigMap>();

        let cache = ClusterCache {
            client,
            namespaces: namespace_writer,
            secrets: secret_writer,
            config_maps: config_map_writer,
        };
        (Self::new(namespaces, secrets, config_maps), cache)
    }

    /// Names of all namespaces that are not terminating
    #[instrument(skip(self))]
    pub async fn namespace_names(&self) -> Result<Vec<String>> {
        ready(&self.namespaces, "namespaces").await?;

        let names: Vec<String> = self
            .namespaces
            .state()
            .iter()
            .filter(|ns| !is_terminating(ns))
            .map(|ns| ns.name_any())
            .collect();

        debug!("Found {} active namespaces", names.len());
        Ok(names)
    }

    /// All resources of kind `K`, cluster-wide, whose annotation `key` equals `value`
    #[instrument(skip(self), fields(kind = K::LABEL))]
    pub async fn list_annotated<K: CachedKind>(&self, key: &str, value: &str) -> Result<Vec<Arc<K>>> {
        let store = K::store(self);
        ready(store, K::LABEL).await?;

        Ok(store
            .state()
            .into_iter()
            .filter(|obj| obj.annotations().get(key).is_some_and(|v| v == value))
            .collect())
    }
}

async fn ready<K>(store: &Store<K>, what: &str) -> Result<()>
where
    K: Resource + Clone + 'static,
    K::DynamicType: Eq + Hash + Clone,
{
    store
        .wait_until_ready()
        .await
        .map_err(|_| ReplizierenError::CacheUnavailable(what.to_string()))
}

impl ClusterCache {
    /// Watch namespaces, secrets and config maps until the process exits
    pub async fn run(self) {
        tokio::join!(
            reflect(Api::<Namespace>::all(self.client.clone()), self.namespaces),
            reflect(Api::<Secret>::all(self.client.clone()), self.secrets),
            reflect(Api::<ConfigMap>::all(self.client), self.config_maps),
        );
    }
}

async fn reflect<K>(api: Api<K>, writer: Writer<K>)
where
    K: Resource + Clone + Debug + DeserializeOwned + Send + Sync + 'static,
    K::DynamicType: Eq + Hash + Clone + Default,
{
    let kind = K::kind(&K::DynamicType::default()).to_string();

    watcher(api, watcher::Config::default())
        .reflect(writer)
        .applied_objects()
        .default_backoff()
        .for_each(|res| {
            let kind = kind.clone();
            async move {
                if let Err(e) = res {
                    warn!("{} cache watch error: {}", kind, e);
                }
            }
        })
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::annotations;
    use crate::test_utils::{namespace, secret_with_annotations, store_with, view_with};
    use k8s_openapi::api::core::v1::NamespaceStatus;

    #[tokio::test]
    async fn test_namespace_names_skips_terminating() {
        let mut terminating = namespace("old-team");
        terminating.status = Some(NamespaceStatus {
            phase: Some("Terminating".to_string()),
            ..Default::default()
        });
        let view = ClusterView::new(
            store_with(vec![namespace("team-a"), terminating]),
            store_with(vec![]),
            store_with(vec![]),
        );

        let names = view.namespace_names().await.unwrap();
        assert_eq!(names, vec!["team-a".to_string()]);
    }

    #[tokio::test]
    async fn test_list_annotated_filters_on_value() {
        let view = view_with(
            &["ns-a", "ns-b"],
            vec![
                secret_with_annotations("ns-a", "shared", &[(annotations::REPLICATE_ALL, "true")]),
                secret_with_annotations("ns-a", "private", &[(annotations::REPLICATE_ALL, "false")]),
                secret_with_annotations("ns-b", "plain", &[]),
            ],
            vec![],
        );

        let found = view
            .list_annotated::<Secret>(annotations::REPLICATE_ALL, "true")
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name_any(), "shared");
    }

    #[tokio::test]
    async fn test_dropped_cache_is_reported() {
        let (namespaces, writer) = reflector::store::<Namespace>();
        drop(writer);
        let view = ClusterView::new(namespaces, store_with(vec![]), store_with(vec![]));

        let err = view.namespace_names().await.unwrap_err();
        assert!(matches!(err, ReplizierenError::CacheUnavailable(_)));
        assert!(err.is_retryable());
    }
}
