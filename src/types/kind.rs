// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Per-kind capabilities shared by the Secret and ConfigMap replication paths.

use crate::constants::{annotations, restart};
use k8s_openapi::api::core::v1::{ConfigMap, Container, PodSpec, Secret};
use k8s_openapi::NamespaceResourceScope;
use kube::api::ObjectMeta;
use kube::Resource;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;

/// A namespaced key/value resource that can be mirrored across namespaces
pub trait ReplicatedKind:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// Lowercase kind name used in log messages
    const LABEL: &'static str;

    /// Pod template annotation bumped to restart workloads using this kind
    const RESTART_ANNOTATION: &'static str;

    /// Copy content and metadata into a fresh object for `target_namespace`.
    /// Identity fields (uid, resourceVersion, ownerReferences, ...) are left empty
    /// and the mirror is marked with the namespace it was copied from.
    fn build_mirror(&self, target_namespace: &str) -> Self;

    /// Whether both objects carry the same replicated content and metadata
    fn same_content(&self, other: &Self) -> bool;

    /// Whether `existing` can only take this object's content by being recreated,
    /// because a field that differs is immutable on the API server
    fn needs_recreate(&self, _existing: &Self) -> bool {
        false
    }

    /// Whether a pod spec mounts or env-imports the resource called `name`
    fn is_referenced_by(pod_spec: &PodSpec, name: &str) -> bool;
}

/// The source namespace of a mirror, `None` for objects this operator did not create
pub fn mirror_origin<K: Resource>(obj: &K) -> Option<&str> {
    obj.meta()
        .annotations
        .as_ref()
        .and_then(|a| a.get(annotations::REPLICATED_FROM))
        .map(String::as_str)
}

fn mirror_metadata(source: &ObjectMeta, target_namespace: &str) -> ObjectMeta {
    let mut mirror_annotations = source.annotations.clone().unwrap_or_default();
    mirror_annotations.insert(
        annotations::REPLICATED_FROM.to_string(),
        source.namespace.clone().unwrap_or_default(),
    );

    ObjectMeta {
        name: source.name.clone(),
        namespace: Some(target_namespace.to_string()),
        labels: source.labels.clone(),
        annotations: Some(mirror_annotations),
        ..Default::default()
    }
}

// The API server drops empty maps, so None and Some({}) are the same content.
fn same_map<V: PartialEq>(a: &Option<BTreeMap<String, V>>, b: &Option<BTreeMap<String, V>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a == b,
        (Some(m), None) | (None, Some(m)) => m.is_empty(),
        (None, None) => true,
    }
}

fn same_metadata(a: &ObjectMeta, b: &ObjectMeta) -> bool {
    same_map(&a.labels, &b.labels) && same_map(&a.annotations, &b.annotations)
}

fn secret_type(secret: &Secret) -> &str {
    secret.type_.as_deref().unwrap_or("Opaque")
}

fn all_containers(pod_spec: &PodSpec) -> impl Iterator<Item = &Container> {
    pod_spec
        .containers
        .iter()
        .chain(pod_spec.init_containers.iter().flatten())
}

impl ReplicatedKind for Secret {
    const LABEL: &'static str = "secret";
    const RESTART_ANNOTATION: &'static str = restart::SECRET;

    fn build_mirror(&self, target_namespace: &str) -> Self {
        Secret {
            metadata: mirror_metadata(&self.metadata, target_namespace),
            data: self.data.clone(),
            type_: self.type_.clone(),
            ..Default::default()
        }
    }

    fn same_content(&self, other: &Self) -> bool {
        same_metadata(&self.metadata, &other.metadata)
            && same_map(&self.data, &other.data)
            && secret_type(self) == secret_type(other)
    }

    fn needs_recreate(&self, existing: &Self) -> bool {
        secret_type(self) != secret_type(existing)
    }

    fn is_referenced_by(pod_spec: &PodSpec, name: &str) -> bool {
        let in_volumes = pod_spec.volumes.iter().flatten().any(|volume| {
            volume
                .secret
                .as_ref()
                .and_then(|s| s.secret_name.as_deref())
                == Some(name)
        });

        in_volumes
            || all_containers(pod_spec).any(|container| {
                container
                    .env_from
                    .iter()
                    .flatten()
                    .any(|source| source.secret_ref.as_ref().is_some_and(|r| r.name == name))
            })
    }
}

impl ReplicatedKind for ConfigMap {
    const LABEL: &'static str = "configmap";
    const RESTART_ANNOTATION: &'static str = restart::CONFIG_MAP;

    fn build_mirror(&self, target_namespace: &str) -> Self {
        ConfigMap {
            metadata: mirror_metadata(&self.metadata, target_namespace),
            data: self.data.clone(),
            binary_data: self.binary_data.clone(),
            ..Default::default()
        }
    }

    fn same_content(&self, other: &Self) -> bool {
        same_metadata(&self.metadata, &other.metadata)
            && same_map(&self.data, &other.data)
            && same_map(&self.binary_data, &other.binary_data)
    }

    fn is_referenced_by(pod_spec: &PodSpec, name: &str) -> bool {
        let in_volumes = pod_spec.volumes.iter().flatten().any(|volume| {
            volume
                .config_map
                .as_ref()
                .is_some_and(|cm| cm.name == name)
        });

        in_volumes
            || all_containers(pod_spec).any(|container| {
                container
                    .env_from
                    .iter()
                    .flatten()
                    .any(|source| source.config_map_ref.as_ref().is_some_and(|r| r.name == name))
            })
    }
}
