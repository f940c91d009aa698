// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Idempotent create-or-update of a mirror in a target namespace

use crate::constants::OPERATOR_NAME;
use crate::error::{ReplizierenError, Result};
use crate::sync::intent::resolve_intent;
use crate::types::{mirror_origin, ReplicatedKind};
use kube::{
    api::{DeleteParams, PostParams, Preconditions},
    Api, Client, ResourceExt,
};
use tracing::{debug, info, instrument, warn};

/// What an upsert did to the target namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
    /// The mirror already carried the source's content, nothing was written
    Unchanged,
    /// The target holds a replication source of its own or a mirror of another
    /// namespace; it was left untouched
    OtherSource,
}

impl UpsertOutcome {
    /// Whether the target namespace now holds content it did not hold before
    pub fn changed(self) -> bool {
        matches!(self, UpsertOutcome::Created | UpsertOutcome::Updated)
    }
}

/// Copy `source` into `target_namespace`, creating the mirror or updating it in place.
///
/// Only mirrors of the same source namespace and plain objects without a
/// replication intent are overwritten. On update the existing object's identity
/// (uid, resourceVersion, creation timestamp, owner references, finalizers) is
/// carried into the new payload, so a concurrent modification is rejected with a
/// conflict instead of being lost. A change to an immutable field deletes and
/// recreates the mirror.
#[instrument(
    skip(client, source),
    fields(
        kind = K::LABEL,
        source = %format!("{}/{}", source.namespace().unwrap_or_default(), source.name_any())
    )
)]
pub async fn upsert<K: ReplicatedKind>(
    client: &Client,
    source: &K,
    target_namespace: &str,
) -> Result<UpsertOutcome> {
    let name = source
        .meta()
        .name
        .clone()
        .ok_or_else(|| ReplizierenError::InvalidResource(format!("{} without a name", K::LABEL)))?;
    let source_namespace = source.namespace().unwrap_or_default();
    let api: Api<K> = Api::namespaced(client.clone(), target_namespace);
    let pp = PostParams {
        field_manager: Some(OPERATOR_NAME.to_string()),
        ..Default::default()
    };

    let mut mirror = source.build_mirror(target_namespace);

    let Some(existing) = api.get_opt(&name).await? else {
        api.create(&pp, &mirror).await?;
        info!("Created {} {}/{}", K::LABEL, target_namespace, name);
        return Ok(UpsertOutcome::Created);
    };

    let owned = match mirror_origin(&existing) {
        Some(origin) => origin == source_namespace,
        None => resolve_intent(existing.annotations(), target_namespace).skip_replication(),
    };
    if !owned {
        warn!(
            "{} {}/{} is not a mirror of {}, leaving it untouched",
            K::LABEL,
            target_namespace,
            name,
            source_namespace
        );
        return Ok(UpsertOutcome::OtherSource);
    }

    if mirror.same_content(&existing) {
        debug!("{} {}/{} is up to date", K::LABEL, target_namespace, name);
        return Ok(UpsertOutcome::Unchanged);
    }

    let current = existing.meta();

    if mirror.needs_recreate(&existing) {
        let dp = DeleteParams {
            preconditions: Some(Preconditions {
                uid: current.uid.clone(),
                resource_version: current.resource_version.clone(),
            }),
            ..Default::default()
        };
        api.delete(&name, &dp).await?;
        api.create(&pp, &mirror).await?;
        info!("Recreated {} {}/{} to change an immutable field", K::LABEL, target_namespace, name);
        return Ok(UpsertOutcome::Updated);
    }

    let meta = mirror.meta_mut();
    meta.resource_version = current.resource_version.clone();
    meta.uid = current.uid.clone();
    meta.creation_timestamp = current.creation_timestamp.clone();
    meta.owner_references = current.owner_references.clone();
    meta.finalizers = current.finalizers.clone();

    api.replace(&name, &pp, &mirror).await?;
    info!("Updated {} {}/{}", K::LABEL, target_namespace, name);
    Ok(UpsertOutcome::Updated)
}
