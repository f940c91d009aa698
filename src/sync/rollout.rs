// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Workload usage detection and rollout triggering

use crate::constants::OPERATOR_NAME;
use crate::error::{ReplizierenError, Result};
use crate::types::ReplicatedKind;
use chrono::{SecondsFormat, Utc};
use k8s_openapi::api::apps::v1::Deployment;
use kube::{
    api::{ListParams, Patch, PatchParams},
    Api, Client, ResourceExt,
};
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

/// Check if a deployment's pod template uses the resource of kind `K` named `name`.
///
/// Only volumes and container `envFrom` sources are inspected. Single-key
/// `valueFrom` references and projected volumes are not detected.
pub fn uses_resource<K: ReplicatedKind>(deployment: &Deployment, name: &str) -> bool {
    deployment
        .spec
        .as_ref()
        .and_then(|s| s.template.spec.as_ref())
        .is_some_and(|pod_spec| K::is_referenced_by(pod_spec, name))
}

/// Current time as RFC 3339 UTC, e.g. `2026-01-31T09:15:00Z`
pub fn restart_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Merge patch setting a single pod template annotation
fn restart_patch(annotation_key: &str, restarted_at: &str) -> Value {
    json!({
        "spec": {
            "template": {
                "metadata": {
                    "annotations": {
                        annotation_key: restarted_at
                    }
                }
            }
        }
    })
}

/// Restart every deployment in `namespace` that uses the resource named `name`
/// by stamping the kind's restart annotation on its pod template.
///
/// Returns how many deployments were patched. A failed patch is logged and the
/// remaining deployments are still processed; only the listing can fail the call.
#[instrument(skip(client), fields(kind = K::LABEL))]
pub async fn trigger_rollout<K: ReplicatedKind>(
    client: &Client,
    namespace: &str,
    name: &str,
) -> Result<usize> {
    let deployments: Api<Deployment> = Api::namespaced(client.clone(), namespace);
    let list = deployments.list(&ListParams::default()).await?;

    let patch = restart_patch(K::RESTART_ANNOTATION, &restart_timestamp());
    let pp = PatchParams {
        field_manager: Some(OPERATOR_NAME.to_string()),
        ..Default::default()
    };

    let mut restarted = 0;
    for deployment in list.items.iter().filter(|d| uses_resource::<K>(d, name)) {
        let deployment_name = deployment.name_any();
        match deployments
            .patch(&deployment_name, &pp, &Patch::Merge(&patch))
            .await
        {
            Ok(_) => {
                info!(
                    "Triggered rollout of deployment {}/{} for {} {}",
                    namespace,
                    deployment_name,
                    K::LABEL,
                    name
                );
                restarted += 1;
            }
            Err(source) => {
                let err = ReplizierenError::RolloutError {
                    namespace: namespace.to_string(),
                    name: deployment_name,
                    source,
                };
                warn!("{}", err);
            }
        }
    }

    debug!("Restarted {} deployments in {}", restarted, namespace);
    Ok(restarted)
}
