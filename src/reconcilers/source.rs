// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Source reconciler - watches Secrets or ConfigMaps and replicates annotated ones.

use crate::config::Config;
use crate::error::{ReplizierenError, Result};
use crate::kubernetes::ClusterView;
use crate::reconcilers::backoff::{object_key, RequeueBackoff};
use crate::sync::ReplicationController;
use crate::types::ReplicatedKind;
use futures::StreamExt;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::{
    runtime::{controller::Action, Controller},
    Api, Client, ResourceExt,
};
use kube_runtime::watcher::Config as WatcherConfig;
use std::sync::Arc;
use tracing::{debug, error, warn};

pub type SecretReconciler = SourceReconciler<Secret>;
pub type ConfigMapReconciler = SourceReconciler<ConfigMap>;

pub struct SourceReconciler<K: ReplicatedKind> {
    client: Client,
    controller: ReplicationController<K>,
    backoff: RequeueBackoff,
}

impl<K: ReplicatedKind> SourceReconciler<K> {
    pub fn new(client: Client, view: ClusterView, config: Config) -> Self {
        Self {
            backoff: RequeueBackoff::new(config.requeue_base_delay, config.requeue_max_delay),
            controller: ReplicationController::new(client.clone(), view, config),
            client,
        }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let resources: Api<K> = Api::all(self.client.clone());
        let context = Arc::new(self);

        Controller::new(resources, WatcherConfig::default())
            .shutdown_on_signal()
            .run(reconcile::<K>, error_policy::<K>, context.clone())
            .for_each(|res| {
                let context = context.clone();
                async move {
                    match res {
                        Ok(o) => debug!("Reconciled {}: {:?}", K::LABEL, o),
                        Err(e) => {
                            context.backoff.forget_missing(&e);
                            warn!("Reconciliation error: {:?}", e);
                        }
                    }
                }
            })
            .await;

        Ok(())
    }
}

async fn reconcile<K: ReplicatedKind>(
    resource: Arc<K>,
    ctx: Arc<SourceReconciler<K>>,
) -> Result<Action> {
    let key = object_key(resource.namespace().as_deref(), &resource.name_any());

    let report = ctx.controller.reconcile(&resource).await?;
    ctx.backoff.reset(&key);

    if !report.replicated.is_empty() || !report.skipped.is_empty() {
        debug!(
            "{}: {} replicated ({} changed), {} skipped, {} restarted",
            key,
            report.replicated.len(),
            report.changed.len(),
            report.skipped.len(),
            report.restarted
        );
    }

    Ok(Action::await_change())
}

fn error_policy<K: ReplicatedKind>(
    resource: Arc<K>,
    error: &ReplizierenError,
    ctx: Arc<SourceReconciler<K>>,
) -> Action {
    let key = object_key(resource.namespace().as_deref(), &resource.name_any());
    let delay = ctx.backoff.next_delay(&key);
    error!("Reconciliation of {} failed, retrying in {:?}: {}", key, delay, error);
    Action::requeue(delay)
}
