// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Namespace reconciler - cascades broadcast resources into new namespaces.

use crate::config::Config;
use crate::error::{ReplizierenError, Result};
use crate::kubernetes::ClusterView;
use crate::reconcilers::backoff::{object_key, RequeueBackoff};
use crate::sync::{CascadeOutcome, NamespaceCascade};
use futures::StreamExt;
use k8s_openapi::api::core::v1::Namespace;
use kube::{
    runtime::{controller::Action, watcher, Controller},
    Api, Client, ResourceExt,
};
use std::sync::Arc;
use tracing::{debug, error, warn};

pub struct NamespaceReconciler {
    client: Client,
    cascade: NamespaceCascade,
    backoff: RequeueBackoff,
}

impl NamespaceReconciler {
    pub fn new(client: Client, view: ClusterView, config: Config) -> Self {
        Self {
            backoff: RequeueBackoff::new(config.requeue_base_delay, config.requeue_max_delay),
            cascade: NamespaceCascade::new(client.clone(), view, config),
            client,
        }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        let context = Arc::new(self);

        Controller::new(namespaces, watcher::Config::default())
            .shutdown_on_signal()
            .run(reconcile, error_policy, context.clone())
            .for_each(|res| {
                let context = context.clone();
                async move {
                    match res {
                        Ok(o) => debug!("Reconciled namespace: {:?}", o),
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

async fn reconcile(namespace: Arc<Namespace>, ctx: Arc<NamespaceReconciler>) -> Result<Action> {
    let name = namespace.name_any();
    let key = object_key(None, &name);

    match ctx.cascade.cascade(&namespace).await? {
        CascadeOutcome::Ignored(reason) => debug!("Namespace {} ignored: {:?}", name, reason),
        CascadeOutcome::Done { replicated } => {
            debug!("Namespace {} holds {} broadcast resources", name, replicated)
        }
    }
    ctx.backoff.reset(&key);

    Ok(Action::await_change())
}

fn error_policy(
    namespace: Arc<Namespace>,
    error: &ReplizierenError,
    ctx: Arc<NamespaceReconciler>,
) -> Action {
    let name = namespace.name_any();
    let delay = ctx.backoff.next_delay(&object_key(None, &name));
    error!("Cascade into namespace {} failed, retrying in {:?}: {}", name, delay, error);
    Action::requeue(delay)
}
