// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Turns replication annotations into a [`ReplicationIntent`].

use crate::constants::annotations;
use crate::types::{ReplicationIntent, ReplicationTarget};
use std::collections::{BTreeMap, BTreeSet};

/// Resolve the replication intent of a resource living in `source_namespace`.
///
/// `replicate-all: "true"` wins over everything. Otherwise `replicate` decides:
/// empty/missing or `"false"` skips, `"true"` means all namespaces unless
/// `replicate-all` is explicitly `"false"`, in which case `"true"` is read as
/// a namespace name. Any other value is a comma separated namespace list.
pub fn resolve_intent(
    annotations: &BTreeMap<String, String>,
    source_namespace: &str,
) -> ReplicationIntent {
    let rollout_on_update = annotations
        .get(annotations::ROLLOUT_ON_UPDATE)
        .is_some_and(|v| v == "true");

    let replicate_all = annotations.get(annotations::REPLICATE_ALL).map(String::as_str);
    let replicate = annotations
        .get(annotations::REPLICATE)
        .map(|v| v.trim())
        .unwrap_or_default();

    let target = match (replicate_all, replicate) {
        (Some("true"), _) => ReplicationTarget::All,
        (_, "") | (_, "false") => ReplicationTarget::Skip,
        (Some("false"), list) => ReplicationTarget::Specific(parse_targets(list, source_namespace)),
        (_, "true") => ReplicationTarget::All,
        (_, list) => ReplicationTarget::Specific(parse_targets(list, source_namespace)),
    };

    ReplicationIntent {
        target,
        rollout_on_update,
    }
}

fn parse_targets(list: &str, source_namespace: &str) -> BTreeSet<String> {
    list.split(',')
        .map(str::trim)
        .filter(|ns| !ns.is_empty() && *ns != source_namespace)
        .map(str::to_string)
        .collect()
}
