//! Slice Controller: topology ingestion, ownership checks, CRUD.
//!
//! Deploy itself is delegated to [`crate::deploy`]; this module owns
//! everything else in the slice lifecycle.

use tracing::warn;

use slicectl_core::config::Settings;
use slicectl_core::error::{OrchestratorError, Result};
use slicectl_core::types::{Slice, SliceStatus, Vm};
use slicectl_remote::RemoteExecutor;

use crate::store::{NewSlice, Store, TopologyLink, TopologyNode};

fn require_owner(slice: &Slice, caller_id: i64) -> Result<()> {
    if slice.owner_id != caller_id {
        return Err(OrchestratorError::Authz(format!(
            "caller {caller_id} does not own slice {}",
            slice.id
        )));
    }
    Ok(())
}

pub async fn create(
    store: &dyn Store,
    owner_id: i64,
    name: String,
    template: serde_json::Value,
    nodes: Vec<TopologyNode>,
    links: Vec<TopologyLink>,
) -> Result<Slice> {
    store
        .get_user(owner_id)
        .await?
        .ok_or_else(|| OrchestratorError::NotFound(format!("user {owner_id}")))?;

    store
        .create_slice(NewSlice {
            owner_id,
            name,
            template,
            nodes,
            links,
        })
        .await
}

pub async fn get(store: &dyn Store, slice_id: i64, caller_id: i64) -> Result<(Slice, Vec<Vm>)> {
    let slice = store
        .get_slice(slice_id)
        .await?
        .ok_or_else(|| OrchestratorError::NotFound(format!("slice {slice_id}")))?;
    require_owner(&slice, caller_id)?;
    let vms = store.list_vms_by_slice(slice_id).await?;
    Ok((slice, vms))
}

pub async fn list(store: &dyn Store, caller_id: i64) -> Result<Vec<(Slice, Vec<Vm>)>> {
    let slices = store.list_slices_by_owner(caller_id).await?;
    let mut out = Vec::with_capacity(slices.len());
    for slice in slices {
        let vms = store.list_vms_by_slice(slice.id).await?;
        out.push((slice, vms));
    }
    Ok(out)
}

pub async fn update(
    store: &dyn Store,
    slice_id: i64,
    caller_id: i64,
    name: String,
    template: serde_json::Value,
    nodes: Vec<TopologyNode>,
    links: Vec<TopologyLink>,
) -> Result<()> {
    let slice = store
        .get_slice(slice_id)
        .await?
        .ok_or_else(|| OrchestratorError::NotFound(format!("slice {slice_id}")))?;
    require_owner(&slice, caller_id)?;

    if !matches!(slice.status, SliceStatus::Pending | SliceStatus::Error) {
        return Err(OrchestratorError::State(format!(
            "slice {slice_id} is {} and cannot be updated",
            slice.status
        )));
    }

    store
        .replace_slice_topology(slice_id, &name, template, nodes, links)
        .await?;
    store.set_slice_status(slice_id, SliceStatus::Pending).await
}

/// Best-effort teardown of every deployed VM, then cascade-delete the
/// slice's rows. Idempotent: deleting an absent slice is a `NotFound` and
/// mutates nothing.
pub async fn delete(
    store: &dyn Store,
    executor: &RemoteExecutor,
    settings: &Settings,
    slice_id: i64,
    caller_id: i64,
) -> Result<()> {
    let slice = store
        .get_slice(slice_id)
        .await?
        .ok_or_else(|| OrchestratorError::NotFound(format!("slice {slice_id}")))?;
    require_owner(&slice, caller_id)?;

    let vms = store.list_vms_by_slice(slice_id).await?;
    for vm in vms {
        let Some(worker_id) = vm.worker_id else { continue };
        let Some(worker) = settings.worker(worker_id) else {
            warn!(vm = %vm.name, worker_id, "worker no longer in table, skipping teardown");
            continue;
        };
        let result = executor.teardown(worker.ssh_port, vm.name.clone()).await;
        if !result.success {
            warn!(vm = %vm.name, stderr = %result.stderr, "teardown reported failure during slice delete");
        }
    }

    store.delete_slice(slice_id).await
}
