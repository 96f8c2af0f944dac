//! Deployment Controller: the PENDING -> DEPLOYING -> {DEPLOYED,ERROR}
//! state machine that actually materializes a slice's VMs.

use tracing::{info, warn};

use slicectl_core::config::Settings;
use slicectl_core::error::{OrchestratorError, Result};
use slicectl_core::types::{DeployReport, SliceStatus, Vm, VmDemand, VmDeployOutcome, VmState};
use slicectl_remote::RemoteExecutor;

use crate::naming::unique_name;
use crate::placement_service;
use crate::state::AppState;

const BRIDGE: &str = "br-int";
const ROUND_ROBIN: &str = "Round-Robin (fallback)";
const IGA: &str = "I-GA";

pub async fn deploy(state: &AppState, slice_id: i64, caller_id: i64) -> Result<DeployReport> {
    let lock = state.slice_lock(slice_id).await;
    let _guard = lock.lock().await;

    let store = state.store.as_ref();

    // 1. Load slice; authorize.
    let slice = store
        .get_slice(slice_id)
        .await?
        .ok_or_else(|| OrchestratorError::NotFound(format!("slice {slice_id}")))?;
    if slice.owner_id != caller_id {
        return Err(OrchestratorError::Authz(format!(
            "caller {caller_id} does not own slice {slice_id}"
        )));
    }

    // 2. Assign the slice its unique name if still PENDING.
    if slice.status == SliceStatus::Pending {
        let name = unique_name(store, "slice", &slice.name).await?;
        store.set_slice_name(slice_id, &name).await?;
    }

    // 3. Load pending VMs; short-circuit on nothing to do.
    let pending = store.list_pending_vms(slice_id).await?;
    if pending.is_empty() {
        store.set_slice_status(slice_id, SliceStatus::Deployed).await?;
        return Ok(DeployReport {
            slice_id,
            algorithm: "none".into(),
            vms: Vec::new(),
            total_energy: None,
            total_availability: None,
            fitness_score: None,
        });
    }

    // 4. Transition to DEPLOYING.
    store.set_slice_status(slice_id, SliceStatus::Deploying).await?;

    // 5. Assign unique names to pending VMs.
    let mut named = Vec::with_capacity(pending.len());
    for vm in pending {
        let name = unique_name(store, "vm", &vm.name).await?;
        if name != vm.name {
            store.set_vm_name(vm.id, &name).await?;
        }
        named.push(Vm { name, ..vm });
    }

    // 6. Ask the Placement Engine; fall back to round-robin on failure.
    let demand: Vec<VmDemand> = named
        .iter()
        .map(|vm| VmDemand {
            id: vm.id,
            name: vm.name.clone(),
            cpu: vm.cpu as f64,
            ram: vm.ram_mb as f64,
            storage: vm.disk_gb as f64,
        })
        .collect();

    let placement = placement_service::request_placement(
        &state.placement,
        state.monitor.as_deref(),
        &demand,
    )
    .await;

    let (algorithm, worker_for_vm, metrics) = match placement {
        Ok(result) => {
            info!(slice_id, fitness = result.fitness_score, "placement engine assigned hosts");
            let mut mapping = std::collections::HashMap::new();
            for vm in &named {
                let host_id = result.assignment.get(&vm.id).cloned();
                let worker_id = host_id
                    .as_deref()
                    .and_then(|h| worker_id_for_host(&state.settings, h))
                    .unwrap_or_else(|| {
                        warn!(slice_id, vm = %vm.name, "placement host has no matching worker, using worker 1");
                        1
                    });
                mapping.insert(vm.id, worker_id);
            }
            let metrics = (
                Some(result.total_energy),
                Some(result.total_availability),
                Some(result.fitness_score),
            );
            (IGA.to_string(), mapping, metrics)
        }
        Err(e) => {
            warn!(slice_id, error = %e, "placement unavailable, falling back to round-robin");
            let worker_count = state.settings.worker_count().max(1);
            let mapping = named
                .iter()
                .enumerate()
                .map(|(i, vm)| (vm.id, ((i % worker_count) as i64) + 1))
                .collect();
            (ROUND_ROBIN.to_string(), mapping, (None, None, None))
        }
    };

    // 7. Drive the Remote Executor for each VM, in primary-key order.
    let links = store.list_links_by_slice(slice_id).await?;
    let mut outcomes = Vec::with_capacity(named.len());

    for vm in &named {
        let worker_id = *worker_for_vm.get(&vm.id).unwrap_or(&1);
        let worker = state.settings.worker(worker_id);
        let worker = match worker {
            Some(w) => w,
            None => {
                warn!(slice_id, vm = %vm.name, worker_id, "unknown worker id, substituting worker 1");
                state
                    .settings
                    .worker(1)
                    .ok_or_else(|| OrchestratorError::Dependency("no workers configured".into()))?
            }
        };

        let vnc_port = vnc_port(worker.id, slice_id, vm.id);
        let image_path = resolve_image_path(store, vm, &state.settings).await;
        let vlans: Vec<u32> = links
            .iter()
            .filter(|l| l.vm_a == vm.id || l.vm_b == vm.id)
            .map(|l| l.vlan_id)
            .collect();

        let outcome = deploy_one_vm(&state.executor, worker.ssh_port, worker.id, vm, vnc_port, image_path, vlans).await;

        store
            .update_vm_deploy_result(vm.id, outcome.state, Some(worker.id), outcome.pid, Some(vnc_port))
            .await?;
        outcomes.push(outcome);
    }

    // 8. Transition slice to DEPLOYED (possibly with per-VM errors).
    store.set_slice_status(slice_id, SliceStatus::Deployed).await?;

    let (total_energy, total_availability, fitness_score) = metrics;

    Ok(DeployReport {
        slice_id,
        algorithm,
        vms: outcomes,
        total_energy,
        total_availability,
        fitness_score,
    })
}

async fn deploy_one_vm(
    executor: &RemoteExecutor,
    ssh_port: u16,
    worker_id: i64,
    vm: &Vm,
    vnc_port: u32,
    image_path: String,
    vlans: Vec<u32>,
) -> VmDeployOutcome {
    let result = executor
        .create_vm_multi_vlan(
            ssh_port,
            vm.name.clone(),
            BRIDGE.to_string(),
            vlans,
            vnc_port,
            vm.cpu,
            vm.ram_mb,
            vm.disk_gb,
            vm.num_interfaces,
            image_path,
        )
        .await;

    VmDeployOutcome {
        vm_id: vm.id,
        vm_name: vm.name.clone(),
        worker_id,
        state: if result.success { VmState::Deployed } else { VmState::Error },
        pid: result.pid,
        stdout: result.stdout,
        stderr: result.stderr,
    }
}

async fn resolve_image_path(store: &dyn crate::store::Store, vm: &Vm, settings: &Settings) -> String {
    match store.get_image(vm.image_id).await {
        Ok(Some(image)) => image.path,
        _ => settings.default_image_path.clone(),
    }
}

/// `worker_id * 10000 + (slice_id % 100) * 100 + (vm_id % 100)`.
fn vnc_port(worker_id: i64, slice_id: i64, vm_id: i64) -> u32 {
    (worker_id * 10_000 + (slice_id % 100) * 100 + (vm_id % 100)) as u32
}

/// `host<lastOctet>` -> worker id, by matching the octet against the
/// configured worker IPs.
fn worker_id_for_host(settings: &Settings, host_id: &str) -> Option<i64> {
    let octet: u8 = host_id.strip_prefix("host")?.parse().ok()?;
    settings
        .workers
        .iter()
        .find(|w| w.ip.octets()[3] == octet)
        .map(|w| w.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vnc_port_matches_worked_example() {
        assert_eq!(vnc_port(2, 5, 37), 20537);
    }

    #[test]
    fn vnc_port_wraps_slice_and_vm_ids_modulo_100() {
        assert_eq!(vnc_port(1, 105, 237), vnc_port(1, 5, 37));
    }
}
