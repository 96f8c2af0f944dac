//! Request/response bodies for the HTTP surface, with `From` conversions
//! into and out of the domain types the controllers operate on.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use slicectl_core::types::{DeployReport, Flavor, HostAssignment, Image, PlacementResult, Slice, Vm, VmDeployOutcome};

use crate::store::{TopologyLink, TopologyNode};

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub role: String,
}

#[derive(Deserialize, ToSchema)]
pub struct TopologyNodeRequest {
    pub label: String,
    pub cpu: u32,
    pub ram: u64,
    pub disk: u64,
    pub image_id: i64,
}

#[derive(Deserialize, ToSchema)]
pub struct TopologyLinkRequest {
    pub from_vm: String,
    pub to_vm: String,
}

#[derive(Deserialize, ToSchema)]
pub struct SliceTopologyRequest {
    pub name: String,
    pub nodes: Vec<TopologyNodeRequest>,
    pub links: Vec<TopologyLinkRequest>,
}

impl SliceTopologyRequest {
    pub fn into_parts(self) -> (String, serde_json::Value, Vec<TopologyNode>, Vec<TopologyLink>) {
        let template = serde_json::json!({
            "name": self.name,
            "nodes": self.nodes.iter().map(|n| serde_json::json!({
                "label": n.label, "cpu": n.cpu, "ram": n.ram, "disk": n.disk, "image_id": n.image_id,
            })).collect::<Vec<_>>(),
            "links": self.links.iter().map(|l| serde_json::json!({
                "from_vm": l.from_vm, "to_vm": l.to_vm,
            })).collect::<Vec<_>>(),
        });
        let nodes = self
            .nodes
            .into_iter()
            .map(|n| TopologyNode {
                label: n.label,
                cpu: n.cpu,
                ram_mb: n.ram,
                disk_gb: n.disk,
                image_id: n.image_id,
            })
            .collect();
        let links = self
            .links
            .into_iter()
            .map(|l| TopologyLink {
                from_label: l.from_vm,
                to_label: l.to_vm,
            })
            .collect();
        (self.name, template, nodes, links)
    }
}

#[derive(Serialize, ToSchema)]
pub struct CreateSliceResponse {
    pub slice_id: i64,
    pub message: String,
    pub owner: String,
    pub links_created: usize,
}

#[derive(Serialize, ToSchema)]
pub struct UpdateSliceResponse {
    pub status: String,
    pub slice_id: i64,
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct DeleteSliceResponse {
    pub status: String,
    pub slice_id: i64,
}

#[derive(Serialize, ToSchema)]
pub struct VmSummary {
    pub id: i64,
    pub name: String,
    pub state: String,
    pub worker_id: Option<i64>,
    pub pid: Option<u32>,
    pub vnc_port: Option<u32>,
}

impl From<&Vm> for VmSummary {
    fn from(vm: &Vm) -> Self {
        Self {
            id: vm.id,
            name: vm.name.clone(),
            state: format!("{:?}", vm.state).to_uppercase(),
            worker_id: vm.worker_id,
            pid: vm.pid,
            vnc_port: vm.vnc_port,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct SliceSummary {
    pub slice_id: i64,
    pub slice_name: String,
    pub status: String,
    pub created_at: String,
    pub template: serde_json::Value,
    pub vms: Vec<VmSummary>,
}

pub fn slice_summary(slice: &Slice, vms: &[Vm]) -> SliceSummary {
    SliceSummary {
        slice_id: slice.id,
        slice_name: slice.name.clone(),
        status: slice.status.to_string(),
        created_at: slice.created_at.to_rfc3339(),
        template: slice.template.clone(),
        vms: vms.iter().map(VmSummary::from).collect(),
    }
}

#[derive(Serialize, ToSchema)]
pub struct SlicesResponse {
    pub user: String,
    pub slices: Vec<SliceSummary>,
}

#[derive(Serialize, ToSchema)]
pub struct FlavorResponse {
    pub id: i64,
    pub name: String,
    pub cpu: u32,
    pub ram_mb: u64,
    pub disk_gb: u64,
}

impl From<Flavor> for FlavorResponse {
    fn from(f: Flavor) -> Self {
        Self {
            id: f.id,
            name: f.name,
            cpu: f.cpu,
            ram_mb: f.ram_mb,
            disk_gb: f.disk_gb,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ImageResponse {
    pub id: i64,
    pub name: String,
    pub path: String,
    pub sha256: String,
    pub size_bytes: u64,
    pub reference_count: u32,
}

impl From<Image> for ImageResponse {
    fn from(i: Image) -> Self {
        Self {
            id: i.id,
            name: i.name,
            path: i.path,
            sha256: i.sha256,
            size_bytes: i.size_bytes,
            reference_count: i.reference_count,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct SlicePlacementVm {
    pub id: i64,
    pub name: String,
    pub cpu: f64,
    pub ram: f64,
    pub disk: f64,
}

#[derive(Deserialize, ToSchema)]
pub struct SlicePlacementRequest {
    pub vms: Vec<SlicePlacementVm>,
}

#[derive(Deserialize, ToSchema)]
pub struct CustomPlacementVm {
    pub id: i64,
    pub cpu: f64,
    pub ram: f64,
    pub storage: f64,
}

#[derive(Deserialize, ToSchema)]
pub struct CustomPlacementRequest {
    pub vms: Vec<CustomPlacementVm>,
}

#[derive(Serialize, ToSchema)]
pub struct HostAssignmentResponse {
    pub host_id: String,
    pub cpu_ratio: f64,
    pub energy: f64,
    pub availability: f64,
    pub vm_names: Vec<String>,
}

impl From<HostAssignment> for HostAssignmentResponse {
    fn from(h: HostAssignment) -> Self {
        Self {
            host_id: h.host_id,
            cpu_ratio: h.cpu_ratio,
            energy: h.energy,
            availability: h.availability,
            vm_names: h.vm_names,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PlacementResponse {
    /// VM id (as a string key) -> assigned host id.
    pub assignment: HashMap<String, String>,
    pub hosts: Vec<HostAssignmentResponse>,
    pub total_energy: f64,
    pub total_availability: f64,
    pub fitness_score: f64,
}

impl From<PlacementResult> for PlacementResponse {
    fn from(r: PlacementResult) -> Self {
        Self {
            assignment: r.assignment.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
            hosts: r.hosts.into_iter().map(Into::into).collect(),
            total_energy: r.total_energy,
            total_availability: r.total_availability,
            fitness_score: r.fitness_score,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct VmDeployOutcomeResponse {
    pub vm_id: i64,
    pub vm_name: String,
    pub worker_id: i64,
    pub state: String,
    pub pid: Option<u32>,
    pub stdout: String,
    pub stderr: String,
}

impl From<VmDeployOutcome> for VmDeployOutcomeResponse {
    fn from(o: VmDeployOutcome) -> Self {
        Self {
            vm_id: o.vm_id,
            vm_name: o.vm_name,
            worker_id: o.worker_id,
            state: format!("{:?}", o.state).to_uppercase(),
            pid: o.pid,
            stdout: o.stdout,
            stderr: o.stderr,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct DeployResponse {
    pub slice_id: i64,
    pub algorithm: String,
    pub vms: Vec<VmDeployOutcomeResponse>,
    pub total_energy: Option<f64>,
    pub total_availability: Option<f64>,
    pub fitness_score: Option<f64>,
}

impl From<DeployReport> for DeployResponse {
    fn from(r: DeployReport) -> Self {
        Self {
            slice_id: r.slice_id,
            algorithm: r.algorithm,
            vms: r.vms.into_iter().map(Into::into).collect(),
            total_energy: r.total_energy,
            total_availability: r.total_availability,
            fitness_score: r.fitness_score,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct HostSnapshotResponse {
    pub id: String,
    pub ip: String,
    pub cpu_total: f64,
    pub ram_total: f64,
    pub storage_total: f64,
    pub availability: f64,
    pub power_idle: f64,
    pub power_max: f64,
}

impl From<slicectl_core::types::HostSnapshot> for HostSnapshotResponse {
    fn from(h: slicectl_core::types::HostSnapshot) -> Self {
        Self {
            id: h.id,
            ip: h.ip.to_string(),
            cpu_total: h.cpu_total,
            ram_total: h.ram_total,
            storage_total: h.storage_total,
            availability: h.availability,
            power_idle: h.power_idle,
            power_max: h.power_max,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct HostsResponse {
    pub hosts: Vec<HostSnapshotResponse>,
}

#[derive(Serialize, ToSchema)]
pub struct VersionResponse {
    pub version: String,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}
