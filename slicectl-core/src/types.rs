//! Domain types shared across the orchestrator's crates.

use serde::{Deserialize, Serialize};

/// A registered user. Created and managed externally; read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub role: String,
}

/// Lifecycle status of a slice.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum SliceStatus {
    Pending,
    Deploying,
    Deployed,
    Error,
}

impl std::fmt::Display for SliceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SliceStatus::Pending => "PENDING",
            SliceStatus::Deploying => "DEPLOYING",
            SliceStatus::Deployed => "DEPLOYED",
            SliceStatus::Error => "ERROR",
        };
        write!(f, "{}", s)
    }
}

/// A user-defined network slice: a graph of VMs connected by links.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slice {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub status: SliceStatus,
    /// Original submitted topology, kept verbatim for `update`.
    pub template: serde_json::Value,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Lifecycle state of a single VM.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum VmState {
    Pending,
    Deployed,
    Error,
}

/// A virtual machine belonging to a slice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vm {
    pub id: i64,
    pub slice_id: i64,
    pub name: String,
    pub image_id: i64,
    pub cpu: u32,
    pub ram_mb: u64,
    pub disk_gb: u64,
    pub num_interfaces: u32,
    pub state: VmState,
    pub worker_id: Option<i64>,
    pub pid: Option<u32>,
    pub vnc_port: Option<u32>,
}

/// An undirected link between two VMs in the same slice, tagged with a VLAN.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub id: i64,
    pub slice_id: i64,
    pub vm_a: i64,
    pub vm_b: i64,
    pub vlan_id: u32,
}

/// A boot image stored on the head node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    pub id: i64,
    pub name: String,
    pub path: String,
    pub sha256: String,
    pub size_bytes: u64,
    pub reference_count: u32,
}

/// A named CPU/RAM/disk bundle offered to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flavor {
    pub id: i64,
    pub name: String,
    pub cpu: u32,
    pub ram_mb: u64,
    pub disk_gb: u64,
}

/// A worker hypervisor reachable via SSH over the gateway.
///
/// `id` is the canonical worker identifier (1..W); IP and SSH port are
/// always resolved through this table, never parsed out of a string key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worker {
    pub id: i64,
    pub ip: std::net::Ipv4Addr,
    pub ssh_port: u16,
}

/// A point-in-time snapshot of a host's capacity and health, as consumed
/// by the Placement Engine. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostSnapshot {
    /// `host<lastOctet>` of the monitored instance's IP.
    pub id: String,
    pub ip: std::net::Ipv4Addr,
    pub cpu_total: f64,
    pub ram_total: f64,
    pub storage_total: f64,
    pub availability: f64,
    pub power_idle: f64,
    pub power_max: f64,
}

/// A single VM's resource demand, as supplied to the Placement Engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmDemand {
    pub id: i64,
    pub name: String,
    pub cpu: f64,
    pub ram: f64,
    pub storage: f64,
}

/// Per-host utilization produced by a placement run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostAssignment {
    pub host_id: String,
    pub cpu_ratio: f64,
    pub energy: f64,
    pub availability: f64,
    pub vm_names: Vec<String>,
}

/// Result of a placement run: a VM-name to worker mapping plus objective
/// metrics describing the chosen solution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementResult {
    /// VM id -> host id assigned.
    pub assignment: std::collections::HashMap<i64, String>,
    pub hosts: Vec<HostAssignment>,
    pub total_energy: f64,
    pub total_availability: f64,
    pub fitness_score: f64,
}

/// Outcome of driving the Remote Executor for a single VM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteExecResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub pid: Option<u32>,
    pub vlans: Vec<u32>,
}

/// Per-VM outcome recorded in a deploy report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmDeployOutcome {
    pub vm_id: i64,
    pub vm_name: String,
    pub worker_id: i64,
    pub state: VmState,
    pub pid: Option<u32>,
    pub stdout: String,
    pub stderr: String,
}

/// The report returned by `Deployment Controller::deploy`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployReport {
    pub slice_id: i64,
    pub algorithm: String,
    pub vms: Vec<VmDeployOutcome>,
    pub total_energy: Option<f64>,
    pub total_availability: Option<f64>,
    pub fitness_score: Option<f64>,
}
