//! Row shapes as `sqlx` sees them, and their conversions into domain types.
//!
//! SQLite only has signed 64-bit integers, so every numeric column is
//! fetched as `i64`/`f64` and narrowed here rather than pushing that cast
//! into every call site.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use slicectl_core::error::{OrchestratorError, Result};
use slicectl_core::types::{Flavor, Image, Link, Slice, SliceStatus, User, Vm, VmState};

#[derive(FromRow)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub role: String,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        User {
            id: r.id,
            username: r.username,
            password_hash: r.password_hash,
            role: r.role,
        }
    }
}

#[derive(FromRow)]
pub struct SliceRow {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub status: String,
    pub template: String,
    pub created_at: String,
}

impl TryFrom<SliceRow> for Slice {
    type Error = OrchestratorError;

    fn try_from(r: SliceRow) -> Result<Self> {
        Ok(Slice {
            id: r.id,
            owner_id: r.owner_id,
            name: r.name,
            status: parse_status(&r.status)?,
            template: serde_json::from_str(&r.template)
                .map_err(|e| OrchestratorError::Invariant(format!("corrupt slice template: {e}")))?,
            created_at: r
                .created_at
                .parse::<DateTime<Utc>>()
                .map_err(|e| OrchestratorError::Invariant(format!("corrupt created_at: {e}")))?,
        })
    }
}

pub fn parse_status(s: &str) -> Result<SliceStatus> {
    match s {
        "PENDING" => Ok(SliceStatus::Pending),
        "DEPLOYING" => Ok(SliceStatus::Deploying),
        "DEPLOYED" => Ok(SliceStatus::Deployed),
        "ERROR" => Ok(SliceStatus::Error),
        other => Err(OrchestratorError::Invariant(format!("unknown slice status: {other}"))),
    }
}

#[derive(FromRow)]
pub struct VmRow {
    pub id: i64,
    pub slice_id: i64,
    pub name: String,
    pub image_id: i64,
    pub cpu: i64,
    pub ram_mb: i64,
    pub disk_gb: i64,
    pub num_interfaces: i64,
    pub state: String,
    pub worker_id: Option<i64>,
    pub pid: Option<i64>,
    pub vnc_port: Option<i64>,
}

impl TryFrom<VmRow> for Vm {
    type Error = OrchestratorError;

    fn try_from(r: VmRow) -> Result<Self> {
        let state = match r.state.as_str() {
            "PENDING" => VmState::Pending,
            "DEPLOYED" => VmState::Deployed,
            "ERROR" => VmState::Error,
            other => return Err(OrchestratorError::Invariant(format!("unknown vm state: {other}"))),
        };
        Ok(Vm {
            id: r.id,
            slice_id: r.slice_id,
            name: r.name,
            image_id: r.image_id,
            cpu: r.cpu as u32,
            ram_mb: r.ram_mb as u64,
            disk_gb: r.disk_gb as u64,
            num_interfaces: r.num_interfaces as u32,
            state,
            worker_id: r.worker_id,
            pid: r.pid.map(|p| p as u32),
            vnc_port: r.vnc_port.map(|p| p as u32),
        })
    }
}

#[derive(FromRow)]
pub struct LinkRow {
    pub id: i64,
    pub slice_id: i64,
    pub vm_a: i64,
    pub vm_b: i64,
    pub vlan_id: i64,
}

impl From<LinkRow> for Link {
    fn from(r: LinkRow) -> Self {
        Link {
            id: r.id,
            slice_id: r.slice_id,
            vm_a: r.vm_a,
            vm_b: r.vm_b,
            vlan_id: r.vlan_id as u32,
        }
    }
}

#[derive(FromRow)]
pub struct ImageRow {
    pub id: i64,
    pub name: String,
    pub path: String,
    pub sha256: String,
    pub size_bytes: i64,
    pub reference_count: i64,
}

impl From<ImageRow> for Image {
    fn from(r: ImageRow) -> Self {
        Image {
            id: r.id,
            name: r.name,
            path: r.path,
            sha256: r.sha256,
            size_bytes: r.size_bytes as u64,
            reference_count: r.reference_count as u32,
        }
    }
}

#[derive(FromRow)]
pub struct FlavorRow {
    pub id: i64,
    pub name: String,
    pub cpu: i64,
    pub ram_mb: i64,
    pub disk_gb: i64,
}

impl From<FlavorRow> for Flavor {
    fn from(r: FlavorRow) -> Self {
        Flavor {
            id: r.id,
            name: r.name,
            cpu: r.cpu as u32,
            ram_mb: r.ram_mb as u64,
            disk_gb: r.disk_gb as u64,
        }
    }
}
