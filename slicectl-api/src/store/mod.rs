//! Persistence trait abstracting the relational store.
//!
//! Handlers and controllers talk to `Store`, not to `sqlx` directly, so the
//! backend can be swapped (and so unit tests can run against a fresh
//! in-memory SQLite database without touching the network).

pub mod models;
pub mod sqlite;

use async_trait::async_trait;

use slicectl_core::error::Result;
use slicectl_core::types::{Flavor, Image, Link, Slice, SliceStatus, User, Vm, VmState};

pub use sqlite::SqliteStore;

/// A single node in a submitted topology, keyed by its user-facing label.
#[derive(Debug, Clone)]
pub struct TopologyNode {
    pub label: String,
    pub cpu: u32,
    pub ram_mb: u64,
    pub disk_gb: u64,
    pub image_id: i64,
}

/// A single undirected edge in a submitted topology, referencing node
/// labels.
#[derive(Debug, Clone)]
pub struct TopologyLink {
    pub from_label: String,
    pub to_label: String,
}

/// Everything needed to materialize a slice's rows in one transaction.
#[derive(Debug, Clone)]
pub struct NewSlice {
    pub owner_id: i64,
    pub name: String,
    pub template: serde_json::Value,
    pub nodes: Vec<TopologyNode>,
    pub links: Vec<TopologyLink>,
}

/// Persistence operations the orchestrator needs.
#[async_trait]
pub trait Store: Send + Sync {
    // Users / auth
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn get_user(&self, id: i64) -> Result<Option<User>>;

    // Slices
    async fn create_slice(&self, req: NewSlice) -> Result<Slice>;
    async fn get_slice(&self, id: i64) -> Result<Option<Slice>>;
    async fn list_slices_by_owner(&self, owner_id: i64) -> Result<Vec<Slice>>;
    async fn set_slice_status(&self, id: i64, status: SliceStatus) -> Result<()>;
    async fn set_slice_name(&self, id: i64, name: &str) -> Result<()>;
    async fn replace_slice_topology(
        &self,
        id: i64,
        name: &str,
        template: serde_json::Value,
        nodes: Vec<TopologyNode>,
        links: Vec<TopologyLink>,
    ) -> Result<()>;
    async fn delete_slice(&self, id: i64) -> Result<()>;

    // VMs
    async fn list_vms_by_slice(&self, slice_id: i64) -> Result<Vec<Vm>>;
    async fn list_pending_vms(&self, slice_id: i64) -> Result<Vec<Vm>>;
    async fn set_vm_name(&self, vm_id: i64, name: &str) -> Result<()>;
    async fn update_vm_deploy_result(
        &self,
        vm_id: i64,
        state: VmState,
        worker_id: Option<i64>,
        pid: Option<u32>,
        vnc_port: Option<u32>,
    ) -> Result<()>;

    // Links
    async fn list_links_by_slice(&self, slice_id: i64) -> Result<Vec<Link>>;

    // Naming
    /// Count of rows in `table` whose `name` starts with `base`, used by
    /// the deploy-time unique-name rule.
    async fn count_names_like(&self, table: &str, base: &str) -> Result<i64>;

    // Images / Flavors
    async fn get_image(&self, id: i64) -> Result<Option<Image>>;
    async fn list_images(&self) -> Result<Vec<Image>>;
    async fn create_image(&self, name: &str, path: &str, sha256: &str, size_bytes: u64) -> Result<Image>;
    async fn list_flavors(&self) -> Result<Vec<Flavor>>;
}
