//! SQLite-backed `Store` implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;

use slicectl_core::error::{OrchestratorError, Result};
use slicectl_core::types::{Flavor, Image, Link, Slice, SliceStatus, User, Vm, VmState};

use super::models::{FlavorRow, ImageRow, LinkRow, SliceRow, UserRow, VmRow};
use super::{NewSlice, Store, TopologyLink, TopologyNode};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .map_err(|e| OrchestratorError::Dependency(format!("database connect failed: {e}")))?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| OrchestratorError::Dependency(format!("migration failed: {e}")))?;
        Ok(Self::new(pool))
    }
}

fn dep(e: sqlx::Error) -> OrchestratorError {
    OrchestratorError::Dependency(format!("database error: {e}"))
}

#[async_trait]
impl Store for SqliteStore {
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password_hash, role FROM user WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(dep)?;
        Ok(row.map(Into::into))
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password_hash, role FROM user WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(dep)?;
        Ok(row.map(Into::into))
    }

    async fn create_slice(&self, req: NewSlice) -> Result<Slice> {
        let mut tx = self.pool.begin().await.map_err(dep)?;

        let template = serde_json::to_string(&req.template)
            .map_err(|e| OrchestratorError::Validation(format!("invalid template: {e}")))?;
        let created_at = Utc::now().to_rfc3339();

        let slice_id = sqlx::query(
            "INSERT INTO slice (owner_id, name, status, template, created_at) VALUES (?, ?, 'PENDING', ?, ?)",
        )
        .bind(req.owner_id)
        .bind(&req.name)
        .bind(&template)
        .bind(&created_at)
        .execute(&mut *tx)
        .await
        .map_err(dep)?
        .last_insert_rowid();

        let mut vm_ids: HashMap<String, i64> = HashMap::new();
        let mut degree: HashMap<String, u32> = HashMap::new();
        for link in &req.links {
            *degree.entry(link.from_label.clone()).or_insert(0) += 1;
            *degree.entry(link.to_label.clone()).or_insert(0) += 1;
        }

        for node in &req.nodes {
            let num_interfaces = degree.get(&node.label).copied().unwrap_or(0).max(1);
            let vm_id = sqlx::query(
                "INSERT INTO vm (slice_id, name, image_id, cpu, ram_mb, disk_gb, num_interfaces, state) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, 'PENDING')",
            )
            .bind(slice_id)
            .bind(&node.label)
            .bind(node.image_id)
            .bind(node.cpu as i64)
            .bind(node.ram_mb as i64)
            .bind(node.disk_gb as i64)
            .bind(num_interfaces as i64)
            .execute(&mut *tx)
            .await
            .map_err(dep)?
            .last_insert_rowid();
            vm_ids.insert(node.label.clone(), vm_id);
        }

        for (k, link) in req.links.iter().enumerate() {
            let vm_a = *vm_ids.get(&link.from_label).ok_or_else(|| {
                OrchestratorError::Validation(format!("link references unknown node: {}", link.from_label))
            })?;
            let vm_b = *vm_ids.get(&link.to_label).ok_or_else(|| {
                OrchestratorError::Validation(format!("link references unknown node: {}", link.to_label))
            })?;
            let vlan_id = 100 + (k as i64) * 100;
            sqlx::query(
                "INSERT INTO network_link (slice_id, vm_a, vm_b, vlan_id) VALUES (?, ?, ?, ?)",
            )
            .bind(slice_id)
            .bind(vm_a)
            .bind(vm_b)
            .bind(vlan_id)
            .execute(&mut *tx)
            .await
            .map_err(dep)?;
        }

        tx.commit().await.map_err(dep)?;

        self.get_slice(slice_id)
            .await?
            .ok_or_else(|| OrchestratorError::Invariant("slice vanished right after insert".into()))
    }

    async fn get_slice(&self, id: i64) -> Result<Option<Slice>> {
        let row = sqlx::query_as::<_, SliceRow>(
            "SELECT id, owner_id, name, status, template, created_at FROM slice WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(dep)?;
        row.map(Slice::try_from).transpose()
    }

    async fn list_slices_by_owner(&self, owner_id: i64) -> Result<Vec<Slice>> {
        let rows = sqlx::query_as::<_, SliceRow>(
            "SELECT id, owner_id, name, status, template, created_at FROM slice WHERE owner_id = ? ORDER BY id",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(dep)?;
        rows.into_iter().map(Slice::try_from).collect()
    }

    async fn set_slice_status(&self, id: i64, status: SliceStatus) -> Result<()> {
        sqlx::query("UPDATE slice SET status = ? WHERE id = ?")
            .bind(status.to_string())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(dep)?;
        Ok(())
    }

    async fn set_slice_name(&self, id: i64, name: &str) -> Result<()> {
        sqlx::query("UPDATE slice SET name = ? WHERE id = ?")
            .bind(name)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(dep)?;
        Ok(())
    }

    async fn replace_slice_topology(
        &self,
        id: i64,
        name: &str,
        template: serde_json::Value,
        nodes: Vec<TopologyNode>,
        links: Vec<TopologyLink>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(dep)?;
        let template_json = serde_json::to_string(&template)
            .map_err(|e| OrchestratorError::Validation(format!("invalid template: {e}")))?;

        sqlx::query("UPDATE slice SET name = ?, template = ? WHERE id = ?")
            .bind(name)
            .bind(&template_json)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(dep)?;

        sqlx::query("DELETE FROM network_link WHERE slice_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(dep)?;
        sqlx::query("DELETE FROM vm WHERE slice_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(dep)?;

        let mut vm_ids: HashMap<String, i64> = HashMap::new();
        let mut degree: HashMap<String, u32> = HashMap::new();
        for link in &links {
            *degree.entry(link.from_label.clone()).or_insert(0) += 1;
            *degree.entry(link.to_label.clone()).or_insert(0) += 1;
        }
        for node in &nodes {
            let num_interfaces = degree.get(&node.label).copied().unwrap_or(0).max(1);
            let vm_id = sqlx::query(
                "INSERT INTO vm (slice_id, name, image_id, cpu, ram_mb, disk_gb, num_interfaces, state) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, 'PENDING')",
            )
            .bind(id)
            .bind(&node.label)
            .bind(node.image_id)
            .bind(node.cpu as i64)
            .bind(node.ram_mb as i64)
            .bind(node.disk_gb as i64)
            .bind(num_interfaces as i64)
            .execute(&mut *tx)
            .await
            .map_err(dep)?
            .last_insert_rowid();
            vm_ids.insert(node.label.clone(), vm_id);
        }
        for (k, link) in links.iter().enumerate() {
            let vm_a = *vm_ids.get(&link.from_label).ok_or_else(|| {
                OrchestratorError::Validation(format!("link references unknown node: {}", link.from_label))
            })?;
            let vm_b = *vm_ids.get(&link.to_label).ok_or_else(|| {
                OrchestratorError::Validation(format!("link references unknown node: {}", link.to_label))
            })?;
            let vlan_id = 100 + (k as i64) * 100;
            sqlx::query("INSERT INTO network_link (slice_id, vm_a, vm_b, vlan_id) VALUES (?, ?, ?, ?)")
                .bind(id)
                .bind(vm_a)
                .bind(vm_b)
                .bind(vlan_id)
                .execute(&mut *tx)
                .await
                .map_err(dep)?;
        }

        tx.commit().await.map_err(dep)?;
        Ok(())
    }

    async fn delete_slice(&self, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(dep)?;
        sqlx::query("DELETE FROM network_link WHERE slice_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(dep)?;
        sqlx::query("DELETE FROM vm WHERE slice_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(dep)?;
        sqlx::query("DELETE FROM slice WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(dep)?;
        tx.commit().await.map_err(dep)?;
        Ok(())
    }

    async fn list_vms_by_slice(&self, slice_id: i64) -> Result<Vec<Vm>> {
        let rows = sqlx::query_as::<_, VmRow>(
            "SELECT id, slice_id, name, image_id, cpu, ram_mb, disk_gb, num_interfaces, state, worker_id, pid, vnc_port \
             FROM vm WHERE slice_id = ? ORDER BY id",
        )
        .bind(slice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(dep)?;
        rows.into_iter().map(Vm::try_from).collect()
    }

    async fn list_pending_vms(&self, slice_id: i64) -> Result<Vec<Vm>> {
        let rows = sqlx::query_as::<_, VmRow>(
            "SELECT id, slice_id, name, image_id, cpu, ram_mb, disk_gb, num_interfaces, state, worker_id, pid, vnc_port \
             FROM vm WHERE slice_id = ? AND state = 'PENDING' ORDER BY id",
        )
        .bind(slice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(dep)?;
        rows.into_iter().map(Vm::try_from).collect()
    }

    async fn set_vm_name(&self, vm_id: i64, name: &str) -> Result<()> {
        sqlx::query("UPDATE vm SET name = ? WHERE id = ?")
            .bind(name)
            .bind(vm_id)
            .execute(&self.pool)
            .await
            .map_err(dep)?;
        Ok(())
    }

    async fn update_vm_deploy_result(
        &self,
        vm_id: i64,
        state: VmState,
        worker_id: Option<i64>,
        pid: Option<u32>,
        vnc_port: Option<u32>,
    ) -> Result<()> {
        let state_str = match state {
            VmState::Pending => "PENDING",
            VmState::Deployed => "DEPLOYED",
            VmState::Error => "ERROR",
        };
        sqlx::query(
            "UPDATE vm SET state = ?, worker_id = ?, pid = ?, vnc_port = ? WHERE id = ?",
        )
        .bind(state_str)
        .bind(worker_id)
        .bind(pid.map(|p| p as i64))
        .bind(vnc_port.map(|p| p as i64))
        .bind(vm_id)
        .execute(&self.pool)
        .await
        .map_err(dep)?;
        Ok(())
    }

    async fn list_links_by_slice(&self, slice_id: i64) -> Result<Vec<Link>> {
        let rows = sqlx::query_as::<_, LinkRow>(
            "SELECT id, slice_id, vm_a, vm_b, vlan_id FROM network_link WHERE slice_id = ? ORDER BY id",
        )
        .bind(slice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(dep)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn count_names_like(&self, table: &str, base: &str) -> Result<i64> {
        // `table` is never user input; it's a fixed literal passed by
        // callers in this crate ("slice" or "vm").
        let sql = format!("SELECT COUNT(*) AS n FROM {table} WHERE name = ? OR name LIKE ?");
        let like_pattern = format!("{base}-%");
        let row = sqlx::query(&sql)
            .bind(base)
            .bind(&like_pattern)
            .fetch_one(&self.pool)
            .await
            .map_err(dep)?;
        Ok(row.try_get::<i64, _>("n").map_err(dep)?)
    }

    async fn get_image(&self, id: i64) -> Result<Option<Image>> {
        let row = sqlx::query_as::<_, ImageRow>(
            "SELECT id, name, path, sha256, size_bytes, reference_count FROM image WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(dep)?;
        Ok(row.map(Into::into))
    }

    async fn list_images(&self) -> Result<Vec<Image>> {
        let rows = sqlx::query_as::<_, ImageRow>(
            "SELECT id, name, path, sha256, size_bytes, reference_count FROM image ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(dep)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create_image(&self, name: &str, path: &str, sha256: &str, size_bytes: u64) -> Result<Image> {
        let id = sqlx::query(
            "INSERT INTO image (name, path, sha256, size_bytes, reference_count) VALUES (?, ?, ?, ?, 0)",
        )
        .bind(name)
        .bind(path)
        .bind(sha256)
        .bind(size_bytes as i64)
        .execute(&self.pool)
        .await
        .map_err(dep)?
        .last_insert_rowid();

        self.get_image(id)
            .await?
            .ok_or_else(|| OrchestratorError::Invariant("image vanished right after insert".into()))
    }

    async fn list_flavors(&self) -> Result<Vec<Flavor>> {
        let rows = sqlx::query_as::<_, FlavorRow>(
            "SELECT id, name, cpu, ram_mb, disk_gb FROM flavor ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(dep)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
