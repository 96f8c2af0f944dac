//! Structured audit logging for state-changing operations.
//!
//! Every event is a single `tracing` call at `info` level with
//! machine-parseable fields; there is no separate audit sink or remote
//! collector in this deployment shape (SPEC_FULL.md section 2).

use tracing::info;

pub fn slice_created(slice_id: i64, owner_id: i64, name: &str) {
    info!(target: "audit", slice_id, owner_id, name, event = "slice_created");
}

pub fn slice_updated(slice_id: i64, caller_id: i64) {
    info!(target: "audit", slice_id, caller_id, event = "slice_updated");
}

pub fn slice_deleted(slice_id: i64, caller_id: i64) {
    info!(target: "audit", slice_id, caller_id, event = "slice_deleted");
}

pub fn slice_deployed(slice_id: i64, caller_id: i64, algorithm: &str, vm_count: usize) {
    info!(
        target: "audit",
        slice_id,
        caller_id,
        algorithm,
        vm_count,
        event = "slice_deployed"
    );
}

pub fn login_succeeded(username: &str) {
    info!(target: "audit", username, event = "login_succeeded");
}

pub fn login_failed(username: &str) {
    info!(target: "audit", username, event = "login_failed");
}
