//! Glues the Placement Engine to its upstream host data.
//!
//! The engine itself only knows how to optimize over an explicit host
//! list; fetching that list from the Monitoring Adapter, and turning "no
//! hosts" into a typed dependency error the Deployment Controller can
//! catch and fall back from, lives here.

use slicectl_core::error::{OrchestratorError, Result};
use slicectl_core::types::{PlacementResult, VmDemand};
use slicectl_placement::PlacementEngine;
use slicectl_remote::MonitoringAdapter;

pub async fn request_placement(
    engine: &PlacementEngine,
    monitor: Option<&MonitoringAdapter>,
    vms: &[VmDemand],
) -> Result<PlacementResult> {
    let hosts = match monitor {
        Some(monitor) => monitor.get_hosts().await,
        None => Vec::new(),
    };

    if hosts.is_empty() {
        return Err(OrchestratorError::Dependency(
            "monitoring adapter returned no hosts".into(),
        ));
    }

    engine
        .place(vms, &hosts)
        .map_err(|e| OrchestratorError::Dependency(format!("placement engine: {e}")))
}
