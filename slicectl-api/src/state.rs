//! Shared process state handed to every request handler.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use slicectl_core::config::Settings;
use slicectl_placement::PlacementEngine;
use slicectl_remote::RemoteExecutor;

use crate::store::Store;

/// Everything a request handler needs, cloned cheaply behind `Arc`s.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub settings: Arc<Settings>,
    pub executor: RemoteExecutor,
    pub placement: Arc<PlacementEngine>,
    pub monitor: Option<Arc<slicectl_remote::MonitoringAdapter>>,
    /// Keyed advisory lock serializing concurrent deploys of the same
    /// slice. The outer mutex only protects map mutation; the held lock
    /// is the per-slice inner mutex.
    deploy_locks: Arc<Mutex<HashMap<i64, Arc<Mutex<()>>>>>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        settings: Arc<Settings>,
        executor: RemoteExecutor,
        placement: Arc<PlacementEngine>,
        monitor: Option<Arc<slicectl_remote::MonitoringAdapter>>,
    ) -> Self {
        Self {
            store,
            settings,
            executor,
            placement,
            monitor,
            deploy_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Fetch (creating if absent) the per-slice deploy lock.
    pub async fn slice_lock(&self, slice_id: i64) -> Arc<Mutex<()>> {
        let mut locks = self.deploy_locks.lock().await;
        locks
            .entry(slice_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
