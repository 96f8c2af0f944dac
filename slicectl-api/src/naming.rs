//! Deploy-time unique-name rule shared by slices and VMs.

use slicectl_core::error::Result;

use crate::store::Store;

/// If `base` already exists in `table`, returns `base-<N>` where `N` is the
/// number of rows in `table` whose name already starts with `base`.
/// Otherwise returns `base` unchanged. Never touches the row's id.
pub async fn unique_name(store: &dyn Store, table: &str, base: &str) -> Result<String> {
    let count = store.count_names_like(table, base).await?;
    if count == 0 {
        Ok(base.to_string())
    } else {
        Ok(format!("{base}-{count}"))
    }
}
