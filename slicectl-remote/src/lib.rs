//! Remote Executor (SSH-driven VM provisioning) and Monitoring Adapter
//! (SSH-tunneled metrics collection) for the orchestrator's worker fleet.

pub mod executor;
pub mod monitor;
pub mod tunnel;

pub use executor::{RemoteExecutor, SshCredential};
pub use monitor::MonitoringAdapter;
pub use tunnel::MonitoringTunnel;
