//! Process configuration, read once at startup.

use clap::Parser;
use std::net::Ipv4Addr;

use crate::types::Worker;

/// All configuration for the orchestrator binary.
///
/// Every field can be set from the environment (`SLICECTL_*`) and falls
/// back to the listed default where one is given; secrets have no
/// default and must be supplied.
#[derive(Parser, Debug, Clone)]
#[command(name = "slicectl-api")]
#[command(about = "Private-cloud slice orchestrator")]
pub struct Settings {
    /// Address the HTTP API listens on.
    #[arg(long, env = "SLICECTL_LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: String,

    /// Database connection URL (sqlite or postgres).
    #[arg(long, env = "SLICECTL_DATABASE_URL", default_value = "sqlite://slicectl.db")]
    pub database_url: String,

    /// Secret used to sign and verify JWTs.
    #[arg(long, env = "SLICECTL_JWT_SECRET")]
    pub jwt_secret: String,

    /// JWT signing algorithm.
    #[arg(long, env = "SLICECTL_JWT_ALGORITHM", default_value = "HS256")]
    pub jwt_algorithm: String,

    /// Token lifetime in minutes.
    #[arg(long, env = "SLICECTL_TOKEN_TTL_MINUTES", default_value_t = 60)]
    pub token_ttl_minutes: i64,

    /// SSH username used against every worker and the gateway.
    #[arg(long, env = "SLICECTL_SSH_USER", default_value = "ubuntu")]
    pub ssh_user: String,

    /// SSH password. Mutually exclusive in practice with `ssh_key_path`,
    /// but both are accepted; key takes precedence when present.
    #[arg(long, env = "SLICECTL_SSH_PASSWORD")]
    pub ssh_password: Option<String>,

    /// Path to an SSH private key, as an alternative to password auth.
    #[arg(long, env = "SLICECTL_SSH_KEY_PATH")]
    pub ssh_key_path: Option<String>,

    /// Gateway host used to reach every worker's SSH port.
    #[arg(long, env = "SLICECTL_GATEWAY_HOST")]
    pub gateway_host: Ipv4Addr,

    /// Worker table entries, `id:ip:ssh_port`, one per worker.
    #[arg(long = "worker", env = "SLICECTL_WORKERS", value_delimiter = ',', value_parser = parse_worker)]
    pub workers: Vec<Worker>,

    /// Host:port of the head node that stores VM images.
    #[arg(long, env = "SLICECTL_HEAD_NODE")]
    pub head_node: String,

    /// Directory on the head node where uploaded images are written.
    #[arg(long, env = "SLICECTL_IMAGE_ROOT", default_value = "/var/lib/slicectl/images")]
    pub image_root: String,

    /// Image path substituted when a VM's image row has none.
    #[arg(
        long,
        env = "SLICECTL_DEFAULT_IMAGE_PATH",
        default_value = "/var/lib/slicectl/images/default.qcow2"
    )]
    pub default_image_path: String,

    /// `host:port` of the monitoring gateway the metrics tunnel is opened
    /// against.
    #[arg(long, env = "SLICECTL_MONITORING_TUNNEL")]
    pub monitoring_tunnel: String,

    /// Local port the monitoring tunnel forwards to on the remote side.
    #[arg(long, env = "SLICECTL_MONITORING_REMOTE_PORT", default_value_t = 9090)]
    pub monitoring_remote_port: u16,

    /// Idle-host power draw in watts, used when a host snapshot omits it.
    #[arg(long, env = "SLICECTL_POWER_IDLE_DEFAULT", default_value_t = 100.0)]
    pub power_idle_default: f64,

    /// Peak-host power draw in watts, used when a host snapshot omits it.
    #[arg(long, env = "SLICECTL_POWER_MAX_DEFAULT", default_value_t = 250.0)]
    pub power_max_default: f64,

    /// Log filter directive, e.g. `info` or `slicectl_api=debug`.
    #[arg(long, env = "SLICECTL_LOG", default_value = "info")]
    pub log_filter: String,

    /// Run without any real SSH or monitoring backend, for local testing.
    #[arg(long)]
    pub dev: bool,
}

fn parse_worker(s: &str) -> Result<Worker, String> {
    let mut parts = s.splitn(3, ':');
    let id = parts
        .next()
        .ok_or("expected id:ip:port")?
        .parse::<i64>()
        .map_err(|_| "invalid worker id".to_string())?;
    let ip = parts
        .next()
        .ok_or("expected id:ip:port")?
        .parse::<Ipv4Addr>()
        .map_err(|_| "invalid worker ip".to_string())?;
    let ssh_port = parts
        .next()
        .ok_or("expected id:ip:port")?
        .parse::<u16>()
        .map_err(|_| "invalid worker ssh port".to_string())?;
    Ok(Worker { id, ip, ssh_port })
}

impl Settings {
    /// Look up a worker by its canonical 1..W id.
    pub fn worker(&self, id: i64) -> Option<&Worker> {
        self.workers.iter().find(|w| w.id == id)
    }

    /// Number of configured workers, for the round-robin fallback.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_worker_triplet() {
        let w = parse_worker("2:10.0.0.12:2202").unwrap();
        assert_eq!(w.id, 2);
        assert_eq!(w.ip, Ipv4Addr::new(10, 0, 0, 12));
        assert_eq!(w.ssh_port, 2202);
    }

    #[test]
    fn rejects_malformed_worker() {
        assert!(parse_worker("not-a-worker").is_err());
    }
}
