//! Monitoring Adapter: normalizes live host metrics (reached through a
//! tunneled HTTP call) into the `HostSnapshot` shape the Placement Engine
//! consumes.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use slicectl_core::types::HostSnapshot;

const CPU_QUERY: &str =
    r#"100 - (avg by (instance) (rate(node_cpu_seconds_total{mode="idle"}[2m])) * 100)"#;
const RAM_QUERY: &str = "(node_memory_MemTotal_bytes - node_memory_MemAvailable_bytes) / node_memory_MemTotal_bytes";
const DISK_QUERY: &str = r#"1 - (node_filesystem_avail_bytes{fstype!~"tmpfs|overlay"} / node_filesystem_size_bytes{fstype!~"tmpfs|overlay"})"#;
const AVAILABILITY_QUERY: &str = "avg_over_time(up[1h])";

/// Queries host metrics through a tunnel's locally forwarded port.
pub struct MonitoringAdapter {
    client: reqwest::Client,
    base_url: String,
    power_idle: f64,
    power_max: f64,
}

#[derive(Deserialize)]
struct PromResponse {
    data: PromData,
}

#[derive(Deserialize)]
struct PromData {
    result: Vec<PromResult>,
}

#[derive(Deserialize)]
struct PromResult {
    metric: HashMap<String, String>,
    /// `[timestamp, value]`, value always comes back as a string.
    value: (f64, String),
}

impl MonitoringAdapter {
    pub fn new(local_port: u16, power_idle: f64, power_max: f64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .expect("reqwest client building never fails with only a timeout set");
        Self {
            client,
            base_url: format!("http://127.0.0.1:{local_port}"),
            power_idle,
            power_max,
        }
    }

    /// Fetch and merge every per-instance metric into host snapshots.
    /// Returns an empty list on any failure, per contract.
    pub async fn get_hosts(&self) -> Vec<HostSnapshot> {
        let (cpu, ram, disk, availability) = tokio::join!(
            self.query(CPU_QUERY),
            self.query(RAM_QUERY),
            self.query(DISK_QUERY),
            self.query(AVAILABILITY_QUERY),
        );

        let (cpu, ram, disk, availability) = match (cpu, ram, disk, availability) {
            (Ok(c), Ok(r), Ok(d), Ok(a)) => (c, r, d, a),
            _ => {
                warn!("monitoring query failed, returning no hosts");
                return Vec::new();
            }
        };

        let mut by_instance: HashMap<String, PartialHost> = HashMap::new();
        merge_into(&mut by_instance, &cpu, |h, v| h.cpu_pct = Some(v));
        merge_into(&mut by_instance, &ram, |h, v| h.ram_pct = Some(v));
        merge_into(&mut by_instance, &disk, |h, v| h.disk_pct = Some(v));
        merge_into(&mut by_instance, &availability, |h, v| h.availability = Some(v));

        by_instance
            .into_iter()
            .filter_map(|(instance, partial)| self.to_snapshot(&instance, partial))
            .collect()
    }

    async fn query(&self, promql: &str) -> Result<Vec<(String, f64)>, reqwest::Error> {
        let resp: PromResponse = self
            .client
            .get(format!("{}/api/v1/query", self.base_url))
            .query(&[("query", promql)])
            .send()
            .await?
            .json()
            .await?;

        Ok(resp
            .data
            .result
            .into_iter()
            .filter_map(|r| {
                let instance = r.metric.get("instance")?.clone();
                let value: f64 = r.value.1.parse().ok()?;
                Some((instance, value))
            })
            .collect())
    }

    fn to_snapshot(&self, instance: &str, partial: PartialHost) -> Option<HostSnapshot> {
        let ip_str = instance.split(':').next()?;
        let ip: std::net::Ipv4Addr = ip_str.parse().ok()?;
        let last_octet = ip.octets()[3];

        // Prometheus only gives us utilization ratios, not raw capacity.
        // Headroom (100 - usage) on a 0-100 scale stands in for capacity
        // here; the VHAM overcommit factors then apply on top of it the
        // same way they would on physical units.
        Some(HostSnapshot {
            id: format!("host{last_octet}"),
            ip,
            cpu_total: 100.0 - partial.cpu_pct.unwrap_or(0.0),
            ram_total: (1.0 - partial.ram_pct.unwrap_or(1.0)) * 100.0,
            storage_total: (1.0 - partial.disk_pct.unwrap_or(1.0)) * 100.0,
            availability: partial.availability.unwrap_or(0.0).clamp(0.0, 1.0),
            power_idle: self.power_idle,
            power_max: self.power_max,
        })
    }
}

#[derive(Default)]
struct PartialHost {
    cpu_pct: Option<f64>,
    ram_pct: Option<f64>,
    disk_pct: Option<f64>,
    availability: Option<f64>,
}

fn merge_into(
    by_instance: &mut HashMap<String, PartialHost>,
    samples: &[(String, f64)],
    set: impl Fn(&mut PartialHost, f64),
) {
    for (instance, value) in samples {
        let entry = by_instance.entry(instance.clone()).or_default();
        set(entry, *value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_id_derived_from_last_octet_not_full_instance_string() {
        let adapter = MonitoringAdapter::new(9999, 100.0, 250.0);
        let snapshot = adapter
            .to_snapshot(
                "10.0.0.42:9100",
                PartialHost {
                    cpu_pct: Some(10.0),
                    ram_pct: Some(0.2),
                    disk_pct: Some(0.1),
                    availability: Some(0.99),
                },
            )
            .unwrap();
        assert_eq!(snapshot.id, "host42");
        assert_eq!(snapshot.ip, std::net::Ipv4Addr::new(10, 0, 0, 42));
    }

    #[test]
    fn malformed_instance_label_is_skipped() {
        let adapter = MonitoringAdapter::new(9999, 100.0, 250.0);
        assert!(adapter.to_snapshot("not-an-ip", PartialHost::default()).is_none());
    }
}
