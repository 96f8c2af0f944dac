//! Virtual Host Availability Model: resource overcommit and host scoring.

use slicectl_core::types::HostSnapshot;

/// CPU overcommit factor applied to physical capacity.
pub const CPU_OVERCOMMIT: f64 = 1.2;
/// RAM overcommit factor applied to physical capacity.
pub const RAM_OVERCOMMIT: f64 = 1.5;
/// Storage overcommit factor applied to physical capacity (no overcommit).
pub const STORAGE_OVERCOMMIT: f64 = 1.0;

/// A host with its virtual capacities and VHAM score computed.
#[derive(Debug, Clone)]
pub struct ScoredHost {
    pub id: String,
    pub cpu_virtual: f64,
    pub ram_virtual: f64,
    pub storage_virtual: f64,
    pub availability: f64,
    pub power_idle: f64,
    pub power_max: f64,
    pub vham: f64,
}

/// Compute virtual capacities and VHAM scores for every host, then sort
/// descending by score. The returned order is the stable index space used
/// by GA chromosomes.
pub fn score_and_sort(hosts: &[HostSnapshot]) -> Vec<ScoredHost> {
    let max_cpu_virtual = hosts
        .iter()
        .map(|h| h.cpu_total * CPU_OVERCOMMIT)
        .fold(0.0_f64, f64::max)
        .max(f64::EPSILON);
    let max_power_max = hosts
        .iter()
        .map(|h| h.power_max)
        .fold(0.0_f64, f64::max)
        .max(f64::EPSILON);

    let mut scored: Vec<ScoredHost> = hosts
        .iter()
        .map(|h| {
            let cpu_virtual = h.cpu_total * CPU_OVERCOMMIT;
            let ram_virtual = h.ram_total * RAM_OVERCOMMIT;
            let storage_virtual = h.storage_total * STORAGE_OVERCOMMIT;
            let vham = 0.6 * (cpu_virtual / max_cpu_virtual) + 0.3 * h.availability
                - 0.1 * (h.power_max / max_power_max);
            ScoredHost {
                id: h.id.clone(),
                cpu_virtual,
                ram_virtual,
                storage_virtual,
                availability: h.availability,
                power_idle: h.power_idle,
                power_max: h.power_max,
                vham,
            }
        })
        .collect();

    scored.sort_by(|a, b| b.vham.partial_cmp(&a.vham).unwrap_or(std::cmp::Ordering::Equal));
    scored
}

/// Seeding weights: vham scores clamped to a small positive epsilon so a
/// weighted sampler over them is always well-defined.
pub fn seeding_weights(scored: &[ScoredHost]) -> Vec<f64> {
    scored.iter().map(|h| h.vham.max(1e-6)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(id: &str, cpu: f64, avail: f64, power_max: f64) -> HostSnapshot {
        HostSnapshot {
            id: id.to_string(),
            ip: std::net::Ipv4Addr::new(10, 0, 0, 1),
            cpu_total: cpu,
            ram_total: 16.0,
            storage_total: 100.0,
            availability: avail,
            power_idle: 100.0,
            power_max,
        }
    }

    #[test]
    fn sorts_by_vham_descending() {
        let hosts = vec![
            host("host1", 4.0, 0.5, 250.0),
            host("host2", 10.0, 0.99, 250.0),
        ];
        let scored = score_and_sort(&hosts);
        assert_eq!(scored[0].id, "host2");
        assert!(scored[0].vham > scored[1].vham);
    }

    #[test]
    fn applies_overcommit_factors() {
        let hosts = vec![host("host1", 10.0, 0.9, 250.0)];
        let scored = score_and_sort(&hosts);
        assert_eq!(scored[0].cpu_virtual, 12.0);
        assert_eq!(scored[0].ram_virtual, 24.0);
        assert_eq!(scored[0].storage_virtual, 100.0);
    }

    #[test]
    fn negative_vham_clamped_for_seeding() {
        // A host with zero cpu/availability and max power still needs a
        // strictly positive seeding weight.
        let hosts = vec![host("host1", 0.0, 0.0, 250.0), host("host2", 10.0, 0.9, 100.0)];
        let scored = score_and_sort(&hosts);
        let weights = seeding_weights(&scored);
        assert!(weights.iter().all(|&w| w > 0.0));
    }
}
