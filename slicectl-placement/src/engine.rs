//! The I-GA placement engine itself: population seeding, selection,
//! crossover, mutation, and fitness evaluation over the VHAM-scored host
//! list.

use std::collections::HashMap;

use rand::distributions::{Distribution, WeightedIndex};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use slicectl_core::types::{HostAssignment, HostSnapshot, PlacementResult, VmDemand};

use crate::vham::{score_and_sort, seeding_weights, ScoredHost};

const POPULATION: usize = 50;
const GENERATIONS: usize = 100;
const ELITES: usize = 5;
const MUTATION_RATE: f64 = 0.2;

/// Errors the Placement Engine can return.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PlacementError {
    /// No candidate hosts were supplied.
    #[error("no hosts available for placement")]
    NoHosts,
}

/// A candidate solution: chromosome[i] is the index into the VHAM-sorted
/// host list assigned to VM i.
type Chromosome = Vec<usize>;

/// I-GA placement engine.
pub struct PlacementEngine {
    seed: u64,
}

impl PlacementEngine {
    /// Build an engine seeded for reproducible runs. The same seed and
    /// inputs always produce the same chromosome and metrics.
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Run the I-GA over `vms` against `hosts`, returning the assignment
    /// with minimum fitness found over a fixed number of generations.
    pub fn place(
        &self,
        vms: &[VmDemand],
        hosts: &[HostSnapshot],
    ) -> Result<PlacementResult, PlacementError> {
        if hosts.is_empty() {
            return Err(PlacementError::NoHosts);
        }
        if vms.is_empty() {
            return Ok(PlacementResult {
                assignment: HashMap::new(),
                hosts: Vec::new(),
                total_energy: 0.0,
                total_availability: 1.0,
                fitness_score: 0.0,
            });
        }

        let scored = score_and_sort(hosts);
        let weights = seeding_weights(&scored);
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        let mut population: Vec<Chromosome> = (0..POPULATION)
            .map(|_| seed_chromosome(vms.len(), &weights, &mut rng))
            .collect();

        for _ in 0..GENERATIONS {
            let mut scored_pop: Vec<(f64, Chromosome)> = population
                .into_iter()
                .map(|c| (fitness(&c, vms, &scored), c))
                .collect();
            scored_pop
                .sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

            let elites: Vec<Chromosome> = scored_pop
                .iter()
                .take(ELITES.min(scored_pop.len()))
                .map(|(_, c)| c.clone())
                .collect();

            let mut next_gen = elites.clone();
            while next_gen.len() < POPULATION {
                let (p1, p2) = pick_parents(&elites, &mut rng);
                let mut child = crossover(p1, p2, &mut rng);
                mutate(&mut child, scored.len(), &mut rng);
                next_gen.push(child);
            }
            population = next_gen;
        }

        let best = population
            .into_iter()
            .map(|c| (fitness(&c, vms, &scored), c))
            .min_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
            .expect("population is never empty");

        Ok(build_result(&best.1, best.0, vms, &scored))
    }
}

fn seed_chromosome(n_vms: usize, weights: &[f64], rng: &mut ChaCha8Rng) -> Chromosome {
    let dist = WeightedIndex::new(weights).expect("weights are all strictly positive");
    (0..n_vms).map(|_| dist.sample(rng)).collect()
}

fn pick_parents<'a>(elites: &'a [Chromosome], rng: &mut ChaCha8Rng) -> (&'a Chromosome, &'a Chromosome) {
    if elites.len() == 1 {
        return (&elites[0], &elites[0]);
    }
    let i = rng.gen_range(0..elites.len());
    let mut j = rng.gen_range(0..elites.len());
    while j == i {
        j = rng.gen_range(0..elites.len());
    }
    (&elites[i], &elites[j])
}

fn crossover(p1: &Chromosome, p2: &Chromosome, rng: &mut ChaCha8Rng) -> Chromosome {
    let n = p1.len();
    if n < 2 {
        return p1.clone();
    }
    let point = rng.gen_range(0..(n / 2).max(1));
    let mut child = Vec::with_capacity(n);
    child.extend_from_slice(&p1[..point]);
    child.extend_from_slice(&p2[point..]);
    child
}

fn mutate(chromosome: &mut Chromosome, n_hosts: usize, rng: &mut ChaCha8Rng) {
    for gene in chromosome.iter_mut() {
        if rng.gen_bool(MUTATION_RATE) {
            *gene = rng.gen_range(0..n_hosts);
        }
    }
}

/// CPU used per host for a chromosome, keyed by host index.
fn cpu_used_per_host(chromosome: &Chromosome, vms: &[VmDemand]) -> HashMap<usize, f64> {
    let mut used: HashMap<usize, f64> = HashMap::new();
    for (vm, &host_idx) in vms.iter().zip(chromosome.iter()) {
        *used.entry(host_idx).or_insert(0.0) += vm.cpu;
    }
    used
}

fn fitness(chromosome: &Chromosome, vms: &[VmDemand], hosts: &[ScoredHost]) -> f64 {
    let used = cpu_used_per_host(chromosome, vms);
    let active: Vec<(usize, f64)> = used
        .into_iter()
        .filter(|&(_, cpu_used)| cpu_used > 0.0)
        .collect();

    if active.is_empty() {
        return f64::INFINITY;
    }

    let e_min = hosts
        .iter()
        .map(|h| h.power_idle)
        .fold(f64::INFINITY, f64::min);

    let mut total_energy = 0.0;
    let mut total_availability = 1.0;
    for &(host_idx, cpu_used) in &active {
        let h = &hosts[host_idx];
        let rho = cpu_used / h.cpu_virtual;
        total_energy += h.power_idle + (h.power_max - h.power_idle) * rho.powi(3);
        total_availability *= h.availability;
    }

    let g = 0.5 * (e_min / total_energy + total_availability);
    1.0 / g
}

fn build_result(
    chromosome: &Chromosome,
    fitness_score: f64,
    vms: &[VmDemand],
    hosts: &[ScoredHost],
) -> PlacementResult {
    let mut assignment = HashMap::new();
    let mut names_per_host: HashMap<usize, Vec<String>> = HashMap::new();
    for (vm, &host_idx) in vms.iter().zip(chromosome.iter()) {
        assignment.insert(vm.id, hosts[host_idx].id.clone());
        names_per_host
            .entry(host_idx)
            .or_default()
            .push(vm.name.clone());
    }

    let used = cpu_used_per_host(chromosome, vms);
    let mut host_assignments: Vec<HostAssignment> = (0..hosts.len())
        .map(|host_idx| {
            let h = &hosts[host_idx];
            let cpu_used = used.get(&host_idx).copied().unwrap_or(0.0);
            let rho = cpu_used / h.cpu_virtual;
            let energy = h.power_idle + (h.power_max - h.power_idle) * rho.powi(3);
            HostAssignment {
                host_id: h.id.clone(),
                cpu_ratio: rho,
                energy,
                availability: h.availability,
                vm_names: names_per_host.remove(&host_idx).unwrap_or_default(),
            }
        })
        .collect();
    host_assignments.sort_by(|a, b| a.host_id.cmp(&b.host_id));

    // total_energy sums every candidate host (idle hosts still draw power_idle);
    // total_availability stays a product over hosts that actually received a VM.
    let total_energy: f64 = host_assignments.iter().map(|h| h.energy).sum();
    let total_availability: f64 = host_assignments
        .iter()
        .filter(|h| !h.vm_names.is_empty())
        .map(|h| h.availability)
        .product();

    PlacementResult {
        assignment,
        hosts: host_assignments,
        total_energy,
        total_availability,
        fitness_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(id: &str, cpu: f64, avail: f64) -> HostSnapshot {
        HostSnapshot {
            id: id.to_string(),
            ip: std::net::Ipv4Addr::new(10, 0, 0, 1),
            cpu_total: cpu,
            ram_total: 20.0,
            storage_total: 100.0,
            availability: avail,
            power_idle: 100.0,
            power_max: 250.0,
        }
    }

    fn vm(id: i64, name: &str, cpu: f64) -> VmDemand {
        VmDemand {
            id,
            name: name.to_string(),
            cpu,
            ram: 512.0,
            storage: 5.0,
        }
    }

    #[test]
    fn zero_hosts_is_an_error() {
        let engine = PlacementEngine::new(1);
        let err = engine.place(&[vm(1, "a", 2.0)], &[]).unwrap_err();
        assert!(matches!(err, PlacementError::NoHosts));
    }

    #[test]
    fn zero_vms_is_empty_result() {
        let engine = PlacementEngine::new(1);
        let result = engine.place(&[], &[host("h1", 10.0, 0.9)]).unwrap();
        assert!(result.assignment.is_empty());
        assert!(result.hosts.is_empty());
    }

    #[test]
    fn single_host_assigns_every_vm_to_it() {
        let engine = PlacementEngine::new(42);
        let hosts = vec![host("h1", 10.0, 0.9)];
        let vms = vec![vm(1, "a", 2.0), vm(2, "b", 2.0)];
        let result = engine.place(&vms, &hosts).unwrap();
        assert_eq!(result.assignment.len(), 2);
        assert!(result.assignment.values().all(|h| h == "h1"));
    }

    #[test]
    fn every_vm_assigned_exactly_once_to_a_known_host() {
        let engine = PlacementEngine::new(7);
        let hosts = vec![host("h1", 10.0, 0.9), host("h2", 10.0, 0.95)];
        let vms: Vec<VmDemand> = (0..5).map(|i| vm(i, &format!("vm{i}"), 2.0)).collect();
        let result = engine.place(&vms, &hosts).unwrap();
        assert_eq!(result.assignment.len(), 5);
        let host_ids: Vec<&str> = hosts.iter().map(|h| h.id.as_str()).collect();
        for assigned in result.assignment.values() {
            assert!(host_ids.contains(&assigned.as_str()));
        }
    }

    #[test]
    fn deterministic_under_fixed_seed() {
        let hosts = vec![host("h1", 10.0, 0.9), host("h2", 10.0, 0.95)];
        let vms: Vec<VmDemand> = (0..6).map(|i| vm(i, &format!("vm{i}"), 1.5)).collect();

        let a = PlacementEngine::new(99).place(&vms, &hosts).unwrap();
        let b = PlacementEngine::new(99).place(&vms, &hosts).unwrap();

        assert_eq!(a.assignment, b.assignment);
        assert_eq!(a.fitness_score, b.fitness_score);
    }

    #[test]
    fn higher_availability_host_yields_lower_fitness_when_fully_packed() {
        let n_vms = 4;
        let vms: Vec<VmDemand> = (0..n_vms).map(|i| vm(i, &format!("vm{i}"), 2.0)).collect();

        let high_avail = vec![host("h1", 10.0, 0.99)];
        let low_avail = vec![host("h1", 10.0, 0.50)];

        let chromosome = vec![0usize; n_vms as usize];
        let scored_high = score_and_sort(&high_avail);
        let scored_low = score_and_sort(&low_avail);

        let f_high = fitness(&chromosome, &vms, &scored_high);
        let f_low = fitness(&chromosome, &vms, &scored_low);

        assert!(f_high < f_low);
    }

    #[test]
    fn crossover_is_noop_copy_for_single_vm() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let p1 = vec![0usize];
        let p2 = vec![1usize];
        let child = crossover(&p1, &p2, &mut rng);
        assert_eq!(child, p1);
    }
}
