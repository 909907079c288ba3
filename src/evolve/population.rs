//! Population construction: fresh random cohorts and rebuilds around a
//! single seed network.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::network::Network;
use crate::schema::EvolutionSettings;

/// Build `population_size` fresh networks of the configured topology.
/// Each network is randomized from its own seeded RNG; none share weight
/// storage.
pub(crate) fn initialize(settings: &EvolutionSettings, rng: &mut StdRng) -> Vec<Network> {
    let seeds: Vec<u64> = (0..settings.population_size).map(|_| rng.r#gen()).collect();
    seeds
        .into_par_iter()
        .map(|seed| Network::random(&settings.topology, &mut StdRng::seed_from_u64(seed)))
        .collect()
}

/// Rebuild a population around one existing network: slot 0 keeps it
/// unchanged, every other slot holds a mutated copy driven by its own
/// slot-derived RNG.
pub(crate) fn reconstruct(
    seed_network: Network,
    settings: &EvolutionSettings,
    base_seed: u64,
) -> Vec<Network> {
    let rate = settings.mutation_rate;
    let copies: Vec<Network> = (1..settings.population_size)
        .into_par_iter()
        .map(|slot| {
            let mut copy = seed_network.clone();
            copy.mutate(rate, &mut StdRng::seed_from_u64(slot_seed(base_seed, slot)));
            copy
        })
        .collect();

    let mut population = Vec::with_capacity(settings.population_size);
    population.push(seed_network);
    population.extend(copies);
    population
}

/// splitmix64 over (base, slot): an independent seed stream per slot.
fn slot_seed(base: u64, slot: usize) -> u64 {
    let mut z = base.wrapping_add((slot as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{NetworkTopology, Thresholds};

    fn settings() -> EvolutionSettings {
        let mut settings = EvolutionSettings::new(NetworkTopology {
            inputs: 3,
            outputs: 2,
            hidden: 4,
            second_hidden: Some(3),
            thresholds: Thresholds::default(),
        });
        settings.population_size = 12;
        settings.mutation_rate = 50;
        settings
    }

    #[test]
    fn test_initialize_count_and_topology() {
        let settings = settings();
        let mut rng = StdRng::seed_from_u64(42);
        let population = initialize(&settings, &mut rng);
        assert_eq!(population.len(), settings.population_size);
        for net in &population {
            assert_eq!(net.topology(), settings.topology);
        }
    }

    #[test]
    fn test_initialize_units_are_independent() {
        let settings = settings();
        let mut rng = StdRng::seed_from_u64(42);
        let population = initialize(&settings, &mut rng);
        // Independent seeds make identical siblings vanishingly unlikely.
        assert_ne!(population[0], population[1]);
    }

    #[test]
    fn test_reconstruct_keeps_seed_in_slot_zero() {
        let settings = settings();
        let mut rng = StdRng::seed_from_u64(7);
        let seed_net = Network::random(&settings.topology, &mut rng);
        let population = reconstruct(seed_net.clone(), &settings, 99);
        assert_eq!(population.len(), settings.population_size);
        assert_eq!(population[0], seed_net);
    }

    #[test]
    fn test_reconstruct_fills_every_other_slot_with_mutants() {
        let settings = settings();
        let mut rng = StdRng::seed_from_u64(7);
        let seed_net = Network::random(&settings.topology, &mut rng);
        let population = reconstruct(seed_net.clone(), &settings, 99);
        for (slot, net) in population.iter().enumerate().skip(1) {
            assert_eq!(net.topology(), settings.topology);
            assert_ne!(net, &seed_net, "slot {slot} should differ from the seed");
        }
    }

    #[test]
    fn test_reconstruct_single_slot_population() {
        let mut settings = settings();
        settings.population_size = 1;
        settings.elite_count = 0;
        let mut rng = StdRng::seed_from_u64(7);
        let seed_net = Network::random(&settings.topology, &mut rng);
        let population = reconstruct(seed_net.clone(), &settings, 1);
        assert_eq!(population, vec![seed_net]);
    }
}
