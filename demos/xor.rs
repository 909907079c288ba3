//! Evolve a small feed-forward network toward XOR.

use std::thread;
use std::time::Duration;

use neuroevo::{
    EvolutionRunner, EvolutionSettings, FitnessError, NetworkTopology, Thresholds,
};

const CASES: [([f64; 2], f64); 4] = [
    ([0.0, 0.0], 0.0),
    ([0.0, 1.0], 1.0),
    ([1.0, 0.0], 1.0),
    ([1.0, 1.0], 0.0),
];

/// Score = 4 minus the summed squared error over the four XOR cases, so a
/// perfect network scores 4.0.
fn xor_score(
    _identity: usize,
    forward: &dyn Fn(&[f64]) -> Vec<f64>,
) -> Result<f64, FitnessError> {
    let error: f64 = CASES
        .iter()
        .map(|(input, expected)| {
            let output = forward(input)[0];
            (output - expected).powi(2)
        })
        .sum();
    Ok(4.0 - error)
}

fn main() {
    env_logger::init();

    let topology = NetworkTopology {
        inputs: 2,
        outputs: 1,
        hidden: 4,
        second_hidden: Some(3),
        thresholds: Thresholds::default(),
    };
    let mut settings = EvolutionSettings::new(topology);
    settings.population_size = 150;
    settings.mutation_rate = 10;
    settings.elite_count = 4;
    settings.seed = Some(42);

    let runner = EvolutionRunner::new(settings, xor_score).expect("settings are valid");
    runner.on_progress(|report| {
        if report.generation % 25 == 0 {
            println!(
                "generation {:>5}: best {:.4}, mean {:.4}, all-time {:.4}",
                report.generation, report.best_score, report.mean_score, report.all_time_best
            );
        }
    });
    runner.on_best_network(|_, score| {
        println!("  new best score: {score:.4}");
    });

    assert!(runner.start());
    thread::sleep(Duration::from_secs(5));
    assert!(runner.stop());
    runner.wait();

    println!();
    println!(
        "evolved for {} generations, best fitness {:.4}",
        runner.generation(),
        runner.best_fitness().unwrap_or(f64::MIN)
    );

    if let Some(best) = runner.best_network() {
        for (input, expected) in &CASES {
            let output = best.forward(input)[0];
            println!("  {input:?} -> {output:.3} (want {expected})");
        }
    }
}
