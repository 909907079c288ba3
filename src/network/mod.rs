//! Feed-forward network units evolved by the engine.
//!
//! A [`Network`] is one candidate in the population: a set of weight
//! matrices for either the single- or double-hidden-layer shape, plus the
//! optional activation cutoffs it was configured with. The engine relies
//! only on the operations here (forward transform, two-parent crossover,
//! per-weight mutation) and on the binary snapshot codec.

mod format;
mod matrix;

pub use format::{SNAPSHOT_MAGIC, SNAPSHOT_VERSION, SnapshotError};
pub use matrix::WeightMatrix;

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::schema::{NetworkTopology, Thresholds};

/// Logistic sigmoid.
#[inline]
fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Sigmoid a layer's raw sums, binarizing against `cutoff` when present.
fn activate(mut values: Vec<f64>, cutoff: Option<f64>) -> Vec<f64> {
    for value in &mut values {
        let activation = sigmoid(*value);
        *value = match cutoff {
            Some(cutoff) => {
                if activation > cutoff {
                    1.0
                } else {
                    0.0
                }
            }
            None => activation,
        };
    }
    values
}

/// One candidate network. The two variants carry the weight matrices for
/// the single- and double-hidden-layer shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Network {
    SingleHidden {
        input_to_hidden: WeightMatrix,
        hidden_to_output: WeightMatrix,
        thresholds: Thresholds,
    },
    DoubleHidden {
        input_to_hidden: WeightMatrix,
        hidden_to_second: WeightMatrix,
        second_to_output: WeightMatrix,
        thresholds: Thresholds,
    },
}

impl Network {
    /// Fresh network of the given shape with uniformly random weights.
    pub fn random(topology: &NetworkTopology, rng: &mut StdRng) -> Self {
        match topology.second_hidden {
            None => Network::SingleHidden {
                input_to_hidden: WeightMatrix::random(topology.hidden, topology.inputs, rng),
                hidden_to_output: WeightMatrix::random(topology.outputs, topology.hidden, rng),
                thresholds: topology.thresholds,
            },
            Some(second) => Network::DoubleHidden {
                input_to_hidden: WeightMatrix::random(topology.hidden, topology.inputs, rng),
                hidden_to_second: WeightMatrix::random(second, topology.hidden, rng),
                second_to_output: WeightMatrix::random(topology.outputs, second, rng),
                thresholds: topology.thresholds,
            },
        }
    }

    /// Reconstruct the topology from the stored matrix shapes.
    pub fn topology(&self) -> NetworkTopology {
        match self {
            Network::SingleHidden {
                input_to_hidden,
                hidden_to_output,
                thresholds,
            } => NetworkTopology {
                inputs: input_to_hidden.cols(),
                outputs: hidden_to_output.rows(),
                hidden: input_to_hidden.rows(),
                second_hidden: None,
                thresholds: *thresholds,
            },
            Network::DoubleHidden {
                input_to_hidden,
                hidden_to_second,
                second_to_output,
                thresholds,
            } => NetworkTopology {
                inputs: input_to_hidden.cols(),
                outputs: second_to_output.rows(),
                hidden: input_to_hidden.rows(),
                second_hidden: Some(hidden_to_second.rows()),
                thresholds: *thresholds,
            },
        }
    }

    /// Feed `input` through the network. `input` length must equal the
    /// input layer size.
    pub fn forward(&self, input: &[f64]) -> Vec<f64> {
        match self {
            Network::SingleHidden {
                input_to_hidden,
                hidden_to_output,
                thresholds,
            } => {
                let hidden = activate(input_to_hidden.apply(input), thresholds.hidden);
                activate(hidden_to_output.apply(&hidden), thresholds.output)
            }
            Network::DoubleHidden {
                input_to_hidden,
                hidden_to_second,
                second_to_output,
                thresholds,
            } => {
                let hidden = activate(input_to_hidden.apply(input), thresholds.hidden);
                let second = activate(hidden_to_second.apply(&hidden), thresholds.second_hidden);
                activate(second_to_output.apply(&second), thresholds.output)
            }
        }
    }

    /// Child combining this network's weights with `other`'s, matrix by
    /// matrix. Both parents must share a topology; the child keeps it.
    pub fn crossover(&self, other: &Self, rng: &mut StdRng) -> Self {
        match (self, other) {
            (
                Network::SingleHidden {
                    input_to_hidden: a1,
                    hidden_to_output: a2,
                    thresholds,
                },
                Network::SingleHidden {
                    input_to_hidden: b1,
                    hidden_to_output: b2,
                    ..
                },
            ) => Network::SingleHidden {
                input_to_hidden: a1.crossover(b1, rng),
                hidden_to_output: a2.crossover(b2, rng),
                thresholds: *thresholds,
            },
            (
                Network::DoubleHidden {
                    input_to_hidden: a1,
                    hidden_to_second: a2,
                    second_to_output: a3,
                    thresholds,
                },
                Network::DoubleHidden {
                    input_to_hidden: b1,
                    hidden_to_second: b2,
                    second_to_output: b3,
                    ..
                },
            ) => Network::DoubleHidden {
                input_to_hidden: a1.crossover(b1, rng),
                hidden_to_second: a2.crossover(b2, rng),
                second_to_output: a3.crossover(b3, rng),
                thresholds: *thresholds,
            },
            _ => panic!("crossover requires networks of the same shape"),
        }
    }

    /// Perturb weights in place at `rate` percent per weight. The shape
    /// never changes.
    pub fn mutate(&mut self, rate: u8, rng: &mut StdRng) {
        for matrix in self.matrices_mut() {
            matrix.mutate(rate, rng);
        }
    }

    /// The weight matrices, input side first.
    pub fn matrices(&self) -> Vec<&WeightMatrix> {
        match self {
            Network::SingleHidden {
                input_to_hidden,
                hidden_to_output,
                ..
            } => vec![input_to_hidden, hidden_to_output],
            Network::DoubleHidden {
                input_to_hidden,
                hidden_to_second,
                second_to_output,
                ..
            } => vec![input_to_hidden, hidden_to_second, second_to_output],
        }
    }

    fn matrices_mut(&mut self) -> Vec<&mut WeightMatrix> {
        match self {
            Network::SingleHidden {
                input_to_hidden,
                hidden_to_output,
                ..
            } => vec![input_to_hidden, hidden_to_output],
            Network::DoubleHidden {
                input_to_hidden,
                hidden_to_second,
                second_to_output,
                ..
            } => vec![input_to_hidden, hidden_to_second, second_to_output],
        }
    }

    fn thresholds(&self) -> &Thresholds {
        match self {
            Network::SingleHidden { thresholds, .. } => thresholds,
            Network::DoubleHidden { thresholds, .. } => thresholds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn single_topology() -> NetworkTopology {
        NetworkTopology {
            inputs: 3,
            outputs: 2,
            hidden: 4,
            second_hidden: None,
            thresholds: Thresholds::default(),
        }
    }

    fn double_topology() -> NetworkTopology {
        NetworkTopology {
            inputs: 3,
            outputs: 2,
            hidden: 4,
            second_hidden: Some(5),
            thresholds: Thresholds {
                hidden: Some(0.5),
                second_hidden: Some(0.4),
                output: None,
            },
        }
    }

    #[test]
    fn test_random_preserves_topology() {
        let mut rng = StdRng::seed_from_u64(42);
        for topology in [single_topology(), double_topology()] {
            let net = Network::random(&topology, &mut rng);
            assert_eq!(net.topology(), topology);
        }
    }

    #[test]
    fn test_forward_output_size() {
        let mut rng = StdRng::seed_from_u64(1);
        let net = Network::random(&double_topology(), &mut rng);
        let out = net.forward(&[0.2, -0.4, 0.9]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_forward_threshold_binarizes() {
        let mut topology = single_topology();
        topology.thresholds.output = Some(0.5);
        let mut rng = StdRng::seed_from_u64(2);
        let net = Network::random(&topology, &mut rng);
        let out = net.forward(&[1.0, 0.0, -1.0]);
        assert!(out.iter().all(|v| *v == 0.0 || *v == 1.0));
    }

    #[test]
    fn test_forward_sigmoid_range() {
        let mut rng = StdRng::seed_from_u64(9);
        let net = Network::random(&single_topology(), &mut rng);
        let out = net.forward(&[10.0, -10.0, 3.0]);
        assert!(out.iter().all(|v| *v > 0.0 && *v < 1.0));
    }

    #[test]
    fn test_crossover_preserves_topology_and_weights() {
        let mut rng = StdRng::seed_from_u64(5);
        let topology = double_topology();
        let a = Network::random(&topology, &mut rng);
        let b = Network::random(&topology, &mut rng);
        let child = a.crossover(&b, &mut rng);
        assert_eq!(child.topology(), topology);

        for ((cm, am), bm) in child
            .matrices()
            .iter()
            .zip(a.matrices())
            .zip(b.matrices())
        {
            for ((c, pa), pb) in cm.weights().iter().zip(am.weights()).zip(bm.weights()) {
                assert!(c == pa || c == pb, "child weight not inherited");
            }
        }
    }

    #[test]
    fn test_mutate_preserves_topology() {
        let mut rng = StdRng::seed_from_u64(6);
        let topology = single_topology();
        let mut net = Network::random(&topology, &mut rng);
        let before = net.clone();
        net.mutate(99, &mut rng);
        assert_eq!(net.topology(), topology);
        assert_ne!(net, before);
    }
}
