//! Binary snapshot format for a single network's topology and weights.

use std::io::{self, Read, Write};

use crate::schema::ConfigError;

use super::{Network, WeightMatrix};

/// Magic bytes identifying a network snapshot.
pub const SNAPSHOT_MAGIC: &[u8; 4] = b"NEVO";

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u16 = 1;

const SHAPE_SINGLE: u8 = 1;
const SHAPE_DOUBLE: u8 = 2;

/// Errors reading a network snapshot. A malformed or truncated stream
/// yields one of these, never a partially-built network.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("not a network snapshot (bad magic bytes)")]
    BadMagic,
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u16),
    #[error("unknown network shape tag {0}")]
    UnknownShape(u8),
    #[error("snapshot rejected: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

fn write_u32<W: Write>(w: &mut W, value: u32) -> io::Result<()> {
    w.write_all(&value.to_le_bytes())
}

fn write_threshold<W: Write>(w: &mut W, threshold: Option<f64>) -> io::Result<()> {
    match threshold {
        Some(value) => {
            w.write_all(&[1])?;
            w.write_all(&value.to_le_bytes())
        }
        None => {
            w.write_all(&[0])?;
            w.write_all(&0f64.to_le_bytes())
        }
    }
}

fn write_matrix<W: Write>(w: &mut W, matrix: &WeightMatrix) -> io::Result<()> {
    for weight in matrix.weights() {
        w.write_all(&weight.to_le_bytes())?;
    }
    Ok(())
}

fn read_u8<R: Read>(r: &mut R) -> io::Result<u8> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_u16<R: Read>(r: &mut R) -> io::Result<u16> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

fn read_u32<R: Read>(r: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_f64<R: Read>(r: &mut R) -> io::Result<f64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

fn read_threshold<R: Read>(r: &mut R) -> io::Result<Option<f64>> {
    let present = read_u8(r)?;
    let value = read_f64(r)?;
    Ok((present != 0).then_some(value))
}

fn read_matrix<R: Read>(r: &mut R, rows: usize, cols: usize) -> io::Result<WeightMatrix> {
    let mut data = Vec::with_capacity(rows * cols);
    for _ in 0..rows * cols {
        data.push(read_f64(r)?);
    }
    Ok(WeightMatrix::from_parts(rows, cols, data))
}

impl Network {
    /// Write a snapshot of this network's topology and weights.
    ///
    /// Layout: magic, version, shape tag, layer sizes (u32 LE), three
    /// threshold slots (presence byte + f64 LE), then the weight matrices
    /// in forward order as f64 LE, row-major.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(SNAPSHOT_MAGIC)?;
        w.write_all(&SNAPSHOT_VERSION.to_le_bytes())?;

        let topology = self.topology();
        match topology.second_hidden {
            None => {
                w.write_all(&[SHAPE_SINGLE])?;
                write_u32(w, topology.inputs as u32)?;
                write_u32(w, topology.hidden as u32)?;
                write_u32(w, topology.outputs as u32)?;
            }
            Some(second) => {
                w.write_all(&[SHAPE_DOUBLE])?;
                write_u32(w, topology.inputs as u32)?;
                write_u32(w, topology.hidden as u32)?;
                write_u32(w, second as u32)?;
                write_u32(w, topology.outputs as u32)?;
            }
        }

        let thresholds = self.thresholds();
        write_threshold(w, thresholds.hidden)?;
        write_threshold(w, thresholds.second_hidden)?;
        write_threshold(w, thresholds.output)?;

        for matrix in self.matrices() {
            write_matrix(w, matrix)?;
        }
        Ok(())
    }

    /// Read a snapshot written by [`Network::write_to`]. The declared
    /// topology is re-validated, so a stream describing an impossible
    /// network is rejected rather than materialized.
    pub fn read_from<R: Read>(r: &mut R) -> Result<Self, SnapshotError> {
        let mut magic = [0u8; 4];
        r.read_exact(&mut magic)?;
        if &magic != SNAPSHOT_MAGIC {
            return Err(SnapshotError::BadMagic);
        }

        let version = read_u16(r)?;
        if version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(version));
        }

        let shape = read_u8(r)?;
        let (inputs, hidden, second_hidden, outputs) = match shape {
            SHAPE_SINGLE => {
                let inputs = read_u32(r)? as usize;
                let hidden = read_u32(r)? as usize;
                let outputs = read_u32(r)? as usize;
                (inputs, hidden, None, outputs)
            }
            SHAPE_DOUBLE => {
                let inputs = read_u32(r)? as usize;
                let hidden = read_u32(r)? as usize;
                let second = read_u32(r)? as usize;
                let outputs = read_u32(r)? as usize;
                (inputs, hidden, Some(second), outputs)
            }
            other => return Err(SnapshotError::UnknownShape(other)),
        };

        let thresholds = crate::schema::Thresholds {
            hidden: read_threshold(r)?,
            second_hidden: read_threshold(r)?,
            output: read_threshold(r)?,
        };

        let topology = crate::schema::NetworkTopology {
            inputs,
            outputs,
            hidden,
            second_hidden,
            thresholds,
        };
        topology.validate()?;

        let network = match second_hidden {
            None => Network::SingleHidden {
                input_to_hidden: read_matrix(r, hidden, inputs)?,
                hidden_to_output: read_matrix(r, outputs, hidden)?,
                thresholds,
            },
            Some(second) => Network::DoubleHidden {
                input_to_hidden: read_matrix(r, hidden, inputs)?,
                hidden_to_second: read_matrix(r, second, hidden)?,
                second_to_output: read_matrix(r, outputs, second)?,
                thresholds,
            },
        };
        Ok(network)
    }

    /// Snapshot as an owned byte buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)
            .expect("writing to a Vec cannot fail");
        buf
    }

    /// Rebuild a network from a snapshot byte buffer.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let mut cursor = io::Cursor::new(bytes);
        Self::read_from(&mut cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{NetworkTopology, Thresholds};
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn sample_network(second_hidden: Option<usize>) -> Network {
        let topology = NetworkTopology {
            inputs: 3,
            outputs: 2,
            hidden: 4,
            second_hidden,
            thresholds: Thresholds {
                hidden: Some(0.3),
                second_hidden: second_hidden.map(|_| 0.6),
                output: None,
            },
        };
        Network::random(&topology, &mut StdRng::seed_from_u64(42))
    }

    #[test]
    fn test_roundtrip_single_hidden() {
        let net = sample_network(None);
        let decoded = Network::from_bytes(&net.to_bytes()).unwrap();
        assert_eq!(decoded, net);
    }

    #[test]
    fn test_roundtrip_double_hidden() {
        let net = sample_network(Some(5));
        let decoded = Network::from_bytes(&net.to_bytes()).unwrap();
        assert_eq!(decoded, net);
    }

    #[test]
    fn test_bad_magic_rejected() {
        let mut bytes = sample_network(None).to_bytes();
        bytes[0] = b'X';
        assert!(matches!(
            Network::from_bytes(&bytes),
            Err(SnapshotError::BadMagic)
        ));
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let mut bytes = sample_network(None).to_bytes();
        bytes[4] = 0xFF;
        assert!(matches!(
            Network::from_bytes(&bytes),
            Err(SnapshotError::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn test_unknown_shape_rejected() {
        let mut bytes = sample_network(None).to_bytes();
        bytes[6] = 9;
        assert!(matches!(
            Network::from_bytes(&bytes),
            Err(SnapshotError::UnknownShape(9))
        ));
    }

    #[test]
    fn test_truncated_stream_rejected() {
        let bytes = sample_network(Some(5)).to_bytes();
        let truncated = &bytes[..bytes.len() - 9];
        assert!(matches!(
            Network::from_bytes(truncated),
            Err(SnapshotError::Io(_))
        ));
    }

    #[test]
    fn test_invalid_declared_topology_rejected() {
        let mut bytes = sample_network(None).to_bytes();
        // Zero out the declared input layer size.
        bytes[7..11].copy_from_slice(&0u32.to_le_bytes());
        assert!(matches!(
            Network::from_bytes(&bytes),
            Err(SnapshotError::Config(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_roundtrip_preserves_network(
            inputs in 1usize..6,
            outputs in 1usize..6,
            hidden in 1usize..6,
            second in prop::option::of(1usize..6),
            seed in any::<u64>(),
        ) {
            let topology = NetworkTopology {
                inputs,
                outputs,
                hidden,
                second_hidden: second,
                thresholds: Thresholds::default(),
            };
            let net = Network::random(&topology, &mut StdRng::seed_from_u64(seed));
            let decoded = Network::from_bytes(&net.to_bytes()).unwrap();
            prop_assert_eq!(decoded, net);
        }
    }
}
