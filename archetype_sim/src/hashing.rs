use std::hash::Hasher;

use serde::Serialize;

/// FNV-1a 64-bit hasher.
///
/// Stable across processes and platforms, unlike `DefaultHasher`; used to
/// derive per-simulation seeds and to fingerprint results.
#[derive(Debug, Clone, Copy)]
pub struct Fnv1aHasher {
    state: u64,
}

impl Fnv1aHasher {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    pub fn new() -> Self {
        Self {
            state: Self::OFFSET_BASIS,
        }
    }
}

impl Default for Fnv1aHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for Fnv1aHasher {
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        self.state = bytes.iter().fold(self.state, |state, &byte| {
            (state ^ u64::from(byte)).wrapping_mul(Self::PRIME)
        });
    }
}

/// Seed of the independent random stream owned by one simulation.
pub fn simulation_seed(base_seed: u64, simulation: usize) -> u64 {
    let mut hasher = Fnv1aHasher::new();
    hasher.write(&base_seed.to_le_bytes());
    hasher.write(&(simulation as u64).to_le_bytes());
    hasher.finish()
}

/// Fingerprint of any serializable value via its bincode encoding.
pub fn digest<T: Serialize + ?Sized>(value: &T) -> bincode::Result<u64> {
    let encoded = bincode::serialize(value)?;
    let mut hasher = Fnv1aHasher::new();
    hasher.write(&encoded);
    Ok(hasher.finish())
}
