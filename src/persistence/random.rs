//! Snapshot of the gameplay random generator
//!
//! The generator's internal state is stored as an opaque fixed-size blob so
//! that randomness resumes exactly where it left off after a load.

use rand_pcg::Pcg32;

use super::error::{PersistError, Result};

/// Size of the blob in the save stream (`Pcg32` state + increment)
pub const RANDOM_STATE_SIZE: usize = 16;

/// Opaque generator state as written to disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomState([u8; RANDOM_STATE_SIZE]);

impl RandomState {
    /// Capture the current state of a generator
    pub fn capture(rng: &Pcg32) -> Result<Self> {
        let bytes = bincode::serialize(rng)?;
        let bytes: [u8; RANDOM_STATE_SIZE] = bytes.try_into().map_err(|b: Vec<u8>| {
            PersistError::RandomState(Box::new(bincode::ErrorKind::Custom(format!(
                "expected {RANDOM_STATE_SIZE} bytes of generator state, got {}",
                b.len()
            ))))
        })?;
        Ok(Self(bytes))
    }

    /// Rebuild a generator positioned exactly where the captured one was
    pub fn restore(&self) -> Result<Pcg32> {
        Ok(bincode::deserialize(&self.0)?)
    }

    pub fn from_bytes(bytes: [u8; RANDOM_STATE_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; RANDOM_STATE_SIZE] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_restore_resumes_sequence() {
        let mut rng = Pcg32::seed_from_u64(7);
        let _: u32 = rng.random();

        let state = RandomState::capture(&rng).unwrap();
        let mut restored = state.restore().unwrap();

        for _ in 0..8 {
            assert_eq!(rng.random::<u32>(), restored.random::<u32>());
        }
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = RandomState::capture(&Pcg32::seed_from_u64(1)).unwrap();
        let b = RandomState::capture(&Pcg32::seed_from_u64(2)).unwrap();
        assert_ne!(a, b);
    }
}
