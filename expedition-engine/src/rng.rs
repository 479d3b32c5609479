//! Seeded RNG streams for expedition generation and resolution.
//!
//! Every stochastic function in the crate takes its generator as a
//! parameter. The service owns one [`ExpeditionRngs`] bundle whose streams
//! are derived from a single user seed through a domain-separated HMAC, so
//! generation draws never shift the outcome stream and vice versa.
use hmac::{Hmac, Mac};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sha2::Sha256;

/// RNG stream that records how many draws were taken, for replay logs.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<ChaCha20Rng> {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
            draws: 0,
        }
    }
}

impl<R: RngCore> CountingRng<R> {
    /// Draws taken since the stream was seeded.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: RngCore> RngCore for CountingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.draws += 1;
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws += 1;
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws += 1;
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

/// Independent streams used by the expedition service.
#[derive(Debug, Clone)]
pub struct ExpeditionRngs {
    generation: CountingRng<ChaCha20Rng>,
    outcome: CountingRng<ChaCha20Rng>,
}

impl ExpeditionRngs {
    /// Construct the bundle from a user-visible seed.
    #[must_use]
    pub fn from_user_seed(seed: u64) -> Self {
        Self {
            generation: CountingRng::new(derive_stream_seed(seed, b"generation")),
            outcome: CountingRng::new(derive_stream_seed(seed, b"outcome")),
        }
    }

    /// Seed from OS entropy for production hosts.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self::from_user_seed(rand::thread_rng().next_u64())
    }

    /// Stream used to generate expedition options.
    pub fn generation(&mut self) -> &mut CountingRng<ChaCha20Rng> {
        &mut self.generation
    }

    /// Stream used to resolve outcomes and reward rolls.
    pub fn outcome(&mut self) -> &mut CountingRng<ChaCha20Rng> {
        &mut self.outcome
    }
}

/// Uniform draw in `[0, 1)`.
pub fn unit_draw<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.gen_range(0.0..1.0)
}

fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()) else {
        return user_seed;
    };
    mac.update(domain_tag);
    mac.finalize()
        .into_bytes()
        .first_chunk::<8>()
        .map_or(user_seed, |bytes| u64::from_le_bytes(*bytes))
}
