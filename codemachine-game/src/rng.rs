//! Deterministic RNG streams for a puzzle instance.
use hmac::{Hmac, Mac};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use sha2::Sha256;

/// Independent RNG streams segregated by puzzle concern, so that adding draws
/// in one concern (e.g. search animation frames) never shifts another.
#[derive(Debug, Clone)]
pub struct RngBundle {
    seed: u64,
    initial: CountingRng<SmallRng>,
    search: CountingRng<SmallRng>,
    budget: CountingRng<SmallRng>,
    animation: CountingRng<SmallRng>,
}

impl RngBundle {
    /// Construct the bundle from a user-visible seed.
    #[must_use]
    pub fn from_user_seed(seed: u64) -> Self {
        Self {
            seed,
            initial: CountingRng::new(derive_stream_seed(seed, b"initial")),
            search: CountingRng::new(derive_stream_seed(seed, b"search")),
            budget: CountingRng::new(derive_stream_seed(seed, b"budget")),
            animation: CountingRng::new(derive_stream_seed(seed, b"animation")),
        }
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Stream used to draw the starting dial code.
    pub fn initial(&mut self) -> &mut CountingRng<SmallRng> {
        &mut self.initial
    }

    /// Stream used for next-code suggestions.
    pub fn search(&mut self) -> &mut CountingRng<SmallRng> {
        &mut self.search
    }

    /// Stream used for click budget noise.
    pub fn budget(&mut self) -> &mut CountingRng<SmallRng> {
        &mut self.budget
    }

    /// Stream used for throwaway search animation frames.
    pub fn animation(&mut self) -> &mut CountingRng<SmallRng> {
        &mut self.animation
    }

    /// Stable trial identifier derived from the seed.
    #[must_use]
    pub fn trial_id(&self) -> String {
        format!("trial-{:016x}", derive_stream_seed(self.seed, b"trial"))
    }
}

/// Counting wrapper for RNG streams providing instrumentation.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<SmallRng> {
    fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            draws: 0,
        }
    }
}

impl<R: rand::RngCore> CountingRng<R> {
    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: rand::RngCore> rand::RngCore for CountingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draws = self.draws.saturating_add(1);
        self.rng.try_fill_bytes(dest)
    }
}

/// Seed for the `index`-th puzzle of a session, so every trial gets its own
/// streams and trial id.
#[must_use]
pub fn derive_puzzle_seed(session_seed: u64, index: u32) -> u64 {
    let mut tag = b"puzzle:".to_vec();
    tag.extend_from_slice(&index.to_le_bytes());
    derive_stream_seed(session_seed, &tag)
}

fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()).map_or(user_seed, |mut mac| {
        mac.update(domain_tag);
        let digest = mac.finalize().into_bytes();
        let mut seed_bytes = [0u8; 8];
        seed_bytes.copy_from_slice(&digest[..8]);
        u64::from_le_bytes(seed_bytes)
    })
}
