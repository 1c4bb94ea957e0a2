//! Deterministic random streams for combat resolution.
//!
//! Each action draws from its own stream so adding draws to one action never
//! shifts another's outcomes under the same seed.
use hmac::{Hmac, Mac};
use rand::rngs::SmallRng;
use rand::rngs::mock::StepRng;
use rand::{RngCore, SeedableRng};
use sha2::Sha256;
use std::sync::{Mutex, MutexGuard, PoisonError};

type Source = Box<dyn RngCore + Send>;

/// Counting wrapper for RNG streams providing instrumentation.
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl<R: RngCore> CountingRng<R> {
    pub const fn new(rng: R) -> Self {
        Self { rng, draws: 0 }
    }

    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: RngCore> RngCore for CountingRng<R> {
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

pub type Stream<'a> = MutexGuard<'a, CountingRng<Source>>;

/// Per-stream draw counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct DrawCounts {
    pub raid: u64,
    pub rob: u64,
    pub kidnap: u64,
    pub tools: u64,
}

pub struct RngBundle {
    raid: Mutex<CountingRng<Source>>,
    rob: Mutex<CountingRng<Source>>,
    kidnap: Mutex<CountingRng<Source>>,
    tools: Mutex<CountingRng<Source>>,
}

impl std::fmt::Debug for RngBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RngBundle")
            .field("draws", &self.draws())
            .finish()
    }
}

impl RngBundle {
    /// Construct the bundle from a user-visible seed.
    #[must_use]
    pub fn from_user_seed(seed: u64) -> Self {
        let stream = |tag: &[u8]| -> Source {
            Box::new(SmallRng::seed_from_u64(derive_stream_seed(seed, tag)))
        };
        Self::from_sources(stream(b"raid"), stream(b"rob"), stream(b"kidnap"), stream(b"tools"))
    }

    /// Every stream yields the same constant word. `0` makes every roll the
    /// lowest possible value (actions succeed, tools break); `u64::MAX` the
    /// highest.
    #[must_use]
    pub fn scripted(word: u64) -> Self {
        let stream = || -> Source { Box::new(StepRng::new(word, 0)) };
        Self::from_sources(stream(), stream(), stream(), stream())
    }

    #[must_use]
    pub fn from_sources(raid: Source, rob: Source, kidnap: Source, tools: Source) -> Self {
        Self {
            raid: Mutex::new(CountingRng::new(raid)),
            rob: Mutex::new(CountingRng::new(rob)),
            kidnap: Mutex::new(CountingRng::new(kidnap)),
            tools: Mutex::new(CountingRng::new(tools)),
        }
    }

    pub fn raid(&self) -> Stream<'_> {
        self.raid.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn rob(&self) -> Stream<'_> {
        self.rob.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn kidnap(&self) -> Stream<'_> {
        self.kidnap.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Tool breakage rolls.
    pub fn tools(&self) -> Stream<'_> {
        self.tools.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn draws(&self) -> DrawCounts {
        DrawCounts {
            raid: self.raid().draws(),
            rob: self.rob().draws(),
            kidnap: self.kidnap().draws(),
            tools: self.tools().draws(),
        }
    }
}

fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()) else {
        return user_seed;
    };
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}
