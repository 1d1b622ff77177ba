//! Random selection of the fault injection target and recovery claim.
//!
//! All randomness goes through [`RandomSource`], so a run can be replayed
//! from a seed ([`SeededSource`]) or scripted exactly in tests
//! ([`ScriptedSource`]).

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::error::GhostError;
use crate::types::{Claim, Volume};

/// Source of uniform random indices.
pub trait RandomSource: Send {
    /// Return an index in `0..len`.  `len` is never zero.
    fn pick(&mut self, len: usize) -> usize;
}

/// [`RandomSource`] backed by [`StdRng`], optionally seeded.
#[derive(Debug, Clone)]
pub struct SeededSource(StdRng);

impl SeededSource {
    /// Seed from `seed`, or from the OS when `None`.
    pub fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self(StdRng::seed_from_u64(seed)),
            None => Self(StdRng::from_os_rng()),
        }
    }
}

impl RandomSource for SeededSource {
    fn pick(&mut self, len: usize) -> usize {
        self.0.random_range(0..len)
    }
}

/// [`RandomSource`] that replays a fixed sequence of indices.
///
/// Each scripted value is reduced modulo `len`; once the script is
/// exhausted every pick returns `0`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource(VecDeque<usize>);

impl ScriptedSource {
    pub fn new(picks: impl IntoIterator<Item = usize>) -> Self {
        Self(picks.into_iter().collect())
    }
}

impl RandomSource for ScriptedSource {
    fn pick(&mut self, len: usize) -> usize {
        self.0.pop_front().unwrap_or(0) % len
    }
}

/// Makes the random choices that drive a fault injection cycle.
#[derive(Debug)]
pub struct SelectionPolicy<R> {
    rng: R,
}

impl<R: RandomSource> SelectionPolicy<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    fn choose<'a, T>(&mut self, items: &'a [T], kind: &'static str) -> Result<&'a T, GhostError> {
        if items.is_empty() {
            return Err(GhostError::EmptySet(kind));
        }
        let index = self.rng.pick(items.len());
        debug!(kind, index, of = items.len(), "candidate picked");
        Ok(&items[index])
    }

    /// Pick a volume uniformly at random.
    pub fn choose_volume(&mut self, volumes: &[Volume]) -> Result<Volume, GhostError> {
        self.choose(volumes, "volumes").cloned()
    }

    /// Pick a claim uniformly at random, for reattachment.
    pub fn choose_claim(&mut self, claims: &[Claim]) -> Result<Claim, GhostError> {
        self.choose(claims, "claims").cloned()
    }

    /// Pick uniformly among the claims whose name contains `volume_name`.
    ///
    /// Substring containment is a naming convention, not an ownership link:
    /// [`GhostError::NoMatch`] means there is no known claim to clean up.
    pub fn choose_matching_claim(
        &mut self,
        claims: &[Claim],
        volume_name: &str,
    ) -> Result<Claim, GhostError> {
        let matches = matching_claims(claims, volume_name);
        if matches.is_empty() {
            return Err(GhostError::NoMatch {
                volume: volume_name.to_owned(),
            });
        }
        self.choose(&matches, "matching claims").map(|c| (*c).clone())
    }
}

/// Claims whose name contains `volume_name` as a substring.
fn matching_claims<'a>(claims: &'a [Claim], volume_name: &str) -> Vec<&'a Claim> {
    claims
        .iter()
        .filter(|claim| claim.name.contains(volume_name))
        .collect()
}
