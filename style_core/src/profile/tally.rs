//! Weighted tallies used while folding events into a profile.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;

/// Accumulates a weight per key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffinityTally<K: Eq + Hash> {
    weights: HashMap<K, f64>,
}

impl<K: Eq + Hash> Default for AffinityTally<K> {
    fn default() -> Self {
        Self {
            weights: HashMap::new(),
        }
    }
}

impl<K> AffinityTally<K>
where
    K: Eq + Hash + Clone + Ord,
{
    /// Create a new empty tally.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add weight to a key (accumulates with existing weight).
    pub fn add(&mut self, key: K, weight: f64) {
        *self.weights.entry(key).or_insert(0.0) += weight;
    }

    /// Set the weight of a key to a specific value.
    pub fn set(&mut self, key: K, weight: f64) {
        self.weights.insert(key, weight);
    }

    /// Get the weight of a key.
    pub fn get(&self, key: &K) -> f64 {
        self.weights.get(key).copied().unwrap_or(0.0)
    }

    /// All entries sorted by weight (descending), ties broken by key.
    pub fn ranked(&self) -> Vec<(&K, f64)> {
        let mut entries: Vec<_> = self.weights.iter().map(|(k, w)| (k, *w)).collect();
        entries.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        entries
    }

    /// The `n` heaviest entries.
    pub fn top(&self, n: usize) -> Vec<(&K, f64)> {
        let mut ranked = self.ranked();
        ranked.truncate(n);
        ranked
    }

    /// Get the key with the highest weight.
    pub fn heaviest(&self) -> Option<(&K, f64)> {
        self.ranked().into_iter().next()
    }

    /// Get the total weight.
    pub fn total(&self) -> f64 {
        self.weights.values().sum()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Scale weights so the maximum is 1.0.
    pub fn normalize(&mut self) {
        let max = self.weights.values().copied().fold(0.0_f64, f64::max);
        if max > 0.0 {
            for weight in self.weights.values_mut() {
                *weight /= max;
            }
        }
    }

    /// Scale weights so they sum to 1.0.
    pub fn into_shares(mut self) -> Self {
        let total = self.total();
        if total > 0.0 {
            for weight in self.weights.values_mut() {
                *weight /= total;
            }
        }
        self
    }

    /// Multiply every weight by `factor`.
    pub fn decay(&mut self, factor: f64) {
        for weight in self.weights.values_mut() {
            *weight *= factor;
        }
    }

    /// Remove keys with weight below threshold.
    pub fn prune(&mut self, threshold: f64) {
        self.weights.retain(|_, weight| *weight >= threshold);
    }

    /// Merge another tally into this one (adding weights).
    pub fn merge(&mut self, other: &AffinityTally<K>) {
        for (key, weight) in &other.weights {
            self.add(key.clone(), *weight);
        }
    }

    /// Shared mass of two distributions: the sum of per-key minimum shares.
    ///
    /// Both sides are normalised to sum 1 first. Two empty tallies overlap
    /// fully; exactly one empty tally does not overlap at all.
    pub fn overlap(&self, other: &AffinityTally<K>) -> f64 {
        match (self.total() > 0.0, other.total() > 0.0) {
            (false, false) => 1.0,
            (true, false) | (false, true) => 0.0,
            (true, true) => {
                let a = self.clone().into_shares();
                let b = other.clone().into_shares();
                a.weights
                    .iter()
                    .map(|(key, share)| share.min(b.get(key)))
                    .sum::<f64>()
                    .clamp(0.0, 1.0)
            }
        }
    }
}

impl<K> FromIterator<(K, f64)> for AffinityTally<K>
where
    K: Eq + Hash + Clone + Ord,
{
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut tally = AffinityTally::new();
        for (key, weight) in iter {
            tally.add(key, weight);
        }
        tally
    }
}
