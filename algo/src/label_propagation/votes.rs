/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use std::collections::HashMap;

/// A hasher that mixes `u64` values.
///
/// This can only be used to hash `u64` values and it's not a general purpose
/// hasher. Labels are often consecutive, so we apply the finalization step
/// of MurmurHash3 to spread them.
#[derive(Debug, Clone, Default)]
pub(crate) struct Mix64 {
    state: u64,
}

impl core::hash::Hasher for Mix64 {
    #[inline(always)]
    fn write(&mut self, _bytes: &[u8]) {
        unimplemented!("Mix64 can only hash u64 values")
    }

    #[inline(always)]
    fn write_u64(&mut self, i: u64) {
        let mut x = i;
        x ^= x >> 33;
        x = x.wrapping_mul(0xff51_afd7_ed55_8ccd);
        x ^= x >> 33;
        x = x.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
        x ^= x >> 33;
        self.state = x;
    }

    #[inline(always)]
    fn finish(&self) -> u64 {
        self.state
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Mix64Builder;

impl core::hash::BuildHasher for Mix64Builder {
    type Hasher = Mix64;

    fn build_hasher(&self) -> Self::Hasher {
        Mix64::default()
    }
}

/// Weighted votes for labels.
#[derive(Debug, Default)]
pub(crate) struct VoteTally {
    votes: HashMap<u64, f64, Mix64Builder>,
}

impl VoteTally {
    pub fn clear(&mut self) {
        self.votes.clear();
    }

    pub fn vote(&mut self, label: u64, weight: f64) {
        *self.votes.entry(label).or_default() += weight;
    }

    /// Returns the label with the largest total weight; ties are broken in
    /// favor of the smallest label.
    ///
    /// If there are no votes, returns `current`.
    pub fn winner(&self, current: u64) -> u64 {
        let mut best = None::<(u64, f64)>;
        for (&label, &weight) in &self.votes {
            best = match best {
                Some((best_label, best_weight))
                    if weight < best_weight || (weight == best_weight && label > best_label) =>
                {
                    Some((best_label, best_weight))
                }
                _ => Some((label, weight)),
            };
        }
        best.map_or(current, |(label, _)| label)
    }

    /// Frees the memory used by the tally.
    pub fn release(&mut self) {
        self.votes = HashMap::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tally(labels: &[u64]) -> VoteTally {
        let mut tally = VoteTally::default();
        for &label in labels {
            tally.vote(label, 1.0);
        }
        tally
    }

    #[test]
    fn test_majority() {
        assert_eq!(tally(&[5, 5, 1]).winner(1), 5);
    }

    #[test]
    fn test_tie_smallest_label() {
        assert_eq!(tally(&[5, 1]).winner(1), 1);
        assert_eq!(tally(&[5, 1]).winner(5), 1);
        assert_eq!(tally(&[9, 3, 7]).winner(9), 3);
    }

    #[test]
    fn test_weights() {
        let mut tally = VoteTally::default();
        tally.vote(1, 0.5);
        tally.vote(1, 0.5);
        tally.vote(2, 2.0);
        assert_eq!(tally.winner(1), 2);
    }

    #[test]
    fn test_no_votes() {
        let mut tally = tally(&[3]);
        tally.clear();
        assert_eq!(tally.winner(42), 42);
    }
}
