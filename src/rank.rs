//! Ranking of key guesses by correlation.
use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::leakage_model::aes::BLOCK_SIZE;

/// A key guess and its correlation coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub guess: u8,
    pub corr: f32,
}

/// The `N` best guesses seen so far, sorted by decreasing correlation.
///
/// Slots start as `(0, -1.0)`. A new guess only takes a slot it strictly beats, so between equal
/// correlations the guess inserted first stays ahead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TopN<const N: usize> {
    slots: [Candidate; N],
}

impl<const N: usize> TopN<N> {
    pub fn new() -> Self {
        Self {
            slots: [Candidate {
                guess: 0,
                corr: -1.0,
            }; N],
        }
    }

    /// Insert a guess, dropping the worst one if it takes a slot.
    ///
    /// Returns the slot taken, if any.
    pub fn insert(&mut self, guess: u8, corr: f32) -> Option<usize> {
        let slot = self.slots.iter().position(|candidate| corr > candidate.corr)?;

        self.slots.copy_within(slot..N - 1, slot + 1);
        self.slots[slot] = Candidate { guess, corr };

        Some(slot)
    }

    /// Rank a row of correlation coefficients indexed by guess.
    ///
    /// # Panics
    /// Panic in debug if the row has more than 256 guesses.
    pub fn from_row(row: ArrayView1<f32>) -> Self {
        debug_assert!(row.len() <= 256);

        let mut top = Self::new();
        for (guess, &corr) in row.iter().enumerate() {
            top.insert(guess as u8, corr);
        }

        top
    }

    /// Return the best guess.
    ///
    /// # Panics
    /// Panic if `N` is 0.
    pub fn best(&self) -> Candidate {
        self.slots[0]
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.slots
    }
}

impl<const N: usize> Default for TopN<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Rank the guesses of each key byte. `corr` is indexed as `[key_byte, guess]`.
pub fn rank_bytes<const N: usize>(corr: ArrayView2<f32>) -> Vec<TopN<N>> {
    corr.rows().into_iter().map(TopN::from_row).collect()
}

/// Assemble the round key from the best guess of each key byte.
///
/// # Panics
/// Panic if `rankings` does not hold one ranking per key byte.
pub fn round_key<const N: usize>(rankings: &[TopN<N>]) -> [u8; BLOCK_SIZE] {
    assert_eq!(rankings.len(), BLOCK_SIZE);

    std::array::from_fn(|i| rankings[i].best().guess)
}
