//! Modeled leakage of every last-round key guess, for every trace.

use ndarray::{s, Array3, ArrayView1, ArrayView2, ArrayView3};

use super::{
    aes::{CipherState, BLOCK_SIZE},
    hd,
};
use crate::util::Progress;

/// Number of guesses for one key byte.
pub const GUESS_RANGE: usize = 256;

/// Hamming distances between the state entering the last round and the ciphertext, for each
/// (key byte, guess, trace).
///
/// This is the dominant memory cost of the attack: `16 × 256 × num_traces` values.
#[derive(Debug, Clone)]
pub struct HypothesisTable {
    /// Indexed as `[key_byte, guess, trace]`
    values: Array3<f32>,
}

impl HypothesisTable {
    /// Build the table from the ciphertexts of all traces.
    ///
    /// Values are stored under the key byte the guess was XORed with, which is the ciphertext
    /// byte ShiftRows moved into the compared position, not the compared position itself.
    ///
    /// # Panics
    /// Panic in debug if `ciphertexts.shape()[1] != 16`.
    pub fn build(ciphertexts: ArrayView2<u8>, progress: &dyn Progress) -> Self {
        debug_assert_eq!(ciphertexts.shape()[1], BLOCK_SIZE);

        let num_traces = ciphertexts.shape()[0];
        let mut values = Array3::zeros((BLOCK_SIZE, GUESS_RANGE, num_traces));

        progress.start("Computing Hamming distances", num_traces);
        for (i, ciphertext) in ciphertexts.rows().into_iter().enumerate() {
            let state = CipherState::from_ciphertext(ciphertext);

            for position in 0..BLOCK_SIZE {
                let post_byte = state.post_byte(position);

                for guess in 0..GUESS_RANGE {
                    let (pre_byte, key_byte) = state.pre_round(position, guess as u8);
                    values[[key_byte, guess, i]] = hd(pre_byte, post_byte) as f32;
                }
            }

            progress.inc(1);
        }
        progress.finish();

        Self { values }
    }

    /// Return the modeled leakage of `guess` for `key_byte` across all traces.
    pub fn row(&self, key_byte: usize, guess: usize) -> ArrayView1<f32> {
        self.values.slice(s![key_byte, guess, ..])
    }

    pub fn values(&self) -> ArrayView3<f32> {
        self.values.view()
    }

    /// Return the number of traces the table was built from.
    pub fn num_traces(&self) -> usize {
        self.values.shape()[2]
    }
}
