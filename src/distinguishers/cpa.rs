use ndarray::{Array2, ArrayView1, ArrayView2};
use rayon::prelude::{IntoParallelIterator, ParallelIterator};
use serde::{Deserialize, Serialize};
use std::{fs::File, iter::zip, path::Path};

use crate::{
    leakage_model::{
        aes::BLOCK_SIZE,
        hypotheses::{HypothesisTable, GUESS_RANGE},
    },
    rank::{rank_bytes, round_key, TopN},
    util::Progress,
    Error,
};

/// Correlate the observed leakages with the modeled leakage of every (key byte, guess) pair.
///
/// The 4096 coefficients are computed in parallel on the current rayon pool.
///
/// # Panics
/// Panic if `leakages.len() != table.num_traces()`.
pub fn cpa(leakages: ArrayView1<f32>, table: &HypothesisTable, progress: &dyn Progress) -> Cpa {
    assert_eq!(leakages.len(), table.num_traces());

    progress.start("Correlating", BLOCK_SIZE);
    let cells: Vec<f32> = (0..BLOCK_SIZE * GUESS_RANGE)
        .into_par_iter()
        .map(|cell| {
            let (key_byte, guess) = (cell / GUESS_RANGE, cell % GUESS_RANGE);
            let corr = pearson(leakages, table.row(key_byte, guess));
            if guess == GUESS_RANGE - 1 {
                progress.inc(1);
            }

            corr
        })
        .collect();
    progress.finish();

    let mut corr = Array2::zeros((BLOCK_SIZE, GUESS_RANGE));
    for (cell, value) in cells.into_iter().enumerate() {
        corr[[cell / GUESS_RANGE, cell % GUESS_RANGE]] = value;
    }

    Cpa { corr }
}

/// Pearson correlation coefficient of two series of the same length.
///
/// Returns 0 when either series has no variance, instead of NaN.
///
/// # Panics
/// Panic in debug if `x.len() != y.len()`.
pub fn pearson(x: ArrayView1<f32>, y: ArrayView1<f32>) -> f32 {
    debug_assert_eq!(x.len(), y.len());

    let n = x.len() as f64;
    let mean_x = x.iter().map(|&v| v as f64).sum::<f64>() / n;
    let mean_y = y.iter().map(|&v| v as f64).sum::<f64>() / n;

    let mut cov = 0f64;
    let mut var_x = 0f64;
    let mut var_y = 0f64;
    for (&a, &b) in zip(x, y) {
        let dx = a as f64 - mean_x;
        let dy = b as f64 - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let corr = cov / f64::sqrt(var_x * var_y);
    if var_x == 0.0 || var_y == 0.0 || !corr.is_finite() {
        return 0.0;
    }

    corr.clamp(-1.0, 1.0) as f32
}

/// Result of the CPA[^1] on the last round.
///
/// [^1]: <https://www.iacr.org/archive/ches2004/31560016/31560016.pdf>
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cpa {
    /// Pearson correlation coefficients, indexed as `[key_byte, guess]`
    corr: Array2<f32>,
}

impl Cpa {
    /// Return the Pearson correlation coefficients.
    pub fn corr(&self) -> ArrayView2<f32> {
        self.corr.view()
    }

    /// Return the `N` best guesses of a key byte.
    pub fn rank<const N: usize>(&self, key_byte: usize) -> TopN<N> {
        TopN::from_row(self.corr.row(key_byte))
    }

    /// Return the `N` best guesses of every key byte.
    pub fn rankings<const N: usize>(&self) -> Vec<TopN<N>> {
        rank_bytes(self.corr.view())
    }

    /// Return the guess with the highest Pearson correlation coefficient for a key byte.
    pub fn best_guess(&self, key_byte: usize) -> u8 {
        self.rank::<1>(key_byte).best().guess
    }

    /// Return the last round key made of the best guess of every key byte.
    pub fn round_key(&self) -> [u8; BLOCK_SIZE] {
        round_key(&self.rankings::<1>())
    }

    /// Save the correlation coefficients to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let file = File::create(path)?;
        serde_json::to_writer(file, self)?;

        Ok(())
    }

    /// Load correlation coefficients saved with [`Cpa::save`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file = File::open(path)?;
        let cpa: Cpa = serde_json::from_reader(file)?;

        if cpa.corr.shape() != [BLOCK_SIZE, GUESS_RANGE] {
            return Err(Error::InvalidTable(cpa.corr.shape().to_vec()));
        }

        Ok(cpa)
    }
}

#[cfg(test)]
mod tests {
    use super::{cpa, pearson, Cpa};
    use crate::{
        leakage_model::hypotheses::HypothesisTable,
        util::{tests::RecordingProgress, NoProgress},
    };
    use ndarray::{array, Array1, Array2};
    use ndarray_rand::{
        rand::{rngs::StdRng, SeedableRng},
        rand_distr::Uniform,
        RandomExt,
    };

    fn assert_close(a: f32, b: f32) {
        assert!((a - b).abs() < 1e-5, "{a} != {b}");
    }

    #[test]
    fn test_pearson() {
        let x = array![1.0f32, 2.0, 3.0, 4.0];
        let y = array![2.0f32, 4.0, 5.0, 4.0];

        assert_close(pearson(x.view(), y.view()), 0.7181848);
        assert_close(pearson(y.view(), x.view()), pearson(x.view(), y.view()));
    }

    #[test]
    fn test_pearson_extremes() {
        let mut rng = StdRng::seed_from_u64(0);
        let x = Array1::random_using(500, Uniform::new(-2f32, 2f32), &mut rng);
        let y = Array1::random_using(500, Uniform::new(-2f32, 2f32), &mut rng);

        assert_close(pearson(x.view(), x.view()), 1.0);
        assert_close(pearson(x.view(), (-&x).view()), -1.0);
        assert_close(pearson(x.view(), x.mapv(|v| 3.0 * v + 7.0).view()), 1.0);
        assert_eq!(pearson(x.view(), y.view()), pearson(y.view(), x.view()));
        assert!(pearson(x.view(), y.view()).abs() < 0.2);
    }

    #[test]
    fn test_pearson_constant() {
        let x = array![1.0f32, 2.0, 3.0];
        let constant = array![0.1f32, 0.1, 0.1];

        assert_eq!(pearson(x.view(), constant.view()), 0.0);
        assert_eq!(pearson(constant.view(), x.view()), 0.0);
        assert_eq!(pearson(constant.view(), constant.view()), 0.0);
    }

    #[test]
    fn test_cpa() {
        let mut rng = StdRng::seed_from_u64(0);
        let ciphertexts: Array2<u8> =
            Array2::random_using((200, 16), Uniform::new_inclusive(0u8, 255u8), &mut rng);
        let table = HypothesisTable::build(ciphertexts.view(), &NoProgress);

        // Observed leakage exactly follows guess 0x2b of key byte 3
        let leakages = table.row(3, 0x2b).to_owned();
        let progress = RecordingProgress::default();
        let cpa = cpa(leakages.view(), &table, &progress);

        assert_eq!(cpa.corr().shape(), &[16, 256]);
        assert_close(cpa.corr()[[3, 0x2b]], 1.0);
        assert_eq!(cpa.best_guess(3), 0x2b);
        assert_eq!(cpa.rank::<3>(3).best().guess, 0x2b);
        assert!(cpa.corr().iter().all(|c| (-1.0..=1.0).contains(c)));
        assert_eq!(*progress.steps.lock().unwrap(), 16);
    }

    #[test]
    fn test_cpa_constant_leakage() {
        let ciphertexts = Array2::from_shape_fn((10, 16), |(i, j)| (i * 16 + j) as u8);
        let table = HypothesisTable::build(ciphertexts.view(), &NoProgress);
        let leakages = Array1::from_elem(10, 4.0f32);

        let cpa = cpa(leakages.view(), &table, &NoProgress);

        assert!(cpa.corr().iter().all(|&c| c == 0.0));
        // Zero correlations still beat the initial slots, first guesses first
        let top = cpa.rank::<3>(0);
        let guesses: Vec<u8> = top.candidates().iter().map(|c| c.guess).collect();
        assert_eq!(guesses, vec![0, 1, 2]);
        assert_eq!(cpa.round_key(), [0; 16]);
    }

    #[test]
    fn test_save_load() {
        let mut rng = StdRng::seed_from_u64(1);
        let cpa = Cpa {
            corr: Array2::random_using((16, 256), Uniform::new(-1f32, 1f32), &mut rng),
        };
        let path = std::env::temp_dir().join(format!("cpakey-cpa-{}.json", std::process::id()));

        cpa.save(&path).unwrap();
        let restored = Cpa::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(restored.corr.shape(), &[16, 256]);
        for (a, b) in cpa.corr.iter().zip(restored.corr.iter()) {
            assert_close(*a, *b);
        }
    }

    #[test]
    fn test_load_wrong_shape() {
        let cpa = Cpa {
            corr: Array2::zeros((4, 256)),
        };
        let path =
            std::env::temp_dir().join(format!("cpakey-cpa-shape-{}.json", std::process::id()));

        cpa.save(&path).unwrap();
        let result = Cpa::load(&path);
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(result, Err(crate::Error::InvalidTable(shape)) if shape == vec![4, 256]));
    }
}
