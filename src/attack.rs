//! Last-round CPA key recovery, from traces to master key.
use log::{debug, info};
use ndarray::{Array1, ArrayView1};
use rayon::ThreadPoolBuilder;
use std::time::Instant;

use crate::{
    config::Config,
    distinguishers::cpa::{cpa, Cpa},
    leakage_model::{
        aes::{inv_expand_key, BLOCK_SIZE},
        hypotheses::HypothesisTable,
    },
    preprocessors::{leakages, LastRoundPeak},
    rank::{round_key, TopN},
    trace::TraceSet,
    util::Progress,
    Error,
};

/// Number of guesses kept per key byte.
pub const TOP_N: usize = 3;

/// Everything computed while recovering a key.
#[derive(Debug, Clone)]
pub struct KeyRecovery {
    leakages: Array1<f32>,
    table: HypothesisTable,
    cpa: Cpa,
    rankings: Vec<TopN<TOP_N>>,
    round_key: [u8; BLOCK_SIZE],
    master_key: [u8; BLOCK_SIZE],
}

impl KeyRecovery {
    /// Return the leakage value of each trace.
    pub fn leakages(&self) -> ArrayView1<f32> {
        self.leakages.view()
    }

    pub fn table(&self) -> &HypothesisTable {
        &self.table
    }

    pub fn cpa(&self) -> &Cpa {
        &self.cpa
    }

    /// Return the best guesses of each key byte.
    pub fn rankings(&self) -> &[TopN<TOP_N>] {
        &self.rankings
    }

    /// Return the recovered last round key.
    pub fn round_key(&self) -> [u8; BLOCK_SIZE] {
        self.round_key
    }

    /// Return the recovered AES-128 key.
    pub fn master_key(&self) -> [u8; BLOCK_SIZE] {
        self.master_key
    }
}

/// Recover the AES-128 key used to produce the ciphertexts of `set`.
///
/// Only the correlation stage runs in parallel, on a dedicated pool of
/// [`Config::num_threads`] threads if set.
pub fn recover_key(
    set: &TraceSet,
    config: &Config,
    progress: &dyn Progress,
) -> Result<KeyRecovery, Error> {
    config.validate()?;
    info!(
        "Attacking {} traces of {} samples",
        set.num_traces(),
        set.num_samples()
    );

    let start = Instant::now();
    let extractor = LastRoundPeak::new(config.window_divisor);
    let leakages = leakages(set.traces(), &extractor, progress);
    info!("The power points selection took {:.3?}", start.elapsed());

    let start = Instant::now();
    let table = HypothesisTable::build(set.ciphertexts(), progress);
    info!("The Hamming distance calculation took {:.3?}", start.elapsed());

    let start = Instant::now();
    let cpa = match config.num_threads {
        Some(num_threads) => ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()?
            .install(|| cpa(leakages.view(), &table, progress)),
        None => cpa(leakages.view(), &table, progress),
    };
    let rankings = cpa.rankings::<TOP_N>();
    info!("The Pearson r correlation took {:.3?}", start.elapsed());

    for (key_byte, ranking) in rankings.iter().enumerate() {
        debug!("Key byte {key_byte}: {:?}", ranking.candidates());
    }

    let round_key = round_key(&rankings);
    let master_key = inv_expand_key(&round_key);
    info!("Recovered key {}", hex::encode(master_key));

    Ok(KeyRecovery {
        leakages,
        table,
        cpa,
        rankings,
        round_key,
        master_key,
    })
}
