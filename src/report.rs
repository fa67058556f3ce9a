//! Result reports of a key recovery.
use itertools::Itertools;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::{attack::KeyRecovery, leakage_model::aes::BLOCK_SIZE, rank::Candidate, Error};

/// Path of the correlation report of `key_byte` in `dir`.
pub fn report_path<P: AsRef<Path>>(dir: P, key_byte: usize) -> PathBuf {
    dir.as_ref().join(format!("byte_{key_byte}_correlations.csv"))
}

/// Write the ranked guesses of `key_byte` as CSV.
///
/// Each row holds the rank (starting at 1), the guess, its correlation, and the `hd:leakage`
/// pairs of every trace joined by `|`.
pub fn write_byte_report<W: Write>(
    writer: W,
    key_byte: usize,
    recovery: &KeyRecovery,
) -> Result<(), Error> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(["Rank", "KeyByte", "Correlation", "Data"])?;

    for (rank, candidate) in recovery.rankings()[key_byte]
        .candidates()
        .iter()
        .enumerate()
    {
        let data = recovery
            .table()
            .row(key_byte, candidate.guess as usize)
            .iter()
            .zip(recovery.leakages())
            .map(|(hd, leakage)| format!("{hd}:{leakage}"))
            .join("|");

        writer.write_record([
            (rank + 1).to_string(),
            candidate.guess.to_string(),
            candidate.corr.to_string(),
            data,
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Write the report of every key byte into `dir`.
///
/// A failing byte does not stop the others. Returns the failures.
pub fn write_reports<P: AsRef<Path>>(dir: P, recovery: &KeyRecovery) -> Vec<(usize, Error)> {
    let mut failures = Vec::new();

    for key_byte in 0..BLOCK_SIZE {
        let path = report_path(&dir, key_byte);
        let result = File::create(&path)
            .map_err(Error::from)
            .and_then(|file| write_byte_report(BufWriter::new(file), key_byte, recovery));

        match result {
            Ok(()) => info!("Saved data for byte {key_byte} to {}", path.display()),
            Err(err) => {
                warn!("Could not write {}: {err}", path.display());
                failures.push((key_byte, err));
            }
        }
    }

    failures
}

/// Serializable outcome of a key recovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub master_key: String,
    pub round_key: String,
    pub num_traces: usize,
    pub rankings: Vec<Vec<Candidate>>,
}

impl From<&KeyRecovery> for Summary {
    fn from(recovery: &KeyRecovery) -> Self {
        Self {
            master_key: hex::encode(recovery.master_key()),
            round_key: hex::encode(recovery.round_key()),
            num_traces: recovery.leakages().len(),
            rankings: recovery
                .rankings()
                .iter()
                .map(|ranking| ranking.candidates().to_vec())
                .collect(),
        }
    }
}

/// Save the [`Summary`] of `recovery` to a JSON file.
pub fn save_summary<P: AsRef<Path>>(path: P, recovery: &KeyRecovery) -> Result<(), Error> {
    let file = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(file, &Summary::from(recovery))?;

    Ok(())
}
