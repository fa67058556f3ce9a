use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("No traces to analyze")]
    EmptyTraces,
    #[error("Traces have no samples")]
    EmptySamples,
    #[error("Trace {index} has {len} samples, expected {expected}")]
    RaggedTraces {
        index: usize,
        len: usize,
        expected: usize,
    },
    #[error("Got {ciphertexts} ciphertexts for {traces} traces")]
    ShapeMismatch { traces: usize, ciphertexts: usize },
    #[error("Ciphertext {index} has {len} bytes, expected 16")]
    InvalidCiphertext { index: usize, len: usize },
    #[error("Invalid value {value:?} at row {row}, column {column}")]
    Parse {
        row: usize,
        column: usize,
        value: String,
    },
    #[error("Correlation table has shape {0:?}, expected [16, 256]")]
    InvalidTable(Vec<usize>),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Failed to save/load cpakey data")]
    SaveLoadError(#[from] serde_json::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Npy(#[from] ndarray_npy::ReadNpyError),
    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error(transparent)]
    IoError(#[from] io::Error),
}
