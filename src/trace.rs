use ndarray::{Array2, ArrayView2};

use crate::{leakage_model::aes::BLOCK_SIZE, Error};

/// Power traces and the ciphertext produced by each traced encryption.
///
/// Shapes are checked on construction, so the attack can index both matrices freely.
#[derive(Debug, Clone)]
pub struct TraceSet {
    /// One trace per row
    traces: Array2<f32>,
    /// One 16-byte ciphertext per row, in linear AES state order
    ciphertexts: Array2<u8>,
}

impl TraceSet {
    pub fn new(traces: Array2<f32>, ciphertexts: Array2<u8>) -> Result<Self, Error> {
        let (num_traces, num_samples) = traces.dim();
        if num_traces == 0 {
            return Err(Error::EmptyTraces);
        }
        if num_samples == 0 {
            return Err(Error::EmptySamples);
        }
        if ciphertexts.shape()[0] != num_traces {
            return Err(Error::ShapeMismatch {
                traces: num_traces,
                ciphertexts: ciphertexts.shape()[0],
            });
        }
        if ciphertexts.shape()[1] != BLOCK_SIZE {
            return Err(Error::InvalidCiphertext {
                index: 0,
                len: ciphertexts.shape()[1],
            });
        }

        Ok(Self {
            traces,
            ciphertexts,
        })
    }

    /// Build a [`TraceSet`] from rows as read from text files.
    pub fn from_rows(traces: Vec<Vec<f32>>, ciphertexts: Vec<Vec<u8>>) -> Result<Self, Error> {
        Self::new(
            traces_from_rows(traces)?,
            ciphertexts_from_rows(ciphertexts)?,
        )
    }

    pub fn traces(&self) -> ArrayView2<f32> {
        self.traces.view()
    }

    pub fn ciphertexts(&self) -> ArrayView2<u8> {
        self.ciphertexts.view()
    }

    /// Returns the number of traces.
    pub fn num_traces(&self) -> usize {
        self.traces.shape()[0]
    }

    /// Returns the number of samples in each trace.
    pub fn num_samples(&self) -> usize {
        self.traces.shape()[1]
    }
}

/// Stack trace rows into a matrix, rejecting empty and ragged input.
pub fn traces_from_rows(rows: Vec<Vec<f32>>) -> Result<Array2<f32>, Error> {
    let Some(first) = rows.first() else {
        return Err(Error::EmptyTraces);
    };
    let expected = first.len();
    if expected == 0 {
        return Err(Error::EmptySamples);
    }
    if let Some((index, row)) = rows
        .iter()
        .enumerate()
        .find(|(_, row)| row.len() != expected)
    {
        return Err(Error::RaggedTraces {
            index,
            len: row.len(),
            expected,
        });
    }

    Ok(Array2::from_shape_fn((rows.len(), expected), |(i, j)| rows[i][j]))
}

/// Stack ciphertext rows into a matrix, rejecting rows that are not 16 bytes long.
pub fn ciphertexts_from_rows(rows: Vec<Vec<u8>>) -> Result<Array2<u8>, Error> {
    if let Some((index, row)) = rows
        .iter()
        .enumerate()
        .find(|(_, row)| row.len() != BLOCK_SIZE)
    {
        return Err(Error::InvalidCiphertext {
            index,
            len: row.len(),
        });
    }

    Ok(Array2::from_shape_fn((rows.len(), BLOCK_SIZE), |(i, j)| rows[i][j]))
}
