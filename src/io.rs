//! Load traces and ciphertexts from delimited text or `.npy` files.
use csv::{ReaderBuilder, Trim};
use ndarray::Array2;
use ndarray_npy::{read_npy, ReadNpyError};
use std::path::Path;

use crate::{
    trace::{ciphertexts_from_rows, traces_from_rows, TraceSet},
    Error,
};

/// Parse every non-empty field of a delimited text file, row by row.
///
/// The file has no header and surrounding whitespace is trimmed. An empty last field, left by a
/// trailing delimiter, is skipped. Any other empty field is a parse error.
fn read_rows<T, F>(path: &Path, delimiter: u8, parse: F) -> Result<Vec<Vec<T>>, Error>
where
    F: Fn(&str) -> Option<T>,
{
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)?;

    let mut rows = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let last = record.len().saturating_sub(1);
        let values = record
            .iter()
            .enumerate()
            .filter(|&(column, field)| column != last || !field.is_empty())
            .map(|(column, field)| {
                parse(field).ok_or_else(|| Error::Parse {
                    row,
                    column,
                    value: field.to_string(),
                })
            })
            .collect::<Result<Vec<T>, Error>>()?;

        if !values.is_empty() {
            rows.push(values);
        }
    }

    Ok(rows)
}

/// Read power traces from a delimited text file, one trace per row.
///
/// Samples must be finite numbers.
pub fn read_trace_rows<P: AsRef<Path>>(path: P, delimiter: u8) -> Result<Vec<Vec<f32>>, Error> {
    read_rows(path.as_ref(), delimiter, |field| {
        field.parse::<f32>().ok().filter(|x| x.is_finite())
    })
}

/// Read ciphertexts from a delimited text file, one ciphertext per row as decimal bytes.
pub fn read_ciphertext_rows<P: AsRef<Path>>(path: P, delimiter: u8) -> Result<Vec<Vec<u8>>, Error> {
    read_rows(path.as_ref(), delimiter, |field| field.parse::<u8>().ok())
}

/// Read a 2D `.npy` array of `f32` or `f64` traces.
pub fn read_traces_npy<P: AsRef<Path>>(path: P) -> Result<Array2<f32>, Error> {
    match read_npy::<_, Array2<f32>>(path.as_ref()) {
        Ok(traces) => Ok(traces),
        Err(ReadNpyError::WrongDescriptor(_)) => {
            let traces: Array2<f64> = read_npy(path.as_ref())?;
            Ok(traces.mapv(|x| x as f32))
        }
        Err(e) => Err(e.into()),
    }
}

/// Read a 2D `.npy` array of `u8` ciphertexts.
pub fn read_ciphertexts_npy<P: AsRef<Path>>(path: P) -> Result<Array2<u8>, Error> {
    Ok(read_npy(path.as_ref())?)
}

fn is_npy(path: &Path) -> bool {
    path.extension().is_some_and(|extension| extension == "npy")
}

/// Load and validate the inputs of an attack.
///
/// Each file is read as `.npy` if it has the `npy` extension, as delimited text otherwise.
pub fn load_trace_set<P, Q>(traces: P, ciphertexts: Q, delimiter: u8) -> Result<TraceSet, Error>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let (traces, ciphertexts) = (traces.as_ref(), ciphertexts.as_ref());

    let traces = if is_npy(traces) {
        read_traces_npy(traces)?
    } else {
        traces_from_rows(read_trace_rows(traces, delimiter)?)?
    };
    let ciphertexts = if is_npy(ciphertexts) {
        read_ciphertexts_npy(ciphertexts)?
    } else {
        ciphertexts_from_rows(read_ciphertext_rows(ciphertexts, delimiter)?)?
    };

    TraceSet::new(traces, ciphertexts)
}

#[cfg(test)]
mod tests {
    use super::{load_trace_set, read_ciphertext_rows, read_trace_rows};
    use crate::Error;
    use ndarray::array;
    use ndarray_npy::write_npy;
    use std::path::PathBuf;

    /// Write `content` to a file unique to this test process.
    fn temp_file(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("cpakey-{}-{name}", std::process::id()));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_read_trace_rows() {
        let path = temp_file("traces.csv", "1.5, -2,3e-1,\n\n4,5,6\n");
        let rows = read_trace_rows(&path, b',').unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(rows, vec![vec![1.5, -2.0, 0.3], vec![4.0, 5.0, 6.0]]);
    }

    #[test]
    fn test_read_ciphertext_rows() {
        let line = (0..16).map(|i| (i * 17).to_string()).collect::<Vec<_>>().join(";");
        let path = temp_file("ciphertexts.txt", &format!("{line}\n{line}\n"));
        let rows = read_ciphertext_rows(&path, b';').unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][15], 255);
    }

    #[test]
    fn test_parse_errors() {
        let path = temp_file("bad-ciphertexts.csv", "1,2,3\n4,256,6\n");
        let result = read_ciphertext_rows(&path, b',');
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(
            result,
            Err(Error::Parse { row: 1, column: 1, value }) if value == "256"
        ));

        let path = temp_file("bad-traces.csv", "1,2,NaN\n");
        let result = read_trace_rows(&path, b',');
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(Error::Parse { row: 0, column: 2, .. })));
    }

    #[test]
    fn test_missing_field() {
        let path = temp_file("gap-traces.csv", "1,,3\n4,5\n");
        let result = read_trace_rows(&path, b',');
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(
            result,
            Err(Error::Parse { row: 0, column: 1, value }) if value.is_empty()
        ));

        let path = temp_file("gap-ciphertexts.csv", "1,2,3,\n4, ,6\n");
        let result = read_ciphertext_rows(&path, b',');
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(
            result,
            Err(Error::Parse { row: 1, column: 1, value }) if value.is_empty()
        ));
    }

    #[test]
    fn test_load_trace_set() {
        let ciphertexts = (0..3)
            .map(|_| vec!["7"; 16].join(","))
            .collect::<Vec<_>>()
            .join("\n");
        let traces_path = temp_file("set-traces.csv", "1,2,3,4,5\n6,7,8,9,10\n11,12,13,14,15\n");
        let ciphertexts_path = temp_file("set-ciphertexts.csv", &ciphertexts);

        let set = load_trace_set(&traces_path, &ciphertexts_path, b',').unwrap();

        assert_eq!(set.num_traces(), 3);
        assert_eq!(set.num_samples(), 5);
        assert_eq!(set.ciphertexts()[[2, 15]], 7);

        // Ciphertexts for only two of the three traces
        let two_rows = &ciphertexts[..ciphertexts.rfind('\n').unwrap()];
        let short_path = temp_file("short-ciphertexts.csv", two_rows);
        let result = load_trace_set(&traces_path, &short_path, b',');

        for path in [traces_path, ciphertexts_path, short_path] {
            std::fs::remove_file(path).unwrap();
        }
        assert!(matches!(
            result,
            Err(Error::ShapeMismatch {
                traces: 3,
                ciphertexts: 2
            })
        ));
    }

    #[test]
    fn test_load_npy() {
        let dir = std::env::temp_dir();
        let traces_path = dir.join(format!("cpakey-{}-traces.npy", std::process::id()));
        let ciphertexts_path = dir.join(format!("cpakey-{}-ciphertexts.npy", std::process::id()));
        write_npy(&traces_path, &array![[1.0f64, 2.0], [3.0, 4.5]]).unwrap();
        write_npy(&ciphertexts_path, &ndarray::Array2::<u8>::ones((2, 16))).unwrap();

        let set = load_trace_set(&traces_path, &ciphertexts_path, b',').unwrap();
        std::fs::remove_file(&traces_path).unwrap();
        std::fs::remove_file(&ciphertexts_path).unwrap();

        assert_eq!(set.traces(), array![[1.0f32, 2.0], [3.0, 4.5]]);
        assert_eq!(set.ciphertexts()[[1, 0]], 1);
    }
}
