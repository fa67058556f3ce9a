//! Settings of a key recovery run.
use serde::{Deserialize, Serialize};
use std::{fs::File, path::Path, path::PathBuf};

use crate::Error;

/// Configuration of the attack and of its inputs and outputs.
///
/// Missing fields take their default value when deserializing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The leakage is searched in the last `1 / window_divisor` of each trace.
    ///
    /// Default: 5
    pub window_divisor: usize,

    /// Number of worker threads correlating guesses, or `None` for rayon's global pool.
    pub num_threads: Option<usize>,

    /// Field delimiter of text input files. Must be ASCII.
    ///
    /// Default: `,`
    pub delimiter: char,

    /// Directory receiving the per-byte reports.
    pub output_dir: PathBuf,

    /// Whether to write the per-byte reports.
    pub write_reports: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window_divisor: 5,
            num_threads: None,
            delimiter: ',',
            output_dir: PathBuf::from("."),
            write_reports: true,
        }
    }
}

impl Config {
    /// Load a configuration from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file = File::open(path)?;
        let config: Config = serde_json::from_reader(file)?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.window_divisor == 0 {
            return Err(Error::InvalidConfig(
                "window_divisor must be strictly positive".to_string(),
            ));
        }
        if self.num_threads == Some(0) {
            return Err(Error::InvalidConfig(
                "num_threads must be strictly positive".to_string(),
            ));
        }
        self.delimiter_byte()?;

        Ok(())
    }

    /// Return the delimiter as the single byte the CSV reader expects.
    pub fn delimiter_byte(&self) -> Result<u8, Error> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| {
                Error::InvalidConfig(format!("delimiter {:?} is not ASCII", self.delimiter))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::Config;
    use crate::Error;
    use std::path::PathBuf;

    #[test]
    fn test_default() {
        let config = Config::default();

        assert_eq!(config.window_divisor, 5);
        assert!(config.validate().is_ok());
        assert_eq!(config.delimiter_byte().unwrap(), b',');
    }

    #[test]
    fn test_partial_json() {
        let config: Config =
            serde_json::from_str(r#"{"num_threads": 4, "delimiter": ";", "write_reports": false}"#)
                .unwrap();

        assert_eq!(
            config,
            Config {
                num_threads: Some(4),
                delimiter: ';',
                write_reports: false,
                ..Config::default()
            }
        );
        assert_eq!(config.output_dir, PathBuf::from("."));
    }

    #[test]
    fn test_invalid() {
        let config = Config {
            window_divisor: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let config = Config {
            num_threads: Some(0),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let config = Config {
            delimiter: 'é',
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_load() {
        let path = std::env::temp_dir().join(format!("cpakey-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"window_divisor": 10, "output_dir": "reports"}"#).unwrap();

        let config = Config::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.window_divisor, 10);
        assert_eq!(config.output_dir, PathBuf::from("reports"));
    }
}
