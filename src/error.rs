// 🚨 Pipeline Errors - typed failures carried inside anyhow
//
// Every failure is fatal to the run. The enum exists so callers (and tests)
// can tell a missing input apart from a parse or config problem via
// `anyhow::Error::downcast_ref::<ReconError>()`.

use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum ReconError {
    /// A required input file is not on disk.
    MissingFile { label: &'static str, path: PathBuf },

    /// A date column value matched none of the accepted formats.
    DateParse {
        file: PathBuf,
        row: usize,
        value: String,
    },

    /// recon.toml could not be used.
    InvalidConfig(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingFile { label, path } => {
                write!(f, "Missing {} file: {}", label, path.display())
            }
            Self::DateParse { file, row, value } => {
                write!(
                    f,
                    "{} row {}: cannot parse date '{}'",
                    file.display(),
                    row,
                    value
                )
            }
            Self::InvalidConfig(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ReconError {}
