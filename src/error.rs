use std::path::PathBuf;

/// Errors that can occur in rusalt.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid coordinate: {position} is outside [1, {genome_length}]")]
    InvalidCoordinate { position: i64, genome_length: i64 },

    #[error("invalid event: size {size} bp on a {genome_length} bp genome")]
    InvalidEvent { size: i64, genome_length: i64 },

    #[error("reference range {start}-{end} is outside the available sequence (1-{length})")]
    OutOfRange { start: i64, end: i64, length: i64 },

    #[error("grouping covers {assigned} events but {events} were supplied")]
    GroupingMismatch { events: usize, assigned: usize },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("FASTA parsing error: {0}")]
    Fasta(String),

    #[error("I/O error: {source} ({path})")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },
}

impl Error {
    /// Convenience for wrapping an `io::Error` with a path context.
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            source,
            path: path.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            source: err,
            path: PathBuf::from("<unknown>"),
        }
    }
}

/// A per-record failure, tagged with the cluster that produced it.
#[derive(Debug, thiserror::Error)]
#[error("cluster {cluster_id}: {source}")]
pub struct CallError {
    pub cluster_id: String,
    #[source]
    pub source: Error,
}

pub type Result<T> = std::result::Result<T, Error>;
