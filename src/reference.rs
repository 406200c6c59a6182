use std::path::Path;

use log::info;

use crate::error::{Error, Result};

/// Lookup of reference bases by 1-based closed position range.
///
/// Implementations are read-only once built, so one instance can be shared
/// by concurrent per-sample calls.
pub trait ReferenceSequence: Send + Sync {
    fn length(&self) -> i64;

    /// Bases `start..=end`; fails with `OutOfRange` when the range leaves
    /// the sequence. No wraparound.
    fn fetch(&self, start: i64, end: i64) -> Result<String>;
}

/// A single reference contig held in memory.
#[derive(Debug, Clone)]
pub struct InMemoryReference {
    pub name: String,
    sequence: Vec<u8>,
}

impl InMemoryReference {
    pub fn new(name: impl Into<String>, sequence: impl Into<Vec<u8>>) -> Self {
        let mut sequence = sequence.into();
        sequence.make_ascii_uppercase();
        InMemoryReference {
            name: name.into(),
            sequence,
        }
    }

    /// Loads the first record of a FASTA file.
    pub fn from_fasta(path: &Path) -> Result<Self> {
        let mut reader = needletail::parse_fastx_file(path)
            .map_err(|e| Error::Fasta(format!("{}: {e}", path.display())))?;

        let record = match reader.next() {
            Some(record) => record.map_err(|e| Error::Fasta(e.to_string()))?,
            None => {
                return Err(Error::Fasta(format!(
                    "no sequence records in {}",
                    path.display()
                )))
            }
        };

        let name = String::from_utf8_lossy(record.id())
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string();
        let reference = InMemoryReference::new(name, record.seq().into_owned());
        info!(
            "Loaded reference '{}' ({} bp) from {}",
            reference.name,
            reference.length(),
            path.display()
        );
        Ok(reference)
    }
}

impl ReferenceSequence for InMemoryReference {
    fn length(&self) -> i64 {
        self.sequence.len() as i64
    }

    fn fetch(&self, start: i64, end: i64) -> Result<String> {
        if start < 1 || end > self.length() || start > end {
            return Err(Error::OutOfRange {
                start,
                end,
                length: self.length(),
            });
        }
        let slice = &self.sequence[(start - 1) as usize..end as usize];
        Ok(String::from_utf8_lossy(slice).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_is_one_based_and_closed() {
        let reference = InMemoryReference::new("chrM", "acgtACGTNN");
        assert_eq!(reference.fetch(1, 4).unwrap(), "ACGT");
        assert_eq!(reference.fetch(9, 10).unwrap(), "NN");
    }

    #[test]
    fn fetch_past_either_end_is_out_of_range() {
        let reference = InMemoryReference::new("chrM", "ACGTACGT");
        assert!(matches!(
            reference.fetch(0, 3),
            Err(Error::OutOfRange { start: 0, .. })
        ));
        assert!(matches!(
            reference.fetch(5, 9),
            Err(Error::OutOfRange { end: 9, length: 8, .. })
        ));
    }

    #[test]
    fn loads_first_fasta_record() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, ">chrM rCRS").unwrap();
        writeln!(file, "GATCACAGGT").unwrap();
        writeln!(file, "ctatcaccct").unwrap();
        writeln!(file, ">other").unwrap();
        writeln!(file, "AAAA").unwrap();
        file.flush().unwrap();

        let reference = InMemoryReference::from_fasta(file.path()).unwrap();
        assert_eq!(reference.name, "chrM");
        assert_eq!(reference.length(), 20);
        assert_eq!(reference.fetch(9, 12).unwrap(), "GTCT");
    }
}
