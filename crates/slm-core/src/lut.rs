//! Phase-to-drive lookup tables
//!
//! A LUT maps a 16-bit phase value to the drive code written to the panel.
//! Tables hold a power-of-two number of entries between 2 and 65536; a
//! 16-bit input selects entry `input >> (16 - log2(len))`, so a 16384-entry
//! table is indexed by `input / 4` and a 256-entry table by the high byte.
//!
//! # File format
//!
//! Plain text, one `index value` pair per line, indices counting up from 0:
//!
//! ```text
//! # slm7070 at 532 nm
//! 0 0
//! 1 12
//! 2 25
//! ...
//! ```
//!
//! Blank lines and lines starting with `#` are ignored.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::error::{Result, SlmError};

/// LUT parse failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LutError {
    /// No entries.
    #[error("LUT has no entries")]
    Empty,
    /// Line is not two integers.
    #[error("line {line}: expected `index value`")]
    Malformed {
        /// 1-based line number.
        line: usize,
    },
    /// Index skipped or repeated.
    #[error("line {line}: expected index {expected}, found {found}")]
    OutOfOrder {
        /// 1-based line number.
        line: usize,
        /// Next index in sequence.
        expected: usize,
        /// Index on the line.
        found: usize,
    },
    /// Drive value above 16 bits.
    #[error("line {line}: drive value {value} exceeds 65535")]
    ValueOutOfRange {
        /// 1-based line number.
        line: usize,
        /// Value on the line.
        value: u64,
    },
    /// Entry count not a power of two in 2..=65536.
    #[error("LUT has {0} entries; expected a power of two between 2 and 65536")]
    BadLength(usize),
}

/// Phase-to-drive lookup table.
///
/// The identity table is represented without storage.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Lut {
    table: Option<Arc<[u16]>>,
    shift: u32,
}

impl Lut {
    /// Largest table: one entry per 16-bit input.
    pub const MAX_ENTRIES: usize = 1 << 16;

    /// Table that passes every input through unchanged.
    #[must_use]
    pub fn identity() -> Self {
        Self::default()
    }

    /// Build from explicit entries.
    ///
    /// # Errors
    ///
    /// [`LutError::BadLength`] unless `table.len()` is a power of two in 2..=65536.
    pub fn from_table(table: Vec<u16>) -> Result<Self, LutError> {
        let len = table.len();
        if len < 2 || len > Self::MAX_ENTRIES || !len.is_power_of_two() {
            return Err(LutError::BadLength(len));
        }
        Ok(Self {
            shift: 16 - len.trailing_zeros(),
            table: Some(table.into()),
        })
    }

    /// Parse the text format described in the module docs.
    pub fn parse(text: &str) -> Result<Self, LutError> {
        let mut table = Vec::new();
        for (number, raw) in text.lines().enumerate() {
            let line = number + 1;
            let content = raw.trim();
            if content.is_empty() || content.starts_with('#') {
                continue;
            }
            let mut fields = content.split_whitespace();
            let (Some(index), Some(value), None) = (fields.next(), fields.next(), fields.next())
            else {
                return Err(LutError::Malformed { line });
            };
            let index: usize = index.parse().map_err(|_| LutError::Malformed { line })?;
            let value: u64 = value.parse().map_err(|_| LutError::Malformed { line })?;
            if index != table.len() {
                return Err(LutError::OutOfOrder {
                    line,
                    expected: table.len(),
                    found: index,
                });
            }
            let drive = u16::try_from(value).map_err(|_| LutError::ValueOutOfRange { line, value })?;
            table.push(drive);
        }
        if table.is_empty() {
            return Err(LutError::Empty);
        }
        Self::from_table(table)
    }

    /// Read and parse a LUT file.
    ///
    /// # Errors
    ///
    /// [`SlmError::Io`] if the file cannot be read, [`SlmError::LutParse`] if
    /// it is malformed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SlmError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|source| SlmError::LutParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Whether this is the pass-through table.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.table.is_none()
    }

    /// Number of entries (65536 for the identity table).
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.as_ref().map_or(Self::MAX_ENTRIES, |t| t.len())
    }

    /// Always false: every table has at least two entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Drive code for one phase value.
    #[inline]
    #[must_use]
    pub fn map(&self, input: u16) -> u16 {
        match &self.table {
            None => input,
            Some(table) => table
                .get(usize::from(input >> self.shift))
                .copied()
                .unwrap_or(input),
        }
    }

    /// Map every sample in place.
    pub fn apply(&self, samples: &mut [u16]) {
        if self.table.is_some() {
            for sample in samples {
                *sample = self.map(*sample);
            }
        }
    }
}

impl fmt::Debug for Lut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lut")
            .field("entries", &self.len())
            .field("identity", &self.is_identity())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn table_text(values: &[u64]) -> String {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| format!("{i} {v}\n"))
            .collect()
    }

    #[test]
    fn identity_passes_through() {
        let lut = Lut::identity();
        for v in [0, 1, 32768, u16::MAX] {
            assert_eq!(lut.map(v), v);
        }
        assert_eq!(lut.len(), 65536);
    }

    #[test]
    fn two_entry_table_thresholds_at_midpoint() {
        let lut = Lut::from_table(vec![100, 200]).unwrap();
        assert_eq!(lut.map(0), 100);
        assert_eq!(lut.map(32767), 100);
        assert_eq!(lut.map(32768), 200);
        assert_eq!(lut.map(u16::MAX), 200);
    }

    #[test]
    fn quarter_resolution_table_indexes_by_input_over_four() {
        let table: Vec<u16> = (0..16384u16).map(|i| i.wrapping_mul(3)).collect();
        let lut = Lut::from_table(table).unwrap();
        assert_eq!(lut.map(400), 300);
        assert_eq!(lut.map(403), 300);
        assert_eq!(lut.map(404), 303);
    }

    #[test]
    fn rejects_non_power_of_two() {
        assert_eq!(Lut::from_table(vec![0; 3]), Err(LutError::BadLength(3)));
        assert_eq!(Lut::from_table(vec![0; 1]), Err(LutError::BadLength(1)));
        assert_eq!(
            Lut::from_table(vec![0; 65537]),
            Err(LutError::BadLength(65537))
        );
    }

    #[test]
    fn parses_with_comments_and_blank_lines() {
        let text = format!("# header\n\n{}", table_text(&[5, 6, 7, 8]));
        let lut = Lut::parse(&text).unwrap();
        assert_eq!(lut.len(), 4);
        assert_eq!(lut.map(0), 5);
        assert_eq!(lut.map(u16::MAX), 8);
    }

    #[test]
    fn accepts_tab_separated_columns() {
        let lut = Lut::parse("0\t10\n1\t20\n").unwrap();
        assert_eq!(lut.map(u16::MAX), 20);
    }

    #[test]
    fn rejects_missing_value_column() {
        assert_eq!(Lut::parse("0 1\n1\n"), Err(LutError::Malformed { line: 2 }));
    }

    #[test]
    fn rejects_extra_column() {
        assert_eq!(Lut::parse("0 1 2\n"), Err(LutError::Malformed { line: 1 }));
    }

    #[test]
    fn rejects_non_numeric() {
        assert_eq!(Lut::parse("0 abc\n"), Err(LutError::Malformed { line: 1 }));
    }

    #[test]
    fn rejects_skipped_index() {
        assert_eq!(
            Lut::parse("0 1\n2 3\n"),
            Err(LutError::OutOfOrder {
                line: 2,
                expected: 1,
                found: 2
            })
        );
    }

    #[test]
    fn rejects_value_above_16_bits() {
        assert_eq!(
            Lut::parse("0 1\n1 65536\n"),
            Err(LutError::ValueOutOfRange {
                line: 2,
                value: 65536
            })
        );
    }

    #[test]
    fn rejects_empty_file() {
        assert_eq!(Lut::parse("# nothing\n"), Err(LutError::Empty));
    }

    #[test]
    fn load_reports_missing_file_as_io() {
        let err = Lut::load("/nonexistent/slm0000_532.lut").unwrap_err();
        assert!(matches!(err, SlmError::Io { .. }));
    }

    #[test]
    fn load_reports_bad_content_as_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.lut");
        std::fs::write(&path, "0 1\n1 x\n").unwrap();
        let err = Lut::load(&path).unwrap_err();
        assert!(matches!(
            err,
            SlmError::LutParse {
                source: LutError::Malformed { line: 2 },
                ..
            }
        ));
    }

    #[test]
    fn apply_maps_in_place() {
        let lut = Lut::from_table(vec![9, 99]).unwrap();
        let mut samples = [0, 40000];
        lut.apply(&mut samples);
        assert_eq!(samples, [9, 99]);
    }
}
