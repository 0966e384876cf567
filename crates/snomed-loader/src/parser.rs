//! Generic RF2 file parser.
//!
//! Streams tab-delimited RF2 snapshot files record by record, validating the
//! header against the columns each record type expects.

use std::fs::File;
use std::io::{BufReader, Read};
use std::marker::PhantomData;
use std::path::Path;

use csv::{Reader, ReaderBuilder, StringRecord};
use snomed_types::SctId;

use crate::types::{Rf2Config, Rf2Error, Rf2Result};

/// A row type that can be read from an RF2 file.
pub trait Rf2Record: Sized {
    /// Expected column names for this record type.
    const EXPECTED_COLUMNS: &'static [&'static str];

    /// Parse a record from a CSV StringRecord.
    fn from_record(record: &StringRecord) -> Rf2Result<Self>;

    /// Whether the row is active.
    fn is_active(&self) -> bool;

    /// Returns true if this record passes the given filter config.
    fn passes_filter(&self, config: &Rf2Config) -> bool {
        !config.active_only || self.is_active()
    }
}

/// A streaming parser for RF2 files.
pub struct Rf2Parser<R: Read, T: Rf2Record> {
    reader: Reader<R>,
    config: Rf2Config,
    records_read: usize,
    records_skipped: usize,
    _marker: PhantomData<T>,
}

impl<T: Rf2Record> Rf2Parser<BufReader<File>, T> {
    /// Creates a new parser from a file path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or has invalid headers.
    pub fn from_path<P: AsRef<Path>>(path: P, config: Rf2Config) -> Rf2Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(Rf2Error::FileNotFound {
                path: path.display().to_string(),
            });
        }

        Self::from_reader(BufReader::new(File::open(path)?), config)
    }
}

impl<R: Read, T: Rf2Record> Rf2Parser<R, T> {
    /// Creates a new parser from a reader.
    pub fn from_reader(reader: R, config: Rf2Config) -> Rf2Result<Self> {
        let mut csv_reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(false)
            .quoting(false)
            .trim(csv::Trim::None)
            .from_reader(reader);

        validate_headers(csv_reader.headers()?, T::EXPECTED_COLUMNS)?;

        Ok(Self {
            reader: csv_reader,
            config,
            records_read: 0,
            records_skipped: 0,
            _marker: PhantomData,
        })
    }

    /// Returns the number of records read so far.
    pub fn records_read(&self) -> usize {
        self.records_read
    }

    /// Returns the number of records dropped by the filter so far.
    pub fn records_skipped(&self) -> usize {
        self.records_skipped
    }

    /// Parses all remaining records, stopping at the first malformed one.
    pub fn parse_all(self) -> Rf2Result<Vec<T>> {
        self.collect()
    }
}

/// Checks that the header starts with the expected columns.
pub(crate) fn validate_headers(headers: &StringRecord, expected: &[&str]) -> Rf2Result<()> {
    if headers.len() < expected.len() {
        return Err(Rf2Error::InvalidHeader {
            expected: expected.len(),
            found: headers.len(),
        });
    }

    for (position, expected_col) in expected.iter().enumerate() {
        // Release files may start with a UTF-8 BOM.
        let found = headers
            .get(position)
            .unwrap_or("")
            .trim_start_matches('\u{feff}');
        if found != *expected_col {
            return Err(Rf2Error::UnexpectedColumn {
                position,
                expected: expected_col.to_string(),
                found: found.to_string(),
            });
        }
    }

    Ok(())
}

impl<R: Read, T: Rf2Record> Iterator for Rf2Parser<R, T> {
    type Item = Rf2Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut record = StringRecord::new();
        loop {
            match self.reader.read_record(&mut record) {
                Ok(true) => {
                    self.records_read += 1;

                    if record.iter().all(|f| f.trim().is_empty()) {
                        continue;
                    }

                    match T::from_record(&record) {
                        Ok(parsed) if parsed.passes_filter(&self.config) => {
                            return Some(Ok(parsed))
                        }
                        Ok(_) => self.records_skipped += 1,
                        Err(e) => return Some(Err(e)),
                    }
                }
                Ok(false) => return None,
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

/// Helper functions for parsing RF2 field values.
pub mod parse {
    use super::{Rf2Error, Rf2Result, SctId};
    use csv::StringRecord;

    /// Returns column `index`, or an empty string when the row is short.
    pub fn field(record: &StringRecord, index: usize) -> &str {
        record.get(index).unwrap_or("")
    }

    /// Parses an SCTID from a string.
    pub fn sctid(value: &str) -> Rf2Result<SctId> {
        value.parse::<SctId>().map_err(|_| Rf2Error::InvalidSctId {
            value: value.to_string(),
        })
    }

    /// Parses a boolean from "0" or "1".
    pub fn boolean(value: &str) -> Rf2Result<bool> {
        match value {
            "0" => Ok(false),
            "1" => Ok(true),
            _ => Err(Rf2Error::InvalidBoolean {
                value: value.to_string(),
            }),
        }
    }

    /// Validates an effective time (YYYYMMDD).
    pub fn effective_time(value: &str) -> Rf2Result<u32> {
        if value.len() != 8 {
            return Err(Rf2Error::InvalidDate {
                value: value.to_string(),
            });
        }
        value.parse::<u32>().map_err(|_| Rf2Error::InvalidDate {
            value: value.to_string(),
        })
    }

    /// Parses an integer value.
    pub fn integer<T: std::str::FromStr>(value: &str) -> Rf2Result<T> {
        value.parse::<T>().map_err(|_| Rf2Error::InvalidInteger {
            value: value.to_string(),
        })
    }
}
