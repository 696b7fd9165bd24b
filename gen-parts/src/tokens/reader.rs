//! Tab-separated token stream reader.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

/// Rows with fewer columns than this are dropped.
pub const REQUIRED_COLUMNS: usize = 14;

const PARAGRAPH_COLUMN: usize = 0;
const WORD_COLUMN: usize = 4;
const SPEAKER_COLUMN: usize = 13;

/// One word of the token stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    pub paragraph_id: String,
    pub word: String,
    pub speaker_id: String,
}

impl TokenRecord {
    pub fn new(
        paragraph_id: impl Into<String>,
        word: impl Into<String>,
        speaker_id: impl Into<String>,
    ) -> Self {
        Self {
            paragraph_id: paragraph_id.into(),
            word: word.into(),
            speaker_id: speaker_id.into(),
        }
    }

    /// Parse one data row, returning None for rows that are too short.
    pub fn from_row(row: &str) -> Option<Self> {
        let row = row.trim_end_matches(['\n', '\r']);
        let columns: Vec<&str> = row.split('\t').collect();
        if columns.len() < REQUIRED_COLUMNS {
            return None;
        }
        Some(Self::new(
            columns[PARAGRAPH_COLUMN],
            columns[WORD_COLUMN],
            columns[SPEAKER_COLUMN],
        ))
    }
}

/// Lazy reader over a token file. Reopen the file to restart.
pub struct TokenReader<R: BufRead> {
    lines: Lines<R>,
    header_skipped: bool,
    line_number: usize,
    discarded: usize,
}

impl TokenReader<BufReader<File>> {
    /// Open a token file for reading.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open token file {}", path.display()))?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> TokenReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            header_skipped: false,
            line_number: 0,
            discarded: 0,
        }
    }

    /// Number of malformed rows skipped so far.
    pub fn discarded(&self) -> usize {
        self.discarded
    }
}

impl<R: BufRead> Iterator for TokenReader<R> {
    type Item = Result<TokenRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => {
                    return Some(
                        Err(e).with_context(|| {
                            format!("Failed to read token line {}", self.line_number + 1)
                        }),
                    );
                }
            };
            self.line_number += 1;

            if !self.header_skipped {
                self.header_skipped = true;
                continue;
            }

            match TokenRecord::from_row(&line) {
                Some(record) => return Some(Ok(record)),
                None => {
                    self.discarded += 1;
                    log::trace!("skipping short token row {}", self.line_number);
                }
            }
        }
    }
}
