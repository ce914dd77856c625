//! Reads the activity record stream.
//!
//! One activity per line: `id, label, duration, pred...`, with `*` as the only
//! predecessor for activities that start the project. No header row; lines
//! starting with `#` are comments.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, Trim};

use crate::PertError;

/// One input record with its trimmed fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    /// 1-based line in the source stream.
    pub line: u64,
    pub fields: Vec<String>,
}

impl Record {
    pub fn new(line: u64, fields: Vec<String>) -> Self {
        Self { line, fields }
    }
}

pub fn read_records<R: Read>(reader: R) -> Result<Vec<Record>, PertError> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);

    let mut records = Vec::new();
    for (n, row) in csv_reader.records().enumerate() {
        let row = row?;
        let line = row.position().map(|p| p.line()).unwrap_or(n as u64 + 1);
        records.push(Record::new(line, row.iter().map(str::to_string).collect()));
    }
    Ok(records)
}

pub fn read_records_from_path(path: &Path) -> Result<Vec<Record>, PertError> {
    let file = File::open(path)?;
    read_records(file)
}
