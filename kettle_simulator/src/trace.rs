//! CSV trace output for simulation runs.

use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceRow {
    pub time_s: f64,
    pub measured_temp: f64,
    pub target_temp: f64,
    pub active_phases: usize,
    pub power_percent: u8,
    pub fail_safe: bool,
}

pub struct TraceWriter<W: Write> {
    writer: csv::Writer<W>,
    rows: usize,
}

impl TraceWriter<File> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, csv::Error> {
        Ok(Self::new(csv::Writer::from_path(path)?))
    }
}

impl<W: Write> TraceWriter<W> {
    fn new(writer: csv::Writer<W>) -> Self {
        Self { writer, rows: 0 }
    }

    pub fn from_writer(inner: W) -> Self {
        Self::new(csv::Writer::from_writer(inner))
    }

    pub fn write(&mut self, row: &TraceRow) -> Result<(), csv::Error> {
        self.writer.serialize(row)?;
        self.rows += 1;
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Flush and hand back the underlying writer.
    pub fn finish(self) -> Result<W, csv::Error> {
        self.writer
            .into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))
    }
}
