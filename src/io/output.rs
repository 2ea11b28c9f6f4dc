//! Streaming run document and state snapshot persistence
//!
//! The run document is one JSON object with a lattice header followed by
//! the event list, written incrementally so arbitrarily long runs never
//! buffer their history. Field names in the header and in step records are
//! a stability contract with downstream analysis.

use crate::engine::sim::StepRecord;
use crate::io::error::{KmcError, Result, fs_error};
use crate::state::{Lattice, StateSnapshot};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Lattice header of the run document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatticeHeader {
    /// Always `"hexagonal"`
    pub lattice_type: String,
    /// Always `"axial"`
    pub coord_format: String,
    /// Periodic dimensions of the unit cell
    pub dim: [usize; 2],
}

impl LatticeHeader {
    /// Header describing a lattice
    pub fn for_lattice(lattice: &Lattice) -> Self {
        Self {
            lattice_type: "hexagonal".to_string(),
            coord_format: "axial".to_string(),
            dim: lattice.dim(),
        }
    }
}

/// Incremental writer for the run document
///
/// Emits `{"lattice": …, "events": [` up front, one record per
/// [`RunWriter::record`] call, and the closing brackets on
/// [`RunWriter::finish`]. Dropping the writer without finishing leaves a
/// truncated document.
#[derive(Debug)]
pub struct RunWriter<W: Write> {
    writer: W,
    path: Option<PathBuf>,
    events: u64,
}

impl RunWriter<BufWriter<File>> {
    /// Create the run document at a path
    ///
    /// Every later write failure is reported against this path.
    ///
    /// # Errors
    ///
    /// Returns a file system error when the file cannot be created.
    pub fn create(path: &Path, lattice: &Lattice) -> Result<Self> {
        let file = File::create(path).map_err(|e| fs_error(path, "create run document", e))?;
        Self::start(BufWriter::new(file), lattice, Some(path.to_path_buf()))
    }
}

impl<W: Write> RunWriter<W> {
    /// Start a run document on an arbitrary writer
    ///
    /// # Errors
    ///
    /// Returns an error when the header cannot be written.
    pub fn new(writer: W, lattice: &Lattice) -> Result<Self> {
        Self::start(writer, lattice, None)
    }

    fn start(writer: W, lattice: &Lattice, path: Option<PathBuf>) -> Result<Self> {
        let mut out = Self {
            writer,
            path,
            events: 0,
        };
        out.writer
            .write_all(b"{\"lattice\":")
            .map_err(|e| out.write_error("write run header", e))?;
        serde_json::to_writer(&mut out.writer, &LatticeHeader::for_lattice(lattice))
            .map_err(|e| out.write_error("write run header", std::io::Error::other(e)))?;
        out.writer
            .write_all(b",\"events\":[")
            .map_err(|e| out.write_error("write run header", e))?;
        Ok(out)
    }

    /// Append one step record
    ///
    /// # Errors
    ///
    /// Returns a file system error naming the document when the record
    /// cannot be written.
    pub fn record(&mut self, record: &StepRecord) -> Result<()> {
        if self.events > 0 {
            self.writer
                .write_all(b",")
                .map_err(|e| self.write_error("write step record", e))?;
        }
        serde_json::to_writer(&mut self.writer, record)
            .map_err(|e| self.write_error("write step record", std::io::Error::other(e)))?;
        self.events += 1;
        Ok(())
    }

    /// Records written so far
    pub const fn events(&self) -> u64 {
        self.events
    }

    /// Close the document and flush
    ///
    /// # Errors
    ///
    /// Returns a file system error naming the document when the trailer
    /// cannot be written.
    pub fn finish(mut self) -> Result<()> {
        self.writer
            .write_all(b"]}")
            .map_err(|e| self.write_error("close run document", e))?;
        self.writer
            .flush()
            .map_err(|e| self.write_error("close run document", e))?;
        Ok(())
    }

    fn write_error(&self, operation: &'static str, source: std::io::Error) -> KmcError {
        match &self.path {
            Some(path) => fs_error(path, operation, source),
            None => fs_error(Path::new("<buffer>"), operation, source),
        }
    }
}

/// Parsed form of a complete run document, used for analysis and tests
#[derive(Debug, Deserialize)]
pub struct RunDocument {
    /// The lattice header
    pub lattice: LatticeHeader,
    /// All recorded steps in order
    pub events: Vec<StepRecord>,
}

/// Write a state snapshot as pretty-printed JSON
///
/// # Errors
///
/// Returns a file system error when the file cannot be written.
pub fn save_snapshot(path: &Path, snapshot: &StateSnapshot) -> Result<()> {
    let file = File::create(path).map_err(|e| fs_error(path, "create snapshot", e))?;
    serde_json::to_writer_pretty(BufWriter::new(file), snapshot)?;
    Ok(())
}

/// Read a state snapshot back from JSON
///
/// # Errors
///
/// Returns a file system error when the file cannot be read, or a snapshot
/// error for malformed content.
pub fn load_snapshot(path: &Path) -> Result<StateSnapshot> {
    let text = std::fs::read_to_string(path).map_err(|e| fs_error(path, "read snapshot", e))?;
    Ok(serde_json::from_str(&text)?)
}
