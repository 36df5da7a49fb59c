/*!
 * History ledger of produced output paths.
 *
 * The ledger is a newline-delimited file of absolute paths. It is read once
 * at the start of a run and persisted after every committed document, so a
 * crashed run loses at most the document in flight.
 *
 * In re-translate mode the file is rewritten with only the paths produced
 * by the current run, at every commit and once more when the run finishes,
 * so a run that produced nothing still clears the stale entries.
 */

use log::debug;
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::errors::PipelineError;

/// How committed paths reach the ledger file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerMode {
    /// Append new paths to the existing entries
    Append,
    /// Replace the file with only this run's paths
    Overwrite,
}

/// Ordered, de-duplicated set of produced output paths
#[derive(Debug, Clone)]
pub struct HistoryLedger {
    /// Backing file, `None` keeps the ledger in memory only
    path: Option<PathBuf>,
    mode: LedgerMode,
    /// Entries known at run start
    entries: Vec<PathBuf>,
    index: HashSet<PathBuf>,
    /// Entries committed during this run
    produced: Vec<PathBuf>,
}

impl HistoryLedger {
    /// In-memory ledger, nothing is persisted
    pub fn in_memory(mode: LedgerMode) -> Self {
        Self {
            path: None,
            mode,
            entries: Vec::new(),
            index: HashSet::new(),
            produced: Vec::new(),
        }
    }

    /// Load the ledger file; a missing file is an empty ledger
    pub fn load(path: impl Into<PathBuf>, mode: LedgerMode) -> Result<Self, PipelineError> {
        let path = path.into();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => String::new(),
            Err(source) => return Err(PipelineError::Ledger { path, source }),
        };

        let mut ledger = Self::in_memory(mode);
        ledger.path = Some(path);
        for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let entry = PathBuf::from(line);
            if ledger.index.insert(entry.clone()) {
                ledger.entries.push(entry);
            }
        }
        debug!("Loaded {} history entries", ledger.entries.len());
        Ok(ledger)
    }

    pub fn mode(&self) -> LedgerMode {
        self.mode
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether an output path was produced by an earlier run or this one
    pub fn contains(&self, path: &Path) -> bool {
        self.index.contains(path)
    }

    /// Entries in ledger order: earlier runs first (append mode only), then
    /// this run's commits
    pub fn entries(&self) -> Vec<&Path> {
        let previous = match self.mode {
            LedgerMode::Append => self.entries.iter(),
            LedgerMode::Overwrite => self.entries[..0].iter(),
        };
        previous.chain(self.produced.iter()).map(PathBuf::as_path).collect()
    }

    /// Paths committed during this run
    pub fn produced(&self) -> &[PathBuf] {
        &self.produced
    }

    /// Record the outputs of one finished document and persist them
    pub fn commit(&mut self, paths: &[PathBuf]) -> Result<(), PipelineError> {
        let mut fresh = Vec::new();
        for path in paths {
            if self.produced.contains(path) {
                continue;
            }
            self.produced.push(path.clone());
            let already_known = !self.index.insert(path.clone());
            if !already_known || self.mode == LedgerMode::Overwrite {
                fresh.push(path.clone());
            }
        }
        self.persist(&fresh)
    }

    /// Close the run. In overwrite mode the file is rewritten even when
    /// nothing was committed.
    pub fn finish(&self) -> Result<(), PipelineError> {
        match self.mode {
            LedgerMode::Append => Ok(()),
            LedgerMode::Overwrite => self.persist(&[]),
        }
    }

    fn persist(&self, fresh: &[PathBuf]) -> Result<(), PipelineError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let ledger_error = |source| PipelineError::Ledger {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(ledger_error)?;
        }

        match self.mode {
            LedgerMode::Append => {
                if fresh.is_empty() {
                    return Ok(());
                }
                let mut file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(ledger_error)?;
                for entry in fresh {
                    writeln!(file, "{}", entry.display()).map_err(ledger_error)?;
                }
            }
            LedgerMode::Overwrite => {
                let mut content = String::new();
                for entry in &self.produced {
                    content.push_str(&entry.to_string_lossy());
                    content.push('\n');
                }
                fs::write(path, content).map_err(ledger_error)?;
            }
        }
        Ok(())
    }
}
