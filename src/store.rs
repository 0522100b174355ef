//! On-disk documents, one per command: `<key>.xml` is the canonical
//! snapshot, `draft_<key>.xml` the freshly regenerated one kept purely for
//! comparison.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::warn;

use crate::document::{self, DocumentError};
use crate::exec::{self, TOOL_TIMEOUT};
use crate::extract::ManualSource;
use crate::record::{canonical_key, Record};

pub const DOC_EXT: &str = "xml";
const DRAFT_PREFIX: &str = "draft_";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("diff tool failed: {0}")]
    DiffTool(String),
}

/// Outcome of comparing a canonical document against its draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffOutcome {
    Unchanged,
    Changed(String),
    MissingCanonical,
    MissingDraft,
}

pub struct DocumentStore {
    dir: PathBuf,
    /// Records reloaded from canonical documents at startup, by canonical
    /// key. Populated once, read thereafter.
    existing: HashMap<String, Record>,
    /// Records freshly generated this run, in request order. Independent of
    /// `existing`; a key collision between the two is expected.
    generated: Vec<Record>,
}

impl DocumentStore {
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        DocumentStore {
            dir: dir.into(),
            existing: HashMap::new(),
            generated: Vec::new(),
        }
    }

    pub fn canonical_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.{DOC_EXT}"))
    }

    pub fn draft_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{DRAFT_PREFIX}{key}.{DOC_EXT}"))
    }

    pub fn exists(path: &Path) -> bool {
        path.is_file()
    }

    /// Load the canonical document for every listed command. A malformed
    /// document is reported and skipped; it never aborts the batch.
    pub fn load_existing(&mut self, commands: &[String]) {
        for command in commands {
            let key = canonical_key(command);
            match self.load_canonical(&key) {
                Ok(Some(record)) => {
                    self.existing.insert(key, record);
                }
                Ok(None) => {}
                Err(err) => warn!("skipping canonical document for '{command}': {err}"),
            }
        }
    }

    /// Read and deserialize `<key>.xml`. `Ok(None)` means no document.
    pub fn load_canonical(&self, key: &str) -> Result<Option<Record>, StoreError> {
        let path = self.canonical_path(key);
        if !Self::exists(&path) {
            return Ok(None);
        }
        let xml = fs::read_to_string(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(Some(document::from_xml(&xml)?))
    }

    /// Serialize and overwrite the canonical document.
    pub fn save_canonical(
        &self,
        record: &Record,
        source: &dyn ManualSource,
    ) -> Result<(), StoreError> {
        self.write_document(&self.canonical_path(record.canonical_key()), record, source)
    }

    /// Non-destructive snapshot written next to the canonical document.
    pub fn save_draft(
        &self,
        record: &Record,
        source: &dyn ManualSource,
    ) -> Result<(), StoreError> {
        self.write_document(&self.draft_path(record.canonical_key()), record, source)
    }

    // Whole-file overwrite, made atomic by writing to a temp file in the
    // same directory and renaming over the target.
    fn write_document(
        &self,
        path: &Path,
        record: &Record,
        source: &dyn ManualSource,
    ) -> Result<(), StoreError> {
        let xml = document::to_xml(record, source)?;
        let io_err = |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(io_err)?;
        tmp.write_all(xml.as_bytes()).map_err(io_err)?;
        tmp.persist(path).map_err(|e| io_err(e.error))?;
        Ok(())
    }

    /// Line-oriented unified diff between the canonical document and its
    /// draft. Both files must exist; a missing side is reported, never read
    /// as "no change".
    pub fn diff(&self, key: &str) -> Result<DiffOutcome, StoreError> {
        let canonical = self.canonical_path(key);
        let draft = self.draft_path(key);
        if !Self::exists(&canonical) {
            return Ok(DiffOutcome::MissingCanonical);
        }
        if !Self::exists(&draft) {
            return Ok(DiffOutcome::MissingDraft);
        }

        let canonical_arg = canonical.to_string_lossy();
        let draft_arg = draft.to_string_lossy();
        let capture = exec::run_captured(
            "diff",
            &["-u", canonical_arg.as_ref(), draft_arg.as_ref()],
            TOOL_TIMEOUT,
        )
        .map_err(|e| StoreError::DiffTool(e.to_string()))?;

        // diff(1): 0 = identical, 1 = differences, >1 = trouble.
        match capture.status {
            0 => Ok(DiffOutcome::Unchanged),
            1 => Ok(DiffOutcome::Changed(capture.stdout)),
            _ => Err(StoreError::DiffTool(capture.combined().trim().to_string())),
        }
    }

    pub fn record_generated(&mut self, record: Record) {
        self.generated.push(record);
    }

    pub fn existing_record(&self, key: &str) -> Option<&Record> {
        self.existing.get(key)
    }

    pub fn existing_count(&self) -> usize {
        self.existing.len()
    }

    /// Case-insensitive substring search over the descriptions of this
    /// run's generated records (not the on-disk canonical set). One lazy
    /// pass; live descriptions are probed as the iterator advances, and
    /// fields in an error state never match.
    pub fn search_by_description<'a>(
        &'a self,
        word: &str,
        source: &'a dyn ManualSource,
    ) -> impl Iterator<Item = &'a str> + 'a {
        let needle = word.to_lowercase();
        self.generated.iter().filter_map(move |record| {
            let hit = record
                .description(source)
                .map(|d| d.to_lowercase().contains(&needle))
                .unwrap_or(false);
            hit.then(|| record.identifier())
        })
    }
}

// ── Tests ──
