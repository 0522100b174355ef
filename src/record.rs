//! The structured representation of one command's manual data.

use crate::extract::{self, Field, FieldError, ManualSource, ProbeError};

/// Strip every non-alphanumeric character (Unicode-aware). Total and
/// idempotent; used as the on-disk filename stem and as the map key for
/// lookups. A fully symbolic identifier degenerates to `""`, in which case
/// its document path collides with every other such identifier.
pub fn canonical_key(identifier: &str) -> String {
    identifier.chars().filter(|c| c.is_alphanumeric()).collect()
}

/// Where a record's field values come from.
///
/// A live record re-probes the system on every field access, so its
/// reported content tracks whatever is currently installed. A frozen record
/// replays the values a document was saved with and never re-probes.
/// Diffing depends on this split: the canonical document is a frozen
/// snapshot, the draft a fresh probe.
#[derive(Debug, Clone)]
pub enum Provenance {
    Live,
    Frozen(FrozenFields),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrozenFields {
    pub description: String,
    pub version_info: String,
    pub example: String,
    pub related_commands: String,
}

#[derive(Debug, Clone)]
pub struct Record {
    identifier: String,
    canonical_key: String,
    provenance: Provenance,
}

impl Record {
    /// A record whose fields are extracted from the host on every access.
    pub fn live(identifier: impl Into<String>) -> Self {
        let identifier = identifier.into();
        // Derived once, never recomputed from a later-mutated identifier.
        let canonical_key = canonical_key(&identifier);
        Record {
            identifier,
            canonical_key,
            provenance: Provenance::Live,
        }
    }

    /// A record replaying values loaded from a document.
    pub fn frozen(identifier: impl Into<String>, fields: FrozenFields) -> Self {
        let identifier = identifier.into();
        let canonical_key = canonical_key(&identifier);
        Record {
            identifier,
            canonical_key,
            provenance: Provenance::Frozen(fields),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn canonical_key(&self) -> &str {
        &self.canonical_key
    }

    pub fn is_frozen(&self) -> bool {
        matches!(self.provenance, Provenance::Frozen(_))
    }

    /// The single line under the DESCRIPTION heading.
    pub fn description(&self, source: &dyn ManualSource) -> Field {
        match &self.provenance {
            Provenance::Frozen(f) => Ok(f.description.clone()),
            Provenance::Live => match source.manual_text(&self.identifier) {
                Ok(text) => extract::description(&text),
                Err(err) => Err(section_error(err, extract::DESCRIPTION_HEADING)),
            },
        }
    }

    /// Trimmed combined output of the version query.
    pub fn version_info(&self, source: &dyn ManualSource) -> Field {
        match &self.provenance {
            Provenance::Frozen(f) => Ok(f.version_info.clone()),
            Provenance::Live => match source.version_output(&self.identifier) {
                Ok(output) => Ok(output),
                Err(ProbeError::Timeout) => Err(FieldError::ExternalToolTimeout),
                Err(ProbeError::Unavailable(output)) => {
                    Err(FieldError::VersionQueryFailed(output))
                }
            },
        }
    }

    /// At most one line from under the EXAMPLES heading.
    pub fn example(&self, source: &dyn ManualSource) -> Field {
        match &self.provenance {
            Provenance::Frozen(f) => Ok(f.example.clone()),
            Provenance::Live => match source.manual_text(&self.identifier) {
                Ok(text) => extract::example(&text),
                Err(err) => Err(section_error(err, extract::EXAMPLES_HEADING)),
            },
        }
    }

    /// At most one line from the SEE ALSO block.
    pub fn related_commands(&self, source: &dyn ManualSource) -> Field {
        match &self.provenance {
            Provenance::Frozen(f) => Ok(f.related_commands.clone()),
            Provenance::Live => match source.manual_text(&self.identifier) {
                Ok(text) => extract::related_commands(&text),
                Err(err) => Err(section_error(err, extract::SEE_ALSO_HEADING)),
            },
        }
    }
}

/// A failed manual render fails every dependent field, each tagged with its
/// own section.
fn section_error(err: ProbeError, section: &'static str) -> FieldError {
    match err {
        ProbeError::Timeout => FieldError::ExternalToolTimeout,
        ProbeError::Unavailable(_) => FieldError::SectionNotFound(section),
    }
}

// ── Tests ──
