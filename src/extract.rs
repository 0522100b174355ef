//! Heuristic field extraction from rendered manual-page text.
//!
//! These are string-offset scans over literal section headings, not a
//! troff/groff grammar. They are kept pure over the input text and hidden
//! behind [`ManualSource`] so a real manual-page parser could replace them
//! without touching the record, serializer, or store contracts.

use thiserror::Error;

use crate::exec::{self, ExecError, TOOL_TIMEOUT};

pub const DESCRIPTION_HEADING: &str = "DESCRIPTION";
pub const EXAMPLES_HEADING: &str = "EXAMPLES";
pub const SEE_ALSO_HEADING: &str = "SEE ALSO";

const VERSION_FLAG: &str = "--version";

/// How a single field extraction failed. Failures are data, not control
/// flow: a record with every field in an error state is still a valid,
/// storable record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("'{0}' section not found in the manual")]
    SectionNotFound(&'static str),
    #[error("version query failed: {0}")]
    VersionQueryFailed(String),
    #[error("external tool timed out")]
    ExternalToolTimeout,
}

pub type Field = Result<String, FieldError>;

/// Why a probe for raw text failed, before the failure is attributed to any
/// particular field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// The tool ran but reported failure; carries whatever it printed.
    Unavailable(String),
    Timeout,
}

/// Source of the raw text the extractor scans: the rendered manual page and
/// the output of a version query. Anything implementing this can stand in
/// for the host system in tests.
pub trait ManualSource {
    fn manual_text(&self, command: &str) -> Result<String, ProbeError>;
    fn version_output(&self, command: &str) -> Result<String, ProbeError>;
}

/// Probes the host: `man <command>` for the page, `<command> --version` for
/// the version report.
pub struct SystemSource;

impl ManualSource for SystemSource {
    fn manual_text(&self, command: &str) -> Result<String, ProbeError> {
        let cap = exec::run_captured("man", &[command], TOOL_TIMEOUT).map_err(probe_error)?;
        if cap.success() {
            Ok(cap.stdout)
        } else {
            Err(ProbeError::Unavailable(cap.combined().trim().to_string()))
        }
    }

    fn version_output(&self, command: &str) -> Result<String, ProbeError> {
        let cap = exec::run_captured(command, &[VERSION_FLAG], TOOL_TIMEOUT).map_err(probe_error)?;
        let combined = cap.combined().trim().to_string();
        if cap.success() {
            Ok(combined)
        } else {
            Err(ProbeError::Unavailable(combined))
        }
    }
}

fn probe_error(err: ExecError) -> ProbeError {
    match err {
        ExecError::Timeout { .. } => ProbeError::Timeout,
        other => ProbeError::Unavailable(other.to_string()),
    }
}

/// One-line heuristic: the description is the single line that follows the
/// `DESCRIPTION` heading's own line, trimmed. Bodies that begin on the
/// heading's line or span multiple paragraphs are deliberately not handled.
pub fn description(manual: &str) -> Field {
    let Some(at) = manual.find(DESCRIPTION_HEADING) else {
        return Err(FieldError::SectionNotFound(DESCRIPTION_HEADING));
    };
    let mut lines = manual[at..].lines();
    lines.next(); // the heading's own line
    Ok(lines.next().unwrap_or("").trim().to_string())
}

/// The example is the second line below the `EXAMPLES` heading's line, and
/// only if that line is non-blank. A manual whose second line is blank
/// yields an empty example even when a usable one follows further down —
/// a known limitation of the fixed-offset scan.
pub fn example(manual: &str) -> Field {
    let Some(at) = manual.find(EXAMPLES_HEADING) else {
        return Err(FieldError::SectionNotFound(EXAMPLES_HEADING));
    };
    let mut lines = manual[at..].lines();
    lines.next(); // the heading's own line
    lines.next(); // first line below the heading, skipped by the offset scan
    Ok(lines.next().unwrap_or("").trim().to_string())
}

/// Related commands come from the `SEE ALSO` block: the text between the
/// heading and the first blank line, of which the second line is taken.
/// A block with nothing under the heading gives an empty value rather than
/// an error; a missing heading or missing blank-line terminator is an error.
pub fn related_commands(manual: &str) -> Field {
    let Some(start) = manual.find(SEE_ALSO_HEADING) else {
        return Err(FieldError::SectionNotFound(SEE_ALSO_HEADING));
    };
    let Some(end) = manual[start..].find("\n\n") else {
        return Err(FieldError::SectionNotFound(SEE_ALSO_HEADING));
    };
    let block = manual[start..start + end].trim();
    match block.lines().nth(1) {
        Some(line) => Ok(line.trim().to_string()),
        None => Ok(String::new()),
    }
}

/// Canned [`ManualSource`] for tests.
#[cfg(test)]
pub(crate) struct FakeSource {
    pub manual: Result<String, ProbeError>,
    pub version: Result<String, ProbeError>,
}

#[cfg(test)]
impl FakeSource {
    pub fn new(manual: &str, version: &str) -> Self {
        FakeSource {
            manual: Ok(manual.to_string()),
            version: Ok(version.to_string()),
        }
    }
}

#[cfg(test)]
impl ManualSource for FakeSource {
    fn manual_text(&self, _command: &str) -> Result<String, ProbeError> {
        self.manual.clone()
    }

    fn version_output(&self, _command: &str) -> Result<String, ProbeError> {
        self.version.clone()
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    const CAT_MANUAL: &str = "NAME\n cat\nDESCRIPTION\n concatenate files\nSEE ALSO\n ls(1), cp(1)\n\n";

    #[test]
    fn description_is_the_line_under_the_heading() {
        assert_eq!(description(CAT_MANUAL).unwrap(), "concatenate files");
    }

    #[test]
    fn description_missing_heading() {
        assert_eq!(
            description("NAME\n cat\n").unwrap_err(),
            FieldError::SectionNotFound("DESCRIPTION")
        );
    }

    #[test]
    fn example_second_line_non_blank() {
        let manual = "EXAMPLES\n\n cat file1 file2\n";
        assert_eq!(example(manual).unwrap(), "cat file1 file2");
    }

    #[test]
    fn example_second_line_blank_yields_empty() {
        // The non-blank example further down is never reached.
        let manual = "EXAMPLES\n\n\n cat file1\n";
        assert_eq!(example(manual).unwrap(), "");
    }

    #[test]
    fn example_missing_heading() {
        assert_eq!(
            example("DESCRIPTION\n text\n").unwrap_err(),
            FieldError::SectionNotFound("EXAMPLES")
        );
    }

    #[test]
    fn related_commands_second_line_of_block() {
        assert_eq!(related_commands(CAT_MANUAL).unwrap(), "ls(1), cp(1)");
    }

    #[test]
    fn related_commands_one_line_block_is_empty_not_error() {
        let manual = "SEE ALSO\n\nHISTORY\n";
        assert_eq!(related_commands(manual).unwrap(), "");
    }

    #[test]
    fn related_commands_missing_heading() {
        assert_eq!(
            related_commands("DESCRIPTION\n text\n").unwrap_err(),
            FieldError::SectionNotFound("SEE ALSO")
        );
    }

    #[test]
    fn related_commands_missing_terminator() {
        // Heading present but no blank line ever follows.
        let manual = "SEE ALSO\n ls(1)\n";
        assert_eq!(
            related_commands(manual).unwrap_err(),
            FieldError::SectionNotFound("SEE ALSO")
        );
    }

    #[test]
    fn fields_are_independent() {
        // No DESCRIPTION heading, but SEE ALSO still extracts.
        let manual = "NAME\n thing\nSEE ALSO\n other(1)\n\n";
        assert!(matches!(
            description(manual),
            Err(FieldError::SectionNotFound("DESCRIPTION"))
        ));
        assert_eq!(related_commands(manual).unwrap(), "other(1)");
    }
}
