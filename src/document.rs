//! The canonical document format: a `CommandManual` root holding five named
//! child elements, one text value each. Extension and indentation are
//! cosmetic; escaping is the format's job, so field text containing `<`,
//! `>`, or `&` survives the round trip.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use thiserror::Error;

use crate::extract::{Field, FieldError, ManualSource};
use crate::record::{FrozenFields, Record};

pub const ROOT_TAG: &str = "CommandManual";
pub const NAME_TAG: &str = "CommandName";
pub const DESCRIPTION_TAG: &str = "CommandDescription";
pub const VERSION_TAG: &str = "VersionHistory";
pub const EXAMPLE_TAG: &str = "Example";
pub const RELATED_TAG: &str = "RelatedCommands";

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("malformed document: missing '{0}' element")]
    Malformed(&'static str),
    #[error(transparent)]
    Xml(#[from] quick_xml::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Serialize a record. Live records are probed at serialization time, so the
/// document always holds the current extraction results rather than values
/// cached at construction. Field errors are written as descriptive sentinel
/// text; in-memory they stay tagged, on disk they are plain prose.
pub fn to_xml(record: &Record, source: &dyn ManualSource) -> Result<String, DocumentError> {
    let mut writer = Writer::new(Vec::new());
    let id = record.identifier();

    writer.write_event(Event::Start(BytesStart::new(ROOT_TAG)))?;
    write_field(&mut writer, NAME_TAG, id)?;
    write_field(&mut writer, DESCRIPTION_TAG, &render(id, record.description(source)))?;
    write_field(&mut writer, VERSION_TAG, &render(id, record.version_info(source)))?;
    write_field(&mut writer, EXAMPLE_TAG, &render(id, record.example(source)))?;
    write_field(&mut writer, RELATED_TAG, &render(id, record.related_commands(source)))?;
    writer.write_event(Event::End(BytesEnd::new(ROOT_TAG)))?;

    let xml = String::from_utf8_lossy(&writer.into_inner()).into_owned();
    // One element per line. Text never contains a raw '><' pair because the
    // writer escapes angle brackets, so this only splits adjacent tags.
    Ok(xml.replace("><", ">\n<"))
}

fn write_field(
    writer: &mut Writer<Vec<u8>>,
    tag: &str,
    text: &str,
) -> Result<(), DocumentError> {
    if text.is_empty() {
        // Self-closing, so the cosmetic newline splitting cannot leak a
        // newline into an empty value on reload.
        writer.write_event(Event::Empty(BytesStart::new(tag)))?;
        return Ok(());
    }
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    // Escape only the delimiter set (`<`, `>`, `&`); full escaping would
    // also turn quotes into entities, which the format does not require.
    writer.write_event(Event::Text(BytesText::from_escaped(
        quick_xml::escape::partial_escape(text),
    )))?;
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

fn render(identifier: &str, field: Field) -> String {
    match field {
        Ok(text) => text,
        Err(FieldError::SectionNotFound(section)) => {
            format!("Error: '{section}' not found in the manual for command '{identifier}'.")
        }
        Err(FieldError::VersionQueryFailed(output)) => {
            format!("Error retrieving version history for command '{identifier}': {output}")
        }
        Err(FieldError::ExternalToolTimeout) => {
            format!("Error: external tool timed out for command '{identifier}'.")
        }
    }
}

/// Rebuild a record from document text. Elements are looked up by tag name,
/// order-independent; the result is frozen to the stored values and never
/// re-probes. Any of the five elements missing is a malformed document.
pub fn from_xml(xml: &str) -> Result<Record, DocumentError> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut fields: [(&'static str, Option<String>); 5] = [
        (NAME_TAG, None),
        (DESCRIPTION_TAG, None),
        (VERSION_TAG, None),
        (EXAMPLE_TAG, None),
        (RELATED_TAG, None),
    ];
    let mut current: Option<usize> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                current = slot(e.name().as_ref());
                if let Some(i) = current {
                    fields[i].1.get_or_insert_with(String::new);
                }
            }
            Event::Empty(e) => {
                if let Some(i) = slot(e.name().as_ref()) {
                    fields[i].1.get_or_insert_with(String::new);
                }
            }
            Event::Text(e) => {
                if let Some(i) = current {
                    if let Some(value) = &mut fields[i].1 {
                        value.push_str(&e.unescape()?);
                    }
                }
            }
            Event::End(_) => current = None,
            Event::Eof => break,
            _ => {}
        }
    }

    let [name, description, version, example, related] =
        fields.map(|(tag, value)| value.ok_or(DocumentError::Malformed(tag)));
    Ok(Record::frozen(
        name?,
        FrozenFields {
            description: description?,
            version_info: version?,
            example: example?,
            related_commands: related?,
        },
    ))
}

fn slot(name: &[u8]) -> Option<usize> {
    match name {
        n if n == NAME_TAG.as_bytes() => Some(0),
        n if n == DESCRIPTION_TAG.as_bytes() => Some(1),
        n if n == VERSION_TAG.as_bytes() => Some(2),
        n if n == EXAMPLE_TAG.as_bytes() => Some(3),
        n if n == RELATED_TAG.as_bytes() => Some(4),
        _ => None,
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{FakeSource, ProbeError};

    fn frozen(description: &str, version: &str, example: &str, related: &str) -> Record {
        Record::frozen(
            "cat",
            FrozenFields {
                description: description.into(),
                version_info: version.into(),
                example: example.into(),
                related_commands: related.into(),
            },
        )
    }

    // Frozen records ignore the source, so any fake will do.
    fn unused_source() -> FakeSource {
        FakeSource::new("", "")
    }

    #[test]
    fn round_trip_preserves_all_five_values() {
        let record = frozen(
            "concatenate files",
            "cat (GNU coreutils) 9.4\nCopyright (C) 2023",
            "cat f - g",
            "tac(1)",
        );
        let xml = to_xml(&record, &unused_source()).unwrap();
        let loaded = from_xml(&xml).unwrap();
        assert_eq!(loaded.identifier(), "cat");
        let src = unused_source();
        assert_eq!(loaded.description(&src).unwrap(), "concatenate files");
        assert_eq!(
            loaded.version_info(&src).unwrap(),
            "cat (GNU coreutils) 9.4\nCopyright (C) 2023"
        );
        assert_eq!(loaded.example(&src).unwrap(), "cat f - g");
        assert_eq!(loaded.related_commands(&src).unwrap(), "tac(1)");
    }

    #[test]
    fn round_trip_escapes_delimiters() {
        let record = frozen("redirect with 2>&1 into <file>", "v1 & v2", "", "");
        let xml = to_xml(&record, &unused_source()).unwrap();
        assert!(!xml.contains("2>&1 into <file>"), "text must be escaped");
        let loaded = from_xml(&xml).unwrap();
        let src = unused_source();
        assert_eq!(
            loaded.description(&src).unwrap(),
            "redirect with 2>&1 into <file>"
        );
        assert_eq!(loaded.version_info(&src).unwrap(), "v1 & v2");
    }

    #[test]
    fn empty_fields_survive_the_round_trip() {
        let record = frozen("", "", "", "");
        let xml = to_xml(&record, &unused_source()).unwrap();
        let loaded = from_xml(&xml).unwrap();
        let src = unused_source();
        assert_eq!(loaded.description(&src).unwrap(), "");
        assert_eq!(loaded.example(&src).unwrap(), "");
    }

    #[test]
    fn serializes_the_current_live_extraction() {
        let record = Record::live("cat");
        let source = FakeSource::new(
            "DESCRIPTION\n concatenate files\nSEE ALSO\n tac(1)\n\n",
            "cat 9.4",
        );
        let xml = to_xml(&record, &source).unwrap();
        assert!(xml.contains("<CommandName>cat</CommandName>"));
        assert!(xml.contains("concatenate files"));
        assert!(xml.contains("cat 9.4"));
        assert!(xml.contains("tac(1)"));
    }

    #[test]
    fn field_errors_serialize_as_sentinel_text() {
        let record = Record::live("ghost");
        let source = FakeSource {
            manual: Err(ProbeError::Unavailable("No manual entry".into())),
            version: Err(ProbeError::Unavailable("not found".into())),
        };
        let xml = to_xml(&record, &source).unwrap();
        assert!(xml.contains("'DESCRIPTION' not found in the manual for command 'ghost'"));
        assert!(xml.contains("Error retrieving version history for command 'ghost': not found"));
        // A document full of sentinels is still a loadable document.
        let loaded = from_xml(&xml).unwrap();
        assert_eq!(loaded.identifier(), "ghost");
    }

    #[test]
    fn missing_element_is_malformed() {
        let xml = "<CommandManual>\n<CommandName>cat</CommandName>\n\
                   <CommandDescription>d</CommandDescription>\n\
                   <VersionHistory>v</VersionHistory>\n\
                   <RelatedCommands>r</RelatedCommands>\n</CommandManual>";
        let err = from_xml(xml).unwrap_err();
        assert!(matches!(err, DocumentError::Malformed(EXAMPLE_TAG)));
    }

    #[test]
    fn element_order_does_not_matter_on_load() {
        let xml = "<CommandManual>\
                   <RelatedCommands>r</RelatedCommands>\
                   <Example>e</Example>\
                   <VersionHistory>v</VersionHistory>\
                   <CommandDescription>d</CommandDescription>\
                   <CommandName>cat</CommandName>\
                   </CommandManual>";
        let loaded = from_xml(xml).unwrap();
        let src = unused_source();
        assert_eq!(loaded.identifier(), "cat");
        assert_eq!(loaded.description(&src).unwrap(), "d");
        assert_eq!(loaded.related_commands(&src).unwrap(), "r");
    }

    #[test]
    fn one_element_per_line() {
        let record = frozen("desc", "v", "ex", "rel");
        let xml = to_xml(&record, &unused_source()).unwrap();
        assert!(xml.lines().count() >= 7);
        assert!(xml.starts_with("<CommandManual>\n<CommandName>"));
    }
}
