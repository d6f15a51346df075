//! Deduplicated record export (EndNote XML).
//!
//! ```xml
//! <xml><records><record>
//!   <ref-type name="Journal Article">17</ref-type>
//!   <contributors><authors><author><style>Smith, J.</style></author></authors></contributors>
//!   <titles>
//!     <title><style>Salmon Habitat</style></title>
//!     <secondary-title><style>Fisheries Journal</style></secondary-title>
//!   </titles>
//!   <dates><year><style>2019</style></year></dates>
//! </record></records></xml>
//! ```
//!
//! Field text may sit directly in the field element or inside `<style>`
//! runs, which are concatenated after trimming.

use biblio_reconcile_core::models::Record;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::extract::{attr_value, syntax_error, ExtractError};

/// Records read from one export.
#[derive(Debug, Default)]
pub struct RecordSet {
    pub records: Vec<Record>,
    /// `<record>` elements without a usable title.
    pub skipped: usize,
}

#[derive(Debug, Default)]
struct Draft {
    title: String,
    item_type: Option<String>,
    authors: Vec<String>,
    journal: String,
    year: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    Title,
    Journal,
    Author,
    Year,
}

/// Parse an EndNote XML export, tagging every record with `library`.
pub fn parse_records(xml: &[u8], library: &str) -> Result<RecordSet, ExtractError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    // Local names of the open elements.
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut draft: Option<Draft> = None;
    let mut saw_record = false;
    let mut out = RecordSet::default();

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| syntax_error(&reader, e))?;
        match event {
            Event::Start(e) => {
                open_element(&e, &mut draft, &mut saw_record)?;
                stack.push(e.local_name().as_ref().to_vec());
            }
            Event::Empty(e) => open_element(&e, &mut draft, &mut saw_record)?,
            Event::Text(t) => {
                if let Some(d) = draft.as_mut() {
                    append(d, field_at(&stack), &t.unescape()?);
                }
            }
            Event::CData(c) => {
                if let Some(d) = draft.as_mut() {
                    append(d, field_at(&stack), &String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::End(_) => {
                if stack.pop().as_deref() == Some(b"record".as_slice()) {
                    if let Some(d) = draft.take() {
                        match finish(d, library) {
                            Some(record) => out.records.push(record),
                            None => out.skipped += 1,
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !saw_record && out.records.is_empty() {
        return Err(ExtractError::NotRecognized {
            format: "EndNote XML",
            element: "record",
        });
    }
    if out.skipped > 0 {
        tracing::warn!(library, skipped = out.skipped, "records without a title skipped");
    }
    Ok(out)
}

fn open_element(
    e: &BytesStart<'_>,
    draft: &mut Option<Draft>,
    saw_record: &mut bool,
) -> Result<(), ExtractError> {
    match e.local_name().as_ref() {
        b"record" => {
            *saw_record = true;
            *draft = Some(Draft::default());
        }
        b"ref-type" => {
            if let Some(d) = draft.as_mut() {
                d.item_type = attr_value(e, b"name")?.filter(|v| !v.trim().is_empty());
            }
        }
        b"author" => {
            if let Some(d) = draft.as_mut() {
                d.authors.push(String::new());
            }
        }
        _ => {}
    }
    Ok(())
}

/// The record field the innermost open element feeds, ignoring `<style>` runs.
fn field_at(stack: &[Vec<u8>]) -> Option<Field> {
    let mut names = stack.iter().rev().filter(|n| n.as_slice() != b"style");
    let innermost = names.next()?;
    let outer = names.next().map(Vec::as_slice);
    match (innermost.as_slice(), outer) {
        (b"title", Some(b"titles")) => Some(Field::Title),
        (b"secondary-title", Some(b"titles")) => Some(Field::Journal),
        (b"author", _) => Some(Field::Author),
        (b"year", Some(b"dates")) => Some(Field::Year),
        _ => None,
    }
}

fn append(draft: &mut Draft, field: Option<Field>, text: &str) {
    let target = match field {
        Some(Field::Title) => &mut draft.title,
        Some(Field::Journal) => &mut draft.journal,
        Some(Field::Year) => &mut draft.year,
        Some(Field::Author) => match draft.authors.last_mut() {
            Some(author) => author,
            None => return,
        },
        None => return,
    };
    target.push_str(text);
}

fn finish(draft: Draft, library: &str) -> Option<Record> {
    let title = draft.title.trim();
    if title.is_empty() {
        return None;
    }
    let non_empty = |s: String| {
        let t = s.trim().to_string();
        (!t.is_empty()).then_some(t)
    };
    let mut record = Record::new(library, title);
    record.item_type = draft.item_type;
    record.authors = draft.authors.into_iter().filter_map(non_empty).collect();
    record.journal = non_empty(draft.journal);
    record.year = non_empty(draft.year);
    Some(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xml><records>
<record>
  <ref-type name="Journal Article">17</ref-type>
  <contributors><authors>
    <author><style face="normal" font="default" size="100%">Smith, J.</style></author>
    <author><style face="normal">Doe, A.</style></author>
  </authors></contributors>
  <titles>
    <title><style face="normal">Salmon   HABITAT!</style></title>
    <secondary-title><style face="normal">Fisheries Journal</style></secondary-title>
  </titles>
  <periodical><full-title><style>Fisheries J.</style></full-title></periodical>
  <dates><year><style face="normal">2019</style></year></dates>
</record>
<record>
  <ref-type name="Book">6</ref-type>
  <titles><title>Water Quality</title></titles>
</record>
<record>
  <titles><secondary-title><style>Orphan Journal</style></secondary-title></titles>
</record>
</records></xml>"#;

    #[test]
    fn test_reads_fields() {
        let set = parse_records(SAMPLE.as_bytes(), "Search").unwrap();
        assert_eq!(set.records.len(), 2);
        assert_eq!(set.skipped, 1);

        let first = &set.records[0];
        assert_eq!(first.title, "Salmon   HABITAT!");
        assert_eq!(first.normalized_title, "salmon habitat");
        assert_eq!(first.library, "Search");
        assert_eq!(first.item_type.as_deref(), Some("Journal Article"));
        assert_eq!(first.authors, vec!["Smith, J.", "Doe, A."]);
        assert_eq!(first.journal.as_deref(), Some("Fisheries Journal"));
        assert_eq!(first.year.as_deref(), Some("2019"));
    }

    #[test]
    fn test_unstyled_title_and_missing_fields() {
        let set = parse_records(SAMPLE.as_bytes(), "Search").unwrap();
        let book = &set.records[1];
        assert_eq!(book.title, "Water Quality");
        assert!(book.authors.is_empty());
        assert_eq!(book.journal, None);
        assert_eq!(book.year, None);
    }

    #[test]
    fn test_empty_export_is_not_an_error() {
        let set = parse_records(b"<xml><records><record/></records></xml>", "Search").unwrap();
        assert!(set.records.is_empty());
        assert_eq!(set.skipped, 0);
    }

    #[test]
    fn test_rejects_other_documents() {
        let err = parse_records(b"<rdf:RDF/>", "Search").unwrap_err();
        assert!(matches!(err, ExtractError::NotRecognized { .. }));
    }
}
