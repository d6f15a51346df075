//! Zotero RDF/XML extraction.
//!
//! A Zotero RDF export is a flat list of top-level descriptions under
//! `rdf:RDF`. Bibliographic items carry `rdf:about` and a `dc:title`;
//! collections are `z:Collection` descriptions that reference their parent
//! with `dcterms:isPartOf` and list their contents with `dcterms:hasPart`.
//!
//! ```xml
//! <z:Collection rdf:about="#collection_2">
//!     <dc:title>Salmon</dc:title>
//!     <dcterms:isPartOf rdf:resource="#collection_1"/>
//!     <dcterms:hasPart rdf:resource="#item_17"/>
//! </z:Collection>
//! ```
//!
//! Zotero also lists sub-collections in `hasPart`. Those entries are read
//! as parent references for the child collection (unless the child names
//! its own parent) instead of as item memberships.

use std::collections::{HashMap, HashSet};

use biblio_reconcile_core::hierarchy::RawNode;
use biblio_reconcile_core::models::{CollectionMembership, LibraryItem, Record};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::extract::{attr_value, syntax_error, ExtractError};

/// Everything one RDF export contributes to a library.
#[derive(Debug, Default)]
pub struct RdfLibrary {
    pub items: Vec<LibraryItem>,
    /// Items as title-only records, for libraries without a record export.
    pub records: Vec<Record>,
    /// Collections in document order, relation-mode hints.
    pub nodes: Vec<RawNode>,
    pub memberships: Vec<CollectionMembership>,
    /// Collections without `rdf:about`.
    pub skipped_collections: usize,
}

#[derive(Debug, PartialEq)]
enum Kind {
    Collection,
    Item,
}

/// A top-level description being read.
#[derive(Debug)]
struct Description {
    kind: Kind,
    about: Option<String>,
    title: Option<String>,
    item_type: Option<String>,
    parent: Option<String>,
    parts: Vec<String>,
}

/// Which child element's text is being captured.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Capture {
    Title,
    ItemType,
}

struct Collection {
    id: String,
    title: String,
    parent: Option<String>,
    parts: Vec<String>,
}

/// Parse a Zotero RDF export of `library`.
pub fn parse_rdf(xml: &[u8], library: &str) -> Result<RdfLibrary, ExtractError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut saw_root = false;
    let mut current: Option<Description> = None;
    let mut capture: Option<Capture> = None;
    let mut text = String::new();

    let mut out = RdfLibrary::default();
    let mut collections: Vec<Collection> = Vec::new();

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| syntax_error(&reader, e))?;
        match event {
            Event::Start(e) => {
                match depth {
                    0 => saw_root = e.local_name().as_ref() == b"RDF",
                    1 if saw_root => current = Some(open_description(&e)?),
                    2 => {
                        if let Some(desc) = current.as_mut() {
                            capture = read_property(desc, &e)?;
                            text.clear();
                        }
                    }
                    _ => {}
                }
                depth += 1;
            }
            Event::Empty(e) => match depth {
                1 if saw_root => {
                    let desc = open_description(&e)?;
                    close_description(desc, library, &mut out, &mut collections);
                }
                2 => {
                    if let Some(desc) = current.as_mut() {
                        read_property(desc, &e)?;
                    }
                }
                _ => {}
            },
            Event::Text(t) if capture.is_some() => {
                text.push_str(&t.unescape()?);
            }
            Event::CData(c) if capture.is_some() => {
                text.push_str(&String::from_utf8_lossy(&c.into_inner()));
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                match depth {
                    2 => {
                        if let (Some(desc), Some(field)) = (current.as_mut(), capture.take()) {
                            let value = text.trim().to_string();
                            match field {
                                Capture::Title if desc.title.is_none() => desc.title = Some(value),
                                Capture::ItemType => desc.item_type = Some(value),
                                Capture::Title => {}
                            }
                        }
                    }
                    1 => {
                        if let Some(desc) = current.take() {
                            close_description(desc, library, &mut out, &mut collections);
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err(ExtractError::NotRecognized {
            format: "RDF",
            element: "rdf:RDF",
        });
    }

    link_collections(library, collections, &mut out);

    tracing::debug!(
        library,
        items = out.items.len(),
        collections = out.nodes.len(),
        memberships = out.memberships.len(),
        skipped = out.skipped_collections,
        "parsed RDF export"
    );
    Ok(out)
}

fn open_description(e: &BytesStart<'_>) -> Result<Description, ExtractError> {
    let kind = if e.local_name().as_ref() == b"Collection" {
        Kind::Collection
    } else {
        Kind::Item
    };
    Ok(Description {
        kind,
        about: attr_value(e, b"about")?,
        title: None,
        item_type: None,
        parent: None,
        parts: Vec::new(),
    })
}

/// Record a property of the open description; returns the text to capture.
fn read_property(
    desc: &mut Description,
    e: &BytesStart<'_>,
) -> Result<Option<Capture>, ExtractError> {
    let capture = match e.local_name().as_ref() {
        b"title" => Some(Capture::Title),
        b"itemType" => Some(Capture::ItemType),
        b"isPartOf" if desc.kind == Kind::Collection => {
            if let Some(resource) = attr_value(e, b"resource")? {
                desc.parent.get_or_insert(resource);
            }
            None
        }
        b"hasPart" if desc.kind == Kind::Collection => {
            if let Some(resource) = attr_value(e, b"resource")? {
                desc.parts.push(resource);
            }
            None
        }
        _ => None,
    };
    Ok(capture)
}

fn close_description(
    desc: Description,
    library: &str,
    out: &mut RdfLibrary,
    collections: &mut Vec<Collection>,
) {
    match desc.kind {
        Kind::Collection => {
            let Some(id) = desc.about.filter(|a| !a.trim().is_empty()) else {
                out.skipped_collections += 1;
                return;
            };
            collections.push(Collection {
                id,
                // An untitled collection reaches the builder and is reported there.
                title: desc.title.unwrap_or_default(),
                parent: desc.parent,
                parts: desc.parts,
            });
        }
        Kind::Item => {
            let (Some(id), Some(title)) = (desc.about, desc.title) else {
                return;
            };
            if title.is_empty() {
                return;
            }
            let mut record = Record::new(library, &title);
            record.item_type = desc.item_type.filter(|t| !t.is_empty());
            out.records.push(record);
            out.items.push(LibraryItem::new(&id, &title));
        }
    }
}

/// Turn collections into relation-mode nodes and `hasPart` entries into
/// memberships, moving sub-collection entries to parent references.
fn link_collections(library: &str, collections: Vec<Collection>, out: &mut RdfLibrary) {
    let ids: HashSet<&str> = collections.iter().map(|c| c.id.as_str()).collect();

    let mut implied_parent: HashMap<&str, &str> = HashMap::new();
    for c in &collections {
        for part in c.parts.iter().filter(|p| ids.contains(p.as_str())) {
            implied_parent.entry(part.as_str()).or_insert(c.id.as_str());
        }
    }

    for c in &collections {
        let parent = c
            .parent
            .as_deref()
            .or_else(|| implied_parent.get(c.id.as_str()).copied());
        out.nodes.push(RawNode::related(&c.id, &c.title, parent));
        for part in c.parts.iter().filter(|p| !ids.contains(p.as_str())) {
            out.memberships
                .push(CollectionMembership::new(library, &c.id, part));
        }
    }
}
