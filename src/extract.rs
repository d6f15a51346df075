//! Shared plumbing for the markup extractors ([`crate::rdf`],
//! [`crate::records`], [`crate::website`]).
//!
//! Extraction never panics: malformed markup surfaces as an
//! [`ExtractError`], and entries that parse but are unusable (no id, no
//! title) are skipped and counted by the individual extractors.

use quick_xml::events::attributes::{AttrError, Attribute};
use quick_xml::events::BytesStart;
use quick_xml::Reader;

/// Extraction error.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("malformed markup at byte {position}: {source}")]
    Syntax {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },
    #[error("malformed attribute: {0}")]
    Attribute(#[from] AttrError),
    #[error("invalid escape sequence: {0}")]
    Escape(#[from] quick_xml::Error),
    #[error("not a {format} document: no <{element}> element found")]
    NotRecognized {
        format: &'static str,
        element: &'static str,
    },
}

/// Wrap a reader error with the position it occurred at.
pub(crate) fn syntax_error<R>(reader: &Reader<R>, source: quick_xml::Error) -> ExtractError {
    ExtractError::Syntax {
        position: reader.error_position() as u64,
        source,
    }
}

/// Value of the first attribute whose local name is `local`, unescaped.
pub(crate) fn attr_value(e: &BytesStart<'_>, local: &[u8]) -> Result<Option<String>, ExtractError> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == local {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Lenient attribute lookup for HTML: unquoted values are accepted and
/// values with unknown entities are returned raw.
pub(crate) fn html_attr(e: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    e.html_attributes()
        .flatten()
        .find(|a| a.key.as_ref() == name)
        .map(|a| lossy_value(&a))
}

fn lossy_value(attr: &Attribute<'_>) -> String {
    attr.unescape_value()
        .map(|v| v.into_owned())
        .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned())
}

/// Whether the whitespace-separated `class` attribute contains `class`.
pub(crate) fn has_class(e: &BytesStart<'_>, class: &str) -> bool {
    html_attr(e, b"class")
        .map(|v| v.split_whitespace().any(|c| c == class))
        .unwrap_or(false)
}

/// Read a whole file for extraction.
pub fn read_input(path: &std::path::Path) -> anyhow::Result<Vec<u8>> {
    use anyhow::Context;
    std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}
