//! Collection-tree HTML from the library website.
//!
//! The website renders each collection as an element with class
//! `item-container`, carrying the collection key and its tree level:
//!
//! ```html
//! <li class="collection">
//!   <div class="item-container" data-collection-key="K2" aria-level="3">
//!     <div class="truncate" title="Salmon">Salmon</div>
//!   </div>
//! </li>
//! ```
//!
//! Nodes come out in document order with their level, which is exactly the
//! nesting-mode input of the hierarchy builder. Building that hierarchy
//! yields the `id -> path` map used to reconcile the RDF tree.

use biblio_reconcile_core::error::HierarchyError;
use biblio_reconcile_core::hierarchy::{build, PathMap, RawNode, SourceKind};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::extract::{has_class, html_attr, syntax_error, ExtractError};

/// Level assumed when a container has no usable `aria-level`.
pub const DEFAULT_LEVEL: i64 = 2;

/// Collection nodes read from the website tree.
#[derive(Debug, Default)]
pub struct WebsiteTree {
    pub nodes: Vec<RawNode>,
    /// Containers without a collection key.
    pub skipped: usize,
}

struct Pending {
    id: String,
    level: i64,
    title: Option<String>,
}

/// Parse collection-tree HTML.
pub fn parse_website(html: &[u8]) -> Result<WebsiteTree, ExtractError> {
    let mut reader = Reader::from_reader(html);
    let config = reader.config_mut();
    config.trim_text(true);
    config.check_end_names = false;

    let mut buf = Vec::new();
    let mut tree = WebsiteTree::default();
    let mut pending: Vec<Pending> = Vec::new();

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| syntax_error(&reader, e))?;
        match event {
            Event::Start(e) | Event::Empty(e) => visit(&e, &mut pending, &mut tree),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    tree.nodes = pending
        .into_iter()
        .map(|p| RawNode::nested(&p.id, p.title.as_deref().unwrap_or(""), Some(p.level)))
        .collect();
    if tree.skipped > 0 {
        tracing::warn!(skipped = tree.skipped, "collection containers without a key skipped");
    }
    Ok(tree)
}

fn visit(e: &BytesStart<'_>, pending: &mut Vec<Pending>, tree: &mut WebsiteTree) {
    if has_class(e, "item-container") {
        let Some(id) = html_attr(e, b"data-collection-key").filter(|k| !k.trim().is_empty()) else {
            tree.skipped += 1;
            return;
        };
        let level = html_attr(e, b"aria-level")
            .and_then(|v| v.trim().parse::<i64>().ok())
            .unwrap_or(DEFAULT_LEVEL);
        pending.push(Pending {
            id,
            level,
            title: None,
        });
    } else if has_class(e, "truncate") {
        // The first titled `truncate` after a container names it.
        if let Some(last) = pending.last_mut().filter(|p| p.title.is_none()) {
            last.title = html_attr(e, b"title");
        }
    }
}

/// Build the website hierarchy of `library` and flatten it to paths.
pub fn path_map(library: &str, tree: WebsiteTree) -> Result<PathMap, HierarchyError> {
    Ok(build(library, tree.nodes, SourceKind::Nesting)?.path_map())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<!DOCTYPE html>
<html><head><meta charset="utf-8"><title>Collections</title></head>
<body>
<ul class="collection-tree">
  <li class="collection">
    <div class="item-container" data-collection-key="K1" aria-level="2" aria-expanded="true">
      <span class="icon"><img src="folder.svg"></span>
      <div class="truncate" title="Fish">Fish</div>
    </div>
    <ul>
      <li class="collection">
        <div class="item-container" data-collection-key="K2" aria-level="3">
          <div class="truncate" title="Salmon &amp; Trout">Salmon &amp; Trout</div>
        </div>
      </li>
    </ul>
  </li>
  <li class="collection">
    <div class="item-container" data-collection-key="K3">
      <div class="truncate" title="Water">Water</div>
    </div>
  </li>
  <li class="collection">
    <div class="item-container" aria-level="2"><div class="truncate" title="Keyless"></div></div>
  </li>
</ul>
</body></html>"#;

    #[test]
    fn test_reads_containers_in_document_order() {
        let tree = parse_website(SAMPLE.as_bytes()).unwrap();
        assert_eq!(
            tree.nodes,
            vec![
                RawNode::nested("K1", "Fish", Some(2)),
                RawNode::nested("K2", "Salmon & Trout", Some(3)),
                RawNode::nested("K3", "Water", Some(DEFAULT_LEVEL)),
            ]
        );
        assert_eq!(tree.skipped, 1);
    }

    #[test]
    fn test_path_map() {
        let tree = parse_website(SAMPLE.as_bytes()).unwrap();
        let map = path_map("Portal", tree).unwrap();
        assert_eq!(map.get("K1").map(String::as_str), Some("Fish"));
        assert_eq!(map.get("K2").map(String::as_str), Some("Fish/Salmon & Trout"));
        assert_eq!(map.get("K3").map(String::as_str), Some("Water"));
    }

    #[test]
    fn test_untitled_container_keeps_empty_title() {
        let html = r#"<div class="item-container" data-collection-key="K9" aria-level="2"></div>"#;
        let tree = parse_website(html.as_bytes()).unwrap();
        assert_eq!(tree.nodes, vec![RawNode::nested("K9", "", Some(2))]);
    }
}
