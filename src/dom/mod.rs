//! HTML normalizer.
//!
//! Turns arbitrary, possibly malformed HTML bytes into a [`Document`].
//! html5ever's tree builder repairs unclosed tags, a missing doctype, stray
//! text outside the root element and misnested formatting the same way a
//! browser does, so parsing never fails.
//!
//! # Example
//!
//! ```
//! use html2wordml::dom::parse_html;
//!
//! let doc = parse_html(b"<p>Hello<img src='a/b/pic.png'>");
//! assert_eq!(doc.image_sources(), vec!["a/b/pic.png"]);
//! ```

mod arena;
mod tree_sink;

pub use arena::{Attribute, Children, Descendants, Document, Node, NodeData, NodeId};

use html5ever::driver::ParseOpts;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;

use crate::util::{decode_text, extract_meta_charset};
use tree_sink::DocumentSink;

/// Parse HTML bytes into a document tree.
///
/// Bytes are decoded as UTF-8 when valid, otherwise with the charset declared
/// in a `<meta>` tag near the top of the document, otherwise as Windows-1252.
pub fn parse_html(bytes: &[u8]) -> Document {
    let text = decode_text(bytes, extract_meta_charset(bytes));

    let sink = parse_document(DocumentSink::new(), ParseOpts::default()).one(&*text);
    tracing::debug!(
        bytes = bytes.len(),
        parse_errors = sink.parse_errors(),
        "parsed html"
    );
    sink.into_document()
}
