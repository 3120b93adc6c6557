//! Error types for html2wordml operations.

use thiserror::Error;

/// Errors that can occur while converting a document.
///
/// Malformed HTML is never an error: the parser always produces a tree.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("failed to fetch {location}: {reason}")]
    Fetch { location: String, reason: String },

    #[error("failed to fetch image {src} from {location}: {reason}")]
    ImageFetch {
        src: String,
        location: String,
        reason: String,
    },

    #[error("failed to decode image {src}: {reason}")]
    ImageDecode { src: String, reason: String },

    /// A placeholder survived assembly; the resolver and transformer disagree.
    #[error("unresolved image placeholder for {0}")]
    UnresolvedPlaceholder(String),

    #[error("relationship id {0} already exists in the template")]
    DuplicateRelationshipId(String),

    /// The template archive or the rule table is missing or corrupt.
    #[error("template integrity error: {0}")]
    TemplateIntegrity(String),
}

pub type Result<T> = std::result::Result<T, Error>;
