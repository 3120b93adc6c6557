//! The template archive every package is built from.

use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;

use zip::ZipArchive;

use super::rels::RelationshipManifest;
use crate::error::{Error, Result};

/// Template shipped with the crate.
const BUNDLED: &[u8] = include_bytes!("../../assets/template.docx");

/// Main document part.
pub const DOCUMENT_PART: &str = "word/document.xml";

/// Relationship manifest of the main document part.
pub const RELATIONSHIPS_PART: &str = "word/_rels/document.xml.rels";

/// Directory of embedded media, relative to the archive root.
pub const MEDIA_DIR: &str = "word/media/";

/// A validated template archive.
///
/// Holds the archive bytes, its entry names in archive order and the parsed
/// relationship manifest. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct Template {
    data: Vec<u8>,
    entries: Vec<String>,
    manifest: RelationshipManifest,
}

impl Template {
    /// The template bundled with the crate.
    pub fn bundled() -> Result<Self> {
        Self::from_bytes(BUNDLED.to_vec())
    }

    /// Load a `.docx` template from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "loading template");
        Self::from_bytes(fs::read(path)?)
    }

    /// Load a template from archive bytes.
    ///
    /// Fails with [`Error::TemplateIntegrity`] unless the archive opens and
    /// holds a document part and a parseable relationship manifest.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(data.as_slice())).map_err(corrupt)?;

        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let file = archive.by_index_raw(i).map_err(corrupt)?;
            entries.push(file.name().to_string());
        }

        for required in [DOCUMENT_PART, RELATIONSHIPS_PART] {
            if !entries.iter().any(|e| e == required) {
                return Err(Error::TemplateIntegrity(format!(
                    "template archive has no {required}"
                )));
            }
        }

        let mut rels = Vec::new();
        archive
            .by_name(RELATIONSHIPS_PART)
            .map_err(corrupt)?
            .read_to_end(&mut rels)?;
        let manifest = RelationshipManifest::parse(&rels)?;

        tracing::debug!(
            entries = entries.len(),
            relationships = manifest.records().len(),
            "loaded template"
        );
        Ok(Self {
            data,
            entries,
            manifest,
        })
    }

    /// Entry names in archive order.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn manifest(&self) -> &RelationshipManifest {
        &self.manifest
    }

    /// Raw archive bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Open the archive for copying entries out.
    pub(crate) fn archive(&self) -> Result<ZipArchive<Cursor<&[u8]>>> {
        Ok(ZipArchive::new(Cursor::new(self.data.as_slice()))?)
    }
}

fn corrupt(e: zip::result::ZipError) -> Error {
    Error::TemplateIntegrity(format!("template archive: {e}"))
}
