//! Document relationship manifest (`word/_rels/document.xml.rels`).

use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};

use crate::error::{Error, Result};
use crate::util::escape_xml;

/// Relationship type of embedded images.
pub const IMAGE_RELATIONSHIP: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

/// One `<Relationship>` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub target_mode: Option<String>,
}

impl Relationship {
    /// Relationship from the document to `word/media/{key}`, with id `key`.
    pub fn image(key: &str) -> Self {
        Self {
            id: key.to_string(),
            rel_type: IMAGE_RELATIONSHIP.to_string(),
            target: format!("media/{key}"),
            target_mode: None,
        }
    }

    fn to_xml(&self) -> String {
        let mode = self
            .target_mode
            .as_deref()
            .map(|m| format!(r#" TargetMode="{}""#, escape_xml(m)))
            .unwrap_or_default();
        format!(
            r#"<Relationship Id="{}" Type="{}" Target="{}"{mode}/>"#,
            escape_xml(&self.id),
            escape_xml(&self.rel_type),
            escape_xml(&self.target),
        )
    }
}

/// Where new records go in the original bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Insertion {
    /// Offset of the `</Relationships>` tag.
    BeforeClose(usize),
    /// `<Relationships …/>`: offset of the `/` and of the end of the tag.
    SelfClosing { slash: usize, end: usize },
}

/// A parsed relationship manifest.
///
/// Keeps the original bytes. Records added with [`append`](Self::append) are
/// spliced in before the closing tag, so a manifest with nothing appended
/// serializes to exactly the bytes it was parsed from.
#[derive(Debug, Clone)]
pub struct RelationshipManifest {
    original: Vec<u8>,
    records: Vec<Relationship>,
    existing: usize,
    insertion: Insertion,
}

impl RelationshipManifest {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(bytes);
        let mut records = Vec::new();
        let mut insertion = None;
        let mut depth = 0usize;

        loop {
            let before = reader.buffer_position() as usize;
            match reader.read_event()? {
                Event::Start(e) => {
                    if depth == 0 {
                        check_root(&e)?;
                    } else if e.local_name().as_ref() == b"Relationship" {
                        records.push(read_relationship(&e)?);
                    }
                    depth += 1;
                }
                Event::Empty(e) => {
                    if depth == 0 {
                        check_root(&e)?;
                        let end = reader.buffer_position() as usize;
                        let slash = bytes[before..end]
                            .iter()
                            .rposition(|&b| b == b'/')
                            .map(|p| before + p)
                            .unwrap_or(end);
                        insertion = Some(Insertion::SelfClosing { slash, end });
                        break;
                    }
                    if e.local_name().as_ref() == b"Relationship" {
                        records.push(read_relationship(&e)?);
                    }
                }
                Event::End(_) => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        insertion = Some(Insertion::BeforeClose(before));
                        break;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        let insertion = insertion.ok_or_else(|| {
            Error::TemplateIntegrity("relationship manifest has no <Relationships> root".into())
        })?;

        Ok(Self {
            original: bytes.to_vec(),
            existing: records.len(),
            records,
            insertion,
        })
    }

    /// Every record, template ones first.
    pub fn records(&self) -> &[Relationship] {
        &self.records
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.records.iter().any(|r| r.id == id)
    }

    /// Add a record. Ids must be unique within the manifest.
    pub fn append(&mut self, relationship: Relationship) -> Result<()> {
        if self.contains_id(&relationship.id) {
            return Err(Error::DuplicateRelationshipId(relationship.id));
        }
        self.records.push(relationship);
        Ok(())
    }

    /// Serialize, splicing appended records in before the closing tag.
    pub fn to_bytes(&self) -> Vec<u8> {
        let added = &self.records[self.existing..];
        if added.is_empty() {
            return self.original.clone();
        }

        let fragment: String = added.iter().map(Relationship::to_xml).collect();
        let mut out = Vec::with_capacity(self.original.len() + fragment.len() + 16);
        match self.insertion {
            Insertion::BeforeClose(at) => {
                out.extend_from_slice(&self.original[..at]);
                out.extend_from_slice(fragment.as_bytes());
                out.extend_from_slice(&self.original[at..]);
            }
            Insertion::SelfClosing { slash, end } => {
                out.extend_from_slice(self.original[..slash].trim_ascii_end());
                out.push(b'>');
                out.extend_from_slice(fragment.as_bytes());
                out.extend_from_slice(b"</Relationships>");
                out.extend_from_slice(&self.original[end..]);
            }
        }
        out
    }
}

fn check_root(e: &BytesStart<'_>) -> Result<()> {
    if e.local_name().as_ref() == b"Relationships" {
        Ok(())
    } else {
        Err(Error::TemplateIntegrity(format!(
            "relationship manifest root is <{}>",
            String::from_utf8_lossy(e.name().as_ref())
        )))
    }
}

fn read_relationship(e: &BytesStart<'_>) -> Result<Relationship> {
    let mut rel = Relationship {
        id: String::new(),
        rel_type: String::new(),
        target: String::new(),
        target_mode: None,
    };

    for attr in e.attributes().flatten() {
        let raw = String::from_utf8_lossy(&attr.value);
        let value = unescape(&raw)
            .map_err(quick_xml::Error::from)?
            .into_owned();
        match attr.key.as_ref() {
            b"Id" => rel.id = value,
            b"Type" => rel.rel_type = value,
            b"Target" => rel.target = value,
            b"TargetMode" => rel.target_mode = Some(value),
            _ => {}
        }
    }

    if rel.id.is_empty() {
        return Err(Error::TemplateIntegrity(
            "relationship without an Id".to_string(),
        ));
    }
    Ok(rel)
}
