//! Package assembly.
//!
//! Builds the output archive from the template: the transformer markup
//! replaces `word/document.xml`, every resolved image becomes a stored
//! `word/media/{key}` entry placed just before the document part, and the
//! relationship manifest gains one image record per key. All other template
//! entries are copied raw, compressed bytes and metadata untouched.

mod rels;
mod template;

pub use rels::{IMAGE_RELATIONSHIP, Relationship, RelationshipManifest};
pub use template::{DOCUMENT_PART, MEDIA_DIR, RELATIONSHIPS_PART, Template};

use std::collections::HashSet;
use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::error::{Error, Result};
use crate::placeholder::{Field, Placeholder, escape_value, find_unresolved};
use crate::resolve::{ImageSet, ResolvedImage};
use crate::units::pixels_to_emu;

/// One entry of the output archive.
#[derive(Debug)]
enum Entry<'a> {
    /// Template entry copied as is, by archive index.
    Copy(usize, &'a str),
    Media(String, &'a ResolvedImage),
    Document,
    Relationships,
}

/// Assemble a package from `template`, the transformer `markup` and the
/// resolved `images`.
///
/// Every image placeholder in `markup` must belong to an image in `images`;
/// a leftover fails with [`Error::UnresolvedPlaceholder`] before anything is
/// written.
pub fn assemble(template: &Template, markup: &str, images: &ImageSet) -> Result<Vec<u8>> {
    let mut markup = markup.to_string();
    let mut manifest = template.manifest().clone();

    for image in images.values() {
        let width = pixels_to_emu(image.width).to_string();
        let height = pixels_to_emu(image.height).to_string();
        let rid = escape_value(&image.key);

        for src in image.sources() {
            Placeholder::new(src, Field::Width).substitute(&mut markup, &width);
            Placeholder::new(src, Field::Height).substitute(&mut markup, &height);
            Placeholder::new(src, Field::RelationshipId).substitute(&mut markup, &rid);
        }
        manifest.append(Relationship::image(&image.key))?;
    }

    if let Some(placeholder) = find_unresolved(&markup) {
        return Err(Error::UnresolvedPlaceholder(placeholder));
    }

    let plan = plan_entries(template, images);
    let rels = manifest.to_bytes();
    let mut archive = template.archive()?;

    let stored = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .last_modified_time(DateTime::default());
    let deflated = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for entry in &plan {
        match entry {
            Entry::Copy(index, name) => {
                tracing::trace!(name, "copying template entry");
                zip.raw_copy_file(archive.by_index_raw(*index)?)?;
            }
            Entry::Media(path, image) => {
                tracing::trace!(path = path.as_str(), bytes = image.data.len(), "writing media");
                zip.start_file(path.as_str(), stored)?;
                zip.write_all(&image.data)?;
            }
            Entry::Document => {
                zip.start_file(DOCUMENT_PART, deflated)?;
                zip.write_all(markup.as_bytes())?;
            }
            Entry::Relationships => {
                zip.start_file(RELATIONSHIPS_PART, deflated)?;
                zip.write_all(&rels)?;
            }
        }
    }

    let bytes = zip.finish()?.into_inner();
    tracing::debug!(
        images = images.len(),
        entries = plan.len(),
        bytes = bytes.len(),
        "assembled package"
    );
    Ok(bytes)
}

/// Output entry order: template order, with media inserted in key order
/// immediately before the document part. A template entry at a media path
/// is dropped in favor of the new image.
fn plan_entries<'a>(template: &'a Template, images: &'a ImageSet) -> Vec<Entry<'a>> {
    let media: Vec<(String, &ResolvedImage)> = images
        .values()
        .map(|image| (format!("{MEDIA_DIR}{}", image.key), image))
        .collect();
    let replaced: HashSet<&str> = media.iter().map(|(path, _)| path.as_str()).collect();

    let mut plan = Vec::with_capacity(template.entries().len() + media.len());
    let mut pending = Some(media.iter());
    for (index, name) in template.entries().iter().enumerate() {
        match name.as_str() {
            DOCUMENT_PART => {
                if let Some(media) = pending.take() {
                    plan.extend(media.map(|(path, image)| Entry::Media(path.clone(), *image)));
                }
                plan.push(Entry::Document);
            }
            RELATIONSHIPS_PART => plan.push(Entry::Relationships),
            other if replaced.contains(other) => {}
            other => plan.push(Entry::Copy(index, other)),
        }
    }
    plan
}
