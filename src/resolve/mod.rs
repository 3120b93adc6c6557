//! Image resolution.
//!
//! Finds every `<img>` in a document, fetches its bytes and reads the
//! intrinsic size. Images are keyed by the last path segment of their `src`;
//! that key becomes both the media file name and the relationship id in the
//! package.
//!
//! Two references whose `src` values share a key name one image. The first
//! `src` is fetched; later ones are recorded as aliases so their
//! placeholders resolve to the same media entry.

mod fetch;

pub use fetch::{DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, Fetcher, fetch_location};

use std::collections::{BTreeMap, HashMap};
use std::io::Cursor;
use std::time::Duration;

use image::ImageReader;

use crate::dom::Document;
use crate::error::{Error, Result};
use crate::util::last_segment;

/// An `<img>` with a non-empty `src`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference<'a> {
    pub src: &'a str,
    /// Last path segment of `src`.
    pub key: &'a str,
    /// Where the bytes are fetched from: `{base}/{src}`.
    pub location: String,
}

impl<'a> ImageReference<'a> {
    pub fn new(base: &str, src: &'a str) -> Self {
        Self {
            src,
            key: image_key(src),
            location: image_location(base, src),
        }
    }
}

/// Every image reference in `doc`, in document order.
pub fn image_references<'a>(base: &str, doc: &'a Document) -> Vec<ImageReference<'a>> {
    doc.image_sources()
        .into_iter()
        .map(|src| ImageReference::new(base, src))
        .collect()
}

/// Media key for an image `src`.
pub fn image_key(src: &str) -> &str {
    last_segment(src)
}

/// Fetch location for an image `src`.
///
/// The join is literal: no escaping, no normalization of repeated slashes.
pub fn image_location(base: &str, src: &str) -> String {
    format!("{base}/{src}")
}

/// A fetched and measured image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    /// Media file name and relationship id.
    pub key: String,
    /// The `src` that was fetched.
    pub url: String,
    /// Other `src` values sharing the key.
    pub aliases: Vec<String>,
    pub data: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl ResolvedImage {
    /// Every `src` that refers to this image, the fetched one first.
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.url.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

/// Resolved images by key. Ordered, so packages come out the same every time.
pub type ImageSet = BTreeMap<String, ResolvedImage>;

/// Produces the image set of a document.
///
/// Implementations must be thread-safe: one resolver is shared by every
/// conversion run through a [`Converter`](crate::Converter).
pub trait ImageResolver: Send + Sync {
    /// Resolve every image in `doc`, with `base` prefixed to each `src`.
    ///
    /// Any failure aborts the whole resolution.
    fn resolve(&self, base: &str, doc: &Document) -> Result<ImageSet>;
}

/// Read the pixel size of PNG, JPEG, GIF or BMP data.
pub fn image_dimensions(data: &[u8]) -> std::result::Result<(u32, u32), String> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| e.to_string())?
        .into_dimensions()
        .map_err(|e| e.to_string())
}

/// Walk the references of `doc`, loading each key once through `load`.
fn resolve_with<F>(base: &str, doc: &Document, mut load: F) -> Result<ImageSet>
where
    F: FnMut(&ImageReference<'_>) -> std::result::Result<Vec<u8>, String>,
{
    let mut images = ImageSet::new();

    for reference in image_references(base, doc) {
        if let Some(existing) = images.get_mut(reference.key) {
            if existing.sources().all(|s| s != reference.src) {
                tracing::warn!(
                    key = reference.key,
                    kept = %existing.url,
                    dropped = reference.src,
                    "image file names collide, reusing the first image"
                );
                existing.aliases.push(reference.src.to_string());
            }
            continue;
        }

        let fetch_error = |reason: String| Error::ImageFetch {
            src: reference.src.to_string(),
            location: reference.location.clone(),
            reason,
        };
        if reference.key.is_empty() {
            return Err(fetch_error("src has no file name".to_string()));
        }

        let data = load(&reference).map_err(fetch_error)?;
        let (width, height) = image_dimensions(&data).map_err(|reason| Error::ImageDecode {
            src: reference.src.to_string(),
            reason,
        })?;
        tracing::debug!(
            key = reference.key,
            location = %reference.location,
            width,
            height,
            "resolved image"
        );

        images.insert(
            reference.key.to_string(),
            ResolvedImage {
                key: reference.key.to_string(),
                url: reference.src.to_string(),
                aliases: Vec::new(),
                data,
                width,
                height,
            },
        );
    }

    Ok(images)
}

/// Resolver that fetches each image over HTTP or from the filesystem.
#[derive(Debug, Clone)]
pub struct FetchingResolver {
    fetcher: Fetcher,
}

impl FetchingResolver {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        Ok(Self {
            fetcher: Fetcher::new(timeout, user_agent)?,
        })
    }
}

impl ImageResolver for FetchingResolver {
    fn resolve(&self, base: &str, doc: &Document) -> Result<ImageSet> {
        resolve_with(base, doc, |reference| {
            self.fetcher.fetch(&reference.location)
        })
    }
}

/// Resolver over bytes fetched ahead of time, keyed by fetch location.
///
/// ```
/// use html2wordml::{ImageResolver, MemoryResolver, parse_html};
///
/// # let png = {
/// #     let mut buf = std::io::Cursor::new(Vec::new());
/// #     image::RgbImage::new(3, 2).write_to(&mut buf, image::ImageFormat::Png).unwrap();
/// #     buf.into_inner()
/// # };
/// let resolver = MemoryResolver::new().with("http://host/img/a.png", png);
/// let doc = parse_html(b"<img src='img/a.png'>");
/// let images = resolver.resolve("http://host", &doc)?;
/// assert_eq!((images["a.png"].width, images["a.png"].height), (3, 2));
/// # Ok::<(), html2wordml::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryResolver {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, location: impl Into<String>, data: Vec<u8>) {
        self.entries.insert(location.into(), data);
    }

    pub fn with(mut self, location: impl Into<String>, data: Vec<u8>) -> Self {
        self.insert(location, data);
        self
    }
}

impl ImageResolver for MemoryResolver {
    fn resolve(&self, base: &str, doc: &Document) -> Result<ImageSet> {
        resolve_with(base, doc, |reference| {
            self.entries
                .get(&reference.location)
                .cloned()
                .ok_or_else(|| "not found".to_string())
        })
    }
}
