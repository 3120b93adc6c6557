//! # html2wordml
//!
//! Convert HTML documents into WordprocessingML (`.docx`) packages.
//!
//! ## Features
//!
//! - Parses arbitrary, malformed HTML the way browsers do
//! - Maps elements to WordprocessingML through a declarative rule table
//! - Fetches referenced images and embeds them at their intrinsic size
//! - Builds the package from a template `.docx`, keeping its styles and parts
//!
//! ## Quick Start
//!
//! ```no_run
//! let html = std::fs::read("page.html")?;
//!
//! // Images are fetched from "https://example.com/docs/{src}".
//! let docx = html2wordml::convert("https://example.com/docs", &html, true)?;
//! std::fs::write("page.docx", docx)?;
//! # Ok::<(), html2wordml::Error>(())
//! ```
//!
//! ## Pipeline
//!
//! ```text
//! HTML bytes ─ parse_html ─▶ Document ─┬─ ImageResolver ─▶ ImageSet ─┐
//!                                      └─ Transformer ──▶ markup ────┴─ assemble ─▶ .docx
//! ```
//!
//! The [`Transformer`] writes placeholders where image sizes and
//! relationship ids belong; [`assemble`] fills them in from the resolved
//! images. With `create_package` off, images are still resolved, so a broken
//! reference fails the call, but the markup is returned with its
//! placeholders in place.

pub mod convert;
pub mod dom;
pub mod error;
pub mod package;
pub mod placeholder;
pub mod resolve;
pub mod transform;
pub mod units;
pub(crate) mod util;

pub use convert::{ConvertConfig, Converter, ConverterBuilder, Output, convert};
pub use dom::{Document, parse_html};
pub use error::{Error, Result};
pub use package::{Template, assemble};
pub use resolve::{
    FetchingResolver, ImageReference, ImageResolver, ImageSet, MemoryResolver, ResolvedImage,
    fetch_location,
};
pub use transform::{Stylesheet, Transformer};
pub use units::pixels_to_emu;
