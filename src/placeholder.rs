//! Image placeholders shared by the transformer and the assembler.
//!
//! The transformer cannot know image sizes or relationship ids, so it writes
//! `{src}-$width`, `{src}-$height` and `{src}-$rid` into the attribute values
//! of each drawing. The assembler swaps them for concrete values once the
//! images are resolved. Both sides build the text through [`Placeholder`], so
//! XML escaping of `src` is identical on both ends.
//!
//! A placeholder always fills a whole attribute value. Matching includes the
//! surrounding quotes, so `a.png-$width` never matches inside
//! `"xa.png-$width"`.

use memchr::memmem;

use crate::util::escape_xml;

/// The value a placeholder stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Width,
    Height,
    RelationshipId,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::Width, Field::Height, Field::RelationshipId];

    pub fn suffix(self) -> &'static str {
        match self {
            Field::Width => "-$width",
            Field::Height => "-$height",
            Field::RelationshipId => "-$rid",
        }
    }
}

/// A placeholder for one field of one image `src`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    text: String,
}

impl Placeholder {
    pub fn new(src: &str, field: Field) -> Self {
        Self {
            text: format!("{}{}", escape_xml(src), field.suffix()),
        }
    }

    /// The placeholder as written inside an attribute value.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Replace every quoted occurrence in `markup` with `value`.
    ///
    /// `value` must already be safe for an attribute value. Returns the
    /// number of replacements made.
    pub fn substitute(&self, markup: &mut String, value: &str) -> usize {
        let needle = format!("\"{}\"", self.text);
        let count = memmem::find_iter(markup.as_bytes(), needle.as_bytes()).count();
        if count > 0 {
            *markup = markup.replace(&needle, &format!("\"{value}\""));
        }
        count
    }
}

/// Escape a document-derived value for an attribute next to placeholders.
///
/// `$` becomes `&#36;`, so alt text or a file name can never spell a
/// placeholder. The attribute value a reader sees is unchanged.
pub fn escape_value(s: &str) -> String {
    escape_xml(s).replace('$', "&#36;")
}

/// Find the first placeholder left in `markup`.
///
/// Returns the placeholder text (escaped `src` plus suffix). Text content is
/// always escaped, so a `"` can only come from markup, which keeps prose such
/// as `price-$width` out of the scan.
pub fn find_unresolved(markup: &str) -> Option<String> {
    let bytes = markup.as_bytes();
    Field::ALL
        .iter()
        .filter_map(|field| {
            let needle = format!("{}\"", field.suffix());
            let end = memmem::find(bytes, needle.as_bytes())?;
            let start = memchr::memrchr(b'"', &bytes[..end]).map_or(0, |q| q + 1);
            Some((start, &markup[start..end + field.suffix().len()]))
        })
        .min_by_key(|(start, _)| *start)
        .map(|(_, text)| text.to_string())
}
