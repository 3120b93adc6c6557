//! Markup fragments with `{$slot}` substitution points.

use std::fmt;

/// A named substitution point in a [`Template`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Converted body content of the whole document.
    Body,
    /// Paragraph or run properties.
    Properties,
    /// Content of a paragraph.
    Content,
    /// Escaped text of a run.
    Text,
    /// Nesting depth of the enclosing list, from 0.
    ListLevel,
    /// Image width placeholder.
    Width,
    /// Image height placeholder.
    Height,
    /// Image relationship id placeholder.
    RelationshipId,
    /// Per-document drawing counter, from 1.
    Id,
    /// Image file name.
    Name,
    /// Image `alt` text.
    Description,
}

impl Slot {
    fn from_name(name: &str) -> Option<Slot> {
        Some(match name {
            "body" => Slot::Body,
            "properties" => Slot::Properties,
            "content" => Slot::Content,
            "text" => Slot::Text,
            "list-level" => Slot::ListLevel,
            "width" => Slot::Width,
            "height" => Slot::Height,
            "rid" => Slot::RelationshipId,
            "id" => Slot::Id,
            "name" => Slot::Name,
            "description" => Slot::Description,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Slot::Body => "body",
            Slot::Properties => "properties",
            Slot::Content => "content",
            Slot::Text => "text",
            Slot::ListLevel => "list-level",
            Slot::Width => "width",
            Slot::Height => "height",
            Slot::RelationshipId => "rid",
            Slot::Id => "id",
            Slot::Name => "name",
            Slot::Description => "description",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{${}}}", self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Slot(Slot),
}

/// A parsed markup fragment.
///
/// Literal text is kept byte-for-byte except for indentation: whitespace
/// runs containing a line break are dropped, so rule tables can be laid out
/// readably without leaking whitespace into the output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Parse raw fragment text. Fails on an unknown or unterminated `{$…}`.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let mut segments = Vec::new();
        let mut rest = raw;

        while let Some(start) = rest.find("{$") {
            push_literal(&mut segments, &rest[..start]);
            let after = &rest[start + 2..];
            let end = after
                .find('}')
                .ok_or_else(|| format!("unterminated slot in {:?}", truncate(raw)))?;
            let name = &after[..end];
            let slot = Slot::from_name(name).ok_or_else(|| format!("unknown slot {{${name}}}"))?;
            segments.push(Segment::Slot(slot));
            rest = &after[end + 1..];
        }
        push_literal(&mut segments, rest);

        Ok(Self { segments })
    }

    /// Slots in order of appearance.
    pub fn slots(&self) -> impl Iterator<Item = Slot> + '_ {
        self.segments.iter().filter_map(|s| match s {
            Segment::Slot(slot) => Some(*slot),
            Segment::Literal(_) => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Check that every use of `slot` is the whole value of a quoted attribute.
    pub fn slot_is_quoted(&self, slot: Slot) -> bool {
        self.segments.iter().enumerate().all(|(i, segment)| {
            if *segment != Segment::Slot(slot) {
                return true;
            }
            let before = i
                .checked_sub(1)
                .and_then(|j| self.segments.get(j))
                .is_some_and(|s| matches!(s, Segment::Literal(l) if l.ends_with('"')));
            let after = self
                .segments
                .get(i + 1)
                .is_some_and(|s| matches!(s, Segment::Literal(l) if l.starts_with('"')));
            before && after
        })
    }

    /// Render with `value` supplying the text of each slot.
    pub fn render<F>(&self, value: F) -> String
    where
        F: Fn(Slot) -> String,
    {
        let mut out = String::new();
        self.render_into(&mut out, &self.segments, &value);
        out
    }

    /// Render the parts before and after the first occurrence of `at`.
    pub fn render_split<F>(&self, at: Slot, value: F) -> (String, String)
    where
        F: Fn(Slot) -> String,
    {
        let pos = self
            .segments
            .iter()
            .position(|s| *s == Segment::Slot(at))
            .unwrap_or(self.segments.len());

        let mut head = String::new();
        let mut tail = String::new();
        self.render_into(&mut head, &self.segments[..pos], &value);
        if pos < self.segments.len() {
            self.render_into(&mut tail, &self.segments[pos + 1..], &value);
        }
        (head, tail)
    }

    fn render_into<F>(&self, out: &mut String, segments: &[Segment], value: &F)
    where
        F: Fn(Slot) -> String,
    {
        for segment in segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Slot(slot) => out.push_str(&value(*slot)),
            }
        }
    }
}

fn push_literal(segments: &mut Vec<Segment>, raw: &str) {
    let text = strip_indentation(raw);
    if !text.is_empty() {
        segments.push(Segment::Literal(text));
    }
}

/// Drop every whitespace run that contains a line break.
fn strip_indentation(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut run = String::new();
    for ch in raw.chars() {
        if ch.is_ascii_whitespace() {
            run.push(ch);
            continue;
        }
        if !run.contains('\n') {
            out.push_str(&run);
        }
        run.clear();
        out.push(ch);
    }
    if !run.contains('\n') {
        out.push_str(&run);
    }
    out
}

fn truncate(s: &str) -> &str {
    match s.char_indices().nth(40) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}
