//! Rule table loading.
//!
//! The rule table is an XML file mapping HTML elements to WordprocessingML
//! fragments:
//!
//! ```xml
//! <stylesheet>
//!   <document>…{$body}…</document>
//!   <paragraph><w:p>{$properties}{$content}</w:p></paragraph>
//!   <run><w:r>{$properties}<w:t xml:space="preserve">{$text}</w:t></w:r></run>
//!   <run-properties><w:rPr>{$properties}</w:rPr></run-properties>
//!   <line-break><w:r><w:br/></w:r></line-break>
//!
//!   <block match="h1"><w:pPr><w:pStyle w:val="Heading1"/></w:pPr></block>
//!   <inline match="b strong"><w:b/></inline>
//!   <insert match="br" level="inline"><w:r><w:br/></w:r></insert>
//!   <image match="img">…cx="{$width}" cy="{$height}"…r:embed="{$rid}"…</image>
//!   <skip match="head script style"/>
//! </stylesheet>
//! ```
//!
//! A `match` attribute holds whitespace-separated patterns, each `tag` or
//! `parent/tag`. Fragments are taken verbatim from the file, so namespace
//! prefixes are whatever the document template declares.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::template::{Slot, Template};
use crate::error::{Error, Result};

/// Rule table shipped with the crate.
const BUNDLED: &str = include_str!("../../assets/html2wordml.xml");

/// Whether an `<insert>` fragment belongs inside or between paragraphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Inline,
    Block,
}

/// What to do with a matched element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Start a paragraph context with these paragraph properties.
    Block {
        properties: Template,
        preserve_whitespace: bool,
    },
    /// Add run properties for all text below the element.
    Inline { properties: Template },
    /// Emit a fixed fragment in place of the element.
    Insert { fragment: Template, level: Level },
    /// Emit a drawing.
    Image { fragment: Template },
    /// Drop the element and everything below it.
    Skip,
}

#[derive(Debug, Clone)]
struct Pattern {
    parent: Option<String>,
    action: usize,
}

/// A validated rule table.
#[derive(Debug, Clone)]
pub struct Stylesheet {
    pub(crate) document: Template,
    pub(crate) paragraph: Template,
    pub(crate) run: Template,
    pub(crate) run_properties: Template,
    pub(crate) line_break: Template,
    actions: Vec<Action>,
    patterns: HashMap<String, Vec<Pattern>>,
}

impl Stylesheet {
    /// The rule table bundled with the crate.
    pub fn bundled() -> Result<Self> {
        Self::parse(BUNDLED)
    }

    /// Load a rule table from a file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "loading rule table");
        Self::parse(&content)
    }

    /// Parse and validate a rule table.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut builder = Builder::default();
        let mut in_root = false;

        loop {
            match reader.read_event()? {
                Event::Start(e) if !in_root => {
                    if e.name().as_ref() != b"stylesheet" {
                        return Err(integrity(format!(
                            "root element is <{}>, expected <stylesheet>",
                            String::from_utf8_lossy(e.name().as_ref())
                        )));
                    }
                    in_root = true;
                }
                Event::Start(e) => {
                    let span = reader.read_to_end(e.name())?;
                    let raw = xml
                        .get(span.start as usize..span.end as usize)
                        .unwrap_or_default();
                    let body = Template::parse(raw).map_err(integrity)?;
                    builder.add(&e, body)?;
                }
                Event::Empty(e) if in_root => builder.add(&e, Template::default())?,
                Event::Empty(e) if e.name().as_ref() == b"stylesheet" => break,
                Event::Text(_) if in_root => {
                    return Err(integrity("stray text in rule table".to_string()));
                }
                Event::End(_) => break,
                Event::Eof => break,
                _ => {}
            }
        }

        let sheet = builder.finish()?;
        tracing::debug!(rules = sheet.actions.len(), "loaded rule table");
        Ok(sheet)
    }

    /// The rule for an element, given its parent's tag.
    ///
    /// A `parent/tag` pattern beats a bare `tag`; among equals the first
    /// declaration wins. `None` means the element is transparent.
    pub fn rule_for(&self, tag: &str, parent: Option<&str>) -> Option<&Action> {
        let candidates = self.patterns.get(tag)?;
        let qualified = parent.and_then(|p| {
            candidates
                .iter()
                .find(|pat| pat.parent.as_deref() == Some(p))
        });
        let pattern = qualified.or_else(|| candidates.iter().find(|pat| pat.parent.is_none()))?;
        self.actions.get(pattern.action)
    }
}

fn integrity(message: String) -> Error {
    Error::TemplateIntegrity(format!("rule table: {message}"))
}

#[derive(Default)]
struct Builder {
    document: Option<Template>,
    paragraph: Option<Template>,
    run: Option<Template>,
    run_properties: Option<Template>,
    line_break: Option<Template>,
    actions: Vec<Action>,
    patterns: HashMap<String, Vec<Pattern>>,
}

impl Builder {
    fn add(&mut self, e: &BytesStart<'_>, body: Template) -> Result<()> {
        let name = e.name();
        let element = String::from_utf8_lossy(name.as_ref()).into_owned();

        let mut match_attr = None;
        let mut whitespace = None;
        let mut level = None;
        for attr in e.attributes().flatten() {
            let value = String::from_utf8(attr.value.to_vec())
                .map_err(|_| integrity(format!("<{element}> has a non UTF-8 attribute")))?;
            match attr.key.as_ref() {
                b"match" => match_attr = Some(value),
                b"whitespace" => whitespace = Some(value),
                b"level" => level = Some(value),
                _ => {}
            }
        }

        let action = match element.as_str() {
            "document" => {
                check_slots(&body, &element, &[Slot::Body])?;
                check_once(&body, &element, Slot::Body)?;
                return set_once(&mut self.document, body, &element);
            }
            "paragraph" => {
                check_slots(&body, &element, &[Slot::Properties, Slot::Content])?;
                check_once(&body, &element, Slot::Content)?;
                return set_once(&mut self.paragraph, body, &element);
            }
            "run" => {
                check_slots(&body, &element, &[Slot::Properties, Slot::Text])?;
                check_once(&body, &element, Slot::Text)?;
                return set_once(&mut self.run, body, &element);
            }
            "run-properties" => {
                check_slots(&body, &element, &[Slot::Properties])?;
                return set_once(&mut self.run_properties, body, &element);
            }
            "line-break" => {
                check_slots(&body, &element, &[])?;
                return set_once(&mut self.line_break, body, &element);
            }
            "block" => {
                check_slots(&body, &element, &[Slot::ListLevel])?;
                let preserve_whitespace = match whitespace.as_deref() {
                    None | Some("normal") => false,
                    Some("preserve") => true,
                    Some(other) => {
                        return Err(integrity(format!("unknown whitespace mode {other:?}")));
                    }
                };
                Action::Block {
                    properties: body,
                    preserve_whitespace,
                }
            }
            "inline" => {
                check_slots(&body, &element, &[])?;
                Action::Inline { properties: body }
            }
            "insert" => {
                check_slots(&body, &element, &[])?;
                let level = match level.as_deref() {
                    None | Some("inline") => Level::Inline,
                    Some("block") => Level::Block,
                    Some(other) => return Err(integrity(format!("unknown insert level {other:?}"))),
                };
                Action::Insert {
                    fragment: body,
                    level,
                }
            }
            "image" => {
                check_slots(
                    &body,
                    &element,
                    &[
                        Slot::Width,
                        Slot::Height,
                        Slot::RelationshipId,
                        Slot::Id,
                        Slot::Name,
                        Slot::Description,
                    ],
                )?;
                for slot in [Slot::Width, Slot::Height, Slot::RelationshipId] {
                    if !body.slots().any(|s| s == slot) {
                        return Err(integrity(format!("<image> lacks {slot}")));
                    }
                    if !body.slot_is_quoted(slot) {
                        return Err(integrity(format!(
                            "<image> uses {slot} outside a quoted attribute value"
                        )));
                    }
                }
                Action::Image { fragment: body }
            }
            "skip" => {
                if !body.is_empty() {
                    return Err(integrity("<skip> must be empty".to_string()));
                }
                Action::Skip
            }
            other => return Err(integrity(format!("unknown element <{other}>"))),
        };

        let patterns = match_attr
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| integrity(format!("<{element}> needs a match attribute")))?;

        let index = self.actions.len();
        self.actions.push(action);
        for pattern in patterns.split_whitespace() {
            let pattern = pattern.to_ascii_lowercase();
            let (parent, tag) = match pattern.split_once('/') {
                Some((parent, tag)) => (Some(parent.to_string()), tag.to_string()),
                None => (None, pattern),
            };
            if tag.is_empty() || tag.contains('/') || parent.as_deref() == Some("") {
                return Err(integrity(format!("bad match pattern in <{element}>")));
            }
            self.patterns.entry(tag).or_default().push(Pattern {
                parent,
                action: index,
            });
        }
        Ok(())
    }

    fn finish(self) -> Result<Stylesheet> {
        fn required(t: Option<Template>, name: &str) -> Result<Template> {
            t.ok_or_else(|| integrity(format!("missing <{name}>")))
        }

        Ok(Stylesheet {
            document: required(self.document, "document")?,
            paragraph: required(self.paragraph, "paragraph")?,
            run: required(self.run, "run")?,
            run_properties: required(self.run_properties, "run-properties")?,
            line_break: required(self.line_break, "line-break")?,
            actions: self.actions,
            patterns: self.patterns,
        })
    }
}

fn set_once(slot: &mut Option<Template>, body: Template, element: &str) -> Result<()> {
    if slot.is_some() {
        return Err(integrity(format!("<{element}> declared twice")));
    }
    *slot = Some(body);
    Ok(())
}

fn check_slots(body: &Template, element: &str, allowed: &[Slot]) -> Result<()> {
    match body.slots().find(|s| !allowed.contains(s)) {
        Some(slot) => Err(integrity(format!("{slot} is not allowed in <{element}>"))),
        None => Ok(()),
    }
}

fn check_once(body: &Template, element: &str, slot: Slot) -> Result<()> {
    match body.slots().filter(|s| *s == slot).count() {
        1 => Ok(()),
        n => Err(integrity(format!(
            "<{element}> must use {slot} exactly once, found {n}"
        ))),
    }
}
