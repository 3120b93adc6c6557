//! Markup transformer.
//!
//! Walks a parsed [`Document`] and renders WordprocessingML through the
//! fragments of a [`Stylesheet`]. Images are emitted with placeholders in
//! place of their size and relationship id; the package assembler fills
//! them in later.
//!
//! Paragraphs open lazily: block rules only set the paragraph properties for
//! their subtree, and a `<w:p>` is started when the first piece of inline
//! content shows up. Entering or leaving a block closes the open paragraph,
//! so text after a nested block lands in a fresh paragraph of the enclosing
//! context.

mod stylesheet;
mod template;

pub use stylesheet::{Action, Level, Stylesheet};
pub use template::{Slot, Template};

use std::sync::Arc;

use crate::dom::{Document, NodeData, NodeId};
use crate::placeholder::{Field, Placeholder, escape_value};
use crate::util::{escape_xml, last_segment};

/// Declaration written before the document element.
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="utf-8" standalone="yes"?>"#;

/// Deepest list level WordprocessingML numbering supports.
const MAX_LIST_LEVEL: usize = 8;

/// Applies a rule table to documents.
#[derive(Debug, Clone)]
pub struct Transformer {
    stylesheet: Arc<Stylesheet>,
}

impl Transformer {
    pub fn new(stylesheet: Arc<Stylesheet>) -> Self {
        Self { stylesheet }
    }

    pub fn stylesheet(&self) -> &Stylesheet {
        &self.stylesheet
    }

    /// Render `doc` as a complete `word/document.xml`.
    pub fn transform(&self, doc: &Document) -> String {
        let sheet = &*self.stylesheet;
        let mut walker = Walker::new(sheet, doc);

        let (head, tail) = sheet.document.render_split(Slot::Body, |_| String::new());
        walker.out.push_str(XML_DECLARATION);
        walker.out.push_str(&head);
        walker.children(doc.root());
        walker.close_paragraph();
        walker.out.push_str(&tail);

        tracing::debug!(
            bytes = walker.out.len(),
            images = walker.images,
            "transformed document"
        );
        walker.out
    }
}

struct BlockFrame {
    properties: String,
    preserve: bool,
}

struct Walker<'a> {
    sheet: &'a Stylesheet,
    doc: &'a Document,
    out: String,
    blocks: Vec<BlockFrame>,
    /// Rendered run-property fragments of the enclosing inline rules.
    inline: Vec<String>,
    /// Closing markup of the open paragraph.
    paragraph_tail: Option<String>,
    /// Whether the last thing written to the paragraph ends in whitespace.
    after_space: bool,
    images: u32,
}

impl<'a> Walker<'a> {
    fn new(sheet: &'a Stylesheet, doc: &'a Document) -> Self {
        Self {
            sheet,
            doc,
            out: String::new(),
            blocks: Vec::new(),
            inline: Vec::new(),
            paragraph_tail: None,
            after_space: true,
            images: 0,
        }
    }

    fn children(&mut self, id: NodeId) {
        let doc = self.doc;
        for child in doc.children(id) {
            self.node(child);
        }
    }

    fn node(&mut self, id: NodeId) {
        let doc = self.doc;
        let Some(node) = doc.get(id) else {
            return;
        };
        match &node.data {
            NodeData::Element { .. } => self.element(id),
            NodeData::Text(text) => self.text(text),
            NodeData::Document => self.children(id),
            NodeData::Comment(_) | NodeData::Doctype { .. } => {}
        }
    }

    fn element(&mut self, id: NodeId) {
        let (doc, sheet) = (self.doc, self.sheet);
        let Some(tag) = doc.element_name(id) else {
            return;
        };
        let parent = doc.get(id).and_then(|n| doc.element_name(n.parent));

        match sheet.rule_for(tag, parent) {
            None => self.children(id),
            Some(Action::Skip) => {}
            Some(Action::Block {
                properties,
                preserve_whitespace,
            }) => {
                let level = self.list_level(id).to_string();
                let properties = properties.render(|slot| match slot {
                    Slot::ListLevel => level.clone(),
                    _ => String::new(),
                });

                self.close_paragraph();
                self.blocks.push(BlockFrame {
                    properties,
                    preserve: *preserve_whitespace,
                });
                self.children(id);
                self.close_paragraph();
                self.blocks.pop();
            }
            Some(Action::Inline { properties }) => {
                self.inline.push(properties.render(|_| String::new()));
                self.children(id);
                self.inline.pop();
            }
            Some(Action::Insert { fragment, level }) => {
                let fragment = fragment.render(|_| String::new());
                match level {
                    Level::Block => self.close_paragraph(),
                    Level::Inline => {
                        self.open_paragraph();
                        self.after_space = true;
                    }
                }
                self.out.push_str(&fragment);
            }
            Some(Action::Image { fragment }) => self.image(id, fragment),
        }
    }

    fn image(&mut self, id: NodeId, fragment: &Template) {
        let doc = self.doc;
        let Some(src) = doc.get_attr(id, "src").filter(|s| !s.is_empty()) else {
            tracing::warn!("skipping image without src");
            return;
        };
        let alt = doc.get_attr(id, "alt").unwrap_or_default();

        self.images += 1;
        let counter = self.images.to_string();
        let rendered = fragment.render(|slot| match slot {
            Slot::Width => Placeholder::new(src, Field::Width).as_str().to_string(),
            Slot::Height => Placeholder::new(src, Field::Height).as_str().to_string(),
            Slot::RelationshipId => Placeholder::new(src, Field::RelationshipId)
                .as_str()
                .to_string(),
            Slot::Id => counter.clone(),
            Slot::Name => escape_value(last_segment(src)),
            Slot::Description => escape_value(alt),
            _ => String::new(),
        });

        self.open_paragraph();
        self.out.push_str(&rendered);
        self.after_space = false;
    }

    fn text(&mut self, text: &str) {
        if self.blocks.iter().any(|b| b.preserve) {
            self.preserved_text(text);
            return;
        }

        let collapsed = collapse_whitespace(text);
        if self.paragraph_tail.is_none() && matches!(collapsed.as_str(), "" | " ") {
            return;
        }

        self.open_paragraph();
        let text = if self.after_space {
            collapsed.trim_start_matches(' ')
        } else {
            &collapsed
        };
        if text.is_empty() {
            return;
        }
        self.run(text);
        self.after_space = text.ends_with(' ');
    }

    fn preserved_text(&mut self, text: &str) {
        let text = text.replace("\r\n", "\n").replace('\r', "\n");
        let line_break = self.sheet.line_break.render(|_| String::new());

        self.open_paragraph();
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                self.out.push_str(&line_break);
            }
            if !line.is_empty() {
                self.run(line);
            }
        }
        self.after_space = text.ends_with(char::is_whitespace);
    }

    fn run(&mut self, text: &str) {
        let properties = if self.inline.is_empty() {
            String::new()
        } else {
            let inner = self.inline.concat();
            self.sheet.run_properties.render(|_| inner.clone())
        };
        let escaped = escape_xml(text);
        let run = self.sheet.run.render(|slot| match slot {
            Slot::Properties => properties.clone(),
            Slot::Text => escaped.clone(),
            _ => String::new(),
        });
        self.out.push_str(&run);
    }

    fn open_paragraph(&mut self) {
        if self.paragraph_tail.is_some() {
            return;
        }
        let properties = self
            .blocks
            .last()
            .map(|b| b.properties.clone())
            .unwrap_or_default();
        let (head, tail) = self
            .sheet
            .paragraph
            .render_split(Slot::Content, |_| properties.clone());
        self.out.push_str(&head);
        self.paragraph_tail = Some(tail);
        self.after_space = true;
    }

    fn close_paragraph(&mut self) {
        if let Some(tail) = self.paragraph_tail.take() {
            self.out.push_str(&tail);
        }
    }

    /// Number of enclosing lists minus one, clamped to the numbering range.
    fn list_level(&self, id: NodeId) -> usize {
        let depth = self
            .doc
            .ancestors(id)
            .filter(|&a| matches!(self.doc.element_name(a), Some("ul" | "ol")))
            .count();
        depth.saturating_sub(1).min(MAX_LIST_LEVEL)
    }
}

/// Collapse runs of HTML whitespace into single spaces.
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for ch in text.chars() {
        if matches!(ch, ' ' | '\t' | '\n' | '\r' | '\x0C') {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(ch);
            in_space = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;

    const SHEET: &str = r#"<stylesheet>
  <document><doc>{$body}</doc></document>
  <paragraph><p>{$properties}{$content}</p></paragraph>
  <run><r>{$properties}<t>{$text}</t></r></run>
  <run-properties><rp>{$properties}</rp></run-properties>
  <line-break><br/></line-break>
  <block match="p div"/>
  <block match="h1"><h1/></block>
  <block match="ul/li"><li lvl="{$list-level}"/></block>
  <block match="pre" whitespace="preserve"><pre/></block>
  <inline match="b"><b/></inline>
  <inline match="i"><i/></inline>
  <insert match="br" level="inline"><br/></insert>
  <insert match="hr" level="block"><hr/></insert>
  <image match="img"><img id="{$id}" name="{$name}" alt="{$description}" cx="{$width}" cy="{$height}" rid="{$rid}"/></image>
  <skip match="head script"/>
</stylesheet>"#;

    fn transform(html: &str) -> String {
        let sheet = Arc::new(Stylesheet::parse(SHEET).unwrap());
        let out = Transformer::new(sheet).transform(&parse_html(html.as_bytes()));
        let body = out.strip_prefix(XML_DECLARATION).unwrap();
        body.strip_prefix("<doc>")
            .and_then(|b| b.strip_suffix("</doc>"))
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_declaration_and_document_wrapper() {
        let sheet = Arc::new(Stylesheet::parse(SHEET).unwrap());
        let out = Transformer::new(sheet).transform(&parse_html(b"<p>x</p>"));
        assert!(out.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\" standalone=\"yes\"?><doc>"));
        assert!(out.ends_with("</doc>"));
    }

    #[test]
    fn test_paragraphs() {
        assert_eq!(
            transform("<p>one</p><p>two</p>"),
            "<p><r><t>one</t></r></p><p><r><t>two</t></r></p>"
        );
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(transform(""), "");
        assert_eq!(transform("<p>  \n </p>"), "");
    }

    #[test]
    fn test_loose_text_gets_a_paragraph() {
        assert_eq!(transform("hello"), "<p><r><t>hello</t></r></p>");
    }

    #[test]
    fn test_block_properties() {
        assert_eq!(transform("<h1>T</h1>"), "<p><h1/><r><t>T</t></r></p>");
    }

    #[test]
    fn test_whitespace_collapse() {
        assert_eq!(
            transform("<p>\n  a   b\t\n c  </p>"),
            "<p><r><t>a b c </t></r></p>"
        );
        assert_eq!(
            transform("<p>a <b> b</b></p>"),
            "<p><r><t>a </t></r><r><rp><b/></rp><t>b</t></r></p>"
        );
    }

    #[test]
    fn test_nested_inline_properties() {
        assert_eq!(
            transform("<p><b>x<i>y</i></b></p>"),
            "<p><r><rp><b/></rp><t>x</t></r><r><rp><b/><i/></rp><t>y</t></r></p>"
        );
    }

    #[test]
    fn test_unknown_elements_are_transparent() {
        assert_eq!(
            transform("<p><span>a<em2>b</em2></span></p>"),
            "<p><r><t>a</t></r><r><t>b</t></r></p>"
        );
    }

    #[test]
    fn test_text_after_nested_block_starts_new_paragraph() {
        assert_eq!(
            transform("<div>a<p>b</p>c</div>"),
            "<p><r><t>a</t></r></p><p><r><t>b</t></r></p><p><r><t>c</t></r></p>"
        );
    }

    #[test]
    fn test_preserved_whitespace() {
        assert_eq!(
            transform("<pre>a  b\nc</pre>"),
            "<p><pre/><r><t>a  b</t></r><br/><r><t>c</t></r></p>"
        );
    }

    #[test]
    fn test_inserts() {
        assert_eq!(
            transform("<p>a<br>b</p><hr><p>c</p>"),
            "<p><r><t>a</t></r><br/><r><t>b</t></r></p><hr/><p><r><t>c</t></r></p>"
        );
    }

    #[test]
    fn test_skipped_subtrees() {
        assert_eq!(
            transform("<head><title>t</title></head><p>x<script>y()</script></p>"),
            "<p><r><t>x</t></r></p>"
        );
    }

    #[test]
    fn test_list_levels() {
        let out = transform("<ul><li>a<ul><li>b</li></ul></li></ul>");
        assert_eq!(
            out,
            r#"<p><li lvl="0"/><r><t>a</t></r></p><p><li lvl="1"/><r><t>b</t></r></p>"#
        );
    }

    #[test]
    fn test_text_is_escaped() {
        assert_eq!(
            transform("<p>a &lt;b&gt; &amp; \"c\"</p>"),
            "<p><r><t>a &lt;b&gt; &amp; &quot;c&quot;</t></r></p>"
        );
    }

    #[test]
    fn test_image_placeholders() {
        let out = transform(r#"<p><img src="a/b/pic.png" alt="A &amp; B"></p>"#);
        assert_eq!(
            out,
            r#"<p><img id="1" name="pic.png" alt="A &amp; B" cx="a/b/pic.png-$width" cy="a/b/pic.png-$height" rid="a/b/pic.png-$rid"/></p>"#
        );
    }

    #[test]
    fn test_image_counter_and_escaping() {
        let out = transform(r#"<img src="x.png?a=1&amp;b=2"><img src="y.png">"#);
        assert!(out.contains(r#"id="1" name="x.png?a=1&amp;b=2""#));
        assert!(out.contains(r#"cx="x.png?a=1&amp;b=2-$width""#));
        assert!(out.contains(r#"id="2" name="y.png""#));
    }

    #[test]
    fn test_placeholder_shaped_alt_and_name() {
        let out = transform(r#"<img src="a.png" alt="b.png-$rid"><img src="x/c.png-$width">"#);
        assert!(out.contains(r#"name="a.png" alt="b.png-&#36;rid" cx="a.png-$width""#));
        assert!(out.contains(r#"name="c.png-&#36;width" alt="" cx="x/c.png-$width-$width""#));
    }

    #[test]
    fn test_image_without_src_is_skipped() {
        assert_eq!(transform(r#"<p><img><img src="">x</p>"#), "<p><r><t>x</t></r></p>");
    }

    #[test]
    fn test_bundled_rule_table_renders_wordml() {
        let sheet = Arc::new(Stylesheet::bundled().unwrap());
        let doc = parse_html(b"<h1>Title</h1><p>Body <b>bold</b></p><img src='i/p.png'>");
        let out = Transformer::new(sheet).transform(&doc);

        assert!(out.starts_with(XML_DECLARATION));
        assert!(out.contains("<w:body>"));
        assert!(out.contains(r#"<w:pStyle w:val="Heading1"/>"#));
        assert!(out.contains("<w:b/>"));
        assert!(out.contains(r#""i/p.png-$rid""#));
        assert!(out.contains(r#""i/p.png-$width""#));
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace(" a\t\n b "), " a b ");
        assert_eq!(collapse_whitespace("a\u{a0}b"), "a\u{a0}b");
    }
}
