//! HTML import (HTML → document → Markdown)
//!
//! Pipeline: HTML string → RcDom → IR events → document tree.
//!
//! This is the converter used for pasted and dropped HTML. Browsers put whatever the
//! source page had on the clipboard, so the walk is forgiving: unknown elements are
//! transparent, inline content outside any paragraph gets one, whitespace is collapsed
//! the way a browser would render it, and elements the [`HtmlConversionOptions`] turn
//! off are reduced to their text.
//!
//! Building the tree (instead of writing Markdown directly) means the output goes
//! through the regular serializer and its escaping, so the Markdown handed back to the
//! editor parses to exactly what was imported.

use crate::capability::{HtmlConversionOptions, HtmlToMarkdown};
use crate::common::flat_to_nested::events_to_tree;
use crate::error::ConversionFailure;
use crate::formats::markdown::{serialize_to_markdown, MarkdownRules};
use crate::ir::events::{Event, ListKind};
use crate::schema::{CodeBlockAttrs, Document, ImageAttrs, Mark, MarkSet};
use html5ever::tendril::TendrilSink;
use html5ever::{parse_document, ParseOpts};
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use tracing::debug;

/// Parse an HTML string into a document, honoring `options`.
pub fn html_to_document(
    html: &str,
    options: &HtmlConversionOptions,
) -> Result<Document, ConversionFailure> {
    let dom = parse_document(RcDom::default(), ParseOpts::default()).one(html);

    let mut importer = Importer::new(options);
    importer.walk(&dom.document);
    importer.flush();

    let mut events = Vec::with_capacity(importer.events.len() + 2);
    events.push(Event::StartDocument);
    events.append(&mut importer.events);
    events.push(Event::EndDocument);

    events_to_tree(&events).map_err(|err| {
        debug!(error = %err, "imported HTML produced an invalid event stream");
        ConversionFailure::html(err.to_string())
    })
}

/// Parse an HTML string straight to Markdown.
pub fn html_to_markdown(
    html: &str,
    options: &HtmlConversionOptions,
    rules: &MarkdownRules,
) -> Result<String, ConversionFailure> {
    html_to_document(html, options).map(|doc| serialize_to_markdown(&doc, rules))
}

/// The built-in [`HtmlToMarkdown`] capability.
#[derive(Debug, Clone, Default)]
pub struct HtmlImporter {
    rules: MarkdownRules,
}

impl HtmlImporter {
    pub fn new(rules: MarkdownRules) -> Self {
        Self { rules }
    }
}

impl HtmlToMarkdown for HtmlImporter {
    async fn convert(
        &self,
        html: &str,
        options: &HtmlConversionOptions,
    ) -> Result<String, ConversionFailure> {
        html_to_markdown(html, options, &self.rules)
    }
}

/// A textblock whose inline content is still being collected
struct Pending {
    start: Event,
    end: Event,
    inline: Vec<Event>,
}

struct Importer<'a> {
    options: &'a HtmlConversionOptions,
    events: Vec<Event>,
    pending: Option<Pending>,
    marks: MarkSet,
    /// Depth of explicit textblocks (`p`, `h1`..`h6`); block elements inside are flattened
    inline_depth: usize,
}

impl<'a> Importer<'a> {
    fn new(options: &'a HtmlConversionOptions) -> Self {
        Importer {
            options,
            events: Vec::new(),
            pending: None,
            marks: MarkSet::new(),
            inline_depth: 0,
        }
    }

    fn walk(&mut self, handle: &Handle) {
        match &handle.data {
            NodeData::Document => self.walk_children(handle),
            NodeData::Text { contents } => {
                let text = contents.borrow().to_string();
                self.push_text(&text);
            }
            NodeData::Element { name, .. } => {
                let tag = name.local.to_string();
                self.element(handle, &tag);
            }
            _ => {}
        }
    }

    fn walk_children(&mut self, handle: &Handle) {
        for child in handle.children.borrow().iter() {
            self.walk(child);
        }
    }

    fn element(&mut self, handle: &Handle, tag: &str) {
        match tag {
            "head" | "script" | "style" | "template" | "title" | "meta" | "link" | "input"
            | "noscript" | "button" | "select" => {}
            "br" => self.push_inline(Event::HardBreak),
            "img" => self.image(handle),
            "strong" | "b" => self.formatted(handle, Mark::Strong),
            "em" | "i" => self.formatted(handle, Mark::Em),
            "s" | "del" | "strike" => self.formatted(handle, Mark::Strike),
            "code" | "kbd" | "samp" | "tt" => self.formatted(handle, Mark::Code),
            "a" => self.link(handle),
            _ if self.inline_depth > 0 => self.walk_children(handle),
            "p" => self.textblock(handle, Event::StartParagraph, Event::EndParagraph),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                if self.options.headings {
                    let level = tag[1..].parse().unwrap_or(1);
                    self.textblock(handle, Event::StartHeading(level), Event::EndHeading);
                } else {
                    self.textblock(handle, Event::StartParagraph, Event::EndParagraph);
                }
            }
            "blockquote" => {
                self.flush();
                self.events.push(Event::StartBlockquote);
                self.walk_children(handle);
                self.flush();
                self.events.push(Event::EndBlockquote);
            }
            "pre" => self.code_block(handle),
            "hr" => {
                self.flush();
                self.events.push(Event::HorizontalRule);
            }
            "ul" | "ol" if self.options.lists => self.list(handle, tag == "ol"),
            "table" => self.table(handle),
            "div" | "section" | "article" | "main" | "header" | "footer" | "nav" | "aside"
            | "body" | "html" | "ul" | "ol" | "li" | "dl" | "dt" | "dd" | "figure"
            | "figcaption" | "details" | "summary" | "address" | "thead" | "tbody" | "tfoot"
            | "tr" | "td" | "th" | "caption" => {
                self.flush();
                self.walk_children(handle);
                self.flush();
            }
            _ => self.walk_children(handle),
        }
    }

    fn textblock(&mut self, handle: &Handle, start: Event, end: Event) {
        self.flush();
        self.pending = Some(Pending {
            start,
            end,
            inline: Vec::new(),
        });
        self.inline_depth += 1;
        self.walk_children(handle);
        self.inline_depth -= 1;
        self.flush();
    }

    fn formatted(&mut self, handle: &Handle, mark: Mark) {
        if self.options.preserve_formatting {
            self.with_mark(handle, mark);
        } else {
            self.walk_children(handle);
        }
    }

    fn link(&mut self, handle: &Handle) {
        match attr(handle, "href").filter(|href| !href.trim().is_empty()) {
            Some(href) if self.options.links => {
                let title = attr(handle, "title").filter(|title| !title.is_empty());
                self.with_mark(handle, Mark::link(href.trim(), title));
            }
            _ => self.walk_children(handle),
        }
    }

    fn with_mark(&mut self, handle: &Handle, mark: Mark) {
        let saved = self.marks.clone();
        self.marks = saved.with(mark);
        self.walk_children(handle);
        self.marks = saved;
    }

    fn image(&mut self, handle: &Handle) {
        if !self.options.images {
            return;
        }
        let Some(src) = attr(handle, "src").filter(|src| !src.trim().is_empty()) else {
            return;
        };
        let mut image = ImageAttrs::new(src.trim());
        image.alt = attr(handle, "alt").filter(|alt| !alt.is_empty());
        image.title = attr(handle, "title").filter(|title| !title.is_empty());
        self.push_inline(Event::Image(image));
    }

    fn code_block(&mut self, handle: &Handle) {
        self.flush();
        let language = element_children(handle)
            .into_iter()
            .find(|child| tag_name(child).as_deref() == Some("code"))
            .and_then(|code| attr(&code, "class"))
            .or_else(|| attr(handle, "class"))
            .and_then(|class| language_from_class(&class));

        let mut text = String::new();
        collect_text(handle, &mut text);
        if text.ends_with('\n') {
            text.pop();
        }
        self.events.push(Event::CodeBlock {
            attrs: CodeBlockAttrs::with_language(language),
            text,
        });
    }

    fn list(&mut self, handle: &Handle, ordered: bool) {
        let items: Vec<Handle> = element_children(handle)
            .into_iter()
            .filter(|child| tag_name(child).as_deref() == Some("li"))
            .collect();
        if items.is_empty() {
            return;
        }

        let is_task = items.iter().any(|item| checkbox_state(item).is_some());
        let kind = if is_task {
            ListKind::Task
        } else if ordered {
            let order = attr(handle, "start")
                .and_then(|start| start.trim().parse::<u32>().ok())
                .filter(|order| *order > 0)
                .unwrap_or(1);
            ListKind::Ordered { order }
        } else {
            ListKind::Bullet
        };

        self.flush();
        self.events.push(Event::StartList(kind));
        for item in &items {
            let checked = is_task.then(|| checkbox_state(item).unwrap_or(false));
            self.events.push(Event::StartListItem { checked });
            self.walk_children(item);
            self.flush();
            self.events.push(Event::EndListItem);
        }
        self.events.push(Event::EndList);
    }

    fn table(&mut self, handle: &Handle) {
        let mut rows = Vec::new();
        for child in element_children(handle) {
            match tag_name(&child).as_deref() {
                Some("tr") => rows.push(child),
                Some("thead" | "tbody" | "tfoot") => rows.extend(
                    element_children(&child)
                        .into_iter()
                        .filter(|row| tag_name(row).as_deref() == Some("tr")),
                ),
                _ => {}
            }
        }

        let rows: Vec<Vec<Handle>> = rows
            .iter()
            .map(|row| {
                element_children(row)
                    .into_iter()
                    .filter(|cell| matches!(tag_name(cell).as_deref(), Some("td" | "th")))
                    .collect::<Vec<_>>()
            })
            .filter(|cells| !cells.is_empty())
            .collect();
        if rows.is_empty() {
            self.flush();
            self.walk_children(handle);
            self.flush();
            return;
        }

        self.flush();
        self.events.push(Event::StartTable);
        for cells in &rows {
            self.events.push(Event::StartTableRow);
            for cell in cells {
                let header = tag_name(cell).as_deref() == Some("th");
                self.events.push(Event::StartTableCell { header });
                self.walk_children(cell);
                self.flush();
                self.events.push(Event::EndTableCell);
            }
            self.events.push(Event::EndTableRow);
        }
        self.events.push(Event::EndTable);
    }

    fn push_inline(&mut self, event: Event) {
        self.pending
            .get_or_insert_with(|| Pending {
                start: Event::StartParagraph,
                end: Event::EndParagraph,
                inline: Vec::new(),
            })
            .inline
            .push(event);
    }

    fn push_text(&mut self, raw: &str) {
        let mut text = collapse_whitespace(raw);
        let after_space = match self.pending.as_ref().and_then(|p| p.inline.last()) {
            Some(Event::Text { text: previous, .. }) => previous.ends_with(' '),
            Some(Event::Image(_)) => false,
            _ => true,
        };
        if after_space && text.starts_with(' ') {
            text.remove(0);
        }
        if text.is_empty() {
            return;
        }
        self.push_inline(Event::Text {
            text,
            marks: self.marks.clone(),
        });
    }

    /// Close the pending textblock, trimming whitespace at line boundaries.
    fn flush(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        let mut inline = pending.inline;
        let len = inline.len();
        for index in 0..len {
            let at_start = index == 0 || matches!(inline[index - 1], Event::HardBreak);
            let at_end = index + 1 == len || matches!(inline[index + 1], Event::HardBreak);
            if let Event::Text { text, .. } = &mut inline[index] {
                if at_start {
                    *text = text.trim_start().to_string();
                }
                if at_end {
                    *text = text.trim_end().to_string();
                }
            }
        }
        inline.retain(|event| !matches!(event, Event::Text { text, .. } if text.is_empty()));
        while matches!(inline.last(), Some(Event::HardBreak)) {
            inline.pop();
        }
        if inline.is_empty() {
            return;
        }
        self.events.push(pending.start);
        self.events.extend(inline);
        self.events.push(pending.end);
    }
}

fn tag_name(handle: &Handle) -> Option<String> {
    match &handle.data {
        NodeData::Element { name, .. } => Some(name.local.to_string()),
        _ => None,
    }
}

fn attr(handle: &Handle, key: &str) -> Option<String> {
    match &handle.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attribute| &*attribute.name.local == key)
            .map(|attribute| attribute.value.to_string()),
        _ => None,
    }
}

fn element_children(handle: &Handle) -> Vec<Handle> {
    handle
        .children
        .borrow()
        .iter()
        .filter(|child| matches!(child.data, NodeData::Element { .. }))
        .cloned()
        .collect()
}

/// `Some(checked)` when the item holds a checkbox outside any nested list.
fn checkbox_state(item: &Handle) -> Option<bool> {
    for child in element_children(item) {
        match tag_name(&child).as_deref() {
            Some("input") => {
                let is_checkbox = attr(&child, "type")
                    .is_some_and(|kind| kind.eq_ignore_ascii_case("checkbox"));
                if is_checkbox {
                    return Some(attr(&child, "checked").is_some());
                }
            }
            Some("ul" | "ol") => {}
            _ => {
                if let Some(state) = checkbox_state(&child) {
                    return Some(state);
                }
            }
        }
    }
    None
}

fn collect_text(handle: &Handle, out: &mut String) {
    for child in handle.children.borrow().iter() {
        match &child.data {
            NodeData::Text { contents } => out.push_str(&contents.borrow()),
            NodeData::Element { name, .. } if &*name.local == "br" => out.push('\n'),
            NodeData::Element { .. } => collect_text(child, out),
            _ => {}
        }
    }
}

fn language_from_class(class: &str) -> Option<String> {
    class.split_whitespace().find_map(|token| {
        token
            .strip_prefix("language-")
            .or_else(|| token.strip_prefix("lang-"))
            .filter(|language| !language.is_empty())
            .map(str::to_string)
    })
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
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

    fn convert(html: &str) -> String {
        html_to_markdown(
            html,
            &HtmlConversionOptions::default(),
            &MarkdownRules::default(),
        )
        .unwrap()
    }

    fn convert_with(html: &str, options: HtmlConversionOptions) -> String {
        html_to_markdown(html, &options, &MarkdownRules::default()).unwrap()
    }

    #[test]
    fn test_paragraph_with_formatting() {
        assert_eq!(
            convert("<p>Hello <strong>bold</strong> and <em>soft</em></p>"),
            "Hello **bold** and *soft*\n"
        );
    }

    #[test]
    fn test_whitespace_collapses_like_a_browser() {
        assert_eq!(
            convert("<div>\n   Some   spaced\n   text   </div>"),
            "Some spaced text\n"
        );
    }

    #[test]
    fn test_heading_and_link() {
        assert_eq!(
            convert(r#"<h2>Title</h2><p>See <a href="https://example.com" title="Ex">this</a></p>"#),
            "## Title\n\nSee [this](https://example.com \"Ex\")\n"
        );
    }

    #[test]
    fn test_task_list_from_checkboxes() {
        let html = r#"<ul>
            <li><input type="checkbox" checked> done</li>
            <li><input type="checkbox"> todo</li>
        </ul>"#;
        assert_eq!(convert(html), "- [x] done\n- [ ] todo\n");
    }

    #[test]
    fn test_ordered_list_start() {
        assert_eq!(
            convert(r#"<ol start="3"><li>three</li><li>four</li></ol>"#),
            "3. three\n4. four\n"
        );
    }

    #[test]
    fn test_table() {
        let html = "<table><thead><tr><th>a</th><th>b</th></tr></thead>\
                    <tbody><tr><td>1</td><td>2</td></tr></tbody></table>";
        assert_eq!(convert(html), "| a | b |\n| :--- | :--- |\n| 1 | 2 |\n");
    }

    #[test]
    fn test_pre_becomes_code_block() {
        let html = "<pre><code class=\"language-rust\">fn main() {}\n</code></pre>";
        assert_eq!(convert(html), "```rust\nfn main() {}\n```\n");
    }

    #[test]
    fn test_disabled_structures_fall_back_to_text() {
        let html = r#"<h1>Title</h1><ul><li><b>one</b></li><li><a href="/x">two</a></li></ul>
            <p><img src="a.png" alt="pic">end</p>"#;
        assert_eq!(
            convert_with(html, HtmlConversionOptions::plain()),
            "Title\n\none\n\ntwo\n\nend\n"
        );
    }

    #[test]
    fn test_image_keeps_attributes() {
        assert_eq!(
            convert(r#"<p><img src="a.png" alt="A pic" title="T"></p>"#),
            "![A pic](a.png \"T\")\n"
        );
    }

    #[test]
    fn test_empty_input_gives_empty_markdown() {
        assert_eq!(convert(""), "");
        assert_eq!(convert("<ul></ul>"), "");
    }

    #[test]
    fn test_line_breaks() {
        assert_eq!(convert("<p>one<br>two<br></p>"), "one\\\ntwo\n");
    }
}
