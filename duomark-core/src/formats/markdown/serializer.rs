//! Markdown serialization (document → Markdown)
//!
//! A recursive walk over the tree. Every block renders to a string without a trailing
//! newline; containers render their children and then decorate the lines (quote
//! prefixes, list markers and hanging indents). Blocks are joined with exactly one
//! blank line and empty paragraphs are dropped, so output never holds runs of blank
//! lines outside of code blocks.
//!
//! Inline content is written with a stack of open marks: moving from one text run to
//! the next only closes and reopens the marks that actually change, and whitespace at
//! a mark boundary is written outside the delimiters so `**bold **` never happens.
//! Text is escaped so the parser reads it back as the same characters.
//!
//! Code blocks that carry an `original_source` (diagram blocks whose display text was
//! replaced by a rendered artifact) are always written from that source.

use super::rules::{ListNumbering, MarkdownRules};
use crate::schema::{Document, ImageAttrs, LinkAttrs, Mark, MarkType, Node, NodeType};

/// Serialize a document to Markdown. An empty document yields an empty string.
pub fn serialize_to_markdown(doc: &Document, rules: &MarkdownRules) -> String {
    let body = join_blocks(doc.blocks(), rules, false);
    if body.trim().is_empty() {
        String::new()
    } else {
        format!("{}\n", body.trim_end_matches('\n'))
    }
}

/// Render `blocks` separated by blank lines. In `tight` mode a list directly after a
/// paragraph is attached without the blank line (item bodies).
fn join_blocks(blocks: &[Node], rules: &MarkdownRules, tight: bool) -> String {
    let mut out = String::new();
    let mut previous: Option<NodeType> = None;
    for block in blocks {
        let Some(rendered) = serialize_block(block, rules) else {
            continue;
        };
        if let Some(prev) = previous {
            let attach = tight && prev == NodeType::Paragraph && block.node_type().is_list();
            out.push_str(if attach { "\n" } else { "\n\n" });
        }
        out.push_str(&rendered);
        previous = Some(block.node_type());
    }
    out
}

fn serialize_block(node: &Node, rules: &MarkdownRules) -> Option<String> {
    match node.node_type() {
        NodeType::Paragraph => serialize_paragraph(node),
        NodeType::Heading => {
            let level = node.attrs().heading().map_or(1, |h| h.level);
            let hashes = "#".repeat(level as usize);
            let text = escape_heading_end(serialize_inline(node.content(), InlineContext::Line));
            if text.is_empty() {
                Some(hashes)
            } else {
                Some(format!("{hashes} {text}"))
            }
        }
        NodeType::Blockquote => {
            let inner = join_blocks(node.content(), rules, false);
            Some(prefix_lines(&inner, "> ", ">"))
        }
        NodeType::CodeBlock => Some(serialize_code_block(node)),
        NodeType::HorizontalRule => Some("---".to_string()),
        NodeType::BulletList | NodeType::OrderedList | NodeType::TaskList => {
            Some(serialize_list(node, rules))
        }
        NodeType::Table => Some(serialize_table(node)),
        _ => None,
    }
}

fn serialize_paragraph(node: &Node) -> Option<String> {
    let inline = serialize_inline(node.content(), InlineContext::Paragraph);
    let lines: Vec<&str> = inline.split('\n').collect();
    let last = lines.len().saturating_sub(1);
    let rendered: Vec<String> = lines
        .iter()
        .enumerate()
        .map(|(index, line)| {
            let line = line.trim_start();
            let line = if index < last {
                // hard break marker
                let body = line.strip_suffix('\\').unwrap_or(line).trim_end();
                format!("{body}\\")
            } else {
                line.trim_end().to_string()
            };
            escape_line_start(&line)
        })
        .collect();
    let text = rendered.join("\n");
    (!text.trim().is_empty()).then_some(text)
}

fn serialize_code_block(node: &Node) -> String {
    let attrs = node.attrs().code_block().cloned().unwrap_or_default();
    let source = match attrs.original_source {
        Some(source) => source,
        None => node.text_content(),
    };
    let language = attrs.language.unwrap_or_default();

    let fence_char = if language.contains('`') { '~' } else { '`' };
    let longest = longest_run(&source, fence_char);
    let fence = fence_char.to_string().repeat((longest + 1).max(3));

    if source.is_empty() {
        format!("{fence}{language}\n{fence}")
    } else {
        format!("{fence}{language}\n{source}\n{fence}")
    }
}

fn longest_run(text: &str, ch: char) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in text.chars() {
        if c == ch {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

/// Longest ordinal a list marker may carry (nine digits)
const MAX_ORDINAL: u32 = 999_999_999;

fn serialize_list(node: &Node, rules: &MarkdownRules) -> String {
    let start = node.attrs().ordered_list().map_or(1, |o| o.order);
    let bullet = rules.bullet();
    let mut items = Vec::with_capacity(node.child_count());

    for (index, item) in node.content().iter().enumerate() {
        let (marker, check) = match node.node_type() {
            NodeType::OrderedList => {
                let number = match rules.ordered_list_numbering {
                    ListNumbering::Sequential => start
                        .saturating_add(index as u32)
                        .min(MAX_ORDINAL),
                    ListNumbering::RepeatOne => 1,
                };
                (format!("{number}. "), "")
            }
            NodeType::TaskList => {
                let checked = item.attrs().task_item().is_some_and(|t| t.checked);
                (format!("{bullet} "), if checked { "[x] " } else { "[ ] " })
            }
            _ => (format!("{bullet} "), ""),
        };

        let body = join_blocks(item.content(), rules, true);
        let indent = " ".repeat(marker.len());
        let mut lines = body.split('\n');
        let first = lines.next().unwrap_or_default();
        let mut rendered = format!("{marker}{check}{first}").trim_end().to_string();
        for line in lines {
            rendered.push('\n');
            if !line.is_empty() {
                rendered.push_str(&indent);
                rendered.push_str(line);
            }
        }
        items.push(rendered);
    }
    items.join("\n")
}

fn serialize_table(node: &Node) -> String {
    let rows: Vec<Vec<String>> = node
        .content()
        .iter()
        .map(|row| row.content().iter().map(serialize_cell).collect())
        .collect();
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0).max(1);

    let render_row = |cells: &[String]| {
        let padded: Vec<&str> = (0..columns)
            .map(|column| cells.get(column).map_or("", String::as_str))
            .collect();
        format!("| {} |", padded.join(" | "))
    };

    let mut lines = Vec::with_capacity(rows.len() + 1);
    for (index, row) in rows.iter().enumerate() {
        lines.push(render_row(row));
        if index == 0 {
            lines.push(format!("| {} |", vec![":---"; columns].join(" | ")));
        }
    }
    lines.join("\n")
}

/// Cells are single-line: the text of their textblocks joined by spaces.
fn serialize_cell(cell: &Node) -> String {
    let text = cell
        .content()
        .iter()
        .filter(|block| block.node_type().is_textblock())
        .map(|block| serialize_inline(block.content(), InlineContext::Cell))
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if looks_like_separator(&text) {
        format!("\\{text}")
    } else {
        text
    }
}

/// `---`, `:--` and friends would turn the whole row into a separator row.
fn looks_like_separator(cell: &str) -> bool {
    let body = cell.strip_prefix(':').unwrap_or(cell);
    let body = body.strip_suffix(':').unwrap_or(body);
    !body.is_empty() && body.chars().all(|c| c == '-')
}

fn prefix_lines(text: &str, prefix: &str, blank: &str) -> String {
    text.split('\n')
        .map(|line| {
            if line.is_empty() {
                blank.to_string()
            } else {
                format!("{prefix}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Where inline content is being written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InlineContext {
    /// Multi-line paragraph text; hard breaks become `\` + newline
    Paragraph,
    /// Single-line heading text
    Line,
    /// Single-line table cell; pipes are escaped
    Cell,
}

fn serialize_inline(nodes: &[Node], context: InlineContext) -> String {
    let mut end = nodes.len();
    while end > 0 {
        let node = &nodes[end - 1];
        let droppable = node.node_type() == NodeType::HardBreak
            || node.text_str().is_some_and(|t| t.trim().is_empty());
        if !droppable {
            break;
        }
        end -= 1;
    }

    let mut writer = InlineWriter {
        out: String::new(),
        open: Vec::new(),
        pending: String::new(),
        context,
    };
    for node in &nodes[..end] {
        match node.node_type() {
            NodeType::Text => writer.text(node),
            NodeType::Image => {
                writer.close_all();
                writer.flush_pending();
                if let Some(attrs) = node.attrs().image() {
                    writer.out.push_str(&render_image(attrs));
                }
            }
            NodeType::HardBreak => {
                writer.close_all();
                writer.pending.clear();
                writer.out.push_str(match context {
                    InlineContext::Paragraph => "\\\n",
                    InlineContext::Line | InlineContext::Cell => " ",
                });
            }
            _ => {}
        }
    }
    writer.close_all();
    writer.out.trim().to_string()
}

struct InlineWriter {
    out: String,
    open: Vec<Mark>,
    pending: String,
    context: InlineContext,
}

impl InlineWriter {
    fn text(&mut self, node: &Node) {
        let text = node.text_str().unwrap_or_default().replace('\n', " ");
        let is_code = node.marks().contains(MarkType::Code);
        let wanted: Vec<&Mark> = node
            .marks()
            .iter()
            .filter(|mark| mark.mark_type() != MarkType::Code)
            .collect();

        let (lead, core, trail) = if is_code {
            ("", text.as_str(), "")
        } else {
            split_whitespace(&text)
        };
        let keep = self.shared_marks(&wanted);
        if core.is_empty() {
            // close what this run does not carry, or the next run would absorb it
            self.close_to(keep);
            self.pending.push_str(&text);
            return;
        }

        self.close_to(keep);
        self.flush_pending();
        self.out.push_str(lead);
        for mark in &wanted[keep..] {
            self.out.push_str(open_delimiter(mark));
            self.open.push((*mark).clone());
        }

        if is_code {
            self.out.push_str(&render_code_span(core));
        } else {
            self.out.push_str(&escape_text(core, self.context));
        }
        self.pending.push_str(trail);
    }

    /// Number of open marks, from the outside in, that `wanted` also carries
    fn shared_marks(&self, wanted: &[&Mark]) -> usize {
        self.open
            .iter()
            .zip(wanted.iter())
            .take_while(|(open, wanted)| open == *wanted)
            .count()
    }

    fn close_to(&mut self, keep: usize) {
        while self.open.len() > keep {
            if let Some(mark) = self.open.pop() {
                self.out.push_str(&close_delimiter(&mark));
            }
        }
    }

    fn close_all(&mut self) {
        self.close_to(0);
    }

    fn flush_pending(&mut self) {
        self.out.push_str(&self.pending);
        self.pending.clear();
    }
}

fn split_whitespace(text: &str) -> (&str, &str, &str) {
    let core_start = text.len() - text.trim_start().len();
    let core_end = text.trim_end().len().max(core_start);
    (
        &text[..core_start],
        &text[core_start..core_end],
        &text[core_end..],
    )
}

fn open_delimiter(mark: &Mark) -> &'static str {
    match mark {
        Mark::Link { .. } => "[",
        Mark::Strong => "**",
        Mark::Em => "*",
        Mark::Strike => "~~",
        Mark::Code => "`",
    }
}

fn close_delimiter(mark: &Mark) -> String {
    match mark {
        Mark::Link { attrs } => format!("]({})", render_destination(attrs)),
        other => open_delimiter(other).to_string(),
    }
}

fn render_destination(link: &LinkAttrs) -> String {
    let href = escape_href(&link.href);
    match &link.title {
        Some(title) => format!("{href} \"{}\"", escape_title(title)),
        None => href,
    }
}

fn render_image(image: &ImageAttrs) -> String {
    let alt = image.alt.as_deref().unwrap_or_default();
    let mut escaped_alt = String::with_capacity(alt.len());
    for c in alt.chars() {
        if matches!(c, '\\' | '[' | ']') {
            escaped_alt.push('\\');
        }
        escaped_alt.push(if c == '\n' { ' ' } else { c });
    }
    let destination = render_destination(&LinkAttrs {
        href: image.src.clone(),
        title: image.title.clone(),
    });
    format!("![{escaped_alt}]({destination})")
}

fn escape_href(href: &str) -> String {
    let needs_angle = href.chars().any(|c| c.is_whitespace() || c == '(' || c == ')');
    if needs_angle {
        let mut out = String::from("<");
        for c in href.chars() {
            if matches!(c, '<' | '>' | '\\') {
                out.push('\\');
            }
            out.push(if c == '\n' { ' ' } else { c });
        }
        out.push('>');
        out
    } else {
        href.replace('\\', "\\\\")
    }
}

fn escape_title(title: &str) -> String {
    title.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', " ")
}

/// A code span fenced with more backticks than any run inside it.
fn render_code_span(content: &str) -> String {
    let fence = "`".repeat(longest_run(content, '`') + 1);
    let all_spaces = content.chars().all(|c| c == ' ');
    let needs_padding = content.starts_with('`')
        || content.ends_with('`')
        || (!all_spaces && content.starts_with(' ') && content.ends_with(' '));
    if needs_padding {
        format!("{fence} {content} {fence}")
    } else {
        format!("{fence}{content}{fence}")
    }
}

/// Escape inline metacharacters.
fn escape_text(text: &str, context: InlineContext) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    for (index, &c) in chars.iter().enumerate() {
        let escape = match c {
            '\\' | '`' | '*' | '[' | ']' | '~' => true,
            '_' => {
                let before = index.checked_sub(1).and_then(|i| chars.get(i));
                let after = chars.get(index + 1);
                !(before.is_some_and(|b| b.is_alphanumeric())
                    && after.is_some_and(|a| a.is_alphanumeric()))
            }
            '|' => context == InlineContext::Cell,
            _ => false,
        };
        if escape {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape characters at the start of a paragraph line that would start a block.
fn escape_line_start(line: &str) -> String {
    let Some(first) = line.chars().next() else {
        return String::new();
    };
    if matches!(first, '#' | '>' | '-' | '+' | '|') {
        return format!("\\{line}");
    }
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(delim @ ('.' | ')')) = rest.chars().next() {
            let after = &rest[1..];
            if after.is_empty() || after.starts_with(' ') {
                return format!("{}\\{delim}{after}", &line[..digits]);
            }
        }
    }
    line.to_string()
}

/// A heading ending in `#` would lose it as a closing sequence.
fn escape_heading_end(text: String) -> String {
    match text.strip_suffix('#') {
        Some(body) if !body.ends_with('\\') => format!("{body}\\#"),
        _ => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::MarkSet;

    #[test]
    fn escape_text_handles_metacharacters() {
        assert_eq!(
            escape_text("a*b [c] snake_case _x_", InlineContext::Paragraph),
            r"a\*b \[c\] snake_case \_x\_"
        );
        assert_eq!(escape_text("a|b", InlineContext::Cell), r"a\|b");
        assert_eq!(escape_text("a|b", InlineContext::Paragraph), "a|b");
    }

    #[test]
    fn line_starts_that_look_like_blocks_are_escaped() {
        assert_eq!(escape_line_start("# not a heading"), r"\# not a heading");
        assert_eq!(escape_line_start("1. not a list"), r"1\. not a list");
        assert_eq!(escape_line_start("2024 was fine"), "2024 was fine");
        assert_eq!(escape_line_start("- dash"), r"\- dash");
    }

    #[test]
    fn separator_like_cells_are_escaped() {
        assert!(looks_like_separator("-"));
        assert!(looks_like_separator(":---:"));
        assert!(!looks_like_separator(":"));
        assert!(!looks_like_separator("a-b"));
    }

    #[test]
    fn whitespace_between_marked_runs_stays_outside() {
        let nodes = vec![
            Node::text("a", MarkSet::from_marks([Mark::Em])).unwrap(),
            Node::plain_text(" ").unwrap(),
            Node::text("b", MarkSet::from_marks([Mark::Em])).unwrap(),
        ];
        assert_eq!(serialize_inline(&nodes, InlineContext::Paragraph), "*a* *b*");
    }

    #[test]
    fn code_span_fence_grows_past_content() {
        assert_eq!(render_code_span("a`b"), "``a`b``");
        assert_eq!(render_code_span("`x"), "`` `x ``");
        assert_eq!(render_code_span("plain"), "`plain`");
    }

    #[test]
    fn heading_trailing_hash_is_escaped() {
        assert_eq!(escape_heading_end("C#".to_string()), r"C\#");
        assert_eq!(escape_heading_end("Title".to_string()), "Title");
    }

    #[test]
    fn whitespace_split() {
        assert_eq!(split_whitespace("  a b "), ("  ", "a b", " "));
        assert_eq!(split_whitespace("   "), ("   ", "", ""));
    }
}
