//! Markdown parsing (Markdown → document)
//!
//! Pipeline: Markdown string → lines → block events (+ inline pass) → document tree.
//!
//! The block scanner is line oriented. Every line is classified by a chain of pure
//! matcher functions tried in priority order (fence, table row, horizontal rule, task
//! item, list item, heading, blockquote, blank, text). Container constructs (list items
//! and blockquotes) collect their lines, strip their markers and feed the result back
//! into the same scanner, which is what gives nested lists and quotes.
//!
//! Parsing is total. Anything the scanner does not recognize ends up as paragraph text,
//! and the few places where input is interpreted leniently are logged at `trace` or
//! `debug` level as [`Degradation`]s.

use super::inline::parse_inline;
use crate::common::flat_to_nested::events_to_tree;
use crate::ir::events::{Event, ListKind};
use crate::schema::{CodeBlockAttrs, Document, Node};
use tracing::{debug, trace, warn};

/// Input the parser accepted leniently
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Degradation {
    /// A code fence was never closed; the rest of the input became code
    UnterminatedFence,
    /// A table had rows of different widths and was padded
    RaggedTable,
}

/// Parse Markdown text into a document. Never fails.
pub fn parse_markdown(source: &str) -> Document {
    let events = markdown_to_events(source);
    match events_to_tree(&events) {
        Ok(doc) => doc,
        Err(err) => {
            warn!(error = %err, "event stream rejected, falling back to plain paragraphs");
            plain_paragraphs(source)
        }
    }
}

/// Parse Markdown text into the flat event stream.
pub fn markdown_to_events(source: &str) -> Vec<Event> {
    let normalized = source.replace("\r\n", "\n").replace('\r', "\n");
    let lines: Vec<&str> = normalized.split('\n').collect();
    let mut events = vec![Event::StartDocument];
    parse_blocks(&lines, &mut events);
    events.push(Event::EndDocument);
    events
}

fn plain_paragraphs(source: &str) -> Document {
    let blocks: Result<Vec<Node>, _> = source
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| Node::plain_text(line).and_then(|text| Node::paragraph(vec![text])))
        .collect();
    blocks
        .and_then(Document::new)
        .unwrap_or_else(|_| Document::empty())
}

/// List marker of an item line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Bullet(char),
    Ordered(u32),
}

/// Classification of a single line
#[derive(Debug, Clone, PartialEq, Eq)]
enum Line<'a> {
    Fence {
        ch: char,
        len: usize,
        indent: usize,
        info: &'a str,
    },
    TableRow(&'a str),
    Rule,
    TaskItem {
        checked: bool,
        content: &'a str,
        content_col: usize,
    },
    ListItem {
        marker: Marker,
        content: &'a str,
        content_col: usize,
    },
    Heading {
        level: u8,
        text: &'a str,
    },
    Quote(&'a str),
    Blank,
    Text(&'a str),
}

impl Line<'_> {
    fn list_kind(&self) -> Option<ListKind> {
        match self {
            Line::TaskItem { .. } => Some(ListKind::Task),
            Line::ListItem {
                marker: Marker::Bullet(_),
                ..
            } => Some(ListKind::Bullet),
            Line::ListItem {
                marker: Marker::Ordered(n),
                ..
            } => Some(ListKind::Ordered { order: *n }),
            _ => None,
        }
    }
}

type Matcher = for<'a> fn(&'a str) -> Option<Line<'a>>;

/// Block matchers in priority order
const MATCHERS: [Matcher; 8] = [
    match_fence,
    match_table_row,
    match_rule,
    match_task_item,
    match_list_item,
    match_heading,
    match_quote,
    match_blank,
];

fn classify(line: &str) -> Line<'_> {
    MATCHERS
        .iter()
        .find_map(|matcher| matcher(line))
        .unwrap_or_else(|| Line::Text(line.trim()))
}

/// Width of leading whitespace, tabs counting as four columns.
fn indent_of(line: &str) -> usize {
    line.chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

/// Strip up to three spaces of indentation; `None` when the line is indented further.
fn block_start(line: &str) -> Option<(usize, &str)> {
    let indent = indent_of(line);
    (indent <= 3).then(|| (indent, line.trim_start()))
}

/// Remove `columns` of leading whitespace.
fn dedent(line: &str, columns: usize) -> &str {
    let mut removed = 0;
    for (index, c) in line.char_indices() {
        if removed >= columns {
            return &line[index..];
        }
        match c {
            ' ' => removed += 1,
            '\t' => removed += 4,
            _ => return &line[index..],
        }
    }
    ""
}

fn match_fence(line: &str) -> Option<Line<'_>> {
    let (indent, rest) = block_start(line)?;
    let ch = rest.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let len = rest.chars().take_while(|c| *c == ch).count();
    if len < 3 {
        return None;
    }
    let info = rest[len..].trim();
    if ch == '`' && info.contains('`') {
        return None;
    }
    Some(Line::Fence {
        ch,
        len,
        indent,
        info,
    })
}

fn match_table_row(line: &str) -> Option<Line<'_>> {
    let (_, rest) = block_start(line)?;
    let rest = rest.trim_end();
    (rest.len() >= 2 && rest.starts_with('|') && rest.ends_with('|')).then_some(Line::TableRow(rest))
}

fn match_rule(line: &str) -> Option<Line<'_>> {
    let (_, rest) = block_start(line)?;
    let mut chars = rest.chars().filter(|c| !c.is_whitespace());
    let first = chars.next().filter(|c| matches!(c, '-' | '_' | '*'))?;
    let count = 1 + chars.clone().count();
    (count >= 3 && chars.all(|c| c == first)).then_some(Line::Rule)
}

/// Split a list marker off `rest`; returns the marker, its width and the remainder.
fn split_marker(rest: &str) -> Option<(Marker, usize, &str)> {
    let first = rest.chars().next()?;
    let (marker, width) = if matches!(first, '-' | '*' | '+') {
        (Marker::Bullet(first), 1)
    } else {
        let digits = rest.chars().take_while(char::is_ascii_digit).count();
        if digits == 0 || digits > 9 {
            return None;
        }
        if !matches!(rest[digits..].chars().next(), Some('.' | ')')) {
            return None;
        }
        let number: u32 = rest[..digits].parse().ok()?;
        (Marker::Ordered(number), digits + 1)
    };
    let after = &rest[width..];
    if !(after.is_empty() || after.starts_with(' ') || after.starts_with('\t')) {
        return None;
    }
    Some((marker, width, after))
}

/// Content column and content of an item whose marker ends at `marker_end`.
fn item_content(marker_end: usize, after: &str) -> (usize, &str) {
    let spaces = indent_of(after);
    let content = after.trim_start();
    if content.is_empty() || spaces > 4 {
        (marker_end + 1, content)
    } else {
        (marker_end + spaces, content)
    }
}

fn match_task_item(line: &str) -> Option<Line<'_>> {
    let (indent, rest) = block_start(line)?;
    let (marker, width, after) = split_marker(rest)?;
    if !matches!(marker, Marker::Bullet(_)) {
        return None;
    }
    let (content_col, content) = item_content(indent + width, after);
    let checked = match content.get(..3)? {
        "[ ]" => false,
        "[x]" | "[X]" => true,
        _ => return None,
    };
    let text = &content[3..];
    if !(text.is_empty() || text.starts_with(' ')) {
        return None;
    }
    Some(Line::TaskItem {
        checked,
        content: text.trim_start(),
        content_col,
    })
}

fn match_list_item(line: &str) -> Option<Line<'_>> {
    let (indent, rest) = block_start(line)?;
    let (marker, width, after) = split_marker(rest)?;
    let (content_col, content) = item_content(indent + width, after);
    Some(Line::ListItem {
        marker,
        content,
        content_col,
    })
}

fn match_heading(line: &str) -> Option<Line<'_>> {
    let (_, rest) = block_start(line)?;
    let level = rest.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let after = &rest[level..];
    if !(after.is_empty() || after.starts_with(' ') || after.starts_with('\t')) {
        return None;
    }
    Some(Line::Heading {
        level: level as u8,
        text: strip_closing_hashes(after.trim()),
    })
}

/// Drop an optional closing `#` run (it must be preceded by a space).
fn strip_closing_hashes(text: &str) -> &str {
    let without = text.trim_end_matches('#');
    if without.is_empty() {
        ""
    } else if without.len() < text.len() && without.ends_with([' ', '\t']) {
        without.trim_end()
    } else {
        text
    }
}

fn match_quote(line: &str) -> Option<Line<'_>> {
    let (_, rest) = block_start(line)?;
    let content = rest.strip_prefix('>')?;
    Some(Line::Quote(content.strip_prefix(' ').unwrap_or(content)))
}

fn match_blank(line: &str) -> Option<Line<'_>> {
    line.trim().is_empty().then_some(Line::Blank)
}

/// Scan `lines` and push block events for them.
fn parse_blocks(lines: &[&str], events: &mut Vec<Event>) {
    let mut i = 0;
    while i < lines.len() {
        i = match classify(lines[i]) {
            Line::Blank => i + 1,
            Line::Fence {
                ch,
                len,
                indent,
                info,
            } => parse_fence(lines, i, ch, len, indent, info, events),
            Line::TableRow(_) => parse_table(lines, i, events),
            Line::Rule => {
                events.push(Event::HorizontalRule);
                i + 1
            }
            line @ (Line::TaskItem { .. } | Line::ListItem { .. }) => {
                parse_list(lines, i, &line, events)
            }
            Line::Heading { level, text } => {
                events.push(Event::StartHeading(level));
                events.extend(parse_inline(text));
                events.push(Event::EndHeading);
                i + 1
            }
            Line::Quote(_) => parse_quote(lines, i, events),
            Line::Text(_) => parse_paragraph(lines, i, events),
        };
    }
}

fn parse_fence(
    lines: &[&str],
    start: usize,
    ch: char,
    len: usize,
    indent: usize,
    info: &str,
    events: &mut Vec<Event>,
) -> usize {
    let mut body = Vec::new();
    let mut i = start + 1;
    let mut closed = false;
    while i < lines.len() {
        let line = lines[i];
        if let Some(Line::Fence {
            ch: close_ch,
            len: close_len,
            info: close_info,
            ..
        }) = match_fence(line)
        {
            if close_ch == ch && close_len >= len && close_info.is_empty() {
                closed = true;
                i += 1;
                break;
            }
        }
        body.push(dedent(line, indent));
        i += 1;
    }
    if !closed {
        debug!(
            degradation = ?Degradation::UnterminatedFence,
            line = start + 1,
            "code fence never closed; remaining input becomes code"
        );
        while body.last().is_some_and(|line| line.trim().is_empty()) {
            body.pop();
        }
    }

    let language = (!info.is_empty()).then(|| info.to_string());
    events.push(Event::CodeBlock {
        attrs: CodeBlockAttrs::with_language(language),
        text: body.join("\n"),
    });
    i
}

/// Split a table row into raw cell texts, honouring `\|` escapes.
fn split_cells(row: &str) -> Vec<&str> {
    let inner = row.strip_prefix('|').unwrap_or(row);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    let mut cells = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (index, c) in inner.char_indices() {
        match c {
            '\\' if !escaped => {
                escaped = true;
                continue;
            }
            '|' if !escaped => {
                cells.push(inner[start..index].trim());
                start = index + 1;
            }
            _ => {}
        }
        escaped = false;
    }
    cells.push(inner[start..].trim());
    cells
}

fn is_separator_row(cells: &[&str]) -> bool {
    cells.iter().all(|cell| {
        let body = cell.strip_prefix(':').unwrap_or(cell);
        let body = body.strip_suffix(':').unwrap_or(body);
        !body.is_empty() && body.chars().all(|c| c == '-')
    })
}

fn parse_table(lines: &[&str], start: usize, events: &mut Vec<Event>) -> usize {
    let mut rows: Vec<Vec<&str>> = Vec::new();
    let mut i = start;
    while let Some(Line::TableRow(row)) = lines.get(i).map(|line| classify(line)) {
        let cells = split_cells(row);
        if !is_separator_row(&cells) {
            rows.push(cells);
        }
        i += 1;
    }
    if rows.is_empty() {
        return i;
    }

    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    if rows.iter().any(|row| row.len() != columns) {
        trace!(degradation = ?Degradation::RaggedTable, columns, "padding short table rows");
    }

    events.push(Event::StartTable);
    for (index, row) in rows.iter().enumerate() {
        events.push(Event::StartTableRow);
        for column in 0..columns {
            events.push(Event::StartTableCell {
                header: index == 0,
            });
            events.push(Event::StartParagraph);
            if let Some(cell) = row.get(column) {
                events.extend(parse_inline(cell));
            }
            events.push(Event::EndParagraph);
            events.push(Event::EndTableCell);
        }
        events.push(Event::EndTableRow);
    }
    events.push(Event::EndTable);
    i
}

fn parse_list(lines: &[&str], start: usize, first: &Line<'_>, events: &mut Vec<Event>) -> usize {
    let Some(kind) = first.list_kind() else {
        return start + 1;
    };
    events.push(Event::StartList(kind));

    let mut i = start;
    while let Some(line) = lines.get(i) {
        let item = classify(line);
        if !same_list(kind, item.list_kind()) {
            break;
        }
        let (checked, content, content_col) = match item {
            Line::TaskItem {
                checked,
                content,
                content_col,
            } => (Some(checked), content, content_col),
            Line::ListItem {
                content,
                content_col,
                ..
            } => (None, content, content_col),
            _ => break,
        };

        let mut body = vec![content];
        i += 1;
        while let Some(next) = lines.get(i) {
            if next.trim().is_empty() {
                let continues = lines[i..]
                    .iter()
                    .find(|line| !line.trim().is_empty())
                    .is_some_and(|line| indent_of(line) >= content_col);
                if !continues {
                    break;
                }
                body.push("");
            } else if indent_of(next) >= content_col {
                body.push(dedent(next, content_col));
            } else {
                break;
            }
            i += 1;
        }

        events.push(Event::StartListItem { checked });
        parse_blocks(&body, events);
        events.push(Event::EndListItem);

        if lines.get(i).is_some_and(|line| line.trim().is_empty()) {
            break;
        }
    }

    events.push(Event::EndList);
    i
}

fn same_list(kind: ListKind, other: Option<ListKind>) -> bool {
    matches!(
        (kind, other),
        (ListKind::Bullet, Some(ListKind::Bullet))
            | (ListKind::Task, Some(ListKind::Task))
            | (ListKind::Ordered { .. }, Some(ListKind::Ordered { .. }))
    )
}

fn parse_quote(lines: &[&str], start: usize, events: &mut Vec<Event>) -> usize {
    let mut body = Vec::new();
    let mut i = start;
    while let Some(Some(Line::Quote(content))) = lines.get(i).map(|line| match_quote(line)) {
        body.push(content);
        i += 1;
    }
    events.push(Event::StartBlockquote);
    parse_blocks(&body, events);
    events.push(Event::EndBlockquote);
    i
}

/// Number of trailing backslashes on `line`
fn trailing_backslashes(line: &str) -> usize {
    line.chars().rev().take_while(|c| *c == '\\').count()
}

fn parse_paragraph(lines: &[&str], start: usize, events: &mut Vec<Event>) -> usize {
    let mut i = start;
    let mut text = String::new();
    let mut separator = None;
    while let Some(Line::Text(line)) = lines.get(i).map(|line| classify(line)) {
        if let Some(sep) = separator.take() {
            text.push(sep);
        }
        let is_last = !matches!(lines.get(i + 1).map(|l| classify(l)), Some(Line::Text(_)));
        if is_last {
            text.push_str(line);
        } else if trailing_backslashes(line) % 2 == 1 {
            text.push_str(line[..line.len() - 1].trim_end());
            separator = Some('\n');
        } else {
            text.push_str(line);
            separator = Some(if lines[i].ends_with("  ") { '\n' } else { ' ' });
        }
        i += 1;
    }

    events.push(Event::StartParagraph);
    events.extend(parse_inline(&text));
    events.push(Event::EndParagraph);
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matchers_classify_lines() {
        assert_eq!(classify("## Title ##"), Line::Heading { level: 2, text: "Title" });
        assert_eq!(classify("#hashtag"), Line::Text("#hashtag"));
        assert_eq!(classify("* * *"), Line::Rule);
        assert_eq!(classify("---"), Line::Rule);
        assert_eq!(classify("> quoted"), Line::Quote("quoted"));
        assert_eq!(classify("   "), Line::Blank);
        assert_eq!(
            classify("- [X] done"),
            Line::TaskItem {
                checked: true,
                content: "done",
                content_col: 2
            }
        );
        assert_eq!(
            classify("12) twelve"),
            Line::ListItem {
                marker: Marker::Ordered(12),
                content: "twelve",
                content_col: 4
            }
        );
        assert_eq!(classify("-not a list"), Line::Text("-not a list"));
        assert_eq!(
            classify("~~~ rust"),
            Line::Fence {
                ch: '~',
                len: 3,
                indent: 0,
                info: "rust"
            }
        );
        assert_eq!(classify("| a | b |"), Line::TableRow("| a | b |"));
    }

    #[test]
    fn closing_hashes_need_a_space() {
        assert_eq!(strip_closing_hashes("C#"), "C#");
        assert_eq!(strip_closing_hashes("Title ###"), "Title");
        assert_eq!(strip_closing_hashes("###"), "");
    }

    #[test]
    fn cells_honour_escaped_pipes() {
        assert_eq!(split_cells(r"| a \| b | c |"), vec![r"a \| b", "c"]);
        assert!(is_separator_row(&split_cells("| :--- | ---: |")));
        assert!(!is_separator_row(&split_cells("| a | --- |")));
    }

    #[test]
    fn dedent_removes_columns() {
        assert_eq!(dedent("    code", 2), "  code");
        assert_eq!(dedent("\tx", 2), "x");
        assert_eq!(dedent(" x", 3), "x");
    }

    #[test]
    fn paragraph_lines_join_with_breaks() {
        let events = markdown_to_events("one\ntwo\\\nthree  \nfour");
        let texts: Vec<_> = events
            .iter()
            .filter(|e| e.is_inline())
            .map(|e| match e {
                Event::Text { text, .. } => text.clone(),
                other => other.label().to_string(),
            })
            .collect();
        assert_eq!(texts, vec!["one two", "HardBreak", "three", "HardBreak", "four"]);
    }
}
