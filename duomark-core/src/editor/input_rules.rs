//! Input rules: Markdown shortcuts typed into the rich editor.
//!
//! After text is typed, the text before the caret in the current textblock is matched
//! against a list of patterns. Block rules only fire at the start of a paragraph
//! (`# ` makes a heading, `> ` a quote, `- ` a list and so on); inline rules fire when
//! a closing delimiter is typed (`**bold**`, `[text](url)`).
//!
//! Rules are tried in order and the first match wins.

use super::commands::{insert_text, is_valid_href, CommandResult};
use super::fragment::{marks_at, replace_inline, split_inline, text_before};
use super::position::{parent_and_index, Path, Selection};
use super::session::EditorSession;
use super::transaction::Transaction;
use crate::error::SchemaViolation;
use crate::schema::{Attrs, CodeBlockAttrs, ContentRule, HeadingAttrs, Mark, Node, NodeType};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(#{1,6})\s$").expect("valid heading rule"));
static BLOCKQUOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^>\s$").expect("valid quote rule"));
static BULLET_LIST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-+*]\s$").expect("valid bullet list rule"));
static ORDERED_LIST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)\.\s$").expect("valid ordered list rule"));
static TASK_LIST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[( |x|X)\]\s$").expect("valid task list rule"));
static CODE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^```([\w-]*)\s$").expect("valid code block rule"));
static HORIZONTAL_RULE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:---|___|\*\*\*)$").expect("valid rule rule"));

// U+FFFC stands for inline leaves in the matched text and never belongs to a match
static LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[([^\[\]\x{FFFC}]+)\]\(([^()\s\x{FFFC}]+)\)$").expect("valid link rule")
});
static STRONG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*([^*\x{FFFC}]+)\*\*$").expect("valid strong rule"));
static EM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^*])(\*([^*\s\x{FFFC}](?:[^*\x{FFFC}]*[^*\s\x{FFFC}])?)\*)$")
        .expect("valid emphasis rule")
});
static CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`([^`\x{FFFC}]+)`$").expect("valid code rule"));
static STRIKE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"~~([^~\x{FFFC}]+)~~$").expect("valid strike rule"));

/// What a block rule turns the paragraph into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Heading,
    Blockquote,
    BulletList,
    OrderedList,
    TaskList,
    CodeBlock,
    HorizontalRule,
}

static BLOCK_RULES: [(&Lazy<Regex>, BlockKind); 7] = [
    (&HEADING, BlockKind::Heading),
    (&BLOCKQUOTE, BlockKind::Blockquote),
    (&BULLET_LIST, BlockKind::BulletList),
    (&ORDERED_LIST, BlockKind::OrderedList),
    (&TASK_LIST, BlockKind::TaskList),
    (&CODE_BLOCK, BlockKind::CodeBlock),
    (&HORIZONTAL_RULE, BlockKind::HorizontalRule),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InlineKind {
    Link,
    Strong,
    Em,
    Code,
    Strike,
}

/// Inline rules. Group 1 is the marked text, except in `EM`: without look-behind
/// the pattern has to consume the character before the opening `*`, so group 1 is the
/// delimited run and group 2 the text.
static INLINE_RULES: [(&Lazy<Regex>, InlineKind); 5] = [
    (&LINK, InlineKind::Link),
    (&STRONG, InlineKind::Strong),
    (&EM, InlineKind::Em),
    (&CODE, InlineKind::Code),
    (&STRIKE, InlineKind::Strike),
];

/// Type `text` at the selection and run the input rules on the result.
pub fn type_text(session: &mut EditorSession, text: &str) -> CommandResult {
    if !insert_text(session, text)? {
        return Ok(false);
    }
    apply_input_rules(session)?;
    Ok(true)
}

/// Run the input rules against the text before the caret.
pub fn apply_input_rules(session: &mut EditorSession) -> CommandResult {
    let Some(pos) = session.selection().head().cloned() else {
        return Ok(false);
    };
    if !session.selection().is_caret() {
        return Ok(false);
    }
    let Some(block) = session.document().node_at(&pos.block) else {
        return Ok(false);
    };
    if !block.node_type().allows_marks() {
        return Ok(false);
    }
    let before = text_before(block.content(), pos.offset);

    if block.node_type() == NodeType::Paragraph {
        for &(pattern, kind) in BLOCK_RULES.iter() {
            if let Some(captures) = pattern.captures(&before) {
                let Some(tx) = block_rule(session, &pos.block, pos.offset, kind, &captures)? else {
                    return Ok(false);
                };
                session.dispatch(tx)?;
                return Ok(true);
            }
        }
    }

    for &(pattern, kind) in INLINE_RULES.iter() {
        if let Some(captures) = pattern.captures(&before) {
            return inline_rule(session, &pos.block, &before, kind, &captures);
        }
    }
    Ok(false)
}

/// Build the transaction for a block rule whose trigger spans `0..offset`.
///
/// Returns `None` where the new block cannot go, such as the first block of a list
/// item, which must stay a paragraph.
fn block_rule(
    session: &EditorSession,
    block: &Path,
    offset: usize,
    kind: BlockKind,
    captures: &Captures<'_>,
) -> Result<Option<Transaction>, SchemaViolation> {
    let doc = session.document();
    let Some((parent, index)) = parent_and_index(block) else {
        return Ok(None);
    };
    let Some(node) = doc.node_at(block) else {
        return Ok(None);
    };
    let item_lead = index == 0
        && doc
            .node_at(parent)
            .is_some_and(|p| p.node_type().content_rule() == ContentRule::ItemBody);
    if item_lead {
        return Ok(None);
    }
    let rest = replace_inline(node.content(), 0, offset, Vec::new())?;
    let paragraph = Node::paragraph(rest.clone())?;
    let here = |rest: &[usize]| [parent, &[index][..], rest].concat();

    let (replacement, caret) = match kind {
        BlockKind::Heading => {
            let level = captures.get(1).map_or(1, |m| m.as_str().len()) as u8;
            let heading = Node::new(
                NodeType::Heading,
                Attrs::Heading(HeadingAttrs { level }),
                rest,
            )?;
            (vec![heading], here(&[]))
        }
        BlockKind::Blockquote => (vec![Node::blockquote(vec![paragraph])?], here(&[0])),
        BlockKind::BulletList => (
            vec![Node::bullet_list(vec![Node::list_item(vec![paragraph])?])?],
            here(&[0, 0]),
        ),
        BlockKind::OrderedList => {
            let order = captures
                .get(1)
                .and_then(|m| m.as_str().parse::<u32>().ok())
                .unwrap_or(1)
                .max(1);
            (
                vec![Node::ordered_list(order, vec![Node::list_item(vec![paragraph])?])?],
                here(&[0, 0]),
            )
        }
        BlockKind::TaskList => {
            let checked = captures
                .get(1)
                .is_some_and(|m| m.as_str().eq_ignore_ascii_case("x"));
            (
                vec![Node::task_list(vec![Node::task_item(checked, vec![paragraph])?])?],
                here(&[0, 0]),
            )
        }
        BlockKind::CodeBlock => {
            let language = captures
                .get(1)
                .map(|m| m.as_str().to_string())
                .filter(|language| !language.is_empty());
            let plain = rest
                .iter()
                .all(|node| node.is_text() && node.marks().is_empty());
            if !plain {
                return Ok(None);
            }
            let code = Node::new(
                NodeType::CodeBlock,
                Attrs::CodeBlock(CodeBlockAttrs::with_language(language)),
                rest,
            )?;
            (vec![code], here(&[]))
        }
        BlockKind::HorizontalRule => {
            let after = [parent, &[index + 1][..]].concat();
            (vec![Node::horizontal_rule(), paragraph], after)
        }
    };
    Ok(Some(
        Transaction::new()
            .replace_children(parent.to_vec(), index, index + 1, replacement)
            .select(Selection::caret(caret, 0)),
    ))
}

/// Convert a byte offset in `text` into a caret offset.
fn char_offset(text: &str, byte: usize) -> usize {
    text[..byte].chars().count()
}

fn inline_rule(
    session: &mut EditorSession,
    block: &Path,
    before: &str,
    kind: InlineKind,
    captures: &Captures<'_>,
) -> CommandResult {
    let (Some(whole), Some(inner)) = (
        captures.get(if kind == InlineKind::Em { 1 } else { 0 }),
        captures.get(if kind == InlineKind::Em { 2 } else { 1 }),
    ) else {
        return Ok(false);
    };
    let mark = match kind {
        InlineKind::Link => {
            let Some(href) = captures.get(2).map(|m| m.as_str()) else {
                return Ok(false);
            };
            if !is_valid_href(href) {
                return Ok(false);
            }
            Mark::link(href, None)
        }
        InlineKind::Strong => Mark::Strong,
        InlineKind::Em => Mark::Em,
        InlineKind::Code => Mark::Code,
        InlineKind::Strike => Mark::Strike,
    };
    let start = char_offset(before, whole.start());
    let end = char_offset(before, whole.end());
    let Some(node) = session.document().node_at(block) else {
        return Ok(false);
    };
    let base = marks_at(node.content(), start);
    let inner_start = char_offset(before, inner.start());
    let inner_end = char_offset(before, inner.end());
    let (_, tail) = split_inline(node.content(), inner_start)?;
    let (inner_nodes, _) = split_inline(&tail, inner_end - inner_start)?;
    let marked: Vec<Node> = inner_nodes
        .into_iter()
        .map(|node| node.with_marks(node.marks().with(mark.clone())))
        .collect();
    let caret = start + (inner_end - inner_start);

    let tx = Transaction::new()
        .replace_inline(block.clone(), start, end, marked)
        .select(Selection::caret(block.clone(), caret));
    session.dispatch(tx)?;
    // typing on after the closing delimiter continues unmarked
    session.set_stored_marks(Some(base));
    Ok(true)
}
