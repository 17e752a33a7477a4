//! Offset arithmetic on inline content.
//!
//! Inline content is a flat run of text nodes and leaves. These helpers cut it at caret
//! offsets; the caller rebuilds the textblock with [`Node::with_content`], which merges
//! the pieces back together where their marks agree.

use crate::error::SchemaViolation;
use crate::schema::{MarkSet, MarkType, Node};

/// Split inline content at `offset`.
pub(crate) fn split_inline(
    content: &[Node],
    offset: usize,
) -> Result<(Vec<Node>, Vec<Node>), SchemaViolation> {
    let mut left = Vec::new();
    let mut right = Vec::new();
    let mut pos = 0;
    for node in content {
        let size = node.inline_size();
        if pos + size <= offset {
            left.push(node.clone());
        } else if pos >= offset {
            right.push(node.clone());
        } else {
            // only text spans more than one position
            let text = node.text_str().unwrap_or_default();
            let cut = offset - pos;
            let head: String = text.chars().take(cut).collect();
            let tail: String = text.chars().skip(cut).collect();
            left.push(Node::text(head, node.marks().clone())?);
            right.push(Node::text(tail, node.marks().clone())?);
        }
        pos += size;
    }
    Ok((left, right))
}

/// Inline content between `from` and `to`.
pub(crate) fn slice_inline(
    content: &[Node],
    from: usize,
    to: usize,
) -> Result<Vec<Node>, SchemaViolation> {
    let (_, rest) = split_inline(content, from)?;
    let (middle, _) = split_inline(&rest, to.saturating_sub(from))?;
    Ok(middle)
}

/// Replace `from..to` with `insert`.
pub(crate) fn replace_inline(
    content: &[Node],
    from: usize,
    to: usize,
    insert: Vec<Node>,
) -> Result<Vec<Node>, SchemaViolation> {
    let (mut left, _) = split_inline(content, from)?;
    let (_, right) = split_inline(content, to)?;
    left.extend(insert);
    left.extend(right);
    Ok(left)
}

/// Rewrite the marks of every text node in `from..to`.
pub(crate) fn map_marks(
    content: &[Node],
    from: usize,
    to: usize,
    f: impl Fn(&MarkSet) -> MarkSet,
) -> Result<Vec<Node>, SchemaViolation> {
    let (mut left, rest) = split_inline(content, from)?;
    let (middle, right) = split_inline(&rest, to.saturating_sub(from))?;
    left.extend(middle.into_iter().map(|node| node.with_marks(f(node.marks()))));
    left.extend(right);
    Ok(left)
}

/// Marks typed text at `offset` inherits.
///
/// Strictly inside a text node every mark carries over; at a node boundary only
/// inclusive marks do, so typing after a link does not extend it.
pub(crate) fn marks_at(content: &[Node], offset: usize) -> MarkSet {
    let mut pos = 0;
    let mut before: Option<&Node> = None;
    for node in content {
        let size = node.inline_size();
        if pos < offset && offset < pos + size {
            return node.marks().clone();
        }
        if pos + size == offset {
            before = Some(node);
        }
        pos += size;
    }
    match before {
        Some(node) => node.marks().inclusive(),
        None if offset == 0 => content
            .first()
            .map(|node| node.marks().inclusive())
            .unwrap_or_default(),
        None => MarkSet::new(),
    }
}

/// Whether every text node in `from..to` carries a mark of `mark_type`.
pub(crate) fn range_has_mark(
    content: &[Node],
    from: usize,
    to: usize,
    mark_type: MarkType,
) -> bool {
    let Ok(slice) = slice_inline(content, from, to) else {
        return false;
    };
    let mut texts = slice.iter().filter(|node| node.is_text()).peekable();
    texts.peek().is_some() && texts.all(|node| node.marks().contains(mark_type))
}

/// Text of the inline content up to `offset`; leaves read as U+FFFC.
pub(crate) fn text_before(content: &[Node], offset: usize) -> String {
    let mut out = String::new();
    let mut pos = 0;
    for node in content {
        if pos >= offset {
            break;
        }
        match node.text_str() {
            Some(text) => out.extend(text.chars().take(offset - pos)),
            None => out.push('\u{fffc}'),
        }
        pos += node.inline_size();
    }
    out
}
