//! Editing commands.
//!
//! A command inspects the session's selection, returns `Ok(false)` when it does not
//! apply, and otherwise dispatches exactly one transaction and returns `Ok(true)`.
//! Keymaps chain commands by trying them in order until one applies.
//!
//! Positions are caret offsets inside textblocks (see [`super::position`]). Commands
//! that restructure blocks build the new subtree with the schema constructors, so a
//! command can never leave an invalid document behind; at worst the transaction is
//! rejected and the document stays as it was.

use super::fragment::{marks_at, range_has_mark, replace_inline, slice_inline, split_inline};
use super::position::{
    enclosing_item, find_ancestor, parent_and_index, textblock_paths, Path, Selection, TextPos,
};
use super::session::EditorSession;
use super::transaction::Transaction;
use crate::error::{SchemaViolation, TransactionError};
use crate::schema::{
    Attrs, CodeBlockAttrs, ContentRule, Document, HeadingAttrs, Mark, MarkSet, MarkType, Node,
    NodeType, TaskItemAttrs,
};
use std::ops::Range;
use url::Url;

pub type CommandResult = Result<bool, TransactionError>;

fn text_range(session: &EditorSession) -> Option<(TextPos, TextPos)> {
    let selection = session.selection();
    Some((selection.from()?.clone(), selection.to()?.clone()))
}

fn caret(session: &EditorSession) -> Option<TextPos> {
    let (from, to) = text_range(session)?;
    (from == to).then_some(from)
}

/// The block the selection starts in (or the selected node).
fn selection_block(session: &EditorSession) -> Option<Path> {
    match session.selection() {
        Selection::Text { .. } => text_range(session).map(|(from, _)| from.block),
        Selection::Node { path } => Some(path.clone()),
    }
}

/// Textblocks touched by `from..to`, with the offset range inside each.
fn touched_blocks(doc: &Document, from: &TextPos, to: &TextPos) -> Vec<(Path, usize, usize)> {
    textblock_paths(doc.root())
        .into_iter()
        .filter(|path| *path >= from.block && *path <= to.block)
        .filter_map(|path| {
            let size = doc.node_at(&path)?.content_size();
            let start = if path == from.block { from.offset } else { 0 };
            let end = if path == to.block { to.offset } else { size };
            Some((path, start, end))
        })
        .collect()
}

fn simple_mark(mark_type: MarkType) -> Option<Mark> {
    match mark_type {
        MarkType::Strong => Some(Mark::Strong),
        MarkType::Em => Some(Mark::Em),
        MarkType::Strike => Some(Mark::Strike),
        MarkType::Code => Some(Mark::Code),
        MarkType::Link => None,
    }
}

fn allows_marks(doc: &Document, path: &[usize]) -> bool {
    doc.node_at(path)
        .is_some_and(|node| node.node_type().allows_marks())
}

/// Whether a textblock of `target` type can hold `content`.
fn accepts(target: NodeType, content: &[Node]) -> bool {
    target.allows_marks()
        || content
            .iter()
            .all(|node| node.is_text() && node.marks().is_empty())
}

/// Whether the child at `index` of `parent` must stay a paragraph.
fn is_item_lead(doc: &Document, parent: &[usize], index: usize) -> bool {
    index == 0
        && doc
            .node_at(parent)
            .is_some_and(|node| node.node_type().content_rule() == ContentRule::ItemBody)
}

fn child_path(parent: &[usize], rest: &[usize]) -> Path {
    [parent, rest].concat()
}

/// Map the selection after the subtree at `old` moved to `new`.
///
/// Positions outside the moved subtree collapse the selection to a caret.
fn relocate(selection: &Selection, old: &[usize], new: &[usize]) -> Selection {
    let map = |path: &[usize]| {
        path.strip_prefix(old)
            .map(|rest| child_path(new, rest))
    };
    match selection {
        Selection::Text { anchor, head } => match (map(&anchor.block), map(&head.block)) {
            (Some(a), Some(h)) => Selection::range(
                TextPos::new(a, anchor.offset),
                TextPos::new(h, head.offset),
            ),
            (Some(a), None) => Selection::caret(a, anchor.offset),
            (None, Some(h)) => Selection::caret(h, head.offset),
            (None, None) => selection.clone(),
        },
        Selection::Node { path } => match map(path) {
            Some(path) => Selection::node(path),
            None => selection.clone(),
        },
    }
}

fn last_textblock(doc: &Document, path: &[usize]) -> Option<Path> {
    let node = doc.node_at(path)?;
    if node.node_type().is_textblock() {
        return Some(path.to_vec());
    }
    let inner = textblock_paths(node).pop()?;
    Some(child_path(path, &inner))
}

/// A list holding `range` of `list`'s items; ordered lists keep their numbering.
fn list_slice(list: &Node, range: Range<usize>) -> Result<Node, SchemaViolation> {
    let start = range.start as u32;
    let items = list.content()[range].to_vec();
    match list.attrs().ordered_list() {
        Some(attrs) => Node::ordered_list(attrs.order.saturating_add(start), items),
        None => list.with_content(items),
    }
}

/// An item fit for a list of `list_type` with `body` as content.
fn item_for(list_type: NodeType, source: &Node, body: Vec<Node>) -> Result<Node, SchemaViolation> {
    match list_type {
        NodeType::TaskList => Node::task_item(
            source.attrs().task_item().is_some_and(|attrs| attrs.checked),
            body,
        ),
        _ => Node::list_item(body),
    }
}

/// Toggle a formatting mark over the selection.
///
/// At a caret the mark is toggled for the next typed text only.
pub fn toggle_mark(session: &mut EditorSession, mark_type: MarkType) -> CommandResult {
    let Some(mark) = simple_mark(mark_type) else {
        return Ok(false);
    };
    let Some((from, to)) = text_range(session) else {
        return Ok(false);
    };
    let doc = session.document();

    if from == to {
        let Some(block) = doc.node_at(&from.block) else {
            return Ok(false);
        };
        if !block.node_type().allows_marks() {
            return Ok(false);
        }
        let current = session
            .stored_marks()
            .cloned()
            .unwrap_or_else(|| marks_at(block.content(), from.offset));
        let next = if current.contains(mark_type) {
            current.without(mark_type)
        } else {
            current.with(mark)
        };
        session.set_stored_marks(Some(next));
        return Ok(true);
    }

    let ranges: Vec<_> = touched_blocks(doc, &from, &to)
        .into_iter()
        .filter(|(path, start, end)| start < end && allows_marks(doc, path))
        .collect();
    if ranges.is_empty() {
        return Ok(false);
    }
    let active = ranges.iter().all(|(path, start, end)| {
        doc.node_at(path)
            .is_some_and(|block| range_has_mark(block.content(), *start, *end, mark_type))
    });
    let tx = ranges
        .into_iter()
        .fold(Transaction::new(), |tx, (path, start, end)| {
            if active {
                tx.remove_mark(path, start, end, mark_type)
            } else {
                tx.add_mark(path, start, end, mark.clone())
            }
        });
    session.dispatch(tx)?;
    Ok(true)
}

/// Whether `href` can be used as a link target.
///
/// Absolute URLs must parse and must not use a script or data scheme; relative
/// paths and `#fragment` anchors are accepted as they are.
pub fn is_valid_href(href: &str) -> bool {
    let href = href.trim();
    if href.is_empty() || href.chars().any(char::is_whitespace) {
        return false;
    }
    match Url::parse(href) {
        Ok(url) => !matches!(url.scheme(), "javascript" | "vbscript" | "data"),
        Err(url::ParseError::RelativeUrlWithoutBase) => true,
        Err(_) => false,
    }
}

/// Link the selected text to `href`. At a caret the href itself is inserted as
/// linked text.
pub fn insert_link(session: &mut EditorSession, href: &str, title: Option<String>) -> CommandResult {
    let href = href.trim();
    if !is_valid_href(href) {
        return Ok(false);
    }
    let Some((from, to)) = text_range(session) else {
        return Ok(false);
    };
    let mark = Mark::link(href, title);
    let doc = session.document();

    let tx = if from == to {
        let Some(block) = doc
            .node_at(&from.block)
            .filter(|block| block.node_type().allows_marks())
        else {
            return Ok(false);
        };
        let text = Node::text(href, marks_at(block.content(), from.offset).with(mark))?;
        let end = from.offset + text.inline_size();
        Transaction::new()
            .replace_inline(from.block.clone(), from.offset, from.offset, vec![text])
            .select(Selection::caret(from.block, end))
    } else {
        touched_blocks(doc, &from, &to)
            .into_iter()
            .filter(|(path, start, end)| start < end && allows_marks(doc, path))
            .fold(Transaction::new(), |tx, (path, start, end)| {
                tx.add_mark(path, start, end, mark.clone())
            })
    };
    if tx.is_empty() {
        return Ok(false);
    }
    session.dispatch(tx)?;
    Ok(true)
}

/// Extent of the link around `offset`: adjacent text carrying the same link mark.
fn link_extent(content: &[Node], offset: usize) -> Option<(usize, usize)> {
    let mut spans = Vec::with_capacity(content.len());
    let mut pos = 0;
    for node in content {
        let size = node.inline_size();
        spans.push((pos, pos + size, node.marks().get(MarkType::Link)));
        pos += size;
    }
    let index = spans
        .iter()
        .position(|(start, end, link)| link.is_some() && *start <= offset && offset <= *end)?;
    let link = spans[index].2;
    let mut first = index;
    while first > 0 && spans[first - 1].2 == link {
        first -= 1;
    }
    let mut last = index;
    while last + 1 < spans.len() && spans[last + 1].2 == link {
        last += 1;
    }
    Some((spans[first].0, spans[last].1))
}

/// Remove links from the selection, or the whole link around a caret.
pub fn remove_link(session: &mut EditorSession) -> CommandResult {
    let Some((from, to)) = text_range(session) else {
        return Ok(false);
    };
    let doc = session.document();
    let ranges: Vec<(Path, usize, usize)> = if from == to {
        let extent = doc
            .node_at(&from.block)
            .and_then(|block| link_extent(block.content(), from.offset));
        extent
            .map(|(start, end)| (from.block.clone(), start, end))
            .into_iter()
            .collect()
    } else {
        touched_blocks(doc, &from, &to)
            .into_iter()
            .filter(|(path, start, end)| {
                doc.node_at(path).is_some_and(|block| {
                    slice_inline(block.content(), *start, *end).is_ok_and(|nodes| {
                        nodes.iter().any(|node| node.marks().contains(MarkType::Link))
                    })
                })
            })
            .collect()
    };
    if ranges.is_empty() {
        return Ok(false);
    }
    let tx = ranges
        .into_iter()
        .fold(Transaction::new(), |tx, (path, start, end)| {
            tx.remove_mark(path, start, end, MarkType::Link)
        });
    session.dispatch(tx)?;
    Ok(true)
}

/// Merge the textblock at `block` into the end of whatever precedes it.
///
/// A leaf block before it (a rule) is deleted instead.
fn join_textblock_backward(doc: &Document, block: &[usize]) -> Option<Transaction> {
    let (parent, index) = parent_and_index(block)?;
    if index == 0 {
        return None;
    }
    let node = doc.node_at(block)?;
    let prev_path = child_path(parent, &[index - 1]);
    let prev = doc.node_at(&prev_path)?;

    if prev.node_type().is_leaf() {
        return Some(
            Transaction::new()
                .replace_children(parent.to_vec(), index - 1, index, Vec::new())
                .select(Selection::caret(prev_path, 0)),
        );
    }
    let target = last_textblock(doc, &prev_path)?;
    let target_node = doc.node_at(&target)?;
    if !accepts(target_node.node_type(), node.content()) {
        return None;
    }
    let size = target_node.content_size();
    Some(
        Transaction::new()
            .replace_inline(target.clone(), size, size, node.content().to_vec())
            .replace_children(parent.to_vec(), index, index + 1, Vec::new())
            .select(Selection::caret(target, size)),
    )
}

/// Backspace at the start of a textblock.
///
/// The first block of a list item lifts the item, the first block of a quote is
/// lifted out of it, anything else is merged into the preceding block.
pub fn join_backward(session: &mut EditorSession) -> CommandResult {
    let Some(pos) = caret(session) else {
        return Ok(false);
    };
    if pos.offset != 0 {
        return Ok(false);
    }
    let doc = session.document();
    let Some((parent, index)) = parent_and_index(&pos.block) else {
        return Ok(false);
    };
    if index == 0 {
        let parent_type = doc.node_at(parent).map(Node::node_type);
        return match parent_type {
            Some(node_type) if node_type.is_list_item() => lift_list_item(session),
            Some(NodeType::Blockquote) => lift(session),
            _ => Ok(false),
        };
    }
    let Some(tx) = join_textblock_backward(doc, &pos.block) else {
        return Ok(false);
    };
    session.dispatch(tx)?;
    Ok(true)
}

/// Pull the block after the textblock at `block` into it.
fn join_textblock_forward(doc: &Document, block: &[usize]) -> Option<Transaction> {
    let (parent, index) = parent_and_index(block)?;
    let node = doc.node_at(block)?;
    let next = doc.node_at(&child_path(parent, &[index + 1]))?;
    if next.node_type().is_leaf() {
        return Some(Transaction::new().replace_children(
            parent.to_vec(),
            index + 1,
            index + 2,
            Vec::new(),
        ));
    }
    if !next.node_type().is_textblock() || !accepts(node.node_type(), next.content()) {
        return None;
    }
    let size = node.content_size();
    Some(
        Transaction::new()
            .replace_inline(block.to_vec(), size, size, next.content().to_vec())
            .replace_children(parent.to_vec(), index + 1, index + 2, Vec::new())
            .select(Selection::caret(block.to_vec(), size)),
    )
}

/// Delete at the end of a textblock: merge the following block into it.
pub fn join_forward(session: &mut EditorSession) -> CommandResult {
    let Some(pos) = caret(session) else {
        return Ok(false);
    };
    let doc = session.document();
    let at_end = doc
        .node_at(&pos.block)
        .is_some_and(|block| block.content_size() == pos.offset);
    if !at_end {
        return Ok(false);
    }
    let Some(tx) = join_textblock_forward(doc, &pos.block) else {
        return Ok(false);
    };
    session.dispatch(tx)?;
    Ok(true)
}

/// Join the nearest list or quote around the selection with an identical one above
/// it, falling back to merging the textblock into the previous one.
pub fn join_up(session: &mut EditorSession) -> CommandResult {
    let Some(block) = selection_block(session) else {
        return Ok(false);
    };
    let doc = session.document();
    for len in (1..=block.len()).rev() {
        let target = &block[..len];
        let Some((parent, index)) = parent_and_index(target) else {
            continue;
        };
        if index == 0 {
            continue;
        }
        let (Some(node), Some(prev)) = (
            doc.node_at(target),
            doc.node_at(&child_path(parent, &[index - 1])),
        ) else {
            continue;
        };
        let joinable = node.node_type().is_list() || node.node_type() == NodeType::Blockquote;
        if !joinable || node.node_type() != prev.node_type() {
            continue;
        }
        let merged = prev.with_content([prev.content(), node.content()].concat())?;
        let shift = prev.child_count();
        let selection = match block.get(len) {
            Some(&child) => relocate(
                session.selection(),
                &block[..=len],
                &child_path(parent, &[index - 1, child + shift]),
            ),
            None => Selection::node(child_path(parent, &[index - 1])),
        };
        let tx = Transaction::new()
            .replace_children(parent.to_vec(), index - 1, index + 1, vec![merged])
            .select(selection);
        session.dispatch(tx)?;
        return Ok(true);
    }
    match join_textblock_backward(doc, &block) {
        Some(tx) => {
            session.dispatch(tx)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Join the nearest list or quote around the selection with an identical one below
/// it, falling back to pulling the next textblock into the current one.
pub fn join_down(session: &mut EditorSession) -> CommandResult {
    let Some(block) = selection_block(session) else {
        return Ok(false);
    };
    let doc = session.document();
    for len in (1..=block.len()).rev() {
        let target = &block[..len];
        let Some((parent, index)) = parent_and_index(target) else {
            continue;
        };
        let (Some(node), Some(next)) = (
            doc.node_at(target),
            doc.node_at(&child_path(parent, &[index + 1])),
        ) else {
            continue;
        };
        let joinable = node.node_type().is_list() || node.node_type() == NodeType::Blockquote;
        if !joinable || node.node_type() != next.node_type() {
            continue;
        }
        let merged = node.with_content([node.content(), next.content()].concat())?;
        let tx = Transaction::new().replace_children(parent.to_vec(), index, index + 2, vec![merged]);
        session.dispatch(tx)?;
        return Ok(true);
    }
    match join_textblock_forward(doc, &block) {
        Some(tx) => {
            session.dispatch(tx)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Lift the selected block out of its enclosing blockquote, splitting the quote
/// around it. Inside a list item the item is lifted instead.
pub fn lift(session: &mut EditorSession) -> CommandResult {
    let Some(block) = selection_block(session) else {
        return Ok(false);
    };
    let doc = session.document();
    let Some((block_parent, _)) = parent_and_index(&block) else {
        return Ok(false);
    };
    let Some(wrapper) = find_ancestor(doc, block_parent, |node| {
        node.node_type() == NodeType::Blockquote || node.node_type().is_list_item()
    }) else {
        return Ok(false);
    };
    let Some(quote) = doc.node_at(&wrapper) else {
        return Ok(false);
    };
    if quote.node_type().is_list_item() {
        return lift_list_item(session);
    }
    let Some((quote_parent, quote_index)) = parent_and_index(&wrapper) else {
        return Ok(false);
    };
    let child_index = block[wrapper.len()];
    let before = &quote.content()[..child_index];
    let after = &quote.content()[child_index + 1..];

    let mut replacement = Vec::with_capacity(3);
    if !before.is_empty() {
        replacement.push(Node::blockquote(before.to_vec())?);
    }
    replacement.push(quote.content()[child_index].clone());
    if !after.is_empty() {
        replacement.push(Node::blockquote(after.to_vec())?);
    }
    let moved = child_path(quote_parent, &[quote_index + usize::from(!before.is_empty())]);
    let selection = relocate(session.selection(), &block[..=wrapper.len()], &moved);
    let tx = Transaction::new()
        .replace_children(quote_parent.to_vec(), quote_index, quote_index + 1, replacement)
        .select(selection);
    session.dispatch(tx)?;
    Ok(true)
}

/// Enter on an empty textblock directly inside a quote lifts it out.
pub fn lift_empty_block(session: &mut EditorSession) -> CommandResult {
    let Some(pos) = caret(session) else {
        return Ok(false);
    };
    let doc = session.document();
    let empty = doc
        .node_at(&pos.block)
        .is_some_and(|block| block.content_size() == 0);
    let in_quote = parent_and_index(&pos.block)
        .is_some_and(|(parent, _)| doc.node_at(parent).map(Node::node_type) == Some(NodeType::Blockquote));
    if !empty || !in_quote {
        return Ok(false);
    }
    lift(session)
}

/// Select the node around the selection: the textblock of a caret, the common
/// ancestor of a range, or the parent of a selected node.
pub fn select_parent_node(session: &mut EditorSession) -> CommandResult {
    let target = match session.selection() {
        Selection::Text { .. } => {
            let Some((from, to)) = text_range(session) else {
                return Ok(false);
            };
            from.block
                .iter()
                .zip(&to.block)
                .take_while(|(a, b)| a == b)
                .map(|(a, _)| *a)
                .collect::<Path>()
        }
        Selection::Node { path } => path[..path.len().saturating_sub(1)].to_vec(),
    };
    if target.is_empty() {
        return Ok(false);
    }
    Ok(session.set_selection(Selection::node(target)))
}

/// Enter inside a list item: split the item at the caret.
///
/// An empty last block lifts the item out of its list instead.
pub fn split_list_item(session: &mut EditorSession) -> CommandResult {
    let Some((from, to)) = text_range(session) else {
        return Ok(false);
    };
    if from.block != to.block {
        return Ok(false);
    }
    let doc = session.document();
    let Some((item_path, child_index)) = parent_and_index(&from.block) else {
        return Ok(false);
    };
    let Some(item) = doc
        .node_at(item_path)
        .filter(|node| node.node_type().is_list_item())
    else {
        return Ok(false);
    };
    let Some(block) = item.child(child_index) else {
        return Ok(false);
    };
    if block.node_type() == NodeType::CodeBlock {
        return Ok(false);
    }
    if block.content_size() == 0 && child_index + 1 == item.child_count() {
        return lift_list_item(session);
    }
    let Some((list_path, item_index)) = parent_and_index(item_path) else {
        return Ok(false);
    };

    let content = replace_inline(block.content(), from.offset, to.offset, Vec::new())?;
    let (left, right) = split_inline(&content, from.offset)?;
    let mut left_body = item.content()[..child_index].to_vec();
    left_body.push(block.with_content(left)?);
    let mut right_body = vec![Node::paragraph(right)?];
    right_body.extend(item.content()[child_index + 1..].iter().cloned());

    let left_item = item.with_content(left_body)?;
    let right_item = match item.node_type() {
        NodeType::TaskItem => Node::task_item(false, right_body)?,
        _ => Node::list_item(right_body)?,
    };
    let caret_path = child_path(list_path, &[item_index + 1, 0]);
    let tx = Transaction::new()
        .replace_children(
            list_path.to_vec(),
            item_index,
            item_index + 1,
            vec![left_item, right_item],
        )
        .select(Selection::caret(caret_path, 0));
    session.dispatch(tx)?;
    Ok(true)
}

/// Move the list item around the selection one level out.
///
/// A nested item becomes a sibling of its parent item, taking the items after it
/// along as its own sublist. A top-level item is unwrapped into the surrounding
/// content, splitting the list around it.
pub fn lift_list_item(session: &mut EditorSession) -> CommandResult {
    let Some(block) = selection_block(session) else {
        return Ok(false);
    };
    let doc = session.document();
    let Some(item_path) = enclosing_item(doc, &block) else {
        return Ok(false);
    };
    let Some((list_path, index)) = parent_and_index(&item_path) else {
        return Ok(false);
    };
    let Some((outer_path, list_index)) = parent_and_index(list_path) else {
        return Ok(false);
    };
    let (Some(list), Some(outer)) = (doc.node_at(list_path), doc.node_at(outer_path)) else {
        return Ok(false);
    };
    let Some(item) = list.child(index) else {
        return Ok(false);
    };

    let tx = if outer.node_type().is_list_item() {
        let Some((outer_list_path, outer_index)) = parent_and_index(outer_path) else {
            return Ok(false);
        };
        let Some(outer_list) = doc.node_at(outer_list_path) else {
            return Ok(false);
        };
        let mut body = item.content().to_vec();
        if index + 1 < list.child_count() {
            body.push(list_slice(list, index + 1..list.child_count())?);
        }
        let lifted = item_for(outer_list.node_type(), item, body)?;
        let mut outer_body = outer.content().to_vec();
        if index == 0 {
            outer_body.remove(list_index);
        } else {
            outer_body[list_index] = list_slice(list, 0..index)?;
        }
        let outer_item = outer.with_content(outer_body)?;
        let moved = child_path(outer_list_path, &[outer_index + 1]);
        Transaction::new()
            .replace_children(
                outer_list_path.to_vec(),
                outer_index,
                outer_index + 1,
                vec![outer_item, lifted],
            )
            .select(relocate(session.selection(), &item_path, &moved))
    } else {
        let mut replacement = Vec::new();
        if index > 0 {
            replacement.push(list_slice(list, 0..index)?);
        }
        let first_moved = list_index + replacement.len();
        replacement.extend(item.content().iter().cloned());
        if index + 1 < list.child_count() {
            replacement.push(list_slice(list, index + 1..list.child_count())?);
        }
        let rel = block[item_path.len()];
        let selection = relocate(
            session.selection(),
            &block[..=item_path.len()],
            &child_path(outer_path, &[first_moved + rel]),
        );
        Transaction::new()
            .replace_children(outer_path.to_vec(), list_index, list_index + 1, replacement)
            .select(selection)
    };
    session.dispatch(tx)?;
    Ok(true)
}

/// Nest the list item around the selection into the item before it.
pub fn sink_list_item(session: &mut EditorSession) -> CommandResult {
    let Some(block) = selection_block(session) else {
        return Ok(false);
    };
    let doc = session.document();
    let Some(item_path) = enclosing_item(doc, &block) else {
        return Ok(false);
    };
    let Some((list_path, index)) = parent_and_index(&item_path) else {
        return Ok(false);
    };
    if index == 0 {
        return Ok(false);
    }
    let Some(list) = doc.node_at(list_path) else {
        return Ok(false);
    };
    let (Some(prev), Some(item)) = (list.child(index - 1), list.child(index)) else {
        return Ok(false);
    };

    let mut prev_body = prev.content().to_vec();
    let (nested_index, item_index) = match prev_body.last() {
        Some(last) if last.node_type() == list.node_type() => {
            let count = last.child_count();
            let nested = last.with_content([last.content(), std::slice::from_ref(item)].concat())?;
            let at = prev_body.len() - 1;
            prev_body[at] = nested;
            (at, count)
        }
        _ => {
            let nested = match list.node_type() {
                NodeType::OrderedList => Node::ordered_list(1, vec![item.clone()])?,
                _ => list.with_content(vec![item.clone()])?,
            };
            prev_body.push(nested);
            (prev_body.len() - 1, 0)
        }
    };
    let new_prev = prev.with_content(prev_body)?;
    let moved = child_path(list_path, &[index - 1, nested_index, item_index]);
    let tx = Transaction::new()
        .replace_children(list_path.to_vec(), index - 1, index + 1, vec![new_prev])
        .select(relocate(session.selection(), &item_path, &moved));
    session.dispatch(tx)?;
    Ok(true)
}

/// Replace the selection with a hard break (a newline inside code blocks).
pub fn insert_hard_break(session: &mut EditorSession) -> CommandResult {
    let Some((from, to)) = text_range(session) else {
        return Ok(false);
    };
    if from.block != to.block {
        return Ok(false);
    }
    let Some(block) = session.document().node_at(&from.block) else {
        return Ok(false);
    };
    let node = if block.node_type().allows_marks() {
        Node::hard_break()
    } else {
        Node::plain_text("\n")?
    };
    let tx = Transaction::new()
        .replace_inline(from.block.clone(), from.offset, to.offset, vec![node])
        .select(Selection::caret(from.block, from.offset + 1));
    session.dispatch(tx)?;
    Ok(true)
}

/// Leave a code block: add an empty paragraph after it and move there.
pub fn exit_code(session: &mut EditorSession) -> CommandResult {
    let Some((from, _)) = text_range(session) else {
        return Ok(false);
    };
    let doc = session.document();
    if doc.node_at(&from.block).map(Node::node_type) != Some(NodeType::CodeBlock) {
        return Ok(false);
    }
    let Some((parent, index)) = parent_and_index(&from.block) else {
        return Ok(false);
    };
    let tx = Transaction::new()
        .replace_children(parent.to_vec(), index + 1, index + 1, vec![Node::empty_paragraph()])
        .select(Selection::caret(child_path(parent, &[index + 1]), 0));
    session.dispatch(tx)?;
    Ok(true)
}

/// Flip the checkbox of the enclosing task item.
///
/// Inside a plain list the whole list becomes a task list; anywhere else the current
/// block is wrapped into a new task list.
pub fn toggle_task(session: &mut EditorSession) -> CommandResult {
    let Some(block) = selection_block(session) else {
        return Ok(false);
    };
    let doc = session.document();

    if let Some(item_path) = enclosing_item(doc, &block) {
        let Some(item) = doc.node_at(&item_path) else {
            return Ok(false);
        };
        let tx = if let Some(attrs) = item.attrs().task_item() {
            Transaction::new().set_attrs(
                item_path,
                Attrs::TaskItem(TaskItemAttrs {
                    checked: !attrs.checked,
                }),
            )
        } else {
            let Some((list_path, _)) = parent_and_index(&item_path) else {
                return Ok(false);
            };
            let Some((parent, index)) = parent_and_index(list_path) else {
                return Ok(false);
            };
            let Some(list) = doc.node_at(list_path) else {
                return Ok(false);
            };
            let items = list
                .content()
                .iter()
                .map(|item| Node::task_item(false, item.content().to_vec()))
                .collect::<Result<Vec<_>, _>>()?;
            Transaction::new().replace_children(
                parent.to_vec(),
                index,
                index + 1,
                vec![Node::task_list(items)?],
            )
        };
        session.dispatch(tx)?;
        return Ok(true);
    }

    let Some(node) = doc.node_at(&block) else {
        return Ok(false);
    };
    let paragraph = match node.node_type() {
        NodeType::Paragraph => node.clone(),
        NodeType::Heading => Node::paragraph(node.content().to_vec())?,
        _ => return Ok(false),
    };
    let Some((parent, index)) = parent_and_index(&block) else {
        return Ok(false);
    };
    if is_item_lead(doc, parent, index) {
        return Ok(false);
    }
    let list = Node::task_list(vec![Node::task_item(false, vec![paragraph])?])?;
    let moved = child_path(parent, &[index, 0, 0]);
    let tx = Transaction::new()
        .replace_children(parent.to_vec(), index, index + 1, vec![list])
        .select(relocate(session.selection(), &block, &moved));
    session.dispatch(tx)?;
    Ok(true)
}

/// Turn the selected textblocks into headings of `level`.
pub fn set_heading(session: &mut EditorSession, level: u8) -> CommandResult {
    if !(1..=6).contains(&level) {
        return Ok(false);
    }
    set_block_type(
        session,
        NodeType::Heading,
        Attrs::Heading(HeadingAttrs { level }),
    )
}

/// Turn the selected textblocks into paragraphs.
pub fn set_paragraph(session: &mut EditorSession) -> CommandResult {
    set_block_type(session, NodeType::Paragraph, Attrs::None)
}

/// Turn the selected textblocks into code blocks with `language`.
pub fn set_code_block(session: &mut EditorSession, language: Option<String>) -> CommandResult {
    set_block_type(
        session,
        NodeType::CodeBlock,
        Attrs::CodeBlock(CodeBlockAttrs::with_language(language)),
    )
}

/// Retype every textblock in the selection that can take the new type.
///
/// Rendered diagrams are skipped, as are blocks that must stay paragraphs (the first
/// block of an item or cell) and content the new type cannot hold.
pub(crate) fn set_block_type(
    session: &mut EditorSession,
    node_type: NodeType,
    attrs: Attrs,
) -> CommandResult {
    let Some((from, to)) = text_range(session) else {
        return Ok(false);
    };
    let doc = session.document();
    let mut tx = Transaction::new();
    for (path, _, _) in touched_blocks(doc, &from, &to) {
        let Some(node) = doc.node_at(&path) else {
            continue;
        };
        if node.node_type() == node_type && *node.attrs() == attrs {
            continue;
        }
        if node.attrs().code_block().is_some_and(CodeBlockAttrs::is_rendered) {
            continue;
        }
        let Some((parent, index)) = parent_and_index(&path) else {
            continue;
        };
        if node_type != NodeType::Paragraph && is_item_lead(doc, parent, index) {
            continue;
        }
        if !accepts(node_type, node.content()) {
            continue;
        }
        let retyped = node.retyped(node_type, attrs.clone())?;
        tx = tx.replace_children(parent.to_vec(), index, index + 1, vec![retyped]);
    }
    if tx.is_empty() {
        return Ok(false);
    }
    session.dispatch(tx)?;
    Ok(true)
}

/// Inline nodes for typed `text`; newlines become hard breaks in rich textblocks.
fn typed_nodes(text: &str, marks: &MarkSet, rich: bool) -> Result<Vec<Node>, SchemaViolation> {
    if !rich {
        return Ok(vec![Node::plain_text(text)?]);
    }
    let mut nodes = Vec::new();
    for (index, line) in text.split('\n').enumerate() {
        if index > 0 {
            nodes.push(Node::hard_break());
        }
        if !line.is_empty() {
            nodes.push(Node::text(line, marks.clone())?);
        }
    }
    Ok(nodes)
}

/// Replace the selection with `text`.
///
/// Typed text takes the stored marks when some were toggled at the caret, otherwise
/// the marks of the text it continues.
pub fn insert_text(session: &mut EditorSession, text: &str) -> CommandResult {
    if text.is_empty() {
        return Ok(false);
    }
    let Some((from, to)) = text_range(session) else {
        return Ok(false);
    };
    if from.block != to.block {
        if !delete_selection(session)? {
            return Ok(false);
        }
        return insert_text(session, text);
    }
    let Some(block) = session.document().node_at(&from.block) else {
        return Ok(false);
    };
    let rich = block.node_type().allows_marks();
    let marks = if rich {
        session
            .stored_marks()
            .cloned()
            .unwrap_or_else(|| marks_at(block.content(), from.offset))
    } else {
        MarkSet::new()
    };
    let nodes = typed_nodes(text, &marks, rich)?;
    let inserted: usize = nodes.iter().map(Node::inline_size).sum();
    let tx = Transaction::new()
        .replace_inline(from.block.clone(), from.offset, to.offset, nodes)
        .select(Selection::caret(from.block, from.offset + inserted));
    session.dispatch(tx)?;
    Ok(true)
}

/// Remove the node at `path`; a parent that cannot lose it gets an empty paragraph
/// in its place.
fn delete_node(session: &mut EditorSession, path: &[usize]) -> CommandResult {
    let Some((parent, index)) = parent_and_index(path) else {
        return Ok(false);
    };
    let doc = session.document();
    let removal = Transaction::new().replace_children(parent.to_vec(), index, index + 1, Vec::new());
    let (tx, after) = match removal.apply(doc) {
        Ok(after) => (removal, after),
        Err(_) => {
            let tx = Transaction::new().replace_children(
                parent.to_vec(),
                index,
                index + 1,
                vec![Node::empty_paragraph()],
            );
            let after = tx.apply(doc)?;
            (tx, after)
        }
    };
    let blocks = textblock_paths(after.root());
    let selection = blocks
        .iter()
        .find(|block| block.as_slice() >= path)
        .or(blocks.last())
        .map(|block| Selection::caret(block.clone(), 0))
        .unwrap_or_else(|| Selection::start_of(&after));
    session.dispatch(tx.select(selection))?;
    Ok(true)
}

/// Delete the selected content.
///
/// Ranges across blocks are supported when both ends are sibling textblocks; the
/// blocks in between are removed and the two ends merged.
pub fn delete_selection(session: &mut EditorSession) -> CommandResult {
    if let Selection::Node { path } = session.selection() {
        let path = path.clone();
        return delete_node(session, &path);
    }
    let Some((from, to)) = text_range(session) else {
        return Ok(false);
    };
    if from == to {
        return Ok(false);
    }
    let doc = session.document();
    let tx = if from.block == to.block {
        Transaction::new().replace_inline(from.block.clone(), from.offset, to.offset, Vec::new())
    } else {
        let (Some((parent, first)), Some((to_parent, last))) =
            (parent_and_index(&from.block), parent_and_index(&to.block))
        else {
            return Ok(false);
        };
        if parent != to_parent {
            return Ok(false);
        }
        let (Some(head), Some(tail_block)) = (doc.node_at(&from.block), doc.node_at(&to.block))
        else {
            return Ok(false);
        };
        if !tail_block.node_type().is_textblock() || !accepts(head.node_type(), tail_block.content())
        {
            return Ok(false);
        }
        let (_, tail) = split_inline(tail_block.content(), to.offset)?;
        Transaction::new()
            .replace_inline(from.block.clone(), from.offset, head.content_size(), tail)
            .replace_children(parent.to_vec(), first + 1, last + 1, Vec::new())
    };
    session.dispatch(tx.select(Selection::caret(from.block, from.offset)))?;
    Ok(true)
}

/// Backspace: delete the selection or the position before the caret.
///
/// Returns `Ok(false)` at the start of a textblock so a keymap can fall through to
/// [`join_backward`].
pub fn delete_backward(session: &mut EditorSession) -> CommandResult {
    let Some(pos) = caret(session) else {
        return delete_selection(session);
    };
    if pos.offset == 0 {
        return Ok(false);
    }
    let tx = Transaction::new()
        .replace_inline(pos.block.clone(), pos.offset - 1, pos.offset, Vec::new())
        .select(Selection::caret(pos.block, pos.offset - 1));
    session.dispatch(tx)?;
    Ok(true)
}

/// Enter: split the textblock at the caret.
///
/// Splitting at the end of a block starts a paragraph; inside a code block a newline
/// is inserted instead.
pub fn split_block(session: &mut EditorSession) -> CommandResult {
    let Some((from, to)) = text_range(session) else {
        return Ok(false);
    };
    if from.block != to.block {
        if !delete_selection(session)? {
            return Ok(false);
        }
        return split_block(session);
    }
    let doc = session.document();
    let Some(block) = doc.node_at(&from.block) else {
        return Ok(false);
    };
    if block.node_type() == NodeType::CodeBlock {
        let tx = Transaction::new()
            .replace_inline(
                from.block.clone(),
                from.offset,
                to.offset,
                vec![Node::plain_text("\n")?],
            )
            .select(Selection::caret(from.block, from.offset + 1));
        session.dispatch(tx)?;
        return Ok(true);
    }
    let Some((parent, index)) = parent_and_index(&from.block) else {
        return Ok(false);
    };
    let content = replace_inline(block.content(), from.offset, to.offset, Vec::new())?;
    let (left, right) = split_inline(&content, from.offset)?;
    let left_block = block.with_content(left)?;
    let right_block = if right.is_empty() {
        Node::empty_paragraph()
    } else {
        block.with_content(right)?
    };
    let tx = Transaction::new()
        .replace_children(parent.to_vec(), index, index + 1, vec![left_block, right_block])
        .select(Selection::caret(child_path(parent, &[index + 1]), 0));
    session.dispatch(tx)?;
    Ok(true)
}
