//! Paste and drop ingestion.
//!
//! Media and HTML coming from the clipboard or a drop cannot be inserted right away:
//! media has to be uploaded and HTML converted, both asynchronously. Ingestion
//! therefore runs in three phases so that no document mutation ever waits on I/O:
//!
//! 1. [`begin_paste`] / [`begin_drop`] insert a placeholder image
//!    (`duomark-placeholder:<id>`) at the selection and hand back a [`PasteTicket`].
//! 2. [`resolve`] does the async work with the host's capabilities. It only owns the
//!    ticket, never the session.
//! 3. [`finish_paste`] swaps the placeholder for the result, or removes it and leaves
//!    a [`Notice`] when the work failed. Failures are not retried.
//!
//! [`ingest`] chains the three phases for hosts that can hold the session across the
//! await.

use crate::capability::{HtmlConversionOptions, HtmlToMarkdown, UploadCapability};
use crate::editor::commands::{self, CommandResult};
use crate::editor::position::{textblock_paths, Path, Selection, TextPos};
use crate::editor::session::{EditorSession, Notice};
use crate::editor::transaction::Transaction;
use crate::error::{IngestFailure, SchemaViolation, TransactionError, UploadFailure};
use crate::formats::markdown::parse_markdown;
use crate::schema::{Attrs, ContentRule, Document, ImageAttrs, Mark, MarkSet, Node, NodeType};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Scheme of the `src` given to placeholder images
pub const PLACEHOLDER_SCHEME: &str = "duomark-placeholder:";

/// What was pasted or dropped
#[derive(Debug, Clone, PartialEq)]
pub enum PastePayload {
    /// A file or clipboard blob
    Media {
        bytes: Vec<u8>,
        mime: String,
        filename: String,
    },
    /// Rich clipboard content
    Html(String),
}

impl PastePayload {
    pub fn media(bytes: Vec<u8>, mime: impl Into<String>, filename: impl Into<String>) -> Self {
        PastePayload::Media {
            bytes,
            mime: mime.into(),
            filename: filename.into(),
        }
    }

    /// Whether ingestion handles this payload; other media is left to the host.
    pub fn is_ingestible(&self) -> bool {
        match self {
            PastePayload::Media { mime, .. } => {
                mime.starts_with("image/") || mime.starts_with("video/")
            }
            PastePayload::Html(_) => true,
        }
    }
}

/// Handle for one in-flight paste
#[derive(Debug, Clone, PartialEq)]
pub struct PasteTicket {
    id: u64,
    payload: PastePayload,
}

impl PasteTicket {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// `src` of the placeholder image standing in for this paste
    pub fn placeholder(&self) -> String {
        placeholder_src(self.id)
    }

    pub fn payload(&self) -> &PastePayload {
        &self.payload
    }
}

fn placeholder_src(id: u64) -> String {
    format!("{PLACEHOLDER_SCHEME}{id}")
}

/// Content a finished paste puts where its placeholder was
#[derive(Debug, Clone, PartialEq)]
pub enum PasteContent {
    Image { src: String, alt: Option<String> },
    /// Uploaded video, linked by name
    Link { href: String, text: String },
    /// Converted HTML
    Document(Document),
}

/// Outcome of the async phase, ready to be committed
#[derive(Debug, Clone, PartialEq)]
pub struct PasteResolution {
    pub id: u64,
    pub result: Result<PasteContent, IngestFailure>,
}

/// Phase 1: insert a placeholder at the selection.
///
/// Returns `None` when the payload is not ingestible or the selection cannot hold an
/// image (code blocks, node selections).
pub fn begin_paste(
    session: &mut EditorSession,
    payload: PastePayload,
) -> Result<Option<PasteTicket>, TransactionError> {
    if !payload.is_ingestible() {
        return Ok(None);
    }
    let (Some(from), Some(to)) = (
        session.selection().from().cloned(),
        session.selection().to().cloned(),
    ) else {
        return Ok(None);
    };
    let rich = session
        .document()
        .node_at(&from.block)
        .is_some_and(|block| block.node_type().allows_marks());
    if !rich {
        return Ok(None);
    }
    if from.block != to.block && !commands::delete_selection(session)? {
        return Ok(None);
    }
    let to = if from.block == to.block { to } else { from.clone() };

    let id = session.next_id();
    let placeholder = Node::image(ImageAttrs::new(placeholder_src(id)))?;
    let tx = Transaction::new()
        .replace_inline(from.block.clone(), from.offset, to.offset, vec![placeholder])
        .select(Selection::caret(from.block, from.offset + 1));
    session.dispatch(tx)?;
    debug!(id, "paste: placeholder inserted");
    Ok(Some(PasteTicket { id, payload }))
}

/// Phase 1 for drops: place the caret at the drop position first.
pub fn begin_drop(
    session: &mut EditorSession,
    payload: PastePayload,
    at: TextPos,
) -> Result<Option<PasteTicket>, TransactionError> {
    if !session.set_selection(Selection::caret(at.block, at.offset)) {
        return Ok(None);
    }
    begin_paste(session, payload)
}

/// Phase 2: upload or convert the payload.
pub async fn resolve<U, H>(
    ticket: PasteTicket,
    uploader: &U,
    converter: &H,
    options: &HtmlConversionOptions,
) -> PasteResolution
where
    U: UploadCapability,
    H: HtmlToMarkdown,
{
    let id = ticket.id;
    let result = match ticket.payload {
        PastePayload::Media {
            bytes,
            mime,
            filename,
        } => upload_media(uploader, bytes, &mime, &filename).await,
        PastePayload::Html(html) => convert_html(uploader, converter, &html, options).await,
    };
    if let Err(err) = &result {
        warn!(id, error = %err, "paste: ingestion failed");
    }
    PasteResolution { id, result }
}

async fn upload_media<U: UploadCapability>(
    uploader: &U,
    bytes: Vec<u8>,
    mime: &str,
    filename: &str,
) -> Result<PasteContent, IngestFailure> {
    let url = uploader.upload(bytes, filename).await?;
    let name = filename.trim();
    if mime.starts_with("video/") {
        let text = if name.is_empty() { "video" } else { name };
        return Ok(PasteContent::Link {
            href: url,
            text: text.to_string(),
        });
    }
    let alt = name
        .rsplit_once('.')
        .map_or(name, |(stem, _)| stem)
        .to_string();
    Ok(PasteContent::Image {
        src: url,
        alt: (!alt.is_empty()).then_some(alt),
    })
}

async fn convert_html<U, H>(
    uploader: &U,
    converter: &H,
    html: &str,
    options: &HtmlConversionOptions,
) -> Result<PasteContent, IngestFailure>
where
    U: UploadCapability,
    H: HtmlToMarkdown,
{
    let markdown = converter.convert(html, options).await?;
    let doc = parse_markdown(&markdown);

    let mut sources = Vec::new();
    collect_data_images(doc.root(), &mut sources);
    if sources.is_empty() {
        return Ok(PasteContent::Document(doc));
    }

    let mut uploaded = HashMap::new();
    for (index, src) in sources.into_iter().enumerate() {
        if uploaded.contains_key(&src) {
            continue;
        }
        let Some((mime, bytes)) = decode_data_uri(&src) else {
            debug!("paste: embedded image is not base64 data, kept as is");
            continue;
        };
        let filename = format!("pasted-{}.{}", index + 1, extension_for(&mime));
        let url = uploader.upload(bytes, &filename).await?;
        uploaded.insert(src, url);
    }
    let root = rewrite_images(doc.root(), &uploaded)
        .map_err(|err| UploadFailure::new(err.to_string()))?;
    let doc = Document::from_root(root).map_err(|err| UploadFailure::new(err.to_string()))?;
    Ok(PasteContent::Document(doc))
}

fn collect_data_images(node: &Node, out: &mut Vec<String>) {
    if let Some(image) = node.attrs().image() {
        if image.src.starts_with("data:") {
            out.push(image.src.clone());
        }
    }
    for child in node.content() {
        collect_data_images(child, out);
    }
}

/// Split a `data:<mime>;base64,<payload>` URI into its type and bytes.
fn decode_data_uri(uri: &str) -> Option<(String, Vec<u8>)> {
    let (header, payload) = uri.strip_prefix("data:")?.split_once(',')?;
    let mime = header.strip_suffix(";base64")?;
    let bytes = STANDARD.decode(payload.trim()).ok()?;
    Some((mime.to_string(), bytes))
}

fn extension_for(mime: &str) -> &str {
    match mime.strip_prefix("image/") {
        Some("jpeg") => "jpg",
        Some("svg+xml") => "svg",
        Some(subtype) if !subtype.is_empty() => subtype,
        _ => "bin",
    }
}

fn rewrite_images(node: &Node, urls: &HashMap<String, String>) -> Result<Node, SchemaViolation> {
    if let Some(image) = node.attrs().image() {
        return match urls.get(&image.src) {
            Some(url) => node.with_attrs(Attrs::Image(ImageAttrs {
                src: url.clone(),
                ..image.clone()
            })),
            None => Ok(node.clone()),
        };
    }
    if node.is_text() || node.content().is_empty() {
        return Ok(node.clone());
    }
    let content = node
        .content()
        .iter()
        .map(|child| rewrite_images(child, urls))
        .collect::<Result<Vec<_>, _>>()?;
    node.with_content(content)
}

/// Where the placeholder of paste `id` currently is: its textblock and offset.
pub fn find_placeholder(doc: &Document, id: u64) -> Option<TextPos> {
    let src = placeholder_src(id);
    textblock_paths(doc.root()).into_iter().find_map(|path| {
        let block = doc.node_at(&path)?;
        let mut offset = 0;
        for node in block.content() {
            if node.attrs().image().is_some_and(|image| image.src == src) {
                return Some(TextPos::new(path.clone(), offset));
            }
            offset += node.inline_size();
        }
        None
    })
}

/// Phase 3: commit the result of [`resolve`].
///
/// Returns `Ok(false)` when the placeholder is gone (the user deleted it meanwhile);
/// a failure is still reported as a notice in that case.
pub fn finish_paste(session: &mut EditorSession, resolution: PasteResolution) -> CommandResult {
    let PasteResolution { id, result } = resolution;
    let placeholder = find_placeholder(session.document(), id);

    let content = match result {
        Ok(content) => content,
        Err(err) => {
            session.push_notice(Notice::error(err.to_string()));
            let Some(pos) = placeholder else {
                return Ok(false);
            };
            let tx = Transaction::new().replace_inline(
                pos.block,
                pos.offset,
                pos.offset + 1,
                Vec::new(),
            );
            session.dispatch(tx)?;
            return Ok(true);
        }
    };
    let Some(pos) = placeholder else {
        debug!(id, "paste: placeholder removed before the result arrived");
        return Ok(false);
    };
    let follow = session
        .selection()
        .head()
        .is_some_and(|head| head.block == pos.block);

    let (tx, end) = match content {
        PasteContent::Image { src, alt } => {
            let mut attrs = ImageAttrs::new(src);
            attrs.alt = alt;
            inline_replacement(&pos, vec![Node::image(attrs)?])
        }
        PasteContent::Link { href, text } => {
            let marks = MarkSet::new().with(Mark::link(href, None));
            inline_replacement(&pos, vec![Node::text(text, marks)?])
        }
        PasteContent::Document(doc) => match doc.blocks() {
            _ if doc.is_empty() => inline_replacement(&pos, Vec::new()),
            [only] if only.node_type() == NodeType::Paragraph => {
                inline_replacement(&pos, only.content().to_vec())
            }
            blocks => block_replacement(session.document(), &pos, blocks)?,
        },
    };
    let tx = if follow { tx.select(end) } else { tx };
    session.dispatch(tx)?;
    debug!(id, "paste: placeholder replaced");
    Ok(true)
}

fn inline_replacement(pos: &TextPos, nodes: Vec<Node>) -> (Transaction, Selection) {
    let size: usize = nodes.iter().map(Node::inline_size).sum();
    let tx = Transaction::new().replace_inline(pos.block.clone(), pos.offset, pos.offset + 1, nodes);
    (tx, Selection::caret(pos.block.clone(), pos.offset + size))
}

/// Split the placeholder's textblock around it and put `blocks` in between.
fn block_replacement(
    doc: &Document,
    pos: &TextPos,
    blocks: &[Node],
) -> Result<(Transaction, Selection), TransactionError> {
    let (parent, index) = pos
        .block
        .split_last()
        .map(|(index, parent)| (parent.to_vec(), *index))
        .ok_or_else(|| TransactionError::InvalidPath(pos.block.clone()))?;
    let block = doc
        .node_at(&pos.block)
        .ok_or_else(|| TransactionError::InvalidPath(pos.block.clone()))?;
    let (before, rest) = block.content().split_at(
        block
            .content()
            .iter()
            .scan(0, |offset, node| {
                let start = *offset;
                *offset += node.inline_size();
                Some(start)
            })
            .position(|start| start == pos.offset)
            .unwrap_or(block.content().len()),
    );
    let after = rest.get(1..).unwrap_or_default();

    let lead_required = index == 0
        && doc
            .node_at(&parent)
            .is_some_and(|node| node.node_type().content_rule() == ContentRule::ItemBody);
    let mut nodes = Vec::with_capacity(blocks.len() + 2);
    if !before.is_empty() || lead_required {
        nodes.push(block.with_content(before.to_vec())?);
    }
    nodes.extend(blocks.iter().cloned());
    let last = index + nodes.len() - 1;
    if !after.is_empty() {
        nodes.push(block.with_content(after.to_vec())?);
    }

    let mut last_path: Path = parent.clone();
    last_path.push(last);
    let selection = end_of(&nodes[last - index], last_path);
    let tx = Transaction::new().replace_children(parent, index, index + 1, nodes);
    Ok((tx, selection))
}

fn end_of(node: &Node, path: Path) -> Selection {
    if node.node_type().is_textblock() {
        return Selection::caret(path, node.content_size());
    }
    match textblock_paths(node).pop() {
        Some(inner) => {
            let block = node.node_at(&inner).map_or(0, Node::content_size);
            Selection::caret([path, inner].concat(), block)
        }
        None => Selection::node(path),
    }
}

/// Run all three phases, holding the session across the await.
pub async fn ingest<U, H>(
    session: &mut EditorSession,
    payload: PastePayload,
    uploader: &U,
    converter: &H,
    options: &HtmlConversionOptions,
) -> CommandResult
where
    U: UploadCapability,
    H: HtmlToMarkdown,
{
    let Some(ticket) = begin_paste(session, payload)? else {
        return Ok(false);
    };
    let resolution = resolve(ticket, uploader, converter, options).await;
    finish_paste(session, resolution)
}
