//! Rendering diagram code blocks and getting their source back.
//!
//! A code block whose language names a diagram language is shown as the artifact an
//! external [`DiagramRenderer`] produced. Rendering moves the block's text into
//! `original_source` and clears the display text, so the serializer keeps writing the
//! diagram source while the editor shows the picture. [`restore_source`] puts the
//! text back for editing.
//!
//! Like paste, rendering runs in phases so the document stays editable while the
//! renderer works: [`pending_diagrams`] lists the blocks, [`render_diagram`] runs the
//! renderer without touching the session, and [`commit_render`] applies the result if
//! the block still holds the rendered source.

use crate::capability::{DiagramArtifact, DiagramRenderer};
use crate::editor::commands::CommandResult;
use crate::editor::position::{parent_and_index, Path, Selection};
use crate::editor::session::{EditorSession, Notice};
use crate::editor::transaction::Transaction;
use crate::error::{ConversionFailure, TransactionError};
use crate::schema::{CodeBlockAttrs, Node, NodeType};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagramOptions {
    /// Code block languages handed to the renderer
    pub languages: Vec<String>,
}

impl Default for DiagramOptions {
    fn default() -> Self {
        Self {
            languages: vec!["mermaid".to_string()],
        }
    }
}

impl DiagramOptions {
    pub fn is_diagram_language(&self, language: &str) -> bool {
        self.languages
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(language))
    }
}

/// A block that was rendered, with the artifact to display in its place
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDiagram {
    pub path: Path,
    pub artifact: DiagramArtifact,
}

/// Diagram blocks still showing their source: path and source text.
pub fn pending_diagrams(root: &Node, options: &DiagramOptions) -> Vec<(Path, String)> {
    fn walk(node: &Node, options: &DiagramOptions, path: &mut Path, out: &mut Vec<(Path, String)>) {
        for (index, child) in node.content().iter().enumerate() {
            path.push(index);
            if let Some(attrs) = child.attrs().code_block() {
                let wanted = attrs
                    .language
                    .as_deref()
                    .is_some_and(|language| options.is_diagram_language(language));
                let source = child.text_content();
                if wanted && !attrs.is_rendered() && !source.trim().is_empty() {
                    out.push((path.clone(), source));
                }
            } else if !child.node_type().is_inline() {
                walk(child, options, path, out);
            }
            path.pop();
        }
    }
    let mut out = Vec::new();
    walk(root, options, &mut Vec::new(), &mut out);
    out
}

/// Outcome of rendering one pending block, not yet applied to the document
#[derive(Debug, Clone, PartialEq)]
pub struct DiagramRender {
    pub path: Path,
    /// Source the renderer was given; the commit checks the block still holds it
    pub source: String,
    pub result: Result<DiagramArtifact, ConversionFailure>,
}

/// Render one block's source. Needs no session, so the host can keep editing while
/// the renderer works.
pub async fn render_diagram<R: DiagramRenderer>(
    renderer: &R,
    path: Path,
    source: String,
) -> DiagramRender {
    let result = renderer.render(&source).await;
    if let Err(err) = &result {
        warn!(path = ?path, error = %err, "diagram: render failed");
    }
    DiagramRender {
        path,
        source,
        result,
    }
}

/// Apply a finished render to the session.
///
/// A failure adds a notice and leaves the block alone. A success swaps the block's
/// text into `original_source`, unless the block at `path` no longer holds the source
/// that was rendered; that render is dropped and `Ok(None)` returned.
pub fn commit_render(
    session: &mut EditorSession,
    render: DiagramRender,
) -> Result<Option<RenderedDiagram>, TransactionError> {
    let DiagramRender {
        path,
        source,
        result,
    } = render;
    let artifact = match result {
        Ok(artifact) => artifact,
        Err(err) => {
            session.push_notice(Notice::error(err.to_string()));
            return Ok(None);
        }
    };
    let Some(block) = session.document().node_at(&path) else {
        return Ok(None);
    };
    let Some(attrs) = block.attrs().code_block() else {
        return Ok(None);
    };
    if attrs.is_rendered() || block.text_content() != source {
        debug!(path = ?path, "diagram: block changed while rendering");
        return Ok(None);
    }
    let attrs = CodeBlockAttrs {
        original_source: Some(source),
        ..attrs.clone()
    };
    if !replace_block(session, &path, Node::code_block(attrs, "")?, None)? {
        return Ok(None);
    }
    Ok(Some(RenderedDiagram { path, artifact }))
}

/// Render every pending diagram block: find the blocks, render them, then commit each
/// result in its own transaction.
pub async fn render_pending<R: DiagramRenderer>(
    session: &mut EditorSession,
    renderer: &R,
    options: &DiagramOptions,
) -> Result<Vec<RenderedDiagram>, TransactionError> {
    let pending = pending_diagrams(session.document().root(), options);
    let mut renders = Vec::with_capacity(pending.len());
    for (path, source) in pending {
        renders.push(render_diagram(renderer, path, source).await);
    }
    let mut rendered = Vec::with_capacity(renders.len());
    for render in renders {
        if let Some(done) = commit_render(session, render)? {
            rendered.push(done);
        }
    }
    Ok(rendered)
}

/// Put a rendered block's source back into its text for editing.
pub fn restore_source(session: &mut EditorSession, path: &[usize]) -> CommandResult {
    let Some(block) = session.document().node_at(path) else {
        return Ok(false);
    };
    let Some(source) = block
        .attrs()
        .code_block()
        .and_then(|attrs| attrs.original_source.clone())
    else {
        return Ok(false);
    };
    let language = block.attrs().code_block().and_then(|attrs| attrs.language.clone());
    let restored = Node::code_block(CodeBlockAttrs::with_language(language), &source)?;
    let end = restored.content_size();
    replace_block(
        session,
        path,
        restored,
        Some(Selection::caret(path.to_vec(), end)),
    )
}

/// Restore the rendered block holding the selection.
pub fn restore_at_selection(session: &mut EditorSession) -> CommandResult {
    let path = match session.selection() {
        Selection::Node { path } => path.clone(),
        Selection::Text { head, .. } => head.block.clone(),
    };
    if session.document().node_at(&path).map(Node::node_type) != Some(NodeType::CodeBlock) {
        return Ok(false);
    }
    restore_source(session, &path)
}

fn replace_block(
    session: &mut EditorSession,
    path: &[usize],
    node: Node,
    selection: Option<Selection>,
) -> CommandResult {
    let Some((parent, index)) = parent_and_index(path) else {
        return Ok(false);
    };
    let tx = Transaction::new().replace_children(parent.to_vec(), index, index + 1, vec![node]);
    let tx = match selection {
        Some(selection) => tx.select(selection),
        None => tx,
    };
    session.dispatch(tx)?;
    Ok(true)
}
