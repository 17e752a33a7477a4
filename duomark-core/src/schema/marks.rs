//! Inline marks and canonical mark sets.

use super::attrs::LinkAttrs;
use serde::{Deserialize, Serialize};

/// The type of a mark. Declaration order is the mark rank: marks of lower rank wrap
/// marks of higher rank when serialized (`[**text**](href)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MarkType {
    Link,
    Strong,
    Em,
    Strike,
    Code,
}

impl MarkType {
    pub fn name(&self) -> &'static str {
        match self {
            MarkType::Link => "link",
            MarkType::Strong => "strong",
            MarkType::Em => "em",
            MarkType::Strike => "strike",
            MarkType::Code => "code",
        }
    }

    /// Whether typing at the edge of a span extends it.
    ///
    /// Links are non-inclusive: text typed right after a link is plain.
    pub fn is_inclusive(&self) -> bool {
        !matches!(self, MarkType::Link)
    }
}

/// A mark applied to a text run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Mark {
    Link { attrs: LinkAttrs },
    Strong,
    Em,
    Strike,
    Code,
}

impl Mark {
    pub fn link(href: impl Into<String>, title: Option<String>) -> Self {
        Mark::Link {
            attrs: LinkAttrs {
                href: href.into(),
                title,
            },
        }
    }

    pub fn mark_type(&self) -> MarkType {
        match self {
            Mark::Link { .. } => MarkType::Link,
            Mark::Strong => MarkType::Strong,
            Mark::Em => MarkType::Em,
            Mark::Strike => MarkType::Strike,
            Mark::Code => MarkType::Code,
        }
    }

    pub fn link_attrs(&self) -> Option<&LinkAttrs> {
        match self {
            Mark::Link { attrs } => Some(attrs),
            _ => None,
        }
    }
}

/// An ordered, duplicate-free set of marks (at most one mark per type).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkSet(Vec<Mark>);

impl MarkSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Build a canonical set; a later mark of the same type replaces an earlier one.
    pub fn from_marks(marks: impl IntoIterator<Item = Mark>) -> Self {
        marks
            .into_iter()
            .fold(MarkSet::new(), |set, mark| set.with(mark))
    }

    /// Returns a copy with `mark` added (replacing any mark of the same type).
    pub fn with(&self, mark: Mark) -> Self {
        let mut marks: Vec<Mark> = self
            .0
            .iter()
            .filter(|m| m.mark_type() != mark.mark_type())
            .cloned()
            .collect();
        let pos = marks
            .iter()
            .position(|m| m.mark_type() > mark.mark_type())
            .unwrap_or(marks.len());
        marks.insert(pos, mark);
        Self(marks)
    }

    /// Returns a copy without any mark of `mark_type`.
    pub fn without(&self, mark_type: MarkType) -> Self {
        Self(
            self.0
                .iter()
                .filter(|m| m.mark_type() != mark_type)
                .cloned()
                .collect(),
        )
    }

    pub fn contains(&self, mark_type: MarkType) -> bool {
        self.0.iter().any(|m| m.mark_type() == mark_type)
    }

    pub fn get(&self, mark_type: MarkType) -> Option<&Mark> {
        self.0.iter().find(|m| m.mark_type() == mark_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mark> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Marks that carry over to text inserted at the end of a span.
    pub fn inclusive(&self) -> Self {
        Self(
            self.0
                .iter()
                .filter(|m| m.mark_type().is_inclusive())
                .cloned()
                .collect(),
        )
    }

    /// Union of both sets, marks in `other` winning on type conflicts.
    pub fn union(&self, other: &MarkSet) -> Self {
        other.iter().fold(self.clone(), |set, m| set.with(m.clone()))
    }
}

impl<'a> IntoIterator for &'a MarkSet {
    type Item = &'a Mark;
    type IntoIter = std::slice::Iter<'a, Mark>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marks_are_kept_in_rank_order() {
        let set = MarkSet::from_marks([Mark::Code, Mark::Em, Mark::link("/a", None)]);
        let types: Vec<_> = set.iter().map(Mark::mark_type).collect();
        assert_eq!(types, vec![MarkType::Link, MarkType::Em, MarkType::Code]);
    }

    #[test]
    fn adding_same_type_replaces() {
        let set = MarkSet::new()
            .with(Mark::link("/a", None))
            .with(Mark::link("/b", None));
        assert_eq!(set.len(), 1);
        assert_eq!(
            set.get(MarkType::Link).and_then(Mark::link_attrs).map(|a| a.href.as_str()),
            Some("/b")
        );
    }

    #[test]
    fn links_are_not_inclusive() {
        let set = MarkSet::from_marks([Mark::Strong, Mark::link("/a", None)]);
        assert_eq!(set.inclusive(), MarkSet::from_marks([Mark::Strong]));
    }
}
