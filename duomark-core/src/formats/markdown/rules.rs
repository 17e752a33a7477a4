use serde::{Deserialize, Serialize};

/// How ordered list items are numbered on output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListNumbering {
    /// Number items positionally, starting at the list's `order`
    #[default]
    Sequential,
    /// Emit `1.` for every item and let renderers count
    RepeatOne,
}

impl ListNumbering {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sequential" => Some(ListNumbering::Sequential),
            "repeat-one" => Some(ListNumbering::RepeatOne),
            _ => None,
        }
    }
}

/// Configuration for the Markdown serializer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkdownRules {
    /// Numbering policy for ordered lists
    pub ordered_list_numbering: ListNumbering,

    /// Marker for bullet and task list items (`-`, `*` or `+`)
    pub bullet_marker: char,
}

impl Default for MarkdownRules {
    fn default() -> Self {
        Self {
            ordered_list_numbering: ListNumbering::Sequential,
            bullet_marker: '-',
        }
    }
}

impl MarkdownRules {
    /// Bullet marker, falling back to `-` for anything that is not a list marker.
    pub fn bullet(&self) -> char {
        match self.bullet_marker {
            '-' | '*' | '+' => self.bullet_marker,
            _ => '-',
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules() {
        let rules = MarkdownRules::default();
        assert_eq!(rules.ordered_list_numbering, ListNumbering::Sequential);
        assert_eq!(rules.bullet(), '-');
    }

    #[test]
    fn test_invalid_marker_falls_back() {
        let rules = MarkdownRules {
            bullet_marker: '#',
            ..MarkdownRules::default()
        };
        assert_eq!(rules.bullet(), '-');
        assert_eq!(
            ListNumbering::from_name("repeat-one"),
            Some(ListNumbering::RepeatOne)
        );
    }
}
