//! Cascade read rules: which relation edges a load may traverse.

/// A set of `(from_type, to_type)` edges plus a polarity.
///
/// Positive rules traverse only the listed edges. Negative rules traverse
/// every edge except the listed ones. Loading without a rule traverses every
/// reachable edge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeReadRule {
    pub edges: Vec<(String, String)>,
    pub is_negative: bool,
}

impl CascadeReadRule {
    /// Traverse only `edges`.
    pub fn only<I, A, B>(edges: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        Self {
            edges: collect_edges(edges),
            is_negative: false,
        }
    }

    /// Traverse everything except `edges`.
    pub fn except<I, A, B>(edges: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        Self {
            edges: collect_edges(edges),
            is_negative: true,
        }
    }

    /// Whether the edge `from -> to` may be joined.
    #[must_use]
    pub fn allows(&self, from: &str, to: &str) -> bool {
        let listed = self.edges.iter().any(|(f, t)| f == from && t == to);
        listed != self.is_negative
    }
}

fn collect_edges<I, A, B>(edges: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (A, B)>,
    A: Into<String>,
    B: Into<String>,
{
    edges
        .into_iter()
        .map(|(from, to)| (from.into(), to.into()))
        .collect()
}

/// Whether `rule` (or its absence) allows `from -> to`.
#[must_use]
pub fn edge_allowed(rule: Option<&CascadeReadRule>, from: &str, to: &str) -> bool {
    rule.is_none_or(|r| r.allows(from, to))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_rule() {
        let rule = CascadeReadRule::only([("Blog", "Post")]);
        assert!(rule.allows("Blog", "Post"));
        assert!(!rule.allows("Post", "Comment"));
        assert!(!rule.allows("Post", "Blog"));
    }

    #[test]
    fn test_negative_rule() {
        let rule = CascadeReadRule::except([("Comment", "Post")]);
        assert!(!rule.allows("Comment", "Post"));
        assert!(rule.allows("Post", "Comment"));
        assert!(rule.allows("Post", "Blog"));
    }

    #[test]
    fn test_no_rule_allows_everything() {
        assert!(edge_allowed(None, "A", "B"));
        let empty_positive = CascadeReadRule::default();
        assert!(!edge_allowed(Some(&empty_positive), "A", "B"));
    }
}
