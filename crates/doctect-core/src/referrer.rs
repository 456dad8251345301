//! Child-referrer lookup.
//!
//! Answers "which page holds a reference to one of my children?" For example, from
//! a Month page, find the Week page that contains a reference to any of the
//! month's first seven days.

use crate::expr::evaluate_math;
use crate::model::{Document, Node};

/// Find the parent of a referrer of one of `node`'s children.
///
/// `start_expr` / `count_expr` are arithmetic expressions evaluated against
/// `node.data`. Children are probed at `start, start ± 1, …` (direction from
/// the sign of `count`); the first probe that yields a referrer with an
/// existing parent wins. With a `type_filter`, referrers whose parent has
/// that type are preferred over the first referrer.
pub fn find_child_referrer<'a>(
    doc: &'a Document,
    node: &Node,
    start_expr: &str,
    count_expr: &str,
    type_filter: Option<&str>,
) -> Option<&'a Node> {
    let start = evaluate_math(start_expr, &node.data);
    let count = evaluate_math(count_expr, &node.data);
    let type_filter = type_filter.filter(|t| !t.is_empty());

    // Clip the probed window to the children up front so huge starts or
    // counts cost nothing.
    let len = i64::try_from(node.children.len()).unwrap_or(i64::MAX);
    let span = i64::try_from(count.unsigned_abs()).unwrap_or(i64::MAX);
    let (lo, hi) = if count < 0 {
        (
            start.saturating_sub(span).saturating_add(1).max(0),
            start.saturating_add(1).min(len),
        )
    } else {
        (start.max(0), start.saturating_add(span).min(len))
    };
    let probes: Box<dyn Iterator<Item = i64>> = if count < 0 {
        Box::new((lo..hi).rev())
    } else {
        Box::new(lo..hi)
    };

    for idx in probes {
        let Some(&child_id) = usize::try_from(idx).ok().and_then(|i| node.children.get(i)) else {
            continue;
        };

        let mut referrers = doc.referrers(child_id).peekable();
        let first = referrers.peek().copied();
        let chosen = match type_filter {
            Some(filter) => referrers
                .find(|r| doc.parent(r).is_some_and(|p| p.kind == filter))
                .or(first),
            None => first,
        };

        if let Some(parent) = chosen.and_then(|r| doc.parent(r)) {
            log::trace!(
                "child_referrer @{} idx {idx} → @{} via @{}",
                node.id,
                parent.id,
                child_id
            );
            return Some(parent);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::NodeId;
    use pretty_assertions::assert_eq;

    /// year → jan → d1..d3 ; year → w1 → ref(d2) ; year → agenda → ref(d1)
    /// year → q1 (quarter) → ref(d1) ; year → w0 (week) → ref(d1)
    fn doc() -> Document {
        let mut doc = Document::new(Node::new("year", "year", "2026"));
        let year = NodeId::intern("year");
        doc.add_child(year, Node::new("jan", "month", "January").with_data("first", "1"));
        let jan = NodeId::intern("jan");
        for d in ["d1", "d2", "d3"] {
            doc.add_child(jan, Node::new(d, "day", d));
        }
        doc.add_child(year, Node::new("w1", "week", "Week 1"));
        doc.add_child(NodeId::intern("w1"), Node::reference("w1_d2", "day", "d2"));
        doc.add_child(year, Node::new("q1", "quarter", "Q1"));
        doc.add_child(NodeId::intern("q1"), Node::reference("q1_d1", "day", "d1"));
        doc.add_child(year, Node::new("w0", "week", "Week 0"));
        doc.add_child(NodeId::intern("w0"), Node::reference("w0_d1", "day", "d1"));
        doc
    }

    fn title(found: Option<&Node>) -> Option<&str> {
        found.map(|n| n.title.as_str())
    }

    #[test]
    fn type_filter_prefers_matching_parent() {
        let doc = doc();
        let jan = doc.node_by_str("jan").unwrap();
        assert_eq!(
            title(find_child_referrer(&doc, jan, "0", "7", Some("week"))),
            Some("Week 0")
        );
    }

    #[test]
    fn without_filter_first_inserted_referrer_wins() {
        let doc = doc();
        let jan = doc.node_by_str("jan").unwrap();
        assert_eq!(title(find_child_referrer(&doc, jan, "0", "7", None)), Some("Q1"));
        assert_eq!(title(find_child_referrer(&doc, jan, "0", "7", Some(""))), Some("Q1"));
    }

    #[test]
    fn unmatched_filter_falls_back_to_first_referrer() {
        let doc = doc();
        let jan = doc.node_by_str("jan").unwrap();
        assert_eq!(
            title(find_child_referrer(&doc, jan, "0", "1", Some("decade"))),
            Some("Q1")
        );
    }

    #[test]
    fn start_skips_unreferenced_children() {
        let doc = doc();
        let jan = doc.node_by_str("jan").unwrap();
        // d2 is the first referenced child from index 1 on.
        assert_eq!(title(find_child_referrer(&doc, jan, "1", "2", None)), Some("Week 1"));
        // d3 has no referrers.
        assert_eq!(find_child_referrer(&doc, jan, "2", "5", None), None);
    }

    #[test]
    fn negative_count_walks_backwards() {
        let doc = doc();
        let jan = doc.node_by_str("jan").unwrap();
        // 2 (d3, none) → 1 (d2, Week 1)
        assert_eq!(title(find_child_referrer(&doc, jan, "2", "-3", None)), Some("Week 1"));
        // Negative indices are skipped rather than wrapped.
        assert_eq!(find_child_referrer(&doc, jan, "-1", "-3", None), None);
    }

    #[test]
    fn far_out_of_range_window_is_clipped() {
        let doc = doc();
        let jan = doc.node_by_str("jan").unwrap();
        // Walking back from far past the end reaches d2 without stepping
        // through every missing index.
        assert_eq!(
            title(find_child_referrer(
                &doc,
                jan,
                "9000000000000000000",
                "-9000000000000000000",
                None
            )),
            Some("Week 1")
        );
        assert_eq!(
            find_child_referrer(&doc, jan, "9000000000000000000", "9000000000000000000", None),
            None
        );
        assert_eq!(
            title(find_child_referrer(&doc, jan, "-9000000000000000000", "9000000000000000003", None)),
            Some("Q1")
        );
    }

    #[test]
    fn expressions_use_node_data() {
        let doc = doc();
        let jan = doc.node_by_str("jan").unwrap();
        // first = 1 → start at d2.
        assert_eq!(title(find_child_referrer(&doc, jan, "first", "1", None)), Some("Week 1"));
        assert_eq!(title(find_child_referrer(&doc, jan, "first-1", "1", Some("week"))), Some("Week 0"));
    }

    #[test]
    fn zero_count_finds_nothing() {
        let doc = doc();
        let jan = doc.node_by_str("jan").unwrap();
        assert_eq!(find_child_referrer(&doc, jan, "0", "0", None), None);
        assert_eq!(find_child_referrer(&doc, jan, "0", "bogus", None), None);
    }

    #[test]
    fn orphan_referrer_is_skipped() {
        let mut doc = doc();
        let mut orphan = Node::reference("orphan", "day", "d3");
        orphan.parent_id = Some(NodeId::intern("missing_parent"));
        doc.insert_node(orphan);

        let jan = doc.node_by_str("jan").unwrap();
        // d3's only referrer has no parent, so probing continues to nothing.
        assert_eq!(find_child_referrer(&doc, jan, "2", "1", None), None);
    }
}
