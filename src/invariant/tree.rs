//! Invariant tree
//!
//! The hierarchical form of a baseline. Nodes live in a flat arena and
//! refer to each other by index, so parents and children never own each
//! other. A tree is built from tab-indented expression lines and checked
//! against documents in two modes:
//!
//! - `check`: strict report of missing and out-of-order elements
//! - `check_and_remove_failures`: prune mode, returning the expressions
//!   that still hold
//!
//! Element lookup tries the exact query first, then fuzzy attribute
//! matching, then promotion through locatable children.

use indexmap::IndexSet;
use log::{debug, warn};

use crate::dom::{document_position, DocumentPosition, DomAccess, NodeId};
use crate::error::Error;
use crate::query::{evaluate_cached, QueryCache};
use super::fuzzy;
use super::path::{derive_path, strip_predicates, tag_of};
use super::report::{CheckReport, FailureKind};

/// Index of a node within an `InvariantTree` arena
pub type NodeIdx = usize;

/// One invariant expression and its place in the hierarchy
#[derive(Debug, Clone)]
pub struct InvariantNode {
    /// Expression without its depth prefix
    pub expression: String,
    /// Parent node index (None for the root)
    pub parent: Option<NodeIdx>,
    /// Child node indexes, in baseline order
    pub children: Vec<NodeIdx>,
}

/// Tunables for fuzzy re-matching
#[derive(Debug, Clone, Copy)]
pub struct MatchConfig {
    /// Fraction of the perfect attribute score a candidate must reach
    pub fuzzy_threshold: f32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        MatchConfig {
            fuzzy_threshold: 0.85,
        }
    }
}

/// A parsed baseline
#[derive(Debug)]
pub struct InvariantTree {
    nodes: Vec<InvariantNode>,
}

impl InvariantTree {
    /// Build a tree from tab-indented lines. Depth is the leading tab
    /// count; the first non-empty line becomes the root and later
    /// depths are interpreted relative to it. Empty lines are skipped.
    ///
    /// Rejected inputs: no non-empty lines, a depth that jumps more
    /// than one level past its predecessor, and a line shallower than
    /// the root (a second root).
    pub fn parse(lines: &[&str]) -> Result<Self, Error> {
        let mut nodes: Vec<InvariantNode> = Vec::new();
        // Chain from the root to the most recent node, with the raw
        // depth each entered at
        let mut open: Vec<(usize, NodeIdx)> = Vec::new();

        for (i, raw) in lines.iter().enumerate() {
            if raw.trim().is_empty() {
                continue;
            }
            let line_no = i + 1;
            let depth = raw.chars().take_while(|&c| c == '\t').count();
            let expression = raw.trim().to_string();

            if nodes.is_empty() {
                nodes.push(InvariantNode {
                    expression,
                    parent: None,
                    children: Vec::new(),
                });
                open.push((depth, 0));
                continue;
            }

            // Non-empty once the root exists
            let current_depth = open.last().map(|&(d, _)| d).unwrap_or(depth);
            if depth > current_depth + 1 {
                return Err(Error::MalformedBaseline {
                    line: line_no,
                    detail: format!(
                        "indentation jumps from {current_depth} to {depth}"
                    ),
                });
            }

            // Walk back out to the parent level
            while open.last().map(|&(d, _)| d >= depth).unwrap_or(false) {
                open.pop();
            }
            let parent = match open.last() {
                Some(&(_, idx)) => idx,
                None => {
                    return Err(Error::MalformedBaseline {
                        line: line_no,
                        detail: "line is not under the root".into(),
                    })
                }
            };

            let idx = nodes.len();
            nodes.push(InvariantNode {
                expression,
                parent: Some(parent),
                children: Vec::new(),
            });
            nodes[parent].children.push(idx);
            open.push((depth, idx));
        }

        if nodes.is_empty() {
            return Err(Error::MalformedBaseline {
                line: 0,
                detail: "baseline contains no expressions".into(),
            });
        }

        Ok(InvariantTree { nodes })
    }

    /// Number of expressions in the tree
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node access by arena index
    pub fn node(&self, idx: NodeIdx) -> Option<&InvariantNode> {
        self.nodes.get(idx)
    }

    /// Expressions in pre-order, without depth prefixes
    pub fn expressions(&self) -> Vec<&str> {
        let mut out = Vec::with_capacity(self.nodes.len());
        self.collect_preorder(0, &mut out);
        out
    }

    fn collect_preorder<'a>(&'a self, idx: NodeIdx, out: &mut Vec<&'a str>) {
        out.push(self.nodes[idx].expression.as_str());
        for &child in &self.nodes[idx].children {
            self.collect_preorder(child, out);
        }
    }

    /// Serialize back to tab-indented lines, one expression per line.
    /// The root renders at one tab, each level below adds one.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        self.serialize_node(0, 1, &mut out);
        out
    }

    fn serialize_node(&self, idx: NodeIdx, depth: usize, out: &mut String) {
        for _ in 0..depth {
            out.push('\t');
        }
        out.push_str(&self.nodes[idx].expression);
        out.push('\n');
        for &child in &self.nodes[idx].children {
            self.serialize_node(child, depth + 1, out);
        }
    }

    /// Tree depth of a node (root = 0)
    fn depth(&self, idx: NodeIdx) -> usize {
        let mut depth = 0;
        let mut current = self.nodes[idx].parent;
        while let Some(p) = current {
            depth += 1;
            current = self.nodes[p].parent;
        }
        depth
    }

    /// Strict check: every expression must still match, and matches
    /// must not precede content they used to follow.
    pub fn check<D: DomAccess + ?Sized>(
        &self,
        doc: &D,
        cache: &QueryCache,
        config: &MatchConfig,
    ) -> CheckReport {
        let mut report = CheckReport::new();
        let mut previous: Vec<Vec<NodeId>> = Vec::new();
        self.check_node(doc, cache, config, 0, &mut previous, &mut report);
        report
    }

    fn check_node<D: DomAccess + ?Sized>(
        &self,
        doc: &D,
        cache: &QueryCache,
        config: &MatchConfig,
        idx: NodeIdx,
        previous: &mut Vec<Vec<NodeId>>,
        report: &mut CheckReport,
    ) {
        let expression = &self.nodes[idx].expression;
        let candidates = self.find_in(doc, cache, config, idx, true);

        if candidates.is_empty() {
            report.add_failure(expression, FailureKind::NoMatch);
        } else {
            // Document order must be preserved against every group
            // matched so far; one failure per violated group
            for group in previous.iter() {
                let ordered = group.iter().any(|&prev| {
                    candidates.iter().any(|&current| {
                        let position = document_position(doc, current, prev);
                        position != DocumentPosition::Following
                            && position != DocumentPosition::ContainedBy
                    })
                });
                if !ordered {
                    report.add_failure(expression, FailureKind::WrongLocation);
                }
            }
            previous.push(candidates);
        }

        for &child in &self.nodes[idx].children {
            self.check_node(doc, cache, config, child, previous, report);
        }
    }

    /// Prune check: returns the tab-indented lines whose expressions
    /// still match. A missing node silently drops its whole subtree.
    pub fn check_and_remove_failures<D: DomAccess + ?Sized>(
        &self,
        doc: &D,
        cache: &QueryCache,
        config: &MatchConfig,
    ) -> IndexSet<String> {
        let mut surviving = IndexSet::new();
        self.prune_node(doc, cache, config, 0, &mut surviving);
        surviving
    }

    fn prune_node<D: DomAccess + ?Sized>(
        &self,
        doc: &D,
        cache: &QueryCache,
        config: &MatchConfig,
        idx: NodeIdx,
        surviving: &mut IndexSet<String>,
    ) {
        let candidates = self.find_in(doc, cache, config, idx, true);
        if candidates.is_empty() {
            return;
        }

        let mut line = String::new();
        for _ in 0..self.depth(idx) + 1 {
            line.push('\t');
        }
        line.push_str(&self.nodes[idx].expression);
        surviving.insert(line);

        for &child in &self.nodes[idx].children {
            self.prune_node(doc, cache, config, child, surviving);
        }
    }

    /// Locate the elements an expression stands for: exact query, then
    /// fuzzy attribute matching, then (when `check_children`) promotion
    /// through locatable children. Query evaluation errors are logged
    /// and treated as zero candidates.
    pub fn find_in<D: DomAccess + ?Sized>(
        &self,
        doc: &D,
        cache: &QueryCache,
        config: &MatchConfig,
        idx: NodeIdx,
        check_children: bool,
    ) -> Vec<NodeId> {
        let expression = &self.nodes[idx].expression;

        let mut found = match evaluate_cached(doc, cache, expression) {
            Ok(nodes) => nodes,
            Err(err) => {
                warn!("skipping unevaluable expression `{expression}`: {err}");
                Vec::new()
            }
        };

        if found.is_empty() {
            found = fuzzy_find(doc, cache, config, expression);
        }

        if found.is_empty() && check_children && !self.nodes[idx].children.is_empty() {
            found = self.find_via_children(doc, cache, config, idx);
        }

        found
    }

    /// Promote through children: a child that can still be located
    /// points at its parent, and parents carrying this expression's tag
    /// become candidates. Unlocatable children are skipped.
    fn find_via_children<D: DomAccess + ?Sized>(
        &self,
        doc: &D,
        cache: &QueryCache,
        config: &MatchConfig,
        idx: NodeIdx,
    ) -> Vec<NodeId> {
        let tag = tag_of(&self.nodes[idx].expression).to_string();
        let mut seen = IndexSet::new();

        for &child in &self.nodes[idx].children {
            for node in self.find_in(doc, cache, config, child, false) {
                if let Some(parent) = doc.parent_of(node) {
                    if doc.tag_name(parent) == Some(tag.as_str()) {
                        seen.insert(parent);
                    }
                }
            }
        }

        seen.into_iter().collect()
    }
}

/// Fuzzy lookup: re-query with predicates stripped and accept the first
/// same-tag candidate whose attribute map scores above the threshold.
fn fuzzy_find<D: DomAccess + ?Sized>(
    doc: &D,
    cache: &QueryCache,
    config: &MatchConfig,
    expression: &str,
) -> Vec<NodeId> {
    let ours = fuzzy::attributes_from_expr(expression);
    if ours.is_empty() {
        return Vec::new();
    }

    let stripped = strip_predicates(expression);
    let candidates = match evaluate_cached(doc, cache, stripped) {
        Ok(nodes) => nodes,
        Err(err) => {
            warn!("skipping unevaluable expression `{stripped}`: {err}");
            return Vec::new();
        }
    };

    for candidate in candidates {
        let derived = derive_path(doc, candidate, true, false);
        let theirs = fuzzy::attributes_from_expr(&derived);
        let score = fuzzy::similarity_score(&ours, &theirs);
        if fuzzy::accepts(score, ours.len(), config.fuzzy_threshold) {
            debug!(
                "fuzzy match for `{expression}`: {} scored {score:.3}",
                derived.trim()
            );
            return vec![candidate];
        }
    }

    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    fn tree(lines: &[&str]) -> InvariantTree {
        InvariantTree::parse(lines).unwrap()
    }

    fn check_setup() -> (QueryCache, MatchConfig) {
        (QueryCache::new(64), MatchConfig::default())
    }

    #[test]
    fn parse_builds_hierarchy_from_tabs() {
        let t = tree(&["\t//html", "\t\t//head", "\t\t//body", "\t\t\t//div"]);
        assert_eq!(t.len(), 4);
        assert_eq!(t.expressions(), vec!["//html", "//head", "//body", "//div"]);

        let body = t.node(2).unwrap();
        assert_eq!(body.parent, Some(0));
        assert_eq!(body.children, vec![3]);
    }

    #[test]
    fn parse_skips_empty_lines() {
        let t = tree(&["\t//html", "", "\t\t//body", ""]);
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn parse_rejects_depth_jumps_and_second_roots() {
        let err = InvariantTree::parse(&["\t//html", "\t\t\t//div"]).unwrap_err();
        assert!(matches!(err, Error::MalformedBaseline { line: 2, .. }));

        let err = InvariantTree::parse(&["\t\t//body", "\t//html"]).unwrap_err();
        assert!(matches!(err, Error::MalformedBaseline { line: 2, .. }));

        assert!(InvariantTree::parse(&["", "  "]).is_err());
    }

    #[test]
    fn dedented_line_rejoins_its_ancestor_level() {
        // footer returns to body's level after div's deeper subtree, so
        // it hangs off html as body's sibling and keeps its depth
        // through serialization
        let t = tree(&[
            "\t//html",
            "\t\t//body",
            "\t\t\t//div",
            "\t\t\t\t//span",
            "\t\t//footer",
        ]);
        let footer = t.node(4).unwrap();
        assert_eq!(footer.expression, "//footer");
        assert_eq!(footer.parent, Some(0));

        assert_eq!(
            t.serialize(),
            "\t//html\n\t\t//body\n\t\t\t//div\n\t\t\t\t//span\n\t\t//footer\n"
        );
    }

    #[test]
    fn serialize_round_trips() {
        let lines = ["\t//html", "\t\t//head", "\t\t//body", "\t\t\t//div[@id=\"x\"]"];
        let t = tree(&lines);
        let serialized = t.serialize();
        assert_eq!(serialized, "\t//html\n\t\t//head\n\t\t//body\n\t\t\t//div[@id=\"x\"]\n");

        let reparsed: Vec<&str> = serialized.lines().collect();
        let t2 = tree(&reparsed);
        assert_eq!(t2.serialize(), serialized);
    }

    #[test]
    fn derived_expressions_round_trip_through_the_tree() {
        let doc = Document::parse(
            "<html><head/><body><div id=\"x\"><p class=\"y\"/></div></body></html>",
        );
        let derived = crate::invariant::derive_all(&doc);
        let lines: Vec<&str> = derived.iter().map(|s| s.as_str()).collect();

        let t = tree(&lines);
        let serialized = t.serialize();
        let t2 = tree(&serialized.lines().collect::<Vec<_>>());
        assert_eq!(t.expressions(), t2.expressions());
        assert_eq!(t2.serialize(), serialized);
    }

    #[test]
    fn bare_root_document_drops_only_the_missing_subtree() {
        let doc = Document::parse("<html/>");
        let t = tree(&["\t//html", "\t\t//body"]);
        let (cache, config) = check_setup();

        let report = t.check(&doc, &cache, &config);
        assert_eq!(report.failures().len(), 1);
        assert_eq!(report.failures()[0].kind, FailureKind::NoMatch);
        assert_eq!(report.failures()[0].expression, "//body");

        let surviving = t.check_and_remove_failures(&doc, &cache, &config);
        let lines: Vec<&String> = surviving.iter().collect();
        assert_eq!(lines, vec!["\t//html"]);
    }

    #[test]
    fn check_passes_on_unchanged_document() {
        let doc = Document::parse("<html><body><div id=\"a\"/><div id=\"b\"/></body></html>");
        let t = tree(&[
            "\t//html",
            "\t\t//body",
            "\t\t\t//div[@id=\"a\"]",
            "\t\t\t//div[@id=\"b\"]",
        ]);
        let (cache, config) = check_setup();
        assert!(t.check(&doc, &cache, &config).passed());
    }

    #[test]
    fn check_reports_missing_elements() {
        let doc = Document::parse("<html><body/></html>");
        let t = tree(&["\t//html", "\t\t//body", "\t\t\t//div[@id=\"gone-entirely\"]"]);
        let (cache, config) = check_setup();
        let report = t.check(&doc, &cache, &config);
        assert_eq!(report.failures().len(), 1);
        assert_eq!(report.failures()[0].kind, FailureKind::NoMatch);
    }

    #[test]
    fn check_reports_reordered_elements() {
        // Baseline records a before b; the document now has b's element
        // before a's
        let doc = Document::parse("<html><body><p id=\"b\"/><p id=\"a\"/></body></html>");
        let t = tree(&[
            "\t//html",
            "\t\t//body",
            "\t\t\t//p[@id=\"a\"]",
            "\t\t\t//p[@id=\"b\"]",
        ]);
        let (cache, config) = check_setup();
        let report = t.check(&doc, &cache, &config);

        let wrong: Vec<_> = report
            .failures()
            .iter()
            .filter(|f| f.kind == FailureKind::WrongLocation)
            .collect();
        assert_eq!(wrong.len(), 1);
        assert_eq!(wrong[0].expression, "//p[@id=\"b\"]");
    }

    #[test]
    fn containment_counts_as_wrong_location() {
        // The baseline's second element now wraps the first
        let doc = Document::parse("<html><body><div id=\"b\"><p id=\"a\"/></div></body></html>");
        let t = tree(&[
            "\t//html",
            "\t\t//body",
            "\t\t\t//p[@id=\"a\"]",
            "\t\t\t//div[@id=\"b\"]",
        ]);
        let (cache, config) = check_setup();
        let report = t.check(&doc, &cache, &config);
        assert!(report
            .failures()
            .iter()
            .any(|f| f.kind == FailureKind::WrongLocation));
    }

    #[test]
    fn prune_drops_missing_subtrees() {
        let doc = Document::parse("<html><body><div id=\"keep\"/></body></html>");
        let t = tree(&[
            "\t//html",
            "\t\t//body",
            "\t\t\t//div[@id=\"keep\"]",
            "\t\t\t//section[@id=\"dropped-wholesale\"]",
            "\t\t\t\t//span[@id=\"child-goes-too\"]",
        ]);
        let (cache, config) = check_setup();
        let surviving = t.check_and_remove_failures(&doc, &cache, &config);

        let lines: Vec<&String> = surviving.iter().collect();
        assert_eq!(
            lines,
            vec!["\t//html", "\t\t//body", "\t\t\t//div[@id=\"keep\"]"]
        );
    }

    #[test]
    fn prune_is_idempotent() {
        let doc = Document::parse("<html><body><div id=\"keep\"/></body></html>");
        let t = tree(&[
            "\t//html",
            "\t\t//body",
            "\t\t\t//div[@id=\"keep\"]",
            "\t\t\t//div[@id=\"utterly-different\"]",
        ]);
        let (cache, config) = check_setup();

        let first = t.check_and_remove_failures(&doc, &cache, &config);
        let lines: Vec<&str> = first.iter().map(|s| s.as_str()).collect();
        let t2 = tree(&lines);
        let second = t2.check_and_remove_failures(&doc, &cache, &config);
        assert_eq!(first, second);
    }

    #[test]
    fn fuzzy_matching_recovers_renamed_values() {
        let doc = Document::parse("<html><body><div id=\"content-container\"/></body></html>");
        let t = tree(&["\t//html", "\t\t//body", "\t\t\t//div[@id=\"contentcontainer\"]"]);
        let (cache, config) = check_setup();
        assert!(t.check(&doc, &cache, &config).passed());
    }

    #[test]
    fn fuzzy_never_accepts_on_empty_attribute_map() {
        // A positional-only expression has no attributes to compare;
        // the element count changed, so there is no 3rd div
        let doc = Document::parse("<html><body><div/><div/></body></html>");
        let t = tree(&["\t//html", "\t\t//body", "\t\t\t//div[3]"]);
        let (cache, config) = check_setup();
        let report = t.check(&doc, &cache, &config);
        assert_eq!(report.failures().len(), 1);
        assert_eq!(report.failures()[0].kind, FailureKind::NoMatch);
    }

    #[test]
    fn parent_promotion_locates_through_children() {
        // The div's attributes changed beyond fuzzy reach, but its
        // child is still there and points back at a div parent
        let doc = Document::parse(
            "<html><body><div data-v=\"9\"><span id=\"anchor\"/></div></body></html>",
        );
        let t = tree(&[
            "\t//html",
            "\t\t//body",
            "\t\t\t//div[@id=\"totally-unrecognizable\"]",
            "\t\t\t\t//span[@id=\"anchor\"]",
        ]);
        let (cache, config) = check_setup();
        assert!(t.check(&doc, &cache, &config).passed());
    }

    #[test]
    fn empty_document_fails_everything_in_strict_mode() {
        let doc = Document::parse("");
        let t = tree(&["\t//html", "\t\t//body"]);
        let (cache, config) = check_setup();
        let report = t.check(&doc, &cache, &config);
        assert_eq!(report.failures().len(), 2);
        assert!(report
            .failures()
            .iter()
            .all(|f| f.kind == FailureKind::NoMatch));

        let surviving = t.check_and_remove_failures(&doc, &cache, &config);
        assert!(surviving.is_empty());
    }
}
