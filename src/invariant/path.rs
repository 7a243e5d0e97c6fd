//! Path-expression derivation
//!
//! Turns document nodes into the expressions stored in baselines. Each
//! expression is a single `//tag` segment, optionally carrying the
//! node's 1-based position among same-tag siblings and its full
//! attribute map. Tree depth is encoded as one leading tab per ancestor
//! level, counting the document root.

use indexmap::IndexSet;

use crate::dom::{same_tag_index, DomAccess, NodeId, NodeKind};

/// Derive the expression for one element.
///
/// Attribute values are escaped so they survive the expression syntax:
/// `"` becomes `&quot;` and `/` becomes `&47;`.
pub fn derive_path<D: DomAccess + ?Sized>(
    doc: &D,
    node: NodeId,
    include_attributes: bool,
    include_sibling_index: bool,
) -> String {
    let mut expr = String::new();
    for _ in 0..depth_of(doc, node) {
        expr.push('\t');
    }
    expr.push_str("//");
    expr.push_str(doc.tag_name(node).unwrap_or(""));

    if include_sibling_index {
        expr.push('[');
        expr.push_str(&same_tag_index(doc, node).to_string());
        expr.push(']');
    }

    if include_attributes {
        let pairs = doc.attribute_pairs(node);
        if !pairs.is_empty() {
            expr.push('[');
            for (i, (name, value)) in pairs.iter().enumerate() {
                if i > 0 {
                    expr.push_str(" and ");
                }
                expr.push('@');
                expr.push_str(name);
                expr.push_str("=\"");
                expr.push_str(&escape_value(value));
                expr.push('"');
            }
            expr.push(']');
        }
    }

    expr
}

/// Derive expressions for every element of the document, in pre-order,
/// with attributes and without sibling indexes. Duplicate expressions
/// collapse to their first occurrence.
pub fn derive_all<D: DomAccess + ?Sized>(doc: &D) -> IndexSet<String> {
    let mut set = IndexSet::new();
    for id in doc.descendants_vec(doc.document_id()) {
        if doc.kind_of(id) == Some(NodeKind::Element) {
            set.insert(derive_path(doc, id, true, false));
        }
    }
    set
}

/// Number of ancestors of a node, counting the document root
fn depth_of<D: DomAccess + ?Sized>(doc: &D, node: NodeId) -> usize {
    let mut depth = 0;
    let mut current = doc.parent_of(node);
    while let Some(p) = current {
        depth += 1;
        current = doc.parent_of(p);
    }
    depth
}

/// Tag name of an expression: the text after the last `//`, with any
/// bracket clauses removed
pub fn tag_of(expr: &str) -> &str {
    let stripped = strip_predicates(expr);
    match stripped.rfind("//") {
        Some(pos) => &stripped[pos + 2..],
        None => stripped,
    }
}

/// Expression text before its first bracket clause
pub fn strip_predicates(expr: &str) -> &str {
    let trimmed = expr.trim();
    match trimmed.find('[') {
        Some(pos) => &trimmed[..pos],
        None => trimmed,
    }
}

fn escape_value(value: &str) -> String {
    value.replace('"', "&quot;").replace('/', "&47;")
}
