//! Path-query evaluation
//!
//! Evaluates a parsed query step by step against a `DomAccess` document.
//! Each step maps the current node set through its axis, filters by the
//! name test, then applies predicates in order. Descendant steps can
//! reach the same node through multiple context nodes, so node sets are
//! deduplicated and re-sorted into document order after each axis pass.

use std::collections::HashSet;

use crate::dom::{same_tag_index, DomAccess, NodeId};

use super::parser::{Axis, PathQuery, Predicate, Step};

/// Evaluate a query against a document, returning matching element ids
/// in document order
pub fn evaluate_query<D: DomAccess + ?Sized>(doc: &D, query: &PathQuery) -> Vec<NodeId> {
    let mut current = vec![doc.document_id()];

    for step in &query.steps {
        current = apply_step(doc, &current, step);
        if current.is_empty() {
            break;
        }
    }

    current
}

fn apply_step<D: DomAccess + ?Sized>(doc: &D, context: &[NodeId], step: &Step) -> Vec<NodeId> {
    let mut seen = HashSet::new();
    let mut result = Vec::new();

    for &node in context {
        let candidates = match step.axis {
            Axis::Descendant => doc.descendants_vec(node),
            Axis::Child => doc.children_vec(node),
        };
        for candidate in candidates {
            let matches = doc
                .tag_name(candidate)
                .map(|tag| step.test.matches(tag))
                .unwrap_or(false);
            if matches && seen.insert(candidate) {
                result.push(candidate);
            }
        }
    }

    result.sort_unstable();

    for predicate in &step.predicates {
        result = apply_predicate(doc, result, predicate);
        if result.is_empty() {
            break;
        }
    }

    result
}

fn apply_predicate<D: DomAccess + ?Sized>(
    doc: &D,
    nodes: Vec<NodeId>,
    predicate: &Predicate,
) -> Vec<NodeId> {
    match predicate {
        Predicate::Position(n) => nodes
            .into_iter()
            .filter(|&node| same_tag_index(doc, node) == *n)
            .collect(),
        Predicate::Attributes(pairs) => nodes
            .into_iter()
            .filter(|&node| {
                pairs
                    .iter()
                    .all(|(name, value)| doc.attribute(node, name) == Some(value.as_str()))
            })
            .collect(),
    }
}
