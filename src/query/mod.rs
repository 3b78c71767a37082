//! Path-query evaluation over a [`Document`] subtree.
//!
//! [`Document::query`] evaluates a path expression rooted at a context node
//! and returns a [`QueryResult`]: an ordered, index-addressed snapshot of
//! matched nodes. The snapshot stays valid under its own mutation
//! operations; the borrow on the document guarantees the document outlives
//! the result.

mod path;

use crate::dom::{Document, NodeId, NodeKind};
use crate::error::{Error, Result};

use path::{Axis, PathExpr, Step, StepTest};

impl Document {
    /// Evaluate a path-query expression against `context` and its subtree.
    ///
    /// Matches are returned in document order. No matches is an empty
    /// result, not an error; malformed syntax is [`Error::Query`].
    pub fn query<'d>(&'d mut self, expr: &str, context: NodeId) -> Result<QueryResult<'d>> {
        let parsed = path::parse(expr)?;
        let nodes = evaluate(self, &parsed, context);
        Ok(QueryResult { doc: self, nodes })
    }
}

fn evaluate(doc: &Document, expr: &PathExpr, context: NodeId) -> Vec<NodeId> {
    let mut out: Vec<NodeId> = Vec::new();
    for location in &expr.paths {
        let mut current = vec![context];
        for step in &location.steps {
            let mut next: Vec<NodeId> = Vec::new();
            for &node in &current {
                let mut matches = step_matches(doc, node, step);
                // Positional predicates apply per context node.
                if let Some(position) = step.position {
                    matches = match matches.get(position - 1) {
                        Some(&m) => vec![m],
                        None => Vec::new(),
                    };
                }
                for m in matches {
                    if !next.contains(&m) {
                        next.push(m);
                    }
                }
            }
            current = next;
        }
        for node in current {
            if !out.contains(&node) {
                out.push(node);
            }
        }
    }
    out
}

fn step_matches(doc: &Document, node: NodeId, step: &Step) -> Vec<NodeId> {
    let base: Vec<NodeId> = match step.axis {
        Axis::SelfAxis => vec![node],
        Axis::Child => doc.children(node).to_vec(),
        Axis::DescendantOrSelf => {
            let mut nodes = Vec::new();
            collect_subtree(doc, node, &mut nodes);
            nodes
        }
    };

    if step.attribute {
        base.iter()
            .flat_map(|&b| doc.attributes(b))
            .copied()
            .filter(|&a| attribute_test(doc, a, &step.test))
            .collect()
    } else {
        base.into_iter()
            .filter(|&b| node_test(doc, b, &step.test))
            .collect()
    }
}

/// Pre-order walk, which is document order.
fn collect_subtree(doc: &Document, node: NodeId, out: &mut Vec<NodeId>) {
    out.push(node);
    for &child in doc.children(node) {
        collect_subtree(doc, child, out);
    }
}

fn node_test(doc: &Document, node: NodeId, test: &StepTest) -> bool {
    match test {
        StepTest::Name(name) => doc.kind(node) == NodeKind::Element && doc.name(node) == name,
        StepTest::Wildcard => doc.kind(node) == NodeKind::Element,
        StepTest::Text => doc.kind(node) == NodeKind::Text,
        StepTest::AnyNode => true,
    }
}

fn attribute_test(doc: &Document, attr: NodeId, test: &StepTest) -> bool {
    match test {
        StepTest::Name(name) => doc.name(attr) == name,
        // `@*` surfaces namespace-declaration nodes too; callers filter them
        // with `is_namespace_at` before mutating.
        StepTest::Wildcard => true,
        StepTest::Text | StepTest::AnyNode => false,
    }
}

/// Ordered, index-addressed snapshot of nodes matched by one query.
///
/// Indices stay stable across this result's own mutation operations: a node
/// unlinked at one index is still addressable at that index afterwards.
pub struct QueryResult<'d> {
    doc: &'d mut Document,
    nodes: Vec<NodeId>,
}

impl QueryResult<'_> {
    /// Number of matched nodes.
    pub fn count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Matched node handles, in document order.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Handle of the match at `index`.
    pub fn node_at(&self, index: usize) -> Result<NodeId> {
        self.nodes.get(index).copied().ok_or(Error::Index {
            index,
            len: self.nodes.len(),
        })
    }

    /// Name of the match at `index`.
    pub fn name_at(&self, index: usize) -> Result<&str> {
        let node = self.node_at(index)?;
        Ok(self.doc.name(node))
    }

    /// Text content of the first child of the match at `index` (the value,
    /// for attribute matches). Empty string when there is none.
    pub fn child_content_at(&self, index: usize) -> Result<String> {
        let node = self.node_at(index)?;
        Ok(self.doc.child_content(node).unwrap_or("").to_string())
    }

    /// Replace the name of the match at `index`.
    pub fn set_name_at(&mut self, index: usize, name: &str) -> Result<()> {
        let node = self.node_at(index)?;
        self.doc.set_name(node, name)
    }

    /// Replace the child text content of the match at `index`.
    pub fn set_child_content_at(&mut self, index: usize, content: &str) -> Result<()> {
        let node = self.node_at(index)?;
        self.doc.set_content(node, content)
    }

    /// Detach the match at `index` from the tree. Always legal, including
    /// for namespace-declaration matches.
    pub fn unlink_at(&mut self, index: usize) -> Result<()> {
        let node = self.node_at(index)?;
        self.doc.unlink(node);
        Ok(())
    }

    /// True iff the match at `index` is a namespace-declaration node.
    pub fn is_namespace_at(&self, index: usize) -> Result<bool> {
        let node = self.node_at(index)?;
        Ok(self.doc.is_namespace_node(node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        Document::parse(
            b"<html><head><title>T</title></head>\
              <body><p>one</p><div><p>two</p><a href=\"x\">link</a></div>\
              <img src=\"i\"/></body></html>",
        )
        .unwrap()
    }

    #[test]
    fn test_query_descendants_in_document_order() {
        let mut doc = sample();
        let body = doc.body();
        let result = doc.query("//p", body).unwrap();
        assert_eq!(result.count(), 2);
        assert_eq!(result.child_content_at(0).unwrap(), "one");
        assert_eq!(result.child_content_at(1).unwrap(), "two");
    }

    #[test]
    fn test_query_restricted_to_context_subtree() {
        let mut doc = sample();
        let body = doc.body();
        // title lives in head, not under body
        let result = doc.query("//title", body).unwrap();
        assert_eq!(result.count(), 0);
    }

    #[test]
    fn test_query_attributes() {
        let mut doc = sample();
        let body = doc.body();
        let result = doc.query("//@href | //@src", body).unwrap();
        assert_eq!(result.count(), 2);
        assert_eq!(result.name_at(0).unwrap(), "href");
        assert_eq!(result.child_content_at(0).unwrap(), "x");
        assert_eq!(result.name_at(1).unwrap(), "src");
    }

    #[test]
    fn test_query_child_axis() {
        let mut doc = sample();
        let body = doc.body();
        let result = doc.query("/p", body).unwrap();
        assert_eq!(result.count(), 1);
        let result = doc.query("/div/p", body).unwrap();
        assert_eq!(result.count(), 1);
        assert_eq!(result.child_content_at(0).unwrap(), "two");
    }

    #[test]
    fn test_query_self_step() {
        let mut doc = Document::parse(b"<body><p>x</p></body>").unwrap();
        let body = doc.body();

        let result = doc.query(".", body).unwrap();
        assert_eq!(result.count(), 1);
        assert_eq!(result.name_at(0).unwrap(), "body");

        // descendant axis selects the whole subtree: body, p, text
        let result = doc.query("//.", body).unwrap();
        assert_eq!(result.count(), 3);
        assert_eq!(result.name_at(0).unwrap(), "body");
    }

    #[test]
    fn test_query_positional_predicate() {
        let mut doc = sample();
        let body = doc.body();
        let result = doc.query("//p[1]", body).unwrap();
        assert_eq!(result.count(), 1);
        assert_eq!(result.child_content_at(0).unwrap(), "one");
        let result = doc.query("/div/p[1]", body).unwrap();
        assert_eq!(result.count(), 1);
        assert_eq!(result.child_content_at(0).unwrap(), "two");
    }

    #[test]
    fn test_empty_result_indexing_fails() {
        let mut doc = sample();
        let body = doc.body();
        let result = doc.query("//nothing", body).unwrap();
        assert_eq!(result.count(), 0);
        assert!(matches!(result.name_at(0), Err(Error::Index { .. })));
        assert!(matches!(
            result.child_content_at(5),
            Err(Error::Index { .. })
        ));
    }

    #[test]
    fn test_invalid_query_syntax() {
        let mut doc = sample();
        let body = doc.body();
        assert!(matches!(doc.query("//p[", body), Err(Error::Query(_))));
    }

    #[test]
    fn test_mutation_by_index_survives_unlink() {
        let mut doc = sample();
        let body = doc.body();
        let mut result = doc.query("//p", body).unwrap();
        result.unlink_at(0).unwrap();
        // indices remain stable after mutation
        assert_eq!(result.child_content_at(1).unwrap(), "two");
        result.set_child_content_at(1, "TWO").unwrap();
        assert_eq!(result.child_content_at(1).unwrap(), "TWO");
    }

    #[test]
    fn test_set_name_at() {
        let mut doc = sample();
        let body = doc.body();
        let mut result = doc.query("//a", body).unwrap();
        result.set_name_at(0, "span").unwrap();
        drop(result);
        let out = String::from_utf8(doc.serialize().unwrap()).unwrap();
        assert!(out.contains("<span href=\"x\">link</span>"));
    }

    #[test]
    fn test_namespace_entries_reject_mutation_but_unlink() {
        let mut doc =
            Document::parse(b"<body xmlns=\"urn:x\"><a href=\"y\">z</a></body>").unwrap();
        let body = doc.body();
        let mut result = doc.query("//@* | /@*", body).unwrap();

        let ns_index = (0..result.count())
            .find(|&i| result.is_namespace_at(i).unwrap())
            .expect("xmlns should be matched by @*");
        assert!(matches!(
            result.set_name_at(ns_index, "q"),
            Err(Error::InvalidNode)
        ));
        assert!(matches!(
            result.set_child_content_at(ns_index, "q"),
            Err(Error::InvalidNode)
        ));
        result.unlink_at(ns_index).unwrap();
    }
}
