//! Mutable HTML document tree.
//!
//! A [`Document`] owns an arena of nodes addressed by [`NodeId`] handles.
//! Handles are meaningful only within the document that produced them;
//! copying content between documents always clones by value into the
//! destination arena ([`Document::append_body_copy`]).
//!
//! Every non-empty document has a `head` and a `body` subtree, either built
//! by the [`Document::new`] skeleton or discovered (and synthesized where
//! missing) during [`Document::parse`].

mod parser;
mod serializer;

use crate::error::{Error, Result};

/// Unique identifier for a node within one [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

/// Kind of a tree node.
///
/// Namespace declarations (`xmlns`, `xmlns:prefix`) get their own variant so
/// mutation entry points can reject them in one place instead of duck-typed
/// checks at every call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    Text,
    Comment,
    Attribute,
    Namespace,
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) kind: NodeKind,
    /// Tag name for elements, attribute name for attributes/namespaces.
    pub(crate) name: String,
    /// Text for text/comment nodes, value for attributes/namespaces.
    pub(crate) value: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    /// Attribute and namespace-declaration nodes (elements only).
    pub(crate) attrs: Vec<NodeId>,
}

impl Node {
    pub(crate) fn element(name: &str) -> Self {
        Node {
            kind: NodeKind::Element,
            name: name.to_string(),
            value: String::new(),
            parent: None,
            children: Vec::new(),
            attrs: Vec::new(),
        }
    }

    pub(crate) fn text(value: &str) -> Self {
        Node {
            kind: NodeKind::Text,
            name: String::new(),
            value: value.to_string(),
            parent: None,
            children: Vec::new(),
            attrs: Vec::new(),
        }
    }

    pub(crate) fn comment(value: &str) -> Self {
        Node {
            kind: NodeKind::Comment,
            name: String::new(),
            value: value.to_string(),
            parent: None,
            children: Vec::new(),
            attrs: Vec::new(),
        }
    }
}

/// Generic container tag used when inlining foreign markup that must not
/// keep semantic meaning from its original tag (e.g. a second `<body>`).
pub const CONTAINER_TAG: &str = "div";

/// A mutable HTML document tree.
pub struct Document {
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: NodeId,
    pub(crate) head: NodeId,
    pub(crate) body: NodeId,
}

impl Document {
    /// Create a document with the minimal valid skeleton: an `html` root
    /// holding an empty `head` and an empty `body`. Never fails.
    pub fn new() -> Document {
        let mut nodes = Vec::with_capacity(3);
        nodes.push(Node::element("html"));
        nodes.push(Node::element("head"));
        nodes.push(Node::element("body"));

        let root = NodeId(0);
        let head = NodeId(1);
        let body = NodeId(2);
        nodes[1].parent = Some(root);
        nodes[2].parent = Some(root);
        nodes[0].children = vec![head, body];

        Document {
            nodes,
            root,
            head,
            body,
        }
    }

    /// Parse a byte buffer into a document, best-effort.
    ///
    /// Recovery is the default: mismatched end tags, unknown entities, and
    /// missing `html`/`head`/`body` wrappers are repaired rather than
    /// rejected. Only input from which no content at all can be read fails,
    /// with [`Error::Parse`].
    pub fn parse(bytes: &[u8]) -> Result<Document> {
        parser::parse(bytes)
    }

    /// Serialize the current tree state, fully re-encoded.
    ///
    /// Output is not a byte range of the original input; the only guarantee
    /// is structural equivalence under a re-parse.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        serializer::serialize(self)
    }

    /// Root `html` element.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The `head` metadata container.
    pub fn head(&self) -> NodeId {
        self.head
    }

    /// The `body` content container.
    pub fn body(&self) -> NodeId {
        self.body
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0 as usize]
    }

    pub(crate) fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub(crate) fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.push(child);
    }

    /// Attach an attribute to an element. `xmlns` and `xmlns:prefix` become
    /// namespace-declaration nodes.
    pub(crate) fn set_attribute(&mut self, element: NodeId, name: &str, value: &str) -> NodeId {
        let kind = if name == "xmlns" || name.starts_with("xmlns:") {
            NodeKind::Namespace
        } else {
            NodeKind::Attribute
        };
        let attr = self.alloc(Node {
            kind,
            name: name.to_string(),
            value: value.to_string(),
            parent: Some(element),
            children: Vec::new(),
            attrs: Vec::new(),
        });
        self.node_mut(element).attrs.push(attr);
        attr
    }

    /// Kind of the node behind `id`.
    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.node(id).kind
    }

    /// Tag name for elements, attribute name for attribute and
    /// namespace-declaration nodes. Empty for text and comments.
    pub fn name(&self, id: NodeId) -> &str {
        &self.node(id).name
    }

    /// Ordered child nodes (attributes are not children).
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Attribute and namespace-declaration nodes of an element.
    pub fn attributes(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).attrs
    }

    /// Value of the named attribute on an element, if present.
    pub fn attribute(&self, element: NodeId, name: &str) -> Option<&str> {
        self.node(element)
            .attrs
            .iter()
            .find(|&&a| self.node(a).name == name)
            .map(|&a| self.node(a).value.as_str())
    }

    /// Text content of a node's first text-bearing child.
    ///
    /// For attribute and namespace nodes this is the attribute value; for
    /// text and comment nodes, the node's own text.
    pub fn child_content(&self, id: NodeId) -> Option<&str> {
        let node = self.node(id);
        match node.kind {
            NodeKind::Attribute | NodeKind::Namespace | NodeKind::Text | NodeKind::Comment => {
                Some(node.value.as_str())
            }
            NodeKind::Element => node
                .children
                .iter()
                .find(|&&c| self.node(c).kind == NodeKind::Text)
                .map(|&c| self.node(c).value.as_str()),
        }
    }

    /// True iff `id` is a namespace-declaration node. Such nodes must never
    /// be targets of [`set_name`](Self::set_name),
    /// [`set_content`](Self::set_content), or
    /// [`append_body_copy`](Self::append_body_copy).
    pub fn is_namespace_node(&self, id: NodeId) -> bool {
        self.node(id).kind == NodeKind::Namespace
    }

    /// Append a new element with a single text child to `head`, after any
    /// existing head children.
    pub fn append_head_element(&mut self, name: &str, value: &str) {
        let element = self.alloc(Node::element(name));
        let text = self.alloc(Node::text(value));
        self.append_child(element, text);
        let head = self.head;
        self.append_child(head, element);
    }

    /// Deep-clone `node` (with attributes and descendants) from `src` into
    /// this document's `body`, appended as the last child.
    ///
    /// With `force_container_tag` the cloned root is renamed to
    /// [`CONTAINER_TAG`], its attributes and descendants untouched. Fails
    /// with [`Error::InvalidNode`] unless `node` is an element.
    pub fn append_body_copy(
        &mut self,
        src: &Document,
        node: NodeId,
        force_container_tag: bool,
    ) -> Result<NodeId> {
        if src.kind(node) != NodeKind::Element {
            return Err(Error::InvalidNode);
        }
        let cloned = self.clone_from(src, node);
        if force_container_tag {
            self.node_mut(cloned).name = CONTAINER_TAG.to_string();
        }
        let body = self.body;
        self.append_child(body, cloned);
        Ok(cloned)
    }

    /// Recursively clone a subtree from another document into this arena.
    fn clone_from(&mut self, src: &Document, node: NodeId) -> NodeId {
        let source = src.node(node);
        let cloned = self.alloc(Node {
            kind: source.kind,
            name: source.name.clone(),
            value: source.value.clone(),
            parent: None,
            children: Vec::new(),
            attrs: Vec::new(),
        });
        for &attr in &source.attrs {
            let a = src.node(attr);
            let copy = self.alloc(Node {
                kind: a.kind,
                name: a.name.clone(),
                value: a.value.clone(),
                parent: Some(cloned),
                children: Vec::new(),
                attrs: Vec::new(),
            });
            self.node_mut(cloned).attrs.push(copy);
        }
        for &child in &source.children {
            let copy = self.clone_from(src, child);
            self.append_child(cloned, copy);
        }
        cloned
    }

    /// Replace a node's name. Valid for element and attribute nodes.
    pub fn set_name(&mut self, id: NodeId, name: &str) -> Result<()> {
        match self.node(id).kind {
            NodeKind::Element | NodeKind::Attribute => {
                self.node_mut(id).name = name.to_string();
                Ok(())
            }
            _ => Err(Error::InvalidNode),
        }
    }

    /// Replace a node's text content.
    ///
    /// On an element this replaces the value of its first text child,
    /// creating one if none exists. Namespace-declaration nodes are
    /// rejected with [`Error::InvalidNode`].
    pub fn set_content(&mut self, id: NodeId, content: &str) -> Result<()> {
        match self.node(id).kind {
            NodeKind::Namespace => Err(Error::InvalidNode),
            NodeKind::Text | NodeKind::Comment | NodeKind::Attribute => {
                self.node_mut(id).value = content.to_string();
                Ok(())
            }
            NodeKind::Element => {
                let existing = self
                    .node(id)
                    .children
                    .iter()
                    .copied()
                    .find(|&c| self.node(c).kind == NodeKind::Text);
                match existing {
                    Some(text) => self.node_mut(text).value = content.to_string(),
                    None => {
                        let text = self.alloc(Node::text(content));
                        self.append_child(id, text);
                    }
                }
                Ok(())
            }
        }
    }

    /// Detach `id` (and its subtree) from its parent. Sibling order among
    /// remaining children is preserved. Legal for every node kind,
    /// including namespace declarations.
    pub fn unlink(&mut self, id: NodeId) {
        let Some(parent) = self.node(id).parent else {
            return;
        };
        let p = self.node_mut(parent);
        p.children.retain(|&c| c != id);
        p.attrs.retain(|&a| a != id);
        self.node_mut(id).parent = None;
    }
}

impl Default for Document {
    fn default() -> Self {
        Document::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skeleton_has_empty_head_and_body() {
        let doc = Document::new();
        assert_eq!(doc.name(doc.root()), "html");
        assert_eq!(doc.name(doc.head()), "head");
        assert_eq!(doc.name(doc.body()), "body");
        assert!(doc.children(doc.head()).is_empty());
        assert!(doc.children(doc.body()).is_empty());
    }

    #[test]
    fn test_append_head_element_preserves_order() {
        let mut doc = Document::new();
        doc.append_head_element("title", "First");
        doc.append_head_element("meta", "Second");

        let head = doc.children(doc.head()).to_vec();
        assert_eq!(head.len(), 2);
        assert_eq!(doc.name(head[0]), "title");
        assert_eq!(doc.child_content(head[0]), Some("First"));
        assert_eq!(doc.name(head[1]), "meta");
        // head mutation never touches body
        assert!(doc.children(doc.body()).is_empty());
    }

    #[test]
    fn test_append_body_copy_clones_subtree() {
        let src = Document::parse(b"<body><p class=\"x\">Hi <b>there</b></p></body>").unwrap();
        let p = src.children(src.body())[0];

        let mut dst = Document::new();
        let cloned = dst.append_body_copy(&src, p, false).unwrap();

        assert_eq!(dst.name(cloned), "p");
        assert_eq!(dst.attribute(cloned, "class"), Some("x"));
        assert_eq!(dst.children(cloned).len(), src.children(p).len());
        // clone belongs to the destination; source unchanged
        assert_eq!(src.children(src.body()).len(), 1);
    }

    #[test]
    fn test_append_body_copy_force_container_tag() {
        let src = Document::parse(b"<body><section id=\"s\"><p>x</p></section></body>").unwrap();
        let section = src.children(src.body())[0];

        let mut dst = Document::new();
        let cloned = dst.append_body_copy(&src, section, true).unwrap();

        assert_eq!(dst.name(cloned), CONTAINER_TAG);
        assert_eq!(dst.attribute(cloned, "id"), Some("s"));
        assert_eq!(dst.children(cloned).len(), 1);
    }

    #[test]
    fn test_append_body_copy_rejects_non_elements() {
        let src = Document::parse(b"<body xmlns=\"urn:x\"><p>t</p></body>").unwrap();
        let ns = src.attributes(src.body())[0];
        assert!(src.is_namespace_node(ns));

        let mut dst = Document::new();
        assert!(matches!(
            dst.append_body_copy(&src, ns, false),
            Err(Error::InvalidNode)
        ));
    }

    #[test]
    fn test_set_content_replaces_first_text_child() {
        let mut doc = Document::parse(b"<body><p>old</p></body>").unwrap();
        let p = doc.children(doc.body())[0];
        doc.set_content(p, "new").unwrap();
        assert_eq!(doc.child_content(p), Some("new"));
        assert_eq!(doc.children(p).len(), 1);
    }

    #[test]
    fn test_set_content_creates_text_child() {
        let mut doc = Document::new();
        let body = doc.body();
        doc.set_content(body, "hello").unwrap();
        assert_eq!(doc.child_content(body), Some("hello"));
    }

    #[test]
    fn test_namespace_nodes_reject_mutation() {
        let mut doc = Document::parse(b"<body xmlns=\"urn:x\"><p>t</p></body>").unwrap();
        let ns = doc.attributes(doc.body())[0];
        assert!(matches!(doc.set_name(ns, "z"), Err(Error::InvalidNode)));
        assert!(matches!(doc.set_content(ns, "z"), Err(Error::InvalidNode)));
        // unlink is always legal
        doc.unlink(ns);
        assert!(doc.attributes(doc.body()).is_empty());
    }

    #[test]
    fn test_unlink_preserves_sibling_order() {
        let mut doc = Document::parse(b"<body><a>1</a><b>2</b><c>3</c></body>").unwrap();
        let middle = doc.children(doc.body())[1];
        doc.unlink(middle);

        let rest: Vec<&str> = doc
            .children(doc.body())
            .iter()
            .map(|&c| doc.name(c))
            .collect();
        assert_eq!(rest, vec!["a", "c"]);
    }
}
