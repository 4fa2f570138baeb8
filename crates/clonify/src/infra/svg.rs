//! Owned SVG document tree.
//!
//! `roxmltree` gives us a fast read-only view of the source; we copy it into a small arena so
//! nodes can be added, moved and removed, then serialize it back out.

use std::borrow::Cow;
use std::collections::HashSet;

use anyhow::{Context, Result};

pub const SVG_NS: &str = "http://www.w3.org/2000/svg";
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
pub const SODIPODI_NS: &str = "http://sodipodi.sourceforge.net/DTD/sodipodi-0.dtd";
const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

const ROOT: NodeId = NodeId(0);

/// Handle to a node stored in a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Namespace-aware element or attribute name, remembering the prefix used on output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QName {
    pub prefix: Option<String>,
    pub local: String,
    pub namespace: Option<String>,
}

impl QName {
    pub fn local(local: impl Into<String>) -> Self {
        Self {
            prefix: None,
            local: local.into(),
            namespace: None,
        }
    }

    pub fn namespaced(
        prefix: Option<String>,
        local: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            prefix,
            local: local.into(),
            namespace: Some(namespace.into()),
        }
    }

    fn matches(&self, namespace: Option<&str>, local: &str) -> bool {
        self.local == local && self.namespace.as_deref() == namespace
    }

    fn qualified(&self) -> Cow<'_, str> {
        match &self.prefix {
            Some(prefix) => Cow::Owned(format!("{prefix}:{}", self.local)),
            None => Cow::Borrowed(&self.local),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: QName,
    pub value: String,
}

/// `xmlns` declaration introduced by an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceDecl {
    pub prefix: Option<String>,
    pub uri: String,
}

#[derive(Debug, Clone)]
pub struct Element {
    pub name: QName,
    pub attributes: Vec<Attribute>,
    pub namespaces: Vec<NamespaceDecl>,
}

impl Element {
    pub fn new(name: QName) -> Self {
        Self {
            name,
            attributes: Vec::new(),
            namespaces: Vec::new(),
        }
    }

    fn attribute(&self, namespace: Option<&str>, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.name.matches(namespace, local))
            .map(|attr| attr.value.as_str())
    }

    fn set_attribute(&mut self, name: QName, value: String) {
        if let Some(existing) = self
            .attributes
            .iter_mut()
            .find(|attr| attr.name.matches(name.namespace.as_deref(), &name.local))
        {
            existing.value = value;
            return;
        }
        self.attributes.push(Attribute { name, value });
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Root,
    Element(Element),
    Text(String),
    Comment(String),
    ProcessingInstruction {
        target: String,
        value: Option<String>,
    },
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Mutable SVG document.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
    declaration: Option<String>,
}

impl Document {
    /// Parse SVG source into an owned tree. DTDs are accepted but not preserved.
    pub fn parse(source: &str) -> Result<Self> {
        let options = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..roxmltree::ParsingOptions::default()
        };
        let parsed = roxmltree::Document::parse_with_options(source, options)
            .context("failed to parse SVG document")?;

        let mut document = Self {
            nodes: vec![NodeData {
                kind: NodeKind::Root,
                parent: None,
                children: Vec::new(),
            }],
            declaration: xml_declaration(source),
        };
        for child in parsed.root().children() {
            document.import(child, ROOT);
        }
        Ok(document)
    }

    fn import(&mut self, node: roxmltree::Node<'_, '_>, parent: NodeId) {
        let kind = match node.node_type() {
            roxmltree::NodeType::Root => return,
            roxmltree::NodeType::Element => NodeKind::Element(import_element(node)),
            roxmltree::NodeType::Text => NodeKind::Text(node.text().unwrap_or_default().to_owned()),
            roxmltree::NodeType::Comment => {
                NodeKind::Comment(node.text().unwrap_or_default().to_owned())
            }
            roxmltree::NodeType::PI => {
                let Some(pi) = node.pi() else {
                    return;
                };
                NodeKind::ProcessingInstruction {
                    target: pi.target.to_owned(),
                    value: pi.value.map(str::to_owned),
                }
            }
        };

        let id = self.push(kind);
        self.attach(parent, id, None);
        for child in node.children() {
            self.import(child, id);
        }
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// The outermost element (normally `<svg>`).
    pub fn root_element(&self) -> Option<NodeId> {
        self.nodes[ROOT.0]
            .children
            .iter()
            .copied()
            .find(|&id| self.element(id).is_some())
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent.filter(|&parent| parent != ROOT)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Whether the node is still reachable from the document root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == ROOT {
                return true;
            }
            match self.nodes[current.0].parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Attached elements in document order.
    pub fn elements(&self) -> impl Iterator<Item = NodeId> + '_ {
        let mut stack = vec![ROOT];
        std::iter::from_fn(move || {
            while let Some(id) = stack.pop() {
                stack.extend(self.nodes[id.0].children.iter().rev().copied());
                if self.element(id).is_some() {
                    return Some(id);
                }
            }
            None
        })
    }

    pub fn is_element(&self, id: NodeId, namespace: Option<&str>, local: &str) -> bool {
        self.element(id)
            .is_some_and(|element| element.name.matches(namespace, local))
    }

    /// Attribute without a namespace, e.g. `x` or `id`.
    pub fn attribute(&self, id: NodeId, local: &str) -> Option<&str> {
        self.element(id)?.attribute(None, local)
    }

    pub fn attribute_ns(&self, id: NodeId, namespace: &str, local: &str) -> Option<&str> {
        self.element(id)?.attribute(Some(namespace), local)
    }

    /// Set or replace an attribute. Non-elements are ignored.
    pub fn set_attribute(&mut self, id: NodeId, name: QName, value: impl Into<String>) {
        if let Some(element) = self.element_mut(id) {
            element.set_attribute(name, value.into());
        }
    }

    pub fn element_by_id(&self, value: &str) -> Option<NodeId> {
        self.elements()
            .find(|&id| self.attribute(id, "id") == Some(value))
    }

    /// Smallest `{stem}{n}` id (n >= 1) not used by any attached element.
    pub fn unique_id(&self, stem: &str) -> String {
        let taken: HashSet<&str> = self
            .elements()
            .filter_map(|id| self.attribute(id, "id"))
            .collect();
        (1..)
            .map(|n| format!("{stem}{n}"))
            .find(|candidate| !taken.contains(candidate.as_str()))
            .unwrap_or_else(|| stem.to_owned())
    }

    /// Create a detached element.
    pub fn create_element(&mut self, name: QName) -> NodeId {
        self.push(NodeKind::Element(Element::new(name)))
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.attach(parent, child, None);
    }

    /// Insert `child` right before `sibling` under the same parent.
    pub fn insert_before(&mut self, sibling: NodeId, child: NodeId) {
        let Some(parent) = self.nodes[sibling.0].parent else {
            return;
        };
        self.detach(child);
        let position = self.nodes[parent.0]
            .children
            .iter()
            .position(|&id| id == sibling);
        self.attach(parent, child, position);
    }

    /// Detach a node (and its subtree) from the tree.
    pub fn remove(&mut self, id: NodeId) {
        self.detach(id);
    }

    fn attach(&mut self, parent: NodeId, child: NodeId, position: Option<usize>) {
        let children = &mut self.nodes[parent.0].children;
        match position {
            Some(index) => children.insert(index, child),
            None => children.push(child),
        }
        self.nodes[child.0].parent = Some(parent);
    }

    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|&child| child != id);
        }
    }

    /// Prefix bound to `uri` on the root element, declaring `preferred` there if missing.
    pub fn ensure_namespace(&mut self, uri: &str, preferred: &str) -> Option<String> {
        let root = self.root_element()?;
        let declared: Vec<NamespaceDecl> = self.element(root)?.namespaces.clone();
        if let Some(existing) = declared
            .iter()
            .find(|decl| decl.uri == uri && decl.prefix.is_some())
        {
            return existing.prefix.clone();
        }

        let taken = |prefix: &str| {
            declared
                .iter()
                .any(|decl| decl.prefix.as_deref() == Some(prefix))
        };
        let prefix = std::iter::once(preferred.to_owned())
            .chain((1..).map(|n| format!("{preferred}{n}")))
            .find(|candidate| !taken(candidate.as_str()))?;

        self.element_mut(root)?.namespaces.push(NamespaceDecl {
            prefix: Some(prefix.clone()),
            uri: uri.to_owned(),
        });
        Some(prefix)
    }

    /// Serialize the tree back to SVG source.
    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        if let Some(declaration) = &self.declaration {
            out.push_str(declaration);
            out.push('\n');
        }
        for &child in &self.nodes[ROOT.0].children {
            self.write_node(child, &mut out);
            out.push('\n');
        }
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        match &self.nodes[id.0].kind {
            NodeKind::Root => {}
            NodeKind::Text(text) => out.push_str(&htmlize::escape_text(text.as_str())),
            NodeKind::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeKind::ProcessingInstruction { target, value } => {
                out.push_str("<?");
                out.push_str(target);
                if let Some(value) = value {
                    out.push(' ');
                    out.push_str(value);
                }
                out.push_str("?>");
            }
            NodeKind::Element(element) => {
                let name = element.name.qualified();
                out.push('<');
                out.push_str(&name);
                for decl in &element.namespaces {
                    match &decl.prefix {
                        Some(prefix) => out.push_str(&format!(" xmlns:{prefix}=\"")),
                        None => out.push_str(" xmlns=\""),
                    }
                    out.push_str(&htmlize::escape_attribute(decl.uri.as_str()));
                    out.push('"');
                }
                for attr in &element.attributes {
                    out.push(' ');
                    out.push_str(&attr.name.qualified());
                    out.push_str("=\"");
                    out.push_str(&htmlize::escape_attribute(attr.value.as_str()));
                    out.push('"');
                }

                let children = &self.nodes[id.0].children;
                if children.is_empty() {
                    out.push_str(" />");
                    return;
                }
                out.push('>');
                for &child in children {
                    self.write_node(child, out);
                }
                out.push_str("</");
                out.push_str(&name);
                out.push('>');
            }
        }
    }
}

fn import_element(node: roxmltree::Node<'_, '_>) -> Element {
    let tag = node.tag_name();
    let name = QName {
        prefix: tag
            .namespace()
            .and_then(|uri| element_prefix(node, uri)),
        local: tag.name().to_owned(),
        namespace: tag.namespace().map(str::to_owned),
    };

    let attributes = node
        .attributes()
        .map(|attr| Attribute {
            name: QName {
                prefix: attr
                    .namespace()
                    .and_then(|uri| attribute_prefix(node, uri)),
                local: attr.name().to_owned(),
                namespace: attr.namespace().map(str::to_owned),
            },
            value: attr.value().to_owned(),
        })
        .collect();

    let inherited: Vec<(Option<&str>, &str)> = node
        .parent_element()
        .map(|parent| {
            parent
                .namespaces()
                .map(|ns| (ns.name(), ns.uri()))
                .collect()
        })
        .unwrap_or_default();
    let namespaces = node
        .namespaces()
        .filter(|ns| ns.name() != Some("xml"))
        .filter(|ns| !inherited.contains(&(ns.name(), ns.uri())))
        .map(|ns| NamespaceDecl {
            prefix: ns.name().map(str::to_owned),
            uri: ns.uri().to_owned(),
        })
        .collect();

    Element {
        name,
        attributes,
        namespaces,
    }
}

fn element_prefix(node: roxmltree::Node<'_, '_>, uri: &str) -> Option<String> {
    let is_default = node
        .namespaces()
        .any(|ns| ns.name().is_none() && ns.uri() == uri);
    if is_default {
        return None;
    }
    node.lookup_prefix(uri).map(str::to_owned)
}

fn attribute_prefix(node: roxmltree::Node<'_, '_>, uri: &str) -> Option<String> {
    if uri == XML_NS {
        return Some("xml".to_owned());
    }
    node.lookup_prefix(uri)
        .filter(|prefix| !prefix.is_empty())
        .map(str::to_owned)
}

fn xml_declaration(source: &str) -> Option<String> {
    let trimmed = source.trim_start_matches('\u{feff}').trim_start();
    if !trimmed.starts_with("<?xml ") {
        return None;
    }
    let end = trimmed.find("?>")?;
    Some(trimmed[..end + 2].to_owned())
}
