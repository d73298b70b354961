// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! An owned, mutable XML tree.
//!
//! All nodes live in one arena owned by the [`Document`]; everything else
//! refers to them with [`NodeId`]s. Unbinding a node detaches it from its
//! parent and marks it (and everything under it) as dead. Dead nodes are never
//! reused, so a stale [`NodeId`] can't silently point at some other node; any
//! access through it returns [`DocumentError::Unbound`].

use std::fmt::{self, Display, Write};

use log::trace;

use super::DocumentError;

/// A handle to a node of a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node #{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeKind {
    Element {
        /// The local name; lookups never involve namespaces.
        name: String,
        prefix: Option<String>,
        /// Namespaces declared on this element, as (prefix, URI). `None` is
        /// the default namespace.
        namespaces: Vec<(Option<String>, String)>,
        /// Names keep their prefixes.
        attributes: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    live: bool,
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Document {
    /// Parse XML text. Comments, processing instructions and whitespace-only
    /// text are not kept.
    pub fn parse(xml: &str) -> Result<Document, DocumentError> {
        let parsed =
            roxmltree::Document::parse(xml).map_err(|e| DocumentError::Xml(e.to_string()))?;

        let mut doc = Document {
            nodes: vec![],
            root: NodeId(0),
        };
        doc.root = doc.copy_element(parsed.root_element(), None);
        trace!("Parsed a document with {} nodes", doc.nodes.len());
        Ok(doc)
    }

    fn copy_element(&mut self, element: roxmltree::Node, parent: Option<NodeId>) -> NodeId {
        let attributes = element
            .attributes()
            .map(|a| {
                let name = match a.namespace().and_then(|uri| prefix_for(element, uri)) {
                    Some(prefix) => format!("{prefix}:{}", a.name()),
                    None => a.name().to_string(),
                };
                (name, a.value().to_string())
            })
            .collect();
        let id = self.push(
            NodeKind::Element {
                name: element.tag_name().name().to_string(),
                prefix: element
                    .tag_name()
                    .namespace()
                    .and_then(|uri| prefix_for(element, uri)),
                namespaces: declared_namespaces(element),
                attributes,
            },
            parent,
        );

        for child in element.children() {
            if child.is_element() {
                let child_id = self.copy_element(child, Some(id));
                self.nodes[id.0].children.push(child_id);
            } else if child.is_text() {
                let text = child.text().unwrap_or_default();
                if !text.trim().is_empty() {
                    let child_id = self.push(NodeKind::Text(text.to_string()), Some(id));
                    self.nodes[id.0].children.push(child_id);
                }
            }
        }
        id
    }

    fn push(&mut self, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        self.nodes.push(Node {
            kind,
            parent,
            children: vec![],
            live: true,
        });
        NodeId(self.nodes.len() - 1)
    }

    fn node(&self, id: NodeId) -> Result<&Node, DocumentError> {
        match self.nodes.get(id.0) {
            Some(node) if node.live => Ok(node),
            Some(_) => Err(DocumentError::Unbound(id)),
            None => Err(DocumentError::NoSuchNode(id)),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Is this node still part of the document?
    pub fn is_live(&self, id: NodeId) -> bool {
        self.node(id).is_ok()
    }

    /// The element name; `None` for text nodes.
    pub fn name(&self, id: NodeId) -> Result<Option<&str>, DocumentError> {
        Ok(match &self.node(id)?.kind {
            NodeKind::Element { name, .. } => Some(name.as_str()),
            NodeKind::Text(_) => None,
        })
    }

    /// Is this node an element with the given name?
    pub fn is_element_named(&self, id: NodeId, name: &str) -> Result<bool, DocumentError> {
        Ok(self.name(id)? == Some(name))
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Result<Option<&str>, DocumentError> {
        Ok(self
            .attributes(id)?
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str()))
    }

    /// All attributes of an element, in document order. Text nodes have none.
    pub fn attributes(&self, id: NodeId) -> Result<&[(String, String)], DocumentError> {
        Ok(match &self.node(id)?.kind {
            NodeKind::Element { attributes, .. } => attributes,
            NodeKind::Text(_) => &[],
        })
    }

    pub fn children(&self, id: NodeId) -> Result<&[NodeId], DocumentError> {
        Ok(&self.node(id)?.children)
    }

    /// The child elements of a node (i.e. no text).
    pub fn child_elements(&self, id: NodeId) -> Result<Vec<NodeId>, DocumentError> {
        Ok(self
            .node(id)?
            .children
            .iter()
            .copied()
            .filter(|&c| matches!(self.nodes[c.0].kind, NodeKind::Element { .. }))
            .collect())
    }

    /// The first child element with the given name.
    pub fn first_child_named(
        &self,
        id: NodeId,
        name: &str,
    ) -> Result<Option<NodeId>, DocumentError> {
        Ok(self.node(id)?.children.iter().copied().find(|&c| {
            matches!(&self.nodes[c.0].kind, NodeKind::Element { name: n, .. } if n == name)
        }))
    }

    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>, DocumentError> {
        Ok(self.node(id)?.parent)
    }

    /// The node and everything under it, in document (pre-)order.
    pub fn descendants(&self, id: NodeId) -> Result<Vec<NodeId>, DocumentError> {
        self.node(id)?;
        let mut out = vec![];
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.nodes[next.0].children.iter().rev());
        }
        Ok(out)
    }

    /// The concatenated text directly inside a node. For a text node, its own
    /// text.
    pub fn text(&self, id: NodeId) -> Result<String, DocumentError> {
        let node = self.node(id)?;
        Ok(match &node.kind {
            NodeKind::Text(t) => t.clone(),
            NodeKind::Element { .. } => node
                .children
                .iter()
                .filter_map(|c| match &self.nodes[c.0].kind {
                    NodeKind::Text(t) => Some(t.as_str()),
                    NodeKind::Element { .. } => None,
                })
                .collect(),
        })
    }

    /// Set an attribute on an element, replacing any existing value.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DocumentError> {
        self.node(id)?;
        if let NodeKind::Element { attributes, .. } = &mut self.nodes[id.0].kind {
            match attributes.iter_mut().find(|(k, _)| k == name) {
                Some((_, v)) => *v = value.to_string(),
                None => attributes.push((name.to_string(), value.to_string())),
            }
        }
        Ok(())
    }

    /// Detach a node from its parent. The node and its whole subtree become
    /// dead; any further access through their [`NodeId`]s is an error.
    pub fn unbind(&mut self, id: NodeId) -> Result<(), DocumentError> {
        if id == self.root {
            return Err(DocumentError::UnbindRoot);
        }
        let parent = self.node(id)?.parent;
        let subtree = self.descendants(id)?;

        if let Some(parent) = parent {
            self.nodes[parent.0].children.retain(|&c| c != id);
        }
        for node in &subtree {
            self.nodes[node.0].live = false;
        }
        trace!("Unbound {id} ({} nodes)", subtree.len());
        Ok(())
    }

    /// Serialise the whole document, with an XML declaration.
    pub fn to_xml(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        self.write_node(self.root, &mut out);
        out.push('\n');
        out
    }

    /// Serialise a single node and everything under it.
    pub fn subtree_to_xml(&self, id: NodeId) -> Result<String, DocumentError> {
        self.node(id)?;
        let mut out = String::new();
        self.write_node(id, &mut out);
        Ok(out)
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        let node = &self.nodes[id.0];
        match &node.kind {
            NodeKind::Text(t) => out.push_str(&escape(t, false)),
            NodeKind::Element {
                name,
                prefix,
                namespaces,
                attributes,
            } => {
                let name = match prefix {
                    Some(prefix) => format!("{prefix}:{name}"),
                    None => name.clone(),
                };
                out.push('<');
                out.push_str(&name);
                // Writing into a String can't fail.
                for (ns_prefix, uri) in namespaces {
                    let _ = match ns_prefix {
                        Some(p) => write!(out, " xmlns:{p}=\"{}\"", escape(uri, true)),
                        None => write!(out, " xmlns=\"{}\"", escape(uri, true)),
                    };
                }
                for (k, v) in attributes {
                    let _ = write!(out, " {k}=\"{}\"", escape(v, true));
                }
                if node.children.is_empty() {
                    out.push_str("/>");
                } else {
                    out.push('>');
                    for &child in &node.children {
                        self.write_node(child, out);
                    }
                    let _ = write!(out, "</{name}>");
                }
            }
        }
    }
}

/// The prefix bound to a namespace URI where `element` is. The default
/// namespace has no prefix.
fn prefix_for(element: roxmltree::Node, uri: &str) -> Option<String> {
    element
        .lookup_prefix(uri)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
}

/// The namespaces that `element` declares itself, rather than inherits.
fn declared_namespaces(element: roxmltree::Node) -> Vec<(Option<String>, String)> {
    let inherited: Vec<(Option<&str>, &str)> = element
        .parent_element()
        .map(|p| p.namespaces().map(|ns| (ns.name(), ns.uri())).collect())
        .unwrap_or_default();
    element
        .namespaces()
        .filter(|ns| ns.name() != Some("xml"))
        .filter(|ns| !inherited.contains(&(ns.name(), ns.uri())))
        .map(|ns| (ns.name().map(str::to_string), ns.uri().to_string()))
        .collect()
}

/// Escape text for XML. Quotes only need escaping inside attribute values.
pub(crate) fn escape(s: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}
