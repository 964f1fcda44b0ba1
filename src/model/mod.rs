//! # Document Model
//!
//! The declarative input representation. A document is a list of node specs,
//! each with a type, a map of kebab-case attributes, and children. Building
//! a document validates every attribute against its node kind and produces
//! the mutable [`NodeTree`] the formatter chain works on.
//!
//! Page geometry is configuration, not attributes: every `Page` node carries
//! a [`PageConfig`], falling back to the document's `defaultPage`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::runtime::RuntimeText;
use crate::tree::{NodeId, NodeKind, NodeTree};

/// A complete document ready for layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// The root nodes of the document. Typically Page nodes.
    pub children: Vec<NodeSpec>,

    /// Attributes applied to the document root and inherited by all nodes
    /// (e.g. `font-family`, `font-size`).
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,

    /// Page configuration for Page nodes that don't carry their own.
    #[serde(default)]
    pub default_page: PageConfig,

    /// Custom fonts to register before layout.
    #[serde(default)]
    pub fonts: Vec<FontEntry>,
}

/// A custom font to register with the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontEntry {
    /// Font family name (e.g. "Inter", "Roboto").
    pub family: String,
    /// Base64-encoded font data, or a data URI (e.g. "data:font/ttf;base64,...").
    pub src: String,
}

/// Configuration for a page: size, margins, break control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageConfig {
    /// Page size. Defaults to A4.
    #[serde(default = "PageSize::default")]
    pub size: PageSize,

    /// Page margins in points (1/72 inch).
    #[serde(default = "default_margin")]
    pub margin: Edges,

    /// Minimum number of body items left at the bottom of a page when the
    /// page content continues on the next one.
    #[serde(default = "default_one")]
    pub min_orphan_items: usize,

    /// Minimum number of body items carried to the top of a continuation
    /// page.
    #[serde(default = "default_one")]
    pub min_widow_items: usize,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            size: PageSize::A4,
            margin: default_margin(),
            min_orphan_items: 1,
            min_widow_items: 1,
        }
    }
}

fn default_margin() -> Edges {
    Edges::uniform(54.0) // ~0.75 inch
}

fn default_one() -> usize {
    1
}

/// Standard page sizes in points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum PageSize {
    #[default]
    A4,
    A3,
    A5,
    Letter,
    Legal,
    Tabloid,
    Custom {
        width: f64,
        height: f64,
    },
}

impl PageSize {
    /// Returns (width, height) in points.
    pub fn dimensions(&self) -> (f64, f64) {
        match self {
            PageSize::A4 => (595.28, 841.89),
            PageSize::A3 => (841.89, 1190.55),
            PageSize::A5 => (419.53, 595.28),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
            PageSize::Tabloid => (792.0, 1224.0),
            PageSize::Custom { width, height } => (*width, *height),
        }
    }
}

/// Edge values (top, right, bottom, left) used for margin and padding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Edges {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Edges {
    pub fn uniform(v: f64) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    pub fn horizontal(&self) -> f64 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f64 {
        self.top + self.bottom
    }
}

/// Where a fixed element is placed on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FixedPosition {
    /// Top of the content area (below margin).
    Header,
    /// Bottom of the content area (above margin).
    Footer,
}

/// A node in the input document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSpec {
    /// What kind of node this is.
    pub kind: NodeSpecKind,

    /// Attributes by kebab-case name.
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,

    /// Child nodes.
    #[serde(default)]
    pub children: Vec<NodeSpec>,

    /// A name for this node, reported in errors.
    #[serde(default)]
    pub id: Option<String>,
}

/// The node kinds accepted in input.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeSpecKind {
    Page {
        #[serde(default)]
        config: Option<PageConfig>,
    },
    Block,
    Text {
        #[serde(default)]
        content: Option<String>,
    },
    Image {
        #[serde(default)]
        src: Option<String>,
    },
    List,
    Fixed {
        position: FixedPosition,
    },
    /// Current page number.
    PageNumber,
    /// Total number of pages.
    PageCount,
    /// Text with `{n}` and `{total}` placeholders.
    PageText {
        template: String,
    },
}

impl NodeSpec {
    /// Shorthand for a text node.
    pub fn text(content: &str) -> Self {
        Self {
            kind: NodeSpecKind::Text {
                content: Some(content.to_string()),
            },
            attributes: BTreeMap::new(),
            children: vec![],
            id: None,
        }
    }

    /// Shorthand for a node with children.
    pub fn container(kind: NodeSpecKind, children: Vec<NodeSpec>) -> Self {
        Self {
            kind,
            attributes: BTreeMap::new(),
            children,
            id: None,
        }
    }

    /// Add an attribute, builder style.
    pub fn with(mut self, name: &str, value: impl Into<serde_json::Value>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }
}

impl Document {
    /// Build the mutable node tree for this document.
    pub fn build(&self) -> Result<NodeTree> {
        let mut tree = NodeTree::new();
        let root = tree.root();
        for (name, value) in &self.attributes {
            tree.set_attribute_by_name(root, name, value)?;
        }
        for spec in &self.children {
            self.build_node(&mut tree, root, spec)?;
        }
        log::debug!("built node tree with {} nodes", tree.len());
        Ok(tree)
    }

    fn build_node(&self, tree: &mut NodeTree, parent: NodeId, spec: &NodeSpec) -> Result<NodeId> {
        let kind = match &spec.kind {
            NodeSpecKind::Page { config } => NodeKind::Page {
                config: config.clone().unwrap_or_else(|| self.default_page.clone()),
            },
            NodeSpecKind::Block => NodeKind::Block,
            NodeSpecKind::Text { .. } => NodeKind::Text,
            NodeSpecKind::Image { .. } => NodeKind::Image,
            NodeSpecKind::List => NodeKind::List,
            NodeSpecKind::Fixed { position } => NodeKind::Fixed {
                position: *position,
            },
            NodeSpecKind::PageNumber => NodeKind::Runtime(RuntimeText::CurrentPageNumber),
            NodeSpecKind::PageCount => NodeKind::Runtime(RuntimeText::NumberOfPages),
            NodeSpecKind::PageText { template } => {
                NodeKind::Runtime(RuntimeText::Template(template.clone()))
            }
        };

        let id = tree.create(kind);
        if let Some(name) = &spec.id {
            tree.set_name(id, name.clone());
        }
        tree.add_child(parent, id)?;

        match &spec.kind {
            NodeSpecKind::Text {
                content: Some(content),
            } => {
                tree.set_attribute(id, crate::tree::Attribute::Text, content.as_str())?;
            }
            NodeSpecKind::Image { src: Some(src) } => {
                tree.set_attribute(id, crate::tree::Attribute::Src, src.as_str())?;
            }
            _ => {}
        }
        for (name, value) in &spec.attributes {
            tree.set_attribute_by_name(id, name, value)?;
        }
        for child in &spec.children {
            self.build_node(tree, id, child)?;
        }
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QuireError;
    use crate::tree::Attribute;

    #[test]
    fn deserialize_minimal_document() {
        let doc: Document = serde_json::from_str(
            r#"{
                "children": [
                    { "kind": { "type": "Page" }, "children": [
                        { "kind": { "type": "Text", "content": "hello" },
                          "attributes": { "font-size": 14, "margin-left": "6pt" } },
                        { "kind": { "type": "PageText", "template": "Page {n} of {total}" } }
                    ] }
                ]
            }"#,
        )
        .unwrap();

        let tree = doc.build().unwrap();
        let page = tree.children(tree.root())[0];
        assert_eq!(tree.kind(page), &NodeKind::Page { config: PageConfig::default() });

        let text = tree.children(page)[0];
        assert_eq!(tree.content(text), "hello");
        assert_eq!(tree.font_size(text), 14.0);
        assert_eq!(tree.number(text, Attribute::MarginLeft), 6.0);
        assert!(tree.node(tree.children(page)[1]).is_runtime());
    }

    #[test]
    fn unknown_attribute_names_the_node() {
        let doc = Document {
            children: vec![NodeSpec::container(
                NodeSpecKind::Page { config: None },
                vec![NodeSpec {
                    id: Some("logo".to_string()),
                    ..NodeSpec::container(NodeSpecKind::Image { src: None }, vec![])
                }
                .with("list-type", "decimal")],
            )],
            attributes: BTreeMap::new(),
            default_page: PageConfig::default(),
            fonts: vec![],
        };

        let err = doc.build().unwrap_err();
        assert!(matches!(err, QuireError::UnknownAttribute { .. }));
        assert!(err.to_string().contains("\"logo\""), "{err}");
    }

    #[test]
    fn page_sizes() {
        assert_eq!(PageSize::Letter.dimensions(), (612.0, 792.0));
        let custom = PageSize::Custom {
            width: 200.0,
            height: 300.0,
        };
        assert_eq!(custom.dimensions(), (200.0, 300.0));
    }
}
