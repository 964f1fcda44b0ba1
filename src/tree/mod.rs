//! # Node Tree
//!
//! The mutable document tree the formatter chain works on. Nodes live in an
//! arena owned by [`NodeTree`] and are addressed by copyable [`NodeId`]
//! handles. A node's `children` list owns its children; the `parent` field
//! is a lookup-only back-reference.
//!
//! Attributes are typed and validated against the node kind. Writes notify
//! registered [`AttributeListener`]s, and a write to a geometry attribute of
//! an already formatted node marks its subtree dirty so the layout engine
//! can re-run formatting there.

pub mod attribute;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

pub use attribute::{Attribute, AttributeListener, AttributeValue};

use crate::draw::{DrawingTask, TaskQueue};
use crate::error::{NodeLabel, QuireError, Result};
use crate::list::Enumeration;
use crate::model::{Edges, FixedPosition, PageConfig};
use crate::runtime::RuntimeText;
use crate::style::{Color, Display, ListPosition};
use crate::text::LinePart;

/// Handle of a node inside a [`NodeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) fn from_index(index: usize) -> Self {
        NodeId(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The different kinds of nodes in the document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// The tree root. Holds inherited defaults for the whole document.
    Document,
    /// A page template. Its content may flow onto several physical pages.
    Page { config: PageConfig },
    /// A generic container.
    Block,
    /// Text content, word-wrapped by the text flow engine.
    Text,
    /// An image with intrinsic size from its decoded source.
    Image,
    /// A list; every direct child is one item with its own marker.
    List,
    /// Content repeated on every physical page produced from its page.
    Fixed { position: FixedPosition },
    /// Text whose value is only known after pagination.
    Runtime(RuntimeText),
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Document => "Document",
            NodeKind::Page { .. } => "Page",
            NodeKind::Block => "Block",
            NodeKind::Text => "Text",
            NodeKind::Image => "Image",
            NodeKind::List => "List",
            NodeKind::Fixed {
                position: FixedPosition::Header,
            } => "Header",
            NodeKind::Fixed {
                position: FixedPosition::Footer,
            } => "Footer",
            NodeKind::Runtime(_) => "Runtime",
        }
    }

    /// Does this kind accept `attribute`?
    pub fn declares(&self, attribute: Attribute) -> bool {
        match self {
            NodeKind::Document => matches!(
                attribute,
                Attribute::FontFamily | Attribute::FontSize | Attribute::LineHeight | Attribute::Color
            ),
            NodeKind::Page { .. } | NodeKind::Block | NodeKind::Fixed { .. } => {
                Attribute::BOX.contains(&attribute)
            }
            NodeKind::Text => Attribute::BOX.contains(&attribute) || attribute == Attribute::Text,
            NodeKind::Image => Attribute::BOX.contains(&attribute) || attribute == Attribute::Src,
            NodeKind::List => {
                Attribute::BOX.contains(&attribute)
                    || matches!(attribute, Attribute::ListType | Attribute::ListPosition)
            }
            NodeKind::Runtime(_) => {
                Attribute::BOX.contains(&attribute) || attribute == Attribute::DummyText
            }
        }
    }

    /// Text-like nodes are measured by the text flow engine.
    pub fn is_text(&self) -> bool {
        matches!(self, NodeKind::Text | NodeKind::Runtime(_))
    }

    pub fn accepts_children(&self) -> bool {
        !matches!(self, NodeKind::Text | NodeKind::Image | NodeKind::Runtime(_))
    }
}

/// Position and size of a node's border box, in page coordinates with the
/// origin at the top-left corner. Width and height stay `None` until the
/// formatter chain has computed them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Geometry {
    pub x: f64,
    pub y: f64,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

/// Where the next child goes inside a container, relative to its content
/// box.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct FlowCursor {
    /// Advance of the current inline line.
    pub x: f64,
    /// Height of completed lines and blocks.
    pub y: f64,
    /// Height of the current inline line.
    pub line_height: f64,
    /// Widest inline line seen so far.
    pub max_x: f64,
}

impl FlowCursor {
    /// Close the current inline line, if any.
    pub fn break_line(&mut self) {
        if self.x > 0.0 || self.line_height > 0.0 {
            self.y += self.line_height;
            self.x = 0.0;
            self.line_height = 0.0;
        }
    }

    pub fn content_height(&self) -> f64 {
        self.y + self.line_height
    }
}

/// A node in the document tree.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) name: Option<String>,
    pub(crate) attributes: BTreeMap<Attribute, AttributeValue>,
    pub(crate) geometry: Geometry,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) tasks: TaskQueue,
    pub(crate) line_parts: Vec<LinePart>,
    pub(crate) enumeration: Option<Enumeration>,
    /// Resolved text of a runtime node; filler text is used while None.
    pub(crate) resolved_text: Option<String>,
    /// Left margin added by an enclosing inside-positioned list.
    pub(crate) list_indent: f64,
    pub(crate) cursor: FlowCursor,
    pub(crate) formatted: bool,
    pub(crate) dirty: bool,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            name: None,
            attributes: BTreeMap::new(),
            geometry: Geometry::default(),
            parent: None,
            children: Vec::new(),
            tasks: TaskQueue::new(),
            line_parts: Vec::new(),
            enumeration: None,
            resolved_text: None,
            list_indent: 0.0,
            cursor: FlowCursor::default(),
            formatted: false,
            dirty: false,
        }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn tasks(&self) -> &TaskQueue {
        &self.tasks
    }

    pub fn line_parts(&self) -> &[LinePart] {
        &self.line_parts
    }

    pub fn enumeration(&self) -> Option<&Enumeration> {
        self.enumeration.as_ref()
    }

    /// Whether the content of this node is resolved after pagination.
    pub fn is_runtime(&self) -> bool {
        matches!(self.kind, NodeKind::Runtime(_))
    }

    pub fn is_formatted(&self) -> bool {
        self.formatted
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Drop everything the formatter chain computed for this node.
    pub(crate) fn reset_layout(&mut self) {
        self.geometry = Geometry::default();
        self.tasks = TaskQueue::new();
        self.line_parts.clear();
        self.enumeration = None;
        self.cursor = FlowCursor::default();
        self.formatted = false;
        self.dirty = false;
    }
}

/// Arena-backed document tree.
pub struct NodeTree {
    nodes: Vec<Node>,
    root: NodeId,
    listeners: Vec<Box<dyn AttributeListener>>,
    runtime_pages: BTreeSet<NodeId>,
}

impl fmt::Debug for NodeTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeTree")
            .field("nodes", &self.nodes)
            .field("root", &self.root)
            .field("listeners", &self.listeners.len())
            .field("runtime_pages", &self.runtime_pages)
            .finish()
    }
}

impl Default for NodeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeTree {
    /// Create a tree holding only the document root.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeKind::Document)],
            root: NodeId(0),
            listeners: Vec::new(),
            runtime_pages: BTreeSet::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Create a detached node.
    pub fn create(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(kind));
        id
    }

    /// Create a node of `kind` and append it to `parent`.
    pub fn append(&mut self, parent: NodeId, kind: NodeKind) -> Result<NodeId> {
        let id = self.create(kind);
        self.add_child(parent, id)?;
        Ok(id)
    }

    /// Append `child` to `parent`'s children.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        if child == self.root {
            return Err(self.tree_error(child, "the document root cannot be a child"));
        }
        if !self.nodes[parent.0].kind.accepts_children() {
            return Err(self.tree_error(parent, "this node kind cannot have children"));
        }
        if let Some(current) = self.nodes[child.0].parent {
            return Err(self.tree_error(
                child,
                &format!("node already belongs to {}", self.label(current)),
            ));
        }
        let is_page = matches!(self.nodes[child.0].kind, NodeKind::Page { .. });
        if is_page && parent != self.root {
            return Err(self.tree_error(child, "pages must be direct children of the document"));
        }
        if matches!(self.nodes[child.0].kind, NodeKind::Fixed { .. })
            && !matches!(self.nodes[parent.0].kind, NodeKind::Page { .. })
        {
            return Err(self.tree_error(child, "headers and footers must be direct children of a page"));
        }
        if self.ancestors(parent).any(|a| a == child) || parent == child {
            return Err(self.tree_error(child, "a node cannot contain itself"));
        }
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        Ok(())
    }

    fn tree_error(&self, id: NodeId, message: &str) -> QuireError {
        QuireError::InvalidTree {
            node: self.label(id),
            message: message.to_string(),
        }
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    /// Children in insertion order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Ancestors of `id`, nearest first, excluding `id`.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&n| self.parent(n))
    }

    /// `id` and all its descendants in depth-first pre-order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev());
        }
        out
    }

    pub fn set_name(&mut self, id: NodeId, name: impl Into<String>) {
        self.nodes[id.0].name = Some(name.into());
    }

    pub fn label(&self, id: NodeId) -> NodeLabel {
        let node = &self.nodes[id.0];
        NodeLabel {
            id,
            kind: node.kind.name(),
            name: node.name.clone(),
        }
    }

    /// Register an observer for attribute writes.
    pub fn subscribe(&mut self, listener: impl AttributeListener + 'static) {
        self.listeners.push(Box::new(listener));
    }

    // ── Attributes ─────────────────────────────────────────────

    /// Explicitly set value, if any.
    pub fn explicit_attribute(&self, id: NodeId, attribute: Attribute) -> Option<&AttributeValue> {
        self.nodes[id.0].attributes.get(&attribute)
    }

    /// Value of `attribute` on this node, or its default.
    pub fn attribute(&self, id: NodeId, attribute: Attribute) -> AttributeValue {
        self.explicit_attribute(id, attribute)
            .cloned()
            .unwrap_or_else(|| attribute.default_value())
    }

    /// Value of `attribute` on the nearest node, starting at `id`, that has
    /// it set. Falls back to the default.
    pub fn recurse_attribute(&self, id: NodeId, attribute: Attribute) -> AttributeValue {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find_map(|n| self.explicit_attribute(n, attribute))
            .cloned()
            .unwrap_or_else(|| attribute.default_value())
    }

    /// Write an attribute, returning the previous explicit value.
    pub fn set_attribute(
        &mut self,
        id: NodeId,
        attribute: Attribute,
        value: impl Into<AttributeValue>,
    ) -> Result<Option<AttributeValue>> {
        let value = value.into();
        if !self.nodes[id.0].kind.declares(attribute) {
            return Err(QuireError::UnknownAttribute {
                node: self.label(id),
                attribute: attribute.name().to_string(),
            });
        }
        if !attribute.accepts(&value) {
            return Err(QuireError::InvalidAttributeValue {
                node: self.label(id),
                attribute: attribute.name().to_string(),
                message: format!("{value:?} has the wrong type"),
            });
        }

        let old = self.nodes[id.0].attributes.insert(attribute, value);
        if self.nodes[id.0].formatted
            && attribute.affects_geometry()
            && old.as_ref() != self.nodes[id.0].attributes.get(&attribute)
        {
            self.mark_dirty(id);
        }
        for listener in &mut self.listeners {
            listener.attribute_changed(id, attribute, old.as_ref());
        }
        Ok(old)
    }

    /// Set an attribute by its input name.
    pub fn set_attribute_by_name(
        &mut self,
        id: NodeId,
        name: &str,
        value: &serde_json::Value,
    ) -> Result<Option<AttributeValue>> {
        let attribute = Attribute::from_name(name).ok_or_else(|| QuireError::UnknownAttribute {
            node: self.label(id),
            attribute: name.to_string(),
        })?;
        let parsed = attribute
            .parse_value(value)
            .map_err(|message| QuireError::InvalidAttributeValue {
                node: self.label(id),
                attribute: name.to_string(),
                message,
            })?;
        self.set_attribute(id, attribute, parsed)
    }

    // ── Typed views ────────────────────────────────────────────

    pub fn number(&self, id: NodeId, attribute: Attribute) -> f64 {
        self.attribute(id, attribute).as_number()
    }

    pub fn display(&self, id: NodeId) -> Display {
        match self.attribute(id, Attribute::Display) {
            AttributeValue::Display(d) => d,
            _ => Display::Block,
        }
    }

    pub fn list_position(&self, id: NodeId) -> ListPosition {
        match self.attribute(id, Attribute::ListPosition) {
            AttributeValue::ListPosition(p) => p,
            _ => ListPosition::Outside,
        }
    }

    pub fn font_family(&self, id: NodeId) -> String {
        self.recurse_attribute(id, Attribute::FontFamily).as_text().to_string()
    }

    pub fn font_size(&self, id: NodeId) -> f64 {
        self.recurse_attribute(id, Attribute::FontSize).as_number()
    }

    /// Line height in points; unset means 1.2 times the font size, and
    /// percentages are relative to the font size.
    pub fn line_height(&self, id: NodeId) -> f64 {
        let font_size = self.font_size(id);
        self.recurse_attribute(id, Attribute::LineHeight)
            .as_dimension()
            .resolve(font_size)
            .unwrap_or(font_size * 1.2)
    }

    pub fn color(&self, id: NodeId, attribute: Attribute) -> Color {
        let value = if attribute.is_inherited() {
            self.recurse_attribute(id, attribute)
        } else {
            self.attribute(id, attribute)
        };
        match value {
            AttributeValue::Color(c) => c,
            _ => Color::TRANSPARENT,
        }
    }

    /// Margins, with any indent reserved by an enclosing inside list added
    /// to the left edge.
    pub fn margin(&self, id: NodeId) -> Edges {
        Edges {
            top: self.number(id, Attribute::MarginTop),
            right: self.number(id, Attribute::MarginRight),
            bottom: self.number(id, Attribute::MarginBottom),
            left: self.number(id, Attribute::MarginLeft) + self.nodes[id.0].list_indent,
        }
    }

    /// Set the indent an enclosing inside list reserves on `id`.
    ///
    /// The indent is part of the effective left margin, so a change is
    /// reported to listeners as a `margin-left` write carrying the previous
    /// effective margin, and dirties the node if it was already formatted.
    pub(crate) fn set_list_indent(&mut self, id: NodeId, indent: f64) {
        let before = self.margin(id).left;
        let node = &mut self.nodes[id.0];
        if node.list_indent == indent {
            return;
        }
        node.list_indent = indent;
        if node.formatted {
            self.mark_dirty(id);
        }
        let old = AttributeValue::Number(before);
        for listener in &mut self.listeners {
            listener.attribute_changed(id, Attribute::MarginLeft, Some(&old));
        }
    }

    /// Indent reserved on `id` by an enclosing inside list.
    pub fn list_indent(&self, id: NodeId) -> f64 {
        self.nodes[id.0].list_indent
    }

    /// Padding, plus the page margins for page nodes.
    pub fn padding(&self, id: NodeId) -> Edges {
        let mut padding = Edges {
            top: self.number(id, Attribute::PaddingTop),
            right: self.number(id, Attribute::PaddingRight),
            bottom: self.number(id, Attribute::PaddingBottom),
            left: self.number(id, Attribute::PaddingLeft),
        };
        if let NodeKind::Page { config } = &self.nodes[id.0].kind {
            padding.top += config.margin.top;
            padding.right += config.margin.right;
            padding.bottom += config.margin.bottom;
            padding.left += config.margin.left;
        }
        padding
    }

    /// Text to flow: the `text` attribute, or for runtime nodes the
    /// resolved value (filler until resolution).
    pub fn content(&self, id: NodeId) -> String {
        let node = &self.nodes[id.0];
        match &node.kind {
            NodeKind::Runtime(runtime) => match &node.resolved_text {
                Some(text) => text.clone(),
                None => runtime.filler(self.attribute(id, Attribute::DummyText).as_text()),
            },
            _ => self.attribute(id, Attribute::Text).as_text().to_string(),
        }
    }

    // ── Geometry ───────────────────────────────────────────────

    pub fn geometry(&self, id: NodeId) -> Geometry {
        self.nodes[id.0].geometry
    }

    pub(crate) fn geometry_mut(&mut self, id: NodeId) -> &mut Geometry {
        &mut self.nodes[id.0].geometry
    }

    /// Width minus horizontal padding; zero while the width is unknown.
    pub fn width_without_paddings(&self, id: NodeId) -> f64 {
        let width = self.nodes[id.0].geometry.width.unwrap_or(0.0);
        (width - self.padding(id).horizontal()).max(0.0)
    }

    /// Top-left corner of the content box (where drawing starts).
    pub fn start_drawing_point(&self, id: NodeId) -> (f64, f64) {
        let g = self.nodes[id.0].geometry;
        let padding = self.padding(id);
        (g.x + padding.left, g.y + padding.top)
    }

    /// Nearest ancestor displayed as a block.
    pub fn block_ancestor(&self, id: NodeId) -> Option<NodeId> {
        self.ancestors(id).find(|&a| self.display(a) == Display::Block)
    }

    /// The page template containing `id`, if any.
    pub fn page_of(&self, id: NodeId) -> Option<NodeId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|&a| matches!(self.nodes[a.0].kind, NodeKind::Page { .. }))
    }

    /// Move a laid-out subtree, including its line parts and queued tasks.
    pub(crate) fn translate_subtree(&mut self, id: NodeId, dx: f64, dy: f64) {
        for n in self.descendants(id) {
            let node = &mut self.nodes[n.0];
            node.geometry.x += dx;
            node.geometry.y += dy;
            node.tasks.translate(dx, dy);
            for part in &mut node.line_parts {
                part.translate(dx, dy);
            }
        }
    }

    /// Mark `id` and its descendants for re-formatting.
    pub(crate) fn mark_dirty(&mut self, id: NodeId) {
        for n in self.descendants(id) {
            self.nodes[n.0].dirty = true;
        }
    }

    /// Move runs of non-page children of the root into new pages built
    /// from `config`. Returns the number of pages created.
    pub(crate) fn wrap_loose_children(&mut self, config: &PageConfig) -> usize {
        let root = self.root;
        let old = std::mem::take(&mut self.nodes[root.0].children);
        let mut children = Vec::with_capacity(old.len());
        let mut current: Option<NodeId> = None;
        let mut created = 0;

        for child in old {
            if matches!(self.nodes[child.0].kind, NodeKind::Page { .. }) {
                current = None;
                children.push(child);
                continue;
            }
            let page = match current {
                Some(page) => page,
                None => {
                    let page = self.create(NodeKind::Page {
                        config: config.clone(),
                    });
                    self.nodes[page.0].parent = Some(root);
                    children.push(page);
                    current = Some(page);
                    created += 1;
                    page
                }
            };
            self.nodes[child.0].parent = Some(page);
            self.nodes[page.0].children.push(child);
        }

        self.nodes[root.0].children = children;
        created
    }

    // ── Runtime bookkeeping ────────────────────────────────────

    pub(crate) fn mark_runtime_page(&mut self, page: NodeId) {
        self.runtime_pages.insert(page);
    }

    /// Whether `page` holds at least one runtime node.
    pub fn is_runtime_page(&self, page: NodeId) -> bool {
        self.runtime_pages.contains(&page)
    }

    /// Runtime nodes in the subtree of `id`.
    pub fn runtime_nodes(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|&n| self.nodes[n.0].is_runtime())
            .collect()
    }

    /// Deep-copy the subtree at `id` into fresh nodes.
    ///
    /// The copy keeps the original's parent as its parent, but is not added
    /// to that parent's children: it stays logically inside the original
    /// container for inherited attributes and width queries while carrying
    /// independent task state. Copying never resolves runtime content.
    pub fn copy_as_runtime(&mut self, id: NodeId) -> NodeId {
        let parent = self.nodes[id.0].parent;
        self.copy_subtree(id, parent)
    }

    fn copy_subtree(&mut self, id: NodeId, parent: Option<NodeId>) -> NodeId {
        let mut copy = self.nodes[id.0].clone();
        copy.parent = parent;
        copy.children = Vec::new();
        let copy_id = NodeId(self.nodes.len());
        self.nodes.push(copy);

        let children = self.nodes[id.0].children.clone();
        for child in children {
            let child_copy = self.copy_subtree(child, Some(copy_id));
            self.nodes[copy_id.0].children.push(child_copy);
        }
        copy_id
    }

    // ── Drawing tasks ──────────────────────────────────────────

    pub fn enqueue(&mut self, id: NodeId, task: DrawingTask) {
        self.nodes[id.0].tasks.enqueue(task);
    }

    /// Drain every queue in the subtree of `id`, depth-first pre-order. A
    /// node's own queue comes before its line parts' queues.
    pub fn collect_tasks(&mut self, id: NodeId) -> Vec<DrawingTask> {
        let mut out = Vec::new();
        for n in self.descendants(id) {
            let node = &mut self.nodes[n.0];
            out.extend(node.tasks.drain());
            for part in &mut node.line_parts {
                out.extend(part.tasks_mut().drain());
            }
        }
        out
    }
}
