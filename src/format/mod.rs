//! # Formatter Chain
//!
//! Geometry is computed by an ordered list of formatters applied to every
//! node. The chain runs in two passes over a subtree:
//!
//! ```text
//! pre-format   pre-order, every node:  image, runtime
//! format       enter a node:           position, dimension, list, text
//!              (children, in insertion order)
//!              leave a node:           container, fixed, flow, drawing
//! ```
//!
//! Each formatter sees the whole tree but only writes to the node it is
//! given, its parent's flow cursor, or (for lists) its direct children's
//! list indent. A parent's enter step always finishes before its first
//! child is visited, and its leave step runs after the last child.

mod dimension;
mod draw;
mod fixed;
mod flow;
mod list;
mod position;
mod pre;
mod text;

pub use dimension::{ContainerDimensionFormatter, DimensionFormatter};
pub use draw::DrawingFormatter;
pub use fixed::FixedFormatter;
pub use flow::FlowFormatter;
pub use list::ListFormatter;
pub use position::PositionFormatter;
pub use pre::{ImageFormatter, RuntimeFormatter};
pub use text::TextDimensionFormatter;

use crate::error::Result;
use crate::font::FontMetrics;
use crate::image_loader::ImageDecoder;
use crate::list::StrategyFactory;
use crate::tree::{NodeId, NodeTree};

/// The two traversals of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// One pre-order walk before any geometry exists.
    PreFormat,
    /// The recursive geometry walk.
    Format,
}

/// When a format-pass formatter runs relative to a node's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Enter,
    Leave,
}

/// The external collaborators formatters may call.
#[derive(Clone, Copy)]
pub struct FormatEnv<'a> {
    pub metrics: &'a dyn FontMetrics,
    pub strategies: &'a dyn StrategyFactory,
    pub images: &'a dyn ImageDecoder,
}

/// One step of the chain.
pub trait Formatter {
    fn name(&self) -> &'static str;

    fn pass(&self) -> Pass {
        Pass::Format
    }

    fn stage(&self) -> Stage {
        Stage::Enter
    }

    fn format(&self, tree: &mut NodeTree, id: NodeId, env: &FormatEnv<'_>) -> Result<()>;
}

/// Formatters in declared order.
pub struct FormatterChain {
    formatters: Vec<Box<dyn Formatter>>,
}

impl Default for FormatterChain {
    fn default() -> Self {
        Self::standard()
    }
}

impl FormatterChain {
    /// An empty chain.
    pub fn new() -> Self {
        Self {
            formatters: Vec::new(),
        }
    }

    /// The built-in formatters.
    pub fn standard() -> Self {
        let mut chain = Self::new();
        chain.push(ImageFormatter);
        chain.push(RuntimeFormatter);
        chain.push(PositionFormatter);
        chain.push(DimensionFormatter);
        chain.push(ListFormatter);
        chain.push(TextDimensionFormatter);
        chain.push(ContainerDimensionFormatter);
        chain.push(FixedFormatter);
        chain.push(FlowFormatter);
        chain.push(DrawingFormatter);
        chain
    }

    /// Append a formatter. It runs after every formatter already in the
    /// chain with the same pass and stage.
    pub fn push(&mut self, formatter: impl Formatter + 'static) {
        self.formatters.push(Box::new(formatter));
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.formatters.iter().map(|f| f.name()).collect()
    }

    fn select(&self, pass: Pass, stage: Option<Stage>) -> impl Iterator<Item = &dyn Formatter> {
        self.formatters
            .iter()
            .map(|f| f.as_ref())
            .filter(move |f| f.pass() == pass && stage.map_or(true, |s| f.stage() == s))
    }

    /// Run both passes over the subtree rooted at `start`.
    pub fn run(&self, tree: &mut NodeTree, start: NodeId, env: &FormatEnv<'_>) -> Result<()> {
        for id in tree.descendants(start) {
            for formatter in self.select(Pass::PreFormat, None) {
                formatter.format(tree, id, env)?;
            }
        }
        self.visit(tree, start, env)
    }

    fn visit(&self, tree: &mut NodeTree, id: NodeId, env: &FormatEnv<'_>) -> Result<()> {
        for formatter in self.select(Pass::Format, Some(Stage::Enter)) {
            formatter.format(tree, id, env)?;
        }
        let children = tree.children(id).to_vec();
        for child in children {
            self.visit(tree, child, env)?;
        }
        for formatter in self.select(Pass::Format, Some(Stage::Leave)) {
            formatter.format(tree, id, env)?;
        }
        tree.node_mut(id).formatted = true;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::error::QuireError;
    use crate::image_loader::DecodedImage;
    use crate::list::StrategyRegistry;

    /// Every character is 5pt wide at any non-zero size.
    pub struct PerChar;

    impl FontMetrics for PerChar {
        fn measure(&self, _font: &str, size: f64, codes: &[u32]) -> f64 {
            if size == 0.0 {
                0.0
            } else {
                codes.len() as f64 * 5.0
            }
        }
    }

    /// Decodes any source to a fixed-size gray image.
    pub struct FakeImages {
        pub width_px: u32,
        pub height_px: u32,
    }

    impl ImageDecoder for FakeImages {
        fn decode(&self, data: &[u8]) -> Result<DecodedImage> {
            Err(QuireError::ImageDecode(format!("{} raw bytes", data.len())))
        }

        fn load(&self, src: &str) -> Result<DecodedImage> {
            if src == "missing" {
                return Err(QuireError::ImageDecode("no such image".to_string()));
            }
            Ok(DecodedImage {
                width_px: self.width_px,
                height_px: self.height_px,
                bit_depth: 8,
                color_space: crate::image_loader::ColorSpace::DeviceGray,
                filter: crate::image_loader::StreamFilter::None,
                stream: vec![0; (self.width_px * self.height_px) as usize],
            })
        }
    }

    pub const IMAGES: FakeImages = FakeImages {
        width_px: 40,
        height_px: 20,
    };

    pub fn with_env<T>(f: impl FnOnce(&FormatEnv<'_>) -> T) -> T {
        let strategies = StrategyRegistry::new();
        let env = FormatEnv {
            metrics: &PerChar,
            strategies: &strategies,
            images: &IMAGES,
        };
        f(&env)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::with_env;
    use super::*;
    use crate::model::{Edges, FixedPosition, PageConfig, PageSize};
    use crate::style::Display;
    use crate::tree::{Attribute, NodeKind};

    fn page_config() -> PageConfig {
        PageConfig {
            size: PageSize::Custom {
                width: 200.0,
                height: 300.0,
            },
            margin: Edges::uniform(10.0),
            ..PageConfig::default()
        }
    }

    fn tree_with_page() -> (NodeTree, NodeId) {
        let mut tree = NodeTree::new();
        let page = tree
            .append(tree.root(), NodeKind::Page { config: page_config() })
            .unwrap();
        tree.set_attribute(tree.root(), Attribute::LineHeight, crate::style::Dimension::Pt(10.0))
            .unwrap();
        (tree, page)
    }

    fn text(tree: &mut NodeTree, parent: NodeId, content: &str) -> NodeId {
        let id = tree.append(parent, NodeKind::Text).unwrap();
        tree.set_attribute(id, Attribute::Text, content).unwrap();
        id
    }

    #[test]
    fn standard_chain_order() {
        assert_eq!(
            FormatterChain::standard().names(),
            vec![
                "image",
                "runtime",
                "position",
                "dimension",
                "list",
                "text-dimension",
                "container-dimension",
                "fixed",
                "flow",
                "drawing"
            ]
        );
    }

    #[test]
    fn blocks_stack_inside_page_content_box() {
        let (mut tree, page) = tree_with_page();
        let a = text(&mut tree, page, "one");
        let b = text(&mut tree, page, "two");
        tree.set_attribute(b, Attribute::MarginTop, 4.0).unwrap();

        let root = tree.root();
        with_env(|env| FormatterChain::standard().run(&mut tree, root, env)).unwrap();

        let ga = tree.geometry(a);
        assert_eq!((ga.x, ga.y), (10.0, 10.0));
        assert_eq!(ga.width, Some(180.0));
        assert_eq!(ga.height, Some(10.0));
        let gb = tree.geometry(b);
        assert_eq!((gb.x, gb.y), (10.0, 24.0));
        assert!(tree.node(b).is_formatted());
    }

    #[test]
    fn inline_nodes_share_a_line() {
        let (mut tree, page) = tree_with_page();
        let block = tree.append(page, NodeKind::Block).unwrap();
        let a = text(&mut tree, block, "ab");
        let b = text(&mut tree, block, "cde");
        for n in [a, b] {
            tree.set_attribute(n, Attribute::Display, Display::Inline).unwrap();
        }

        let root = tree.root();
        with_env(|env| FormatterChain::standard().run(&mut tree, root, env)).unwrap();

        assert_eq!(tree.geometry(a).width, Some(10.0));
        assert_eq!(tree.geometry(b).x, 20.0);
        assert_eq!(tree.geometry(b).y, tree.geometry(a).y);
        assert_eq!(tree.geometry(block).height, Some(10.0));
    }

    #[test]
    fn headers_and_footers_pin_to_content_edges() {
        let (mut tree, page) = tree_with_page();
        let footer = tree
            .append(page, NodeKind::Fixed { position: FixedPosition::Footer })
            .unwrap();
        text(&mut tree, footer, "foot");
        let header = tree
            .append(page, NodeKind::Fixed { position: FixedPosition::Header })
            .unwrap();
        text(&mut tree, header, "head");
        let body = text(&mut tree, page, "body");

        let root = tree.root();
        with_env(|env| FormatterChain::standard().run(&mut tree, root, env)).unwrap();

        assert_eq!(tree.geometry(header).y, 10.0);
        assert_eq!(tree.geometry(footer).y, 300.0 - 10.0 - 10.0);
        // Fixed content does not advance the flow.
        assert_eq!(tree.geometry(body).y, 10.0);
        let footer_text = tree.children(footer)[0];
        assert_eq!(tree.node(footer_text).line_parts()[0].origin().1, 280.0);
    }

    #[test]
    fn custom_formatters_run_after_builtins() {
        struct Tag;
        impl Formatter for Tag {
            fn name(&self) -> &'static str {
                "tag"
            }
            fn stage(&self) -> Stage {
                Stage::Leave
            }
            fn format(&self, tree: &mut NodeTree, id: NodeId, _env: &FormatEnv<'_>) -> Result<()> {
                if tree.kind(id) == &NodeKind::Text {
                    assert!(tree.geometry(id).height.is_some());
                }
                Ok(())
            }
        }

        let (mut tree, page) = tree_with_page();
        text(&mut tree, page, "x");
        let mut chain = FormatterChain::standard();
        chain.push(Tag);
        assert_eq!(chain.names().last(), Some(&"tag"));
        let root = tree.root();
        with_env(|env| chain.run(&mut tree, root, env)).unwrap();
    }
}
