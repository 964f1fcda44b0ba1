use crate::error::Result;
use crate::style::{Dimension, Display};
use crate::tree::{Attribute, AttributeValue, NodeId, NodeKind, NodeTree};

use super::{FormatEnv, Formatter, Stage};

/// Resolve a length against a parent size that may not be known yet.
/// Percentages of an unknown size resolve to nothing.
fn resolve_against(dimension: Dimension, parent: Option<f64>) -> Option<f64> {
    match (dimension, parent) {
        (Dimension::Percent(_), None) => None,
        (d, parent) => d.resolve(parent.unwrap_or(0.0)),
    }
}

/// Explicit border-box size of a node, with images falling back to their
/// intrinsic pixel size (one pixel per point) and keeping the aspect ratio
/// when only one side is given.
pub(crate) fn resolved_size(
    tree: &NodeTree,
    id: NodeId,
    parent_width: Option<f64>,
    parent_height: Option<f64>,
) -> (Option<f64>, Option<f64>) {
    let width = resolve_against(tree.attribute(id, Attribute::Width).as_dimension(), parent_width);
    let height = resolve_against(tree.attribute(id, Attribute::Height).as_dimension(), parent_height);

    let AttributeValue::Image(image) = tree.attribute(id, Attribute::Src) else {
        return (width, height);
    };
    let (iw, ih) = (image.image().width_px as f64, image.image().height_px as f64);
    if iw == 0.0 || ih == 0.0 {
        return (width, height);
    }
    match (width, height) {
        (None, None) => (Some(iw), Some(ih)),
        (Some(w), None) => (Some(w), Some(w * ih / iw)),
        (None, Some(h)) => (Some(h * iw / ih), Some(h)),
        sized => sized,
    }
}

/// Content-box size of `parent`, where known.
pub(crate) fn parent_content_size(tree: &NodeTree, parent: NodeId) -> (Option<f64>, Option<f64>) {
    let g = tree.geometry(parent);
    let padding = tree.padding(parent);
    (
        g.width.map(|w| (w - padding.horizontal()).max(0.0)),
        g.height.map(|h| (h - padding.vertical()).max(0.0)),
    )
}

/// Assigns the width and height known before children are laid out.
///
/// Pages take their configured size. Other nodes take an explicit size
/// when they have one; otherwise block nodes fill their parent's content
/// width and inline nodes wait for their content.
pub struct DimensionFormatter;

impl Formatter for DimensionFormatter {
    fn name(&self) -> &'static str {
        "dimension"
    }

    fn format(&self, tree: &mut NodeTree, id: NodeId, _env: &FormatEnv<'_>) -> Result<()> {
        if let NodeKind::Page { config } = tree.kind(id) {
            let (width, height) = config.size.dimensions();
            let g = tree.geometry_mut(id);
            g.width = Some(width);
            g.height = Some(height);
            return Ok(());
        }
        let Some(parent) = tree.parent(id) else {
            return Ok(());
        };

        let (parent_width, parent_height) = parent_content_size(tree, parent);
        let (width, height) = resolved_size(tree, id, parent_width, parent_height);
        let width = width.or_else(|| match tree.display(id) {
            Display::Block => {
                let available = parent_width.unwrap_or(0.0) - tree.margin(id).horizontal();
                Some(available.max(0.0))
            }
            Display::Inline => None,
        });

        let g = tree.geometry_mut(id);
        g.width = width;
        g.height = height;
        Ok(())
    }
}

/// Sizes a node from its laid-out children when no earlier formatter did.
pub struct ContainerDimensionFormatter;

impl Formatter for ContainerDimensionFormatter {
    fn name(&self) -> &'static str {
        "container-dimension"
    }

    fn stage(&self) -> Stage {
        Stage::Leave
    }

    fn format(&self, tree: &mut NodeTree, id: NodeId, _env: &FormatEnv<'_>) -> Result<()> {
        if matches!(tree.kind(id), NodeKind::Document | NodeKind::Page { .. }) {
            return Ok(());
        }
        let padding = tree.padding(id);
        let cursor = tree.node(id).cursor;
        let g = tree.geometry_mut(id);
        if g.height.is_none() {
            g.height = Some(cursor.content_height() + padding.vertical());
        }
        if g.width.is_none() {
            g.width = Some(cursor.max_x.max(cursor.x) + padding.horizontal());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::test_support::with_env;
    use crate::format::{FormatterChain, ImageFormatter};
    use crate::model::{Edges, PageConfig, PageSize};

    fn page(tree: &mut NodeTree) -> NodeId {
        let config = PageConfig {
            size: PageSize::Custom {
                width: 300.0,
                height: 400.0,
            },
            margin: Edges::uniform(50.0),
            ..PageConfig::default()
        };
        tree.append(tree.root(), NodeKind::Page { config }).unwrap()
    }

    #[test]
    fn percent_width_resolves_against_parent_content() {
        let mut tree = NodeTree::new();
        let page = page(&mut tree);
        let block = tree.append(page, NodeKind::Block).unwrap();
        tree.set_attribute(block, Attribute::Width, Dimension::Percent(50.0)).unwrap();
        let plain = tree.append(page, NodeKind::Block).unwrap();
        tree.set_attribute(plain, Attribute::MarginLeft, 20.0).unwrap();

        let root = tree.root();
        with_env(|env| FormatterChain::standard().run(&mut tree, root, env)).unwrap();

        assert_eq!(tree.geometry(page).width, Some(300.0));
        assert_eq!(tree.geometry(block).width, Some(100.0));
        assert_eq!(tree.geometry(plain).width, Some(180.0));
        assert_eq!(tree.geometry(plain).x, 70.0);
    }

    #[test]
    fn image_keeps_aspect_ratio() {
        let mut tree = NodeTree::new();
        let page = page(&mut tree);
        let image = tree.append(page, NodeKind::Image).unwrap();
        tree.set_attribute(image, Attribute::Src, "photo.png").unwrap();
        tree.set_attribute(image, Attribute::Width, 80.0).unwrap();
        let intrinsic = tree.append(page, NodeKind::Image).unwrap();
        tree.set_attribute(intrinsic, Attribute::Src, "photo.png").unwrap();

        with_env(|env| {
            ImageFormatter.format(&mut tree, image, env)?;
            ImageFormatter.format(&mut tree, intrinsic, env)
        })
        .unwrap();

        // The fake decoder yields 40x20 px.
        assert_eq!(resolved_size(&tree, image, Some(200.0), None), (Some(80.0), Some(40.0)));
        assert_eq!(
            resolved_size(&tree, intrinsic, Some(200.0), None),
            (Some(40.0), Some(20.0))
        );
    }

    #[test]
    fn inline_container_is_sized_by_children() {
        let mut tree = NodeTree::new();
        let page = page(&mut tree);
        let inline = tree.append(page, NodeKind::Block).unwrap();
        tree.set_attribute(inline, Attribute::Display, Display::Inline).unwrap();
        tree.set_attribute(inline, Attribute::PaddingLeft, 2.0).unwrap();
        let text = tree.append(inline, NodeKind::Text).unwrap();
        tree.set_attribute(text, Attribute::Text, "abcd").unwrap();
        tree.set_attribute(text, Attribute::Display, Display::Inline).unwrap();

        let root = tree.root();
        with_env(|env| FormatterChain::standard().run(&mut tree, root, env)).unwrap();

        // Four characters at 5pt, plus padding.
        assert_eq!(tree.geometry(inline).width, Some(22.0));
        assert_eq!(tree.geometry(inline).height, Some(12.0 * 1.2));
    }
}
