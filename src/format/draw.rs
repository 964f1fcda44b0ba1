use crate::draw::DrawingTask;
use crate::error::Result;
use crate::list::EnumerationStrategy;
use crate::style::ListPosition;
use crate::text::{TextFlow, TextStyle};
use crate::tree::{Attribute, AttributeValue, NodeId, NodeKind, NodeTree};

use super::{FormatEnv, Formatter, Stage};

/// Queues the drawing tasks for a finished node.
///
/// Backgrounds go on the node's own queue, text rows on each line part's
/// queue, and list markers on the list node, one per item in child order.
pub struct DrawingFormatter;

impl Formatter for DrawingFormatter {
    fn name(&self) -> &'static str {
        "drawing"
    }

    fn stage(&self) -> Stage {
        Stage::Leave
    }

    fn format(&self, tree: &mut NodeTree, id: NodeId, env: &FormatEnv<'_>) -> Result<()> {
        draw_background(tree, id);
        match tree.kind(id) {
            NodeKind::Text | NodeKind::Runtime(_) => draw_text(tree, id),
            NodeKind::Image => draw_image(tree, id),
            NodeKind::List => draw_markers(tree, id, env),
            _ => {}
        }
        Ok(())
    }
}

fn draw_background(tree: &mut NodeTree, id: NodeId) {
    let fill = tree.color(id, Attribute::BackgroundColor);
    let g = tree.geometry(id);
    let (Some(width), Some(height)) = (g.width, g.height) else {
        return;
    };
    if fill.is_visible() && width > 0.0 && height > 0.0 {
        tree.enqueue(id, DrawingTask::Rect {
            x: g.x,
            y: g.y,
            width,
            height,
            fill,
        });
    }
}

fn draw_text(tree: &mut NodeTree, id: NodeId) {
    let style = TextStyle::of(tree, id);
    for part in &mut tree.node_mut(id).line_parts {
        let task = part.render_task(&style);
        part.tasks_mut().enqueue(task);
    }
}

fn draw_image(tree: &mut NodeTree, id: NodeId) {
    let AttributeValue::Image(image) = tree.attribute(id, Attribute::Src) else {
        log::debug!("{} has no decoded source, nothing to draw", tree.label(id));
        return;
    };
    let (x, y) = tree.start_drawing_point(id);
    let width = tree.width_without_paddings(id);
    let height = (tree.geometry(id).height.unwrap_or(0.0) - tree.padding(id).vertical()).max(0.0);
    tree.enqueue(id, DrawingTask::Image {
        x,
        y,
        width,
        height,
        image,
    });
}

fn draw_markers(tree: &mut NodeTree, id: NodeId, env: &FormatEnv<'_>) {
    let Some(mut enumeration) = tree.node_mut(id).enumeration.take() else {
        return;
    };
    let style = TextStyle::of(tree, id);
    let position = tree.list_position(id);
    let flow = TextFlow::new(env.metrics);

    enumeration.reset();
    let items = tree.children(id).to_vec();
    for item in items {
        let text = enumeration.next();
        if text.is_empty() {
            continue;
        }
        let (item_x, item_y) = tree.start_drawing_point(item);
        let item_x = item_x - tree.padding(item).left;
        let x = match position {
            ListPosition::Inside => item_x - tree.list_indent(item),
            ListPosition::Outside => {
                item_x - flow.text_width(&style.font_family, style.font_size, &text)
            }
        };
        tree.enqueue(id, DrawingTask::Marker {
            x,
            y: item_y,
            text,
            font_family: style.font_family.clone(),
            font_size: style.font_size,
            color: style.color,
        });
    }
    tree.node_mut(id).enumeration = Some(enumeration);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::test_support::with_env;
    use crate::format::FormatterChain;
    use crate::model::{Edges, PageConfig, PageSize};
    use crate::style::Color;

    fn page(tree: &mut NodeTree) -> NodeId {
        let config = PageConfig {
            size: PageSize::Custom {
                width: 200.0,
                height: 200.0,
            },
            margin: Edges::uniform(20.0),
            ..PageConfig::default()
        };
        tree.append(tree.root(), NodeKind::Page { config }).unwrap()
    }

    fn list(tree: &mut NodeTree, style: &str, position: ListPosition, items: usize) -> NodeId {
        let page = page(tree);
        let list = tree.append(page, NodeKind::List).unwrap();
        tree.set_attribute(list, Attribute::ListType, style).unwrap();
        tree.set_attribute(list, Attribute::ListPosition, position).unwrap();
        for _ in 0..items {
            let item = tree.append(list, NodeKind::Text).unwrap();
            tree.set_attribute(item, Attribute::Text, "item").unwrap();
        }
        list
    }

    fn markers(tree: &NodeTree, id: NodeId) -> Vec<(String, f64)> {
        tree.node(id)
            .tasks()
            .iter()
            .filter_map(|t| match t {
                DrawingTask::Marker { text, x, .. } => Some((text.clone(), *x)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn inside_markers_sit_in_the_reserved_indent() {
        let mut tree = NodeTree::new();
        let list = list(&mut tree, "decimal", ListPosition::Inside, 3);
        let root = tree.root();
        with_env(|env| FormatterChain::standard().run(&mut tree, root, env)).unwrap();

        assert_eq!(
            markers(&tree, list),
            vec![("1.".to_string(), 20.0), ("2.".to_string(), 20.0), ("3.".to_string(), 20.0)]
        );
        let item = tree.children(list)[0];
        assert_eq!(tree.geometry(item).x, 30.0);
    }

    #[test]
    fn outside_markers_hang_left_of_the_item() {
        let mut tree = NodeTree::new();
        let list = list(&mut tree, "lower-alpha", ListPosition::Outside, 2);
        let root = tree.root();
        with_env(|env| FormatterChain::standard().run(&mut tree, root, env)).unwrap();

        assert_eq!(
            markers(&tree, list),
            vec![("a.".to_string(), 10.0), ("b.".to_string(), 10.0)]
        );
    }

    #[test]
    fn empty_markers_are_skipped() {
        let mut tree = NodeTree::new();
        let list = list(&mut tree, "none", ListPosition::Inside, 2);
        let root = tree.root();
        with_env(|env| FormatterChain::standard().run(&mut tree, root, env)).unwrap();
        assert!(markers(&tree, list).is_empty());
    }

    #[test]
    fn text_rows_and_backgrounds_are_queued() {
        let mut tree = NodeTree::new();
        let page = page(&mut tree);
        let text = tree.append(page, NodeKind::Text).unwrap();
        tree.set_attribute(text, Attribute::Text, "hello world").unwrap();
        tree.set_attribute(text, Attribute::BackgroundColor, Color::rgb(1.0, 0.0, 0.0))
            .unwrap();

        let root = tree.root();
        with_env(|env| FormatterChain::standard().run(&mut tree, root, env)).unwrap();

        assert!(matches!(
            tree.node(text).tasks().iter().next(),
            Some(DrawingTask::Rect { width, .. }) if *width == 160.0
        ));
        let part = &tree.node(text).line_parts()[0];
        assert_eq!(part.tasks().iter().next().and_then(|t| t.text()), Some("hello world"));
    }

    #[test]
    fn image_is_drawn_in_its_content_box() {
        let mut tree = NodeTree::new();
        let page = page(&mut tree);
        let image = tree.append(page, NodeKind::Image).unwrap();
        tree.set_attribute(image, Attribute::Src, "photo.png").unwrap();
        tree.set_attribute(image, Attribute::PaddingLeft, 4.0).unwrap();

        let root = tree.root();
        with_env(|env| FormatterChain::standard().run(&mut tree, root, env)).unwrap();

        match tree.node(image).tasks().iter().next() {
            Some(DrawingTask::Image { x, y, width, height, .. }) => {
                assert_eq!((*x, *y), (24.0, 20.0));
                assert_eq!((*width, *height), (36.0, 20.0));
            }
            other => panic!("expected an image task, got {other:?}"),
        };
    }
}
