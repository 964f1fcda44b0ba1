use crate::error::Result;
use crate::style::Display;
use crate::tree::{NodeId, NodeKind, NodeTree};

use super::dimension::{parent_content_size, resolved_size};
use super::{FormatEnv, Formatter};

/// Places a node at its parent's flow cursor.
///
/// Pages sit at the origin. Block nodes close the parent's current inline
/// line and start below it. Inline nodes continue the current line, moving
/// to a new one first when their known width would overflow it. Headers and
/// footers start at the parent's content corner; the page moves them later.
pub struct PositionFormatter;

impl Formatter for PositionFormatter {
    fn name(&self) -> &'static str {
        "position"
    }

    fn format(&self, tree: &mut NodeTree, id: NodeId, _env: &FormatEnv<'_>) -> Result<()> {
        let parent = match (tree.kind(id), tree.parent(id)) {
            (NodeKind::Page { .. }, _) | (_, None) => {
                let g = tree.geometry_mut(id);
                g.x = 0.0;
                g.y = 0.0;
                return Ok(());
            }
            (_, Some(parent)) => parent,
        };

        let margin = tree.margin(id);
        let (content_x, content_y) = tree.start_drawing_point(parent);

        let (x, y) = if matches!(tree.kind(id), NodeKind::Fixed { .. }) {
            (content_x + margin.left, content_y + margin.top)
        } else {
            match tree.display(id) {
                Display::Block => {
                    let cursor = &mut tree.node_mut(parent).cursor;
                    cursor.break_line();
                    (content_x + margin.left, content_y + cursor.y + margin.top)
                }
                Display::Inline => {
                    let (parent_width, parent_height) = parent_content_size(tree, parent);
                    let outer = resolved_size(tree, id, parent_width, parent_height)
                        .0
                        .map(|w| w + margin.horizontal());
                    let cursor = &mut tree.node_mut(parent).cursor;
                    if let (Some(outer), Some(available)) = (outer, parent_width) {
                        if cursor.x > 0.0 && cursor.x + outer > available {
                            cursor.break_line();
                        }
                    }
                    (content_x + cursor.x + margin.left, content_y + cursor.y + margin.top)
                }
            }
        };

        let g = tree.geometry_mut(id);
        g.x = x;
        g.y = y;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::test_support::with_env;
    use crate::format::FormatterChain;
    use crate::model::{Edges, PageConfig, PageSize};
    use crate::tree::Attribute;

    #[test]
    fn inline_node_wraps_to_next_line_when_too_wide() {
        let mut tree = NodeTree::new();
        let config = PageConfig {
            size: PageSize::Custom {
                width: 120.0,
                height: 400.0,
            },
            margin: Edges::uniform(10.0),
            ..PageConfig::default()
        };
        let page = tree.append(tree.root(), NodeKind::Page { config }).unwrap();
        let mut boxes = Vec::new();
        for _ in 0..3 {
            let b = tree.append(page, NodeKind::Block).unwrap();
            tree.set_attribute(b, Attribute::Display, Display::Inline).unwrap();
            tree.set_attribute(b, Attribute::Width, 40.0).unwrap();
            tree.set_attribute(b, Attribute::Height, 15.0).unwrap();
            boxes.push(b);
        }

        let root = tree.root();
        with_env(|env| FormatterChain::standard().run(&mut tree, root, env)).unwrap();

        let positions: Vec<_> = boxes
            .iter()
            .map(|&b| (tree.geometry(b).x, tree.geometry(b).y))
            .collect();
        assert_eq!(positions, vec![(10.0, 10.0), (50.0, 10.0), (10.0, 25.0)]);
    }
}
