use crate::error::Result;
use crate::style::Display;
use crate::tree::{NodeId, NodeKind, NodeTree};

use super::{FormatEnv, Formatter, Stage};

/// Advances the parent's flow cursor past a finished node.
///
/// Blocks add their outer height. Inline nodes add their outer width to the
/// current line, except inline text that wrapped onto several rows, which
/// ends the line it finished on.
pub struct FlowFormatter;

impl Formatter for FlowFormatter {
    fn name(&self) -> &'static str {
        "flow"
    }

    fn stage(&self) -> Stage {
        Stage::Leave
    }

    fn format(&self, tree: &mut NodeTree, id: NodeId, _env: &FormatEnv<'_>) -> Result<()> {
        if matches!(tree.kind(id), NodeKind::Page { .. } | NodeKind::Fixed { .. }) {
            return Ok(());
        }
        let Some(parent) = tree.parent(id) else {
            return Ok(());
        };

        let g = tree.geometry(id);
        let margin = tree.margin(id);
        let outer_width = g.width.unwrap_or(0.0) + margin.horizontal();
        let outer_height = g.height.unwrap_or(0.0) + margin.vertical();
        let display = tree.display(id);
        let multi_row = tree.node(id).line_parts().len() > 1;

        let cursor = &mut tree.node_mut(parent).cursor;
        match display {
            Display::Block => {
                cursor.y += outer_height;
                cursor.max_x = cursor.max_x.max(outer_width);
            }
            Display::Inline if multi_row => {
                cursor.y += cursor.line_height.max(outer_height);
                cursor.x = 0.0;
                cursor.line_height = 0.0;
                cursor.max_x = cursor.max_x.max(outer_width);
            }
            Display::Inline => {
                cursor.x += outer_width;
                cursor.line_height = cursor.line_height.max(outer_height);
                cursor.max_x = cursor.max_x.max(cursor.x);
            }
        }
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
    fn block_after_inline_run_starts_below_it() {
        let mut tree = NodeTree::new();
        let config = PageConfig {
            size: PageSize::Custom {
                width: 200.0,
                height: 200.0,
            },
            margin: Edges::uniform(0.0),
            ..PageConfig::default()
        };
        let page = tree.append(tree.root(), NodeKind::Page { config }).unwrap();
        let inline = tree.append(page, NodeKind::Block).unwrap();
        tree.set_attribute(inline, Attribute::Display, Display::Inline).unwrap();
        tree.set_attribute(inline, Attribute::Width, 30.0).unwrap();
        tree.set_attribute(inline, Attribute::Height, 12.0).unwrap();
        let block = tree.append(page, NodeKind::Block).unwrap();
        tree.set_attribute(block, Attribute::Height, 8.0).unwrap();
        tree.set_attribute(block, Attribute::MarginBottom, 2.0).unwrap();

        let root = tree.root();
        with_env(|env| FormatterChain::standard().run(&mut tree, root, env)).unwrap();

        assert_eq!(tree.geometry(block).y, 12.0);
        let cursor = tree.node(page).cursor;
        assert_eq!(cursor.content_height(), 22.0);
        assert_eq!(cursor.max_x, 200.0);
    }
}
