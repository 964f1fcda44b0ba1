use crate::error::Result;
use crate::text::TextFlow;
use crate::tree::{NodeId, NodeTree};

use super::{FormatEnv, Formatter};

/// Wraps text and runtime nodes and sizes them from their rows.
pub struct TextDimensionFormatter;

impl Formatter for TextDimensionFormatter {
    fn name(&self) -> &'static str {
        "text-dimension"
    }

    fn format(&self, tree: &mut NodeTree, id: NodeId, env: &FormatEnv<'_>) -> Result<()> {
        if tree.kind(id).is_text() {
            TextFlow::new(env.metrics).format_node(tree, id);
        }
        Ok(())
    }
}
