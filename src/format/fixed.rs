use crate::error::Result;
use crate::model::FixedPosition;
use crate::tree::{NodeId, NodeKind, NodeTree};

use super::{FormatEnv, Formatter, Stage};

/// Pins a page's headers to the top of its content box and its footers to
/// the bottom.
///
/// Headers stack downward in insertion order. Footers stack upward, so the
/// last footer sits lowest.
pub struct FixedFormatter;

impl Formatter for FixedFormatter {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn stage(&self) -> Stage {
        Stage::Leave
    }

    fn format(&self, tree: &mut NodeTree, id: NodeId, _env: &FormatEnv<'_>) -> Result<()> {
        if !matches!(tree.kind(id), NodeKind::Page { .. }) {
            return Ok(());
        }
        let (headers, footers): (Vec<NodeId>, Vec<NodeId>) = tree
            .children(id)
            .iter()
            .copied()
            .filter_map(|c| match tree.kind(c) {
                NodeKind::Fixed { position } => Some((c, *position)),
                _ => None,
            })
            .fold((Vec::new(), Vec::new()), |(mut h, mut f), (c, position)| {
                match position {
                    FixedPosition::Header => h.push(c),
                    FixedPosition::Footer => f.push(c),
                }
                (h, f)
            });

        let page = tree.geometry(id);
        let padding = tree.padding(id);

        let mut top = page.y + padding.top;
        for header in headers {
            let margin = tree.margin(header);
            let height = tree.geometry(header).height.unwrap_or(0.0);
            let target = top + margin.top;
            let dy = target - tree.geometry(header).y;
            tree.translate_subtree(header, 0.0, dy);
            top = target + height + margin.bottom;
        }

        let mut bottom = page.y + page.height.unwrap_or(0.0) - padding.bottom;
        for footer in footers.into_iter().rev() {
            let margin = tree.margin(footer);
            let height = tree.geometry(footer).height.unwrap_or(0.0);
            let target = bottom - margin.bottom - height;
            let dy = target - tree.geometry(footer).y;
            tree.translate_subtree(footer, 0.0, dy);
            bottom = target - margin.top;
        }
        Ok(())
    }
}
