use crate::error::{QuireError, Result};
use crate::image_loader::ImageRef;
use crate::tree::{Attribute, AttributeValue, NodeId, NodeKind, NodeTree};

use super::{FormatEnv, Formatter, Pass};

/// Decodes an image node's `src` once, storing the decoded image in place
/// of the source string.
pub struct ImageFormatter;

impl Formatter for ImageFormatter {
    fn name(&self) -> &'static str {
        "image"
    }

    fn pass(&self) -> Pass {
        Pass::PreFormat
    }

    fn format(&self, tree: &mut NodeTree, id: NodeId, env: &FormatEnv<'_>) -> Result<()> {
        if tree.kind(id) != &NodeKind::Image {
            return Ok(());
        }
        let src = match tree.explicit_attribute(id, Attribute::Src) {
            Some(AttributeValue::Text(src)) if !src.is_empty() => src.clone(),
            _ => return Ok(()),
        };

        let decoded = env.images.load(&src).map_err(|e| QuireError::Image {
            node: tree.label(id),
            source: Box::new(e),
        })?;
        log::debug!(
            "decoded image for {}: {}x{} px, {:?}",
            tree.label(id),
            decoded.width_px,
            decoded.height_px,
            decoded.filter
        );
        tree.set_attribute(id, Attribute::Src, AttributeValue::Image(ImageRef::new(decoded)))?;
        Ok(())
    }
}

/// Marks the page owning a runtime node so it is revisited after
/// pagination.
pub struct RuntimeFormatter;

impl Formatter for RuntimeFormatter {
    fn name(&self) -> &'static str {
        "runtime"
    }

    fn pass(&self) -> Pass {
        Pass::PreFormat
    }

    fn format(&self, tree: &mut NodeTree, id: NodeId, _env: &FormatEnv<'_>) -> Result<()> {
        if !tree.node(id).is_runtime() {
            return Ok(());
        }
        match tree.page_of(id) {
            Some(page) => tree.mark_runtime_page(page),
            None => log::debug!("{} is outside any page", tree.label(id)),
        }
        Ok(())
    }
}
