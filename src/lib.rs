//! # Quire
//!
//! A layout engine that turns a tree of attributed nodes into positioned
//! draw instructions across pages, resolving page numbers and page counts
//! only after the whole document has been measured.
//!
//! ## Architecture
//!
//! ```text
//! Input (JSON/API)
//!       ↓
//!   [model]    document description, built into a node tree
//!       ↓
//!   [format]   formatter chain: geometry, text flow, lists, drawing tasks
//!       ↓
//!   [layout]   pagination into physical pages
//!       ↓
//!   [runtime]  placeholder resolution against the final page numbers
//!       ↓
//!   [draw]     final draw program, executed on a graphics context
//! ```

pub mod draw;
pub mod error;
pub mod font;
pub mod format;
pub mod image_loader;
pub mod layout;
pub mod list;
pub mod model;
pub mod runtime;
pub mod style;
pub mod text;
pub mod tree;

pub use error::{QuireError, Result};

use draw::FinalDrawProgram;
use font::{FontContext, MeasureCache};
use format::FormatEnv;
use image_loader::RasterDecoder;
use layout::LayoutEngine;
use list::StrategyRegistry;
use model::Document;

/// Lay out a document and resolve it into draw instructions.
///
/// This is the primary entry point. Custom fonts are registered first; any
/// geometry error aborts the build and names the offending node.
pub fn render(document: &Document) -> Result<FinalDrawProgram> {
    let mut fonts = FontContext::new();
    for font in &document.fonts {
        fonts.register_base64(&font.family, &font.src)?;
    }
    let metrics = MeasureCache::new(&fonts);
    let strategies = StrategyRegistry::new();
    let env = FormatEnv {
        metrics: &metrics,
        strategies: &strategies,
        images: &RasterDecoder,
    };

    let tree = document.build()?;
    let engine = LayoutEngine::new().with_default_page(document.default_page.clone());
    let result = engine.layout(tree, &env)?;
    log::info!(
        "laid out {} nodes onto {} pages",
        result.tree().len(),
        result.page_count()
    );
    let program = result.resolve_paginated(&metrics)?;
    log::debug!("{} cached text measurements", metrics.len());
    Ok(program)
}

/// Render a document described as JSON to a JSON draw program.
pub fn render_json(json: &str) -> Result<String> {
    let document: Document = serde_json::from_str(json)?;
    render(&document)?.to_json()
}
