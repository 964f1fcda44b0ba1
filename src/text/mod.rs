//! # Text Flow
//!
//! Word wrapping and box sizing for text nodes.
//!
//! Content is split into words on runs of whitespace, each word is measured
//! through the [`FontMetrics`] collaborator, and words are packed greedily
//! into rows. The widest row and the row count then size the node.
//!
//! The comparison width depends on display mode. A block node wraps against
//! its own content width. An inline node starts wherever its parent's flow
//! left off, so its first row gets whatever is left of the nearest block
//! ancestor's content box; later rows wrap against that ancestor's full
//! content width minus the node's margins. Only inline nodes re-measure per
//! row.

pub mod utf8;

use crate::draw::{DrawingTask, TaskQueue};
use crate::font::FontMetrics;
use crate::style::{Color, Display};
use crate::tree::{Attribute, NodeId, NodeTree};

pub use utf8::{char_codes, Utf8Walker};

/// Slack for float noise when re-wrapping text into a width that was
/// computed from the same measurements.
const FIT_EPSILON: f64 = 1e-6;

/// One wrapped row of a text node.
#[derive(Debug, Clone, PartialEq)]
pub struct LinePart {
    words: Vec<String>,
    width: f64,
    x: f64,
    y: f64,
    tasks: TaskQueue,
}

impl LinePart {
    pub fn new(words: Vec<String>, width: f64, x: f64, y: f64) -> Self {
        Self {
            words,
            width,
            x,
            y,
            tasks: TaskQueue::new(),
        }
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// The row as rendered: words joined by single spaces.
    pub fn text(&self) -> String {
        self.words.join(" ")
    }

    /// Measured width, without a trailing space.
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Top-left corner of the row.
    pub fn origin(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    pub fn tasks(&self) -> &TaskQueue {
        &self.tasks
    }

    pub fn tasks_mut(&mut self) -> &mut TaskQueue {
        &mut self.tasks
    }

    pub(crate) fn translate(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
        self.tasks.translate(dx, dy);
    }

    /// The text-run task that paints this row.
    pub fn render_task(&self, style: &TextStyle) -> DrawingTask {
        DrawingTask::Text {
            x: self.x,
            y: self.y,
            text: self.text(),
            font_family: style.font_family.clone(),
            font_size: style.font_size,
            color: style.color,
        }
    }
}

/// The resolved font and color of a text node.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font_family: String,
    pub font_size: f64,
    pub color: Color,
}

impl TextStyle {
    pub fn of(tree: &NodeTree, id: NodeId) -> Self {
        Self {
            font_family: tree.font_family(id),
            font_size: tree.font_size(id),
            color: tree.color(id, Attribute::Color),
        }
    }
}

/// Comparison widths for the first row and every row after it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WrapWidths {
    pub first: f64,
    pub rest: f64,
}

impl WrapWidths {
    pub fn uniform(width: f64) -> Self {
        Self {
            first: width,
            rest: width,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WrappedRow {
    pub words: Vec<String>,
    pub width: f64,
}

/// Result of wrapping a text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WrappedText {
    pub rows: Vec<WrappedRow>,
}

impl WrappedText {
    /// Width of the widest row; zero when there are no rows.
    pub fn max_line(&self) -> f64 {
        self.rows.iter().map(|r| r.width).fold(0.0, f64::max)
    }

    /// Width of the last row; zero when there are no rows.
    pub fn trailing_width(&self) -> f64 {
        self.rows.last().map_or(0.0, |r| r.width)
    }
}

/// The word-wrap engine.
pub struct TextFlow<'a> {
    metrics: &'a dyn FontMetrics,
}

impl<'a> TextFlow<'a> {
    pub fn new(metrics: &'a dyn FontMetrics) -> Self {
        Self { metrics }
    }

    /// Width of `text` in points.
    pub fn text_width(&self, font: &str, size: f64, text: &str) -> f64 {
        self.bytes_width(font, size, text.as_bytes())
    }

    /// Width of raw UTF-8 bytes; malformed sequences count as zero width.
    pub fn bytes_width(&self, font: &str, size: f64, bytes: &[u8]) -> f64 {
        if size == 0.0 {
            return 0.0;
        }
        self.metrics.measure(font, size, &char_codes(bytes))
    }

    /// Greedily pack the words of `text` into rows.
    ///
    /// A word joins the current row while `row + word <= comparison`, where
    /// `row` already counts one space after every earlier word. A closed
    /// row's width excludes its trailing space. A word wider than the
    /// comparison width still gets a row of its own.
    pub fn wrap(&self, text: &str, font: &str, size: f64, widths: WrapWidths) -> WrappedText {
        let space = self.text_width(font, size, " ");
        let mut rows = Vec::new();
        let mut words: Vec<String> = Vec::new();
        let mut row_width = 0.0;
        let mut comparison = widths.first;

        for word in text.split_whitespace() {
            let word_width = self.text_width(font, size, word);
            if !words.is_empty() && row_width + word_width > comparison + FIT_EPSILON {
                rows.push(WrappedRow {
                    words: std::mem::take(&mut words),
                    width: row_width - space,
                });
                row_width = 0.0;
                comparison = widths.rest;
            }
            words.push(word.to_string());
            row_width += word_width + space;
        }
        if !words.is_empty() {
            rows.push(WrappedRow {
                words,
                width: row_width - space,
            });
        }

        WrappedText { rows }
    }

    /// Wrap a text node and size its box.
    ///
    /// Inline nodes always take the widest row as their content width; block
    /// nodes only grow when a row is wider than the width already assigned.
    pub fn format_node(&self, tree: &mut NodeTree, id: NodeId) {
        let style = TextStyle::of(tree, id);
        let line_height = tree.line_height(id);
        let padding = tree.padding(id);
        let display = tree.display(id);
        let origin = RowOrigin::of(tree, id);

        let widths = match display {
            Display::Block => WrapWidths::uniform(tree.width_without_paddings(id)),
            Display::Inline => inline_widths(tree, id, origin.x),
        };

        let content = tree.content(id);
        let wrapped = self.wrap(&content, &style.font_family, style.font_size, widths);
        let max_line = wrapped.max_line();
        log::debug!(
            "wrapped {} into {} rows (max line {:.2}, comparison {:.2})",
            tree.label(id),
            wrapped.rows.len(),
            max_line,
            widths.first
        );

        let parts = origin.place(wrapped, line_height);
        let row_count = parts.len() as f64;
        let geometry = tree.geometry_mut(id);
        if display == Display::Inline || geometry.width.map_or(true, |w| max_line > w) {
            geometry.width = Some(max_line + padding.horizontal());
        }
        geometry.height = Some(line_height * row_count + padding.vertical());
        tree.node_mut(id).line_parts = parts;
    }

    /// Re-wrap a node whose box is already final, keeping its size.
    ///
    /// Used when a runtime node's real text replaces its filler. Every row
    /// wraps against the node's fixed content width and starts where the
    /// first layout started it.
    pub fn rewrap_fixed(&self, tree: &mut NodeTree, id: NodeId) {
        let style = TextStyle::of(tree, id);
        let line_height = tree.line_height(id);
        let origin = RowOrigin::of(tree, id);
        let width = tree.width_without_paddings(id);

        let content = tree.content(id);
        let wrapped = self.wrap(
            &content,
            &style.font_family,
            style.font_size,
            WrapWidths::uniform(width),
        );
        tree.node_mut(id).line_parts = origin.place(wrapped, line_height);
    }
}

/// Comparison widths for an inline node.
///
/// The first row gets what is left of the nearest block ancestor's content
/// width after the node's offset from its parent's content edge. Later rows
/// wrap against the parent's width minus the node's own margins.
fn inline_widths(tree: &NodeTree, id: NodeId, content_x: f64) -> WrapWidths {
    let margin = tree.margin(id);
    let parent = tree.parent(id);
    let area_width = tree
        .block_ancestor(id)
        .map_or_else(|| tree.width_without_paddings(id), |a| tree.width_without_paddings(a));
    let parent_x = parent.map_or(content_x, |p| tree.start_drawing_point(p).0);
    let parent_width = parent
        .and_then(|p| tree.geometry(p).width)
        .unwrap_or(area_width);

    WrapWidths {
        first: (area_width - (content_x - parent_x)).max(0.0),
        rest: (parent_width - margin.horizontal()).max(0.0),
    }
}

/// Where a node's rows start: the first at the node's content corner, the
/// rest of an inline node back at its block ancestor's content edge.
#[derive(Debug, Clone, Copy)]
struct RowOrigin {
    x: f64,
    y: f64,
    continuation_x: f64,
}

impl RowOrigin {
    fn of(tree: &NodeTree, id: NodeId) -> Self {
        let (x, y) = tree.start_drawing_point(id);
        let continuation_x = match tree.display(id) {
            Display::Block => x,
            Display::Inline => {
                let area_left = tree
                    .block_ancestor(id)
                    .map_or(x, |a| tree.start_drawing_point(a).0);
                area_left + tree.margin(id).left + tree.padding(id).left
            }
        };
        Self { x, y, continuation_x }
    }

    fn place(&self, wrapped: WrappedText, line_height: f64) -> Vec<LinePart> {
        wrapped
            .rows
            .into_iter()
            .enumerate()
            .map(|(i, row)| {
                let x = if i == 0 { self.x } else { self.continuation_x };
                LinePart::new(row.words, row.width, x, self.y + i as f64 * line_height)
            })
            .collect()
    }
}
