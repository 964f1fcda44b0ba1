//! # Drawing Tasks
//!
//! Deferred, data-only draw instructions. The formatter chain enqueues tasks
//! on the node that produced them; nothing touches an output surface until
//! the resolved [`FinalDrawProgram`] is executed. That gap is what lets the
//! runtime resolution pass throw away a placeholder's tasks and replace them
//! after pagination.

use serde::Serialize;

use crate::error::Result;
use crate::image_loader::{DecodedImage, ImageRef};
use crate::style::Color;

/// One deferred draw operation. Coordinates are absolute page coordinates,
/// origin top-left; text positions name the top-left corner of the row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum DrawingTask {
    /// A run of text.
    #[serde(rename_all = "camelCase")]
    Text {
        x: f64,
        y: f64,
        text: String,
        font_family: String,
        font_size: f64,
        color: Color,
    },
    /// A list-item marker.
    #[serde(rename_all = "camelCase")]
    Marker {
        x: f64,
        y: f64,
        text: String,
        font_family: String,
        font_size: f64,
        color: Color,
    },
    /// An image stretched to the given box.
    Image {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        image: ImageRef,
    },
    /// A filled rectangle (node background).
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        fill: Color,
    },
}

impl DrawingTask {
    pub fn origin(&self) -> (f64, f64) {
        match self {
            DrawingTask::Text { x, y, .. }
            | DrawingTask::Marker { x, y, .. }
            | DrawingTask::Image { x, y, .. }
            | DrawingTask::Rect { x, y, .. } => (*x, *y),
        }
    }

    /// Text painted by this task, for text runs and markers.
    pub fn text(&self) -> Option<&str> {
        match self {
            DrawingTask::Text { text, .. } | DrawingTask::Marker { text, .. } => Some(text),
            _ => None,
        }
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        match self {
            DrawingTask::Text { x, y, .. }
            | DrawingTask::Marker { x, y, .. }
            | DrawingTask::Image { x, y, .. }
            | DrawingTask::Rect { x, y, .. } => {
                *x += dx;
                *y += dy;
            }
        }
    }

    /// Run this task against an output surface.
    pub fn execute(&self, gc: &mut dyn GraphicsContext) {
        match self {
            DrawingTask::Text {
                x,
                y,
                text,
                font_family,
                font_size,
                color,
            } => gc.draw_text(*x, *y, text, font_family, *font_size, *color),
            DrawingTask::Marker {
                x,
                y,
                text,
                font_family,
                font_size,
                color,
            } => gc.draw_marker(*x, *y, text, font_family, *font_size, *color),
            DrawingTask::Image {
                x,
                y,
                width,
                height,
                image,
            } => gc.draw_image(image.image(), *x, *y, *x + *width, *y + *height),
            DrawingTask::Rect {
                x,
                y,
                width,
                height,
                fill,
            } => gc.fill_rect(*x, *y, *width, *height, *fill),
        }
    }
}

/// Per-node FIFO of pending drawing tasks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskQueue {
    tasks: Vec<DrawingTask>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a task. Records intent only.
    pub fn enqueue(&mut self, task: DrawingTask) {
        self.tasks.push(task);
    }

    /// Take all tasks in FIFO order, leaving the queue empty.
    pub fn drain(&mut self) -> Vec<DrawingTask> {
        std::mem::take(&mut self.tasks)
    }

    /// Swap in a new set of tasks, returning the discarded ones.
    pub fn replace(&mut self, tasks: Vec<DrawingTask>) -> Vec<DrawingTask> {
        std::mem::replace(&mut self.tasks, tasks)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DrawingTask> {
        self.tasks.iter()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub(crate) fn translate(&mut self, dx: f64, dy: f64) {
        for task in &mut self.tasks {
            task.translate(dx, dy);
        }
    }
}

/// The output surface drawing tasks are executed against.
pub trait GraphicsContext {
    fn begin_page(&mut self, number: usize, width: f64, height: f64);
    fn draw_text(&mut self, x: f64, y: f64, text: &str, font_family: &str, font_size: f64, color: Color);
    fn draw_marker(&mut self, x: f64, y: f64, text: &str, font_family: &str, font_size: f64, color: Color);
    fn draw_image(&mut self, image: &DecodedImage, x1: f64, y1: f64, x2: f64, y2: f64);
    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: Color);
    fn end_page(&mut self) {}
}

/// The resolved instruction stream of one physical page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageProgram {
    /// 1-based page number as reported by the page context.
    pub number: usize,
    pub width: f64,
    pub height: f64,
    pub tasks: Vec<DrawingTask>,
}

impl PageProgram {
    /// Texts of all text runs on this page, in draw order.
    pub fn texts(&self) -> Vec<&str> {
        self.tasks
            .iter()
            .filter(|t| matches!(t, DrawingTask::Text { .. }))
            .filter_map(DrawingTask::text)
            .collect()
    }
}

/// Final draw instructions for a whole document, after runtime resolution.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FinalDrawProgram {
    pub pages: Vec<PageProgram>,
}

impl FinalDrawProgram {
    /// Execute every page's tasks in order.
    pub fn execute(&self, gc: &mut dyn GraphicsContext) {
        for page in &self.pages {
            gc.begin_page(page.number, page.width, page.height);
            for task in &page.tasks {
                task.execute(gc);
            }
            gc.end_page();
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
