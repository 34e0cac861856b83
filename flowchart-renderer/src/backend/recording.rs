//! Headless backend that records every draw call.
//!
//! Clones share one log, so a test can keep a handle while the renderer owns
//! the surface.

use std::cell::RefCell;
use std::rc::Rc;

use flowchart_core::Rect;
use serde::Serialize;

use super::RenderContext;
use crate::{RenderError, RenderResult};

/// One recorded call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
#[allow(missing_docs)]
pub enum DrawCommand {
    Save,
    Restore,
    SetTransform { matrix: [f64; 6] },
    Translate { x: f64, y: f64 },
    Scale { x: f64, y: f64 },
    ClearRect { rect: Rect },
    FillRect { rect: Rect },
    StrokeRect { rect: Rect },
    BeginPath,
    MoveTo { x: f64, y: f64 },
    LineTo { x: f64, y: f64 },
    Rect { rect: Rect },
    Stroke,
    Fill,
    FillText { text: String, x: f64, y: f64 },
    FillStyle { style: String },
    StrokeStyle { style: String },
    LineWidth { width: f64 },
    LineDash { segments: Vec<f64> },
    GlobalAlpha { alpha: f64 },
    Font { font: String },
    Resize { width: u32, height: u32 },
}

#[derive(Debug, Default)]
struct Recording {
    commands: Vec<DrawCommand>,
    depth: usize,
    max_depth: usize,
    unbalanced_restores: usize,
    width: u32,
    height: u32,
}

/// A [`RenderContext`] that draws nothing and logs everything.
#[derive(Debug, Clone, Default)]
pub struct RecordingContext {
    inner: Rc<RefCell<Recording>>,
}

impl RecordingContext {
    /// A surface of `width` x `height` device pixels.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Recording {
                width,
                height,
                ..Recording::default()
            })),
        }
    }

    /// Copy of the log so far.
    #[must_use]
    pub fn commands(&self) -> Vec<DrawCommand> {
        self.inner.borrow().commands.clone()
    }

    /// Number of recorded calls.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().commands.len()
    }

    /// True if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().commands.is_empty()
    }

    /// Number of calls matching `pred`.
    pub fn count(&self, pred: impl Fn(&DrawCommand) -> bool) -> usize {
        self.inner.borrow().commands.iter().filter(|c| pred(c)).count()
    }

    /// Drop the log; surface size and save depth are kept.
    pub fn clear(&self) {
        self.inner.borrow_mut().commands.clear();
    }

    /// Current save/restore nesting.
    #[must_use]
    pub fn save_depth(&self) -> usize {
        self.inner.borrow().depth
    }

    /// Deepest nesting seen.
    #[must_use]
    pub fn max_save_depth(&self) -> usize {
        self.inner.borrow().max_depth
    }

    /// `restore` calls made with nothing saved.
    #[must_use]
    pub fn unbalanced_restores(&self) -> usize {
        self.inner.borrow().unbalanced_restores
    }

    /// The log as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.inner.borrow().commands)
    }

    fn push(&self, command: DrawCommand) {
        self.inner.borrow_mut().commands.push(command);
    }
}

impl RenderContext for RecordingContext {
    fn save(&mut self) {
        let mut inner = self.inner.borrow_mut();
        inner.depth += 1;
        inner.max_depth = inner.max_depth.max(inner.depth);
        inner.commands.push(DrawCommand::Save);
    }

    fn restore(&mut self) {
        let mut inner = self.inner.borrow_mut();
        if inner.depth == 0 {
            inner.unbalanced_restores += 1;
        } else {
            inner.depth -= 1;
        }
        inner.commands.push(DrawCommand::Restore);
    }

    fn set_transform(&mut self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) {
        self.push(DrawCommand::SetTransform {
            matrix: [a, b, c, d, e, f],
        });
    }

    fn translate(&mut self, x: f64, y: f64) {
        self.push(DrawCommand::Translate { x, y });
    }

    fn scale(&mut self, x: f64, y: f64) {
        self.push(DrawCommand::Scale { x, y });
    }

    fn clear_rect(&mut self, rect: Rect) {
        self.push(DrawCommand::ClearRect { rect });
    }

    fn fill_rect(&mut self, rect: Rect) {
        self.push(DrawCommand::FillRect { rect });
    }

    fn stroke_rect(&mut self, rect: Rect) {
        self.push(DrawCommand::StrokeRect { rect });
    }

    fn begin_path(&mut self) {
        self.push(DrawCommand::BeginPath);
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.push(DrawCommand::MoveTo { x, y });
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.push(DrawCommand::LineTo { x, y });
    }

    fn rect(&mut self, rect: Rect) {
        self.push(DrawCommand::Rect { rect });
    }

    fn stroke(&mut self) {
        self.push(DrawCommand::Stroke);
    }

    fn fill(&mut self) {
        self.push(DrawCommand::Fill);
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64) {
        self.push(DrawCommand::FillText {
            text: text.to_string(),
            x,
            y,
        });
    }

    fn set_fill_style(&mut self, style: &str) {
        self.push(DrawCommand::FillStyle {
            style: style.to_string(),
        });
    }

    fn set_stroke_style(&mut self, style: &str) {
        self.push(DrawCommand::StrokeStyle {
            style: style.to_string(),
        });
    }

    fn set_line_width(&mut self, width: f64) {
        self.push(DrawCommand::LineWidth { width });
    }

    fn set_line_dash(&mut self, segments: &[f64]) {
        self.push(DrawCommand::LineDash {
            segments: segments.to_vec(),
        });
    }

    fn set_global_alpha(&mut self, alpha: f64) {
        self.push(DrawCommand::GlobalAlpha { alpha });
    }

    fn set_font(&mut self, font: &str) {
        self.push(DrawCommand::Font {
            font: font.to_string(),
        });
    }

    fn surface_size(&self) -> (u32, u32) {
        let inner = self.inner.borrow();
        (inner.width, inner.height)
    }

    fn resize_surface(&mut self, width: u32, height: u32) -> RenderResult<()> {
        if width == 0 || height == 0 {
            return Err(RenderError::Surface(format!(
                "cannot resize to {width}x{height}"
            )));
        }
        let mut inner = self.inner.borrow_mut();
        inner.width = width;
        inner.height = height;
        inner.depth = 0;
        inner.commands.push(DrawCommand::Resize { width, height });
        Ok(())
    }
}
