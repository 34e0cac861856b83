//! Drawing surfaces.
//!
//! [`RenderContext`] is the subset of the Canvas 2D API the renderer and
//! drawables use. The recording backend is always available for headless
//! use and tests; the browser backend is behind the `wasm` feature.

#[cfg(feature = "wasm")]
pub mod canvas2d;
pub mod recording;

use flowchart_core::Rect;

use crate::RenderResult;

/// A 2D drawing surface with canvas-style state (save/restore stack,
/// current transform, current path, stroke and fill styles).
pub trait RenderContext {
    /// Push the drawing state.
    fn save(&mut self);

    /// Pop the drawing state.
    fn restore(&mut self);

    /// Replace the current transform with the matrix `[a c e; b d f]`.
    fn set_transform(&mut self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64);

    /// Append a translation to the current transform.
    fn translate(&mut self, x: f64, y: f64);

    /// Append a scale to the current transform.
    fn scale(&mut self, x: f64, y: f64);

    /// Clear pixels in `rect` to transparent.
    fn clear_rect(&mut self, rect: Rect);

    /// Fill `rect` with the fill style.
    fn fill_rect(&mut self, rect: Rect);

    /// Outline `rect` with the stroke style.
    fn stroke_rect(&mut self, rect: Rect);

    /// Start a new path.
    fn begin_path(&mut self);

    /// Move the pen without drawing.
    fn move_to(&mut self, x: f64, y: f64);

    /// Add a straight segment to the current path.
    fn line_to(&mut self, x: f64, y: f64);

    /// Add a closed rectangle to the current path.
    fn rect(&mut self, rect: Rect);

    /// Stroke the current path.
    fn stroke(&mut self);

    /// Fill the current path.
    fn fill(&mut self);

    /// Draw text with its baseline at `(x, y)`.
    fn fill_text(&mut self, text: &str, x: f64, y: f64);

    /// Set the fill style (CSS color).
    fn set_fill_style(&mut self, style: &str);

    /// Set the stroke style (CSS color).
    fn set_stroke_style(&mut self, style: &str);

    /// Set the line width in current-transform units.
    fn set_line_width(&mut self, width: f64);

    /// Set the dash pattern; empty for solid lines.
    fn set_line_dash(&mut self, segments: &[f64]);

    /// Set the global alpha.
    fn set_global_alpha(&mut self, alpha: f64);

    /// Set the font (CSS font shorthand).
    fn set_font(&mut self, font: &str);

    /// Backing-store size in device pixels.
    fn surface_size(&self) -> (u32, u32);

    /// Resize the backing store. Resizing resets the drawing state.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RenderError::Surface`] if the surface cannot be resized.
    fn resize_surface(&mut self, width: u32, height: u32) -> RenderResult<()>;
}
