//! # Flowchart Renderer
//!
//! Layered canvas renderer driven by dirty-region invalidation.
//!
//! ## Frame Flow
//!
//! ```text
//! ┌──────────────┐  mark_dirty   ┌──────────────┐  request_frame  ┌───────────┐
//! │ add / update │ ────────────▶ │ DirtyTracker │ ──────────────▶ │ Scheduler │
//! │ set_viewport │               └──────────────┘   (at most one) └─────┬─────┘
//! └──────────────┘                                                      │
//!                                  on_animation_frame ◀─────────────────┘
//!                                          │
//!                                          ▼
//!                         render: grid → layers → overlays
//! ```
//!
//! Surfaces implement [`RenderContext`]. [`RecordingContext`] runs anywhere;
//! the `wasm` feature adds a `CanvasRenderingContext2d` backend and a
//! `requestAnimationFrame` scheduler.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod dirty;
pub mod error;
pub mod layer;
pub mod overlay;
pub mod renderer;
pub mod scheduler;

pub use backend::recording::{DrawCommand, RecordingContext};
pub use backend::RenderContext;
pub use dirty::{DirtyRect, DirtyTracker};
pub use error::{RenderError, RenderResult};
pub use layer::{Drawable, RenderLayer, RenderObject, RenderObjectId, RenderObjectPatch};
pub use overlay::{Guides, RenderData, TempConnection};
pub use renderer::{FrameOutcome, FrameReport, SceneRenderer};
pub use scheduler::{FrameHandle, FrameScheduler, ManualScheduler};

#[cfg(feature = "wasm")]
pub use backend::canvas2d::{AnimationFrameScheduler, Canvas2dContext, FrameCallback};

/// Configuration for the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    /// Draw the background grid.
    pub show_grid: bool,
    /// Grid spacing in world units.
    pub grid_size: f64,
    /// Grid spacing on screen below which the grid is skipped (moiré).
    pub min_grid_pixel_size: f64,
    /// Device pixels per logical pixel.
    pub pixel_ratio: f64,
    /// Grid line color.
    pub grid_color: String,
    /// Fill behind everything; `None` leaves the canvas transparent.
    pub background_color: Option<String>,
    /// Selection box fill.
    pub selection_fill: String,
    /// Selection box outline.
    pub selection_stroke: String,
    /// Alignment guide color.
    pub guide_color: String,
    /// Connection preview color.
    pub temp_connection_color: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            show_grid: true,
            grid_size: 20.0,
            min_grid_pixel_size: 5.0,
            pixel_ratio: 1.0,
            grid_color: "#e8e8e8".to_string(),
            background_color: None,
            selection_fill: "rgba(24, 144, 255, 0.1)".to_string(),
            selection_stroke: "#1890ff".to_string(),
            guide_color: "#ff4d4f".to_string(),
            temp_connection_color: "#1890ff".to_string(),
        }
    }
}

impl RendererConfig {
    /// The pixel ratio, or 1.0 if the configured one is unusable.
    #[must_use]
    pub fn effective_pixel_ratio(&self) -> f64 {
        if self.pixel_ratio.is_finite() && self.pixel_ratio > 0.0 {
            self.pixel_ratio
        } else {
            1.0
        }
    }
}
