//! Editor overlays painted after the scene: selection box, alignment guides
//! and the connection being dragged.

use flowchart_core::{Point, Rect, Viewport};
use serde::{Deserialize, Serialize};

use crate::backend::RenderContext;
use crate::layer::Drawable;
use crate::RendererConfig;

/// Alignment guides in world coordinates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Guides {
    /// World x of each vertical guide.
    pub vertical: Vec<f64>,
    /// World y of each horizontal guide.
    pub horizontal: Vec<f64>,
}

impl Guides {
    /// True when there is nothing to draw.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertical.is_empty() && self.horizontal.is_empty()
    }
}

/// Preview of an edge being connected, in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempConnection {
    /// Anchor point.
    pub start: Point,
    /// Pointer position.
    pub end: Point,
}

impl TempConnection {
    /// World rectangle covering the line.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::from_points(self.start, self.end)
    }
}

/// Explicit content for one frame, replacing the registered objects.
///
/// Edges paint before nodes, each in slice order. Overlays set here take
/// precedence over the renderer's persistent overlay state.
#[derive(Default)]
pub struct RenderData<'a> {
    /// Edge drawables.
    pub edges: Vec<&'a dyn Drawable>,
    /// Node drawables.
    pub nodes: Vec<&'a dyn Drawable>,
    /// Selection rectangle, world space.
    pub selection_box: Option<Rect>,
    /// Alignment guides.
    pub guides: Option<Guides>,
    /// Connection preview.
    pub temp_connection: Option<TempConnection>,
}

/// Overlay state kept between frames.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Overlays {
    pub selection_box: Option<Rect>,
    pub guides: Option<Guides>,
    pub temp_connection: Option<TempConnection>,
}

pub(crate) fn draw_selection_box(
    ctx: &mut dyn RenderContext,
    viewport: &Viewport,
    rect: Rect,
    config: &RendererConfig,
) {
    let px = 1.0 / viewport.scale;
    ctx.save();
    ctx.set_fill_style(&config.selection_fill);
    ctx.fill_rect(rect);
    ctx.set_stroke_style(&config.selection_stroke);
    ctx.set_line_width(px);
    ctx.set_line_dash(&[4.0 * px, 4.0 * px]);
    ctx.stroke_rect(rect);
    ctx.restore();
}

pub(crate) fn draw_guides(
    ctx: &mut dyn RenderContext,
    viewport: &Viewport,
    guides: &Guides,
    config: &RendererConfig,
) {
    let visible = viewport.visible_world_rect();
    let px = 1.0 / viewport.scale;
    ctx.save();
    ctx.set_stroke_style(&config.guide_color);
    ctx.set_line_width(px);
    ctx.set_line_dash(&[5.0 * px, 5.0 * px]);
    ctx.begin_path();
    for &x in &guides.vertical {
        ctx.move_to(x, visible.y);
        ctx.line_to(x, visible.bottom());
    }
    for &y in &guides.horizontal {
        ctx.move_to(visible.x, y);
        ctx.line_to(visible.right(), y);
    }
    ctx.stroke();
    ctx.restore();
}

pub(crate) fn draw_temp_connection(
    ctx: &mut dyn RenderContext,
    viewport: &Viewport,
    connection: &TempConnection,
    config: &RendererConfig,
) {
    let px = 1.0 / viewport.scale;
    ctx.save();
    ctx.set_stroke_style(&config.temp_connection_color);
    ctx.set_line_width(2.0 * px);
    ctx.set_line_dash(&[6.0 * px, 4.0 * px]);
    ctx.begin_path();
    ctx.move_to(connection.start.x, connection.start.y);
    ctx.line_to(connection.end.x, connection.end.y);
    ctx.stroke();
    ctx.restore();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::recording::{DrawCommand, RecordingContext};

    #[test]
    fn test_overlays_are_self_contained() {
        let mut ctx = RecordingContext::new(800, 600);
        let viewport = Viewport::with_size(800.0, 600.0);
        let config = RendererConfig::default();

        draw_selection_box(&mut ctx, &viewport, Rect::new(0.0, 0.0, 5.0, 5.0), &config);
        draw_guides(
            &mut ctx,
            &viewport,
            &Guides {
                vertical: vec![10.0],
                horizontal: vec![20.0, 30.0],
            },
            &config,
        );
        draw_temp_connection(
            &mut ctx,
            &viewport,
            &TempConnection {
                start: Point::new(0.0, 0.0),
                end: Point::new(50.0, 50.0),
            },
            &config,
        );

        assert_eq!(ctx.save_depth(), 0);
        assert_eq!(ctx.count(|c| matches!(c, DrawCommand::Save)), 3);
        assert_eq!(ctx.count(|c| matches!(c, DrawCommand::MoveTo { .. })), 4);
    }

    #[test]
    fn test_temp_connection_bounds_normalize() {
        let c = TempConnection {
            start: Point::new(10.0, 10.0),
            end: Point::new(0.0, 5.0),
        };
        assert_eq!(c.bounds(), Rect::new(0.0, 5.0, 10.0, 5.0));
    }
}
