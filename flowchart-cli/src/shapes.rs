//! Plain drawables for document nodes and edges.
//!
//! Enough to see a document's structure in a headless render: boxes,
//! diamonds for decisions, and polylines through edge waypoints.

use anyhow::ensure;
use flowchart_core::{Document, EdgeData, NodeData, Point, Rect, Viewport};
use flowchart_renderer::{Drawable, RenderContext};

const DEFAULT_FILL: &str = "#ffffff";
const DEFAULT_STROKE: &str = "#595959";
const DEFAULT_EDGE: &str = "#8c8c8c";
const LABEL_COLOR: &str = "#262626";

/// A node drawn as a box, or a diamond for `decision` nodes.
#[derive(Debug, Clone)]
pub struct NodeShape {
    node: NodeData,
}

impl NodeShape {
    /// Drawable for `node`.
    #[must_use]
    pub fn new(node: NodeData) -> Self {
        Self { node }
    }

    /// World bounds.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.node.bounds()
    }
}

impl Drawable for NodeShape {
    fn draw(&self, ctx: &mut dyn RenderContext, _viewport: &Viewport) -> anyhow::Result<()> {
        let node = &self.node;
        let rect = node.bounds();
        ensure!(!rect.is_empty(), "node {} has an empty size", node.id);

        let style = &node.style;
        ctx.set_fill_style(style.fill_color.as_deref().unwrap_or(DEFAULT_FILL));
        ctx.set_stroke_style(style.stroke_color.as_deref().unwrap_or(DEFAULT_STROKE));
        ctx.set_line_width(style.stroke_width.unwrap_or(1.0));

        ctx.begin_path();
        if node.kind == "decision" {
            let c = rect.center();
            ctx.move_to(c.x, rect.y);
            ctx.line_to(rect.right(), c.y);
            ctx.line_to(c.x, rect.bottom());
            ctx.line_to(rect.x, c.y);
            ctx.line_to(c.x, rect.y);
        } else {
            ctx.rect(rect);
        }
        ctx.fill();
        ctx.stroke();

        if !node.label.is_empty() {
            let size = style.font_size.unwrap_or(14.0);
            ctx.set_font(&format!("{size}px sans-serif"));
            ctx.set_fill_style(LABEL_COLOR);
            let c = rect.center();
            ctx.fill_text(&node.label, rect.x + 8.0, c.y + size / 3.0);
        }
        Ok(())
    }
}

/// An edge drawn from source center through its waypoints to target center.
#[derive(Debug, Clone)]
pub struct EdgeShape {
    edge: EdgeData,
    points: Vec<Point>,
}

impl EdgeShape {
    /// Drawable for `edge`, or `None` if an endpoint is not in `doc`.
    #[must_use]
    pub fn new(doc: &Document, edge: &EdgeData) -> Option<Self> {
        let source = doc.node_bounds(&edge.source)?.center();
        let target = doc.node_bounds(&edge.target)?.center();
        let mut points = Vec::with_capacity(edge.waypoints.len() + 2);
        points.push(source);
        points.extend(edge.waypoints.iter().copied());
        points.push(target);
        Some(Self {
            edge: edge.clone(),
            points,
        })
    }

    /// World bounds of the polyline.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.points
            .windows(2)
            .map(|pair| Rect::from_points(pair[0], pair[1]))
            .reduce(|acc, r| acc.union(&r))
            .unwrap_or_default()
            .inflate(2.0)
    }
}

impl Drawable for EdgeShape {
    fn draw(&self, ctx: &mut dyn RenderContext, _viewport: &Viewport) -> anyhow::Result<()> {
        let style = &self.edge.style;
        ctx.set_stroke_style(style.stroke_color.as_deref().unwrap_or(DEFAULT_EDGE));
        ctx.set_line_width(style.stroke_width.unwrap_or(1.5));
        ctx.set_line_dash(&style.dash);

        let mut points = self.points.iter();
        if let Some(first) = points.next() {
            ctx.begin_path();
            ctx.move_to(first.x, first.y);
            for p in points {
                ctx.line_to(p.x, p.y);
            }
            ctx.stroke();
        }

        if !self.edge.label.is_empty() {
            let mid = self.points[self.points.len() / 2];
            ctx.set_fill_style(LABEL_COLOR);
            ctx.fill_text(&self.edge.label, mid.x, mid.y);
        }
        Ok(())
    }
}
