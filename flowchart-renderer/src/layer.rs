//! Render layers and the objects registered on them.
//!
//! ```text
//!   Background → Grid → Edges → Nodes → Selection → Ui
//!   (painted first)                     (painted last)
//! ```
//!
//! Within a layer, lower `priority` paints first; ties keep registration
//! order.

use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use flowchart_core::{Rect, Viewport};
use serde::{Deserialize, Serialize};

use crate::backend::RenderContext;

/// Fixed paint-order bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RenderLayer {
    /// Backdrop fills.
    Background,
    /// Objects drawn over the built-in grid.
    Grid,
    /// Connections.
    Edges,
    /// Shapes.
    Nodes,
    /// Selection decorations.
    Selection,
    /// Handles, tooltips, anything on top.
    Ui,
}

impl RenderLayer {
    /// All layers in paint order.
    pub const ALL: [Self; 6] = [
        Self::Background,
        Self::Grid,
        Self::Edges,
        Self::Nodes,
        Self::Selection,
        Self::Ui,
    ];
}

/// Something that can paint itself.
///
/// Drawables run in world coordinates: the viewport transform is already
/// applied. A returned error is logged and skips this drawable for the
/// current frame only.
pub trait Drawable {
    /// Paint onto `ctx`.
    ///
    /// # Errors
    ///
    /// Any error aborts this drawable only.
    fn draw(&self, ctx: &mut dyn RenderContext, viewport: &Viewport) -> anyhow::Result<()>;
}

impl<F> Drawable for F
where
    F: Fn(&mut dyn RenderContext, &Viewport) -> anyhow::Result<()>,
{
    fn draw(&self, ctx: &mut dyn RenderContext, viewport: &Viewport) -> anyhow::Result<()> {
        self(ctx, viewport)
    }
}

/// Caller-chosen key for a registered object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderObjectId(String);

impl RenderObjectId {
    /// Wrap an id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RenderObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RenderObjectId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RenderObjectId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A drawable plus its placement in the paint order.
#[derive(Clone)]
pub struct RenderObject {
    /// Paint bucket.
    pub layer: RenderLayer,
    /// Order within the layer, ascending.
    pub priority: i32,
    /// Hidden objects are kept but not painted.
    pub visible: bool,
    /// World-space bounds. Used for invalidation and culling; empty bounds
    /// are never culled.
    pub bounds: Rect,
    /// The paint callback.
    pub drawable: Rc<dyn Drawable>,
}

impl RenderObject {
    /// Visible object at priority 0 with empty bounds.
    pub fn new(layer: RenderLayer, drawable: impl Drawable + 'static) -> Self {
        Self {
            layer,
            priority: 0,
            visible: true,
            bounds: Rect::default(),
            drawable: Rc::new(drawable),
        }
    }

    /// Set the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the world bounds.
    #[must_use]
    pub fn with_bounds(mut self, bounds: Rect) -> Self {
        self.bounds = bounds;
        self
    }

    /// Start hidden.
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Paint order key.
    pub(crate) fn paint_order(&self, other: &Self) -> Ordering {
        self.layer
            .cmp(&other.layer)
            .then(self.priority.cmp(&other.priority))
    }
}

impl fmt::Debug for RenderObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderObject")
            .field("layer", &self.layer)
            .field("priority", &self.priority)
            .field("visible", &self.visible)
            .field("bounds", &self.bounds)
            .finish_non_exhaustive()
    }
}

/// Partial update for a registered object.
#[derive(Clone, Default)]
pub struct RenderObjectPatch {
    /// New layer.
    pub layer: Option<RenderLayer>,
    /// New priority.
    pub priority: Option<i32>,
    /// New visibility.
    pub visible: Option<bool>,
    /// New world bounds.
    pub bounds: Option<Rect>,
    /// New paint callback.
    pub drawable: Option<Rc<dyn Drawable>>,
}

impl RenderObjectPatch {
    /// Patch that only moves/resizes.
    #[must_use]
    pub fn bounds(bounds: Rect) -> Self {
        Self {
            bounds: Some(bounds),
            ..Self::default()
        }
    }

    /// Patch that only toggles visibility.
    #[must_use]
    pub fn visible(visible: bool) -> Self {
        Self {
            visible: Some(visible),
            ..Self::default()
        }
    }

    pub(crate) fn apply_to(&self, object: &mut RenderObject) {
        if let Some(layer) = self.layer {
            object.layer = layer;
        }
        if let Some(priority) = self.priority {
            object.priority = priority;
        }
        if let Some(visible) = self.visible {
            object.visible = visible;
        }
        if let Some(bounds) = self.bounds {
            object.bounds = bounds;
        }
        if let Some(drawable) = &self.drawable {
            object.drawable = Rc::clone(drawable);
        }
    }
}

impl fmt::Debug for RenderObjectPatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderObjectPatch")
            .field("layer", &self.layer)
            .field("priority", &self.priority)
            .field("visible", &self.visible)
            .field("bounds", &self.bounds)
            .field("drawable", &self.drawable.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &mut dyn RenderContext, _: &Viewport) -> anyhow::Result<()> {
        Ok(())
    }

    #[test]
    fn test_layers_are_ordered() {
        let mut sorted = RenderLayer::ALL;
        sorted.reverse();
        sorted.sort();
        assert_eq!(sorted, RenderLayer::ALL);
        assert!(RenderLayer::Edges < RenderLayer::Nodes);
    }

    #[test]
    fn test_paint_order_uses_layer_then_priority() {
        let edge = RenderObject::new(RenderLayer::Edges, noop).with_priority(100);
        let node = RenderObject::new(RenderLayer::Nodes, noop).with_priority(-5);
        let node_late = RenderObject::new(RenderLayer::Nodes, noop).with_priority(3);

        assert_eq!(edge.paint_order(&node), Ordering::Less);
        assert_eq!(node.paint_order(&node_late), Ordering::Less);
        assert_eq!(node.paint_order(&node), Ordering::Equal);
    }

    #[test]
    fn test_patch_applies_only_set_fields() {
        let mut object = RenderObject::new(RenderLayer::Nodes, noop)
            .with_bounds(Rect::new(0.0, 0.0, 10.0, 10.0));
        RenderObjectPatch::visible(false).apply_to(&mut object);

        assert!(!object.visible);
        assert_eq!(object.layer, RenderLayer::Nodes);
        assert_eq!(object.bounds, Rect::new(0.0, 0.0, 10.0, 10.0));
    }
}
