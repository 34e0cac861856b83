//! World-to-screen transform.
//!
//! `screen = world * scale + offset`. The scale is clamped to
//! [`MIN_SCALE`, `MAX_SCALE`] on every write path, including deserialization
//! through [`Viewport::normalized`].

use serde::{Deserialize, Serialize};

use crate::{Point, Rect, Size};

/// Smallest allowed zoom factor.
pub const MIN_SCALE: f64 = 0.1;

/// Largest allowed zoom factor.
pub const MAX_SCALE: f64 = 10.0;

/// Clamp a zoom factor into the allowed range. NaN collapses to 1.0.
#[must_use]
pub fn clamp_scale(scale: f64) -> f64 {
    if scale.is_nan() {
        1.0
    } else {
        scale.clamp(MIN_SCALE, MAX_SCALE)
    }
}

/// Scale, pan offset and logical canvas size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Viewport {
    /// Zoom factor (1.0 = 100%).
    pub scale: f64,
    /// Screen-space translation applied after scaling.
    pub offset: Point,
    /// Logical size of the canvas in CSS pixels.
    pub size: Size,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset: Point::default(),
            size: Size::new(800.0, 600.0),
        }
    }
}

/// Partial viewport update. `None` fields are left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewportPatch {
    /// New zoom factor (clamped on apply).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    /// New pan offset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<Point>,
    /// New logical size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,
}

impl ViewportPatch {
    /// Patch that only changes the scale.
    #[must_use]
    pub fn scale(scale: f64) -> Self {
        Self {
            scale: Some(scale),
            ..Self::default()
        }
    }

    /// Patch that only changes the offset.
    #[must_use]
    pub fn offset(x: f64, y: f64) -> Self {
        Self {
            offset: Some(Point::new(x, y)),
            ..Self::default()
        }
    }

    /// Patch that only changes the size.
    #[must_use]
    pub fn size(width: f64, height: f64) -> Self {
        Self {
            size: Some(Size::new(width, height)),
            ..Self::default()
        }
    }
}

/// Which parts of a viewport a patch actually changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewportChange {
    /// Scale or offset moved: everything on screen is stale.
    pub transform: bool,
    /// Logical size changed.
    pub size: bool,
}

impl ViewportChange {
    /// True if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.transform && !self.size
    }
}

impl Viewport {
    /// Viewport of the given logical size at 100% with no pan.
    #[must_use]
    pub fn with_size(width: f64, height: f64) -> Self {
        Self {
            size: Size::new(width, height),
            ..Self::default()
        }
    }

    /// Copy with the scale clamped into range. A non-finite offset or size
    /// is reset to zero.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.scale = clamp_scale(self.scale);
        if !(self.offset.x.is_finite() && self.offset.y.is_finite()) {
            self.offset = Point::default();
        }
        if !(self.size.width.is_finite() && self.size.height.is_finite()) {
            self.size = Size::default();
        }
        self
    }

    /// Merge a patch. The whole patch is computed first and written in one
    /// assignment, so no caller can observe a half-applied update. A
    /// non-finite offset or size leaves that field as it was.
    pub fn apply(&mut self, patch: &ViewportPatch) -> ViewportChange {
        let next = Self {
            scale: patch.scale.map_or(self.scale, clamp_scale),
            offset: patch
                .offset
                .filter(|o| o.x.is_finite() && o.y.is_finite())
                .unwrap_or(self.offset),
            size: patch
                .size
                .filter(|s| s.width.is_finite() && s.height.is_finite())
                .unwrap_or(self.size),
        };
        #[allow(clippy::float_cmp)]
        let change = ViewportChange {
            transform: next.scale != self.scale || next.offset != self.offset,
            size: next.size != self.size,
        };
        *self = next;
        change
    }

    /// Map a world point to screen space.
    #[must_use]
    pub fn world_to_screen(&self, p: Point) -> Point {
        Point::new(
            p.x * self.scale + self.offset.x,
            p.y * self.scale + self.offset.y,
        )
    }

    /// Map a screen point to world space.
    #[must_use]
    pub fn screen_to_world(&self, p: Point) -> Point {
        Point::new(
            (p.x - self.offset.x) / self.scale,
            (p.y - self.offset.y) / self.scale,
        )
    }

    /// Map a world rectangle to screen space.
    #[must_use]
    pub fn world_rect_to_screen(&self, r: &Rect) -> Rect {
        let origin = self.world_to_screen(Point::new(r.x, r.y));
        Rect::new(
            origin.x,
            origin.y,
            r.width * self.scale,
            r.height * self.scale,
        )
    }

    /// The canvas rectangle in screen space.
    #[must_use]
    pub fn screen_rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.size.width, self.size.height)
    }

    /// The part of the world currently visible on the canvas.
    #[must_use]
    pub fn visible_world_rect(&self) -> Rect {
        let top_left = self.screen_to_world(Point::default());
        Rect::new(
            top_left.x,
            top_left.y,
            self.size.width / self.scale,
            self.size.height / self.scale,
        )
    }

    /// Multiply the scale by `factor`, keeping the world point under the
    /// screen-space `anchor` fixed.
    pub fn zoom_at(&mut self, factor: f64, anchor: Point) -> ViewportChange {
        let world = self.screen_to_world(anchor);
        let scale = clamp_scale(self.scale * factor);
        let offset = Point::new(anchor.x - world.x * scale, anchor.y - world.y * scale);
        self.apply(&ViewportPatch {
            scale: Some(scale),
            offset: Some(offset),
            size: None,
        })
    }

    /// Translate by a screen-space delta.
    pub fn pan_by(&mut self, dx: f64, dy: f64) -> ViewportChange {
        let offset = Point::new(self.offset.x + dx, self.offset.y + dy);
        self.apply(&ViewportPatch {
            offset: Some(offset),
            ..ViewportPatch::default()
        })
    }

    /// Scale and pan so `bounds` is centered with `padding` screen pixels of
    /// margin. Empty bounds leave the viewport unchanged.
    pub fn fit_to(&mut self, bounds: &Rect, padding: f64) -> ViewportChange {
        if bounds.is_empty() {
            return ViewportChange::default();
        }
        let avail_w = (self.size.width - padding * 2.0).max(1.0);
        let avail_h = (self.size.height - padding * 2.0).max(1.0);
        let scale = clamp_scale((avail_w / bounds.width).min(avail_h / bounds.height));
        let center = bounds.center();
        let offset = Point::new(
            self.size.width / 2.0 - center.x * scale,
            self.size.height / 2.0 - center.y * scale,
        );
        self.apply(&ViewportPatch {
            scale: Some(scale),
            offset: Some(offset),
            size: None,
        })
    }

    /// Back to 100% with no pan; size is kept.
    pub fn reset(&mut self) -> ViewportChange {
        self.apply(&ViewportPatch {
            scale: Some(1.0),
            offset: Some(Point::default()),
            size: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_is_clamped() {
        let mut vp = Viewport::default();
        vp.apply(&ViewportPatch::scale(50.0));
        assert!((vp.scale - MAX_SCALE).abs() < f64::EPSILON);
        vp.apply(&ViewportPatch::scale(0.0));
        assert!((vp.scale - MIN_SCALE).abs() < f64::EPSILON);
    }

    #[test]
    fn test_apply_reports_changes() {
        let mut vp = Viewport::default();
        let change = vp.apply(&ViewportPatch::size(1024.0, 768.0));
        assert!(!change.transform);
        assert!(change.size);

        let change = vp.apply(&ViewportPatch::offset(0.0, 0.0));
        assert!(change.is_empty());

        let change = vp.apply(&ViewportPatch::offset(10.0, 0.0));
        assert!(change.transform);
    }

    #[test]
    fn test_world_screen_round_trip() {
        let mut vp = Viewport::default();
        vp.apply(&ViewportPatch {
            scale: Some(2.0),
            offset: Some(Point::new(30.0, -10.0)),
            size: None,
        });
        let p = Point::new(12.5, 40.0);
        let screen = vp.world_to_screen(p);
        assert_eq!(screen, Point::new(55.0, 70.0));
        assert_eq!(vp.screen_to_world(screen), p);
    }

    #[test]
    fn test_zoom_at_keeps_anchor_fixed() {
        let mut vp = Viewport::default();
        let anchor = Point::new(200.0, 150.0);
        let before = vp.screen_to_world(anchor);
        vp.zoom_at(2.0, anchor);
        let after = vp.screen_to_world(anchor);
        assert!((before.x - after.x).abs() < 1e-9);
        assert!((before.y - after.y).abs() < 1e-9);
        assert!((vp.scale - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_fit_to_centers_bounds() {
        let mut vp = Viewport::with_size(400.0, 400.0);
        let bounds = Rect::new(100.0, 100.0, 200.0, 100.0);
        vp.fit_to(&bounds, 0.0);
        assert!((vp.scale - 2.0).abs() < f64::EPSILON);
        let center = vp.world_to_screen(bounds.center());
        assert!((center.x - 200.0).abs() < 1e-9);
        assert!((center.y - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalized_clamps_deserialized_scale() {
        let vp: Viewport = serde_json::from_str(
            r#"{"scale":40,"offset":{"x":0,"y":0},"size":{"width":10,"height":10}}"#,
        )
        .expect("parse");
        assert!((vp.normalized().scale - MAX_SCALE).abs() < f64::EPSILON);
    }

    #[test]
    fn test_apply_ignores_non_finite_offset_and_size() {
        let mut vp = Viewport::with_size(200.0, 100.0);
        let change = vp.apply(&ViewportPatch::offset(f64::NAN, 5.0));
        assert!(change.is_empty());
        assert_eq!(vp.offset, Point::default());

        let change = vp.apply(&ViewportPatch::size(f64::INFINITY, 50.0));
        assert!(change.is_empty());
        assert_eq!(vp.size, Size::new(200.0, 100.0));

        let change = vp.apply(&ViewportPatch::offset(10.0, -4.0));
        assert!(change.transform);
        assert_eq!(vp.offset, Point::new(10.0, -4.0));
    }

    #[test]
    fn test_normalized_resets_non_finite_fields() {
        let vp = Viewport {
            scale: f64::NAN,
            offset: Point::new(f64::INFINITY, 3.0),
            size: Size::new(10.0, f64::NAN),
        }
        .normalized();
        assert!((vp.scale - 1.0).abs() < f64::EPSILON);
        assert_eq!(vp.offset, Point::default());
        assert_eq!(vp.size, Size::default());
    }
}
