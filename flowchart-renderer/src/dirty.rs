//! Dirty-region bookkeeping.

use flowchart_core::Rect;

/// A screen-space rectangle queued for repaint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirtyRect {
    /// Left edge in logical pixels.
    pub x: f64,
    /// Top edge in logical pixels.
    pub y: f64,
    /// Width in logical pixels.
    pub width: f64,
    /// Height in logical pixels.
    pub height: f64,
    /// Always true while queued.
    pub needs_redraw: bool,
}

impl DirtyRect {
    /// Queue entry for `rect`.
    #[must_use]
    pub fn new(rect: Rect) -> Self {
        Self {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            needs_redraw: true,
        }
    }

    /// As a plain rectangle.
    #[must_use]
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// Rectangles invalidated since the last paint.
#[derive(Debug, Clone, Default)]
pub struct DirtyTracker {
    rects: Vec<DirtyRect>,
}

impl DirtyTracker {
    /// Empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a rectangle. Empty rectangles still count as a repaint request
    /// but contribute nothing to the damage area.
    pub fn push(&mut self, rect: Rect) {
        self.rects.push(DirtyRect::new(rect));
    }

    /// Queued rectangles.
    #[must_use]
    pub fn rects(&self) -> &[DirtyRect] {
        &self.rects
    }

    /// True if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// Number of queued rectangles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rects.len()
    }

    /// Union of every non-empty queued rectangle.
    #[must_use]
    pub fn union(&self) -> Option<Rect> {
        self.rects
            .iter()
            .map(DirtyRect::rect)
            .filter(|r| !r.is_empty())
            .reduce(|acc, r| acc.union(&r))
    }

    /// Forget everything queued.
    pub fn clear(&mut self) {
        self.rects.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_skips_empty_rects() {
        let mut tracker = DirtyTracker::new();
        tracker.push(Rect::new(10.0, 10.0, 10.0, 10.0));
        tracker.push(Rect::default());
        tracker.push(Rect::new(30.0, 0.0, 5.0, 5.0));

        assert_eq!(tracker.len(), 3);
        assert_eq!(tracker.union(), Some(Rect::new(10.0, 0.0, 25.0, 20.0)));
        assert!(tracker.rects().iter().all(|r| r.needs_redraw));
    }

    #[test]
    fn test_clear() {
        let mut tracker = DirtyTracker::new();
        tracker.push(Rect::default());
        assert_eq!(tracker.union(), None);
        tracker.clear();
        assert!(tracker.is_empty());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn rect() -> impl Strategy<Value = Rect> {
            (-500.0..500.0f64, -500.0..500.0f64, 1.0..200.0f64, 1.0..200.0f64)
                .prop_map(|(x, y, w, h)| Rect::new(x, y, w, h))
        }

        proptest! {
            #[test]
            fn prop_union_covers_every_rect(rects in prop::collection::vec(rect(), 1..20)) {
                let mut tracker = DirtyTracker::new();
                for r in &rects {
                    tracker.push(*r);
                }
                let damage = tracker.union().unwrap();
                for r in &rects {
                    prop_assert!(damage.x <= r.x && damage.y <= r.y);
                    prop_assert!(damage.right() + 1e-9 >= r.right());
                    prop_assert!(damage.bottom() + 1e-9 >= r.bottom());
                }
            }
        }
    }
}
