//! The scene renderer.
//!
//! Paint pipeline for one frame:
//!
//! ```text
//!  clear ─▶ save ─▶ viewport transform ─▶ grid ─▶ scene ─▶ overlays ─▶ restore
//!                                                  │          │
//!                       render data (edges, nodes) │          ├ selection box
//!                  or registered objects by        │          ├ guides
//!                     (layer, priority)            ┘          └ temp connection
//! ```
//!
//! Mutations only mark regions dirty and request a frame; repeated requests
//! before the frame fires coalesce into one paint.

use std::collections::HashMap;

use flowchart_core::{ReentrancyGuard, Rect, Size, Viewport, ViewportChange, ViewportPatch};

use crate::backend::RenderContext;
use crate::dirty::DirtyTracker;
use crate::layer::{Drawable, RenderObject, RenderObjectId, RenderObjectPatch};
use crate::overlay::{
    draw_guides, draw_selection_box, draw_temp_connection, Guides, Overlays, RenderData,
    TempConnection,
};
use crate::scheduler::{FrameHandle, FrameScheduler};
use crate::{RenderError, RenderResult, RendererConfig};

/// Screen pixels of slack around overlay invalidation, for stroke width.
const OVERLAY_MARGIN: f64 = 4.0;

/// Upper bound on grid lines per axis in one frame.
const MAX_GRID_LINES: u32 = 10_000;

/// What one painted frame did.
#[derive(Debug, Default)]
pub struct FrameReport {
    /// Frame number, starting at 1.
    pub frame: u64,
    /// Drawables that painted successfully.
    pub painted: usize,
    /// Visible objects skipped because they were off screen.
    pub culled: usize,
    /// Drawables that failed; each was skipped for this frame only.
    pub failures: Vec<RenderError>,
    /// Union of the dirty rectangles this frame consumed, in screen space.
    pub damage: Option<Rect>,
}

/// Result of a call to [`SceneRenderer::render`].
#[derive(Debug)]
#[must_use]
pub enum FrameOutcome {
    /// The frame was painted.
    Painted(FrameReport),
    /// A render was already in progress; nothing was done.
    Busy,
    /// The renderer has been destroyed.
    Destroyed,
}

impl FrameOutcome {
    /// The report, if a frame was painted.
    #[must_use]
    pub fn report(self) -> Option<FrameReport> {
        match self {
            Self::Painted(report) => Some(report),
            Self::Busy | Self::Destroyed => None,
        }
    }

    /// True if a frame was painted.
    #[must_use]
    pub fn is_painted(&self) -> bool {
        matches!(self, Self::Painted(_))
    }
}

struct Entry {
    object: RenderObject,
    seq: u64,
}

/// Layered, dirty-region canvas renderer.
pub struct SceneRenderer {
    config: RendererConfig,
    context: Option<Box<dyn RenderContext>>,
    scheduler: Box<dyn FrameScheduler>,
    viewport: Viewport,
    objects: HashMap<RenderObjectId, Entry>,
    next_seq: u64,
    dirty: DirtyTracker,
    pending_frame: Option<FrameHandle>,
    guard: ReentrancyGuard,
    overlays: Overlays,
    frame_count: u64,
}

impl SceneRenderer {
    /// Renderer over `context`, taking frames from `scheduler`.
    ///
    /// The logical viewport size is the surface size divided by the
    /// configured pixel ratio. Nothing is painted until something is marked
    /// dirty or [`render`](Self::render) is called.
    pub fn new(
        context: Box<dyn RenderContext>,
        scheduler: Box<dyn FrameScheduler>,
        config: RendererConfig,
    ) -> Self {
        let (width, height) = context.surface_size();
        let ratio = config.effective_pixel_ratio();
        let viewport = Viewport::with_size(f64::from(width) / ratio, f64::from(height) / ratio);
        tracing::debug!(width, height, pixel_ratio = ratio, "scene renderer created");
        Self {
            config,
            context: Some(context),
            scheduler,
            viewport,
            objects: HashMap::new(),
            next_seq: 0,
            dirty: DirtyTracker::new(),
            pending_frame: None,
            guard: ReentrancyGuard::new(),
            overlays: Overlays::default(),
            frame_count: 0,
        }
    }

    /// Renderer configuration.
    #[must_use]
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Current viewport.
    #[must_use]
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Frames painted so far.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Regions waiting for the next paint.
    #[must_use]
    pub fn dirty(&self) -> &DirtyTracker {
        &self.dirty
    }

    /// True while a frame request is outstanding.
    #[must_use]
    pub fn has_pending_frame(&self) -> bool {
        self.pending_frame.is_some()
    }

    /// The guard held for the duration of a paint. Hosts that drive painting
    /// from several places can hold it to keep frames out.
    #[must_use]
    pub fn render_guard(&self) -> &ReentrancyGuard {
        &self.guard
    }

    /// True while a frame is being painted.
    #[must_use]
    pub fn is_rendering(&self) -> bool {
        self.guard.is_busy()
    }

    /// True after [`destroy`](Self::destroy).
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.context.is_none()
    }

    // ------------------------------------------------------------------
    // Viewport and surface
    // ------------------------------------------------------------------

    /// Merge a viewport patch. If scale or offset changed, the whole canvas
    /// is invalidated.
    pub fn set_viewport(&mut self, patch: &ViewportPatch) -> ViewportChange {
        let change = self.viewport.apply(patch);
        if change.transform {
            tracing::debug!(
                scale = self.viewport.scale,
                x = self.viewport.offset.x,
                y = self.viewport.offset.y,
                "viewport changed"
            );
            self.mark_dirty(self.viewport.screen_rect());
        }
        change
    }

    /// Resize the canvas to `size` logical pixels. The backing store becomes
    /// `size * pixel_ratio` device pixels and the whole canvas is invalidated.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Destroyed`] after [`destroy`](Self::destroy),
    /// [`RenderError::Surface`] for a non-finite or non-positive size, or the
    /// surface's resize error.
    pub fn set_size(&mut self, size: Size) -> RenderResult<()> {
        let ctx = self.context.as_deref_mut().ok_or(RenderError::Destroyed)?;
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !valid(size.width) || !valid(size.height) {
            return Err(RenderError::Surface(format!(
                "invalid canvas size {}x{}",
                size.width, size.height
            )));
        }
        let ratio = self.config.effective_pixel_ratio();
        let width = device_pixels(size.width * ratio);
        let height = device_pixels(size.height * ratio);
        ctx.resize_surface(width, height)?;
        ctx.set_transform(ratio, 0.0, 0.0, ratio, 0.0, 0.0);

        self.viewport
            .apply(&ViewportPatch::size(size.width, size.height));
        tracing::debug!(
            width = size.width,
            height = size.height,
            device_width = width,
            device_height = height,
            "canvas resized"
        );
        self.mark_dirty(self.viewport.screen_rect());
        Ok(())
    }

    /// Change the device pixel ratio and re-apply the current size.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Surface`] for a non-positive or non-finite
    /// ratio, otherwise as [`set_size`](Self::set_size).
    pub fn set_pixel_ratio(&mut self, ratio: f64) -> RenderResult<()> {
        if !ratio.is_finite() || ratio <= 0.0 {
            return Err(RenderError::Surface(format!("invalid pixel ratio {ratio}")));
        }
        self.config.pixel_ratio = ratio;
        self.set_size(self.viewport.size)
    }

    // ------------------------------------------------------------------
    // Invalidation and scheduling
    // ------------------------------------------------------------------

    /// Queue a screen-space region for repaint and request a frame.
    pub fn mark_dirty(&mut self, rect: Rect) {
        if self.is_destroyed() {
            return;
        }
        self.dirty.push(rect);
        self.request_render();
    }

    fn mark_world_dirty(&mut self, bounds: Rect) {
        let rect = self.viewport.world_rect_to_screen(&bounds);
        self.mark_dirty(rect);
    }

    fn mark_overlay_dirty(&mut self, bounds: Option<Rect>) {
        if let Some(bounds) = bounds {
            let rect = self
                .viewport
                .world_rect_to_screen(&bounds)
                .inflate(OVERLAY_MARGIN);
            self.mark_dirty(rect);
        }
    }

    /// Request one animation frame. Calls made while a request is already
    /// outstanding are absorbed by it.
    pub fn request_render(&mut self) {
        if self.is_destroyed() {
            return;
        }
        if self.pending_frame.is_some() {
            tracing::trace!("frame already requested");
            return;
        }
        match self.scheduler.request_frame() {
            Ok(handle) => self.pending_frame = Some(handle),
            Err(err) => tracing::warn!(error = %err, "frame request refused"),
        }
    }

    /// The host's frame callback. Clears the outstanding request and paints
    /// if anything is dirty; returns `None` when there was nothing to do.
    /// A frame skipped as [`FrameOutcome::Busy`] keeps its dirty regions and
    /// requests another frame.
    pub fn on_animation_frame(&mut self) -> Option<FrameOutcome> {
        self.pending_frame = None;
        if self.is_destroyed() {
            return None;
        }
        if self.dirty.is_empty() {
            tracing::trace!("frame fired with nothing dirty");
            return None;
        }
        let outcome = self.render(None, None);
        if matches!(outcome, FrameOutcome::Busy) && !self.dirty.is_empty() {
            self.request_render();
        }
        Some(outcome)
    }

    // ------------------------------------------------------------------
    // Render objects
    // ------------------------------------------------------------------

    /// Register `object` under `id`, replacing any object already there.
    /// The replaced object's bounds and the new bounds are both invalidated.
    pub fn add_render_object(
        &mut self,
        id: impl Into<RenderObjectId>,
        object: RenderObject,
    ) -> Option<RenderObject> {
        let id = id.into();
        if let Some(old) = self.objects.get(&id).map(|e| e.object.bounds) {
            self.mark_world_dirty(old);
        }
        let bounds = object.bounds;
        self.next_seq += 1;
        let previous = self.objects.insert(
            id,
            Entry {
                object,
                seq: self.next_seq,
            },
        );
        self.mark_world_dirty(bounds);
        previous.map(|e| e.object)
    }

    /// Unregister an object, invalidating where it was.
    pub fn remove_render_object(&mut self, id: &RenderObjectId) -> Option<RenderObject> {
        let entry = self.objects.remove(id)?;
        self.mark_world_dirty(entry.object.bounds);
        Some(entry.object)
    }

    /// Patch a registered object. Its old bounds are invalidated before the
    /// change and its new bounds after.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::ObjectNotFound`] if nothing is registered
    /// under `id`.
    pub fn update_render_object(
        &mut self,
        id: &RenderObjectId,
        patch: &RenderObjectPatch,
    ) -> RenderResult<()> {
        let old = self
            .objects
            .get(id)
            .map(|e| e.object.bounds)
            .ok_or_else(|| RenderError::ObjectNotFound(id.to_string()))?;
        self.mark_world_dirty(old);

        let new = match self.objects.get_mut(id) {
            Some(entry) => {
                patch.apply_to(&mut entry.object);
                entry.object.bounds
            }
            None => return Err(RenderError::ObjectNotFound(id.to_string())),
        };
        self.mark_world_dirty(new);
        Ok(())
    }

    /// A registered object.
    #[must_use]
    pub fn render_object(&self, id: &RenderObjectId) -> Option<&RenderObject> {
        self.objects.get(id).map(|e| &e.object)
    }

    /// Number of registered objects.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Unregister everything and invalidate the canvas.
    pub fn clear_render_objects(&mut self) {
        self.objects.clear();
        self.mark_dirty(self.viewport.screen_rect());
    }

    // ------------------------------------------------------------------
    // Persistent overlays
    // ------------------------------------------------------------------

    /// Show or hide the selection rectangle (world space).
    pub fn set_selection_box(&mut self, rect: Option<Rect>) {
        if self.overlays.selection_box == rect {
            return;
        }
        let old = std::mem::replace(&mut self.overlays.selection_box, rect);
        self.mark_overlay_dirty(old);
        self.mark_overlay_dirty(rect);
    }

    /// Show or hide alignment guides. Guides span the canvas, so the whole
    /// canvas is invalidated.
    pub fn set_guides(&mut self, guides: Option<Guides>) {
        if self.overlays.guides == guides {
            return;
        }
        self.overlays.guides = guides;
        self.mark_dirty(self.viewport.screen_rect());
    }

    /// Show or hide the connection preview.
    pub fn set_temp_connection(&mut self, connection: Option<TempConnection>) {
        if self.overlays.temp_connection == connection {
            return;
        }
        let old = std::mem::replace(&mut self.overlays.temp_connection, connection);
        self.mark_overlay_dirty(old.map(|c| c.bounds()));
        self.mark_overlay_dirty(connection.map(|c| c.bounds()));
    }

    // ------------------------------------------------------------------
    // Painting
    // ------------------------------------------------------------------

    /// Paint one frame now.
    ///
    /// `viewport`, if given, replaces the current viewport first. `data`, if
    /// given, is painted instead of the registered objects. Returns
    /// [`FrameOutcome::Busy`] without touching anything if a frame is already
    /// being painted.
    pub fn render(
        &mut self,
        viewport: Option<&Viewport>,
        data: Option<&RenderData<'_>>,
    ) -> FrameOutcome {
        let Some(_token) = self.guard.try_enter() else {
            tracing::warn!("render already in progress, skipping");
            return FrameOutcome::Busy;
        };
        if let Some(viewport) = viewport {
            self.viewport = viewport.normalized();
        }
        let Some(ctx) = self.context.as_deref_mut() else {
            return FrameOutcome::Destroyed;
        };

        self.frame_count += 1;
        let mut report = FrameReport {
            frame: self.frame_count,
            damage: self.dirty.union(),
            ..FrameReport::default()
        };
        let vp = self.viewport;
        let config = &self.config;
        let ratio = config.effective_pixel_ratio();

        ctx.set_transform(ratio, 0.0, 0.0, ratio, 0.0, 0.0);
        ctx.clear_rect(vp.screen_rect());
        if let Some(background) = &config.background_color {
            ctx.set_fill_style(background);
            ctx.fill_rect(vp.screen_rect());
        }

        ctx.save();
        ctx.translate(vp.offset.x, vp.offset.y);
        ctx.scale(vp.scale, vp.scale);

        if config.show_grid {
            draw_grid(ctx, &vp, config);
        }

        match data {
            Some(data) => {
                for (i, drawable) in data.edges.iter().enumerate() {
                    paint(ctx, &vp, &format!("edges[{i}]"), *drawable, &mut report);
                }
                for (i, drawable) in data.nodes.iter().enumerate() {
                    paint(ctx, &vp, &format!("nodes[{i}]"), *drawable, &mut report);
                }
            }
            None => {
                let visible = vp.visible_world_rect();
                let mut order: Vec<(&RenderObjectId, &Entry)> = self
                    .objects
                    .iter()
                    .filter(|(_, e)| e.object.visible)
                    .collect();
                order.sort_by(|(_, a), (_, b)| {
                    a.object.paint_order(&b.object).then(a.seq.cmp(&b.seq))
                });
                for (id, entry) in order {
                    let bounds = entry.object.bounds;
                    if !bounds.is_empty() && !bounds.intersects(&visible) {
                        report.culled += 1;
                        continue;
                    }
                    paint(
                        ctx,
                        &vp,
                        id.as_str(),
                        &*entry.object.drawable,
                        &mut report,
                    );
                }
            }
        }

        let selection = data
            .and_then(|d| d.selection_box)
            .or(self.overlays.selection_box);
        let guides = data
            .and_then(|d| d.guides.as_ref())
            .or(self.overlays.guides.as_ref());
        let temp = data
            .and_then(|d| d.temp_connection)
            .or(self.overlays.temp_connection);
        if let Some(rect) = selection {
            draw_selection_box(ctx, &vp, rect, config);
        }
        if let Some(guides) = guides.filter(|g| !g.is_empty()) {
            draw_guides(ctx, &vp, guides, config);
        }
        if let Some(connection) = temp {
            draw_temp_connection(ctx, &vp, &connection, config);
        }

        ctx.restore();
        self.dirty.clear();

        tracing::trace!(
            frame = report.frame,
            painted = report.painted,
            culled = report.culled,
            failures = report.failures.len(),
            "frame painted"
        );
        FrameOutcome::Painted(report)
    }

    /// Cancel any outstanding frame, drop every object and release the
    /// surface. Later calls are no-ops.
    pub fn destroy(&mut self) {
        if let Some(handle) = self.pending_frame.take() {
            self.scheduler.cancel_frame(handle);
        }
        self.objects.clear();
        self.dirty.clear();
        self.overlays = Overlays::default();
        if self.context.take().is_some() {
            tracing::debug!(frames = self.frame_count, "scene renderer destroyed");
        }
    }
}

impl std::fmt::Debug for SceneRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneRenderer")
            .field("viewport", &self.viewport)
            .field("objects", &self.objects.len())
            .field("dirty", &self.dirty.len())
            .field("pending_frame", &self.pending_frame)
            .field("frame_count", &self.frame_count)
            .field("destroyed", &self.is_destroyed())
            .finish_non_exhaustive()
    }
}

/// Paint one drawable in its own save/restore, recording the outcome.
fn paint(
    ctx: &mut dyn RenderContext,
    viewport: &Viewport,
    id: &str,
    drawable: &dyn Drawable,
    report: &mut FrameReport,
) {
    ctx.save();
    let result = drawable.draw(ctx, viewport);
    ctx.restore();
    match result {
        Ok(()) => {
            report.painted += 1;
            tracing::trace!(object = id, "painted");
        }
        Err(err) => {
            tracing::warn!(object = id, error = %format!("{err:#}"), "render object failed");
            report.failures.push(RenderError::object(id, &err));
        }
    }
}

/// World-aligned grid. Lines sit on multiples of the grid size, so panning
/// moves them with the content instead of re-phasing them.
fn draw_grid(ctx: &mut dyn RenderContext, viewport: &Viewport, config: &RendererConfig) {
    let grid = config.grid_size;
    if grid.is_nan() || grid <= 0.0 || grid * viewport.scale < config.min_grid_pixel_size {
        tracing::trace!(grid, scale = viewport.scale, "grid too dense, skipped");
        return;
    }
    let visible = viewport.visible_world_rect();
    let finite = [visible.x, visible.y, visible.right(), visible.bottom()]
        .iter()
        .all(|v| v.is_finite());
    if !finite {
        tracing::warn!(?visible, "visible area is not finite, grid skipped");
        return;
    }
    let start_x = (visible.x / grid).floor() * grid;
    let start_y = (visible.y / grid).floor() * grid;
    let columns = line_count(visible.right() - start_x, grid);
    let rows = line_count(visible.bottom() - start_y, grid);

    ctx.save();
    ctx.set_stroke_style(&config.grid_color);
    ctx.set_line_width(1.0 / viewport.scale);
    ctx.begin_path();
    for i in 0..columns {
        let x = start_x + f64::from(i) * grid;
        ctx.move_to(x, visible.y);
        ctx.line_to(x, visible.bottom());
    }
    for j in 0..rows {
        let y = start_y + f64::from(j) * grid;
        ctx.move_to(visible.x, y);
        ctx.line_to(visible.right(), y);
    }
    ctx.stroke();
    ctx.restore();
}

/// Grid lines spanning `extent` world units, capped at [`MAX_GRID_LINES`].
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn line_count(extent: f64, grid: f64) -> u32 {
    let lines = (extent / grid).floor() + 1.0;
    if lines.is_finite() && lines > 0.0 {
        lines.min(f64::from(MAX_GRID_LINES)) as u32
    } else {
        0
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn device_pixels(logical: f64) -> u32 {
    if logical.is_finite() {
        logical.round().clamp(1.0, f64::from(u32::MAX)) as u32
    } else {
        1
    }
}
