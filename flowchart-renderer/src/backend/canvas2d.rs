//! Browser backend over `CanvasRenderingContext2d`.
//!
//! Also provides [`AnimationFrameScheduler`], the `requestAnimationFrame`
//! implementation of [`FrameScheduler`].

use std::cell::RefCell;
use std::rc::Rc;

use flowchart_core::Rect;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, Window};

use super::RenderContext;
use crate::scheduler::{FrameHandle, FrameScheduler};
use crate::{RenderError, RenderResult};

fn js_message(value: &JsValue) -> String {
    value
        .as_string()
        .unwrap_or_else(|| format!("{value:?}"))
}

/// A `<canvas>` element and its 2D context.
pub struct Canvas2dContext {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
}

impl Canvas2dContext {
    /// Acquire the 2D context of `canvas`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Surface`] if the element has no 2D context.
    pub fn new(canvas: HtmlCanvasElement) -> RenderResult<Self> {
        let ctx = canvas
            .get_context("2d")
            .map_err(|e| RenderError::Surface(js_message(&e)))?
            .ok_or_else(|| RenderError::Surface("2d context unavailable".to_string()))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| RenderError::Surface("context is not 2d".to_string()))?;
        Ok(Self { canvas, ctx })
    }

    /// The underlying element.
    #[must_use]
    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }
}

impl RenderContext for Canvas2dContext {
    fn save(&mut self) {
        self.ctx.save();
    }

    fn restore(&mut self) {
        self.ctx.restore();
    }

    fn set_transform(&mut self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) {
        if let Err(err) = self.ctx.set_transform(a, b, c, d, e, f) {
            tracing::warn!(error = %js_message(&err), "setTransform failed");
        }
    }

    fn translate(&mut self, x: f64, y: f64) {
        if let Err(err) = self.ctx.translate(x, y) {
            tracing::warn!(error = %js_message(&err), "translate failed");
        }
    }

    fn scale(&mut self, x: f64, y: f64) {
        if let Err(err) = self.ctx.scale(x, y) {
            tracing::warn!(error = %js_message(&err), "scale failed");
        }
    }

    fn clear_rect(&mut self, rect: Rect) {
        self.ctx.clear_rect(rect.x, rect.y, rect.width, rect.height);
    }

    fn fill_rect(&mut self, rect: Rect) {
        self.ctx.fill_rect(rect.x, rect.y, rect.width, rect.height);
    }

    fn stroke_rect(&mut self, rect: Rect) {
        self.ctx.stroke_rect(rect.x, rect.y, rect.width, rect.height);
    }

    fn begin_path(&mut self) {
        self.ctx.begin_path();
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.ctx.move_to(x, y);
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.ctx.line_to(x, y);
    }

    fn rect(&mut self, rect: Rect) {
        self.ctx.rect(rect.x, rect.y, rect.width, rect.height);
    }

    fn stroke(&mut self) {
        self.ctx.stroke();
    }

    fn fill(&mut self) {
        self.ctx.fill();
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64) {
        if let Err(err) = self.ctx.fill_text(text, x, y) {
            tracing::warn!(error = %js_message(&err), "fillText failed");
        }
    }

    fn set_fill_style(&mut self, style: &str) {
        self.ctx.set_fill_style_str(style);
    }

    fn set_stroke_style(&mut self, style: &str) {
        self.ctx.set_stroke_style_str(style);
    }

    fn set_line_width(&mut self, width: f64) {
        self.ctx.set_line_width(width);
    }

    fn set_line_dash(&mut self, segments: &[f64]) {
        let array: js_sys::Array = segments.iter().map(|v| JsValue::from_f64(*v)).collect();
        if let Err(err) = self.ctx.set_line_dash(&array) {
            tracing::warn!(error = %js_message(&err), "setLineDash failed");
        }
    }

    fn set_global_alpha(&mut self, alpha: f64) {
        self.ctx.set_global_alpha(alpha);
    }

    fn set_font(&mut self, font: &str) {
        self.ctx.set_font(font);
    }

    fn surface_size(&self) -> (u32, u32) {
        (self.canvas.width(), self.canvas.height())
    }

    fn resize_surface(&mut self, width: u32, height: u32) -> RenderResult<()> {
        self.canvas.set_width(width);
        self.canvas.set_height(height);
        tracing::debug!(width, height, "canvas backing store resized");
        Ok(())
    }
}

/// Shared slot for the host's frame callback.
///
/// The host fills it once the renderer exists, typically with a closure that
/// upgrades a weak renderer handle and calls
/// [`crate::SceneRenderer::on_animation_frame`].
#[derive(Clone, Default)]
pub struct FrameCallback(Rc<RefCell<Option<Box<dyn FnMut()>>>>);

impl FrameCallback {
    /// Install the callback, replacing any previous one.
    pub fn set(&self, callback: impl FnMut() + 'static) {
        *self.0.borrow_mut() = Some(Box::new(callback));
    }

    fn fire(&self) {
        // Taken out while running so the callback may call `set` itself.
        let taken = self.0.borrow_mut().take();
        if let Some(mut callback) = taken {
            callback();
            let mut slot = self.0.borrow_mut();
            if slot.is_none() {
                *slot = Some(callback);
            }
        }
    }
}

/// [`FrameScheduler`] over `window.requestAnimationFrame`.
pub struct AnimationFrameScheduler {
    window: Window,
    callback: FrameCallback,
    // One closure for the scheduler's lifetime; replacing it while the
    // browser is invoking it would free it mid-call.
    closure: Closure<dyn FnMut(f64)>,
}

impl AnimationFrameScheduler {
    /// Scheduler for the current window.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Scheduler`] outside a browser window.
    pub fn new() -> RenderResult<Self> {
        let window = web_sys::window()
            .ok_or_else(|| RenderError::Scheduler("no window".to_string()))?;
        let callback = FrameCallback::default();
        let slot = callback.clone();
        let closure = Closure::wrap(Box::new(move |_timestamp: f64| slot.fire()) as Box<dyn FnMut(f64)>);
        Ok(Self {
            window,
            callback,
            closure,
        })
    }

    /// Handle for installing the frame callback after the renderer is built.
    #[must_use]
    pub fn callback(&self) -> FrameCallback {
        self.callback.clone()
    }
}

impl FrameScheduler for AnimationFrameScheduler {
    fn request_frame(&mut self) -> RenderResult<FrameHandle> {
        let id = self
            .window
            .request_animation_frame(self.closure.as_ref().unchecked_ref())
            .map_err(|e| RenderError::Scheduler(js_message(&e)))?;
        let id = u64::try_from(id).map_err(|_| RenderError::Scheduler(format!("bad frame id {id}")))?;
        Ok(FrameHandle(id))
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        match i32::try_from(handle.0) {
            Ok(id) => {
                if let Err(err) = self.window.cancel_animation_frame(id) {
                    tracing::warn!(error = %js_message(&err), "cancelAnimationFrame failed");
                }
            }
            Err(_) => tracing::warn!(handle = handle.0, "frame handle out of range"),
        }
    }
}
