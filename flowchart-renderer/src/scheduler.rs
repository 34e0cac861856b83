//! Animation-frame scheduling.
//!
//! The renderer asks its scheduler for at most one frame at a time; the host
//! calls [`crate::SceneRenderer::on_animation_frame`] when that frame fires.

use std::cell::RefCell;
use std::rc::Rc;

use crate::{RenderError, RenderResult};

/// Opaque id of a requested frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// Source of animation-frame callbacks.
pub trait FrameScheduler {
    /// Ask for one callback on the next frame.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Scheduler`] if the host refuses.
    fn request_frame(&mut self) -> RenderResult<FrameHandle>;

    /// Withdraw a request that has not fired yet.
    fn cancel_frame(&mut self, handle: FrameHandle);
}

#[derive(Debug, Default)]
struct ManualState {
    next_id: u64,
    pending: Vec<FrameHandle>,
    requested: usize,
    cancelled: usize,
    refuse: bool,
}

/// Scheduler driven by hand, for tests and headless hosts.
///
/// Clones share state: keep one handle, give the other to the renderer, then
/// call [`ManualScheduler::take_frame`] to play the browser's part.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    state: Rc<RefCell<ManualState>>,
}

impl ManualScheduler {
    /// A scheduler with no pending frames.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total frames requested.
    #[must_use]
    pub fn requests(&self) -> usize {
        self.state.borrow().requested
    }

    /// Total frames cancelled.
    #[must_use]
    pub fn cancellations(&self) -> usize {
        self.state.borrow().cancelled
    }

    /// Frames requested and not yet fired or cancelled.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.state.borrow().pending.len()
    }

    /// Fire the oldest pending frame. The caller must then invoke the
    /// renderer's frame callback.
    pub fn take_frame(&self) -> Option<FrameHandle> {
        let mut state = self.state.borrow_mut();
        if state.pending.is_empty() {
            None
        } else {
            Some(state.pending.remove(0))
        }
    }

    /// Make subsequent requests fail, as a host without frames would.
    pub fn set_refuse(&self, refuse: bool) {
        self.state.borrow_mut().refuse = refuse;
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&mut self) -> RenderResult<FrameHandle> {
        let mut state = self.state.borrow_mut();
        if state.refuse {
            return Err(RenderError::Scheduler("frames refused".to_string()));
        }
        state.next_id += 1;
        let handle = FrameHandle(state.next_id);
        state.pending.push(handle);
        state.requested += 1;
        Ok(handle)
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        let mut state = self.state.borrow_mut();
        let before = state.pending.len();
        state.pending.retain(|h| *h != handle);
        if state.pending.len() < before {
            state.cancelled += 1;
        }
    }
}
