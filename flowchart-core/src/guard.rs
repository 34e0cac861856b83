//! Re-entrancy guard modelled as an explicit two-state machine.
//!
//! ```text
//!   Idle ──try_enter()──▶ Busy
//!    ▲                     │
//!    └──── token dropped ──┘
//! ```
//!
//! Release happens in the token's `Drop`, so every exit path (early `?`
//! return, error, panic unwinding) puts the guard back to `Idle`.

use std::cell::Cell;
use std::rc::Rc;

/// State of a [`ReentrancyGuard`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BusyState {
    /// No operation in progress.
    #[default]
    Idle,
    /// An operation holds the guard.
    Busy,
}

/// Rejects nested entry into a non-reentrant operation.
///
/// Cloning shares the underlying state.
#[derive(Debug, Clone, Default)]
pub struct ReentrancyGuard {
    state: Rc<Cell<BusyState>>,
}

impl ReentrancyGuard {
    /// A guard in the `Idle` state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Move `Idle → Busy` and return the token that moves it back, or `None`
    /// if the guard is already `Busy`.
    #[must_use]
    pub fn try_enter(&self) -> Option<GuardToken> {
        match self.state.get() {
            BusyState::Busy => None,
            BusyState::Idle => {
                self.state.set(BusyState::Busy);
                Some(GuardToken {
                    state: Rc::clone(&self.state),
                })
            }
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> BusyState {
        self.state.get()
    }

    /// Shorthand for `state() == Busy`.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.state.get() == BusyState::Busy
    }
}

/// Proof of holding a [`ReentrancyGuard`]; releases it on drop.
#[derive(Debug)]
#[must_use = "the guard is released as soon as the token is dropped"]
pub struct GuardToken {
    state: Rc<Cell<BusyState>>,
}

impl Drop for GuardToken {
    fn drop(&mut self) {
        self.state.set(BusyState::Idle);
    }
}
