//! Per-thread causal context
//!
//! Each analysis worker carries a LIFO stack of cause tokens: everything
//! discovered while processing fact F is caused by F. The stack is strictly
//! thread-local; no cross-thread visibility exists or is needed.
//!
//! The saturation marker is a depth counter, not a boolean, so nested
//! saturation scopes compose correctly.

use super::super::domain::CauseToken;
use crate::shared::models::Fact;
use std::cell::{Cell, RefCell};

thread_local! {
    static CAUSE_STACK: RefCell<Vec<CauseToken>> = const { RefCell::new(Vec::new()) };
    static SATURATION_DEPTH: Cell<u32> = const { Cell::new(0) };
}

/// The calling thread's current active cause, if any
pub fn current_cause() -> Option<Fact> {
    CAUSE_STACK.with(|stack| stack.borrow().last().map(|token| token.fact.clone()))
}

/// Depth of the calling thread's context stack
pub fn stack_depth() -> usize {
    CAUSE_STACK.with(|stack| stack.borrow().len())
}

/// Push a token, enforcing the nesting discipline
///
/// Pushing a differing, non-root, non-exempt fact onto a non-root top is a
/// consistency violation unless the caller explicitly permitted rerooting:
/// it almost always means a nested scope was never released.
pub(crate) fn push_token(token: CauseToken, permit_reroot: bool) -> usize {
    CAUSE_STACK.with(|stack| {
        let mut stack = stack.borrow_mut();
        if let Some(top) = stack.last() {
            let reroots = !top.fact.is_root()
                && top.fact != token.fact
                && !token.fact.is_reroot_exempt();
            if reroots && !permit_reroot {
                panic!(
                    "causal context violation: pushing {:?} over unreleased {:?} (pushed at {})",
                    token.fact, top.fact, top.registered_at
                );
            }
        }
        let restore_len = stack.len();
        stack.push(token);
        restore_len
    })
}

/// Truncate the stack back to `restore_len`; runs on every scope exit path
pub(crate) fn truncate_to(restore_len: usize) {
    CAUSE_STACK.with(|stack| stack.borrow_mut().truncate(restore_len));
}

/// Drop every frame on the calling thread
pub(crate) fn clear() {
    CAUSE_STACK.with(|stack| stack.borrow_mut().clear());
}

/// Scoped cause: restores the parent scope on drop, including unwinds
#[must_use = "dropping the scope immediately releases the pushed cause"]
pub struct CauseScope {
    restore_len: usize,
}

impl CauseScope {
    pub(crate) fn new(restore_len: usize) -> Self {
        Self { restore_len }
    }
}

impl Drop for CauseScope {
    fn drop(&mut self) {
        truncate_to(self.restore_len);
    }
}

/// Is the calling thread inside at least one saturation scope?
pub fn is_saturating() -> bool {
    SATURATION_DEPTH.with(|depth| depth.get() > 0)
}

/// Scoped saturation marker
#[must_use = "dropping the guard immediately leaves the saturation scope"]
pub struct SaturationScope {
    _not_send: std::marker::PhantomData<*const ()>,
}

/// Enter a saturation scope on the calling thread
pub fn enter_saturation() -> SaturationScope {
    SATURATION_DEPTH.with(|depth| depth.set(depth.get() + 1));
    SaturationScope {
        _not_send: std::marker::PhantomData,
    }
}

impl Drop for SaturationScope {
    fn drop(&mut self) {
        SATURATION_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}
