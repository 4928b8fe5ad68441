use std::cell::RefCell;

use crate::{
    error::UsageError,
    task::{FrameRef, TaskId},
};

// The frame the driver on this thread is resuming right now, plus the transfer its
// body requested by awaiting a task.
struct Scope {
    frame: FrameRef,
    transfer: Option<FrameRef>,
}

thread_local! {
    static SCOPE: RefCell<Option<Scope>> = const { RefCell::new(None) };
}

struct Restore {
    previous: Option<Scope>,
    armed: bool,
}

impl Restore {
    fn finish(mut self) -> Option<Scope> {
        self.armed = false;
        let previous: Option<Scope> = self.previous.take();
        SCOPE.with(|scope| scope.replace(previous))
    }
}

impl Drop for Restore {
    fn drop(&mut self) {
        if self.armed {
            let previous: Option<Scope> = self.previous.take();
            let unwound: Option<Scope> = SCOPE.with(|scope| scope.replace(previous));
            drop(unwound);
        }
    }
}

/// Runs `poll` with `frame` as the frame being resumed and returns whatever transfer the
/// body asked for while it ran.
pub(crate) fn enter<R>(frame: FrameRef, poll: impl FnOnce() -> R) -> (R, Option<FrameRef>) {
    let previous: Option<Scope> = SCOPE.with(|scope| {
        scope.replace(Some(Scope {
            frame,
            transfer: None,
        }))
    });
    let restore = Restore {
        previous,
        armed: true,
    };
    let output: R = poll();
    let transfer: Option<FrameRef> = restore.finish().and_then(|scope| scope.transfer);
    (output, transfer)
}

/// The frame being resumed on this thread, if a driver is running one
pub(crate) fn current() -> Option<FrameRef> {
    SCOPE.with(|scope| scope.borrow().as_ref().map(|scope| scope.frame.clone()))
}

/// Asks the driver to hand control to `next` once the current frame suspends
pub(crate) fn transfer_to(next: FrameRef) {
    SCOPE.with(|scope| {
        let mut scope = scope.borrow_mut();
        let Some(scope) = scope.as_mut() else {
            UsageError::OutsideDriver.raise();
        };
        if scope.transfer.is_some() {
            UsageError::ConcurrentAwait.raise();
        }
        scope.transfer = Some(next);
    });
}

/// Drops the pending transfer when it still names the frame of task `id`
pub(crate) fn withdraw(id: TaskId) {
    // the thread-local may already be gone when this runs from a destructor
    let withdrawn: Option<FrameRef> = SCOPE
        .try_with(|scope| {
            let mut scope = scope.borrow_mut();
            let scope = scope.as_mut()?;
            let requested: bool = scope.transfer.as_ref().is_some_and(|next| next.id() == id);
            requested.then(|| scope.transfer.take()).flatten()
        })
        .ok()
        .flatten();
    drop(withdrawn);
}

/// Runs `poll` with no frame in scope, so tasks awaited inside it become roots of their own
pub(crate) fn detached<R>(poll: impl FnOnce() -> R) -> R {
    let previous: Option<Scope> = SCOPE.with(|scope| scope.take());
    let restore = Restore {
        previous,
        armed: true,
    };
    let output: R = poll();
    drop(restore.finish());
    output
}
