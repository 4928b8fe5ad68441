use std::{
    fmt, mem,
    pin::Pin,
    task::{Context, Poll},
};

use crate::{
    error::{Result, UsageError},
    executors::{context, Driver},
};

use super::{promise::Continuation, FrameRef, Task};

enum Handshake<T> {
    /// Not polled yet; the task has not started
    Fresh(Task<T>),
    /// The caller's frame is the task's continuation and control went to the task
    Linked(Task<T>),
    /// Awaited from outside any task, so this awaiter drives the chain itself
    Rooted(Driver<T>),
    Consumed,
}

/// The future returned when a [`Task`] is awaited.
///
/// Inside a task body, the first poll records the body's frame as the task's continuation
/// and asks the driver to transfer control into the task; it always returns
/// `Poll::Pending`. The driver resumes the body once the task is done, and the next poll
/// reads the task's result: the value, or the error the task raised.
///
/// Awaited from anywhere else, for instance by [`block_on`](crate::block_on) or from a
/// future running on another executor, the awaiter becomes the root of the chain and
/// drives it with a [`Driver`] using the default configuration.
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Awaiter<T> {
    state: Handshake<T>,
}

impl<T: Send + 'static> Awaiter<T> {
    pub(crate) fn new(task: Task<T>) -> Self {
        if !task.is_valid() {
            UsageError::EmptyHandle.raise();
        }
        Self {
            state: Handshake::Fresh(task),
        }
    }
}

impl<T: Send + 'static> std::future::Future for Awaiter<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        loop {
            match mem::replace(&mut this.state, Handshake::Consumed) {
                Handshake::Fresh(task) => match context::current() {
                    Some(caller) => {
                        let callee: FrameRef = task.frame().frame_ref();
                        context::transfer_to(callee);
                        task.frame().link(Continuation::Frame(caller));
                        this.state = Handshake::Linked(task);
                        return Poll::Pending;
                    }
                    None => this.state = Handshake::Rooted(Driver::new(task)),
                },
                Handshake::Linked(task) => {
                    if task.is_done() {
                        return Poll::Ready(task.frame().take_result());
                    }
                    // resumed before the task finished: send control back to it
                    context::transfer_to(task.frame().frame_ref());
                    this.state = Handshake::Linked(task);
                    return Poll::Pending;
                }
                Handshake::Rooted(mut driver) => {
                    let poll: Poll<Result<T>> = Pin::new(&mut driver).poll(cx);
                    if poll.is_pending() {
                        this.state = Handshake::Rooted(driver);
                    }
                    return poll;
                }
                Handshake::Consumed => UsageError::ResultConsumed.raise(),
            }
        }
    }
}

impl<T> Drop for Awaiter<T> {
    fn drop(&mut self) {
        // dropped right after the handshake, before the driver acted on it
        if let Handshake::Linked(task) = &self.state {
            if let Some(id) = task.id() {
                context::withdraw(id);
            }
        }
    }
}

impl<T> fmt::Debug for Awaiter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state: &str = match self.state {
            Handshake::Fresh(_) => "Fresh",
            Handshake::Linked(_) => "Linked",
            Handshake::Rooted(_) => "Rooted",
            Handshake::Consumed => "Consumed",
        };
        f.debug_struct("Awaiter").field("state", &state).finish()
    }
}
