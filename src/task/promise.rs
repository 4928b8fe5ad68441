use std::mem;

use crate::error::{Error, Result, UsageError};

use super::frame::FrameRef;

/// Write-once, read-once holder of a task's outcome.
pub(crate) enum ResultChannel<T> {
    Empty,
    Value(T),
    Error(Error),
}

impl<T> ResultChannel<T> {
    pub(crate) fn is_empty(&self) -> bool {
        matches!(self, ResultChannel::Empty)
    }

    pub(crate) fn write(&mut self, outcome: Result<T>) {
        if !self.is_empty() {
            UsageError::AlreadyCompleted.raise();
        }
        *self = match outcome {
            Ok(value) => ResultChannel::Value(value),
            Err(error) => ResultChannel::Error(error),
        };
    }

    /// Moves the outcome out, leaving the channel empty
    pub(crate) fn take(&mut self) -> Result<T> {
        match mem::replace(self, ResultChannel::Empty) {
            ResultChannel::Empty => UsageError::ResultConsumed.raise(),
            ResultChannel::Value(value) => Ok(value),
            ResultChannel::Error(error) => Err(error),
        }
    }
}

/// Where control goes once a task completes.
pub(crate) enum Continuation {
    /// The frame that awaited the task
    Frame(FrameRef),
    /// The driver loop that started the chain
    Root,
}

/// Per-task state shared between the awaiter and the completing body.
pub(crate) struct Promise<T> {
    continuation: Option<Continuation>,
    linked: bool,
    channel: ResultChannel<T>,
}

impl<T> Promise<T> {
    pub(crate) fn new() -> Self {
        Self {
            continuation: None,
            linked: false,
            channel: ResultChannel::Empty,
        }
    }

    pub(crate) fn set_continuation(&mut self, continuation: Continuation) {
        if self.linked {
            UsageError::ContinuationAlreadySet.raise();
        }
        self.linked = true;
        self.continuation = Some(continuation);
    }

    pub(crate) fn take_continuation(&mut self) -> Option<Continuation> {
        self.continuation.take()
    }

    pub(crate) fn complete(&mut self, outcome: Result<T>) {
        self.channel.write(outcome);
    }

    pub(crate) fn take_result(&mut self) -> Result<T> {
        self.channel.take()
    }
}
