use std::any::Any;

use thiserror::Error;

/// The error a task body produced.
///
/// It is type-erased but keeps the message, the `source()` chain and the
/// concrete type, which can be recovered with ``downcast_ref``.
pub type Error = anyhow::Error;

/// `Result` type of every task body and of every await of a [`Task`](crate::Task).
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A panic that escaped a task body.
///
/// The panic is caught where the body is polled and stored in place of a value, so the
/// awaiting party receives it as an ordinary [`Error`].
///
/// # Example
///
/// ```rust
/// use cotask::{block_on, Panicked, Task};
///
/// fn digit(n: u8) -> u8 {
///     if n > 9 {
///         panic!("out of range");
///     }
///     n
/// }
///
/// let task: Task<u8> = Task::new(async { Ok(digit(12)) });
/// let error = block_on(task).unwrap_err();
/// let panicked = error.downcast_ref::<Panicked>().unwrap();
/// assert_eq!(panicked.message(), "out of range");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("task body panicked: {message}")]
pub struct Panicked {
    message: String,
}

impl Panicked {
    pub(crate) fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message: String = if let Some(message) = payload.downcast_ref::<&'static str>() {
            (*message).to_owned()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "Box<dyn Any>".to_owned()
        };
        Self { message }
    }

    /// The message the body panicked with
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A broken task contract.
///
/// These are programming errors, not runtime failures: they are never delivered through a
/// task's result. They are raised as panics whose payload is the `UsageError` itself, in
/// debug and release builds alike, and they are not captured by the panic boundary of a
/// task body.
///
/// # Example
///
/// ```rust
/// use cotask::{Task, UsageError};
/// use std::panic::{catch_unwind, AssertUnwindSafe};
///
/// let payload = catch_unwind(AssertUnwindSafe(|| {
///     let empty: Task<i32> = Task::empty();
///     let _ = cotask::block_on(empty);
/// }))
/// .unwrap_err();
/// assert_eq!(payload.downcast_ref::<UsageError>(), Some(&UsageError::EmptyHandle));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UsageError {
    /// The handle holds no execution state
    #[error("awaited or released an empty task handle")]
    EmptyHandle,
    /// The result was already read by an earlier await
    #[error("the task result was already consumed")]
    ResultConsumed,
    /// The result was read before the task reached its done state
    #[error("the task result was read before the task completed")]
    NotCompleted,
    /// A second outcome was written into the result channel
    #[error("the task result was written twice")]
    AlreadyCompleted,
    /// The task was awaited twice
    #[error("the task continuation was set twice")]
    ContinuationAlreadySet,
    /// The body completed although nobody had awaited the task
    #[error("the task completed without a continuation")]
    MissingContinuation,
    /// A task in its done state was resumed again
    #[error("resumed a task that already completed")]
    ResumedAfterDone,
    /// A task was resumed while it was already running
    #[error("resumed a task that is already running")]
    AlreadyRunning,
    /// The execution state was torn down before the operation
    #[error("the task execution state was torn down")]
    Destroyed,
    /// A body awaited two tasks within the same step
    #[error("a task body awaited more than one task at a time")]
    ConcurrentAwait,
    /// A linked task was polled outside of the driver running its caller
    #[error("a task transfer was requested outside of a driver")]
    OutsideDriver,
}

impl UsageError {
    #[track_caller]
    pub(crate) fn raise(self) -> ! {
        std::panic::panic_any(self)
    }
}
