mod awaiter;
mod frame;
mod promise;

pub use awaiter::Awaiter;
pub use frame::{FrameRef, Step, TaskId};

pub(crate) use frame::Frame;

use std::{fmt, future::Future, future::IntoFuture, sync::Arc};

use crate::error::{Result, UsageError};

/// A lazily started asynchronous computation that produces exactly one value or exactly
/// one error.
///
/// Creating a task allocates its execution state but runs none of its body: the body
/// starts only when the task is awaited. Awaiting a task from inside another task's body
/// hands control directly to it, and when it completes control comes straight back to
/// the awaiting body, so a chain of any length of tasks awaiting tasks runs in constant
/// stack space.
///
/// A `Task` owns its execution state exclusively. It cannot be cloned; moving it moves
/// the ownership, and dropping it tears the state down wherever the body is suspended.
///
/// # Example
///
/// ```rust
/// use cotask::{block_on, Task};
///
/// fn seven() -> Task<i32> {
///     Task::new(async { Ok(7) })
/// }
///
/// fn eight() -> Task<i32> {
///     Task::new(async { Ok(seven().await? + 1) })
/// }
///
/// assert_eq!(block_on(eight()).unwrap(), 8);
/// ```
#[must_use = "tasks do nothing unless they are awaited"]
pub struct Task<T = ()> {
    frame: Option<Arc<Frame<T>>>,
}

impl<T: Send + 'static> Task<T> {
    /// Wraps `future` as the body of a new, not yet started task.
    ///
    /// # Parameters
    ///
    /// * `future`: the body; it runs when the task is first awaited and its `Ok` or `Err`
    ///   output becomes the task's single result
    ///
    /// # Example
    ///
    /// ```rust
    /// use cotask::Task;
    /// use std::sync::atomic::{AtomicBool, Ordering};
    /// use std::sync::Arc;
    ///
    /// let ran = Arc::new(AtomicBool::new(false));
    /// let flag = ran.clone();
    /// let task: Task<()> = Task::new(async move {
    ///     flag.store(true, Ordering::SeqCst);
    ///     Ok(())
    /// });
    /// drop(task);
    /// assert!(!ran.load(Ordering::SeqCst));
    /// ```
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        Self {
            frame: Some(Frame::new(future)),
        }
    }

    /// Wraps a body whose value converts into `T`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use cotask::{block_on, Task};
    ///
    /// let wide: Task<i64> = Task::from_value_future(async { Ok(7_i32) });
    /// assert_eq!(block_on(wide).unwrap(), 7_i64);
    /// ```
    pub fn from_value_future<F, U>(future: F) -> Self
    where
        F: Future<Output = Result<U>> + Send + 'static,
        U: Into<T>,
    {
        Self::new(async move { future.await.map(Into::into) })
    }
}

impl<T> Task<T> {
    /// An invalid handle that holds no execution state
    pub const fn empty() -> Self {
        Self { frame: None }
    }

    /// Returns `true` when the handle holds an execution state
    pub fn is_valid(&self) -> bool {
        self.frame.is_some()
    }

    /// Moves the execution state out into a new handle, leaving this one empty.
    ///
    /// # Example
    ///
    /// ```rust
    /// use cotask::{block_on, Task};
    ///
    /// let mut source: Task<i32> = Task::new(async { Ok(42) });
    /// let target = source.take();
    /// assert!(!source.is_valid());
    /// drop(source);
    /// assert_eq!(block_on(target).unwrap(), 42);
    /// ```
    pub fn take(&mut self) -> Self {
        Self {
            frame: self.frame.take(),
        }
    }

    /// Id of the held task, `None` for an empty handle
    pub fn id(&self) -> Option<TaskId> {
        self.frame.as_ref().map(|frame| frame.id())
    }

    /// Returns `true` once the held task completed and is waiting for its result to be
    /// read
    pub fn is_done(&self) -> bool {
        self.frame.as_ref().is_some_and(|frame| frame.is_done())
    }

    /// Gives up ownership of the execution state and returns a raw reference to it.
    ///
    /// The handle is left empty. Tearing the state down becomes the caller's job, see
    /// [`RawTask`].
    ///
    /// # Panics
    /// With [`UsageError::EmptyHandle`] if the handle is empty.
    pub fn release(&mut self) -> RawTask<T> {
        let Some(frame) = self.frame.take() else {
            UsageError::EmptyHandle.raise();
        };
        RawTask { frame }
    }

    pub(crate) fn frame(&self) -> &Arc<Frame<T>> {
        match self.frame.as_ref() {
            Some(frame) => frame,
            None => UsageError::EmptyHandle.raise(),
        }
    }
}

impl<T> Default for Task<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> Drop for Task<T> {
    fn drop(&mut self) {
        if let Some(frame) = self.frame.take() {
            frame.teardown();
        }
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.frame.as_ref() {
            Some(frame) => f
                .debug_struct("Task")
                .field("id", &frame.id())
                .field("stage", &frame.stage())
                .finish(),
            None => f.write_str("Task(empty)"),
        }
    }
}

impl<T: Send + 'static> IntoFuture for Task<T> {
    type Output = Result<T>;
    type IntoFuture = Awaiter<T>;

    /// Awaits the task.
    ///
    /// # Panics
    /// With [`UsageError::EmptyHandle`] if the handle is empty.
    fn into_future(self) -> Self::IntoFuture {
        Awaiter::new(self)
    }
}

/// A task whose lifetime is managed by hand.
///
/// Returned by [`Task::release`] for handing a root task to an external driver loop.
/// Unlike [`Task`], dropping a `RawTask` does not tear the execution state down: call
/// [`destroy`](RawTask::destroy) when the task is no longer needed, or turn it back into
/// an owning handle with [`into_task`](RawTask::into_task).
///
/// # Example
///
/// Driving a released task step by step:
///
/// ```rust
/// use cotask::{Step, Task};
/// use std::task::Poll;
///
/// let mut task: Task<i32> = Task::new(async { Ok(6 * 7) });
/// let raw = task.release();
///
/// # futures_lite::future::block_on(futures_lite::future::poll_fn(|cx| {
/// let mut current = raw.begin();
/// loop {
///     match current.resume(cx) {
///         Step::Transfer(next) => current = next,
///         Step::Suspended => continue,
///         Step::Finished => break,
///     }
/// }
/// # Poll::Ready(())
/// # }));
/// assert_eq!(raw.take_result().unwrap(), 42);
/// raw.destroy();
/// ```
#[must_use = "a released task has to be driven or destroyed"]
pub struct RawTask<T> {
    frame: Arc<Frame<T>>,
}

impl<T: Send + 'static> RawTask<T> {
    /// Records the caller as the driver waiting for this task and returns the frame to
    /// resume first.
    ///
    /// When the task completes, resuming reports [`Step::Finished`] instead of a transfer.
    ///
    /// # Panics
    /// With [`UsageError::ContinuationAlreadySet`] if the task was already started.
    pub fn begin(&self) -> FrameRef {
        self.frame.begin()
    }

    /// The task's frame, without recording a continuation
    pub fn frame(&self) -> FrameRef {
        self.frame.frame_ref()
    }
}

impl<T> RawTask<T> {
    /// Id of the task
    pub fn id(&self) -> TaskId {
        self.frame.id()
    }

    /// Returns `true` once the task completed
    pub fn is_done(&self) -> bool {
        self.frame.is_done()
    }

    /// Reads the task's result, leaving nothing behind.
    ///
    /// # Panics
    /// With [`UsageError::NotCompleted`] before the task is done and
    /// [`UsageError::ResultConsumed`] on a second read.
    pub fn take_result(&self) -> Result<T> {
        self.frame.take_result()
    }

    /// Tears the execution state down, wherever the body is suspended
    pub fn destroy(self) {
        self.frame.teardown();
    }

    /// Takes ownership back
    pub fn into_task(self) -> Task<T> {
        Task {
            frame: Some(self.frame),
        }
    }
}

impl<T> fmt::Debug for RawTask<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawTask")
            .field("id", &self.frame.id())
            .field("stage", &self.frame.stage())
            .finish()
    }
}
