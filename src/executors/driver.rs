use std::{
    fmt,
    future::Future,
    mem,
    pin::Pin,
    task::{Context, Poll},
};

use crate::{
    error::{Result, UsageError},
    task::{FrameRef, RawTask, Step, Task},
};

use super::DriverConfig;

enum Leaf {
    Unstarted,
    /// The frame to resume on the next poll
    At(FrameRef),
    Finished,
}

/// Drives a root task, and every task it awaits, to completion.
///
/// `Driver` is the trampoline behind task chains: each poll resumes the current frame,
/// follows the transfer it reports to the next frame, and repeats from its own loop, so
/// no poll ever runs inside another task's poll. It returns `Poll::Pending` when a body
/// waits on something that is not a task (that body's waker is the one this driver was
/// polled with), or when the configured transfer budget is spent.
///
/// Awaiting a task from outside a task body already drives it this way; build a `Driver`
/// directly to pick a [`DriverConfig`] or to resume a released task.
///
/// # Example
///
/// ```rust
/// use cotask::{block_on, Driver, DriverConfig, Task};
///
/// fn countdown(n: u32) -> Task<u32> {
///     Task::new(async move {
///         if n == 0 {
///             return Ok(0);
///         }
///         Ok(countdown(n - 1).await? + 1)
///     })
/// }
///
/// let config = DriverConfig::builder().transfer_budget(16).build();
/// let driver = Driver::with_config(countdown(1_000), config);
/// assert_eq!(block_on(driver).unwrap(), 1_000);
/// ```
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Driver<T> {
    task: Task<T>,
    leaf: Leaf,
    config: DriverConfig,
}

impl<T: Send + 'static> Driver<T> {
    /// Creates a driver with the default configuration.
    ///
    /// # Panics
    /// With [`UsageError::EmptyHandle`] if `task` is empty.
    pub fn new(task: Task<T>) -> Self {
        Self::with_config(task, DriverConfig::default())
    }

    /// Creates a driver with the given configuration.
    ///
    /// # Panics
    /// With [`UsageError::EmptyHandle`] if `task` is empty.
    pub fn with_config(task: Task<T>, config: DriverConfig) -> Self {
        if !task.is_valid() {
            UsageError::EmptyHandle.raise();
        }
        Self {
            task,
            leaf: Leaf::Unstarted,
            config,
        }
    }

    /// Creates a driver that takes ownership of a released task
    pub fn from_raw(raw: RawTask<T>) -> Self {
        Self::new(raw.into_task())
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }
}

impl<T: Send + 'static> Future for Driver<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let mut current: FrameRef = match mem::replace(&mut this.leaf, Leaf::Finished) {
            Leaf::Unstarted => this.task.frame().begin(),
            Leaf::At(frame) => frame,
            Leaf::Finished => UsageError::ResultConsumed.raise(),
        };
        let budget: Option<usize> = this.config.transfer_budget();
        let mut transfers: usize = 0;
        loop {
            match current.resume(cx) {
                Step::Transfer(next) => {
                    current = next;
                    transfers += 1;
                    if budget.is_some_and(|budget| transfers >= budget) {
                        tracing::trace!(task.id = %current.id(), transfers, "driver budget spent, yielding");
                        this.leaf = Leaf::At(current);
                        cx.waker().wake_by_ref();
                        return Poll::Pending;
                    }
                }
                Step::Suspended => {
                    this.leaf = Leaf::At(current);
                    return Poll::Pending;
                }
                Step::Finished => return Poll::Ready(this.task.frame().take_result()),
            }
        }
    }
}

impl<T> fmt::Debug for Driver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let leaf: Option<&FrameRef> = match &self.leaf {
            Leaf::At(frame) => Some(frame),
            Leaf::Unstarted | Leaf::Finished => None,
        };
        f.debug_struct("Driver")
            .field("task", &self.task)
            .field("leaf", &leaf)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::yield_now;
    use cooked_waker::{IntoWaker, WakeRef};
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        task::Waker,
    };

    #[derive(Default)]
    struct Wakes(AtomicUsize);

    impl WakeRef for Wakes {
        fn wake_by_ref(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn chain(depth: u32) -> Task<u32> {
        Task::new(async move {
            if depth == 0 {
                return Ok(0);
            }
            Ok(chain(depth - 1).await? + 1)
        })
    }

    #[test]
    fn budget_yields_to_the_outer_executor() {
        let wakes: Arc<Wakes> = Arc::new(Wakes::default());
        let waker: Waker = wakes.clone().into_waker();
        let mut cx: Context<'_> = Context::from_waker(&waker);

        let config: DriverConfig = DriverConfig::builder().transfer_budget(2).build();
        let mut driver: Driver<u32> = Driver::with_config(chain(5), config);

        // 5 transfers down the chain and 5 back up
        let mut pending: usize = 0;
        let value: u32 = loop {
            match Pin::new(&mut driver).poll(&mut cx) {
                Poll::Ready(value) => break value.unwrap(),
                Poll::Pending => pending += 1,
            }
        };
        assert_eq!(value, 5);
        assert_eq!(pending, 5);
        assert_eq!(wakes.0.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn suspended_leaf_is_resumed_in_place() {
        let wakes: Arc<Wakes> = Arc::new(Wakes::default());
        let waker: Waker = wakes.clone().into_waker();
        let mut cx: Context<'_> = Context::from_waker(&waker);

        let leaf: Task<u32> = Task::new(async {
            yield_now().await;
            yield_now().await;
            Ok(40)
        });
        let root: Task<u32> = Task::new(async move { Ok(leaf.await? + 2) });
        let mut driver: Driver<u32> = Driver::new(root);

        assert!(Pin::new(&mut driver).poll(&mut cx).is_pending());
        assert!(format!("{driver:?}").contains("leaf: Some(FrameRef("));
        assert!(Pin::new(&mut driver).poll(&mut cx).is_pending());
        match Pin::new(&mut driver).poll(&mut cx) {
            Poll::Ready(value) => assert_eq!(value.unwrap(), 42),
            Poll::Pending => panic!("driver should have finished"),
        }
        assert_eq!(wakes.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn empty_task_is_rejected() {
        let payload = std::panic::catch_unwind(|| Driver::<()>::new(Task::empty())).unwrap_err();
        assert_eq!(
            payload.downcast_ref::<UsageError>(),
            Some(&UsageError::EmptyHandle)
        );
    }
}
