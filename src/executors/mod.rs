use std::{
    cell::RefCell,
    future::{Future, IntoFuture},
    pin::Pin,
    sync::Arc,
    task::{Context, Poll, Waker},
};

mod builder;
pub(crate) mod context;
mod driver;
mod suspender;

pub use builder::{DriverBuilder, DriverConfig};
pub use driver::Driver;

use suspender::Suspender;

thread_local! {
    static WAKER_PAIR: RefCell<(Arc<Suspender>, Waker)> = RefCell::new(suspender::pair());
}

/// Blocks the current thread until the future, or the task, is polled to finish.
///
/// A [`Task`](crate::Task) passed here is the root of its chain and is driven with the
/// default [`DriverConfig`]; its result is the task's `Ok` value or the error it raised.
///
/// Called from inside a task body, it blocks the thread driving that body. Tasks awaited
/// by the blocked-on future start chains of their own and never link to the body.
///
/// Example
/// ```rust
/// use cotask::{block_on, Task};
///
/// let answer: Task<i32> = Task::new(async { Ok(42) });
/// assert_eq!(block_on(answer).unwrap(), 42);
///
/// let doubled = block_on(async { 21 * 2 });
/// assert_eq!(doubled, 42);
/// ```
pub fn block_on<F: IntoFuture>(future: F) -> F::Output {
    let future = future.into_future();
    futures_lite::pin!(future);
    WAKER_PAIR.with(|pair| match pair.try_borrow_mut() {
        Ok(pair) => {
            let (suspender, waker) = &*pair;
            run(future, suspender, waker)
        }
        // an outer block_on on this thread owns the pair; its wakeups must not be stolen
        Err(_) => {
            let (suspender, waker) = suspender::pair();
            run(future, &suspender, &waker)
        }
    })
}

fn run<F: Future>(mut future: Pin<&mut F>, suspender: &Suspender, waker: &Waker) -> F::Output {
    let mut context: Context<'_> = Context::from_waker(waker);
    loop {
        match context::detached(|| future.as_mut().poll(&mut context)) {
            Poll::Pending => suspender.suspend(),
            Poll::Ready(output) => return output,
        }
    }
}
